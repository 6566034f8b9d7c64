pub mod object_store;
pub mod office_engine;

use std::future::Future;

use tokio::runtime::{Handle, RuntimeFlavor};

/// Drives an async SDK or process future to completion from synchronous adapter code.
///
/// Inside a multi-thread Tokio runtime the worker is handed over with
/// `block_in_place`. A current-thread runtime cannot give up its only worker, so
/// the future runs on a scoped thread with a private runtime instead; the same
/// private runtime is used when no runtime is active at all.
pub fn run_blocking<F>(future: F) -> std::io::Result<F::Output>
where
    F: Future + Send,
    F::Output: Send,
{
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            Ok(tokio::task::block_in_place(|| handle.block_on(future)))
        }
        Ok(_) => std::thread::scope(|scope| {
            scope
                .spawn(|| block_on_private_runtime(future))
                .join()
                .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
        }),
        Err(_) => block_on_private_runtime(future),
    }
}

fn block_on_private_runtime<F: Future>(future: F) -> std::io::Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    Ok(runtime.block_on(future))
}

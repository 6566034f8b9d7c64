//! External office-document renderer.
//!
//! The engine is a LibreOffice-compatible executable run as a child process:
//! `<program> [extra args] --headless --convert-to pdf --outdir <dir> <input>`.
//! Success means exit code 0 and `<dir>/<input stem>.pdf` on disk.
//!
//! On Unix the engine leads its own process group. LibreOffice's launcher
//! forks the real renderer, so a timeout signals the whole group rather than
//! only the direct child.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Instant;

use tracing::{debug, error, info, warn};

use crate::adapters::run_blocking;
use crate::config::EngineConfig;
use crate::error::EngineError;

pub trait OfficeEngine {
    fn convert_to_pdf(&self, input: &Path, output_dir: &Path) -> Result<PathBuf, EngineError>;
}

impl<T: OfficeEngine + ?Sized> OfficeEngine for &T {
    fn convert_to_pdf(&self, input: &Path, output_dir: &Path) -> Result<PathBuf, EngineError> {
        (**self).convert_to_pdf(input, output_dir)
    }
}

#[derive(Debug, Clone)]
pub struct LibreOfficeEngine {
    config: EngineConfig,
}

impl LibreOfficeEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn command_args(&self, input: &Path, output_dir: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = self.config.extra_args.iter().map(OsString::from).collect();
        args.extend(
            ["--headless", "--convert-to", "pdf", "--outdir"]
                .into_iter()
                .map(OsString::from),
        );
        args.push(output_dir.as_os_str().to_owned());
        args.push(input.as_os_str().to_owned());
        args
    }

    async fn run(&self, input: &Path, output_dir: &Path) -> Result<PathBuf, EngineError> {
        let expected = expected_output_path(input, output_dir)?;

        let mut cmd = tokio::process::Command::new(&self.config.program);
        cmd.args(self.command_args(input, output_dir))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        // The engine writes its user profile under $HOME, which is read-only on Lambda.
        if let Some(home) = output_dir.parent() {
            cmd.env("HOME", home);
        }
        #[cfg(unix)]
        cmd.process_group(0);

        debug!(
            program = %self.config.program,
            input = %input.display(),
            output_dir = %output_dir.display(),
            timeout_ms = self.config.timeout.as_millis() as u64,
            "office_engine_spawning"
        );

        let started_at = Instant::now();
        let child = cmd.spawn().map_err(|source| EngineError::Spawn {
            program: self.config.program.clone(),
            source,
        })?;
        let pid = child.id();

        // Dropping the pending future drops the child, which kills it.
        let output = match tokio::time::timeout(self.config.timeout, child.wait_with_output()).await
        {
            Ok(result) => result?,
            Err(_) => {
                error!(
                    program = %self.config.program,
                    timeout_ms = self.config.timeout.as_millis() as u64,
                    "office_engine_timed_out"
                );
                kill_process_group(pid).await;
                return Err(EngineError::Timeout {
                    timeout: self.config.timeout,
                });
            }
        };

        let elapsed_ms = started_at.elapsed().as_millis() as u64;
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if !output.status.success() {
            error!(
                code = ?output.status.code(),
                elapsed_ms,
                stderr = %stderr,
                "office_engine_failed"
            );
            return Err(EngineError::Failed {
                code: output.status.code(),
                stderr,
            });
        }

        if !expected.is_file() {
            return Err(EngineError::OutputMissing { path: expected });
        }

        info!(
            elapsed_ms,
            output = %expected.display(),
            "office_engine_completed"
        );
        Ok(expected)
    }
}

impl OfficeEngine for LibreOfficeEngine {
    fn convert_to_pdf(&self, input: &Path, output_dir: &Path) -> Result<PathBuf, EngineError> {
        run_blocking(self.run(input, output_dir))?
    }
}

#[cfg(unix)]
async fn kill_process_group(pid: Option<u32>) {
    let Some(pid) = pid else {
        return;
    };
    let status = tokio::process::Command::new("kill")
        .args(["-KILL", "--", &format!("-{pid}")])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await;
    match status {
        Ok(status) if status.success() => debug!(pgid = pid, "office_engine_group_killed"),
        Ok(status) => warn!(pgid = pid, code = ?status.code(), "office_engine_group_kill_failed"),
        Err(error) => warn!(pgid = pid, error = %error, "office_engine_group_kill_failed"),
    }
}

#[cfg(not(unix))]
async fn kill_process_group(_pid: Option<u32>) {}

pub fn expected_output_path(input: &Path, output_dir: &Path) -> Result<PathBuf, EngineError> {
    let stem = input
        .file_stem()
        .ok_or_else(|| EngineError::InvalidInput {
            path: input.to_path_buf(),
        })?;
    let mut file_name = stem.to_owned();
    file_name.push(".pdf");
    Ok(output_dir.join(file_name))
}

#[cfg(all(test, unix))]
mod tests {
    use std::fs;
    use std::time::Duration;

    use super::*;

    /// Runs `sh -c <script>` so the conversion flags land in `$1..$6`.
    fn scripted_engine(script: &str, timeout: Duration) -> LibreOfficeEngine {
        LibreOfficeEngine::new(EngineConfig {
            program: "sh".to_string(),
            extra_args: vec!["-c".to_string(), script.to_string(), "fake-office".to_string()],
            timeout,
        })
    }

    fn workspace() -> (tempfile::TempDir, PathBuf, PathBuf) {
        let dir = tempfile::tempdir().expect("tempdir");
        let source_dir = dir.path().join("source");
        let output_dir = dir.path().join("output");
        fs::create_dir_all(&source_dir).expect("source dir");
        fs::create_dir_all(&output_dir).expect("output dir");
        let input = source_dir.join("sheet.xlsx");
        fs::write(&input, b"PK\x03\x04").expect("input file");
        (dir, input, output_dir)
    }

    const WRITES_PDF: &str = r#"printf '%s\n' "$@" > "$5/args.txt"
name=$(basename "$6")
echo '%PDF-1.4 fake' > "$5/${name%.*}.pdf""#;

    #[test]
    fn builds_headless_conversion_arguments() {
        let engine = LibreOfficeEngine::new(EngineConfig {
            program: "soffice".to_string(),
            extra_args: vec!["--norestore".to_string()],
            timeout: Duration::from_secs(5),
        });
        let args = engine.command_args(Path::new("/w/source/a.docx"), Path::new("/w/output"));
        assert_eq!(
            args,
            vec![
                "--norestore",
                "--headless",
                "--convert-to",
                "pdf",
                "--outdir",
                "/w/output",
                "/w/source/a.docx",
            ]
        );
    }

    #[test]
    fn returns_generated_pdf_path() {
        let (_dir, input, output_dir) = workspace();
        let engine = scripted_engine(WRITES_PDF, Duration::from_secs(10));

        let output = engine
            .convert_to_pdf(&input, &output_dir)
            .expect("conversion should succeed");

        assert_eq!(output, output_dir.join("sheet.pdf"));
        assert!(output.is_file());
        let recorded = fs::read_to_string(output_dir.join("args.txt")).expect("args recorded");
        let recorded: Vec<&str> = recorded.lines().collect();
        assert_eq!(&recorded[..4], &["--headless", "--convert-to", "pdf", "--outdir"]);
    }

    #[test]
    fn non_zero_exit_is_reported_with_stderr() {
        let (_dir, input, output_dir) = workspace();
        let engine = scripted_engine(
            "echo 'source file could not be loaded' >&2; exit 3",
            Duration::from_secs(10),
        );

        let error = engine
            .convert_to_pdf(&input, &output_dir)
            .expect_err("non-zero exit should fail");

        match error {
            EngineError::Failed { code, stderr } => {
                assert_eq!(code, Some(3));
                assert!(stderr.contains("could not be loaded"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn hung_engine_times_out() {
        let (_dir, input, output_dir) = workspace();
        let engine = scripted_engine("exec sleep 30", Duration::from_millis(200));

        let started_at = Instant::now();
        let error = engine
            .convert_to_pdf(&input, &output_dir)
            .expect_err("hung engine should time out");

        assert!(matches!(error, EngineError::Timeout { .. }));
        assert!(started_at.elapsed() < Duration::from_secs(10));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn timeout_kills_processes_forked_by_the_engine() {
        let (_dir, input, output_dir) = workspace();
        let engine = scripted_engine(
            r#"sleep 30 & echo $! > "$5/renderer.pid"; wait"#,
            Duration::from_millis(500),
        );

        let error = engine
            .convert_to_pdf(&input, &output_dir)
            .expect_err("hung engine should time out");
        assert!(matches!(error, EngineError::Timeout { .. }));

        let pid = fs::read_to_string(output_dir.join("renderer.pid")).expect("renderer pid");
        let stat_path = PathBuf::from(format!("/proc/{}/stat", pid.trim()));
        let deadline = Instant::now() + Duration::from_secs(5);
        while is_running(&stat_path) {
            assert!(Instant::now() < deadline, "forked renderer outlived the timeout");
            std::thread::sleep(Duration::from_millis(20));
        }
    }

    /// Reaped processes vanish from /proc; unreaped ones linger as zombies (`Z`).
    #[cfg(target_os = "linux")]
    fn is_running(stat_path: &Path) -> bool {
        fs::read_to_string(stat_path).is_ok_and(|stat| {
            stat.rsplit_once(") ")
                .is_some_and(|(_, fields)| !fields.starts_with('Z'))
        })
    }

    #[test]
    fn success_without_output_file_is_an_error() {
        let (_dir, input, output_dir) = workspace();
        let engine = scripted_engine("exit 0", Duration::from_secs(10));

        let error = engine
            .convert_to_pdf(&input, &output_dir)
            .expect_err("missing output should fail");

        assert!(
            matches!(error, EngineError::OutputMissing { path } if path.ends_with("sheet.pdf"))
        );
    }

    #[test]
    fn missing_executable_fails_to_spawn() {
        let (_dir, input, output_dir) = workspace();
        let engine = LibreOfficeEngine::new(EngineConfig {
            program: "/nonexistent/bin/soffice".to_string(),
            extra_args: Vec::new(),
            timeout: Duration::from_secs(5),
        });

        let error = engine
            .convert_to_pdf(&input, &output_dir)
            .expect_err("missing executable should fail");
        assert!(matches!(error, EngineError::Spawn { .. }));
    }
}

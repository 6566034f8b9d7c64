use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use lambda_runtime::{service_fn, Error, LambdaEvent};
use pdf_convert_core::contract::{parse_s3_event, ConvertResponse};
use pdf_convert_lambda::adapters::object_store::ObjectStore;
use pdf_convert_lambda::adapters::office_engine::LibreOfficeEngine;
use pdf_convert_lambda::adapters::run_blocking;
use pdf_convert_lambda::config::DispatcherConfig;
use pdf_convert_lambda::handlers::convert::ConversionDispatcher;
use pdf_convert_lambda::handlers::event::handle_s3_event;
use pdf_convert_lambda::logging::init_lambda_logging;
use serde_json::Value;
use tracing::info;

struct S3ObjectStore {
    s3_client: aws_sdk_s3::Client,
}

impl ObjectStore for S3ObjectStore {
    fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, String> {
        let bucket = bucket.to_string();
        let object_key = key.to_string();
        let client = self.s3_client.clone();

        run_blocking(async move {
            let output = client
                .get_object()
                .bucket(bucket)
                .key(object_key)
                .send()
                .await
                .map_err(|error| {
                    format!(
                        "failed to read object from s3: {}",
                        DisplayErrorContext(&error)
                    )
                })?;
            let data = output
                .body
                .collect()
                .await
                .map_err(|error| format!("failed to stream object body from s3: {error}"))?;
            Ok::<_, String>(data.into_bytes().to_vec())
        })
        .map_err(|error| format!("failed to drive s3 request: {error}"))?
    }

    fn put_object(&self, bucket: &str, key: &str, body: &[u8]) -> Result<(), String> {
        let bucket = bucket.to_string();
        let object_key = key.to_string();
        let body_bytes = body.to_vec();
        let client = self.s3_client.clone();

        run_blocking(async move {
            client
                .put_object()
                .bucket(bucket)
                .key(object_key)
                .content_type("application/pdf")
                .body(ByteStream::from(body_bytes))
                .send()
                .await
                .map(|_| ())
                .map_err(|error| {
                    format!(
                        "failed to write object to s3: {}",
                        DisplayErrorContext(&error)
                    )
                })
        })
        .map_err(|error| format!("failed to drive s3 request: {error}"))?
    }
}

type S3Dispatcher = ConversionDispatcher<S3ObjectStore, LibreOfficeEngine>;

async fn handle_request(
    event: LambdaEvent<Value>,
    dispatcher: &S3Dispatcher,
) -> Result<ConvertResponse, Error> {
    info!(request_id = %event.context.request_id, "invocation_started");
    let notification = parse_s3_event(event.payload)?;
    let response = handle_s3_event(&notification, dispatcher)?;
    Ok(response)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    init_lambda_logging();

    let config = DispatcherConfig::from_env()?;
    let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    let store = S3ObjectStore {
        s3_client: aws_sdk_s3::Client::new(&aws_config),
    };
    let engine = LibreOfficeEngine::new(config.engine.clone());
    let dispatcher = ConversionDispatcher::new(store, engine, &config);
    info!(
        output_prefix = %config.output_prefix,
        output_bucket = config.output_bucket.as_deref().unwrap_or("<source>"),
        engine = %config.engine.program,
        "dispatcher_ready"
    );

    let dispatcher = &dispatcher;
    lambda_runtime::run(service_fn(move |event: LambdaEvent<Value>| async move {
        handle_request(event, dispatcher).await
    }))
    .await
}

use lambda_runtime::{service_fn, Error, LambdaEvent};
use pet_store_lambda::config::get_local_payload;
use pet_store_lambda::{Config, Invocation, InvocationContext};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Error> {
    init_tracing();

    let invocation = Arc::new(Invocation::pet_store(Config::from_env()));

    // a payload file in the params means a single local run without the Lambda runtime
    if let Some(local) = get_local_payload()? {
        info!("Payload from: {}", local.file_name);
        let output = invocation.handle(local.payload, &InvocationContext::default())?;
        println!("{}", String::from_utf8_lossy(&output));
        return Ok(());
    }

    let handler_invocation = Arc::clone(&invocation);
    lambda_runtime::run(service_fn(move |event: LambdaEvent<Value>| {
        let invocation = Arc::clone(&handler_invocation);
        async move { my_handler(&invocation, event) }
    }))
    .await?;

    invocation.dispatcher().stop();

    Ok(())
}

fn my_handler(invocation: &Invocation, event: LambdaEvent<Value>) -> Result<Value, Error> {
    let (payload, ctx) = event.into_parts();
    debug!("Context: {:?}", ctx);

    let output = invocation.handle(serde_json::to_vec(&payload)?, &InvocationContext::from(&ctx))?;

    Ok(output_value(&output))
}

/// The runtime serializes the return value itself, so output that is not JSON is returned as a JSON string.
fn output_value(output: &[u8]) -> Value {
    serde_json::from_slice(output).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(output).into_owned()))
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn output_value_keeps_json_and_wraps_text() {
        assert_eq!(output_value(br#"{"records":1}"#), json!({"records": 1}));
        assert_eq!(output_value(b"done"), json!("done"));
    }
}

/// Initializes the tracing from RUST_LOG env var if present or sets minimal logging:
/// - INFO for the pet store crates
/// - ERROR for everything else
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("error,pet_store_lambda=info,serverless_web=info,function_adapter=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .without_time()
        .with_target(false)
        .compact()
        .init();
}

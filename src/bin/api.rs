use std::sync::Arc;

use lambda_runtime::{Error, LambdaEvent, run, service_fn};
use serde_json::Value;
use stitcher::Stitcher;
use stitcher::api::handler;
use stitcher::core::config::AppConfig;

#[tokio::main]
async fn main() -> Result<(), Error> {
    let config = AppConfig::from_env()?;
    stitcher::setup_logging(config.log_level);

    let shared_config = aws_config::from_env().load().await;
    let app = Arc::new(Stitcher::with_aws(config, &shared_config));

    run(service_fn(move |event: LambdaEvent<Value>| {
        let app = Arc::clone(&app);
        async move { handler(&app, event).await }
    }))
    .await
}

use std::time::Duration;

use mcd_client::{CallOptions, ExponentialBackoffJitter, McdClient, McdError, Operation};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = std::fs::read_to_string(
        std::env::args()
            .nth(1)
            .unwrap_or_else(|| "montecarlo.yml".to_owned()),
    )?;
    let client = McdClient::from_env()?;

    let op = Operation::new(
        "mutation applyConfig($config: String!) { \
           applyConfig(config: $config) { response { resourceModifications { type description } } } \
         }",
    )
    .variable("config", config);
    let call = CallOptions::new()
        .idempotency_key(uuid::Uuid::new_v4().to_string())
        .idempotent_retry(ExponentialBackoffJitter::new(
            Duration::from_secs(4),
            Duration::from_secs(64),
        ));

    match client.execute_with(&op, &call).await {
        Ok(response) => println!("{:#}", response.data().to_snake_case()),
        Err(McdError::RequestInProgress { idempotency_key, .. }) => {
            println!("still applying; check again later with key {idempotency_key}");
        }
        Err(err) => return Err(err.into()),
    }
    Ok(())
}

use mcd_client::{McdClient, Operation};
use tracing_subscriber::EnvFilter;

const GET_TABLES: &str = "query getTables($first: Int, $after: String) {
  getTables(first: $first, after: $after) {
    edges { node { fullTableId isMonitored } }
    pageInfo { hasNextPage endCursor }
  }
}";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let client = McdClient::from_env()?;
    let mut cursor: Option<String> = None;

    loop {
        let mut op = Operation::new(GET_TABLES).variable("first", 100);
        if let Some(after) = &cursor {
            op = op.variable("after", after.as_str());
        }
        let response = client.execute(&op).await?;

        for edge in response.path("get_tables.edges").map(|n| n.items()).unwrap_or_default() {
            let table = edge.path("node.full_table_id").and_then(|n| n.as_str());
            let monitored = edge.path("node.is_monitored").and_then(|n| n.as_bool());
            println!("{} monitored={:?}", table.unwrap_or("<unknown>"), monitored);
        }

        let page_info = response.path("get_tables.page_info");
        let has_next = page_info
            .and_then(|n| n.get("has_next_page"))
            .and_then(|n| n.as_bool())
            .unwrap_or(false);
        if !has_next {
            break;
        }
        cursor = page_info
            .and_then(|n| n.get("end_cursor"))
            .and_then(|n| n.as_str())
            .map(str::to_owned);
    }

    Ok(())
}

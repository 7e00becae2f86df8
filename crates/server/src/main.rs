#[tokio::main]
async fn main() -> anyhow::Result<()> {
    firstaid_server::run().await
}

//! Entry point for the space reconciliation daemon.

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    space_shelld::run(args).await
}

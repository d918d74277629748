#[tokio::main]
async fn main() {
  if let Err(e) = powerlog_lib::run().await {
    tracing::error!(error = %e, "Failed to start server");
    std::process::exit(1);
  }
}

use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let addr = format!("127.0.0.1:{port}");
    let listener = TcpListener::bind(&addr).await?;
    let router = match std::env::var("MOCK_TOKEN") {
        Ok(token) if !token.is_empty() => mock_server::app_with_token(token),
        _ => mock_server::app(),
    };
    tracing::info!(%addr, "mock school-data API listening");
    mock_server::run_with(listener, router).await
}

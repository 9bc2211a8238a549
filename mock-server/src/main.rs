use std::path::PathBuf;

use log::info;
use mock_server::AppState;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let port = std::env::var("PORT").unwrap_or_else(|_| "8000".to_string());
    // Downloads without an explicit folder land here.
    let download_dir = std::env::var_os("DOWNLOAD_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(std::env::temp_dir);
    tokio::fs::create_dir_all(&download_dir).await?;

    let addr = format!("127.0.0.1:{port}");
    let listener = TcpListener::bind(&addr).await?;
    info!("listening on {addr}, downloads to {}", download_dir.display());
    mock_server::serve(listener, AppState::new(download_dir)).await
}

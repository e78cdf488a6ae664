/**
 * EduFlex Server Entry Point
 *
 * Starts the Axum progress server.
 */

#[cfg(feature = "ssr")]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    use eduflex::backend::auth::create_token;
    use eduflex::backend::server::{create_app_with_config, ServerConfig};

    // Load environment variables from .env file if present
    dotenv::dotenv().ok();

    // Initialize tracing with DEBUG level by default
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "debug".to_string());
    eprintln!("[STARTUP] Setting RUST_LOG={}", env_filter);

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(&env_filter))
        .init();

    let config = ServerConfig::from_env();

    if let Some(user_id) = config.dev_user_id {
        let token = create_token(user_id, None)?;
        tracing::info!("Development token for user {}: {}", user_id, token);
    }

    let app = create_app_with_config(&config).await;

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    eprintln!("[STARTUP] Listening on {}", addr);
    eprintln!("[STARTUP] Client should connect to http://127.0.0.1:{}", config.port);
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(not(feature = "ssr"))]
fn main() {
    eprintln!("Server requires the 'ssr' feature to be enabled.");
    eprintln!("Run with: cargo run --bin eduflex-server --features ssr");
    std::process::exit(1);
}

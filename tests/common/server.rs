//! Progress server helpers for integration tests
//!
//! Runs the real router on `127.0.0.1:0`. A switch in front of it answers
//! 503 for every request while the server is "down", so outages can be
//! simulated without losing the port.

use axum::{
    extract::Request,
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use eduflex::backend::routes::create_router;
use eduflex::backend::server::AppState;
use eduflex::client::config::Config;
use eduflex::shared::{AppConfig, AppConfigBuilder};

pub struct TestServer {
    pub addr: SocketAddr,
    pub state: AppState,
    available: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

impl TestServer {
    pub async fn spawn() -> Self {
        let state = AppState::in_memory();
        let available = Arc::new(AtomicBool::new(true));

        let switch = available.clone();
        let app = create_router(state.clone()).layer(middleware::from_fn(
            move |request: Request, next: Next| {
                let switch = switch.clone();
                async move {
                    if switch.load(Ordering::SeqCst) {
                        next.run(request).await
                    } else {
                        unavailable()
                    }
                }
            },
        ));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test server");
        let addr = listener.local_addr().expect("Failed to read local address");
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("Test server failed");
        });

        Self {
            addr,
            state,
            available,
            handle,
        }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Client settings pointing at this server
    pub fn client_builder(&self) -> AppConfigBuilder {
        AppConfig::builder()
            .server_url(self.url())
            .request_timeout(Duration::from_secs(2))
            .sync_interval(Duration::from_secs(60))
    }

    pub fn client_config(&self, token: Option<&str>) -> Config {
        let mut config = Config::with_builder(self.client_builder()).expect("Invalid test client config");
        config.set_token(token.map(str::to_owned));
        config
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn unavailable() -> Response {
    (StatusCode::SERVICE_UNAVAILABLE, "maintenance").into_response()
}

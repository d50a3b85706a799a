//! Mock upstream API lifecycle management
//!
//! Spawns an axum router on a random local port. When dropped, the server
//! gracefully shuts down.

use axum::Router;
use tokio::net::TcpListener;

pub struct MockApiServer {
    /// Base URL for making requests (e.g., "http://127.0.0.1:12345")
    pub base_url: String,

    /// The port the server is listening on
    pub port: u16,

    _shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl MockApiServer {
    /// Serves `app` on 127.0.0.1 with an OS-assigned port.
    ///
    /// # Panics
    ///
    /// Panics if the port cannot be bound.
    pub async fn spawn(app: Router) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");

        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .expect("Server failed");
        });

        // The listener is already bound, so requests queue until serve() accepts them.
        Self {
            base_url: format!("http://127.0.0.1:{}", port),
            port,
            _shutdown_tx: Some(shutdown_tx),
        }
    }
}

impl Drop for MockApiServer {
    fn drop(&mut self) {
        if let Some(tx) = self._shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

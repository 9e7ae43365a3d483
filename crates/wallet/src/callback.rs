use anyhow::{Result, anyhow};
use axum::extract::{RawQuery, State};
use axum::response::Html;
use axum::routing::get;
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, oneshot};
use tracing::{debug, info};
use zklogin::oauth::ID_TOKEN_PARAM;

pub const CALLBACK_PATH: &str = "/callback";

// The id_token arrives in the URL fragment, which browsers never send to the
// server. This page re-requests itself with the fragment moved into the query.
const RELAY_PAGE: &str = r#"<!doctype html>
<html>
<head><title>Sui zkLogin wallet</title></head>
<body>
<p id="status">Completing sign-in...</p>
<script>
  if (window.location.hash.length > 1) {
    window.location.replace(window.location.pathname + "?" + window.location.hash.substring(1));
  } else {
    document.getElementById("status").textContent = "No identity token found in this redirect.";
  }
</script>
</body>
</html>"#;

const DONE_PAGE: &str = r#"<!doctype html>
<html>
<head><title>Sui zkLogin wallet</title></head>
<body><p>Sign-in received. You can close this window and return to the terminal.</p></body>
</html>"#;

type Sender = Arc<Mutex<Option<oneshot::Sender<String>>>>;

/// Local HTTP listener that receives the OAuth redirect once.
pub struct CallbackServer {
    addr: SocketAddr,
    redirect: oneshot::Receiver<String>,
    shutdown: Option<oneshot::Sender<()>>,
}

async fn handle_callback(State(sender): State<Sender>, RawQuery(query): RawQuery) -> Html<&'static str> {
    match query {
        Some(query) if query.split('&').any(|pair| pair.starts_with(&format!("{}=", ID_TOKEN_PARAM))) => {
            debug!("Callback received with identity token");
            if let Some(tx) = sender.lock().await.take() {
                let _ = tx.send(format!("?{}", query));
            }
            Html(DONE_PAGE)
        }
        _ => Html(RELAY_PAGE),
    }
}

impl CallbackServer {
    pub async fn start(port: u16) -> Result<Self> {
        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port)).await?;
        let addr = listener.local_addr()?;

        let (redirect_tx, redirect_rx) = oneshot::channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let sender: Sender = Arc::new(Mutex::new(Some(redirect_tx)));

        let app = Router::new()
            .route(CALLBACK_PATH, get(handle_callback))
            .with_state(sender);

        tokio::spawn(async move {
            let server = axum::serve(listener, app).with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            });
            if let Err(e) = server.await {
                tracing::error!("Callback listener stopped: {}", e);
            }
        });

        info!("Listening for the OAuth redirect on http://{}{}", addr, CALLBACK_PATH);
        Ok(Self {
            addr,
            redirect: redirect_rx,
            shutdown: Some(shutdown_tx),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Wait for the redirect query (`?id_token=...`) and stop listening.
    pub async fn wait(mut self, timeout: Duration) -> Result<String> {
        let received = tokio::time::timeout(timeout, &mut self.redirect).await;
        self.stop();
        match received {
            Ok(Ok(redirect)) => Ok(redirect),
            Ok(Err(_)) => Err(anyhow!("callback listener closed before a redirect arrived")),
            Err(_) => Err(anyhow!("timed out waiting for the OAuth redirect")),
        }
    }

    fn stop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }
}

impl Drop for CallbackServer {
    fn drop(&mut self) {
        self.stop();
    }
}

use anyhow::{Context, Result};
use axum::{routing::get, Router};
use tokio::net::TcpListener;
use tracing::info;

pub const ALIVE_BODY: &str = "Bot is running!";

async fn alive() -> &'static str {
    ALIVE_BODY
}

/// Single-route app answering host-platform liveness probes.
pub fn router() -> Router {
    Router::new().route("/", get(alive))
}

/// Bind `0.0.0.0:{port}` and serve the liveness route until the process exits.
pub async fn serve(port: u16) -> Result<()> {
    let addr = format!("0.0.0.0:{port}");
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind health endpoint to {addr}"))?;
    serve_on(listener).await
}

pub async fn serve_on(listener: TcpListener) -> Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!("Health endpoint listening on http://{}", addr);
    }
    axum::serve(listener, router())
        .await
        .context("Health endpoint server error")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn spawn_server() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = serve_on(listener).await;
        });
        format!("http://{}", addr)
    }

    fn client() -> reqwest::Client {
        reqwest::Client::builder().no_proxy().build().unwrap()
    }

    #[tokio::test]
    async fn test_root_returns_ack() {
        let base = spawn_server().await;
        let response = client().get(format!("{base}/")).send().await.unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        assert!(content_type.starts_with("text/plain"));
        assert_eq!(response.text().await.unwrap(), ALIVE_BODY);
    }

    #[tokio::test]
    async fn test_other_paths_are_not_found() {
        let base = spawn_server().await;
        let response = client().get(format!("{base}/status")).send().await.unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_post_is_rejected() {
        let base = spawn_server().await;
        let response = client()
            .post(format!("{base}/"))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::METHOD_NOT_ALLOWED);
    }
}

//! Shared fixtures for tests that run against a mock provider.

use oauth2::{AccessToken, ClientId, ClientSecret, RefreshToken};
use reqwest::Client;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::auth::{RefreshTokenProvider, StaticToken};
use crate::client::ApiClient;
use crate::config::DriveConfig;

pub(crate) const TEST_TOKEN: &str = "test-access-token";

/// Configuration pointing both the API and the token endpoint at `server`.
pub(crate) fn test_config(server: &MockServer) -> DriveConfig {
    config_at(&server.uri())
}

fn config_at(base: &str) -> DriveConfig {
    DriveConfig {
        drive_api_url: base.to_string(),
        oauth2_url: base.to_string(),
        client_id: ClientId::new("test-client".to_string()),
        client_secret: ClientSecret::new("test-secret".to_string()),
        refresh_token: RefreshToken::new("test-refresh".to_string()),
        grant_type: "refresh_token".to_string(),
        download_chunk_size: 4,
    }
}

pub(crate) fn test_api(server: &MockServer) -> Arc<ApiClient> {
    let credentials = Arc::new(test_config(server).credentials().expect("valid test config"));
    let http = Client::new();
    let tokens = Arc::new(RefreshTokenProvider::new(http.clone(), credentials.clone()));
    Arc::new(ApiClient::new(http, credentials, tokens))
}

/// API client for `base` that always presents [`TEST_TOKEN`].
pub(crate) fn static_api(base: &str) -> Arc<ApiClient> {
    let credentials = Arc::new(config_at(base).credentials().expect("valid test config"));
    let tokens = Arc::new(StaticToken(AccessToken::new(TEST_TOKEN.to_string())));
    Arc::new(ApiClient::new(Client::new(), credentials, tokens))
}

/// Serve [`TEST_TOKEN`] from `POST /token`.
pub(crate) async fn mount_token(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"access_token": TEST_TOKEN})),
        )
        .mount(server)
        .await;
}

/// Serve one `200` response advertising `advertised` bytes but sending only
/// `body`, then close the connection. Returns the base URL.
pub(crate) async fn truncated_response_server(advertised: usize, body: &'static str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        read_request(&mut socket).await;

        let response = format!(
            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nContent-Type: text/plain\r\n\r\n{}",
            advertised, body
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.unwrap();
    });

    format!("http://{}", addr)
}

/// Consume the request head and its declared body.
async fn read_request(socket: &mut tokio::net::TcpStream) {
    let mut received = Vec::new();
    let mut buf = [0u8; 1024];
    loop {
        let n = socket.read(&mut buf).await.unwrap();
        if n == 0 {
            return;
        }
        received.extend_from_slice(&buf[..n]);

        let Some(head_end) = received.windows(4).position(|w| w == b"\r\n\r\n") else {
            continue;
        };
        let head = String::from_utf8_lossy(&received[..head_end]).to_lowercase();
        let body_len = head
            .lines()
            .find_map(|line| line.strip_prefix("content-length:"))
            .and_then(|value| value.trim().parse::<usize>().ok())
            .unwrap_or(0);
        if received.len() >= head_end + 4 + body_len {
            return;
        }
    }
}

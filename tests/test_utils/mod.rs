//! Test utilities for integration tests
#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use errand::google::GoogleApi;
use errand::google::oauth::GoogleAuth;
use errand::ordering::driver::DeliveryAddress;
use errand::ordering::testing::{FakeLauncher, FakePage};
use errand::ordering::{DriverSettings, OrderingDriver};

pub const ACCESS_TOKEN: &str = "ya29.test-token";

/// A `GoogleApi` whose token endpoint and API bases all point at the
/// mock server, with a refresh token already saved in a temp dir.
///
/// Keep the returned `TempDir` alive for the duration of the test.
pub fn google_api(server_url: &str) -> (TempDir, GoogleApi) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let token_path = dir.path().join("token.json");
    std::fs::write(
        &token_path,
        r#"{"client_id": "client-id", "client_secret": "client-secret", "refresh_token": "refresh-1"}"#,
    )
    .expect("Failed to write token file");

    let auth = GoogleAuth::new(dir.path().join("credentials.json"), token_path)
        .with_token_url(&format!("{}/token", server_url));
    let google = GoogleApi::with_base_urls(
        auth,
        &format!("{}/calendar/v3", server_url),
        &format!("{}/gmail/v1", server_url),
    );
    (dir, google)
}

/// A `GoogleApi` with neither a credentials file nor a token.
pub fn unauthorized_google_api(server_url: &str) -> (TempDir, GoogleApi) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let auth = GoogleAuth::new(dir.path().join("credentials.json"), dir.path().join("token.json"))
        .with_token_url(&format!("{}/token", server_url));
    let google = GoogleApi::with_base_urls(
        auth,
        &format!("{}/calendar/v3", server_url),
        &format!("{}/gmail/v1", server_url),
    );
    (dir, google)
}

pub async fn mock_token(server: &mut mockito::ServerGuard) -> mockito::Mock {
    server
        .mock("POST", "/token")
        .match_body(mockito::Matcher::UrlEncoded(
            "grant_type".to_string(),
            "refresh_token".to_string(),
        ))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(format!(
            r#"{{"access_token": "{}", "expires_in": 3599, "token_type": "Bearer"}}"#,
            ACCESS_TOKEN
        ))
        .create_async()
        .await
}

/// Driver over `page` with no pacing and short waits, writing
/// screenshots under `dir`.
pub fn ordering_driver(page: FakePage, dir: &Path) -> Arc<OrderingDriver> {
    let settings = DriverSettings {
        order_url: "https://order.example.com/menu".to_string(),
        screenshot_dir: dir.join("screenshots"),
        slow_mo: Duration::ZERO,
        settle_delay: Duration::ZERO,
        field_pause: Duration::ZERO,
        wait_timeout: Duration::from_millis(20),
        poll_interval: Duration::from_millis(5),
        address: DeliveryAddress::default(),
    };
    let launcher = Arc::new(FakeLauncher::new(page));
    Arc::new(OrderingDriver::new(launcher, settings))
}

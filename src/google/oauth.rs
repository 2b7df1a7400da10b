//! OAuth2 credentials for the Google APIs.
//!
//! The refresh token lives in a local token file. `get_credential`
//! prefers that cached token and only falls back to the interactive
//! consent flow when there is none. Access tokens are never cached:
//! every Google operation reads the token file and exchanges the
//! refresh token for a fresh access token.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::{AppConfig, ErrandError};

pub const AUTH_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/v2/auth";
pub const TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";
pub const REDIRECT_URI: &str = "http://localhost";
pub const SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/calendar",
    "https://www.googleapis.com/auth/gmail.modify",
];

/// What gets persisted to the token file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credential {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
}

#[derive(Debug, Deserialize)]
struct ClientSecrets {
    client_id: Option<String>,
    client_secret: Option<String>,
}

// Google's downloaded credential file nests the secrets under
// "installed" or "web". A flat document is accepted too.
#[derive(Debug, Deserialize)]
struct CredentialsFile {
    installed: Option<ClientSecrets>,
    web: Option<ClientSecrets>,
    client_id: Option<String>,
    client_secret: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenFile {
    client_id: Option<String>,
    client_secret: Option<String>,
    refresh_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: Option<String>,
}

/// Exchange an authorization code from the consent screen for tokens.
pub async fn exchange_code_for_token(
    token_url: &str,
    client_id: &str,
    client_secret: &str,
    code: &str,
    redirect_uri: &str,
) -> Result<TokenResponse> {
    let params = [
        ("client_id", client_id),
        ("client_secret", client_secret),
        ("code", code),
        ("grant_type", "authorization_code"),
        ("redirect_uri", redirect_uri),
    ];
    post_token_form(token_url, &params).await
}

/// Get a fresh access token using a refresh token.
pub async fn refresh_access_token(
    token_url: &str,
    client_id: &str,
    client_secret: &str,
    refresh_token: &str,
) -> Result<TokenResponse> {
    let params = [
        ("client_id", client_id),
        ("client_secret", client_secret),
        ("refresh_token", refresh_token),
        ("grant_type", "refresh_token"),
    ];
    post_token_form(token_url, &params).await
}

async fn post_token_form(token_url: &str, params: &[(&str, &str)]) -> Result<TokenResponse> {
    let res = reqwest::Client::new()
        .post(token_url)
        .form(params)
        .send()
        .await
        .map_err(|e| ErrandError::authentication(format!("Token request failed: {}", e)))?;
    let status = res.status();
    let text = res.text().await.unwrap_or_default();
    if !status.is_success() {
        return Err(ErrandError::authentication(format!(
            "Token endpoint returned {} ({})",
            status, text
        ))
        .into());
    }
    let token: TokenResponse = serde_json::from_str(&text)
        .map_err(|e| ErrandError::authentication(format!("Invalid token response: {}", e)))?;
    Ok(token)
}

/// Build the consent URL the user opens in a browser.
pub fn consent_url(client_id: &str, redirect_uri: &str) -> String {
    format!(
        "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&access_type=offline&prompt=consent",
        AUTH_ENDPOINT,
        urlencoding::encode(client_id),
        urlencoding::encode(redirect_uri),
        urlencoding::encode(&SCOPES.join(" "))
    )
}

/// Accept either the bare code or the whole redirect URL the browser
/// landed on (`http://localhost/?code=...&scope=...`).
pub fn extract_code(input: &str) -> Option<String> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }
    if !input.contains("code=") {
        return Some(input.to_string());
    }
    let query = input.split_once('?').map(|(_, q)| q).unwrap_or(input);
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(k, _)| *k == "code")
        .and_then(|(_, v)| urlencoding::decode(v).ok())
        .map(|v| v.into_owned())
        .filter(|v| !v.is_empty())
}

pub struct GoogleAuth {
    credentials_path: PathBuf,
    token_path: PathBuf,
    token_url: String,
}

impl GoogleAuth {
    pub fn new(credentials_path: impl Into<PathBuf>, token_path: impl Into<PathBuf>) -> Self {
        Self {
            credentials_path: credentials_path.into(),
            token_path: token_path.into(),
            token_url: TOKEN_ENDPOINT.to_string(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(&config.google_credentials_path, &config.google_token_path)
    }

    /// Point the token exchange somewhere else (used by tests).
    pub fn with_token_url(mut self, token_url: &str) -> Self {
        self.token_url = token_url.to_string();
        self
    }

    pub fn token_path(&self) -> &Path {
        &self.token_path
    }

    /// Read the client id and secret from the credentials file.
    pub fn client_secrets(&self) -> Result<(String, String)> {
        let raw = std::fs::read_to_string(&self.credentials_path).map_err(|e| {
            ErrandError::authentication(format!(
                "Could not read credentials file {}: {}",
                self.credentials_path.display(),
                e
            ))
        })?;
        let file: CredentialsFile = serde_json::from_str(&raw).map_err(|e| {
            ErrandError::authentication(format!("Malformed credentials file: {}", e))
        })?;

        let (client_id, client_secret) = match file.installed.or(file.web) {
            Some(nested) => (nested.client_id, nested.client_secret),
            None => (file.client_id, file.client_secret),
        };
        match (client_id, client_secret) {
            (Some(id), Some(secret)) if !id.is_empty() && !secret.is_empty() => Ok((id, secret)),
            _ => Err(ErrandError::authentication(
                "Credentials file is missing client_id or client_secret",
            )
            .into()),
        }
    }

    /// The persisted credential, if a usable one exists. Client
    /// secrets missing from the token file are filled in from the
    /// credentials file.
    pub fn cached_credential(&self) -> Result<Option<Credential>> {
        if !self.token_path.exists() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(&self.token_path)
            .with_context(|| format!("Reading token file {}", self.token_path.display()))?;
        let token: TokenFile = match serde_json::from_str(&raw) {
            Ok(t) => t,
            Err(e) => {
                tracing::warn!("Ignoring unreadable token file: {}", e);
                return Ok(None);
            }
        };
        let Some(refresh_token) = token.refresh_token.filter(|t| !t.is_empty()) else {
            return Ok(None);
        };

        let (client_id, client_secret) = match (token.client_id, token.client_secret) {
            (Some(id), Some(secret)) if !id.is_empty() && !secret.is_empty() => (id, secret),
            _ => self.client_secrets()?,
        };

        Ok(Some(Credential {
            client_id,
            client_secret,
            refresh_token,
        }))
    }

    pub fn save(&self, credential: &Credential) -> Result<()> {
        if let Some(parent) = self.token_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(credential)?;
        std::fs::write(&self.token_path, json)
            .with_context(|| format!("Writing token file {}", self.token_path.display()))?;
        tracing::info!("Saved Google token to {}", self.token_path.display());
        Ok(())
    }

    /// Cached token first, interactive consent otherwise.
    pub async fn get_credential(&self) -> Result<Credential> {
        if let Some(credential) = self.cached_credential()? {
            return Ok(credential);
        }
        tracing::info!("No cached Google token, starting consent flow");
        self.consent().await
    }

    /// Run the interactive consent flow and overwrite the token file.
    pub async fn consent(&self) -> Result<Credential> {
        let (client_id, client_secret) = self.client_secrets()?;

        println!(
            "\nOpen the following URL in your browser and authorize access:\n\n{}\n",
            consent_url(&client_id, REDIRECT_URI)
        );
        println!("The browser will be redirected to {} (the page may not load).", REDIRECT_URI);

        let pasted = tokio::task::spawn_blocking(|| -> io::Result<String> {
            print!("Paste the redirected URL or the code here: ");
            io::stdout().flush()?;
            let mut line = String::new();
            io::stdin().read_line(&mut line)?;
            Ok(line)
        })
        .await?
        .map_err(|e| ErrandError::authentication(format!("Could not read code: {}", e)))?;

        let code = extract_code(&pasted)
            .ok_or(ErrandError::authentication("No authorization code provided"))?;

        let token = exchange_code_for_token(
            &self.token_url,
            &client_id,
            &client_secret,
            &code,
            REDIRECT_URI,
        )
        .await?;
        let refresh_token = token.refresh_token.ok_or(ErrandError::authentication(
            "No refresh token in response",
        ))?;

        let credential = Credential {
            client_id,
            client_secret,
            refresh_token,
        };
        self.save(&credential)?;
        Ok(credential)
    }

    /// A fresh access token for one Google operation.
    pub async fn access_token(&self) -> Result<String> {
        let credential = self.get_credential().await?;
        let token = refresh_access_token(
            &self.token_url,
            &credential.client_id,
            &credential.client_secret,
            &credential.refresh_token,
        )
        .await?;

        // Google may rotate the refresh token
        if let Some(rotated) = token.refresh_token.as_ref()
            && *rotated != credential.refresh_token
        {
            self.save(&Credential {
                refresh_token: rotated.clone(),
                ..credential
            })?;
        }

        Ok(token.access_token)
    }
}

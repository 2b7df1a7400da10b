use anyhow::Result;

use crate::core::AppConfig;
use crate::google::oauth::GoogleAuth;

/// Run the consent flow even when a token is already saved, e.g. to
/// switch accounts or after the refresh token was revoked.
pub async fn run(config: &AppConfig) -> Result<()> {
    let auth = GoogleAuth::from_config(config);
    auth.consent().await?;
    // Make sure the new token actually works
    auth.access_token().await?;
    println!("Saved Google credentials to {}", auth.token_path().display());
    Ok(())
}

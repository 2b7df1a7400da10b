use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_ORDER_URL: &str = "https://order.example.com/menu";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub openai_api_hostname: String,
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub system_message: String,
    pub google_credentials_path: PathBuf,
    pub google_token_path: PathBuf,
    pub default_timezone: String,
    pub order_url: String,
    pub slow_mo: Duration,
    pub headless: bool,
    pub screenshot_dir: PathBuf,
}

impl AppConfig {
    /// Build the config from any key lookup. `Default` uses the process
    /// environment; tests pass a closure over a fixed map.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let openai_api_hostname = lookup("ERRAND_LLM_HOST")
            .unwrap_or_else(|| "https://api.openai.com".to_string());
        let openai_api_key = lookup("OPENAI_API_KEY").filter(|k| !k.trim().is_empty());
        let openai_model =
            lookup("ERRAND_LLM_MODEL").unwrap_or_else(|| "gpt-4.1-mini".to_string());
        let system_message = lookup("ERRAND_SYSTEM_MESSAGE").unwrap_or_else(default_system_message);
        let google_credentials_path = lookup("ERRAND_GOOGLE_CREDENTIALS")
            .unwrap_or_else(|| "credentials.json".to_string())
            .into();
        let google_token_path = lookup("ERRAND_GOOGLE_TOKEN")
            .unwrap_or_else(|| "token.json".to_string())
            .into();
        let default_timezone = lookup("ERRAND_TIMEZONE").unwrap_or_else(|| "UTC".to_string());
        let order_url = lookup("ERRAND_ORDER_URL").unwrap_or_else(|| DEFAULT_ORDER_URL.to_string());
        let slow_mo = lookup("ERRAND_SLOW_MO_MS")
            .and_then(|ms| ms.trim().parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(Duration::ZERO);
        let headless = lookup("ERRAND_HEADLESS")
            .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);
        let screenshot_dir = lookup("ERRAND_SCREENSHOT_DIR")
            .unwrap_or_else(|| "screenshots".to_string())
            .into();

        Self {
            openai_api_hostname,
            openai_api_key,
            openai_model,
            system_message,
            google_credentials_path,
            google_token_path,
            default_timezone,
            order_url,
            slow_mo,
            headless,
            screenshot_dir,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        // A missing .env file is fine, everything has a default
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }
}

fn default_system_message() -> String {
    String::from(
        "You are a helpful assistant that can manage the user's Google Calendar and Gmail \
         and order food from their usual restaurant. Use the available tools when the user \
         asks for something they can do. When a tool reports an error, explain it plainly.",
    )
}

use anyhow::Result;

use crate::core::AppConfig;
use crate::ordering::OrderingDriver;

pub async fn run(config: &AppConfig, category: Option<&str>) -> Result<()> {
    let driver = OrderingDriver::from_config(config);
    let menu = driver.browse_menu(category).await;
    driver.shutdown().await;
    println!("{}", serde_json::to_string_pretty(&menu)?);
    Ok(())
}

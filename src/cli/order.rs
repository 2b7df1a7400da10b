use anyhow::Result;

use crate::core::AppConfig;
use crate::ordering::OrderingDriver;

pub async fn run(config: &AppConfig, item: &str, quantity: u32) -> Result<()> {
    let driver = OrderingDriver::from_config(config);
    let result = driver.order_food_item(item, quantity).await;
    println!("{}", serde_json::to_string_pretty(&result)?);

    // Keep a visible browser open so the cart can be reviewed
    if !config.headless && driver.is_open().await {
        println!("Press Enter to close the browser.");
        let _ = tokio::task::spawn_blocking(|| {
            let mut line = String::new();
            std::io::stdin().read_line(&mut line)
        })
        .await;
    }
    driver.shutdown().await;
    Ok(())
}

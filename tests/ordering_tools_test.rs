mod test_utils;

#[cfg(test)]
mod tests {
    use std::path::Path;

    use serde_json::Value;
    use tempfile::TempDir;

    use errand::ai::tools::{BrowseMenuTool, CartAction, CartTool, OrderFoodItemTool};
    use errand::openai::ToolCall;
    use errand::ordering::testing::FakePage;

    use crate::test_utils::ordering_driver;

    const CARDS: &str = "[data-testid='menu-item']";

    fn menu_page() -> FakePage {
        FakePage::new()
            .with(
                CARDS,
                &[
                    "Everything Bagel\n$2.75\nToasted with butter",
                    "$3.00\nSOLD OUT",
                    "Iced Coffee\n$3.25",
                ],
            )
            .with_attribute(CARDS, 1, "aria-label", "Lox Spread")
            .with_attribute(CARDS, 0, "data-category", "Bagels")
            .with_attribute(CARDS, 1, "data-category", "Spreads")
            .with_attribute(CARDS, 2, "data-category", "Drinks")
    }

    #[tokio::test]
    async fn it_reports_an_absent_item_without_failing_the_call() {
        let dir = TempDir::new().unwrap();
        let driver = ordering_driver(menu_page(), dir.path());
        let tool = OrderFoodItemTool::new(driver.clone());

        let out = tool
            .call(r#"{"itemName": "pastrami on rye"}"#)
            .await
            .unwrap();
        let result: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(result["success"], false);
        assert_eq!(result["found"], false);
        assert_eq!(result["state"], "failed");
        assert_eq!(result["requested_item"], "pastrami on rye");

        let screenshot = result["screenshot_path"].as_str().unwrap();
        assert!(!screenshot.is_empty());
        assert!(Path::new(screenshot).exists());
        driver.shutdown().await;
    }

    #[tokio::test]
    async fn it_rejects_a_zero_quantity() {
        let dir = TempDir::new().unwrap();
        let page = menu_page();
        let log = page.log.clone();
        let driver = ordering_driver(page, dir.path());
        let tool = OrderFoodItemTool::new(driver);

        let out = tool
            .call(r#"{"itemName": "bagel", "quantity": 0}"#)
            .await
            .unwrap();
        assert_eq!(out, "Error: Invalid arguments: `quantity` must be at least 1");
        // No browser was opened
        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn it_rejects_misspelled_and_oversized_arguments() {
        let dir = TempDir::new().unwrap();
        let page = menu_page();
        let log = page.log.clone();
        let driver = ordering_driver(page, dir.path());

        let order = OrderFoodItemTool::new(driver.clone());
        let out = order
            .call(r#"{"itemName": "bagel", "qty": 3}"#)
            .await
            .unwrap();
        assert!(
            out.starts_with("Error: Invalid arguments: unknown field `qty`"),
            "{}",
            out
        );

        let out = order
            .call(r#"{"itemName": "bagel", "quantity": 4000000000}"#)
            .await
            .unwrap();
        assert_eq!(out, "Error: Invalid arguments: `quantity` must be at most 99, got 4000000000");

        let out = CartTool::new(driver, CartAction::Get)
            .call(r#"{"confirm": true}"#)
            .await
            .unwrap();
        assert!(out.starts_with("Error: Invalid arguments: unknown field `confirm`"), "{}", out);

        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn it_renders_the_menu() {
        let dir = TempDir::new().unwrap();
        let driver = ordering_driver(menu_page(), dir.path());
        let tool = BrowseMenuTool::new(driver.clone());

        let out = tool.call("{}").await.unwrap();
        assert!(out.starts_with("# Menu\n1. Everything Bagel - $2.75"), "{}", out);
        assert!(out.contains("   Toasted with butter"));
        assert!(out.contains("2. Lox Spread - $3.00 [unavailable]"));
        assert!(out.contains("3. Iced Coffee - $3.25"));
        assert!(out.contains("Screenshot: "));
        driver.shutdown().await;
    }

    #[tokio::test]
    async fn it_filters_the_menu_by_category() {
        let dir = TempDir::new().unwrap();
        let driver = ordering_driver(menu_page(), dir.path());
        let tool = BrowseMenuTool::new(driver.clone());

        let out = tool.call(r#"{"category": "drinks"}"#).await.unwrap();
        assert!(out.starts_with("# Menu (drinks)\n1. Iced Coffee - $3.25"), "{}", out);
        assert!(!out.contains("Bagel"));

        let out = tool.call(r#"{"category": "Desserts"}"#).await.unwrap();
        assert_eq!(out, "No menu items found in category 'Desserts'.");
        driver.shutdown().await;
    }

    #[tokio::test]
    async fn it_describes_cart_actions_as_not_implemented() {
        let dir = TempDir::new().unwrap();
        let driver = ordering_driver(menu_page(), dir.path());

        for action in [CartAction::Get, CartAction::Clear, CartAction::Checkout] {
            let out = CartTool::new(driver.clone(), action)
                .call("{}")
                .await
                .unwrap();
            let result: Value = serde_json::from_str(&out).unwrap();
            assert_eq!(result["success"], false);
            assert!(
                result["message"]
                    .as_str()
                    .unwrap()
                    .contains("is not implemented yet")
            );
            // Nothing to photograph without an open session
            assert!(result["screenshot_path"].is_null());
        }
        assert!(!driver.is_open().await);
    }

    #[tokio::test]
    async fn it_screenshots_the_cart_once_a_session_is_open() {
        let dir = TempDir::new().unwrap();
        let driver = ordering_driver(menu_page(), dir.path());
        BrowseMenuTool::new(driver.clone()).call("{}").await.unwrap();

        let out = CartTool::new(driver.clone(), CartAction::Get)
            .call("")
            .await
            .unwrap();
        let result: Value = serde_json::from_str(&out).unwrap();
        let screenshot = result["screenshot_path"].as_str().unwrap();
        assert!(screenshot.contains("cart_"));
        driver.shutdown().await;
    }
}

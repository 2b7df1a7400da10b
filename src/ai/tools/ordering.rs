use std::sync::Arc;

use anyhow::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{NoArgs, NoProps, args, as_tool_text};
use crate::ai::prompt::{self, Prompt};
use crate::ordering::{CartResult, OrderingDriver};
use crate::openai::{Function, Property, ToolCall, ToolType};

#[derive(Serialize)]
pub struct BrowseMenuProps {
    pub category: Property,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BrowseMenuArgs {
    pub category: Option<String>,
}

#[derive(Serialize)]
pub struct BrowseMenuTool {
    pub r#type: ToolType,
    pub function: Function<BrowseMenuProps>,
    #[serde(skip)]
    driver: Arc<OrderingDriver>,
}

#[async_trait]
impl ToolCall for BrowseMenuTool {
    async fn call(&self, args: &str) -> Result<String, Error> {
        as_tool_text(self.function_name(), self.run(args).await)
    }

    fn function_name(&self) -> String {
        self.function.name.clone()
    }
}

impl BrowseMenuTool {
    pub fn new(driver: Arc<OrderingDriver>) -> Self {
        Self {
            r#type: ToolType::Function,
            function: Function::new(
                "browse_menu",
                "Show the items on the restaurant's online menu with prices and availability.",
                BrowseMenuProps {
                    category: Property::string(
                        "Only show items in this menu category, e.g. 'Bagels' or 'Drinks'.",
                    ),
                },
                &[],
            ),
            driver,
        }
    }

    async fn run(&self, args: &str) -> Result<String> {
        let fn_args: BrowseMenuArgs = args::parse(args)?;
        let menu = self.driver.browse_menu(fn_args.category.as_deref()).await;
        if let Some(error) = &menu.error {
            return Ok(serde_json::to_string_pretty(&menu).unwrap_or_else(|_| error.clone()));
        }
        if menu.items.is_empty() {
            return Ok(format!(
                "No menu items found{}.",
                menu.category
                    .as_ref()
                    .map(|c| format!(" in category '{}'", c))
                    .unwrap_or_default()
            ));
        }
        prompt::render(Prompt::Menu, &menu)
    }
}

#[derive(Serialize)]
pub struct OrderFoodItemProps {
    #[serde(rename = "itemName")]
    pub item_name: Property,
    pub quantity: Property,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct OrderFoodItemArgs {
    pub item_name: String,
    pub quantity: Option<u32>,
}

#[derive(Serialize)]
pub struct OrderFoodItemTool {
    pub r#type: ToolType,
    pub function: Function<OrderFoodItemProps>,
    #[serde(skip)]
    driver: Arc<OrderingDriver>,
}

#[async_trait]
impl ToolCall for OrderFoodItemTool {
    async fn call(&self, args: &str) -> Result<String, Error> {
        as_tool_text(self.function_name(), self.run(args).await)
    }

    fn function_name(&self) -> String {
        self.function.name.clone()
    }
}

impl OrderFoodItemTool {
    pub fn new(driver: Arc<OrderingDriver>) -> Self {
        let properties = OrderFoodItemProps {
            item_name: Property::string(
                "Name of the menu item to order. Partial names match, e.g. 'everything bagel'.",
            ),
            quantity: Property::integer("How many to order, 1 to 99 (default 1)."),
        };
        Self {
            r#type: ToolType::Function,
            function: Function::new(
                "order_food_item",
                "Add a menu item to the cart on the restaurant's ordering site with delivery selected and the delivery address filled in. Does not check out.",
                properties,
                &["itemName"],
            ),
            driver,
        }
    }

    async fn run(&self, args: &str) -> Result<String> {
        let fn_args: OrderFoodItemArgs = args::parse(args)?;
        args::require("itemName", &fn_args.item_name)?;
        let quantity = args::quantity(fn_args.quantity)?;
        let result = self
            .driver
            .order_food_item(fn_args.item_name.trim(), quantity)
            .await;
        Ok(serde_json::to_string_pretty(&result)?)
    }
}

#[derive(Debug, Clone, Copy)]
pub enum CartAction {
    Get,
    Clear,
    Checkout,
}

/// `get_cart`, `clear_cart` and `proceed_to_checkout`.
#[derive(Serialize)]
pub struct CartTool {
    pub r#type: ToolType,
    pub function: Function<NoProps>,
    #[serde(skip)]
    driver: Arc<OrderingDriver>,
    #[serde(skip)]
    action: CartAction,
}

#[async_trait]
impl ToolCall for CartTool {
    async fn call(&self, args: &str) -> Result<String, Error> {
        as_tool_text(self.function_name(), self.run(args).await)
    }

    fn function_name(&self) -> String {
        self.function.name.clone()
    }
}

impl CartTool {
    pub fn new(driver: Arc<OrderingDriver>, action: CartAction) -> Self {
        let (name, description) = match action {
            CartAction::Get => ("get_cart", "Show the items currently in the cart."),
            CartAction::Clear => ("clear_cart", "Remove every item from the cart."),
            CartAction::Checkout => (
                "proceed_to_checkout",
                "Go to checkout with the current cart. Does not place the order.",
            ),
        };
        Self {
            r#type: ToolType::Function,
            function: Function::new(name, description, NoProps {}, &[]),
            driver,
            action,
        }
    }

    async fn run(&self, args: &str) -> Result<String> {
        let _: NoArgs = args::parse(args)?;
        let result: CartResult = match self.action {
            CartAction::Get => self.driver.get_cart().await,
            CartAction::Clear => self.driver.clear_cart().await,
            CartAction::Checkout => self.driver.proceed_to_checkout().await,
        };
        Ok(serde_json::to_string_pretty(&result)?)
    }
}

//! Prioritized locator strategies for the ordering site. A chain is
//! tried top to bottom and the first strategy that finds at least one
//! element wins.

use std::time::Duration;

use tokio::time::{Instant, sleep};

use super::page::BrowserPage;

pub struct Locator {
    pub name: &'static str,
    pub selector: &'static str,
    /// Only keep elements whose text contains this, case-insensitively.
    pub text: Option<&'static str>,
}

const fn css(name: &'static str, selector: &'static str) -> Locator {
    Locator {
        name,
        selector,
        text: None,
    }
}

const fn with_text(name: &'static str, selector: &'static str, text: &'static str) -> Locator {
    Locator {
        name,
        selector,
        text: Some(text),
    }
}

pub struct LocatorChain {
    pub target: &'static str,
    pub locators: &'static [Locator],
}

/// The strategy that matched and the indices of its elements.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    pub strategy: &'static str,
    pub selector: &'static str,
    pub indices: Vec<usize>,
}

impl Resolved {
    pub fn first(&self) -> usize {
        self.indices.first().copied().unwrap_or_default()
    }
}

impl LocatorChain {
    async fn try_locator(page: &dyn BrowserPage, locator: &Locator) -> Vec<usize> {
        let texts = match page.texts(locator.selector).await {
            Ok(texts) => texts,
            Err(e) => {
                tracing::debug!("Locator '{}' errored: {}", locator.name, e);
                return vec![];
            }
        };
        match locator.text {
            None => (0..texts.len()).collect(),
            Some(needle) => {
                let needle = needle.to_lowercase();
                texts
                    .iter()
                    .enumerate()
                    .filter(|(_, t)| t.to_lowercase().contains(&needle))
                    .map(|(i, _)| i)
                    .collect()
            }
        }
    }

    /// Evaluate each strategy in order, stopping at the first with
    /// matches.
    pub async fn resolve(&self, page: &dyn BrowserPage) -> Option<Resolved> {
        for locator in self.locators {
            let indices = Self::try_locator(page, locator).await;
            if !indices.is_empty() {
                tracing::info!(
                    "Found {} via '{}' ({} element(s))",
                    self.target,
                    locator.name,
                    indices.len()
                );
                return Some(Resolved {
                    strategy: locator.name,
                    selector: locator.selector,
                    indices,
                });
            }
        }
        tracing::debug!("No strategy matched {}", self.target);
        None
    }

    /// Poll `resolve` until something matches or `timeout` elapses.
    pub async fn wait_for_any(
        &self,
        page: &dyn BrowserPage,
        timeout: Duration,
        poll: Duration,
    ) -> Option<Resolved> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(found) = self.resolve(page).await {
                return Some(found);
            }
            if Instant::now() >= deadline {
                tracing::warn!("Timed out after {:?} waiting for {}", timeout, self.target);
                return None;
            }
            sleep(poll).await;
        }
    }
}

pub const MENU_ITEMS: LocatorChain = LocatorChain {
    target: "menu items",
    locators: &[
        css("menu-item-testid", "[data-testid='menu-item']"),
        css("menu-item-class", ".menu-item"),
        css("item-card", ".item-card"),
        css("product-card", "[class*='product-card']"),
        css("menu-article", "main article"),
    ],
};

pub const MENU_CARDS: LocatorChain = LocatorChain {
    target: "menu cards",
    locators: MENU_ITEMS.locators,
};

pub const ORDER_MODAL: LocatorChain = LocatorChain {
    target: "order modal",
    locators: &[
        css("dialog-role", "[role='dialog']"),
        css("modal-testid", "[data-testid='item-modal']"),
        css("modal-class", ".modal.show, .modal[open], .modal"),
    ],
};

pub const DELIVERY_OPTION: LocatorChain = LocatorChain {
    target: "delivery option",
    locators: &[
        css("delivery-testid", "[data-testid='delivery-option']"),
        with_text("dialog-button-text", "[role='dialog'] button", "delivery"),
        css("delivery-radio", "input[type='radio'][value='delivery']"),
        with_text("label-text", "label", "delivery"),
        with_text("any-button-text", "button", "delivery"),
    ],
};

pub const UPDATE_BUTTON: LocatorChain = LocatorChain {
    target: "update button",
    locators: &[
        css("update-testid", "[data-testid='update-button']"),
        with_text("dialog-update-text", "[role='dialog'] button", "update"),
        with_text("dialog-confirm-text", "[role='dialog'] button", "confirm"),
        with_text("any-update-text", "button", "update"),
    ],
};

pub const STREET_FIELD: LocatorChain = LocatorChain {
    target: "street field",
    locators: &[
        css("street-name", "input[name='street']"),
        css("street-autocomplete", "input[autocomplete='address-line1']"),
        css("street-placeholder", "input[placeholder*='Street'], input[placeholder*='street']"),
        css("address-name", "input[name='address']"),
    ],
};

pub const APARTMENT_FIELD: LocatorChain = LocatorChain {
    target: "apartment field",
    locators: &[
        css("apartment-name", "input[name='apartment']"),
        css("apartment-autocomplete", "input[autocomplete='address-line2']"),
        css("apartment-placeholder", "input[placeholder*='Apt'], input[placeholder*='apt']"),
    ],
};

pub const ZIPCODE_FIELD: LocatorChain = LocatorChain {
    target: "zipcode field",
    locators: &[
        css("zipcode-name", "input[name='zipcode']"),
        css("zip-name", "input[name='zip']"),
        css("zip-autocomplete", "input[autocomplete='postal-code']"),
        css("zip-placeholder", "input[placeholder*='Zip'], input[placeholder*='zip']"),
    ],
};

pub const INSTRUCTIONS_FIELD: LocatorChain = LocatorChain {
    target: "delivery instructions field",
    locators: &[
        css("instructions-name", "textarea[name='instructions']"),
        css(
            "instructions-placeholder",
            "textarea[placeholder*='nstructions'], input[placeholder*='nstructions']",
        ),
        css("dialog-textarea", "[role='dialog'] textarea"),
    ],
};

pub const VERIFY_ADDRESS: LocatorChain = LocatorChain {
    target: "verify address button",
    locators: &[
        css("verify-testid", "[data-testid='verify-address']"),
        with_text("verify-text", "button", "verify address"),
        with_text("verify-short-text", "button", "verify"),
    ],
};

pub const QUANTITY_INCREMENT: LocatorChain = LocatorChain {
    target: "quantity increment",
    locators: &[
        css("increment-testid", "[data-testid='quantity-increment']"),
        css("increase-aria", "button[aria-label*='ncrease']"),
        css("add-one-aria", "button[aria-label*='Add one']"),
        with_text("plus-text", "[role='dialog'] button", "+"),
    ],
};

pub const ADD_TO_CART: LocatorChain = LocatorChain {
    target: "add to cart button",
    locators: &[
        css("add-to-cart-testid", "[data-testid='add-to-cart']"),
        with_text("add-to-cart-text", "button", "add to cart"),
        with_text("add-to-order-text", "button", "add to order"),
        with_text("add-to-bag-text", "button", "add to bag"),
    ],
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ordering::testing::FakePage;

    #[tokio::test]
    async fn it_stops_at_the_first_strategy_with_matches() {
        let page = FakePage::new()
            .with(".menu-item", &["Bagel", "Coffee"])
            .with("main article", &["Ignored"]);
        let found = MENU_ITEMS.resolve(&page).await.unwrap();
        assert_eq!(found.strategy, "menu-item-class");
        assert_eq!(found.indices, vec![0, 1]);
    }

    #[tokio::test]
    async fn it_filters_by_text() {
        let page = FakePage::new().with("button", &["Pickup", "Delivery"]);
        let found = DELIVERY_OPTION.resolve(&page).await.unwrap();
        assert_eq!(found.strategy, "any-button-text");
        assert_eq!(found.first(), 1);
    }

    #[tokio::test]
    async fn it_gives_up_after_the_timeout() {
        let page = FakePage::new();
        let found = ORDER_MODAL
            .wait_for_any(&page, Duration::from_millis(30), Duration::from_millis(10))
            .await;
        assert!(found.is_none());
    }
}

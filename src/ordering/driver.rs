//! Drives the ordering site: open the menu page once, then click through
//! the item modal, delivery settings and address form to add an item to
//! the cart. Every step after the item click is best effort and reported
//! in the result rather than aborting the flow.

use std::path::PathBuf;
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use anyhow::{Result, anyhow};
use chrono::{Local, NaiveDateTime};
use regex::Regex;
use tokio::sync::Mutex;
use tokio::time::{Instant, sleep};

use super::chrome::ChromeLauncher;
use super::locator::{self, LocatorChain};
use super::matching::{display_name, item_matches};
use super::page::{BrowserPage, PageLauncher};
use super::types::{CartResult, MenuItem, MenuResult, OrderResult, OrderState, StepOutcome};
use crate::core::{AppConfig, ErrandError};

/// Pause after the page reports ready. The menu keeps loading in the
/// background and never goes network idle.
pub const SETTLE_DELAY: Duration = Duration::from_secs(3);
/// Human pacing between address field fills.
pub const FIELD_PAUSE: Duration = Duration::from_millis(500);
pub const WAIT_TIMEOUT: Duration = Duration::from_secs(10);
pub const POLL_INTERVAL: Duration = Duration::from_millis(250);
/// Each extra item is one click on the increment control.
pub const MAX_QUANTITY: u32 = 99;

#[derive(Debug, Clone)]
pub struct DeliveryAddress {
    pub street: String,
    pub apartment: String,
    pub zipcode: String,
    pub instructions: String,
}

impl Default for DeliveryAddress {
    fn default() -> Self {
        Self {
            street: "123 Main St".to_string(),
            apartment: String::new(),
            zipcode: "10001".to_string(),
            instructions: "Leave at front door".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DriverSettings {
    pub order_url: String,
    pub screenshot_dir: PathBuf,
    /// Extra delay after every click and fill.
    pub slow_mo: Duration,
    pub settle_delay: Duration,
    pub field_pause: Duration,
    pub wait_timeout: Duration,
    pub poll_interval: Duration,
    pub address: DeliveryAddress,
}

impl DriverSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            order_url: config.order_url.clone(),
            screenshot_dir: config.screenshot_dir.clone(),
            slow_mo: config.slow_mo,
            settle_delay: SETTLE_DELAY,
            field_pause: FIELD_PAUSE,
            wait_timeout: WAIT_TIMEOUT,
            poll_interval: POLL_INTERVAL,
            address: DeliveryAddress::default(),
        }
    }
}

pub fn screenshot_name(tag: &str, at: NaiveDateTime) -> String {
    format!("{}_{}.png", tag, at.format("%Y%m%d_%H%M%S_%3f"))
}

// Compiled once for every menu card scraped
static PRICE_RE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\$\d+\.\d{2}").ok());

fn find_price(text: &str) -> Option<String> {
    let re = PRICE_RE.as_ref()?;
    re.find(text).map(|m| m.as_str().to_string())
}

fn is_status_line(line: &str) -> bool {
    let line = line.to_lowercase();
    line.starts_with('$') || line.contains("sold out") || line.contains("unavailable")
}

/// Turn the text of one menu card into an item. Returns `None` for cards
/// without a usable name.
pub fn parse_menu_card(
    text: &str,
    aria_label: Option<&str>,
    category: Option<&str>,
) -> Option<MenuItem> {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !is_status_line(l))
        .collect();
    let name = lines
        .first()
        .map(|l| l.to_string())
        .or_else(|| aria_label.map(str::trim).filter(|l| !l.is_empty()).map(str::to_string))?;
    let lower = text.to_lowercase();

    Some(MenuItem {
        description: lines.get(1).map(|l| l.to_string()),
        price: find_price(text),
        category: category.map(str::to_string),
        available: !(lower.contains("sold out") || lower.contains("unavailable")),
        name,
    })
}

pub struct OrderingDriver {
    launcher: Arc<dyn PageLauncher>,
    session: Mutex<Option<Box<dyn BrowserPage>>>,
    settings: DriverSettings,
}

impl OrderingDriver {
    pub fn new(launcher: Arc<dyn PageLauncher>, settings: DriverSettings) -> Self {
        Self {
            launcher,
            session: Mutex::new(None),
            settings,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            Arc::new(ChromeLauncher::new(config.headless)),
            DriverSettings::from_config(config),
        )
    }

    pub async fn is_open(&self) -> bool {
        self.session.lock().await.is_some()
    }

    /// Open the browser and the menu page unless a session already
    /// exists.
    async fn acquire<'a>(
        &self,
        session: &'a mut Option<Box<dyn BrowserPage>>,
    ) -> Result<&'a dyn BrowserPage> {
        if session.is_none() {
            let mut page = self.launcher.launch().await?;
            tracing::info!("Opening {}", self.settings.order_url);
            if let Err(e) = page.goto(&self.settings.order_url).await {
                let _ = page.close().await;
                return Err(e);
            }
            self.wait_until_ready(page.as_ref()).await;
            sleep(self.settings.settle_delay).await;
            *session = Some(page);
        }
        session
            .as_deref()
            .ok_or_else(|| anyhow!("Browser session is not open"))
    }

    async fn wait_until_ready(&self, page: &dyn BrowserPage) {
        let deadline = Instant::now() + self.settings.wait_timeout;
        loop {
            match page.ready_state().await {
                Ok(state) if state == "interactive" || state == "complete" => return,
                Ok(_) => {}
                Err(e) => tracing::debug!("Could not read ready state: {}", e),
            }
            if Instant::now() >= deadline {
                tracing::warn!(
                    "Page not ready after {:?}, continuing",
                    self.settings.wait_timeout
                );
                return;
            }
            sleep(self.settings.poll_interval).await;
        }
    }

    /// Close the browser if one is open.
    pub async fn shutdown(&self) {
        let mut session = self.session.lock().await;
        if let Some(mut page) = session.take()
            && let Err(e) = page.close().await
        {
            tracing::warn!("Failed to close browser: {}", e);
        }
    }

    async fn pace(&self) {
        if !self.settings.slow_mo.is_zero() {
            sleep(self.settings.slow_mo).await;
        }
    }

    async fn screenshot(&self, page: &dyn BrowserPage, tag: &str) -> Option<String> {
        let dir = &self.settings.screenshot_dir;
        let path = dir.join(screenshot_name(tag, Local::now().naive_local()));
        let saved = async {
            tokio::fs::create_dir_all(dir).await?;
            page.screenshot(&path).await?;
            Ok::<(), anyhow::Error>(())
        };
        match saved.await {
            Ok(()) => {
                tracing::info!("Saved screenshot {}", path.display());
                Some(path.display().to_string())
            }
            Err(e) => {
                tracing::warn!("Failed to save screenshot {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Add `quantity` of the best matching menu item to the cart. Never
    /// fails; problems are described in the result.
    pub async fn order_food_item(&self, item_name: &str, quantity: u32) -> OrderResult {
        let mut result = OrderResult::new(item_name, quantity.clamp(1, MAX_QUANTITY));
        let mut session = self.session.lock().await;
        let page = match self.acquire(&mut *session).await {
            Ok(page) => page,
            Err(e) => {
                tracing::error!("Could not open ordering page: {:#}", e);
                let detail = Some(format!("{:#}", e));
                result.record("open_page", StepOutcome::Failed, None, detail);
                result.state = OrderState::Failed;
                result.error = Some(format!("Could not open the ordering page: {:#}", e));
                return result;
            }
        };
        result.advance(OrderState::PageLoaded, "open_page", None);

        let tag = match self.run_order(page, &mut result).await {
            Ok(()) if result.state == OrderState::AddedToCart => {
                result.success = true;
                "order_success"
            }
            Ok(()) => {
                result.error = Some(format!(
                    "Selected '{}' but could not confirm it was added to the cart. Skipped steps: {}",
                    result.item_name.clone().unwrap_or_default(),
                    result.skipped_steps().join(", ")
                ));
                "order_incomplete"
            }
            Err(e) => {
                tracing::error!("Order for '{}' failed: {}", item_name, e);
                result.state = OrderState::Failed;
                result.error = Some(e.to_string());
                "order_failed"
            }
        };
        result.screenshot_path = self.screenshot(page, tag).await;
        result
    }

    async fn run_order(&self, page: &dyn BrowserPage, result: &mut OrderResult) -> Result<()> {
        self.click_item(page, result).await?;

        let settings = &self.settings;
        match locator::ORDER_MODAL
            .wait_for_any(page, settings.wait_timeout, settings.poll_interval)
            .await
        {
            Some(found) => {
                result.advance(OrderState::ModalOpen, "wait_for_modal", Some(found.strategy))
            }
            None => result.skip("wait_for_modal", "order modal did not appear"),
        }

        let delivery = [
            (&locator::DELIVERY_OPTION, "select_delivery", OrderState::DeliverySelected),
            (&locator::UPDATE_BUTTON, "update_settings", OrderState::SettingsUpdated),
        ];
        for (chain, step, state) in delivery {
            self.click_control(page, chain, step, state, result).await;
        }
        self.fill_address(page, result).await;
        self.click_control(
            page,
            &locator::VERIFY_ADDRESS,
            "verify_address",
            OrderState::AddressVerified,
            result,
        )
        .await;
        if result.quantity > 1 {
            self.increase_quantity(page, result).await;
        }
        self.click_control(
            page,
            &locator::ADD_TO_CART,
            "add_to_cart",
            OrderState::AddedToCart,
            result,
        )
        .await;
        Ok(())
    }

    /// Click the first candidate matching the requested name. A candidate
    /// that fails to click is passed over for the next match.
    async fn click_item(&self, page: &dyn BrowserPage, result: &mut OrderResult) -> Result<()> {
        result.state = OrderState::ItemSearch;
        let requested = result.requested_item.clone();

        let Some(found) = locator::MENU_ITEMS.resolve(page).await else {
            result.record(
                "click_item",
                StepOutcome::Failed,
                None,
                Some("no menu items on the page".to_string()),
            );
            return Err(ErrandError::ItemNotFound(requested).into());
        };

        let texts = page.texts(found.selector).await?;
        let labels = page
            .attributes(found.selector, "aria-label")
            .await
            .unwrap_or_default();

        let mut matched_any = false;
        for index in found.indices.iter().copied() {
            let name = texts.get(index).and_then(|t| display_name(t));
            let label = labels.get(index).cloned().flatten();
            let Some(matched) = [name, label]
                .into_iter()
                .flatten()
                .find(|candidate| item_matches(candidate, &requested))
            else {
                continue;
            };
            matched_any = true;

            match page.click(found.selector, index).await {
                Ok(()) => {
                    tracing::info!("Clicked '{}' for '{}'", matched, requested);
                    self.pace().await;
                    result.found = true;
                    result.item_name = Some(matched);
                    result.advance(OrderState::ItemClicked, "click_item", Some(found.strategy));
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!(
                        "Click on '{}' failed, trying the next candidate: {}",
                        matched,
                        e
                    );
                }
            }
        }

        result.found = matched_any;
        if matched_any {
            result.record(
                "click_item",
                StepOutcome::Failed,
                Some(found.strategy),
                Some("every matching element failed to click".to_string()),
            );
            let target = format!("a clickable '{}' menu item", requested);
            return Err(ErrandError::ElementNotFound(target).into());
        }
        result.record(
            "click_item",
            StepOutcome::Failed,
            Some(found.strategy),
            Some(format!("none of {} items matched", found.indices.len())),
        );
        Err(ErrandError::ItemNotFound(requested).into())
    }

    /// Wait for an optional control and click it.
    async fn click_control(
        &self,
        page: &dyn BrowserPage,
        chain: &LocatorChain,
        step: &str,
        state: OrderState,
        result: &mut OrderResult,
    ) {
        let settings = &self.settings;
        let Some(found) = chain
            .wait_for_any(page, settings.wait_timeout, settings.poll_interval)
            .await
        else {
            result.skip(step, format!("{} not found", chain.target));
            return;
        };
        match page.click(found.selector, found.first()).await {
            Ok(()) => {
                self.pace().await;
                result.advance(state, step, Some(found.strategy));
            }
            Err(e) => {
                tracing::warn!("Click on {} failed: {}", chain.target, e);
                let detail = Some(format!("click failed: {}", e));
                result.record(step, StepOutcome::Skipped, Some(found.strategy), detail);
            }
        }
    }

    async fn fill_address(&self, page: &dyn BrowserPage, result: &mut OrderResult) {
        let settings = &self.settings;
        match locator::STREET_FIELD
            .wait_for_any(page, settings.wait_timeout, settings.poll_interval)
            .await
        {
            Some(found) => result.advance(
                OrderState::AddressFormOpen,
                "open_address_form",
                Some(found.strategy),
            ),
            None => result.skip("open_address_form", "address form did not appear"),
        }

        let address = &settings.address;
        let fields = [
            (&locator::STREET_FIELD, "fill_street", &address.street),
            (&locator::APARTMENT_FIELD, "fill_apartment", &address.apartment),
            (&locator::ZIPCODE_FIELD, "fill_zipcode", &address.zipcode),
            (&locator::INSTRUCTIONS_FIELD, "fill_instructions", &address.instructions),
        ];
        let mut filled = 0;
        for (i, (chain, step, value)) in fields.into_iter().enumerate() {
            if i > 0 {
                sleep(settings.field_pause).await;
            }
            let Some(found) = chain.resolve(page).await else {
                result.skip(step, format!("{} not found", chain.target));
                continue;
            };
            match page.fill(found.selector, found.first(), value).await {
                Ok(()) => {
                    self.pace().await;
                    filled += 1;
                    result.record(step, StepOutcome::Succeeded, Some(found.strategy), None);
                }
                Err(e) => {
                    let detail = Some(format!("fill failed: {}", e));
                    result.record(step, StepOutcome::Skipped, Some(found.strategy), detail);
                }
            }
        }
        if filled > 0 {
            result.state = OrderState::AddressFilled;
        }
    }

    async fn increase_quantity(&self, page: &dyn BrowserPage, result: &mut OrderResult) {
        let settings = &self.settings;
        let wanted = result.quantity - 1;
        let Some(found) = locator::QUANTITY_INCREMENT
            .wait_for_any(page, settings.wait_timeout, settings.poll_interval)
            .await
        else {
            result.skip("increase_quantity", "quantity control not found, quantity stays at 1");
            return;
        };

        let mut clicked = 0;
        for _ in 0..wanted {
            if let Err(e) = page.click(found.selector, found.first()).await {
                tracing::warn!("Quantity increment failed: {}", e);
                break;
            }
            self.pace().await;
            clicked += 1;
        }
        let detail = Some(format!("incremented {} of {} time(s)", clicked, wanted));
        let outcome = if clicked == wanted {
            StepOutcome::Succeeded
        } else {
            StepOutcome::Skipped
        };
        result.record("increase_quantity", outcome, Some(found.strategy), detail);
    }

    /// Scrape the visible menu, optionally keeping one category.
    pub async fn browse_menu(&self, category: Option<&str>) -> MenuResult {
        let category = category.map(str::trim).filter(|c| !c.is_empty());
        let mut result = MenuResult {
            success: false,
            category: category.map(str::to_string),
            items: vec![],
            screenshot_path: None,
            error: None,
        };
        let mut session = self.session.lock().await;
        let page = match self.acquire(&mut *session).await {
            Ok(page) => page,
            Err(e) => {
                tracing::error!("Could not open ordering page: {:#}", e);
                result.error = Some(format!("Could not open the ordering page: {:#}", e));
                return result;
            }
        };

        let tag = match self.scrape_menu(page, category).await {
            Ok(items) => {
                tracing::info!("Scraped {} menu item(s)", items.len());
                result.success = true;
                result.items = items;
                "menu"
            }
            Err(e) => {
                tracing::error!("Menu scrape failed: {}", e);
                result.error = Some(e.to_string());
                "menu_failed"
            }
        };
        result.screenshot_path = self.screenshot(page, tag).await;
        result
    }

    async fn scrape_menu(
        &self,
        page: &dyn BrowserPage,
        category: Option<&str>,
    ) -> Result<Vec<MenuItem>> {
        let Some(found) = locator::MENU_CARDS.resolve(page).await else {
            return Err(ErrandError::ElementNotFound("menu items".to_string()).into());
        };
        let texts = page.texts(found.selector).await?;
        let labels = page
            .attributes(found.selector, "aria-label")
            .await
            .unwrap_or_default();
        let categories = page
            .attributes(found.selector, "data-category")
            .await
            .unwrap_or_default();

        let wanted = category.map(str::to_lowercase);
        let items = found
            .indices
            .iter()
            .filter_map(|&i| {
                parse_menu_card(
                    texts.get(i).map(String::as_str).unwrap_or_default(),
                    labels.get(i).and_then(|l| l.as_deref()),
                    categories.get(i).and_then(|c| c.as_deref()),
                )
            })
            .filter(|item| match (&wanted, &item.category) {
                (None, _) => true,
                (Some(wanted), Some(category)) => category.to_lowercase().contains(wanted),
                (Some(_), None) => false,
            })
            .collect();
        Ok(items)
    }

    async fn not_implemented(&self, what: &str, tag: &str) -> CartResult {
        let session = self.session.lock().await;
        let screenshot_path = match session.as_deref() {
            Some(page) => self.screenshot(page, tag).await,
            None => None,
        };
        let message = format!(
            "{}. Review the cart in the browser window instead.",
            ErrandError::NotImplemented(what.to_string())
        );
        tracing::info!("{}", message);
        CartResult {
            success: false,
            message,
            items: vec![],
            total: None,
            screenshot_path,
        }
    }

    pub async fn get_cart(&self) -> CartResult {
        self.not_implemented("Reading the cart", "cart").await
    }

    pub async fn clear_cart(&self) -> CartResult {
        self.not_implemented("Clearing the cart", "clear_cart").await
    }

    pub async fn proceed_to_checkout(&self) -> CartResult {
        self.not_implemented("Checkout", "checkout").await
    }
}

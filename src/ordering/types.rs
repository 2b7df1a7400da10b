use serde::{Deserialize, Serialize};

/// How far an order attempt got. States are reached in declaration
/// order; `Failed` can follow any of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderState {
    PageLoaded,
    ItemSearch,
    ItemClicked,
    ModalOpen,
    DeliverySelected,
    SettingsUpdated,
    AddressFormOpen,
    AddressFilled,
    AddressVerified,
    AddedToCart,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepOutcome {
    Succeeded,
    /// The control wasn't on the page. The flow carries on.
    Skipped,
    /// Fatal; nothing after this step runs.
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepReport {
    pub step: String,
    pub outcome: StepOutcome,
    /// Name of the locator strategy that found the control.
    pub strategy: Option<String>,
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderResult {
    pub success: bool,
    pub found: bool,
    pub requested_item: String,
    pub item_name: Option<String>,
    pub quantity: u32,
    pub screenshot_path: Option<String>,
    pub error: Option<String>,
    pub state: OrderState,
    pub steps: Vec<StepReport>,
}

impl OrderResult {
    pub fn new(requested_item: &str, quantity: u32) -> Self {
        Self {
            success: false,
            found: false,
            requested_item: requested_item.to_string(),
            item_name: None,
            quantity,
            screenshot_path: None,
            error: None,
            state: OrderState::PageLoaded,
            steps: vec![],
        }
    }

    pub fn record(
        &mut self,
        step: &str,
        outcome: StepOutcome,
        strategy: Option<&str>,
        detail: Option<String>,
    ) {
        self.steps.push(StepReport {
            step: step.to_string(),
            outcome,
            strategy: strategy.map(str::to_string),
            detail,
        });
    }

    /// Record a successful step and advance to `state`.
    pub fn advance(&mut self, state: OrderState, step: &str, strategy: Option<&str>) {
        self.record(step, StepOutcome::Succeeded, strategy, None);
        self.state = state;
    }

    pub fn skip(&mut self, step: &str, detail: impl Into<String>) {
        self.record(step, StepOutcome::Skipped, None, Some(detail.into()));
    }

    pub fn skipped_steps(&self) -> Vec<&str> {
        self.steps
            .iter()
            .filter(|s| s.outcome == StepOutcome::Skipped)
            .map(|s| s.step.as_str())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuItem {
    pub name: String,
    pub price: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub available: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuResult {
    pub success: bool,
    pub category: Option<String>,
    pub items: Vec<MenuItem>,
    pub screenshot_path: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartResult {
    pub success: bool,
    pub message: String,
    pub items: Vec<String>,
    pub total: Option<String>,
    pub screenshot_path: Option<String>,
}

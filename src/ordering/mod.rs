pub mod chrome;
pub mod driver;
pub mod locator;
pub mod matching;
pub mod page;
pub mod types;

/// In-memory page and launchers for driving the ordering flow without Chrome.
#[doc(hidden)]
pub mod testing;

pub use driver::{DriverSettings, MAX_QUANTITY, OrderingDriver};
pub use page::{BrowserPage, PageLauncher};
pub use types::{CartResult, MenuItem, MenuResult, OrderResult, OrderState, StepOutcome, StepReport};

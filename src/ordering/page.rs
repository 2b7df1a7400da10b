//! The page operations the driver needs, independent of the browser
//! backend. Elements are addressed by CSS selector plus their index in
//! document order.

use std::path::Path;

use anyhow::Result;
use async_trait::async_trait;

#[async_trait]
pub trait BrowserPage: Send + Sync {
    async fn goto(&self, url: &str) -> Result<()>;

    /// `document.readyState`
    async fn ready_state(&self) -> Result<String>;

    /// Visible text of every element matching `selector`.
    async fn texts(&self, selector: &str) -> Result<Vec<String>>;

    /// The named attribute of every element matching `selector`.
    async fn attributes(&self, selector: &str, name: &str) -> Result<Vec<Option<String>>>;

    async fn click(&self, selector: &str, index: usize) -> Result<()>;

    /// Replace the value of an input.
    async fn fill(&self, selector: &str, index: usize, value: &str) -> Result<()>;

    async fn screenshot(&self, path: &Path) -> Result<()>;

    async fn close(&mut self) -> Result<()>;
}

/// Opens a fresh page. The driver calls this at most once per session.
#[async_trait]
pub trait PageLauncher: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn BrowserPage>>;
}

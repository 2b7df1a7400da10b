//! `BrowserPage` over the Chrome DevTools Protocol.

use std::path::Path;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::{Browser, BrowserConfig, Element, Page};
use futures::StreamExt;
use tokio::task::JoinHandle;

use super::page::{BrowserPage, PageLauncher};
use crate::core::ErrandError;

const WINDOW_WIDTH: u32 = 1280;
const WINDOW_HEIGHT: u32 = 900;

const CLEAR_VALUE_JS: &str = "function() { this.value = ''; this.dispatchEvent(new Event('input', { bubbles: true })); }";

pub struct ChromeLauncher {
    headless: bool,
}

impl ChromeLauncher {
    pub fn new(headless: bool) -> Self {
        Self { headless }
    }

    fn config(&self) -> Result<BrowserConfig> {
        let mut builder = BrowserConfig::builder()
            .window_size(WINDOW_WIDTH, WINDOW_HEIGHT)
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--disable-blink-features=AutomationControlled");
        if !self.headless {
            builder = builder.with_head();
        }
        builder
            .build()
            .map_err(|e| anyhow!("Invalid browser config: {}", e))
    }
}

#[async_trait]
impl PageLauncher for ChromeLauncher {
    async fn launch(&self) -> Result<Box<dyn BrowserPage>> {
        tracing::info!("Launching browser (headless: {})", self.headless);
        let (browser, mut handler) = Browser::launch(self.config()?).await?;

        // The handler has to be polled for the browser to make progress
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!("Browser handler stopped: {}", e);
                    break;
                }
            }
        });

        let page = browser.new_page("about:blank").await?;
        Ok(Box::new(ChromePage {
            browser,
            page,
            handler_task,
        }))
    }
}

pub struct ChromePage {
    browser: Browser,
    page: Page,
    handler_task: JoinHandle<()>,
}

impl ChromePage {
    async fn nth(&self, selector: &str, index: usize) -> Result<Element> {
        let mut elements = self.page.find_elements(selector).await?;
        if index >= elements.len() {
            return Err(ErrandError::ElementNotFound(format!("{} [{}]", selector, index)).into());
        }
        Ok(elements.swap_remove(index))
    }
}

#[async_trait]
impl BrowserPage for ChromePage {
    async fn goto(&self, url: &str) -> Result<()> {
        self.page.goto(url).await?;
        Ok(())
    }

    async fn ready_state(&self) -> Result<String> {
        let state: String = self
            .page
            .evaluate("document.readyState")
            .await?
            .into_value()?;
        Ok(state)
    }

    async fn texts(&self, selector: &str) -> Result<Vec<String>> {
        let mut out = vec![];
        // A selector that matches nothing is an empty list, not an error
        let elements = self.page.find_elements(selector).await.unwrap_or_default();
        for element in elements {
            out.push(element.inner_text().await?.unwrap_or_default());
        }
        Ok(out)
    }

    async fn attributes(&self, selector: &str, name: &str) -> Result<Vec<Option<String>>> {
        let mut out = vec![];
        let elements = self.page.find_elements(selector).await.unwrap_or_default();
        for element in elements {
            out.push(element.attribute(name).await?);
        }
        Ok(out)
    }

    async fn click(&self, selector: &str, index: usize) -> Result<()> {
        let element = self.nth(selector, index).await?;
        element.scroll_into_view().await?;
        element.click().await?;
        Ok(())
    }

    async fn fill(&self, selector: &str, index: usize, value: &str) -> Result<()> {
        let element = self.nth(selector, index).await?;
        element.click().await?;
        element.call_js_fn(CLEAR_VALUE_JS, false).await?;
        if !value.is_empty() {
            element.type_str(value).await?;
        }
        Ok(())
    }

    async fn screenshot(&self, path: &Path) -> Result<()> {
        self.page
            .save_screenshot(ScreenshotParams::builder().full_page(true).build(), path)
            .await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        tracing::info!("Closing browser");
        self.browser.close().await?;
        let _ = self.browser.wait().await;
        self.handler_task.abort();
        Ok(())
    }
}

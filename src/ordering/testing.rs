//! Scripted in-memory page for driver tests.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{Result, anyhow};
use async_trait::async_trait;

use super::page::{BrowserPage, PageLauncher};

#[derive(Clone, Default)]
struct FakeElement {
    text: String,
    attributes: HashMap<String, String>,
}

#[derive(Default)]
pub struct FakePage {
    elements: HashMap<String, Vec<FakeElement>>,
    failing_clicks: HashSet<(String, usize)>,
    pub log: Arc<Mutex<Vec<String>>>,
}

impl FakePage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, selector: &str, texts: &[&str]) -> Self {
        let elements = texts
            .iter()
            .map(|t| FakeElement {
                text: t.to_string(),
                attributes: HashMap::new(),
            })
            .collect();
        self.elements.insert(selector.to_string(), elements);
        self
    }

    pub fn with_attribute(mut self, selector: &str, index: usize, name: &str, value: &str) -> Self {
        if let Some(element) = self
            .elements
            .get_mut(selector)
            .and_then(|elements| elements.get_mut(index))
        {
            element.attributes.insert(name.to_string(), value.to_string());
        }
        self
    }

    pub fn failing_click(mut self, selector: &str, index: usize) -> Self {
        self.failing_clicks.insert((selector.to_string(), index));
        self
    }

    fn push(&self, entry: String) {
        if let Ok(mut log) = self.log.lock() {
            log.push(entry);
        }
    }

    fn exists(&self, selector: &str, index: usize) -> Result<()> {
        match self.elements.get(selector) {
            Some(elements) if index < elements.len() => Ok(()),
            _ => Err(anyhow!("no element {} [{}]", selector, index)),
        }
    }
}

#[async_trait]
impl BrowserPage for FakePage {
    async fn goto(&self, url: &str) -> Result<()> {
        self.push(format!("goto {}", url));
        Ok(())
    }

    async fn ready_state(&self) -> Result<String> {
        Ok("complete".to_string())
    }

    async fn texts(&self, selector: &str) -> Result<Vec<String>> {
        Ok(self
            .elements
            .get(selector)
            .map(|elements| elements.iter().map(|e| e.text.clone()).collect())
            .unwrap_or_default())
    }

    async fn attributes(&self, selector: &str, name: &str) -> Result<Vec<Option<String>>> {
        Ok(self
            .elements
            .get(selector)
            .map(|elements| {
                elements
                    .iter()
                    .map(|e| e.attributes.get(name).cloned())
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn click(&self, selector: &str, index: usize) -> Result<()> {
        self.exists(selector, index)?;
        if self.failing_clicks.contains(&(selector.to_string(), index)) {
            self.push(format!("click-failed {}[{}]", selector, index));
            return Err(anyhow!("element {} [{}] is not clickable", selector, index));
        }
        self.push(format!("click {}[{}]", selector, index));
        Ok(())
    }

    async fn fill(&self, selector: &str, index: usize, value: &str) -> Result<()> {
        self.exists(selector, index)?;
        self.push(format!("fill {}[{}]={}", selector, index, value));
        Ok(())
    }

    async fn screenshot(&self, path: &Path) -> Result<()> {
        std::fs::write(path, b"png")?;
        self.push(format!("screenshot {}", path.display()));
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.push("close".to_string());
        Ok(())
    }
}

/// Hands out its page once and counts launches.
pub struct FakeLauncher {
    page: Mutex<Option<FakePage>>,
    pub launches: AtomicUsize,
}

impl FakeLauncher {
    pub fn new(page: FakePage) -> Self {
        Self {
            page: Mutex::new(Some(page)),
            launches: AtomicUsize::new(0),
        }
    }

    pub fn launch_count(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageLauncher for FakeLauncher {
    async fn launch(&self) -> Result<Box<dyn BrowserPage>> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        let page = self
            .page
            .lock()
            .map_err(|_| anyhow!("poisoned"))?
            .take()
            .ok_or_else(|| anyhow!("browser failed to start"))?;
        Ok(Box::new(page))
    }
}

/// Launcher for a machine with no browser.
pub struct BrokenLauncher;

#[async_trait]
impl PageLauncher for BrokenLauncher {
    async fn launch(&self) -> Result<Box<dyn BrowserPage>> {
        Err(anyhow!("Could not auto detect a chrome executable"))
    }
}

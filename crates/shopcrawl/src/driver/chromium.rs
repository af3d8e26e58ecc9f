// Copyright 2026 Shopcrawl Contributors
// SPDX-License-Identifier: Apache-2.0

//! Chromium-backed driver using chromiumoxide.
//!
//! Browsing contexts are CDP page targets. Only pages opened through this
//! driver count as contexts, so a stray default tab never inflates the
//! context count the deep scraper waits on.

use super::{AutomationDriver, ContextHandle, ElementHandle, Locator, Point};
use crate::error::{DriverError, DriverResult};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig, HeadlessMode};
use chromiumoxide::element::Element;
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Find the Chromium binary path.
pub fn find_chromium() -> Option<PathBuf> {
    // 1. SHOPCRAWL_CHROMIUM_PATH env
    if let Ok(p) = std::env::var("SHOPCRAWL_CHROMIUM_PATH") {
        let path = PathBuf::from(&p);
        if path.exists() {
            return Some(path);
        }
    }

    // 2. ~/.shopcrawl/chromium/
    if let Some(home) = dirs::home_dir() {
        let candidates = if cfg!(target_os = "macos") {
            vec![
                home.join(".shopcrawl/chromium/chrome-mac-arm64/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing"),
                home.join(".shopcrawl/chromium/chrome-mac-x64/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing"),
                home.join(".shopcrawl/chromium/chrome"),
            ]
        } else {
            vec![
                home.join(".shopcrawl/chromium/chrome-linux64/chrome"),
                home.join(".shopcrawl/chromium/chrome"),
            ]
        };
        for c in candidates {
            if c.exists() {
                return Some(c);
            }
        }
    }

    // 3. System PATH
    for name in ["google-chrome", "google-chrome-stable", "chromium", "chromium-browser"] {
        if let Ok(path) = which::which(name) {
            return Some(path);
        }
    }

    // 4. Common macOS location
    if cfg!(target_os = "macos") {
        let common =
            PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome");
        if common.exists() {
            return Some(common);
        }
    }

    None
}

/// Launch options for [`ChromiumDriver`].
#[derive(Debug, Clone)]
pub struct ChromiumOptions {
    pub headless: bool,
    /// Explicit binary; `find_chromium()` is used when unset.
    pub executable: Option<PathBuf>,
    pub window_size: (u32, u32),
    pub navigation_timeout: Duration,
}

impl Default for ChromiumOptions {
    fn default() -> Self {
        Self {
            headless: false,
            executable: None,
            window_size: (1920, 1080),
            navigation_timeout: Duration::from_secs(30),
        }
    }
}

/// Elements handed out to the crawl engine, keyed by handle id.
#[derive(Default)]
struct ElementRegistry {
    next_id: u64,
    entries: HashMap<u64, (String, Element)>,
}

impl ElementRegistry {
    fn register(&mut self, target: &str, elements: Vec<Element>) -> Vec<ElementHandle> {
        elements
            .into_iter()
            .map(|el| {
                self.next_id += 1;
                self.entries.insert(self.next_id, (target.to_string(), el));
                ElementHandle(self.next_id)
            })
            .collect()
    }

    fn get(&self, handle: ElementHandle) -> DriverResult<&Element> {
        self.entries
            .get(&handle.0)
            .map(|(_, el)| el)
            .ok_or(DriverError::StaleElement(handle.0))
    }

    fn forget_target(&mut self, target: &str) {
        self.entries.retain(|_, (t, _)| t != target);
    }
}

/// Automation session over a locally launched Chromium.
pub struct ChromiumDriver {
    browser: Browser,
    handler: JoinHandle<()>,
    contexts: Vec<Page>,
    active: Option<Page>,
    elements: Mutex<ElementRegistry>,
    navigation_timeout: Duration,
}

fn target_of(page: &Page) -> String {
    page.target_id().inner().clone()
}

/// Extra Chromium flags passed on every launch.
const LAUNCH_ARGS: [&str; 3] = ["--disable-gpu", "--no-sandbox", "--disable-dev-shm-usage"];

fn headless_mode(headless: bool) -> HeadlessMode {
    if headless {
        HeadlessMode::New
    } else {
        HeadlessMode::False
    }
}

fn browser_err(e: impl std::fmt::Display) -> DriverError {
    DriverError::Browser(e.to_string())
}

impl ChromiumDriver {
    /// Launch Chromium and open the parent browsing context.
    pub async fn launch(options: ChromiumOptions) -> DriverResult<Self> {
        let chrome_path = match options.executable.clone().or_else(find_chromium) {
            Some(p) => p,
            None => {
                return Err(DriverError::Browser(
                    "Chromium not found. Set SHOPCRAWL_CHROMIUM_PATH or install Chrome.".into(),
                ))
            }
        };

        let (width, height) = options.window_size;
        let config = BrowserConfig::builder()
            .chrome_executable(chrome_path)
            .window_size(width, height)
            .headless_mode(headless_mode(options.headless))
            .args(LAUNCH_ARGS)
            .build()
            .map_err(|e| DriverError::Browser(format!("failed to build browser config: {e}")))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| DriverError::Browser(format!("failed to launch Chromium: {e}")))?;

        // Spawn the handler task
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                let _ = event;
            }
        });

        let parent = browser.new_page("about:blank").await.map_err(browser_err)?;

        Ok(Self {
            browser,
            handler,
            contexts: vec![parent.clone()],
            active: Some(parent),
            elements: Mutex::new(ElementRegistry::default()),
            navigation_timeout: options.navigation_timeout,
        })
    }

    /// Close the browser and stop the CDP handler.
    pub async fn shutdown(mut self) -> DriverResult<()> {
        if let Err(e) = self.browser.close().await {
            warn!("closing Chromium failed: {e}");
        }
        let _ = self.browser.wait().await;
        self.handler.abort();
        Ok(())
    }

    fn active(&self) -> DriverResult<&Page> {
        self.active.as_ref().ok_or(DriverError::NoActiveContext)
    }
}

#[async_trait]
impl AutomationDriver for ChromiumDriver {
    async fn navigate(&mut self, url: &str) -> DriverResult<()> {
        let page = self.active()?.clone();
        self.elements.lock().await.forget_target(&target_of(&page));

        match tokio::time::timeout(self.navigation_timeout, page.goto(url)).await {
            Ok(Ok(_)) => {
                let _ = page.wait_for_navigation().await;
                Ok(())
            }
            Ok(Err(e)) => Err(DriverError::Browser(format!("navigation failed: {e}"))),
            Err(_) => Err(DriverError::Timeout(format!(
                "navigation to {url} after {}ms",
                self.navigation_timeout.as_millis()
            ))),
        }
    }

    async fn current_url(&self) -> DriverResult<String> {
        let url = self.active()?.url().await.map_err(browser_err)?;
        Ok(url.unwrap_or_default())
    }

    async fn find_elements(&self, locator: &Locator) -> DriverResult<Vec<ElementHandle>> {
        let page = self.active()?;
        let found = page
            .find_elements(locator.to_css())
            .await
            .map_err(|_| DriverError::NoSuchElement(locator.to_string()))?;
        Ok(self.elements.lock().await.register(&target_of(page), found))
    }

    async fn find_elements_in(
        &self,
        parent: ElementHandle,
        locator: &Locator,
    ) -> DriverResult<Vec<ElementHandle>> {
        let mut registry = self.elements.lock().await;
        let target = registry
            .entries
            .get(&parent.0)
            .map(|(t, _)| t.clone())
            .ok_or(DriverError::StaleElement(parent.0))?;
        let found = registry
            .get(parent)?
            .find_elements(locator.to_css())
            .await
            .map_err(|_| DriverError::NoSuchElement(locator.to_string()))?;
        Ok(registry.register(&target, found))
    }

    async fn text(&self, element: ElementHandle) -> DriverResult<Option<String>> {
        let registry = self.elements.lock().await;
        registry.get(element)?.inner_text().await.map_err(browser_err)
    }

    async fn attribute(&self, element: ElementHandle, name: &str) -> DriverResult<Option<String>> {
        let registry = self.elements.lock().await;
        let el = registry.get(element)?;
        // Properties resolve href/src against the document base, like WebDriver.
        if let Ok(Some(serde_json::Value::String(value))) = el.property(name).await {
            return Ok(Some(value));
        }
        el.attribute(name).await.map_err(browser_err)
    }

    async fn location(&self, element: ElementHandle) -> DriverResult<Option<Point>> {
        let registry = self.elements.lock().await;
        match registry.get(element)?.bounding_box().await {
            Ok(bbox) => Ok(Some(Point {
                x: bbox.x,
                y: bbox.y,
            })),
            Err(e) => {
                debug!("element {} has no layout box: {e}", element.0);
                Ok(None)
            }
        }
    }

    async fn click(&mut self, element: ElementHandle) -> DriverResult<()> {
        let registry = self.elements.lock().await;
        registry.get(element)?.click().await.map_err(browser_err)?;
        Ok(())
    }

    async fn execute_script(&self, script: &str) -> DriverResult<serde_json::Value> {
        let result = self
            .active()?
            .evaluate(script)
            .await
            .map_err(|e| DriverError::Script(e.to_string()))?;
        Ok(result.value().cloned().unwrap_or(serde_json::Value::Null))
    }

    async fn open_in_new_context(&mut self, url: &str) -> DriverResult<()> {
        // Track the tab before it loads so a slow or failed load still
        // leaves it closable.
        let page = self.browser.new_page("about:blank").await.map_err(browser_err)?;
        self.contexts.push(page.clone());

        let url = url.to_string();
        tokio::spawn(async move {
            if let Err(e) = page.goto(url.as_str()).await {
                debug!("secondary context load of {url} failed: {e}");
            }
        });
        Ok(())
    }

    async fn context_handles(&self) -> DriverResult<Vec<ContextHandle>> {
        Ok(self
            .contexts
            .iter()
            .map(|p| ContextHandle(target_of(p)))
            .collect())
    }

    async fn current_context(&self) -> DriverResult<ContextHandle> {
        Ok(ContextHandle(target_of(self.active()?)))
    }

    async fn switch_to_context(&mut self, handle: &ContextHandle) -> DriverResult<()> {
        let page = self
            .contexts
            .iter()
            .find(|p| target_of(p) == handle.0)
            .cloned()
            .ok_or_else(|| DriverError::NoSuchContext(handle.0.clone()))?;
        self.active = Some(page);
        Ok(())
    }

    async fn close_current_context(&mut self) -> DriverResult<()> {
        let page = self.active.take().ok_or(DriverError::NoActiveContext)?;
        let target = target_of(&page);
        self.contexts.retain(|p| target_of(p) != target);
        self.elements.lock().await.forget_target(&target);
        page.close().await.map_err(browser_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headless_flag_is_set_once() {
        assert!(matches!(headless_mode(true), HeadlessMode::New));
        assert!(matches!(headless_mode(false), HeadlessMode::False));
        assert!(LAUNCH_ARGS.iter().all(|a| !a.starts_with("--headless")));
    }

    #[tokio::test]
    #[ignore] // Requires Chromium to be installed
    async fn test_unreachable_secondary_context_is_still_tracked() {
        let mut driver = ChromiumDriver::launch(ChromiumOptions {
            headless: true,
            ..ChromiumOptions::default()
        })
        .await
        .expect("failed to launch");
        let parent = driver.current_context().await.expect("no parent");

        let started = std::time::Instant::now();
        driver
            .open_in_new_context("http://10.255.255.1/never-answers")
            .await
            .expect("open failed");
        assert!(started.elapsed() < Duration::from_secs(5));

        let handles = driver.context_handles().await.expect("handles failed");
        assert_eq!(handles.len(), 2);
        let child = handles.iter().find(|h| **h != parent).cloned().unwrap();
        driver.switch_to_context(&child).await.expect("switch failed");
        driver.close_current_context().await.expect("close failed");
        driver.switch_to_context(&parent).await.expect("switch back failed");
        assert_eq!(driver.context_handles().await.unwrap().len(), 1);

        driver.shutdown().await.expect("shutdown failed");
    }

    #[tokio::test]
    #[ignore] // Requires Chromium to be installed
    async fn test_chromium_secondary_context_roundtrip() {
        let mut driver = ChromiumDriver::launch(ChromiumOptions {
            headless: true,
            ..ChromiumOptions::default()
        })
        .await
        .expect("failed to launch");

        driver
            .navigate("data:text/html,<a href='https://example.com/x' class='next'>Next</a>")
            .await
            .expect("navigation failed");
        let parent = driver.current_context().await.expect("no parent");

        let anchors = driver
            .find_elements(&Locator::css("a.next"))
            .await
            .expect("find failed");
        assert_eq!(anchors.len(), 1);
        let text = driver.text(anchors[0]).await.expect("text failed");
        assert_eq!(text.as_deref(), Some("Next"));

        driver
            .open_in_new_context("data:text/html,<h1>Detail</h1>")
            .await
            .expect("open failed");
        let handles = driver.context_handles().await.expect("handles failed");
        assert_eq!(handles.len(), 2);

        let child = handles.iter().find(|h| **h != parent).cloned().unwrap();
        driver.switch_to_context(&child).await.expect("switch failed");
        driver.close_current_context().await.expect("close failed");
        driver.switch_to_context(&parent).await.expect("switch back failed");
        assert_eq!(driver.context_handles().await.unwrap().len(), 1);

        driver.shutdown().await.expect("shutdown failed");
    }
}

// Copyright 2026 Shopcrawl Contributors
// SPDX-License-Identifier: Apache-2.0

//! Lazy-load scrolling and next-page navigation.

use super::accessor::ElementAccessor;
use crate::config::CrawlConfig;
use crate::driver::{
    AutomationDriver, ElementHandle, Locator, SCROLL_HEIGHT_SCRIPT, SCROLL_TO_BOTTOM_SCRIPT,
};
use crate::error::{CrawlError, CrawlResult};
use std::time::Duration;
use tracing::{debug, trace};

/// Ways of finding the next-page control, tried in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextControl {
    /// `a[rel='next']`
    RelNext,
    /// `a.next`
    NextClass,
    /// First anchor whose text contains "next", case-insensitively.
    NextText,
}

impl NextControl {
    pub const PRIORITY: [NextControl; 3] = [Self::RelNext, Self::NextClass, Self::NextText];

    async fn locate(&self, dom: &ElementAccessor<'_>) -> Option<ElementHandle> {
        match self {
            Self::RelNext => dom.first(&Locator::css("a[rel='next']")).await,
            Self::NextClass => dom.first(&Locator::css("a.next")).await,
            Self::NextText => {
                for anchor in dom.all(&Locator::tag("a")).await {
                    let text = dom.text(anchor).await.unwrap_or_default();
                    if text.to_lowercase().contains("next") {
                        return Some(anchor);
                    }
                }
                None
            }
        }
    }
}

pub struct PageNavigator {
    scroll_pause: Duration,
    click_delay: Duration,
    max_scrolls: u32,
}

impl PageNavigator {
    pub fn new(scroll_pause: Duration, click_delay: Duration, max_scrolls: u32) -> Self {
        Self {
            scroll_pause,
            click_delay,
            max_scrolls,
        }
    }

    pub fn from_config(config: &CrawlConfig) -> Self {
        Self::new(config.scroll_pause(), config.click_delay(), config.max_scrolls)
    }

    async fn content_height(&self, driver: &dyn AutomationDriver) -> Option<u64> {
        match driver.execute_script(SCROLL_HEIGHT_SCRIPT).await {
            Ok(value) => value.as_u64().or_else(|| value.as_f64().map(|h| h as u64)),
            Err(e) => {
                debug!("reading content height failed: {e}");
                None
            }
        }
    }

    /// Scroll to the bottom until the content height stops growing or the
    /// scroll cap is hit. Returns the number of scrolls performed.
    pub async fn scroll_to_stable(&self, driver: &dyn AutomationDriver) -> u32 {
        let Some(mut last_height) = self.content_height(driver).await else {
            return 0;
        };

        let mut scrolls = 0;
        while scrolls < self.max_scrolls {
            if let Err(e) = driver.execute_script(SCROLL_TO_BOTTOM_SCRIPT).await {
                debug!("scrolling failed: {e}");
                break;
            }
            scrolls += 1;
            tokio::time::sleep(self.scroll_pause).await;

            match self.content_height(driver).await {
                Some(height) if height != last_height => last_height = height,
                _ => break,
            }
        }

        trace!("scrolled {scrolls} times, final height {last_height}");
        scrolls
    }

    /// Click the first next-page control found and report the new URL.
    ///
    /// Fails with `NavigationStalled` when no control is found or when the
    /// click leaves the URL unchanged; callers treat that as the last page.
    pub async fn advance_page(&self, driver: &mut dyn AutomationDriver) -> CrawlResult<String> {
        let before = driver.current_url().await.unwrap_or_default();

        for control in NextControl::PRIORITY {
            let candidate = {
                let dom = ElementAccessor::new(&*driver);
                control.locate(&dom).await
            };
            let Some(element) = candidate else {
                continue;
            };
            if let Err(e) = driver.click(element).await {
                debug!("clicking {control:?} control failed: {e}");
                continue;
            }
            tokio::time::sleep(self.click_delay).await;

            let after = driver.current_url().await.unwrap_or_default();
            if after == before {
                return Err(CrawlError::NavigationStalled(format!(
                    "{control:?} control did not change the URL ({before})"
                )));
            }
            return Ok(after);
        }

        Err(CrawlError::NavigationStalled(format!(
            "no next-page control on {before}"
        )))
    }
}

// Copyright 2026 Shopcrawl Contributors
// SPDX-License-Identifier: Apache-2.0

//! Browser automation abstraction.
//!
//! Defines the `AutomationDriver` trait the crawl engine is written against,
//! so the engine can run on a real Chromium session or on the in-memory
//! [`scripted::ScriptedDriver`] used by tests.

pub mod chromium;
pub mod scripted;

use crate::error::DriverResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Opaque handle to a DOM element owned by a driver.
///
/// Handles stay valid while the page that produced them is not navigated
/// or closed, including across focus switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementHandle(pub u64);

/// Identifies one browsing context (tab or window) of the session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContextHandle(pub String);

impl std::fmt::Display for ContextHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Rendered position of an element's top-left corner, in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// Selector kind plus value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    /// Any CSS selector.
    Css(String),
    /// A tag name, e.g. `img`.
    Tag(String),
    /// A single class name, without the leading dot.
    Class(String),
}

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Locator::Css(selector.into())
    }

    pub fn tag(name: impl Into<String>) -> Self {
        Locator::Tag(name.into())
    }

    pub fn class(name: impl Into<String>) -> Self {
        Locator::Class(name.into())
    }

    /// The equivalent CSS selector.
    pub fn to_css(&self) -> String {
        match self {
            Locator::Css(s) => s.clone(),
            Locator::Tag(t) => t.clone(),
            Locator::Class(c) => format!(".{c}"),
        }
    }
}

impl std::fmt::Display for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Locator::Css(s) => write!(f, "css={s}"),
            Locator::Tag(t) => write!(f, "tag={t}"),
            Locator::Class(c) => write!(f, "class={c}"),
        }
    }
}

/// Reads the current maximum content height of the focused page.
pub const SCROLL_HEIGHT_SCRIPT: &str = "document.body.scrollHeight";

/// Scrolls the focused page to the current maximum content height.
pub const SCROLL_TO_BOTTOM_SCRIPT: &str = "window.scrollTo(0, document.body.scrollHeight)";

/// One automation session: a set of browsing contexts, one of which has focus.
///
/// Every read operates on the focused context. Methods that move focus or
/// change what the focused context shows take `&mut self`.
#[async_trait]
pub trait AutomationDriver: Send + Sync {
    /// Navigate the focused context to `url` and wait for the load.
    async fn navigate(&mut self, url: &str) -> DriverResult<()>;

    /// URL currently shown by the focused context.
    async fn current_url(&self) -> DriverResult<String>;

    /// All elements of the focused page matching `locator`, in document order.
    async fn find_elements(&self, locator: &Locator) -> DriverResult<Vec<ElementHandle>>;

    /// Descendants of `parent` matching `locator`, in document order.
    async fn find_elements_in(
        &self,
        parent: ElementHandle,
        locator: &Locator,
    ) -> DriverResult<Vec<ElementHandle>>;

    /// Rendered text of an element, `None` when it has none.
    async fn text(&self, element: ElementHandle) -> DriverResult<Option<String>>;

    /// Attribute (or resolved property, for URLs) of an element.
    async fn attribute(&self, element: ElementHandle, name: &str) -> DriverResult<Option<String>>;

    /// Rendered position, `None` when the element has no layout box.
    async fn location(&self, element: ElementHandle) -> DriverResult<Option<Point>>;

    /// Click an element.
    async fn click(&mut self, element: ElementHandle) -> DriverResult<()>;

    /// Evaluate a script expression in the focused page.
    async fn execute_script(&self, script: &str) -> DriverResult<serde_json::Value>;

    /// Open `url` in a new browsing context without moving focus.
    async fn open_in_new_context(&mut self, url: &str) -> DriverResult<()>;

    /// Handles of every open browsing context.
    async fn context_handles(&self) -> DriverResult<Vec<ContextHandle>>;

    /// Handle of the focused context.
    async fn current_context(&self) -> DriverResult<ContextHandle>;

    /// Move focus to another context.
    async fn switch_to_context(&mut self, handle: &ContextHandle) -> DriverResult<()>;

    /// Close the focused context. Nothing has focus afterwards.
    async fn close_current_context(&mut self) -> DriverResult<()>;
}

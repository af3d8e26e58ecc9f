// Copyright 2026 Shopcrawl Contributors
// SPDX-License-Identifier: Apache-2.0

//! In-memory driver over HTML fixtures.
//!
//! Pages are registered by URL and queried with real CSS selectors through
//! `scraper`. Layout does not exist here, so an element's position comes from
//! its `data-x` / `data-y` attributes and scroll heights are a scripted
//! sequence per page. Clicking an anchor navigates to its href.
//!
//! The driver counts every context it opens and closes so tests can check
//! that secondary contexts never leak.

use super::{
    AutomationDriver, ContextHandle, ElementHandle, Locator, Point, SCROLL_HEIGHT_SCRIPT,
    SCROLL_TO_BOTTOM_SCRIPT,
};
use crate::error::{DriverError, DriverResult};
use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

const BLANK_PAGE: &str = "<html><head></head><body></body></html>";

/// One page the scripted driver can show.
#[derive(Debug, Clone, Default)]
pub struct PageFixture {
    html: String,
    scroll_heights: Vec<u64>,
    never_opens: bool,
    broken: bool,
    close_fails_once: bool,
}

impl PageFixture {
    pub fn html(html: impl Into<String>) -> Self {
        Self {
            html: html.into(),
            ..Self::default()
        }
    }

    /// Heights reported after 0, 1, 2... bottom scrolls; the last one repeats.
    pub fn scroll_heights(mut self, heights: Vec<u64>) -> Self {
        self.scroll_heights = heights;
        self
    }

    /// Opening this URL in a new context silently never produces a context.
    pub fn never_opens(mut self) -> Self {
        self.never_opens = true;
        self
    }

    /// Every element lookup on this page fails with a browser error.
    pub fn broken(mut self) -> Self {
        self.broken = true;
        self
    }

    /// The first close of a context showing this page fails and leaves it open.
    pub fn close_fails_once(mut self) -> Self {
        self.close_fails_once = true;
        self
    }
}

/// Context lifecycle counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LifecycleStats {
    /// Calls to `open_in_new_context`.
    pub open_requests: usize,
    /// Secondary contexts that actually came into existence.
    pub opened: usize,
    pub closed: usize,
    pub switches: usize,
    /// Most contexts ever open at once, parent included.
    pub peak_open: usize,
}

#[derive(Debug)]
struct Context {
    handle: String,
    url: String,
    generation: u64,
    scrolls: usize,
}

#[derive(Debug, Clone, Copy)]
struct NodeRef {
    generation: u64,
    node: usize,
}

#[derive(Debug)]
struct Registered {
    context: String,
    node: NodeRef,
}

#[derive(Debug, Default)]
struct State {
    pages: HashMap<String, PageFixture>,
    unreachable: HashSet<String>,
    contexts: Vec<Context>,
    active: Option<String>,
    next_context: u64,
    next_generation: u64,
    elements: HashMap<u64, Registered>,
    next_element: u64,
    navigations: Vec<String>,
    failed_closes: HashSet<String>,
    stats: LifecycleStats,
}

impl State {
    fn context(&self, handle: &str) -> DriverResult<&Context> {
        self.contexts
            .iter()
            .find(|c| c.handle == handle)
            .ok_or_else(|| DriverError::NoSuchContext(handle.to_string()))
    }

    fn active_context(&self) -> DriverResult<&Context> {
        let handle = self.active.as_deref().ok_or(DriverError::NoActiveContext)?;
        self.context(handle)
    }

    fn active_context_mut(&mut self) -> DriverResult<&mut Context> {
        let handle = self.active.clone().ok_or(DriverError::NoActiveContext)?;
        self.contexts
            .iter_mut()
            .find(|c| c.handle == handle)
            .ok_or(DriverError::NoSuchContext(handle))
    }

    fn fixture(&self, url: &str) -> Option<&PageFixture> {
        self.pages.get(url)
    }

    fn html_for(&self, url: &str) -> &str {
        self.fixture(url).map(|p| p.html.as_str()).unwrap_or(BLANK_PAGE)
    }

    fn load(&mut self, url: &str) -> DriverResult<()> {
        if self.unreachable.contains(url) {
            return Err(DriverError::Browser(format!(
                "net::ERR_NAME_NOT_RESOLVED at {url}"
            )));
        }
        self.next_generation += 1;
        let generation = self.next_generation;
        let ctx = self.active_context_mut()?;
        ctx.url = url.to_string();
        ctx.generation = generation;
        ctx.scrolls = 0;
        self.navigations.push(url.to_string());
        Ok(())
    }

    fn register(&mut self, context: &str, generation: u64, nodes: Vec<usize>) -> Vec<ElementHandle> {
        nodes
            .into_iter()
            .map(|node| {
                self.next_element += 1;
                self.elements.insert(
                    self.next_element,
                    Registered {
                        context: context.to_string(),
                        node: NodeRef { generation, node },
                    },
                );
                ElementHandle(self.next_element)
            })
            .collect()
    }

    /// Resolve a handle to (page url, node index), rejecting stale handles.
    fn resolve(&self, handle: ElementHandle) -> DriverResult<(String, usize)> {
        let reg = self
            .elements
            .get(&handle.0)
            .ok_or(DriverError::StaleElement(handle.0))?;
        let ctx = self
            .contexts
            .iter()
            .find(|c| c.handle == reg.context)
            .ok_or(DriverError::StaleElement(handle.0))?;
        if ctx.generation != reg.node.generation {
            return Err(DriverError::StaleElement(handle.0));
        }
        if self.fixture(&ctx.url).is_some_and(|p| p.broken) {
            return Err(DriverError::Browser(format!("page {} is broken", ctx.url)));
        }
        Ok((ctx.url.clone(), reg.node.node))
    }
}

/// Scripted fake of a browser automation session.
#[derive(Debug)]
pub struct ScriptedDriver {
    state: Mutex<State>,
}

impl Default for ScriptedDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedDriver {
    /// A session with a single parent context showing `about:blank`.
    pub fn new() -> Self {
        let state = State {
            contexts: vec![Context {
                handle: "ctx-0".to_string(),
                url: "about:blank".to_string(),
                generation: 0,
                scrolls: 0,
            }],
            active: Some("ctx-0".to_string()),
            next_context: 1,
            stats: LifecycleStats {
                peak_open: 1,
                ..LifecycleStats::default()
            },
            ..State::default()
        };
        Self {
            state: Mutex::new(state),
        }
    }

    /// Register a page fixture under `url`.
    pub fn with_page(self, url: impl Into<String>, page: PageFixture) -> Self {
        self.lock().pages.insert(url.into(), page);
        self
    }

    /// Navigating to `url` fails as if the host could not be resolved.
    pub fn with_unreachable(self, url: impl Into<String>) -> Self {
        self.lock().unreachable.insert(url.into());
        self
    }

    pub fn stats(&self) -> LifecycleStats {
        self.lock().stats
    }

    /// Number of contexts currently open, parent included.
    pub fn open_contexts(&self) -> usize {
        self.lock().contexts.len()
    }

    /// Every URL loaded by `navigate` or by a navigating click, in order.
    pub fn navigations(&self) -> Vec<String> {
        self.lock().navigations.clone()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn parse_selector(locator: &Locator) -> DriverResult<Selector> {
    let css = locator.to_css();
    Selector::parse(&css).map_err(|e| DriverError::Unsupported(format!("selector {css}: {e:?}")))
}

fn elements_of(doc: &Html) -> impl Iterator<Item = ElementRef<'_>> {
    doc.tree.root().descendants().filter_map(ElementRef::wrap)
}

/// Document-order index of an element, stable across re-parses of the same HTML.
fn index_of(doc: &Html, el: &ElementRef<'_>) -> Option<usize> {
    elements_of(doc).position(|candidate| candidate.id() == el.id())
}

fn nth_element(doc: &Html, index: usize) -> Option<ElementRef<'_>> {
    elements_of(doc).nth(index)
}

fn normalized_text(el: &ElementRef<'_>) -> String {
    el.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

fn resolve_url(base: &str, value: &str) -> String {
    url::Url::parse(base)
        .and_then(|b| b.join(value))
        .map(|u| u.to_string())
        .unwrap_or_else(|_| value.to_string())
}

#[async_trait]
impl AutomationDriver for ScriptedDriver {
    async fn navigate(&mut self, url: &str) -> DriverResult<()> {
        self.lock().load(url)
    }

    async fn current_url(&self) -> DriverResult<String> {
        Ok(self.lock().active_context()?.url.clone())
    }

    async fn find_elements(&self, locator: &Locator) -> DriverResult<Vec<ElementHandle>> {
        let selector = parse_selector(locator)?;
        let mut state = self.lock();
        let ctx = state.active_context()?;
        let (handle, generation, url) = (ctx.handle.clone(), ctx.generation, ctx.url.clone());
        if state.fixture(&url).is_some_and(|p| p.broken) {
            return Err(DriverError::Browser(format!("page {url} is broken")));
        }

        let doc = Html::parse_document(state.html_for(&url));
        let nodes: Vec<usize> = doc
            .select(&selector)
            .filter_map(|el| index_of(&doc, &el))
            .collect();
        Ok(state.register(&handle, generation, nodes))
    }

    async fn find_elements_in(
        &self,
        parent: ElementHandle,
        locator: &Locator,
    ) -> DriverResult<Vec<ElementHandle>> {
        let selector = parse_selector(locator)?;
        let mut state = self.lock();
        let (url, node) = state.resolve(parent)?;
        let (context, generation) = {
            let reg = state
                .elements
                .get(&parent.0)
                .ok_or(DriverError::StaleElement(parent.0))?;
            (reg.context.clone(), reg.node.generation)
        };

        let doc = Html::parse_document(state.html_for(&url));
        let scope = nth_element(&doc, node).ok_or(DriverError::StaleElement(parent.0))?;
        let nodes: Vec<usize> = scope
            .select(&selector)
            .filter(|el| el.id() != scope.id())
            .filter_map(|el| index_of(&doc, &el))
            .collect();
        Ok(state.register(&context, generation, nodes))
    }

    async fn text(&self, element: ElementHandle) -> DriverResult<Option<String>> {
        let state = self.lock();
        let (url, node) = state.resolve(element)?;
        let doc = Html::parse_document(state.html_for(&url));
        let el = nth_element(&doc, node).ok_or(DriverError::StaleElement(element.0))?;
        Ok(Some(normalized_text(&el)))
    }

    async fn attribute(&self, element: ElementHandle, name: &str) -> DriverResult<Option<String>> {
        let state = self.lock();
        let (url, node) = state.resolve(element)?;
        let doc = Html::parse_document(state.html_for(&url));
        let el = nth_element(&doc, node).ok_or(DriverError::StaleElement(element.0))?;
        Ok(el.value().attr(name).map(|value| match name {
            "href" | "src" => resolve_url(&url, value),
            _ => value.to_string(),
        }))
    }

    async fn location(&self, element: ElementHandle) -> DriverResult<Option<Point>> {
        let state = self.lock();
        let (url, node) = state.resolve(element)?;
        let doc = Html::parse_document(state.html_for(&url));
        let el = nth_element(&doc, node).ok_or(DriverError::StaleElement(element.0))?;
        let coord = |attr: &str| el.value().attr(attr).and_then(|v| v.trim().parse::<f64>().ok());
        Ok(coord("data-x").map(|x| Point {
            x,
            y: coord("data-y").unwrap_or(0.0),
        }))
    }

    async fn click(&mut self, element: ElementHandle) -> DriverResult<()> {
        let mut state = self.lock();
        let (url, node) = state.resolve(element)?;
        let target = {
            let doc = Html::parse_document(state.html_for(&url));
            let el = nth_element(&doc, node).ok_or(DriverError::StaleElement(element.0))?;
            match el.value().attr("href") {
                Some(href) if !href.starts_with('#') && !href.starts_with("javascript:") => {
                    Some(resolve_url(&url, href))
                }
                _ => None,
            }
        };
        match target {
            Some(next) => state.load(&next),
            None => Ok(()),
        }
    }

    async fn execute_script(&self, script: &str) -> DriverResult<serde_json::Value> {
        let mut state = self.lock();
        match script {
            SCROLL_HEIGHT_SCRIPT => {
                let ctx = state.active_context()?;
                let heights = state
                    .fixture(&ctx.url)
                    .map(|p| p.scroll_heights.as_slice())
                    .unwrap_or(&[]);
                let height = heights
                    .get(ctx.scrolls)
                    .or_else(|| heights.last())
                    .copied()
                    .unwrap_or(0);
                Ok(serde_json::json!(height))
            }
            SCROLL_TO_BOTTOM_SCRIPT => {
                state.active_context_mut()?.scrolls += 1;
                Ok(serde_json::Value::Null)
            }
            other => Err(DriverError::Unsupported(format!("script {other}"))),
        }
    }

    async fn open_in_new_context(&mut self, url: &str) -> DriverResult<()> {
        let mut state = self.lock();
        state.stats.open_requests += 1;
        if state.fixture(url).is_some_and(|p| p.never_opens) {
            return Ok(());
        }

        let handle = format!("ctx-{}", state.next_context);
        state.next_context += 1;
        state.next_generation += 1;
        let generation = state.next_generation;
        state.contexts.push(Context {
            handle,
            url: url.to_string(),
            generation,
            scrolls: 0,
        });
        state.stats.opened += 1;
        state.stats.peak_open = state.stats.peak_open.max(state.contexts.len());
        Ok(())
    }

    async fn context_handles(&self) -> DriverResult<Vec<ContextHandle>> {
        Ok(self
            .lock()
            .contexts
            .iter()
            .map(|c| ContextHandle(c.handle.clone()))
            .collect())
    }

    async fn current_context(&self) -> DriverResult<ContextHandle> {
        Ok(ContextHandle(self.lock().active_context()?.handle.clone()))
    }

    async fn switch_to_context(&mut self, handle: &ContextHandle) -> DriverResult<()> {
        let mut state = self.lock();
        state.context(&handle.0)?;
        state.active = Some(handle.0.clone());
        state.stats.switches += 1;
        Ok(())
    }

    async fn close_current_context(&mut self) -> DriverResult<()> {
        let mut state = self.lock();
        let url = state.active_context()?.url.clone();
        if state.fixture(&url).is_some_and(|p| p.close_fails_once)
            && state.failed_closes.insert(url.clone())
        {
            return Err(DriverError::Browser(format!("closing {url} failed")));
        }
        let handle = state.active.take().ok_or(DriverError::NoActiveContext)?;
        state.contexts.retain(|c| c.handle != handle);
        state.elements.retain(|_, reg| reg.context != handle);
        state.stats.closed += 1;
        Ok(())
    }
}

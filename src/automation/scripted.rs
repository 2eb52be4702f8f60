//! Scripted automation surface
//!
//! A deterministic, in-memory [`PageSurface`] used by the test suite and by
//! offline dry runs. Pages are declared up front: elements keyed by the exact
//! CSS selector the extraction code queries, canned results keyed by the
//! exact script expression, and an anchor schedule that reveals more product
//! links on every scroll — mimicking an infinite-scroll category grid.

use crate::automation::{AutomationError, AutomationResult, ElementHandle, PageSurface};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// One scripted element and its scripted descendants.
#[derive(Debug, Clone, Default)]
pub struct ScriptedElement {
    attributes: HashMap<String, String>,
    text: String,
    children: HashMap<String, Vec<ScriptedElement>>,
    clickable: bool,
}

impl ScriptedElement {
    pub fn new() -> Self {
        Self {
            clickable: true,
            ..Self::default()
        }
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attributes.insert(name.to_string(), value.to_string());
        self
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn child(mut self, selector: &str, element: ScriptedElement) -> Self {
        self.children
            .entry(selector.to_string())
            .or_default()
            .push(element);
        self
    }

    /// Marks the element as not directly actionable; clicks on it fail, which
    /// exercises the nested-interactive-child fallback.
    pub fn unclickable(mut self) -> Self {
        self.clickable = false;
        self
    }
}

/// One scripted page.
#[derive(Debug, Clone, Default)]
pub struct ScriptedPage {
    elements: HashMap<String, Vec<ScriptedElement>>,
    scripts: HashMap<String, Value>,
    /// Cumulative hrefs revealed per scroll iteration; index 0 is the state
    /// before the first scroll.
    anchor_schedule: Vec<Vec<String>>,
}

impl ScriptedPage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_elements(mut self, selector: &str, elements: Vec<ScriptedElement>) -> Self {
        self.elements.insert(selector.to_string(), elements);
        self
    }

    pub fn with_script(mut self, script: &str, result: Value) -> Self {
        self.scripts.insert(script.to_string(), result);
        self
    }

    pub fn with_anchor_schedule(mut self, schedule: Vec<Vec<&str>>) -> Self {
        self.anchor_schedule = schedule
            .into_iter()
            .map(|hrefs| hrefs.into_iter().map(str::to_string).collect())
            .collect();
        self
    }

    fn anchors_at(&self, scroll_count: usize) -> Vec<ScriptedElement> {
        if self.anchor_schedule.is_empty() {
            return Vec::new();
        }
        let index = scroll_count.min(self.anchor_schedule.len() - 1);
        self.anchor_schedule[index]
            .iter()
            .map(|href| ScriptedElement::new().attr("href", href))
            .collect()
    }
}

#[derive(Debug, Default)]
struct SurfaceState {
    current_url: Option<String>,
    scroll_count: usize,
    clicks: Vec<String>,
    /// Remaining forced navigation failures per URL.
    nav_failures: HashMap<String, u32>,
}

/// Deterministic in-memory automation surface.
pub struct ScriptedSurface {
    pages: HashMap<String, ScriptedPage>,
    state: Arc<Mutex<SurfaceState>>,
}

impl ScriptedSurface {
    pub fn new() -> Self {
        Self {
            pages: HashMap::new(),
            state: Arc::new(Mutex::new(SurfaceState::default())),
        }
    }

    pub fn with_page(mut self, url: &str, page: ScriptedPage) -> Self {
        self.pages.insert(url.to_string(), page);
        self
    }

    /// Forces the next `count` navigations to `url` to fail.
    pub fn fail_navigations(self, url: &str, count: u32) -> Self {
        self.state
            .lock()
            .unwrap()
            .nav_failures
            .insert(url.to_string(), count);
        self
    }

    /// Labels of every element clicked so far, in order.
    pub fn click_log(&self) -> Vec<String> {
        self.state.lock().unwrap().clicks.clone()
    }

    /// Number of scroll-script evaluations on the current page.
    pub fn scroll_count(&self) -> usize {
        self.state.lock().unwrap().scroll_count
    }

    fn current_page(&self) -> AutomationResult<&ScriptedPage> {
        let url = self
            .state
            .lock()
            .unwrap()
            .current_url
            .clone()
            .ok_or_else(|| AutomationError::Element("no page loaded".into()))?;
        self.pages
            .get(&url)
            .ok_or_else(|| AutomationError::Element(format!("no scripted page for {}", url)))
    }

    fn wrap(&self, element: ScriptedElement) -> Box<dyn ElementHandle> {
        Box::new(ScriptedHandle {
            element,
            state: Arc::clone(&self.state),
        })
    }
}

impl Default for ScriptedSurface {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PageSurface for ScriptedSurface {
    async fn navigate(&self, url: &str, _timeout: Duration) -> AutomationResult<()> {
        let mut state = self.state.lock().unwrap();
        if let Some(remaining) = state.nav_failures.get_mut(url) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(AutomationError::Navigation {
                    url: url.to_string(),
                    message: "scripted failure".into(),
                });
            }
        }
        if !self.pages.contains_key(url) {
            return Err(AutomationError::Navigation {
                url: url.to_string(),
                message: "no scripted page".into(),
            });
        }
        state.current_url = Some(url.to_string());
        state.scroll_count = 0;
        Ok(())
    }

    async fn current_url(&self) -> AutomationResult<String> {
        self.state
            .lock()
            .unwrap()
            .current_url
            .clone()
            .ok_or_else(|| AutomationError::Element("no page loaded".into()))
    }

    async fn query_all(&self, selector: &str) -> AutomationResult<Vec<Box<dyn ElementHandle>>> {
        let page = self.current_page()?;
        if selector == "a[href]" && !page.anchor_schedule.is_empty() {
            let scrolls = self.state.lock().unwrap().scroll_count;
            return Ok(page
                .anchors_at(scrolls)
                .into_iter()
                .map(|e| self.wrap(e))
                .collect());
        }
        Ok(page
            .elements
            .get(selector)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .map(|e| self.wrap(e))
            .collect())
    }

    async fn evaluate(&self, script: &str) -> AutomationResult<Value> {
        let page = self.current_page()?;
        if script.contains("scrollTo") {
            self.state.lock().unwrap().scroll_count += 1;
            return Ok(Value::Null);
        }
        Ok(page.scripts.get(script).cloned().unwrap_or(Value::Null))
    }

    async fn close(&self) -> AutomationResult<()> {
        self.state.lock().unwrap().current_url = None;
        Ok(())
    }
}

struct ScriptedHandle {
    element: ScriptedElement,
    state: Arc<Mutex<SurfaceState>>,
}

#[async_trait]
impl ElementHandle for ScriptedHandle {
    async fn attribute(&self, name: &str) -> AutomationResult<Option<String>> {
        Ok(self.element.attributes.get(name).cloned())
    }

    async fn text(&self) -> AutomationResult<String> {
        Ok(self.element.text.clone())
    }

    async fn click(&self, _timeout: Duration) -> AutomationResult<()> {
        if !self.element.clickable {
            return Err(AutomationError::Element("element not actionable".into()));
        }
        let label = self
            .element
            .attributes
            .get("aria-label")
            .cloned()
            .unwrap_or_else(|| self.element.text.clone());
        self.state.lock().unwrap().clicks.push(label);
        Ok(())
    }

    async fn query_all(&self, selector: &str) -> AutomationResult<Vec<Box<dyn ElementHandle>>> {
        Ok(self
            .element
            .children
            .get(selector)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .map(|element| {
                Box::new(ScriptedHandle {
                    element,
                    state: Arc::clone(&self.state),
                }) as Box<dyn ElementHandle>
            })
            .collect())
    }
}

//! In-memory page used by tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::app::{HarvestError, Result};
use crate::browser::{Element, NetworkEntry, PageDriver};

#[derive(Default)]
struct PageState {
    url: String,
    title: String,
    text: String,
    source: String,
    next_data: Option<serde_json::Value>,
    elements: HashMap<String, Vec<FakeElement>>,
    network: Vec<NetworkEntry>,
    scripts: Vec<(String, serde_json::Value)>,
    evaluated: Vec<String>,
    navigations: Vec<String>,
    storage_clears: usize,
    closed: bool,
    routes: HashMap<String, Route>,
    failures: HashMap<String, usize>,
}

/// What the page shows after navigating to a given URL.
#[derive(Clone, Default)]
pub struct Route {
    pub title: String,
    pub text: String,
    pub next_data: Option<serde_json::Value>,
}

/// A page whose DOM is a map from selector to elements.
///
/// Selectors are matched literally; tests register elements under the
/// exact selector strings the code queries.
#[derive(Clone, Default)]
pub struct FakePage {
    state: Arc<Mutex<PageState>>,
}

impl FakePage {
    pub fn new(url: &str) -> Self {
        let page = Self::default();
        page.set_url(url);
        page
    }

    fn with<R>(&self, f: impl FnOnce(&mut PageState) -> R) -> R {
        f(&mut self.state.lock().unwrap())
    }

    pub fn set_url(&self, url: &str) {
        self.with(|s| s.url = url.to_string());
    }

    pub fn set_title(&self, title: &str) {
        self.with(|s| s.title = title.to_string());
    }

    pub fn set_text(&self, text: &str) {
        self.with(|s| s.text = text.to_string());
    }

    pub fn set_source(&self, source: &str) {
        self.with(|s| s.source = source.to_string());
    }

    pub fn set_next_data(&self, data: serde_json::Value) {
        self.with(|s| s.next_data = Some(data));
    }

    pub fn add_element(&self, selector: &str, element: FakeElement) {
        self.with(|s| s.elements.entry(selector.to_string()).or_default().push(element));
    }

    pub fn add_network(&self, url: &str, resource_type: &str) {
        self.with(|s| s.network.push(NetworkEntry::new(url, resource_type)));
    }

    /// Scripts containing `needle` evaluate to `value`.
    pub fn on_script(&self, needle: &str, value: serde_json::Value) {
        self.with(|s| s.scripts.push((needle.to_string(), value)));
    }

    pub fn route(&self, url: &str, route: Route) {
        self.with(|s| {
            s.routes.insert(url.to_string(), route);
        });
    }

    /// The next `times` navigations to `url` fail.
    pub fn fail_navigation(&self, url: &str, times: usize) {
        self.with(|s| {
            s.failures.insert(url.to_string(), times);
        });
    }

    pub fn evaluated(&self) -> Vec<String> {
        self.with(|s| s.evaluated.clone())
    }

    pub fn navigations(&self) -> Vec<String> {
        self.with(|s| s.navigations.clone())
    }

    pub fn storage_clears(&self) -> usize {
        self.with(|s| s.storage_clears)
    }

    pub fn is_closed(&self) -> bool {
        self.with(|s| s.closed)
    }
}

#[async_trait]
impl PageDriver for FakePage {
    async fn navigate(&self, url: &str) -> Result<()> {
        self.with(|s| {
            s.navigations.push(url.to_string());
            if let Some(left) = s.failures.get_mut(url).filter(|n| **n > 0) {
                *left -= 1;
                return Err(HarvestError::Navigation(url.to_string()));
            }
            s.url = url.to_string();
            if let Some(route) = s.routes.get(url).cloned() {
                s.title = route.title;
                s.text = route.text;
                s.next_data = route.next_data;
            }
            Ok(())
        })
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self.with(|s| s.url.clone()))
    }

    async fn page_title(&self) -> Result<String> {
        Ok(self.with(|s| s.title.clone()))
    }

    async fn find_elements(&self, selector: &str) -> Result<Vec<Box<dyn Element>>> {
        Ok(self.with(|s| {
            s.elements
                .get(selector)
                .map(|els| {
                    els.iter()
                        .cloned()
                        .map(|el| Box::new(el) as Box<dyn Element>)
                        .collect()
                })
                .unwrap_or_default()
        }))
    }

    async fn evaluate(&self, script: &str) -> Result<serde_json::Value> {
        Ok(self.with(|s| {
            s.evaluated.push(script.to_string());
            s.scripts
                .iter()
                .find(|(needle, _)| script.contains(needle.as_str()))
                .map(|(_, value)| value.clone())
                .unwrap_or(serde_json::Value::Null)
        }))
    }

    async fn network_log(&self) -> Result<Vec<NetworkEntry>> {
        Ok(self.with(|s| s.network.clone()))
    }

    async fn clear_cookies(&self) -> Result<()> {
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.with(|s| s.closed = true);
        Ok(())
    }

    async fn visible_text(&self) -> Result<String> {
        Ok(self.with(|s| s.text.clone()))
    }

    async fn page_source(&self) -> Result<String> {
        Ok(self.with(|s| s.source.clone()))
    }

    async fn next_data(&self) -> Result<Option<serde_json::Value>> {
        Ok(self.with(|s| s.next_data.clone()))
    }

    async fn clear_storage(&self) -> Result<()> {
        self.with(|s| s.storage_clears += 1);
        Ok(())
    }
}

/// Something that happens to the page when an element is clicked.
#[derive(Clone)]
pub enum Reveal {
    Element(String, FakeElement),
    NextData(serde_json::Value),
    Url(String),
}

#[derive(Clone)]
pub struct FakeElement {
    attributes: HashMap<String, String>,
    text: String,
    displayed: bool,
    enabled: bool,
    offset: f64,
    ancestors: Vec<String>,
    children: HashMap<String, Vec<FakeElement>>,
    on_click: Vec<Reveal>,
    page: Option<FakePage>,
    clicks: Arc<Mutex<usize>>,
    typed: Arc<Mutex<String>>,
}

impl Default for FakeElement {
    fn default() -> Self {
        Self {
            attributes: HashMap::new(),
            text: String::new(),
            displayed: true,
            enabled: true,
            offset: 500.0,
            ancestors: Vec::new(),
            children: HashMap::new(),
            on_click: Vec::new(),
            page: None,
            clicks: Arc::new(Mutex::new(0)),
            typed: Arc::new(Mutex::new(String::new())),
        }
    }
}

impl FakeElement {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attributes.insert(name.to_string(), value.to_string());
        self
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn hidden(mut self) -> Self {
        self.displayed = false;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn at_offset(mut self, offset: f64) -> Self {
        self.offset = offset;
        self
    }

    /// Mark the element as nested inside something matching `selector`.
    pub fn inside(mut self, selector: &str) -> Self {
        self.ancestors.push(selector.to_string());
        self
    }

    pub fn child(mut self, selector: &str, element: FakeElement) -> Self {
        self.children.entry(selector.to_string()).or_default().push(element);
        self
    }

    /// Apply `reveal` to `page` whenever this element is clicked.
    pub fn on_click(mut self, page: &FakePage, reveal: Reveal) -> Self {
        self.page = Some(page.clone());
        self.on_click.push(reveal);
        self
    }

    pub fn clicks(&self) -> usize {
        *self.clicks.lock().unwrap()
    }

    pub fn typed(&self) -> String {
        self.typed.lock().unwrap().clone()
    }
}

#[async_trait]
impl Element for FakeElement {
    async fn attribute(&self, name: &str) -> Result<Option<String>> {
        Ok(self.attributes.get(name).cloned())
    }

    async fn text(&self) -> Result<String> {
        Ok(self.text.clone())
    }

    async fn click(&self) -> Result<()> {
        *self.clicks.lock().unwrap() += 1;
        if let Some(ref page) = self.page {
            for reveal in &self.on_click {
                match reveal.clone() {
                    Reveal::Element(selector, element) => page.add_element(&selector, element),
                    Reveal::NextData(data) => page.set_next_data(data),
                    Reveal::Url(url) => page.set_url(&url),
                }
            }
        }
        Ok(())
    }

    async fn is_displayed(&self) -> Result<bool> {
        Ok(self.displayed)
    }

    async fn is_enabled(&self) -> Result<bool> {
        Ok(self.enabled)
    }

    async fn type_text(&self, text: &str) -> Result<()> {
        self.typed.lock().unwrap().push_str(text);
        Ok(())
    }

    async fn vertical_offset(&self) -> Result<f64> {
        Ok(self.offset)
    }

    async fn find_elements(&self, selector: &str) -> Result<Vec<Box<dyn Element>>> {
        Ok(self
            .children
            .get(selector)
            .map(|els| {
                els.iter()
                    .cloned()
                    .map(|el| Box::new(el) as Box<dyn Element>)
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn is_within(&self, selector: &str) -> Result<bool> {
        Ok(self.ancestors.iter().any(|a| a == selector))
    }
}

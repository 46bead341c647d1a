use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::{
    ClearBrowserCookiesParams, EnableParams, EventResponseReceived,
};
use chromiumoxide::element::Element as ChromeElement;
use chromiumoxide::Page;
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::app::{HarvestError, Result};
use crate::browser::{BrowserFactory, Element, NetworkEntry, PageDriver};
use crate::config::BrowserSettings;

/// Launches headless Chrome instances via chromiumoxide.
#[derive(Debug, Clone)]
pub struct ChromeFactory {
    settings: BrowserSettings,
}

impl ChromeFactory {
    pub fn new(settings: BrowserSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl BrowserFactory for ChromeFactory {
    async fn launch(&self) -> Result<Box<dyn PageDriver>> {
        Ok(Box::new(ChromePage::launch(self.settings.clone()).await?))
    }
}

/// One Chrome process driving a single tab.
pub struct ChromePage {
    browser: tokio::sync::Mutex<Browser>,
    page: Page,
    settings: BrowserSettings,
    network: Arc<Mutex<Vec<NetworkEntry>>>,
    tasks: Vec<JoinHandle<()>>,
}

impl ChromePage {
    pub async fn launch(settings: BrowserSettings) -> Result<Self> {
        let mut builder = BrowserConfig::builder()
            .arg("--no-sandbox")
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-software-rasterizer")
            .arg("--autoplay-policy=no-user-gesture-required")
            .window_size(settings.window_width, settings.window_height);

        if !settings.headless {
            builder = builder.with_head();
        }

        let browser_config = builder
            .build()
            .map_err(|e| HarvestError::Browser(format!("Failed to build browser config: {}", e)))?;

        let (browser, mut handler) = Browser::launch(browser_config).await.map_err(|e| {
            HarvestError::Browser(format!(
                "Failed to launch browser: {}. Is Chrome or Chromium installed and in PATH?",
                e
            ))
        })?;

        let mut tasks = Vec::new();
        tasks.push(tokio::spawn(async move {
            while let Some(_event) = handler.next().await {}
        }));

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| HarvestError::Browser(format!("Failed to create page: {}", e)))?;

        if let Some(ref ua) = settings.user_agent {
            page.set_user_agent(ua)
                .await
                .map_err(|e| HarvestError::Browser(format!("Failed to set user agent: {}", e)))?;
        }

        // Network domain must be enabled before responses are reported.
        page.execute(EnableParams::default())
            .await
            .map_err(|e| HarvestError::Browser(format!("Failed to enable network events: {}", e)))?;

        let network = Arc::new(Mutex::new(Vec::new()));
        let mut responses = page
            .event_listener::<EventResponseReceived>()
            .await
            .map_err(|e| HarvestError::Browser(format!("Failed to listen for responses: {}", e)))?;
        let sink = network.clone();
        tasks.push(tokio::spawn(async move {
            while let Some(event) = responses.next().await {
                let entry = NetworkEntry::new(event.response.url.clone(), format!("{:?}", event.r#type));
                sink.lock().unwrap_or_else(|e| e.into_inner()).push(entry);
            }
        }));

        debug!(headless = settings.headless, "Chrome launched");

        Ok(Self {
            browser: tokio::sync::Mutex::new(browser),
            page,
            settings,
            network,
            tasks,
        })
    }

    fn wrap(elements: Vec<ChromeElement>) -> Vec<Box<dyn Element>> {
        elements
            .into_iter()
            .map(|el| Box::new(ChromeNode(el)) as Box<dyn Element>)
            .collect()
    }
}

#[async_trait]
impl PageDriver for ChromePage {
    async fn navigate(&self, url: &str) -> Result<()> {
        self.network.lock().unwrap_or_else(|e| e.into_inner()).clear();

        tokio::time::timeout(self.settings.timeout(), self.page.goto(url))
            .await
            .map_err(|_| HarvestError::Timeout(format!("Loading {}", url)))?
            .map_err(|e| HarvestError::Navigation(format!("{}: {}", url, e)))?;

        tokio::time::sleep(self.settings.wait_after_load()).await;
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        let url = self
            .page
            .url()
            .await
            .map_err(|e| HarvestError::Browser(format!("Failed to read URL: {}", e)))?;
        Ok(url.unwrap_or_default())
    }

    async fn page_title(&self) -> Result<String> {
        let title = self
            .page
            .get_title()
            .await
            .map_err(|e| HarvestError::Browser(format!("Failed to read title: {}", e)))?;
        Ok(title.unwrap_or_default())
    }

    async fn find_elements(&self, selector: &str) -> Result<Vec<Box<dyn Element>>> {
        // chromiumoxide reports a missing match as an error; treat it as empty.
        match self.page.find_elements(selector).await {
            Ok(elements) => Ok(Self::wrap(elements)),
            Err(e) => {
                debug!(selector, error = %e, "No elements");
                Ok(Vec::new())
            }
        }
    }

    async fn evaluate(&self, script: &str) -> Result<serde_json::Value> {
        let result = self
            .page
            .evaluate(script)
            .await
            .map_err(|e| HarvestError::Browser(format!("Script execution failed: {}", e)))?;
        Ok(result.value().cloned().unwrap_or(serde_json::Value::Null))
    }

    async fn network_log(&self) -> Result<Vec<NetworkEntry>> {
        Ok(self.network.lock().unwrap_or_else(|e| e.into_inner()).clone())
    }

    async fn clear_cookies(&self) -> Result<()> {
        self.page
            .execute(ClearBrowserCookiesParams::default())
            .await
            .map_err(|e| HarvestError::Browser(format!("Failed to clear cookies: {}", e)))?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        let mut browser = self.browser.lock().await;
        if let Err(e) = browser.close().await {
            warn!("Failed to close browser cleanly: {}", e);
        }
        let _ = browser.wait().await;
        for task in &self.tasks {
            task.abort();
        }
        Ok(())
    }
}

struct ChromeNode(ChromeElement);

impl ChromeNode {
    async fn call(&self, function: &str) -> Result<serde_json::Value> {
        let returns = self
            .0
            .call_js_fn(function, false)
            .await
            .map_err(|e| HarvestError::Browser(format!("Element script failed: {}", e)))?;
        Ok(returns.result.value.unwrap_or(serde_json::Value::Null))
    }
}

#[async_trait]
impl Element for ChromeNode {
    async fn attribute(&self, name: &str) -> Result<Option<String>> {
        self.0
            .attribute(name)
            .await
            .map_err(|e| HarvestError::Browser(format!("Failed to read attribute {}: {}", name, e)))
    }

    async fn text(&self) -> Result<String> {
        let text = self
            .0
            .inner_text()
            .await
            .map_err(|e| HarvestError::Browser(format!("Failed to read text: {}", e)))?;
        Ok(text.unwrap_or_default())
    }

    async fn click(&self) -> Result<()> {
        self.0
            .click()
            .await
            .map_err(|e| HarvestError::Browser(format!("Click failed: {}", e)))?;
        Ok(())
    }

    async fn is_displayed(&self) -> Result<bool> {
        let value = self
            .call(
                "function() { const s = window.getComputedStyle(this); \
                 return !!(this.offsetWidth || this.offsetHeight || this.getClientRects().length) \
                 && s.visibility !== 'hidden' && s.display !== 'none'; }",
            )
            .await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn is_enabled(&self) -> Result<bool> {
        let value = self.call("function() { return !this.disabled; }").await?;
        Ok(value.as_bool().unwrap_or(true))
    }

    async fn type_text(&self, text: &str) -> Result<()> {
        self.0
            .click()
            .await
            .map_err(|e| HarvestError::Browser(format!("Focus failed: {}", e)))?;
        self.0
            .type_str(text)
            .await
            .map_err(|e| HarvestError::Browser(format!("Typing failed: {}", e)))?;
        Ok(())
    }

    async fn vertical_offset(&self) -> Result<f64> {
        let value = self
            .call("function() { return this.getBoundingClientRect().top + window.scrollY; }")
            .await?;
        Ok(value.as_f64().unwrap_or(0.0))
    }

    async fn find_elements(&self, selector: &str) -> Result<Vec<Box<dyn Element>>> {
        match self.0.find_elements(selector).await {
            Ok(elements) => Ok(ChromePage::wrap(elements)),
            Err(_) => Ok(Vec::new()),
        }
    }

    async fn is_within(&self, selector: &str) -> Result<bool> {
        let selector = serde_json::to_string(selector)?;
        let value = self
            .call(&format!("function() {{ return this.closest({selector}) !== null; }}"))
            .await?;
        Ok(value.as_bool().unwrap_or(false))
    }
}

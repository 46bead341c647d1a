//! Browser capability layer.
//!
//! The extraction core only talks to a page through [`PageDriver`] and
//! [`Element`], so the Chrome implementation can be swapped for an
//! in-memory page in tests.
//!
//! ```text
//! BrowserFactory::launch → PageDriver → Element
//!                              │
//!                              └── network_log (captured responses)
//! ```

pub mod chrome;
#[cfg(test)]
pub mod fake;

pub use chrome::ChromeFactory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::app::{HarvestError, Result};

/// One captured network response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkEntry {
    pub url: String,
    /// CDP resource type, e.g. `Media`, `XHR`, `Image`.
    pub resource_type: String,
}

impl NetworkEntry {
    pub fn new(url: impl Into<String>, resource_type: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            resource_type: resource_type.into(),
        }
    }
}

/// Handle to a DOM element on the current page.
#[async_trait]
pub trait Element: Send + Sync {
    async fn attribute(&self, name: &str) -> Result<Option<String>>;

    async fn text(&self) -> Result<String>;

    async fn click(&self) -> Result<()>;

    async fn is_displayed(&self) -> Result<bool>;

    async fn is_enabled(&self) -> Result<bool>;

    async fn type_text(&self, text: &str) -> Result<()>;

    /// Distance from the top of the document in CSS pixels.
    async fn vertical_offset(&self) -> Result<f64>;

    /// Descendants matching `selector`.
    async fn find_elements(&self, selector: &str) -> Result<Vec<Box<dyn Element>>>;

    /// True when this element or an ancestor matches `selector`.
    async fn is_within(&self, selector: &str) -> Result<bool>;
}

/// A single browser tab.
#[async_trait]
pub trait PageDriver: Send + Sync {
    async fn navigate(&self, url: &str) -> Result<()>;

    async fn current_url(&self) -> Result<String>;

    async fn page_title(&self) -> Result<String>;

    async fn find_elements(&self, selector: &str) -> Result<Vec<Box<dyn Element>>>;

    /// Run a script and return its JSON value (`Null` for `undefined`).
    async fn evaluate(&self, script: &str) -> Result<serde_json::Value>;

    /// Responses observed since the last navigation.
    async fn network_log(&self) -> Result<Vec<NetworkEntry>>;

    async fn clear_cookies(&self) -> Result<()>;

    async fn close(&self) -> Result<()>;

    /// First element matching `selector`, or [`HarvestError::ElementNotFound`].
    async fn find_element(&self, selector: &str) -> Result<Box<dyn Element>> {
        self.find_elements(selector)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| HarvestError::ElementNotFound(selector.to_string()))
    }

    async fn exists(&self, selector: &str) -> Result<bool> {
        Ok(!self.find_elements(selector).await?.is_empty())
    }

    async fn visible_text(&self) -> Result<String> {
        let value = self
            .evaluate("document.body ? document.body.innerText : ''")
            .await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn page_source(&self) -> Result<String> {
        let value = self
            .evaluate("document.documentElement ? document.documentElement.outerHTML : ''")
            .await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    /// Parsed `__NEXT_DATA__` page state, if the page embeds one.
    async fn next_data(&self) -> Result<Option<serde_json::Value>> {
        let value = self
            .evaluate(
                "(() => { const el = document.getElementById('__NEXT_DATA__'); \
                 return el ? el.textContent : null; })()",
            )
            .await?;
        match value.as_str() {
            Some(raw) if !raw.trim().is_empty() => Ok(Some(serde_json::from_str(raw)?)),
            _ => Ok(None),
        }
    }

    /// Drop cookies plus local and session storage.
    async fn clear_storage(&self) -> Result<()> {
        self.clear_cookies().await?;
        self.evaluate(
            "(() => { try { localStorage.clear(); sessionStorage.clear(); } catch (e) {} return true; })()",
        )
        .await?;
        Ok(())
    }

    async fn scroll_to_top(&self) -> Result<()> {
        self.evaluate("window.scrollTo(0, 0); true").await?;
        Ok(())
    }
}

/// Creates fresh browser instances, so a tainted one can be discarded.
#[async_trait]
pub trait BrowserFactory: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn PageDriver>>;
}

//! Page rendering backends.
//!
//! A [`PageRenderer`] loads a URL in a browser, waits for a set of elements
//! to become visible and returns their text. Each call owns its browser
//! session from launch to close.

use crate::error::FeedError;
use crate::opensea::{BEST_OFFER, FLOOR_PRICE};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::Page;
use floorwatch_core::NOT_AVAILABLE;
use futures_util::StreamExt;
use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Desktop Chrome user agent sent with every page load.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/132.0.0.0 Safari/537.36";

/// A named element to wait for and read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementQuery {
    pub name: String,
    pub selector: String,
}

impl ElementQuery {
    pub fn new(name: impl Into<String>, selector: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            selector: selector.into(),
        }
    }
}

/// Capability to render a page and read element text from it.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    /// Load `url`, wait up to `timeout` for the document and for every element
    /// to be visible, then return element name -> raw inner text.
    async fn render_and_extract(
        &self,
        url: &str,
        elements: &[ElementQuery],
        timeout: Duration,
    ) -> Result<HashMap<String, String>, FeedError>;
}

/// Headless Chromium settings.
#[derive(Debug, Clone)]
pub struct ChromeConfig {
    pub user_agent: String,
    pub window_width: u32,
    pub window_height: u32,
    /// Browser binary; auto-detected when unset.
    pub chrome_executable: Option<PathBuf>,
    /// How often readiness checks are repeated while waiting.
    pub poll_interval: Duration,
}

impl Default for ChromeConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            window_width: 1920,
            window_height: 1080,
            chrome_executable: None,
            poll_interval: Duration::from_millis(250),
        }
    }
}

/// [`PageRenderer`] backed by a fresh headless Chromium per call.
pub struct ChromeRenderer {
    config: ChromeConfig,
}

impl ChromeRenderer {
    pub fn new(config: ChromeConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl PageRenderer for ChromeRenderer {
    async fn render_and_extract(
        &self,
        url: &str,
        elements: &[ElementQuery],
        timeout: Duration,
    ) -> Result<HashMap<String, String>, FeedError> {
        let session = BrowserSession::launch(&self.config).await?;
        let result = session
            .extract(url, elements, timeout, self.config.poll_interval)
            .await;
        session.close().await;
        result
    }
}

/// One launched browser plus the task driving its CDP connection.
struct BrowserSession {
    browser: Browser,
    handler: JoinHandle<()>,
}

impl BrowserSession {
    async fn launch(config: &ChromeConfig) -> Result<Self, FeedError> {
        let mut builder = BrowserConfig::builder()
            .window_size(config.window_width, config.window_height)
            .viewport(Viewport {
                width: config.window_width,
                height: config.window_height,
                ..Default::default()
            })
            .arg(format!("--user-agent={}", config.user_agent));
        if let Some(path) = &config.chrome_executable {
            builder = builder.chrome_executable(path);
        }
        let browser_config = builder.build().map_err(FeedError::Browser)?;

        let (browser, mut handler) = Browser::launch(browser_config).await?;
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        Ok(Self { browser, handler })
    }

    async fn extract(
        &self,
        url: &str,
        elements: &[ElementQuery],
        timeout: Duration,
        poll_interval: Duration,
    ) -> Result<HashMap<String, String>, FeedError> {
        let page = tokio::time::timeout(timeout, self.browser.new_page(url))
            .await
            .map_err(|_| FeedError::Timeout(format!("navigating to {}", url)))?
            .map_err(|e| FeedError::Navigation(e.to_string()))?;

        if poll_for_text(&page, DOCUMENT_READY_JS, timeout, poll_interval)
            .await
            .is_none()
        {
            return Err(FeedError::Timeout("document content loaded".to_string()));
        }

        for element in elements {
            let expression = visible_text_js(&element.selector);
            if poll_for_text(&page, &expression, timeout, poll_interval)
                .await
                .is_none()
            {
                warn!("Timeout waiting for {} element", element.name);
                return Err(FeedError::Timeout(format!(
                    "waiting for {} element",
                    element.name
                )));
            }
        }

        let mut texts = HashMap::with_capacity(elements.len());
        for element in elements {
            let text = read_text(&page, &visible_text_js(&element.selector))
                .await
                .unwrap_or_else(|| NOT_AVAILABLE.to_string());
            texts.insert(element.name.clone(), text);
        }
        Ok(texts)
    }

    async fn close(mut self) {
        if let Err(e) = self.browser.close().await {
            debug!("Browser close failed: {}", e);
        }
        self.handler.abort();
    }
}

const DOCUMENT_READY_JS: &str =
    "document.readyState === 'loading' ? '' : document.readyState";

/// Expression yielding the element's inner text, or `''` while it is absent or hidden.
fn visible_text_js(selector: &str) -> String {
    let selector = serde_json::Value::from(selector).to_string();
    format!(
        r#"(() => {{
    const el = document.querySelector({selector});
    if (!el) return '';
    const style = window.getComputedStyle(el);
    const rect = el.getBoundingClientRect();
    if (style.visibility === 'hidden' || style.display === 'none') return '';
    if (rect.width === 0 && rect.height === 0) return '';
    return el.innerText || '';
}})()"#
    )
}

/// Evaluate `expression` once; `None` for errors and empty strings.
async fn read_text(page: &Page, expression: &str) -> Option<String> {
    let result = page.evaluate_expression(expression).await.ok()?;
    let text: String = result.into_value().ok()?;
    (!text.is_empty()).then_some(text)
}

async fn poll_for_text(
    page: &Page,
    expression: &str,
    timeout: Duration,
    poll_interval: Duration,
) -> Option<String> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(text) = read_text(page, expression).await {
            return Some(text);
        }
        if Instant::now() >= deadline {
            return None;
        }
        tokio::time::sleep(poll_interval).await;
    }
}

/// Mock renderer replaying scripted responses, for tests.
pub struct MockRenderer {
    responses: Mutex<VecDeque<Result<HashMap<String, String>, FeedError>>>,
    urls: Mutex<Vec<String>>,
}

impl MockRenderer {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            urls: Mutex::new(Vec::new()),
        }
    }

    /// Queue a page that shows the given floor price and best offer text.
    pub fn push_prices(self, floor_price: &str, best_offer: &str) -> Self {
        let texts = HashMap::from([
            (FLOOR_PRICE.to_string(), floor_price.to_string()),
            (BEST_OFFER.to_string(), best_offer.to_string()),
        ]);
        self.push_response(Ok(texts))
    }

    /// Queue a failed render.
    pub fn push_error(self, error: FeedError) -> Self {
        self.push_response(Err(error))
    }

    /// Queue an arbitrary render result.
    pub fn push_response(self, response: Result<HashMap<String, String>, FeedError>) -> Self {
        if let Ok(mut responses) = self.responses.lock() {
            responses.push_back(response);
        }
        self
    }

    /// URLs requested so far, in order.
    pub fn requested_urls(&self) -> Vec<String> {
        self.urls.lock().map(|u| u.clone()).unwrap_or_default()
    }
}

impl Default for MockRenderer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PageRenderer for MockRenderer {
    async fn render_and_extract(
        &self,
        url: &str,
        _elements: &[ElementQuery],
        _timeout: Duration,
    ) -> Result<HashMap<String, String>, FeedError> {
        if let Ok(mut urls) = self.urls.lock() {
            urls.push(url.to_string());
        }
        self.responses
            .lock()
            .ok()
            .and_then(|mut r| r.pop_front())
            .unwrap_or_else(|| Err(FeedError::Browser("no scripted response".to_string())))
    }
}

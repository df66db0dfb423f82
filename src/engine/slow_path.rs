// * Slow Path - Headless Browser Rendering
// * Uses ChromiumOxide to render JavaScript-driven listing pages and hand back the final DOM

use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::constants::{
    DESKTOP_USER_AGENT, PAGE_TIMEOUT_MS, READY_POLL_MS, READY_TIMEOUT_MS, SETTLE_DELAY_MS,
    WINDOW_HEIGHT, WINDOW_WIDTH,
};
use crate::engine::pagination::PageSource;

// * Scroll halfway so lazily rendered cards get attached
const SCROLL_HALFWAY_JS: &str = "window.scrollTo(0, document.body.scrollHeight / 2)";

#[derive(Debug, Error)]
pub enum SlowPathError {
    #[error("Browser launch failed: {0}")]
    BrowserLaunch(String),

    #[error("Page navigation failed: {0}")]
    Navigation(String),

    #[error("Page timeout after {0}ms")]
    Timeout(u64),

    #[error("Content extraction failed: {0}")]
    ContentExtraction(String),
}

/// Launch and wait settings for the renderer
#[derive(Debug, Clone)]
pub struct RendererOptions {
    /// Show the browser window instead of running headless
    pub headed: bool,
    pub page_timeout: Duration,
    pub ready_timeout: Duration,
    pub settle_delay: Duration,
    pub user_agent: String,
}

impl Default for RendererOptions {
    fn default() -> Self {
        Self {
            headed: false,
            page_timeout: Duration::from_millis(PAGE_TIMEOUT_MS),
            ready_timeout: Duration::from_millis(READY_TIMEOUT_MS),
            settle_delay: Duration::from_millis(SETTLE_DELAY_MS),
            user_agent: DESKTOP_USER_AGENT.to_string(),
        }
    }
}

impl RendererOptions {
    /// Chrome command-line switches for these options
    pub fn launch_args(&self) -> Vec<String> {
        vec![
            "--disable-blink-features=AutomationControlled".to_string(),
            "--disable-dev-shm-usage".to_string(),
            "--disable-gpu".to_string(),
            format!("--user-agent={}", self.user_agent),
        ]
    }
}

// * BrowserRenderer owns one browser for the whole run; each page gets a fresh tab
pub struct BrowserRenderer {
    options: RendererOptions,
    browser: Option<Browser>,
    handler: Option<tokio::task::JoinHandle<()>>,
}

impl BrowserRenderer {
    // * Creates a new renderer (browser not launched until needed)
    pub fn new(options: RendererOptions) -> Self {
        Self {
            options,
            browser: None,
            handler: None,
        }
    }

    // * Launches the browser if not already running
    async fn ensure_browser(&mut self) -> Result<&Browser, SlowPathError> {
        if self.browser.is_none() {
            let mut builder = BrowserConfig::builder()
                .no_sandbox()
                .window_size(WINDOW_WIDTH, WINDOW_HEIGHT)
                .viewport(None);
            if self.options.headed {
                builder = builder.with_head();
            }
            for arg in self.options.launch_args() {
                builder = builder.arg(arg);
            }
            let config = builder.build().map_err(SlowPathError::BrowserLaunch)?;

            let (browser, mut handler) = Browser::launch(config)
                .await
                .map_err(|e| SlowPathError::BrowserLaunch(e.to_string()))?;

            // * Spawn handler in background
            let handle = tokio::spawn(async move {
                while let Some(_event) = handler.next().await {}
            });

            self.browser = Some(browser);
            self.handler = Some(handle);
            info!(headed = self.options.headed, "Browser launched");
        }

        self.browser
            .as_ref()
            .ok_or_else(|| SlowPathError::BrowserLaunch("browser unavailable".to_string()))
    }

    // * Navigates, waits for readiness, scrolls and returns the rendered HTML
    async fn render(
        &mut self,
        url: &str,
        ready_selector: Option<&str>,
    ) -> Result<String, SlowPathError> {
        let options = self.options.clone();
        let browser = self.ensure_browser().await?;

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| SlowPathError::Navigation(e.to_string()))?;

        let result = render_page(&page, url, ready_selector, &options).await;

        // * Close the tab regardless of outcome
        let _ = page.close().await;
        result
    }

    // * Closes the browser gracefully
    pub async fn shutdown(&mut self) {
        if let Some(mut browser) = self.browser.take() {
            let _ = browser.close().await;
        }
        if let Some(handler) = self.handler.take() {
            handler.abort();
        }
        info!("Browser shutdown complete");
    }
}

impl Default for BrowserRenderer {
    fn default() -> Self {
        Self::new(RendererOptions::default())
    }
}

impl Drop for BrowserRenderer {
    fn drop(&mut self) {
        // * Best effort cleanup - can't await in drop
        if let Some(handler) = self.handler.take() {
            handler.abort();
        }
    }
}

impl PageSource for BrowserRenderer {
    async fn fetch_rendered(
        &mut self,
        url: &str,
        ready_selector: Option<&str>,
    ) -> Result<String, SlowPathError> {
        self.render(url, ready_selector).await
    }
}

async fn render_page(
    page: &Page,
    url: &str,
    ready_selector: Option<&str>,
    options: &RendererOptions,
) -> Result<String, SlowPathError> {
    // * Navigate with timeout
    match tokio::time::timeout(options.page_timeout, page.goto(url)).await {
        Ok(Ok(_)) => {}
        Ok(Err(e)) => return Err(SlowPathError::Navigation(e.to_string())),
        Err(_) => return Err(SlowPathError::Timeout(options.page_timeout.as_millis() as u64)),
    }

    // * A missing ready element is not fatal; the cascade may still find cards
    if let Some(selector) = ready_selector {
        if !wait_for_selector(page, selector, options.ready_timeout).await {
            warn!(url, selector, "Ready selector not found before timeout");
        }
    }

    if let Err(e) = page.evaluate(SCROLL_HALFWAY_JS).await {
        debug!(url, error = %e, "Scroll script failed");
    }
    tokio::time::sleep(options.settle_delay).await;

    page.content()
        .await
        .map_err(|e| SlowPathError::ContentExtraction(e.to_string()))
}

// * Polls until the selector matches or the timeout passes
async fn wait_for_selector(page: &Page, selector: &str, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if page.find_element(selector).await.is_ok() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(READY_POLL_MS)).await;
    }
}

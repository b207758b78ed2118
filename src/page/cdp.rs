//! CDP-backed driver implementation.
//!
//! Wraps chromiumoxide's `Browser`/`Page` behind the engine's driver
//! traits. Pointer clicks and typing go through raw `Input.dispatch*`
//! commands so they stay Send-safe and humanized.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::input::{
    DispatchKeyEventParams, DispatchKeyEventType, DispatchMouseEventParams, DispatchMouseEventType,
    MouseButton,
};
use chromiumoxide::cdp::browser_protocol::target::TargetId;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use rand::{Rng, SeedableRng};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::driver::{BrowserDriver, PageDriver, PageRef};
use crate::errors::PageError;

/// Find a Chrome/Chromium executable on the system.
fn find_chrome() -> Option<std::path::PathBuf> {
    let candidates: Vec<std::path::PathBuf> = if cfg!(target_os = "windows") {
        let mut paths = vec![
            std::path::PathBuf::from(r"C:\Program Files\Google\Chrome\Application\chrome.exe"),
            std::path::PathBuf::from(
                r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
            ),
        ];
        if let Ok(local) = std::env::var("LOCALAPPDATA") {
            paths.push(std::path::PathBuf::from(format!(
                r"{}\Google\Chrome\Application\chrome.exe",
                local
            )));
        }
        paths
    } else if cfg!(target_os = "macos") {
        vec![std::path::PathBuf::from(
            "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
        )]
    } else {
        vec![
            std::path::PathBuf::from("/usr/bin/chromium"),
            std::path::PathBuf::from("/usr/bin/chromium-browser"),
            std::path::PathBuf::from("/usr/bin/google-chrome"),
            std::path::PathBuf::from("/usr/bin/google-chrome-stable"),
        ]
    };

    candidates.into_iter().find(|p| p.exists())
}

/// Launch configuration for the CDP browser.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CdpBrowserConfig {
    /// Path to Chrome/Chromium executable
    pub chrome_path: Option<String>,
    /// Run in headless mode
    pub headless: bool,
    /// User data directory
    pub user_data_dir: Option<String>,
    /// Window width
    pub window_width: u32,
    /// Window height
    pub window_height: u32,
}

impl Default for CdpBrowserConfig {
    fn default() -> Self {
        Self {
            chrome_path: None,
            headless: false,
            user_data_dir: None,
            window_width: 1920,
            window_height: 1080,
        }
    }
}

impl CdpBrowserConfig {
    /// Set headless mode
    pub fn headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Set Chrome path
    pub fn chrome_path(mut self, path: Option<String>) -> Self {
        self.chrome_path = path;
        self
    }

    /// Set user data directory
    pub fn user_data_dir(mut self, dir: Option<String>) -> Self {
        self.user_data_dir = dir;
        self
    }
}

/// A live browser plus the handler task driving its event loop.
pub struct CdpBrowser {
    browser: Arc<Browser>,
}

impl CdpBrowser {
    /// Launch Chrome and return a browser driver.
    pub async fn launch(config: CdpBrowserConfig) -> Result<Self, PageError> {
        if config.chrome_path.is_none() && find_chrome().is_none() {
            return Err(PageError::LaunchFailed(
                "Chrome/Chromium not found on this system".to_string(),
            ));
        }

        let mut builder = BrowserConfig::builder();

        if config.headless {
            builder = builder.arg("--headless=new");
        } else {
            builder = builder.with_head();
        }

        if let Some(ref path) = config.chrome_path {
            builder = builder.chrome_executable(path);
        } else if let Some(chrome_path) = find_chrome() {
            info!("Auto-detected Chrome at: {}", chrome_path.display());
            builder = builder.chrome_executable(chrome_path);
        }

        if let Some(ref dir) = config.user_data_dir {
            let _ = std::fs::create_dir_all(dir);
            builder = builder.user_data_dir(dir);
        }

        builder = builder
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-infobars")
            .arg("--no-default-browser-check")
            .arg("--disable-session-crashed-bubble")
            .arg("--disable-notifications")
            .arg("--no-sandbox")
            .window_size(config.window_width, config.window_height);

        let browser_config = builder
            .build()
            .map_err(PageError::LaunchFailed)?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| PageError::LaunchFailed(e.to_string()))?;

        // When the handler stream ends, Chrome has disconnected.
        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                debug!("browser event: {:?}", event);
            }
            warn!("Chrome disconnected (event handler ended)");
        });

        Ok(Self {
            browser: Arc::new(browser),
        })
    }

    /// Open a new tab at `url`.
    pub async fn new_page(&self, url: &str) -> Result<PageRef, PageError> {
        let page = self
            .browser
            .new_page(url)
            .await
            .map_err(|e| PageError::NavigationFailed(e.to_string()))?;
        Ok(Arc::new(CdpPage::new(page, self.browser.clone())))
    }
}

#[async_trait]
impl BrowserDriver for CdpBrowser {
    async fn latest_page(&self) -> Result<PageRef, PageError> {
        let pages = self
            .browser
            .pages()
            .await
            .map_err(|e| PageError::ConnectionLost(e.to_string()))?;
        let page = pages
            .into_iter()
            .last()
            .ok_or_else(|| PageError::ConnectionLost("No open pages".into()))?;
        Ok(Arc::new(CdpPage::new(page, self.browser.clone())))
    }

    async fn page_count(&self) -> Result<usize, PageError> {
        let pages = self
            .browser
            .pages()
            .await
            .map_err(|e| PageError::ConnectionLost(e.to_string()))?;
        Ok(pages.len())
    }
}

/// One CDP-driven tab.
pub struct CdpPage {
    page: Page,
    browser: Arc<Browser>,
    /// Target ids and URL captured at the last arm call, so popups and
    /// navigations triggered by the next click can be recognized.
    armed: Mutex<Option<ArmedState>>,
}

struct ArmedState {
    known_targets: HashSet<TargetId>,
    url: String,
}

impl CdpPage {
    pub fn new(page: Page, browser: Arc<Browser>) -> Self {
        Self {
            page,
            browser,
            armed: Mutex::new(None),
        }
    }

    async fn url_now(&self) -> Result<String, PageError> {
        self.page
            .url()
            .await
            .map_err(|e| PageError::ConnectionLost(e.to_string()))?
            .ok_or_else(|| PageError::ConnectionLost("No URL".into()))
    }
}

#[async_trait]
impl PageDriver for CdpPage {
    async fn navigate(&self, url: &str) -> Result<(), PageError> {
        debug!("navigating to: {}", url);
        self.page
            .goto(url)
            .await
            .map_err(|e| PageError::NavigationFailed(e.to_string()))?;
        Ok(())
    }

    async fn current_url(&self) -> Result<String, PageError> {
        self.url_now().await
    }

    async fn execute_js_with_timeout(
        &self,
        script: &str,
        timeout: Duration,
    ) -> Result<Value, PageError> {
        let result = tokio::time::timeout(timeout, self.page.evaluate(script))
            .await
            .map_err(|_| {
                PageError::Timeout(format!(
                    "JavaScript execution timed out after {}ms",
                    timeout.as_millis()
                ))
            })?
            .map_err(|e| PageError::JavaScriptError(e.to_string()))?;

        Ok(result.into_value().unwrap_or(Value::Null))
    }

    async fn wait_for_selector(
        &self,
        selector: &str,
        timeout: Duration,
    ) -> Result<bool, PageError> {
        // Poll with growing interval; SPAs render well after the load event.
        let start = std::time::Instant::now();
        let mut poll_interval = Duration::from_millis(100);
        let max_interval = Duration::from_secs(1);

        loop {
            if self.page.find_element(selector).await.is_ok() {
                return Ok(true);
            }
            if start.elapsed() >= timeout {
                return Ok(false);
            }
            tokio::time::sleep(poll_interval).await;
            poll_interval = (poll_interval * 2).min(max_interval);
        }
    }

    async fn click_element(&self, selector: &str, timeout: Duration) -> Result<(), PageError> {
        let fut = async {
            let element = self
                .page
                .find_element(selector)
                .await
                .map_err(|e| PageError::ElementNotFound(format!("{}: {}", selector, e)))?;
            element
                .scroll_into_view()
                .await
                .map_err(|e| PageError::JavaScriptError(e.to_string()))?
                .click()
                .await
                .map_err(|e| PageError::JavaScriptError(e.to_string()))?;
            Ok::<(), PageError>(())
        };

        tokio::time::timeout(timeout, fut)
            .await
            .map_err(|_| PageError::Timeout(format!("Click timed out: {}", selector)))?
    }

    async fn click_at(&self, x: f64, y: f64) -> Result<(), PageError> {
        let mut rng = rand::rngs::StdRng::from_entropy();

        // Humans do not click pixel-perfect centers
        let click_x = x + rng.gen_range(-2.0..2.0);
        let click_y = y + rng.gen_range(-2.0..2.0);

        let pre_click = rng.gen_range(50..150);
        tokio::time::sleep(Duration::from_millis(pre_click)).await;

        let mouse_down = DispatchMouseEventParams::builder()
            .r#type(DispatchMouseEventType::MousePressed)
            .x(click_x)
            .y(click_y)
            .button(MouseButton::Left)
            .click_count(1)
            .build()
            .unwrap();
        self.page
            .execute(mouse_down)
            .await
            .map_err(|e| PageError::JavaScriptError(format!("CDP mouseDown failed: {}", e)))?;

        let hold = rng.gen_range(40..120);
        tokio::time::sleep(Duration::from_millis(hold)).await;

        let mouse_up = DispatchMouseEventParams::builder()
            .r#type(DispatchMouseEventType::MouseReleased)
            .x(click_x)
            .y(click_y)
            .button(MouseButton::Left)
            .click_count(1)
            .build()
            .unwrap();
        self.page
            .execute(mouse_up)
            .await
            .map_err(|e| PageError::JavaScriptError(format!("CDP mouseUp failed: {}", e)))?;

        Ok(())
    }

    async fn type_text(&self, text: &str) -> Result<(), PageError> {
        let mut rng = rand::rngs::StdRng::from_entropy();

        for c in text.chars() {
            let key_down = DispatchKeyEventParams::builder()
                .r#type(DispatchKeyEventType::KeyDown)
                .text(c.to_string())
                .build()
                .unwrap();
            self.page
                .execute(key_down)
                .await
                .map_err(|e| PageError::JavaScriptError(format!("CDP keyDown failed: {}", e)))?;

            let key_up = DispatchKeyEventParams::builder()
                .r#type(DispatchKeyEventType::KeyUp)
                .build()
                .unwrap();
            self.page
                .execute(key_up)
                .await
                .map_err(|e| PageError::JavaScriptError(format!("CDP keyUp failed: {}", e)))?;

            let delay = rng.gen_range(50..150);
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        Ok(())
    }

    async fn press_enter(&self) -> Result<(), PageError> {
        let mut rng = rand::rngs::StdRng::from_entropy();
        let delay = rng.gen_range(100..300);
        tokio::time::sleep(Duration::from_millis(delay)).await;

        let key_down = DispatchKeyEventParams::builder()
            .r#type(DispatchKeyEventType::RawKeyDown)
            .key("Enter")
            .code("Enter")
            .windows_virtual_key_code(13)
            .native_virtual_key_code(13)
            .build()
            .unwrap();
        self.page
            .execute(key_down)
            .await
            .map_err(|e| PageError::JavaScriptError(format!("CDP Enter keyDown failed: {}", e)))?;

        // Char event with \r triggers form submission
        let char_event = DispatchKeyEventParams::builder()
            .r#type(DispatchKeyEventType::Char)
            .text("\r")
            .build()
            .unwrap();
        self.page
            .execute(char_event)
            .await
            .map_err(|e| PageError::JavaScriptError(format!("CDP Enter char failed: {}", e)))?;

        let key_up = DispatchKeyEventParams::builder()
            .r#type(DispatchKeyEventType::KeyUp)
            .key("Enter")
            .code("Enter")
            .windows_virtual_key_code(13)
            .native_virtual_key_code(13)
            .build()
            .unwrap();
        self.page
            .execute(key_up)
            .await
            .map_err(|e| PageError::JavaScriptError(format!("CDP Enter keyUp failed: {}", e)))?;

        Ok(())
    }

    async fn arm_popup_watch(&self) -> Result<(), PageError> {
        let pages = self
            .browser
            .pages()
            .await
            .map_err(|e| PageError::ConnectionLost(e.to_string()))?;
        let known_targets: HashSet<TargetId> =
            pages.iter().map(|p| p.target_id().clone()).collect();
        let url = self.url_now().await.unwrap_or_default();

        *self.armed.lock().await = Some(ArmedState { known_targets, url });
        Ok(())
    }

    async fn wait_armed_popup(&self, timeout: Duration) -> Result<Option<PageRef>, PageError> {
        let baseline = {
            let armed = self.armed.lock().await;
            match armed.as_ref() {
                Some(state) => state.known_targets.clone(),
                None => return Ok(None),
            }
        };

        let start = std::time::Instant::now();
        while start.elapsed() < timeout {
            let pages = self
                .browser
                .pages()
                .await
                .map_err(|e| PageError::ConnectionLost(e.to_string()))?;
            for page in pages {
                if !baseline.contains(page.target_id()) {
                    debug!("popup detected: {:?}", page.target_id());
                    return Ok(Some(Arc::new(CdpPage::new(page, self.browser.clone()))));
                }
            }
            tokio::time::sleep(Duration::from_millis(250)).await;
        }

        Ok(None)
    }

    async fn wait_for_navigation(&self, timeout: Duration) -> Result<bool, PageError> {
        let armed_url = {
            let armed = self.armed.lock().await;
            armed.as_ref().map(|state| state.url.clone())
        };
        let reference = match armed_url {
            Some(url) => url,
            None => self.url_now().await.unwrap_or_default(),
        };

        let start = std::time::Instant::now();
        while start.elapsed() < timeout {
            if let Ok(current) = self.url_now().await {
                if current != reference {
                    return Ok(true);
                }
            }
            tokio::time::sleep(Duration::from_millis(250)).await;
        }
        Ok(false)
    }

    async fn close(&self) -> Result<(), PageError> {
        self.page
            .clone()
            .close()
            .await
            .map_err(|e| PageError::ConnectionLost(e.to_string()))?;
        Ok(())
    }
}

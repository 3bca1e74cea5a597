//! Browser control over the Chrome DevTools Protocol.
//!
//! One Chromium process is launched per run; every case gets its own
//! incognito-style browser context and page, so cookies and `localStorage`
//! never leak between cases. The CDP implementation is only compiled with
//! the `browser` feature.

use serde::{Deserialize, Serialize};

/// Browser configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Run in headless mode
    pub headless: bool,
    /// Delay inserted before every page action, in milliseconds
    pub slow_mo_ms: u64,
    /// Viewport width
    pub viewport_width: u32,
    /// Viewport height
    pub viewport_height: u32,
    /// Path to chromium binary (None = auto-detect)
    pub chromium_path: Option<String>,
    /// Sandbox mode (disable for containers)
    pub sandbox: bool,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            slow_mo_ms: 0,
            viewport_width: 1280,
            viewport_height: 720,
            chromium_path: None,
            sandbox: true,
        }
    }
}

impl BrowserConfig {
    /// Set viewport dimensions
    #[must_use]
    pub const fn with_viewport(mut self, width: u32, height: u32) -> Self {
        self.viewport_width = width;
        self.viewport_height = height;
        self
    }

    /// Set headless mode
    #[must_use]
    pub const fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Set the slow-motion delay
    #[must_use]
    pub const fn with_slow_mo(mut self, slow_mo_ms: u64) -> Self {
        self.slow_mo_ms = slow_mo_ms;
        self
    }

    /// Set chromium path
    #[must_use]
    pub fn with_chromium_path(mut self, path: impl Into<String>) -> Self {
        self.chromium_path = Some(path.into());
        self
    }

    /// Disable sandbox (for containers/CI)
    #[must_use]
    pub const fn with_no_sandbox(mut self) -> Self {
        self.sandbox = false;
        self
    }
}

// ============================================================================
// Real CDP Implementation (when `browser` feature is enabled)
// ============================================================================

#[cfg(feature = "browser")]
mod cdp {
    use super::BrowserConfig;
    use crate::driver::{require_target, Key, PageDriver, Screenshot};
    use crate::locator::{Locator, LocatorQuery, MARK_ATTRIBUTE};
    use crate::result::{ProbeError, ProbeResult};

    use async_trait::async_trait;
    use chromiumoxide::browser::{Browser as CdpBrowser, BrowserConfig as CdpConfig};
    use chromiumoxide::cdp::browser_protocol::browser::BrowserContextId;
    use chromiumoxide::cdp::browser_protocol::input::{
        DispatchKeyEventParams, DispatchKeyEventType,
    };
    use chromiumoxide::cdp::browser_protocol::page::{
        CaptureScreenshotFormat, CaptureScreenshotParams,
    };
    use chromiumoxide::cdp::browser_protocol::target::{
        CreateBrowserContextParams, CreateTargetParams,
    };
    use chromiumoxide::handler::viewport::Viewport;
    use chromiumoxide::page::Page as CdpPage;
    use futures::StreamExt;
    use serde_json::Value;
    use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::Mutex;
    use tracing::{debug, warn};

    /// Browser process with a live CDP connection
    #[derive(Debug)]
    pub struct Browser {
        config: BrowserConfig,
        inner: Arc<Mutex<CdpBrowser>>,
        handle: tokio::task::JoinHandle<()>,
    }

    /// Page viewport for `config`; chromiumoxide emulates 800x600 otherwise
    pub(super) fn viewport(config: &BrowserConfig) -> Viewport {
        Viewport {
            width: config.viewport_width,
            height: config.viewport_height,
            ..Viewport::default()
        }
    }

    impl Browser {
        /// Launch a new browser instance
        pub async fn launch(config: BrowserConfig) -> ProbeResult<Self> {
            let mut builder = CdpConfig::builder()
                .window_size(config.viewport_width, config.viewport_height)
                .viewport(viewport(&config));

            if !config.headless {
                builder = builder.with_head();
            }

            if !config.sandbox {
                builder = builder.no_sandbox();
            }

            if let Some(ref path) = config.chromium_path {
                builder = builder.chrome_executable(path);
            }

            let cdp_config = builder
                .build()
                .map_err(|message| ProbeError::BrowserLaunch { message })?;

            let (browser, mut handler) =
                CdpBrowser::launch(cdp_config)
                    .await
                    .map_err(|e| ProbeError::BrowserLaunch {
                        message: e.to_string(),
                    })?;

            let handle = tokio::spawn(async move {
                while let Some(event) = handler.next().await {
                    if let Err(e) = event {
                        debug!(error = %e, "CDP handler stopped");
                        break;
                    }
                }
            });

            debug!(
                headless = config.headless,
                width = config.viewport_width,
                height = config.viewport_height,
                "browser launched"
            );

            Ok(Self {
                config,
                inner: Arc::new(Mutex::new(browser)),
                handle,
            })
        }

        /// Open a page in a fresh, isolated browser context
        pub async fn new_page(&self) -> ProbeResult<BrowserPage> {
            let mut browser = self.inner.lock().await;
            let context_id = browser
                .create_browser_context(CreateBrowserContextParams::default())
                .await
                .map_err(|e| ProbeError::page(format!("cannot create browser context: {e}")))?;

            let target = CreateTargetParams::builder()
                .url("about:blank")
                .browser_context_id(context_id.clone())
                .build()
                .map_err(ProbeError::page)?;

            let page = browser
                .new_page(target)
                .await
                .map_err(|e| ProbeError::page(e.to_string()))?;

            Ok(BrowserPage {
                page,
                context_id,
                browser: Arc::clone(&self.inner),
                slow_mo: Duration::from_millis(self.config.slow_mo_ms),
                next_mark: AtomicU64::new(0),
                closed: AtomicBool::new(false),
            })
        }

        /// Get the browser configuration
        #[must_use]
        pub const fn config(&self) -> &BrowserConfig {
            &self.config
        }

        /// Close the browser process
        pub async fn close(self) -> ProbeResult<()> {
            {
                let mut browser = self.inner.lock().await;
                browser
                    .close()
                    .await
                    .map_err(|e| ProbeError::page(format!("cannot close browser: {e}")))?;
                // reap the child process
                let _ = browser.wait().await;
            }
            self.handle.abort();
            Ok(())
        }
    }

    /// A page inside its own browser context
    #[derive(Debug)]
    pub struct BrowserPage {
        page: CdpPage,
        context_id: BrowserContextId,
        browser: Arc<Mutex<CdpBrowser>>,
        slow_mo: Duration,
        next_mark: AtomicU64,
        closed: AtomicBool,
    }

    impl BrowserPage {
        async fn pace(&self) {
            if !self.slow_mo.is_zero() {
                tokio::time::sleep(self.slow_mo).await;
            }
        }

        async fn key_event(&self, kind: DispatchKeyEventType, key: Key) -> ProbeResult<()> {
            let params = DispatchKeyEventParams::builder()
                .r#type(kind)
                .key(key.name())
                .code(key.code())
                .windows_virtual_key_code(key.key_code())
                .native_virtual_key_code(key.key_code())
                .build()
                .map_err(|message| ProbeError::Input { message })?;
            self.page
                .execute(params)
                .await
                .map_err(|e| ProbeError::Input {
                    message: e.to_string(),
                })?;
            Ok(())
        }
    }

    #[async_trait]
    impl PageDriver for BrowserPage {
        async fn goto(&self, url: &str) -> ProbeResult<()> {
            self.pace().await;
            debug!(url, "navigate");
            self.page
                .goto(url)
                .await
                .map_err(|e| ProbeError::Navigation {
                    url: url.to_string(),
                    message: e.to_string(),
                })?;
            Ok(())
        }

        async fn reload(&self) -> ProbeResult<()> {
            self.pace().await;
            let url = self.current_url().await.unwrap_or_default();
            self.page
                .reload()
                .await
                .map_err(|e| ProbeError::Navigation {
                    url,
                    message: e.to_string(),
                })?;
            Ok(())
        }

        async fn current_url(&self) -> ProbeResult<String> {
            let url = self
                .page
                .url()
                .await
                .map_err(|e| ProbeError::page(e.to_string()))?;
            Ok(url.unwrap_or_default())
        }

        async fn evaluate(&self, script: &str) -> ProbeResult<Value> {
            let result = self
                .page
                .evaluate(script)
                .await
                .map_err(|e| ProbeError::script(e.to_string()))?;
            Ok(result.value().cloned().unwrap_or(Value::Null))
        }

        async fn click(&self, locator: &Locator) -> ProbeResult<()> {
            self.pace().await;
            let token = self.next_mark.fetch_add(1, Ordering::Relaxed).to_string();
            let marked = self
                .query(
                    locator,
                    LocatorQuery::Mark {
                        token: token.clone(),
                    },
                )
                .await?;
            require_target(locator, &marked)?;

            let selector = format!("[{MARK_ATTRIBUTE}=\"{token}\"]");
            let element =
                self.page
                    .find_element(selector)
                    .await
                    .map_err(|e| ProbeError::Input {
                        message: format!("{locator}: {e}"),
                    })?;
            element.click().await.map_err(|e| ProbeError::Input {
                message: format!("click on {locator} failed: {e}"),
            })?;
            Ok(())
        }

        async fn dispatch_click(&self, locator: &Locator) -> ProbeResult<()> {
            self.pace().await;
            let value = self.query(locator, LocatorQuery::DispatchClick).await?;
            require_target(locator, &value)
        }

        async fn fill(&self, locator: &Locator, value: &str) -> ProbeResult<()> {
            self.pace().await;
            let result = self
                .query(
                    locator,
                    LocatorQuery::Fill {
                        value: value.to_string(),
                    },
                )
                .await?;
            require_target(locator, &result)
        }

        async fn press_key(&self, key: Key) -> ProbeResult<()> {
            self.pace().await;
            self.key_event(DispatchKeyEventType::KeyDown, key).await?;
            self.key_event(DispatchKeyEventType::KeyUp, key).await
        }

        async fn screenshot(&self) -> ProbeResult<Screenshot> {
            let params = CaptureScreenshotParams::builder()
                .format(CaptureScreenshotFormat::Png)
                .build();

            let screenshot =
                self.page
                    .execute(params)
                    .await
                    .map_err(|e| ProbeError::Screenshot {
                        message: e.to_string(),
                    })?;

            use base64::Engine;
            let data = base64::engine::general_purpose::STANDARD
                .decode(&screenshot.data)
                .map_err(|e| ProbeError::Screenshot {
                    message: e.to_string(),
                })?;
            Ok(Screenshot::new(data))
        }

        async fn close(&self) -> ProbeResult<()> {
            if self.closed.swap(true, Ordering::SeqCst) {
                return Ok(());
            }
            if let Err(e) = self.page.clone().close().await {
                warn!(error = %e, "page close failed, disposing context anyway");
            }
            let browser = self.browser.lock().await;
            browser
                .dispose_browser_context(self.context_id.clone())
                .await
                .map_err(|e| ProbeError::page(format!("cannot dispose browser context: {e}")))?;
            Ok(())
        }
    }
}

#[cfg(feature = "browser")]
pub use cdp::{Browser, BrowserPage};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = BrowserConfig::default();
        assert!(config.headless);
        assert!(config.sandbox);
        assert_eq!(config.slow_mo_ms, 0);
        assert_eq!((config.viewport_width, config.viewport_height), (1280, 720));
    }

    #[test]
    fn test_builders() {
        let config = BrowserConfig::default()
            .with_headless(false)
            .with_slow_mo(200)
            .with_viewport(800, 600)
            .with_chromium_path("/opt/chromium")
            .with_no_sandbox();
        assert!(!config.headless);
        assert_eq!(config.slow_mo_ms, 200);
        assert_eq!(config.viewport_width, 800);
        assert_eq!(config.chromium_path.as_deref(), Some("/opt/chromium"));
        assert!(!config.sandbox);
    }

    #[cfg(feature = "browser")]
    #[test]
    fn test_page_viewport_follows_config() {
        let viewport = cdp::viewport(&BrowserConfig::default());
        assert_eq!((viewport.width, viewport.height), (1280, 720));
        assert!(!viewport.emulating_mobile);

        let viewport = cdp::viewport(&BrowserConfig::default().with_viewport(1024, 768));
        assert_eq!((viewport.width, viewport.height), (1024, 768));
    }
}

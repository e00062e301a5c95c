use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::{EnableParams, EventRequestWillBeSent};
use chromiumoxide::Page;
use futures::StreamExt;

const VIEWPORT: (u32, u32) = (1920, 1080);
const SELECTOR_POLL: Duration = Duration::from_millis(250);

/// Narrow surface the Audiomack flow needs from a scripted browser, so the
/// sequencing logic can run against a fake in tests.
#[async_trait]
pub trait BrowserSession: Send {
    async fn navigate(&mut self, url: &str) -> anyhow::Result<()>;

    /// Wait up to `timeout` for the selector, then click it.
    async fn click_selector(&mut self, selector: &str, timeout: Duration) -> anyhow::Result<()>;

    /// Run a script for its side effects; the result value is discarded.
    async fn evaluate(&mut self, script: &str) -> anyhow::Result<()>;

    /// Text content of the page's first `h1`, if any.
    async fn first_heading_text(&mut self) -> anyhow::Result<Option<String>>;

    /// Chronological URLs of every network request captured so far.
    fn request_log(&self) -> Vec<String>;

    /// Unconditional teardown; must be safe to call after failures.
    async fn close(&mut self);
}

#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self) -> anyhow::Result<Box<dyn BrowserSession>>;
}

/// Headless Chromium launcher capturing network traffic.
pub struct ChromiumLauncher;

#[async_trait]
impl BrowserLauncher for ChromiumLauncher {
    async fn launch(&self) -> anyhow::Result<Box<dyn BrowserSession>> {
        let config = BrowserConfig::builder()
            .window_size(VIEWPORT.0, VIEWPORT.1)
            .arg("--mute-audio")
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .build()
            .map_err(|e| anyhow::anyhow!("configuración de browser inválida: {}", e))?;

        let (browser, mut handler) = Browser::launch(config).await?;
        let handler_task = tokio::spawn(async move { while handler.next().await.is_some() {} });

        let page = browser.new_page("about:blank").await?;
        page.execute(EnableParams::default()).await?;

        let requests = Arc::new(Mutex::new(Vec::new()));
        let sink = requests.clone();
        let mut events = page.event_listener::<EventRequestWillBeSent>().await?;
        let listener_task = tokio::spawn(async move {
            while let Some(event) = events.next().await {
                if let Ok(mut log) = sink.lock() {
                    log.push(event.request.url.clone());
                }
            }
        });

        Ok(Box::new(ChromiumSession {
            browser,
            page,
            requests,
            handler_task,
            listener_task,
        }))
    }
}

struct ChromiumSession {
    browser: Browser,
    page: Page,
    requests: Arc<Mutex<Vec<String>>>,
    handler_task: tokio::task::JoinHandle<()>,
    listener_task: tokio::task::JoinHandle<()>,
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    async fn navigate(&mut self, url: &str) -> anyhow::Result<()> {
        self.page.goto(url).await?;
        Ok(())
    }

    async fn click_selector(&mut self, selector: &str, timeout: Duration) -> anyhow::Result<()> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if let Ok(element) = self.page.find_element(selector).await {
                element.click().await?;
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                anyhow::bail!("selector no encontrado: {}", selector);
            }
            tokio::time::sleep(SELECTOR_POLL).await;
        }
    }

    async fn evaluate(&mut self, script: &str) -> anyhow::Result<()> {
        self.page.evaluate(script).await?;
        Ok(())
    }

    async fn first_heading_text(&mut self) -> anyhow::Result<Option<String>> {
        let element = match self.page.find_element("h1").await {
            Ok(el) => el,
            Err(_) => return Ok(None),
        };
        Ok(element.inner_text().await?)
    }

    fn request_log(&self) -> Vec<String> {
        self.requests.lock().map(|log| log.clone()).unwrap_or_default()
    }

    async fn close(&mut self) {
        if let Err(e) = self.browser.close().await {
            tracing::warn!("fallo al cerrar el browser: {}", e);
        }
        let _ = self.browser.wait().await;
        self.listener_task.abort();
        self.handler_task.abort();
    }
}

//! The CDP-backed implementations of the page-facing collaborator traits.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use pagesight_core::{
    DocumentRasterizer, ImageSource, PageHandle, PageScript, PageSnapshot, PageTarget,
    PageTransport, RemoteExecutor, TargetResolver,
};
use parking_lot::Mutex;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::cdp::protocol::PageInfo;
use crate::cdp::{CdpClient, CdpError};
use crate::scanner::{REQUEST_SNAPSHOT_JS, SCANNER_JS};
use crate::scripts::render_script;

#[derive(Debug, Clone)]
pub struct BridgeOptions {
    /// How long a freshly opened PDF gets to render before the screenshot.
    pub pdf_render_delay: Duration,
}

impl Default for BridgeOptions {
    fn default() -> Self {
        Self { pdf_render_delay: Duration::from_millis(1500) }
    }
}

pub struct CdpBridge {
    client: CdpClient,
    options: BridgeOptions,
    /// target id -> flattened session id
    sessions: Mutex<HashMap<String, String>>,
}

impl CdpBridge {
    pub fn new(client: CdpClient, options: BridgeOptions) -> Self {
        Self { client, options, sessions: Mutex::new(HashMap::new()) }
    }

    pub async fn connect(endpoint: &str, options: BridgeOptions) -> Result<Self, CdpError> {
        info!("[Bridge] connecting to {}", endpoint);
        Ok(Self::new(CdpClient::connect(endpoint).await?, options))
    }

    async fn session_for(&self, target_id: &str) -> Result<String, CdpError> {
        if let Some(session) = self.sessions.lock().get(target_id).cloned() {
            return Ok(session);
        }
        let session = self.client.attach(target_id).await?;
        debug!("[Bridge] attached to {} as {}", target_id, session);
        self.sessions.lock().insert(target_id.to_string(), session.clone());
        Ok(session)
    }

    /// Evaluate in the page, dropping the cached session if the call fails so
    /// the next attempt re-attaches.
    async fn evaluate(&self, page: &PageHandle, expression: &str) -> Result<Value, CdpError> {
        let session = self.session_for(page.as_str()).await?;
        let result = self.client.evaluate(&session, expression).await;
        if result.as_ref().is_err_and(CdpError::invalidates_session) {
            self.sessions.lock().remove(page.as_str());
        }
        result
    }

    async fn capture_first_page(&self, target_id: &str) -> Result<ImageSource> {
        let session = self.client.attach(target_id).await?;
        tokio::time::sleep(self.options.pdf_render_delay).await;
        let shot = self
            .client
            .call(
                "Page.captureScreenshot",
                Some(json!({ "format": "png", "captureBeyondViewport": false })),
                Some(&session),
            )
            .await?;
        decode_screenshot(&shot)
    }
}

/// The most recently focused web tab.
pub(crate) fn pick_active(pages: &[PageInfo]) -> Option<PageTarget> {
    pages.iter().find(|p| p.is_content_page()).map(|p| PageTarget {
        handle: PageHandle::new(p.id.clone()),
        url: p.url.clone(),
        title: p.title.clone(),
    })
}

pub(crate) fn parse_snapshot(value: Value) -> Result<Option<PageSnapshot>> {
    if value.is_null() {
        return Ok(None);
    }
    let snapshot = serde_json::from_value(value).context("scanner returned a malformed snapshot")?;
    Ok(Some(snapshot))
}

pub(crate) fn decode_screenshot(result: &Value) -> Result<ImageSource> {
    let data = result["data"].as_str().ok_or_else(|| anyhow!("screenshot had no data"))?;
    let bytes = STANDARD.decode(data).context("screenshot was not base64")?;
    Ok(ImageSource::png(bytes))
}

#[async_trait]
impl TargetResolver for CdpBridge {
    async fn active_page(&self) -> Result<Option<PageTarget>> {
        let pages = self.client.list_pages().await?;
        Ok(pick_active(&pages))
    }
}

#[async_trait]
impl PageTransport for CdpBridge {
    async fn request_snapshot(&self, page: &PageHandle) -> Result<Option<PageSnapshot>> {
        let value = self.evaluate(page, REQUEST_SNAPSHOT_JS).await?;
        parse_snapshot(value)
    }

    async fn inject_scanner(&self, page: &PageHandle) -> Result<()> {
        info!("[Bridge] injecting scanner into {}", page);
        self.evaluate(page, SCANNER_JS).await?;
        Ok(())
    }
}

#[async_trait]
impl RemoteExecutor for CdpBridge {
    async fn execute(&self, page: &PageHandle, script: &PageScript) -> Result<()> {
        let outcome = self.evaluate(page, &render_script(script)).await?;
        if outcome == Value::Bool(false) {
            debug!("[Bridge] {} found nothing on {}", script.name(), page);
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentRasterizer for CdpBridge {
    async fn rasterize(&self, href: &str) -> Result<ImageSource> {
        info!("[Bridge] rendering first page of {}", href);
        let target = self.client.create_target(href).await?;
        let image = self.capture_first_page(&target).await;
        if let Err(e) = self.client.close_target(&target).await {
            warn!("[Bridge] closing render tab {} failed: {}", target, e);
        }
        image
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(id: &str, kind: &str, url: &str) -> PageInfo {
        PageInfo { id: id.into(), page_type: kind.into(), title: format!("title {id}"), url: url.into() }
    }

    #[test]
    fn active_page_skips_internal_targets() {
        let pages = vec![
            page("a", "page", "chrome://settings"),
            page("b", "background_page", "https://ext"),
            page("c", "page", "https://news.example/story"),
            page("d", "page", "https://later.example"),
        ];
        let target = pick_active(&pages).unwrap();
        assert_eq!(target.handle.as_str(), "c");
        assert_eq!(target.title, "title c");
        assert!(pick_active(&pages[..2]).is_none());
    }

    #[test]
    fn null_means_no_scanner() {
        assert!(parse_snapshot(Value::Null).unwrap().is_none());
        let snap = parse_snapshot(json!({ "title": "T", "url": "https://x", "timestamp": 0 })).unwrap();
        assert_eq!(snap.unwrap().title, "T");
        assert!(parse_snapshot(json!({ "title": 3 })).is_err());
    }

    #[test]
    fn screenshots_decode_to_png_bytes() {
        let image = decode_screenshot(&json!({ "data": "iVBORw==" })).unwrap();
        assert_eq!(image, ImageSource::png(vec![0x89u8, 0x50, 0x4e, 0x47]));
        assert!(decode_screenshot(&json!({})).is_err());
    }
}

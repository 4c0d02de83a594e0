//! CDP wire messages and discovery payloads.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Serialize)]
pub struct CdpRequest {
    pub id: u64,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(rename = "sessionId")]
    pub session_id: Option<String>,
}

/// A command response (`id` set) or an event (`method` set).
#[derive(Debug, Deserialize)]
pub struct CdpResponse {
    pub id: Option<u64>,
    pub result: Option<Value>,
    pub error: Option<CdpErrorResponse>,
    pub method: Option<String>,
    #[serde(rename = "sessionId")]
    pub session_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CdpErrorResponse {
    pub code: i64,
    pub message: String,
}

/// Entry from the `/json/list` endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub id: String,
    #[serde(rename = "type")]
    pub page_type: String,
    pub title: String,
    pub url: String,
}

impl PageInfo {
    /// A tab showing web content, as opposed to devtools, extensions, or workers.
    pub fn is_content_page(&self) -> bool {
        self.page_type == "page"
            && (self.url.starts_with("http://")
                || self.url.starts_with("https://")
                || self.url.starts_with("file://"))
    }
}

/// Browser version info. Chrome returns PascalCase field names here.
#[derive(Debug, Clone, Deserialize)]
pub struct BrowserVersion {
    #[serde(rename = "Browser")]
    pub browser: String,
    #[serde(rename = "webSocketDebuggerUrl")]
    pub web_socket_debugger_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_omits_absent_session() {
        let req = CdpRequest { id: 7, method: "Target.getTargets".into(), params: None, session_id: None };
        assert_eq!(serde_json::to_string(&req).unwrap(), r#"{"id":7,"method":"Target.getTargets"}"#);
    }

    #[test]
    fn only_web_tabs_are_content_pages() {
        let page = |t: &str, url: &str| PageInfo {
            id: "1".into(),
            page_type: t.into(),
            title: String::new(),
            url: url.into(),
        };
        assert!(page("page", "https://example.com").is_content_page());
        assert!(!page("page", "chrome://newtab/").is_content_page());
        assert!(!page("service_worker", "https://example.com/sw.js").is_content_page());
    }
}

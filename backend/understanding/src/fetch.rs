//! Turning an [`ImageSource`] into bytes a model endpoint accepts.

use anyhow::{bail, Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine};
use bytes::Bytes;
use pagesight_core::ImageSource;
use tracing::debug;

/// Largest image we will download and forward to a provider.
pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

/// Bytes and MIME type of `image`, downloading it when it is a URL.
pub async fn load_image(http: &reqwest::Client, image: &ImageSource) -> Result<(Bytes, String)> {
    match image {
        ImageSource::Bytes { data, mime_type } => Ok((data.clone(), mime_type.clone())),
        ImageSource::Url(url) => {
            debug!("[Fetch] downloading {}", url);
            let resp = http
                .get(url)
                .header("User-Agent", "PageSight/0.1")
                .send()
                .await
                .with_context(|| format!("fetching {url}"))?;
            if !resp.status().is_success() {
                bail!("fetching {} returned {}", url, resp.status());
            }
            let mime = resp
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(|v| v.split(';').next().unwrap_or(v).trim().to_string())
                .filter(|v| v.starts_with("image/"))
                .unwrap_or_else(|| guess_mime(url).to_string());
            let data = resp.bytes().await?;
            if data.len() > MAX_IMAGE_BYTES {
                bail!("image {} is {} bytes, over the {} byte limit", url, data.len(), MAX_IMAGE_BYTES);
            }
            Ok((data, mime))
        }
    }
}

/// `data:` URL for inline upload.
pub fn to_data_url(data: &[u8], mime_type: &str) -> String {
    format!("data:{};base64,{}", mime_type, STANDARD.encode(data))
}

fn guess_mime(url: &str) -> &'static str {
    let path = url.split(['?', '#']).next().unwrap_or(url).to_ascii_lowercase();
    if path.ends_with(".png") {
        "image/png"
    } else if path.ends_with(".gif") {
        "image/gif"
    } else if path.ends_with(".webp") {
        "image/webp"
    } else if path.ends_with(".svg") {
        "image/svg+xml"
    } else {
        "image/jpeg"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::{matchers, Mock, MockServer, ResponseTemplate};

    #[test]
    fn data_url_is_base64() {
        assert_eq!(to_data_url(b"hi", "image/png"), "data:image/png;base64,aGk=");
    }

    #[test]
    fn mime_falls_back_to_extension() {
        assert_eq!(guess_mime("https://x/a.PNG?v=2"), "image/png");
        assert_eq!(guess_mime("https://x/photo"), "image/jpeg");
    }

    #[tokio::test]
    async fn downloads_url_sources() {
        let server = MockServer::start().await;
        Mock::given(matchers::method("GET"))
            .and(matchers::path("/cat.webp"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "image/webp; charset=binary")
                    .set_body_bytes(vec![1u8, 2, 3]),
            )
            .mount(&server)
            .await;

        let http = reqwest::Client::new();
        let src = ImageSource::Url(format!("{}/cat.webp", server.uri()));
        let (data, mime) = load_image(&http, &src).await.unwrap();
        assert_eq!(data.as_ref(), &[1u8, 2, 3]);
        assert_eq!(mime, "image/webp");
    }

    #[tokio::test]
    async fn http_errors_fail_the_load() {
        let server = MockServer::start().await;
        Mock::given(matchers::any())
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        let http = reqwest::Client::new();
        let src = ImageSource::Url(format!("{}/gone.png", server.uri()));
        assert!(load_image(&http, &src).await.is_err());
    }
}

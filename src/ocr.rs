//! Image OCR provider abstraction.
//!
//! Uploaded photos of notes go through a hosted OCR API. The trait keeps the
//! backend swappable; only the Mistral OCR provider is wired in today.

use anyhow::Result;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Async trait implemented by each OCR backend.
#[async_trait::async_trait]
pub trait OcrProvider: Send + Sync {
    fn name(&self) -> &str;
    /// Extract text from an image.
    async fn recognize(&self, filename: &str, data: &[u8]) -> Result<String>;
}

const MISTRAL_OCR_URL: &str = "https://api.mistral.ai/v1/ocr";

pub struct MistralOcrProvider {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl MistralOcrProvider {
    /// Returns None when MISTRAL_API_KEY is unset; image uploads are then
    /// rejected instead of silently returning garbage. MISTRAL_OCR_URL
    /// overrides the endpoint.
    pub fn from_env(client: reqwest::Client) -> Option<Self> {
        let api_key = std::env::var("MISTRAL_API_KEY").ok()?;
        let base_url =
            std::env::var("MISTRAL_OCR_URL").unwrap_or_else(|_| MISTRAL_OCR_URL.to_string());
        Some(Self {
            api_key,
            base_url,
            client,
        })
    }

    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        client: reqwest::Client,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.into(),
            client,
        }
    }
}

// ── Mistral API request/response types ──────────────────────────────────────

#[derive(Serialize)]
struct OcrRequest {
    model: String,
    document: DocumentSource,
}

#[derive(Serialize)]
#[serde(tag = "type")]
enum DocumentSource {
    #[serde(rename = "image_url")]
    ImageUrl { image_url: String },
}

#[derive(Deserialize)]
struct OcrResponse {
    pages: Vec<MistralPage>,
}

#[derive(Deserialize)]
struct MistralPage {
    markdown: String,
}

// ── Provider implementation ─────────────────────────────────────────────────

#[async_trait::async_trait]
impl OcrProvider for MistralOcrProvider {
    fn name(&self) -> &str {
        "mistral_ocr"
    }

    async fn recognize(&self, filename: &str, data: &[u8]) -> Result<String> {
        let mime = sniff_image_mime(data);
        let data_url = format!("data:{};base64,{}", mime, BASE64.encode(data));

        let body = OcrRequest {
            model: "mistral-ocr-latest".to_string(),
            document: DocumentSource::ImageUrl {
                image_url: data_url,
            },
        };

        info!("MistralOcrProvider: recognizing {} ({} bytes)", filename, data.len());

        let resp = self
            .client
            .post(&self.base_url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            anyhow::bail!("Mistral OCR API error ({}): {}", status, text);
        }

        let ocr: OcrResponse = resp.json().await?;
        debug!("MistralOcrProvider: {} page(s) recognized", ocr.pages.len());

        let text = ocr
            .pages
            .into_iter()
            .map(|p| p.markdown)
            .collect::<Vec<_>>()
            .join("\n\n");

        Ok(text)
    }
}

/// Detect the image MIME type from magic bytes, defaulting to PNG.
fn sniff_image_mime(data: &[u8]) -> &'static str {
    match image::guess_format(data) {
        Ok(image::ImageFormat::Jpeg) => "image/jpeg",
        Ok(image::ImageFormat::Gif) => "image/gif",
        Ok(image::ImageFormat::WebP) => "image/webp",
        _ => "image/png",
    }
}

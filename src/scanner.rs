//! Receipt scanner client
//!
//! Sends a receipt photo to a vision-model inference endpoint and turns the
//! reply into a [`RawBatch`]. The reply is untrusted model text: it gets the
//! loosest possible parse here and full validation in the batch module before
//! anything reaches the store.

use crate::batch::RawBatch;
use crate::error::ScanError;
use base64::Engine;
use serde::Deserialize;
use std::path::Path;

/// Maximum accepted receipt image size
const MAX_IMAGE_BYTES: u64 = 10 * 1024 * 1024;

/// Default inference endpoint (OpenAI-compatible chat completions)
const DEFAULT_ENDPOINT: &str = "https://router.huggingface.co/v1/chat/completions";

/// Default vision model used for receipt transcription
const DEFAULT_MODEL: &str = "google/gemma-3-27b-it";

/// Instruction sent alongside the receipt image
const EXTRACT_PROMPT: &str = "Extract every purchased line item from this grocery receipt. \
Reply with only a JSON object mapping each item name to an object with \
\"quantity\" and \"unit_price\" fields, e.g. \
{\"milk\": {\"quantity\": 2, \"unit_price\": 3.49}}. \
No explanations, no markdown fences.";

/// Client for the receipt transcription service
pub struct ReceiptScanner {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_token: Option<String>,
}

/// Chat-completion reply envelope (only the fields we read)
#[derive(Debug, Deserialize)]
struct ChatCompletionReply {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

impl ChatCompletionReply {
    fn message_content(&self) -> Option<&str> {
        self.choices.first().map(|c| c.message.content.as_str())
    }
}

impl ReceiptScanner {
    pub fn new(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        api_token: Option<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            model: model.into(),
            api_token,
        }
    }

    /// Build a scanner from the environment.
    ///
    /// `FRIDGE_SCANNER_ENDPOINT` and `FRIDGE_SCANNER_MODEL` override the
    /// defaults; `HF_TOKEN` supplies the bearer token when set.
    pub fn from_env() -> Self {
        let endpoint = std::env::var("FRIDGE_SCANNER_ENDPOINT")
            .unwrap_or_else(|_| DEFAULT_ENDPOINT.to_string());
        let model =
            std::env::var("FRIDGE_SCANNER_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let api_token = std::env::var("HF_TOKEN").ok();
        Self::new(endpoint, model, api_token)
    }

    /// Scan a receipt image and return the extracted items.
    ///
    /// The image is validated (exists, supported format, size cap) before any
    /// network traffic. The returned batch is unvalidated scanner output.
    pub async fn scan(&self, image_path: &Path) -> Result<RawBatch, ScanError> {
        let data_url = read_receipt_image(image_path)?;

        log::info!("Scanning receipt: {}", image_path.display());

        let payload = serde_json::json!({
            "model": self.model,
            "messages": [{
                "role": "user",
                "content": [
                    { "type": "text", "text": EXTRACT_PROMPT },
                    { "type": "image_url", "image_url": { "url": data_url } },
                ],
            }],
        });

        let mut request = self
            .client
            .post(&self.endpoint)
            .header("User-Agent", "fridge_sync/1.0")
            .json(&payload);
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(ScanError::HttpStatus(response.status()));
        }

        let reply: ChatCompletionReply = response.json().await?;
        let content = reply
            .message_content()
            .ok_or_else(|| ScanError::Parse("reply contained no choices".to_string()))?;

        let batch = parse_items(content)?;
        log::info!("Parsed {} items from receipt", batch.len());
        Ok(batch)
    }
}

/// Validate the image file and return it as a base64 data URL.
fn read_receipt_image(path: &Path) -> Result<String, ScanError> {
    if !path.is_file() {
        return Err(ScanError::NotFound(path.to_path_buf()));
    }

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    let mime = mime_for_extension(&extension)
        .ok_or_else(|| ScanError::UnsupportedFormat(extension.clone()))?;

    let size = path.metadata()?.len();
    if size > MAX_IMAGE_BYTES {
        return Err(ScanError::TooLarge {
            size,
            max: MAX_IMAGE_BYTES,
        });
    }

    let bytes = std::fs::read(path)?;
    let encoded = base64::engine::general_purpose::STANDARD.encode(&bytes);
    Ok(format!("data:{};base64,{}", mime, encoded))
}

fn mime_for_extension(extension: &str) -> Option<&'static str> {
    match extension {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "bmp" => Some("image/bmp"),
        "tiff" => Some("image/tiff"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

/// Parse model reply text into a raw batch.
///
/// Tries the whole reply as JSON first; models that wrap the object in prose
/// or code fences get the outermost `{...}` span extracted and parsed.
pub fn parse_items(text: &str) -> Result<RawBatch, ScanError> {
    if let Ok(batch) = serde_json::from_str::<RawBatch>(text) {
        return Ok(batch);
    }

    let snippet = extract_json_object(text)
        .ok_or_else(|| ScanError::Parse("no JSON object found in reply".to_string()))?;
    serde_json::from_str(snippet).map_err(|e| ScanError::Parse(e.to_string()))
}

/// Outermost `{...}` span of the text, if any.
fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| &text[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn parse_items_accepts_plain_json_object() {
        let batch =
            parse_items(r#"{"milk": {"quantity": 2, "unit_price": 3.49}}"#).unwrap();
        assert_eq!(batch.len(), 1);
        assert!(batch.contains_key("milk"));
    }

    #[test]
    fn parse_items_extracts_object_from_prose() {
        let reply = "Here are the items I found:\n```json\n\
            {\"milk\": {\"quantity\": 2, \"unit_price\": 3.49}}\n```\nLet me know!";
        let batch = parse_items(reply).unwrap();
        assert!(batch.contains_key("milk"));
    }

    #[test]
    fn parse_items_rejects_reply_without_object() {
        let err = parse_items("I could not read this receipt, sorry.").unwrap_err();
        assert!(matches!(err, ScanError::Parse(_)));
    }

    #[test]
    fn parse_items_rejects_malformed_object() {
        let err = parse_items("{\"milk\": {\"quantity\": }").unwrap_err();
        assert!(matches!(err, ScanError::Parse(_)));
    }

    #[test]
    fn parse_items_keeps_untrusted_values_raw() {
        // Strings and missing fields survive parsing; validation decides later
        let batch =
            parse_items(r#"{"milk": {"quantity": "2"}, "eggs": {"unit_price": 0.25}}"#).unwrap();
        assert!(batch["milk"].unit_price.is_none());
        assert!(batch["eggs"].quantity.is_none());
    }

    #[test]
    fn missing_image_is_not_found() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = read_receipt_image(&dir.path().join("nope.jpg")).unwrap_err();
        assert!(matches!(err, ScanError::NotFound(_)));
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("receipt.pdf");
        fs::write(&path, b"not an image").unwrap();

        let err = read_receipt_image(&path).unwrap_err();
        assert!(matches!(err, ScanError::UnsupportedFormat(ref ext) if ext == "pdf"));
    }

    #[test]
    fn oversized_image_is_rejected() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("huge.jpg");
        let file = fs::File::create(&path).unwrap();
        file.set_len(MAX_IMAGE_BYTES + 1).unwrap();

        let err = read_receipt_image(&path).unwrap_err();
        assert!(matches!(err, ScanError::TooLarge { .. }));
    }

    #[test]
    fn small_image_encodes_to_data_url() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("receipt.png");
        fs::write(&path, b"\x89PNG\r\n").unwrap();

        let data_url = read_receipt_image(&path).unwrap();
        assert!(data_url.starts_with("data:image/png;base64,"));
    }

    #[test]
    fn extension_check_is_case_insensitive() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("receipt.JPG");
        fs::write(&path, b"\xff\xd8\xff").unwrap();

        assert!(read_receipt_image(&path).is_ok());
    }
}

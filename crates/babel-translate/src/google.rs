use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::instrument;

use babel_core::errors::TranslateError;

use crate::provider::{Translation, Translator};

const DEFAULT_ENDPOINT: &str = "https://translate.googleapis.com/translate_a/single";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Configuration for the Google translate client.
#[derive(Clone, Debug)]
pub struct GoogleConfig {
    /// The `translate_a/single` endpoint. Overridable for self-hosted
    /// proxies and for tests.
    pub endpoint: String,
    pub request_timeout: Duration,
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

/// Translator backed by the keyless `client=gtx` endpoint — the same one
/// browser extensions and the googletrans library call. No API key, no
/// auth headers; the response is a nested positional array.
pub struct GoogleTranslator {
    client: Client,
    config: GoogleConfig,
}

impl GoogleTranslator {
    pub fn new(config: GoogleConfig) -> Result<Self, TranslateError> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| TranslateError::UpstreamUnavailable(e.to_string()))?;
        Ok(Self { client, config })
    }

    fn map_transport_error(&self, e: reqwest::Error) -> TranslateError {
        if e.is_timeout() {
            TranslateError::Timeout(self.config.request_timeout)
        } else {
            TranslateError::UpstreamUnavailable(e.to_string())
        }
    }
}

#[async_trait]
impl Translator for GoogleTranslator {
    fn name(&self) -> &str {
        "google"
    }

    #[instrument(skip(self, text), fields(source = %source_hint, target = %target))]
    async fn translate(
        &self,
        text: &str,
        source_hint: &str,
        target: &str,
    ) -> Result<Translation, TranslateError> {
        if text.trim().is_empty() {
            return Err(TranslateError::EmptyInput);
        }

        let resp = self
            .client
            .get(&self.config.endpoint)
            .query(&[
                ("client", "gtx"),
                ("sl", source_hint),
                ("tl", target),
                ("dt", "t"),
                ("q", text),
            ])
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(TranslateError::from_status(status, body));
        }

        let body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| TranslateError::MalformedResponse(e.to_string()))?;

        parse_gtx_response(&body, source_hint, target)
    }
}

/// Pull the translated text and detected source language out of the gtx
/// response. Shape: `[[["<chunk>", "<original>", ...], ...], null, "<src>", ...]`
/// — chunk array first, detected source at index 2.
pub fn parse_gtx_response(
    body: &serde_json::Value,
    source_hint: &str,
    target: &str,
) -> Result<Translation, TranslateError> {
    let segments = body
        .get(0)
        .and_then(|v| v.as_array())
        .ok_or_else(|| TranslateError::MalformedResponse("missing segment array".into()))?;

    let mut text = String::new();
    for segment in segments {
        if let Some(chunk) = segment.get(0).and_then(|v| v.as_str()) {
            text.push_str(chunk);
        }
    }

    if text.is_empty() {
        return Err(TranslateError::MalformedResponse("no translated segments".into()));
    }

    let detected_source = body
        .get(2)
        .and_then(|v| v.as_str())
        .unwrap_or(source_hint)
        .to_string();

    Ok(Translation {
        text,
        detected_source,
        target: target.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    // Captured from a live `client=gtx` call for "नमस्ते दुनिया" hi->en.
    const FIXTURE: &str = r#"[[["Hello ","नमस्ते ",null,null,10],["world","दुनिया",null,null,10]],null,"hi",null,null,null,null,[]]"#;

    #[test]
    fn parse_concatenates_segments() {
        let body: serde_json::Value = serde_json::from_str(FIXTURE).unwrap();
        let t = parse_gtx_response(&body, "auto", "en").unwrap();
        assert_eq!(t.text, "Hello world");
        assert_eq!(t.detected_source, "hi");
        assert_eq!(t.target, "en");
    }

    #[test]
    fn parse_falls_back_to_hint_without_detection() {
        let body: serde_json::Value =
            serde_json::from_str(r#"[[["Bonjour","Hello",null,null,1]]]"#).unwrap();
        let t = parse_gtx_response(&body, "en", "fr").unwrap();
        assert_eq!(t.text, "Bonjour");
        assert_eq!(t.detected_source, "en");
    }

    #[test]
    fn parse_rejects_wrong_shape() {
        let body: serde_json::Value = serde_json::from_str(r#"{"error":"nope"}"#).unwrap();
        let err = parse_gtx_response(&body, "auto", "en").unwrap_err();
        assert!(matches!(err, TranslateError::MalformedResponse(_)));
    }

    #[test]
    fn parse_rejects_empty_segments() {
        let body: serde_json::Value = serde_json::from_str(r#"[[],null,"en"]"#).unwrap();
        let err = parse_gtx_response(&body, "auto", "en").unwrap_err();
        assert!(matches!(err, TranslateError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn empty_input_is_rejected_locally() {
        let translator = GoogleTranslator::new(GoogleConfig::default()).unwrap();
        let err = translator.translate("   ", "auto", "en").await.unwrap_err();
        assert!(matches!(err, TranslateError::EmptyInput));
    }

    #[tokio::test]
    async fn unreachable_endpoint_maps_to_upstream_unavailable() {
        let translator = GoogleTranslator::new(GoogleConfig {
            // Nothing listens here
            endpoint: "http://127.0.0.1:1/translate_a/single".into(),
            request_timeout: Duration::from_secs(2),
        })
        .unwrap();
        let err = translator.translate("hello", "auto", "fr").await.unwrap_err();
        assert!(
            matches!(
                err,
                TranslateError::UpstreamUnavailable(_) | TranslateError::Timeout(_)
            ),
            "got: {err:?}"
        );
    }
}

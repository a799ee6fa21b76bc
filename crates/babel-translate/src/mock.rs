use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use babel_core::errors::TranslateError;

use crate::provider::{Translation, Translator};

/// Pre-programmed replies for deterministic testing without network calls.
pub enum MockReply {
    Reply(Translation),
    Error(TranslateError),
    /// Wait a duration, then resolve the inner reply.
    Delay(Duration, Box<MockReply>),
}

impl MockReply {
    /// Convenience: a successful translation to `text`, detected as `detected`.
    pub fn text(text: &str, detected: &str, target: &str) -> Self {
        Self::Reply(Translation {
            text: text.to_string(),
            detected_source: detected.to_string(),
            target: target.to_string(),
        })
    }

    pub fn delayed(delay: Duration, inner: MockReply) -> Self {
        Self::Delay(delay, Box::new(inner))
    }
}

/// Translator that consumes scripted replies in order. Calls past the end
/// of the script fail loudly so a test can't silently over-consume.
pub struct MockTranslator {
    replies: Mutex<VecDeque<MockReply>>,
    calls: AtomicUsize,
}

impl MockTranslator {
    pub fn new(replies: Vec<MockReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            calls: AtomicUsize::new(0),
        }
    }

    /// A translator that always answers with the same text.
    pub fn replying(text: &str, detected: &str, target: &str) -> Self {
        Self::new(vec![MockReply::text(text, detected, target)])
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Translator for MockTranslator {
    fn name(&self) -> &str {
        "mock"
    }

    async fn translate(
        &self,
        _text: &str,
        _source_hint: &str,
        _target: &str,
    ) -> Result<Translation, TranslateError> {
        let idx = self.calls.fetch_add(1, Ordering::Relaxed);

        let reply = self
            .replies
            .lock()
            .expect("mock replies lock")
            .pop_front()
            .ok_or_else(|| {
                TranslateError::MalformedResponse(format!("no mock reply scripted for call {idx}"))
            })?;

        resolve(reply).await
    }
}

/// Unrolls nested delays iteratively to avoid recursive async.
async fn resolve(reply: MockReply) -> Result<Translation, TranslateError> {
    let mut current = reply;
    loop {
        match current {
            MockReply::Reply(t) => return Ok(t),
            MockReply::Error(e) => return Err(e),
            MockReply::Delay(duration, inner) => {
                tokio::time::sleep(duration).await;
                current = *inner;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scripted_reply() {
        let mock = MockTranslator::replying("Bonjour", "en", "fr");
        let t = mock.translate("Hello", "auto", "fr").await.unwrap();
        assert_eq!(t.text, "Bonjour");
        assert_eq!(t.detected_source, "en");
        assert_eq!(mock.call_count(), 1);
    }

    #[tokio::test]
    async fn replies_consumed_in_order() {
        let mock = MockTranslator::new(vec![
            MockReply::text("first", "en", "fr"),
            MockReply::text("second", "en", "fr"),
        ]);
        assert_eq!(mock.translate("a", "auto", "fr").await.unwrap().text, "first");
        assert_eq!(mock.translate("b", "auto", "fr").await.unwrap().text, "second");
        assert_eq!(mock.call_count(), 2);
    }

    #[tokio::test]
    async fn scripted_error() {
        let mock = MockTranslator::new(vec![MockReply::Error(TranslateError::UpstreamUnavailable(
            "down".into(),
        ))]);
        let err = mock.translate("a", "auto", "en").await.unwrap_err();
        assert!(matches!(err, TranslateError::UpstreamUnavailable(_)));
    }

    #[tokio::test]
    async fn exhausted_script_errors() {
        let mock = MockTranslator::new(vec![MockReply::text("only", "en", "fr")]);
        let _ = mock.translate("a", "auto", "fr").await;
        let err = mock.translate("b", "auto", "fr").await.unwrap_err();
        assert!(matches!(err, TranslateError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn delayed_reply_waits() {
        let mock = MockTranslator::new(vec![MockReply::delayed(
            Duration::from_millis(50),
            MockReply::text("late", "en", "de"),
        )]);
        let start = std::time::Instant::now();
        let t = mock.translate("a", "auto", "de").await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(40));
        assert_eq!(t.text, "late");
    }
}

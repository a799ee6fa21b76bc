use async_trait::async_trait;

use babel_core::errors::TranslateError;

/// A completed translation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Translation {
    pub text: String,
    /// Language the upstream decided the input was in. Equals the hint
    /// unless the hint was `auto`.
    pub detected_source: String,
    pub target: String,
}

/// The translation gateway boundary. Implementations call an external
/// service; latency is unpredictable and availability is not guaranteed.
/// Callers make exactly one attempt per request — there is no retry
/// policy at this seam.
#[async_trait]
pub trait Translator: Send + Sync {
    fn name(&self) -> &str;

    async fn translate(
        &self,
        text: &str,
        source_hint: &str,
        target: &str,
    ) -> Result<Translation, TranslateError>;
}

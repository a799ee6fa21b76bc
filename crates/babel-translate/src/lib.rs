pub mod google;
pub mod provider;

pub mod mock;

pub use google::{GoogleConfig, GoogleTranslator};
pub use mock::{MockReply, MockTranslator};
pub use provider::{Translation, Translator};

//! Remote model providers.

mod gemini;

pub use gemini::{
    GeminiModel, GeminiProvider, GeminiProviderBuilder, DEFAULT_BASE_URL, DESCRIBE_INSTRUCTION,
};

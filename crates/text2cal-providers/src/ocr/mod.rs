mod claude;
mod gemini;
mod google;
mod openai;

pub use claude::ClaudeVisionOcr;
pub use gemini::GeminiVisionOcr;
pub use google::GoogleVisionOcr;
pub use openai::OpenAiVisionOcr;

/// Instruction given to conversational vision models
pub(crate) const EXTRACT_INSTRUCTION: &str =
    "Extract all text from this image exactly as it appears.";

pub mod gemini; // Google Gemini text generation
pub mod rekognition; // AWS Rekognition label detection

pub use gemini::GeminiClient;
pub use rekognition::RekognitionClient;

use anyhow::Result;

use crate::models::Label;

/// Trait for image-labeling services (Rekognition, etc.)
#[async_trait::async_trait]
pub trait LabelDetector: Send + Sync {
    async fn detect_labels(&self, image: &[u8]) -> Result<Vec<Label>>;
}

/// Trait for text-generation models (Gemini, etc.)
#[async_trait::async_trait]
pub trait RecipeModel: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;
}

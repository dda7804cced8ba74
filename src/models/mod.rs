use serde::{Deserialize, Serialize};

/// A single object name reported by the image-labeling service, with its
/// confidence score. The service enforces the confidence threshold and the
/// label cap server-side; labels arrive in whatever order it returned them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Label {
    pub name: String,
    pub confidence: f32,
}

/// Successful `/analyze` payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    pub ingredients: Vec<String>,
    pub recipe: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self { error: error.into() }
    }
}

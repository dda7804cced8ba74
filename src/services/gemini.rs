use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::RecipeModel;

const API_BASE: &str = "https://generativelanguage.googleapis.com";

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Part {
    text: String,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: String,
}

/// Google Gemini generateContent client.
pub struct GeminiClient {
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl GeminiClient {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            api_key,
            model,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait::async_trait]
impl RecipeModel for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
        };

        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            API_BASE, self.model, self.api_key
        );

        log::debug!("🤖 Sending request to Gemini with model: {}", self.model);

        let response = self.client.post(&url).json(&request).send().await?;

        let status = response.status();
        log::debug!("📥 Gemini response status: {}", status);

        if !status.is_success() {
            let error_text = response.text().await?;
            log::error!("❌ Gemini API error ({}): {}", status, error_text);
            anyhow::bail!("Gemini API error ({}): {}", status, error_text);
        }

        let response_text = response.text().await?;
        extract_text(&response_text)
    }
}

fn extract_text(response: &str) -> Result<String> {
    let parsed: GenerateResponse = serde_json::from_str(response)?;
    let candidate = parsed
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| anyhow::anyhow!("Gemini returned no candidates"))?;
    let part = candidate
        .content
        .parts
        .into_iter()
        .next()
        .ok_or_else(|| anyhow::anyhow!("Gemini candidate has no text parts"))?;
    Ok(part.text)
}

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use crate::handlers::recipe::{generate_with_retry, RetryPolicy};
use crate::models::AnalyzeResponse;
use crate::services::{LabelDetector, RecipeModel};

/// Per-request failures of the analyze pipeline. Generation failures are not
/// here: they surface as fixed strings inside a successful response.
#[derive(Debug)]
pub enum AnalyzeError {
    /// Detector came back with an empty label list.
    NoLabels,
    /// Detector call itself failed.
    Detector(anyhow::Error),
}

/// Sequences label detection and recipe generation for one uploaded image.
pub struct AnalyzeHandler {
    detector: Arc<dyn LabelDetector>,
    model: Option<Arc<dyn RecipeModel>>,
    policy: RetryPolicy,
    detection_log: PathBuf,
}

impl AnalyzeHandler {
    pub fn new(
        detector: Arc<dyn LabelDetector>,
        model: Option<Arc<dyn RecipeModel>>,
        policy: RetryPolicy,
        detection_log: PathBuf,
    ) -> Self {
        Self {
            detector,
            model,
            policy,
            detection_log,
        }
    }

    pub async fn analyze(&self, image: &[u8]) -> Result<AnalyzeResponse, AnalyzeError> {
        let labels = self
            .detector
            .detect_labels(image)
            .await
            .map_err(AnalyzeError::Detector)?;

        let ingredients: Vec<String> = labels.into_iter().map(|l| l.name).collect();
        if ingredients.is_empty() {
            log::info!("🔍 No food items detected in image");
            return Err(AnalyzeError::NoLabels);
        }

        log::info!("🥗 Detected ingredients: {}", ingredients.join(", "));
        self.append_detection_log(&ingredients);

        let recipe = generate_with_retry(self.model.as_deref(), &ingredients, &self.policy)
            .await
            .into_text();

        Ok(AnalyzeResponse {
            ingredients,
            recipe,
        })
    }

    /// Append one line per successful detection to the flat log file. The
    /// file is never read back by the service, and a failed append must not
    /// fail the request.
    fn append_detection_log(&self, ingredients: &[String]) {
        let result = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.detection_log)
            .and_then(|mut file| {
                writeln!(file, "Detected food items: {}", ingredients.join(", "))
            });

        if let Err(e) = result {
            log::warn!(
                "⚠️ Failed to append to detection log {:?}: {}",
                self.detection_log,
                e
            );
        }
    }
}

use std::time::Duration;

use crate::services::RecipeModel;

/// Returned in place of a recipe when the model was never initialized.
pub const UNAVAILABLE_MESSAGE: &str = "Error: recipe model is not connected.";

/// Returned in place of a recipe when every attempt failed.
pub const EXHAUSTED_MESSAGE: &str = "Error generating recipe.";

/// Bounded-retry parameters for recipe generation.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub multiplier: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_secs(2),
            multiplier: 2,
        }
    }
}

/// Outcome of a generation run. `Unavailable` means the model was never
/// initialized; `Exhausted` means every attempt failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Generation {
    Success(String),
    Unavailable,
    Exhausted,
}

impl Generation {
    /// The text to embed in the response payload. Failure outcomes map to
    /// their fixed error strings (the HTTP layer does not distinguish them
    /// from a real recipe).
    pub fn into_text(self) -> String {
        match self {
            Generation::Success(text) => text,
            Generation::Unavailable => UNAVAILABLE_MESSAGE.to_string(),
            Generation::Exhausted => EXHAUSTED_MESSAGE.to_string(),
        }
    }
}

pub fn build_prompt(ingredients: &[String]) -> String {
    format!("Create a simple recipe using: {}.", ingredients.join(", "))
}

/// Ask the model for a recipe, retrying failed attempts with exponential
/// backoff. Returns the first successful attempt's text verbatim. With the
/// default policy the waits between attempts are 2, 4, 8 and 16 seconds.
pub async fn generate_with_retry(
    model: Option<&dyn RecipeModel>,
    ingredients: &[String],
    policy: &RetryPolicy,
) -> Generation {
    let Some(model) = model else {
        return Generation::Unavailable;
    };

    let prompt = build_prompt(ingredients);
    let mut delay = policy.initial_delay;

    for attempt in 1..=policy.max_attempts {
        match model.generate(&prompt).await {
            Ok(text) => return Generation::Success(text),
            Err(e) => {
                if attempt < policy.max_attempts {
                    log::warn!(
                        "⚠️ Recipe generation attempt {}/{} failed: {}, retrying in {:?}",
                        attempt,
                        policy.max_attempts,
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    delay *= policy.multiplier;
                } else {
                    log::error!(
                        "❌ Recipe generation failed after {} attempts: {}",
                        policy.max_attempts,
                        e
                    );
                }
            }
        }
    }

    Generation::Exhausted
}

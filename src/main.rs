mod handlers;
mod models;
mod server;
mod services;

use anyhow::Result;
use dotenv::dotenv;
use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use handlers::{AnalyzeHandler, RetryPolicy};
use services::{GeminiClient, RecipeModel, RekognitionClient};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logger
    env_logger::init();

    // Load environment variables
    dotenv().ok();

    log::info!("🚀 Starting Recipe Lens...");

    // AWS Rekognition label detector
    let aws_access_key = env::var("AWS_ACCESS_KEY").unwrap_or_else(|_| {
        log::warn!("⚠️ AWS_ACCESS_KEY not set, label detection will fail");
        String::new()
    });
    let aws_secret_key = env::var("AWS_SECRET_KEY").unwrap_or_default();
    let aws_region = env::var("AWS_REGION").unwrap_or_else(|_| "us-east-1".to_string());

    let rekognition = Arc::new(RekognitionClient::new(
        aws_access_key,
        aws_secret_key,
        aws_region.clone(),
    ));
    log::info!("✅ Rekognition client initialized (region: {})", aws_region);

    // Gemini recipe model (optional - the service still runs without it and
    // returns a fixed error string in place of the recipe)
    let gemini_model = env::var("GEMINI_MODEL").unwrap_or_else(|_| "gemini-1.5-flash".to_string());
    let gemini: Option<Arc<dyn RecipeModel>> = match env::var("GEMINI_API_KEY") {
        Ok(key) if !key.is_empty() => {
            log::info!("✅ Gemini client initialized with model: {}", gemini_model);
            Some(Arc::new(GeminiClient::new(key, gemini_model)))
        }
        _ => {
            log::error!("❌ GEMINI_API_KEY not set, recipe generation unavailable");
            None
        }
    };

    let detection_log = env::var("DETECTION_LOG").unwrap_or_else(|_| "detected_food.log".to_string());

    let handler = Arc::new(AnalyzeHandler::new(
        rekognition,
        gemini,
        RetryPolicy::default(),
        PathBuf::from(detection_log),
    ));
    log::info!("✅ Analyze handler initialized");

    let port: u16 = env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);
    let addr = format!("0.0.0.0:{}", port);

    let app = server::create_router(handler);

    log::info!("🌐 Server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

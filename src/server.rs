use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Multipart, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tower_http::services::ServeFile;

use crate::handlers::{AnalyzeError, AnalyzeHandler};
use crate::models::ErrorResponse;

const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

pub fn create_router(handler: Arc<AnalyzeHandler>) -> Router {
    Router::new()
        .route_service("/", ServeFile::new("static/index.html"))
        .route("/analyze", post(analyze_handler))
        .route("/health", get(health_check))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(middleware::from_fn(log_request))
        .with_state(handler)
}

async fn log_request(request: Request, next: Next) -> Response {
    log::debug!("Request to {}", request.uri().path());
    next.run(request).await
}

async fn analyze_handler(
    State(handler): State<Arc<AnalyzeHandler>>,
    mut multipart: Multipart,
) -> Response {
    // Pull out the "file" field; any other fields are ignored
    let mut image: Option<axum::body::Bytes> = None;
    while let Ok(Some(field)) = multipart.next_field().await {
        if field.name() == Some("file") {
            match field.bytes().await {
                Ok(bytes) => {
                    image = Some(bytes);
                    break;
                }
                Err(e) => {
                    log::warn!("⚠️ Failed to read upload field: {}", e);
                    break;
                }
            }
        }
    }

    let Some(image) = image else {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new("No file provided")),
        )
            .into_response();
    };

    match handler.analyze(&image).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(AnalyzeError::NoLabels) => (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new("No food items detected.")),
        )
            .into_response(),
        Err(AnalyzeError::Detector(e)) => {
            log::error!("❌ Label detection failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new(e.to_string())),
            )
                .into_response()
        }
    }
}

async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::RetryPolicy;
    use crate::models::Label;
    use crate::services::{LabelDetector, RecipeModel};
    use anyhow::Result;
    use axum::body::Body;
    use axum::http::{header, Method};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    struct FixedDetector {
        labels: Vec<Label>,
    }

    #[async_trait::async_trait]
    impl LabelDetector for FixedDetector {
        async fn detect_labels(&self, _image: &[u8]) -> Result<Vec<Label>> {
            Ok(self.labels.clone())
        }
    }

    struct FixedModel {
        text: String,
    }

    #[async_trait::async_trait]
    impl RecipeModel for FixedModel {
        async fn generate(&self, _prompt: &str) -> Result<String> {
            Ok(self.text.clone())
        }
    }

    fn test_router(dir: &tempfile::TempDir, labels: Vec<Label>) -> Router {
        let handler = Arc::new(AnalyzeHandler::new(
            Arc::new(FixedDetector { labels }),
            Some(Arc::new(FixedModel {
                text: "Beat the eggs into the flour.".to_string(),
            })),
            RetryPolicy::default(),
            dir.path().join("detected_food.log"),
        ));
        create_router(handler)
    }

    fn label(name: &str) -> Label {
        Label {
            name: name.to_string(),
            confidence: 90.0,
        }
    }

    const BOUNDARY: &str = "test-boundary";

    fn multipart_request(field_name: &str, bytes: &[u8]) -> axum::http::Request<Body> {
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"food.jpg\"\r\nContent-Type: image/jpeg\r\n\r\n",
                BOUNDARY, field_name
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());

        axum::http::Request::builder()
            .method(Method::POST)
            .uri("/analyze")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_analyze_success() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_router(&dir, vec![label("egg"), label("flour")]);

        let response = app
            .oneshot(multipart_request("file", b"fake image bytes"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["ingredients"], serde_json::json!(["egg", "flour"]));
        assert_eq!(body["recipe"], "Beat the eggs into the flour.");
    }

    #[tokio::test]
    async fn test_analyze_missing_file_field() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_router(&dir, vec![label("egg")]);

        let response = app
            .oneshot(multipart_request("attachment", b"fake image bytes"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["error"], "No file provided");
    }

    #[tokio::test]
    async fn test_analyze_no_labels_detected() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_router(&dir, vec![]);

        let response = app
            .oneshot(multipart_request("file", b"fake image bytes"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["error"], "No food items detected.");
    }

    #[tokio::test]
    async fn test_analyze_detector_failure_is_500() {
        struct FailingDetector;

        #[async_trait::async_trait]
        impl LabelDetector for FailingDetector {
            async fn detect_labels(&self, _image: &[u8]) -> Result<Vec<Label>> {
                anyhow::bail!("ProvisionedThroughputExceededException")
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let handler = Arc::new(AnalyzeHandler::new(
            Arc::new(FailingDetector),
            None,
            RetryPolicy::default(),
            dir.path().join("detected_food.log"),
        ));
        let app = create_router(handler);

        let response = app
            .oneshot(multipart_request("file", b"fake image bytes"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = json_body(response).await;
        assert_eq!(body["error"], "ProvisionedThroughputExceededException");
    }

    #[tokio::test]
    async fn test_health_check() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_router(&dir, vec![]);

        let response = app
            .oneshot(
                axum::http::Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }
}

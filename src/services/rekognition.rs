use anyhow::Result;
use base64::{engine::general_purpose, Engine};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::LabelDetector;
use crate::models::Label;

type HmacSha256 = Hmac<Sha256>;

const SERVICE: &str = "rekognition";
const TARGET: &str = "RekognitionService.DetectLabels";
const CONTENT_TYPE: &str = "application/x-amz-json-1.1";

#[derive(Serialize)]
struct DetectLabelsRequest {
    #[serde(rename = "Image")]
    image: ImagePayload,
    #[serde(rename = "MaxLabels")]
    max_labels: u32,
    #[serde(rename = "MinConfidence")]
    min_confidence: f32,
}

#[derive(Serialize)]
struct ImagePayload {
    #[serde(rename = "Bytes")]
    bytes: String,
}

#[derive(Deserialize)]
struct DetectLabelsResponse {
    #[serde(rename = "Labels", default)]
    labels: Vec<ApiLabel>,
}

#[derive(Deserialize)]
struct ApiLabel {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Confidence")]
    confidence: f32,
}

/// AWS Rekognition DetectLabels client.
///
/// The confidence threshold and label cap are request parameters, so the
/// filtering happens on the AWS side; this client only extracts the names
/// from the structured response.
pub struct RekognitionClient {
    access_key: String,
    secret_key: String,
    region: String,
    max_labels: u32,
    min_confidence: f32,
    client: reqwest::Client,
}

impl RekognitionClient {
    pub fn new(access_key: String, secret_key: String, region: String) -> Self {
        Self {
            access_key,
            secret_key,
            region,
            max_labels: 10,
            min_confidence: 70.0,
            client: reqwest::Client::new(),
        }
    }

    fn endpoint_host(&self) -> String {
        format!("{}.{}.amazonaws.com", SERVICE, self.region)
    }

    /// Sign a DetectLabels request body with AWS Signature Version 4 and
    /// return the `Authorization` header value together with the
    /// `X-Amz-Date` timestamp used.
    fn sign_request(&self, body: &str, now: DateTime<Utc>) -> Result<(String, String)> {
        let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
        let date_stamp = now.format("%Y%m%d").to_string();
        let host = self.endpoint_host();

        let payload_hash = sha256_hex(body.as_bytes());
        let signed_headers = "content-type;host;x-amz-date;x-amz-target";
        let canonical_request = format!(
            "POST\n/\n\ncontent-type:{}\nhost:{}\nx-amz-date:{}\nx-amz-target:{}\n\n{}\n{}",
            CONTENT_TYPE, host, amz_date, TARGET, signed_headers, payload_hash
        );

        let credential_scope = format!("{}/{}/{}/aws4_request", date_stamp, self.region, SERVICE);
        let string_to_sign = format!(
            "AWS4-HMAC-SHA256\n{}\n{}\n{}",
            amz_date,
            credential_scope,
            sha256_hex(canonical_request.as_bytes())
        );

        let signing_key = derive_signing_key(&self.secret_key, &date_stamp, &self.region, SERVICE)?;
        let signature = hex::encode(hmac_sha256(&signing_key, string_to_sign.as_bytes())?);

        let authorization = format!(
            "AWS4-HMAC-SHA256 Credential={}/{}, SignedHeaders={}, Signature={}",
            self.access_key, credential_scope, signed_headers, signature
        );

        Ok((authorization, amz_date))
    }
}

#[async_trait::async_trait]
impl LabelDetector for RekognitionClient {
    async fn detect_labels(&self, image: &[u8]) -> Result<Vec<Label>> {
        log::debug!("📸 Detecting labels for {} byte image", image.len());

        let request = DetectLabelsRequest {
            image: ImagePayload {
                bytes: general_purpose::STANDARD.encode(image),
            },
            max_labels: self.max_labels,
            min_confidence: self.min_confidence,
        };
        let body = serde_json::to_string(&request)?;

        let (authorization, amz_date) = self.sign_request(&body, Utc::now())?;
        let url = format!("https://{}/", self.endpoint_host());

        let response = self
            .client
            .post(&url)
            .header("Content-Type", CONTENT_TYPE)
            .header("X-Amz-Target", TARGET)
            .header("X-Amz-Date", amz_date)
            .header("Authorization", authorization)
            .body(body)
            .send()
            .await?;

        let status = response.status();
        log::debug!("📥 Rekognition response status: {}", status);

        if !status.is_success() {
            let error_text = response.text().await?;
            log::error!("❌ Rekognition API error ({}): {}", status, error_text);
            anyhow::bail!("Rekognition API error ({}): {}", status, error_text);
        }

        let response_text = response.text().await?;
        let labels = parse_detect_labels(&response_text)?;
        log::info!("🏷️ Detected {} labels", labels.len());

        Ok(labels)
    }
}

fn parse_detect_labels(response: &str) -> Result<Vec<Label>> {
    let parsed: DetectLabelsResponse = serde_json::from_str(response)?;
    Ok(parsed
        .labels
        .into_iter()
        .map(|l| Label {
            name: l.name,
            confidence: l.confidence,
        })
        .collect())
}

fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| anyhow::anyhow!("invalid HMAC key: {}", e))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

fn derive_signing_key(secret: &str, date: &str, region: &str, service: &str) -> Result<Vec<u8>> {
    let k_date = hmac_sha256(format!("AWS4{}", secret).as_bytes(), date.as_bytes())?;
    let k_region = hmac_sha256(&k_date, region.as_bytes())?;
    let k_service = hmac_sha256(&k_region, service.as_bytes())?;
    hmac_sha256(&k_service, b"aws4_request")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_detect_labels() {
        let response = r#"{
            "Labels": [
                {"Name": "Egg", "Confidence": 98.2, "Instances": [], "Parents": []},
                {"Name": "Flour", "Confidence": 84.0, "Instances": [], "Parents": [{"Name": "Food"}]}
            ],
            "LabelModelVersion": "3.0"
        }"#;

        let labels = parse_detect_labels(response).unwrap();

        assert_eq!(labels.len(), 2);
        assert_eq!(labels[0].name, "Egg");
        assert_eq!(labels[1].name, "Flour");
        assert!(labels[1].confidence > 83.9);
    }

    #[test]
    fn test_parse_detect_labels_empty() {
        let labels = parse_detect_labels(r#"{"Labels": []}"#).unwrap();
        assert!(labels.is_empty());
    }

    #[test]
    fn test_derive_signing_key_aws_vector() {
        // Published example from the AWS SigV4 documentation
        let key = derive_signing_key(
            "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY",
            "20120215",
            "us-east-1",
            "iam",
        )
        .unwrap();

        assert_eq!(
            hex::encode(key),
            "f4780e2d9f65fa895f9c67b32ce1baf0b0d8a43505a000a1a9e090d414db404d"
        );
    }

    #[test]
    fn test_sign_request_shape() {
        let client = RekognitionClient::new(
            "AKIDEXAMPLE".to_string(),
            "secret".to_string(),
            "us-east-1".to_string(),
        );
        let now = Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap();

        let (authorization, amz_date) = client.sign_request("{}", now).unwrap();

        assert_eq!(amz_date, "20240115T120000Z");
        assert!(authorization.starts_with(
            "AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/20240115/us-east-1/rekognition/aws4_request"
        ));
        assert!(authorization.contains("SignedHeaders=content-type;host;x-amz-date;x-amz-target"));
        assert!(authorization.contains("Signature="));
    }
}

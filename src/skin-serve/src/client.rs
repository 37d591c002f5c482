use std::time::Duration;

use log::info;
use serde::{Deserialize, Serialize};

use crate::auth::TokenSource;
use crate::error::Error;
use crate::labels;
use crate::timer::Timer;
use crate::upload::UploadedImage;

/// Deployed prediction endpoint. Override with `MODEL_ENDPOINT` or an
/// explicit [`ClientConfig`].
pub const DEFAULT_MODEL_ENDPOINT: &str = "https://us-central1-aiplatform.googleapis.com/v1/projects/beautywise-ai/locations/us-central1/endpoints/6190555029099773952:predict";

/// One attempt per request, bounded by this deadline.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Where and how to reach the prediction service. Passed into the
/// classifier constructor so tests can point it at a fake endpoint.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub endpoint: String,
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        ClientConfig {
            endpoint: endpoint.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig::new(DEFAULT_MODEL_ENDPOINT)
    }
}

#[derive(Serialize)]
struct PredictRequest {
    instances: Vec<Instance>,
}

#[derive(Serialize)]
struct Instance {
    image: ImagePayload,
}

#[derive(Serialize)]
struct ImagePayload {
    b64: String,
}

#[derive(Deserialize)]
struct PredictResponse {
    predictions: Vec<Vec<f32>>,
}

/// Result of a classified upload.
#[derive(Debug, Serialize)]
pub struct Classification {
    #[serde(rename = "skinType")]
    pub skin_type: &'static str,
    pub confidence: f32,
}

/// Classifies photos by forwarding them to the remote prediction service.
pub struct SkinClassifier {
    http: reqwest::Client,
    config: ClientConfig,
    token: TokenSource,
}

impl SkinClassifier {
    pub fn new(config: ClientConfig, token: TokenSource) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| Error::Internal(err.to_string()))?;

        Ok(SkinClassifier {
            http,
            config,
            token,
        })
    }

    /// Send raw image bytes to the prediction endpoint and return the score
    /// vector of the first prediction.
    pub async fn predict(&self, data: &[u8]) -> Result<Vec<f32>, Error> {
        let mut t = Timer::new_start("encoding image");
        let request = PredictRequest {
            instances: vec![Instance {
                image: ImagePayload {
                    b64: base64::encode(data),
                },
            }],
        };
        t.stop();

        let token = self.token.resolve()?;

        let mut t = Timer::new_start("remote prediction");
        let response = self
            .http
            .post(&self.config.endpoint)
            .bearer_auth(token.expose())
            .json(&request)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    Error::UpstreamUnavailable(format!(
                        "no response within {:?}",
                        self.config.timeout
                    ))
                } else {
                    Error::UpstreamUnavailable(err.to_string())
                }
            })?;
        t.stop();

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::UpstreamRejected {
                status: status.as_u16(),
                body,
            });
        }

        let decoded: PredictResponse = response
            .json()
            .await
            .map_err(|err| Error::MalformedPrediction(err.to_string()))?;

        decoded
            .predictions
            .into_iter()
            .next()
            .ok_or_else(|| Error::MalformedPrediction("empty predictions array".to_owned()))
    }

    /// Full pipeline for a validated upload: encode, predict, map to a
    /// label.
    pub async fn classify(&self, upload: &UploadedImage) -> Result<Classification, Error> {
        info!("sending image to the prediction endpoint");

        let scores = self.predict(upload.bytes()).await?;
        let (skin_type, confidence) = labels::best_label(&scores)?;

        info!("predicted skin type: {}", skin_type);

        Ok(Classification {
            skin_type,
            confidence,
        })
    }
}

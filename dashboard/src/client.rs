use diabetes_api::models::ErrorBody;
use diabetes_api::{InputRecord, PredictionEnvelope, PredictionResult};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:5000/predict";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("API Error: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("API Error: {status}: {message}")]
    Status { status: u16, message: String },
    #[error("API Error: réponse illisible: {0}")]
    Decode(#[source] reqwest::Error),
    #[error("conversion impossible: {0}")]
    Conversion(#[from] diabetes_api::ValidationError),
}

/// Tout ce qui sait évaluer un enregistrement: le client HTTP en production,
/// le service en mémoire dans les tests.
#[allow(async_fn_in_trait)]
pub trait Scorer {
    async fn score(&self, record: &InputRecord) -> Result<PredictionResult, ClientError>;
}

pub struct ApiClient {
    http: reqwest::Client,
    url: String,
}

impl ApiClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ClientError::Transport)?;
        Ok(Self {
            http,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Scorer for ApiClient {
    async fn score(&self, record: &InputRecord) -> Result<PredictionResult, ClientError> {
        let response = self
            .http
            .post(&self.url)
            .json(record)
            .send()
            .await
            .map_err(ClientError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            // {"erreur": "..."} quand le service répond, sinon le statut seul
            let message = match response.json::<ErrorBody>().await {
                Ok(body) => body.erreur,
                Err(_) => status.to_string(),
            };
            return Err(ClientError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let envelope: PredictionEnvelope = response.json().await.map_err(ClientError::Decode)?;
        Ok(envelope.result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unreachable_service_is_a_transport_error() {
        // port 9 (discard) n'écoute pas en local
        let client = ApiClient::new("http://127.0.0.1:9/predict", Duration::from_secs(2)).unwrap();
        let record = InputRecord::from_array([1.0; 8]);
        let err = client.score(&record).await.unwrap_err();
        assert!(matches!(err, ClientError::Transport(_)), "{err}");
        assert!(err.to_string().starts_with("API Error"));
    }
}

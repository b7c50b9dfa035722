use actix_web::error::BlockingError;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use thiserror::Error;

use crate::inference::InferenceError;
use crate::models::ErrorBody;
use crate::validation::ValidationError;

/// Erreurs visibles par le client, toutes rendues en `{"erreur": "..."}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Aucun JSON fourni")]
    MalformedRequest,
    #[error("Corps de requête trop volumineux (limite: {0} octets)")]
    PayloadTooLarge(usize),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    // Les erreurs du modèle restent des erreurs client (400), comme la validation.
    #[error(transparent)]
    Inference(#[from] InferenceError),
    #[error("Erreur d'exécution")]
    Blocking(#[from] BlockingError),
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::MalformedRequest | ApiError::Validation(_) | ApiError::Inference(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Blocking(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorBody::new(self.to_string()))
    }
}

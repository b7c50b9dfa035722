use actix_web::{get, post, web, HttpRequest, HttpResponse, Responder};
use futures::StreamExt;
use log::{error, info};
use serde_json::Value;

use crate::config::DEFAULT_JSON_LIMIT;
use crate::error::ApiError;
use crate::inference::ModelInference;
use crate::models::{ErrorBody, PredictionEnvelope, PredictionResult, WelcomeMessage};
use crate::validation::validate_value;

/// Taille maximale du corps de `/predict`, en octets.
#[derive(Debug, Clone, Copy)]
pub struct BodyLimit(pub usize);

impl Default for BodyLimit {
    fn default() -> Self {
        BodyLimit(DEFAULT_JSON_LIMIT)
    }
}

/// Lecture bornée du corps: un dépassement donne un 413 au format `{"erreur"}`.
async fn read_body(req: &HttpRequest, mut payload: web::Payload) -> Result<web::BytesMut, ApiError> {
    let limit = req.app_data::<BodyLimit>().copied().unwrap_or_default().0;
    let mut body = web::BytesMut::new();
    while let Some(chunk) = payload.next().await {
        let chunk = chunk.map_err(|_| ApiError::MalformedRequest)?;
        if body.len() + chunk.len() > limit {
            return Err(ApiError::PayloadTooLarge(limit));
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}

#[get("/")]
pub async fn home() -> impl Responder {
    HttpResponse::Ok().json(WelcomeMessage::default())
}

#[get("/model-info")]
pub async fn model_info(model: web::Data<ModelInference>) -> impl Responder {
    HttpResponse::Ok().json(model.get_model_info())
}

#[post("/predict")]
pub async fn predict(
    model: web::Data<ModelInference>,
    req: HttpRequest,
    payload: web::Payload,
) -> Result<HttpResponse, ApiError> {
    info!("Nouvelle requête de prédiction reçue");

    let body = read_body(&req, payload)
        .await
        .inspect_err(|e| error!("Requête rejetée: {}", e))?;
    let raw = parse_body(&body).inspect_err(|e| error!("Requête rejetée: {}", e))?;
    let record = validate_value(&raw).inspect_err(|e| error!("Validation échouée: {}", e))?;

    let model = model.into_inner();
    let (prediction, proba) = web::block(move || model.predict(&record))
        .await
        .inspect_err(|e| error!("Erreur d'exécution bloquante: {}", e))?
        .inspect_err(|e| error!("Erreur de prédiction: {}", e))?;

    info!(
        "Prédiction réussie: classe={} probabilité={:.3}",
        prediction, proba
    );
    Ok(HttpResponse::Ok().json(PredictionEnvelope {
        result: PredictionResult::new(record, prediction, proba),
    }))
}

/// Corps vide, JSON illisible ou valeur JSON "fausse" (`null`, `{}`, `[]`, `0`, ...)
/// sont traités comme une absence de JSON.
fn parse_body(body: &[u8]) -> Result<Value, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(ApiError::MalformedRequest);
    }
    let value: Value = serde_json::from_slice(body).map_err(|_| ApiError::MalformedRequest)?;
    if is_falsy(&value) {
        return Err(ApiError::MalformedRequest);
    }
    Ok(value)
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}

pub async fn not_found() -> impl Responder {
    HttpResponse::NotFound().json(ErrorBody::new("Endpoint non trouvé"))
}

/// Routes du service, partagées entre le binaire et les tests.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(home).service(model_info).service(predict);
}

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::models::{InputRecord, FEATURE_COUNT, FEATURE_NAMES};

#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("Chargement du modèle impossible ({path}): {reason}")]
    Load { path: String, reason: String },
    #[error("Format de modèle non supporté: {0}")]
    UnsupportedFormat(String),
    #[error("Erreur du modèle: {0}")]
    Runtime(String),
    #[error("Sortie du modèle invalide: {0}")]
    Contract(String),
}

/// Classifieur binaire derrière l'adaptateur. Les deux opérations viennent du
/// modèle lui-même; l'appelant ne déduit jamais l'une de l'autre.
pub trait Classifier: Send + Sync {
    fn predict_label(&self, features: &[f64; FEATURE_COUNT]) -> Result<u8, InferenceError>;

    /// Probabilité de la classe positive.
    fn predict_proba(&self, features: &[f64; FEATURE_COUNT]) -> Result<f64, InferenceError>;

    fn kind(&self) -> &'static str;
}

fn default_threshold() -> f64 {
    0.5
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LogisticModel {
    pub intercept: f64,
    pub coefficients: [f64; FEATURE_COUNT],
    #[serde(default = "default_threshold")]
    pub threshold: f64,
}

impl LogisticModel {
    /// Régression logistique de référence sur le jeu Pima Indians.
    pub fn pima_reference() -> Self {
        LogisticModel {
            intercept: -8.4047,
            coefficients: [
                0.1232, 0.0352, -0.0133, 0.0006, -0.0012, 0.0897, 0.9452, 0.0149,
            ],
            threshold: 0.5,
        }
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, InferenceError> {
        let path = path.as_ref();
        let load_error = |reason: String| InferenceError::Load {
            path: path.display().to_string(),
            reason,
        };
        let raw = std::fs::read_to_string(path).map_err(|e| load_error(e.to_string()))?;
        let model: LogisticModel =
            serde_json::from_str(&raw).map_err(|e| load_error(e.to_string()))?;
        if !(0.0..=1.0).contains(&model.threshold) {
            return Err(load_error(format!(
                "threshold {} hors de [0, 1]",
                model.threshold
            )));
        }
        Ok(model)
    }

    fn decision(&self, features: &[f64; FEATURE_COUNT]) -> f64 {
        self.intercept
            + self
                .coefficients
                .iter()
                .zip(features)
                .map(|(c, x)| c * x)
                .sum::<f64>()
    }
}

impl Classifier for LogisticModel {
    fn predict_label(&self, features: &[f64; FEATURE_COUNT]) -> Result<u8, InferenceError> {
        let proba = 1.0 / (1.0 + (-self.decision(features)).exp());
        Ok(u8::from(proba >= self.threshold))
    }

    fn predict_proba(&self, features: &[f64; FEATURE_COUNT]) -> Result<f64, InferenceError> {
        Ok(1.0 / (1.0 + (-self.decision(features)).exp())) // sigmoid
    }

    fn kind(&self) -> &'static str {
        "logistic"
    }
}

#[cfg(feature = "onnx")]
pub use onnx::OnnxModel;

#[cfg(feature = "onnx")]
mod onnx {
    use super::{Classifier, InferenceError};
    use crate::models::FEATURE_COUNT;
    use std::path::Path;
    use tract_onnx::prelude::*;

    type Plan = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

    /// Classifieur exporté au format ONNX (sorties: label int64 `[N]`,
    /// probabilités float `[N, 2]`).
    pub struct OnnxModel {
        plan: Plan,
    }

    impl OnnxModel {
        pub fn load<P: AsRef<Path>>(model_path: P) -> Result<Self, InferenceError> {
            let path = model_path.as_ref();
            let plan = Self::build(path).map_err(|e| InferenceError::Load {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
            Ok(Self { plan })
        }

        fn build(path: &Path) -> TractResult<Plan> {
            tract_onnx::onnx()
                .model_for_path(path)?
                .with_input_fact(
                    0,
                    InferenceFact::dt_shape(f32::datum_type(), tvec!(1, FEATURE_COUNT)),
                )?
                .into_optimized()?
                .into_runnable()
        }

        fn run(&self, features: &[f64; FEATURE_COUNT]) -> Result<TVec<TValue>, InferenceError> {
            let input: Vec<f32> = features.iter().map(|v| *v as f32).collect();
            let tensor = Tensor::from_shape(&[1, FEATURE_COUNT], &input)
                .map_err(|e| InferenceError::Runtime(e.to_string()))?;
            self.plan
                .run(tvec!(tensor.into()))
                .map_err(|e| InferenceError::Runtime(e.to_string()))
        }
    }

    /// Première valeur de la sortie label, quel que soit son type numérique.
    pub(crate) fn label_from_output(labels: &Tensor) -> Result<u8, InferenceError> {
        let labels = labels
            .cast_to::<i64>()
            .map_err(|e| InferenceError::Runtime(e.to_string()))?;
        let label = *labels
            .as_slice::<i64>()
            .map_err(|e| InferenceError::Runtime(e.to_string()))?
            .first()
            .ok_or_else(|| InferenceError::Contract("label vide".to_string()))?;
        u8::try_from(label)
            .map_err(|_| InferenceError::Contract(format!("label inattendu: {}", label)))
    }

    pub(crate) fn proba_from_output(probas: &Tensor) -> Result<f64, InferenceError> {
        let probas = probas
            .cast_to::<f32>()
            .map_err(|e| InferenceError::Runtime(e.to_string()))?;
        let row = probas
            .as_slice::<f32>()
            .map_err(|e| InferenceError::Runtime(e.to_string()))?;
        // [p0, p1] pour un classifieur binaire
        match row {
            [_, positive] => Ok(f64::from(*positive)),
            [positive] => Ok(f64::from(*positive)),
            other => Err(InferenceError::Contract(format!(
                "{} probabilités au lieu de 2",
                other.len()
            ))),
        }
    }

    impl Classifier for OnnxModel {
        fn predict_label(&self, features: &[f64; FEATURE_COUNT]) -> Result<u8, InferenceError> {
            let outputs = self.run(features)?;
            let labels = outputs
                .first()
                .ok_or_else(|| InferenceError::Contract("aucune sortie label".to_string()))?;
            label_from_output(labels)
        }

        fn predict_proba(&self, features: &[f64; FEATURE_COUNT]) -> Result<f64, InferenceError> {
            let outputs = self.run(features)?;
            let probas = outputs.get(1).ok_or_else(|| {
                InferenceError::Contract("aucune sortie probabilité".to_string())
            })?;
            proba_from_output(probas)
        }

        fn kind(&self) -> &'static str {
            "onnx"
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn label_is_read_from_int64_output() {
            assert_eq!(label_from_output(&tensor1(&[1i64])).unwrap(), 1);
            assert_eq!(label_from_output(&tensor1(&[0i64])).unwrap(), 0);
        }

        #[test]
        fn float_labels_are_cast() {
            assert_eq!(label_from_output(&tensor1(&[1.0f32])).unwrap(), 1);
        }

        #[test]
        fn negative_or_empty_labels_break_the_contract() {
            assert!(matches!(
                label_from_output(&tensor1(&[-1i64])),
                Err(InferenceError::Contract(_))
            ));
            let empty = Tensor::from_shape::<i64>(&[0], &[]).unwrap();
            assert!(matches!(
                label_from_output(&empty),
                Err(InferenceError::Contract(_))
            ));
        }

        #[test]
        fn positive_class_is_second_column() {
            let probas = tensor2(&[[0.25f32, 0.75]]);
            assert_eq!(proba_from_output(&probas).unwrap(), f64::from(0.75f32));
        }

        #[test]
        fn single_column_is_the_positive_class() {
            let probas = tensor2(&[[0.4f32]]);
            assert_eq!(proba_from_output(&probas).unwrap(), f64::from(0.4f32));
        }

        #[test]
        fn more_than_two_classes_break_the_contract() {
            let err = proba_from_output(&tensor2(&[[0.2f32, 0.3, 0.5]])).unwrap_err();
            assert!(matches!(err, InferenceError::Contract(_)));
            assert!(err.to_string().contains("3 probabilités"));
        }

        #[test]
        fn missing_model_file_is_a_load_error() {
            assert!(matches!(
                OnnxModel::load("models/absent.onnx"),
                Err(InferenceError::Load { .. })
            ));
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    pub kind: String,
    pub source: String,
    pub input_shape: Vec<usize>,
    pub features: Vec<String>,
}

/// Adaptateur d'inférence, chargé une seule fois au démarrage puis partagé
/// en lecture seule entre les workers.
pub struct ModelInference {
    classifier: Box<dyn Classifier>,
    source: String,
}

impl ModelInference {
    pub fn new(classifier: Box<dyn Classifier>, source: impl Into<String>) -> Self {
        Self {
            classifier,
            source: source.into(),
        }
    }

    /// `.onnx` → tract, `.json` → paramètres logistiques, rien → modèle de référence intégré.
    pub fn load(model_path: Option<&Path>) -> Result<Self, InferenceError> {
        let Some(path) = model_path else {
            return Ok(Self::new(
                Box::new(LogisticModel::pima_reference()),
                "builtin:pima-logistic",
            ));
        };

        let source = path.display().to_string();
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Ok(Self::new(
                Box::new(LogisticModel::from_json_file(path)?),
                source,
            )),
            #[cfg(feature = "onnx")]
            Some("onnx") => Ok(Self::new(Box::new(OnnxModel::load(path)?), source)),
            _ => Err(InferenceError::UnsupportedFormat(source)),
        }
    }

    /// Appelle une seule fois l'opération label et l'opération probabilité.
    pub fn predict(&self, record: &InputRecord) -> Result<(u8, f64), InferenceError> {
        let features = record.to_array();
        let label = self.classifier.predict_label(&features)?;
        let probability = self.classifier.predict_proba(&features)?;

        if label > 1 {
            return Err(InferenceError::Contract(format!(
                "label {} hors de {{0, 1}}",
                label
            )));
        }
        if !(0.0..=1.0).contains(&probability) {
            return Err(InferenceError::Contract(format!(
                "probabilité {} hors de [0, 1]",
                probability
            )));
        }

        Ok((label, probability))
    }

    pub fn get_model_info(&self) -> ModelInfo {
        ModelInfo {
            kind: self.classifier.kind().to_string(),
            source: self.source.clone(),
            input_shape: vec![1, FEATURE_COUNT],
            features: FEATURE_NAMES.iter().map(|f| f.to_string()).collect(),
        }
    }
}

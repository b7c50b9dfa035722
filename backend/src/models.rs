use serde::{Deserialize, Serialize};

/// Colonnes attendues par le modèle, dans l'ordre d'entraînement.
pub const FEATURE_NAMES: [&str; 8] = [
    "Pregnancies",
    "Glucose",
    "BloodPressure",
    "SkinThickness",
    "Insulin",
    "BMI",
    "DiabetesPedigreeFunction",
    "Age",
];

pub const FEATURE_COUNT: usize = FEATURE_NAMES.len();

/// Enregistrement patient validé, champs dans l'ordre des colonnes du modèle.
/// Côté service, construit uniquement par `validation::validate`.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq)]
pub struct InputRecord {
    #[serde(rename = "Pregnancies")]
    pub pregnancies: f64,
    #[serde(rename = "Glucose")]
    pub glucose: f64,
    #[serde(rename = "BloodPressure")]
    pub blood_pressure: f64,
    #[serde(rename = "SkinThickness")]
    pub skin_thickness: f64,
    #[serde(rename = "Insulin")]
    pub insulin: f64,
    #[serde(rename = "BMI")]
    pub bmi: f64,
    #[serde(rename = "DiabetesPedigreeFunction")]
    pub diabetes_pedigree_function: f64,
    #[serde(rename = "Age")]
    pub age: f64,
}

impl InputRecord {
    pub fn from_array(values: [f64; FEATURE_COUNT]) -> Self {
        let [
            pregnancies,
            glucose,
            blood_pressure,
            skin_thickness,
            insulin,
            bmi,
            diabetes_pedigree_function,
            age,
        ] = values;
        InputRecord {
            pregnancies,
            glucose,
            blood_pressure,
            skin_thickness,
            insulin,
            bmi,
            diabetes_pedigree_function,
            age,
        }
    }

    pub fn to_array(&self) -> [f64; FEATURE_COUNT] {
        [
            self.pregnancies,
            self.glucose,
            self.blood_pressure,
            self.skin_thickness,
            self.insulin,
            self.bmi,
            self.diabetes_pedigree_function,
            self.age,
        ]
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct PredictionResult {
    #[serde(flatten)]
    pub echo: InputRecord,
    pub prediction: u8,
    pub proba_diabetes: f64,
}

impl PredictionResult {
    pub fn new(echo: InputRecord, prediction: u8, proba_diabetes: f64) -> Self {
        PredictionResult {
            echo,
            prediction,
            proba_diabetes,
        }
    }

    pub fn is_diabetic(&self) -> bool {
        self.prediction == 1
    }
}

/// `{"result": {...}}`
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct PredictionEnvelope {
    pub result: PredictionResult,
}

/// `{"erreur": "..."}`
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ErrorBody {
    pub erreur: String,
}

impl ErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        ErrorBody {
            erreur: message.into(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct WelcomeMessage {
    pub message: String,
}

impl Default for WelcomeMessage {
    fn default() -> Self {
        WelcomeMessage {
            message: "Welcome to Diabetes Prediction API".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> InputRecord {
        InputRecord::from_array([2.0, 130.0, 70.0, 25.0, 80.0, 28.5, 0.35, 45.0])
    }

    #[test]
    fn array_order_matches_feature_names() {
        let record = sample();
        let value = serde_json::to_value(record).unwrap();
        for (name, expected) in FEATURE_NAMES.iter().zip(record.to_array()) {
            assert_eq!(value[*name].as_f64(), Some(expected), "{name}");
        }
    }

    #[test]
    fn result_flattens_echo_next_to_prediction() {
        let envelope = PredictionEnvelope {
            result: PredictionResult::new(sample(), 1, 0.72),
        };
        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(value["result"]["Glucose"], json!(130.0));
        assert_eq!(value["result"]["prediction"], json!(1));
        assert_eq!(value["result"]["proba_diabetes"], json!(0.72));
        assert_eq!(value["result"].as_object().unwrap().len(), 10);
    }

    #[test]
    fn welcome_payload_is_fixed() {
        assert_eq!(
            serde_json::to_value(WelcomeMessage::default()).unwrap(),
            json!({ "message": "Welcome to Diabetes Prediction API" })
        );
    }
}

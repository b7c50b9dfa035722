use serde_json::{Map, Value};
use thiserror::Error;

use crate::models::{InputRecord, FEATURE_COUNT, FEATURE_NAMES};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldErrorKind {
    #[error("field required")]
    Missing,
    #[error("input should be a valid number, got {0}")]
    NotANumber(String),
    #[error("input should be a finite number")]
    NotFinite,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub kind: FieldErrorKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("input should be an object, got {0}")]
    NotAnObject(String),
    #[error("{} validation error(s) for InputRecord: {}", .0.len(), describe(.0))]
    Fields(Vec<FieldError>),
}

impl ValidationError {
    /// Noms des champs fautifs, dans l'ordre du modèle.
    pub fn fields(&self) -> Vec<&'static str> {
        match self {
            ValidationError::NotAnObject(_) => Vec::new(),
            ValidationError::Fields(errors) => errors.iter().map(|e| e.field).collect(),
        }
    }
}

fn describe(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.kind))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Valide une valeur JSON quelconque; tout ce qui n'est pas un objet est rejeté d'emblée.
pub fn validate_value(raw: &Value) -> Result<InputRecord, ValidationError> {
    match raw {
        Value::Object(map) => validate(map),
        other => Err(ValidationError::NotAnObject(type_name(other).to_string())),
    }
}

/// Tout ou rien: chaque champ absent ou non numérique est signalé, et aucun
/// enregistrement n'est construit tant que les huit ne sont pas convertis.
pub fn validate(raw: &Map<String, Value>) -> Result<InputRecord, ValidationError> {
    let mut values = [0.0; FEATURE_COUNT];
    let mut errors = Vec::new();

    for (slot, field) in values.iter_mut().zip(FEATURE_NAMES) {
        match raw.get(field).map(coerce) {
            Some(Ok(v)) => *slot = v,
            Some(Err(kind)) => errors.push(FieldError { field, kind }),
            None => errors.push(FieldError {
                field,
                kind: FieldErrorKind::Missing,
            }),
        }
    }

    if errors.is_empty() {
        Ok(InputRecord::from_array(values))
    } else {
        Err(ValidationError::Fields(errors))
    }
}

fn coerce(value: &Value) -> Result<f64, FieldErrorKind> {
    let number = match value {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| FieldErrorKind::NotANumber(n.to_string()))?,
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| FieldErrorKind::NotANumber(format!("{:?}", s)))?,
        other => return Err(FieldErrorKind::NotANumber(type_name(other).to_string())),
    };

    if number.is_finite() {
        Ok(number)
    } else {
        Err(FieldErrorKind::NotFinite)
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid() -> Value {
        json!({
            "Pregnancies": 2,
            "Glucose": 130,
            "BloodPressure": 70,
            "SkinThickness": 25,
            "Insulin": 80,
            "BMI": 28.5,
            "DiabetesPedigreeFunction": 0.35,
            "Age": 45
        })
    }

    #[test]
    fn integers_and_floats_become_floats() {
        let record = validate_value(&valid()).unwrap();
        assert_eq!(
            record.to_array(),
            [2.0, 130.0, 70.0, 25.0, 80.0, 28.5, 0.35, 45.0]
        );
    }

    #[test]
    fn field_order_is_irrelevant() {
        let reversed: Map<String, Value> = valid()
            .as_object()
            .unwrap()
            .iter()
            .rev()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        assert_eq!(
            validate(&reversed).unwrap(),
            validate_value(&valid()).unwrap()
        );
    }

    #[test]
    fn numeric_strings_are_coerced() {
        let mut raw = valid();
        raw["Glucose"] = json!(" 130.5 ");
        raw["Age"] = json!("45");
        let record = validate_value(&raw).unwrap();
        assert_eq!(record.glucose, 130.5);
        assert_eq!(record.age, 45.0);
    }

    #[test]
    fn extra_keys_are_ignored() {
        let mut raw = valid();
        raw["Outcome"] = json!(1);
        raw["comment"] = json!("n/a");
        assert!(validate_value(&raw).is_ok());
    }

    #[test]
    fn missing_fields_are_all_reported() {
        let mut raw = valid();
        let map = raw.as_object_mut().unwrap();
        map.remove("Glucose");
        map.remove("Age");

        let err = validate_value(&raw).unwrap_err();
        assert_eq!(err.fields(), vec!["Glucose", "Age"]);
        let message = err.to_string();
        assert!(message.starts_with("2 validation error(s)"), "{message}");
        assert!(message.contains("Glucose: field required"), "{message}");
    }

    #[test]
    fn text_value_is_rejected() {
        let mut raw = valid();
        raw["Glucose"] = json!("not-a-number");
        let err = validate_value(&raw).unwrap_err();
        assert_eq!(err.fields(), vec!["Glucose"]);
        assert!(err.to_string().contains("\"not-a-number\""));
    }

    #[test]
    fn null_bool_and_nested_values_are_rejected() {
        for bad in [json!(null), json!(true), json!([1]), json!({ "v": 1 }), json!("")] {
            let mut raw = valid();
            raw["BMI"] = bad.clone();
            assert!(validate_value(&raw).is_err(), "{bad} should fail");
        }
    }

    #[test]
    fn non_finite_strings_are_rejected() {
        for bad in ["nan", "inf", "-infinity"] {
            let mut raw = valid();
            raw["Insulin"] = json!(bad);
            let err = validate_value(&raw).unwrap_err();
            assert_eq!(
                err,
                ValidationError::Fields(vec![FieldError {
                    field: "Insulin",
                    kind: FieldErrorKind::NotFinite,
                }])
            );
        }
    }

    #[test]
    fn field_error_messages() {
        assert_eq!(FieldErrorKind::Missing.to_string(), "field required");
        assert_eq!(
            FieldErrorKind::NotANumber("boolean".to_string()).to_string(),
            "input should be a valid number, got boolean"
        );
        assert_eq!(
            FieldErrorKind::NotFinite.to_string(),
            "input should be a finite number"
        );
    }

    #[test]
    fn non_object_is_rejected() {
        let err = validate_value(&json!([1, 2, 3])).unwrap_err();
        assert_eq!(err, ValidationError::NotAnObject("array".to_string()));
    }
}

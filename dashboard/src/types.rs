use diabetes_api::{validate, InputRecord, PredictionResult, ValidationError};
use serde_json::{Map, Value};

/// Une ligne du fichier importé: en-tête → cellule brute. Les cellules vides
/// sont absentes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    number: usize,
    fields: Map<String, Value>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ligne numérotée à partir de 1, dans l'ordre du fichier.
    pub fn numbered(number: usize) -> Self {
        Row {
            number,
            ..Self::default()
        }
    }

    pub fn number(&self) -> usize {
        self.number
    }

    pub fn insert(&mut self, header: &str, cell: &str) {
        let cell = cell.trim();
        if !cell.is_empty() {
            self.fields
                .insert(header.to_string(), Value::String(cell.to_string()));
        }
    }

    pub fn get(&self, header: &str) -> Option<&str> {
        self.fields.get(header).and_then(Value::as_str)
    }

    /// Conversion explicite des huit champs en flottants avant tout envoi.
    pub fn to_record(&self) -> Result<InputRecord, ValidationError> {
        validate(&self.fields)
    }
}

impl<'a> FromIterator<(&'a str, &'a str)> for Row {
    fn from_iter<I: IntoIterator<Item = (&'a str, &'a str)>>(iter: I) -> Self {
        let mut row = Row::new();
        for (header, cell) in iter {
            row.insert(header, cell);
        }
        row
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RowFailure {
    /// Numéro de ligne (à partir de 1), dans l'ordre du fichier.
    pub row: usize,
    pub reason: String,
}

/// Avancement après chaque ligne terminée.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub done: usize,
    pub total: usize,
    pub row: usize,
    pub ok: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    pub results: Vec<PredictionResult>,
    pub failures: Vec<RowFailure>,
    pub total: usize,
    pub cancelled: bool,
}

impl BatchReport {
    pub fn processed(&self) -> usize {
        self.results.len() + self.failures.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_cells_are_dropped() {
        let row: Row = [("Glucose", "  "), ("Age", " 45 ")].into_iter().collect();
        assert_eq!(row.get("Glucose"), None);
        assert_eq!(row.get("Age"), Some("45"));
    }

    #[test]
    fn complete_row_converts_to_floats() {
        let row: Row = [
            ("Pregnancies", "6"),
            ("Glucose", "148"),
            ("BloodPressure", "72"),
            ("SkinThickness", "35"),
            ("Insulin", "0"),
            ("BMI", "33.6"),
            ("DiabetesPedigreeFunction", "0.627"),
            ("Age", "50"),
            ("Outcome", "1"),
        ]
        .into_iter()
        .collect();

        let record = row.to_record().unwrap();
        assert_eq!(
            record.to_array(),
            [6.0, 148.0, 72.0, 35.0, 0.0, 33.6, 0.627, 50.0]
        );
    }

    #[test]
    fn incomplete_row_names_missing_fields() {
        let row: Row = [("Pregnancies", "6"), ("Glucose", "abc")].into_iter().collect();
        let err = row.to_record().unwrap_err();
        let fields = err.fields();
        assert_eq!(fields[0], "Glucose");
        assert!(fields.contains(&"Age"));
        assert!(!fields.contains(&"Pregnancies"));
    }
}

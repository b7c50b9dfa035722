use diabetes_api::PredictionResult;
use std::fmt::Write;

const GAUGE_WIDTH: usize = 30;

pub fn label(result: &PredictionResult) -> &'static str {
    if result.is_diabetic() {
        "Diabetic 🔴"
    } else {
        "Healthy 🟢"
    }
}

pub fn percentage(probability: f64) -> String {
    format!("{:.1}%", probability * 100.0)
}

/// Jauge texte proportionnelle à la probabilité.
pub fn gauge(probability: f64) -> String {
    let filled = (probability.clamp(0.0, 1.0) * GAUGE_WIDTH as f64).round() as usize;
    format!(
        "[{}{}]",
        "█".repeat(filled),
        "░".repeat(GAUGE_WIDTH - filled)
    )
}

pub fn single_result(result: &PredictionResult) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Prediction Results");
    let _ = writeln!(out, "  Prediction:  {}", label(result));
    let _ = writeln!(out, "  Probability: {}", percentage(result.proba_diabetes));
    let _ = writeln!(out, "  {}", gauge(result.proba_diabetes));
    let _ = writeln!(out);
    let _ = writeln!(out, "Detailed Results:");
    let detailed = serde_json::to_string_pretty(result).unwrap_or_default();
    let _ = writeln!(out, "{}", detailed);
    out
}

/// Tableau texte aligné.
pub fn table<S: AsRef<str>>(headers: &[S], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.as_ref().chars().count()).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let line = |cells: Vec<&str>| -> String {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut out = String::new();
    let _ = writeln!(out, "{}", line(headers.iter().map(|h| h.as_ref()).collect()));
    let _ = writeln!(
        out,
        "{}",
        widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("  ")
    );
    for row in rows {
        let _ = writeln!(out, "{}", line(row.iter().map(String::as_str).collect()));
    }
    out
}

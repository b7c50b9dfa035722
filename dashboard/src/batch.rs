use diabetes_api::models::FEATURE_NAMES;
use diabetes_api::PredictionResult;
use futures::{future, stream, StreamExt};
use log::{info, warn};
use std::fs::File;
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

use crate::client::{ClientError, Scorer};
use crate::types::{BatchReport, Progress, Row, RowFailure};

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("délimiteur invalide {0:?}: un seul caractère ASCII attendu")]
    Delimiter(String),
    #[error("impossible d'ouvrir {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("lecture impossible de {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: csv::Error,
    },
    #[error("aucune ligne n'a pu être évaluée ({total} lignes)")]
    NoResults { total: usize },
    #[error("export impossible vers {path}: {source}")]
    Export {
        path: String,
        #[source]
        source: csv::Error,
    },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Row>,
    /// Enregistrements illisibles, écartés sans interrompre la lecture.
    pub rejected: Vec<RowFailure>,
}

pub fn parse_delimiter(raw: &str) -> Result<u8, BatchError> {
    match raw.as_bytes() {
        [byte] => Ok(*byte),
        _ => Err(BatchError::Delimiter(raw.to_string())),
    }
}

/// Lit un fichier délimité avec en-tête. Les lignes courtes sont acceptées,
/// les cellules manquantes restent absentes de la ligne. Les octets non UTF-8
/// sont remplacés; un enregistrement illisible est noté puis ignoré.
pub fn read_table<R: io::Read>(reader: R, delimiter: u8) -> Result<Table, csv::Error> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = rdr
        .byte_headers()?
        .iter()
        .map(|h| String::from_utf8_lossy(h).trim().to_string())
        .collect();

    let mut table = Table {
        headers,
        ..Table::default()
    };
    for (index, record) in rdr.byte_records().enumerate() {
        let number = index + 1;
        let record = match record {
            Ok(record) => record,
            Err(e) if e.is_io_error() => return Err(e),
            Err(e) => {
                warn!("Ligne {} illisible: {:?}", number, e);
                table.rejected.push(RowFailure {
                    row: number,
                    reason: format!("ligne illisible: {}", e),
                });
                continue;
            }
        };

        let mut row = Row::numbered(number);
        for (header, cell) in table.headers.iter().zip(record.iter()) {
            row.insert(header, &String::from_utf8_lossy(cell));
        }
        table.rows.push(row);
    }

    Ok(table)
}

pub fn open_table(path: &Path, delimiter: u8) -> Result<Table, BatchError> {
    let file = File::open(path).map_err(|source| BatchError::Open {
        path: path.display().to_string(),
        source,
    })?;
    read_table(file, delimiter).map_err(|source| BatchError::Read {
        path: path.display().to_string(),
        source,
    })
}

async fn score_row<S: Scorer>(scorer: &S, row: &Row) -> Result<PredictionResult, ClientError> {
    let record = row.to_record()?;
    scorer.score(&record).await
}

/// Évalue chaque ligne indépendamment: une ligne en échec est journalisée et
/// notée, jamais fatale. `stop` est consulté avant l'envoi de chaque ligne,
/// `on_progress` est appelé à chaque ligne terminée. L'ordre du fichier est
/// conservé quelle que soit la concurrence.
pub async fn run_batch<S, F>(
    scorer: &S,
    table: &Table,
    concurrency: usize,
    stop: &AtomicBool,
    mut on_progress: F,
) -> BatchReport
where
    S: Scorer,
    F: FnMut(&Progress),
{
    let total = table.rows.len() + table.rejected.len();
    let mut done = table.rejected.len();

    let outcomes: Vec<(usize, Result<PredictionResult, ClientError>)> =
        stream::iter(table.rows.iter())
            .take_while(|_| future::ready(!stop.load(Ordering::SeqCst)))
            .map(|row| async move { (row.number(), score_row(scorer, row).await) })
            .buffered(concurrency.max(1))
            .inspect(|(row, outcome)| {
                done += 1;
                let progress = Progress {
                    done,
                    total,
                    row: *row,
                    ok: outcome.is_ok(),
                };
                info!(
                    "[{}/{}] ligne {}: {}",
                    progress.done,
                    progress.total,
                    progress.row,
                    if progress.ok { "ok" } else { "échec" }
                );
                on_progress(&progress);
            })
            .collect()
            .await;

    let mut report = BatchReport {
        total,
        failures: table.rejected.clone(),
        ..BatchReport::default()
    };
    for (row, outcome) in outcomes {
        match outcome {
            Ok(result) => report.results.push(result),
            Err(e) => {
                warn!("Ligne {} ignorée: {}", row, e);
                report.failures.push(RowFailure {
                    row,
                    reason: e.to_string(),
                });
            }
        }
    }
    report.failures.sort_by_key(|f| f.row);
    report.cancelled = report.processed() < report.total;

    info!(
        "Batch terminé: {} succès, {} échecs, {} lignes",
        report.results.len(),
        report.failures.len(),
        report.total
    );
    report
}

pub fn export_headers() -> Vec<&'static str> {
    FEATURE_NAMES
        .iter()
        .copied()
        .chain(["prediction", "proba_diabetes"])
        .collect()
}

pub fn result_cells(result: &PredictionResult) -> Vec<String> {
    result
        .echo
        .to_array()
        .iter()
        .map(f64::to_string)
        .chain([
            result.prediction.to_string(),
            result.proba_diabetes.to_string(),
        ])
        .collect()
}

pub fn write_results<W: io::Write>(
    writer: W,
    results: &[PredictionResult],
) -> Result<(), csv::Error> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(export_headers())?;
    for result in results {
        wtr.write_record(result_cells(result))?;
    }
    wtr.flush()?;
    Ok(())
}

/// Écrit le fichier d'export; un lot sans aucun résultat n'écrit rien.
pub fn export(path: &Path, report: &BatchReport) -> Result<(), BatchError> {
    if report.results.is_empty() {
        return Err(BatchError::NoResults {
            total: report.total,
        });
    }
    let export_error = |source: csv::Error| BatchError::Export {
        path: path.display().to_string(),
        source,
    };
    let file = File::create(path).map_err(|e| export_error(csv::Error::from(e)))?;
    write_results(file, &report.results).map_err(export_error)
}

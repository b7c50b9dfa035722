pub mod batch;
pub mod client;
pub mod render;
pub mod types;

pub use batch::{
    export, open_table, parse_delimiter, read_table, run_batch, write_results, BatchError, Table,
};
pub use client::{ApiClient, ClientError, Scorer};
pub use types::{BatchReport, Progress, Row, RowFailure};

//! Batch reader: re-emits CSV rows for the import pipeline.

use std::fs::File;
use std::path::Path;

use tokio::sync::mpsc;
use tracing::{debug, instrument};

use pindah_core::error::FileError;
use pindah_core::Result;

fn open_reader(path: &Path, operation: &str) -> Result<csv::Reader<File>> {
    let file = File::open(path).map_err(|e| FileError::Open {
        path: path.display().to_string(),
        operation: operation.to_string(),
        message: e.to_string(),
    })?;

    // The header row is required; it is read and validated explicitly so
    // an empty file is reported as a missing header, not as zero rows.
    Ok(csv::ReaderBuilder::new()
        .has_headers(false)
        .from_reader(file))
}

fn parse_err(path: &Path, operation: &str, message: String) -> FileError {
    FileError::Parse {
        path: path.display().to_string(),
        operation: operation.to_string(),
        message,
    }
}

/// Stream the data rows of `path` through a bounded channel, one raw
/// field-array per row, after discarding the required header row.
///
/// A closed receiver (the downstream stage stopped first) ends the read
/// cleanly; the downstream stage's own result carries the reason. The
/// file handle is dropped on every exit path.
#[instrument(skip(tx), fields(path = %path.display()))]
pub async fn read_batches(
    path: &Path,
    operation: &str,
    tx: mpsc::Sender<Vec<String>>,
) -> Result<()> {
    let mut reader = open_reader(path, operation)?;
    let mut records = reader.records();

    match records.next() {
        Some(Ok(_header)) => {}
        Some(Err(e)) => return Err(parse_err(path, operation, e.to_string()).into()),
        None => {
            return Err(parse_err(path, operation, "missing header row".to_string()).into());
        }
    }

    let mut rows = 0u64;
    for record in records {
        let record = record.map_err(|e| parse_err(path, operation, e.to_string()))?;
        let fields: Vec<String> = record.iter().map(str::to_string).collect();
        if tx.send(fields).await.is_err() {
            debug!(rows, "receiver closed, stopping read");
            return Ok(());
        }
        rows += 1;
    }

    debug!(rows, "finished reading");
    Ok(())
}

/// Read every data row of `path` into memory, after discarding the
/// required header row. Used for small auxiliary lookups.
pub fn read_all(path: &Path, operation: &str) -> Result<Vec<Vec<String>>> {
    let mut reader = open_reader(path, operation)?;
    let mut records = reader.records();

    match records.next() {
        Some(Ok(_header)) => {}
        Some(Err(e)) => return Err(parse_err(path, operation, e.to_string()).into()),
        None => {
            return Err(parse_err(path, operation, "missing header row".to_string()).into());
        }
    }

    let mut rows = Vec::new();
    for record in records {
        let record = record.map_err(|e| parse_err(path, operation, e.to_string()))?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok(rows)
}

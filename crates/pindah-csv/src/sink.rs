//! Stream writer: renders a paginated record stream to one CSV file.

use std::fs::{self, File};
use std::path::Path;

use tokio::sync::mpsc;
use tracing::{debug, instrument};

use pindah_core::error::FileError;
use pindah_core::{CsvEntity, Result};

fn create_parent(path: &Path, operation: &str) -> Result<()> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() && !dir.exists() {
            fs::create_dir_all(dir).map_err(|e| FileError::CreateDir {
                path: path.display().to_string(),
                operation: operation.to_string(),
                message: e.to_string(),
            })?;
        }
    }
    Ok(())
}

/// Consume a stream of record pages and render them to `path`.
///
/// Writes the entity's literal header first, then one row per record in
/// publish order, as pages arrive. The file handle is dropped on every
/// exit path; the explicit flush surfaces the first write error rather
/// than letting a close error mask it. Pages already written stay in the
/// file when an upstream stage fails; partial files are preserved, not
/// rolled back.
///
/// Returns the number of data rows written.
#[instrument(skip(rx), fields(path = %path.display()))]
pub async fn write_stream<T: CsvEntity>(
    path: &Path,
    operation: &str,
    mut rx: mpsc::Receiver<Vec<T>>,
) -> Result<u64> {
    create_parent(path, operation)?;

    let file = File::create(path).map_err(|e| FileError::Create {
        path: path.display().to_string(),
        operation: operation.to_string(),
        message: e.to_string(),
    })?;

    let write_err = |e: csv::Error| FileError::Write {
        path: path.display().to_string(),
        operation: operation.to_string(),
        message: e.to_string(),
    };

    let mut writer = csv::Writer::from_writer(file);
    writer.write_record(T::HEADER).map_err(write_err)?;

    let mut rows = 0u64;
    while let Some(page) = rx.recv().await {
        for record in &page {
            writer.write_record(record.to_fields()?).map_err(write_err)?;
            rows += 1;
        }
        // Keep the file consistent page by page, so a later failure or
        // cancellation leaves exactly the published pages behind.
        writer.flush().map_err(|e| FileError::Write {
            path: path.display().to_string(),
            operation: operation.to_string(),
            message: e.to_string(),
        })?;
    }

    debug!(rows, "finished writing");
    Ok(rows)
}

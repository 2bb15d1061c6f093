//! Result persistence: one delimited text file per worker range.

use crate::error::{ReconError, Result};
use crate::partition::RowRange;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Header row written at the top of every result file.
pub const RESULT_HEADER: [&str; 3] = ["KEY", "ACTUAL VALUE", "EXPECTED VALUE"];

/// Build the deterministic result-file name for one range:
/// `<yyyyMMddHHmmss>_RESULTS_<minRow>_<maxRow>.csv`.
pub fn result_file_name(stamp: &str, range: RowRange) -> String {
    format!("{}_RESULTS_{}_{}.csv", stamp, range.start, range.end)
}

/// Receives ordered result rows and persists them.
pub trait ResultSink: Send {
    /// Append one row. An empty value slice writes nothing and succeeds.
    fn write_row(&mut self, values: &[&str]) -> Result<()>;
}

/// CSV sink with comma columns and newline rows.
///
/// Every call opens, appends to, and closes the file; callers must not
/// assume buffering across invocations. Values containing a delimiter
/// are wrapped in double quotes. Embedded quote characters are not
/// escaped; keys and domains never carry them in practice, and the
/// simplified quoting is part of the file contract.
pub struct CsvSink {
    path: PathBuf,
    row_delimiter: String,
    col_delimiter: String,
}

impl CsvSink {
    /// Create a sink writing to `path` with the default delimiters.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self::with_delimiters(path, "\n", ",")
    }

    /// Create a sink with explicit row and column delimiters.
    pub fn with_delimiters<P: AsRef<Path>>(
        path: P,
        row_delimiter: &str,
        col_delimiter: &str,
    ) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            row_delimiter: row_delimiter.to_string(),
            col_delimiter: col_delimiter.to_string(),
        }
    }

    /// Path of the destination file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn quote_delimiter<'a>(&self, value: &'a str) -> std::borrow::Cow<'a, str> {
        if value.contains(&self.col_delimiter) || value.contains(&self.row_delimiter) {
            std::borrow::Cow::Owned(format!("\"{}\"", value))
        } else {
            std::borrow::Cow::Borrowed(value)
        }
    }

    fn report_err(&self, e: std::io::Error) -> ReconError {
        ReconError::Report {
            path: self.path.display().to_string(),
            message: e.to_string(),
        }
    }
}

impl ResultSink for CsvSink {
    fn write_row(&mut self, values: &[&str]) -> Result<()> {
        if values.is_empty() {
            return Ok(());
        }

        let mut line = String::new();
        for (i, value) in values.iter().enumerate() {
            if i > 0 {
                line.push_str(&self.col_delimiter);
            }
            line.push_str(&self.quote_delimiter(value));
        }
        line.push_str(&self.row_delimiter);

        // Open-append-close per call: the file is left in a consistent
        // state even if this worker dies mid-range.
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| self.report_err(e))?;
        file.write_all(line.as_bytes())
            .map_err(|e| self.report_err(e))?;

        Ok(())
    }
}

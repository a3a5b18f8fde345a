//! CSV Data Loader Module
//! Reads the transaction export (Shift_JIS) and the towns reference (UTF-8) into Polars frames.

use encoding_rs::{Encoding, SHIFT_JIS, UTF_8};
use polars::prelude::*;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("{} is not valid {encoding} text", path.display())]
    Decode {
        path: PathBuf,
        encoding: &'static str,
    },
    #[error("Failed to parse CSV: {0}")]
    CsvError(#[from] PolarsError),
}

/// Loads the two raw sources of the pipeline.
///
/// Every column is read as `String`; type conversion happens in the processor so that
/// malformed values surface as parse errors instead of silently becoming nulls.
pub struct DataLoader;

impl DataLoader {
    /// Load the raw transaction export and the towns reference.
    pub fn load(
        transaction_path: &Path,
        towns_path: &Path,
    ) -> Result<(DataFrame, DataFrame), LoaderError> {
        let transactions = Self::load_csv(transaction_path, SHIFT_JIS)?;
        let towns = Self::load_csv(towns_path, UTF_8)?;
        Ok((transactions, towns))
    }

    /// Read one CSV file, decoding it strictly with the given encoding.
    pub fn load_csv(path: &Path, encoding: &'static Encoding) -> Result<DataFrame, LoaderError> {
        let text = Self::read_text(path, encoding)?;

        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(0))
            .into_reader_with_file_handle(Cursor::new(text.into_bytes()))
            .finish()?;
        let df = Self::blanks_to_null(&df)?;

        info!(
            path = %path.display(),
            encoding = encoding.name(),
            rows = df.height(),
            columns = df.width(),
            "Loaded CSV"
        );
        Ok(df)
    }

    /// Read a file and decode it, failing on any malformed byte sequence.
    pub fn read_text(path: &Path, encoding: &'static Encoding) -> Result<String, LoaderError> {
        let bytes = std::fs::read(path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                LoaderError::FileNotFound(path.to_path_buf())
            } else {
                LoaderError::Io {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;
        debug!(path = %path.display(), bytes = bytes.len(), "Read raw file");

        let (text, had_errors) = if encoding == UTF_8 {
            encoding.decode_with_bom_removal(&bytes)
        } else {
            encoding.decode_without_bom_handling(&bytes)
        };

        if had_errors {
            return Err(LoaderError::Decode {
                path: path.to_path_buf(),
                encoding: encoding.name(),
            });
        }
        Ok(text.into_owned())
    }

    /// Replace empty and whitespace-only fields with nulls.
    ///
    /// The reader only yields nulls for unquoted empty fields; a quoted `""` arrives as
    /// an empty string.
    pub fn blanks_to_null(df: &DataFrame) -> Result<DataFrame, LoaderError> {
        let columns = df
            .get_columns()
            .iter()
            .map(|column| {
                let values: Vec<Option<&str>> = column
                    .str()?
                    .into_iter()
                    .map(|v| v.filter(|s| !s.trim().is_empty()))
                    .collect();
                Ok(Column::new(column.name().clone(), values))
            })
            .collect::<PolarsResult<Vec<Column>>>()?;
        Ok(DataFrame::new(columns)?)
    }

    /// Get list of column names of a frame.
    pub fn column_names(df: &DataFrame) -> Vec<String> {
        df.get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_bytes(bytes: &[u8]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(bytes).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn decodes_shift_jis_multibyte_headers() {
        let text = "No,Nearest station：Name\n1,渋谷\n";
        let (encoded, _, _) = SHIFT_JIS.encode(text);
        let file = write_bytes(&encoded);

        let df = DataLoader::load_csv(file.path(), SHIFT_JIS).unwrap();
        assert_eq!(
            DataLoader::column_names(&df),
            vec!["No".to_string(), "Nearest station：Name".to_string()]
        );
        let station = df.column("Nearest station：Name").unwrap().str().unwrap();
        assert_eq!(station.get(0), Some("渋谷"));
    }

    #[test]
    fn all_columns_are_read_as_strings() {
        let file = write_bytes(b"cityCode,latitude\n13101,35.68\n");
        let df = DataLoader::load_csv(file.path(), UTF_8).unwrap();
        assert_eq!(df.column("cityCode").unwrap().dtype(), &DataType::String);
        assert_eq!(df.column("latitude").unwrap().dtype(), &DataType::String);
    }

    #[test]
    fn strips_utf8_bom() {
        let file = write_bytes(b"\xEF\xBB\xBFcityCode,townAlphabet\n13101,Marunouchi\n");
        let df = DataLoader::load_csv(file.path(), UTF_8).unwrap();
        assert_eq!(DataLoader::column_names(&df)[0], "cityCode");
    }

    #[test]
    fn invalid_shift_jis_is_a_decode_error() {
        // 0x81 0x20 is an invalid lead/trail pair in Shift_JIS.
        let file = write_bytes(b"No,Area\n1,\x81\x20\n");
        let err = DataLoader::load_csv(file.path(), SHIFT_JIS).unwrap_err();
        assert!(matches!(err, LoaderError::Decode { encoding: "Shift_JIS", .. }));
    }

    #[test]
    fn quoted_blank_fields_are_null() {
        let file = write_bytes(b"\"No\",\"Layout\",\"Renovation\"\n\"1\",\"\",\"  \"\n\"2\",\"1LDK\",\"Done\"\n");
        let df = DataLoader::load_csv(file.path(), SHIFT_JIS).unwrap();
        assert_eq!(df.height(), 2);
        let layout = df.column("Layout").unwrap().str().unwrap();
        assert_eq!(layout.get(0), None);
        assert_eq!(layout.get(1), Some("1LDK"));
        assert_eq!(df.column("Renovation").unwrap().null_count(), 1);
    }

    #[test]
    fn missing_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.csv");
        let err = DataLoader::load(&missing, &missing).unwrap_err();
        assert!(matches!(err, LoaderError::FileNotFound(path) if path == missing));
    }
}

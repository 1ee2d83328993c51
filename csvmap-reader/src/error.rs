use std::sync::Arc;

/// Errors produced by this crate.
///
/// Cloneable so a reader that hit a fatal read error can keep reporting it.
#[derive(Debug, Clone, thiserror::Error)]
pub enum MapReaderError {
    /// The underlying CSV reader failed: I/O, malformed quoting, invalid UTF-8, or an
    /// empty input where a header row was expected.
    #[error("Failed to read CSV input: {0}")]
    Read(#[source] Arc<csv::Error>),

    /// The header row produced no columns.
    #[error("Failed to build header index: header row has no columns")]
    EmptyHeader,

    /// The same column name appears twice and duplicates are rejected.
    #[error("Duplicate header {name:?} at columns {first} and {second}")]
    DuplicateHeader {
        name: String,
        first: usize,
        second: usize,
    },

    /// A data record has fewer fields than the header row.
    #[error(
        "Short record{}: column {column:?} expects position {position} but the record has {fields} fields",
        .line.map(|line| format!(" at line {line}")).unwrap_or_default()
    )]
    ShortRecord {
        line: Option<u64>,
        column: String,
        position: usize,
        fields: usize,
    },
}

impl MapReaderError {
    /// Returns `true` for failures of the underlying stream or CSV grammar.
    pub fn is_read_error(&self) -> bool {
        matches!(self, MapReaderError::Read(_))
    }

    pub fn is_short_record(&self) -> bool {
        matches!(self, MapReaderError::ShortRecord { .. })
    }

    /// The wrapped [`csv::Error`], if this is a read error.
    pub fn as_csv_error(&self) -> Option<&csv::Error> {
        match self {
            MapReaderError::Read(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<csv::Error> for MapReaderError {
    fn from(err: csv::Error) -> Self {
        MapReaderError::Read(Arc::new(err))
    }
}

impl From<std::io::Error> for MapReaderError {
    fn from(err: std::io::Error) -> Self {
        MapReaderError::from(csv::Error::from(err))
    }
}

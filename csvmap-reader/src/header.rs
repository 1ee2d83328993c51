use std::{fmt, str::FromStr};

use csv::StringRecord;
use indexmap::IndexMap;
use serde::Serialize;

use crate::{error::MapReaderError, MapResult};

/// One data record keyed by column name. Keys follow the column order of the header row.
pub type RowMap = IndexMap<String, String>;

/// What to do when the header row names the same column more than once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicateHeaders {
    /// The right-most column with the name is the one that gets mapped.
    #[default]
    LastWins,
    /// Construction fails with [`MapReaderError::DuplicateHeader`].
    Reject,
}

impl FromStr for DuplicateHeaders {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "last_wins" | "last" => Ok(DuplicateHeaders::LastWins),
            "reject" | "error" => Ok(DuplicateHeaders::Reject),
            other => Err(format!("unknown duplicate header policy: {other}")),
        }
    }
}

impl fmt::Display for DuplicateHeaders {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DuplicateHeaders::LastWins => write!(f, "last_wins"),
            DuplicateHeaders::Reject => write!(f, "reject"),
        }
    }
}

/// Column name to zero-based field position, built once from the header row.
///
/// Iteration follows the order in which names first appear in the header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct HeaderIndex {
    positions: IndexMap<String, usize>,
}

impl HeaderIndex {
    /// Build the index from the header names in file order.
    ///
    /// Fails with [`MapReaderError::EmptyHeader`] if there are no names, and with
    /// [`MapReaderError::DuplicateHeader`] on a repeated name under
    /// [`DuplicateHeaders::Reject`].
    pub fn build<I, S>(headers: I, duplicates: DuplicateHeaders) -> MapResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let headers = headers.into_iter();
        let mut positions = IndexMap::with_capacity(headers.size_hint().0);

        for (position, name) in headers.enumerate() {
            let name = name.as_ref();
            let Some(previous) = positions.insert(name.to_string(), position) else {
                continue;
            };
            match duplicates {
                DuplicateHeaders::LastWins => {
                    tracing::warn!(
                        header = name,
                        previous,
                        position,
                        "duplicate CSV header, mapping the later column"
                    );
                }
                DuplicateHeaders::Reject => {
                    return Err(MapReaderError::DuplicateHeader {
                        name: name.to_string(),
                        first: previous,
                        second: position,
                    });
                }
            }
        }

        if positions.is_empty() {
            return Err(MapReaderError::EmptyHeader);
        }

        Ok(Self { positions })
    }

    pub fn get(&self, name: &str) -> Option<usize> {
        self.positions.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.positions.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// `(name, position)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> + '_ {
        self.positions
            .iter()
            .map(|(name, position)| (name.as_str(), *position))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.positions.keys().map(String::as_str)
    }

    /// Translate a record into a [`RowMap`].
    ///
    /// Extra trailing fields are ignored. A record that stops before a mapped position
    /// fails with [`MapReaderError::ShortRecord`].
    pub fn project(&self, record: &StringRecord) -> MapResult<RowMap> {
        let line = record.position().map(|pos| pos.line());
        self.project_with(record.len(), line, |position| record.get(position))
    }

    /// Same as [`HeaderIndex::project`] for fields that did not come from a [`csv::Reader`].
    pub fn project_fields<S: AsRef<str>>(&self, fields: &[S]) -> MapResult<RowMap> {
        self.project_with(fields.len(), None, |position| {
            fields.get(position).map(|field| field.as_ref())
        })
    }

    fn project_with<'a, F>(&self, fields: usize, line: Option<u64>, field: F) -> MapResult<RowMap>
    where
        F: Fn(usize) -> Option<&'a str>,
    {
        let mut row = RowMap::with_capacity(self.positions.len());
        for (name, &position) in &self.positions {
            let value = field(position).ok_or_else(|| MapReaderError::ShortRecord {
                line,
                column: name.clone(),
                position,
                fields,
            })?;
            row.insert(name.clone(), value.to_string());
        }
        Ok(row)
    }
}

impl<'a> IntoIterator for &'a HeaderIndex {
    type Item = (&'a String, &'a usize);
    type IntoIter = indexmap::map::Iter<'a, String, usize>;

    fn into_iter(self) -> Self::IntoIter {
        self.positions.iter()
    }
}

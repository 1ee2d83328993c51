use std::io::Read;

use csvmap_config::Config;

use crate::header::DuplicateHeaders;

#[derive(Debug, Clone)]
pub struct MapReaderOptions {
    /// Policy for repeated column names in the header row
    pub duplicate_headers: DuplicateHeaders,
    /// Size in bytes of the read buffer placed in front of the input stream
    pub buffer_capacity: usize,
}

impl Default for MapReaderOptions {
    fn default() -> Self {
        Self {
            duplicate_headers: DuplicateHeaders::default(),
            buffer_capacity: 8 * 1024,
        }
    }
}

impl MapReaderOptions {
    /// Options from the `CSVMAP_*` environment settings. An unknown duplicate header
    /// policy falls back to the default.
    pub fn from_config(config: &Config) -> Self {
        let duplicate_headers = config
            .duplicate_headers
            .parse::<DuplicateHeaders>()
            .unwrap_or_else(|err| {
                tracing::warn!("{err}, using {}", DuplicateHeaders::default());
                DuplicateHeaders::default()
            });

        Self {
            duplicate_headers,
            buffer_capacity: config.buffer_capacity,
        }
    }

    pub fn with_duplicate_headers(mut self, duplicate_headers: DuplicateHeaders) -> Self {
        self.duplicate_headers = duplicate_headers;
        self
    }

    pub fn with_buffer_capacity(mut self, buffer_capacity: usize) -> Self {
        self.buffer_capacity = buffer_capacity;
        self
    }

    /// The header row is consumed by hand and field counts are checked during
    /// projection, so the csv reader runs headerless and flexible.
    pub(crate) fn csv_reader<R: Read>(&self, input: R) -> csv::Reader<R> {
        csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            // A zero sized buffer reads as an immediate end of input.
            .buffer_capacity(self.buffer_capacity.max(1))
            .from_reader(input)
    }
}

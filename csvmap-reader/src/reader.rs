use std::{io, iter::FusedIterator};

use csv::StringRecord;

use crate::{
    error::MapReaderError,
    header::{HeaderIndex, RowMap},
    options::MapReaderOptions,
    MapResult,
};

enum ReadState {
    Active,
    Exhausted,
    Failed(MapReaderError),
}

/// Reads CSV records as [`RowMap`]s keyed by the names in the first record.
///
/// Once the input is exhausted every read reports end of data again, and once a read
/// fails every read returns that same error. A short record is not fatal: it is
/// consumed and the next read continues after it.
pub struct MapReader<R> {
    headers: Vec<String>,
    index: HeaderIndex,
    reader: csv::Reader<R>,
    record: StringRecord,
    state: ReadState,
}

impl<R: io::Read> MapReader<R> {
    /// Read the header row from `input` with default options.
    ///
    /// An input without any record fails with a read error whose I/O kind is
    /// [`io::ErrorKind::UnexpectedEof`].
    pub fn new(input: R) -> MapResult<Self> {
        Self::with_options(input, MapReaderOptions::default())
    }

    #[tracing::instrument(level = "debug", skip_all, fields(duplicates = %options.duplicate_headers))]
    pub fn with_options(input: R, options: MapReaderOptions) -> MapResult<Self> {
        let mut reader = options.csv_reader(input);

        let mut header = StringRecord::new();
        if !reader.read_record(&mut header)? {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "CSV input has no header row",
            )
            .into());
        }

        let headers: Vec<String> = header.iter().map(str::to_string).collect();
        let index = HeaderIndex::build(&headers, options.duplicate_headers)?;
        tracing::debug!(columns = headers.len(), ?headers, "loaded CSV header");

        Ok(Self {
            headers,
            index,
            reader,
            record: StringRecord::new(),
            state: ReadState::Active,
        })
    }

    /// Read the next record. `Ok(None)` marks the end of the data.
    pub fn read(&mut self) -> MapResult<Option<RowMap>> {
        if !self.advance()? {
            return Ok(None);
        }
        self.index.project(&self.record).map(Some)
    }

    /// Read every remaining record, in file order.
    ///
    /// Either all rows are returned or none: the first read or projection error is
    /// returned on its own. After the input is exhausted this returns an empty vector.
    ///
    /// A short record does not rewind the reader. The rows read before it in the same
    /// call are dropped, and a second call resumes after the short record.
    pub fn read_all(&mut self) -> MapResult<Vec<RowMap>> {
        let mut rows = Vec::new();
        while self.advance()? {
            rows.push(self.index.project(&self.record)?);
        }
        tracing::debug!(rows = rows.len(), "read remaining CSV records");
        Ok(rows)
    }

    /// Borrowing iterator over the remaining rows.
    pub fn records(&mut self) -> MapRecords<'_, R> {
        MapRecords {
            reader: self,
            done: false,
        }
    }

    fn advance(&mut self) -> MapResult<bool> {
        match &self.state {
            ReadState::Active => {}
            ReadState::Exhausted => return Ok(false),
            ReadState::Failed(err) => return Err(err.clone()),
        }

        match self.reader.read_record(&mut self.record) {
            Ok(true) => {
                tracing::trace!(
                    line = self.record.position().map(|pos| pos.line()),
                    fields = self.record.len(),
                    "read CSV record"
                );
                Ok(true)
            }
            Ok(false) => {
                self.state = ReadState::Exhausted;
                Ok(false)
            }
            Err(err) => {
                let err = MapReaderError::from(err);
                self.state = ReadState::Failed(err.clone());
                Err(err)
            }
        }
    }
}

impl<R: io::Read> MapReader<R> {
    /// Column names in file order, duplicates included.
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn header_index(&self) -> &HeaderIndex {
        &self.index
    }

    /// Position of the underlying reader, i.e. just past the last record read.
    pub fn position(&self) -> &csv::Position {
        self.reader.position()
    }

    /// `true` once the input is exhausted or a read failed.
    pub fn is_done(&self) -> bool {
        !matches!(self.state, ReadState::Active)
    }

    pub fn get_ref(&self) -> &R {
        self.reader.get_ref()
    }

    /// Give the input stream back. Buffered but unread bytes are lost.
    pub fn into_inner(self) -> R {
        self.reader.into_inner()
    }
}

fn next_row<R: io::Read>(reader: &mut MapReader<R>, done: &mut bool) -> Option<MapResult<RowMap>> {
    if *done {
        return None;
    }
    match reader.read() {
        Ok(Some(row)) => Some(Ok(row)),
        Ok(None) => {
            *done = true;
            None
        }
        Err(err) => {
            *done = err.is_read_error();
            Some(Err(err))
        }
    }
}

/// Iterator returned by [`MapReader::records`].
///
/// Short records are yielded as errors and iteration continues; a read error is
/// yielded once and ends the iteration.
pub struct MapRecords<'r, R> {
    reader: &'r mut MapReader<R>,
    done: bool,
}

impl<R: io::Read> Iterator for MapRecords<'_, R> {
    type Item = MapResult<RowMap>;

    fn next(&mut self) -> Option<Self::Item> {
        next_row(self.reader, &mut self.done)
    }
}

impl<R: io::Read> FusedIterator for MapRecords<'_, R> {}

/// Owning iterator over the rows of a [`MapReader`].
pub struct IntoMapRecords<R> {
    reader: MapReader<R>,
    done: bool,
}

impl<R> IntoMapRecords<R> {
    pub fn into_reader(self) -> MapReader<R> {
        self.reader
    }
}

impl<R: io::Read> Iterator for IntoMapRecords<R> {
    type Item = MapResult<RowMap>;

    fn next(&mut self) -> Option<Self::Item> {
        next_row(&mut self.reader, &mut self.done)
    }
}

impl<R: io::Read> FusedIterator for IntoMapRecords<R> {}

impl<R: io::Read> IntoIterator for MapReader<R> {
    type Item = MapResult<RowMap>;
    type IntoIter = IntoMapRecords<R>;

    fn into_iter(self) -> Self::IntoIter {
        IntoMapRecords {
            reader: self,
            done: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::{self, Read};

    use super::MapReader;
    use crate::{
        error::MapReaderError,
        header::DuplicateHeaders,
        options::MapReaderOptions,
    };

    const SIMPLE: &str = "first,second,third\na,b,c\n";

    /// Serves `data`, then fails every read.
    struct FailAfter {
        data: io::Cursor<Vec<u8>>,
    }

    impl Read for FailAfter {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.data.read(buf)? {
                0 => Err(io::Error::new(io::ErrorKind::ConnectionReset, "stream dropped")),
                n => Ok(n),
            }
        }
    }

    #[test]
    fn header_sequence_and_index() {
        let reader = MapReader::new(SIMPLE.as_bytes()).unwrap();
        assert_eq!(reader.headers().to_vec(), vec!["first", "second", "third"]);

        let index = reader.header_index();
        assert_eq!(index.len(), reader.headers().len());
        assert_eq!(index.get("first"), Some(0));
        assert_eq!(index.get("second"), Some(1));
        assert_eq!(index.get("third"), Some(2));
        assert!(!reader.is_done());
    }

    #[test]
    fn read_single_row() {
        let mut reader = MapReader::new(SIMPLE.as_bytes()).unwrap();
        let row = reader.read().unwrap().unwrap();
        assert_eq!(row.len(), 3);
        assert_eq!(row["first"], "a");
        assert_eq!(row["second"], "b");
        assert_eq!(row["third"], "c");
    }

    #[test]
    fn end_of_data_is_sticky() {
        let mut reader = MapReader::new(SIMPLE.as_bytes()).unwrap();
        assert!(reader.read().unwrap().is_some());
        for _ in 0..3 {
            assert!(reader.read().unwrap().is_none());
        }
        assert!(reader.is_done());
        assert!(reader.read_all().unwrap().is_empty());
    }

    #[test]
    fn header_only_input_has_no_rows() {
        let mut reader = MapReader::new("a,b,c\n".as_bytes()).unwrap();
        assert_eq!(reader.headers().len(), 3);
        assert!(reader.read().unwrap().is_none());
    }

    #[test]
    fn empty_input_is_a_read_error() {
        for input in ["", "\n\n"] {
            let err = MapReader::new(input.as_bytes()).err().unwrap();
            assert!(err.is_read_error());
            match err.as_csv_error().unwrap().kind() {
                csv::ErrorKind::Io(io_err) => {
                    assert_eq!(io_err.kind(), io::ErrorKind::UnexpectedEof)
                }
                other => panic!("unexpected csv error: {other:?}"),
            }
        }
    }

    #[test]
    fn read_all_preserves_file_order() {
        let data = "id,name\n1,one\n2,two\n3,three\n";
        let mut reader = MapReader::new(data.as_bytes()).unwrap();
        let rows = reader.read_all().unwrap();
        assert_eq!(rows.len(), 3);
        let ids: Vec<&str> = rows.iter().map(|row| row["id"].as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
        assert_eq!(rows[2]["name"], "three");

        assert!(reader.read_all().unwrap().is_empty());
        assert!(reader.read().unwrap().is_none());
    }

    #[test]
    fn read_all_after_partial_read_returns_the_rest() {
        let data = "id\n1\n2\n3\n";
        let mut reader = MapReader::new(data.as_bytes()).unwrap();
        assert_eq!(reader.read().unwrap().unwrap()["id"], "1");
        let rest = reader.read_all().unwrap();
        assert_eq!(rest.len(), 2);
        assert_eq!(rest[0]["id"], "2");
    }

    #[test]
    fn short_record_is_reported_and_reading_continues() {
        let data = "first,second,third\na,b\nd,e,f\n";
        let mut reader = MapReader::new(data.as_bytes()).unwrap();

        let err = reader.read().unwrap_err();
        match &err {
            MapReaderError::ShortRecord {
                line,
                column,
                position,
                fields,
            } => {
                assert_eq!(*line, Some(2));
                assert_eq!(column, "third");
                assert_eq!(*position, 2);
                assert_eq!(*fields, 2);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(!reader.is_done());

        let row = reader.read().unwrap().unwrap();
        assert_eq!(row["first"], "d");
        assert_eq!(row["third"], "f");
    }

    #[test]
    fn read_all_with_short_record_returns_no_rows() {
        let data = "first,second,third\na,b,c\nd,e\n";
        let mut reader = MapReader::new(data.as_bytes()).unwrap();
        let err = reader.read_all().unwrap_err();
        assert!(err.is_short_record());
        assert!(reader.read().unwrap().is_none());
    }

    #[test]
    fn read_all_after_short_record_resumes_past_it() {
        let data = "a,b
1,2
3
4,5
";
        let mut reader = MapReader::new(data.as_bytes()).unwrap();

        match reader.read_all().unwrap_err() {
            MapReaderError::ShortRecord { line, .. } => assert_eq!(line, Some(3)),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(!reader.is_done());

        // Row `1,2` was consumed by the failed call and is not returned again.
        let rest = reader.read_all().unwrap();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0]["a"], "4");
        assert_eq!(rest[0]["b"], "5");
    }

    #[test]
    fn long_records_drop_trailing_fields() {
        let data = "first,second\na,b,c,d\n";
        let mut reader = MapReader::new(data.as_bytes()).unwrap();
        let row = reader.read().unwrap().unwrap();
        assert_eq!(row.len(), 2);
        assert_eq!(row["second"], "b");
    }

    #[test]
    fn quoted_fields() {
        let data = "name,quote\n\"Smith, J\",\"said \"\"hi\"\"\nthen left\"\n";
        let mut reader = MapReader::new(data.as_bytes()).unwrap();
        let row = reader.read().unwrap().unwrap();
        assert_eq!(row["name"], "Smith, J");
        assert_eq!(row["quote"], "said \"hi\"\nthen left");
    }

    #[test]
    fn quoted_header_names() {
        let data = "\"last, first\",age\n\"Doe, Jane\",42\n";
        let mut reader = MapReader::new(data.as_bytes()).unwrap();
        assert_eq!(reader.header_index().get("last, first"), Some(0));
        let row = reader.read().unwrap().unwrap();
        assert_eq!(row["last, first"], "Doe, Jane");
        assert_eq!(row["age"], "42");
    }

    #[test]
    fn duplicate_headers_last_wins_by_default() {
        let data = "a,b,a\n1,2,3\n";
        let mut reader = MapReader::new(data.as_bytes()).unwrap();
        assert_eq!(reader.headers().len(), 3);
        assert_eq!(reader.header_index().len(), 2);
        let row = reader.read().unwrap().unwrap();
        assert_eq!(row["a"], "3");
        assert_eq!(row["b"], "2");
    }

    #[test]
    fn duplicate_headers_can_be_rejected() {
        let options = MapReaderOptions::default().with_duplicate_headers(DuplicateHeaders::Reject);
        let err = MapReader::with_options("a,b,a\n1,2,3\n".as_bytes(), options)
            .err()
            .unwrap();
        assert!(matches!(err, MapReaderError::DuplicateHeader { .. }));
    }

    #[test]
    fn invalid_utf8_fails_and_stays_failed() {
        let mut data = b"a,b\n".to_vec();
        data.extend_from_slice(b"\xff,x\n1,2\n");
        let mut reader = MapReader::new(data.as_slice()).unwrap();

        let first = reader.read().unwrap_err();
        assert!(first.is_read_error());
        assert!(reader.is_done());

        let second = reader.read().unwrap_err();
        assert_eq!(first.to_string(), second.to_string());
        assert!(reader.read_all().unwrap_err().is_read_error());
    }

    #[test]
    fn io_failure_is_not_retried() {
        let input = FailAfter {
            data: io::Cursor::new(b"a,b\n1,2\n".to_vec()),
        };
        let mut reader = MapReader::with_options(
            input,
            MapReaderOptions::default().with_buffer_capacity(4),
        )
        .unwrap();

        let row = reader.read().unwrap().unwrap();
        assert_eq!(row["b"], "2");

        let err = reader.read().unwrap_err();
        match err.as_csv_error().unwrap().kind() {
            csv::ErrorKind::Io(io_err) => {
                assert_eq!(io_err.kind(), io::ErrorKind::ConnectionReset)
            }
            other => panic!("unexpected csv error: {other:?}"),
        }

        assert_eq!(reader.get_ref().data.position(), 8);
        let again = reader.read().unwrap_err();
        assert_eq!(err.to_string(), again.to_string());
    }

    #[test]
    fn records_iterator_yields_rows_then_stops() {
        let data = "k,v\na,1\nb\nc,3\n";
        let mut reader = MapReader::new(data.as_bytes()).unwrap();
        let results: Vec<_> = reader.records().collect();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap()["k"], "a");
        assert!(results[1].as_ref().unwrap_err().is_short_record());
        assert_eq!(results[2].as_ref().unwrap()["v"], "3");
        assert!(reader.records().next().is_none());
    }

    #[test]
    fn records_iterator_ends_after_read_error() {
        let mut data = b"a\n1\n".to_vec();
        data.extend_from_slice(b"\xfe\n2\n");
        let reader = MapReader::new(data.as_slice()).unwrap();
        let mut rows = reader.into_iter();
        assert!(rows.next().unwrap().is_ok());
        assert!(rows.next().unwrap().unwrap_err().is_read_error());
        assert!(rows.next().is_none());
        assert!(rows.into_reader().is_done());
    }

    #[test]
    fn into_inner_returns_the_stream() {
        let input = io::Cursor::new(SIMPLE.as_bytes().to_vec());
        let mut reader = MapReader::new(input).unwrap();
        reader.read_all().unwrap();
        assert_eq!(reader.position().line(), 3);
        let cursor = reader.into_inner();
        assert_eq!(cursor.get_ref().len(), SIMPLE.len());
    }
}

use std::{fs::File, io::BufReader};

use anyhow::Context;
use csvmap_reader::{MapReader, MapReaderOptions};

/// Prints every row of a CSV file as one JSON object per line.
///
/// `cargo run -p csvmap-reader --example dump -- data.csv`
fn main() -> anyhow::Result<()> {
    let config = csvmap_config::Config::try_init().context("Invalid CSVMAP_* settings")?;
    csvmap_logger::init()?;

    let path = std::env::args()
        .nth(1)
        .context("usage: dump <file.csv>")?;
    let file = File::open(&path).with_context(|| format!("Failed to open {path}"))?;

    let options = MapReaderOptions::from_config(&config);
    let reader = MapReader::with_options(BufReader::new(file), options)
        .with_context(|| format!("Failed to read header of {path}"))?;
    tracing::info!(
        "columns: {}",
        serde_json::to_string(reader.header_index())?
    );

    let mut rows = 0usize;
    for row in reader {
        match row {
            Ok(row) => {
                println!("{}", serde_json::to_string(&row)?);
                rows += 1;
            }
            Err(err) if err.is_short_record() => tracing::warn!("skipping row: {err}"),
            Err(err) => return Err(err).context(format!("Failed to read {path}")),
        }
    }

    tracing::info!("dumped {rows} rows from {path}");
    Ok(())
}

//! CSV input and output for the command line

use std::error::Error;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use im_linkage::{PairRow, RawRecord};

pub type CliResult<T> = Result<T, Box<dyn Error>>;

/// Truth table row; extra columns are ignored
#[derive(Debug, Deserialize)]
struct TruthRow {
    id1: String,
    id2: String,
}

fn reader(path: &Path) -> CliResult<csv::Reader<BufReader<File>>> {
    let file = File::open(path).map_err(|e| format!("{}: {}", path.display(), e))?;
    Ok(csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(BufReader::new(file)))
}

/// Read person records; absent columns become missing values
pub fn read_records(path: &Path) -> CliResult<Vec<RawRecord>> {
    let mut reader = reader(path)?;
    let mut records = Vec::new();
    for row in reader.deserialize() {
        let record: RawRecord = row?;
        records.push(record);
    }
    debug!("Read {} records from {}", records.len(), path.display());
    Ok(records)
}

/// Read a pairs table and keep the rows marked as duplicates
pub fn read_duplicate_pairs(path: &Path) -> CliResult<Vec<(String, String)>> {
    let mut reader = reader(path)?;
    let mut pairs = Vec::new();
    for row in reader.deserialize() {
        let row: PairRow = row?;
        if row.is_duplicate() {
            pairs.push((row.id1, row.id2));
        }
    }
    Ok(pairs)
}

/// Read an `id1,id2` table of true duplicate pairs
pub fn read_truth_pairs(path: &Path) -> CliResult<Vec<(String, String)>> {
    let mut reader = reader(path)?;
    let mut pairs = Vec::new();
    for row in reader.deserialize() {
        let row: TruthRow = row?;
        pairs.push((row.id1, row.id2));
    }
    Ok(pairs)
}

/// Write rows with a header line
pub fn write_rows<T: Serialize>(writer: impl Write, rows: &[T]) -> CliResult<()> {
    let mut writer = csv::Writer::from_writer(writer);
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Write rows to a file, creating or truncating it
pub fn write_rows_to(path: &Path, rows: &[impl Serialize]) -> CliResult<()> {
    let file = File::create(path).map_err(|e| format!("{}: {}", path.display(), e))?;
    write_rows(BufWriter::new(file), rows)?;
    debug!("Wrote {} rows to {}", rows.len(), path.display());
    Ok(())
}

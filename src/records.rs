use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{BufRead, BufReader, Cursor, Error, ErrorKind};

/// Loads one record per line from a text file (gunzipped if the path ends with .gz).
/// Lines are kept as raw bytes; blank lines are skipped.
pub fn load_records(path: &str) -> Result<Vec<Vec<u8>>, Error> {
    let file = File::open(path)
        .map_err(|e| Error::new(e.kind(), format!("Failed to open input file '{}': {}", path, e)))?;

    let reader: Box<dyn BufRead> = if path.ends_with(".gz") {
        tracing::debug!(path, "reading input as gzip");
        Box::new(BufReader::new(GzDecoder::new(file)))
    } else {
        Box::new(BufReader::new(file))
    };

    read_records(reader).map_err(|e| Error::new(e.kind(), format!("Input file '{}': {}", path, e)))
}

/// In-memory variant of [`load_records`].
pub fn load_records_from_bytes(content: &[u8], is_gzipped: bool) -> Result<Vec<Vec<u8>>, Error> {
    let reader: Box<dyn BufRead + '_> = if is_gzipped {
        Box::new(BufReader::new(GzDecoder::new(content)))
    } else {
        Box::new(Cursor::new(content))
    };
    read_records(reader)
}

fn read_records<R: BufRead>(mut reader: R) -> Result<Vec<Vec<u8>>, Error> {
    let mut records = Vec::new();
    let mut line = Vec::new();

    // read_until keeps non-UTF-8 bytes intact, unlike lines().
    while reader.read_until(b'\n', &mut line)? > 0 {
        if line.last() == Some(&b'\n') {
            line.pop();
        }
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        if !line.is_empty() {
            records.push(std::mem::take(&mut line));
        }
        line.clear();
    }

    if records.is_empty() {
        return Err(Error::new(ErrorKind::InvalidData, "no records found"));
    }
    Ok(records)
}

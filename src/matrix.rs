//! All-pairs run from an input file to an Arrow IPC or JSON file.
//!
//! Results are written to `<output>.partial` and renamed over `output` only
//! once every pair has been computed and the sink has been finalized. A failed
//! run leaves no output file behind and never touches an existing one.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::thread;

use crossbeam_channel::bounded;

use crate::error::{MatrixError, OutputError, PairwiseError};
use crate::output::{IpcSink, JsonSink};
use crate::pairwise::{stream_pairwise, DistanceBatch, PairwiseConfig};
use crate::records;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Ipc,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatrixSummary {
    /// Pairs computed.
    pub pairs: usize,
    /// Rows written to the output.
    pub rows: usize,
}

enum Sink<W: Write> {
    Ipc(IpcSink<W>),
    Json(JsonSink<W>),
}

impl<W: Write> Sink<W> {
    fn new(format: OutputFormat, inner: W) -> Result<Self, OutputError> {
        Ok(match format {
            OutputFormat::Ipc => Sink::Ipc(IpcSink::new(inner)?),
            OutputFormat::Json => Sink::Json(JsonSink::new(inner)?),
        })
    }

    fn write(&mut self, batch: DistanceBatch) -> Result<(), OutputError> {
        match self {
            Sink::Ipc(sink) => sink.write(batch),
            Sink::Json(sink) => sink.write(batch),
        }
    }

    /// Finalizes the sink and returns the number of rows written.
    fn finish(self) -> Result<usize, OutputError> {
        let (rows, mut inner) = match self {
            Sink::Ipc(sink) => (sink.rows_written(), sink.finish()?),
            Sink::Json(sink) => (sink.rows_written(), sink.finish()?),
        };
        inner.flush()?;
        Ok(rows)
    }
}

/// Loads `input`, computes every pair and writes them to `output`.
pub fn run_matrix(
    input: &str,
    output: &Path,
    format: OutputFormat,
    config: &PairwiseConfig,
) -> Result<MatrixSummary, MatrixError> {
    tracing::info!(input, "loading records");
    let all_records = records::load_records(input).map_err(MatrixError::Input)?;
    tracing::info!(records = all_records.len(), "loaded records");

    let staging = staging_path(output);
    match write_matrix(&all_records, &staging, format, config) {
        Ok(summary) => {
            if let Err(source) = fs::rename(&staging, output) {
                discard(&staging);
                return Err(MatrixError::Persist { path: output.to_path_buf(), source });
            }
            tracing::info!(pairs = summary.pairs, rows = summary.rows, output = %output.display(), "finished");
            Ok(summary)
        }
        Err(err) => {
            discard(&staging);
            Err(err)
        }
    }
}

fn write_matrix(
    all_records: &[Vec<u8>],
    staging: &Path,
    format: OutputFormat,
    config: &PairwiseConfig,
) -> Result<MatrixSummary, MatrixError> {
    let file = File::create(staging)
        .map_err(|source| MatrixError::Create { path: staging.to_path_buf(), source })?;
    let mut sink = Sink::new(format, BufWriter::with_capacity(128 * 1024, file))?;

    let num_threads = num_cpus::get();
    tracing::info!(threads = rayon::current_num_threads(), cpus = num_threads, "computing distances");

    let (tx, rx) = bounded::<DistanceBatch>(num_threads.max(1) * 2);

    let writer_thread = thread::spawn(move || -> Result<usize, OutputError> {
        for batch in rx.iter() {
            sink.write(batch)?;
        }
        tracing::debug!("all batches received, finalizing output");
        sink.finish()
    });

    let computed = stream_pairwise(all_records, config, &tx);
    drop(tx);

    let written = match writer_thread.join() {
        Ok(result) => result,
        Err(panic_payload) => {
            let panic_msg = if let Some(s) = panic_payload.downcast_ref::<String>() {
                s.clone()
            } else if let Some(s) = panic_payload.downcast_ref::<&str>() {
                s.to_string()
            } else {
                "unknown panic payload".to_string()
            };
            return Err(MatrixError::WriterPanicked(panic_msg));
        }
    };

    // A writer failure shows up on the compute side as a disconnect; report the root cause.
    match (computed, written) {
        (Err(PairwiseError::Disconnected), Err(output_err)) => Err(output_err.into()),
        (Err(compute_err), _) => Err(compute_err.into()),
        (Ok(_), Err(output_err)) => Err(output_err.into()),
        (Ok(pairs), Ok(rows)) => Ok(MatrixSummary { pairs, rows }),
    }
}

fn staging_path(output: &Path) -> PathBuf {
    let mut name = OsString::from(output.as_os_str());
    name.push(".partial");
    PathBuf::from(name)
}

fn discard(staging: &Path) {
    match fs::remove_file(staging) {
        Ok(()) => tracing::debug!(path = %staging.display(), "removed partial output"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(path = %staging.display(), error = %e, "failed to remove partial output"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::levenshtein::Granularity;
    use arrow::ipc::reader::FileReader;

    fn write_input(dir: &Path, content: &[u8]) -> String {
        let path = dir.join("words.txt");
        fs::write(&path, content).unwrap();
        path.to_str().unwrap().to_string()
    }

    fn chars_config() -> PairwiseConfig {
        PairwiseConfig { granularity: Granularity::Chars, ..PairwiseConfig::default() }
    }

    #[test]
    fn test_json_matrix_written() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_input(dir.path(), b"kitten\nsitting\nmitten\nflaw\nlawn\n");
        let output = dir.path().join("out.json");

        let summary =
            run_matrix(&input, &output, OutputFormat::Json, &PairwiseConfig::default()).unwrap();
        assert_eq!(summary, MatrixSummary { pairs: 10, rows: 10 });

        let value: serde_json::Value = serde_json::from_slice(&fs::read(&output).unwrap()).unwrap();
        assert_eq!(value.as_array().unwrap().len(), 10);
        assert!(!staging_path(&output).exists());
    }

    #[test]
    fn test_ipc_matrix_written() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_input(dir.path(), b"gumbo\ngambol\ngumbo\n");
        let output = dir.path().join("out.arrow");

        run_matrix(&input, &output, OutputFormat::Ipc, &PairwiseConfig::default()).unwrap();

        let reader = FileReader::try_new(File::open(&output).unwrap(), None).unwrap();
        let rows: usize = reader.map(|b| b.unwrap().num_rows()).sum();
        assert_eq!(rows, 3);
    }

    #[test]
    fn test_failed_run_leaves_no_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_input(dir.path(), b"kitten\nab\xff\nsitting\nflaw\nlawn\n");
        let output = dir.path().join("out.json");

        let err = run_matrix(&input, &output, OutputFormat::Json, &chars_config()).unwrap_err();
        assert!(matches!(
            err,
            MatrixError::Pairwise(PairwiseError::InvalidRecord { record: 1, valid_up_to: 2 })
        ));
        assert!(!output.exists());
        assert!(!staging_path(&output).exists());
    }

    #[test]
    fn test_failed_run_keeps_previous_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_input(dir.path(), b"abc\n\xc3\n");
        let output = dir.path().join("out.arrow");
        fs::write(&output, b"previous").unwrap();

        assert!(run_matrix(&input, &output, OutputFormat::Ipc, &chars_config()).is_err());
        assert_eq!(fs::read(&output).unwrap(), b"previous");
    }

    #[test]
    fn test_missing_input_creates_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.json");
        let missing = dir.path().join("missing.txt");

        let err = run_matrix(missing.to_str().unwrap(), &output, OutputFormat::Json, &PairwiseConfig::default())
            .unwrap_err();
        assert!(matches!(err, MatrixError::Input(_)));
        assert!(!output.exists());
    }

    #[test]
    fn test_staging_path_appends_suffix() {
        assert_eq!(staging_path(Path::new("/tmp/out.json")), PathBuf::from("/tmp/out.json.partial"));
    }
}

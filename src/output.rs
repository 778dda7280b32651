use std::io::Write;
use std::sync::Arc;

use arrow::array::{ArrayRef, PrimitiveArray};
use arrow::datatypes::{DataType, Field, Schema, UInt32Type, UInt64Type};
use arrow::error::Result as ArrowResult;
use arrow::ipc::writer::FileWriter;
use arrow::record_batch::RecordBatch;

use crate::error::OutputError;
use crate::pairwise::DistanceBatch;

pub fn distance_schema() -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("left", DataType::UInt32, false),
        Field::new("right", DataType::UInt32, false),
        Field::new("distance", DataType::UInt64, false),
    ]))
}

pub fn to_record_batch(batch: DistanceBatch, schema: &Arc<Schema>) -> ArrowResult<RecordBatch> {
    let col_left: ArrayRef = Arc::new(PrimitiveArray::<UInt32Type>::from(batch.left));
    let col_right: ArrayRef = Arc::new(PrimitiveArray::<UInt32Type>::from(batch.right));
    let col_distance: ArrayRef = Arc::new(PrimitiveArray::<UInt64Type>::from(batch.distance));
    RecordBatch::try_new(schema.clone(), vec![col_left, col_right, col_distance])
}

/// Writes distance batches as an Arrow IPC file.
pub struct IpcSink<W: Write> {
    writer: FileWriter<W>,
    schema: Arc<Schema>,
    batches_written: usize,
    rows_written: usize,
}

impl<W: Write> IpcSink<W> {
    pub fn new(inner: W) -> Result<Self, OutputError> {
        let schema = distance_schema();
        let writer = FileWriter::try_new(inner, &schema)?;
        Ok(IpcSink { writer, schema, batches_written: 0, rows_written: 0 })
    }

    pub fn write(&mut self, batch: DistanceBatch) -> Result<(), OutputError> {
        if batch.is_empty() {
            return Ok(());
        }
        let num_rows = batch.len();
        let record_batch = to_record_batch(batch, &self.schema)?;
        self.writer.write(&record_batch)?;
        self.batches_written += 1;
        self.rows_written += num_rows;
        if self.batches_written % 100 == 0 {
            tracing::info!(
                batches = self.batches_written,
                rows = self.rows_written,
                "written to IPC file"
            );
        }
        Ok(())
    }

    pub fn rows_written(&self) -> usize {
        self.rows_written
    }

    /// Writes the IPC footer and returns the underlying writer.
    pub fn finish(mut self) -> Result<W, OutputError> {
        self.writer.finish()?;
        Ok(self.writer.into_inner()?)
    }
}

/// Streams distance rows as a JSON array of `{left, right, distance}` objects.
pub struct JsonSink<W: Write> {
    writer: W,
    rows_written: usize,
}

impl<W: Write> JsonSink<W> {
    pub fn new(mut writer: W) -> Result<Self, OutputError> {
        writer.write_all(b"[")?;
        Ok(JsonSink { writer, rows_written: 0 })
    }

    pub fn write(&mut self, batch: DistanceBatch) -> Result<(), OutputError> {
        for pair in batch.pairs() {
            if self.rows_written > 0 {
                self.writer.write_all(b",")?;
            }
            serde_json::to_writer(&mut self.writer, &pair)?;
            self.rows_written += 1;
        }
        Ok(())
    }

    pub fn rows_written(&self) -> usize {
        self.rows_written
    }

    pub fn finish(mut self) -> Result<W, OutputError> {
        self.writer.write_all(b"]")?;
        self.writer.flush()?;
        Ok(self.writer)
    }
}

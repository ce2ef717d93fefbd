use std::io::Write;

use anyhow::Result;
use clap::ValueEnum;
use scrapemaster_core::models::{Record, Selectors};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One JSON object per record, per line
    Json,
    /// Header row of field names, then one row per record
    Csv,
}

/// Writes records as they arrive.
pub enum RecordWriter<W: Write> {
    Json(W),
    Csv {
        writer: csv::Writer<W>,
        fields: Vec<String>,
    },
}

impl<W: Write> RecordWriter<W> {
    /// CSV columns follow the selector field names.
    pub fn new(format: OutputFormat, out: W, selectors: &Selectors) -> Result<Self> {
        Ok(match format {
            OutputFormat::Json => Self::Json(out),
            OutputFormat::Csv => {
                let fields: Vec<String> = selectors.fields().map(|(f, _)| f.to_string()).collect();
                let mut writer = csv::Writer::from_writer(out);
                writer.write_record(&fields)?;
                Self::Csv { writer, fields }
            }
        })
    }

    pub fn write_page(&mut self, records: &[Record]) -> Result<()> {
        match self {
            Self::Json(out) => {
                for record in records {
                    serde_json::to_writer(&mut *out, record)?;
                    out.write_all(b"\n")?;
                }
                out.flush()?;
            }
            Self::Csv { writer, fields } => {
                for record in records {
                    let row = fields
                        .iter()
                        .map(|f| record.get(f).cloned().flatten().unwrap_or_default());
                    writer.write_record(row)?;
                }
                writer.flush()?;
            }
        }
        Ok(())
    }
}

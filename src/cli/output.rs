use anyhow::{Context, Result};
use std::io::Write;

use kaipo_counters::collectors::SampleBatch;
use kaipo_counters::collectors::counters::format_bytes;
use kaipo_counters::config::OutputFormat;

/// Writes one batch in the requested format
pub fn write_batch<W: Write>(out: &mut W, batch: &SampleBatch, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            serde_json::to_writer(&mut *out, batch).context("Failed to serialize samples")?;
            writeln!(out)?;
        }
        OutputFormat::Text => write_text(out, batch)?,
    }
    out.flush().context("Failed to flush output")?;
    Ok(())
}

fn write_text<W: Write>(out: &mut W, batch: &SampleBatch) -> Result<()> {
    writeln!(
        out,
        "Interface counters at {} ({})",
        batch.collected_at.format("%Y-%m-%d %H:%M:%S%.3f UTC"),
        batch.backend
    )?;

    if batch.samples.is_empty() {
        writeln!(out, "  no active interfaces")?;
        return Ok(());
    }

    let width = batch
        .samples
        .iter()
        .map(|s| s.identity.len())
        .max()
        .unwrap_or(0)
        .max("Interface".len());

    writeln!(
        out,
        "  {:<width$}  {:>20}  {:>20}",
        "Interface",
        "Received",
        "Sent",
        width = width
    )?;
    for sample in &batch.samples {
        writeln!(
            out,
            "  {:<width$}  {:>20}  {:>20}  ({} / {})",
            sample.identity,
            sample.download_bytes,
            sample.upload_bytes,
            format_bytes(sample.download_bytes),
            format_bytes(sample.upload_bytes),
            width = width
        )?;
    }

    Ok(())
}

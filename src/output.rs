use crate::error::Result;
use crate::model::{OutputFormat, Outcome, ResultRecord};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::Write;
use std::time::Duration;
use tokio::sync::mpsc;

pub type RecordSender = mpsc::UnboundedSender<ResultRecord>;
pub type RecordReceiver = mpsc::UnboundedReceiver<ResultRecord>;

pub fn channel() -> (RecordSender, RecordReceiver) {
    mpsc::unbounded_channel()
}

pub fn format_line(record: &ResultRecord, format: OutputFormat) -> Result<String> {
    let mut line = match format {
        OutputFormat::Tsv => match &record.outcome {
            Outcome::Success { status } => format!(
                "{}\t{}\t{}\t{}",
                record.worker, record.timestamp_us, record.latency_us, status
            ),
            Outcome::Failure { kind, error } => format!(
                "{}\t{}\t{}\tfailure\t{}: {}",
                record.worker,
                record.timestamp_us,
                record.latency_us,
                kind.as_str(),
                single_line(error)
            ),
        },
        OutputFormat::Json => serde_json::to_string(record)?,
    };
    line.push('\n');
    Ok(line)
}

fn single_line(s: &str) -> String {
    s.chars()
        .map(|c| if matches!(c, '\t' | '\n' | '\r') { ' ' } else { c })
        .collect()
}

pub fn progress_bar() -> Result<ProgressBar> {
    let sty = ProgressStyle::with_template("{spinner} {elapsed_precise} {msg}")?;
    let pb = ProgressBar::new_spinner();
    pb.set_style(sty);
    pb.enable_steady_tick(Duration::from_millis(200));
    Ok(pb)
}

/// One `write_all` per line, so concurrent records never tear.
pub async fn print_records<W: Write>(
    mut rx: RecordReceiver,
    format: OutputFormat,
    mut out: W,
    progress: Option<ProgressBar>,
) -> Result<u64> {
    let mut ok = 0u64;
    let mut failed = 0u64;
    while let Some(record) = rx.recv().await {
        let line = format_line(&record, format)?;
        out.write_all(line.as_bytes())?;
        out.flush()?;

        if record.is_success() {
            ok += 1;
        } else {
            failed += 1;
        }
        if let Some(pb) = &progress {
            pb.set_message(format!("{ok} ok, {failed} failed"));
        }
    }
    if let Some(pb) = progress {
        pb.finish();
    }
    Ok(ok + failed)
}

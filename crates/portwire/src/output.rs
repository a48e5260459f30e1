use std::io::IsTerminal;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use serde_json::Value;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
pub struct DecodedOutput<'a> {
    pub label: &'a str,
    pub fields: usize,
    pub message: Value,
}

#[derive(Serialize)]
pub struct LabelOutput {
    pub label: &'static str,
    pub fields: usize,
}

/// One line of a simulated session.
#[derive(Debug, Clone, Serialize)]
pub struct TranscriptStep {
    pub side: &'static str,
    pub step: &'static str,
    pub detail: String,
}

impl TranscriptStep {
    pub fn new(side: &'static str, step: &'static str, detail: impl Into<String>) -> Self {
        Self {
            side,
            step,
            detail: detail.into(),
        }
    }
}

pub fn print_decoded(decoded: &DecodedOutput<'_>, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(decoded),
        OutputFormat::Table => {
            let mut table = table(vec!["LABEL", "FIELDS", "MESSAGE"]);
            table.add_row(vec![
                decoded.label.to_string(),
                decoded.fields.to_string(),
                decoded.message.to_string(),
            ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "label={} fields={} message={}",
                decoded.label, decoded.fields, decoded.message
            );
        }
    }
}

pub fn print_labels(labels: &[LabelOutput], format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&labels),
        OutputFormat::Table => {
            let mut table = table(vec!["LABEL", "FIELDS"]);
            for entry in labels {
                table.add_row(vec![entry.label.to_string(), entry.fields.to_string()]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for entry in labels {
                println!("{:<40} {}", entry.label, entry.fields);
            }
        }
    }
}

pub fn print_envelope(envelope: &Value, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(envelope),
        OutputFormat::Table => {
            let cmd = envelope.get("cmd").and_then(Value::as_str).unwrap_or("");
            let payload = envelope.get("payload").cloned().unwrap_or(Value::Null);
            let mut table = table(vec!["CMD", "PAYLOAD"]);
            table.add_row(vec![cmd.to_string(), payload.to_string()]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "{}",
                serde_json::to_string_pretty(envelope).unwrap_or_else(|_| "{}".to_string())
            );
        }
    }
}

pub fn print_transcript(steps: &[TranscriptStep], format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&steps),
        OutputFormat::Table => {
            let mut table = table(vec!["#", "SIDE", "STEP", "DETAIL"]);
            for (index, step) in steps.iter().enumerate() {
                table.add_row(vec![
                    (index + 1).to_string(),
                    step.side.to_string(),
                    step.step.to_string(),
                    step.detail.clone(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for step in steps {
                println!("[{}] {}: {}", step.side, step.step, step.detail);
            }
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

fn table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

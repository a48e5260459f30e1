use std::fs;
use std::io::Read;
use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};
use serde_json::Value;

use crate::exit::{io_error, json_error, CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod decode;
pub mod envelope;
pub mod labels;
pub mod simulate;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Decode a labelled message array and print it re-encoded.
    Decode(DecodeArgs),
    /// List every registered message label.
    Labels,
    /// Wrap a labelled message array in a messenger envelope.
    Envelope(EnvelopeArgs),
    /// Run an in-memory iframe session and print the transcript.
    Simulate(SimulateArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Decode(args) => decode::run(args, format),
        Command::Labels => labels::run(format),
        Command::Envelope(args) => envelope::run(args, format),
        Command::Simulate(args) => simulate::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

/// Where a message array comes from. Stdin when neither flag is set.
#[derive(Args, Debug, Default)]
pub struct InputArgs {
    /// Message array as inline JSON.
    #[arg(long, conflicts_with = "file")]
    pub data: Option<String>,
    /// Read the message array from a file.
    #[arg(long, conflicts_with = "data")]
    pub file: Option<PathBuf>,
}

impl InputArgs {
    pub fn read_json(&self) -> CliResult<Value> {
        let text = self.read_text()?;
        if text.trim().is_empty() {
            return Err(CliError::new(USAGE, "no message given"));
        }
        serde_json::from_str(&text).map_err(|err| json_error("input is not valid JSON", err))
    }

    fn read_text(&self) -> CliResult<String> {
        if let Some(data) = &self.data {
            return Ok(data.clone());
        }
        if let Some(path) = &self.file {
            return fs::read_to_string(path)
                .map_err(|err| io_error(&format!("failed reading {}", path.display()), err));
        }
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .map_err(|err| io_error("failed reading stdin", err))?;
        Ok(text)
    }
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    #[command(flatten)]
    pub input: InputArgs,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum EnvelopeKind {
    Request,
    Response,
}

#[derive(Args, Debug)]
pub struct EnvelopeArgs {
    /// Which side of the exchange the message belongs to.
    #[arg(long, value_enum, default_value = "request")]
    pub kind: EnvelopeKind,
    #[command(flatten)]
    pub input: InputArgs,
}

#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Height the hosted document asks for.
    #[arg(long, default_value_t = 240)]
    pub height: u32,
    /// Tallest height the embedding page grants.
    #[arg(long, default_value_t = 480)]
    pub max_height: u32,
    /// Give up after this long (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub timeout: String,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

#[cfg(test)]
mod tests {
    use std::time::{SystemTime, UNIX_EPOCH};

    use serde_json::json;

    use super::*;
    use crate::exit::{DATA_INVALID, FAILURE};

    #[test]
    fn inline_data_wins() {
        let input = InputArgs {
            data: Some(r#"["SubscribeResponse", true]"#.to_string()),
            file: None,
        };
        assert_eq!(input.read_json().unwrap(), json!(["SubscribeResponse", true]));
    }

    #[test]
    fn file_input_is_read() {
        let path = std::env::temp_dir().join(format!(
            "portwire-input-{}-{}.json",
            std::process::id(),
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .expect("time should be after epoch")
                .as_nanos()
        ));
        fs::write(&path, r#"["ToastCloseRequest", false]"#).unwrap();

        let input = InputArgs {
            data: None,
            file: Some(path.clone()),
        };
        assert_eq!(input.read_json().unwrap(), json!(["ToastCloseRequest", false]));
        let _ = fs::remove_file(path);
    }

    #[test]
    fn bad_inputs_map_to_exit_codes() {
        let malformed = InputArgs {
            data: Some("[\"Timestamp\",".to_string()),
            file: None,
        };
        assert_eq!(malformed.read_json().unwrap_err().code, DATA_INVALID);

        let blank = InputArgs {
            data: Some("  ".to_string()),
            file: None,
        };
        assert_eq!(blank.read_json().unwrap_err().code, USAGE);

        let missing = InputArgs {
            data: None,
            file: Some(PathBuf::from("/nonexistent/portwire/message.json")),
        };
        assert_eq!(missing.read_json().unwrap_err().code, FAILURE);
    }
}

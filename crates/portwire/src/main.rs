mod cmd;
mod exit;
mod logging;
mod output;

use clap::error::ErrorKind;
use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "portwire", version, about = "Cross-frame messaging toolkit")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "info", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            err.exit()
        }
        Err(err) => {
            let _ = err.print();
            std::process::exit(exit::USAGE);
        }
    };
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cmd::run(cli.command, format);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_decode_subcommand() {
        let cli = Cli::try_parse_from([
            "portwire",
            "decode",
            "--data",
            r#"["SubscribeResponse", true]"#,
        ])
        .expect("decode args should parse");

        assert!(matches!(cli.command, Command::Decode(_)));
    }

    #[test]
    fn rejects_conflicting_input_args() {
        let err = Cli::try_parse_from([
            "portwire",
            "decode",
            "--data",
            "[]",
            "--file",
            "/tmp/message.json",
        ])
        .expect_err("conflicting args should fail");

        assert_eq!(err.kind(), ErrorKind::ArgumentConflict);
    }

    #[test]
    fn parses_envelope_kind() {
        let cli = Cli::try_parse_from([
            "portwire",
            "envelope",
            "--kind",
            "response",
            "--data",
            r#"["ToastCloseRequest", true]"#,
        ])
        .expect("envelope args should parse");

        match cli.command {
            Command::Envelope(args) => assert_eq!(args.kind, cmd::EnvelopeKind::Response),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn global_flags_follow_subcommand() {
        let cli = Cli::try_parse_from([
            "portwire",
            "simulate",
            "--height",
            "320",
            "--format",
            "json",
            "--log-level",
            "debug",
        ])
        .expect("simulate args should parse");

        assert!(matches!(cli.format, Some(OutputFormat::Json)));
        assert!(matches!(cli.log_level, LogLevel::Debug));
        match cli.command {
            Command::Simulate(args) => assert_eq!(args.height, 320),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn unknown_format_is_rejected() {
        let err = Cli::try_parse_from(["portwire", "--format", "xml", "labels"])
            .expect_err("unknown format should fail");
        assert_eq!(err.kind(), ErrorKind::InvalidValue);
    }
}

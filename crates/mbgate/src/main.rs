mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "mbgate", version, about = "Modbus/BLE gateway test tooling")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "warn", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
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
    fn parses_encode_with_negative_value() {
        let cli = Cli::try_parse_from(["mbgate", "encode", "--type", "int16", "-o", "LE", "-42"])
            .expect("encode args should parse");

        match cli.command {
            Command::Encode(args) => {
                assert_eq!(args.base_type, "int16");
                assert_eq!(args.order, "LE");
                assert_eq!(args.value, "-42");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parses_submit_subcommand() {
        let cli = Cli::try_parse_from([
            "mbgate",
            "submit",
            "/tmp/host.sock",
            "/tmp/device.sock",
            "--json",
            r#"{"cmd":"list_devices"}"#,
            "--timeout",
            "500ms",
            "--profile",
            "sentinel",
        ])
        .expect("submit args should parse");

        assert!(matches!(cli.command, Command::Submit(_)));
    }

    #[test]
    fn rejects_conflicting_payload_args() {
        let err = Cli::try_parse_from([
            "mbgate",
            "submit",
            "/tmp/host.sock",
            "/tmp/device.sock",
            "--json",
            "{\"x\":1}",
            "--data",
            "hello",
        ])
        .expect_err("conflicting args should fail");

        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn decode_requires_words() {
        let err = Cli::try_parse_from(["mbgate", "decode", "--type", "int32"])
            .expect_err("missing words should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "mbgate",
            "fragments",
            "hello",
            "--format",
            "json",
            "--log-level",
            "debug",
        ])
        .expect("global flags should parse anywhere");
        assert!(matches!(cli.format, Some(OutputFormat::Json)));
        assert!(matches!(cli.log_level, LogLevel::Debug));
    }
}

use std::fs;

use mbgate_channel::DatagramChannel;
use mbgate_session::{parse_response, Command, Response, Session, SessionConfig};

use crate::cmd::{parse_duration, SubmitArgs};
use crate::exit::{
    channel_error, io_error, session_error, CliError, CliResult, FAILURE, SUCCESS, USAGE,
};
use crate::output::{print_response, OutputFormat};

pub fn run(args: SubmitArgs, format: OutputFormat) -> CliResult<i32> {
    let timeout = parse_duration(&args.timeout)?;
    let profile = args.link.to_profile()?;
    let payload = resolve_payload(&args)?;

    let channel = DatagramChannel::bind_with_mtu(&args.path, &args.peer, args.link.mtu)
        .map_err(|err| channel_error("bind failed", err))?;
    let (sink, source) = channel
        .split()
        .map_err(|err| channel_error("bind failed", err))?;

    let config = SessionConfig::default()
        .with_timeout(timeout)
        .with_profile(profile);
    let session =
        Session::open(sink, source, config).map_err(|err| session_error("open failed", err))?;

    let reply = session
        .exchange(&payload)
        .map_err(|err| session_error("submit failed", err))?;
    let response = parse_response(reply);
    print_response(&response, format);

    Ok(exit_code(&response))
}

/// A reply the device marked as an error exits non-zero; raw replies do not.
fn exit_code(response: &Response) -> i32 {
    match response {
        Response::Parsed(parsed) if !parsed.is_ok() => FAILURE,
        _ => SUCCESS,
    }
}

fn resolve_payload(args: &SubmitArgs) -> CliResult<Vec<u8>> {
    if let Some(json) = &args.json {
        let value = serde_json::from_str::<serde_json::Value>(json)
            .map_err(|err| CliError::new(USAGE, format!("--json is not valid JSON: {err}")))?;
        // Known commands are checked locally; anything else goes out untouched.
        if let Ok(command) = serde_json::from_value::<Command>(value) {
            command
                .validate()
                .map_err(|err| session_error("command rejected", err))?;
        }
        return Ok(json.as_bytes().to_vec());
    }
    if let Some(data) = &args.data {
        return Ok(data.as_bytes().to_vec());
    }
    if let Some(path) = &args.file {
        return fs::read(path)
            .map_err(|err| io_error(&format!("failed reading {}", path.display()), err));
    }
    Err(CliError::new(USAGE, "one of --json, --data or --file is required"))
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::cmd::{ProfileArgs, ProfileKind};
    use crate::exit::DATA_INVALID;

    fn args() -> SubmitArgs {
        SubmitArgs {
            path: PathBuf::from("/tmp/host.sock"),
            peer: PathBuf::from("/tmp/device.sock"),
            link: ProfileArgs {
                profile: ProfileKind::Tagged,
                mtu: 20,
                chunk_size: None,
                chunk_delay: "0ms".to_string(),
                terminator: "<END>".to_string(),
            },
            json: None,
            data: None,
            file: None,
            timeout: "1s".to_string(),
        }
    }

    #[test]
    fn json_payload_is_sent_verbatim() {
        let payload = resolve_payload(&SubmitArgs {
            json: Some(r#"{"cmd":"list_devices"}"#.to_string()),
            ..args()
        })
        .unwrap();
        assert_eq!(payload, br#"{"cmd":"list_devices"}"#);
    }

    #[test]
    fn invalid_known_command_rejected_locally() {
        let err = resolve_payload(&SubmitArgs {
            json: Some(r#"{"cmd":"create_device","name":"","slave_id":1}"#.to_string()),
            ..args()
        })
        .unwrap_err();
        assert_eq!(err.code, DATA_INVALID);
    }

    #[test]
    fn unknown_json_passes_through() {
        let payload = resolve_payload(&SubmitArgs {
            json: Some(r#"{"op":"custom"}"#.to_string()),
            ..args()
        })
        .unwrap();
        assert_eq!(payload, br#"{"op":"custom"}"#);
    }

    #[test]
    fn malformed_json_and_missing_payload_are_usage() {
        let err = resolve_payload(&SubmitArgs {
            json: Some("{".to_string()),
            ..args()
        })
        .unwrap_err();
        assert_eq!(err.code, USAGE);
        assert_eq!(resolve_payload(&args()).unwrap_err().code, USAGE);
    }

    #[test]
    fn error_status_exits_non_zero() {
        let error = parse_response(br#"{"status":"error","error":"x"}"#.to_vec().into());
        assert_eq!(exit_code(&error), FAILURE);
        let ok = parse_response(br#"{"status":"ok"}"#.to_vec().into());
        assert_eq!(exit_code(&ok), SUCCESS);
        let raw = parse_response(b"hello".to_vec().into());
        assert_eq!(exit_code(&raw), SUCCESS);
    }
}

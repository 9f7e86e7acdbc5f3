use std::fs;

use mbgate_frame::{split_sentinel, split_tagged, FrameProfile};

use crate::cmd::FragmentsArgs;
use crate::exit::{io_error, CliError, CliResult, DATA_INVALID, SUCCESS};
use crate::output::{bytes_hex, payload_preview, print_fragments, FragmentRow, OutputFormat};

pub fn run(args: FragmentsArgs, format: OutputFormat) -> CliResult<i32> {
    let profile = args.link.to_profile()?;
    let message = resolve_message(&args)?;
    let rows = fragment_rows(&profile, &message)?;
    print_fragments(profile.name(), message.len(), &rows, format);
    Ok(SUCCESS)
}

fn resolve_message(args: &FragmentsArgs) -> CliResult<Vec<u8>> {
    if let Some(path) = &args.file {
        return fs::read(path)
            .map_err(|err| io_error(&format!("failed reading {}", path.display()), err));
    }
    Ok(args.data.clone().unwrap_or_default().into_bytes())
}

fn fragment_rows(profile: &FrameProfile, message: &[u8]) -> CliResult<Vec<FragmentRow>> {
    let rows = match profile {
        FrameProfile::Tagged(cfg) => split_tagged(message, cfg.max_payload())
            .into_iter()
            .enumerate()
            .map(|(index, fragment)| {
                let packet = fragment.to_packet();
                FragmentRow {
                    index,
                    kind: fragment.tag.as_str(),
                    size: packet.len(),
                    hex: bytes_hex(&packet),
                    text: payload_preview(&fragment.payload),
                }
            })
            .collect(),
        FrameProfile::Sentinel(cfg) => {
            let text = std::str::from_utf8(message).map_err(|err| {
                CliError::new(DATA_INVALID, format!("sentinel profile needs UTF-8: {err}"))
            })?;
            let chunks = split_sentinel(text, cfg.chunk_size);
            let terminator = cfg.terminator.as_str();
            chunks
                .into_iter()
                .map(|chunk| ("CHUNK", chunk))
                .chain(std::iter::once(("TERMINATOR", terminator)))
                .enumerate()
                .map(|(index, (kind, chunk))| FragmentRow {
                    index,
                    kind,
                    size: chunk.len(),
                    hex: bytes_hex(chunk.as_bytes()),
                    text: chunk.to_string(),
                })
                .collect()
        }
    };
    Ok(rows)
}

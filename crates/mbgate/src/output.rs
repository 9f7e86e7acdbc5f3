use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use mbgate_register::{Value, WordOrder};
use mbgate_session::Response;
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
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
struct WordsOutput<'a> {
    #[serde(rename = "type")]
    base_type: &'a str,
    word_order: &'a str,
    value: serde_json::Value,
    words: &'a [u16],
    hex: Vec<String>,
}

/// A typed value next to its register words.
pub fn print_words(value: &Value, word_order: WordOrder, words: &[u16], format: OutputFormat) {
    let hex: Vec<String> = words.iter().map(|w| word_hex(*w)).collect();
    match format {
        OutputFormat::Json => {
            let out = WordsOutput {
                base_type: value.base_type().as_str(),
                word_order: word_order.as_str(),
                value: value_json(value),
                words,
                hex,
            };
            print_json(&out);
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["OFFSET", "WORD", "HEX"]);
            for (offset, (word, hex)) in words.iter().zip(&hex).enumerate() {
                table.add_row(vec![offset.to_string(), word.to_string(), hex.clone()]);
            }
            println!("{} {} ({word_order})", value.base_type(), value);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "type={} order={} value={} words=[{}]",
                value.base_type(),
                word_order,
                value,
                hex.join(" ")
            );
        }
        OutputFormat::Raw => {
            println!("{}", hex.join(" "));
        }
    }
}

/// One packet as it would go out on the link.
#[derive(Serialize)]
pub struct FragmentRow {
    pub index: usize,
    pub kind: &'static str,
    pub size: usize,
    pub hex: String,
    pub text: String,
}

#[derive(Serialize)]
struct FragmentsOutput<'a> {
    profile: &'a str,
    message_size: usize,
    fragments: &'a [FragmentRow],
}

pub fn print_fragments(
    profile: &str,
    message_size: usize,
    rows: &[FragmentRow],
    format: OutputFormat,
) {
    match format {
        OutputFormat::Json => print_json(&FragmentsOutput {
            profile,
            message_size,
            fragments: rows,
        }),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["#", "KIND", "SIZE", "HEX", "TEXT"]);
            for row in rows {
                table.add_row(vec![
                    row.index.to_string(),
                    row.kind.to_string(),
                    row.size.to_string(),
                    row.hex.clone(),
                    row.text.clone(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "profile={profile} message_size={message_size} packets={}",
                rows.len()
            );
            for row in rows {
                println!(
                    "  [{}] {} size={} {}",
                    row.index, row.kind, row.size, row.text
                );
            }
        }
        OutputFormat::Raw => {
            for row in rows {
                println!("{}", row.hex);
            }
        }
    }
}

#[derive(Serialize)]
struct RawOutput<'a> {
    status: &'a str,
    size: usize,
    raw: String,
}

/// A device reply, parsed or raw.
pub fn print_response(response: &Response, format: OutputFormat) {
    match (response, format) {
        (Response::Raw(raw), OutputFormat::Raw) => print_raw(&raw.data),
        (Response::Parsed(parsed), OutputFormat::Raw) => {
            print_raw(&serde_json::to_vec(parsed).unwrap_or_default());
            println!();
        }
        (Response::Parsed(parsed), OutputFormat::Json) => print_json(parsed),
        (Response::Raw(raw), OutputFormat::Json) => print_json(&RawOutput {
            status: "raw",
            size: raw.data.len(),
            raw: raw.text().into_owned(),
        }),
        (Response::Parsed(parsed), OutputFormat::Table) => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["FIELD", "VALUE"])
                .add_row(vec!["status".to_string(), parsed.status.clone()]);
            if let Some(error) = &parsed.error {
                table.add_row(vec!["error".to_string(), error.clone()]);
            }
            for (key, value) in &parsed.fields {
                table.add_row(vec![key.clone(), value.to_string()]);
            }
            println!("{table}");
        }
        (Response::Raw(raw), OutputFormat::Table) => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["SIZE", "RAW"])
                .add_row(vec![raw.data.len().to_string(), raw.text().into_owned()]);
            println!("{table}");
        }
        (Response::Parsed(parsed), OutputFormat::Pretty) => {
            println!(
                "{}",
                serde_json::to_string_pretty(parsed).unwrap_or_else(|_| "{}".to_string())
            );
        }
        (Response::Raw(raw), OutputFormat::Pretty) => {
            println!("raw ({} bytes): {}", raw.data.len(), raw.text());
        }
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

pub fn word_hex(word: u16) -> String {
    format!("0x{word:04X}")
}

/// Bytes as space-separated hex pairs.
pub fn bytes_hex(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Printable form of a payload; binary content is summarized.
pub fn payload_preview(payload: &[u8]) -> String {
    match std::str::from_utf8(payload) {
        Ok(text) => text.to_string(),
        Err(_) => format!("<binary {} bytes>", payload.len()),
    }
}

fn value_json(value: &Value) -> serde_json::Value {
    serde_json::to_value(value)
        .ok()
        .and_then(|mut v| v.get_mut("value").map(serde_json::Value::take))
        .unwrap_or(serde_json::Value::Null)
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

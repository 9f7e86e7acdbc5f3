use std::str::FromStr;

use mbgate_register::{decode, parse_word, BaseType, Value, WordOrder};

use crate::cmd::DecodeArgs;
use crate::exit::{codec_error, CliResult, SUCCESS};
use crate::output::{print_words, OutputFormat};

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let (value, word_order, words) = decode_words(&args)?;
    print_words(&value, word_order, &words, format);
    Ok(SUCCESS)
}

fn decode_words(args: &DecodeArgs) -> CliResult<(Value, WordOrder, Vec<u16>)> {
    let base_type =
        BaseType::from_str(&args.base_type).map_err(|err| codec_error("invalid --type", err))?;
    let word_order =
        WordOrder::from_str(&args.order).map_err(|err| codec_error("invalid --order", err))?;
    let words = args
        .words
        .iter()
        .map(|word| parse_word(word))
        .collect::<Result<Vec<u16>, _>>()
        .map_err(|err| codec_error("invalid word", err))?;
    let value =
        decode(&words, base_type, word_order).map_err(|err| codec_error("decode failed", err))?;
    Ok((value, word_order, words))
}

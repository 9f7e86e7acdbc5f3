use std::str::FromStr;

use mbgate_register::{BaseType, RawValue, TypedValue, WordOrder};

use crate::cmd::EncodeArgs;
use crate::exit::{codec_error, CliResult, SUCCESS};
use crate::output::{print_words, OutputFormat};

pub fn run(args: EncodeArgs, format: OutputFormat) -> CliResult<i32> {
    let value = encode_value(&args)?;
    print_words(&value.value(), value.word_order(), &value.encode(), format);
    Ok(SUCCESS)
}

fn encode_value(args: &EncodeArgs) -> CliResult<TypedValue> {
    let base_type =
        BaseType::from_str(&args.base_type).map_err(|err| codec_error("invalid --type", err))?;
    let word_order =
        WordOrder::from_str(&args.order).map_err(|err| codec_error("invalid --order", err))?;
    let raw = RawValue::from_str(&args.value).map_err(|err| codec_error("invalid value", err))?;
    TypedValue::new(base_type, word_order, raw).map_err(|err| codec_error("encode failed", err))
}

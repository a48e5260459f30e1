use portwire_codec::{deserialize, Message};

use crate::cmd::DecodeArgs;
use crate::exit::{codec_error, CliResult, SUCCESS};
use crate::output::{print_decoded, DecodedOutput, OutputFormat};

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let input = args.input.read_json()?;
    let message = deserialize(&input).map_err(|err| codec_error("decode failed", err))?;
    tracing::debug!(label = message.label(), "decoded message");

    let out = DecodedOutput {
        label: message.label(),
        fields: message.kind().field_count(),
        message: message.to_value(),
    };
    print_decoded(&out, format);
    Ok(SUCCESS)
}

use portwire_activity::Envelope;
use portwire_codec::deserialize;

use crate::cmd::{EnvelopeArgs, EnvelopeKind};
use crate::exit::{codec_error, CliResult, SUCCESS};
use crate::output::{print_envelope, OutputFormat};

pub fn run(args: EnvelopeArgs, format: OutputFormat) -> CliResult<i32> {
    let input = args.input.read_json()?;
    let message =
        deserialize(&input).map_err(|err| codec_error("message does not decode", err))?;

    let envelope = match args.kind {
        EnvelopeKind::Request => Envelope::request(&message),
        EnvelopeKind::Response => Envelope::response(&message),
    };
    print_envelope(&envelope.to_value(), format);
    Ok(SUCCESS)
}

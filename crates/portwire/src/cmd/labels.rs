use portwire_codec::MessageKind;

use crate::exit::{CliResult, SUCCESS};
use crate::output::{print_labels, LabelOutput, OutputFormat};

pub fn run(format: OutputFormat) -> CliResult<i32> {
    let mut labels: Vec<LabelOutput> = MessageKind::ALL
        .iter()
        .map(|kind| LabelOutput {
            label: kind.label(),
            fields: kind.field_count(),
        })
        .collect();
    labels.sort_by_key(|entry| entry.label);

    print_labels(&labels, format);
    Ok(SUCCESS)
}

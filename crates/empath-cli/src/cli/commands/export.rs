use empath_core::export::export_predictions;

use crate::cli::args::ExportArgs;
use crate::exit_codes::SUCCESS;

pub fn run(args: ExportArgs) -> anyhow::Result<i32> {
    let rows = export_predictions(&args.input, &args.out)?;
    println!("Exported {} predictions to {}", rows, args.out.display());
    Ok(SUCCESS)
}

use crate::cli::args::ScoreArgs;
use crate::exit_codes::SUCCESS;

pub fn run(args: ScoreArgs) -> anyhow::Result<i32> {
    let report = empath_metrics::score_files(&args.predictions, &args.references, &args.out)?;
    println!("{}", report.summary());
    println!("Wrote per-row scores: {}", args.out.display());
    Ok(SUCCESS)
}

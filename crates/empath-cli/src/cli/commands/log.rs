use empath_metrics::{log_scores, RunLogEntry};

use crate::cli::args::LogArgs;
use crate::exit_codes::SUCCESS;

pub fn run(args: LogArgs) -> anyhow::Result<i32> {
    let entry = RunLogEntry {
        adapter: args.adapter,
        base_model: args.base_model,
        dataset: args.dataset,
        max_new_tokens: args.max_new_tokens,
        temperature: args.temperature,
        notes: args.notes,
    };
    let averages = log_scores(&args.scores, &args.run_log, &entry)?;
    println!(
        "Appended to {} (overlap {:.4}, lcs {:.4}, tf-idf {:.4})",
        args.run_log.display(),
        averages.overlap,
        averages.lcs,
        averages.tfidf_cosine
    );
    Ok(SUCCESS)
}

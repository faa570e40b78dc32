use std::path::PathBuf;

use clap::{Parser, Subcommand};
use empath_core::{AssetMode, Task};

#[derive(Parser)]
#[command(
    name = "empath",
    version,
    about = "Resumable batch inference and reference-based scoring for empathetic action plans"
)]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Generate a response per scenario, appending to a resumable checkpoint
    Infer(InferArgs),
    /// Normalize a checkpoint (or inference JSONL) into an id,prediction CSV
    Export(ExportArgs),
    /// Score predictions against references (Overlap, LCS, TF-IDF)
    Score(ScoreArgs),
    /// Append averaged scores and run metadata to the run log
    Log(LogArgs),
    Version,
}

#[derive(Parser, Debug, Clone)]
pub struct InferArgs {
    /// YAML run file; flags below override its values
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// scenario_understanding | empathetic_planning | empathetic_action (or l1/l2/l3)
    #[arg(long)]
    pub task: Option<Task>,

    /// frames | text
    #[arg(long)]
    pub mode: Option<AssetMode>,

    #[arg(long)]
    pub model: Option<String>,

    /// Completion token limit per call
    #[arg(long)]
    pub max_tokens: Option<u32>,

    #[arg(long)]
    pub temperature: Option<f32>,

    /// Per-request timeout in seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Scenario dataset (JSON list)
    #[arg(long)]
    pub dataset: Option<PathBuf>,

    /// Character profiles keyed by character_id (JSON object)
    #[arg(long)]
    pub characters: Option<PathBuf>,

    /// Root holding one frame directory per action_id
    #[arg(long)]
    pub frames_root: Option<PathBuf>,

    /// Custom prompt template ({character_info}, {dialogue}, {scenario_context})
    #[arg(long)]
    pub prompt_file: Option<PathBuf>,

    /// Checkpoint CSV (default: output/<task>/<model>_inference.csv)
    #[arg(long)]
    pub checkpoint: Option<PathBuf>,

    /// Delete the checkpoint before starting
    #[arg(long)]
    pub fresh: bool,

    /// Use canned responses instead of calling the endpoint (no credential needed)
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct ExportArgs {
    /// Checkpoint CSV or inference JSONL
    #[arg(long)]
    pub input: PathBuf,

    #[arg(long, default_value = "predictions.csv")]
    pub out: PathBuf,
}

#[derive(Parser, Debug, Clone)]
pub struct ScoreArgs {
    /// id,prediction CSV
    #[arg(long)]
    pub predictions: PathBuf,

    /// Gold references (.json, .jsonl or .csv)
    #[arg(long)]
    pub references: PathBuf,

    #[arg(long, default_value = "scores.csv")]
    pub out: PathBuf,
}

#[derive(Parser, Debug, Clone)]
pub struct LogArgs {
    #[arg(long, default_value = "scores.csv")]
    pub scores: PathBuf,

    #[arg(long, default_value = "run_log.csv")]
    pub run_log: PathBuf,

    #[arg(long)]
    pub adapter: String,

    #[arg(long)]
    pub base_model: String,

    #[arg(long, default_value = "testset_100")]
    pub dataset: String,

    #[arg(long, default_value_t = 160)]
    pub max_new_tokens: u32,

    #[arg(long, default_value_t = 0.7)]
    pub temperature: f32,

    #[arg(long, default_value = "")]
    pub notes: String,
}

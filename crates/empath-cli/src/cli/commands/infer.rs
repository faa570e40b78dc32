use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use empath_core::dataset::{load_scenarios, CharacterTable};
use empath_core::prompts::PromptTemplate;
use empath_core::providers::{ScriptedClient, TextClient, VisionClient};
use empath_core::{
    AssetMode, AssetResolver, CheckpointLedger, GenerationClient, GenerationConfig,
    GenerationError, Orchestrator, RunConfig,
};
use tracing::info;

use crate::cli::args::InferArgs;
use crate::exit_codes::SUCCESS;

pub async fn run(args: InferArgs) -> anyhow::Result<i32> {
    let cfg = resolve_config(&args)?;
    info!(
        task = %cfg.task,
        level = cfg.task.level(),
        model = %cfg.generation.model,
        max_tokens = cfg.generation.max_tokens,
        temperature = cfg.generation.temperature,
        "starting inference"
    );

    let dataset = required(&cfg.dataset, "dataset")?;
    let characters_path = required(&cfg.characters, "characters")?;
    let scenarios = load_scenarios(&dataset)?;
    let characters = CharacterTable::load(&characters_path)?;

    let template = match &cfg.prompt_file {
        Some(path) => PromptTemplate::from_file(path)?,
        None => PromptTemplate::builtin(cfg.task),
    };

    let assets = match cfg.mode {
        AssetMode::Frames => AssetResolver::Frames {
            root: required(&cfg.frames_root, "frames_root")?,
        },
        AssetMode::Text => AssetResolver::Text,
    };

    let client: Arc<dyn GenerationClient> = if args.dry_run {
        Arc::new(ScriptedClient::new(cfg.generation.model.clone()))
    } else {
        match cfg.mode {
            AssetMode::Frames => Arc::new(VisionClient::from_env(
                cfg.generation.clone(),
                cfg.frames.clone(),
            )?),
            AssetMode::Text => Arc::new(TextClient::from_env(cfg.generation.clone())?),
        }
    };

    let checkpoint = cfg.checkpoint_path();
    if args.fresh {
        CheckpointLedger::reset(&checkpoint)?;
        info!(checkpoint = %checkpoint.display(), "removed checkpoint for fresh run");
    }
    let mut ledger = CheckpointLedger::open(&checkpoint)?;

    let orchestrator = Orchestrator::new(client, template, characters, assets)
        .with_backoff(cfg.backoff.clone())
        .with_pacing(Duration::from_millis(cfg.pacing_ms));
    let summary = orchestrator.run(&scenarios, &mut ledger).await?;

    println!(
        "Scenarios: {} | generated: {} | already done: {} | skipped: {} | failed: {}",
        summary.total,
        summary.done,
        summary.already_done,
        summary.skipped,
        summary.failed_transient
    );
    println!("Checkpoint: {}", checkpoint.display());
    Ok(SUCCESS)
}

/// File values first (or environment defaults without a file), then flags.
fn resolve_config(args: &InferArgs) -> anyhow::Result<RunConfig> {
    let mut cfg = match &args.config {
        Some(path) => RunConfig::load(path)?,
        None => RunConfig {
            generation: GenerationConfig::from_env(),
            ..RunConfig::default()
        },
    };

    if let Some(task) = args.task {
        cfg.task = task;
    }
    if let Some(mode) = args.mode {
        cfg.mode = mode;
    }
    if let Some(model) = &args.model {
        cfg.generation.model = model.clone();
    }
    if args.max_tokens.is_some() || args.temperature.is_some() {
        let max_tokens = args.max_tokens.unwrap_or(cfg.generation.max_tokens);
        let temperature = args.temperature.unwrap_or(cfg.generation.temperature);
        cfg.generation = cfg.generation.with_decoding(max_tokens, temperature);
    }
    if let Some(secs) = args.timeout_secs {
        cfg.generation = cfg.generation.with_timeout_secs(secs);
    }
    override_path(&mut cfg.dataset, &args.dataset);
    override_path(&mut cfg.characters, &args.characters);
    override_path(&mut cfg.frames_root, &args.frames_root);
    override_path(&mut cfg.prompt_file, &args.prompt_file);
    override_path(&mut cfg.checkpoint, &args.checkpoint);
    Ok(cfg)
}

fn override_path(slot: &mut Option<PathBuf>, flag: &Option<PathBuf>) {
    if let Some(path) = flag {
        *slot = Some(path.clone());
    }
}

fn required(value: &Option<PathBuf>, name: &str) -> Result<PathBuf, GenerationError> {
    value.clone().ok_or_else(|| GenerationError::InvalidConfig {
        message: format!("missing {} (pass --{} or set `{}` in the config file)", name, name.replace('_', "-"), name),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use empath_core::Task;

    fn args() -> InferArgs {
        InferArgs {
            config: None,
            task: None,
            mode: None,
            model: None,
            max_tokens: None,
            temperature: None,
            timeout_secs: None,
            dataset: None,
            characters: None,
            frames_root: None,
            prompt_file: None,
            checkpoint: None,
            fresh: false,
            dry_run: true,
        }
    }

    #[test]
    fn flags_override_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.yaml");
        std::fs::write(
            &path,
            "task: scenario_understanding\ndataset: from_file.json\ngeneration:\n  model: gpt-4o\n",
        )
        .unwrap();

        let mut a = args();
        a.config = Some(path);
        a.dataset = Some("from_flag.json".into());
        a.mode = Some(AssetMode::Text);

        let cfg = resolve_config(&a).unwrap();
        assert_eq!(cfg.task, Task::ScenarioUnderstanding);
        assert_eq!(cfg.dataset, Some(PathBuf::from("from_flag.json")));
        assert_eq!(cfg.generation.model, "gpt-4o");
        assert_eq!(cfg.mode, AssetMode::Text);
        assert_eq!(
            cfg.checkpoint_path(),
            PathBuf::from("output/scenario_understanding/gpt-4o_inference.csv")
        );
    }

    #[test]
    fn decoding_and_timeout_flags_override_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.yaml");
        std::fs::write(
            &path,
            "generation:\n  max_tokens: 300\n  temperature: 0.2\n  timeout_secs: 30\n",
        )
        .unwrap();

        let mut a = args();
        a.config = Some(path.clone());
        a.temperature = Some(0.9);
        let cfg = resolve_config(&a).unwrap();
        assert_eq!(cfg.generation.max_tokens, 300);
        assert!((cfg.generation.temperature - 0.9).abs() < 1e-6);
        assert_eq!(cfg.generation.timeout_secs, 30);

        a.max_tokens = Some(64);
        a.timeout_secs = Some(5);
        let cfg = resolve_config(&a).unwrap();
        assert_eq!(cfg.generation.max_tokens, 64);
        assert!((cfg.generation.temperature - 0.9).abs() < 1e-6);
        assert_eq!(cfg.generation.timeout_secs, 5);
    }

    #[test]
    fn missing_required_path_is_config_error() {
        let err = required(&None, "frames_root").unwrap_err();
        assert!(matches!(err, GenerationError::InvalidConfig { .. }));
        assert!(err.to_string().contains("--frames-root"));
    }
}

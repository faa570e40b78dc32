//! Process exit codes. Part of the public contract for scripted runs.

use empath_core::GenerationError;
use empath_metrics::ScoreInputError;

pub const SUCCESS: i32 = 0;
pub const INPUT_ERROR: i32 = 1; // invalid config, credential or input file
pub const INTERNAL_ERROR: i32 = 2; // I/O or parse failure
pub const QUOTA_EXHAUSTED: i32 = 3;
pub const UPSTREAM_HALT: i32 = 4; // unclassified upstream error stopped the run

/// Typed generation errors carry their own code. Unscoreable inputs and
/// missing input files are input errors; everything else is internal.
pub fn for_error(err: &anyhow::Error) -> i32 {
    if let Some(e) = err.downcast_ref::<GenerationError>() {
        return e.exit_code();
    }
    if err.downcast_ref::<ScoreInputError>().is_some() {
        return INPUT_ERROR;
    }
    let missing_file = err.chain().any(|cause| {
        cause
            .downcast_ref::<std::io::Error>()
            .is_some_and(|io| io.kind() == std::io::ErrorKind::NotFound)
    });
    if missing_file {
        INPUT_ERROR
    } else {
        INTERNAL_ERROR
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn generation_errors_map_through_context() {
        let err = anyhow::Error::new(GenerationError::QuotaExhausted {
            message: "insufficient_quota".into(),
        })
        .context("scenario 5 halted the run");
        assert_eq!(for_error(&err), QUOTA_EXHAUSTED);

        let err = anyhow::Error::new(GenerationError::unknown("HTTP 418"));
        assert_eq!(for_error(&err), UPSTREAM_HALT);

        let err = anyhow::Error::new(GenerationError::InvalidCredential {
            message: "empty".into(),
        });
        assert_eq!(for_error(&err), INPUT_ERROR);
    }

    #[test]
    fn missing_file_is_input_error() {
        let err = std::fs::read("/definitely/not/here.csv")
            .context("failed to read predictions")
            .unwrap_err();
        assert_eq!(for_error(&err), INPUT_ERROR);
        assert_eq!(for_error(&anyhow::anyhow!("bad row")), INTERNAL_ERROR);
    }

    #[test]
    fn unscoreable_inputs_are_input_errors() {
        let err = empath_metrics::score_pairs(&[], &["offer tea".to_string()]).unwrap_err();
        assert_eq!(for_error(&err), INPUT_ERROR);

        let err = anyhow::Error::new(ScoreInputError::EmptyScoreTable).context("scores.csv");
        assert_eq!(for_error(&err), INPUT_ERROR);
    }
}

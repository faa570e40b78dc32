//! End-to-end runs of the `empath` binary.

use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn empath() -> Command {
    let mut cmd = Command::cargo_bin("empath").unwrap();
    cmd.env_remove("OPENAI_API_KEY")
        .env_remove("OPENAI_API_BASE")
        .env("RUST_LOG", "warn");
    cmd
}

fn write_inputs(dir: &Path, n: usize) {
    let scenarios: Vec<_> = (0..n)
        .map(|i| {
            json!({
                "character_id": i % 2,
                "action_id": 100 + i,
                "dialogue": format!("I dropped my keys again ({i})."),
                "scenario_context": "hallway, morning"
            })
        })
        .collect();
    std::fs::write(dir.join("dataset.json"), serde_json::to_string(&scenarios).unwrap()).unwrap();
    std::fs::write(
        dir.join("characters.json"),
        json!({"0": "Mina, 29, nurse", "1": {"name": "Ode", "age": 80}}).to_string(),
    )
    .unwrap();
}

#[test]
fn version_prints_crate_version() {
    empath()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn export_score_and_log_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let d = dir.path();
    std::fs::write(
        d.join("ckpt.csv"),
        "data_idx,response\n1,Sit with them.\n0,Offer a warm blanket.\n1,dup\n",
    )
    .unwrap();
    std::fs::write(
        d.join("refs.json"),
        json!([{"reference": "Offer a warm blanket."}, {"plan": "Sit with them."}]).to_string(),
    )
    .unwrap();

    empath()
        .args(["export", "--input"])
        .arg(d.join("ckpt.csv"))
        .arg("--out")
        .arg(d.join("preds.csv"))
        .assert()
        .success()
        .stdout(predicate::str::contains("Exported 2 predictions"));
    let preds = std::fs::read_to_string(d.join("preds.csv")).unwrap();
    assert_eq!(
        preds,
        "id,prediction\n0,Offer a warm blanket.\n1,Sit with them.\n"
    );

    empath()
        .args(["score", "--predictions"])
        .arg(d.join("preds.csv"))
        .arg("--references")
        .arg(d.join("refs.json"))
        .arg("--out")
        .arg(d.join("scores.csv"))
        .assert()
        .success()
        .stdout(predicate::str::contains("Samples scored: 2"))
        .stdout(predicate::str::contains("Average Overlap: 1.0000"));

    for notes in ["first", "second"] {
        empath()
            .args(["log", "--scores"])
            .arg(d.join("scores.csv"))
            .arg("--run-log")
            .arg(d.join("run_log.csv"))
            .args(["--adapter", "gpt-4o", "--base-model", "gpt-4o", "--notes", notes])
            .assert()
            .success();
    }
    let log = std::fs::read_to_string(d.join("run_log.csv")).unwrap();
    let lines: Vec<&str> = log.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(
        lines[1],
        "gpt-4o,gpt-4o,testset_100,160,0.7,1.0000,1.0000,1.0000,first"
    );
}

#[test]
fn score_with_no_comparable_rows_fails() {
    let dir = tempfile::tempdir().unwrap();
    let d = dir.path();
    std::fs::write(d.join("preds.csv"), "id,prediction\n").unwrap();
    std::fs::write(d.join("refs.jsonl"), "{\"reference\": \"x\"}\n").unwrap();

    empath()
        .args(["score", "--predictions"])
        .arg(d.join("preds.csv"))
        .arg("--references")
        .arg(d.join("refs.jsonl"))
        .arg("--out")
        .arg(d.join("scores.csv"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("no comparable rows"));
    assert!(!d.join("scores.csv").exists());
}

#[test]
fn score_missing_predictions_is_input_error() {
    let dir = tempfile::tempdir().unwrap();
    empath()
        .args(["score", "--predictions"])
        .arg(dir.path().join("nope.csv"))
        .arg("--references")
        .arg(dir.path().join("refs.json"))
        .assert()
        .code(1);
}

#[test]
fn dry_run_infer_is_resumable() {
    let dir = tempfile::tempdir().unwrap();
    let d = dir.path();
    write_inputs(d, 3);
    let ckpt = d.join("out/run.csv");

    let infer = || {
        let mut cmd = empath();
        cmd.args(["infer", "--mode", "text", "--dry-run", "--dataset"])
            .arg(d.join("dataset.json"))
            .arg("--characters")
            .arg(d.join("characters.json"))
            .arg("--checkpoint")
            .arg(&ckpt);
        cmd
    };

    infer()
        .assert()
        .success()
        .stdout(predicate::str::contains("generated: 3"));
    infer()
        .assert()
        .success()
        .stdout(predicate::str::contains("already done: 3"));
    infer()
        .arg("--fresh")
        .assert()
        .success()
        .stdout(predicate::str::contains("generated: 3"));

    let text = std::fs::read_to_string(&ckpt).unwrap();
    assert_eq!(text.lines().count(), 4);
}

#[test]
fn infer_without_credential_exits_with_input_error() {
    let dir = tempfile::tempdir().unwrap();
    write_inputs(dir.path(), 1);

    empath()
        .args(["infer", "--mode", "text", "--dataset"])
        .arg(dir.path().join("dataset.json"))
        .arg("--characters")
        .arg(dir.path().join("characters.json"))
        .arg("--checkpoint")
        .arg(dir.path().join("run.csv"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("invalid credential"));
}

#[test]
fn frames_mode_requires_frames_root() {
    let dir = tempfile::tempdir().unwrap();
    write_inputs(dir.path(), 1);

    empath()
        .args(["infer", "--dry-run", "--dataset"])
        .arg(dir.path().join("dataset.json"))
        .arg("--characters")
        .arg(dir.path().join("characters.json"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("--frames-root"));
}

#[tokio::test(flavor = "multi_thread")]
async fn quota_exhaustion_exits_3_and_keeps_rows() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"content": "Help them look for the keys."}}]
        })))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "error": {"code": "insufficient_quota"}
        })))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    write_inputs(dir.path(), 4);
    let ckpt = dir.path().join("run.csv");

    empath()
        .env("OPENAI_API_KEY", "sk-test")
        .env("OPENAI_API_BASE", server.uri())
        .args(["infer", "--mode", "text", "--model", "gpt-4o-mini", "--dataset"])
        .arg(dir.path().join("dataset.json"))
        .arg("--characters")
        .arg(dir.path().join("characters.json"))
        .arg("--checkpoint")
        .arg(&ckpt)
        .assert()
        .code(3)
        .stderr(predicate::str::contains("quota exhausted"));

    let text = std::fs::read_to_string(&ckpt).unwrap();
    assert_eq!(
        text,
        "data_idx,response\n0,Help them look for the keys.\n1,Help them look for the keys.\n"
    );
}

//! Prediction and reference loaders.

use std::fs::File;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde_json::Value;

/// Fields checked, in order, for a record's reference text.
pub const REFERENCE_KEYS: &[&str] = &["reference", "target", "output", "answer", "plan", "response"];

/// CSV reference columns, in order.
const REFERENCE_COLUMNS: &[&str] = &["reference", "output", "target"];

/// `prediction` column of an `id,prediction` CSV, ordered by numeric `id`
/// when every id parses, otherwise lexicographically.
pub fn read_predictions(path: &Path) -> Result<Vec<String>> {
    let file = File::open(path)
        .with_context(|| format!("failed to open predictions {}", path.display()))?;
    let mut reader = csv::Reader::from_reader(file);
    let headers = reader.headers()?.clone();
    let id_col = headers.iter().position(|h| h == "id");
    let pred_col = headers.iter().position(|h| h == "prediction");

    let mut rows: Vec<(String, String)> = Vec::new();
    for record in reader.records() {
        let record =
            record.with_context(|| format!("malformed predictions file {}", path.display()))?;
        let id = id_col.and_then(|c| record.get(c)).unwrap_or("").to_string();
        let pred = pred_col.and_then(|c| record.get(c)).unwrap_or("").to_string();
        rows.push((id, pred));
    }

    let numeric: Option<Vec<i64>> = rows.iter().map(|(id, _)| id.trim().parse().ok()).collect();
    match numeric {
        Some(keys) => {
            let mut keyed: Vec<(i64, String)> =
                keys.into_iter().zip(rows.into_iter().map(|(_, p)| p)).collect();
            keyed.sort_by_key(|(k, _)| *k);
            Ok(keyed.into_iter().map(|(_, p)| p).collect())
        }
        None => {
            rows.sort_by(|a, b| a.0.cmp(&b.0));
            Ok(rows.into_iter().map(|(_, p)| p).collect())
        }
    }
}

/// References in file order. Format by extension: `.json` (list, or object
/// whose first list value in document order is used), `.jsonl`, or `.csv`.
pub fn read_references(path: &Path) -> Result<Vec<String>> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "json" => read_json_references(path),
        "jsonl" => read_jsonl_references(path),
        "csv" => read_csv_references(path),
        other => bail!(
            "unsupported reference file type '.{}' ({}); expected json, jsonl or csv",
            other,
            path.display()
        ),
    }
}

fn read_json_references(path: &Path) -> Result<Vec<String>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read references {}", path.display()))?;
    let data: Value = serde_json::from_str(&text)
        .with_context(|| format!("invalid JSON in {}", path.display()))?;

    let list = match data {
        Value::Array(items) => items,
        Value::Object(map) => match map.into_iter().find_map(|(_, v)| match v {
            Value::Array(items) => Some(items),
            _ => None,
        }) {
            Some(items) => items,
            None => bail!("{}: object holds no list of references", path.display()),
        },
        _ => bail!("{}: unsupported JSON structure for references", path.display()),
    };
    Ok(list.iter().map(reference_text).collect())
}

fn read_jsonl_references(path: &Path) -> Result<Vec<String>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read references {}", path.display()))?;
    let mut refs = Vec::new();
    for (n, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let record: Value = serde_json::from_str(line)
            .with_context(|| format!("{}:{}: invalid JSON", path.display(), n + 1))?;
        refs.push(reference_text(&record));
    }
    Ok(refs)
}

fn read_csv_references(path: &Path) -> Result<Vec<String>> {
    let file = File::open(path)
        .with_context(|| format!("failed to open references {}", path.display()))?;
    let mut reader = csv::Reader::from_reader(file);
    let headers = reader.headers()?.clone();
    let cols: Vec<usize> = REFERENCE_COLUMNS
        .iter()
        .filter_map(|name| headers.iter().position(|h| h == *name))
        .collect();

    let mut refs = Vec::new();
    for record in reader.records() {
        let record =
            record.with_context(|| format!("malformed references file {}", path.display()))?;
        let text = cols
            .iter()
            .filter_map(|&c| record.get(c))
            .find(|v| !v.is_empty())
            .unwrap_or("");
        refs.push(text.to_string());
    }
    Ok(refs)
}

/// First non-empty ranked field; conversation records fall back to the last
/// assistant/system turn. Records with neither yield `""` so alignment holds.
pub fn reference_text(record: &Value) -> String {
    if let Value::String(s) = record {
        return s.trim().to_string();
    }
    for key in REFERENCE_KEYS {
        if let Some(text) = record.get(*key).and_then(field_text) {
            return text;
        }
    }
    if let Some(messages) = record.get("messages").and_then(Value::as_array) {
        for message in messages.iter().rev() {
            let role = message.get("role").and_then(Value::as_str);
            if matches!(role, Some("assistant") | Some("system")) {
                if let Some(text) = message.get("content").and_then(field_text) {
                    return text;
                }
            }
        }
    }
    String::new()
}

fn field_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::Null => return None,
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(scalar_text)
            .collect::<Vec<_>>()
            .join(" "),
        other => other.to_string(),
    };
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn write(dir: &tempfile::TempDir, name: &str, body: &str) -> std::path::PathBuf {
        let p = dir.path().join(name);
        std::fs::write(&p, body).unwrap();
        p
    }

    #[test]
    fn predictions_sorted_numerically() {
        let dir = tempfile::tempdir().unwrap();
        let p = write(&dir, "p.csv", "id,prediction\n10,ten\n2,two\n1,one\n");
        assert_eq!(read_predictions(&p).unwrap(), vec!["one", "two", "ten"]);
    }

    #[test]
    fn predictions_fall_back_to_lexicographic() {
        let dir = tempfile::tempdir().unwrap();
        let p = write(&dir, "p.csv", "id,prediction\nb10,x\nb2,y\na,z\n");
        assert_eq!(read_predictions(&p).unwrap(), vec!["z", "x", "y"]);
    }

    #[test]
    fn reference_key_ranking() {
        assert_eq!(reference_text(&json!({"output": "o", "target": "t"})), "t");
        assert_eq!(reference_text(&json!({"reference": "  ", "plan": "p"})), "p");
        assert_eq!(reference_text(&json!({"answer": ["hug", "them"]})), "hug them");
        assert_eq!(reference_text(&json!({"unrelated": 1})), "");
    }

    #[test]
    fn conversation_fallback_uses_last_assistant_turn() {
        let rec = json!({"messages": [
            {"role": "system", "content": "be kind"},
            {"role": "user", "content": "help"},
            {"role": "assistant", "content": "Offer a glass of water."},
            {"role": "user", "content": "thanks"}
        ]});
        assert_eq!(reference_text(&rec), "Offer a glass of water.");
    }

    #[test]
    fn json_object_unwraps_first_list() {
        let dir = tempfile::tempdir().unwrap();
        let p = write(&dir, "r.json", r#"{"meta": 1, "data": [{"reference": "a"}, {"plan": "b"}]}"#);
        assert_eq!(read_references(&p).unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn jsonl_and_csv_references() {
        let dir = tempfile::tempdir().unwrap();
        let jl = write(&dir, "r.jsonl", "{\"target\": \"x\"}\n\n{\"response\": \"y\"}\n");
        assert_eq!(read_references(&jl).unwrap(), vec!["x", "y"]);

        let csv = write(&dir, "r.csv", "target,output\nt1,o1\nt2,\n");
        assert_eq!(read_references(&csv).unwrap(), vec!["o1", "t2"]);
    }

    #[test]
    fn unsupported_extension_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let p = write(&dir, "r.txt", "hello");
        assert!(read_references(&p).is_err());
    }
}

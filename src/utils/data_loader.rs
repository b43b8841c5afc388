// src/utils/data_loader.rs
//
// CSV and JSON loaders producing a `Dataset`. Every cell is read as a string:
// numbers are stringified and nulls become empty.

use anyhow::{bail, Context, Result};
use log::info;
use serde_json::Value as JsonValue;
use std::fs;
use std::path::Path;

use crate::models::core::{Dataset, FieldValues, Record, GROUP_ID_COLUMN, ID_COLUMN};

/// Loads by extension: `.csv`, `.json` (array of objects) or `.jsonl`/`.ndjson`.
pub fn load_dataset(path: &Path) -> Result<Dataset> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match extension.as_str() {
        "csv" => load_csv(path),
        "json" | "jsonl" | "ndjson" => load_json(path),
        other => bail!("Unsupported dataset format '{}' for {}", other, path.display()),
    }
}

pub fn load_csv(path: &Path) -> Result<Dataset> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::Headers)
        .from_path(path)
        .with_context(|| format!("Failed to open CSV file {}", path.display()))?;

    let headers: Vec<String> = reader
        .headers()
        .with_context(|| format!("Failed to read CSV header of {}", path.display()))?
        .iter()
        .map(str::to_string)
        .collect();
    let id_idx = headers
        .iter()
        .position(|h| h == ID_COLUMN)
        .with_context(|| format!("{} has no '{}' column", path.display(), ID_COLUMN))?;
    let group_idx = headers.iter().position(|h| h == GROUP_ID_COLUMN);

    let mut records = Vec::new();
    for (row_idx, row) in reader.records().enumerate() {
        let row = row.with_context(|| format!("CSV parse error at row {}", row_idx + 1))?;
        let id = row.get(id_idx).unwrap_or_default().to_string();
        if id.is_empty() {
            bail!("Row {} of {} has an empty id", row_idx + 1, path.display());
        }
        let values: FieldValues = headers
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != id_idx && Some(*i) != group_idx)
            .map(|(i, h)| (h.clone(), row.get(i).unwrap_or_default().to_string()))
            .collect();
        let mut record = Record::new(id, values);
        if let Some(group) = group_idx.and_then(|i| row.get(i)).filter(|g| !g.is_empty()) {
            record = record.with_group(group);
        }
        records.push(record);
    }

    info!("Loaded {} records from {}", records.len(), path.display());
    Ok(Dataset::new(headers, records, group_idx.is_some())?)
}

pub fn load_json(path: &Path) -> Result<Dataset> {
    let text = fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let rows: Vec<JsonValue> = if text.trim_start().starts_with('[') {
        serde_json::from_str(&text).with_context(|| format!("Invalid JSON array in {}", path.display()))?
    } else {
        text.lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(i, line)| {
                serde_json::from_str::<JsonValue>(line)
                    .with_context(|| format!("Invalid JSON on line {} of {}", i + 1, path.display()))
            })
            .collect::<Result<_>>()?
    };

    let mut columns: Vec<String> = Vec::new();
    let mut has_group_id = false;
    let mut records = Vec::with_capacity(rows.len());
    for (row_idx, row) in rows.iter().enumerate() {
        let object = row
            .as_object()
            .with_context(|| format!("Row {} of {} is not a JSON object", row_idx + 1, path.display()))?;
        let id = object
            .get(ID_COLUMN)
            .map(json_to_string)
            .filter(|id| !id.is_empty())
            .with_context(|| format!("Row {} of {} has no '{}'", row_idx + 1, path.display(), ID_COLUMN))?;

        let mut values = FieldValues::new();
        for (key, value) in object {
            if key == ID_COLUMN || key == GROUP_ID_COLUMN {
                continue;
            }
            if !columns.contains(key) {
                columns.push(key.clone());
            }
            values.set(key.clone(), json_to_string(value));
        }

        let mut record = Record::new(id, values);
        if let Some(group) = object.get(GROUP_ID_COLUMN) {
            has_group_id = true;
            let group = json_to_string(group);
            if !group.is_empty() {
                record = record.with_group(group);
            }
        }
        records.push(record);
    }

    info!("Loaded {} records from {}", records.len(), path.display());
    Ok(Dataset::new(columns, records, has_group_id)?)
}

/// Writes `id`, then `group_id` when the dataset has one, then the schema columns.
pub fn save_csv(dataset: &Dataset, path: &Path) -> Result<()> {
    let mut writer =
        csv::Writer::from_path(path).with_context(|| format!("Failed to create CSV file {}", path.display()))?;

    let mut header = vec![ID_COLUMN];
    if dataset.has_group_id() {
        header.push(GROUP_ID_COLUMN);
    }
    header.extend(dataset.columns().iter().map(String::as_str));
    writer.write_record(&header)?;

    for record in dataset.records() {
        let mut row = vec![record.id.as_str()];
        if dataset.has_group_id() {
            row.push(record.group_id.as_deref().unwrap_or_default());
        }
        row.extend(dataset.columns().iter().map(|c| record.values.value_or_empty(c)));
        writer
            .write_record(&row)
            .with_context(|| format!("Failed to write record {} to {}", record.id, path.display()))?;
    }
    writer.flush()?;

    info!("Wrote {} records to {}", dataset.len(), path.display());
    Ok(())
}

fn json_to_string(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => String::new(),
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    fn write_temp(suffix: &str, contents: &str) -> tempfile::NamedTempFile {
        let mut file = Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_csv_with_group_id() {
        let file = write_temp(
            ".csv",
            "id,name,phone,group_id\n1,Jane Doe,555-0100,g1\n2,Jane  Doe,,g1\n3,John Roe,555-0199,\n",
        );
        let dataset = load_dataset(file.path()).unwrap();
        assert_eq!(dataset.len(), 3);
        assert_eq!(dataset.columns(), &["name".to_string(), "phone".to_string()]);
        assert!(dataset.has_group_id());
        assert_eq!(dataset.get("1").unwrap().group_id.as_deref(), Some("g1"));
        assert_eq!(dataset.get("3").unwrap().group_id, None);
        assert_eq!(dataset.get("2").unwrap().values.get("phone"), Some(""));
    }

    #[test]
    fn test_csv_without_id_column_fails() {
        let file = write_temp(".csv", "name,phone\nJane,555\n");
        let err = load_dataset(file.path()).unwrap_err();
        assert!(err.to_string().contains("no 'id' column"));
    }

    #[test]
    fn test_csv_duplicate_ids_fail() {
        let file = write_temp(".csv", "id,name\n1,a\n1,b\n");
        assert!(load_dataset(file.path()).is_err());
    }

    #[test]
    fn test_load_json_array() {
        let file = write_temp(
            ".json",
            r#"[{"id": 1, "name": "Acme", "employees": 12, "note": null, "group_id": 7},
                {"id": 2, "name": "Acme Inc", "employees": 12.5}]"#,
        );
        let dataset = load_dataset(file.path()).unwrap();
        assert_eq!(dataset.len(), 2);
        let first = dataset.get("1").unwrap();
        assert_eq!(first.values.get("employees"), Some("12"));
        assert_eq!(first.values.get("note"), Some(""));
        assert_eq!(first.group_id.as_deref(), Some("7"));
        assert_eq!(dataset.get("2").unwrap().values.get("employees"), Some("12.5"));
        assert!(dataset.has_group_id());
    }

    #[test]
    fn test_load_json_lines() {
        let file = write_temp(".jsonl", "{\"id\": \"a\", \"name\": \"x\"}\n\n{\"id\": \"b\", \"name\": \"y\"}\n");
        let dataset = load_dataset(file.path()).unwrap();
        assert_eq!(dataset.len(), 2);
        assert!(!dataset.has_group_id());
    }

    #[test]
    fn test_save_csv_reloads_with_groups() {
        let dataset = Dataset::from_records(vec![
            Record::new("1", FieldValues::new().with("name", "Doe, Jane").with("city", "Austin")).with_group("g1"),
            Record::new("2", FieldValues::new().with("name", "Jane Doe").with("city", "")),
        ])
        .unwrap();
        let file = Builder::new().suffix(".csv").tempfile().unwrap();
        save_csv(&dataset, file.path()).unwrap();

        let text = fs::read_to_string(file.path()).unwrap();
        assert!(text.starts_with("id,group_id,name,city\n"));
        assert!(text.contains("\"Doe, Jane\""));

        let reloaded = load_dataset(file.path()).unwrap();
        assert_eq!(reloaded.records(), dataset.records());
        assert_eq!(reloaded.columns(), dataset.columns());
    }

    #[test]
    fn test_unknown_extension_rejected() {
        let file = write_temp(".parquet", "");
        assert!(load_dataset(file.path()).is_err());
    }
}

use super::{SavedSchema, Schema};
use serde_yaml::Value;
use std::collections::HashMap;

/// Carries human-written descriptions from `existing` onto `fresh`.
///
/// Structure (types, keys) always comes from `fresh`. Descriptions are
/// copied only when non-empty, so an annotator's text survives
/// re-extraction while new tables and columns start blank. Saved samples
/// are kept when the fresh extraction did not sample. A malformed saved
/// table is logged and only loses its own preservation.
pub fn merge(existing: &SavedSchema, mut fresh: Schema) -> Schema {
    for (table_name, record) in fresh.iter_mut() {
        let Some(saved) = existing.get(table_name) else {
            continue;
        };
        let Some(saved) = saved.as_mapping() else {
            tracing::warn!(
                event = "sqlsage.schema.merge_skipped",
                table = %table_name,
                "saved table entry is not a mapping; descriptions not preserved"
            );
            continue;
        };

        if let Some(desc) = description(saved.get("description")) {
            record.description = desc;
        }

        let saved_columns = match saved.get("columns") {
            None | Some(Value::Null) => continue,
            Some(Value::Sequence(cols)) => index_columns(cols),
            Some(_) => {
                tracing::warn!(
                    event = "sqlsage.schema.merge_skipped",
                    table = %table_name,
                    "saved 'columns' is not a list; column descriptions not preserved"
                );
                continue;
            }
        };

        for col in record.columns.iter_mut() {
            let Some(saved_col) = saved_columns.get(col.name.as_str()) else {
                continue;
            };
            if let Some(desc) = description(saved_col.get("description")) {
                col.description = desc;
            }
            if col.samples.is_none() {
                col.samples = saved_samples(saved_col.get("samples"));
            }
        }
    }
    fresh
}

fn index_columns(cols: &[Value]) -> HashMap<&str, &serde_yaml::Mapping> {
    cols.iter()
        .filter_map(Value::as_mapping)
        .filter_map(|m| m.get("name").and_then(Value::as_str).map(|n| (n, m)))
        .collect()
}

/// Hand-typed YAML scalars like `2024` or `yes` still count as text.
fn scalar_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn description(v: Option<&Value>) -> Option<String> {
    v.and_then(scalar_text).filter(|s| !s.trim().is_empty())
}

fn saved_samples(v: Option<&Value>) -> Option<Vec<String>> {
    let seq = v?.as_sequence()?;
    let samples: Vec<String> = seq
        .iter()
        .filter_map(scalar_text)
        .collect();
    (!samples.is_empty()).then_some(samples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ColumnRecord, SchemaRecord};

    fn fresh() -> Schema {
        let mut s = Schema::new();
        s.insert(
            "artists".into(),
            SchemaRecord {
                description: String::new(),
                columns: vec![
                    ColumnRecord {
                        name: "ArtistId".into(),
                        data_type: "INTEGER".into(),
                        is_primary_key: true,
                        ..Default::default()
                    },
                    ColumnRecord {
                        name: "Name".into(),
                        data_type: "NVARCHAR(120)".into(),
                        ..Default::default()
                    },
                ],
            },
        );
        s.insert("genres".into(), SchemaRecord::default());
        s
    }

    fn saved(yaml: &str) -> SavedSchema {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn keeps_descriptions_and_takes_fresh_structure() {
        let existing = saved(
            r#"
artists:
  description: Recording artists
  columns:
    - name: ArtistId
      type: TEXT
      description: Surrogate key
      is_primary_key: false
    - name: Name
      type: TEXT
      description: ""
    - name: Dropped
      type: TEXT
      description: gone from the database
"#,
        );

        let merged = merge(&existing, fresh());
        let artists = &merged["artists"];
        assert_eq!(artists.description, "Recording artists");

        let id = artists.column("ArtistId").unwrap();
        assert_eq!(id.description, "Surrogate key");
        assert_eq!(id.data_type, "INTEGER");
        assert!(id.is_primary_key);

        assert_eq!(artists.column("Name").unwrap().description, "");
        assert!(artists.column("Dropped").is_none());
        assert_eq!(merged["genres"].description, "");
    }

    #[test]
    fn malformed_table_is_skipped_not_fatal() {
        let existing = saved(
            r#"
artists: "not a record"
genres:
  description: Music genres
"#,
        );
        let merged = merge(&existing, fresh());
        assert_eq!(merged["artists"].description, "");
        assert_eq!(merged["genres"].description, "Music genres");
    }

    #[test]
    fn malformed_columns_keep_table_description() {
        let existing = saved(
            r#"
artists:
  description: Recording artists
  columns: 42
"#,
        );
        let merged = merge(&existing, fresh());
        assert_eq!(merged["artists"].description, "Recording artists");
        assert_eq!(merged["artists"].column("ArtistId").unwrap().description, "");
    }

    #[test]
    fn saved_samples_fill_in_when_not_resampled() {
        let existing = saved(
            r#"
artists:
  columns:
    - name: Name
      samples: [AC/DC, 1999]
"#,
        );
        let merged = merge(&existing, fresh());
        assert_eq!(
            merged["artists"].column("Name").unwrap().samples,
            Some(vec!["AC/DC".to_string(), "1999".to_string()])
        );

        let mut resampled = fresh();
        resampled["artists"].columns[1].samples = Some(vec!["Queen".into()]);
        let merged = merge(&existing, resampled);
        assert_eq!(
            merged["artists"].column("Name").unwrap().samples,
            Some(vec!["Queen".to_string()])
        );
    }

    #[test]
    fn preserves_fresh_table_order() {
        let existing = saved("genres:\n  description: g\nartists:\n  description: a\n");
        let merged = merge(&existing, fresh());
        assert_eq!(merged.keys().collect::<Vec<_>>(), vec!["artists", "genres"]);
    }

    #[test]
    fn numeric_and_boolean_descriptions_survive() {
        let existing = saved(
            r#"
artists:
  description: 2024
  columns:
    - name: ArtistId
      description: 1
    - name: Name
      description: true
"#,
        );
        let merged = merge(&existing, fresh());
        assert_eq!(merged["artists"].description, "2024");
        assert_eq!(merged["artists"].column("ArtistId").unwrap().description, "1");
        assert_eq!(merged["artists"].column("Name").unwrap().description, "true");
    }
}

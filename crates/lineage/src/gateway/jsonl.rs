//! JSONL record files.
//!
//! Each line holds one [`RawPersonRecord`]. Loading is resilient: lines that
//! fail to parse or validate are skipped and reported as [`LoadWarning`]s
//! instead of failing the whole file.

use crate::domain::{PersonId, PersonRecord, RawPersonRecord};
use crate::error::{Error, Result};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};

/// Non-fatal problems found while loading a record file.
///
/// Loading continues past every one of these; the affected line or
/// reference is skipped or kept as described on each variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadWarning {
    /// Line is not valid JSON for a person record.
    ///
    /// **Effect**: Line is skipped entirely.
    MalformedJson { line_number: usize, error: String },

    /// Record parsed but failed validation (e.g. empty ID).
    ///
    /// **Effect**: Line is skipped entirely.
    InvalidRecord { line_number: usize, error: String },

    /// A later line repeats an ID.
    ///
    /// **Effect**: The later record replaces the earlier one.
    DuplicateRecord { id: PersonId, line_number: usize },

    /// A parent reference names a person with no record in the file.
    ///
    /// **Effect**: The reference is kept; tree builds report the branch as
    /// unresolved.
    MissingParent { person: PersonId, parent: PersonId },
}

/// Load person records from a JSONL file.
///
/// Returns the records in file order (duplicates resolved to the last
/// occurrence) and the warnings encountered.
///
/// # Errors
///
/// Returns `Error::Io` if the file cannot be opened or read.
pub async fn load_records(path: &Path) -> Result<(Vec<PersonRecord>, Vec<LoadWarning>)> {
    let file = File::open(path).await?;
    let mut lines = BufReader::new(file).lines();

    let mut warnings = Vec::new();
    let mut records: Vec<PersonRecord> = Vec::new();
    let mut positions: HashMap<PersonId, usize> = HashMap::new();
    let mut line_number = 0;

    while let Some(line) = lines.next_line().await? {
        line_number += 1;
        if line.trim().is_empty() {
            continue;
        }

        let raw: RawPersonRecord = match serde_json::from_str(&line) {
            Ok(raw) => raw,
            Err(e) => {
                warnings.push(LoadWarning::MalformedJson {
                    line_number,
                    error: e.to_string(),
                });
                continue;
            }
        };

        let record = match PersonRecord::try_from(raw) {
            Ok(record) => record,
            Err(e) => {
                warnings.push(LoadWarning::InvalidRecord {
                    line_number,
                    error: e.to_string(),
                });
                continue;
            }
        };

        if let Some(&position) = positions.get(&record.id) {
            warnings.push(LoadWarning::DuplicateRecord {
                id: record.id.clone(),
                line_number,
            });
            records[position] = record;
        } else {
            positions.insert(record.id.clone(), records.len());
            records.push(record);
        }
    }

    let known: HashSet<&PersonId> = records.iter().map(|r| &r.id).collect();
    for record in &records {
        for parent in &record.parents {
            if !known.contains(&parent.id) {
                warnings.push(LoadWarning::MissingParent {
                    person: record.id.clone(),
                    parent: parent.id.clone(),
                });
            }
        }
    }

    tracing::debug!(
        path = %path.display(),
        records = records.len(),
        warnings = warnings.len(),
        "Loaded record file"
    );

    Ok((records, warnings))
}

/// Save person records to a JSONL file with atomic writes.
///
/// Writes to a temporary file first, then renames it over `path`, so an
/// interrupted save leaves the original file unchanged.
///
/// # Errors
///
/// Returns `Error::Io` or `Error::Json` if writing fails.
pub async fn save_records(records: &[PersonRecord], path: &Path) -> Result<()> {
    let temp_path = path.with_extension("tmp");

    let file = File::create(&temp_path).await.map_err(Error::Io)?;
    let mut writer = BufWriter::new(file);

    for record in records {
        let raw = RawPersonRecord::from(record.clone());
        let json = serde_json::to_string(&raw)?;
        writer.write_all(json.as_bytes()).await?;
        writer.write_all(b"\n").await?;
    }

    writer.flush().await?;

    tokio::fs::rename(&temp_path, path).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ParentRef, Sex};
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_load_skips_bad_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("people.jsonl");
        let content = concat!(
            r#"{"id": 1, "first_name": "Anne", "sex": "F"}"#,
            "\n",
            "not json\n",
            "\n",
            r#"{"id": "", "first_name": "Nobody"}"#,
            "\n",
            r#"{"id": 3, "first_name": "Carl", "parents": [{"id": 1}, {"id": 9}]}"#,
            "\n",
        );
        tokio::fs::write(&path, content).await.unwrap();

        let (records, warnings) = load_records(&path).await.unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].sex, Sex::Female);
        assert!(matches!(
            warnings[0],
            LoadWarning::MalformedJson { line_number: 2, .. }
        ));
        assert!(matches!(
            warnings[1],
            LoadWarning::InvalidRecord { line_number: 4, .. }
        ));
        assert_eq!(
            warnings[2],
            LoadWarning::MissingParent {
                person: PersonId::new("3"),
                parent: PersonId::new("9"),
            }
        );
        assert_eq!(warnings.len(), 3);
    }

    #[tokio::test]
    async fn test_load_duplicate_keeps_last() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("people.jsonl");
        let content = concat!(
            r#"{"id": 1, "first_name": "Old"}"#,
            "\n",
            r#"{"id": 2, "first_name": "Other"}"#,
            "\n",
            r#"{"id": 1, "first_name": "New"}"#,
            "\n",
        );
        tokio::fs::write(&path, content).await.unwrap();

        let (records, warnings) = load_records(&path).await.unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].first_name.as_deref(), Some("New"));
        assert_eq!(
            warnings,
            vec![LoadWarning::DuplicateRecord {
                id: PersonId::new("1"),
                line_number: 3,
            }]
        );
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let dir = tempdir().unwrap();
        let result = load_records(&dir.path().join("absent.jsonl")).await;
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("people.jsonl");

        let mut child = PersonRecord::new("7", "Ada", "Byron");
        child.sex = Sex::Female;
        child.parents = vec![ParentRef::new("3", Some("George Byron".to_string()))];
        let records = vec![PersonRecord::new("3", "George", "Byron"), child];

        save_records(&records, &path).await.unwrap();
        let (loaded, warnings) = load_records(&path).await.unwrap();

        assert!(warnings.is_empty());
        assert_eq!(loaded, records);
        assert!(!path.with_extension("tmp").exists());
    }
}

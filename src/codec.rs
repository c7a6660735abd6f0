//! JSON persistence codec for task collections.
//!
//! A collection is a JSON array of records:
//!
//! ```text
//! [
//!     {
//!         "title": "Dentist",
//!         "kind": "scheduled",
//!         "date": "2024-05-01",
//!         "completed": false,
//!         "completedDate": null
//!     }
//! ]
//! ```
//!
//! `date` is null for daily tasks and required for the other kinds.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::ser::PrettyFormatter;
use serde_json::Serializer;

use crate::error::{Error, Result};
use crate::task::{KindTag, Task, TaskKind};

const INDENT: &[u8] = b"    ";

/// On-disk shape of one task.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRecord {
    pub title: String,
    pub kind: KindTag,
    pub date: Option<NaiveDate>,
    pub completed: bool,
    pub completed_date: Option<NaiveDate>,
}

impl From<&Task> for TaskRecord {
    fn from(task: &Task) -> Self {
        Self {
            title: task.title.clone(),
            kind: task.tag(),
            date: task.date(),
            completed: task.completed,
            completed_date: task.completed_on,
        }
    }
}

impl TaskRecord {
    fn into_task(self, index: usize) -> Result<Task> {
        if self.title.trim().is_empty() {
            return Err(Error::malformed(index, "title is empty"));
        }
        if self.kind == KindTag::Daily && self.date.is_some() {
            return Err(Error::malformed(index, "daily task must not carry a date"));
        }
        let kind = TaskKind::from_parts(self.kind, self.date).ok_or_else(|| {
            Error::malformed(index, format!("{} task is missing its date", self.kind))
        })?;
        Ok(Task {
            title: self.title,
            kind,
            completed: self.completed,
            completed_on: self.completed_date,
        })
    }
}

/// Serialize tasks as a pretty-printed JSON array with 4-space indentation.
pub fn encode(tasks: &[Task]) -> Result<String> {
    let records: Vec<TaskRecord> = tasks.iter().map(TaskRecord::from).collect();
    let mut buf = Vec::new();
    let mut serializer = Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(INDENT));
    records.serialize(&mut serializer)?;
    // serde_json only ever emits UTF-8
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Parse a JSON array of task records.
///
/// Blank input decodes to an empty list. Text that is not a JSON array
/// fails with [`Error::Json`]; an element that breaks the record schema
/// fails with [`Error::MalformedRecord`].
pub fn decode(text: &str) -> Result<Vec<Task>> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let values: Vec<serde_json::Value> = serde_json::from_str(text)?;
    values
        .into_iter()
        .enumerate()
        .map(|(index, value)| {
            let record: TaskRecord = serde_json::from_value(value)
                .map_err(|err| Error::malformed(index, err.to_string()))?;
            record.into_task(index)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::parse_date;

    fn date(raw: &str) -> NaiveDate {
        parse_date(raw).expect("date")
    }

    #[test]
    fn round_trip_preserves_all_kinds() {
        let mut done = Task::reminder("Call mom", date("2024-05-02"));
        done.mark_completed(date("2024-05-03"));
        let mut checked = Task::daily("Stretch");
        checked.mark_completed(date("2024-05-03"));
        let tasks = vec![
            Task::daily("Water plants"),
            checked,
            Task::scheduled("Dentist", date("2024-05-01")),
            done,
        ];

        let decoded = decode(&encode(&tasks).unwrap()).unwrap();
        assert_eq!(decoded, tasks);
        let flags: Vec<bool> = decoded.iter().map(|task| task.completed).collect();
        assert_eq!(flags, vec![false, true, false, true]);
    }

    #[test]
    fn encode_uses_four_space_indent_and_camel_case() {
        let text = encode(&[Task::scheduled("Dentist", date("2024-05-01"))]).unwrap();
        assert!(text.starts_with("[\n    {\n        \"title\": \"Dentist\""));
        assert!(text.contains("\"kind\": \"scheduled\""));
        assert!(text.contains("\"date\": \"2024-05-01\""));
        assert!(text.contains("\"completedDate\": null"));
    }

    #[test]
    fn daily_encodes_null_date() {
        let text = encode(&[Task::daily("Stretch")]).unwrap();
        assert!(text.contains("\"date\": null"));
    }

    #[test]
    fn blank_input_is_empty() {
        assert!(decode("").unwrap().is_empty());
        assert!(decode("  \n").unwrap().is_empty());
        assert!(decode("[]").unwrap().is_empty());
    }

    #[test]
    fn missing_date_is_malformed() {
        let text = r#"[{"title":"Dentist","kind":"scheduled","date":null,"completed":false,"completedDate":null}]"#;
        assert!(matches!(
            decode(text),
            Err(Error::MalformedRecord { index: 0, .. })
        ));
    }

    #[test]
    fn daily_with_date_is_malformed() {
        let text = r#"[{"title":"Stretch","kind":"daily","date":"2024-05-01","completed":false,"completedDate":null}]"#;
        assert!(matches!(decode(text), Err(Error::MalformedRecord { .. })));
    }

    #[test]
    fn unknown_kind_reports_record_index() {
        let text = r#"[
            {"title":"A","kind":"daily","date":null,"completed":false,"completedDate":null},
            {"title":"B","kind":"weekly","date":null,"completed":false,"completedDate":null}
        ]"#;
        assert!(matches!(
            decode(text),
            Err(Error::MalformedRecord { index: 1, .. })
        ));
    }

    #[test]
    fn invalid_json_is_a_syntax_error() {
        assert!(matches!(decode("{not json"), Err(Error::Json(_))));
        assert!(matches!(decode("{\"title\":\"x\"}"), Err(Error::Json(_))));
    }
}

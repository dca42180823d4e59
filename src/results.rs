use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Which predicate ends a test: a second count or a typed-character threshold.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum_macros::Display, Default,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TestMode {
    #[default]
    Time,
    Words,
}

impl TestMode {
    /// Lenient parse used when reading rows back from storage.
    pub fn from_label(label: &str) -> Self {
        match label {
            "words" => TestMode::Words,
            _ => TestMode::Time,
        }
    }
}

/// Finalized metrics handed to the results collaborator when a test completes.
/// Field names follow the wire format of the results service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestRecord {
    pub user_id: Option<i64>,
    pub wpm: i64,
    pub accuracy: f64,
    pub duration: i64,
    pub errors: i64,
    pub characters_typed: i64,
    pub test_mode: TestMode,
    pub text_used: String,
}

/// A record as returned by the results collaborator: the submitted metrics
/// plus the id and completion timestamp the store assigned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredResult {
    pub id: i64,
    #[serde(flatten)]
    pub record: TestRecord,
    pub completed_at: DateTime<Local>,
}

/// Aggregate statistics over a user's stored results. All zero when the
/// store holds no matching records; averages are rounded to the nearest
/// integer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SummaryStats {
    pub total_tests: i64,
    pub best_wpm: i64,
    pub best_accuracy: f64,
    pub average_wpm: i64,
    pub average_accuracy: i64,
    pub total_time: i64,
}

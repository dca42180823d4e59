use chrono::{DateTime, Local};
use rusqlite::{params, Connection, Result, Row};
use std::path::{Path, PathBuf};

use crate::app_dirs::AppDirs;
use crate::results::{StoredResult, SummaryStats, TestMode, TestRecord};

/// Local results store: the same contract as the remote results service,
/// backed by SQLite. Ids auto-increment and completion timestamps are
/// assigned on insert, mirroring what the remote side would do.
#[derive(Debug)]
pub struct ResultsDb {
    conn: Connection,
}

impl ResultsDb {
    pub fn new() -> Result<Self> {
        let db_path = AppDirs::db_path().unwrap_or_else(|| PathBuf::from("typerate_results.db"));
        Self::at_path(db_path)
    }

    pub fn at_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                rusqlite::Error::SqliteFailure(
                    rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CANTOPEN),
                    Some(format!("Failed to create directory: {}", e)),
                )
            })?;
        }
        Self::open(Connection::open(path)?)
    }

    pub fn in_memory() -> Result<Self> {
        Self::open(Connection::open_in_memory()?)
    }

    fn open(conn: Connection) -> Result<Self> {
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS typing_results (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER,
                wpm INTEGER NOT NULL,
                accuracy REAL NOT NULL,
                duration INTEGER NOT NULL,
                errors INTEGER NOT NULL,
                characters_typed INTEGER NOT NULL,
                test_mode TEXT NOT NULL,
                text_used TEXT NOT NULL,
                completed_at TEXT NOT NULL
            )
            "#,
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_typing_results_user ON typing_results(user_id)",
            [],
        )?;

        Ok(ResultsDb { conn })
    }

    /// Store a finished test and return the record as stored, including the
    /// assigned id and completion timestamp.
    pub fn insert(&self, record: &TestRecord) -> Result<StoredResult> {
        let completed_at = Local::now();
        self.conn.execute(
            r#"
            INSERT INTO typing_results
            (user_id, wpm, accuracy, duration, errors, characters_typed, test_mode, text_used, completed_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                record.user_id,
                record.wpm,
                record.accuracy,
                record.duration,
                record.errors,
                record.characters_typed,
                record.test_mode.to_string(),
                record.text_used,
                completed_at.to_rfc3339(),
            ],
        )?;

        Ok(StoredResult {
            id: self.conn.last_insert_rowid(),
            record: record.clone(),
            completed_at,
        })
    }

    /// Results for one user, or the no-user partition when `user_id` is
    /// absent (records submitted without a user are NOT visible under an id).
    pub fn results_for_user(&self, user_id: Option<i64>) -> Result<Vec<StoredResult>> {
        let sql_base = r#"
            SELECT id, user_id, wpm, accuracy, duration, errors, characters_typed,
                   test_mode, text_used, completed_at
            FROM typing_results
            "#;

        let mut results = Vec::new();
        match user_id {
            Some(id) => {
                let mut stmt = self
                    .conn
                    .prepare(&format!("{sql_base} WHERE user_id = ?1 ORDER BY id"))?;
                let rows = stmt.query_map([id], row_to_stored)?;
                for row in rows {
                    results.push(row?);
                }
            }
            None => {
                let mut stmt = self
                    .conn
                    .prepare(&format!("{sql_base} WHERE user_id IS NULL ORDER BY id"))?;
                let rows = stmt.query_map([], row_to_stored)?;
                for row in rows {
                    results.push(row?);
                }
            }
        }
        Ok(results)
    }

    /// Aggregate statistics for a user's results; all zeros when none exist.
    pub fn summary_for_user(&self, user_id: Option<i64>) -> Result<SummaryStats> {
        let sql_base = r#"
            SELECT COUNT(*),
                   COALESCE(MAX(wpm), 0),
                   COALESCE(MAX(accuracy), 0),
                   COALESCE(AVG(wpm), 0),
                   COALESCE(AVG(accuracy), 0),
                   COALESCE(SUM(duration), 0)
            FROM typing_results
            "#;

        let map = |row: &Row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, f64>(2)?,
                row.get::<_, f64>(3)?,
                row.get::<_, f64>(4)?,
                row.get::<_, i64>(5)?,
            ))
        };

        let (total_tests, best_wpm, best_accuracy, avg_wpm, avg_accuracy, total_time) =
            match user_id {
                Some(id) => self
                    .conn
                    .query_row(&format!("{sql_base} WHERE user_id = ?1"), [id], map)?,
                None => self
                    .conn
                    .query_row(&format!("{sql_base} WHERE user_id IS NULL"), [], map)?,
            };

        Ok(SummaryStats {
            total_tests,
            best_wpm,
            best_accuracy,
            average_wpm: avg_wpm.round() as i64,
            average_accuracy: avg_accuracy.round() as i64,
            total_time,
        })
    }
}

fn row_to_stored(row: &Row) -> Result<StoredResult> {
    let completed_at_str: String = row.get(9)?;
    let completed_at = DateTime::parse_from_rfc3339(&completed_at_str)
        .map_err(|_| {
            rusqlite::Error::InvalidColumnType(
                9,
                "completed_at".to_string(),
                rusqlite::types::Type::Text,
            )
        })?
        .with_timezone(&Local);

    Ok(StoredResult {
        id: row.get(0)?,
        record: TestRecord {
            user_id: row.get(1)?,
            wpm: row.get(2)?,
            accuracy: row.get(3)?,
            duration: row.get(4)?,
            errors: row.get(5)?,
            characters_typed: row.get(6)?,
            test_mode: TestMode::from_label(&row.get::<_, String>(7)?),
            text_used: row.get(8)?,
        },
        completed_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(user_id: Option<i64>, wpm: i64, accuracy: f64, duration: i64) -> TestRecord {
        TestRecord {
            user_id,
            wpm,
            accuracy,
            duration,
            errors: 2,
            characters_typed: wpm * 5,
            test_mode: TestMode::Time,
            text_used: "practice text".to_string(),
        }
    }

    #[test]
    fn test_insert_assigns_increasing_ids_and_timestamp() {
        let db = ResultsDb::in_memory().unwrap();

        let first = db.insert(&record(None, 40, 95.0, 30)).unwrap();
        let second = db.insert(&record(None, 50, 90.0, 30)).unwrap();

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        assert!(second.completed_at >= first.completed_at);
    }

    #[test]
    fn test_insert_roundtrips_record_fields() {
        let db = ResultsDb::in_memory().unwrap();
        let submitted = TestRecord {
            test_mode: TestMode::Words,
            user_id: Some(3),
            ..record(Some(3), 71, 98.0, 12)
        };

        db.insert(&submitted).unwrap();
        let rows = db.results_for_user(Some(3)).unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].record, submitted);
    }

    #[test]
    fn test_user_filter_separates_partitions() {
        let db = ResultsDb::in_memory().unwrap();
        db.insert(&record(None, 40, 95.0, 30)).unwrap();
        db.insert(&record(Some(7), 55, 92.0, 60)).unwrap();
        db.insert(&record(None, 45, 97.0, 30)).unwrap();

        let anonymous = db.results_for_user(None).unwrap();
        let user = db.results_for_user(Some(7)).unwrap();

        assert_eq!(anonymous.len(), 2);
        assert_eq!(user.len(), 1);
        assert_eq!(user[0].record.wpm, 55);
        assert!(db.results_for_user(Some(99)).unwrap().is_empty());
    }

    #[test]
    fn test_summary_over_empty_store_is_all_zero() {
        let db = ResultsDb::in_memory().unwrap();
        let summary = db.summary_for_user(None).unwrap();
        assert_eq!(summary, SummaryStats::default());
    }

    #[test]
    fn test_summary_aggregates() {
        let db = ResultsDb::in_memory().unwrap();
        db.insert(&record(None, 40, 90.0, 30)).unwrap();
        db.insert(&record(None, 50, 96.0, 45)).unwrap();

        let summary = db.summary_for_user(None).unwrap();

        assert_eq!(summary.total_tests, 2);
        assert_eq!(summary.best_wpm, 50);
        assert_eq!(summary.best_accuracy, 96.0);
        assert_eq!(summary.average_wpm, 45);
        assert_eq!(summary.average_accuracy, 93);
        assert_eq!(summary.total_time, 75);
    }

    #[test]
    fn test_summary_averages_round_to_nearest() {
        let db = ResultsDb::in_memory().unwrap();
        db.insert(&record(None, 10, 90.0, 10)).unwrap();
        db.insert(&record(None, 15, 91.0, 10)).unwrap();

        let summary = db.summary_for_user(None).unwrap();

        // 12.5 and 90.5 both round half away from zero
        assert_eq!(summary.average_wpm, 13);
        assert_eq!(summary.average_accuracy, 91);
    }

    #[test]
    fn test_summary_ignores_other_partition() {
        let db = ResultsDb::in_memory().unwrap();
        db.insert(&record(Some(1), 100, 100.0, 10)).unwrap();

        let summary = db.summary_for_user(None).unwrap();
        assert_eq!(summary.total_tests, 0);
        assert_eq!(summary.best_wpm, 0);
    }

    #[test]
    fn test_word_mode_label_roundtrips() {
        let db = ResultsDb::in_memory().unwrap();
        let submitted = TestRecord {
            test_mode: TestMode::Words,
            ..record(None, 30, 88.0, 20)
        };
        db.insert(&submitted).unwrap();

        let rows = db.results_for_user(None).unwrap();
        assert_eq!(rows[0].record.test_mode, TestMode::Words);
    }
}

use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde_json::Value;
use std::sync::Mutex;

use crate::results::{StoredResult, SummaryStats, TestRecord};
use crate::storage::ResultsDb;

/// Why a backend operation failed. Rejections and server failures get the
/// same user-visible treatment (a failed-save notification); the variants
/// exist so logs can tell them apart.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("result rejected: {message}")]
    Rejected { message: String, details: Vec<String> },
    #[error("server error (status {status})")]
    Server { status: u16 },
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
    #[error(transparent)]
    Storage(#[from] rusqlite::Error),
}

/// The results collaborator as seen by the rest of the app: store a
/// finished test, list stored results, aggregate them. Implemented over
/// HTTP and over the local store.
pub trait ResultsBackend: Send + Sync {
    fn submit(&self, record: &TestRecord) -> Result<StoredResult, BackendError>;
    fn recent(&self, user_id: Option<i64>) -> Result<Vec<StoredResult>, BackendError>;
    fn summary(&self, user_id: Option<i64>) -> Result<SummaryStats, BackendError>;
}

/// Client for the remote results service.
pub struct HttpResultsClient {
    client: Client,
    base_url: String,
}

impl HttpResultsClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self, path: &str, user_id: Option<i64>) -> String {
        match user_id {
            Some(id) => format!("{}{}?userId={}", self.base_url, path, id),
            None => format!("{}{}", self.base_url, path),
        }
    }
}

impl ResultsBackend for HttpResultsClient {
    fn submit(&self, record: &TestRecord) -> Result<StoredResult, BackendError> {
        let response = self
            .client
            .post(format!("{}/results", self.base_url))
            .json(record)
            .send()?;

        let status = response.status();
        if status == StatusCode::BAD_REQUEST {
            let body: Value = response.json().unwrap_or_default();
            let message = body["message"]
                .as_str()
                .unwrap_or("invalid data")
                .to_string();
            let details = body["errors"]
                .as_array()
                .map(|errors| errors.iter().map(|e| e.to_string()).collect())
                .unwrap_or_default();
            return Err(BackendError::Rejected { message, details });
        }
        if !status.is_success() {
            return Err(BackendError::Server {
                status: status.as_u16(),
            });
        }

        Ok(response.json()?)
    }

    fn recent(&self, user_id: Option<i64>) -> Result<Vec<StoredResult>, BackendError> {
        let response = self
            .client
            .get(self.endpoint("/results", user_id))
            .send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::Server {
                status: status.as_u16(),
            });
        }
        Ok(response.json()?)
    }

    fn summary(&self, user_id: Option<i64>) -> Result<SummaryStats, BackendError> {
        let response = self.client.get(self.endpoint("/stats", user_id)).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::Server {
                status: status.as_u16(),
            });
        }
        Ok(response.json()?)
    }
}

/// Results collaborator backed by the local store. Used when no backend
/// url is configured; the Mutex lets the submission worker thread share it
/// with the UI loop.
pub struct LocalResults {
    db: Mutex<ResultsDb>,
}

impl LocalResults {
    pub fn new(db: ResultsDb) -> Self {
        Self { db: Mutex::new(db) }
    }

    fn db(&self) -> std::sync::MutexGuard<'_, ResultsDb> {
        self.db.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl ResultsBackend for LocalResults {
    fn submit(&self, record: &TestRecord) -> Result<StoredResult, BackendError> {
        Ok(self.db().insert(record)?)
    }

    fn recent(&self, user_id: Option<i64>) -> Result<Vec<StoredResult>, BackendError> {
        Ok(self.db().results_for_user(user_id)?)
    }

    fn summary(&self, user_id: Option<i64>) -> Result<SummaryStats, BackendError> {
        Ok(self.db().summary_for_user(user_id)?)
    }
}

/// What the submission worker reports back to the UI loop. Failure is a
/// notification only; the completed session is untouched either way.
#[derive(Debug, Clone)]
pub enum SubmitOutcome {
    Saved(StoredResult),
    Failed(String),
}

impl SubmitOutcome {
    pub fn from_result(result: Result<StoredResult, BackendError>) -> Self {
        match result {
            Ok(stored) => SubmitOutcome::Saved(stored),
            Err(err) => SubmitOutcome::Failed(err.to_string()),
        }
    }
}

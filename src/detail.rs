use log::debug;

use crate::api::JobsApi;
use crate::error::ApiError;
use crate::models::Job;
use crate::session::Session;

/// Fetch one job. A missing job is `Ok(None)` rather than an error.
/// Always hits the server: the description and bookmark flag may have
/// changed since the list was loaded.
pub async fn load(
    api: &dyn JobsApi,
    session: &Session,
    job_id: &str,
) -> Result<Option<Job>, ApiError> {
    resolve(api.job(job_id, session.token()).await)
}

fn resolve(outcome: Result<Job, ApiError>) -> Result<Option<Job>, ApiError> {
    match outcome {
        Ok(job) => Ok(Some(job)),
        Err(ApiError::NotFound(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailTicket {
    seq: u64,
    pub job_id: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DetailOutcome {
    Loaded(Job),
    NotFound,
    Failed(ApiError),
    /// The user opened another job (or closed the view) in the meantime.
    Stale,
}

/// Tracks which detail request is the one on screen.
#[derive(Debug, Default)]
pub struct JobDetailLoader {
    seq: u64,
    current: Option<u64>,
}

impl JobDetailLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&mut self, job_id: &str) -> DetailTicket {
        self.seq += 1;
        self.current = Some(self.seq);
        DetailTicket {
            seq: self.seq,
            job_id: job_id.to_string(),
        }
    }

    pub fn is_loading(&self) -> bool {
        self.current.is_some()
    }

    /// Detail view closed; whatever is in flight no longer matters.
    pub fn cancel(&mut self) {
        self.current = None;
    }

    pub fn finish(
        &mut self,
        ticket: &DetailTicket,
        outcome: Result<Job, ApiError>,
    ) -> DetailOutcome {
        if self.current != Some(ticket.seq) {
            debug!("discarding detail response for {}", ticket.job_id);
            return DetailOutcome::Stale;
        }
        self.current = None;

        match resolve(outcome) {
            Ok(Some(job)) => DetailOutcome::Loaded(job),
            Ok(None) => DetailOutcome::NotFound,
            Err(e) => DetailOutcome::Failed(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::fake::FakeApi;
    use crate::models::{User, sample_job};

    #[tokio::test]
    async fn test_load_found_and_missing() {
        let api = FakeApi::new(vec![sample_job("1")]);
        let job = load(&api, &Session::anonymous(), "1").await.unwrap().unwrap();
        assert_eq!(job.id, "1");
        assert_eq!(job.is_bookmarked, None);

        assert_eq!(load(&api, &Session::anonymous(), "404").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_load_refetches_every_time_with_token() {
        let api = FakeApi::new(vec![sample_job("1")]);
        let session = Session::authenticated(
            User {
                id: "u1".to_string(),
                email: "a@example.com".to_string(),
            },
            "tok".to_string(),
        );

        let before = load(&api, &session, "1").await.unwrap().unwrap();
        assert_eq!(before.is_bookmarked, Some(false));
        api.toggle_bookmark("1", "tok").await.unwrap();
        let after = load(&api, &session, "1").await.unwrap().unwrap();
        assert_eq!(after.is_bookmarked, Some(true));
        assert_eq!(api.calls().iter().filter(|c| c.starts_with("job")).count(), 2);
    }

    #[test]
    fn test_newer_request_supersedes_older() {
        let mut loader = JobDetailLoader::new();
        let first = loader.begin("1");
        let second = loader.begin("2");

        assert_eq!(loader.finish(&first, Ok(sample_job("1"))), DetailOutcome::Stale);
        assert!(loader.is_loading());
        assert_eq!(
            loader.finish(&second, Ok(sample_job("2"))),
            DetailOutcome::Loaded(sample_job("2"))
        );
        assert!(!loader.is_loading());
    }

    #[test]
    fn test_cancel_discards_in_flight() {
        let mut loader = JobDetailLoader::new();
        let ticket = loader.begin("1");
        loader.cancel();
        assert_eq!(
            loader.finish(&ticket, Err(ApiError::Network("reset".to_string()))),
            DetailOutcome::Stale
        );
    }

    #[test]
    fn test_finish_maps_not_found_and_errors() {
        let mut loader = JobDetailLoader::new();
        let ticket = loader.begin("1");
        assert_eq!(
            loader.finish(&ticket, Err(ApiError::NotFound("1".to_string()))),
            DetailOutcome::NotFound
        );

        let ticket = loader.begin("1");
        let err = ApiError::Status {
            status: 500,
            message: "boom".to_string(),
        };
        assert_eq!(loader.finish(&ticket, Err(err.clone())), DetailOutcome::Failed(err));
    }
}

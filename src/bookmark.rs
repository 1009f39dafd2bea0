use std::collections::HashSet;

use log::debug;

use crate::api::JobsApi;
use crate::error::{ApiError, BookmarkError};
use crate::models::Job;
use crate::optimistic::Optimistic;
use crate::session::Session;

/// A bookmark flip that has been shown locally and still needs the server.
#[derive(Debug, Clone)]
pub struct PendingToggle {
    job_id: String,
    token: String,
    change: Optimistic<Option<bool>>,
}

impl PendingToggle {
    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// The flag the user now sees.
    pub fn bookmarked(&self) -> bool {
        self.change.applied().unwrap_or(false)
    }

    /// Show the optimistic flag on another copy of the same job.
    pub fn mirror(&self, job: &mut Job) {
        if job.id == self.job_id {
            self.change.mirror(&mut job.is_bookmarked);
        }
    }
}

/// Optimistic bookmark toggles, at most one in flight per job.
#[derive(Debug, Default)]
pub struct BookmarkCoordinator {
    in_flight: HashSet<String>,
}

impl BookmarkCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_in_flight(&self, job_id: &str) -> bool {
        self.in_flight.contains(job_id)
    }

    /// Flip the flag on `job` right away. Fails without touching anything
    /// when nobody is signed in, the current flag is unknown, or a toggle
    /// for this job is still pending.
    pub fn begin(
        &mut self,
        session: &Session,
        job: &mut Job,
    ) -> Result<PendingToggle, BookmarkError> {
        let Some(token) = session.token() else {
            return Err(BookmarkError::SignInRequired);
        };
        let Some(current) = job.is_bookmarked else {
            return Err(BookmarkError::Unknown(job.id.clone()));
        };
        if self.in_flight.contains(&job.id) {
            return Err(BookmarkError::InFlight(job.id.clone()));
        }

        let next = Some(!current);
        let change = Optimistic::apply(&mut job.is_bookmarked, next);
        self.in_flight.insert(job.id.clone());
        debug!("bookmark {} -> {:?} (pending)", job.id, next);

        Ok(PendingToggle {
            job_id: job.id.clone(),
            token: token.to_string(),
            change,
        })
    }

    /// Apply the server's answer. On failure every given copy of the job
    /// is put back the way it was.
    pub fn settle<'j>(
        &mut self,
        pending: PendingToggle,
        outcome: Result<(), ApiError>,
        views: impl IntoIterator<Item = &'j mut Job>,
    ) -> Result<bool, BookmarkError> {
        self.in_flight.remove(&pending.job_id);

        match outcome {
            Ok(()) => Ok(pending.change.commit().unwrap_or(false)),
            Err(e) => {
                debug!(
                    "bookmark {} rolled back to {:?}: {}",
                    pending.job_id,
                    pending.change.previous(),
                    e
                );
                for view in views {
                    if view.id == pending.job_id {
                        pending.change.clone().rollback(&mut view.is_bookmarked);
                    }
                }
                Err(BookmarkError::Remote(e))
            }
        }
    }

    /// Toggle end to end. Returns the new bookmark state.
    pub async fn toggle(
        &mut self,
        session: &Session,
        api: &dyn JobsApi,
        job: &mut Job,
    ) -> Result<bool, BookmarkError> {
        let pending = self.begin(session, job)?;
        let outcome = api.toggle_bookmark(pending.job_id(), pending.token()).await;
        self.settle(pending, outcome, Some(job))
    }
}

/// The signed-in user's bookmarked jobs, or `None` when nobody is signed in.
pub async fn saved_jobs(
    session: &Session,
    api: &dyn JobsApi,
) -> Result<Option<Vec<Job>>, ApiError> {
    let Some(token) = session.token() else {
        return Ok(None);
    };
    let mut jobs = api.bookmarks(token).await?;
    for job in &mut jobs {
        job.is_bookmarked = Some(true);
    }
    Ok(Some(jobs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::fake::FakeApi;
    use crate::models::{User, sample_job};

    fn known(id: &str, bookmarked: bool) -> Job {
        let mut job = sample_job(id);
        job.is_bookmarked = Some(bookmarked);
        job
    }

    fn signed_in() -> Session {
        Session::authenticated(
            User {
                id: "u1".to_string(),
                email: "a@example.com".to_string(),
            },
            "tok".to_string(),
        )
    }

    #[tokio::test]
    async fn test_toggle_without_session_never_calls_api() {
        let api = FakeApi::new(vec![sample_job("1")]);
        let mut coordinator = BookmarkCoordinator::new();
        let mut job = sample_job("1");

        let err = coordinator
            .toggle(&Session::anonymous(), &api, &mut job)
            .await
            .unwrap_err();
        assert_eq!(err, BookmarkError::SignInRequired);
        assert_eq!(err.to_string(), "sign in to bookmark jobs");
        assert!(api.calls().is_empty());
        assert_eq!(job.is_bookmarked, None);
    }

    #[tokio::test]
    async fn test_toggle_success_flips_and_sends_token() {
        let api = FakeApi::new(vec![sample_job("1")]);
        let mut coordinator = BookmarkCoordinator::new();
        let mut job = known("1", false);

        let now = coordinator.toggle(&signed_in(), &api, &mut job).await.unwrap();
        assert!(now);
        assert_eq!(job.is_bookmarked, Some(true));
        assert_eq!(api.calls(), vec!["toggle 1 tok"]);

        let now = coordinator.toggle(&signed_in(), &api, &mut job).await.unwrap();
        assert!(!now);
        assert_eq!(job.is_bookmarked, Some(false));
        assert!(!coordinator.is_in_flight("1"));
    }

    #[tokio::test]
    async fn test_toggle_failure_reverts() {
        let api = FakeApi::new(vec![sample_job("1")]).failing_toggles();
        let mut coordinator = BookmarkCoordinator::new();
        let mut job = sample_job("1");
        job.is_bookmarked = Some(true);

        let err = coordinator.toggle(&signed_in(), &api, &mut job).await.unwrap_err();
        assert!(matches!(err, BookmarkError::Remote(ApiError::Network(_))));
        assert_eq!(job.is_bookmarked, Some(true));
        assert!(!coordinator.is_in_flight("1"));
    }

    #[test]
    fn test_begin_is_optimistic_and_blocks_second_toggle() {
        let mut coordinator = BookmarkCoordinator::new();
        let mut job = known("1", false);

        let pending = coordinator.begin(&signed_in(), &mut job).unwrap();
        assert_eq!(job.is_bookmarked, Some(true));
        assert!(pending.bookmarked());
        assert!(coordinator.is_in_flight("1"));

        let second = coordinator.begin(&signed_in(), &mut job).unwrap_err();
        assert_eq!(second, BookmarkError::InFlight("1".to_string()));
        assert_eq!(job.is_bookmarked, Some(true));

        // other jobs are independent
        let mut other = known("2", false);
        assert!(coordinator.begin(&signed_in(), &mut other).is_ok());

        coordinator.settle(pending, Ok(()), Some(&mut job)).unwrap();
        assert!(!coordinator.is_in_flight("1"));
        assert_eq!(job.is_bookmarked, Some(true));
    }

    #[test]
    fn test_settle_failure_reverts_every_view() {
        let mut coordinator = BookmarkCoordinator::new();
        let mut list_copy = known("1", false);
        let mut detail_copy = known("1", false);
        let mut unrelated = sample_job("9");
        unrelated.is_bookmarked = Some(true);

        let pending = coordinator.begin(&signed_in(), &mut list_copy).unwrap();
        pending.mirror(&mut detail_copy);
        pending.mirror(&mut unrelated);
        assert_eq!(detail_copy.is_bookmarked, Some(true));

        let result = coordinator.settle(
            pending,
            Err(ApiError::Network("timeout".to_string())),
            [&mut list_copy, &mut detail_copy, &mut unrelated],
        );
        assert!(matches!(result, Err(BookmarkError::Remote(_))));
        assert_eq!(list_copy.is_bookmarked, Some(false));
        assert_eq!(detail_copy.is_bookmarked, Some(false));
        assert_eq!(unrelated.is_bookmarked, Some(true));
    }

    #[test]
    fn test_unknown_flag_is_not_guessed() {
        let mut coordinator = BookmarkCoordinator::new();
        let mut row = sample_job("1");

        let err = coordinator.begin(&signed_in(), &mut row).unwrap_err();
        assert_eq!(err, BookmarkError::Unknown("1".to_string()));
        assert_eq!(row.is_bookmarked, None);
        assert!(!coordinator.is_in_flight("1"));
    }

    #[tokio::test]
    async fn test_saved_jobs_follow_toggles() {
        let api = FakeApi::new(vec![sample_job("1"), sample_job("2"), sample_job("3")])
            .with_bookmark("3");
        assert_eq!(saved_jobs(&Session::anonymous(), &api).await.unwrap(), None);
        assert!(api.calls().is_empty());

        let mut coordinator = BookmarkCoordinator::new();
        let mut job = known("1", false);
        coordinator.toggle(&signed_in(), &api, &mut job).await.unwrap();

        let saved = saved_jobs(&signed_in(), &api).await.unwrap().unwrap();
        let ids: Vec<&str> = saved.iter().map(|j| j.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "3"]);
        assert!(saved.iter().all(|j| j.is_bookmarked == Some(true)));
        assert_eq!(api.calls().last().unwrap(), "bookmarks tok");
    }
}

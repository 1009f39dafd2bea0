//! Search/filter/pagination state machine.
//!
//! The controller never touches the network. Every transition that needs a
//! page returns a [`FetchTicket`]; the caller runs it and hands the outcome
//! back to [`SearchController::complete`]. Tickets carry the query epoch they
//! were issued under, so answers to superseded queries are dropped.

use log::debug;

use crate::api::JobsApi;
use crate::error::ApiError;
use crate::models::{Job, JobsPage};
use crate::query::{Filter, Platform, QueryState, SearchParams};
use crate::results::ResultAccumulator;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    /// No search performed yet.
    Idle,
    Loading { page: u32 },
    Ready,
    Failed { page: u32, error: ApiError },
}

/// A page request issued by the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    pub epoch: u64,
    pub page: u32,
    pub params: SearchParams,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Applied,
    Failed,
    /// The ticket belonged to a superseded query or page; nothing changed.
    Stale,
}

#[derive(Debug)]
pub struct SearchController {
    query: QueryState,
    searched: bool,
    epoch: u64,
    phase: Phase,
    results: ResultAccumulator,
    page_size: Option<u32>,
}

impl SearchController {
    pub fn new(page_size: Option<u32>) -> Self {
        Self {
            query: QueryState::default(),
            searched: false,
            epoch: 0,
            phase: Phase::Idle,
            results: ResultAccumulator::new(),
            page_size,
        }
    }

    pub fn query(&self) -> &QueryState {
        &self.query
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn results(&self) -> &ResultAccumulator {
        &self.results
    }

    pub fn jobs(&self) -> &[Job] {
        self.results.jobs()
    }

    pub fn job_mut(&mut self, id: &str) -> Option<&mut Job> {
        self.results.job_mut(id)
    }

    pub fn search_performed(&self) -> bool {
        self.searched
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.phase, Phase::Loading { .. })
    }

    /// "Load more" is offered only when idle on a page that isn't the last.
    pub fn can_load_more(&self) -> bool {
        self.phase == Phase::Ready && self.results.has_more()
    }

    /// New top-level search. Always starts a fresh epoch, even for the same
    /// text, and opens the search-performed gate.
    pub fn set_search(&mut self, title: &str, location: &str) -> Option<FetchTicket> {
        self.searched = true;
        let next = self.query.with_search(title, location);
        self.start_epoch(next)
    }

    pub fn set_filter(&mut self, filter: Filter) -> Option<FetchTicket> {
        let next = self.query.with_filter(filter);
        self.on_query_change(next)
    }

    /// Browse a platform without search text. Opens the gate.
    pub fn set_platform_shortcut(&mut self, platform: Platform) -> Option<FetchTicket> {
        self.searched = true;
        let next = self.query.with_platform_shortcut(platform);
        self.start_epoch(next)
    }

    pub fn clear_all_filters(&mut self) -> Option<FetchTicket> {
        let next = self.query.with_filters_cleared();
        self.on_query_change(next)
    }

    /// Swap in a new query. No-op when nothing changed; otherwise the
    /// accumulated results are dropped and page 1 is requested (once a
    /// search has been performed).
    pub fn on_query_change(&mut self, next: QueryState) -> Option<FetchTicket> {
        if next == self.query {
            return None;
        }
        self.start_epoch(next)
    }

    pub fn load_more(&mut self) -> Option<FetchTicket> {
        if !self.can_load_more() {
            debug!("load more ignored in phase {:?}", self.phase);
            return None;
        }
        let page = self.results.current_page() + 1;
        Some(self.issue(page))
    }

    /// Re-request the page that failed, within the same epoch.
    pub fn retry(&mut self) -> Option<FetchTicket> {
        match self.phase {
            Phase::Failed { page, .. } => Some(self.issue(page)),
            _ => None,
        }
    }

    pub fn complete(
        &mut self,
        ticket: &FetchTicket,
        outcome: Result<JobsPage, ApiError>,
    ) -> Completion {
        let in_flight = self.phase == Phase::Loading { page: ticket.page };
        if ticket.epoch != self.epoch || !in_flight {
            debug!(
                "discarding page {} for epoch {} (current epoch {})",
                ticket.page, ticket.epoch, self.epoch
            );
            return Completion::Stale;
        }

        match outcome {
            Ok(page) => {
                debug!(
                    "page {}/{} arrived with {} jobs",
                    page.current_page,
                    page.total_pages,
                    page.jobs.len()
                );
                self.results.append_page(page);
                self.phase = Phase::Ready;
                Completion::Applied
            }
            Err(error) => {
                // A failed first page must not leave an earlier query's jobs on screen
                if ticket.page <= 1 {
                    self.results.reset();
                }
                self.phase = Phase::Failed {
                    page: ticket.page,
                    error,
                };
                Completion::Failed
            }
        }
    }

    /// Run `first` and keep loading more until `pages` pages have arrived
    /// or the results run out. Returns the number of pages fetched.
    pub async fn fetch_pages(
        &mut self,
        api: &dyn JobsApi,
        first: Option<FetchTicket>,
        pages: u32,
    ) -> Result<u32, ApiError> {
        let mut next = first;
        let mut fetched = 0;
        while let Some(ticket) = next.take() {
            let outcome = api.search_jobs(&ticket.params).await;
            if self.complete(&ticket, outcome) == Completion::Failed {
                if let Phase::Failed { error, .. } = &self.phase {
                    return Err(error.clone());
                }
            }
            fetched += 1;
            if fetched < pages {
                next = self.load_more();
            }
        }
        Ok(fetched)
    }

    fn start_epoch(&mut self, next: QueryState) -> Option<FetchTicket> {
        self.query = next;
        self.epoch += 1;
        self.results.reset();

        if !self.searched {
            self.phase = Phase::Idle;
            return None;
        }
        Some(self.issue(1))
    }

    fn issue(&mut self, page: u32) -> FetchTicket {
        self.phase = Phase::Loading { page };
        debug!("requesting page {} for epoch {}", page, self.epoch);
        FetchTicket {
            epoch: self.epoch,
            page,
            params: self.query.to_params(page, self.page_size),
        }
    }
}

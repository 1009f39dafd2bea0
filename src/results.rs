use crate::models::{Job, JobsPage};

/// Jobs fetched so far for the current query, in page order.
#[derive(Debug, Clone, Default)]
pub struct ResultAccumulator {
    jobs: Vec<Job>,
    current_page: u32,
    total_pages: u32,
    total_jobs: u64,
}

impl ResultAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.jobs.clear();
        self.current_page = 0;
        self.total_pages = 0;
        self.total_jobs = 0;
    }

    /// Page 1 replaces the list, any later page is appended in arrival order.
    /// Totals always come from the latest page.
    pub fn append_page(&mut self, page: JobsPage) {
        if page.current_page <= 1 {
            self.jobs = page.jobs;
        } else {
            self.jobs.extend(page.jobs);
        }
        self.current_page = page.current_page;
        self.total_pages = page.total_pages;
        self.total_jobs = page.total_jobs;
    }

    pub fn has_more(&self) -> bool {
        self.current_page < self.total_pages
    }

    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    pub fn job_mut(&mut self, id: &str) -> Option<&mut Job> {
        self.jobs.iter_mut().find(|j| j.id == id)
    }

    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    pub fn total_pages(&self) -> u32 {
        self.total_pages
    }

    pub fn total_jobs(&self) -> u64 {
        self.total_jobs
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

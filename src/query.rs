use std::fmt;
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} '{value}' (expected one of: {expected})")]
pub struct ParseFilterError {
    kind: &'static str,
    value: String,
    expected: String,
}

impl ParseFilterError {
    fn new(kind: &'static str, value: &str, expected: &[&str]) -> Self {
        Self {
            kind,
            value: value.to_string(),
            expected: expected.join(", "),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Platform {
    #[default]
    All,
    Indeed,
    LinkedIn,
    Naukri,
}

impl Platform {
    pub const VALUES: [Platform; 4] = [
        Platform::All,
        Platform::Indeed,
        Platform::LinkedIn,
        Platform::Naukri,
    ];

    /// Value sent as `sourcePlatform`; `None` means no constraint.
    pub fn as_param(self) -> Option<&'static str> {
        match self {
            Platform::All => None,
            Platform::Indeed => Some("Indeed"),
            Platform::LinkedIn => Some("LinkedIn"),
            Platform::Naukri => Some("Naukri"),
        }
    }

    pub fn next(self) -> Self {
        cycle(&Self::VALUES, self)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_param().unwrap_or("all"))
    }
}

impl FromStr for Platform {
    type Err = ParseFilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "all" => Ok(Platform::All),
            "indeed" => Ok(Platform::Indeed),
            "linkedin" => Ok(Platform::LinkedIn),
            "naukri" => Ok(Platform::Naukri),
            _ => Err(ParseFilterError::new(
                "platform",
                s,
                &["all", "indeed", "linkedin", "naukri"],
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum JobType {
    #[default]
    All,
    FullTime,
    PartTime,
    Contract,
    Internship,
}

impl JobType {
    pub const VALUES: [JobType; 5] = [
        JobType::All,
        JobType::FullTime,
        JobType::PartTime,
        JobType::Contract,
        JobType::Internship,
    ];

    pub fn as_param(self) -> Option<&'static str> {
        match self {
            JobType::All => None,
            JobType::FullTime => Some("full-time"),
            JobType::PartTime => Some("part-time"),
            JobType::Contract => Some("contract"),
            JobType::Internship => Some("internship"),
        }
    }

    pub fn next(self) -> Self {
        cycle(&Self::VALUES, self)
    }
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_param().unwrap_or("all"))
    }
}

impl FromStr for JobType {
    type Err = ParseFilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(' ', "-").as_str() {
            "" | "all" => Ok(JobType::All),
            "full-time" | "fulltime" => Ok(JobType::FullTime),
            "part-time" | "parttime" => Ok(JobType::PartTime),
            "contract" => Ok(JobType::Contract),
            "internship" => Ok(JobType::Internship),
            _ => Err(ParseFilterError::new(
                "job type",
                s,
                &["all", "full-time", "part-time", "contract", "internship"],
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ExperienceLevel {
    #[default]
    All,
    Entry,
    Mid,
    Senior,
}

impl ExperienceLevel {
    pub const VALUES: [ExperienceLevel; 4] = [
        ExperienceLevel::All,
        ExperienceLevel::Entry,
        ExperienceLevel::Mid,
        ExperienceLevel::Senior,
    ];

    // The backend stores LinkedIn's wording for these levels
    pub fn as_param(self) -> Option<&'static str> {
        match self {
            ExperienceLevel::All => None,
            ExperienceLevel::Entry => Some("entry level"),
            ExperienceLevel::Mid => Some("mid-senior level"),
            ExperienceLevel::Senior => Some("senior"),
        }
    }

    pub fn next(self) -> Self {
        cycle(&Self::VALUES, self)
    }
}

impl fmt::Display for ExperienceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_param().unwrap_or("all"))
    }
}

impl FromStr for ExperienceLevel {
    type Err = ParseFilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "all" => Ok(ExperienceLevel::All),
            "entry" | "entry level" | "entry-level" => Ok(ExperienceLevel::Entry),
            "mid" | "mid-senior" | "mid-senior level" => Ok(ExperienceLevel::Mid),
            "senior" => Ok(ExperienceLevel::Senior),
            _ => Err(ParseFilterError::new(
                "experience level",
                s,
                &["all", "entry", "mid", "senior"],
            )),
        }
    }
}

fn cycle<T: Copy + PartialEq>(values: &[T], current: T) -> T {
    let idx = values.iter().position(|v| *v == current).unwrap_or(0);
    values[(idx + 1) % values.len()]
}

/// A single filter selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filter {
    Platform(Platform),
    JobType(JobType),
    ExperienceLevel(ExperienceLevel),
}

/// Search text plus filter selections. Every change produces a new value;
/// the controller swaps it in whole.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryState {
    pub title: String,
    pub location: String,
    pub platform: Platform,
    pub job_type: JobType,
    pub experience_level: ExperienceLevel,
}

impl QueryState {
    pub fn with_search(&self, title: &str, location: &str) -> Self {
        Self {
            title: title.trim().to_string(),
            location: location.trim().to_string(),
            ..self.clone()
        }
    }

    pub fn with_filter(&self, filter: Filter) -> Self {
        let mut next = self.clone();
        match filter {
            Filter::Platform(p) => next.platform = p,
            Filter::JobType(t) => next.job_type = t,
            Filter::ExperienceLevel(e) => next.experience_level = e,
        }
        next
    }

    /// Browse-by-platform: the platform filter is set and search text dropped.
    pub fn with_platform_shortcut(&self, platform: Platform) -> Self {
        Self {
            title: String::new(),
            location: String::new(),
            platform,
            ..self.clone()
        }
    }

    pub fn with_filters_cleared(&self) -> Self {
        Self {
            title: self.title.clone(),
            location: self.location.clone(),
            ..Self::default()
        }
    }

    pub fn has_active_filters(&self) -> bool {
        self.platform != Platform::All
            || self.job_type != JobType::All
            || self.experience_level != ExperienceLevel::All
    }

    pub fn to_params(&self, page: u32, limit: Option<u32>) -> SearchParams {
        SearchParams {
            query: self.clone(),
            page,
            limit,
        }
    }
}

/// Everything needed to request one page for a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchParams {
    pub query: QueryState,
    pub page: u32,
    pub limit: Option<u32>,
}

impl SearchParams {
    /// Query-string pairs for `GET /jobs`. Empty text and "all" filters
    /// are left out entirely.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        let q = &self.query;

        if !q.title.is_empty() {
            pairs.push(("search", q.title.clone()));
        }
        if !q.location.is_empty() {
            pairs.push(("location", q.location.clone()));
        }
        if let Some(p) = q.platform.as_param() {
            pairs.push(("sourcePlatform", p.to_string()));
        }
        if let Some(t) = q.job_type.as_param() {
            pairs.push(("jobType", t.to_string()));
        }
        if let Some(e) = q.experience_level.as_param() {
            pairs.push(("experienceLevel", e.to_string()));
        }
        pairs.push(("page", self.page.to_string()));
        if let Some(limit) = self.limit {
            pairs.push(("limit", limit.to_string()));
        }
        pairs
    }
}

use chrono::{DateTime, Utc};
use scraper::Html;
use scraper::node::Node;
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub title: String,
    #[serde(rename = "companyName", alias = "company")]
    pub company: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub description_html: String,
    #[serde(default)]
    pub job_type: Option<String>,
    #[serde(default)]
    pub experience_level: Option<String>,
    #[serde(default)]
    pub salary: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub apply_url: String,
    #[serde(default)]
    pub source_url: Option<String>,
    #[serde(default)]
    pub source_platform: Option<String>, // "Indeed", "LinkedIn", "Naukri"
    #[serde(default)]
    pub company_logo_url: Option<String>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub posted_on: Option<DateTime<Utc>>,
    // Only populated when the request carried a bearer token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_bookmarked: Option<bool>,
}

impl Job {
    /// Plain-text description, falling back to the rendered HTML when the
    /// plain field is empty.
    pub fn plain_description(&self) -> String {
        if !self.description.trim().is_empty() {
            return self.description.clone();
        }
        html_to_text(&self.description_html)
    }

    pub fn is_remote(&self) -> bool {
        self.location.to_lowercase().contains("remote")
    }

    pub fn is_bookmarked(&self) -> bool {
        self.is_bookmarked.unwrap_or(false)
    }
}

/// One server page of search results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobsPage {
    pub jobs: Vec<Job>,
    pub current_page: u32,
    pub total_pages: u32,
    pub total_jobs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(alias = "_id")]
    pub id: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    pub user: User,
    pub token: String,
}

// Backends have been seen sending "" or non-RFC3339 strings here; treat those as absent
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|s| {
        DateTime::parse_from_rfc3339(s.trim())
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }))
}

const BLOCK_ELEMENTS: &[&str] = &[
    "p", "div", "br", "li", "ul", "ol", "h1", "h2", "h3", "h4", "h5", "h6", "tr", "section",
];

pub fn html_to_text(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let mut raw = String::new();

    for node in fragment.root_element().descendants() {
        match node.value() {
            Node::Text(text) => raw.push_str(text),
            Node::Element(el) if BLOCK_ELEMENTS.contains(&el.name()) => raw.push('\n'),
            _ => {}
        }
    }

    raw.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Relative age of a posting, e.g. "3 days ago".
pub fn posted_ago(posted: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = (now - posted).num_seconds().unsigned_abs();
    let days = secs.div_ceil(86_400);

    if days <= 1 {
        "1 day ago".to_string()
    } else if days < 7 {
        format!("{} days ago", days)
    } else if days < 30 {
        format!("{} weeks ago", days / 7)
    } else {
        format!("{} months ago", days / 30)
    }
}

#[cfg(test)]
pub(crate) fn sample_job(id: &str) -> Job {
    Job {
        id: id.to_string(),
        title: format!("Engineer {}", id),
        company: "Acme".to_string(),
        location: "Remote".to_string(),
        description: String::new(),
        description_html: String::new(),
        job_type: Some("full-time".to_string()),
        experience_level: None,
        salary: None,
        skills: vec!["Rust".to_string()],
        apply_url: format!("https://jobs.example.com/{}", id),
        source_url: None,
        source_platform: Some("LinkedIn".to_string()),
        company_logo_url: None,
        posted_on: None,
        is_bookmarked: None,
    }
}

//! Jobs backend client: the [`JobsApi`] trait and its `reqwest` implementation.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use anyhow::{Context, Result};
use log::debug;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::error::ApiError;
use crate::models::{AuthResponse, Credentials, Job, JobsPage};
use crate::query::SearchParams;

/// Boxed future returned by dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Everything the client needs from the backend.
pub trait JobsApi: Send + Sync {
    /// `GET /jobs` for one page of a query.
    fn search_jobs<'a>(&'a self, params: &'a SearchParams)
    -> BoxFuture<'a, Result<JobsPage, ApiError>>;

    /// `GET /jobs/{id}`. With a token the bookmark flag is filled in.
    fn job<'a>(&'a self, id: &'a str, token: Option<&'a str>)
    -> BoxFuture<'a, Result<Job, ApiError>>;

    /// `POST /bookmarks/toggle/{id}`.
    fn toggle_bookmark<'a>(&'a self, id: &'a str, token: &'a str)
    -> BoxFuture<'a, Result<(), ApiError>>;

    /// `GET /bookmarks`.
    fn bookmarks<'a>(&'a self, token: &'a str) -> BoxFuture<'a, Result<Vec<Job>, ApiError>>;

    fn register<'a>(&'a self, credentials: &'a Credentials) -> BoxFuture<'a, Result<(), ApiError>>;

    fn login<'a>(&'a self, credentials: &'a Credentials)
    -> BoxFuture<'a, Result<AuthResponse, ApiError>>;
}

// Every successful response is wrapped as {"data": ...}
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

#[derive(Debug, Clone)]
pub struct HttpJobsApi {
    base_url: String,
    http: reqwest::Client,
}

impl HttpJobsApi {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl JobsApi for HttpJobsApi {
    fn search_jobs<'a>(
        &'a self,
        params: &'a SearchParams,
    ) -> BoxFuture<'a, Result<JobsPage, ApiError>> {
        Box::pin(async move {
            let url = self.url("/jobs");
            let pairs = params.query_pairs();
            debug!("GET {} {:?}", url, pairs);

            let response = self.http.get(&url).query(&pairs).send().await?;
            read_data(response).await
        })
    }

    fn job<'a>(
        &'a self,
        id: &'a str,
        token: Option<&'a str>,
    ) -> BoxFuture<'a, Result<Job, ApiError>> {
        Box::pin(async move {
            let url = self.url(&format!("/jobs/{}", id));
            debug!("GET {}", url);

            let mut request = self.http.get(&url);
            if let Some(token) = token {
                request = request.bearer_auth(token);
            }
            let response = request.send().await?;
            if response.status() == reqwest::StatusCode::NOT_FOUND {
                return Err(ApiError::NotFound(id.to_string()));
            }
            read_data(response).await
        })
    }

    fn toggle_bookmark<'a>(
        &'a self,
        id: &'a str,
        token: &'a str,
    ) -> BoxFuture<'a, Result<(), ApiError>> {
        Box::pin(async move {
            let url = self.url(&format!("/bookmarks/toggle/{}", id));
            debug!("POST {}", url);

            let response = self
                .http
                .post(&url)
                .bearer_auth(token)
                .json(&serde_json::json!({}))
                .send()
                .await?;
            if response.status() == reqwest::StatusCode::NOT_FOUND {
                return Err(ApiError::NotFound(id.to_string()));
            }
            expect_success(response).await
        })
    }

    fn bookmarks<'a>(&'a self, token: &'a str) -> BoxFuture<'a, Result<Vec<Job>, ApiError>> {
        Box::pin(async move {
            let url = self.url("/bookmarks");
            debug!("GET {}", url);

            let response = self.http.get(&url).bearer_auth(token).send().await?;
            read_data(response).await
        })
    }

    fn register<'a>(&'a self, credentials: &'a Credentials) -> BoxFuture<'a, Result<(), ApiError>> {
        Box::pin(async move {
            let url = self.url("/users/register");
            debug!("POST {}", url);

            let response = self.http.post(&url).json(credentials).send().await?;
            expect_success(response).await
        })
    }

    fn login<'a>(
        &'a self,
        credentials: &'a Credentials,
    ) -> BoxFuture<'a, Result<AuthResponse, ApiError>> {
        Box::pin(async move {
            let url = self.url("/users/login");
            debug!("POST {}", url);

            let response = self.http.post(&url).json(credentials).send().await?;
            read_data(response).await
        })
    }
}

async fn read_data<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(status_error(status.as_u16(), &body));
    }
    decode_envelope(&body)
}

async fn expect_success(response: reqwest::Response) -> Result<(), ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    let body = response.text().await.unwrap_or_default();
    Err(status_error(status.as_u16(), &body))
}

fn decode_envelope<T: DeserializeOwned>(body: &str) -> Result<T, ApiError> {
    serde_json::from_str::<Envelope<T>>(body)
        .map(|envelope| envelope.data)
        .map_err(|e| ApiError::Parse(e.to_string()))
}

/// Build a status error, preferring the backend's `message` field.
fn status_error(status: u16, body: &str) -> ApiError {
    let message = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.message)
        .unwrap_or_else(|| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                "no response body".to_string()
            } else {
                trimmed.chars().take(200).collect()
            }
        });
    ApiError::Status { status, message }
}

#[cfg(test)]
pub(crate) mod fake {
    //! In-memory backend for exercising the coordinators.

    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;

    use super::*;
    use crate::models::User;

    pub struct FakeApi {
        jobs: Vec<Job>,
        page_size: usize,
        fail_toggles: bool,
        bookmarked: Mutex<HashSet<String>>,
        accounts: Mutex<HashMap<String, String>>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeApi {
        pub fn new(jobs: Vec<Job>) -> Self {
            Self {
                jobs,
                page_size: 2,
                fail_toggles: false,
                bookmarked: Mutex::new(HashSet::new()),
                accounts: Mutex::new(HashMap::new()),
                calls: Mutex::new(Vec::new()),
            }
        }

        pub fn failing_toggles(mut self) -> Self {
            self.fail_toggles = true;
            self
        }

        pub fn with_account(self, email: &str, password: &str) -> Self {
            self.accounts
                .lock()
                .unwrap()
                .insert(email.to_string(), password.to_string());
            self
        }

        /// Mark `id` as already bookmarked server-side.
        pub fn with_bookmark(self, id: &str) -> Self {
            self.bookmarked.lock().unwrap().insert(id.to_string());
            self
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }
    }

    impl JobsApi for FakeApi {
        fn search_jobs<'a>(
            &'a self,
            params: &'a SearchParams,
        ) -> BoxFuture<'a, Result<JobsPage, ApiError>> {
            Box::pin(async move {
                self.record(format!("search page={}", params.page));
                let size = params.limit.map(|l| l as usize).unwrap_or(self.page_size);
                let title = params.query.title.to_lowercase();
                let matching: Vec<Job> = self
                    .jobs
                    .iter()
                    .filter(|j| j.title.to_lowercase().contains(&title))
                    .cloned()
                    .collect();
                let total_pages = matching.len().div_ceil(size) as u32;
                let start = (params.page as usize - 1) * size;
                Ok(JobsPage {
                    jobs: matching.iter().skip(start).take(size).cloned().collect(),
                    current_page: params.page,
                    total_pages,
                    total_jobs: matching.len() as u64,
                })
            })
        }

        fn job<'a>(
            &'a self,
            id: &'a str,
            token: Option<&'a str>,
        ) -> BoxFuture<'a, Result<Job, ApiError>> {
            Box::pin(async move {
                self.record(format!("job {}", id));
                let mut job = self
                    .jobs
                    .iter()
                    .find(|j| j.id == id)
                    .cloned()
                    .ok_or_else(|| ApiError::NotFound(id.to_string()))?;
                if token.is_some() {
                    job.is_bookmarked = Some(self.bookmarked.lock().unwrap().contains(id));
                }
                Ok(job)
            })
        }

        fn toggle_bookmark<'a>(
            &'a self,
            id: &'a str,
            token: &'a str,
        ) -> BoxFuture<'a, Result<(), ApiError>> {
            Box::pin(async move {
                self.record(format!("toggle {} {}", id, token));
                if self.fail_toggles {
                    return Err(ApiError::Network("connection reset".to_string()));
                }
                let mut set = self.bookmarked.lock().unwrap();
                if !set.remove(id) {
                    set.insert(id.to_string());
                }
                Ok(())
            })
        }

        fn bookmarks<'a>(&'a self, token: &'a str) -> BoxFuture<'a, Result<Vec<Job>, ApiError>> {
            Box::pin(async move {
                self.record(format!("bookmarks {}", token));
                let set = self.bookmarked.lock().unwrap();
                Ok(self
                    .jobs
                    .iter()
                    .filter(|j| set.contains(&j.id))
                    .cloned()
                    .collect())
            })
        }

        fn register<'a>(
            &'a self,
            credentials: &'a Credentials,
        ) -> BoxFuture<'a, Result<(), ApiError>> {
            Box::pin(async move {
                self.record(format!("register {}", credentials.email));
                let mut accounts = self.accounts.lock().unwrap();
                if accounts.contains_key(&credentials.email) {
                    return Err(ApiError::Status {
                        status: 409,
                        message: "User already exists".to_string(),
                    });
                }
                accounts.insert(credentials.email.clone(), credentials.password.clone());
                Ok(())
            })
        }

        fn login<'a>(
            &'a self,
            credentials: &'a Credentials,
        ) -> BoxFuture<'a, Result<AuthResponse, ApiError>> {
            Box::pin(async move {
                self.record(format!("login {}", credentials.email));
                let accounts = self.accounts.lock().unwrap();
                match accounts.get(&credentials.email) {
                    Some(pw) if *pw == credentials.password => Ok(AuthResponse {
                        user: User {
                            id: format!("u-{}", credentials.email),
                            email: credentials.email.clone(),
                        },
                        token: format!("token-{}", credentials.email),
                    }),
                    _ => Err(ApiError::Status {
                        status: 401,
                        message: "Invalid credentials".to_string(),
                    }),
                }
            })
        }
    }
}

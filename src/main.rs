mod api;
mod bookmark;
mod config;
mod detail;
mod error;
mod models;
mod optimistic;
mod query;
mod results;
mod search;
mod session;
mod storage;
mod suggest;
mod tui;

use anyhow::{Context, Result, bail};
use api::{HttpJobsApi, JobsApi};
use bookmark::BookmarkCoordinator;
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use config::Config;
use error::BookmarkError;
use models::{Credentials, Job, posted_ago};
use query::{ExperienceLevel, Filter, JobType, Platform};
use search::{Phase, SearchController};
use session::{Session, SessionStore};
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use storage::Storage;
use tokio::runtime::Runtime;

const HISTORY_LIMIT: usize = 10;

#[derive(Parser)]
#[command(name = "jobhub")]
#[command(about = "Search, filter, and bookmark job listings from the terminal")]
struct Cli {
    /// Backend base URL (overrides JOBHUB_API_BASE_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search jobs and print the results
    Search {
        /// Job title or keywords
        title: Option<String>,

        /// Location text
        #[arg(short, long, default_value = "")]
        location: String,

        /// Source platform (all, indeed, linkedin, naukri)
        #[arg(short, long)]
        platform: Option<Platform>,

        /// Job type (all, full-time, part-time, contract, internship)
        #[arg(short = 't', long)]
        job_type: Option<JobType>,

        /// Experience level (all, entry, mid, senior)
        #[arg(short, long)]
        experience: Option<ExperienceLevel>,

        /// Number of pages to fetch
        #[arg(long, default_value = "1")]
        pages: u32,
    },

    /// Browse jobs interactively
    Browse {
        /// Start by browsing one platform
        #[arg(short, long)]
        platform: Option<Platform>,
    },

    /// Show job details
    Show {
        /// Job ID
        id: String,
    },

    /// Toggle the bookmark on a job
    Bookmark {
        /// Job ID
        id: String,
    },

    /// List bookmarked jobs
    Bookmarks,

    /// Create an account and sign in
    Register {
        /// Email address
        email: String,
    },

    /// Sign in
    Login {
        /// Email address
        email: String,
    },

    /// Sign out and forget the stored session
    Logout,

    /// Show the signed-in user
    Whoami,

    /// Show recent searches
    History,

    /// Suggest search text
    Suggest {
        /// Which field to complete
        field: SuggestField,

        /// Text typed so far
        text: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum SuggestField {
    Title,
    Location,
}

fn read_password() -> Result<String> {
    if let Ok(password) = std::env::var("JOBHUB_PASSWORD") {
        return Ok(password);
    }
    eprint!("Password: ");
    io::stderr().flush()?;
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read password from stdin")?;
    let password = line.trim_end_matches(['\r', '\n']).to_string();
    if password.is_empty() {
        bail!("Password must not be empty");
    }
    Ok(password)
}

fn print_job_table(jobs: &[Job]) {
    println!(
        "{:<26} {:<30} {:<20} {:<18} {:<12}",
        "ID", "TITLE", "COMPANY", "LOCATION", "POSTED"
    );
    println!("{}", "-".repeat(110));
    let now = Utc::now();
    for job in jobs {
        let saved = if job.is_bookmarked() { "*" } else { "" };
        let posted = job
            .posted_on
            .map(|p| posted_ago(p, now))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<26} {:<30} {:<20} {:<18} {:<12}",
            format!("{}{}", job.id, saved),
            truncate(&job.title, 28),
            truncate(&job.company, 18),
            truncate(&job.location, 16),
            posted
        );
    }
}

fn print_job(job: &Job) {
    println!("Job {}", job.id);
    println!("Title: {}", job.title);
    println!("Company: {}", job.company);
    if job.is_remote() {
        println!("Location: {} (remote)", job.location);
    } else {
        println!("Location: {}", job.location);
    }
    if let Some(platform) = &job.source_platform {
        println!("Platform: {}", platform);
    }
    if let Some(job_type) = &job.job_type {
        println!("Type: {}", job_type);
    }
    if let Some(level) = &job.experience_level {
        println!("Experience: {}", level);
    }
    if let Some(salary) = &job.salary {
        println!("Pay: {}", salary);
    }
    if let Some(posted) = job.posted_on {
        println!("Posted: {}", posted_ago(posted, Utc::now()));
    }
    match job.is_bookmarked {
        Some(true) => println!("Bookmarked: yes"),
        Some(false) => println!("Bookmarked: no"),
        None => {}
    }
    if !job.apply_url.is_empty() {
        println!("Apply: {}", job.apply_url);
    }
    if let Some(source) = &job.source_url {
        println!("Source: {}", source);
    }
    if !job.skills.is_empty() {
        println!("Skills: {}", job.skills.join(", "));
    }
    let description = job.plain_description();
    if !description.is_empty() {
        println!("\n--- Description ---\n{}", textwrap::fill(&description, 80));
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let config = Config::from_env()?.with_api_url(cli.api_url);
    let storage = Storage::open(config.db_path.as_deref())?;
    let api = Arc::new(HttpJobsApi::new(&config.api_base_url, config.timeout)?);
    let runtime = Runtime::new().context("Failed to start async runtime")?;
    let store = SessionStore::new(&storage);

    match cli.command {
        Commands::Search {
            title,
            location,
            platform,
            job_type,
            experience,
            pages,
        } => {
            let mut controller = SearchController::new(config.page_size);
            // Filters set before the first search only shape the query.
            let filters = [
                platform.map(Filter::Platform),
                job_type.map(Filter::JobType),
                experience.map(Filter::ExperienceLevel),
            ];
            for filter in filters.into_iter().flatten() {
                controller.set_filter(filter);
            }

            let first = controller.set_search(title.as_deref().unwrap_or(""), &location);
            storage.record_search(controller.query())?;

            let fetching = controller.fetch_pages(api.as_ref(), first, pages);
            let fetched = match runtime.block_on(fetching) {
                Ok(n) => n,
                Err(e) => {
                    let page = match controller.phase() {
                        Phase::Failed { page, .. } => *page,
                        _ => 1,
                    };
                    return Err(e).with_context(|| format!("Search failed on page {}", page));
                }
            };

            let results = controller.results();
            if results.is_empty() {
                println!("No jobs found. Try adjusting your search or filters.");
            } else {
                print_job_table(results.jobs());
                println!(
                    "\nShowing {} of {} jobs (page {}/{})",
                    results.jobs().len(),
                    results.total_jobs(),
                    results.current_page(),
                    results.total_pages()
                );
                if controller.can_load_more() {
                    println!("Use --pages {} to fetch more.", fetched + 1);
                }
            }
        }

        Commands::Browse { platform } => {
            let session = store.restore();
            let shared: Arc<dyn JobsApi> = api;
            tui::run_browse(
                shared,
                &storage,
                session,
                config.page_size,
                platform,
                runtime.handle().clone(),
            )?;
        }

        Commands::Show { id } => {
            let session = store.restore();
            match runtime
                .block_on(detail::load(api.as_ref(), &session, &id))
                .context("Failed to load job")?
            {
                Some(job) => print_job(&job),
                None => println!("Job {} not found.", id),
            }
        }

        Commands::Bookmark { id } => {
            let session = store.restore();
            if !session.is_authenticated() {
                return Err(BookmarkError::SignInRequired)
                    .context("Run `jobhub login <EMAIL>` first");
            }
            let Some(mut job) = runtime
                .block_on(detail::load(api.as_ref(), &session, &id))
                .context("Failed to load job")?
            else {
                println!("Job {} not found.", id);
                return Ok(());
            };

            let mut coordinator = BookmarkCoordinator::new();
            let bookmarked =
                runtime.block_on(coordinator.toggle(&session, api.as_ref(), &mut job))?;
            if bookmarked {
                println!("Bookmarked '{}' at {}.", job.title, job.company);
            } else {
                println!("Removed bookmark on '{}' at {}.", job.title, job.company);
            }
        }

        Commands::Bookmarks => {
            let session = store.restore();
            let Some(jobs) = runtime
                .block_on(bookmark::saved_jobs(&session, api.as_ref()))
                .context("Failed to load bookmarks")?
            else {
                return Err(BookmarkError::SignInRequired)
                    .context("Run `jobhub login <EMAIL>` first");
            };
            if jobs.is_empty() {
                println!("No bookmarked jobs.");
            } else {
                print_job_table(&jobs);
            }
        }

        Commands::Register { email } => {
            let credentials = Credentials {
                email,
                password: read_password()?,
            };
            let session = runtime
                .block_on(session::register_and_login(api.as_ref(), &credentials))
                .context("Registration failed")?;
            store.save(&session)?;
            println!("Account created. Signed in as {}.", credentials.email);
        }

        Commands::Login { email } => {
            let credentials = Credentials {
                email,
                password: read_password()?,
            };
            let session = runtime
                .block_on(session::login(api.as_ref(), &credentials))
                .context("Login failed")?;
            store.save(&session)?;
            println!("Signed in as {}.", credentials.email);
        }

        Commands::Logout => {
            store.save(&Session::anonymous())?;
            println!("Signed out.");
        }

        Commands::Whoami => {
            match store.restore().user() {
                Some(user) => println!("Signed in as {} ({})", user.email, user.id),
                None => println!("Not signed in."),
            }
            println!("API: {}", api.base_url());
            println!("Database: {}", storage.path().display());
        }

        Commands::History => {
            let searches = storage.recent_searches(HISTORY_LIMIT)?;
            if searches.is_empty() {
                println!("No recent searches.");
            } else {
                println!(
                    "{:<6} {:<20} {:<24} {:<18} {:<30}",
                    "ID", "WHEN", "TITLE", "LOCATION", "FILTERS"
                );
                println!("{}", "-".repeat(100));
                for s in searches {
                    let filters = [&s.platform, &s.job_type, &s.experience_level]
                        .into_iter()
                        .filter(|f| f.as_str() != "all")
                        .cloned()
                        .collect::<Vec<_>>()
                        .join(", ");
                    println!(
                        "{:<6} {:<20} {:<24} {:<18} {:<30}",
                        s.id,
                        s.searched_at,
                        truncate(&s.title, 22),
                        truncate(&s.location, 16),
                        filters
                    );
                }
            }
        }

        Commands::Suggest { field, text } => {
            let hits = match field {
                SuggestField::Title => suggest::suggest_titles(&text),
                SuggestField::Location => suggest::suggest_locations(&text),
            };
            for hit in hits {
                println!("{}", hit);
            }
        }
    }

    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}

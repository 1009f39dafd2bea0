use anyhow::Result;
use chrono::Utc;
use crossterm::{
    ExecutableCommand,
    event::{self, Event, KeyCode, KeyEventKind},
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
};
use std::io::stdout;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};

use crate::api::JobsApi;
use crate::bookmark::{BookmarkCoordinator, PendingToggle};
use crate::detail::{DetailOutcome, DetailTicket, JobDetailLoader};
use crate::error::{ApiError, BookmarkError};
use crate::models::{Job, JobsPage, posted_ago};
use crate::query::{Filter, Platform};
use crate::search::{Completion, FetchTicket, Phase, SearchController};
use crate::session::Session;
use crate::storage::Storage;
use crate::suggest::{suggest_locations, suggest_titles};
use crate::truncate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Browse,
    EditTitle,
    EditLocation,
}

/// Work the event loop has to start on behalf of the state.
#[derive(Debug)]
enum Request {
    /// Page 1 of a search the user typed or picked.
    Search(FetchTicket),
    Page(FetchTicket),
    Detail(DetailTicket),
    Bookmark(PendingToggle),
    Quit,
}

/// A finished network call, posted back to the event loop.
#[derive(Debug)]
enum NetEvent {
    Page(FetchTicket, Result<JobsPage, ApiError>),
    Detail(DetailTicket, Result<Job, ApiError>),
    Bookmark(PendingToggle, Result<(), ApiError>),
}

struct AppState {
    controller: SearchController,
    bookmarks: BookmarkCoordinator,
    details: JobDetailLoader,
    session: Session,
    selected: usize,
    scroll_offset: u16,
    detail: Option<Job>,
    mode: Mode,
    title_input: String,
    location_input: String,
    status: Option<String>,
}

impl AppState {
    fn new(session: Session, page_size: Option<u32>) -> Self {
        Self {
            controller: SearchController::new(page_size),
            bookmarks: BookmarkCoordinator::new(),
            details: JobDetailLoader::new(),
            session,
            selected: 0,
            scroll_offset: 0,
            detail: None,
            mode: Mode::Browse,
            title_input: String::new(),
            location_input: String::new(),
            status: None,
        }
    }

    fn selected_job(&self) -> Option<&Job> {
        self.controller.jobs().get(self.selected)
    }

    /// The job the detail pane is about: the fetched copy if open, else the list row.
    fn focused_job(&self) -> Option<&Job> {
        self.detail.as_ref().or_else(|| self.selected_job())
    }

    fn on_key(&mut self, code: KeyCode) -> Option<Request> {
        match self.mode {
            Mode::Browse => self.on_browse_key(code),
            Mode::EditTitle | Mode::EditLocation => self.on_edit_key(code),
        }
    }

    fn on_browse_key(&mut self, code: KeyCode) -> Option<Request> {
        match code {
            KeyCode::Char('q') => return Some(Request::Quit),
            KeyCode::Esc => {
                if self.detail.is_some() || self.details.is_loading() {
                    self.close_detail();
                } else {
                    return Some(Request::Quit);
                }
            }
            KeyCode::Down | KeyCode::Char('j') => self.next(),
            KeyCode::Up | KeyCode::Char('k') => self.prev(),
            KeyCode::Char('J') | KeyCode::PageDown => self.scroll_down(),
            KeyCode::Char('K') | KeyCode::PageUp => self.scroll_up(),
            KeyCode::Char('/') => self.mode = Mode::EditTitle,
            KeyCode::Char('l') => self.mode = Mode::EditLocation,
            KeyCode::Enter => return self.open_detail(),
            KeyCode::Char('1') => return self.platform_shortcut(Platform::Indeed),
            KeyCode::Char('2') => return self.platform_shortcut(Platform::LinkedIn),
            KeyCode::Char('3') => return self.platform_shortcut(Platform::Naukri),
            KeyCode::Char('p') => {
                let next = self.controller.query().platform.next();
                return self.filter(Filter::Platform(next));
            }
            KeyCode::Char('t') => {
                let next = self.controller.query().job_type.next();
                return self.filter(Filter::JobType(next));
            }
            KeyCode::Char('e') => {
                let next = self.controller.query().experience_level.next();
                return self.filter(Filter::ExperienceLevel(next));
            }
            KeyCode::Char('c') => {
                let ticket = self.controller.clear_all_filters();
                return self.page_request(ticket);
            }
            KeyCode::Char('m') => {
                let ticket = self.controller.load_more();
                return ticket.map(Request::Page);
            }
            KeyCode::Char('r') => {
                let ticket = self.controller.retry();
                return ticket.map(Request::Page);
            }
            KeyCode::Char('b') => return self.begin_bookmark(),
            _ => {}
        }
        None
    }

    fn on_edit_key(&mut self, code: KeyCode) -> Option<Request> {
        let editing_title = self.mode == Mode::EditTitle;
        match code {
            KeyCode::Esc => self.mode = Mode::Browse,
            KeyCode::Tab => {
                let first = if editing_title {
                    suggest_titles(&self.title_input).first().copied()
                } else {
                    suggest_locations(&self.location_input).first().copied()
                };
                if let Some(s) = first {
                    if editing_title {
                        self.title_input = s.to_string();
                    } else {
                        self.location_input = s.to_string();
                    }
                }
            }
            KeyCode::BackTab | KeyCode::Down | KeyCode::Up => {
                self.mode = if editing_title {
                    Mode::EditLocation
                } else {
                    Mode::EditTitle
                };
            }
            KeyCode::Backspace => {
                if editing_title {
                    self.title_input.pop();
                } else {
                    self.location_input.pop();
                }
            }
            KeyCode::Char(c) => {
                if editing_title {
                    self.title_input.push(c);
                } else {
                    self.location_input.push(c);
                }
            }
            KeyCode::Enter => {
                if self.title_input.trim().is_empty() {
                    self.status = Some("Enter a job title to search".to_string());
                    return None;
                }
                self.mode = Mode::Browse;
                self.reset_view();
                let ticket = self
                    .controller
                    .set_search(&self.title_input, &self.location_input);
                return ticket.map(Request::Search);
            }
            _ => {}
        }
        None
    }

    fn platform_shortcut(&mut self, platform: Platform) -> Option<Request> {
        self.title_input.clear();
        self.location_input.clear();
        self.reset_view();
        self.controller
            .set_platform_shortcut(platform)
            .map(Request::Search)
    }

    fn filter(&mut self, filter: Filter) -> Option<Request> {
        let ticket = self.controller.set_filter(filter);
        self.page_request(ticket)
    }

    fn page_request(&mut self, ticket: Option<FetchTicket>) -> Option<Request> {
        if ticket.is_some() {
            self.reset_view();
        }
        ticket.map(Request::Page)
    }

    fn reset_view(&mut self) {
        self.selected = 0;
        self.scroll_offset = 0;
        self.status = None;
        self.close_detail();
    }

    fn open_detail(&mut self) -> Option<Request> {
        let id = self.selected_job()?.id.clone();
        self.detail = None;
        self.scroll_offset = 0;
        Some(Request::Detail(self.details.begin(&id)))
    }

    fn close_detail(&mut self) {
        self.detail = None;
        self.details.cancel();
    }

    fn begin_bookmark(&mut self) -> Option<Request> {
        let id = self.focused_job()?.id.clone();

        // The fetched copy carries the server's flag, so it is the one to flip.
        let started = match self.detail.as_mut() {
            Some(job) if job.id == id => self.bookmarks.begin(&self.session, job),
            _ => {
                let job = self.controller.job_mut(&id)?;
                self.bookmarks.begin(&self.session, job)
            }
        };

        match started {
            Ok(pending) => {
                if let Some(job) = self.controller.job_mut(&id) {
                    pending.mirror(job);
                }
                if let Some(detail) = self.detail.as_mut() {
                    pending.mirror(detail);
                }
                Some(Request::Bookmark(pending))
            }
            Err(BookmarkError::SignInRequired) => {
                self.status = Some("Sign in with `jobhub login <email>` to save jobs".to_string());
                None
            }
            Err(BookmarkError::Unknown(_)) => {
                // List rows never carry the flag; fetch it before flipping anything.
                self.status = Some("Checking saved status, press b again".to_string());
                self.open_detail()
            }
            Err(e) => {
                self.status = Some(e.to_string());
                None
            }
        }
    }

    fn on_net(&mut self, event: NetEvent) {
        match event {
            NetEvent::Page(ticket, outcome) => match self.controller.complete(&ticket, outcome) {
                Completion::Applied => {
                    let len = self.controller.jobs().len();
                    if self.selected >= len {
                        self.selected = len.saturating_sub(1);
                    }
                }
                Completion::Failed => {
                    if let Phase::Failed { error, .. } = self.controller.phase() {
                        self.status = Some(format!("Search failed: {} (r to retry)", error));
                    }
                }
                Completion::Stale => {}
            },
            NetEvent::Detail(ticket, outcome) => match self.details.finish(&ticket, outcome) {
                DetailOutcome::Loaded(job) => self.detail = Some(job),
                DetailOutcome::NotFound => {
                    self.status = Some("That job is no longer available".to_string());
                }
                DetailOutcome::Failed(e) => {
                    self.status = Some(format!("Could not load job: {}", e));
                }
                DetailOutcome::Stale => {}
            },
            NetEvent::Bookmark(pending, outcome) => {
                let list_copy = self.controller.job_mut(pending.job_id());
                let views = list_copy.into_iter().chain(self.detail.as_mut());
                match self.bookmarks.settle(pending, outcome, views) {
                    Ok(true) => self.status = Some("Saved".to_string()),
                    Ok(false) => self.status = Some("Removed from saved jobs".to_string()),
                    Err(e) => self.status = Some(e.to_string()),
                }
            }
        }
    }

    fn next(&mut self) {
        let len = self.controller.jobs().len();
        if len > 0 && self.selected < len - 1 {
            self.selected += 1;
            self.scroll_offset = 0;
            self.close_detail();
        }
    }

    fn prev(&mut self) {
        if self.selected > 0 {
            self.selected -= 1;
            self.scroll_offset = 0;
            self.close_detail();
        }
    }

    fn scroll_down(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_add(3);
    }

    fn scroll_up(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_sub(3);
    }
}

struct Runner<'a> {
    api: Arc<dyn JobsApi>,
    handle: Handle,
    tx: UnboundedSender<NetEvent>,
    storage: &'a Storage,
}

impl Runner<'_> {
    fn dispatch(&self, state: &AppState, request: Request) {
        let api = Arc::clone(&self.api);
        let tx = self.tx.clone();

        match request {
            Request::Search(ticket) => {
                if let Err(e) = self.storage.record_search(&ticket.params.query) {
                    log::warn!("failed to record search: {:#}", e);
                }
                self.dispatch(state, Request::Page(ticket));
            }
            Request::Page(ticket) => {
                self.handle.spawn(async move {
                    let outcome = api.search_jobs(&ticket.params).await;
                    let _ = tx.send(NetEvent::Page(ticket, outcome));
                });
            }
            Request::Detail(ticket) => {
                let token = state.session.token().map(str::to_string);
                self.handle.spawn(async move {
                    let outcome = api.job(&ticket.job_id, token.as_deref()).await;
                    let _ = tx.send(NetEvent::Detail(ticket, outcome));
                });
            }
            Request::Bookmark(pending) => {
                self.handle.spawn(async move {
                    let outcome = api.toggle_bookmark(pending.job_id(), pending.token()).await;
                    let _ = tx.send(NetEvent::Bookmark(pending, outcome));
                });
            }
            Request::Quit => {}
        }
    }
}

pub fn run_browse(
    api: Arc<dyn JobsApi>,
    storage: &Storage,
    session: Session,
    page_size: Option<u32>,
    platform: Option<Platform>,
    handle: Handle,
) -> Result<()> {
    let (tx, mut rx) = unbounded_channel();
    let runner = Runner {
        api,
        handle,
        tx,
        storage,
    };

    let mut state = AppState::new(session, page_size);
    if let Some(platform) = platform {
        if let Some(request) = state.platform_shortcut(platform) {
            runner.dispatch(&state, request);
        }
    }

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = run_loop(&mut terminal, &mut state, &runner, &mut rx);

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
}

fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    state: &mut AppState,
    runner: &Runner,
    rx: &mut UnboundedReceiver<NetEvent>,
) -> Result<()> {
    let mut list_state = ListState::default();

    loop {
        while let Ok(net) = rx.try_recv() {
            state.on_net(net);
        }

        list_state.select(if state.controller.jobs().is_empty() {
            None
        } else {
            Some(state.selected)
        });
        terminal.draw(|frame| draw(frame, state, &mut list_state))?;

        if !event::poll(Duration::from_millis(100))? {
            continue;
        }
        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            match state.on_key(key.code) {
                Some(Request::Quit) => break,
                Some(request) => runner.dispatch(state, request),
                None => {}
            }
        }
    }
    Ok(())
}

fn draw(frame: &mut Frame, state: &AppState, list_state: &mut ListState) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(5),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(frame.area());

    frame.render_widget(build_header(state), rows[0]);

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(rows[1]);

    if state.controller.search_performed() {
        draw_list(frame, state, list_state, chunks[0]);
    } else {
        let welcome = Paragraph::new(vec![
            Line::from("Start by searching (/), or browse a platform:"),
            Line::from(""),
            Line::from("  1  Indeed"),
            Line::from("  2  LinkedIn"),
            Line::from("  3  Naukri"),
        ])
        .block(Block::default().borders(Borders::ALL).title(" Jobs "));
        frame.render_widget(welcome, chunks[0]);
    }

    let detail = Paragraph::new(build_detail(state))
        .block(Block::default().borders(Borders::ALL).title(" Detail "))
        .wrap(Wrap { trim: false })
        .scroll((state.scroll_offset, 0));
    frame.render_widget(detail, chunks[1]);

    let footer = match &state.status {
        Some(msg) => Paragraph::new(format!(" {}", msg)).style(Style::default().fg(Color::Yellow)),
        None => Paragraph::new(
            " /:title l:location 1-3:platform p/t/e:filters c:clear m:more r:retry enter:open b:save q:quit",
        )
        .style(Style::default().fg(Color::DarkGray)),
    };
    frame.render_widget(footer, rows[2]);
}

fn build_header(state: &AppState) -> Paragraph<'_> {
    let field = |label: &str, value: &str, active: bool| {
        let style = if active {
            Style::default().fg(Color::Black).bg(Color::Cyan)
        } else {
            Style::default().add_modifier(Modifier::BOLD)
        };
        let cursor = if active { "_" } else { "" };
        vec![
            Span::raw(format!("{}: ", label)),
            Span::styled(format!("{}{}", value, cursor), style),
            Span::raw("   "),
        ]
    };

    let mut search_line = field("Title", &state.title_input, state.mode == Mode::EditTitle);
    search_line.extend(field(
        "Location",
        &state.location_input,
        state.mode == Mode::EditLocation,
    ));

    let q = state.controller.query();
    let who = match state.session.user() {
        Some(user) => format!("signed in as {}", user.email),
        None => "not signed in".to_string(),
    };
    let clear_hint = if q.has_active_filters() { " [c: clear]" } else { "" };
    let filters = format!(
        "Platform: {}   Type: {}   Experience: {}{}   ({})",
        q.platform, q.job_type, q.experience_level, clear_hint, who
    );

    let suggestions = match state.mode {
        Mode::EditTitle => suggest_titles(&state.title_input).join("  |  "),
        Mode::EditLocation => suggest_locations(&state.location_input).join("  |  "),
        Mode::Browse => String::new(),
    };

    Paragraph::new(vec![
        Line::from(search_line),
        Line::from(Span::styled(filters, Style::default().fg(Color::Cyan))),
        Line::from(Span::styled(suggestions, Style::default().fg(Color::DarkGray))),
    ])
    .block(Block::default().borders(Borders::ALL).title(" jobhub "))
}

fn draw_list(frame: &mut Frame, state: &AppState, list_state: &mut ListState, area: Rect) {
    let results = state.controller.results();

    let mut items: Vec<ListItem> = state
        .controller
        .jobs()
        .iter()
        .map(|job| {
            let saved = if job.is_bookmarked() { "*" } else { " " };
            ListItem::new(format!("{} {} | {}", saved, truncate(&job.title, 35), job.company))
        })
        .collect();

    match state.controller.phase() {
        Phase::Loading { page: 1 } => items.push(ListItem::new("  Loading...")),
        Phase::Loading { .. } => items.push(ListItem::new("  Loading more...")),
        Phase::Failed { .. } => items.push(ListItem::new(Span::styled(
            "  Request failed (r to retry)",
            Style::default().fg(Color::Red),
        ))),
        Phase::Ready if results.is_empty() => {
            items.push(ListItem::new("  No jobs found. Try adjusting your search."))
        }
        Phase::Ready if state.controller.can_load_more() => items.push(ListItem::new(Span::styled(
            "  -- m: load more --",
            Style::default().fg(Color::DarkGray),
        ))),
        _ => {}
    }

    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(format!(
            " Jobs ({}/{}){} ",
            results.jobs().len(),
            results.total_jobs(),
            if state.controller.is_loading() { " ..." } else { "" }
        )))
        .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, area, list_state);
}

fn build_detail(state: &AppState) -> Text<'_> {
    if state.details.is_loading() {
        return Text::raw("Loading job...");
    }
    let Some(job) = state.focused_job() else {
        return Text::raw("No job selected");
    };

    let mut lines: Vec<Line> = Vec::new();

    lines.push(Line::from(Span::styled(
        job.title.as_str(),
        Style::default().add_modifier(Modifier::BOLD),
    )));
    lines.push(Line::from(format!("at {}", job.company)));

    let remote = if job.is_remote() { "  [remote]" } else { "" };
    lines.push(Line::from(format!("{}{}", job.location, remote)));

    let tags: Vec<&str> = [
        job.source_platform.as_deref(),
        job.job_type.as_deref(),
        job.experience_level.as_deref(),
    ]
    .into_iter()
    .flatten()
    .collect();
    if !tags.is_empty() {
        lines.push(Line::from(Span::styled(
            tags.join(" · "),
            Style::default().fg(Color::Cyan),
        )));
    }

    if let Some(salary) = &job.salary {
        lines.push(Line::from(format!("Pay: {}", salary)));
    }
    if let Some(posted) = job.posted_on {
        lines.push(Line::from(format!("Posted {}", posted_ago(posted, Utc::now()))));
    }

    let saved = match job.is_bookmarked {
        _ if state.bookmarks.is_in_flight(&job.id) => {
            Span::styled("Saving...", Style::default().fg(Color::Yellow))
        }
        Some(true) => Span::styled("Saved", Style::default().fg(Color::Green)),
        Some(false) => Span::raw("Not saved (b to save)"),
        None if state.session.is_authenticated() => Span::raw("Press enter for bookmark status"),
        None => Span::styled("Sign in to save jobs", Style::default().fg(Color::DarkGray)),
    };
    lines.push(Line::from(saved));

    if !job.apply_url.is_empty() {
        lines.push(Line::from(format!("Apply: {}", job.apply_url)));
    }
    lines.push(Line::from(""));

    if !job.skills.is_empty() {
        lines.push(Line::from(Span::styled(
            "Skills",
            Style::default().add_modifier(Modifier::BOLD),
        )));
        lines.push(Line::from(format!("  {}", job.skills.join(", "))));
        lines.push(Line::from(""));
    }

    let description = job.plain_description();
    if description.is_empty() {
        lines.push(Line::from(Span::styled(
            "(No description. Press enter to load the full posting)",
            Style::default().fg(Color::DarkGray),
        )));
    } else {
        lines.push(Line::from(Span::styled(
            "Description",
            Style::default().add_modifier(Modifier::BOLD),
        )));
        for line in description.lines() {
            lines.push(Line::from(line.to_string()));
        }
    }

    Text::from(lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::fake::FakeApi;
    use crate::models::{User, sample_job};
    use crate::query::JobType;

    fn signed_in() -> Session {
        Session::authenticated(
            User {
                id: "u1".to_string(),
                email: "a@example.com".to_string(),
            },
            "tok".to_string(),
        )
    }

    fn type_text(state: &mut AppState, text: &str) {
        for c in text.chars() {
            state.on_key(KeyCode::Char(c));
        }
    }

    fn search(state: &mut AppState, title: &str) -> FetchTicket {
        state.on_key(KeyCode::Char('/'));
        type_text(state, title);
        match state.on_key(KeyCode::Enter) {
            Some(Request::Search(ticket)) => ticket,
            other => panic!("expected search, got {:?}", other),
        }
    }

    fn page_of(ids: &[&str], current: u32, total: u32) -> JobsPage {
        JobsPage {
            jobs: ids.iter().map(|id| sample_job(id)).collect(),
            current_page: current,
            total_pages: total,
            total_jobs: (ids.len() as u64) * total as u64,
        }
    }

    #[test]
    fn test_filter_keys_fetch_nothing_before_search() {
        let mut state = AppState::new(Session::anonymous(), None);
        assert!(state.on_key(KeyCode::Char('t')).is_none());
        assert!(state.on_key(KeyCode::Char('m')).is_none());
        assert_eq!(state.controller.query().job_type, JobType::All.next());

        let ticket = search(&mut state, "Engineer");
        assert_eq!(ticket.params.query.job_type, JobType::All.next());
    }

    #[test]
    fn test_typed_search_issues_page_one() {
        let mut state = AppState::new(Session::anonymous(), None);
        let ticket = search(&mut state, "Engineer");
        assert_eq!(ticket.page, 1);
        assert_eq!(ticket.params.query.title, "Engineer");
        assert_eq!(state.mode, Mode::Browse);
    }

    #[test]
    fn test_empty_title_is_not_submitted() {
        let mut state = AppState::new(Session::anonymous(), None);
        state.on_key(KeyCode::Char('/'));
        assert!(state.on_key(KeyCode::Enter).is_none());
        assert!(state.status.is_some());
        assert!(!state.controller.search_performed());
    }

    #[test]
    fn test_tab_accepts_first_suggestion() {
        let mut state = AppState::new(Session::anonymous(), None);
        state.on_key(KeyCode::Char('/'));
        type_text(&mut state, "devo");
        state.on_key(KeyCode::Tab);
        assert_eq!(state.title_input, "DevOps Engineer");
    }

    #[test]
    fn test_platform_key_browses_platform() {
        let mut state = AppState::new(Session::anonymous(), None);
        match state.on_key(KeyCode::Char('2')) {
            Some(Request::Search(ticket)) => {
                assert_eq!(ticket.params.query.platform, Platform::LinkedIn)
            }
            other => panic!("expected search, got {:?}", other),
        }
    }

    #[test]
    fn test_load_more_then_filter_change() {
        let mut state = AppState::new(Session::anonymous(), None);
        let t1 = search(&mut state, "Engineer");
        state.on_net(NetEvent::Page(t1, Ok(page_of(&["A", "B"], 1, 2))));

        let Some(Request::Page(t2)) = state.on_key(KeyCode::Char('m')) else {
            panic!("expected load more");
        };
        assert!(state.on_key(KeyCode::Char('m')).is_none());

        state.selected = 1;
        let Some(Request::Page(t3)) = state.on_key(KeyCode::Char('t')) else {
            panic!("expected refetch");
        };
        assert_eq!(state.selected, 0);
        assert!(state.controller.jobs().is_empty());

        state.on_net(NetEvent::Page(t2, Ok(page_of(&["C", "D"], 2, 2))));
        assert!(state.controller.jobs().is_empty());
        state.on_net(NetEvent::Page(t3, Ok(page_of(&["F"], 1, 1))));
        assert_eq!(state.controller.jobs()[0].id, "F");
    }

    #[test]
    fn test_failed_search_sets_status() {
        let mut state = AppState::new(Session::anonymous(), None);
        let t1 = search(&mut state, "Engineer");
        state.on_net(NetEvent::Page(t1, Err(ApiError::Network("down".to_string()))));
        assert!(state.status.as_deref().unwrap().contains("retry"));
        assert!(matches!(state.on_key(KeyCode::Char('r')), Some(Request::Page(_))));
    }

    #[test]
    fn test_bookmark_requires_sign_in() {
        let mut state = AppState::new(Session::anonymous(), None);
        let t1 = search(&mut state, "Engineer");
        state.on_net(NetEvent::Page(t1, Ok(page_of(&["A"], 1, 1))));

        assert!(state.on_key(KeyCode::Char('b')).is_none());
        assert!(state.status.as_deref().unwrap().contains("Sign in"));
        assert_eq!(state.controller.jobs()[0].is_bookmarked, None);
    }

    #[test]
    fn test_bookmark_failure_reverts_list_and_detail() {
        let mut state = AppState::new(signed_in(), None);
        let t1 = search(&mut state, "Engineer");
        state.on_net(NetEvent::Page(t1, Ok(page_of(&["A"], 1, 1))));

        let Some(Request::Detail(ticket)) = state.on_key(KeyCode::Enter) else {
            panic!("expected detail request");
        };
        let mut fetched = sample_job("A");
        fetched.is_bookmarked = Some(false);
        state.on_net(NetEvent::Detail(ticket, Ok(fetched)));

        let Some(Request::Bookmark(pending)) = state.on_key(KeyCode::Char('b')) else {
            panic!("expected bookmark request");
        };
        assert_eq!(state.controller.jobs()[0].is_bookmarked, Some(true));
        assert_eq!(state.detail.as_ref().unwrap().is_bookmarked, Some(true));

        state.on_net(NetEvent::Bookmark(
            pending,
            Err(ApiError::Network("reset".to_string())),
        ));
        assert_eq!(state.controller.jobs()[0].is_bookmarked, Some(false));
        assert_eq!(state.detail.as_ref().unwrap().is_bookmarked, Some(false));
        assert!(state.status.as_deref().unwrap().contains("try again"));
        assert!(!state.bookmarks.is_in_flight("A"));
    }

    #[test]
    fn test_truncate_is_char_safe() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("Ingénieur logiciel senior", 10), "Ingénie...");
    }

    #[tokio::test]
    async fn test_unopened_row_checks_server_before_toggling() {
        let api = FakeApi::new(vec![sample_job("A")]).with_bookmark("A");
        let mut state = AppState::new(signed_in(), None);
        let t1 = search(&mut state, "Engineer");
        let page = api.search_jobs(&t1.params).await;
        state.on_net(NetEvent::Page(t1, page));
        assert_eq!(state.controller.jobs()[0].is_bookmarked, None);

        let Some(Request::Detail(ticket)) = state.on_key(KeyCode::Char('b')) else {
            panic!("expected detail request");
        };
        assert_eq!(state.controller.jobs()[0].is_bookmarked, None);
        assert!(!state.bookmarks.is_in_flight("A"));

        let fetched = api.job(&ticket.job_id, state.session.token()).await;
        state.on_net(NetEvent::Detail(ticket, fetched));
        assert_eq!(state.detail.as_ref().unwrap().is_bookmarked, Some(true));

        let Some(Request::Bookmark(pending)) = state.on_key(KeyCode::Char('b')) else {
            panic!("expected bookmark request");
        };
        assert!(!pending.bookmarked());
        let outcome = api.toggle_bookmark(pending.job_id(), pending.token()).await;
        state.on_net(NetEvent::Bookmark(pending, outcome));

        assert_eq!(state.controller.jobs()[0].is_bookmarked, Some(false));
        assert_eq!(state.detail.as_ref().unwrap().is_bookmarked, Some(false));
        assert_eq!(state.status.as_deref(), Some("Removed from saved jobs"));
        let server = api.job("A", Some("tok")).await.unwrap();
        assert_eq!(server.is_bookmarked, Some(false));
        assert_eq!(api.calls().iter().filter(|c| c.starts_with("toggle")).count(), 1);
    }
}

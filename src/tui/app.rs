//! Main TUI application state machine.
//!
//! Handles:
//! - Screen navigation
//! - Input event handling
//! - Service integration

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::NaiveDate;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    Terminal,
};

use crate::adapters::sqlite::SqliteStore;
use crate::application::{MatchingService, RegistryService};
use crate::config::AppConfig;

use super::ui::{
    compatibility::{render_compatibility, CompatibilityState},
    donor_form::{render_donor_form, DonorFormState},
    home::{render_home, HomeState},
    manage::{render_manage, ManageState, ManageTab},
    recipient_form::{render_recipient_form, RecipientFormState},
    render_disclaimer,
    results::{render_results, ResultsState},
};

/// Current screen/view in the application
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Home,
    AddRecipient,
    AddDonor,
    Compatibility,
    Results,
    Manage,
}

/// Main application state
pub struct App {
    screen: Screen,
    should_quit: bool,

    registry: RegistryService<SqliteStore>,
    matching: MatchingService<SqliteStore>,
    export_dir: PathBuf,

    home_state: HomeState,
    recipient_form: RecipientFormState,
    donor_form: DonorFormState,
    compatibility_state: CompatibilityState,
    results_state: ResultsState,
    manage_state: ManageState,
}

impl App {
    /// Open the configured database and build the services.
    ///
    /// # Errors
    /// Returns error if the database cannot be opened.
    pub fn new(config: &AppConfig) -> Result<Self> {
        let storage = Arc::new(SqliteStore::new(&config.db_path)?);
        tracing::info!("Opened record store");

        let registry = RegistryService::new(storage.clone());
        let matching = MatchingService::new(storage, config.blank_locus_policy);

        let home_state = HomeState {
            database: config.db_path.display().to_string(),
            blank_locus_policy: config.blank_locus_policy,
            ..HomeState::default()
        };

        Ok(Self::with_services(
            registry,
            matching,
            config.export_dir.clone(),
            home_state,
        ))
    }

    /// Create the application around pre-built services.
    pub fn with_services(
        registry: RegistryService<SqliteStore>,
        matching: MatchingService<SqliteStore>,
        export_dir: PathBuf,
        home_state: HomeState,
    ) -> Self {
        Self {
            screen: Screen::Home,
            should_quit: false,
            registry,
            matching,
            export_dir,
            home_state,
            recipient_form: RecipientFormState::default(),
            donor_form: DonorFormState::default(),
            compatibility_state: CompatibilityState::default(),
            results_state: ResultsState::default(),
            manage_state: ManageState::default(),
        }
    }

    /// Run the main application loop.
    ///
    /// # Errors
    /// Returns error if terminal operations fail.
    pub fn run(&mut self) -> Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        self.refresh_home();

        let result = self.main_loop(&mut terminal);

        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    fn main_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
        loop {
            let today = today();

            terminal.draw(|f| {
                let chunks = Layout::default()
                    .direction(Direction::Vertical)
                    .constraints([Constraint::Min(0), Constraint::Length(2)])
                    .split(f.area());

                let content_area = chunks[0];
                match self.screen {
                    Screen::Home => render_home(f, content_area, &self.home_state),
                    Screen::AddRecipient => {
                        render_recipient_form(f, content_area, &self.recipient_form, today);
                    }
                    Screen::AddDonor => render_donor_form(f, content_area, &self.donor_form),
                    Screen::Compatibility => {
                        render_compatibility(f, content_area, &mut self.compatibility_state);
                    }
                    Screen::Results => render_results(f, content_area, &mut self.results_state),
                    Screen::Manage => render_manage(f, content_area, &mut self.manage_state),
                }

                render_disclaimer(f, chunks[1]);
            })?;

            if event::poll(Duration::from_millis(100))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key(key.code, key.modifiers);
                    }
                }
            }

            if self.should_quit {
                break;
            }
        }

        Ok(())
    }

    fn handle_key(&mut self, key: KeyCode, modifiers: KeyModifiers) {
        // Global quit handling
        if key == KeyCode::Char('q') && modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return;
        }

        match self.screen {
            Screen::Home => self.handle_home_key(key),
            Screen::AddRecipient | Screen::AddDonor => self.handle_form_key(key),
            Screen::Compatibility => self.handle_compatibility_key(key),
            Screen::Results => self.handle_results_key(key),
            Screen::Manage => self.handle_manage_key(key),
        }
    }

    fn go_home(&mut self) {
        self.refresh_home();
        self.screen = Screen::Home;
    }

    fn handle_home_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Char('r' | 'R') => {
                self.recipient_form.form.clear_sensitive();
                self.screen = Screen::AddRecipient;
            }
            KeyCode::Char('d' | 'D') => {
                self.donor_form.form.clear_sensitive();
                self.screen = Screen::AddDonor;
            }
            KeyCode::Char('c' | 'C') => {
                self.load_compatibility();
                self.screen = Screen::Compatibility;
            }
            KeyCode::Char('v' | 'V') => {
                self.load_results();
                self.screen = Screen::Results;
            }
            KeyCode::Char('m' | 'M') => {
                self.manage_state.pending_delete = None;
                self.manage_state.notice = None;
                self.load_manage();
                self.screen = Screen::Manage;
            }
            KeyCode::Char('q' | 'Q') => {
                self.should_quit = true;
            }
            _ => {}
        }
    }

    fn handle_form_key(&mut self, key: KeyCode) {
        let adding_recipient = self.screen == Screen::AddRecipient;
        let form = if adding_recipient {
            &mut self.recipient_form.form
        } else {
            &mut self.donor_form.form
        };

        match key {
            KeyCode::Esc => {
                form.clear_sensitive();
                form.status_message = None;
                self.go_home();
            }
            KeyCode::Up | KeyCode::BackTab => form.prev_field(),
            KeyCode::Down | KeyCode::Tab => form.next_field(),
            KeyCode::Left => form.cycle_choice(false),
            KeyCode::Right => form.cycle_choice(true),
            KeyCode::Char(c) => form.input_char(c),
            KeyCode::Backspace => form.delete_char(),
            KeyCode::Delete => form.clear_field(),
            KeyCode::F(2) => {
                if adding_recipient {
                    self.recipient_form.load_sample_data();
                } else {
                    self.donor_form.load_sample_data();
                }
            }
            KeyCode::Enter => {
                if adding_recipient {
                    self.submit_recipient_form();
                } else {
                    self.submit_donor_form();
                }
            }
            _ => {}
        }
    }

    fn submit_recipient_form(&mut self) {
        let draft = match self.recipient_form.to_draft() {
            Ok(draft) => draft,
            Err(e) => {
                self.recipient_form.form.error_message = Some(e);
                return;
            }
        };

        match self.registry.register_recipient_on(draft, today()) {
            Ok(saved) => {
                self.recipient_form.form.clear_sensitive();
                self.recipient_form.form.status_message = Some(format!(
                    "Recipient {} added ({} years on dialysis)",
                    saved.id.unwrap_or_default(),
                    saved.years_on_dialysis
                ));
            }
            Err(e) => {
                tracing::warn!("Recipient not saved: {}", e);
                self.recipient_form.form.error_message = Some(e.to_string());
            }
        }
    }

    fn submit_donor_form(&mut self) {
        let draft = match self.donor_form.to_draft() {
            Ok(draft) => draft,
            Err(e) => {
                self.donor_form.form.error_message = Some(e);
                return;
            }
        };

        match self.registry.register_donor(draft) {
            Ok(saved) => {
                self.donor_form.form.clear_sensitive();
                self.donor_form.form.status_message = Some(format!(
                    "Donor {} added (KDPI {})",
                    saved.id.unwrap_or_default(),
                    saved.kdpi
                ));
            }
            Err(e) => {
                tracing::warn!("Donor not saved: {}", e);
                self.donor_form.form.error_message = Some(e.to_string());
            }
        }
    }

    fn handle_compatibility_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Esc => self.go_home(),
            KeyCode::Down => self.compatibility_state.next(),
            KeyCode::Up => self.compatibility_state.prev(),
            KeyCode::Enter => self.load_outcomes(),
            KeyCode::Char('r' | 'R') => self.load_compatibility(),
            KeyCode::Char('e' | 'E') => {
                self.compatibility_state.notice = Some(self.export());
            }
            _ => {}
        }
    }

    fn handle_results_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Esc => self.go_home(),
            KeyCode::Down => self.results_state.next(),
            KeyCode::Up => self.results_state.prev(),
            KeyCode::Char('r' | 'R') => self.load_results(),
            KeyCode::Char('e' | 'E') => {
                self.results_state.notice = Some(self.export());
            }
            _ => {}
        }
    }

    fn handle_manage_key(&mut self, key: KeyCode) {
        if let Some(id) = self.manage_state.pending_delete {
            match key {
                KeyCode::Char('y' | 'Y') => {
                    self.manage_state.pending_delete = None;
                    self.delete_selected(id);
                }
                KeyCode::Char('n' | 'N') | KeyCode::Esc => {
                    self.manage_state.pending_delete = None;
                }
                _ => {}
            }
            return;
        }

        match key {
            KeyCode::Esc => self.go_home(),
            KeyCode::Tab | KeyCode::BackTab | KeyCode::Left | KeyCode::Right => {
                self.manage_state.tab = self.manage_state.tab.toggle();
                self.manage_state.notice = None;
                self.load_manage();
            }
            KeyCode::Down => self.manage_state.next(),
            KeyCode::Up => self.manage_state.prev(),
            KeyCode::Delete | KeyCode::Char('d' | 'D') => {
                self.manage_state.pending_delete = self.manage_state.selected_id();
            }
            _ => {}
        }
    }

    fn delete_selected(&mut self, id: i64) {
        let result = match self.manage_state.tab {
            ManageTab::Recipients => self.registry.delete_recipient(id),
            ManageTab::Donors => self.registry.delete_donor(id),
        };
        self.manage_state.notice = Some(match result {
            Ok(()) => format!("Deleted record {id}"),
            Err(e) => e.to_string(),
        });
        self.load_manage();
    }

    fn export(&self) -> String {
        match self.matching.export_json(&self.export_dir) {
            Ok(path) => format!("Exported to {}", path.display()),
            Err(e) => {
                tracing::error!("Export failed: {}", e);
                format!("Export failed: {e}")
            }
        }
    }

    fn refresh_home(&mut self) {
        match self.registry.counts() {
            Ok((donors, recipients)) => {
                self.home_state.donor_count = donors;
                self.home_state.recipient_count = recipients;
                self.home_state.error = None;
            }
            Err(e) => {
                tracing::error!("Failed to count records: {}", e);
                self.home_state.error = Some(e.to_string());
            }
        }
    }

    fn load_compatibility(&mut self) {
        self.compatibility_state.notice = None;
        match self.matching.compatibility_report() {
            Ok(report) => self.compatibility_state.set_report(report),
            Err(e) => {
                tracing::error!("Compatibility check failed: {}", e);
                self.compatibility_state.error = Some(e.to_string());
            }
        }
    }

    fn load_outcomes(&mut self) {
        let Some(donor_id) = self.compatibility_state.selected_donor_id() else {
            return;
        };
        match self.matching.explain_donor(donor_id) {
            Ok(outcomes) => self.compatibility_state.outcomes = Some(outcomes),
            Err(e) => {
                tracing::warn!("Could not explain donor {}: {}", donor_id, e);
                self.compatibility_state.notice = Some(e.to_string());
            }
        }
    }

    fn load_results(&mut self) {
        self.results_state.notice = None;
        match self.matching.ranked_recipients() {
            Ok(ranking) => self.results_state.set_ranking(ranking),
            Err(e) => {
                tracing::error!("Ranking failed: {}", e);
                self.results_state.error = Some(e.to_string());
            }
        }
    }

    fn load_manage(&mut self) {
        let state = &mut self.manage_state;
        let loaded = match state.tab {
            ManageTab::Recipients => self.registry.recipients().map(|batch| {
                state.rejected = batch.rejected;
                state.recipients = batch.records;
            }),
            ManageTab::Donors => self.registry.donors().map(|batch| {
                state.rejected = batch.rejected;
                state.donors = batch.records;
            }),
        };

        match loaded {
            Ok(()) => {
                state.error = None;
                state.clamp_selection();
            }
            Err(e) => {
                tracing::error!("Failed to load records: {}", e);
                state.error = Some(e.to_string());
            }
        }
    }
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::BlankLocusPolicy;

    fn create_test_app() -> (App, tempfile::TempDir) {
        let storage = Arc::new(SqliteStore::in_memory().expect("Should create db"));
        let export_dir = tempfile::tempdir().expect("Should create temp dir");
        let app = App::with_services(
            RegistryService::new(storage.clone()),
            MatchingService::new(storage, BlankLocusPolicy::Literal),
            export_dir.path().to_path_buf(),
            HomeState::default(),
        );
        (app, export_dir)
    }

    fn press(app: &mut App, key: KeyCode) {
        app.handle_key(key, KeyModifiers::NONE);
    }

    #[test]
    fn test_add_recipient_flow() {
        let (mut app, _dir) = create_test_app();
        press(&mut app, KeyCode::Char('r'));
        assert_eq!(app.screen, Screen::AddRecipient);

        press(&mut app, KeyCode::F(2));
        press(&mut app, KeyCode::Enter);
        assert!(app.recipient_form.form.error_message.is_none());
        assert!(app.recipient_form.form.status_message.is_some());
        assert_eq!(app.recipient_form.form.value("name"), "");

        press(&mut app, KeyCode::Esc);
        assert_eq!(app.screen, Screen::Home);
        assert_eq!(app.home_state.recipient_count, 1);
    }

    #[test]
    fn test_invalid_form_keeps_input() {
        let (mut app, _dir) = create_test_app();
        press(&mut app, KeyCode::Char('d'));
        for c in "Donor".chars() {
            press(&mut app, KeyCode::Char(c));
        }
        press(&mut app, KeyCode::Enter);

        assert!(app.donor_form.form.error_message.is_some());
        assert_eq!(app.donor_form.form.value("name"), "Donor");
        assert_eq!(app.registry.counts().expect("Should count"), (0, 0));
    }

    #[test]
    fn test_reports_after_entry() {
        let (mut app, _dir) = create_test_app();
        press(&mut app, KeyCode::Char('d'));
        press(&mut app, KeyCode::F(2));
        press(&mut app, KeyCode::Enter);
        press(&mut app, KeyCode::Esc);
        press(&mut app, KeyCode::Char('r'));
        press(&mut app, KeyCode::F(2));
        press(&mut app, KeyCode::Enter);
        press(&mut app, KeyCode::Esc);

        press(&mut app, KeyCode::Char('c'));
        let report = app
            .compatibility_state
            .report
            .as_ref()
            .expect("Should load report");
        // Sample recipient lists none of the sample donor's antigens.
        assert_eq!(report.rows.len(), 1);
        assert_eq!(report.rows[0].count, 1);

        press(&mut app, KeyCode::Enter);
        let outcomes = app
            .compatibility_state
            .outcomes
            .as_ref()
            .expect("Should explain donor");
        assert_eq!(outcomes.len(), 1);
        assert!(outcomes[0].is_compatible());

        press(&mut app, KeyCode::Char('e'));
        let notice = app.compatibility_state.notice.clone().unwrap_or_default();
        assert!(notice.starts_with("Exported to"));

        press(&mut app, KeyCode::Esc);
        press(&mut app, KeyCode::Char('v'));
        let ranking = app.results_state.ranking.as_ref().expect("Should rank");
        assert_eq!(ranking.rows.len(), 1);
    }

    #[test]
    fn test_delete_requires_confirmation() {
        let (mut app, _dir) = create_test_app();
        press(&mut app, KeyCode::Char('d'));
        press(&mut app, KeyCode::F(2));
        press(&mut app, KeyCode::Enter);
        press(&mut app, KeyCode::Esc);

        press(&mut app, KeyCode::Char('m'));
        press(&mut app, KeyCode::Tab);
        assert_eq!(app.manage_state.tab, ManageTab::Donors);
        assert_eq!(app.manage_state.donors.len(), 1);

        press(&mut app, KeyCode::Delete);
        assert!(app.manage_state.pending_delete.is_some());
        press(&mut app, KeyCode::Char('n'));
        assert_eq!(app.manage_state.donors.len(), 1);

        press(&mut app, KeyCode::Delete);
        press(&mut app, KeyCode::Char('y'));
        assert!(app.manage_state.donors.is_empty());
        assert_eq!(app.registry.counts().expect("Should count"), (0, 0));
    }

    #[test]
    fn test_rejected_row_can_be_deleted() {
        let dir = tempfile::tempdir().expect("Should create temp dir");
        let path = dir.path().join("kidney_matching.db");
        let storage = Arc::new(SqliteStore::new(&path).expect("Should create db"));
        let mut app = App::with_services(
            RegistryService::new(storage.clone()),
            MatchingService::new(storage, BlankLocusPolicy::Literal),
            dir.path().to_path_buf(),
            HomeState::default(),
        );

        press(&mut app, KeyCode::Char('r'));
        press(&mut app, KeyCode::F(2));
        press(&mut app, KeyCode::Enter);
        press(&mut app, KeyCode::Esc);

        let raw = rusqlite::Connection::open(&path).expect("Should open db");
        raw.execute("UPDATE recipients SET age = 500", [])
            .expect("Should corrupt row");

        press(&mut app, KeyCode::Char('m'));
        assert!(app.manage_state.recipients.is_empty());
        assert_eq!(app.manage_state.rejected.len(), 1);
        let id = app.manage_state.selected_id().expect("Should select rejected row");

        press(&mut app, KeyCode::Char('d'));
        assert_eq!(app.manage_state.pending_delete, Some(id));
        press(&mut app, KeyCode::Char('y'));

        assert!(app.manage_state.rejected.is_empty());
        assert_eq!(app.registry.counts().expect("Should count"), (0, 0));
    }

    #[test]
    fn test_ctrl_q_quits_from_form() {
        let (mut app, _dir) = create_test_app();
        press(&mut app, KeyCode::Char('r'));
        press(&mut app, KeyCode::Char('q'));
        assert!(!app.should_quit);
        app.handle_key(KeyCode::Char('q'), KeyModifiers::CONTROL);
        assert!(app.should_quit);
    }
}

//! Application state management for expensetrack.
//!
//! This module contains the core `App` struct that manages all application state,
//! including UI state, the session subscription, expense data and background
//! task coordination.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use expensetrack_core::api::{ApiError, ExpenseClient, IdentityClient};
use expensetrack_core::auth::{
    spawn_verification_poll, AuthState, FileSessionStore, LogoutReason, Session, SessionManager,
    SystemClock, VerificationOutcome, VerificationStatus,
};
use expensetrack_core::config::Config;
use expensetrack_core::expenses::{write_csv, ExpenseList, PendingChange};
use expensetrack_core::forms;
use expensetrack_core::models::{AuthSuccess, Category, Expense, UserProfile};

use crate::ui::styles::{self, Theme};

// ============================================================================
// Constants
// ============================================================================

/// Buffer size for the background task message channel.
const CHANNEL_BUFFER_SIZE: usize = 32;

/// Maximum length for email input.
const MAX_EMAIL_LENGTH: usize = 100;

/// Maximum length for password input.
/// 128 chars accommodates password managers and passphrases.
const MAX_PASSWORD_LENGTH: usize = 128;

/// Maximum length for free text fields (description, name, photo URL).
const MAX_TEXT_LENGTH: usize = 200;

/// Maximum length for the amount field.
const MAX_AMOUNT_LENGTH: usize = 16;

/// File name used by "Download Expenses".
pub const EXPORT_FILE_NAME: &str = "expenses.csv";

// ============================================================================
// UI State Types
// ============================================================================

/// Top-level screens
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Home,
    Auth,
    ForgotPassword,
    Welcome,
    Profile,
    Expenses,
}

impl View {
    pub fn title(&self) -> &'static str {
        match self {
            View::Home => "Home",
            View::Auth => "Login",
            View::ForgotPassword => "Forgot Password",
            View::Welcome => "Welcome",
            View::Profile => "Profile",
            View::Expenses => "Expenses",
        }
    }

    /// Views that are only reachable with a live session.
    pub fn requires_session(&self) -> bool {
        matches!(self, View::Welcome | View::Profile | View::Expenses)
    }
}

/// Overall application state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Normal,
    ShowingHelp,
    ConfirmingQuit,
    Quitting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    Login,
    Signup,
}

/// Auth form focus state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthField {
    Email,
    Password,
    Confirm,
    Submit,
}

/// Expense form and list focus state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpenseField {
    Money,
    Description,
    Category,
    Submit,
    List,
}

impl ExpenseField {
    pub fn next(&self) -> Self {
        match self {
            ExpenseField::Money => ExpenseField::Description,
            ExpenseField::Description => ExpenseField::Category,
            ExpenseField::Category => ExpenseField::Submit,
            ExpenseField::Submit => ExpenseField::List,
            ExpenseField::List => ExpenseField::Money,
        }
    }

    pub fn prev(&self) -> Self {
        match self {
            ExpenseField::Money => ExpenseField::List,
            ExpenseField::Description => ExpenseField::Money,
            ExpenseField::Category => ExpenseField::Description,
            ExpenseField::Submit => ExpenseField::Category,
            ExpenseField::List => ExpenseField::Submit,
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, ExpenseField::Money | ExpenseField::Description)
    }
}

/// Profile editor focus state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileField {
    Name,
    PhotoUrl,
    Submit,
}

impl ProfileField {
    pub fn next(&self) -> Self {
        match self {
            ProfileField::Name => ProfileField::PhotoUrl,
            ProfileField::PhotoUrl => ProfileField::Submit,
            ProfileField::Submit => ProfileField::Name,
        }
    }

    pub fn prev(&self) -> Self {
        match self {
            ProfileField::Name => ProfileField::Submit,
            ProfileField::PhotoUrl => ProfileField::Name,
            ProfileField::Submit => ProfileField::PhotoUrl,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AuthForm {
    pub mode: AuthMode,
    pub email: String,
    pub password: String,
    pub confirm: String,
    pub focus: AuthField,
    pub error: Option<String>,
}

impl AuthForm {
    fn new(email: String) -> Self {
        let focus = if email.is_empty() {
            AuthField::Email
        } else {
            AuthField::Password
        };
        Self {
            mode: AuthMode::Login,
            email,
            password: String::new(),
            confirm: String::new(),
            focus,
            error: None,
        }
    }

    pub fn next_field(&mut self) {
        self.focus = match (self.focus, self.mode) {
            (AuthField::Email, _) => AuthField::Password,
            (AuthField::Password, AuthMode::Signup) => AuthField::Confirm,
            (AuthField::Password, AuthMode::Login) => AuthField::Submit,
            (AuthField::Confirm, _) => AuthField::Submit,
            (AuthField::Submit, _) => AuthField::Email,
        };
    }

    pub fn prev_field(&mut self) {
        self.focus = match (self.focus, self.mode) {
            (AuthField::Email, _) => AuthField::Submit,
            (AuthField::Password, _) => AuthField::Email,
            (AuthField::Confirm, _) => AuthField::Password,
            (AuthField::Submit, AuthMode::Signup) => AuthField::Confirm,
            (AuthField::Submit, AuthMode::Login) => AuthField::Password,
        };
    }

    /// Switch between login and signup, clearing passwords.
    pub fn toggle_mode(&mut self) {
        self.mode = match self.mode {
            AuthMode::Login => AuthMode::Signup,
            AuthMode::Signup => AuthMode::Login,
        };
        self.password.clear();
        self.confirm.clear();
        self.error = None;
        self.focus = AuthField::Email;
    }

    pub fn push_char(&mut self, c: char) {
        match self.focus {
            AuthField::Email => push_limited(&mut self.email, c, MAX_EMAIL_LENGTH),
            AuthField::Password => push_limited(&mut self.password, c, MAX_PASSWORD_LENGTH),
            AuthField::Confirm => push_limited(&mut self.confirm, c, MAX_PASSWORD_LENGTH),
            AuthField::Submit => {}
        }
    }

    pub fn pop_char(&mut self) {
        match self.focus {
            AuthField::Email => {
                self.email.pop();
            }
            AuthField::Password => {
                self.password.pop();
            }
            AuthField::Confirm => {
                self.confirm.pop();
            }
            AuthField::Submit => {}
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ExpenseForm {
    pub money: String,
    pub description: String,
    pub category: Category,
    /// Id of the expense being edited, if any.
    pub editing: Option<String>,
}

impl ExpenseForm {
    fn load(expense: &Expense) -> Self {
        Self {
            money: expensetrack_core::utils::format_amount(expense.money),
            description: expense.description.clone(),
            category: expense.category,
            editing: Some(expense.id.clone()),
        }
    }
}

// ============================================================================
// Background Task Results
// ============================================================================

/// Results sent from background tasks back to the main loop. Errors are
/// already turned into user-facing text.
#[derive(Debug)]
enum TaskResult {
    Authenticated(Result<AuthSuccess, String>),
    ResetSent(Result<(), String>),
    ProfileLoaded(Result<UserProfile, String>),
    ProfileSaved(Result<UserProfile, String>),
    VerificationSent(Result<(), String>),
    ExpensesLoaded {
        user_id: String,
        result: Result<Vec<Expense>, String>,
    },
    /// Store answer for a provisional change; `Ok` carries the new id for adds.
    ExpenseSynced {
        op: u64,
        result: Result<Option<String>, String>,
    },
}

// ============================================================================
// Main Application Struct
// ============================================================================

/// Main application state container
pub struct App {
    // Core services
    pub config: Config,
    config_path: Option<PathBuf>,
    pub sessions: SessionManager,
    auth_rx: watch::Receiver<AuthState>,
    identity: Arc<IdentityClient>,
    expense_client: Option<ExpenseClient>,

    // UI State
    pub state: AppState,
    pub view: View,
    pub status_message: Option<String>,
    pub busy: bool,

    // Forms
    pub auth_form: AuthForm,
    pub reset_email: String,
    pub reset_message: Option<String>,
    pub profile_name: String,
    pub profile_photo: String,
    pub profile_focus: ProfileField,
    pub expense_form: ExpenseForm,
    pub expense_focus: ExpenseField,
    pub form_error: Option<String>,

    // Data
    pub profile: Option<UserProfile>,
    pub expenses: ExpenseList,
    pub expense_selection: usize,
    pending: HashMap<u64, PendingChange>,
    next_op: u64,

    // Background tasks
    verification_poll: Option<JoinHandle<VerificationOutcome>>,
    pub verification_sent: bool,
    task_rx: mpsc::Receiver<TaskResult>,
    task_tx: mpsc::Sender<TaskResult>,
}

impl App {
    /// Build the application from the on-disk config and session.
    pub fn from_config(config: Config) -> Result<Self> {
        let cache_dir = config.cache_dir()?;
        debug!(?cache_dir, "Cache directory configured");

        let sessions = SessionManager::restore(
            Arc::new(FileSessionStore::new(cache_dir)),
            Arc::new(SystemClock),
            config.session_duration(),
        );

        let identity = IdentityClient::new(config.identity_url(), config.api_key.clone())?;
        let expense_client = match config.database_url() {
            Ok(url) => Some(ExpenseClient::new(url)?),
            Err(e) => {
                warn!(error = %e, "Expense store not configured");
                None
            }
        };
        let config_path = Config::config_path().ok();

        Ok(Self::new(config, config_path, sessions, identity, expense_client))
    }

    pub fn new(
        config: Config,
        config_path: Option<PathBuf>,
        sessions: SessionManager,
        identity: IdentityClient,
        expense_client: Option<ExpenseClient>,
    ) -> Self {
        let (tx, rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);
        let auth_rx = sessions.subscribe();
        let view = if sessions.is_logged_in() {
            View::Welcome
        } else {
            View::Home
        };
        let email = config.last_email.clone().unwrap_or_default();

        let mut app = Self {
            config,
            config_path,
            sessions,
            auth_rx,
            identity: Arc::new(identity),
            expense_client,

            state: AppState::Normal,
            view,
            status_message: None,
            busy: false,

            auth_form: AuthForm::new(email.clone()),
            reset_email: email,
            reset_message: None,
            profile_name: String::new(),
            profile_photo: String::new(),
            profile_focus: ProfileField::Name,
            expense_form: ExpenseForm::default(),
            expense_focus: ExpenseField::Money,
            form_error: None,

            profile: None,
            expenses: ExpenseList::new(),
            expense_selection: 0,
            pending: HashMap::new(),
            next_op: 0,

            verification_poll: None,
            verification_sent: false,
            task_rx: rx,
            task_tx: tx,
        };
        if app.view == View::Welcome {
            app.load_profile();
        }
        app
    }

    // =========================================================================
    // Session
    // =========================================================================

    pub fn is_logged_in(&self) -> bool {
        self.sessions.is_logged_in()
    }

    pub fn theme(&self) -> &'static Theme {
        styles::theme(self.config.premium_theme)
    }

    /// Seconds left on the current session, for the status bar.
    pub fn session_seconds_left(&self) -> Option<i64> {
        self.sessions
            .current_session()
            .map(|s| s.seconds_until_expiry(self.sessions.now()))
    }

    pub fn logout(&mut self) {
        self.sessions.logout();
        self.sync_auth_state();
    }

    /// React to session transitions published by the session manager.
    fn sync_auth_state(&mut self) {
        if !matches!(self.auth_rx.has_changed(), Ok(true)) {
            return;
        }
        let state = self.auth_rx.borrow_and_update().clone();
        if let AuthState::LoggedOut { reason } = state {
            self.on_logged_out(reason);
        }
    }

    fn on_logged_out(&mut self, reason: Option<LogoutReason>) {
        info!(?reason, "Session ended");
        self.stop_verification_poll();
        self.verification_sent = false;
        self.profile = None;
        self.expenses.clear();
        self.pending.clear();
        self.expense_selection = 0;
        self.expense_form = ExpenseForm::default();
        self.busy = false;

        self.auth_form = AuthForm::new(self.auth_form.email.clone());
        self.view = View::Auth;
        self.state = match self.state {
            AppState::Quitting => AppState::Quitting,
            _ => AppState::Normal,
        };
        self.status_message = Some(
            match reason {
                Some(LogoutReason::Expired) => "Session expired. Please log in again.",
                Some(LogoutReason::UserRequested) => "Logged out",
                _ => "Please log in",
            }
            .to_string(),
        );
    }

    /// The live session, or a redirect to the login view.
    fn require_session(&mut self) -> Option<Session> {
        let session = self.sessions.current_session();
        if session.is_none() {
            self.set_view(View::Auth);
            self.status_message = Some("Please log in".to_string());
        }
        session
    }

    // =========================================================================
    // Navigation
    // =========================================================================

    pub fn set_view(&mut self, view: View) {
        if view.requires_session() && !self.is_logged_in() {
            self.view = View::Auth;
            self.status_message = Some("Please log in".to_string());
            return;
        }
        if self.view == View::Welcome && view != View::Welcome {
            self.stop_verification_poll();
        }
        self.form_error = None;
        self.view = view;

        match view {
            View::Welcome => self.load_profile(),
            View::Profile => {
                self.profile_focus = ProfileField::Name;
                self.load_profile();
            }
            View::Expenses => {
                self.expense_focus = ExpenseField::Money;
                self.refresh_expenses();
            }
            View::ForgotPassword => {
                self.reset_message = None;
                if self.reset_email.is_empty() {
                    self.reset_email = self.auth_form.email.clone();
                }
            }
            View::Auth => self.auth_form.error = None,
            View::Home => {}
        }
    }

    // =========================================================================
    // Authentication forms
    // =========================================================================

    pub fn submit_auth(&mut self) {
        let form = &self.auth_form;
        let validation = match form.mode {
            AuthMode::Login => forms::validate_login(&form.email, &form.password),
            AuthMode::Signup => forms::validate_signup(&form.email, &form.password, &form.confirm),
        };
        let email = form.email.trim().to_string();
        let password = form.password.clone();
        let mode = form.mode;
        if let Err(e) = validation {
            self.auth_form.error = Some(e.to_string());
            return;
        }

        self.auth_form.error = None;
        self.busy = true;
        let identity = self.identity.clone();
        let tx = self.task_tx.clone();

        tokio::spawn(async move {
            let result = match mode {
                AuthMode::Login => identity.sign_in(&email, &password).await,
                AuthMode::Signup => identity.sign_up(&email, &password).await,
            };
            if let Err(ref e) = result {
                error!(error = %e, "Authentication failed");
            }
            send_result(&tx, TaskResult::Authenticated(result.map_err(|e| user_message(&e))))
                .await;
        });
    }

    fn on_authenticated(&mut self, auth: AuthSuccess) {
        self.sessions.login(auth.token, auth.user_id);
        // The login publishes LoggedIn; mark it seen so it is not replayed.
        self.auth_rx.borrow_and_update();

        self.auth_form.email = auth.email.clone();
        self.auth_form.password.clear();
        self.auth_form.confirm.clear();
        self.persist_config(|c| c.last_email = Some(auth.email.clone()));
        self.config.last_email = Some(auth.email);

        self.status_message = Some("Logged in".to_string());
        self.set_view(View::Welcome);
    }

    pub fn submit_password_reset(&mut self) {
        if let Err(e) = forms::validate_reset(&self.reset_email) {
            self.reset_message = Some(e.to_string());
            return;
        }
        self.busy = true;
        self.reset_message = None;
        let email = self.reset_email.trim().to_string();
        let identity = self.identity.clone();
        let tx = self.task_tx.clone();

        tokio::spawn(async move {
            let result = identity.send_password_reset(&email).await;
            send_result(&tx, TaskResult::ResetSent(result.map_err(|e| user_message(&e)))).await;
        });
    }

    // =========================================================================
    // Profile & verification
    // =========================================================================

    pub fn load_profile(&mut self) {
        let Some(session) = self.sessions.current_session() else {
            return;
        };
        let identity = self.identity.clone();
        let tx = self.task_tx.clone();

        tokio::spawn(async move {
            let result = identity.lookup(&session.token).await;
            send_result(&tx, TaskResult::ProfileLoaded(result.map_err(|e| user_message(&e))))
                .await;
        });
    }

    pub fn submit_profile(&mut self) {
        let update = match forms::validate_profile(&self.profile_name, &self.profile_photo) {
            Ok(update) => update,
            Err(e) => {
                self.form_error = Some(e.to_string());
                return;
            }
        };
        let Some(session) = self.require_session() else {
            return;
        };
        self.form_error = None;
        self.busy = true;
        let identity = self.identity.clone();
        let tx = self.task_tx.clone();

        tokio::spawn(async move {
            let result = identity.update_profile(&session.token, &update).await;
            send_result(&tx, TaskResult::ProfileSaved(result.map_err(|e| user_message(&e))))
                .await;
        });
    }

    /// Send a verification email, then poll until the address is verified.
    pub fn verify_email(&mut self) {
        let Some(session) = self.require_session() else {
            return;
        };
        self.busy = true;
        let identity = self.identity.clone();
        let tx = self.task_tx.clone();

        tokio::spawn(async move {
            let result = identity.send_email_verification(&session.token).await;
            send_result(&tx, TaskResult::VerificationSent(result.map_err(|e| user_message(&e))))
                .await;
        });
    }

    fn start_verification_poll(&mut self) {
        self.stop_verification_poll();
        let source: Arc<dyn VerificationStatus> = self.identity.clone();
        self.verification_poll = Some(spawn_verification_poll(
            source,
            self.sessions.subscribe(),
            self.config.poll_interval(),
        ));
    }

    fn stop_verification_poll(&mut self) {
        if let Some(handle) = self.verification_poll.take() {
            handle.abort();
            debug!("Verification poll stopped");
        }
    }

    pub fn is_polling_verification(&self) -> bool {
        self.verification_poll.is_some()
    }

    async fn check_verification_poll(&mut self) {
        if !self
            .verification_poll
            .as_ref()
            .is_some_and(|handle| handle.is_finished())
        {
            return;
        }
        let Some(handle) = self.verification_poll.take() else {
            return;
        };
        match handle.await {
            Ok(VerificationOutcome::Verified) => {
                if let Some(profile) = self.profile.as_mut() {
                    profile.email_verified = true;
                }
                self.verification_sent = false;
                self.status_message = Some("Email verified".to_string());
            }
            Ok(VerificationOutcome::SessionEnded) => debug!("Verification poll ended with session"),
            Err(e) => warn!(error = %e, "Verification poll task failed"),
        }
    }

    // =========================================================================
    // Expenses
    // =========================================================================

    fn expense_client(&mut self) -> Option<ExpenseClient> {
        if self.expense_client.is_none() {
            self.form_error = Some("No expense database configured".to_string());
        }
        self.expense_client.clone()
    }

    pub fn refresh_expenses(&mut self) {
        let Some(session) = self.require_session() else {
            return;
        };
        let Some(client) = self.expense_client() else {
            return;
        };
        self.busy = true;
        let tx = self.task_tx.clone();

        tokio::spawn(async move {
            let result = client.list(&session).await;
            send_result(
                &tx,
                TaskResult::ExpensesLoaded {
                    user_id: session.user_id,
                    result: result.map_err(|e| user_message(&e)),
                },
            )
            .await;
        });
    }

    /// Add the form's expense, or save the edit in progress.
    pub fn submit_expense(&mut self) {
        let form = &self.expense_form;
        let draft = match forms::parse_expense(&form.money, &form.description, form.category) {
            Ok(draft) => draft,
            Err(e) => {
                self.form_error = Some(e.to_string());
                return;
            }
        };
        let Some(session) = self.require_session() else {
            return;
        };
        let Some(client) = self.expense_client() else {
            return;
        };
        self.form_error = None;

        let editing = self.expense_form.editing.clone();
        let change = match editing {
            Some(ref id) => match self.expenses.begin_update(id, draft.clone()) {
                Some(change) => change,
                None => {
                    self.form_error = Some("That expense no longer exists".to_string());
                    self.expense_form.editing = None;
                    return;
                }
            },
            None => self.expenses.begin_add(draft.clone()),
        };
        let op = self.track(change);
        self.expense_form = ExpenseForm::default();
        self.expense_focus = ExpenseField::Money;

        let tx = self.task_tx.clone();
        tokio::spawn(async move {
            let result = match editing {
                Some(id) => client.update(&session, &id, &draft).await.map(|_| None),
                None => client.create(&session, &draft).await.map(Some),
            };
            send_result(
                &tx,
                TaskResult::ExpenseSynced {
                    op,
                    result: result.map_err(|e| user_message(&e)),
                },
            )
            .await;
        });
    }

    /// Load the selected expense into the form for editing.
    pub fn edit_selected_expense(&mut self) {
        if let Some(expense) = self.expenses.as_slice().get(self.expense_selection) {
            if ExpenseList::is_provisional(expense) {
                self.status_message = Some("Still saving, try again in a moment".to_string());
                return;
            }
            self.expense_form = ExpenseForm::load(expense);
            self.expense_focus = ExpenseField::Money;
        }
    }

    pub fn cancel_edit(&mut self) {
        self.expense_form = ExpenseForm::default();
        self.form_error = None;
    }

    pub fn delete_selected_expense(&mut self) {
        let Some(id) = self
            .expenses
            .as_slice()
            .get(self.expense_selection)
            .filter(|e| !ExpenseList::is_provisional(e))
            .map(|e| e.id.clone())
        else {
            return;
        };
        let Some(session) = self.require_session() else {
            return;
        };
        let Some(client) = self.expense_client() else {
            return;
        };
        let Some(change) = self.expenses.begin_delete(&id) else {
            return;
        };
        let op = self.track(change);
        self.clamp_selection();
        if self.expense_form.editing.as_deref() == Some(id.as_str()) {
            self.expense_form = ExpenseForm::default();
        }

        let tx = self.task_tx.clone();
        tokio::spawn(async move {
            let result = client.delete(&session, &id).await.map(|_| None);
            send_result(
                &tx,
                TaskResult::ExpenseSynced {
                    op,
                    result: result.map_err(|e| user_message(&e)),
                },
            )
            .await;
        });
    }

    fn track(&mut self, change: PendingChange) -> u64 {
        self.next_op += 1;
        self.pending.insert(self.next_op, change);
        self.next_op
    }

    fn clamp_selection(&mut self) {
        self.expense_selection = self
            .expense_selection
            .min(self.expenses.len().saturating_sub(1));
    }

    pub fn select_next_expense(&mut self) {
        if self.expense_selection + 1 < self.expenses.len() {
            self.expense_selection += 1;
        }
    }

    pub fn select_prev_expense(&mut self) {
        self.expense_selection = self.expense_selection.saturating_sub(1);
    }

    // =========================================================================
    // Premium
    // =========================================================================

    pub fn premium_available(&self) -> bool {
        self.expenses.premium_eligible()
    }

    /// Toggle the premium theme and remember the choice.
    pub fn toggle_premium_theme(&mut self) {
        if !self.premium_available() {
            return;
        }
        let enabled = !self.config.premium_theme;
        self.config.premium_theme = enabled;
        self.persist_config(|c| c.premium_theme = enabled);
        self.status_message = Some(
            if enabled {
                "Premium activated"
            } else {
                "Premium theme off"
            }
            .to_string(),
        );
    }

    /// Write the expense list as CSV into `dir`.
    pub fn download_expenses(&mut self, dir: &Path) {
        if !self.premium_available() {
            return;
        }
        let path = dir.join(EXPORT_FILE_NAME);
        match write_csv(&path, self.expenses.iter()) {
            Ok(()) => {
                info!(path = %path.display(), "Expenses exported");
                self.status_message = Some(format!("Saved {}", path.display()));
            }
            Err(e) => {
                error!(error = %e, "Export failed");
                self.status_message = Some(format!("Export failed: {}", e));
            }
        }
    }

    fn persist_config(&self, change: impl FnOnce(&mut Config)) {
        let Some(path) = self.config_path.as_deref() else {
            return;
        };
        if let Err(e) = Config::update_file(path, change) {
            warn!(error = %e, "Failed to save config");
        }
    }

    // =========================================================================
    // Background results
    // =========================================================================

    /// Check for completed background tasks and session transitions
    pub async fn check_background_tasks(&mut self) {
        while let Ok(result) = self.task_rx.try_recv() {
            self.process_task_result(result);
        }
        self.check_verification_poll().await;
        self.sync_auth_state();
    }

    fn process_task_result(&mut self, result: TaskResult) {
        self.busy = false;
        match result {
            TaskResult::Authenticated(Ok(auth)) => self.on_authenticated(auth),
            TaskResult::Authenticated(Err(message)) => self.auth_form.error = Some(message),
            TaskResult::ResetSent(result) => {
                self.reset_message = Some(match result {
                    Ok(()) => "Check your inbox for a reset link".to_string(),
                    Err(message) => message,
                });
            }
            TaskResult::ProfileLoaded(Ok(profile)) => {
                if self.is_logged_in() {
                    self.profile_name = profile.display_name.clone().unwrap_or_default();
                    self.profile_photo = profile.photo_url.clone().unwrap_or_default();
                    self.profile = Some(profile);
                }
            }
            TaskResult::ProfileLoaded(Err(message)) => {
                warn!(%message, "Profile lookup failed");
                self.status_message = Some(message);
            }
            TaskResult::ProfileSaved(Ok(_)) if !self.is_logged_in() => {
                debug!("Dropping profile update for an ended session");
            }
            TaskResult::ProfileSaved(Ok(saved)) => {
                let profile = self.profile.get_or_insert_with(UserProfile::default);
                profile.display_name = saved.display_name.or(profile.display_name.take());
                profile.photo_url = saved.photo_url.or(profile.photo_url.take());
                self.status_message = Some("Profile updated".to_string());
            }
            TaskResult::ProfileSaved(Err(message)) => self.form_error = Some(message),
            TaskResult::VerificationSent(Ok(())) => {
                if self.is_logged_in() {
                    self.verification_sent = true;
                    self.status_message = Some("Verification email sent".to_string());
                    self.start_verification_poll();
                }
            }
            TaskResult::VerificationSent(Err(message)) => self.status_message = Some(message),
            TaskResult::ExpensesLoaded { user_id, result } => {
                let current = self.sessions.current_session();
                if current.map(|s| s.user_id) != Some(user_id) {
                    debug!("Dropping expenses loaded for an ended session");
                    return;
                }
                match result {
                    Ok(expenses) if self.pending.is_empty() => {
                        self.expenses.replace_all(expenses);
                        self.clamp_selection();
                    }
                    Ok(_) => debug!("Skipping list refresh while changes are pending"),
                    Err(message) => self.form_error = Some(message),
                }
            }
            TaskResult::ExpenseSynced { op, result } => {
                let Some(change) = self.pending.remove(&op) else {
                    debug!(op, "Dropping result for a discarded change");
                    return;
                };
                match result {
                    Ok(server_id) => self.expenses.commit(change, server_id),
                    Err(message) => {
                        self.expenses.rollback(change);
                        self.clamp_selection();
                        self.form_error = Some(message);
                    }
                }
            }
        }
    }

    /// Stop background work tied to the session. The persisted session is kept.
    pub fn shutdown(&mut self) {
        self.stop_verification_poll();
        self.sessions.shutdown();
    }
}

async fn send_result(tx: &mpsc::Sender<TaskResult>, result: TaskResult) {
    if let Err(e) = tx.send(result).await {
        warn!(error = %e, "Failed to deliver background result (receiver dropped)");
    }
}

/// Turn an error into text for the UI.
pub fn user_message(e: &anyhow::Error) -> String {
    match e.downcast_ref::<ApiError>() {
        Some(ApiError::NetworkError(inner)) if inner.is_timeout() => {
            "Connection timed out. Please try again.".to_string()
        }
        Some(ApiError::NetworkError(_)) => {
            "Unable to connect to server. Check your internet connection.".to_string()
        }
        Some(api) => api.to_string(),
        None => e.to_string(),
    }
}

// ============================================================================
// Input validation helpers (exported for use in input.rs)
// ============================================================================

/// Check if a character is valid for input (no control characters)
fn is_valid_input_char(c: char) -> bool {
    !c.is_control()
}

fn push_limited(field: &mut String, c: char, max_len: usize) {
    if field.chars().count() < max_len && is_valid_input_char(c) {
        field.push(c);
    }
}

/// Append to a free text field
pub fn push_text(field: &mut String, c: char) {
    push_limited(field, c, MAX_TEXT_LENGTH);
}

/// Append to the amount field; only digits and one decimal point.
pub fn push_amount(field: &mut String, c: char) {
    let ok = c.is_ascii_digit() || (c == '.' && !field.contains('.'));
    if ok {
        push_limited(field, c, MAX_AMOUNT_LENGTH);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use expensetrack_core::auth::{Clock, MemorySessionStore, SessionRecord};
    use expensetrack_core::models::ExpenseDraft;

    /// Wall clock that follows tokio's paused test time.
    struct PausedClock {
        origin: tokio::time::Instant,
        start: chrono::DateTime<Utc>,
    }

    impl Clock for PausedClock {
        fn now(&self) -> chrono::DateTime<Utc> {
            let elapsed = tokio::time::Instant::now() - self.origin;
            self.start + Duration::from_std(elapsed).unwrap()
        }
    }

    fn test_app(store: Arc<MemorySessionStore>) -> App {
        let clock = Arc::new(PausedClock {
            origin: tokio::time::Instant::now(),
            start: Utc::now(),
        });
        let sessions = SessionManager::restore(store, clock, Duration::minutes(5));
        let identity = IdentityClient::new("http://127.0.0.1:9", Some("KEY".to_string())).unwrap();
        let expenses = ExpenseClient::new("http://127.0.0.1:9").unwrap();
        App::new(Config::default(), None, sessions, identity, Some(expenses))
    }

    fn draft(money: f64) -> ExpenseDraft {
        ExpenseDraft {
            money,
            description: "Item".to_string(),
            category: Category::Food,
        }
    }

    #[test]
    fn test_view_requires_session() {
        assert!(View::Expenses.requires_session());
        assert!(View::Profile.requires_session());
        assert!(!View::Auth.requires_session());
        assert!(!View::Home.requires_session());
    }

    #[test]
    fn test_auth_form_field_order() {
        let mut form = AuthForm::new(String::new());
        assert_eq!(form.focus, AuthField::Email);
        form.next_field();
        form.next_field();
        assert_eq!(form.focus, AuthField::Submit);

        form.toggle_mode();
        assert_eq!(form.mode, AuthMode::Signup);
        form.next_field();
        form.next_field();
        assert_eq!(form.focus, AuthField::Confirm);
        form.prev_field();
        assert_eq!(form.focus, AuthField::Password);
    }

    #[test]
    fn test_auth_form_prefilled_email_focuses_password() {
        let form = AuthForm::new("a@b.com".to_string());
        assert_eq!(form.focus, AuthField::Password);
    }

    #[test]
    fn test_push_amount() {
        let mut field = String::new();
        for c in "12a.5.0".chars() {
            push_amount(&mut field, c);
        }
        assert_eq!(field, "12.50");
    }

    #[test]
    fn test_push_text_rejects_control_chars() {
        let mut field = String::new();
        push_text(&mut field, 'x');
        push_text(&mut field, '\n');
        push_text(&mut field, '\t');
        assert_eq!(field, "x");
    }

    #[tokio::test(start_paused = true)]
    async fn test_starts_on_welcome_with_stored_session() {
        let expires = Utc::now() + Duration::minutes(3);
        let store = Arc::new(MemorySessionStore::with_record(SessionRecord {
            token: Some("tok".to_string()),
            user_id: Some("u1".to_string()),
            token_expiry: Some(expires.timestamp_millis()),
        }));
        let app = test_app(store);
        assert_eq!(app.view, View::Welcome);
        assert!(app.is_logged_in());
    }

    #[tokio::test(start_paused = true)]
    async fn test_protected_view_redirects_to_auth() {
        let mut app = test_app(Arc::new(MemorySessionStore::new()));
        assert_eq!(app.view, View::Home);
        app.set_view(View::Expenses);
        assert_eq!(app.view, View::Auth);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expiry_moves_to_auth_view() {
        let mut app = test_app(Arc::new(MemorySessionStore::new()));
        app.on_authenticated(AuthSuccess {
            token: "tok".to_string(),
            user_id: "u1".to_string(),
            email: "a@b.com".to_string(),
        });
        assert_eq!(app.view, View::Welcome);
        app.expenses.replace_all(vec![Expense::from_draft("e1", draft(5.0))]);

        tokio::time::sleep(std::time::Duration::from_secs(301)).await;
        app.check_background_tasks().await;

        assert!(!app.is_logged_in());
        assert_eq!(app.view, View::Auth);
        assert!(app.expenses.is_empty());
        assert_eq!(
            app.status_message.as_deref(),
            Some("Session expired. Please log in again.")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_logout_clears_state() {
        let mut app = test_app(Arc::new(MemorySessionStore::new()));
        app.on_authenticated(AuthSuccess {
            token: "tok".to_string(),
            user_id: "u1".to_string(),
            email: "a@b.com".to_string(),
        });
        app.logout();
        assert_eq!(app.view, View::Auth);
        assert_eq!(app.status_message.as_deref(), Some("Logged out"));
        assert_eq!(app.auth_form.email, "a@b.com");
        assert_eq!(app.auth_form.focus, AuthField::Password);
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_profile_save_ignored_after_logout() {
        let mut app = test_app(Arc::new(MemorySessionStore::new()));
        app.on_authenticated(AuthSuccess {
            token: "tok".to_string(),
            user_id: "u1".to_string(),
            email: "a@b.com".to_string(),
        });
        app.logout();

        app.process_task_result(TaskResult::ProfileSaved(Ok(UserProfile {
            user_id: "u1".to_string(),
            display_name: Some("Asha".to_string()),
            ..UserProfile::default()
        })));
        assert!(app.profile.is_none());
        assert_eq!(app.status_message.as_deref(), Some("Logged out"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_sync_rolls_back() {
        let mut app = test_app(Arc::new(MemorySessionStore::new()));
        let change = app.expenses.begin_add(draft(10.0));
        let op = app.track(change);
        assert_eq!(app.expenses.len(), 1);

        app.process_task_result(TaskResult::ExpenseSynced {
            op,
            result: Err("Access denied".to_string()),
        });
        assert!(app.expenses.is_empty());
        assert_eq!(app.form_error.as_deref(), Some("Access denied"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_successful_sync_commits_id() {
        let mut app = test_app(Arc::new(MemorySessionStore::new()));
        let change = app.expenses.begin_add(draft(10.0));
        let op = app.track(change);

        app.process_task_result(TaskResult::ExpenseSynced {
            op,
            result: Ok(Some("-Nx1".to_string())),
        });
        assert_eq!(app.expenses.as_slice()[0].id, "-Nx1");
        assert!(app.pending.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_expense_form_sets_error() {
        let mut app = test_app(Arc::new(MemorySessionStore::new()));
        app.expense_form.description = "Tea".to_string();
        app.submit_expense();
        assert_eq!(app.form_error.as_deref(), Some("Please fill all fields"));
        assert!(app.expenses.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_download_requires_premium() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = test_app(Arc::new(MemorySessionStore::new()));
        app.expenses.replace_all(vec![Expense::from_draft("e1", draft(50.0))]);
        app.download_expenses(dir.path());
        assert!(!dir.path().join(EXPORT_FILE_NAME).exists());

        app.expenses.replace_all(vec![Expense::from_draft("e1", draft(20_000.0))]);
        app.download_expenses(dir.path());
        assert!(dir.path().join(EXPORT_FILE_NAME).exists());
    }

    #[tokio::test(start_paused = true)]
    async fn test_premium_theme_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = test_app(Arc::new(MemorySessionStore::new()));
        app.config_path = Some(dir.path().join("config.json"));
        app.expenses.replace_all(vec![Expense::from_draft("e1", draft(20_000.0))]);

        app.toggle_premium_theme();
        assert!(app.config.premium_theme);
        let saved = Config::load_from(&dir.path().join("config.json")).unwrap();
        assert!(saved.premium_theme);
    }

    #[test]
    fn test_user_message_for_identity_error() {
        let err = anyhow::Error::from(ApiError::Identity("EMAIL_EXISTS".to_string()));
        assert!(!user_message(&err).contains("EMAIL_EXISTS"));
        let other = anyhow::anyhow!("plain failure");
        assert_eq!(user_message(&other), "plain failure");
    }
}

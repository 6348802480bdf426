// Application State
// The application context: credential, repository link, cached status and the
// background work that reports back through the work queue

use git2::Oid;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::runtime::Handle;
use tracing::{debug, error, info, warn};

use super::events::Command;
use super::host::Host;
use super::work_queue::{WorkQueue, WorkSender};
use super::AppConfig;
use crate::dashboard::{DashboardState, NotificationLevel};
use crate::operations::{
    AdminError, AuthorizationHandle, Credential, CredentialStore, Favor, LegalAction, MergeOutcome, OAuthError,
    OAuthFlow, PresentationRepo, RegistrationState, RemoteRepo, RemoteRepoAdmin, RepositoryLink,
    RetryPolicy, SharedGithubApi, SharedLink, SyncEngine, SyncError, SyncStatus, TokenValidation,
};

/// The long-lived collaborators background tasks share
#[derive(Clone)]
pub struct Services {
    pub api: SharedGithubApi,
    pub oauth: Arc<OAuthFlow>,
    pub admin: Arc<RemoteRepoAdmin>,
    pub engine: Arc<SyncEngine>,
}

impl Services {
    /// Wire every service to `api`; avatars are cached under `avatar_dir` when given
    pub fn from_config(config: &AppConfig, api: SharedGithubApi, avatar_dir: Option<PathBuf>) -> Self {
        let mut oauth = OAuthFlow::new(config.oauth.clone(), api.clone());
        if let Some(dir) = avatar_dir {
            oauth = oauth.with_avatar_dir(dir);
        }
        let admin = RemoteRepoAdmin::new(
            api.clone(),
            config.github.clone(),
            RetryPolicy::from_settings(&config.sync),
        );

        Self {
            api,
            oauth: Arc::new(oauth),
            admin: Arc::new(admin),
            engine: Arc::new(SyncEngine::new(config.sync.fetch_period)),
        }
    }
}

/// What the host renders
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusView {
    pub legal_action: LegalAction,
    pub ahead: usize,
    pub behind: usize,
    pub pending_local_changes: usize,
    pub registration: RegistrationState,
}

/// Lock-free copy of the link fields the UI shows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkSummary {
    pub local_path: PathBuf,
    /// `owner/name`, empty without a remote
    pub remote: String,
    pub resolved: bool,
    pub pages_url: Option<String>,
}

impl LinkSummary {
    fn from_link(link: &RepositoryLink) -> Self {
        let remote = if link.has_remote() {
            format!("{}/{}", link.remote_owner, link.remote_name)
        } else {
            String::new()
        };
        Self {
            local_path: link.local_path.clone(),
            remote,
            resolved: link.remote.is_some(),
            pages_url: link.pages_url.clone(),
        }
    }

    pub fn has_remote(&self) -> bool {
        !self.remote.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputPrompt {
    CommitMessage,
    PresentationName,
}

impl InputPrompt {
    pub fn title(self) -> &'static str {
        match self {
            InputPrompt::CommitMessage => "Commit message",
            InputPrompt::PresentationName => "New presentation repository name",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputState {
    pub prompt: InputPrompt,
    pub buffer: String,
}

/// A sync command reduced to what runs under the link lock
#[derive(Debug, Clone, PartialEq, Eq)]
enum SyncJob {
    Commit(String),
    Push,
    Pull,
    Merge(Favor),
}

impl SyncJob {
    fn from_command(command: &Command) -> Option<Self> {
        match command {
            Command::Commit(message) => Some(SyncJob::Commit(message.clone())),
            Command::Push => Some(SyncJob::Push),
            Command::Pull => Some(SyncJob::Pull),
            Command::MergeTheirs => Some(SyncJob::Merge(Favor::Theirs)),
            Command::MergeOurs => Some(SyncJob::Merge(Favor::Ours)),
            _ => None,
        }
    }

    fn run(
        &self,
        engine: &SyncEngine,
        link: &mut RepositoryLink,
        credential: &Credential,
    ) -> Result<SyncReport, SyncError> {
        match self {
            SyncJob::Commit(message) => engine
                .commit(link, message, credential)
                .map(SyncReport::Committed),
            SyncJob::Push => {
                engine.ensure_clean(link)?;
                engine.push(link, credential)?;
                Ok(SyncReport::Pushed)
            }
            SyncJob::Pull => {
                engine.ensure_clean(link)?;
                engine.pull(link, credential, Favor::Ours).map(SyncReport::Pulled)
            }
            SyncJob::Merge(favor) => {
                engine.ensure_clean(link)?;
                let outcome = engine.pull(link, credential, *favor)?;
                engine.push(link, credential)?;
                Ok(SyncReport::Synced(outcome))
            }
        }
    }
}

/// What a finished sync command did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncReport {
    Committed(Oid),
    Pushed,
    Pulled(MergeOutcome),
    Synced(MergeOutcome),
}

impl SyncReport {
    pub fn requires_reload(&self) -> bool {
        match self {
            SyncReport::Pulled(outcome) | SyncReport::Synced(outcome) => outcome.requires_reload(),
            SyncReport::Committed(_) | SyncReport::Pushed => false,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            SyncReport::Committed(oid) => format!("committed {:.7}", oid.to_string()),
            SyncReport::Pushed => "pushed to remote".to_string(),
            SyncReport::Pulled(outcome) => outcome.describe(),
            SyncReport::Synced(outcome) => format!("{}, then pushed", outcome.describe()),
        }
    }
}

/// Run blocking git work off the async workers
async fn run_blocking<T, F>(work: F) -> Result<T, SyncError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, SyncError> + Send + 'static,
{
    match tokio::task::spawn_blocking(work).await {
        Ok(result) => result,
        Err(e) => Err(SyncError::Background(e.to_string())),
    }
}

/// Callback, code exchange and validation, reporting each step to the UI
async fn register(
    oauth: &OAuthFlow,
    handle: &AuthorizationHandle,
    progress: &WorkSender<App>,
) -> Result<Credential, OAuthError> {
    let code = oauth.await_callback(handle).await?;
    progress.run_on_ui(|app| app.registration = RegistrationState::ExchangingToken);

    let credential = oauth.exchange_code(&code).await?;
    progress.run_on_ui(|app| app.registration = RegistrationState::ValidatingToken);

    match oauth.validate_token(&credential.access_token).await {
        TokenValidation::Valid(_) => Ok(credential),
        TokenValidation::Invalid => Err(OAuthError::TokenExchange(
            "the new access token failed validation".to_string(),
        )),
    }
}

/// Main application state
pub struct App {
    pub config: AppConfig,
    pub credentials: CredentialStore,
    pub registration: RegistrationState,

    /// Repository of the current working file
    pub link: Option<SharedLink>,
    pub link_summary: Option<LinkSummary>,
    pub working_file: Option<PathBuf>,

    /// Last computed status; see `refresh_status`
    pub status: SyncStatus,
    pub status_error: Option<String>,
    status_refreshed_at: Option<Instant>,

    /// Command running in the background, at most one
    pub in_flight: Option<Command>,
    refetch_in_flight: bool,
    last_refetch: Option<Instant>,
    /// Last fetch attempt per repository root, kept across re-discovery
    fetch_times: HashMap<PathBuf, Instant>,

    pub dashboard: DashboardState,
    pub input: Option<InputState>,
    pub should_quit: bool,

    services: Services,
    host: Arc<dyn Host>,
    runtime: Handle,
    queue: WorkQueue<App>,
}

impl App {
    /// Create the application context; call `start` afterwards
    pub fn new(
        config: AppConfig,
        credentials: CredentialStore,
        services: Services,
        host: Arc<dyn Host>,
        runtime: Handle,
    ) -> Self {
        Self {
            config,
            credentials,
            registration: RegistrationState::NoCredential,
            link: None,
            link_summary: None,
            working_file: None,
            status: SyncStatus::default(),
            status_error: None,
            status_refreshed_at: None,
            in_flight: None,
            refetch_in_flight: false,
            last_refetch: None,
            fetch_times: HashMap::new(),
            dashboard: DashboardState::new(),
            input: None,
            should_quit: false,
            services,
            host,
            runtime,
            queue: WorkQueue::new(),
        }
    }

    /// Re-validate a stored credential in the background
    pub fn start(&mut self) {
        let Some(credential) = self.credentials.get().cloned() else {
            self.dashboard.add_output_line("Not registered; press g to register with GitHub");
            return;
        };

        self.registration = RegistrationState::ValidatingToken;
        self.dashboard.add_output_line(format!(
            "Validating stored credential for {}",
            credential.owner_login
        ));

        let oauth = self.services.oauth.clone();
        let sender = self.sender();
        self.runtime.spawn(async move {
            let validation = oauth.validate_token(&credential.access_token).await;
            sender.run_on_ui(move |app| app.finish_validation(credential, validation));
        });
    }

    pub fn sender(&self) -> WorkSender<App> {
        self.queue.sender()
    }

    /// One UI tick: completed background work first, then the status
    pub fn tick(&mut self) {
        self.drain_work_queue();
        self.refresh_status();
        self.maybe_refetch();
    }

    /// Run every queued job, including jobs queued while draining
    pub fn drain_work_queue(&mut self) -> usize {
        let mut ran = 0;
        loop {
            let jobs = self.queue.take_pending();
            if jobs.is_empty() {
                return ran;
            }
            for job in jobs {
                job(self);
                ran += 1;
            }
        }
    }

    /// Recompute the status unless the cached one is younger than the debounce window
    pub fn refresh_status(&mut self) {
        if let Some(at) = self.status_refreshed_at {
            if at.elapsed() < self.config.sync.status_debounce {
                return;
            }
        }
        self.refresh_status_now();
    }

    /// Force the next `refresh_status` to recompute
    pub fn invalidate_status(&mut self) {
        self.status_refreshed_at = None;
    }

    fn refresh_status_now(&mut self) {
        let Some(link) = self.link.clone() else {
            self.status = SyncStatus::default();
            self.status_error = None;
            return;
        };
        // A background operation holds the link; keep the cached status
        let Ok(guard) = link.try_lock() else {
            return;
        };

        match self.services.engine.status(&guard) {
            Ok(status) => {
                self.status = status;
                self.status_error = None;
            }
            Err(e) => {
                debug!(error = %e, "status unavailable");
                self.status = SyncStatus::default();
                self.status_error = Some(e.to_string());
            }
        }
        self.status_refreshed_at = Some(Instant::now());
    }

    /// Status plus the action the host should offer
    pub fn view(&self) -> StatusView {
        let idle = self.in_flight.is_none()
            && self.registration == RegistrationState::Registered
            && self.link.is_some()
            && self.status_error.is_none();
        let legal_action = if idle {
            SyncEngine::legal_action(&self.status, self.host.is_dirty())
        } else {
            LegalAction::None
        };

        StatusView {
            legal_action,
            ahead: self.status.commits_ahead,
            behind: self.status.commits_behind,
            pending_local_changes: self.status.pending_local_changes,
            registration: self.registration,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some() || self.registration.is_busy()
    }

    /// Imperative entry point for every user action
    pub fn trigger(&mut self, command: Command) {
        if let Some(running) = &self.in_flight {
            let message = format!("{} is still running", running.label());
            self.dashboard
                .notify(NotificationLevel::Warning, command.label(), message);
            return;
        }
        debug!(?command, "trigger");

        let credential = self.registered_credential();
        if command.needs_credential() && credential.is_none() {
            self.report_sync_failure(command.label(), &SyncError::NotRegistered);
            return;
        }

        match (command, credential) {
            (Command::Register, _) => self.start_registration(),
            (Command::Deregister, _) => self.deregister(),
            (Command::Refresh, _) => self.refresh(),
            (Command::OpenWorkingFile(path), _) => self.open_working_file(path),
            (Command::SetupPresentation { name, dir }, Some(credential)) => {
                self.start_presentation(name, dir, credential)
            }
            (sync, Some(credential)) => self.start_sync(sync, credential),
            // Refused above
            (_, None) => {}
        }
    }

    /// Run whatever `legal_action` currently allows
    pub fn perform_legal_action(&mut self) {
        match self.view().legal_action {
            LegalAction::Commit => self.begin_input(InputPrompt::CommitMessage),
            LegalAction::Push => self.trigger(Command::Push),
            LegalAction::Pull => self.trigger(Command::Pull),
            LegalAction::Sync => self.dashboard.add_output_line(
                "Local and remote diverged: press t to keep remote changes or m to keep local changes",
            ),
            LegalAction::None => self.dashboard.add_output_line("Nothing to do"),
        }
    }

    pub fn begin_input(&mut self, prompt: InputPrompt) {
        self.input = Some(InputState {
            prompt,
            buffer: String::new(),
        });
    }

    pub fn cancel_input(&mut self) {
        self.input = None;
    }

    /// Turn the typed text into the command the prompt was opened for
    pub fn submit_input(&mut self) {
        let Some(input) = self.input.take() else {
            return;
        };
        let text = input.buffer.trim().to_string();
        if text.is_empty() {
            self.dashboard.add_output_line(format!("{} left empty, cancelled", input.prompt.title()));
            return;
        }

        match input.prompt {
            InputPrompt::CommitMessage => self.trigger(Command::Commit(text)),
            InputPrompt::PresentationName => {
                let dir = self.presentation_dir(&text);
                self.trigger(Command::SetupPresentation { name: text, dir });
            }
        }
    }

    /// New presentations are cloned next to the current repository
    fn presentation_dir(&self, name: &str) -> PathBuf {
        let base = self
            .link_summary
            .as_ref()
            .and_then(|summary| summary.local_path.parent().map(Path::to_path_buf))
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_default();
        base.join(name)
    }

    /// Re-read the working file given at start-up
    pub fn reopen_working_file(&mut self) {
        match self.working_file.clone() {
            Some(path) => self.trigger(Command::OpenWorkingFile(path)),
            None => self.dashboard.add_output_line("No working file; pass --file"),
        }
    }

    /// Credential usable for remote work
    fn registered_credential(&self) -> Option<Credential> {
        if self.registration == RegistrationState::Registered {
            self.credentials.get().cloned()
        } else {
            None
        }
    }

    fn report_sync_failure(&mut self, title: &str, e: &SyncError) {
        error!(command = title, error = %e, "command failed");
        let level = if e.is_fatal() {
            NotificationLevel::Fatal
        } else {
            NotificationLevel::Error
        };
        let mut message = e.to_string();
        if e.is_retryable() {
            message.push_str(" (try again later)");
        }
        self.dashboard.notify(level, title, message);
    }

    // ── Repository link ─────────────────────────────────────────────────

    fn open_working_file(&mut self, path: PathBuf) {
        self.working_file = Some(path.clone());
        self.status = SyncStatus::default();
        self.status_error = None;
        self.invalidate_status();

        match RepositoryLink::discover(&path) {
            Some(mut link) => {
                let fetched_at = self.fetch_times.get(&link.local_path).copied();
                link.last_fetch = fetched_at;
                self.last_refetch = fetched_at;
                let summary = LinkSummary::from_link(&link);
                self.dashboard.add_output_line(format!(
                    "Repository {} ({})",
                    summary.local_path.display(),
                    if summary.has_remote() {
                        summary.remote.as_str()
                    } else {
                        "no remote"
                    }
                ));
                self.link_summary = Some(summary);
                self.link = Some(link.into_shared());
                self.resolve_and_refetch();
            }
            None => {
                self.dashboard
                    .add_output_line(format!("{} is not inside a git repository", path.display()));
                self.link = None;
                self.link_summary = None;
                self.last_refetch = None;
            }
        }
    }

    /// Look the remote up on GitHub, then fetch
    fn resolve_and_refetch(&mut self) {
        let (Some(link), Some(credential)) = (self.link.clone(), self.registered_credential()) else {
            return;
        };
        if !self.link_summary.as_ref().is_some_and(LinkSummary::has_remote) {
            return;
        }

        let api = self.services.api.clone();
        let engine = self.services.engine.clone();
        let sender = self.sender();
        self.refetch_in_flight = true;
        if self.fetch_due() {
            self.note_fetch_attempt();
        }

        self.runtime.spawn(async move {
            let resolved = {
                let mut guard = link.lock().await;
                guard
                    .resolve_remote(api.as_ref(), &credential)
                    .await
                    .map(|remote| (remote, guard.pages_url.clone()))
            };

            let fetch_link = link.clone();
            let refetched = run_blocking(move || {
                let mut guard = fetch_link.blocking_lock();
                engine.refetch(&mut guard, &credential)
            })
            .await;

            sender.run_on_ui(move |app| app.finish_link_setup(link, resolved, refetched));
        });
    }

    fn finish_link_setup(
        &mut self,
        link: SharedLink,
        resolved: Result<(RemoteRepo, Option<String>), SyncError>,
        refetched: Result<bool, SyncError>,
    ) {
        self.refetch_in_flight = false;
        if !self.link.as_ref().is_some_and(|current| Arc::ptr_eq(current, &link)) {
            debug!("dropping result for a repository that is no longer open");
            return;
        }

        match resolved {
            Ok((remote, pages_url)) => {
                info!(repo = %remote.full_name, "remote resolved");
                if let Some(summary) = self.link_summary.as_mut() {
                    summary.resolved = true;
                    summary.pages_url = pages_url;
                }
                self.dashboard
                    .add_output_line(format!("Linked to {}", remote.html_url));
            }
            Err(e) => {
                warn!(error = %e, "remote lookup failed");
                self.dashboard
                    .add_output_line(format!("Remote lookup failed: {e}"));
            }
        }
        self.finish_refetch(refetched);
    }

    /// Background fetch once the fetch period has passed
    fn maybe_refetch(&mut self) {
        if self.refetch_in_flight || self.in_flight.is_some() {
            return;
        }
        if !self.fetch_due() {
            return;
        }
        let (Some(link), Some(credential)) = (self.link.clone(), self.registered_credential()) else {
            return;
        };
        if !self.link_summary.as_ref().is_some_and(LinkSummary::has_remote) {
            return;
        }

        self.refetch_in_flight = true;
        self.note_fetch_attempt();
        let engine = self.services.engine.clone();
        let sender = self.sender();
        self.runtime.spawn(async move {
            let result = run_blocking(move || {
                let mut guard = link.blocking_lock();
                engine.refetch(&mut guard, &credential)
            })
            .await;
            sender.run_on_ui(move |app| app.finish_refetch(result));
        });
    }

    fn fetch_due(&self) -> bool {
        self.last_refetch
            .map_or(true, |at| at.elapsed() >= self.services.engine.fetch_period())
    }

    fn note_fetch_attempt(&mut self) {
        let now = Instant::now();
        self.last_refetch = Some(now);
        if let Some(summary) = &self.link_summary {
            self.fetch_times.insert(summary.local_path.clone(), now);
        }
    }

    fn finish_refetch(&mut self, result: Result<bool, SyncError>) {
        self.refetch_in_flight = false;
        match result {
            Ok(true) => self.invalidate_status(),
            Ok(false) => {}
            Err(e) => {
                warn!(error = %e, "background fetch failed");
                self.dashboard
                    .add_output_line(format!("Background fetch failed: {e}"));
            }
        }
    }

    fn refresh(&mut self) {
        self.invalidate_status();
        self.refresh_status_now();
        let unresolved = self.link_summary.as_ref().is_some_and(|s| !s.resolved);
        if unresolved && !self.refetch_in_flight {
            self.resolve_and_refetch();
        } else {
            self.last_refetch = None;
            self.maybe_refetch();
        }
    }

    // ── Sync commands ───────────────────────────────────────────────────

    /// Preconditions checked on the UI thread before anything is spawned
    fn sync_gate(&mut self, command: &Command) -> Result<SharedLink, SyncError> {
        let link = self.link.clone().ok_or(SyncError::NoRepository)?;

        if command.needs_clean_tree() {
            self.refresh_status_now();
            if self.status.pending_local_changes > 0 {
                return Err(SyncError::UncommittedChanges(self.status.pending_local_changes));
            }
        }
        Ok(link)
    }

    fn start_sync(&mut self, command: Command, credential: Credential) {
        let Some(job) = SyncJob::from_command(&command) else {
            return;
        };
        let link = match self.sync_gate(&command) {
            Ok(link) => link,
            Err(e) => {
                self.report_sync_failure(command.label(), &e);
                return;
            }
        };

        self.in_flight = Some(command.clone());
        self.dashboard
            .add_output_line(format!("{} started", command.label()));
        let engine = self.services.engine.clone();
        let sender = self.sender();
        self.runtime.spawn(async move {
            let result = run_blocking(move || {
                let mut guard = link.blocking_lock();
                job.run(&engine, &mut guard, &credential)
            })
            .await;
            sender.run_on_ui(move |app| app.finish_sync(command, result));
        });
    }

    fn finish_sync(&mut self, command: Command, result: Result<SyncReport, SyncError>) {
        self.in_flight = None;
        self.invalidate_status();
        match result {
            Ok(report) => {
                info!(command = command.label(), report = %report.describe(), "command finished");
                self.dashboard
                    .notify(NotificationLevel::Info, command.label(), report.describe());
                if report.requires_reload() {
                    self.host.reload_working_tree();
                }
            }
            Err(e) => self.report_sync_failure(command.label(), &e),
        }
    }

    // ── Registration ────────────────────────────────────────────────────

    fn start_registration(&mut self) {
        if self.registration != RegistrationState::NoCredential {
            let message = format!("already {}", self.registration.description());
            self.dashboard
                .notify(NotificationLevel::Warning, "Register", message);
            return;
        }

        let handle = match self.services.oauth.begin_authorization() {
            Ok(handle) => handle,
            Err(e) => {
                self.fail_registration(e);
                return;
            }
        };

        self.registration = self.registration.advance();
        self.host.open_url(handle.url.as_str());
        self.registration = self.registration.advance();
        self.dashboard.add_output_line(format!(
            "Waiting for GitHub authorization on port {}",
            handle.callback_port
        ));

        let oauth = self.services.oauth.clone();
        let sender = self.sender();
        self.runtime.spawn(async move {
            let result = register(&oauth, &handle, &sender).await;
            sender.run_on_ui(move |app| app.finish_registration(result));
        });
    }

    fn finish_registration(&mut self, result: Result<Credential, OAuthError>) {
        match result {
            Ok(credential) => {
                let login = credential.owner_login.clone();
                if let Err(e) = self.credentials.set(credential) {
                    error!(error = %format!("{e:#}"), "could not persist credential");
                    self.dashboard.notify(
                        NotificationLevel::Warning,
                        "Register",
                        format!("registered, but the credential could not be saved: {e:#}"),
                    );
                }
                self.registration = RegistrationState::Registered;
                info!(%login, "registered");
                self.dashboard
                    .notify(NotificationLevel::Info, "Register", format!("registered as {login}"));
                self.resolve_and_refetch();
            }
            Err(e) => self.fail_registration(e),
        }
    }

    fn fail_registration(&mut self, e: OAuthError) {
        error!(error = %e, "registration failed");
        self.registration = RegistrationState::NoCredential;
        self.dashboard
            .notify(NotificationLevel::Error, "Register", e.to_string());
    }

    fn finish_validation(&mut self, stored: Credential, validation: TokenValidation) {
        match validation {
            TokenValidation::Valid(mut fresh) => {
                if fresh.owner_avatar_url.is_none() {
                    fresh.owner_avatar_url = stored.owner_avatar_url.clone();
                }
                if fresh != stored {
                    if let Err(e) = self.credentials.set(fresh.clone()) {
                        warn!(error = %format!("{e:#}"), "could not update stored identity");
                    }
                }
                self.registration = RegistrationState::Registered;
                self.dashboard
                    .add_output_line(format!("Registered as {}", fresh.owner_login));
                self.resolve_and_refetch();
            }
            TokenValidation::Invalid => {
                if let Err(e) = self.credentials.clear() {
                    warn!(error = %format!("{e:#}"), "could not clear stored credential");
                }
                self.registration = RegistrationState::NoCredential;
                self.dashboard.notify(
                    NotificationLevel::Warning,
                    "Register",
                    "stored credential is no longer valid; register again",
                );
            }
        }
    }

    fn deregister(&mut self) {
        if self.registration.is_busy() {
            self.dashboard.notify(
                NotificationLevel::Warning,
                "Deregister",
                format!("registration is {}", self.registration.description()),
            );
            return;
        }

        match self.services.oauth.revoke_local(&mut self.credentials) {
            Ok(url) => {
                self.registration = RegistrationState::NoCredential;
                if let Some(link) = self.link.clone() {
                    self.runtime.spawn(async move {
                        link.lock().await.forget_remote();
                    });
                }
                if let Some(summary) = self.link_summary.as_mut() {
                    summary.resolved = false;
                    summary.pages_url = None;
                }
                self.host.open_url(&url);
                self.dashboard.notify(
                    NotificationLevel::Info,
                    "Deregister",
                    "credential removed; revoke the application's access on the opened page",
                );
            }
            Err(e) => self
                .dashboard
                .notify(NotificationLevel::Error, "Deregister", e.to_string()),
        }
    }

    // ── Presentation repositories ───────────────────────────────────────

    fn start_presentation(&mut self, name: String, dir: PathBuf, credential: Credential) {
        let command = Command::SetupPresentation {
            name: name.clone(),
            dir: dir.clone(),
        };

        self.in_flight = Some(command.clone());
        self.dashboard.add_output_line(format!(
            "Creating {}/{} in {}",
            credential.owner_login,
            name,
            dir.display()
        ));
        let admin = self.services.admin.clone();
        let sender = self.sender();
        self.runtime.spawn(async move {
            let result = admin.setup_presentation(&name, &dir, &credential).await;
            sender.run_on_ui(move |app| app.finish_presentation(command, result));
        });
    }

    fn finish_presentation(&mut self, command: Command, result: Result<PresentationRepo, AdminError>) {
        self.in_flight = None;
        match result {
            Ok(presentation) => {
                info!(repo = %presentation.remote.full_name, "presentation created");
                self.dashboard.notify(
                    NotificationLevel::Info,
                    command.label(),
                    format!(
                        "created {}, pages at {}",
                        presentation.remote.full_name, presentation.pages_url
                    ),
                );
                self.host.open_url(&presentation.pages_url);
                self.open_working_file(presentation.local_dir);
            }
            Err(e) => {
                error!(error = %e, "presentation setup failed");
                self.dashboard
                    .notify(NotificationLevel::Error, command.label(), e.to_string());
            }
        }
    }
}

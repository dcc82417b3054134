//! Session controller: the handlers behind every user action.
//!
//! The controller owns the session state, the active view and the pending
//! registration. Handlers take `&mut self`, talk to a [`CloudApi`] and
//! publish [`UiEvent`]s; nothing here renders anything.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::future::join;
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::api::{ApiClient, CloudApi, CodeSent, LoginRequest, RegisterVmRequest, ServiceStatus};
use crate::config::ClientConfig;
use crate::error::{CloudError, Result};
use crate::fs::{check_size, check_upload, filter_listing, UploadOption};
use crate::notify::{FormId, MessageKind, Notice, Notifier, UiEvent, EVENT_CAPACITY};
use crate::session::registration::PendingRegistration;
use crate::session::sequence::{Lane, Sequencer, Ticket};
use crate::session::state::{AuthState, Session};
use crate::session::view::{Forms, NavChrome, View, ViewController};

/// Yes/no prompt shown before destructive operations.
pub trait Confirm: Send + Sync {
    fn confirm(&self, prompt: &str) -> bool;
}

impl<F> Confirm for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn confirm(&self, prompt: &str) -> bool {
        self(prompt)
    }
}

/// Prompt that always answers no. Used until a real prompt is installed.
#[derive(Debug, Clone, Copy, Default)]
pub struct Decline;

impl Confirm for Decline {
    fn confirm(&self, _prompt: &str) -> bool {
        false
    }
}

/// Result of a peer-to-peer file search.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SearchOutcome {
    NotFound,
}

/// Point-in-time copy of everything a renderer shows.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub view: View,
    pub chrome: NavChrome,
    pub auth: AuthState,
    pub session: Session,
    pub forms: Forms,
    pub notices: Vec<Notice>,
}

pub struct Controller<A> {
    api: Arc<A>,
    config: ClientConfig,
    session: Session,
    pending: Option<PendingRegistration>,
    views: ViewController,
    forms: Forms,
    sequencer: Sequencer,
    notifier: Notifier,
    events: broadcast::Sender<UiEvent>,
    confirmer: Box<dyn Confirm>,
}

impl Controller<ApiClient> {
    /// Controller talking HTTP to the configured server.
    pub fn connect(config: ClientConfig) -> Result<Self> {
        let api = ApiClient::new(&config)?;
        Ok(Self::new(api, config))
    }
}

impl<A: CloudApi> Controller<A> {
    pub fn new(api: A, config: ClientConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            api: Arc::new(api),
            notifier: Notifier::new(config.notice_ttl, events.clone()),
            config,
            session: Session::default(),
            pending: None,
            views: ViewController::new(),
            forms: Forms::default(),
            sequencer: Sequencer::new(),
            events,
            confirmer: Box::new(Decline),
        }
    }

    /// Install the prompt asked before delete and cleanup.
    pub fn with_confirmer(mut self, confirmer: impl Confirm + 'static) -> Self {
        self.confirmer = Box::new(confirmer);
        self
    }

    pub fn set_confirmer(&mut self, confirmer: impl Confirm + 'static) {
        self.confirmer = Box::new(confirmer);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<UiEvent> {
        self.events.subscribe()
    }

    pub(crate) fn event_sender(&self) -> broadcast::Sender<UiEvent> {
        self.events.clone()
    }

    pub(crate) fn api(&self) -> Arc<A> {
        Arc::clone(&self.api)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn forms(&self) -> &Forms {
        &self.forms
    }

    pub fn active_view(&self) -> View {
        self.views.active()
    }

    pub fn chrome(&self) -> NavChrome {
        self.views.chrome()
    }

    pub fn pending(&self) -> Option<&PendingRegistration> {
        self.pending.as_ref()
    }

    /// Resume a registration started elsewhere (e.g. another process).
    pub fn restore_pending(&mut self, pending: PendingRegistration) {
        self.forms.confirm_email = Some(pending.email.clone());
        self.pending = Some(pending);
    }

    pub fn auth_state(&self) -> AuthState {
        if self.session.is_authenticated() {
            AuthState::Authenticated
        } else if self.pending.is_some() {
            AuthState::PendingConfirmation
        } else {
            AuthState::Anonymous
        }
    }

    pub fn notices(&mut self) -> Vec<Notice> {
        self.notifier.active()
    }

    pub fn dismiss_notice(&mut self, id: u64) -> bool {
        self.notifier.dismiss(id)
    }

    pub fn snapshot(&mut self) -> Snapshot {
        Snapshot {
            view: self.views.active(),
            chrome: self.views.chrome(),
            auth: self.auth_state(),
            session: self.session.clone(),
            forms: self.forms.clone(),
            notices: self.notifier.active(),
        }
    }

    fn emit(&self, event: UiEvent) {
        let _ = self.events.send(event);
    }

    fn form(&self, form: FormId, kind: MessageKind, text: impl Into<String>) {
        self.emit(UiEvent::FormMessage {
            form,
            kind,
            text: text.into(),
        });
    }

    fn require_identity(&self) -> Result<String> {
        self.session
            .identity
            .clone()
            .ok_or(CloudError::NotAuthenticated)
    }

    // ---- navigation ----

    /// Switch the active view. Entering the dashboard while logged in loads
    /// storage and files.
    pub async fn navigate(&mut self, target: View) {
        let nav = self.views.navigate(target, self.session.is_authenticated());
        debug!(view = %nav.view, "navigate");
        self.emit(UiEvent::ViewChanged {
            view: nav.view,
            chrome: nav.chrome,
        });
        if nav.refresh {
            self.load_session_data().await;
        }
    }

    /// Navigate by view name. Unknown names are logged and ignored.
    pub async fn navigate_named(&mut self, name: &str) {
        match name.parse::<View>() {
            Ok(view) => self.navigate(view).await,
            Err(_) => warn!(view = name, "ignoring navigation to unknown view"),
        }
    }

    // ---- registration / login ----

    /// Validate the registration form and request a confirmation code.
    pub async fn register(
        &mut self,
        name: &str,
        email: &str,
        password: &str,
        storage_mb: u32,
    ) -> Result<CodeSent> {
        self.form(FormId::Register, MessageKind::Clear, "");
        let res = self.register_inner(name, email, password, storage_mb).await;
        if let Err(e) = &res {
            self.form(FormId::Register, MessageKind::Error, e.user_message());
        }
        res
    }

    async fn register_inner(
        &mut self,
        name: &str,
        email: &str,
        password: &str,
        storage_mb: u32,
    ) -> Result<CodeSent> {
        let pending = PendingRegistration::new(name, email, password, storage_mb)?;
        self.form(
            FormId::Register,
            MessageKind::Loading,
            "Generating confirmation code...",
        );

        let reply = self.api.send_code(&pending.to_request()).await?;
        info!(vm = %pending.name, "confirmation code requested");

        self.forms.confirm_email = Some(pending.email.clone());
        self.forms.confirm_code = reply.data.test_code.clone();
        self.pending = Some(pending);
        self.form(FormId::Register, MessageKind::Clear, "");
        self.navigate(View::Confirm).await;
        Ok(reply.data)
    }

    /// Create the volume from the pending registration and the code.
    pub async fn confirm(&mut self, code: &str) -> Result<String> {
        self.form(FormId::Confirm, MessageKind::Clear, "");
        let res = self.confirm_inner(code).await;
        if let Err(e) = &res {
            self.form(FormId::Confirm, MessageKind::Error, e.user_message());
        }
        res
    }

    async fn confirm_inner(&mut self, code: &str) -> Result<String> {
        let code = code.trim();
        if code.is_empty() {
            return Err(CloudError::validation("code", "Please enter the code"));
        }
        let pending = self.pending.clone().ok_or_else(|| {
            CloudError::validation("code", "Registration data lost, please register again")
        })?;

        self.form(FormId::Confirm, MessageKind::Loading, "Creating your VM...");
        let request = RegisterVmRequest {
            registration: pending.to_request(),
            entered_code: code.to_string(),
        };
        let reply = self.api.register_vm(&request).await?;

        self.pending = None;
        let identity = reply
            .data
            .vm_name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(pending.name);
        info!(vm = %identity, "volume created");
        self.form(
            FormId::Confirm,
            MessageKind::Success,
            "VM created successfully! Redirecting to login...",
        );

        tokio::time::sleep(self.config.redirect_delay).await;
        self.forms.login_name = Some(identity.clone());
        self.navigate(View::Login).await;
        Ok(identity)
    }

    /// Log in and open the dashboard.
    pub async fn login(&mut self, name: &str, password: &str) -> Result<()> {
        self.form(FormId::Login, MessageKind::Clear, "");
        let res = self.login_inner(name, password).await;
        if let Err(e) = &res {
            self.form(FormId::Login, MessageKind::Error, e.user_message());
        }
        res
    }

    async fn login_inner(&mut self, name: &str, password: &str) -> Result<()> {
        let name = name.trim();
        if name.is_empty() || password.is_empty() {
            return Err(CloudError::validation("login", "Please fill in all fields"));
        }

        self.form(FormId::Login, MessageKind::Loading, "Signing in...");
        let request = LoginRequest {
            vm_name: name.to_string(),
            password: password.to_string(),
        };
        let info = self.api.login(&request).await?.data;

        let identity = info
            .vm_name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| name.to_string());
        self.sequencer.advance_epoch();
        self.session.begin(identity, info.storage, info.email);
        info!(vm = ?self.session.identity, "logged in");

        self.form(FormId::Login, MessageKind::Clear, "");
        self.emit(UiEvent::SessionUpdated);
        self.navigate(View::Dashboard).await;
        Ok(())
    }

    /// Forget the session and go back home.
    pub async fn logout(&mut self) {
        info!(vm = ?self.session.identity, "logged out");
        self.session.reset();
        self.sequencer.advance_epoch();
        self.emit(UiEvent::SessionUpdated);
        self.navigate(View::Home).await;
        self.notifier.info("Logged out");
    }

    // ---- data loading ----

    /// Refresh storage usage and the file listing.
    ///
    /// Both requests run concurrently. Results are applied only if no newer
    /// load or identity change happened meanwhile.
    pub async fn load_session_data(&mut self) {
        let Some(vm) = self.session.identity.clone() else {
            return;
        };
        let ticket = self.sequencer.issue();
        let api = Arc::clone(&self.api);
        let (storage, files) = join(api.storage(&vm), api.files(&vm)).await;

        let mut failed = false;
        if self.sequencer.accept(ticket, Lane::Storage) {
            match storage {
                Ok(info) => self.session.apply_storage(info),
                Err(e) if e.is_transport() => {
                    warn!(vm = %vm, error = %e, "storage request failed");
                    failed = true;
                }
                Err(e) => debug!(vm = %vm, error = %e, "keeping last storage figures"),
            }
        }
        if let Some(Err(e)) = self.apply_listing(ticket, files) {
            failed |= e.is_transport();
        }

        if failed {
            self.notifier.error("Error while loading data");
        }
        self.emit(UiEvent::SessionUpdated);
    }

    /// Apply a listing response if its ticket is still current.
    ///
    /// Returns `None` for a stale response. On failure the listing is
    /// emptied and the error handed back.
    pub(crate) fn apply_listing(
        &mut self,
        ticket: Ticket,
        result: Result<Vec<Value>>,
    ) -> Option<Result<usize>> {
        if !self.sequencer.accept(ticket, Lane::Files) {
            return None;
        }
        match result {
            Ok(raw) => {
                self.session.files = filter_listing(raw);
                Some(Ok(self.session.files.len()))
            }
            Err(e) => {
                self.session.files.clear();
                if e.is_transport() {
                    warn!(error = %e, "listing request failed");
                } else {
                    debug!(error = %e, "server refused listing");
                }
                Some(Err(e))
            }
        }
    }

    async fn reload_listing(&mut self, vm: &str) -> Option<Result<usize>> {
        let ticket = self.sequencer.issue();
        let result = self.api.files(vm).await;
        let outcome = self.apply_listing(ticket, result);
        self.emit(UiEvent::SessionUpdated);
        outcome
    }

    /// Manual refresh of the file listing.
    pub async fn refresh_files(&mut self) -> Result<usize> {
        let Some(vm) = self.session.identity.clone() else {
            self.notifier.error("You must be logged in to refresh");
            return Err(CloudError::NotAuthenticated);
        };
        match self.reload_listing(&vm).await {
            Some(Err(e)) if e.is_transport() => {
                self.notifier.error("Error while refreshing");
                Err(e)
            }
            Some(Ok(count)) => {
                self.notifier.success("File list refreshed");
                Ok(count)
            }
            _ => {
                self.notifier.success("File list refreshed");
                Ok(self.session.files.len())
            }
        }
    }

    /// Start a periodic listing refresh if the dashboard is showing.
    pub(crate) fn begin_background_refresh(&mut self) -> Option<(Ticket, String)> {
        if self.views.active() != View::Dashboard {
            return None;
        }
        let vm = self.session.identity.clone()?;
        Some((self.sequencer.issue(), vm))
    }

    pub(crate) fn finish_background_refresh(&mut self, ticket: Ticket, result: Result<Vec<Value>>) {
        if self.apply_listing(ticket, result).is_some() {
            self.emit(UiEvent::SessionUpdated);
        }
    }

    // ---- file operations ----

    /// Upload an in-memory file after checking it against the quota.
    ///
    /// Returns the name the server stored the file under.
    pub async fn upload_bytes(
        &mut self,
        data: Vec<u8>,
        filename: &str,
        option: UploadOption,
    ) -> Result<String> {
        self.form(FormId::Upload, MessageKind::Clear, "");
        let res = self.upload_inner(data, filename, option).await;
        if let Err(e) = &res {
            if e.is_quota() {
                info!(file = %filename, error = %e, "upload rejected by quota guard");
            } else {
                warn!(file = %filename, error = %e, "upload failed");
            }
            self.form(FormId::Upload, MessageKind::Error, e.user_message());
        }
        res
    }

    /// Upload a local file. The size cap is checked before reading it.
    pub async fn upload_file(
        &mut self,
        path: impl AsRef<Path>,
        option: UploadOption,
    ) -> Result<String> {
        let path = path.as_ref();
        let prepared = async {
            self.require_identity()?;
            let filename = path
                .file_name()
                .and_then(|n| n.to_str())
                .ok_or_else(|| CloudError::validation("file", "Please select a file"))?
                .to_string();
            let meta = tokio::fs::metadata(path).await?;
            check_size(meta.len(), self.config.max_upload_mb)?;
            let data = tokio::fs::read(path).await?;
            Ok::<_, CloudError>((data, filename))
        }
        .await;

        match prepared {
            Ok((data, filename)) => self.upload_bytes(data, &filename, option).await,
            Err(e) => {
                self.form(FormId::Upload, MessageKind::Error, e.user_message());
                Err(e)
            }
        }
    }

    async fn upload_inner(
        &mut self,
        data: Vec<u8>,
        filename: &str,
        option: UploadOption,
    ) -> Result<String> {
        let vm = self.require_identity()?;
        if filename.trim().is_empty() {
            return Err(CloudError::validation("file", "Please select a file"));
        }
        let size = data.len() as u64;
        check_size(size, self.config.max_upload_mb)?;

        self.form(
            FormId::Upload,
            MessageKind::Loading,
            "Checking available space...",
        );
        let snapshot = match self.api.storage(&vm).await {
            Ok(snapshot) => snapshot,
            Err(e) if e.is_transport() => return Err(e),
            Err(e) => {
                debug!(error = %e, "storage check refused");
                return Err(CloudError::Custom(
                    "Unable to verify available space".to_string(),
                ));
            }
        };
        let check = check_upload(&snapshot, size, self.config.max_upload_mb)?;
        debug!(
            file_mb = check.file_mb,
            new_total_mb = check.new_total_mb,
            "quota check passed"
        );

        self.form(
            FormId::Upload,
            MessageKind::Loading,
            format!("Uploading ({:.2}MB)...", check.file_mb),
        );
        let reply = self.api.upload(&vm, filename, data).await?;
        let stored = reply
            .data
            .filename
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| filename.to_string());
        info!(vm = %vm, file = %stored, "uploaded");

        self.form(
            FormId::Upload,
            MessageKind::Success,
            format!("File \"{}\" uploaded ({})", filename, option.label()),
        );
        tokio::time::sleep(self.config.upload_refresh_delay).await;
        self.load_session_data().await;
        self.notifier
            .success(format!("File \"{}\" uploaded successfully", filename));
        Ok(stored)
    }

    /// Fetch a file and save it under `dest_dir`. Returns the saved path.
    pub async fn download(
        &mut self,
        filename: &str,
        dest_dir: impl AsRef<Path>,
    ) -> Result<PathBuf> {
        let vm = self.require_identity()?;
        let data = match self.api.download(&vm, filename).await {
            Ok(data) => data,
            Err(e) => {
                self.notifier.error(failure_text(&e, "Download failed"));
                return Err(e);
            }
        };

        let dest = dest_dir.as_ref().join(local_name(filename));
        if let Err(e) = tokio::fs::write(&dest, &data).await {
            self.notifier
                .error(format!("Could not save \"{}\": {}", filename, e));
            return Err(e.into());
        }
        info!(file = %filename, bytes = data.len(), dest = %dest.display(), "downloaded");
        self.notifier.success(format!("Downloaded \"{}\"", filename));
        Ok(dest)
    }

    /// Delete a file after confirmation. `Ok(false)` when declined.
    pub async fn delete_file(&mut self, filename: &str) -> Result<bool> {
        let vm = self.require_identity()?;
        let prompt = format!("Are you sure you want to delete \"{}\"?", filename);
        if !self.confirmer.confirm(&prompt) {
            debug!(file = %filename, "delete declined");
            return Ok(false);
        }

        match self.api.delete(&vm, filename).await {
            Ok(_) => {
                info!(vm = %vm, file = %filename, "deleted");
                self.notifier
                    .success(format!("\"{}\" deleted successfully", filename));
                self.load_session_data().await;
                Ok(true)
            }
            Err(e) => {
                self.notifier.error(failure_text(&e, "Delete failed"));
                Err(e)
            }
        }
    }

    /// Ask the server to drop files it lists but cannot find on disk.
    ///
    /// `Ok(None)` when declined, otherwise the number of entries removed.
    pub async fn cleanup_ghost_files(&mut self) -> Result<Option<u64>> {
        let vm = self.require_identity()?;
        if !self
            .confirmer
            .confirm("Do you want to clean up the ghost files of this VM?")
        {
            debug!("cleanup declined");
            return Ok(None);
        }

        let count = match self.api.cleanup(&vm).await {
            Ok(reply) => reply.data.deleted_count,
            Err(e) => {
                self.notifier.error(failure_text(&e, "Cleanup failed"));
                return Err(e);
            }
        };
        info!(vm = %vm, count, "ghost files cleaned");
        self.notifier
            .success(format!("{} ghost files cleaned", count));
        if let Some(Err(e)) = self.reload_listing(&vm).await {
            if e.is_transport() {
                self.notifier.error("Error while loading data");
            }
        }
        Ok(Some(count))
    }

    /// Look a file up on the peer network. Not wired to any peer yet.
    pub async fn request_file(&mut self, filename: &str) -> Result<SearchOutcome> {
        let filename = filename.trim();
        if filename.is_empty() {
            let err = CloudError::validation("request", "Please enter a file name");
            self.form(FormId::Request, MessageKind::Error, err.user_message());
            return Err(err);
        }
        self.form(
            FormId::Request,
            MessageKind::Loading,
            format!("Searching for \"{}\" on the P2P network...", filename),
        );
        self.form(
            FormId::Request,
            MessageKind::Info,
            format!("No file \"{}\" found on the P2P network", filename),
        );
        Ok(SearchOutcome::NotFound)
    }

    pub async fn service_status(&self) -> Result<ServiceStatus> {
        self.api.status().await
    }
}

/// Notification text for a failed non-blocking operation.
fn failure_text(err: &CloudError, fallback: &str) -> String {
    match err {
        CloudError::Api { message } => format!("Error: {}", message),
        e if e.is_transport() => fallback.to_string(),
        other => other.to_string(),
    }
}

/// Last path component of a server filename, so a download cannot escape
/// the destination directory.
fn local_name(filename: &str) -> &str {
    Path::new(filename)
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty())
        .unwrap_or("download")
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::api::{Cleaned, Deleted, LoginInfo, Registered, Reply, SendCodeRequest, Uploaded};
    use crate::error::CONNECTION_MESSAGE;
    use crate::fs::StorageInfo;
    use crate::notify::NoticeLevel;

    const MB: usize = 1_048_576;

    fn offline() -> CloudError {
        CloudError::Http(503)
    }

    fn refused(message: &str) -> CloudError {
        CloudError::Api {
            message: message.to_string(),
        }
    }

    /// In-memory server. Records every call; responses are scripted through
    /// the public fields.
    pub(crate) struct FakeApi {
        pub calls: Mutex<Vec<String>>,
        pub sent_codes: Mutex<Vec<SendCodeRequest>>,
        pub refuse_send_code: AtomicBool,
        pub offline_send_code: AtomicBool,
        pub refuse_register_vm: AtomicBool,
        pub refuse_login: AtomicBool,
        pub offline_login: AtomicBool,
        pub refuse_delete: AtomicBool,
        pub offline_cleanup: AtomicBool,
        pub storage: Mutex<VecDeque<Result<StorageInfo>>>,
        pub default_storage: StorageInfo,
        pub files: Mutex<Vec<Value>>,
        pub files_offline: AtomicBool,
        pub blob: Vec<u8>,
    }

    impl Default for FakeApi {
        fn default() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                sent_codes: Mutex::new(Vec::new()),
                refuse_send_code: AtomicBool::new(false),
                offline_send_code: AtomicBool::new(false),
                refuse_register_vm: AtomicBool::new(false),
                refuse_login: AtomicBool::new(false),
                offline_login: AtomicBool::new(false),
                refuse_delete: AtomicBool::new(false),
                offline_cleanup: AtomicBool::new(false),
                storage: Mutex::new(VecDeque::new()),
                default_storage: StorageInfo::new(12.4, 500.0, 487.6),
                files: Mutex::new(vec![
                    json!({"name": "report.pdf", "size_display": "1.2 MB", "modified_display": "2024-01-02 10:00"}),
                    json!({"name": "", "size_display": "1 B"}),
                    json!({"name": "notes.txt", "size_display": "10 B"}),
                ]),
                files_offline: AtomicBool::new(false),
                blob: b"file contents".to_vec(),
            }
        }
    }

    impl FakeApi {
        fn record(&self, call: impl Into<String>) {
            self.calls.lock().unwrap().push(call.into());
        }

        pub(crate) fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        pub(crate) fn count(&self, prefix: &str) -> usize {
            self.calls().iter().filter(|c| c.starts_with(prefix)).count()
        }

        fn push_storage(&self, result: Result<StorageInfo>) {
            self.storage.lock().unwrap().push_back(result);
        }
    }

    #[async_trait]
    impl CloudApi for FakeApi {
        async fn status(&self) -> Result<ServiceStatus> {
            self.record("status");
            Ok(ServiceStatus {
                status: "online".to_string(),
                service: "Nick Cloud".to_string(),
                version: "1.0".to_string(),
                storage_path: None,
            })
        }

        async fn send_code(&self, request: &SendCodeRequest) -> Result<Reply<CodeSent>> {
            self.record("send_code");
            self.sent_codes.lock().unwrap().push(request.clone());
            if self.offline_send_code.load(Ordering::SeqCst) {
                return Err(offline());
            }
            if self.refuse_send_code.load(Ordering::SeqCst) {
                return Err(refused("This VM name is already taken"));
            }
            Ok(Reply {
                message: None,
                data: CodeSent {
                    test_code: Some("042917".to_string()),
                },
            })
        }

        async fn register_vm(&self, request: &RegisterVmRequest) -> Result<Reply<Registered>> {
            self.record(format!("register_vm {}", request.entered_code));
            if self.refuse_register_vm.load(Ordering::SeqCst) {
                return Err(refused("Invalid confirmation code"));
            }
            Ok(Reply {
                message: None,
                data: Registered {
                    vm_name: Some(request.registration.vm_name.clone()),
                    storage: Some(request.registration.vm_storage.clone()),
                },
            })
        }

        async fn login(&self, request: &LoginRequest) -> Result<Reply<LoginInfo>> {
            self.record(format!("login {}", request.vm_name));
            if self.offline_login.load(Ordering::SeqCst) {
                return Err(offline());
            }
            if self.refuse_login.load(Ordering::SeqCst) {
                return Err(refused("Wrong password"));
            }
            Ok(Reply {
                message: None,
                data: LoginInfo {
                    vm_name: Some(request.vm_name.clone()),
                    storage: Some("500MB".to_string()),
                    email: Some("a@b.io".to_string()),
                },
            })
        }

        async fn storage(&self, vm_name: &str) -> Result<StorageInfo> {
            self.record(format!("storage {}", vm_name));
            self.storage
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Ok(self.default_storage))
        }

        async fn files(&self, vm_name: &str) -> Result<Vec<Value>> {
            self.record(format!("files {}", vm_name));
            if self.files_offline.load(Ordering::SeqCst) {
                return Err(offline());
            }
            Ok(self.files.lock().unwrap().clone())
        }

        async fn upload(
            &self,
            vm_name: &str,
            filename: &str,
            data: Vec<u8>,
        ) -> Result<Reply<Uploaded>> {
            self.record(format!("upload {} {}", vm_name, filename));
            Ok(Reply {
                message: None,
                data: Uploaded {
                    filename: Some(filename.to_string()),
                    size: Some(data.len() as u64),
                    size_display: None,
                },
            })
        }

        async fn download(&self, vm_name: &str, filename: &str) -> Result<Vec<u8>> {
            self.record(format!("download {} {}", vm_name, filename));
            if filename == "missing.txt" {
                return Err(refused("File not found"));
            }
            Ok(self.blob.clone())
        }

        async fn delete(&self, vm_name: &str, filename: &str) -> Result<Reply<Deleted>> {
            self.record(format!("delete {} {}", vm_name, filename));
            if self.refuse_delete.load(Ordering::SeqCst) {
                return Err(refused("File not found"));
            }
            Ok(Reply {
                message: None,
                data: Deleted {
                    filename: Some(filename.to_string()),
                    size_freed: Some(10),
                },
            })
        }

        async fn cleanup(&self, vm_name: &str) -> Result<Reply<Cleaned>> {
            self.record(format!("cleanup {}", vm_name));
            if self.offline_cleanup.load(Ordering::SeqCst) {
                return Err(offline());
            }
            Ok(Reply {
                message: None,
                data: Cleaned { deleted_count: 2 },
            })
        }
    }

    pub(crate) fn controller() -> (Controller<Arc<FakeApi>>, Arc<FakeApi>) {
        let api = Arc::new(FakeApi::default());
        let config = ClientConfig::default().without_delays();
        (Controller::new(Arc::clone(&api), config), api)
    }

    async fn logged_in() -> (Controller<Arc<FakeApi>>, Arc<FakeApi>) {
        let (mut ctl, api) = controller();
        ctl.login("alpha", "password1").await.unwrap();
        api.calls.lock().unwrap().clear();
        (ctl, api)
    }

    fn drain(rx: &mut broadcast::Receiver<UiEvent>) -> Vec<UiEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_register_short_password_makes_no_request() {
        let (mut ctl, api) = controller();
        let mut rx = ctl.subscribe();
        let res = ctl.register("alpha", "a@b.io", "short", 500).await;
        assert!(matches!(res, Err(CloudError::Validation { .. })));
        assert!(api.calls().is_empty());
        assert_eq!(ctl.auth_state(), AuthState::Anonymous);

        let events = drain(&mut rx);
        assert!(events.iter().any(|e| matches!(
            e,
            UiEvent::FormMessage { form: FormId::Register, kind: MessageKind::Error, .. }
        )));
    }

    #[tokio::test]
    async fn test_register_moves_to_confirm() {
        let (mut ctl, api) = controller();
        let sent = ctl.register(" alpha ", "a@b.io", "password1", 1000).await.unwrap();
        assert_eq!(sent.test_code.as_deref(), Some("042917"));
        assert_eq!(ctl.active_view(), View::Confirm);
        assert_eq!(ctl.auth_state(), AuthState::PendingConfirmation);
        assert_eq!(ctl.forms().confirm_email.as_deref(), Some("a@b.io"));
        assert_eq!(ctl.forms().confirm_code.as_deref(), Some("042917"));

        let sent = api.sent_codes.lock().unwrap().clone();
        assert_eq!(sent[0].vm_name, "alpha");
        assert_eq!(sent[0].vm_storage, "1000MB");
    }

    #[tokio::test]
    async fn test_register_refused_stays_anonymous() {
        let (mut ctl, api) = controller();
        api.refuse_send_code.store(true, Ordering::SeqCst);
        match ctl.register("alpha", "a@b.io", "password1", 500).await {
            Err(CloudError::Api { message }) => {
                assert_eq!(message, "This VM name is already taken")
            }
            other => panic!("unexpected: {:?}", other),
        }
        assert_eq!(ctl.auth_state(), AuthState::Anonymous);
        assert_eq!(ctl.active_view(), View::Home);
    }

    fn form_error(events: &[UiEvent], form: FormId) -> Option<String> {
        events.iter().rev().find_map(|e| match e {
            UiEvent::FormMessage {
                form: f,
                kind: MessageKind::Error,
                text,
            } if *f == form => Some(text.clone()),
            _ => None,
        })
    }

    #[tokio::test]
    async fn test_refused_reregister_keeps_first_pending() {
        let (mut ctl, api) = controller();
        ctl.register("alpha", "a@b.io", "password1", 500).await.unwrap();

        api.refuse_send_code.store(true, Ordering::SeqCst);
        assert!(matches!(
            ctl.register("beta", "b@c.io", "password2", 100).await,
            Err(CloudError::Api { .. })
        ));
        assert_eq!(ctl.auth_state(), AuthState::PendingConfirmation);
        assert_eq!(ctl.pending().map(|p| p.name.as_str()), Some("alpha"));

        assert_eq!(ctl.confirm("042917").await.unwrap(), "alpha");
    }

    #[tokio::test]
    async fn test_register_offline_keeps_state() {
        let (mut ctl, api) = controller();
        ctl.register("alpha", "a@b.io", "password1", 500).await.unwrap();
        let mut rx = ctl.subscribe();

        api.offline_send_code.store(true, Ordering::SeqCst);
        let res = ctl.register("beta", "b@c.io", "password2", 100).await;
        assert!(matches!(res, Err(CloudError::Http(503))));
        assert_eq!(ctl.auth_state(), AuthState::PendingConfirmation);
        assert_eq!(ctl.pending().map(|p| p.name.as_str()), Some("alpha"));
        assert_eq!(ctl.active_view(), View::Confirm);
        assert_eq!(ctl.forms().confirm_email.as_deref(), Some("a@b.io"));

        let events = drain(&mut rx);
        assert_eq!(
            form_error(&events, FormId::Register).as_deref(),
            Some(CONNECTION_MESSAGE)
        );
    }

    #[tokio::test]
    async fn test_confirm_refused_keeps_pending() {
        let (mut ctl, api) = controller();
        ctl.register("alpha", "a@b.io", "password1", 500).await.unwrap();
        let mut rx = ctl.subscribe();

        api.refuse_register_vm.store(true, Ordering::SeqCst);
        match ctl.confirm("000000").await {
            Err(CloudError::Api { message }) => {
                assert_eq!(message, "Invalid confirmation code")
            }
            other => panic!("unexpected: {:?}", other),
        }
        assert_eq!(ctl.auth_state(), AuthState::PendingConfirmation);
        assert_eq!(ctl.active_view(), View::Confirm);
        let events = drain(&mut rx);
        assert_eq!(
            form_error(&events, FormId::Confirm).as_deref(),
            Some("Invalid confirmation code")
        );

        api.refuse_register_vm.store(false, Ordering::SeqCst);
        assert_eq!(ctl.confirm("042917").await.unwrap(), "alpha");
    }

    #[tokio::test]
    async fn test_confirm_without_pending_makes_no_request() {
        let (mut ctl, api) = controller();
        assert!(matches!(
            ctl.confirm("123456").await,
            Err(CloudError::Validation { .. })
        ));
        assert!(matches!(ctl.confirm("  ").await, Err(CloudError::Validation { .. })));
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_register_confirm_flow() {
        let (mut ctl, api) = controller();
        ctl.register("alpha", "a@b.io", "password1", 500).await.unwrap();
        let identity = ctl.confirm(" 042917 ").await.unwrap();
        assert_eq!(identity, "alpha");
        assert!(ctl.pending().is_none());
        assert_eq!(ctl.active_view(), View::Login);
        assert_eq!(ctl.forms().login_name.as_deref(), Some("alpha"));
        assert_eq!(ctl.auth_state(), AuthState::Anonymous);
        assert_eq!(api.count("register_vm 042917"), 1);
    }

    #[tokio::test]
    async fn test_restored_pending_can_confirm() {
        let (mut ctl, api) = controller();
        let pending = PendingRegistration::new("beta", "b@c.io", "password1", 100).unwrap();
        ctl.restore_pending(pending);
        assert_eq!(ctl.auth_state(), AuthState::PendingConfirmation);
        assert_eq!(ctl.confirm("111111").await.unwrap(), "beta");
        assert_eq!(api.count("register_vm"), 1);
    }

    #[tokio::test]
    async fn test_login_loads_dashboard_once() {
        let (mut ctl, api) = controller();
        ctl.login(" alpha ", "password1").await.unwrap();
        assert_eq!(ctl.active_view(), View::Dashboard);
        assert!(ctl.chrome().private_nav);
        assert_eq!(ctl.auth_state(), AuthState::Authenticated);
        assert_eq!(api.count("login alpha"), 1);
        assert_eq!(api.count("storage alpha"), 1);
        assert_eq!(api.count("files alpha"), 1);

        let session = ctl.session();
        assert_eq!(session.identity.as_deref(), Some("alpha"));
        assert_eq!(session.storage_used, "12MB");
        assert_eq!(session.email.as_deref(), Some("a@b.io"));
        let names: Vec<_> = session.files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["report.pdf", "notes.txt"]);
    }

    #[tokio::test]
    async fn test_login_validation_and_refusal() {
        let (mut ctl, api) = controller();
        assert!(matches!(
            ctl.login("alpha", "").await,
            Err(CloudError::Validation { .. })
        ));
        assert!(api.calls().is_empty());

        api.refuse_login.store(true, Ordering::SeqCst);
        assert!(matches!(ctl.login("alpha", "nope").await, Err(CloudError::Api { .. })));
        assert_eq!(ctl.auth_state(), AuthState::Anonymous);
        assert_eq!(ctl.active_view(), View::Home);
    }

    #[tokio::test]
    async fn test_login_offline_keeps_state() {
        let (mut ctl, api) = controller();
        let mut rx = ctl.subscribe();
        api.offline_login.store(true, Ordering::SeqCst);

        assert!(matches!(
            ctl.login("alpha", "password1").await,
            Err(CloudError::Http(503))
        ));
        assert_eq!(ctl.auth_state(), AuthState::Anonymous);
        assert_eq!(ctl.session(), &Session::default());
        assert_eq!(ctl.active_view(), View::Home);
        assert_eq!(api.calls(), vec!["login alpha".to_string()]);

        let events = drain(&mut rx);
        assert_eq!(
            form_error(&events, FormId::Login).as_deref(),
            Some(CONNECTION_MESSAGE)
        );
    }

    #[tokio::test]
    async fn test_logout_resets_session() {
        let (mut ctl, _api) = logged_in().await;
        assert!(!ctl.session().files.is_empty());
        ctl.logout().await;
        assert_eq!(ctl.session(), &Session::default());
        assert_eq!(ctl.active_view(), View::Home);
        let notices = ctl.notices();
        assert_eq!(notices.last().map(|n| n.message.as_str()), Some("Logged out"));
    }

    #[tokio::test]
    async fn test_dashboard_navigation_loads_only_when_logged_in() {
        let (mut ctl, api) = controller();
        ctl.navigate(View::Dashboard).await;
        assert!(api.calls().is_empty());

        let (mut ctl, api) = logged_in().await;
        ctl.navigate(View::Home).await;
        assert!(api.calls().is_empty());
        ctl.navigate(View::Dashboard).await;
        assert_eq!(api.count("storage"), 1);
        assert_eq!(api.count("files"), 1);
    }

    #[tokio::test]
    async fn test_unknown_view_keeps_active() {
        let (mut ctl, _api) = controller();
        ctl.navigate_named("login").await;
        assert_eq!(ctl.active_view(), View::Login);
        ctl.navigate_named("settings").await;
        assert_eq!(ctl.active_view(), View::Login);
    }

    #[tokio::test]
    async fn test_stale_listing_is_dropped() {
        let (mut ctl, api) = logged_in().await;
        let (old, _) = ctl.begin_background_refresh().unwrap();

        api.files.lock().unwrap().truncate(1);
        assert_eq!(ctl.refresh_files().await.unwrap(), 1);

        let late = vec![json!({"name": "ghost.bin", "size_display": "1 B"})];
        assert!(ctl.apply_listing(old, Ok(late)).is_none());
        assert_eq!(ctl.session().files.len(), 1);
        assert_eq!(ctl.session().files[0].name, "report.pdf");
    }

    #[tokio::test]
    async fn test_listing_from_previous_identity_is_dropped() {
        let (mut ctl, _api) = logged_in().await;
        let (ticket, _) = ctl.begin_background_refresh().unwrap();
        ctl.logout().await;
        let late = vec![json!({"name": "a", "size_display": "1 B"})];
        ctl.finish_background_refresh(ticket, Ok(late));
        assert!(ctl.session().files.is_empty());
    }

    #[tokio::test]
    async fn test_background_refresh_only_on_dashboard() {
        let (mut ctl, _api) = controller();
        assert!(ctl.begin_background_refresh().is_none());
        let (mut ctl, _api) = logged_in().await;
        ctl.navigate(View::Home).await;
        assert!(ctl.begin_background_refresh().is_none());
    }

    #[tokio::test]
    async fn test_storage_refusal_keeps_last_figures() {
        let (mut ctl, api) = logged_in().await;
        let before = ctl.notices().len();
        api.push_storage(Err(refused("VM not found")));
        ctl.load_session_data().await;
        assert_eq!(ctl.session().storage_used, "12MB");
        assert_eq!(ctl.notices().len(), before);
    }

    #[tokio::test]
    async fn test_transport_failures_notify_once() {
        let (mut ctl, api) = logged_in().await;
        let before = ctl.notices().len();
        api.push_storage(Err(offline()));
        api.files_offline.store(true, Ordering::SeqCst);
        ctl.load_session_data().await;

        assert_eq!(ctl.session().storage_used, "12MB");
        assert!(ctl.session().files.is_empty());
        let notices = ctl.notices();
        assert_eq!(notices.len(), before + 1);
    }

    #[tokio::test]
    async fn test_refresh_requires_login() {
        let (mut ctl, api) = controller();
        assert!(matches!(
            ctl.refresh_files().await,
            Err(CloudError::NotAuthenticated)
        ));
        assert!(api.calls().is_empty());
        assert_eq!(ctl.notices().len(), 1);
    }

    #[tokio::test]
    async fn test_upload_over_cap_makes_no_request() {
        let (mut ctl, api) = logged_in().await;
        let res = ctl
            .upload_bytes(vec![0u8; 101 * MB], "big.iso", UploadOption::default())
            .await;
        assert!(matches!(res, Err(CloudError::FileTooLarge { .. })));
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_upload_rejected_by_quota() {
        let (mut ctl, api) = logged_in().await;
        api.push_storage(Ok(StorageInfo::new(450.0, 500.0, 50.0)));
        let res = ctl
            .upload_bytes(vec![0u8; 60 * MB], "video.mp4", UploadOption::default())
            .await;
        match res {
            Err(CloudError::InsufficientSpace { deficit_mb, .. }) => assert_eq!(deficit_mb, 10.0),
            other => panic!("unexpected: {:?}", other),
        }
        assert_eq!(api.count("upload"), 0);
    }

    #[tokio::test]
    async fn test_upload_unverifiable_space() {
        let (mut ctl, api) = logged_in().await;
        api.push_storage(Err(refused("VM not found")));
        match ctl.upload_bytes(vec![1, 2, 3], "a.txt", UploadOption::default()).await {
            Err(CloudError::Custom(msg)) => assert_eq!(msg, "Unable to verify available space"),
            other => panic!("unexpected: {:?}", other),
        }
        assert_eq!(api.count("upload"), 0);
    }

    #[tokio::test]
    async fn test_upload_success_reloads() {
        let (mut ctl, api) = logged_in().await;
        let mut rx = ctl.subscribe();
        let stored = ctl
            .upload_bytes(b"hello".to_vec(), "hello.txt", UploadOption::StoreAndShare)
            .await
            .unwrap();
        assert_eq!(stored, "hello.txt");
        assert_eq!(api.count("upload alpha hello.txt"), 1);
        // One storage call for the quota check, one for the reload.
        assert_eq!(api.count("storage"), 2);
        assert_eq!(api.count("files"), 1);

        let events = drain(&mut rx);
        assert!(events.iter().any(|e| matches!(
            e,
            UiEvent::FormMessage { form: FormId::Upload, kind: MessageKind::Success, text }
                if text.contains("Store & share")
        )));
    }

    #[tokio::test]
    async fn test_upload_requires_login() {
        let (mut ctl, api) = controller();
        assert!(matches!(
            ctl.upload_bytes(vec![1], "a.txt", UploadOption::default()).await,
            Err(CloudError::NotAuthenticated)
        ));
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_upload_file_from_disk() {
        let (mut ctl, api) = logged_in().await;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, b"some notes").unwrap();
        let stored = ctl.upload_file(&path, UploadOption::StoreOnly).await.unwrap();
        assert_eq!(stored, "notes.txt");
        assert_eq!(api.count("upload alpha notes.txt"), 1);

        let missing = dir.path().join("nope.txt");
        assert!(matches!(
            ctl.upload_file(&missing, UploadOption::StoreOnly).await,
            Err(CloudError::Io(_))
        ));
    }

    #[tokio::test]
    async fn test_download_saves_file() {
        let (mut ctl, api) = logged_in().await;
        let dir = tempfile::tempdir().unwrap();
        let path = ctl.download("report.pdf", dir.path()).await.unwrap();
        assert_eq!(path, dir.path().join("report.pdf"));
        assert_eq!(std::fs::read(&path).unwrap(), b"file contents");
        assert_eq!(api.count("files"), 0);

        assert!(matches!(
            ctl.download("missing.txt", dir.path()).await,
            Err(CloudError::Api { .. })
        ));
        let notices = ctl.notices();
        assert_eq!(
            notices.last().map(|n| n.message.as_str()),
            Some("Error: File not found")
        );
    }

    #[tokio::test]
    async fn test_download_stays_in_destination() {
        let (mut ctl, _api) = logged_in().await;
        let dir = tempfile::tempdir().unwrap();
        let path = ctl.download("../escape.txt", dir.path()).await.unwrap();
        assert_eq!(path, dir.path().join("escape.txt"));
    }

    #[tokio::test]
    async fn test_declined_delete_makes_no_request() {
        let (mut ctl, api) = logged_in().await;
        assert!(!ctl.delete_file("report.pdf").await.unwrap());
        assert_eq!(ctl.cleanup_ghost_files().await.unwrap(), None);
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_confirmed_delete_reloads() {
        let (ctl, api) = logged_in().await;
        let mut ctl = ctl.with_confirmer(|prompt: &str| prompt.contains("report.pdf"));
        assert!(ctl.delete_file("report.pdf").await.unwrap());
        assert_eq!(api.count("delete alpha report.pdf"), 1);
        assert_eq!(api.count("storage"), 1);
        assert_eq!(api.count("files"), 1);
    }

    #[tokio::test]
    async fn test_failed_delete_keeps_session() {
        let (mut ctl, api) = logged_in().await;
        ctl.set_confirmer(|_: &str| true);
        let before = ctl.session().clone();

        api.refuse_delete.store(true, Ordering::SeqCst);
        assert!(matches!(
            ctl.delete_file("report.pdf").await,
            Err(CloudError::Api { .. })
        ));
        assert_eq!(ctl.session(), &before);
        assert_eq!(api.count("storage"), 0);
        assert_eq!(api.count("files"), 0);
        let notices = ctl.notices();
        let last = notices.last().unwrap();
        assert_eq!(last.level, NoticeLevel::Error);
        assert_eq!(last.message, "Error: File not found");
    }

    #[tokio::test]
    async fn test_failed_cleanup_keeps_session() {
        let (mut ctl, api) = logged_in().await;
        ctl.set_confirmer(|_: &str| true);
        let before = ctl.session().clone();

        api.offline_cleanup.store(true, Ordering::SeqCst);
        assert!(matches!(
            ctl.cleanup_ghost_files().await,
            Err(CloudError::Http(503))
        ));
        assert_eq!(ctl.session(), &before);
        assert_eq!(api.count("files"), 0);
        let notices = ctl.notices();
        let last = notices.last().unwrap();
        assert_eq!(last.level, NoticeLevel::Error);
        assert_eq!(last.message, "Cleanup failed");
    }

    #[tokio::test]
    async fn test_cleanup_reloads_listing() {
        let (mut ctl, api) = logged_in().await;
        ctl.set_confirmer(|_: &str| true);
        assert_eq!(ctl.cleanup_ghost_files().await.unwrap(), Some(2));
        assert_eq!(api.count("cleanup alpha"), 1);
        assert_eq!(api.count("files"), 1);
        assert_eq!(api.count("storage"), 0);
        let notices = ctl.notices();
        assert_eq!(
            notices.last().map(|n| n.message.as_str()),
            Some("2 ghost files cleaned")
        );
    }

    #[tokio::test]
    async fn test_file_ops_require_login() {
        let (mut ctl, api) = controller();
        ctl.set_confirmer(|_: &str| true);
        assert!(matches!(
            ctl.delete_file("a").await,
            Err(CloudError::NotAuthenticated)
        ));
        assert!(matches!(
            ctl.cleanup_ghost_files().await,
            Err(CloudError::NotAuthenticated)
        ));
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            ctl.download("a", dir.path()).await,
            Err(CloudError::NotAuthenticated)
        ));
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_request_file_stub() {
        let (mut ctl, api) = controller();
        assert!(matches!(
            ctl.request_file(" ").await,
            Err(CloudError::Validation { .. })
        ));
        assert_eq!(
            ctl.request_file("movie.mkv").await.unwrap(),
            SearchOutcome::NotFound
        );
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_service_status() {
        let (ctl, _api) = controller();
        assert!(ctl.service_status().await.unwrap().is_online());
    }

    #[test]
    fn test_failure_text() {
        assert_eq!(failure_text(&refused("nope"), "Delete failed"), "Error: nope");
        assert_eq!(failure_text(&offline(), "Delete failed"), "Delete failed");
    }
}

//! The request coordinator.
//!
//! Every operation issues at most one request and returns immediately.
//! [`CloudCoordinator::tick`] is called from the host's update loop; it
//! inspects each tracked request and, once a request is terminal, applies
//! that operation's effect exactly once.
//!
//! ```ignore
//! let mut cloud = CloudCoordinator::from_config(&CloudConfig::default())?;
//! cloud.login("alice", "hunter2")?;
//!
//! loop {
//!     cloud.tick();
//!     for event in cloud.drain_events() {
//!         println!("{}", event);
//!     }
//! }
//! ```

use std::io;

use serde_json::{json, Value};

use cloudsync_http::{HttpBroker, HttpRequest, HttpResponse, RequestHandle, RequestState, Transport};

use crate::config::CloudConfig;
use crate::endpoints::Endpoints;
use crate::error::{CloudError, CloudResult};
use crate::event::{CloudEvent, EventLog, FailureKind, Operation, Outcome};
use crate::inventory::{AssetKind, Inventory, InventoryAsset};
use crate::path::AssetPath;
use crate::presets::UploadSelection;
use crate::script::ScriptExecutor;
use crate::session::Session;
use crate::settings::{ConfigStore, JsonConfigStore};
use crate::slot::Slot;
use crate::storage::{FileStore, LocalFileStore};
use crate::transfer::{DownloadEntry, DownloadQueue, UploadEntry, UploadQueue};

/// Which way a settings sync goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncDirection {
    Upload,
    Download,
}

impl SyncDirection {
    pub fn operation(self) -> Operation {
        match self {
            SyncDirection::Upload => Operation::SettingsUpload,
            SyncDirection::Download => Operation::SettingsDownload,
        }
    }
}

impl From<bool> for SyncDirection {
    /// `true` uploads, `false` downloads.
    fn from(upload: bool) -> Self {
        if upload {
            SyncDirection::Upload
        } else {
            SyncDirection::Download
        }
    }
}

pub struct CloudCoordinator {
    transport: Box<dyn Transport>,
    endpoints: Endpoints,
    files: Box<dyn FileStore>,
    config: Box<dyn ConfigStore>,
    scripts: Option<Box<dyn ScriptExecutor>>,

    session: Session,
    login: Slot<String>,
    register: Slot<String>,
    settings: Slot<SyncDirection>,
    inventory_fetch: Slot<()>,
    // A refresh was asked for while a fetch was in flight.
    inventory_stale: bool,
    uploads: UploadQueue,
    downloads: DownloadQueue,

    inventory: Inventory,
    events: EventLog,
}

impl CloudCoordinator {
    pub fn new(
        transport: impl Transport + 'static,
        service_url: &str,
        files: impl FileStore + 'static,
        config: impl ConfigStore + 'static,
    ) -> CloudResult<Self> {
        Ok(Self {
            transport: Box::new(transport),
            endpoints: Endpoints::new(service_url)?,
            files: Box::new(files),
            config: Box::new(config),
            scripts: None,
            session: Session::new(),
            login: Slot::Idle,
            register: Slot::Idle,
            settings: Slot::Idle,
            inventory_fetch: Slot::Idle,
            inventory_stale: false,
            uploads: UploadQueue::new(),
            downloads: DownloadQueue::new(),
            inventory: Inventory::new(),
            events: EventLog::new(),
        })
    }

    /// Run downloaded `.cfg` files through `executor`.
    pub fn with_script_executor(mut self, executor: impl ScriptExecutor + 'static) -> Self {
        self.scripts = Some(Box::new(executor));
        self
    }

    /// A coordinator talking to the configured service over HTTP, saving
    /// files under the configured save directory.
    pub fn from_config(config: &CloudConfig) -> CloudResult<Self> {
        config.validate()?;
        let broker = HttpBroker::with_timeout(config.request_timeout())?;
        let files = LocalFileStore::create(config.save_dir.clone())?;
        let settings = JsonConfigStore::open(config.settings_path())?;
        log::info!(
            "Syncing {} against {}",
            config.save_dir.display(),
            config.service_url
        );
        Self::new(broker, &config.service_url, files, settings)
    }

    pub fn login(&mut self, username: &str, password: &str) -> CloudResult<()> {
        self.authenticate(Operation::Login, username, password)
    }

    pub fn register(&mut self, username: &str, password: &str) -> CloudResult<()> {
        self.authenticate(Operation::Register, username, password)
    }

    /// Forget the session and the cached inventory.
    ///
    /// A pending settings sync or inventory fetch is discarded. Transfers
    /// already in flight are still polled and reported, but their results
    /// no longer touch local state.
    pub fn logout(&mut self) {
        if !self.session.is_authenticated() {
            self.emit(Operation::Logout, Outcome::NothingToDo, "Not logged in");
            return;
        }
        let username = self.session.username().unwrap_or_default().to_string();
        self.session.clear();
        self.discard_session_work();
        self.inventory = Inventory::new();
        self.emit(Operation::Logout, Outcome::Succeeded, username);
    }

    pub fn sync_settings(&mut self, direction: impl Into<SyncDirection>) -> CloudResult<()> {
        let direction = direction.into();
        let operation = direction.operation();
        let token = self.guard(operation, self.bearer())?;

        if let Some(pending) = self.settings.context() {
            let error = CloudError::Busy {
                operation: pending.operation(),
            };
            return Err(self.reject(operation, error));
        }

        let request = match direction {
            SyncDirection::Upload => HttpRequest::post(self.endpoints.settings())
                .with_json_body(self.config.to_document()),
            SyncDirection::Download => HttpRequest::get(self.endpoints.settings()),
        }
        .with_bearer(&token);

        let handle = self.transport.run(request);
        self.settings.fill(handle, direction);
        self.emit(operation, Outcome::Started, "");
        Ok(())
    }

    /// Upload one file, identified by its path under the save directory.
    pub fn upload_asset(&mut self, path: &str) -> CloudResult<()> {
        let operation = Operation::AssetUpload;
        let token = self.guard(operation, self.bearer())?;
        let source = self.guard(operation, parse_path(path))?;
        self.upload_path(&token, &source)
    }

    /// Upload every file directly inside `folder`. Subfolders are not
    /// descended into.
    ///
    /// Returns how many uploads were issued. An empty folder is not an
    /// error.
    pub fn upload_asset_folder(&mut self, folder: &str) -> CloudResult<usize> {
        let operation = Operation::FolderUpload;
        let token = self.guard(operation, self.bearer())?;
        let folder = self.guard(operation, parse_path(folder))?;

        if !self.files.folder_exists(&folder) {
            let error = CloudError::io(
                &folder,
                io::Error::new(io::ErrorKind::NotFound, "folder does not exist"),
            );
            return Err(self.reject(operation, error));
        }

        let entries = self.guard(operation, self.files.list_dir(&folder))?;
        let mut found = 0;
        let mut queued = 0;
        let mut last_failure = FailureKind::LocalIo;
        for entry in entries.iter().filter(|entry| !entry.is_dir) {
            found += 1;
            let queued_one = folder
                .join(&entry.name)
                .map_err(CloudError::from)
                .and_then(|source| self.upload_path(&token, &source));
            match queued_one {
                Ok(()) => queued += 1,
                Err(e) => {
                    log::warn!("Skipping '{}' in {}: {}", entry.name, folder, e);
                    last_failure = e.kind();
                }
            }
        }

        if found == 0 {
            self.emit(
                operation,
                Outcome::NothingToDo,
                format!("No files found in {}", folder),
            );
        } else if queued == 0 {
            self.emit(
                operation,
                Outcome::Failed(last_failure),
                format!("None of {} files from {} could be queued", found, folder),
            );
        } else {
            self.emit(
                operation,
                Outcome::Started,
                format!("Queued {} of {} files from {}", queued, found, folder),
            );
        }
        Ok(queued)
    }

    /// Download `filename` to its recorded local path, or to `filename`
    /// itself when the inventory does not list it.
    pub fn download_asset(&mut self, filename: &str) -> CloudResult<()> {
        let operation = Operation::AssetDownload;
        let token = self.guard(operation, self.bearer())?;

        let local = self
            .inventory
            .local_path_for(filename)
            .unwrap_or(filename)
            .to_string();
        let target = self.guard(operation, parse_path(&local))?;

        let request = HttpRequest::get(self.endpoints.asset(filename)).with_bearer(&token);
        let handle = self.transport.run(request);
        self.downloads.push(DownloadEntry {
            remote: filename.to_string(),
            target,
            session: self.session.generation(),
            handle,
        });
        self.emit(operation, Outcome::Started, filename);
        Ok(())
    }

    /// Fetch the remote listing.
    pub fn get_inventory(&mut self) -> CloudResult<()> {
        let operation = Operation::Inventory;
        let token = self.guard(operation, self.bearer())?;
        self.guard(operation, self.inventory_fetch.ensure_idle(operation))?;
        self.issue_inventory_fetch(&token);
        Ok(())
    }

    /// Download every listed file that is not under an asset folder.
    /// Returns how many downloads were issued.
    pub fn download_all_configs(&mut self) -> CloudResult<usize> {
        let operation = Operation::AssetDownload;
        self.guard(operation, self.bearer())?;

        let filenames: Vec<String> = self
            .inventory
            .iter()
            .filter(|asset| asset.kind() != AssetKind::Asset)
            .map(|asset| asset.filename.clone())
            .collect();

        if filenames.is_empty() {
            self.emit(operation, Outcome::NothingToDo, "No config files in inventory");
            return Ok(0);
        }

        Ok(filenames
            .iter()
            .filter(|filename| self.download_asset(filename).is_ok())
            .count())
    }

    /// Upload the selected preset files and folders. Folders that do not
    /// exist locally are skipped. Returns how many uploads were issued.
    pub fn upload_selection(&mut self, selection: &UploadSelection) -> CloudResult<usize> {
        let operation = Operation::AssetUpload;
        self.guard(operation, self.bearer())?;

        let mut queued = 0;
        for file in selection.selected_files() {
            if self.upload_asset(file).is_ok() {
                queued += 1;
            }
        }
        for folder in selection.selected_folders() {
            let exists = AssetPath::parse(folder)
                .map(|path| self.files.folder_exists(&path))
                .unwrap_or(false);
            if !exists {
                log::debug!("Skipping missing folder {}", folder);
                continue;
            }
            if let Ok(count) = self.upload_asset_folder(folder) {
                queued += count;
            }
        }
        Ok(queued)
    }

    /// Observe every tracked request and reconcile the finished ones.
    ///
    /// Never blocks. Inventory is reconciled last so a refresh requested
    /// by an upload finishing in this tick is issued in this tick.
    pub fn tick(&mut self) {
        self.poll_auth(Operation::Login);
        self.poll_auth(Operation::Register);
        self.poll_settings();
        self.poll_uploads();
        self.poll_downloads();
        self.poll_inventory();
    }

    pub fn is_logged_in(&self) -> bool {
        self.session.is_authenticated()
    }

    pub fn username(&self) -> Option<&str> {
        self.session.username()
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Human-readable form of the latest event.
    pub fn status_message(&self) -> String {
        match self.events.last() {
            Some(event) => event.to_string(),
            None => "Not connected".to_string(),
        }
    }

    pub fn last_event(&self) -> Option<&CloudEvent> {
        self.events.last()
    }

    /// Events emitted since the previous drain, oldest first.
    pub fn drain_events(&mut self) -> Vec<CloudEvent> {
        self.events.drain()
    }

    pub fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    pub fn inventory_asset(&self, index: usize) -> Option<&InventoryAsset> {
        self.inventory.get(index)
    }

    pub fn pending_downloads(&self) -> usize {
        self.downloads.len()
    }

    pub fn pending_uploads(&self) -> usize {
        self.uploads.len()
    }

    pub fn has_pending(&self) -> bool {
        self.login.is_pending()
            || self.register.is_pending()
            || self.settings.is_pending()
            || self.inventory_fetch.is_pending()
            || !self.uploads.is_empty()
            || !self.downloads.is_empty()
    }

    fn authenticate(&mut self, operation: Operation, username: &str, password: &str) -> CloudResult<()> {
        let idle = self.auth_slot(operation).ensure_idle(operation);
        self.guard(operation, idle)?;

        let url = match operation {
            Operation::Register => self.endpoints.register(),
            _ => self.endpoints.login(),
        };
        let request = HttpRequest::post(url).with_json_body(json!({
            "username": username,
            "password": password,
        }));

        let handle = self.transport.run(request);
        self.auth_slot(operation).fill(handle, username.to_string());
        self.emit(operation, Outcome::Started, username);
        Ok(())
    }

    fn auth_slot(&mut self, operation: Operation) -> &mut Slot<String> {
        match operation {
            Operation::Register => &mut self.register,
            _ => &mut self.login,
        }
    }

    fn upload_path(&mut self, token: &str, source: &AssetPath) -> CloudResult<()> {
        let operation = Operation::AssetUpload;
        if self.uploads.contains(source) {
            let error = CloudError::Busy { operation };
            return Err(self.reject_on(operation, &source.to_string(), error));
        }

        let data = match self.files.read_file(source) {
            Ok(data) => data,
            Err(error) => return Err(self.reject_on(operation, &source.to_string(), error)),
        };

        let name = source.to_string();
        let request = HttpRequest::post(self.endpoints.assets())
            .with_bearer(token)
            .with_header("X-Filename", name.as_str())
            .with_header("X-Local-Path", name.as_str())
            .with_header("Content-Type", "application/octet-stream")
            .with_bytes_body(data);

        let handle = self.transport.run(request);
        self.uploads.push(UploadEntry {
            source: source.clone(),
            session: self.session.generation(),
            handle,
        });
        self.emit(operation, Outcome::Started, name);
        Ok(())
    }

    fn issue_inventory_fetch(&mut self, token: &str) {
        let request = HttpRequest::get(self.endpoints.inventory()).with_bearer(token);
        let handle = self.transport.run(request);
        self.inventory_fetch.fill(handle, ());
        self.inventory_stale = false;
        self.emit(Operation::Inventory, Outcome::Started, "");
    }

    /// Drop the single-flight requests tied to the session that just ended.
    fn discard_session_work(&mut self) {
        if let Some(direction) = self.settings.discard() {
            log::info!("Discarded pending {}", direction.operation());
        }
        if self.inventory_fetch.discard().is_some() {
            log::info!("Discarded pending {}", Operation::Inventory);
        }
        self.inventory_stale = false;
    }

    fn is_current(&self, session: u64) -> bool {
        session == self.session.generation()
    }

    /// Fetch the inventory now, or once the fetch in flight resolves.
    fn refresh_inventory(&mut self) {
        let Some(token) = self.session.token().map(str::to_string) else {
            log::debug!("Not logged in, inventory refresh skipped");
            return;
        };
        if self.inventory_fetch.is_pending() {
            log::debug!("Inventory fetch in flight, refreshing again once it resolves");
            self.inventory_stale = true;
            return;
        }
        self.issue_inventory_fetch(&token);
    }

    fn poll_auth(&mut self, operation: Operation) {
        let Some((handle, username)) = self.auth_slot(operation).take_finished() else {
            return;
        };

        let token = response_json(&handle).and_then(|body| {
            body.get("token")
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| CloudError::malformed("response has no string token"))
        });

        match token {
            Ok(token) => {
                self.session.sign_in(token, username.as_str());
                self.discard_session_work();
                let detail = match operation {
                    Operation::Register => format!("Registered as {}", username),
                    _ => format!("Logged in as {}", username),
                };
                self.emit(operation, Outcome::Succeeded, detail);

                if let Err(e) = self.sync_settings(SyncDirection::Download) {
                    log::warn!("Settings pull after {} not started: {}", operation, e);
                }
                self.refresh_inventory();
            }
            Err(error) => self.fail(operation, &error),
        }
    }

    fn poll_settings(&mut self) {
        let Some((handle, direction)) = self.settings.take_finished() else {
            return;
        };
        let operation = direction.operation();

        let result = response_json(&handle).and_then(|document| match direction {
            SyncDirection::Upload => Ok("Settings uploaded"),
            SyncDirection::Download => {
                self.apply_settings(&document)?;
                Ok("Settings applied and saved")
            }
        });

        match result {
            Ok(detail) => self.emit(operation, Outcome::Succeeded, detail),
            Err(error) => self.fail(operation, &error),
        }
    }

    /// Load a pulled document and save it. A pull only succeeds once saved;
    /// if saving fails the previous settings are put back.
    fn apply_settings(&mut self, document: &Value) -> CloudResult<()> {
        let previous = self.config.to_document();
        self.config.load_document(document)?;
        if let Err(error) = self.config.persist() {
            if let Err(e) = self.config.restore_document(&previous) {
                log::error!("Restoring settings after a failed save: {}", e);
            }
            return Err(error);
        }
        Ok(())
    }

    fn poll_uploads(&mut self) {
        let operation = Operation::AssetUpload;
        for entry in self.uploads.take_finished() {
            let source = entry.source.to_string();
            // Uploads from an ended session are reported, nothing more.
            let current = self.is_current(entry.session);
            match response_json(&entry.handle) {
                Ok(body) => {
                    if let Some(message) = body.get("message").and_then(Value::as_str) {
                        log::info!("{}: {}", source, message);
                    }
                    let detail = match body.get("version").and_then(Value::as_u64) {
                        Some(version) => format!("{} (version {})", source, version),
                        None => source,
                    };
                    self.emit(operation, Outcome::Succeeded, detail);
                    if current {
                        self.refresh_inventory();
                    }
                }
                Err(error) => {
                    self.fail_on(operation, &source, &error);
                    // The server accepted the bytes even if its reply was odd.
                    if current && entry.handle.state() == RequestState::Done {
                        self.refresh_inventory();
                    }
                }
            }
        }
    }

    fn poll_downloads(&mut self) {
        let operation = Operation::AssetDownload;
        for entry in self.downloads.take_finished() {
            if !self.is_current(entry.session) {
                self.emit(
                    operation,
                    Outcome::NothingToDo,
                    format!("{} discarded, its session ended", entry.remote),
                );
                continue;
            }
            match self.store_download(&entry) {
                Ok(true) => {
                    let saved_to = self.files.absolute_path(&entry.target);
                    self.emit(
                        operation,
                        Outcome::Succeeded,
                        format!("{} saved to {}", entry.remote, saved_to.display()),
                    );
                }
                Ok(false) => self.emit(
                    operation,
                    Outcome::NothingToDo,
                    format!("{} is empty", entry.remote),
                ),
                Err(error) => self.fail_on(operation, &entry.remote, &error),
            }
        }
    }

    /// Write a finished download to disk. `Ok(false)` when there was
    /// nothing to write.
    fn store_download(&mut self, entry: &DownloadEntry) -> CloudResult<bool> {
        let response = finished_response(&entry.handle)?;
        if response.body().is_empty() {
            return Ok(false);
        }

        // The file store only creates one level at a time.
        for folder in entry.target.ancestors() {
            if !self.files.folder_exists(&folder) {
                self.files.create_folder(&folder)?;
            }
        }
        self.files.write_file(&entry.target, response.body())?;

        match entry.target.extension().as_deref() {
            Some("cfg") => {
                if let Some(scripts) = self.scripts.as_mut() {
                    if let Err(e) = scripts.execute(&entry.target) {
                        log::warn!("Executing {} failed: {}", entry.target, e);
                    }
                }
            }
            Some("json") => {
                log::warn!("{} changed on disk; reload to apply it", entry.target);
            }
            _ => {}
        }
        Ok(true)
    }

    fn poll_inventory(&mut self) {
        let operation = Operation::Inventory;
        let Some((handle, ())) = self.inventory_fetch.take_finished() else {
            return;
        };

        match response_json(&handle).and_then(|body| Inventory::from_response(&body)) {
            Ok(inventory) => {
                let detail = format!("{} assets", inventory.len());
                self.inventory = inventory;
                self.emit(operation, Outcome::Succeeded, detail);
            }
            Err(error) => self.fail(operation, &error),
        }

        if std::mem::take(&mut self.inventory_stale) {
            self.refresh_inventory();
        }
    }

    fn bearer(&self) -> CloudResult<String> {
        self.session
            .token()
            .map(str::to_string)
            .ok_or(CloudError::NotAuthenticated)
    }

    /// Pass `result` through, reporting an error as a failed `operation`.
    fn guard<T>(&mut self, operation: Operation, result: CloudResult<T>) -> CloudResult<T> {
        result.map_err(|error| self.reject(operation, error))
    }

    fn reject(&mut self, operation: Operation, error: CloudError) -> CloudError {
        self.fail(operation, &error);
        error
    }

    fn reject_on(&mut self, operation: Operation, subject: &str, error: CloudError) -> CloudError {
        self.fail_on(operation, subject, &error);
        error
    }

    fn fail(&mut self, operation: Operation, error: &CloudError) {
        self.emit(operation, Outcome::Failed(error.kind()), error.to_string());
    }

    fn fail_on(&mut self, operation: Operation, subject: &str, error: &CloudError) {
        self.emit(
            operation,
            Outcome::Failed(error.kind()),
            format!("{}: {}", subject, error),
        );
    }

    fn emit(&mut self, operation: Operation, outcome: Outcome, detail: impl Into<String>) {
        let event = CloudEvent::new(operation, outcome, detail);
        match event.outcome {
            Outcome::Failed(FailureKind::NotAuthenticated | FailureKind::Busy) => {
                log::warn!("{}", event)
            }
            Outcome::Failed(_) => log::error!("{}", event),
            _ => log::info!("{}", event),
        }
        self.events.push(event);
    }
}

fn parse_path(path: &str) -> CloudResult<AssetPath> {
    Ok(AssetPath::parse(path)?)
}

/// The response of a request that ended in `Done`.
fn finished_response(handle: &RequestHandle) -> CloudResult<HttpResponse> {
    match handle.state() {
        RequestState::Done => handle
            .response()
            .ok_or_else(|| CloudError::malformed("request finished without a response")),
        _ => Err(CloudError::request_failed(
            handle.error().unwrap_or_else(|| "unknown error".to_string()),
        )),
    }
}

/// The JSON document of a request that ended in `Done`.
fn response_json(handle: &RequestHandle) -> CloudResult<Value> {
    finished_response(handle)?
        .payload()
        .into_json()
        .ok_or_else(|| CloudError::malformed("response is not JSON"))
}

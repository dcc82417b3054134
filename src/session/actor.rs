//! Actor-based controller runtime with periodic dashboard refresh.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde_json::Value;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::{sleep, Instant};
use tracing::debug;

use crate::api::{ApiClient, CloudApi, CodeSent, ServiceStatus};
use crate::config::ClientConfig;
use crate::error::{CloudError, Result};
use crate::fs::UploadOption;
use crate::notify::UiEvent;
use crate::session::controller::{Controller, SearchOutcome, Snapshot};
use crate::session::registration::PendingRegistration;
use crate::session::sequence::Ticket;
use crate::session::view::View;

/// Cloneable handle to a controller running on its own task.
///
/// Commands are processed one at a time. While the dashboard is showing for
/// a logged-in volume, the file listing is refreshed every
/// `refresh_interval`.
#[derive(Clone)]
pub struct CloudHandle {
    tx: mpsc::Sender<Command>,
    events: broadcast::Sender<UiEvent>,
}

enum Command {
    Register {
        name: String,
        email: String,
        password: String,
        storage_mb: u32,
        reply: oneshot::Sender<Result<CodeSent>>,
    },
    Confirm {
        code: String,
        reply: oneshot::Sender<Result<String>>,
    },
    RestorePending {
        pending: PendingRegistration,
        reply: oneshot::Sender<Result<()>>,
    },
    Pending {
        reply: oneshot::Sender<Result<Option<PendingRegistration>>>,
    },
    Login {
        name: String,
        password: String,
        reply: oneshot::Sender<Result<()>>,
    },
    Logout {
        reply: oneshot::Sender<Result<()>>,
    },
    Navigate {
        view: View,
        reply: oneshot::Sender<Result<()>>,
    },
    NavigateNamed {
        name: String,
        reply: oneshot::Sender<Result<()>>,
    },
    LoadSessionData {
        reply: oneshot::Sender<Result<()>>,
    },
    RefreshFiles {
        reply: oneshot::Sender<Result<usize>>,
    },
    UploadBytes {
        data: Vec<u8>,
        filename: String,
        option: UploadOption,
        reply: oneshot::Sender<Result<String>>,
    },
    UploadFile {
        path: PathBuf,
        option: UploadOption,
        reply: oneshot::Sender<Result<String>>,
    },
    Download {
        filename: String,
        dest_dir: PathBuf,
        reply: oneshot::Sender<Result<PathBuf>>,
    },
    Delete {
        filename: String,
        reply: oneshot::Sender<Result<bool>>,
    },
    Cleanup {
        reply: oneshot::Sender<Result<Option<u64>>>,
    },
    RequestFile {
        filename: String,
        reply: oneshot::Sender<Result<SearchOutcome>>,
    },
    Status {
        reply: oneshot::Sender<Result<ServiceStatus>>,
    },
    Snapshot {
        reply: oneshot::Sender<Result<Snapshot>>,
    },
    DismissNotice {
        id: u64,
        reply: oneshot::Sender<Result<bool>>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

const MIN_REFRESH: Duration = Duration::from_secs(1);

/// Listing fetched by a background refresh, tagged with its ticket.
type Refreshed = (Ticket, Result<Vec<Value>>);

struct CloudActor<A> {
    controller: Controller<A>,
    rx: mpsc::Receiver<Command>,
    refreshed_tx: mpsc::Sender<Refreshed>,
    refreshed_rx: mpsc::Receiver<Refreshed>,
    refresh_inflight: bool,
}

impl CloudHandle {
    /// Run `controller` on a new task.
    pub fn spawn<A: CloudApi + 'static>(controller: Controller<A>) -> Self {
        CloudActor::spawn(controller)
    }

    /// Spawn a controller talking HTTP to the configured server.
    pub fn connect(config: ClientConfig) -> Result<Self> {
        let controller: Controller<ApiClient> = Controller::connect(config)?;
        Ok(Self::spawn(controller))
    }

    pub fn subscribe(&self) -> broadcast::Receiver<UiEvent> {
        self.events.subscribe()
    }

    async fn request<R>(
        &self,
        build: impl FnOnce(oneshot::Sender<Result<R>>) -> Command,
    ) -> Result<R> {
        let (tx, rx) = oneshot::channel();
        let cmd = build(tx);
        self.tx
            .send(cmd)
            .await
            .map_err(|_| CloudError::Custom("Controller actor stopped".to_string()))?;
        rx.await
            .map_err(|_| CloudError::Custom("Controller actor stopped".to_string()))?
    }

    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
        storage_mb: u32,
    ) -> Result<CodeSent> {
        self.request(|reply| Command::Register {
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            storage_mb,
            reply,
        })
        .await
    }

    pub async fn confirm(&self, code: &str) -> Result<String> {
        self.request(|reply| Command::Confirm {
            code: code.to_string(),
            reply,
        })
        .await
    }

    pub async fn restore_pending(&self, pending: PendingRegistration) -> Result<()> {
        self.request(|reply| Command::RestorePending { pending, reply })
            .await
    }

    pub async fn pending(&self) -> Result<Option<PendingRegistration>> {
        self.request(|reply| Command::Pending { reply }).await
    }

    pub async fn login(&self, name: &str, password: &str) -> Result<()> {
        self.request(|reply| Command::Login {
            name: name.to_string(),
            password: password.to_string(),
            reply,
        })
        .await
    }

    pub async fn logout(&self) -> Result<()> {
        self.request(|reply| Command::Logout { reply }).await
    }

    pub async fn navigate(&self, view: View) -> Result<()> {
        self.request(|reply| Command::Navigate { view, reply })
            .await
    }

    pub async fn navigate_named(&self, name: &str) -> Result<()> {
        self.request(|reply| Command::NavigateNamed {
            name: name.to_string(),
            reply,
        })
        .await
    }

    pub async fn load_session_data(&self) -> Result<()> {
        self.request(|reply| Command::LoadSessionData { reply })
            .await
    }

    pub async fn refresh_files(&self) -> Result<usize> {
        self.request(|reply| Command::RefreshFiles { reply })
            .await
    }

    pub async fn upload_bytes(
        &self,
        data: Vec<u8>,
        filename: &str,
        option: UploadOption,
    ) -> Result<String> {
        self.request(|reply| Command::UploadBytes {
            data,
            filename: filename.to_string(),
            option,
            reply,
        })
        .await
    }

    pub async fn upload_file<P: AsRef<Path>>(
        &self,
        path: P,
        option: UploadOption,
    ) -> Result<String> {
        self.request(|reply| Command::UploadFile {
            path: path.as_ref().to_path_buf(),
            option,
            reply,
        })
        .await
    }

    pub async fn download<P: AsRef<Path>>(&self, filename: &str, dest_dir: P) -> Result<PathBuf> {
        self.request(|reply| Command::Download {
            filename: filename.to_string(),
            dest_dir: dest_dir.as_ref().to_path_buf(),
            reply,
        })
        .await
    }

    pub async fn delete_file(&self, filename: &str) -> Result<bool> {
        self.request(|reply| Command::Delete {
            filename: filename.to_string(),
            reply,
        })
        .await
    }

    pub async fn cleanup_ghost_files(&self) -> Result<Option<u64>> {
        self.request(|reply| Command::Cleanup { reply }).await
    }

    pub async fn request_file(&self, filename: &str) -> Result<SearchOutcome> {
        self.request(|reply| Command::RequestFile {
            filename: filename.to_string(),
            reply,
        })
        .await
    }

    pub async fn service_status(&self) -> Result<ServiceStatus> {
        self.request(|reply| Command::Status { reply }).await
    }

    pub async fn snapshot(&self) -> Result<Snapshot> {
        self.request(|reply| Command::Snapshot { reply }).await
    }

    pub async fn dismiss_notice(&self, id: u64) -> Result<bool> {
        self.request(|reply| Command::DismissNotice { id, reply })
            .await
    }

    pub async fn shutdown(&self) {
        let (tx, rx) = oneshot::channel();
        let _ = self.tx.send(Command::Shutdown { reply: tx }).await;
        let _ = rx.await;
    }
}

impl<A: CloudApi + 'static> CloudActor<A> {
    fn spawn(controller: Controller<A>) -> CloudHandle {
        let (tx, rx) = mpsc::channel(64);
        let (refreshed_tx, refreshed_rx) = mpsc::channel(4);
        let events = controller.event_sender();
        let actor = CloudActor {
            controller,
            rx,
            refreshed_tx,
            refreshed_rx,
            refresh_inflight: false,
        };
        tokio::spawn(actor.run());
        CloudHandle { tx, events }
    }

    async fn run(mut self) {
        let period = self.controller.config().refresh_interval.max(MIN_REFRESH);
        let mut next_refresh = Instant::now() + period;

        loop {
            tokio::select! {
                cmd = self.rx.recv() => {
                    let Some(cmd) = cmd else { break; };
                    if self.handle_command(cmd).await {
                        break;
                    }
                }
                Some((ticket, result)) = self.refreshed_rx.recv() => {
                    self.refresh_inflight = false;
                    self.controller.finish_background_refresh(ticket, result);
                }
                _ = sleep(next_refresh.saturating_duration_since(Instant::now())) => {
                    self.spawn_refresh();
                    next_refresh = Instant::now() + period;
                }
            }
        }
    }

    /// Fetch the listing off the actor task so commands keep flowing.
    fn spawn_refresh(&mut self) {
        if self.refresh_inflight {
            return;
        }
        let Some((ticket, vm)) = self.controller.begin_background_refresh() else {
            return;
        };
        debug!(vm = %vm, "periodic listing refresh");
        self.refresh_inflight = true;
        let api = self.controller.api();
        let tx = self.refreshed_tx.clone();
        tokio::spawn(async move {
            let result = api.files(&vm).await;
            let _ = tx.send((ticket, result)).await;
        });
    }

    async fn handle_command(&mut self, cmd: Command) -> bool {
        let ctl = &mut self.controller;
        match cmd {
            Command::Register {
                name,
                email,
                password,
                storage_mb,
                reply,
            } => {
                let res = ctl.register(&name, &email, &password, storage_mb).await;
                let _ = reply.send(res);
            }
            Command::Confirm { code, reply } => {
                let res = ctl.confirm(&code).await;
                let _ = reply.send(res);
            }
            Command::RestorePending { pending, reply } => {
                ctl.restore_pending(pending);
                let _ = reply.send(Ok(()));
            }
            Command::Pending { reply } => {
                let _ = reply.send(Ok(ctl.pending().cloned()));
            }
            Command::Login {
                name,
                password,
                reply,
            } => {
                let res = ctl.login(&name, &password).await;
                let _ = reply.send(res);
            }
            Command::Logout { reply } => {
                ctl.logout().await;
                let _ = reply.send(Ok(()));
            }
            Command::Navigate { view, reply } => {
                ctl.navigate(view).await;
                let _ = reply.send(Ok(()));
            }
            Command::NavigateNamed { name, reply } => {
                ctl.navigate_named(&name).await;
                let _ = reply.send(Ok(()));
            }
            Command::LoadSessionData { reply } => {
                ctl.load_session_data().await;
                let _ = reply.send(Ok(()));
            }
            Command::RefreshFiles { reply } => {
                let res = ctl.refresh_files().await;
                let _ = reply.send(res);
            }
            Command::UploadBytes {
                data,
                filename,
                option,
                reply,
            } => {
                let res = ctl.upload_bytes(data, &filename, option).await;
                let _ = reply.send(res);
            }
            Command::UploadFile {
                path,
                option,
                reply,
            } => {
                let res = ctl.upload_file(&path, option).await;
                let _ = reply.send(res);
            }
            Command::Download {
                filename,
                dest_dir,
                reply,
            } => {
                let res = ctl.download(&filename, &dest_dir).await;
                let _ = reply.send(res);
            }
            Command::Delete { filename, reply } => {
                let res = ctl.delete_file(&filename).await;
                let _ = reply.send(res);
            }
            Command::Cleanup { reply } => {
                let res = ctl.cleanup_ghost_files().await;
                let _ = reply.send(res);
            }
            Command::RequestFile { filename, reply } => {
                let res = ctl.request_file(&filename).await;
                let _ = reply.send(res);
            }
            Command::Status { reply } => {
                let res = ctl.service_status().await;
                let _ = reply.send(res);
            }
            Command::Snapshot { reply } => {
                let _ = reply.send(Ok(ctl.snapshot()));
            }
            Command::DismissNotice { id, reply } => {
                let _ = reply.send(Ok(ctl.dismiss_notice(id)));
            }
            Command::Shutdown { reply } => {
                let _ = reply.send(());
                return true;
            }
        }
        false
    }
}

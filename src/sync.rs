//! Sync Orchestrator
//!
//! Pull/push of the library against a remote over SSH. Only one sync runs
//! at a time; a successful sync reloads the library. The call runs on its
//! own task so closing the panel never abandons it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tracing::{info, warn};

use crate::backend::Backend;
use crate::domain::{
    BackendContext, CoreError, CoreResult, Refusal, RepositoryConfig, SyncDirection, SyncOutcome,
    DEFAULT_SSH_PORT,
};
use crate::notice::Notice;
use crate::session::Session;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncState {
    Idle,
    Busy(SyncDirection),
    Settled(SyncOutcome),
}

/// Whether an SSH client is usable on this machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportStatus {
    Available,
    Missing,
    /// The check itself failed
    Unknown(String),
}

/// Everything a sync call needs, taken from the config
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncTarget {
    pub local_folder: String,
    pub server: String,
    pub remote_path: String,
    pub port: u16,
}

impl SyncTarget {
    /// Refuses unless a root is chosen and remote sync is enabled and filled in
    pub fn from_config(config: &RepositoryConfig) -> Result<Self, Refusal> {
        if !config.has_root() {
            return Err(Refusal::NoRootFolder);
        }
        let remote = &config.remote_sync;
        if !remote.enabled {
            return Err(Refusal::SyncDisabled);
        }
        if remote.server.trim().is_empty() || remote.remote_path.trim().is_empty() {
            return Err(Refusal::SyncTargetIncomplete);
        }
        Ok(Self {
            local_folder: config.root_folder.clone(),
            server: remote.server.trim().to_string(),
            remote_path: remote.remote_path.trim().to_string(),
            port: remote.effective_port(),
        })
    }
}

pub struct SyncOrchestrator<B: Backend> {
    session: Arc<Session<B>>,
    state: Arc<Mutex<SyncState>>,
    panel_open: Arc<AtomicBool>,
}

impl<B: Backend> Clone for SyncOrchestrator<B> {
    fn clone(&self) -> Self {
        Self {
            session: self.session.clone(),
            state: self.state.clone(),
            panel_open: self.panel_open.clone(),
        }
    }
}

impl<B: Backend> SyncOrchestrator<B> {
    pub fn new(session: Arc<Session<B>>) -> Self {
        Self {
            session,
            state: Arc::new(Mutex::new(SyncState::Idle)),
            panel_open: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn state(&self) -> SyncState {
        self.lock_state().clone()
    }

    pub fn is_busy(&self) -> bool {
        matches!(*self.lock_state(), SyncState::Busy(_))
    }

    /// Pull and push buttons are disabled while a sync runs
    pub fn triggers_enabled(&self) -> bool {
        !self.is_busy()
    }

    pub fn is_open(&self) -> bool {
        self.panel_open.load(Ordering::SeqCst)
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, SyncState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Show the sync panel if sync is configured
    pub async fn open(&self) -> CoreResult<()> {
        let config = self.session.config().await;
        if let Err(refusal) = SyncTarget::from_config(&config) {
            return self.session.report(Err(refusal.into()), None);
        }
        {
            let mut state = self.lock_state();
            if let SyncState::Settled(_) = *state {
                *state = SyncState::Idle;
            }
        }
        self.panel_open.store(true, Ordering::SeqCst);
        Ok(())
    }

    /// Hide the panel; a running sync carries on
    pub fn close(&self) {
        self.panel_open.store(false, Ordering::SeqCst);
        let mut state = self.lock_state();
        if let SyncState::Settled(_) = *state {
            *state = SyncState::Idle;
        }
    }

    /// Run one sync and wait for its outcome
    pub async fn run(&self, direction: SyncDirection) -> CoreResult<SyncOutcome> {
        let config = self.session.config().await;
        let target = match SyncTarget::from_config(&config) {
            Ok(target) => target,
            Err(refusal) => return self.session.report(Err(refusal.into()), None),
        };

        {
            let mut state = self.lock_state();
            if let SyncState::Busy(_) = *state {
                return Err(Refusal::SyncBusy.into());
            }
            *state = SyncState::Busy(direction);
        }
        info!(
            direction = direction.as_str(),
            server = %target.server,
            port = target.port,
            "sync started"
        );

        let this = self.clone();
        match tokio::spawn(async move { this.execute(direction, target).await }).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                warn!(direction = direction.as_str(), error = %e, "sync task aborted");
                *self.lock_state() = SyncState::Settled(SyncOutcome::error(e.to_string()));
                Err(CoreError::backend("Sync", e.to_string()))
            }
        }
    }

    async fn execute(&self, direction: SyncDirection, target: SyncTarget) -> SyncOutcome {
        let backend = self.session.backend();
        let seq = self.session.sequence().await;

        let result = match direction {
            SyncDirection::Pull => {
                backend
                    .sync_pull(&target.local_folder, &target.server, &target.remote_path, target.port)
                    .await
            }
            SyncDirection::Push => {
                backend
                    .sync_push(&target.local_folder, &target.server, &target.remote_path, target.port)
                    .await
            }
        };
        let outcome = result.unwrap_or_else(SyncOutcome::error);

        if outcome.is_success() {
            if let Err(e) = self.session.refresh(&seq).await {
                warn!(error = %e, "reload after sync failed");
                self.session.notify(Notice::error(e.to_string()));
            }
        }
        drop(seq);

        if outcome.is_success() {
            info!(direction = direction.as_str(), message = %outcome.message, "sync finished");
        } else {
            warn!(direction = direction.as_str(), message = %outcome.message, "sync failed");
        }

        *self.lock_state() = SyncState::Settled(outcome.clone());
        // Nobody is looking at the panel; fall back to a notice
        if !self.is_open() {
            let notice = if outcome.is_success() {
                Notice::success(outcome.message.clone())
            } else {
                Notice::error(outcome.message.clone())
            };
            self.session.notify(notice);
        }
        outcome
    }

    // ========================
    // Probes
    // ========================

    /// Try to reach `server`; port 0 means the default
    pub async fn test_connection(&self, server: &str, port: u16) -> CoreResult<String> {
        let server = server.trim();
        if server.is_empty() {
            return Err(Refusal::EmptyServer.into());
        }
        let port = if port == 0 { DEFAULT_SSH_PORT } else { port };
        self.session
            .backend()
            .test_ssh_connection(server, port)
            .await
            .during("Connection test")
    }

    pub async fn check_transport(&self) -> TransportStatus {
        match self.session.backend().check_ssh_available().await {
            Ok(true) => TransportStatus::Available,
            Ok(false) => TransportStatus::Missing,
            Err(e) => TransportStatus::Unknown(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use crate::domain::SyncStatus;
    use crate::notice::{NoticeLevel, NoticeLog};
    use crate::options::SessionOptions;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    async fn setup(enabled: bool) -> (Arc<MemoryBackend>, Arc<NoticeLog>, SyncOrchestrator<MemoryBackend>) {
        let backend = Arc::new(MemoryBackend::with_root("/p"));
        backend.add_file("/p/local.md", "mine");
        backend.update_config(|c| {
            c.remote_sync.enabled = enabled;
            c.remote_sync.server = "user@host".to_string();
            c.remote_sync.remote_path = "/srv/prompts".to_string();
            c.remote_sync.port = 0;
        });
        let notices = Arc::new(NoticeLog::new());
        let session = Session::new(backend.clone(), notices.clone(), SessionOptions::default());
        session.load_config().await.unwrap();
        (backend, notices, SyncOrchestrator::new(session))
    }

    #[test]
    fn test_target_requires_complete_config() {
        let mut config = RepositoryConfig::default();
        assert_eq!(SyncTarget::from_config(&config), Err(Refusal::NoRootFolder));

        config.root_folder = "/p".to_string();
        assert_eq!(SyncTarget::from_config(&config), Err(Refusal::SyncDisabled));

        config.remote_sync.enabled = true;
        assert_eq!(SyncTarget::from_config(&config), Err(Refusal::SyncTargetIncomplete));

        config.remote_sync.server = "h".to_string();
        config.remote_sync.remote_path = "/r".to_string();
        assert_eq!(SyncTarget::from_config(&config).unwrap().port, 22);
    }

    #[tokio::test]
    async fn test_disabled_sync_never_reaches_backend() {
        let (backend, notices, sync) = setup(false).await;

        let err = sync.open().await.unwrap_err();
        assert_eq!(err, CoreError::Refused(Refusal::SyncDisabled));
        assert!(!sync.is_open());

        let err = sync.run(SyncDirection::Pull).await.unwrap_err();
        assert_eq!(err, CoreError::Refused(Refusal::SyncDisabled));
        assert_eq!(backend.call_count("sync_pull"), 0);
        assert_eq!(notices.last().unwrap().level, NoticeLevel::Error);
    }

    #[tokio::test]
    async fn test_pull_reloads_library() {
        let (backend, _notices, sync) = setup(true).await;
        backend.add_remote_file("team/shared.md", "theirs");
        sync.open().await.unwrap();

        let outcome = sync.run(SyncDirection::Pull).await.unwrap();
        assert_eq!(outcome.status, SyncStatus::Success);
        assert_eq!(outcome.message, "Pulled 1 files from user@host:/srv/prompts");
        assert_eq!(sync.state(), SyncState::Settled(outcome));

        let entries = sync.session.entries().await;
        assert!(entries.iter().any(|e| e.file_path == "/p/team/shared.md"));
        assert!(sync.session.tree().await.get("/p/team").is_some());
    }

    #[tokio::test]
    async fn test_push_copies_local_files() {
        let (backend, _notices, sync) = setup(true).await;
        let outcome = sync.run(SyncDirection::Push).await.unwrap();
        assert!(outcome.is_success());
        assert_eq!(backend.remote_files().get("local.md").map(String::as_str), Some("mine"));
    }

    #[tokio::test]
    async fn test_backend_error_settles_as_failure() {
        let (backend, _notices, sync) = setup(true).await;
        backend.fail("sync_push", "ssh: connection refused");
        sync.open().await.unwrap();

        let outcome = sync.run(SyncDirection::Push).await.unwrap();
        assert_eq!(outcome, SyncOutcome::error("ssh: connection refused"));
        assert_eq!(backend.call_count("scan_prompts"), 1);
        assert!(sync.triggers_enabled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_sync_is_refused_while_busy() {
        let (backend, _notices, sync) = setup(true).await;
        backend.set_sync_delay(Duration::from_secs(5));

        let running = {
            let sync = sync.clone();
            tokio::spawn(async move { sync.run(SyncDirection::Pull).await })
        };
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;
        assert!(sync.is_busy());
        assert!(!sync.triggers_enabled());

        let err = sync.run(SyncDirection::Push).await.unwrap_err();
        assert_eq!(err, CoreError::Refused(Refusal::SyncBusy));

        let outcome = running.await.unwrap().unwrap();
        assert!(outcome.is_success());
        assert_eq!(backend.call_count("sync_push"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_closing_panel_does_not_cancel() {
        let (backend, notices, sync) = setup(true).await;
        backend.add_remote_file("late.md", "x");
        backend.set_sync_delay(Duration::from_secs(5));
        sync.open().await.unwrap();

        let running = {
            let sync = sync.clone();
            tokio::spawn(async move { sync.run(SyncDirection::Pull).await })
        };
        tokio::task::yield_now().await;
        sync.close();

        running.await.unwrap().unwrap();
        assert!(backend.file("/p/late.md").is_some());
        assert_eq!(
            notices.last(),
            Some(Notice::success("Pulled 1 files from user@host:/srv/prompts"))
        );
    }

    #[tokio::test]
    async fn test_aborted_sync_releases_triggers() {
        let (backend, _notices, sync) = setup(true).await;
        backend.panic_on("sync_pull");

        let err = sync.run(SyncDirection::Pull).await.unwrap_err();
        assert!(!err.is_refusal());
        assert!(sync.triggers_enabled());
        assert!(matches!(
            sync.state(),
            SyncState::Settled(SyncOutcome { status: SyncStatus::Error, .. })
        ));

        backend.heal("sync_pull");
        assert!(sync.run(SyncDirection::Pull).await.unwrap().is_success());
    }

    #[tokio::test]
    async fn test_probes() {
        let (backend, _notices, sync) = setup(true).await;
        assert!(sync.test_connection("  ", 22).await.unwrap_err().is_refusal());
        assert_eq!(
            sync.test_connection("user@host", 0).await.unwrap(),
            "Connected to user@host on port 22"
        );

        assert_eq!(sync.check_transport().await, TransportStatus::Available);
        backend.set_ssh_available(false);
        assert_eq!(sync.check_transport().await, TransportStatus::Missing);
        backend.fail("check_ssh_available", "which: not found");
        assert_eq!(
            sync.check_transport().await,
            TransportStatus::Unknown("which: not found".to_string())
        );
    }
}

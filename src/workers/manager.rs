use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::types::*;
use crate::config::SquadConfig;
use crate::error::{Result, SquadError};
use crate::identity;
use crate::registry::{JsonFileStore, Registry, RegistryState, WorkerRecord, WorkerStatus};
use crate::session::{SessionOrchestrator, SessionOutcome, SessionRequest, WindowHint};
use crate::setup::{ShellSetup, WorkspacePlan, WorkspaceSetup};
use crate::terminal::ITermController;

pub struct WorkerManager {
    config: SquadConfig,
    registry: Registry,
    orchestrator: SessionOrchestrator,
    setup: Arc<dyn WorkspaceSetup>,
    /// Window confirmed alive earlier in this process run.
    verified_window: Mutex<Option<String>>,
}

impl WorkerManager {
    pub fn new(
        config: SquadConfig,
        registry: Registry,
        orchestrator: SessionOrchestrator,
        setup: Arc<dyn WorkspaceSetup>,
    ) -> Self {
        Self {
            config,
            registry,
            orchestrator,
            setup,
            verified_window: Mutex::new(None),
        }
    }

    /// Production wiring: JSON state file, iTerm2, shell setup.
    pub fn from_config(config: SquadConfig) -> Self {
        let registry = Registry::new(Arc::new(JsonFileStore::new(config.state_path())));
        let orchestrator = SessionOrchestrator::new(
            Arc::new(ITermController::new()),
            config.marker_name.clone(),
            config.timings.clone(),
        );
        let setup = Arc::new(ShellSetup::new(config.env_source.clone()));
        Self::new(config, registry, orchestrator, setup)
    }

    pub fn config(&self) -> &SquadConfig {
        &self.config
    }

    pub fn list(&self) -> Vec<WorkerRecord> {
        self.registry.list()
    }

    pub fn get(&self, name_or_id: &str) -> Result<WorkerRecord> {
        self.registry
            .find(name_or_id)
            .ok_or_else(|| SquadError::NotFound(name_or_id.to_string()))
    }

    /// Port the next spawn would be given.
    pub fn preview_port(&self) -> Result<u16> {
        identity::next_port(&self.registry.snapshot(), &self.config)
    }

    pub async fn spawn(&self, request: &SpawnRequest) -> Result<WorkerRecord> {
        let state = self.registry.snapshot();
        let existing: HashSet<String> = state.workers.iter().map(|w| w.name.clone()).collect();

        let name = identity::generate_worker_name(&existing);
        let branch = request
            .branch
            .clone()
            .unwrap_or_else(|| identity::generate_branch_name(&request.task, &name));
        let port = identity::next_port(&state, &self.config)?;
        let directory = self.config.worker_dir(&name);

        if directory.exists() || state.workers.iter().any(|w| w.directory == directory) {
            return Err(SquadError::DirectoryExists(directory));
        }

        let record = WorkerRecord {
            id: Uuid::new_v4().to_string(),
            name,
            repo_url: request.repo_url.clone(),
            repo_name: identity::repo_name(&request.repo_url),
            branch,
            task: request.task.clone(),
            directory,
            port,
            session_handle: None,
            agent_session_handle: None,
            created_at: Utc::now().to_rfc3339(),
            status: WorkerStatus::SettingUp,
        };
        self.registry.add_worker(record.clone())?;
        info!(
            "Spawning worker {} on port {} (branch {})",
            record.name, record.port, record.branch
        );

        let outcome = match self.bring_up(&record, request, &state).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("Worker {} failed during setup: {}", record.name, e);
                self.mark_failed(&record.id);
                return Err(e);
            }
        };

        *self.verified_window.lock().await = Some(outcome.window_id.clone());
        match self.record_running(&record, &outcome) {
            Ok(running) => {
                info!("Worker {} is running", running.name);
                Ok(running)
            }
            Err(e) => {
                warn!("Could not record worker {} as running: {}", record.name, e);
                self.orchestrator
                    .close_session(&outcome.session_handle, Some(&outcome.agent_session))
                    .await;
                self.mark_failed(&record.id);
                Err(e)
            }
        }
    }

    fn record_running(&self, record: &WorkerRecord, outcome: &SessionOutcome) -> Result<WorkerRecord> {
        let running = self
            .registry
            .update_worker(&record.id, |w| {
                w.status = WorkerStatus::Running;
                w.session_handle = Some(outcome.session_handle.clone());
                w.agent_session_handle = Some(outcome.agent_session.clone());
            })?
            .ok_or_else(|| SquadError::NotFound(record.name.clone()))?;
        self.registry.set_shared_window(Some(outcome.window_id.clone()))?;
        Ok(running)
    }

    async fn bring_up(
        &self,
        record: &WorkerRecord,
        request: &SpawnRequest,
        state_before: &RegistryState,
    ) -> Result<SessionOutcome> {
        let prepared = self
            .setup
            .prepare(&WorkspacePlan {
                repo_url: record.repo_url.clone(),
                directory: record.directory.clone(),
                branch: record.branch.clone(),
                port: record.port,
                install: request.install,
                dev_server: request.dev_server,
            })
            .await?;

        let window = self.window_hint(state_before).await;
        let session_request = SessionRequest {
            window,
            worker_name: record.name.clone(),
            directory: record.directory.clone(),
            dev_command: prepared.dev_command,
            agent_command: request
                .agent_command
                .clone()
                .unwrap_or_else(|| self.config.agent_command.clone()),
            task: record.task.clone(),
        };

        match self.orchestrator.create_session(&session_request).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                self.adopt_marker_window().await;
                Err(e.into())
            }
        }
    }

    /// A session can fail after the shared window was already created. Keep
    /// that window so the next spawn reuses it instead of opening another.
    async fn adopt_marker_window(&self) {
        if self.verified_window.lock().await.is_some() {
            return;
        }
        match self.orchestrator.discover_shared_window().await {
            Ok(Some(id)) => {
                debug!("Keeping shared window {} after a failed session", id);
                *self.verified_window.lock().await = Some(id.clone());
                if let Err(e) = self.registry.set_shared_window(Some(id)) {
                    warn!("Could not save shared window: {}", e);
                }
            }
            Ok(None) => {}
            Err(e) => debug!("Window discovery after failure failed: {}", e),
        }
    }

    async fn window_hint(&self, state_before: &RegistryState) -> WindowHint {
        if let Some(id) = self.verified_window.lock().await.clone() {
            return WindowHint::Verified(id);
        }
        WindowHint::from_registry(
            !state_before.workers.is_empty(),
            state_before.shared_window_handle.clone(),
        )
    }

    fn mark_failed(&self, id: &str) {
        if let Err(e) = self.registry.update_worker(id, |w| w.status = WorkerStatus::Failed) {
            warn!("Could not mark worker {} as failed: {}", id, e);
        }
    }

    /// Spawns one worker per task, strictly in order. A failed task does not
    /// stop the ones after it.
    pub async fn spawn_batch(
        &self,
        template: &SpawnRequest,
        tasks: &[String],
    ) -> Vec<(String, Result<WorkerRecord>)> {
        let mut results = Vec::with_capacity(tasks.len());
        let mut template = template.clone();
        if tasks.len() > 1 && template.branch.take().is_some() {
            warn!("Ignoring --branch for a batch of {} tasks", tasks.len());
        }

        for task in tasks {
            let request = SpawnRequest {
                task: task.clone(),
                ..template.clone()
            };
            let result = self.spawn(&request).await;
            results.push((task.clone(), result));
        }
        results
    }

    pub async fn cleanup(&self, name_or_id: &str) -> Result<CleanupOutcome> {
        let record = self.get(name_or_id)?;
        info!("Cleaning up worker {}", record.name);

        if let Some(handle) = &record.session_handle {
            self.orchestrator
                .close_session(handle, record.agent_session_handle.as_deref())
                .await;
        }

        let directory_removed = match self.setup.remove(&record.directory).await {
            Ok(()) => true,
            Err(e) => {
                warn!("Could not remove {}: {}", record.directory.display(), e);
                false
            }
        };

        if self.registry.remove_worker(&record.id)?.is_none() {
            return Err(SquadError::NotFound(name_or_id.to_string()));
        }
        if self.registry.snapshot().workers.is_empty() {
            *self.verified_window.lock().await = None;
        }

        Ok(CleanupOutcome {
            record,
            directory_removed,
        })
    }

    /// Without `force` only reports what would be removed.
    pub async fn cleanup_all(&self, force: bool) -> Result<CleanupReport> {
        let workers = self.registry.list();
        let mut report = CleanupReport {
            dry_run: !force,
            workers: workers.iter().map(|w| w.name.clone()).collect(),
            ..CleanupReport::default()
        };
        if !force {
            return Ok(report);
        }

        for worker in &workers {
            match self.cleanup(&worker.id).await {
                Ok(outcome) => {
                    report.removed += 1;
                    if !outcome.directory_removed {
                        report.errors.push(format!(
                            "{}: directory {} was not removed",
                            worker.name,
                            worker.directory.display()
                        ));
                    }
                }
                Err(e) => report.errors.push(format!("{}: {}", worker.name, e)),
            }
        }

        if self.registry.snapshot().workers.is_empty() {
            self.registry.set_shared_window(None)?;
        }
        Ok(report)
    }

    pub async fn focus(&self, name_or_id: &str) -> Result<()> {
        let record = self.get(name_or_id)?;
        let handle = record
            .session_handle
            .ok_or_else(|| SquadError::NotFound(format!("session for {}", record.name)))?;

        if self.orchestrator.focus_session(&handle).await {
            Ok(())
        } else {
            Err(SquadError::NotFound(format!("session for {}", record.name)))
        }
    }

    /// Returns whether the text reached a live session.
    pub async fn send(&self, name_or_id: &str, text: &str) -> Result<bool> {
        let record = self.get(name_or_id)?;
        match record.session_handle {
            Some(handle) => Ok(self.orchestrator.send_text(&handle, text).await),
            None => Ok(false),
        }
    }

    /// External status updates, e.g. marking a worker `stopped`.
    pub fn set_status(&self, name_or_id: &str, status: WorkerStatus) -> Result<WorkerRecord> {
        self.registry
            .update_worker(name_or_id, |w| w.status = status)?
            .ok_or_else(|| SquadError::NotFound(name_or_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionTimings;
    use crate::registry::{MemoryStore, StateStore};
    use crate::terminal::TerminalControl;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use crate::test_helpers::mocks::{FakeSetup, RecordingTerminal, TerminalCall};
    use std::path::Path;

    struct Harness {
        manager: WorkerManager,
        registry: Registry,
        terminal: Arc<RecordingTerminal>,
        setup: Arc<FakeSetup>,
        _home: tempfile::TempDir,
    }

    fn harness_with(setup: FakeSetup, store: Arc<dyn StateStore>, terminal: Arc<RecordingTerminal>) -> Harness {
        let home = tempfile::tempdir().unwrap();
        let config = SquadConfig {
            home: home.path().to_path_buf(),
            timings: SessionTimings::immediate(),
            ..SquadConfig::default()
        };
        let registry = Registry::new(store);
        let setup = Arc::new(setup);
        let orchestrator = SessionOrchestrator::new(terminal.clone(), "squadron", SessionTimings::immediate());
        let manager = WorkerManager::new(config, registry.clone(), orchestrator, setup.clone());
        Harness {
            manager,
            registry,
            terminal,
            setup,
            _home: home,
        }
    }

    fn harness() -> Harness {
        harness_with(
            FakeSetup::new(),
            Arc::new(MemoryStore::new()),
            Arc::new(RecordingTerminal::new()),
        )
    }

    fn request(task: &str) -> SpawnRequest {
        SpawnRequest::new("https://github.com/acme/widgets.git", task)
    }

    #[tokio::test]
    async fn test_spawn_records_running_worker() {
        let h = harness();

        let worker = h.manager.spawn(&request("Add login page")).await.unwrap();

        assert_eq!(worker.status, WorkerStatus::Running);
        assert_eq!(worker.port, 3000);
        assert_eq!(worker.repo_name, "widgets");
        assert!(worker.branch.starts_with("feat/add-login-page-"));
        assert!(worker.branch.contains(&worker.name));
        assert!(worker.session_handle.is_some());
        assert!(worker.directory.ends_with(Path::new("workers").join(&worker.name)));

        let state = h.registry.snapshot();
        assert_eq!(state.next_port_offset, 1);
        assert!(state.shared_window_handle.is_some());
        assert_eq!(state.workers, vec![worker]);
    }

    #[tokio::test]
    async fn test_two_workers_share_one_window() {
        let h = harness();

        let a = h.manager.spawn(&request("task a")).await.unwrap();
        let hint_after_a = h.registry.shared_window();
        assert!(hint_after_a.is_some());

        let b = h.manager.spawn(&request("task b")).await.unwrap();

        assert_eq!(h.terminal.count(|c| *c == TerminalCall::CreateWindow), 1);
        assert_eq!(h.terminal.count(|c| *c == TerminalCall::ListSessions), 0);
        assert_eq!(h.registry.shared_window(), hint_after_a);
        assert_ne!(a.name, b.name);
        assert_eq!(b.port - a.port, 10);

        tokio_test::assert_ok!(h.manager.cleanup(&a.name).await);
        assert_eq!(h.registry.shared_window(), hint_after_a);

        h.manager.cleanup(&b.id).await.unwrap();
        assert_eq!(h.registry.shared_window(), None);
        assert!(h.registry.list().is_empty());
    }

    #[tokio::test]
    async fn test_new_process_rediscovers_window_from_hint() {
        let store = Arc::new(MemoryStore::new());
        let terminal = Arc::new(RecordingTerminal::new());

        let first = harness_with(FakeSetup::new(), store.clone(), terminal.clone());
        first.manager.spawn(&request("task a")).await.unwrap();

        // A second run shares the store and terminal but not the in-process window.
        let second = harness_with(FakeSetup::new(), store, terminal.clone());
        terminal.clear_calls();
        second.manager.spawn(&request("task b")).await.unwrap();

        assert_eq!(terminal.count(|c| *c == TerminalCall::ListSessions), 1);
        assert_eq!(terminal.count(|c| *c == TerminalCall::CreateWindow), 0);
    }

    #[tokio::test]
    async fn test_ports_are_spaced_by_increment() {
        let h = harness();
        let mut ports = Vec::new();
        for i in 0..4 {
            ports.push(h.manager.spawn(&request(&format!("task {}", i))).await.unwrap().port);
        }

        assert_eq!(ports, vec![3000, 3010, 3020, 3030]);
        assert_eq!(h.registry.snapshot().next_port_offset, 4);
    }

    #[tokio::test]
    async fn test_offset_never_decreases_after_cleanup() {
        let h = harness();
        let a = h.manager.spawn(&request("a")).await.unwrap();
        h.manager.spawn(&request("b")).await.unwrap();
        h.manager.cleanup(&a.name).await.unwrap();

        let c = h.manager.spawn(&request("c")).await.unwrap();

        assert_eq!(c.port, 3020);
        assert_eq!(h.registry.snapshot().next_port_offset, 3);
    }

    #[tokio::test]
    async fn test_preview_port_does_not_reserve() {
        let h = harness();
        assert_eq!(h.manager.preview_port().unwrap(), 3000);
        assert_eq!(h.manager.preview_port().unwrap(), 3000);
        h.manager.spawn(&request("a")).await.unwrap();
        assert_eq!(h.manager.preview_port().unwrap(), 3010);
    }

    #[tokio::test]
    async fn test_setup_failure_marks_worker_failed() {
        let setup = FakeSetup::new();
        setup.fail_prepare();
        let h = harness_with(setup, Arc::new(MemoryStore::new()), Arc::new(RecordingTerminal::new()));

        let result = h.manager.spawn(&request("doomed")).await;

        assert!(matches!(result, Err(SquadError::Setup { .. })));
        let workers = h.registry.list();
        assert_eq!(workers.len(), 1);
        assert_eq!(workers[0].status, WorkerStatus::Failed);
        assert!(workers[0].session_handle.is_none());
        assert!(h.terminal.calls().is_empty());
    }

    #[tokio::test]
    async fn test_session_failure_marks_worker_failed() {
        let terminal = Arc::new(RecordingTerminal::new());
        terminal.fail("create_window");
        let h = harness_with(FakeSetup::new(), Arc::new(MemoryStore::new()), terminal);

        let result = h.manager.spawn(&request("doomed")).await;

        assert!(matches!(result, Err(SquadError::Terminal(_))));
        assert_eq!(h.registry.list()[0].status, WorkerStatus::Failed);
        assert_eq!(h.registry.shared_window(), None);
    }

    #[tokio::test]
    async fn test_directory_on_disk_blocks_spawn() {
        let h = harness();
        let root = h.manager.config().workers_root();
        for adjective in identity::ADJECTIVES {
            for animal in identity::ANIMALS {
                std::fs::create_dir_all(root.join(format!("{}-{}", adjective, animal))).unwrap();
            }
        }

        let result = h.manager.spawn(&request("blocked")).await;

        assert!(matches!(result, Err(SquadError::DirectoryExists(_))));
        assert!(h.registry.list().is_empty());
        assert_eq!(h.registry.snapshot().next_port_offset, 0);
    }

    #[tokio::test]
    async fn test_spawn_uses_dev_command_and_agent_override() {
        let h = harness_with(
            FakeSetup::with_dev_command("PORT=3000 npm run dev"),
            Arc::new(MemoryStore::new()),
            Arc::new(RecordingTerminal::new()),
        );
        let mut req = request("Fix \"flaky\" test");
        req.agent_command = Some("claude --model opus".to_string());

        h.manager.spawn(&req).await.unwrap();

        let writes: Vec<String> = h
            .terminal
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                TerminalCall::WriteText(_, text) => Some(text),
                _ => None,
            })
            .collect();
        assert!(writes[0].ends_with("&& PORT=3000 npm run dev"));
        assert!(writes[1].ends_with("&& claude --model opus"));
        assert_eq!(writes[2], "Fix \"flaky\" test");
        assert_eq!(h.terminal.count(|c| matches!(c, TerminalCall::Split(_))), 1);

        let plan = &h.setup.prepared()[0];
        assert!(plan.install && plan.dev_server);
        assert_eq!(plan.port, 3000);
    }

    #[tokio::test]
    async fn test_spawn_batch_continues_after_failure() {
        let terminal = Arc::new(RecordingTerminal::new());
        let h = harness_with(FakeSetup::new(), Arc::new(MemoryStore::new()), terminal.clone());
        let tasks = vec!["one".to_string(), "two".to_string(), "three".to_string()];

        let mut template = request("");
        template.branch = Some("feat/shared".to_string());
        let results = h.manager.spawn_batch(&template, &tasks).await;

        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|(_, r)| r.is_ok()));
        let branches: HashSet<String> = h.registry.list().into_iter().map(|w| w.branch).collect();
        assert_eq!(branches.len(), 3);
        assert_eq!(terminal.count(|c| *c == TerminalCall::CreateWindow), 1);

        terminal.fail("create_tab");
        let results = h
            .manager
            .spawn_batch(&request(""), &["four".to_string(), "five".to_string()])
            .await;
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|(_, r)| r.is_err()));
        assert_eq!(h.registry.list().len(), 5);
    }

    #[tokio::test]
    async fn test_cleanup_unknown_worker_is_not_found() {
        let h = harness();
        h.manager.spawn(&request("a")).await.unwrap();
        let before = h.registry.snapshot();

        let err = h.manager.cleanup("ghost").await.unwrap_err();

        assert!(err.is_not_found());
        assert_eq!(h.registry.snapshot(), before);
    }

    #[tokio::test]
    async fn test_cleanup_closes_session_and_removes_directory() {
        let h = harness();
        let worker = h.manager.spawn(&request("a")).await.unwrap();
        let handle = worker.session_handle.clone().unwrap();
        assert!(worker.directory.exists());

        let outcome = h.manager.cleanup(&worker.name).await.unwrap();

        assert!(outcome.directory_removed);
        assert!(!worker.directory.exists());
        assert!(!h.terminal.has_session(&handle));
        assert!(h.terminal.calls().contains(&TerminalCall::Interrupt(handle)));
    }

    #[tokio::test]
    async fn test_cleanup_all_dry_run_changes_nothing() {
        let h = harness();
        for task in ["a", "b", "c"] {
            h.manager.spawn(&request(task)).await.unwrap();
        }
        let before = h.registry.snapshot();
        h.terminal.clear_calls();

        let report = h.manager.cleanup_all(false).await.unwrap();

        assert!(report.dry_run);
        let expected: Vec<String> = before.workers.iter().map(|w| w.name.clone()).collect();
        assert_eq!(report.workers, expected);
        assert_eq!(report.removed, 0);
        assert_eq!(h.registry.snapshot(), before);
        assert!(h.terminal.calls().is_empty());
    }

    #[tokio::test]
    async fn test_cleanup_all_force_survives_directory_failure() {
        let h = harness();
        let mut workers = Vec::new();
        for task in ["a", "b", "c"] {
            workers.push(h.manager.spawn(&request(task)).await.unwrap());
        }
        h.setup.fail_remove(&workers[1].directory);

        let report = h.manager.cleanup_all(true).await.unwrap();

        assert!(!report.dry_run);
        assert_eq!(report.removed, 3);
        assert_eq!(report.failed(), 1);
        assert!(report.errors[0].starts_with(&workers[1].name));
        assert!(h.registry.list().is_empty());
        assert_eq!(h.registry.shared_window(), None);
        assert!(!workers[0].directory.exists());
        assert!(workers[1].directory.exists());
        assert!(!workers[2].directory.exists());
    }

    #[tokio::test]
    async fn test_spawn_after_full_cleanup_makes_new_window() {
        let h = harness();
        let a = h.manager.spawn(&request("a")).await.unwrap();
        h.manager.cleanup(&a.name).await.unwrap();

        h.manager.spawn(&request("b")).await.unwrap();

        assert_eq!(h.terminal.count(|c| *c == TerminalCall::CreateWindow), 2);
    }

    #[tokio::test]
    async fn test_focus() {
        let h = harness();
        let worker = h.manager.spawn(&request("a")).await.unwrap();

        tokio_test::assert_ok!(h.manager.focus(&worker.name).await);
        assert!(h
            .terminal
            .calls()
            .contains(&TerminalCall::Select(worker.session_handle.clone().unwrap())));

        assert!(h.manager.focus("ghost").await.unwrap_err().is_not_found());

        h.terminal.close_window(&h.registry.shared_window().unwrap());
        assert!(h.manager.focus(&worker.id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_focus_without_handle_is_not_found() {
        let setup = FakeSetup::new();
        setup.fail_prepare();
        let h = harness_with(setup, Arc::new(MemoryStore::new()), Arc::new(RecordingTerminal::new()));
        let _ = h.manager.spawn(&request("a")).await;
        let name = h.registry.list()[0].name.clone();

        assert!(h.manager.focus(&name).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_send_and_set_status() {
        let h = harness();
        let worker = h.manager.spawn(&request("a")).await.unwrap();

        assert!(h.manager.send(&worker.name, "also add tests").await.unwrap());
        let updated = h.manager.set_status(&worker.name, WorkerStatus::Stopped).unwrap();
        assert_eq!(updated.status, WorkerStatus::Stopped);

        h.terminal.close_window(&h.registry.shared_window().unwrap());
        assert!(!h.manager.send(&worker.name, "anyone there?").await.unwrap());
        assert!(h.manager.set_status("ghost", WorkerStatus::Stopped).unwrap_err().is_not_found());
    }

    /// Memory store whose `n`th save (1-based) fails.
    struct FailingSaveStore {
        inner: MemoryStore,
        saves: AtomicUsize,
        fail_on: usize,
    }

    impl FailingSaveStore {
        fn new(fail_on: usize) -> Self {
            Self {
                inner: MemoryStore::new(),
                saves: AtomicUsize::new(0),
                fail_on,
            }
        }
    }

    impl StateStore for FailingSaveStore {
        fn load(&self) -> RegistryState {
            self.inner.load()
        }

        fn save(&self, state: &RegistryState) -> Result<()> {
            if self.saves.fetch_add(1, Ordering::SeqCst) + 1 == self.fail_on {
                return Err(SquadError::Io(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "disk full",
                )));
            }
            self.inner.save(state)
        }
    }

    #[tokio::test]
    async fn test_window_from_failed_session_is_reused() {
        let terminal = Arc::new(RecordingTerminal::new());
        let h = harness_with(FakeSetup::new(), Arc::new(MemoryStore::new()), terminal.clone());

        terminal.fail("create_tab");
        assert!(h.manager.spawn(&request("a")).await.is_err());

        // The failed worker is still registered, so the hint must be too.
        assert_eq!(h.registry.list()[0].status, WorkerStatus::Failed);
        assert!(h.registry.shared_window().is_some());

        terminal.unfail("create_tab");
        h.manager.spawn(&request("b")).await.unwrap();

        assert_eq!(terminal.count(|c| *c == TerminalCall::CreateWindow), 1);
        let markers = terminal
            .session_names()
            .into_iter()
            .filter(|name| name == "squadron")
            .count();
        assert_eq!(markers, 1);
    }

    #[tokio::test]
    async fn test_new_process_finds_marker_without_cached_hint() {
        let terminal = Arc::new(RecordingTerminal::new());
        let window = terminal.create_window().await.unwrap();
        terminal.set_name(&window.session_id, "squadron").await.unwrap();

        let failed = WorkerRecord {
            id: "id-1".to_string(),
            name: "calm-heron".to_string(),
            repo_url: "https://github.com/acme/widgets.git".to_string(),
            repo_name: "widgets".to_string(),
            branch: "feat/a-calm-heron-20260101".to_string(),
            task: "a".to_string(),
            directory: std::path::PathBuf::from("/tmp/elsewhere/calm-heron"),
            port: 3000,
            session_handle: None,
            agent_session_handle: None,
            created_at: "2026-01-01T00:00:00+00:00".to_string(),
            status: WorkerStatus::Failed,
        };
        let store = Arc::new(MemoryStore::with_state(RegistryState {
            workers: vec![failed],
            next_port_offset: 1,
            shared_window_handle: None,
        }));
        let h = harness_with(FakeSetup::new(), store, terminal.clone());
        terminal.clear_calls();

        h.manager.spawn(&request("b")).await.unwrap();

        assert_eq!(terminal.count(|c| *c == TerminalCall::ListSessions), 1);
        assert_eq!(terminal.count(|c| *c == TerminalCall::CreateWindow), 0);
        assert_eq!(h.registry.shared_window(), Some(window.window_id));
    }

    #[tokio::test]
    async fn test_spawn_fails_when_ports_run_out() {
        let store = Arc::new(MemoryStore::with_state(RegistryState {
            next_port_offset: 6254,
            ..RegistryState::default()
        }));
        let h = harness_with(FakeSetup::new(), store, Arc::new(RecordingTerminal::new()));

        let err = h.manager.spawn(&request("a")).await.unwrap_err();

        assert!(matches!(err, SquadError::PortsExhausted { offset: 6254 }));
        assert!(h.registry.list().is_empty());
        assert!(h.terminal.calls().is_empty());
        assert!(h.manager.preview_port().is_err());
    }

    #[tokio::test]
    async fn test_unsaved_running_state_closes_session_and_fails() {
        // Save 1 registers the worker, save 2 would record it as running.
        let store = Arc::new(FailingSaveStore::new(2));
        let h = harness_with(FakeSetup::new(), store, Arc::new(RecordingTerminal::new()));

        let err = h.manager.spawn(&request("a")).await.unwrap_err();

        assert!(matches!(err, SquadError::Io(_)));
        let worker = &h.registry.list()[0];
        assert_eq!(worker.status, WorkerStatus::Failed);
        assert!(worker.session_handle.is_none());
        assert_eq!(h.terminal.count(|c| matches!(c, TerminalCall::CloseTab(_))), 1);
        assert_eq!(h.terminal.session_names(), vec!["squadron".to_string()]);
    }

    #[tokio::test]
    async fn test_cleanup_interrupts_dev_server_and_agent() {
        let h = harness_with(
            FakeSetup::with_dev_command("PORT=3000 npm run dev"),
            Arc::new(MemoryStore::new()),
            Arc::new(RecordingTerminal::new()),
        );
        let worker = h.manager.spawn(&request("a")).await.unwrap();
        let primary = worker.session_handle.clone().unwrap();
        let agent = worker.agent_session_handle.clone().unwrap();
        assert_ne!(primary, agent);
        h.terminal.clear_calls();

        h.manager.cleanup(&worker.name).await.unwrap();

        let calls = h.terminal.calls();
        assert!(calls.contains(&TerminalCall::Interrupt(agent.clone())));
        assert!(calls.contains(&TerminalCall::Interrupt(primary.clone())));
        assert!(!h.terminal.has_session(&agent));
    }
}

//! Mode/Subject controller — the single-task actor that owns the panel's
//! view state.
//!
//! All mutation flows through one task: inbound commands, enrichment
//! results, resource-watch events, and the coalescer timer are multiplexed
//! by one select loop, so `Context` has no concurrent writers and at most
//! one state push is ever in flight. Requests that arrive while a push is
//! outstanding queue on the command channel instead of interleaving.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use prism_core::commands::{
    DraftKind, FileActionKind, NavDirection, PanelCommand, RepoActionKind,
};
use prism_core::context::{Context, DerivedFields, PanelMode};
use prism_core::delta::{ContextDelta, NavigationDelta};
use prism_core::errors::ProviderError;
use prism_core::ids::ResourceId;
use prism_core::notify::{Notification, Transport};
use prism_core::providers::{
    ActionDelegate, EnrichmentProvider, PreferenceStore, ResourceWatcher, SubjectProvider,
    WatchEvent,
};
use prism_core::subject::{Subject, SubjectRef};

use crate::coalescer::{DispatchCoalescer, DEFAULT_WINDOW};
use crate::enrich;
use crate::error::EngineError;
use crate::history::{NavigationHistory, DEFAULT_CAPACITY};
use crate::merge;
use crate::subscriptions::{Axis, SubscriptionSet};

#[derive(Clone, Debug)]
pub struct PanelConfig {
    /// Trailing-edge window for coalesced state pushes.
    pub debounce_window: Duration,
    /// Delay before an enrichment run starts, so rapid subject changes
    /// supersede it before any provider work happens.
    pub enrich_delay: Duration,
    pub history_capacity: usize,
    /// Debounce hint passed to the resource watcher.
    pub watch_debounce: Duration,
    pub command_buffer: usize,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            debounce_window: DEFAULT_WINDOW,
            enrich_delay: enrich::DEFAULT_START_DELAY,
            history_capacity: DEFAULT_CAPACITY,
            watch_debounce: Duration::from_millis(500),
            command_buffer: 64,
        }
    }
}

/// The external collaborators the controller runs against.
#[derive(Clone)]
pub struct PanelDeps {
    pub subjects: Arc<dyn SubjectProvider>,
    pub enrichment: Arc<dyn EnrichmentProvider>,
    pub transport: Arc<dyn Transport>,
    pub watcher: Arc<dyn ResourceWatcher>,
    pub actions: Arc<dyn ActionDelegate>,
    pub prefs: Arc<dyn PreferenceStore>,
}

/// Cheap cloneable handle for feeding commands into the controller task.
#[derive(Clone)]
pub struct PanelHandle {
    tx: mpsc::Sender<PanelCommand>,
}

impl PanelHandle {
    pub async fn send(&self, command: PanelCommand) -> Result<(), EngineError> {
        self.tx
            .send(command)
            .await
            .map_err(|_| EngineError::ControllerStopped)
    }
}

enum Internal {
    EnrichmentReady {
        generation: u64,
        derived: DerivedFields,
    },
}

enum Wake {
    Command(Option<PanelCommand>),
    Internal(Internal),
    Watch(WatchEvent),
    Timer,
}

pub struct PanelController {
    config: PanelConfig,
    deps: PanelDeps,
    context: Context,
    pending: Option<ContextDelta>,
    history: NavigationHistory<SubjectRef>,
    subscriptions: SubscriptionSet,
    coalescer: DispatchCoalescer,
    enrich_generation: u64,
    enrich_cancel: CancellationToken,
    commands: mpsc::Receiver<PanelCommand>,
    internal_tx: mpsc::Sender<Internal>,
    internal_rx: mpsc::Receiver<Internal>,
    watch_tx: mpsc::Sender<WatchEvent>,
    watch_rx: mpsc::Receiver<WatchEvent>,
}

impl PanelController {
    /// Build the controller and run it on its own task.
    pub fn spawn(config: PanelConfig, deps: PanelDeps) -> (PanelHandle, JoinHandle<()>) {
        let (tx, commands) = mpsc::channel(config.command_buffer);
        let (internal_tx, internal_rx) = mpsc::channel(32);
        let (watch_tx, watch_rx) = mpsc::channel(32);

        let mut context = Context::default();
        match deps.prefs.load_all() {
            Ok(prefs) => context.preferences = prefs,
            Err(e) => tracing::warn!(error = %e, "failed to load preferences"),
        }

        let controller = Self {
            history: NavigationHistory::new(config.history_capacity),
            coalescer: DispatchCoalescer::new(config.debounce_window),
            config,
            deps,
            context,
            pending: None,
            subscriptions: SubscriptionSet::new(),
            enrich_generation: 0,
            enrich_cancel: CancellationToken::new(),
            commands,
            internal_tx,
            internal_rx,
            watch_tx,
            watch_rx,
        };
        let join = tokio::spawn(controller.run());
        (PanelHandle { tx }, join)
    }

    async fn run(mut self) {
        loop {
            let deadline = self.coalescer.deadline();
            let timer = async move {
                match deadline {
                    Some(at) => tokio::time::sleep_until(at).await,
                    None => std::future::pending().await,
                }
            };
            let wake = tokio::select! {
                command = self.commands.recv() => Wake::Command(command),
                Some(internal) = self.internal_rx.recv() => Wake::Internal(internal),
                Some(event) = self.watch_rx.recv() => Wake::Watch(event),
                _ = timer => Wake::Timer,
            };
            match wake {
                Wake::Command(Some(command)) => self.handle_command(command).await,
                Wake::Command(None) => break,
                Wake::Internal(internal) => self.handle_internal(internal).await,
                Wake::Watch(event) => self.handle_watch(event).await,
                Wake::Timer => {
                    self.commit_and_notify(false).await;
                }
            }
        }
        self.subscriptions.dispose_all();
        self.enrich_cancel.cancel();
        tracing::debug!("panel controller stopped");
    }

    async fn handle_command(&mut self, command: PanelCommand) {
        tracing::debug!(command = command.command_type(), "panel command");
        match command {
            PanelCommand::SelectSubject { subject, force } => {
                match self.deps.subjects.resolve(&subject).await {
                    Ok(Some(subject)) => self.select_subject(subject, force, false).await,
                    Ok(None) => tracing::warn!("selected subject did not resolve"),
                    Err(e) => tracing::warn!(error = %e, "subject resolution failed"),
                }
            }
            PanelCommand::SwitchMode { mode, resource } => self.switch_mode(mode, resource).await,
            PanelCommand::Navigate { direction } => self.navigate(direction).await,
            PanelCommand::SetPinned { pinned } => self.set_pinned(pinned).await,
            PanelCommand::Refresh { force } => self.refresh(force).await,
            PanelCommand::UpdatePreference { key, value } => {
                self.update_preference(key, value).await
            }
            PanelCommand::RequestEnrichment { force } => self.request_enrichment(force).await,
            PanelCommand::FileAction { action, path } => self.file_action(action, &path).await,
            PanelCommand::RepoAction { action } => self.repo_action(action).await,
            PanelCommand::CreateDraft { kind, title, body } => {
                self.create_draft(kind, title.as_deref(), &body).await
            }
        }
    }

    async fn handle_internal(&mut self, internal: Internal) {
        match internal {
            Internal::EnrichmentReady {
                generation,
                derived,
            } => {
                if generation != self.enrich_generation {
                    tracing::debug!(generation, "dropping superseded enrichment result");
                    return;
                }
                let changed = self.apply(
                    ContextDelta {
                        rich_data_loaded: Some(true),
                        derived: Some(derived),
                        ..Default::default()
                    },
                    false,
                );
                if changed {
                    self.request_dispatch(false).await;
                }
            }
        }
    }

    async fn handle_watch(&mut self, event: WatchEvent) {
        tracing::debug!(resource = %event.resource, "watched resource changed");
        self.refresh(false).await;
    }

    /// Commit a new focused subject.
    ///
    /// Identity-equal immutable re-selections are no-ops unless forced; live
    /// references always recommit because their content is a moving target
    /// (the merge engine still drops the write when nothing changed).
    async fn select_subject(&mut self, subject: Subject, force: bool, skip_history: bool) {
        let effective = merge::effective(&self.context, self.pending.as_ref());
        // items compare by identity; live references by full content, since
        // the same reference can resolve to new state
        let unchanged = effective.mode == PanelMode::Focused
            && effective.subject.as_ref().map_or(false, |current| {
                if subject.id.is_item() {
                    current.id == subject.id
                } else {
                    *current == subject
                }
            });
        if unchanged && !force {
            return;
        }

        self.supersede_enrichment();

        // the focused-subject watch only exists for live references
        let resource = subject.id.resource().cloned();
        self.rebind_axis(Axis::FocusedSubject, resource.as_ref());

        if !skip_history {
            if let SubjectRef::Item { .. } = subject.id {
                self.history.add(subject.id.clone());
            }
        }

        let hint = match &subject.id {
            SubjectRef::Item { token } => Some(token.short().to_string()),
            SubjectRef::Live { .. } => None,
        };
        self.apply(
            ContextDelta {
                mode: Some(PanelMode::Focused),
                subject: Some(Some(subject.clone())),
                rich_data_loaded: Some(false),
                derived: Some(DerivedFields::default()),
                navigation: Some(NavigationDelta {
                    count: Some(self.history.len()),
                    position: Some(self.history.position()),
                    hint: Some(hint),
                }),
                ..Default::default()
            },
            force,
        );

        self.schedule_enrichment(subject);
        self.request_dispatch(true).await;
    }

    async fn switch_mode(&mut self, mode: PanelMode, resource: Option<ResourceId>) {
        self.apply(
            ContextDelta {
                mode: Some(mode),
                ..Default::default()
            },
            false,
        );
        match mode {
            PanelMode::LiveStatus => {
                self.refresh_live_status(resource).await;
                if self.pending.is_some() {
                    self.request_dispatch(false).await;
                }
            }
            PanelMode::Focused => {
                self.subscriptions.dispose(Axis::LiveStatus);
                self.commit_and_notify(true).await;
            }
        }
    }

    /// Re-resolve the best subject (or status) for the current mode.
    /// Ambient refreshes are suppressed while pinned; explicit ones are not.
    async fn refresh(&mut self, force: bool) {
        let effective = merge::effective(&self.context, self.pending.as_ref());
        if effective.pinned && !force {
            tracing::debug!("refresh suppressed while pinned");
            return;
        }
        match effective.mode {
            PanelMode::Focused => match self.deps.subjects.best_subject().await {
                Ok(Some(subject)) => self.select_subject(subject, force, false).await,
                Ok(None) => tracing::debug!("no best subject to refresh to"),
                Err(e) => tracing::warn!(error = %e, "best-subject resolution failed"),
            },
            PanelMode::LiveStatus => self.refresh_live_status(None).await,
        }
    }

    async fn refresh_live_status(&mut self, hint: Option<ResourceId>) {
        let resource = hint.or_else(|| self.deps.subjects.best_resource());
        let status = match self.deps.subjects.live_status(resource.as_ref()).await {
            Ok(status) => status,
            Err(e) => {
                tracing::warn!(error = %e, "live-status snapshot failed");
                None
            }
        };
        self.rebind_axis(Axis::LiveStatus, resource.as_ref());
        let changed = self.apply(
            ContextDelta {
                live_status: Some(status),
                ..Default::default()
            },
            false,
        );
        if changed {
            self.request_dispatch(false).await;
            self.notify_narrow(Notification::LiveStatusChanged).await;
        }
    }

    async fn navigate(&mut self, direction: NavDirection) {
        let Some(entry) = self.history.navigate(direction) else {
            return;
        };
        let entry = entry.clone();
        match self.deps.subjects.resolve(&entry).await {
            Ok(Some(subject)) => self.select_subject(subject, false, true).await,
            Ok(None) => tracing::warn!("navigation target no longer resolves"),
            Err(e) => tracing::warn!(error = %e, "navigation target lookup failed"),
        }
    }

    async fn set_pinned(&mut self, pinned: bool) {
        let changed = self.apply(
            ContextDelta {
                pinned: Some(pinned),
                ..Default::default()
            },
            false,
        );
        if changed {
            self.request_dispatch(false).await;
        }
    }

    async fn update_preference(&mut self, key: String, value: Value) {
        // fire-and-forget persistence: a failed write never blocks the view
        if let Err(e) = self.deps.prefs.set(&key, &value) {
            tracing::warn!(error = %e, key, "preference write failed");
        }
        let mut prefs = Map::new();
        prefs.insert(key, value);
        let changed = self.apply(
            ContextDelta {
                preferences: Some(prefs),
                ..Default::default()
            },
            false,
        );
        if changed {
            self.request_dispatch(false).await;
        }
    }

    async fn request_enrichment(&mut self, force: bool) {
        let effective = merge::effective(&self.context, self.pending.as_ref());
        let Some(subject) = effective.subject else {
            return;
        };
        if effective.rich_data_loaded && !force {
            return;
        }
        self.supersede_enrichment();
        self.schedule_enrichment(subject);
    }

    async fn file_action(&mut self, action: FileActionKind, path: &str) {
        if let Err(e) = self.deps.actions.file_action(action, path).await {
            self.surface_action_failure("file_action", e).await;
        }
    }

    async fn repo_action(&mut self, action: RepoActionKind) {
        if let Err(e) = self.deps.actions.repo_action(action).await {
            self.surface_action_failure("repo_action", e).await;
        }
    }

    async fn create_draft(&mut self, kind: DraftKind, title: Option<&str>, body: &str) {
        match self.deps.actions.create_draft(kind, title, body).await {
            Ok(url) => {
                self.notify_narrow(Notification::DraftCreated { kind, url })
                    .await
            }
            Err(e) => self.surface_action_failure("create_draft", e).await,
        }
    }

    async fn surface_action_failure(&mut self, action: &str, error: ProviderError) {
        tracing::warn!(error = %error, action, "side action failed");
        self.notify_narrow(Notification::ActionFailed {
            action: action.to_string(),
            reason: error.to_string(),
        })
        .await;
    }

    fn supersede_enrichment(&mut self) {
        self.enrich_cancel.cancel();
        self.enrich_cancel = CancellationToken::new();
        self.enrich_generation += 1;
    }

    fn schedule_enrichment(&mut self, subject: Subject) {
        let cancel = self.enrich_cancel.clone();
        let generation = self.enrich_generation;
        let provider = Arc::clone(&self.deps.enrichment);
        let tx = self.internal_tx.clone();
        let delay = self.config.enrich_delay;
        tokio::spawn(async move {
            if let Some(derived) = enrich::run(provider, subject, cancel, delay).await {
                let _ = tx
                    .send(Internal::EnrichmentReady {
                        generation,
                        derived,
                    })
                    .await;
            }
        });
    }

    fn rebind_axis(&mut self, axis: Axis, owner: Option<&ResourceId>) {
        let watcher = Arc::clone(&self.deps.watcher);
        let events = self.watch_tx.clone();
        let debounce = self.config.watch_debounce;
        self.subscriptions
            .rebind(axis, owner, move |resource| {
                watcher.watch(resource, debounce, events)
            });
    }

    fn apply(&mut self, delta: ContextDelta, force: bool) -> bool {
        let (changed, pending) =
            merge::apply_delta(&self.context, self.pending.take(), delta, force);
        self.pending = pending;
        changed
    }

    async fn request_dispatch(&mut self, immediate: bool) {
        if immediate {
            self.commit_and_notify(false).await;
        } else {
            self.coalescer.arm();
        }
    }

    /// Fold the pending delta into the committed context and push the
    /// snapshot. Returns false for a no-op (nothing pending, not forced).
    /// A transport failure is logged and swallowed; the fold stands either
    /// way, since the committed context is the source of truth.
    async fn commit_and_notify(&mut self, force: bool) -> bool {
        self.coalescer.cancel();
        if self.pending.is_none() && !force {
            return false;
        }
        if let Some(delta) = self.pending.take() {
            merge::fold(&mut self.context, delta);
        }
        let snapshot = self.context.clone();
        if let Err(e) = self
            .deps
            .transport
            .notify(Notification::DidChangeState { context: snapshot })
            .await
        {
            tracing::warn!(error = %e, "state push failed");
        }
        true
    }

    async fn notify_narrow(&mut self, notification: Notification) {
        if let Err(e) = self.deps.transport.notify(notification).await {
            tracing::warn!(error = %e, "notification failed");
        }
    }
}

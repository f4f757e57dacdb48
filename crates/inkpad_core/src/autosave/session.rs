//! Async driver that runs an autosave engine on a tokio task.
//!
//! # Responsibility
//! - Hydrate once on attach and fail the attach when the load fails.
//! - Serialize mutation signals, debounce timer and gateway completions into
//!   one event loop that owns the engine.
//! - Publish save status to read-only subscribers.
//!
//! # Invariants
//! - Only the loop task touches the engine; all transitions run on it.
//! - Gateway calls run on their own task and are never cancelled; results
//!   from a replaced identity are discarded by the engine.
//! - Persist failures never leave the loop; they only change the status.

use crate::autosave::config::AutosaveConfig;
use crate::autosave::engine::{AutosaveEngine, SaveAttempt};
use crate::autosave::gateway::{HydrationError, HydrationSource, PersistError, PersistenceGateway};
use crate::autosave::scheduler::Resolution;
use crate::autosave::status::SaveStatus;
use crate::model::document::DocumentId;
use crate::model::live::{LiveModel, SharedModel};
use log::{debug, error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};

/// Errors returned to the caller that owns a session.
#[derive(Debug)]
pub enum SessionError {
    /// Initial or switch-time load failed; the document must not be edited.
    Hydration(HydrationError),
    /// The session loop is gone.
    Closed,
}

impl Display for SessionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Hydration(err) => write!(f, "{err}"),
            Self::Closed => write!(f, "autosave session is closed"),
        }
    }
}

impl Error for SessionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Hydration(err) => Some(err),
            Self::Closed => None,
        }
    }
}

impl From<HydrationError> for SessionError {
    fn from(value: HydrationError) -> Self {
        Self::Hydration(value)
    }
}

enum SessionCommand {
    Mutated,
    Retry,
    Switch {
        document_id: DocumentId,
        config: AutosaveConfig,
        reply: oneshot::Sender<Result<(), HydrationError>>,
    },
    Detach {
        reply: oneshot::Sender<()>,
    },
}

struct Completion {
    attempt: SaveAttempt,
    result: Result<(), PersistError>,
    elapsed: Duration,
}

/// Handle to a running autosave loop for one editor instance.
pub struct AutosaveSession<M> {
    model: SharedModel<M>,
    commands: mpsc::UnboundedSender<SessionCommand>,
    status: watch::Receiver<SaveStatus>,
    task: JoinHandle<()>,
}

impl<M> AutosaveSession<M>
where
    M: LiveModel + Send + Sync + 'static,
{
    /// Loads `document_id`, hydrates `model` and starts the loop.
    ///
    /// # Errors
    /// - Returns `SessionError::Hydration` when the source fails; no loop is started.
    pub async fn attach(
        config: AutosaveConfig,
        document_id: DocumentId,
        model: SharedModel<M>,
        gateway: Arc<dyn PersistenceGateway>,
        source: Arc<dyn HydrationSource>,
    ) -> Result<Self, SessionError> {
        let started_at = Instant::now();
        let loaded = match source.load(document_id).await {
            Ok(loaded) => loaded,
            Err(err) => {
                error!(
                    "event=autosave_attach module=autosave status=error document_id={} duration_ms={} error={}",
                    document_id,
                    started_at.elapsed().as_millis(),
                    err
                );
                return Err(err.into());
            }
        };

        let mut engine = AutosaveEngine::new(config);
        engine.hydrate(document_id, loaded.as_ref(), &mut *model.write());
        info!(
            "event=autosave_attach module=autosave status=ok document_id={} duration_ms={}",
            document_id,
            started_at.elapsed().as_millis()
        );

        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = watch::channel(engine.status());

        let driver = SessionLoop {
            engine,
            model: model.clone(),
            gateway,
            source,
            commands: commands_rx,
            completions: completions_rx,
            completions_tx,
            status: status_tx,
        };
        let task = tokio::spawn(driver.run());

        Ok(Self {
            model,
            commands: commands_tx,
            status: status_rx,
            task,
        })
    }

    /// Live model shared with the UI layer.
    pub fn model(&self) -> &SharedModel<M> {
        &self.model
    }

    /// Signals that the live model changed.
    pub fn notify_mutation(&self) -> Result<(), SessionError> {
        self.send(SessionCommand::Mutated)
    }

    /// Applies one edit to the live model and signals the mutation.
    pub fn edit<R>(&self, f: impl FnOnce(&mut M) -> R) -> Result<R, SessionError> {
        let result = self.model.edit(f);
        self.notify_mutation()?;
        Ok(result)
    }

    /// Requests an immediate save of anything still unsaved.
    pub fn retry(&self) -> Result<(), SessionError> {
        self.send(SessionCommand::Retry)
    }

    /// Current save status.
    pub fn status(&self) -> SaveStatus {
        *self.status.borrow()
    }

    /// Read-only status subscription for the UI.
    pub fn subscribe(&self) -> watch::Receiver<SaveStatus> {
        self.status.clone()
    }

    /// Switches the session to another document and hydrates it.
    ///
    /// The pending timer is cancelled immediately. A save still in flight for
    /// the previous document completes but its result is ignored.
    pub async fn switch_document(
        &self,
        document_id: DocumentId,
        config: AutosaveConfig,
    ) -> Result<(), SessionError> {
        let (reply, response) = oneshot::channel();
        self.send(SessionCommand::Switch {
            document_id,
            config,
            reply,
        })?;
        response.await.map_err(|_| SessionError::Closed)??;
        Ok(())
    }

    /// Stops the loop and drops all engine state.
    pub async fn detach(self) -> Result<(), SessionError> {
        let (reply, response) = oneshot::channel();
        self.send(SessionCommand::Detach { reply })?;
        response.await.map_err(|_| SessionError::Closed)?;
        self.task.await.map_err(|_| SessionError::Closed)
    }

    fn send(&self, command: SessionCommand) -> Result<(), SessionError> {
        self.commands.send(command).map_err(|_| SessionError::Closed)
    }
}

struct SessionLoop<M> {
    engine: AutosaveEngine,
    model: SharedModel<M>,
    gateway: Arc<dyn PersistenceGateway>,
    source: Arc<dyn HydrationSource>,
    commands: mpsc::UnboundedReceiver<SessionCommand>,
    completions: mpsc::UnboundedReceiver<Completion>,
    completions_tx: mpsc::UnboundedSender<Completion>,
    status: watch::Sender<SaveStatus>,
}

impl<M> SessionLoop<M>
where
    M: LiveModel + Send + Sync + 'static,
{
    async fn run(mut self) {
        loop {
            let deadline = self.engine.deadline();
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(SessionCommand::Mutated) => {
                        let now = Instant::now();
                        self.engine.on_mutation(&*self.model.read(), now);
                    }
                    Some(SessionCommand::Retry) => {
                        let now = Instant::now();
                        self.engine.retry(&*self.model.read(), now);
                    }
                    Some(SessionCommand::Switch { document_id, config, reply }) => {
                        let result = self.switch(document_id, config).await;
                        let _ = reply.send(result);
                    }
                    Some(SessionCommand::Detach { reply }) => {
                        self.engine.detach();
                        self.publish_status();
                        let _ = reply.send(());
                        break;
                    }
                    None => {
                        self.engine.detach();
                        break;
                    }
                },
                Some(completion) = self.completions.recv() => {
                    self.resolve(completion);
                }
                () = wait_until(deadline) => {
                    self.fire();
                }
            }
            self.publish_status();
        }
    }

    fn fire(&mut self) {
        let now = Instant::now();
        let attempt = self.engine.on_timer(&*self.model.read(), now);
        let Some(attempt) = attempt else {
            return;
        };

        let gateway = Arc::clone(&self.gateway);
        let completions = self.completions_tx.clone();
        tokio::spawn(async move {
            let started_at = Instant::now();
            let document_id = attempt.document_id;
            let title = attempt.title().to_string();
            let content = attempt.content().clone();
            // Inner task isolates gateway panics so the loop always sees a result.
            let call = tokio::spawn(async move { gateway.save(document_id, &title, &content).await });
            let result = match call.await {
                Ok(result) => result,
                Err(err) => Err(PersistError::Interrupted(err.to_string())),
            };
            let _ = completions.send(Completion {
                attempt,
                result,
                elapsed: started_at.elapsed(),
            });
        });
    }

    fn resolve(&mut self, completion: Completion) {
        let Completion {
            attempt,
            result,
            elapsed,
        } = completion;
        let now = Instant::now();
        let resolution =
            self.engine
                .on_save_resolved(&attempt, result, &*self.model.read(), now);
        match resolution {
            Resolution::Saved | Resolution::SavedAndRearmed { .. } => debug!(
                "event=autosave_save module=autosave status=ok document_id={} attempt={} duration_ms={}",
                attempt.document_id,
                attempt.sequence,
                elapsed.as_millis()
            ),
            Resolution::Failed => warn!(
                "event=autosave_save module=autosave status=error document_id={} attempt={} duration_ms={}",
                attempt.document_id,
                attempt.sequence,
                elapsed.as_millis()
            ),
            Resolution::Stale => {}
        }
    }

    async fn switch(
        &mut self,
        document_id: DocumentId,
        config: AutosaveConfig,
    ) -> Result<(), HydrationError> {
        if self.engine.document_id() == Some(document_id)
            && self.engine.is_hydrated()
            && self.engine.config() == &config
        {
            return Ok(());
        }

        self.engine.attach_with(document_id, config);
        self.publish_status();

        let loaded = match self.source.load(document_id).await {
            Ok(loaded) => loaded,
            Err(err) => {
                error!(
                    "event=autosave_switch module=autosave status=error document_id={} error={}",
                    document_id, err
                );
                return Err(err);
            }
        };
        self.engine
            .hydrate(document_id, loaded.as_ref(), &mut *self.model.write());
        Ok(())
    }

    fn publish_status(&self) {
        let next = self.engine.status();
        self.status.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            debug!(
                "event=autosave_status module=autosave from={:?} to={:?}",
                current, next
            );
            *current = next;
            true
        });
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending::<()>().await,
    }
}

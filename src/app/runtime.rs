//! Effect execution and the single-threaded update loop.
//!
//! Effects run as detached tasks and report back through the message
//! channel. Teardown cancels the shared token and detaches from the
//! control plane; results of effects still in flight are discarded.

use anyhow::Result;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError};
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::commands::{CommandGateway, DispatchOutcome};
use super::dashboard::{App, Effect, LifecycleOp, Message};
use crate::control_plane::{
    ControlPlane, ControlPlaneError, ControlPlaneEvent, ListQuery, Unsubscribe,
};

/// Draws or reports the state after each processed message.
pub trait Frontend {
    fn render(&mut self, app: &mut App) -> Result<()>;
}

/// Keeps list snapshots in request order. Reloads run concurrently, so a
/// slow older listing must not overwrite a newer one already applied.
#[derive(Default)]
struct ReloadGate {
    issued: AtomicU64,
    delivered: std::sync::Mutex<u64>,
}

impl ReloadGate {
    fn issue(&self) -> u64 {
        self.issued.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Sends `message` unless a newer ticket was already delivered.
    fn deliver(&self, ticket: u64, tx: &mpsc::UnboundedSender<Message>, message: Message) -> bool {
        let mut delivered = self.delivered.lock().unwrap_or_else(PoisonError::into_inner);
        if ticket < *delivered {
            debug!(ticket, latest = *delivered, "discarding stale list snapshot");
            return false;
        }
        *delivered = ticket;
        tx.send(message).is_ok()
    }
}

#[derive(Clone)]
pub struct EffectRunner {
    plane: Arc<dyn ControlPlane>,
    gateway: CommandGateway,
    events: Arc<Mutex<mpsc::UnboundedReceiver<ControlPlaneEvent>>>,
    reloads: Arc<ReloadGate>,
    tx: mpsc::UnboundedSender<Message>,
    cancel: CancellationToken,
}

impl EffectRunner {
    pub fn run(&self, effect: Effect) {
        match effect {
            Effect::AwaitEvent => self.await_event(),
            Effect::ReloadList => {
                let ticket = self.reloads.issue();
                let plane = self.plane.clone();
                let reloads = self.reloads.clone();
                let tx = self.tx.clone();
                let cancel = self.cancel.clone();
                tokio::spawn(async move {
                    let result = plane.list(&ListQuery::default()).await;
                    if !cancel.is_cancelled() {
                        reloads.deliver(ticket, &tx, Message::ListLoaded(result));
                    }
                });
            }
            Effect::Lifecycle { op, workflow_id } => {
                let plane = self.plane.clone();
                self.spawn(async move {
                    let result = match op {
                        LifecycleOp::Start => plane.start(&workflow_id).await,
                        LifecycleOp::Stop => plane.stop(&workflow_id).await,
                        LifecycleOp::Pause => plane.pause(&workflow_id).await,
                        LifecycleOp::Resume => plane.resume(&workflow_id).await,
                        LifecycleOp::Archive => plane.archive(&workflow_id).await,
                    };
                    Message::LifecycleFinished {
                        op,
                        workflow_id,
                        result,
                    }
                });
            }
            Effect::Submit {
                workflow_id,
                command,
            } => {
                let gateway = self.gateway.clone();
                tokio::spawn(async move {
                    if gateway.dispatch(&workflow_id, command).await == DispatchOutcome::Dropped {
                        debug!(workflow = %workflow_id, "submission dropped");
                    }
                });
            }
            Effect::Quit => {}
        }
    }

    fn await_event(&self) {
        let events = self.events.clone();
        let tx = self.tx.clone();
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            let mut rx = events.lock().await;
            let next = tokio::select! {
                _ = cancel.cancelled() => return,
                next = rx.recv() => next,
            };
            let _ = tx.send(Message::ControlPlane(next));
        });
    }

    /// Runs `fut` and posts its message unless the loop has been torn down.
    fn spawn<F>(&self, fut: F)
    where
        F: std::future::Future<Output = Message> + Send + 'static,
    {
        let tx = self.tx.clone();
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            let message = fut.await;
            if !cancel.is_cancelled() {
                let _ = tx.send(message);
            }
        });
    }
}

pub struct EventLoop {
    runner: EffectRunner,
    messages: mpsc::UnboundedReceiver<Message>,
    unsubscribe: Option<Unsubscribe>,
    cancel: CancellationToken,
}

impl EventLoop {
    /// Subscribes to the control plane. `cancel` is the process-wide token.
    pub async fn connect(
        plane: Arc<dyn ControlPlane>,
        cancel: CancellationToken,
    ) -> Result<Self, ControlPlaneError> {
        let subscription = plane.subscribe(cancel.clone()).await?;
        let (tx, messages) = mpsc::unbounded_channel();
        let runner = EffectRunner {
            gateway: CommandGateway::new(plane.clone()),
            plane,
            events: Arc::new(Mutex::new(subscription.events)),
            reloads: Arc::new(ReloadGate::default()),
            tx,
            cancel: cancel.clone(),
        };
        info!("subscribed to control plane");
        Ok(Self {
            runner,
            messages,
            unsubscribe: Some(subscription.unsubscribe),
            cancel,
        })
    }

    /// Sender for input pumps feeding the loop.
    pub fn sender(&self) -> mpsc::UnboundedSender<Message> {
        self.runner.tx.clone()
    }

    pub fn runner(&self) -> &EffectRunner {
        &self.runner
    }

    /// Processes one message at a time until the app quits, the token is
    /// cancelled, or every sender is gone.
    pub async fn run(&mut self, app: &mut App, frontend: &mut impl Frontend) -> Result<()> {
        for effect in app.init() {
            self.runner.run(effect);
        }
        frontend.render(app)?;

        while !app.should_quit {
            let message = tokio::select! {
                _ = self.cancel.cancelled() => break,
                message = self.messages.recv() => match message {
                    Some(message) => message,
                    None => break,
                },
            };
            for effect in app.update(message) {
                self.runner.run(effect);
            }
            frontend.render(app)?;
        }
        Ok(())
    }

    /// Cancels outstanding effects and detaches from the control plane.
    pub fn shutdown(&mut self) {
        self.cancel.cancel();
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe.call();
        }
        info!("dashboard loop shut down");
    }
}

impl Drop for EventLoop {
    fn drop(&mut self) {
        if self.unsubscribe.is_some() {
            self.shutdown();
        }
    }
}

#[cfg(test)]
#[path = "tests/runtime_tests.rs"]
mod tests;

use crossterm::event::{Event as CrosstermEvent, KeyEvent, KeyEventKind, MouseEvent};
use futures::StreamExt;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Terminal input and timer ticks, before routing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    Key(KeyEvent),
    Mouse(MouseEvent),
    Paste(String),
    Resize(u16, u16),
    Tick,
}

/// Reads crossterm events and a tick timer into the update loop's channel.
pub struct InputPump;

impl InputPump {
    pub fn spawn<M>(
        tick_rate: Duration,
        tx: mpsc::UnboundedSender<M>,
        cancel: CancellationToken,
    ) -> JoinHandle<()>
    where
        M: From<InputEvent> + Send + 'static,
    {
        tokio::spawn(async move {
            let mut event_stream = crossterm::event::EventStream::new();
            let mut tick_interval = tokio::time::interval(tick_rate);

            loop {
                let input = tokio::select! {
                    _ = cancel.cancelled() => break,
                    maybe_event = event_stream.next() => match maybe_event {
                        Some(Ok(CrosstermEvent::Key(key))) if key.kind == KeyEventKind::Press => {
                            InputEvent::Key(key)
                        }
                        Some(Ok(CrosstermEvent::Mouse(mouse))) => InputEvent::Mouse(mouse),
                        Some(Ok(CrosstermEvent::Paste(text))) => InputEvent::Paste(text),
                        Some(Ok(CrosstermEvent::Resize(w, h))) => InputEvent::Resize(w, h),
                        Some(Err(_)) | None => break,
                        _ => continue,
                    },
                    _ = tick_interval.tick() => InputEvent::Tick,
                };
                if tx.send(M::from(input)).is_err() {
                    break;
                }
            }
            debug!("input pump stopped");
        })
    }

    /// Tick-only pump for running without a terminal.
    pub fn spawn_ticks<M>(
        tick_rate: Duration,
        tx: mpsc::UnboundedSender<M>,
        cancel: CancellationToken,
    ) -> JoinHandle<()>
    where
        M: From<InputEvent> + Send + 'static,
    {
        tokio::spawn(async move {
            let mut tick_interval = tokio::time::interval(tick_rate);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tick_interval.tick() => {
                        if tx.send(M::from(InputEvent::Tick)).is_err() {
                            break;
                        }
                    }
                }
            }
        })
    }
}

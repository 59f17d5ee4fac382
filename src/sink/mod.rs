use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::{mpsc, oneshot};

use crate::error::Error;
use crate::id::TrackId;
use crate::pad::{Buffer, Caps};
use crate::serializer::Serializer;
use crate::storage::Storage;
use crate::SinkConfig;

pub mod controller;

pub use controller::SinkController;

/// A one-shot event delivered to the host's stream_playable listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    StreamPlayable(TrackId),
}

enum PadEvent {
    Caps {
        track_id: TrackId,
        caps: Caps,
        reply: oneshot::Sender<Result<(), Error>>,
    },
    StartOfStream {
        track_id: TrackId,
        reply: oneshot::Sender<Result<(), Error>>,
    },
    Write {
        track_id: TrackId,
        buffer: Buffer,
        reply: oneshot::Sender<Result<(), Error>>,
    },
    Discontinue {
        track_id: TrackId,
        init: Bytes,
        reply: oneshot::Sender<Result<(), Error>>,
    },
    FromBeginning {
        track_id: TrackId,
        reply: oneshot::Sender<Result<(), Error>>,
    },
    EndOfStream {
        track_id: TrackId,
        reply: oneshot::Sender<Result<(), Error>>,
    },
}

/// A handle to a [`SinkController`] running as a single cooperative task.
/// Cloning a handle is cheap; every call is serialized through the
/// controller's event queue, so two handles never observe concurrent
/// mutation of the manifest.
#[derive(Clone)]
pub struct SinkHandle {
    events: mpsc::UnboundedSender<PadEvent>,
}

impl SinkHandle {
    pub async fn caps(&self, track_id: TrackId, caps: Caps) -> Result<(), Error> {
        self.call(|reply| PadEvent::Caps { track_id, caps, reply }).await
    }

    pub async fn start_of_stream(&self, track_id: TrackId) -> Result<(), Error> {
        self.call(|reply| PadEvent::StartOfStream { track_id, reply }).await
    }

    pub async fn write(&self, track_id: TrackId, buffer: Buffer) -> Result<(), Error> {
        self.call(|reply| PadEvent::Write { track_id, buffer, reply }).await
    }

    pub async fn discontinue(&self, track_id: TrackId, init: Bytes) -> Result<(), Error> {
        self.call(|reply| PadEvent::Discontinue { track_id, init, reply }).await
    }

    /// Replays a persisted track's retained stale tail back into the
    /// live window, resetting MEDIA-SEQUENCE to zero. Only valid for
    /// tracks registered with `persisted = true`.
    pub async fn from_beginning(&self, track_id: TrackId) -> Result<(), Error> {
        self.call(|reply| PadEvent::FromBeginning { track_id, reply }).await
    }

    pub async fn end_of_stream(&self, track_id: TrackId) -> Result<(), Error> {
        self.call(|reply| PadEvent::EndOfStream { track_id, reply }).await
    }

    async fn call(
        &self,
        make_event: impl FnOnce(oneshot::Sender<Result<(), Error>>) -> PadEvent,
    ) -> Result<(), Error> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.events
            .send(make_event(reply_tx))
            .map_err(|_| Error::Config("sink task has shut down".to_string()))?;
        reply_rx
            .await
            .map_err(|_| Error::Config("sink task dropped the reply channel".to_string()))?
    }
}

/// Spawns a [`SinkController`] as its own task and returns a handle to
/// drive it, plus the demand and notification channels it emits. This is
/// the realization of the single-threaded, cooperative-actor concurrency
/// model: every pad event is processed to completion before the next one
/// is taken off the queue.
pub fn spawn<S: Storage + 'static>(
    config: SinkConfig,
    storage: S,
    serializer: Arc<dyn Serializer>,
) -> (
    SinkHandle,
    mpsc::UnboundedReceiver<TrackId>,
    mpsc::UnboundedReceiver<Notification>,
) {
    let (events_tx, mut events_rx) = mpsc::unbounded_channel::<PadEvent>();
    let (demand_tx, demand_rx) = mpsc::unbounded_channel();
    let (notify_tx, notify_rx) = mpsc::unbounded_channel();

    let mut controller = SinkController::new(config, storage, serializer, demand_tx, notify_tx);

    tokio::spawn(async move {
        while let Some(event) = events_rx.recv().await {
            match event {
                PadEvent::Caps { track_id, caps, reply } => {
                    let _ = reply.send(controller.caps(track_id, caps).await);
                }
                PadEvent::StartOfStream { track_id, reply } => {
                    let _ = reply.send(controller.start_of_stream(track_id));
                }
                PadEvent::Write { track_id, buffer, reply } => {
                    let _ = reply.send(controller.write(track_id, buffer).await);
                }
                PadEvent::Discontinue { track_id, init, reply } => {
                    let _ = reply.send(controller.discontinue(track_id, init).await);
                }
                PadEvent::FromBeginning { track_id, reply } => {
                    let _ = reply.send(controller.from_beginning(track_id).await);
                }
                PadEvent::EndOfStream { track_id, reply } => {
                    let _ = reply.send(controller.end_of_stream(track_id).await);
                }
            }
        }
    });

    (SinkHandle { events: events_tx }, demand_rx, notify_rx)
}

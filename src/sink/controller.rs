use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::Error;
use crate::id::TrackId;
use crate::manifest::Manifest;
use crate::pad::{Buffer, Caps};
use crate::segment::ManifestEntry;
use crate::serializer::{SerializedManifests, Serializer};
use crate::sink::Notification;
use crate::storage::Storage;
use crate::track::TrackConfig;
use crate::SinkConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PadState {
    AwaitingStart,
    Streaming,
    Ended,
}

/// Drives one manifest's worth of pads through `awaiting_caps ->
/// awaiting_start -> streaming -> ended`, translating pad events into
/// manifest mutations and storage calls. Methods are meant to be driven
/// from a single task (see [`crate::sink::spawn`]); nothing here is
/// internally synchronized.
pub struct SinkController<S: Storage> {
    manifest: Manifest,
    storage: S,
    config: SinkConfig,
    pad_states: HashMap<TrackId, PadState>,
    awaiting_playable_notice: HashSet<TrackId>,
    demand_tx: mpsc::UnboundedSender<TrackId>,
    notify_tx: mpsc::UnboundedSender<Notification>,
}

impl<S: Storage> SinkController<S> {
    pub fn new(
        config: SinkConfig,
        storage: S,
        serializer: Arc<dyn Serializer>,
        demand_tx: mpsc::UnboundedSender<TrackId>,
        notify_tx: mpsc::UnboundedSender<Notification>,
    ) -> Self {
        let manifest = Manifest::new(config.manifest_name.clone(), serializer);
        SinkController {
            manifest,
            storage,
            config,
            pad_states: HashMap::new(),
            awaiting_playable_notice: HashSet::new(),
            demand_tx,
            notify_tx,
        }
    }

    /// `caps(pad_id, caps)` while the pad is still unregistered: adds the
    /// track to the manifest and persists its init segment. The pad stays
    /// out of `pad_states` (i.e. conceptually `awaiting_caps`) until the
    /// init segment is durably stored.
    pub async fn caps(&mut self, track_id: TrackId, caps: Caps) -> Result<(), Error> {
        let track_config = TrackConfig {
            id: track_id.clone(),
            content_type: caps.content_type,
            init_extension: caps.init_extension,
            fragment_extension: caps.fragment_extension,
            target_fragment_duration: self.config.target_fragment_duration,
            target_window_duration: self.config.target_window_duration,
            persisted: self.config.persisted,
        };

        let header_name = self.manifest.add_track(track_config)?;
        self.storage.store_init(&header_name, caps.init).await?;
        self.pad_states.insert(track_id.clone(), PadState::AwaitingStart);
        debug!(track = %track_id, header = %header_name, "track registered");
        Ok(())
    }

    /// `start_of_stream(pad_id)`: arms the one-shot `stream_playable`
    /// notice for this pad and issues its first unit of demand.
    pub fn start_of_stream(&mut self, track_id: TrackId) -> Result<(), Error> {
        match self.pad_states.get(&track_id) {
            Some(PadState::AwaitingStart) => {}
            _ => return Err(Error::InvalidPadState(track_id)),
        }
        self.awaiting_playable_notice.insert(track_id.clone());
        self.pad_states.insert(track_id.clone(), PadState::Streaming);
        let _ = self.demand_tx.send(track_id);
        Ok(())
    }

    /// `discontinue(pad_id, init)`: introduces a new header for the track
    /// and persists its bytes immediately, so the changeset emitted by the
    /// next `write` only needs to reference it by name.
    pub async fn discontinue(&mut self, track_id: TrackId, init: Bytes) -> Result<(), Error> {
        let header_name = self.manifest.discontinue_track(&track_id)?;
        self.storage.store_init(&header_name, init).await?;
        Ok(())
    }

    /// `from_beginning(pad_id)`: replays a persisted track's retained
    /// stale tail back into the live window (resetting MEDIA-SEQUENCE to
    /// zero) and, in windowed mode, republishes the manifests so the
    /// replay is visible immediately rather than waiting for the next
    /// write.
    pub async fn from_beginning(&mut self, track_id: TrackId) -> Result<(), Error> {
        self.manifest.from_beginning(&track_id)?;
        if self.config.windowed {
            let serialized = self.manifest.serialize()?;
            self.store_serialized(&serialized).await?;
        }
        Ok(())
    }

    /// `write(pad_id, buffer)`: appends the chunk, applies the resulting
    /// changeset to storage, republishes manifests in windowed mode, fires
    /// the one-shot playable notice if this is the first write after
    /// start_of_stream, then issues the next unit of demand. On any
    /// storage error the changeset has already been committed to the
    /// in-memory manifest, but no further demand is issued for this pad.
    pub async fn write(&mut self, track_id: TrackId, buffer: Buffer) -> Result<(), Error> {
        match self.pad_states.get(&track_id) {
            Some(PadState::Streaming) => {}
            _ => return Err(Error::InvalidPadState(track_id)),
        }

        let changeset = self.manifest.add_chunk(&track_id, &buffer)?;

        for entry in &changeset.to_add {
            if let ManifestEntry::Segment(segment) = entry {
                self.storage
                    .store_segment(&segment.name, buffer.payload.clone())
                    .await?;
            }
        }

        if !changeset.to_remove.is_empty() {
            let names: Vec<String> = changeset.to_remove.iter().map(|s| s.name.clone()).collect();
            self.storage.remove_segments(&names).await?;
        }

        if self.config.windowed {
            let serialized = self.manifest.serialize()?;
            self.store_serialized(&serialized).await?;
        }

        if self.awaiting_playable_notice.remove(&track_id) {
            let _ = self
                .notify_tx
                .send(Notification::StreamPlayable(track_id.clone()));
        }

        let _ = self.demand_tx.send(track_id);
        Ok(())
    }

    /// `end_of_stream(pad_id)`: marks the track finished and republishes
    /// manifests unconditionally, regardless of windowed mode.
    pub async fn end_of_stream(&mut self, track_id: TrackId) -> Result<(), Error> {
        match self.pad_states.get(&track_id) {
            Some(PadState::Streaming) => {}
            _ => return Err(Error::InvalidPadState(track_id)),
        }

        self.manifest.finish(&track_id)?;
        let serialized = self.manifest.serialize()?;
        self.store_serialized(&serialized).await?;
        self.pad_states.insert(track_id.clone(), PadState::Ended);
        debug!(track = %track_id, "track ended");
        Ok(())
    }

    async fn store_serialized(&self, serialized: &SerializedManifests) -> Result<(), Error> {
        let mut manifests = vec![serialized.master.clone()];
        manifests.extend(serialized.per_track.values().cloned());
        if let Err(e) = self.storage.store_manifests(&manifests).await {
            warn!(error = %e, "failed to store manifests");
            return Err(e);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::duration::Duration;
    use crate::serializer::hls::Hls;
    use crate::track::ContentType;

    use super::*;

    #[derive(Default)]
    struct MockStorage {
        segments: Mutex<HashMap<String, Bytes>>,
        manifest_writes: Mutex<u64>,
        fail_segment_named: Mutex<Option<String>>,
    }

    #[async_trait]
    impl Storage for MockStorage {
        async fn store_init(&self, _name: &str, _bytes: Bytes) -> Result<(), Error> {
            Ok(())
        }

        async fn store_segment(&self, name: &str, bytes: Bytes) -> Result<(), Error> {
            if self.fail_segment_named.lock().unwrap().as_deref() == Some(name) {
                return Err(Error::Config("injected failure".to_string()));
            }
            self.segments.lock().unwrap().insert(name.to_string(), bytes);
            Ok(())
        }

        async fn store_manifests(&self, _manifests: &[(String, String)]) -> Result<(), Error> {
            *self.manifest_writes.lock().unwrap() += 1;
            Ok(())
        }

        async fn remove_segments(&self, names: &[String]) -> Result<(), Error> {
            let mut segments = self.segments.lock().unwrap();
            for name in names {
                segments.remove(name);
            }
            Ok(())
        }
    }

    fn caps() -> Caps {
        Caps {
            content_type: ContentType::Video,
            init_extension: "mp4".to_string(),
            fragment_extension: "m4s".to_string(),
            init: Bytes::from_static(b"init"),
        }
    }

    fn buffer() -> Buffer {
        Buffer::new(Bytes::from_static(b"payload"), Duration::from_secs_f64(2.0))
    }

    fn controller(
        config: SinkConfig,
        storage: MockStorage,
    ) -> (
        SinkController<MockStorage>,
        mpsc::UnboundedReceiver<TrackId>,
        mpsc::UnboundedReceiver<Notification>,
    ) {
        let (demand_tx, demand_rx) = mpsc::unbounded_channel();
        let (notify_tx, notify_rx) = mpsc::unbounded_channel();
        let controller = SinkController::new(config, storage, Arc::new(Hls), demand_tx, notify_tx);
        (controller, demand_rx, notify_rx)
    }

    #[tokio::test]
    async fn stream_playable_fires_exactly_once() {
        let (mut ctl, mut demand_rx, mut notify_rx) =
            controller(SinkConfig::default(), MockStorage::default());
        let id = TrackId::from("v");

        ctl.caps(id.clone(), caps()).await.unwrap();
        ctl.start_of_stream(id.clone()).unwrap();
        assert_eq!(demand_rx.try_recv().unwrap(), id);

        ctl.write(id.clone(), buffer()).await.unwrap();
        assert!(matches!(
            notify_rx.try_recv(),
            Ok(Notification::StreamPlayable(t)) if t == id
        ));
        assert_eq!(demand_rx.try_recv().unwrap(), id);

        ctl.write(id.clone(), buffer()).await.unwrap();
        assert!(notify_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn non_windowed_mode_only_writes_manifests_at_end_of_stream() {
        let storage = MockStorage::default();
        let config = SinkConfig {
            windowed: false,
            ..SinkConfig::default()
        };
        let (mut ctl, _demand_rx, _notify_rx) = controller(config, storage);
        let id = TrackId::from("v");

        ctl.caps(id.clone(), caps()).await.unwrap();
        ctl.start_of_stream(id.clone()).unwrap();
        for _ in 0..10 {
            ctl.write(id.clone(), buffer()).await.unwrap();
        }
        assert_eq!(*ctl.storage.manifest_writes.lock().unwrap(), 0);

        ctl.end_of_stream(id).await.unwrap();
        assert_eq!(*ctl.storage.manifest_writes.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn storage_failure_on_segment_write_halts_demand() {
        let storage = MockStorage::default();
        *storage.fail_segment_named.lock().unwrap() = Some("v_segment_1.m4s".to_string());
        let (mut ctl, mut demand_rx, _notify_rx) = controller(SinkConfig::default(), storage);
        let id = TrackId::from("v");

        ctl.caps(id.clone(), caps()).await.unwrap();
        ctl.start_of_stream(id.clone()).unwrap();
        demand_rx.try_recv().unwrap();

        ctl.write(id.clone(), buffer()).await.unwrap();
        demand_rx.try_recv().unwrap();

        let result = ctl.write(id.clone(), buffer()).await;
        assert!(result.is_err());
        assert!(demand_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn from_beginning_replays_persisted_track_and_republishes_in_windowed_mode() {
        let storage = MockStorage::default();
        let config = SinkConfig {
            persisted: true,
            target_window_duration: Some(Duration::from_secs_f64(3.0)),
            ..SinkConfig::default()
        };
        let (mut ctl, _demand_rx, _notify_rx) = controller(config, storage);
        let id = TrackId::from("v");

        ctl.caps(id.clone(), caps()).await.unwrap();
        ctl.start_of_stream(id.clone()).unwrap();
        for _ in 0..3 {
            ctl.write(id.clone(), buffer()).await.unwrap();
        }
        let writes_before = *ctl.storage.manifest_writes.lock().unwrap();
        assert!(ctl.manifest.tracks().next().unwrap().media_sequence() > 0);

        ctl.from_beginning(id.clone()).await.unwrap();

        let track = ctl.manifest.tracks().next().unwrap();
        assert_eq!(track.media_sequence(), 0);
        assert_eq!(track.segments().count(), 3);
        assert!(*ctl.storage.manifest_writes.lock().unwrap() > writes_before);
    }

    #[tokio::test]
    async fn events_out_of_order_are_rejected() {
        let (mut ctl, _demand_rx, _notify_rx) =
            controller(SinkConfig::default(), MockStorage::default());
        let id = TrackId::from("v");

        assert!(matches!(
            ctl.write(id.clone(), buffer()).await,
            Err(Error::InvalidPadState(_))
        ));
        assert!(matches!(
            ctl.start_of_stream(id.clone()),
            Err(Error::InvalidPadState(_))
        ));
    }
}

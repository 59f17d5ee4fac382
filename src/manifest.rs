use std::collections::HashMap;
use std::sync::Arc;

use crate::error::Error;
use crate::id::TrackId;
use crate::pad::Buffer;
use crate::segment::Changeset;
use crate::serializer::{SerializedManifests, Serializer};
use crate::track::{Track, TrackConfig};

/// A named collection of tracks plus the serializer used to turn them into
/// wire-format manifests. Every mutation is a plain method on `&mut self`;
/// there is no shared mutable state beyond this struct.
pub struct Manifest {
    name: String,
    serializer: Arc<dyn Serializer>,
    tracks: HashMap<TrackId, Track>,
}

impl Manifest {
    pub fn new(name: impl Into<String>, serializer: Arc<dyn Serializer>) -> Self {
        Manifest {
            name: name.into(),
            serializer,
            tracks: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn has_track(&self, id: &TrackId) -> bool {
        self.tracks.contains_key(id)
    }

    pub fn is_persisted(&self, id: &TrackId) -> Result<bool, Error> {
        Ok(self
            .tracks
            .get(id)
            .ok_or_else(|| Error::TrackNotFound(id.clone()))?
            .persisted())
    }

    /// All segment names (stale + live, in presentation order) for every
    /// registered track, keyed by track id.
    pub fn all_segments_per_track(&self) -> HashMap<TrackId, Vec<String>> {
        self.tracks
            .iter()
            .map(|(id, track)| (id.clone(), track.all_segment_names()))
            .collect()
    }

    pub fn tracks(&self) -> impl Iterator<Item = &Track> {
        self.tracks.values()
    }

    fn track_mut(&mut self, id: &TrackId) -> Result<&mut Track, Error> {
        self.tracks
            .get_mut(id)
            .ok_or_else(|| Error::TrackNotFound(id.clone()))
    }

    /// Registers a new track and returns the name of its initial header,
    /// so the caller can persist the init segment bytes.
    pub fn add_track(&mut self, config: TrackConfig) -> Result<String, Error> {
        if self.tracks.contains_key(&config.id) {
            return Err(Error::DuplicateTrack(config.id));
        }
        let id = config.id.clone();
        let track = Track::new(config);
        let header_name = track.header_name().to_string();
        self.tracks.insert(id, track);
        Ok(header_name)
    }

    pub fn add_chunk(&mut self, id: &TrackId, buffer: &Buffer) -> Result<Changeset, Error> {
        self.track_mut(id)?.add_chunk(buffer)
    }

    /// Returns the new header name, so the caller can persist the new
    /// init segment's bytes.
    pub fn discontinue_track(&mut self, id: &TrackId) -> Result<String, Error> {
        self.track_mut(id)?.discontinue()
    }

    pub fn finish(&mut self, id: &TrackId) -> Result<(), Error> {
        self.track_mut(id)?.finish()
    }

    pub fn from_beginning(&mut self, id: &TrackId) -> Result<(), Error> {
        self.track_mut(id)?.from_beginning()
    }

    pub fn serialize(&self) -> Result<SerializedManifests, Error> {
        Arc::clone(&self.serializer).serialize(self)
    }
}

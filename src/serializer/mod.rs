use std::collections::HashMap;

use crate::error::Error;
use crate::id::TrackId;
use crate::manifest::Manifest;

pub mod hls;

/// A master manifest plus one per-track manifest per track, each as
/// `(file name, text)`.
#[derive(Debug, Clone, Default)]
pub struct SerializedManifests {
    pub master: (String, String),
    pub per_track: HashMap<TrackId, (String, String)>,
}

/// Pluggable manifest text format. `Manifest` holds an `Arc<dyn Serializer>`
/// so the wire format can be swapped without touching track bookkeeping.
pub trait Serializer: Send + Sync {
    fn serialize(&self, manifest: &Manifest) -> Result<SerializedManifests, Error>;
}

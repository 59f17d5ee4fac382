//! Manifest engine and sink controller for an HTTP Adaptive Streaming
//! (HLS) egress: tracks a set of media tracks through a sliding window,
//! turns them into HLS playlists through a pluggable serializer, and
//! drives a pad-keyed state machine that applies the resulting changesets
//! to a storage adapter.

pub mod config;
pub mod duration;
pub mod error;
pub mod id;
pub mod manifest;
pub mod pad;
pub mod segment;
pub mod serializer;
pub mod sink;
pub mod storage;
pub mod track;

pub use config::SinkConfig;
pub use duration::Duration;
pub use error::Error;
pub use id::TrackId;
pub use manifest::Manifest;
pub use pad::{Buffer, Caps};
pub use segment::{Changeset, ManifestEntry, Segment};
pub use serializer::{hls::Hls, SerializedManifests, Serializer};
pub use sink::{spawn, Notification, SinkController, SinkHandle};
pub use storage::filesystem::FilesystemStorage;
pub use storage::s3::{S3Config, S3Storage};
pub use storage::Storage;
pub use track::{ContentType, Track, TrackConfig};

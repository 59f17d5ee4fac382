use bytes::Bytes;

use crate::duration::Duration;
use crate::track::ContentType;

/// Mirrors the caps event an upstream pad delivers before the first
/// buffer: the track's content type, the extensions its segment names
/// should carry, and the init segment's bytes.
#[derive(Debug, Clone)]
pub struct Caps {
    pub content_type: ContentType,
    pub init_extension: String,
    pub fragment_extension: String,
    pub init: Bytes,
}

/// One fragment of media delivered on a pad after start_of_stream.
#[derive(Debug, Clone)]
pub struct Buffer {
    pub payload: Bytes,
    pub duration: Duration,
    pub independent: bool,
    pub complete: bool,
}

impl Buffer {
    /// A complete, independently-decodable fragment. The common case.
    pub fn new(payload: Bytes, duration: Duration) -> Self {
        Buffer {
            payload,
            duration,
            independent: true,
            complete: true,
        }
    }

    /// Mark this fragment as a partial append to a segment still being
    /// written (LL-HLS style partial segments are not otherwise modeled
    /// by this crate, but the data model keeps room for the flag).
    pub fn partial(mut self) -> Self {
        self.complete = false;
        self
    }

    pub fn not_independent(mut self) -> Self {
        self.independent = false;
        self
    }
}

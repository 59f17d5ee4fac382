use crate::id::TrackId;

/// Flat error type for the whole crate, in the style of this codebase's
/// sibling crates: one variant per failure kind, `#[from]` for the handful
/// of external error types each piece wraps.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("no track registered under id {0}")]
    TrackNotFound(TrackId),

    #[error("track {0} has already received end_of_stream")]
    TrackFinished(TrackId),

    #[error("track {0} is already registered")]
    DuplicateTrack(TrackId),

    #[error("track {0} was not configured as persisted, from_beginning is unavailable")]
    NotPersisted(TrackId),

    #[error("pad {0} received an event out of order for its current state")]
    InvalidPadState(TrackId),

    #[error("serializer cannot represent this manifest: {0}")]
    UnsupportedTopology(String),

    #[error("storage i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage error: {0}")]
    S3(#[from] aws_sdk_s3::Error),

    #[error("storage configuration error: {0}")]
    Config(String),
}

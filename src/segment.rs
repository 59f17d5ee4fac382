use crate::duration::Duration;

/// A single media segment descriptor, as it will be rendered into a
/// manifest by whichever serializer the caller selected.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub name: String,
    /// Name of the init segment this segment must be played against.
    pub header_name: String,
    pub duration: Duration,
    pub byte_size: u64,
    pub independent: bool,
    /// False for a partial segment still being appended to.
    pub complete: bool,
    /// Set on the first segment written after a discontinuity.
    pub discontinuity: bool,
}

/// A new header (init segment) introduced into a track's timeline, either
/// at track creation or after a discontinuity.
#[derive(Debug, Clone, PartialEq)]
pub struct Header {
    pub name: String,
}

/// Everything a single track mutation produced, for the caller to apply to
/// its storage adapter and to whatever it hands the serializer.
#[derive(Debug, Clone, PartialEq)]
pub enum ManifestEntry {
    Header(Header),
    Segment(Segment),
}

/// The incremental result of a track or manifest mutation: entries newly
/// in scope and segments that fell out of the sliding window.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Changeset {
    pub to_add: Vec<ManifestEntry>,
    pub to_remove: Vec<Segment>,
}

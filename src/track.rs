use std::collections::VecDeque;

use crate::duration::Duration;
use crate::error::Error;
use crate::id::TrackId;
use crate::pad::Buffer;
use crate::segment::{Changeset, Header, ManifestEntry, Segment};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    Video,
    Audio,
}

/// Everything needed to bring a track into existence, supplied by the
/// caller at caps time.
#[derive(Debug, Clone)]
pub struct TrackConfig {
    pub id: TrackId,
    pub content_type: ContentType,
    pub init_extension: String,
    pub fragment_extension: String,
    /// Duration a segment should aim for; only informs TARGETDURATION
    /// rounding, never enforced on the caller.
    pub target_fragment_duration: Duration,
    /// Sliding window size. `None` means unbounded (VOD-style, never
    /// evicts).
    pub target_window_duration: Option<Duration>,
    /// Whether evicted segments are kept around (for `from_beginning`)
    /// instead of being handed back for removal.
    pub persisted: bool,
}

/// Per-track state: the live window, the evicted-but-retained tail when
/// persisted, and the bookkeeping needed to name the next header or
/// segment and compute MEDIA-SEQUENCE.
#[derive(Debug)]
pub struct Track {
    id: TrackId,
    content_type: ContentType,
    init_extension: String,
    fragment_extension: String,
    target_fragment_duration: Duration,
    target_window_duration: Option<Duration>,
    persisted: bool,

    header_name: String,
    header_generation: u64,
    discontinuity_pending: bool,

    segments: VecDeque<Segment>,
    stale_segments: VecDeque<Segment>,
    current_seq_num: u64,
    finished: bool,
}

impl Track {
    pub fn new(config: TrackConfig) -> Self {
        let header_generation = 0;
        let header_name = header_name(&config.id, header_generation, &config.init_extension);
        Track {
            id: config.id,
            content_type: config.content_type,
            init_extension: config.init_extension,
            fragment_extension: config.fragment_extension,
            target_fragment_duration: config.target_fragment_duration,
            target_window_duration: config.target_window_duration,
            persisted: config.persisted,
            header_name,
            header_generation,
            discontinuity_pending: false,
            segments: VecDeque::new(),
            stale_segments: VecDeque::new(),
            current_seq_num: 0,
            finished: false,
        }
    }

    pub fn id(&self) -> &TrackId {
        &self.id
    }

    pub fn content_type(&self) -> ContentType {
        self.content_type
    }

    pub fn header_name(&self) -> &str {
        &self.header_name
    }

    pub fn finished(&self) -> bool {
        self.finished
    }

    pub fn persisted(&self) -> bool {
        self.persisted
    }

    pub fn target_segment_duration(&self) -> Duration {
        self.target_fragment_duration
    }

    /// `MEDIA-SEQUENCE`: always equal to the total number of segments ever
    /// appended, minus the number currently in the live window.
    pub fn media_sequence(&self) -> u64 {
        self.current_seq_num - self.segments.len() as u64
    }

    /// Segments currently in scope for serialization: the retained stale
    /// tail (if persisted and not yet replayed) followed by the live
    /// window, in chronological order.
    pub fn segments(&self) -> impl Iterator<Item = &Segment> {
        self.stale_segments.iter().chain(self.segments.iter())
    }

    pub fn all_segment_names(&self) -> Vec<String> {
        self.segments().map(|s| s.name.clone()).collect()
    }

    fn ensure_active(&self) -> Result<(), Error> {
        if self.finished {
            Err(Error::TrackFinished(self.id.clone()))
        } else {
            Ok(())
        }
    }

    /// Introduces a new header (init segment name) and marks the next
    /// appended segment as carrying a discontinuity. Returns the new
    /// header name so the caller can persist its bytes.
    pub fn discontinue(&mut self) -> Result<String, Error> {
        self.ensure_active()?;
        self.header_generation += 1;
        self.header_name = header_name(&self.id, self.header_generation, &self.init_extension);
        self.discontinuity_pending = true;
        Ok(self.header_name.clone())
    }

    pub fn add_chunk(&mut self, buffer: &Buffer) -> Result<Changeset, Error> {
        self.ensure_active()?;

        let mut to_add = Vec::new();
        let discontinuity = self.discontinuity_pending;
        if discontinuity {
            self.discontinuity_pending = false;
            to_add.push(ManifestEntry::Header(Header {
                name: self.header_name.clone(),
            }));
        }

        let name = segment_name(&self.id, self.current_seq_num, &self.fragment_extension);
        self.current_seq_num += 1;
        self.target_fragment_duration = self.target_fragment_duration.max(buffer.duration);

        let segment = Segment {
            name,
            header_name: self.header_name.clone(),
            duration: buffer.duration,
            byte_size: buffer.payload.len() as u64,
            independent: buffer.independent,
            complete: buffer.complete,
            discontinuity,
        };
        self.segments.push_back(segment.clone());
        to_add.push(ManifestEntry::Segment(segment));

        let to_remove = self.evict();
        Ok(Changeset { to_add, to_remove })
    }

    fn window_duration(&self) -> Duration {
        self.segments.iter().map(|s| s.duration).sum()
    }

    fn evict(&mut self) -> Vec<Segment> {
        let Some(window) = self.target_window_duration else {
            return Vec::new();
        };

        let mut removed = Vec::new();
        while self.window_duration() > window {
            match self.segments.front() {
                // Never evict a segment still being appended to.
                Some(front) if !front.complete => break,
                Some(_) => {
                    let evicted = self.segments.pop_front().expect("front just matched");
                    if self.persisted {
                        self.stale_segments.push_back(evicted);
                    } else {
                        removed.push(evicted);
                    }
                }
                None => break,
            }
        }
        removed
    }

    pub fn finish(&mut self) -> Result<(), Error> {
        self.ensure_active()?;
        self.finished = true;
        Ok(())
    }

    /// Brings the retained stale tail back into the live window, resetting
    /// MEDIA-SEQUENCE to zero. Only valid for persisted tracks.
    pub fn from_beginning(&mut self) -> Result<(), Error> {
        if !self.persisted {
            return Err(Error::NotPersisted(self.id.clone()));
        }
        let mut combined = std::mem::take(&mut self.stale_segments);
        combined.extend(self.segments.drain(..));
        self.segments = combined;
        Ok(())
    }
}

fn header_name(id: &TrackId, generation: u64, ext: &str) -> String {
    format!("{}_header_{generation}.{ext}", id.as_str())
}

fn segment_name(id: &TrackId, seq: u64, ext: &str) -> String {
    format!("{}_segment_{seq}.{ext}", id.as_str())
}

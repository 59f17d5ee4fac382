use std::collections::HashMap;

use m3u8_rs::{AlternativeMedia, AlternativeMediaType, MasterPlaylist, MediaPlaylist, MediaSegment, VariantStream};

use crate::error::Error;
use crate::manifest::Manifest;
use crate::track::{ContentType, Track};

use super::{SerializedManifests, Serializer};

// The reference serializer below has no source for real codec strings or
// measured bitrate: Track carries neither (parsing codec/bitrate out of
// caps is out of scope here). These are the same placeholder values used
// throughout this crate's test fixtures and examples.
const PLACEHOLDER_BANDWIDTH: u64 = 2_560_000;
const PLACEHOLDER_CODECS: &str = "avc1.42e00a";

/// The reference HLS serializer: one `EXTM3U` media playlist per track,
/// plus a master playlist when more than one track is present.
pub struct Hls;

impl Serializer for Hls {
    fn serialize(&self, manifest: &Manifest) -> Result<SerializedManifests, Error> {
        let videos: Vec<&Track> = manifest
            .tracks()
            .filter(|t| t.content_type() == ContentType::Video)
            .collect();
        let audios: Vec<&Track> = manifest
            .tracks()
            .filter(|t| t.content_type() == ContentType::Audio)
            .collect();

        if videos.len() > 1 || audios.len() > 1 {
            return Err(Error::UnsupportedTopology(
                "hls serializer supports at most one video track and one audio track".to_string(),
            ));
        }

        let track_count = manifest.tracks().count();
        if track_count <= 1 {
            let Some(track) = manifest.tracks().next() else {
                return Ok(SerializedManifests {
                    master: (format!("{}.m3u8", manifest.name()), String::new()),
                    per_track: HashMap::new(),
                });
            };
            let text = render_media_playlist(track);
            let name = per_track_name(track.content_type());
            return Ok(SerializedManifests {
                master: (name, text),
                per_track: HashMap::new(),
            });
        }

        let mut per_track = HashMap::new();
        for track in manifest.tracks() {
            let name = per_track_name(track.content_type());
            let text = render_media_playlist(track);
            per_track.insert(track.id().clone(), (name, text));
        }

        let video = videos[0];
        let audio = audios.first().copied();
        let master_text = render_master_playlist(video, audio);

        Ok(SerializedManifests {
            master: (format!("{}.m3u8", manifest.name()), master_text),
            per_track,
        })
    }
}

fn per_track_name(content_type: ContentType) -> String {
    match content_type {
        ContentType::Video => "video.m3u8".to_string(),
        ContentType::Audio => "audio.m3u8".to_string(),
    }
}

fn render_media_playlist(track: &Track) -> String {
    let mut current_map: Option<String> = None;

    let segments: Vec<MediaSegment> = track
        .segments()
        .map(|seg| {
            let map = if current_map.as_deref() != Some(seg.header_name.as_str()) {
                current_map = Some(seg.header_name.clone());
                Some(m3u8_rs::Map {
                    uri: seg.header_name.clone(),
                    ..Default::default()
                })
            } else {
                None
            };

            MediaSegment {
                uri: seg.name.clone(),
                duration: seg.duration.as_secs_f64() as f32,
                discontinuity: seg.discontinuity,
                map,
                ..Default::default()
            }
        })
        .collect();

    let playlist = MediaPlaylist {
        version: Some(7),
        target_duration: track.target_segment_duration().ceil_secs(),
        media_sequence: track.media_sequence(),
        independent_segments: true,
        end_list: track.finished(),
        segments,
        ..Default::default()
    };

    let mut buf = Vec::new();
    playlist
        .write_to(&mut buf)
        .expect("serializing into an in-memory buffer is infallible");
    String::from_utf8(buf).expect("m3u8-rs only ever writes valid utf-8")
}

fn render_master_playlist(video: &Track, audio: Option<&Track>) -> String {
    let audio_group = audio.map(|_| "a".to_string());

    let playlist = MasterPlaylist {
        version: Some(7),
        independent_segments: true,
        variants: vec![VariantStream {
            uri: per_track_name(ContentType::Video),
            bandwidth: PLACEHOLDER_BANDWIDTH,
            codecs: Some(PLACEHOLDER_CODECS.to_string()),
            audio: audio_group.clone(),
            ..Default::default()
        }],
        alternatives: audio
            .map(|_| {
                vec![AlternativeMedia {
                    media_type: AlternativeMediaType::Audio,
                    uri: Some(per_track_name(ContentType::Audio)),
                    group_id: audio_group.clone().unwrap_or_default(),
                    name: audio_group.unwrap_or_default(),
                    autoselect: true,
                    default: true,
                    ..Default::default()
                }]
            })
            .unwrap_or_default(),
        ..Default::default()
    };

    let mut buf = Vec::new();
    playlist
        .write_to(&mut buf)
        .expect("serializing into an in-memory buffer is infallible");
    String::from_utf8(buf).expect("m3u8-rs only ever writes valid utf-8")
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::duration::Duration;
    use crate::id::TrackId;
    use crate::pad::Buffer;
    use crate::track::TrackConfig;

    use super::*;

    fn video_config(window: Option<Duration>) -> TrackConfig {
        TrackConfig {
            id: TrackId::from("video"),
            content_type: ContentType::Video,
            init_extension: "mp4".to_string(),
            fragment_extension: "m4s".to_string(),
            target_fragment_duration: Duration::ZERO,
            target_window_duration: window,
            persisted: false,
        }
    }

    fn audio_config() -> TrackConfig {
        TrackConfig {
            id: TrackId::from("audio"),
            content_type: ContentType::Audio,
            init_extension: "mp4".to_string(),
            fragment_extension: "m4s".to_string(),
            target_fragment_duration: Duration::ZERO,
            target_window_duration: None,
            persisted: false,
        }
    }

    #[test]
    fn single_video_track_becomes_the_master_manifest_directly() {
        let mut manifest = Manifest::new("index", Arc::new(Hls));
        manifest.add_track(video_config(None)).unwrap();
        for _ in 0..3 {
            let buffer = Buffer::new(bytes::Bytes::from_static(b"x"), Duration::from_secs_f64(5.0));
            manifest.add_chunk(&TrackId::from("video"), &buffer).unwrap();
        }

        let serialized = manifest.serialize().unwrap();
        assert_eq!(serialized.master.0, "video.m3u8");
        assert!(serialized.per_track.is_empty());
        assert!(serialized.master.1.contains("#EXT-X-TARGETDURATION:5"));
        assert!(serialized.master.1.contains("#EXTINF:5"));
    }

    #[test]
    fn two_tracks_over_the_limit_is_rejected() {
        let mut manifest = Manifest::new("index", Arc::new(Hls));
        manifest.add_track(video_config(None)).unwrap();
        manifest
            .add_track(TrackConfig {
                id: TrackId::from("video-2"),
                ..video_config(None)
            })
            .unwrap();

        assert!(matches!(manifest.serialize(), Err(Error::UnsupportedTopology(_))));
    }

    #[test]
    fn video_and_audio_produce_a_master_with_sub_manifests() {
        let mut manifest = Manifest::new("index", Arc::new(Hls));
        manifest.add_track(video_config(None)).unwrap();
        manifest.add_track(audio_config()).unwrap();

        let buffer = Buffer::new(bytes::Bytes::from_static(b"x"), Duration::from_secs_f64(2.0));
        manifest.add_chunk(&TrackId::from("video"), &buffer).unwrap();
        manifest.add_chunk(&TrackId::from("audio"), &buffer).unwrap();

        let serialized = manifest.serialize().unwrap();
        assert_eq!(serialized.master.0, "index.m3u8");
        assert!(serialized.master.1.contains("#EXT-X-STREAM-INF"));
        assert!(serialized.master.1.contains("AUDIO=\"a\""));
        assert!(serialized.master.1.contains("video.m3u8"));
        assert!(serialized.per_track.len() == 2);
    }

    #[test]
    fn discontinuity_changes_the_referenced_map() {
        let mut manifest = Manifest::new("index", Arc::new(Hls));
        manifest.add_track(video_config(None)).unwrap();
        let track_id = TrackId::from("video");
        let buffer = Buffer::new(bytes::Bytes::from_static(b"x"), Duration::from_secs_f64(2.0));
        manifest.add_chunk(&track_id, &buffer).unwrap();

        let new_header = manifest.discontinue_track(&track_id).unwrap();
        manifest.add_chunk(&track_id, &buffer).unwrap();

        let serialized = manifest.serialize().unwrap();
        assert!(serialized.master.1.contains(&new_header));
        assert!(serialized.master.1.contains("#EXT-X-DISCONTINUITY"));
    }
}

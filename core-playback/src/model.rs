//! # Track and Queue Model
//!
//! Value types describing what is queued and what is being played.
//!
//! A [`Queue`] is an ordered list of [`Track`]s with a cursor. The cursor is
//! `None` exactly when the queue is empty and otherwise always a valid index;
//! every mutation in this module preserves that.

use bridge_traits::{EngineRepeatMode, LoadRequest, NowPlayingMetadata};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{PlaybackError, Result};

// ============================================================================
// Track
// ============================================================================

/// A playable track as supplied by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    /// Catalog hash. Opaque to the core.
    pub id: String,
    pub title: String,
    pub artists: Vec<String>,
    pub album: Option<String>,
    pub duration: Duration,
    pub disc_number: Option<u32>,
    pub track_number: Option<u32>,
    /// Artwork reference understood by the host (URL or cache key).
    pub artwork: Option<String>,
}

impl Track {
    pub fn new(id: impl Into<String>, title: impl Into<String>, duration: Duration) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            artists: Vec::new(),
            album: None,
            duration,
            disc_number: None,
            track_number: None,
            artwork: None,
        }
    }

    pub fn with_artist(mut self, artist: impl Into<String>) -> Self {
        self.artists.push(artist.into());
        self
    }

    pub fn with_album(mut self, album: impl Into<String>) -> Self {
        self.album = Some(album.into());
        self
    }

    pub fn with_ordinal(mut self, disc_number: Option<u32>, track_number: Option<u32>) -> Self {
        self.disc_number = disc_number;
        self.track_number = track_number;
        self
    }

    pub fn with_artwork(mut self, artwork: impl Into<String>) -> Self {
        self.artwork = Some(artwork.into());
        self
    }

    pub fn duration_ms(&self) -> u64 {
        self.duration.as_millis().min(u64::MAX as u128) as u64
    }

    /// Metadata for the OS media session.
    pub fn now_playing_metadata(&self) -> NowPlayingMetadata {
        NowPlayingMetadata {
            track_id: self.id.clone(),
            title: self.title.clone(),
            artist: self.artists.join(", "),
            album: self.album.clone(),
            artwork: self.artwork.clone(),
            duration: self.duration,
        }
    }

    pub fn load_request(&self) -> LoadRequest {
        LoadRequest::new(self.id.clone(), self.duration).with_metadata(self.now_playing_metadata())
    }
}

// ============================================================================
// Queue Source
// ============================================================================

/// Tag identifying what produced a queue, e.g. `album:<hash>`.
///
/// The UI compares it against the screen it is rendering to answer "is this
/// the thing currently playing".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueueSource(String);

impl QueueSource {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    pub fn album(hash: impl AsRef<str>) -> Self {
        Self(format!("album:{}", hash.as_ref()))
    }

    pub fn folder(hash: impl AsRef<str>) -> Self {
        Self(format!("folder:{}", hash.as_ref()))
    }

    pub fn favorites() -> Self {
        Self("favorites".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QueueSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for QueueSource {
    fn from(tag: &str) -> Self {
        Self::new(tag)
    }
}

impl From<String> for QueueSource {
    fn from(tag: String) -> Self {
        Self(tag)
    }
}

// ============================================================================
// Playback Mode
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepeatMode {
    #[default]
    Off,
    /// Wrap around the queue.
    All,
    /// Repeat the current track.
    One,
}

impl RepeatMode {
    /// Engine vocabulary: `off → off`, `one → track`, `all → queue`.
    pub fn to_engine(self) -> EngineRepeatMode {
        match self {
            RepeatMode::Off => EngineRepeatMode::Off,
            RepeatMode::One => EngineRepeatMode::Track,
            RepeatMode::All => EngineRepeatMode::Queue,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RepeatMode::Off => "off",
            RepeatMode::All => "all",
            RepeatMode::One => "one",
        }
    }
}

/// Repeat and shuffle flags. Shuffle never reorders the stored queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PlaybackMode {
    pub repeat: RepeatMode,
    pub shuffle: bool,
}

// ============================================================================
// Queue
// ============================================================================

/// Ordered tracks plus the cursor of the current one.
#[derive(Debug, Clone, Default)]
pub struct Queue {
    tracks: Vec<Arc<Track>>,
    cursor: Option<usize>,
    source: Option<QueueSource>,
}

/// Result of removing a track from a [`Queue`].
#[derive(Debug, Clone)]
pub struct Removal {
    pub track: Arc<Track>,
    /// The removed track was the current one.
    pub was_current: bool,
}

impl Queue {
    /// Build a queue positioned at `start_index`, clamped into `[0, len-1]`.
    pub fn new(tracks: Vec<Track>, start_index: usize, source: QueueSource) -> Self {
        let tracks: Vec<Arc<Track>> = tracks.into_iter().map(Arc::new).collect();
        let cursor = if tracks.is_empty() {
            None
        } else {
            Some(start_index.min(tracks.len() - 1))
        };
        Self {
            tracks,
            cursor,
            source: Some(source),
        }
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn source(&self) -> Option<&QueueSource> {
        self.source.as_ref()
    }

    pub fn tracks(&self) -> &[Arc<Track>] {
        &self.tracks
    }

    pub fn get(&self, index: usize) -> Option<&Arc<Track>> {
        self.tracks.get(index)
    }

    pub fn current(&self) -> Option<&Arc<Track>> {
        self.cursor.and_then(|index| self.tracks.get(index))
    }

    /// Move the cursor. Out-of-range indices leave the queue untouched.
    pub fn set_cursor(&mut self, index: usize) -> Result<()> {
        if index >= self.tracks.len() {
            return Err(PlaybackError::InvalidIndex {
                index,
                len: self.tracks.len(),
            });
        }
        self.cursor = Some(index);
        Ok(())
    }

    /// Append a track and return its index. The first track added to an
    /// empty queue becomes current.
    pub fn push(&mut self, track: Track) -> usize {
        self.tracks.push(Arc::new(track));
        if self.cursor.is_none() {
            self.cursor = Some(0);
        }
        self.tracks.len() - 1
    }

    /// Remove the track at `index`, keeping the cursor on a valid entry.
    ///
    /// Removing a track before the cursor shifts the cursor down with it;
    /// removing the current track re-clamps to `min(index, len-1)`.
    pub fn remove(&mut self, index: usize) -> Result<Removal> {
        if index >= self.tracks.len() {
            return Err(PlaybackError::InvalidIndex {
                index,
                len: self.tracks.len(),
            });
        }

        let track = self.tracks.remove(index);
        let was_current = self.cursor == Some(index);

        self.cursor = match self.cursor {
            _ if self.tracks.is_empty() => None,
            Some(cursor) if index < cursor => Some(cursor - 1),
            Some(cursor) if index == cursor => Some(index.min(self.tracks.len() - 1)),
            other => other,
        };

        Ok(Removal { track, was_current })
    }

    pub fn clear(&mut self) {
        self.tracks.clear();
        self.cursor = None;
        self.source = None;
    }
}

// ============================================================================
// Views
// ============================================================================

/// Owned, read-only copy of the queue for UI consumption.
#[derive(Debug, Clone, PartialEq)]
pub struct QueueView {
    pub tracks: Vec<Arc<Track>>,
    pub cursor: Option<usize>,
    pub source: Option<QueueSource>,
    pub mode: PlaybackMode,
}

impl QueueView {
    pub fn current(&self) -> Option<&Arc<Track>> {
        self.cursor.and_then(|index| self.tracks.get(index))
    }
}

/// Coarse player lifecycle: `Empty → Loaded → Playing ⇄ Paused`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PlayerState {
    #[default]
    Empty,
    /// A queue is present but nothing is playing or paused.
    Loaded,
    Playing,
    Paused,
}

/// Published playback snapshot.
///
/// Observers compare snapshots by identity (`Arc::ptr_eq`); a new instance is
/// only created when a field changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackStatus {
    pub position_ms: u64,
    pub duration_ms: u64,
    pub is_playing: bool,
    pub is_loaded: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracks(n: usize) -> Vec<Track> {
        (0..n)
            .map(|i| Track::new(format!("t{i}"), format!("Track {i}"), Duration::from_secs(60)))
            .collect()
    }

    #[test]
    fn test_new_clamps_start_index() {
        let queue = Queue::new(tracks(3), 10, QueueSource::album("abc"));
        assert_eq!(queue.cursor(), Some(2));
        assert_eq!(queue.source().map(QueueSource::as_str), Some("album:abc"));

        let empty = Queue::new(Vec::new(), 0, QueueSource::favorites());
        assert_eq!(empty.cursor(), None);
    }

    #[test]
    fn test_set_cursor_out_of_range_does_not_mutate() {
        let mut queue = Queue::new(tracks(2), 1, QueueSource::default());
        let err = queue.set_cursor(2).unwrap_err();
        assert_eq!(err, PlaybackError::InvalidIndex { index: 2, len: 2 });
        assert_eq!(queue.cursor(), Some(1));
    }

    #[test]
    fn test_push_into_empty_sets_cursor() {
        let mut queue = Queue::default();
        assert_eq!(queue.push(Track::new("a", "A", Duration::from_secs(1))), 0);
        assert_eq!(queue.cursor(), Some(0));
        assert_eq!(queue.push(Track::new("b", "B", Duration::from_secs(1))), 1);
        assert_eq!(queue.cursor(), Some(0));
    }

    #[test]
    fn test_remove_before_cursor_shifts() {
        let mut queue = Queue::new(tracks(4), 2, QueueSource::default());
        let removal = queue.remove(0).unwrap();
        assert!(!removal.was_current);
        assert_eq!(queue.cursor(), Some(1));
        assert_eq!(queue.current().unwrap().id, "t2");
    }

    #[test]
    fn test_remove_current_reclamps() {
        let mut queue = Queue::new(tracks(3), 2, QueueSource::default());
        let removal = queue.remove(2).unwrap();
        assert!(removal.was_current);
        assert_eq!(removal.track.id, "t2");
        assert_eq!(queue.cursor(), Some(1));

        let mut queue = Queue::new(tracks(3), 1, QueueSource::default());
        queue.remove(1).unwrap();
        assert_eq!(queue.cursor(), Some(1));
        assert_eq!(queue.current().unwrap().id, "t2");
    }

    #[test]
    fn test_remove_last_track_empties_cursor() {
        let mut queue = Queue::new(tracks(1), 0, QueueSource::default());
        queue.remove(0).unwrap();
        assert!(queue.is_empty());
        assert_eq!(queue.cursor(), None);
    }

    #[test]
    fn test_repeat_maps_to_engine_vocabulary() {
        assert_eq!(RepeatMode::Off.to_engine(), EngineRepeatMode::Off);
        assert_eq!(RepeatMode::One.to_engine(), EngineRepeatMode::Track);
        assert_eq!(RepeatMode::All.to_engine(), EngineRepeatMode::Queue);
    }

    #[test]
    fn test_now_playing_metadata_joins_artists() {
        let track = Track::new("h", "Song", Duration::from_secs(200))
            .with_artist("A")
            .with_artist("B")
            .with_album("LP");
        let metadata = track.now_playing_metadata();
        assert_eq!(metadata.artist, "A, B");
        assert_eq!(metadata.album.as_deref(), Some("LP"));
        assert_eq!(track.load_request().track_id, "h");
    }
}

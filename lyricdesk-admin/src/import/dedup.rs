//! Duplicate detection on the case-insensitive (title, artist) key

use lyricdesk_common::db::{title_key, ExistingSong, NewSong};
use std::collections::HashSet;

/// Skip reason for a record already present in the catalog
pub const DUPLICATE_REASON: &str = "Duplicate (title+artist)";

/// Skip reason for a record repeating an earlier record of the same batch
pub const SIBLING_DUPLICATE_REASON: &str = "Duplicate within batch (title+artist)";

/// Lower-cased title and artist; a missing artist compares as ""
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DedupKey {
    title: String,
    artist: String,
}

impl DedupKey {
    pub fn new(title: &str, artist: Option<&str>) -> Self {
        Self {
            title: title_key(title),
            artist: artist.unwrap_or("").to_lowercase(),
        }
    }

    pub fn of_song(song: &NewSong) -> Self {
        Self::new(&song.title, song.artist.as_deref())
    }
}

/// Classifies candidates against a snapshot of stored songs
#[derive(Debug)]
pub struct DuplicateDetector {
    existing: HashSet<DedupKey>,
    /// Keys queued so far in this batch; `None` when sibling checks are off
    queued: Option<HashSet<DedupKey>>,
}

impl DuplicateDetector {
    pub fn new(existing: &[ExistingSong], within_batch: bool) -> Self {
        Self {
            existing: existing
                .iter()
                .map(|e| DedupKey::new(&e.title, e.artist.as_deref()))
                .collect(),
            queued: within_batch.then(HashSet::new),
        }
    }

    /// Skip reason when `song` is a duplicate, `None` when it may be inserted
    ///
    /// Candidates must be classified in original order: with sibling checks
    /// on, the first occurrence of a key wins.
    pub fn classify(&mut self, song: &NewSong) -> Option<&'static str> {
        let key = DedupKey::of_song(song);
        if self.existing.contains(&key) {
            return Some(DUPLICATE_REASON);
        }
        if let Some(queued) = self.queued.as_mut() {
            if !queued.insert(key) {
                return Some(SIBLING_DUPLICATE_REASON);
            }
        }
        None
    }
}

/// Distinct titles in first-seen order, for the existing-songs lookup
pub fn distinct_titles<'a, I>(songs: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a NewSong>,
{
    let mut seen: HashSet<&'a str> = HashSet::new();
    let mut titles = Vec::new();
    for song in songs {
        if seen.insert(song.title.as_str()) {
            titles.push(song.title.clone());
        }
    }
    titles
}

#[cfg(test)]
mod tests {
    use super::*;

    fn song(title: &str, artist: Option<&str>) -> NewSong {
        let mut song = NewSong::titled(title);
        song.artist = artist.map(str::to_string);
        song
    }

    fn existing(title: &str, artist: Option<&str>) -> ExistingSong {
        ExistingSong {
            title: title.to_string(),
            artist: artist.map(str::to_string),
        }
    }

    #[test]
    fn test_match_is_case_insensitive() {
        let mut detector = DuplicateDetector::new(&[existing("Song A", Some("X"))], false);
        assert_eq!(detector.classify(&song("song a", Some("x"))), Some(DUPLICATE_REASON));
        assert_eq!(detector.classify(&song("Song A", Some("Y"))), None);
    }

    #[test]
    fn test_missing_artist_matches_missing_or_empty() {
        let mut detector = DuplicateDetector::new(&[existing("Song B", None)], false);
        assert_eq!(detector.classify(&song("Song B", None)), Some(DUPLICATE_REASON));

        let mut detector = DuplicateDetector::new(&[existing("Song B", Some(""))], false);
        assert_eq!(detector.classify(&song("SONG B", None)), Some(DUPLICATE_REASON));
    }

    #[test]
    fn test_siblings_pass_by_default() {
        let mut detector = DuplicateDetector::new(&[], false);
        assert_eq!(detector.classify(&song("Twin", Some("A"))), None);
        assert_eq!(detector.classify(&song("Twin", Some("A"))), None);
    }

    #[test]
    fn test_sibling_check_keeps_first_occurrence() {
        let mut detector = DuplicateDetector::new(&[], true);
        assert_eq!(detector.classify(&song("Twin", Some("A"))), None);
        assert_eq!(
            detector.classify(&song("twin", Some("a"))),
            Some(SIBLING_DUPLICATE_REASON)
        );
        assert_eq!(detector.classify(&song("Twin", Some("B"))), None);
    }

    #[test]
    fn test_distinct_titles_keep_order() {
        let songs = vec![song("B", None), song("A", None), song("B", Some("x"))];
        assert_eq!(distinct_titles(&songs), vec!["B".to_string(), "A".to_string()]);
    }
}

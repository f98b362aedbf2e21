//! Moderation of staged lyric and chord edits
//!
//! Contributors' edits wait in `pending_lyrics` / `pending_chords`. Approving
//! moves the staged text into the published field; rejecting discards it.
//! Either way the pending slot is cleared and the approval flag records the
//! decision.

use lyricdesk_common::db::{PatchValue, Song, SongPatch};
use lyricdesk_common::{Error, Result};
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    ApproveLyrics,
    RejectLyrics,
    ApproveChords,
    RejectChords,
}

/// Patch applying `decision` to `song`
pub fn decision_patch(decision: Decision, song: &Song) -> Result<SongPatch> {
    let record = &song.record;
    let patch = match decision {
        Decision::ApproveLyrics => approve(
            "lyrics",
            "pending_lyrics",
            "lyrics_approved",
            record.pending_lyrics.as_deref(),
        )?,
        Decision::RejectLyrics => reject("pending_lyrics", "lyrics_approved"),
        Decision::ApproveChords => approve(
            "chords",
            "pending_chords",
            "chords_approved",
            record.pending_chords.as_deref(),
        )?,
        Decision::RejectChords => reject("pending_chords", "chords_approved"),
    };
    Ok(patch)
}

fn approve(
    field: &'static str,
    pending_field: &'static str,
    flag: &'static str,
    pending: Option<&str>,
) -> Result<SongPatch> {
    let pending = pending
        .filter(|text| !text.is_empty())
        .ok_or_else(|| Error::InvalidInput(format!("No pending {} to approve", field)))?;

    Ok(SongPatch::new()
        .set(field, PatchValue::Text(Some(pending.to_string())))
        .set(pending_field, PatchValue::Text(None))
        .set(flag, PatchValue::Flag(true)))
}

fn reject(pending_field: &'static str, flag: &'static str) -> SongPatch {
    SongPatch::new()
        .set(pending_field, PatchValue::Text(None))
        .set(flag, PatchValue::Flag(false))
}

#[cfg(test)]
mod tests {
    use super::*;
    use lyricdesk_common::db::NewSong;
    use serde_json::json;

    fn song_with_pending(lyrics: Option<&str>) -> Song {
        let mut record = NewSong::titled("Song");
        record.lyrics = Some("old words".to_string());
        record.pending_lyrics = lyrics.map(str::to_string);
        Song {
            id: "s1".to_string(),
            created_at: None,
            record,
        }
    }

    #[test]
    fn test_approve_moves_pending_text() {
        let patch = decision_patch(Decision::ApproveLyrics, &song_with_pending(Some("new words"))).unwrap();
        assert_eq!(
            patch.to_json(),
            json!({"lyrics": "new words", "pending_lyrics": null, "lyrics_approved": true})
        );
    }

    #[test]
    fn test_reject_discards_pending_text() {
        let patch = decision_patch(Decision::RejectChords, &song_with_pending(None)).unwrap();
        assert_eq!(
            patch.to_json(),
            json!({"pending_chords": null, "chords_approved": false})
        );
    }

    #[test]
    fn test_approve_without_pending_fails() {
        let err = decision_patch(Decision::ApproveLyrics, &song_with_pending(None)).unwrap_err();
        assert_eq!(err.to_string(), "Invalid input: No pending lyrics to approve");
    }

    #[test]
    fn test_decision_names() {
        let decision: Decision = serde_json::from_value(json!("approve_chords")).unwrap();
        assert_eq!(decision, Decision::ApproveChords);
    }
}

//! Opaque feed cursors.
//!
//! A cursor is the base64 encoding of
//! `as_of_ms:position:score_key:published_at_ms:id`: the request time the
//! first page was scored at, the sequence position the next page starts at,
//! and the sort key of the last item handed out. Ids may themselves contain
//! `:`, so only the first four separators are significant.
//!
//! Every page of a feed is scored at `as_of`, so an unchanged pool yields the
//! same sequence on every request and pages resume by position.

use crate::services::ranking::{RankingError, Result, ScoredItem, SortKey};
use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, TimeZone, Utc};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedCursor {
    /// Request time the feed snapshot is scored at
    pub as_of: DateTime<Utc>,
    /// Sequence position of the first item on the next page
    pub position: usize,
    /// Sort key of the last item handed out
    pub key: SortKey,
}

impl FeedCursor {
    pub fn new(as_of: DateTime<Utc>, position: usize, key: SortKey) -> Self {
        Self {
            as_of,
            position,
            key,
        }
    }

    pub fn encode(&self) -> String {
        let cursor_str = format!(
            "{}:{}:{}:{}:{}",
            self.as_of.timestamp_millis(),
            self.position,
            self.key.score_key,
            self.key.published_at_ms,
            self.key.id
        );
        general_purpose::STANDARD.encode(cursor_str)
    }

    pub fn decode(cursor: &str) -> Result<Self> {
        let decoded = general_purpose::STANDARD
            .decode(cursor)
            .map_err(|_| RankingError::InvalidCursor("Invalid cursor format".to_string()))?;
        let cursor_str = String::from_utf8(decoded)
            .map_err(|_| RankingError::InvalidCursor("Invalid cursor encoding".to_string()))?;

        let mut parts = cursor_str.splitn(5, ':');
        let (Some(as_of), Some(position), Some(score), Some(published), Some(id)) = (
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
        ) else {
            return Err(RankingError::InvalidCursor(
                "Cursor must be as_of:position:score:timestamp:id".to_string(),
            ));
        };

        let as_of = as_of
            .parse::<i64>()
            .ok()
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
            .ok_or_else(|| RankingError::InvalidCursor("Invalid cursor snapshot time".to_string()))?;
        let position = position
            .parse::<usize>()
            .map_err(|_| RankingError::InvalidCursor("Invalid cursor position".to_string()))?;
        let score_key = score
            .parse::<i64>()
            .map_err(|_| RankingError::InvalidCursor("Invalid cursor score".to_string()))?;
        let published_at_ms = published
            .parse::<i64>()
            .map_err(|_| RankingError::InvalidCursor("Invalid cursor timestamp".to_string()))?;

        Ok(Self {
            as_of,
            position,
            key: SortKey {
                score_key,
                published_at_ms,
                id: id.to_string(),
            },
        })
    }

    /// Index in `sequence` where the page following this cursor starts.
    ///
    /// Normally that is just past the item carrying the cursor key. If that
    /// item has left the pool, everything before it has shifted down by one,
    /// so the page resumes one position earlier than recorded.
    pub fn resume_position(&self, sequence: &[ScoredItem]) -> usize {
        if let Some(idx) = sequence.iter().position(|s| s.key == self.key) {
            return idx + 1;
        }

        debug!(
            cursor_id = %self.key.id,
            position = self.position,
            "Cursor item no longer in pool"
        );
        self.position.saturating_sub(1).min(sequence.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ContentItem, PartnerTrustTier, SubScores};

    fn published() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 14, 8, 30, 0).unwrap()
    }

    fn key(id: &str) -> SortKey {
        SortKey::new(0.731, published(), id)
    }

    fn scored(id: &str) -> ScoredItem {
        ScoredItem {
            item: ContentItem {
                id: id.to_string(),
                published_at: published(),
                partner_trust_tier: PartnerTrustTier::Verified,
                quality_score: 0.5,
                engagement: Default::default(),
                geo_tags: Default::default(),
                category_tags: Default::default(),
                boost_weight: None,
            },
            score: 0.731,
            breakdown: SubScores::default(),
            key: key(id),
        }
    }

    #[test]
    fn test_cursor_round_trip_with_colon_in_id() {
        let as_of = Utc.with_ymd_and_hms(2026, 2, 15, 1, 2, 3).unwrap();
        let cursor = FeedCursor::new(as_of, 20, key("listing:42:video"));
        let decoded = FeedCursor::decode(&cursor.encode()).unwrap();
        assert_eq!(decoded, cursor);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            FeedCursor::decode("%%%not-base64"),
            Err(RankingError::InvalidCursor(_))
        ));

        let missing_parts = general_purpose::STANDARD.encode("12345:3");
        assert!(matches!(
            FeedCursor::decode(&missing_parts),
            Err(RankingError::InvalidCursor(_))
        ));

        let bad_position = general_purpose::STANDARD.encode("0:-1:5:0:item");
        assert!(matches!(
            FeedCursor::decode(&bad_position),
            Err(RankingError::InvalidCursor(_))
        ));

        let bad_score = general_purpose::STANDARD.encode("0:1:high:0:item");
        assert!(matches!(
            FeedCursor::decode(&bad_score),
            Err(RankingError::InvalidCursor(_))
        ));
    }

    #[test]
    fn test_resume_after_cursor_item() {
        let sequence = vec![scored("a"), scored("b"), scored("c")];
        let cursor = FeedCursor::new(published(), 2, key("b"));
        assert_eq!(cursor.resume_position(&sequence), 2);
    }

    #[test]
    fn test_resume_when_cursor_item_removed() {
        // "b" was served at position 1 and has since left the pool
        let sequence = vec![scored("a"), scored("c")];
        let cursor = FeedCursor::new(published(), 2, key("b"));
        assert_eq!(cursor.resume_position(&sequence), 1);

        let cursor = FeedCursor::new(published(), 9, key("b"));
        assert_eq!(cursor.resume_position(&sequence), 2);
    }
}

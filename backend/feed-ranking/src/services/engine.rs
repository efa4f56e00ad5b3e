use crate::config::RankingConfig;
use crate::models::{ContentItem, RankOptions, RankedPage, RankedResult, ViewerContext};
use crate::services::diversity::DiversityLayer;
use crate::services::pagination::FeedCursor;
use crate::services::ranking::{RankingError, RankingLayer, Result, ScoredItem};
use chrono::{DateTime, Utc};
use tracing::info;

/// Feed Ranking Engine
///
/// Scoring → diversity deferral → cursor pagination. Pure and stateless: the
/// same items, viewer, options and request time always produce the same page.
pub struct FeedRankingEngine {
    ranking_layer: RankingLayer,
    diversity_layer: DiversityLayer,
}

impl Default for FeedRankingEngine {
    fn default() -> Self {
        Self::new(RankingConfig::default())
    }
}

impl FeedRankingEngine {
    pub fn new(config: RankingConfig) -> Self {
        let diversity_layer = DiversityLayer::new(config.diversity_cap);
        Self {
            ranking_layer: RankingLayer::new(config),
            diversity_layer,
        }
    }

    /// Rank against the current wall-clock time. Follow-up pages reuse the
    /// snapshot time carried in their cursor.
    pub fn rank(
        &self,
        items: Vec<ContentItem>,
        viewer: &ViewerContext,
        options: &RankOptions,
    ) -> Result<RankedPage> {
        self.rank_at(items, viewer, options, Utc::now())
    }

    /// Rank with recency measured against `now`, or against the cursor's
    /// snapshot time when a cursor is present.
    pub fn rank_at(
        &self,
        items: Vec<ContentItem>,
        viewer: &ViewerContext,
        options: &RankOptions,
        now: DateTime<Utc>,
    ) -> Result<RankedPage> {
        validate_options(options)?;
        let cursor = options
            .cursor
            .as_deref()
            .filter(|c| !c.is_empty())
            .map(FeedCursor::decode)
            .transpose()?;

        if items.is_empty() {
            return Ok(RankedPage::empty());
        }

        let pool_size = items.len();
        let as_of = cursor.as_ref().map_or(now, |c| c.as_of);

        // 1. Ranking 打分排序
        let ranked = self.ranking_layer.rank_items(items, viewer, as_of);

        // 2. Diversity 重排
        let sequence = self
            .diversity_layer
            .rerank(ranked, options.diversity_window as usize);

        // 3. Pagination 分頁
        let start = cursor
            .as_ref()
            .map_or(0, |c| c.resume_position(&sequence));
        let page_size = options.page_size as usize;
        let end = start.saturating_add(page_size).min(sequence.len());
        let has_more = end < sequence.len();
        let page: Vec<ScoredItem> = sequence.into_iter().skip(start).take(end - start).collect();

        let next_cursor = if has_more {
            page.last()
                .map(|last| FeedCursor::new(as_of, end, last.key.clone()).encode())
        } else {
            None
        };

        info!(
            viewer_id = viewer.viewer_id.as_deref().unwrap_or("anonymous"),
            anonymous = viewer.is_anonymous(),
            pool_size = pool_size,
            start = start,
            page_size = page.len(),
            resumed = cursor.is_some(),
            has_more = has_more,
            "Feed page ranked"
        );

        let results = page
            .into_iter()
            .enumerate()
            .map(|(rank, scored)| RankedResult {
                item_id: scored.item.id,
                score: scored.score,
                rank,
                breakdown: scored.breakdown,
            })
            .collect();

        Ok(RankedPage {
            results,
            next_cursor,
        })
    }
}

fn validate_options(options: &RankOptions) -> Result<()> {
    if options.page_size == 0 {
        return Err(RankingError::InvalidOptions(
            "page_size must be positive".to_string(),
        ));
    }
    if options.diversity_window == 0 {
        return Err(RankingError::InvalidOptions(
            "diversity_window must be positive".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PartnerTrustTier;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    fn item(id: &str, quality: f64) -> ContentItem {
        ContentItem {
            id: id.to_string(),
            published_at: now() - Duration::days(2),
            partner_trust_tier: PartnerTrustTier::Verified,
            quality_score: quality,
            engagement: Default::default(),
            geo_tags: Default::default(),
            category_tags: [id.to_string()].into_iter().collect(),
            boost_weight: None,
        }
    }

    #[test]
    fn test_invalid_options_rejected_before_scoring() {
        let engine = FeedRankingEngine::default();
        let viewer = ViewerContext::anonymous();

        let err = engine
            .rank_at(vec![item("a", 0.5)], &viewer, &RankOptions::new(0, 4), now())
            .unwrap_err();
        assert!(matches!(err, RankingError::InvalidOptions(_)));

        let err = engine
            .rank_at(vec![], &viewer, &RankOptions::new(10, 0), now())
            .unwrap_err();
        assert!(matches!(err, RankingError::InvalidOptions(_)));
    }

    #[test]
    fn test_invalid_cursor_rejected() {
        let engine = FeedRankingEngine::default();
        let options = RankOptions::new(10, 4).with_cursor("!!!");

        let err = engine
            .rank_at(vec![item("a", 0.5)], &ViewerContext::anonymous(), &options, now())
            .unwrap_err();
        assert!(matches!(err, RankingError::InvalidCursor(_)));
    }

    #[test]
    fn test_empty_cursor_string_is_first_page() {
        let engine = FeedRankingEngine::default();
        let options = RankOptions::new(10, 4).with_cursor("");

        let page = engine
            .rank_at(vec![item("a", 0.5)], &ViewerContext::anonymous(), &options, now())
            .unwrap();
        assert_eq!(page.results.len(), 1);
    }

    #[test]
    fn test_last_page_has_no_cursor() {
        let engine = FeedRankingEngine::default();
        let items = vec![item("a", 0.9), item("b", 0.5), item("c", 0.1)];

        let page = engine
            .rank_at(items.clone(), &ViewerContext::anonymous(), &RankOptions::new(3, 4), now())
            .unwrap();
        assert_eq!(page.results.len(), 3);
        assert!(page.next_cursor.is_none());

        let page = engine
            .rank_at(items, &ViewerContext::anonymous(), &RankOptions::new(2, 4), now())
            .unwrap();
        assert_eq!(page.results.len(), 2);
        assert!(page.next_cursor.is_some());
    }

    #[test]
    fn test_missing_cursor_item_resumes_in_place() {
        let engine = FeedRankingEngine::default();
        let viewer = ViewerContext::anonymous();
        let items = vec![item("a", 0.9), item("b", 0.5), item("c", 0.1)];

        let first = engine
            .rank_at(items.clone(), &viewer, &RankOptions::new(1, 4), now())
            .unwrap();
        assert_eq!(first.results[0].item_id, "a");
        let cursor = first.next_cursor.unwrap();

        // "a" removed from the pool between page requests
        let rest: Vec<_> = items.into_iter().filter(|i| i.id != "a").collect();
        let second = engine
            .rank_at(rest, &viewer, &RankOptions::new(5, 4).with_cursor(cursor), now())
            .unwrap();

        let ids: Vec<_> = second.results.iter().map(|r| r.item_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c"]);
    }

    #[test]
    fn test_follow_up_page_scored_at_snapshot_time() {
        let engine = FeedRankingEngine::default();
        let viewer = ViewerContext::anonymous();
        let items = vec![item("a", 0.9), item("b", 0.5), item("c", 0.1)];

        let first = engine
            .rank_at(items.clone(), &viewer, &RankOptions::new(1, 4), now())
            .unwrap();
        let cursor = first.next_cursor.unwrap();
        assert_eq!(FeedCursor::decode(&cursor).unwrap().as_of, now());

        let later = now() + Duration::days(30);
        let second = engine
            .rank_at(items.clone(), &viewer, &RankOptions::new(1, 4).with_cursor(cursor), later)
            .unwrap();
        let full = engine
            .rank_at(items, &viewer, &RankOptions::new(3, 4), now())
            .unwrap();

        assert_eq!(second.results[0].item_id, "b");
        assert_eq!(second.results[0].score, full.results[1].score);
        assert_eq!(
            FeedCursor::decode(&second.next_cursor.unwrap()).unwrap().as_of,
            now()
        );
    }
}

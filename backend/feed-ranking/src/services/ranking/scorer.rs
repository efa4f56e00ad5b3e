/// Candidate Scoring Module
///
/// Weighted linear scoring over pool-calibrated sub-scores.
use crate::config::RankingConfig;
use crate::models::{ContentItem, SubScores, ViewerContext};
use crate::utils::{exponential_decay, normalize_score};
use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use tracing::debug;

/// Scores closer than this compare equal.
pub const SCORE_EPSILON: f64 = 1e-9;

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Total sort key: score desc, then published_at desc, then id asc.
///
/// The score is held on a fixed `SCORE_EPSILON` grid so that equality within
/// epsilon stays transitive and the key survives a cursor round trip exactly.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SortKey {
    pub score_key: i64,
    pub published_at_ms: i64,
    pub id: String,
}

impl SortKey {
    pub fn new(score: f64, published_at: DateTime<Utc>, id: impl Into<String>) -> Self {
        Self {
            score_key: quantize_score(score),
            published_at_ms: published_at.timestamp_millis(),
            id: id.into(),
        }
    }
}

impl Ord for SortKey {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .score_key
            .cmp(&self.score_key)
            .then_with(|| other.published_at_ms.cmp(&self.published_at_ms))
            .then_with(|| self.id.cmp(&other.id))
    }
}

impl PartialOrd for SortKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn quantize_score(score: f64) -> i64 {
    // NaN casts to 0; the adapter keeps non-finite values out of the engine
    (score / SCORE_EPSILON).round() as i64
}

/// Scored content item
#[derive(Debug, Clone)]
pub struct ScoredItem {
    pub item: ContentItem,
    pub score: f64,
    pub breakdown: SubScores,
    pub key: SortKey,
}

/// Ranking Layer - 加權線性打分
pub struct RankingLayer {
    config: RankingConfig,
}

impl Default for RankingLayer {
    fn default() -> Self {
        Self::new(RankingConfig::default())
    }
}

impl RankingLayer {
    pub fn new(config: RankingConfig) -> Self {
        Self { config }
    }

    /// Score every item in the pool and return them in total sort order.
    pub fn rank_items(
        &self,
        items: Vec<ContentItem>,
        viewer: &ViewerContext,
        now: DateTime<Utc>,
    ) -> Vec<ScoredItem> {
        if items.is_empty() {
            return Vec::new();
        }

        // Interest is the only unbounded signal, so it is calibrated to the pool
        let raw_interest: Vec<f64> = items
            .iter()
            .map(|item| self.compute_raw_interest(item, viewer))
            .collect();
        let (min, max) = raw_interest
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });

        let mut scored: Vec<ScoredItem> = items
            .into_iter()
            .zip(raw_interest)
            .map(|(item, raw)| {
                let breakdown = SubScores {
                    user_interest: normalize_score(raw, min, max),
                    content_quality: item.quality_score,
                    local_relevance: self.compute_local_relevance(&item, viewer),
                    recency: self.compute_recency_score(item.published_at, now),
                    partner_trust: self.config.trust_scale.score(item.partner_trust_tier),
                    boost_multiplier: item.boost_multiplier(),
                };
                let score = self.compute_score(&breakdown);

                debug!(
                    item_id = %item.id,
                    tier = item.partner_trust_tier.as_str(),
                    interest = breakdown.user_interest,
                    quality = breakdown.content_quality,
                    locality = breakdown.local_relevance,
                    recency = breakdown.recency,
                    trust = breakdown.partner_trust,
                    score = score,
                    "Item scored"
                );

                let key = SortKey::new(score, item.published_at, item.id.as_str());
                ScoredItem {
                    item,
                    score,
                    breakdown,
                    key,
                }
            })
            .collect();

        scored.sort_by(|a, b| a.key.cmp(&b.key));

        debug!(
            scored_count = scored.len(),
            top_score = scored.first().map(|s| s.score),
            "Scoring complete"
        );

        scored
    }

    /// Weighted sum of the sub-scores, amplified by the boost multiplier.
    pub fn compute_score(&self, s: &SubScores) -> f64 {
        let w = &self.config.weights;
        let base = w.user_interest * s.user_interest
            + w.content_quality * s.content_quality
            + w.local_relevance * s.local_relevance
            + w.recency * s.recency
            + w.partner_trust * s.partner_trust;

        base * s.boost_multiplier
    }

    /// Dot product of the interest vector with the item's tag indicator vector,
    /// over the interest vector's L2 magnitude. 0 for an empty vector.
    fn compute_raw_interest(&self, item: &ContentItem, viewer: &ViewerContext) -> f64 {
        let magnitude = viewer
            .interest_vector
            .values()
            .map(|w| w * w)
            .sum::<f64>()
            .sqrt();
        if !(magnitude.is_finite() && magnitude > 0.0) {
            return 0.0;
        }

        let dot: f64 = item
            .category_tags
            .union(&item.geo_tags)
            .filter_map(|tag| viewer.interest_vector.get(tag))
            .sum();

        dot / magnitude
    }

    fn compute_local_relevance(&self, item: &ContentItem, viewer: &ViewerContext) -> f64 {
        match viewer.location_hint.as_deref() {
            None => 0.5,
            Some(_) if item.geo_tags.is_empty() => 0.5,
            Some(location) if item.geo_tags.contains(location) => 1.0,
            Some(_) => 0.0,
        }
    }

    /// 時效分數：半衰期指數衰減，未來時間視為剛發布
    fn compute_recency_score(&self, published_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
        let age_days = (now - published_at).num_milliseconds().max(0) as f64 / MILLIS_PER_DAY;
        exponential_decay(age_days, self.config.recency_half_life_days)
    }
}

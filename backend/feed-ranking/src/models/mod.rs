use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Publishing partner standing, set by the external verification process.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PartnerTrustTier {
    Unverified,
    Verified,
    Premium,
}

impl PartnerTrustTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            PartnerTrustTier::Unverified => "unverified",
            PartnerTrustTier::Verified => "verified",
            PartnerTrustTier::Premium => "premium",
        }
    }

    /// Parse the tier label used by the content repository (case-insensitive).
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "unverified" => Some(PartnerTrustTier::Unverified),
            "verified" => Some(PartnerTrustTier::Verified),
            "premium" => Some(PartnerTrustTier::Premium),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EngagementCounts {
    pub views: u64,
    pub unique_viewers: u64,
    pub completions: u64,
    pub saves: u64,
    pub shares: u64,
}

/// An eligible content item. Already moderation/visibility/expiry filtered.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ContentItem {
    pub id: String,
    pub published_at: DateTime<Utc>,
    pub partner_trust_tier: PartnerTrustTier,
    /// Externally computed, in [0, 1]
    pub quality_score: f64,
    #[serde(default)]
    pub engagement: EngagementCounts,
    #[serde(default)]
    pub geo_tags: BTreeSet<String>,
    #[serde(default)]
    pub category_tags: BTreeSet<String>,
    /// Active paid promotion multiplier; `None` when no boost is running
    #[serde(default)]
    pub boost_weight: Option<f64>,
}

impl ContentItem {
    /// Boost multiplier applied after the weighted sum (1.0 when unboosted).
    pub fn boost_multiplier(&self) -> f64 {
        match self.boost_weight {
            Some(boost) if boost.is_finite() && boost > 0.0 => 1.0 + boost,
            _ => 1.0,
        }
    }

    /// Diversity grouping key: partner tier plus the full category set.
    pub fn diversity_group(&self) -> DiversityGroup<'_> {
        DiversityGroup {
            tier: self.partner_trust_tier,
            categories: &self.category_tags,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DiversityGroup<'a> {
    pub tier: PartnerTrustTier,
    pub categories: &'a BTreeSet<String>,
}

/// Per-request viewer context. Empty interest vector for new/anonymous viewers.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ViewerContext {
    #[serde(default)]
    pub viewer_id: Option<String>,
    #[serde(default)]
    pub interest_vector: BTreeMap<String, f64>,
    #[serde(default)]
    pub location_hint: Option<String>,
}

impl ViewerContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn is_anonymous(&self) -> bool {
        self.viewer_id.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RankOptions {
    pub page_size: u32,
    #[serde(default)]
    pub cursor: Option<String>,
    pub diversity_window: u32,
}

impl RankOptions {
    pub fn new(page_size: u32, diversity_window: u32) -> Self {
        Self {
            page_size,
            cursor: None,
            diversity_window,
        }
    }

    pub fn with_cursor(mut self, cursor: impl Into<String>) -> Self {
        self.cursor = Some(cursor.into());
        self
    }
}

/// The five sub-scores behind a composite score, each in [0, 1].
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SubScores {
    pub user_interest: f64,
    pub content_quality: f64,
    pub local_relevance: f64,
    pub recency: f64,
    pub partner_trust: f64,
    pub boost_multiplier: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RankedResult {
    pub item_id: String,
    pub score: f64,
    /// 0-based position within the returned page
    pub rank: usize,
    pub breakdown: SubScores,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RankedPage {
    pub results: Vec<RankedResult>,
    pub next_cursor: Option<String>,
}

impl RankedPage {
    pub fn empty() -> Self {
        Self::default()
    }
}

//! Content repository rows → typed [`ContentItem`]s.
//!
//! Rows arrive as loosely-typed JSON. All presence and parse checks live here
//! so the engine only ever sees well-formed values.

use crate::models::{ContentItem, EngagementCounts, PartnerTrustTier};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeSet, HashSet};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MalformedItem {
    #[error("content row has no id")]
    MissingId,

    #[error("content row {0} has no published_at")]
    MissingPublishedAt(String),

    #[error("content row {id} has unparseable published_at {value:?}")]
    InvalidPublishedAt { id: String, value: String },
}

/// A content row as the repository hands it over. Every field may be absent.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentRow {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub published_at: Option<String>,
    #[serde(default)]
    pub partner_trust_tier: Option<String>,
    #[serde(default)]
    pub quality_score: Option<f64>,
    #[serde(default)]
    pub engagement_counts: Option<EngagementRow>,
    #[serde(default)]
    pub geo_tags: Option<Vec<String>>,
    #[serde(default)]
    pub category_tags: Option<Vec<String>>,
    #[serde(default)]
    pub boost_weight: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngagementRow {
    #[serde(default)]
    pub views: Option<u64>,
    #[serde(default)]
    pub unique_viewers: Option<u64>,
    #[serde(default)]
    pub completions: Option<u64>,
    #[serde(default)]
    pub saves: Option<u64>,
    #[serde(default)]
    pub shares: Option<u64>,
}

impl From<EngagementRow> for EngagementCounts {
    fn from(row: EngagementRow) -> Self {
        Self {
            views: row.views.unwrap_or(0),
            unique_viewers: row.unique_viewers.unwrap_or(0),
            completions: row.completions.unwrap_or(0),
            saves: row.saves.unwrap_or(0),
            shares: row.shares.unwrap_or(0),
        }
    }
}

impl ContentRow {
    pub fn into_item(self) -> Result<ContentItem, MalformedItem> {
        let id = self
            .id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .ok_or(MalformedItem::MissingId)?;

        let raw_published = self
            .published_at
            .ok_or_else(|| MalformedItem::MissingPublishedAt(id.clone()))?;
        let published_at = DateTime::parse_from_rfc3339(raw_published.trim())
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|_| MalformedItem::InvalidPublishedAt {
                id: id.clone(),
                value: raw_published.clone(),
            })?;

        let partner_trust_tier = match self.partner_trust_tier.as_deref() {
            None => PartnerTrustTier::Unverified,
            Some(label) => PartnerTrustTier::parse(label).unwrap_or_else(|| {
                warn!(item_id = %id, tier = label, "Unknown partner trust tier, treating as unverified");
                PartnerTrustTier::Unverified
            }),
        };

        let quality_score = match self.quality_score {
            Some(q) if q.is_finite() => q.clamp(0.0, 1.0),
            _ => 0.0,
        };

        let boost_weight = self.boost_weight.filter(|b| b.is_finite() && *b > 0.0);

        Ok(ContentItem {
            id,
            published_at,
            partner_trust_tier,
            quality_score,
            engagement: self
                .engagement_counts
                .map(EngagementCounts::from)
                .unwrap_or_default(),
            geo_tags: collect_tags(self.geo_tags),
            category_tags: collect_tags(self.category_tags),
            boost_weight,
        })
    }
}

fn collect_tags(tags: Option<Vec<String>>) -> BTreeSet<String> {
    tags.unwrap_or_default()
        .into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Convert a batch of raw rows, skipping malformed rows and repeated ids so a
/// single bad record cannot fail the whole page.
///
/// Rows are decoded one at a time: a field of the wrong JSON type only costs
/// that row.
pub fn items_from_rows(rows: Vec<Value>) -> Vec<ContentItem> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut items = Vec::with_capacity(rows.len());

    for (position, raw) in rows.into_iter().enumerate() {
        let row = match serde_json::from_value::<ContentRow>(raw) {
            Ok(row) => row,
            Err(e) => {
                warn!(position = position, error = %e, "Skipping undecodable content row");
                continue;
            }
        };

        match row.into_item() {
            Ok(item) => {
                if seen.insert(item.id.clone()) {
                    items.push(item);
                } else {
                    warn!(item_id = %item.id, "Duplicate content id in pool, skipping");
                }
            }
            Err(e) => warn!(error = %e, "Skipping malformed content row"),
        }
    }

    items
}

pub mod adapter;
pub mod config;
pub mod models;
pub mod services;
pub mod utils;

pub use adapter::{items_from_rows, ContentRow, MalformedItem};
pub use config::{Config, RankingConfig, ScoringWeights, TrustTierScale};
pub use models::{
    ContentItem, PartnerTrustTier, RankOptions, RankedPage, RankedResult, ViewerContext,
};
pub use services::{DiversityLayer, FeedCursor, FeedRankingEngine, RankingError, RankingLayer};

/// Ranking Module
///
/// Scores an eligible content pool against a viewer context and puts it in a
/// deterministic total order.
///
/// # Workflow
/// 1. Compute five sub-scores per item (interest, quality, locality, recency, trust)
/// 2. Min-max normalize the interest signal within the pool
/// 3. Weighted sum, then apply the paid boost multiplier
/// 4. Sort by (score desc, published_at desc, id asc)
pub mod scorer;

pub use scorer::{RankingLayer, ScoredItem, SortKey, SCORE_EPSILON};

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RankingError {
    #[error("Invalid options: {0}")]
    InvalidOptions(String),

    #[error("Invalid cursor: {0}")]
    InvalidCursor(String),
}

pub type Result<T> = std::result::Result<T, RankingError>;

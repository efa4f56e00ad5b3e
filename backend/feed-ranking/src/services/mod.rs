pub mod diversity;
pub mod engine;
pub mod pagination;
pub mod ranking;

pub use diversity::DiversityLayer;
pub use engine::FeedRankingEngine;
pub use pagination::FeedCursor;
pub use ranking::{RankingError, RankingLayer};

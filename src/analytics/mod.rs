//! Performance aggregation, heuristic difficulty scoring and the
//! recommendation rules built on top of them.

pub mod difficulty;
pub mod insights;
pub mod performance;

pub use difficulty::{
    score_difficulty, score_distribution, CoarseTier, DifficultyAnalysis, DifficultyTier,
    DistributionAnalysis,
};
pub use performance::{aggregate, aggregate_with_minimum, find_common_mistakes, CommonMistake, PerformanceSummary};

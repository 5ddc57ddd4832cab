//! Cluster-based link recommendation.

pub mod recommend;

pub use recommend::{
    recommend_links, LinkConfig, LinkRecommendation, RecommendationStatus,
};

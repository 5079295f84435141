//! # fsmatch Matcher
//!
//! Scores blocked record pairs with a fitted [`MixtureModel`] and collects
//! them into a [`ScoreMap`] that can be queried by score and written to a
//! [`MatchSink`].
//!
//! [`MixtureModel`]: fsmatch_model::MixtureModel

pub mod engine;
pub mod score_map;
pub mod sink;

pub use engine::{MatchConfig, MatchStats, Matcher, WORK_THRESHOLD};
pub use score_map::{Bucket, MatchRecord, Neighbourhood, ScoreMap};
pub use sink::{MatchSink, MemorySink};

//! Petition feed scoring engine.
//!
//! Combines vote activity, comment activity and submission recency into one
//! comparable score per petition. Ages are measured against a fixed epoch in
//! 2074, stale activity (more than 30 days after approval) is decayed, and
//! votes and comments are folded into running accumulators by the caller or
//! by [`feed::rank_feed`].
//!
//! Zero I/O — pure math with no opinions about storage or transport.

pub mod config;
pub mod constants;
pub mod error;
pub mod feed;
pub mod scorer;
pub mod snapshot;
pub mod time;

pub use config::ScoringConfig;
pub use constants::{
    BOOST_WEIGHT, COMMENT_DECAY_CONSTANT, COMMENT_WEIGHT, EPOCH_MILLIS, MS_PER_DAY,
    STALE_AFTER_DAYS, VOTE_DECAY_CONSTANT, VOTE_WEIGHT,
};
pub use error::{Result, ScoreError};
pub use feed::{
    CommentEvent, FailurePolicy, PetitionActivity, RankedFeed, RankedPetition, ScoreBreakdown,
    UnrankedPetition, VoteEvent, rank_feed, score_petition,
};
pub use scorer::{
    Scorer, VoteType, calculate_comment_velocity, calculate_novelty_boost,
    calculate_vote_velocity,
};
pub use snapshot::{
    CURRENT_VERSION, FeedSnapshot, export_ranking, export_snapshot, import_snapshot,
};
pub use time::{RawTimestamp, Timestamp, day_difference};

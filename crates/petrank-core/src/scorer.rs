//! Petition scoring: time-weight, staleness, novelty boost, and the vote /
//! comment velocity folds.
//!
//! Ages are measured back from a fixed epoch in 2074 rather than from "now",
//! so an instant closer to the epoch carries a larger weight:
//!
//! ```text
//! age_days    = floor((epoch - t) / 1 day)
//! time_weight = 1 / (age_days + 1)
//! ```
//!
//! Every operation returns `Err` instead of a NaN or infinite score.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::ScoringConfig;
use crate::error::{Result, ScoreError};
use crate::time::{Timestamp, day_difference};

/// Polarity of a vote.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum VoteType {
    Up,
    Down,
}

impl VoteType {
    pub fn sign(self) -> f64 {
        match self {
            VoteType::Up => 1.0,
            VoteType::Down => -1.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            VoteType::Up => "up",
            VoteType::Down => "down",
        }
    }
}

impl FromStr for VoteType {
    type Err = ScoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "up" => Ok(VoteType::Up),
            "down" => Ok(VoteType::Down),
            other => Err(ScoreError::InvalidVoteType(other.to_string())),
        }
    }
}

impl TryFrom<String> for VoteType {
    type Error = ScoreError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<VoteType> for String {
    fn from(v: VoteType) -> Self {
        v.as_str().to_string()
    }
}

impl fmt::Display for VoteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stateless scorer bound to one immutable configuration.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Scorer {
    config: ScoringConfig,
}

impl Default for Scorer {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl Scorer {
    pub const DEFAULT: Scorer = Scorer {
        config: ScoringConfig::DEFAULT,
    };

    pub fn new(config: ScoringConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Whole days from `instant` up to the epoch. Negative past the epoch.
    pub fn age_days(&self, instant: Timestamp) -> i64 {
        day_difference(self.config.epoch, instant)
    }

    /// `1 / (age_days + 1)`, always in (0, 1].
    ///
    /// Instants past the epoch day have `age_days < 0`; at `-1` the divisor
    /// is zero and below that the weight would leave (0, 1], so both are
    /// rejected.
    pub fn time_weight(&self, instant: Timestamp) -> Result<f64> {
        let age_days = self.age_days(instant);
        if age_days < 0 {
            return Err(ScoreError::DegenerateTimeWeight { age_days });
        }
        Ok(1.0 / (age_days + 1) as f64)
    }

    /// True when the activity happened more than `stale_after_days` whole
    /// days after approval.
    pub fn is_stale(&self, activity: Timestamp, approved: Timestamp) -> bool {
        day_difference(activity, approved) > self.config.stale_after_days
    }

    pub fn novelty_boost(&self, submitted: Timestamp) -> Result<f64> {
        finite(self.config.boost_weight * self.time_weight(submitted)?)
    }

    /// Fold one vote into `current_score`.
    pub fn vote_velocity(
        &self,
        activity: Timestamp,
        approved: Timestamp,
        current_score: f64,
        vote_type: VoteType,
    ) -> Result<f64> {
        let current_score = finite(current_score)?;
        let decay = if self.is_stale(activity, approved) {
            self.config.vote_decay
        } else {
            1.0
        };
        let weight = self.time_weight(activity)?;
        finite(current_score + decay * vote_type.sign() * self.config.vote_weight * weight)
    }

    /// [`Scorer::vote_velocity`] for an untyped `"up"` / `"down"` tag.
    pub fn vote_velocity_str(
        &self,
        activity: Timestamp,
        approved: Timestamp,
        current_score: f64,
        vote_type: &str,
    ) -> Result<f64> {
        let vote_type = vote_type.parse()?;
        self.vote_velocity(activity, approved, current_score, vote_type)
    }

    /// Fold one comment into `current_score`. Never decreases the score.
    pub fn comment_velocity(
        &self,
        activity: Timestamp,
        approved: Timestamp,
        current_score: f64,
    ) -> Result<f64> {
        let current_score = finite(current_score)?;
        let decay = if self.is_stale(activity, approved) {
            self.config.comment_decay
        } else {
            1.0
        };
        let weight = self.time_weight(activity)?;
        finite(current_score + decay * self.config.comment_weight * weight)
    }
}

fn finite(value: f64) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ScoreError::NonFiniteScore(value))
    }
}

/// Novelty boost under the default configuration.
pub fn calculate_novelty_boost(submitted: Timestamp) -> Result<f64> {
    Scorer::DEFAULT.novelty_boost(submitted)
}

/// Vote velocity under the default configuration; `vote_type` must be
/// exactly `"up"` or `"down"`.
pub fn calculate_vote_velocity(
    activity: Timestamp,
    approved: Timestamp,
    current_score: f64,
    vote_type: &str,
) -> Result<f64> {
    Scorer::DEFAULT.vote_velocity_str(activity, approved, current_score, vote_type)
}

/// Comment velocity under the default configuration.
pub fn calculate_comment_velocity(
    activity: Timestamp,
    approved: Timestamp,
    current_score: f64,
) -> Result<f64> {
    Scorer::DEFAULT.comment_velocity(activity, approved, current_score)
}

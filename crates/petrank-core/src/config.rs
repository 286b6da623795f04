//! Scoring configuration: every weight, decay factor and the reference epoch.
//!
//! Built once (defaults or TOML) and never mutated afterwards.

use serde::{Deserialize, Serialize};

use crate::constants::{
    BOOST_WEIGHT, COMMENT_DECAY_CONSTANT, COMMENT_WEIGHT, EPOCH_MILLIS, STALE_AFTER_DAYS,
    VOTE_DECAY_CONSTANT, VOTE_WEIGHT,
};
use crate::error::{Result, ScoreError};
use crate::time::Timestamp;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScoringConfig {
    /// Reference instant that ages are measured back from.
    pub epoch: Timestamp,
    pub boost_weight: f64,
    pub vote_weight: f64,
    pub comment_weight: f64,
    pub vote_decay: f64,
    pub comment_decay: f64,
    /// Activity more than this many whole days after approval is decayed.
    pub stale_after_days: i64,
}

impl ScoringConfig {
    pub const DEFAULT: ScoringConfig = ScoringConfig {
        epoch: Timestamp::from_millis_unchecked(EPOCH_MILLIS),
        boost_weight: BOOST_WEIGHT,
        vote_weight: VOTE_WEIGHT,
        comment_weight: COMMENT_WEIGHT,
        vote_decay: VOTE_DECAY_CONSTANT,
        comment_decay: COMMENT_DECAY_CONSTANT,
        stale_after_days: STALE_AFTER_DAYS,
    };

    /// Parse a TOML document. Missing keys fall back to the defaults.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: ScoringConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| ScoreError::InvalidConfig(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("boost_weight", self.boost_weight),
            ("vote_weight", self.vote_weight),
            ("comment_weight", self.comment_weight),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ScoreError::InvalidConfig(format!(
                    "{name} must be finite and positive, got {value}"
                )));
            }
        }
        for (name, value) in [
            ("vote_decay", self.vote_decay),
            ("comment_decay", self.comment_decay),
        ] {
            if !(value > 0.0 && value <= 1.0) {
                return Err(ScoreError::InvalidConfig(format!(
                    "{name} must be in (0, 1], got {value}"
                )));
            }
        }
        if self.stale_after_days < 0 {
            return Err(ScoreError::InvalidConfig(format!(
                "stale_after_days must be non-negative, got {}",
                self.stale_after_days
            )));
        }
        Ok(())
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

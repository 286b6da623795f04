/// Milliseconds in one day; day differences floor-divide by this.
pub const MS_PER_DAY: i64 = 86_400_000;

/// Reference epoch: 2074-01-01T00:00:00Z as Unix milliseconds.
/// Fixed far in the future so that every real activity has a large positive age.
pub const EPOCH_MILLIS: i64 = 3_281_990_400_000;

/// Multiplier applied to a submission's time-weight.
pub const BOOST_WEIGHT: f64 = 20.0;

/// Multiplier applied to each vote's time-weight.
pub const VOTE_WEIGHT: f64 = 55.0;

/// Multiplier applied to each comment's time-weight.
pub const COMMENT_WEIGHT: f64 = 25.0;

/// Decay factor for votes cast after the staleness threshold.
pub const VOTE_DECAY_CONSTANT: f64 = 0.5;

/// Decay factor for comments posted after the staleness threshold.
pub const COMMENT_DECAY_CONSTANT: f64 = 0.2;

/// Activity more than this many whole days after approval is stale.
pub const STALE_AFTER_DAYS: i64 = 30;

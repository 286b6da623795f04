//! JSON wire format for feed snapshots (input) and ranking reports (output).
//!
//! Field names are camelCase; instants are ISO-8601 strings on output and
//! either ISO-8601 strings or Unix milliseconds on input. Petition instants
//! and vote tags are only checked when the petition is scored.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, ScoreError};
use crate::feed::{PetitionActivity, RankedFeed, ScoreBreakdown};
use crate::time::Timestamp;

pub const CURRENT_VERSION: &str = "1";

/// Already-fetched activity for a set of petitions.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FeedSnapshot {
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<Timestamp>,
    pub petitions: Vec<PetitionActivity>,
}

impl FeedSnapshot {
    pub fn new(petitions: Vec<PetitionActivity>) -> Self {
        Self {
            version: CURRENT_VERSION.to_string(),
            generated_at: Some(Timestamp::now()),
            petitions,
        }
    }
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct WireReport {
    pub version: String,
    pub generated_at: Timestamp,
    pub ranked: Vec<WireRanked>,
    pub unranked: Vec<WireUnranked>,
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct WireRanked {
    pub rank: usize,
    pub id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(flatten)]
    pub score: ScoreBreakdown,
    #[serde(default)]
    pub fallback: bool,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct WireUnranked {
    pub id: Uuid,
    pub error: String,
}

impl From<&RankedFeed> for WireReport {
    fn from(feed: &RankedFeed) -> Self {
        WireReport {
            version: CURRENT_VERSION.to_string(),
            generated_at: Timestamp::now(),
            ranked: feed
                .ranked
                .iter()
                .enumerate()
                .map(|(i, r)| WireRanked {
                    rank: i + 1,
                    id: r.id,
                    title: r.title.clone(),
                    score: r.score,
                    fallback: r.fallback,
                })
                .collect(),
            unranked: feed
                .unranked
                .iter()
                .map(|u| WireUnranked {
                    id: u.id,
                    error: u.error.to_string(),
                })
                .collect(),
        }
    }
}

/// Parse a snapshot, rejecting versions other than [`CURRENT_VERSION`].
pub fn import_snapshot(json: &str) -> Result<FeedSnapshot> {
    let snapshot: FeedSnapshot = serde_json::from_str(json)?;
    if snapshot.version != CURRENT_VERSION {
        return Err(ScoreError::Snapshot(format!(
            "unsupported version {:?} (expected {CURRENT_VERSION:?})",
            snapshot.version
        )));
    }
    Ok(snapshot)
}

pub fn export_snapshot(snapshot: &FeedSnapshot) -> Result<String> {
    Ok(serde_json::to_string_pretty(snapshot)?)
}

pub fn export_ranking(feed: &RankedFeed) -> Result<String> {
    Ok(serde_json::to_string_pretty(&WireReport::from(feed))?)
}

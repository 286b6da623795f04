//! Feed ranking: fold each petition's votes and comments through the
//! [`Scorer`], add its novelty boost, and order the feed by total.
//!
//! Instants and vote tags are kept as they arrived and checked while the
//! petition is scored, so one malformed event only unranks its own petition.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, ScoreError};
use crate::scorer::{Scorer, VoteType};
use crate::time::{RawTimestamp, Timestamp};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VoteEvent {
    pub at: RawTimestamp,
    /// `"up"` or `"down"`; anything else fails when scored.
    #[serde(rename = "type", alias = "voteType")]
    pub vote_type: String,
}

impl VoteEvent {
    pub fn new(at: Timestamp, vote_type: VoteType) -> Self {
        Self {
            at: at.into(),
            vote_type: vote_type.as_str().to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CommentEvent {
    pub at: RawTimestamp,
}

impl CommentEvent {
    pub fn new(at: Timestamp) -> Self {
        Self { at: at.into() }
    }
}

/// Already-fetched activity for one petition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PetitionActivity {
    pub id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub submitted_at: RawTimestamp,
    pub approved_at: RawTimestamp,
    #[serde(default)]
    pub votes: Vec<VoteEvent>,
    #[serde(default)]
    pub comments: Vec<CommentEvent>,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub novelty: f64,
    pub votes: f64,
    pub comments: f64,
    pub total: f64,
}

impl ScoreBreakdown {
    fn fallback(total: f64) -> Self {
        Self {
            novelty: 0.0,
            votes: 0.0,
            comments: 0.0,
            total,
        }
    }
}

/// What to do with a petition whose score cannot be computed.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FailurePolicy {
    /// Leave it out of the ranked list.
    Exclude,
    /// Rank it with this total instead. Must be finite.
    Fallback(f64),
}

impl FailurePolicy {
    pub fn fallback(total: f64) -> Result<Self> {
        if total.is_finite() {
            Ok(FailurePolicy::Fallback(total))
        } else {
            Err(ScoreError::NonFiniteScore(total))
        }
    }

    fn validate(self) -> Result<Self> {
        match self {
            FailurePolicy::Fallback(total) => Self::fallback(total),
            FailurePolicy::Exclude => Ok(self),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RankedPetition {
    pub id: Uuid,
    pub title: Option<String>,
    pub score: ScoreBreakdown,
    /// Scored with the fallback total after a failure.
    pub fallback: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct UnrankedPetition {
    pub id: Uuid,
    pub error: ScoreError,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct RankedFeed {
    /// Highest total first.
    pub ranked: Vec<RankedPetition>,
    /// Every petition whose score failed, whether or not it got a fallback.
    pub unranked: Vec<UnrankedPetition>,
}

/// Fold all of one petition's activity into a score.
///
/// Votes and comments are folded in the order given, each from a zero seed;
/// the first malformed or failing event aborts the whole petition.
pub fn score_petition(scorer: &Scorer, petition: &PetitionActivity) -> Result<ScoreBreakdown> {
    let approved = petition.approved_at.resolve()?;

    let novelty = scorer.novelty_boost(petition.submitted_at.resolve()?)?;
    let votes = petition.votes.iter().try_fold(0.0, |acc, vote| {
        scorer.vote_velocity_str(vote.at.resolve()?, approved, acc, &vote.vote_type)
    })?;
    let comments = petition.comments.iter().try_fold(0.0, |acc, comment| {
        scorer.comment_velocity(comment.at.resolve()?, approved, acc)
    })?;

    let total = novelty + votes + comments;
    if !total.is_finite() {
        return Err(ScoreError::NonFiniteScore(total));
    }

    tracing::debug!(
        petition = %petition.id,
        novelty,
        votes,
        comments,
        total,
        "scored petition"
    );

    Ok(ScoreBreakdown {
        novelty,
        votes,
        comments,
        total,
    })
}

/// Score and order a feed, highest total first. Ties keep input order.
///
/// Only a non-finite fallback total fails the whole call; per-petition
/// failures go to `unranked`.
pub fn rank_feed(
    scorer: &Scorer,
    petitions: &[PetitionActivity],
    policy: FailurePolicy,
) -> Result<RankedFeed> {
    let policy = policy.validate()?;
    let mut feed = RankedFeed::default();

    for petition in petitions {
        match score_petition(scorer, petition) {
            Ok(score) => feed.ranked.push(RankedPetition {
                id: petition.id,
                title: petition.title.clone(),
                score,
                fallback: false,
            }),
            Err(error) => {
                tracing::warn!(petition = %petition.id, "petition unranked: {error}");
                if let FailurePolicy::Fallback(total) = policy {
                    feed.ranked.push(RankedPetition {
                        id: petition.id,
                        title: petition.title.clone(),
                        score: ScoreBreakdown::fallback(total),
                        fallback: true,
                    });
                }
                feed.unranked.push(UnrankedPetition {
                    id: petition.id,
                    error,
                });
            }
        }
    }

    feed.ranked.sort_by(|a, b| descending(a.score.total, b.score.total));

    tracing::info!(
        ranked = feed.ranked.len(),
        unranked = feed.unranked.len(),
        "ranked feed"
    );
    Ok(feed)
}

fn descending(a: f64, b: f64) -> Ordering {
    b.total_cmp(&a)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::EPOCH_MILLIS;
    use approx::assert_relative_eq;

    fn epoch() -> Timestamp {
        Timestamp::from_millis(EPOCH_MILLIS).unwrap()
    }

    fn approved(p: &PetitionActivity) -> Timestamp {
        p.approved_at.resolve().unwrap()
    }

    fn petition(n: u128, approved_days_before_epoch: i64) -> PetitionActivity {
        let approved = epoch().offset_days(-approved_days_before_epoch).unwrap();
        PetitionActivity {
            id: Uuid::from_u128(n),
            title: Some(format!("petition {n}")),
            submitted_at: approved.offset_days(-1).unwrap().into(),
            approved_at: approved.into(),
            votes: Vec::new(),
            comments: Vec::new(),
        }
    }

    fn vote(p: &PetitionActivity, days_after: i64, vote_type: VoteType) -> VoteEvent {
        VoteEvent::new(approved(p).offset_days(days_after).unwrap(), vote_type)
    }

    fn comment(p: &PetitionActivity, days_after: i64) -> CommentEvent {
        CommentEvent::new(approved(p).offset_days(days_after).unwrap())
    }

    fn ids(feed: &RankedFeed) -> Vec<u128> {
        feed.ranked.iter().map(|r| r.id.as_u128()).collect()
    }

    #[test]
    fn test_score_is_sum_of_parts() {
        let s = Scorer::DEFAULT;
        let mut p = petition(1, 100);
        p.votes = vec![vote(&p, 1, VoteType::Up), vote(&p, 35, VoteType::Down)];
        p.comments = vec![comment(&p, 2), comment(&p, 40)];

        let score = score_petition(&s, &p).unwrap();

        let approved = approved(&p);
        let mut votes = 0.0;
        for v in &p.votes {
            let at = v.at.resolve().unwrap();
            votes = s.vote_velocity_str(at, approved, votes, &v.vote_type).unwrap();
        }
        let mut comments = 0.0;
        for c in &p.comments {
            comments = s.comment_velocity(c.at.resolve().unwrap(), approved, comments).unwrap();
        }
        let novelty = s.novelty_boost(p.submitted_at.resolve().unwrap()).unwrap();

        assert_relative_eq!(score.votes, votes);
        assert_relative_eq!(score.comments, comments);
        assert_relative_eq!(score.novelty, novelty);
        assert_relative_eq!(score.total, novelty + votes + comments);
    }

    #[test]
    fn test_no_activity_is_novelty_only() {
        let p = petition(1, 10);
        let score = score_petition(&Scorer::DEFAULT, &p).unwrap();
        assert_eq!(score.votes, 0.0);
        assert_eq!(score.comments, 0.0);
        assert_relative_eq!(score.total, 20.0 / 12.0);
    }

    #[test]
    fn test_rank_orders_descending() {
        let s = Scorer::DEFAULT;
        let quiet = petition(1, 200);
        let mut busy = petition(2, 200);
        busy.votes = (0..5).map(|d| vote(&busy, d, VoteType::Up)).collect();
        let mut unpopular = petition(3, 200);
        unpopular.votes = (0..5).map(|d| vote(&unpopular, d, VoteType::Down)).collect();

        let feed = rank_feed(&s, &[quiet, busy, unpopular], FailurePolicy::Exclude).unwrap();
        assert_eq!(ids(&feed), vec![2, 1, 3]);
        assert!(feed.unranked.is_empty());
    }

    #[test]
    fn test_ties_keep_input_order() {
        let feed = rank_feed(
            &Scorer::DEFAULT,
            &[petition(7, 50), petition(3, 50), petition(5, 50)],
            FailurePolicy::Exclude,
        )
        .unwrap();
        assert_eq!(ids(&feed), vec![7, 3, 5]);
    }

    #[test]
    fn test_failure_excluded() {
        let good = petition(1, 50);
        let mut bad = petition(2, 50);
        bad.comments = vec![CommentEvent::new(epoch().offset_days(3).unwrap())];

        let feed = rank_feed(&Scorer::DEFAULT, &[good, bad], FailurePolicy::Exclude).unwrap();
        assert_eq!(ids(&feed), vec![1]);
        assert_eq!(feed.unranked.len(), 1);
        assert_eq!(feed.unranked[0].id.as_u128(), 2);
        assert_eq!(
            feed.unranked[0].error,
            ScoreError::DegenerateTimeWeight { age_days: -3 }
        );
    }

    #[test]
    fn test_failure_fallback() {
        let good = petition(1, 50);
        let mut bad = petition(2, 50);
        bad.submitted_at = epoch().offset_days(10).unwrap().into();

        let feed = rank_feed(&Scorer::DEFAULT, &[good, bad], FailurePolicy::Fallback(100.0)).unwrap();
        assert_eq!(feed.ranked.len(), 2);
        assert_eq!(feed.ranked[0].id.as_u128(), 2);
        assert!(feed.ranked[0].fallback);
        assert_eq!(feed.ranked[0].score.total, 100.0);
        assert!(!feed.ranked[1].fallback);
        assert_eq!(feed.unranked.len(), 1);
    }

    #[test]
    fn test_bad_vote_tag_unranks_only_its_petition() {
        let good = petition(1, 50);
        let mut bad = petition(2, 50);
        bad.votes = vec![vote(&bad, 1, VoteType::Up)];
        bad.votes[0].vote_type = "sideways".to_string();

        let feed = rank_feed(&Scorer::DEFAULT, &[good.clone(), bad.clone()], FailurePolicy::Exclude)
            .unwrap();
        assert_eq!(ids(&feed), vec![1]);
        assert_eq!(
            feed.unranked[0].error,
            ScoreError::InvalidVoteType("sideways".to_string())
        );

        let feed = rank_feed(&Scorer::DEFAULT, &[good, bad], FailurePolicy::Fallback(0.0)).unwrap();
        assert_eq!(ids(&feed), vec![1, 2]);
        assert!(feed.ranked[1].fallback);
    }

    #[test]
    fn test_bad_instant_unranks_only_its_petition() {
        let good = petition(1, 50);
        let mut bad = petition(2, 50);
        bad.approved_at = RawTimestamp::Text("last tuesday".to_string());
        let mut nan = petition(3, 50);
        nan.comments = vec![CommentEvent {
            at: RawTimestamp::Other(serde_json::Value::Null),
        }];

        let feed = rank_feed(&Scorer::DEFAULT, &[good, bad, nan], FailurePolicy::Exclude).unwrap();
        assert_eq!(ids(&feed), vec![1]);
        assert_eq!(feed.unranked.len(), 2);
        for u in &feed.unranked {
            assert!(
                matches!(u.error, ScoreError::InvalidTimestamp(_)),
                "{:?}",
                u.error
            );
        }
    }

    #[test]
    fn test_non_finite_fallback_rejected() {
        for total in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            assert!(matches!(
                FailurePolicy::fallback(total),
                Err(ScoreError::NonFiniteScore(_))
            ));
            assert!(matches!(
                rank_feed(&Scorer::DEFAULT, &[petition(1, 50)], FailurePolicy::Fallback(total)),
                Err(ScoreError::NonFiniteScore(_))
            ));
        }
        assert_eq!(FailurePolicy::fallback(-2.5), Ok(FailurePolicy::Fallback(-2.5)));
    }

    #[test]
    fn test_petition_json_shape() {
        let json = r#"{
            "id": "00000000-0000-0000-0000-000000000001",
            "submittedAt": "2025-01-01T00:00:00Z",
            "approvedAt": "2025-01-02T00:00:00Z",
            "votes": [{"at": "2025-01-03T00:00:00Z", "type": "up"}],
            "comments": [{"at": 1735862400000}]
        }"#;
        let p: PetitionActivity = serde_json::from_str(json).unwrap();
        assert_eq!(p.id.as_u128(), 1);
        assert_eq!(p.title, None);
        assert_eq!(p.votes[0].vote_type, "up");
        assert_eq!(
            p.comments[0].at.resolve().unwrap().to_string(),
            "2025-01-03T00:00:00Z"
        );
    }

    #[test]
    fn test_petition_json_keeps_bad_vote_for_scoring() {
        let json = r#"{
            "id": "00000000-0000-0000-0000-000000000001",
            "submittedAt": "2025-01-01T00:00:00Z",
            "approvedAt": "2025-01-02T00:00:00Z",
            "votes": [{"at": "2025-01-03T00:00:00Z", "type": "sideways"}]
        }"#;
        let p: PetitionActivity = serde_json::from_str(json).unwrap();
        assert_eq!(
            score_petition(&Scorer::DEFAULT, &p),
            Err(ScoreError::InvalidVoteType("sideways".to_string()))
        );
    }
}

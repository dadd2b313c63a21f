use crate::error::{Result, RewardError};
use aicurate_ledger::{ActivityKind, BadgeType, ProofPoints};
use serde::{Deserialize, Serialize};

/// A triggering event, carrying the caller-requested point amount.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RewardEvent {
    ChallengeCompleted {
        challenge_id: String,
        points: u64,
    },
    QuizCompleted {
        quiz_id: String,
        score: u32,
        points: u64,
    },
    BadgeMinted {
        badge: BadgeType,
        transaction_id: Option<String>,
    },
}

impl RewardEvent {
    pub fn kind(&self) -> ActivityKind {
        match self {
            Self::ChallengeCompleted { .. } => ActivityKind::ChallengeComplete,
            Self::QuizCompleted { .. } => ActivityKind::QuizComplete,
            Self::BadgeMinted { .. } => ActivityKind::BadgeMint,
        }
    }

    /// Source identifier the idempotency key derives from.
    pub fn source_id(&self) -> String {
        match self {
            Self::ChallengeCompleted { challenge_id, .. } => challenge_id.clone(),
            Self::QuizCompleted { quiz_id, .. } => quiz_id.clone(),
            Self::BadgeMinted { badge, .. } => badge.to_string(),
        }
    }

    pub fn description(&self) -> String {
        match self {
            Self::ChallengeCompleted { challenge_id, .. } => {
                format!("Completed challenge {}", challenge_id)
            }
            Self::QuizCompleted { quiz_id, score, .. } => {
                format!("Passed quiz {} with score {}", quiz_id, score)
            }
            Self::BadgeMinted { badge, .. } => format!("Minted {} badge", badge),
        }
    }

    pub fn metadata(&self) -> serde_json::Value {
        match self {
            Self::ChallengeCompleted { challenge_id, points } => {
                serde_json::json!({ "challenge_id": challenge_id, "requested_points": points })
            }
            Self::QuizCompleted {
                quiz_id,
                score,
                points,
            } => {
                serde_json::json!({ "quiz_id": quiz_id, "score": score, "requested_points": points })
            }
            Self::BadgeMinted {
                badge,
                transaction_id,
            } => {
                serde_json::json!({ "badge": badge.to_string(), "transaction_id": transaction_id })
            }
        }
    }
}

/// Per-event ceilings and fixed awards. One authoritative location for the
/// rules; nothing else in the workspace hard-codes point amounts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    pub max_challenge_points: u64,
    pub max_quiz_points: u64,
    pub quiz_pass_score: u32,
    pub badge_mint_points: u64,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            max_challenge_points: 500,
            max_quiz_points: 100,
            quiz_pass_score: 70,
            badge_mint_points: 50,
        }
    }
}

/// Validated point delta plus token eligibility for one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RewardDecision {
    pub points_delta: ProofPoints,
    pub token_eligible: bool,
}

/// Pure mapping from a triggering event to a reward decision. No side
/// effects and deterministic given inputs, so retries are safe.
#[derive(Debug, Clone)]
pub struct RewardPolicy {
    config: PolicyConfig,
}

impl RewardPolicy {
    pub fn new(config: PolicyConfig) -> Self {
        Self { config }
    }

    pub fn evaluate(&self, event: &RewardEvent) -> Result<RewardDecision> {
        match event {
            RewardEvent::ChallengeCompleted { points, .. } => {
                let delta = self.bounded_delta(*points, self.config.max_challenge_points)?;
                Ok(RewardDecision {
                    points_delta: delta,
                    token_eligible: true,
                })
            }
            RewardEvent::QuizCompleted { score, points, .. } => {
                if *score < self.config.quiz_pass_score {
                    return Err(RewardError::InvalidRewardAmount(format!(
                        "Quiz score {} below passing threshold {}",
                        score, self.config.quiz_pass_score
                    )));
                }
                let delta = self.bounded_delta(*points, self.config.max_quiz_points)?;
                Ok(RewardDecision {
                    points_delta: delta,
                    token_eligible: true,
                })
            }
            // Badge awards are fixed by policy, not by the caller.
            RewardEvent::BadgeMinted { .. } => Ok(RewardDecision {
                points_delta: ProofPoints::new(self.config.badge_mint_points),
                token_eligible: true,
            }),
        }
    }

    fn bounded_delta(&self, requested: u64, ceiling: u64) -> Result<ProofPoints> {
        if requested == 0 {
            return Err(RewardError::InvalidRewardAmount(
                "Point delta must be positive".to_string(),
            ));
        }
        if requested > ceiling {
            return Err(RewardError::InvalidRewardAmount(format!(
                "Point delta {} exceeds per-event ceiling {}",
                requested, ceiling
            )));
        }
        Ok(ProofPoints::new(requested))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> RewardPolicy {
        RewardPolicy::new(PolicyConfig::default())
    }

    #[test]
    fn test_challenge_within_ceiling() {
        let decision = policy()
            .evaluate(&RewardEvent::ChallengeCompleted {
                challenge_id: "c1".to_string(),
                points: 100,
            })
            .unwrap();
        assert_eq!(decision.points_delta.value(), 100);
        assert!(decision.token_eligible);
    }

    #[test]
    fn test_zero_and_oversized_deltas_rejected() {
        for points in [0, 501] {
            let err = policy()
                .evaluate(&RewardEvent::ChallengeCompleted {
                    challenge_id: "c1".to_string(),
                    points,
                })
                .unwrap_err();
            assert!(matches!(err, RewardError::InvalidRewardAmount(_)));
        }
    }

    #[test]
    fn test_failed_quiz_earns_nothing() {
        let err = policy()
            .evaluate(&RewardEvent::QuizCompleted {
                quiz_id: "q1".to_string(),
                score: 40,
                points: 50,
            })
            .unwrap_err();
        assert!(matches!(err, RewardError::InvalidRewardAmount(_)));
    }

    #[test]
    fn test_badge_award_is_fixed_by_policy() {
        let decision = policy()
            .evaluate(&RewardEvent::BadgeMinted {
                badge: BadgeType::Pioneer,
                transaction_id: None,
            })
            .unwrap();
        assert_eq!(decision.points_delta.value(), 50);
    }

    #[test]
    fn test_evaluation_is_deterministic() {
        let event = RewardEvent::QuizCompleted {
            quiz_id: "q2".to_string(),
            score: 85,
            points: 80,
        };
        let a = policy().evaluate(&event).unwrap();
        let b = policy().evaluate(&event).unwrap();
        assert_eq!(a, b);
    }
}

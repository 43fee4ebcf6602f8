use crate::arm::{ArmMetadata, ArmStats, ArmStatus, ArmSummary, BanditArm};
use crate::error::ExperimentError;
use chrono::Utc;
use parking_lot::RwLock;
use std::cmp::Ordering;
use std::collections::HashMap;

pub const DEFAULT_EXPLORATION: f64 = std::f64::consts::SQRT_2;
pub const DEFAULT_CONFIDENCE_Z: f64 = 1.96;

/// Thread-safe registry of bandit arms.
///
/// Every mutation takes the write lock for its full duration and every read
/// clones out of the read lock, so callers never observe an arm whose pull count
/// and totals disagree. Ranks and confidence bounds are not stored; they are
/// recomputed from the current stats on each read.
#[derive(Debug)]
pub struct BanditRegistry {
    arms: RwLock<HashMap<String, BanditArm>>,
    exploration: f64,
    confidence_z: f64,
}

impl Default for BanditRegistry {
    fn default() -> Self {
        Self::with_settings(DEFAULT_EXPLORATION, DEFAULT_CONFIDENCE_Z)
    }
}

impl BanditRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(exploration: f64, confidence_z: f64) -> Self {
        Self {
            arms: RwLock::new(HashMap::new()),
            exploration,
            confidence_z,
        }
    }

    /// Registers an arm with zeroed stats.
    ///
    /// Idempotent: an existing arm keeps its stats and metadata. Returns `true`
    /// when the arm was newly created.
    pub fn register_arm(&self, id: &str, metadata: ArmMetadata) -> Result<bool, ExperimentError> {
        if id.is_empty() {
            return Err(ExperimentError::EmptyArmId);
        }
        let mut arms = self.arms.write();
        if arms.contains_key(id) {
            tracing::debug!(arm_id = %id, "Arm already registered; keeping existing stats.");
            return Ok(false);
        }
        arms.insert(
            id.to_string(),
            BanditArm {
                id: id.to_string(),
                metadata,
                stats: ArmStats::new(Utc::now()),
            },
        );
        tracing::info!(arm_id = %id, total_arms = arms.len(), "Registered bandit arm.");
        Ok(true)
    }

    /// Adds one pull with the given reward and returns the updated stats.
    pub fn record_reward(&self, id: &str, reward: f64) -> Result<ArmStats, ExperimentError> {
        if !reward.is_finite() {
            return Err(ExperimentError::InvalidReward {
                arm_id: id.to_string(),
                reward,
            });
        }
        let mut arms = self.arms.write();
        let arm = arms
            .get_mut(id)
            .ok_or_else(|| ExperimentError::ArmNotFound(id.to_string()))?;
        arm.stats.record(reward, Utc::now());
        tracing::debug!(
            arm_id = %id,
            reward,
            pulls = arm.stats.pulls,
            average = arm.stats.average_reward,
            "Recorded reward."
        );
        Ok(arm.stats.clone())
    }

    pub fn get_arm(&self, id: &str) -> Option<BanditArm> {
        self.arms.read().get(id).cloned()
    }

    /// The leaderboard row for a single arm.
    pub fn arm_summary(&self, id: &str) -> Option<ArmSummary> {
        self.list_arms().into_iter().find(|summary| summary.arm.id == id)
    }

    /// Every arm, ranked: pulled arms by descending average reward, then
    /// untested arms. Ties are broken by arm id.
    pub fn list_arms(&self) -> Vec<ArmSummary> {
        let mut arms: Vec<BanditArm> = self.arms.read().values().cloned().collect();
        arms.sort_by(leaderboard_order);

        let mut next_rank = 0;
        arms.into_iter()
            .map(|arm| {
                let rank = (arm.stats.pulls > 0).then(|| {
                    next_rank += 1;
                    next_rank
                });
                ArmSummary {
                    status: ArmStatus::classify(&arm.stats),
                    confidence: arm.stats.confidence_half_width(self.confidence_z),
                    rank,
                    arm,
                }
            })
            .collect()
    }

    /// The pulled arm with the highest average reward. Arms that were never
    /// pulled are not candidates, so this is `None` until some arm has a reward.
    pub fn best_arm(&self) -> Option<BanditArm> {
        let arms = self.arms.read();
        arms.values()
            .filter(|arm| arm.stats.pulls > 0)
            .min_by(|a, b| leaderboard_order(a, b))
            .cloned()
    }

    /// Chooses the next arm to pull with UCB1.
    ///
    /// Untested arms are always played first (in id order). After that the arm
    /// maximizing `average + c * sqrt(ln(total_pulls) / pulls)` is chosen.
    pub fn select_arm(&self) -> Option<String> {
        let arms = self.arms.read();

        let mut untested: Vec<&String> = arms
            .values()
            .filter(|arm| arm.stats.pulls == 0)
            .map(|arm| &arm.id)
            .collect();
        untested.sort();
        if let Some(id) = untested.first() {
            return Some((*id).clone());
        }

        let total_pulls: u64 = arms.values().map(|arm| arm.stats.pulls).sum();
        let log_total = (total_pulls as f64).ln();
        arms.values()
            .map(|arm| {
                let bonus = self.exploration * (log_total / arm.stats.pulls as f64).sqrt();
                (arm, arm.stats.average_reward + bonus)
            })
            .max_by(|(a, score_a), (b, score_b)| {
                score_a
                    .partial_cmp(score_b)
                    .unwrap_or(Ordering::Equal)
                    .then_with(|| b.id.cmp(&a.id))
            })
            .map(|(arm, _)| arm.id.clone())
    }

    /// Removes every arm.
    pub fn clear(&self) {
        let mut arms = self.arms.write();
        let removed = arms.len();
        arms.clear();
        tracing::info!(removed, "Cleared bandit registry.");
    }

    pub fn len(&self) -> usize {
        self.arms.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.arms.read().is_empty()
    }
}

/// Pulled before untested, then higher average first, then id.
fn leaderboard_order(a: &BanditArm, b: &BanditArm) -> Ordering {
    let tested_a = a.stats.pulls > 0;
    let tested_b = b.stats.pulls > 0;
    tested_b
        .cmp(&tested_a)
        .then_with(|| {
            b.stats
                .average_reward
                .partial_cmp(&a.stats.average_reward)
                .unwrap_or(Ordering::Equal)
        })
        .then_with(|| a.id.cmp(&b.id))
}

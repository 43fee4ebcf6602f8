use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Average reward above which an arm is "performing well".
pub const PERFORMING_WELL_THRESHOLD: f64 = 0.7;
/// Average reward above which an arm is "average".
pub const AVERAGE_THRESHOLD: f64 = 0.4;

/// Descriptive information about an arm. Never used in calculations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArmMetadata {
    pub name: String,
    pub description: String,
    pub category: String,
    pub version: String,
}

/// Aggregated reward statistics.
///
/// Invariant: `average_reward == total_reward / pulls` when `pulls > 0`, and
/// `0.0` otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArmStats {
    pub pulls: u64,
    pub total_reward: f64,
    pub average_reward: f64,
    pub last_updated: DateTime<Utc>,
}

impl ArmStats {
    pub(crate) fn new(now: DateTime<Utc>) -> Self {
        Self {
            pulls: 0,
            total_reward: 0.0,
            average_reward: 0.0,
            last_updated: now,
        }
    }

    pub(crate) fn record(&mut self, reward: f64, now: DateTime<Utc>) {
        self.pulls += 1;
        self.total_reward += reward;
        self.average_reward = self.total_reward / self.pulls as f64;
        self.last_updated = now;
    }

    /// Normal-approximation half-width of the confidence interval around the
    /// average reward, treating rewards as success rates in `[0, 1]`:
    /// `z * sqrt(p * (1 - p) / n)`. `None` before the first pull.
    pub fn confidence_half_width(&self, z: f64) -> Option<f64> {
        if self.pulls == 0 {
            return None;
        }
        let p = self.average_reward.clamp(0.0, 1.0);
        Some(z * (p * (1.0 - p) / self.pulls as f64).sqrt())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BanditArm {
    pub id: String,
    pub metadata: ArmMetadata,
    pub stats: ArmStats,
}

/// Display classification of an arm's performance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArmStatus {
    Untested,
    PerformingWell,
    Average,
    Underperforming,
}

impl ArmStatus {
    pub fn classify(stats: &ArmStats) -> Self {
        if stats.pulls == 0 {
            ArmStatus::Untested
        } else if stats.average_reward > PERFORMING_WELL_THRESHOLD {
            ArmStatus::PerformingWell
        } else if stats.average_reward > AVERAGE_THRESHOLD {
            ArmStatus::Average
        } else {
            ArmStatus::Underperforming
        }
    }
}

impl fmt::Display for ArmStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ArmStatus::Untested => "untested",
            ArmStatus::PerformingWell => "performing well",
            ArmStatus::Average => "average",
            ArmStatus::Underperforming => "underperforming",
        };
        f.write_str(label)
    }
}

/// A leaderboard row, derived from the arm's current stats on every read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArmSummary {
    pub arm: BanditArm,
    pub status: ArmStatus,
    /// 1-based position among pulled arms by average reward. `None` if untested.
    pub rank: Option<usize>,
    /// Half-width of the confidence interval around `average_reward`.
    pub confidence: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats_with(rewards: &[f64]) -> ArmStats {
        let mut stats = ArmStats::new(Utc::now());
        for reward in rewards {
            stats.record(*reward, Utc::now());
        }
        stats
    }

    #[test]
    fn status_thresholds() {
        assert_eq!(ArmStatus::classify(&stats_with(&[])), ArmStatus::Untested);
        assert_eq!(ArmStatus::classify(&stats_with(&[0.8])), ArmStatus::PerformingWell);
        assert_eq!(ArmStatus::classify(&stats_with(&[0.7])), ArmStatus::Average);
        assert_eq!(ArmStatus::classify(&stats_with(&[0.5])), ArmStatus::Average);
        assert_eq!(ArmStatus::classify(&stats_with(&[0.4])), ArmStatus::Underperforming);
        assert_eq!(ArmStatus::classify(&stats_with(&[0.0])), ArmStatus::Underperforming);
        assert_eq!(ArmStatus::PerformingWell.to_string(), "performing well");
    }

    #[test]
    fn confidence_narrows_with_more_pulls() {
        let few = stats_with(&[1.0, 0.0]);
        let many = stats_with(&[1.0, 0.0].repeat(50));
        let z = 1.96;
        assert!(few.confidence_half_width(z).unwrap() > many.confidence_half_width(z).unwrap());
        assert_eq!(stats_with(&[]).confidence_half_width(z), None);
    }

    #[test]
    fn average_tracks_total_over_pulls() {
        let stats = stats_with(&[0.2, 0.4, 0.9]);
        assert_eq!(stats.pulls, 3);
        assert!((stats.average_reward - stats.total_reward / 3.0).abs() < 1e-12);
    }
}

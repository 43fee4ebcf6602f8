use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum ExperimentError {
    #[error("Arm '{0}' is not registered")]
    ArmNotFound(String),

    #[error("Arm id must not be empty")]
    EmptyArmId,

    #[error("Reward {reward} for arm '{arm_id}' is not a finite number")]
    InvalidReward { arm_id: String, reward: f64 },
}

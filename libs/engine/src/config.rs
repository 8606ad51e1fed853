use serde::Deserialize;

use rtsim_api::DelayProfile;

use crate::error::EngineError;

/// How emitted timestamps relate to the recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeMode {
    /// Shift every begin time by a constant so the first record looks live.
    #[default]
    Realtime,
    /// Keep the recorded begin times.
    Historic,
}

impl std::str::FromStr for TimeMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "realtime" => Ok(TimeMode::Realtime),
            "historic" => Ok(TimeMode::Historic),
            other => Err(format!("unknown mode '{other}', expected 'realtime' or 'historic'")),
        }
    }
}

impl std::fmt::Display for TimeMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimeMode::Realtime => f.write_str("realtime"),
            TimeMode::Historic => f.write_str("historic"),
        }
    }
}

/// Safety margin subtracted from a pending release time before comparing
/// it with the latest raw end time seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MarginPolicy {
    /// Always zero: release only what is already older than the newest input.
    Zero,
    /// The smallest delay the profile can assign (default included).
    #[default]
    ProfileMin,
}

impl std::str::FromStr for MarginPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "zero" => Ok(MarginPolicy::Zero),
            "profile-min" => Ok(MarginPolicy::ProfileMin),
            other => Err(format!("unknown delay margin '{other}', expected 'zero' or 'profile-min'")),
        }
    }
}

impl std::fmt::Display for MarginPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MarginPolicy::Zero => f.write_str("zero"),
            MarginPolicy::ProfileMin => f.write_str("profile-min"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReorderConfig {
    pub margin: MarginPolicy,
    /// Force-release the oldest entry when more than this many are pending.
    pub max_pending: Option<usize>,
}

impl ReorderConfig {
    pub fn margin_micros(&self, profile: &DelayProfile) -> i64 {
        match self.margin {
            MarginPolicy::Zero => 0,
            MarginPolicy::ProfileMin => profile.min_micros(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PacingConfig {
    /// Logical seconds played per real second.
    pub speed: f64,
    /// Logical minutes to discard from the start of the stream.
    pub jump_minutes: f64,
    pub mode: TimeMode,
    /// Emit records whose size is not the canonical 512 bytes.
    pub allow_oversized: bool,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            speed: 1.0,
            jump_minutes: 0.0,
            mode: TimeMode::Realtime,
            allow_oversized: false,
        }
    }
}

impl PacingConfig {
    pub fn validate(&self) -> Result<(), EngineError> {
        if !self.speed.is_finite() || self.speed <= 0.0 {
            return Err(EngineError::InvalidConfig(format!(
                "speed must be a positive number, got {}",
                self.speed
            )));
        }
        if !self.jump_minutes.is_finite() || self.jump_minutes < 0.0 {
            return Err(EngineError::InvalidConfig(format!(
                "jump must be zero or more minutes, got {}",
                self.jump_minutes
            )));
        }
        Ok(())
    }
}

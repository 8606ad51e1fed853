use std::collections::HashMap;

use crate::error::ReplayError;
use crate::time::{micros_to_secs, secs_to_micros};

/// Per-source artificial delays, fixed for the lifetime of a run.
///
/// Keys are dot-separated source identifiers. A lookup for
/// `GE.APE.00.BHZ` tries `GE.APE.00.BHZ`, `GE.APE.00`, `GE.APE`, `GE`
/// and finally falls back to the default delay, so a profile keyed by
/// `NET.STA` covers every channel of that station.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DelayProfile {
    delays: HashMap<String, i64>,
    default_micros: i64,
}

impl DelayProfile {
    pub fn new(default_secs: f64) -> Result<Self, ReplayError> {
        Ok(Self {
            delays: HashMap::new(),
            default_micros: checked_delay("default", default_secs)?,
        })
    }

    pub fn insert(&mut self, key: impl Into<String>, secs: f64) -> Result<(), ReplayError> {
        let key = key.into();
        let micros = checked_delay(&key, secs)?;
        self.delays.insert(key, micros);
        Ok(())
    }

    pub fn set_default(&mut self, secs: f64) -> Result<(), ReplayError> {
        self.default_micros = checked_delay("default", secs)?;
        Ok(())
    }

    pub fn delay_micros(&self, source_key: &str) -> i64 {
        let mut key = source_key;
        loop {
            if let Some(&d) = self.delays.get(key) {
                return d;
            }
            match key.rfind('.') {
                Some(pos) => key = &key[..pos],
                None => return self.default_micros,
            }
        }
    }

    pub fn delay_secs(&self, source_key: &str) -> f64 {
        micros_to_secs(self.delay_micros(source_key))
    }

    pub fn default_micros(&self) -> i64 {
        self.default_micros
    }

    /// Smallest delay any record can receive (includes the default).
    pub fn min_micros(&self) -> i64 {
        self.delays.values().copied().fold(self.default_micros, i64::min)
    }

    /// Largest delay any record can receive (includes the default).
    pub fn max_micros(&self) -> i64 {
        self.delays.values().copied().fold(self.default_micros, i64::max)
    }

    pub fn spread_micros(&self) -> i64 {
        self.max_micros() - self.min_micros()
    }

    /// Number of explicit (non-default) entries.
    pub fn len(&self) -> usize {
        self.delays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.delays.is_empty()
    }
}

fn checked_delay(key: &str, secs: f64) -> Result<i64, ReplayError> {
    if !secs.is_finite() || secs < 0.0 {
        return Err(ReplayError::config(format!(
            "delay for '{key}' must be a non-negative number of seconds, got {secs}"
        )));
    }
    Ok(secs_to_micros(secs))
}

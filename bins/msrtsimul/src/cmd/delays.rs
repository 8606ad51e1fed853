use std::collections::BTreeMap;

use rtsim_api::{DelayProfile, ReplayError};

/// Key that sets the delay for every source without its own entry.
pub const DEFAULT_KEY: &str = "default";

/// Parse `KEY: SECONDS` lines into `profile`, overwriting existing keys.
///
/// Blank lines and `#` comments are skipped. Anything else that is not
/// exactly one key and one number separated by a colon is an error.
pub fn parse_into(profile: &mut DelayProfile, text: &str) -> Result<(), ReplayError> {
    for (idx, raw) in text.lines().enumerate() {
        let line = raw.split('#').next().unwrap_or_default().trim();
        if line.is_empty() {
            continue;
        }
        parse_line(line)
            .and_then(|(key, secs)| apply(profile, key, secs))
            .map_err(|e| e.context(format_args!("line {}", idx + 1)))?;
    }
    Ok(())
}

fn parse_line(line: &str) -> Result<(&str, f64), ReplayError> {
    let mut parts = line.split(':');
    let (Some(key), Some(value), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(ReplayError::format_err(format!("expected 'KEY: SECONDS', got '{line}'")));
    };
    let key = key.trim();
    if key.is_empty() {
        return Err(ReplayError::format_err("empty key"));
    }
    Ok((key, value.trim().parse()?))
}

fn apply(profile: &mut DelayProfile, key: &str, secs: f64) -> Result<(), ReplayError> {
    if key == DEFAULT_KEY {
        profile.set_default(secs)
    } else {
        profile.insert(key, secs)
    }
}

/// Build the run's delay profile from the delay file and the config's inline
/// table, file entries taking precedence.
///
/// `None` means play without reordering: either nothing was configured or
/// the profile could not be built, which is logged and not fatal.
pub fn resolve(file: Option<&str>, inline: &BTreeMap<String, f64>) -> Option<DelayProfile> {
    if file.is_none() && inline.is_empty() {
        return None;
    }

    let mut profile = DelayProfile::new(0.0).ok()?;
    for (key, &secs) in inline {
        if let Err(e) = apply(&mut profile, key, secs) {
            tracing::warn!(error = %e, "bad inline delay, continuing without delays");
            return None;
        }
    }

    if let Some(path) = file {
        let loaded = std::fs::read_to_string(path)
            .map_err(ReplayError::from)
            .and_then(|text| parse_into(&mut profile, &text));
        if let Err(e) = loaded {
            tracing::warn!(file = %path, error = %e, "error reading delay file, continuing without delays");
            return None;
        }
    }

    tracing::info!(
        entries = profile.len(),
        default_s = rtsim_api::micros_to_secs(profile.default_micros()),
        max_s = rtsim_api::micros_to_secs(profile.max_micros()),
        "loaded delay profile"
    );
    Some(profile)
}

pub const MICROS_PER_SECOND: i64 = 1_000_000;

/// Convert fractional seconds to whole microseconds (rounded).
pub fn secs_to_micros(secs: f64) -> i64 {
    (secs * MICROS_PER_SECOND as f64).round() as i64
}

/// Convert microseconds to fractional seconds.
pub fn micros_to_secs(micros: i64) -> f64 {
    micros as f64 / MICROS_PER_SECOND as f64
}

/// Absolute UTC time, microseconds since the Unix epoch.
///
/// All logical-time arithmetic in the engine (release times, jump
/// thresholds, realtime offsets) is done on the integer microsecond value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp(i64);

/// Broken-down UTC time in the day-of-year form used by SEED BTIME.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrdinalTime {
    pub year: i64,
    /// 1-based day of year.
    pub day_of_year: u32,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
    pub micros: u32,
}

impl Timestamp {
    pub const fn from_micros(micros: i64) -> Self {
        Self(micros)
    }

    pub const fn as_micros(self) -> i64 {
        self.0
    }

    /// Current UTC time from the system clock.
    pub fn now() -> Self {
        let d = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default();
        Self(d.as_micros() as i64)
    }

    /// Shift by a signed number of microseconds.
    pub fn offset_by(self, micros: i64) -> Self {
        Self(self.0.saturating_add(micros))
    }

    /// Signed distance `self - earlier` in microseconds.
    pub fn micros_since(self, earlier: Timestamp) -> i64 {
        self.0.saturating_sub(earlier.0)
    }

    pub fn from_ordinal(t: OrdinalTime) -> Self {
        let day_secs = (t.hour as i64) * 3600 + (t.minute as i64) * 60 + t.second as i64;
        let days = days_from_civil(t.year, 1, 1) + t.day_of_year as i64 - 1;
        Self((days * 86400 + day_secs) * MICROS_PER_SECOND + t.micros as i64)
    }

    pub fn to_ordinal(self) -> OrdinalTime {
        let (days, secs, micros) = self.split();
        let (year, _, _) = civil_from_days(days);
        let day_of_year = (days - days_from_civil(year, 1, 1) + 1) as u32;
        OrdinalTime {
            year,
            day_of_year,
            hour: (secs / 3600) as u32,
            minute: (secs % 3600 / 60) as u32,
            second: (secs % 60) as u32,
            micros: micros as u32,
        }
    }

    /// (days since epoch, seconds of day, microseconds of second)
    fn split(self) -> (i64, i64, i64) {
        let total_secs = self.0.div_euclid(MICROS_PER_SECOND);
        let micros = self.0.rem_euclid(MICROS_PER_SECOND);
        (total_secs.div_euclid(86400), total_secs.rem_euclid(86400), micros)
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (days, secs, micros) = self.split();
        let (y, m, d) = civil_from_days(days);
        write!(
            f,
            "{y:04}-{m:02}-{d:02} {:02}:{:02}:{:02}.{micros:06}",
            secs / 3600,
            secs % 3600 / 60,
            secs % 60
        )
    }
}

// ════════════════════════════════════════════════════════════════
//  Civil calendar (Howard Hinnant algorithms)
// ════════════════════════════════════════════════════════════════

/// Days since 1970-01-01 for a proleptic Gregorian date.
pub fn days_from_civil(year: i64, month: u32, day: u32) -> i64 {
    let (y, m) = if month <= 2 {
        (year - 1, month + 9)
    } else {
        (year, month - 3)
    };
    let era = if y >= 0 { y } else { y - 399 } / 400;
    let yoe = y - era * 400;
    let doy = (153 * m as i64 + 2) / 5 + day as i64 - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146097 + doe - 719468
}

/// Inverse of [`days_from_civil`]: (year, month, day).
pub fn civil_from_days(days: i64) -> (i64, u32, u32) {
    let days = days + 719468;
    let era = days.div_euclid(146097);
    let doe = days.rem_euclid(146097);
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146096) / 365;
    let y = yoe + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = doy - (153 * mp + 2) / 5 + 1;
    let m = if mp < 10 { mp + 3 } else { mp - 9 };
    let y = if m <= 2 { y + 1 } else { y };
    (y, m as u32, d as u32)
}

//! Entry modification times.
//!
//! Container formats disagree on how they store modification times:
//!
//! - tar headers carry whole Unix seconds; pax records carry a decimal
//!   fraction
//! - zip headers carry a DOS date/time (2-second resolution, 1980-2107)
//! - the zip extended timestamp field (0x5455) carries Unix seconds as `i32`
//! - the zip NTFS field (0x000a) carries a Windows FILETIME (100ns units)
//!
//! [`MTime`] keeps the full `(seconds, nanoseconds)` pair and converts to
//! and from each of these representations. Nanoseconds survive a zip round
//! trip down to 100ns precision.

use chrono::{Datelike, NaiveDate, Timelike};

/// Windows FILETIME epoch: January 1, 1601 (UTC)
/// Difference from Unix epoch (January 1, 1970) in 100-nanosecond intervals.
const FILETIME_UNIX_DIFF: i128 = 116_444_736_000_000_000;

/// Number of 100-nanosecond intervals per second.
const INTERVALS_PER_SECOND: i128 = 10_000_000;

/// Modification time of an entry as Unix seconds plus nanoseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct MTime {
    /// Seconds since the Unix epoch (negative before 1970).
    pub secs: i64,
    /// Nanoseconds within the second (0-999999999).
    pub nanos: u32,
}

impl MTime {
    /// Creates a modification time.
    ///
    /// Nanoseconds beyond one second are carried into `secs`.
    pub fn new(secs: i64, nanos: u32) -> Self {
        Self {
            secs: secs + i64::from(nanos / 1_000_000_000),
            nanos: nanos % 1_000_000_000,
        }
    }

    /// Creates a modification time from whole seconds.
    pub fn from_secs(secs: i64) -> Self {
        Self { secs, nanos: 0 }
    }

    /// Creates a modification time from a Windows FILETIME value.
    pub fn from_filetime(filetime: u64) -> Self {
        let intervals = i128::from(filetime) - FILETIME_UNIX_DIFF;
        let secs = intervals.div_euclid(INTERVALS_PER_SECOND);
        let rem = intervals.rem_euclid(INTERVALS_PER_SECOND);
        Self {
            secs: secs as i64,
            nanos: (rem * 100) as u32,
        }
    }

    /// Returns the Windows FILETIME value, truncating nanoseconds to 100ns.
    ///
    /// Returns `None` for times before 1601.
    pub fn to_filetime(&self) -> Option<u64> {
        let intervals = FILETIME_UNIX_DIFF
            + i128::from(self.secs) * INTERVALS_PER_SECOND
            + i128::from(self.nanos / 100);
        u64::try_from(intervals).ok()
    }

    /// Parses a pax `mtime` record such as `1000.5` or `-1.25`.
    ///
    /// Digits past nanosecond precision are dropped.
    pub fn from_pax(value: &str) -> Option<Self> {
        let (whole, frac) = value.split_once('.').unwrap_or((value, ""));
        let secs: i64 = whole.parse().ok()?;
        if !frac.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let nanos = frac
            .bytes()
            .chain(std::iter::repeat(b'0'))
            .take(9)
            .fold(0u32, |n, b| n * 10 + u32::from(b - b'0'));

        if whole.starts_with('-') && nanos > 0 {
            Some(Self::new(secs - 1, 1_000_000_000 - nanos))
        } else {
            Some(Self::new(secs, nanos))
        }
    }

    /// Returns the seconds as the `i32` stored in a zip extended timestamp.
    ///
    /// Returns `None` outside the 1901-2038 range.
    pub fn to_unix_i32(&self) -> Option<i32> {
        i32::try_from(self.secs).ok()
    }

    /// Reads a DOS date/time as UTC.
    ///
    /// Returns `None` if the stored fields do not form a valid date.
    pub fn from_dos(dt: zip::DateTime) -> Option<Self> {
        let secs = NaiveDate::from_ymd_opt(
            i32::from(dt.year()),
            u32::from(dt.month()),
            u32::from(dt.day()),
        )?
        .and_hms_opt(
            u32::from(dt.hour()),
            u32::from(dt.minute()),
            u32::from(dt.second()),
        )?
        .and_utc()
        .timestamp();
        Some(Self::from_secs(secs))
    }

    /// Converts to a DOS date/time, interpreting this time as UTC.
    ///
    /// Times outside the DOS range clamp to the DOS epoch (1980-01-01).
    pub fn to_dos(&self) -> zip::DateTime {
        chrono::DateTime::from_timestamp(self.secs, self.nanos)
            .and_then(|utc| {
                let year = u16::try_from(utc.year()).ok()?;
                zip::DateTime::from_date_and_time(
                    year,
                    utc.month() as u8,
                    utc.day() as u8,
                    utc.hour() as u8,
                    utc.minute() as u8,
                    utc.second() as u8,
                )
                .ok()
            })
            .unwrap_or_default()
    }
}

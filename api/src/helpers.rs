//! Shared helpers for Decimal ↔ f64 conversions and local timestamps.
//!
//! Readings are keyed by a naive local timestamp (the provider's epoch time
//! rendered in the server's local zone), so every "now" used for windows and
//! alert times goes through [`local_now`] to stay in the same frame.

use chrono::{DateTime, Local, NaiveDateTime};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// Wire format for naive local timestamps in API responses.
pub(crate) const LOCAL_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Convert an f64 to Decimal, rounded to 2 decimal places.
///
/// OpenWeatherMap reports temperatures and wind speeds with two decimals;
/// rounding here keeps stored values stable across identical polls.
pub(crate) fn f64_to_decimal_2dp(v: f64) -> Decimal {
    if !v.is_finite() {
        tracing::warn!(
            "f64_to_decimal_2dp received non-finite value {}, defaulting to 0",
            v
        );
        return Decimal::ZERO;
    }
    Decimal::from_str_exact(&format!("{:.2}", v)).unwrap_or_default()
}

/// Convert a Decimal to f64, defaulting to 0.0 for values that can't be represented.
pub(crate) fn dec_to_f64(d: Decimal) -> f64 {
    d.to_f64().unwrap_or(0.0)
}

/// Current wall-clock time in the server's local zone, without offset.
pub(crate) fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}

/// Convert a provider epoch timestamp (seconds) to a naive local timestamp.
/// Sub-second precision is dropped.
pub(crate) fn epoch_to_local(epoch_secs: i64) -> Option<NaiveDateTime> {
    DateTime::from_timestamp(epoch_secs, 0).map(|utc| utc.with_timezone(&Local).naive_local())
}

pub(crate) fn format_local(dt: NaiveDateTime) -> String {
    dt.format(LOCAL_TIMESTAMP_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Timelike};
    use std::str::FromStr;

    #[test]
    fn test_f64_to_decimal_2dp_normal() {
        let d = f64_to_decimal_2dp(31.05);
        assert_eq!(d, Decimal::from_str("31.05").unwrap());
    }

    #[test]
    fn test_f64_to_decimal_2dp_rounds() {
        let d = f64_to_decimal_2dp(3.147);
        assert_eq!(d, Decimal::from_str("3.15").unwrap());
    }

    #[test]
    fn test_f64_to_decimal_2dp_nan() {
        assert_eq!(f64_to_decimal_2dp(f64::NAN), Decimal::ZERO);
    }

    #[test]
    fn test_f64_to_decimal_2dp_infinity() {
        assert_eq!(f64_to_decimal_2dp(f64::INFINITY), Decimal::ZERO);
    }

    #[test]
    fn test_dec_to_f64_normal() {
        let d = Decimal::from_str("36.25").unwrap();
        assert!((dec_to_f64(d) - 36.25).abs() < 1e-10);
    }

    #[test]
    fn test_epoch_to_local_matches_local_zone() {
        let epoch = 1_729_245_600; // 2024-10-18T10:00:00Z
        let expected = Local.timestamp_opt(epoch, 0).unwrap().naive_local();
        assert_eq!(epoch_to_local(epoch), Some(expected));
        assert_eq!(epoch_to_local(epoch).unwrap().nanosecond(), 0);
    }

    #[test]
    fn test_epoch_to_local_out_of_range() {
        assert_eq!(epoch_to_local(i64::MAX), None);
    }

    #[test]
    fn test_format_local() {
        let dt = NaiveDate::from_ymd_opt(2024, 10, 18)
            .unwrap()
            .and_hms_opt(7, 5, 9)
            .unwrap();
        assert_eq!(format_local(dt), "2024-10-18 07:05:09");
    }
}

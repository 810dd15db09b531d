//! _Normal Play Time_ values, as used in `TimeSeekRange.dlna.org` and
//! `availableSeekRange.dlna.org`.
//!
//! Two forms are accepted: seconds with an optional fraction (`335.1`), and hours, minutes and
//! seconds (`0:05:35.100`).  Values are held as nanoseconds, computed from whole milliseconds so
//! that no floating point rounding is involved.

use super::DlnaError;

pub const NANOS_PER_MILLI: u64 = 1_000_000;
pub const NANOS_PER_SECOND: u64 = 1_000_000_000;

const FIELD: &str = "npt";

fn digits(s: &str, value: &str) -> Result<u64, DlnaError> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(DlnaError::malformed(FIELD, value));
    }
    s.parse().map_err(|_| DlnaError::malformed(FIELD, value))
}

/// Milliseconds given by the digits after the decimal point; digits beyond the third are
/// ignored.
fn fraction_millis(s: &str, value: &str) -> Result<u64, DlnaError> {
    digits(s, value)?;
    let ms = s
        .bytes()
        .chain(std::iter::repeat(b'0'))
        .take(3)
        .fold(0, |acc, b| acc * 10 + u64::from(b - b'0'));
    Ok(ms)
}

/// Decodes an NPT time in either form into nanoseconds.
pub fn parse(value: &str) -> Result<u64, DlnaError> {
    let s = value.trim();
    let (whole, millis) = match s.split_once('.') {
        Some((whole, frac)) => (whole, fraction_millis(frac, value)?),
        None => (s, 0),
    };
    let mut parts = whole.split(':');
    let total_ms = match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(secs), None, None, None) => digits(secs, value)?.checked_mul(1000),
        (Some(hours), Some(mins), Some(secs), None) => {
            let h = digits(hours, value)?;
            let m = digits(mins, value)?;
            let sec = digits(secs, value)?;
            if m >= 60 || sec >= 60 {
                return Err(DlnaError::malformed(FIELD, value));
            }
            h.checked_mul(3_600_000)
                .and_then(|ms| ms.checked_add(m * 60_000 + sec * 1000))
        }
        _ => return Err(DlnaError::malformed(FIELD, value)),
    };
    total_ms
        .and_then(|ms| ms.checked_add(millis))
        .and_then(|ms| ms.checked_mul(NANOS_PER_MILLI))
        .ok_or_else(|| DlnaError::malformed(FIELD, value))
}

/// Formats as seconds with a millisecond fraction, e.g. `335.100`.
pub fn format_short(nanos: u64) -> String {
    let ms = nanos / NANOS_PER_MILLI;
    format!("{}.{:03}", ms / 1000, ms % 1000)
}

/// Formats as hours, minutes and seconds, e.g. `0:05:35.100`.
pub fn format_long(nanos: u64) -> String {
    let ms = nanos / NANOS_PER_MILLI;
    let secs = ms / 1000;
    format!(
        "{}:{:02}:{:02}.{:03}",
        secs / 3600,
        (secs / 60) % 60,
        secs % 60,
        ms % 1000
    )
}

/// Whole seconds, as sent in a `TimeSeekRange.dlna.org` request.
pub fn whole_seconds(nanos: u64) -> u64 {
    nanos / NANOS_PER_SECOND
}

#[cfg(test)]
mod test {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn short_and_long_forms_agree() {
        let short = parse("335.1").unwrap();
        let long = parse("0:05:35.100").unwrap();
        assert_eq!(short, 335_100 * NANOS_PER_MILLI);
        assert_eq!(short, long);
        assert_eq!(format_short(short), "335.100");
        assert_eq!(format_long(short), "0:05:35.100");
        assert_eq!(parse(&format_long(short)).unwrap(), long);
        assert_eq!(parse(&format_short(long)).unwrap(), short);
    }

    #[test]
    fn whole_values() {
        assert_eq!(parse("0").unwrap(), 0);
        assert_eq!(parse("12").unwrap(), 12 * NANOS_PER_SECOND);
        assert_eq!(parse("1:00:00").unwrap(), 3600 * NANOS_PER_SECOND);
        assert_eq!(parse("10:00:01.5").unwrap(), 36_001_500 * NANOS_PER_MILLI);
        assert_eq!(format_long(3600 * NANOS_PER_SECOND), "1:00:00.000");
    }

    #[test]
    fn fraction_precision() {
        assert_eq!(parse("1.05").unwrap(), 1_050 * NANOS_PER_MILLI);
        assert_eq!(parse("1.0009").unwrap(), 1_000 * NANOS_PER_MILLI);
        assert_eq!(whole_seconds(parse("7.999").unwrap()), 7);
    }

    #[test]
    fn malformed() {
        for bad in &["", ".5", "abc", "1:2", "1:60:00", "0:00:61", "1:2:3:4", "-1", "5."] {
            assert_matches!(parse(bad), Err(DlnaError::Malformed { field: "npt", .. }), "{:?}", bad);
        }
    }
}

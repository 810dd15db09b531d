//! Range grammars found in DLNA response headers.
//!
//! ```text
//! Content-Range:               bytes 0-5219255/5219256
//! TimeSeekRange.dlna.org:      npt=335.11-336.08/4096.00 bytes=1539686400-1540210688/*
//! availableSeekRange.dlna.org: 1 npt=0-4.000 cleartextbytes=0-5219255
//! ```

use super::{npt, DlnaError};
use log::warn;

/// Strips `prefix` from the start of `s`, comparing ASCII case-insensitively.
pub(crate) fn strip_prefix_ignore_case<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    if s.len() >= prefix.len()
        && s.is_char_boundary(prefix.len())
        && s[..prefix.len()].eq_ignore_ascii_case(prefix)
    {
        Some(&s[prefix.len()..])
    } else {
        None
    }
}

/// Which unit a byte range counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteUnit {
    /// Bytes of the content as transferred, encrypted if the content is.
    Bytes,
    /// Bytes of the content after decryption.
    ClearTextBytes,
}

/// `start-end[/total]`, inclusive of both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub unit: ByteUnit,
    pub start: u64,
    pub end: u64,
    /// `None` where the total was given as `*`, or omitted.
    pub total: Option<u64>,
}

impl ByteRange {
    const FIELD: &'static str = "byte range";

    /// Decodes `bytes=..` or `cleartextbytes=..`; `bytes ..` with a space, as in the standard
    /// `Content-Range` header, is accepted too.
    pub fn parse(value: &str) -> Result<ByteRange, DlnaError> {
        let s = value.trim();
        let (unit, rest) = if let Some(rest) = strip_prefix_ignore_case(s, "cleartextbytes") {
            (ByteUnit::ClearTextBytes, rest)
        } else if let Some(rest) = strip_prefix_ignore_case(s, "bytes") {
            (ByteUnit::Bytes, rest)
        } else {
            return Err(DlnaError::malformed(Self::FIELD, value));
        };
        let rest = rest
            .strip_prefix('=')
            .or_else(|| rest.strip_prefix(' '))
            .ok_or_else(|| DlnaError::malformed(Self::FIELD, value))?;
        let (span, total) = match rest.split_once('/') {
            Some((span, total)) => (span, Some(total)),
            None => (rest, None),
        };
        let (start, end) = span
            .split_once('-')
            .ok_or_else(|| DlnaError::malformed(Self::FIELD, value))?;
        let number = |s: &str| -> Result<u64, DlnaError> {
            s.trim()
                .parse()
                .map_err(|_| DlnaError::malformed(Self::FIELD, value))
        };
        let start = number(start)?;
        let end = number(end)?;
        if end < start {
            return Err(DlnaError::malformed(Self::FIELD, value));
        }
        let total = match total.map(str::trim) {
            None | Some("*") => None,
            Some(t) => Some(number(t)?),
        };
        Ok(ByteRange {
            unit,
            start,
            end,
            total,
        })
    }
}

/// `npt=start-[end][/duration]`, with the original text of each value retained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NptRange {
    pub start: u64,
    pub start_str: String,
    pub end: Option<u64>,
    pub end_str: Option<String>,
    /// `None` where the duration was given as `*`, or omitted.
    pub duration: Option<u64>,
    pub duration_str: Option<String>,
}

impl NptRange {
    const FIELD: &'static str = "npt range";

    pub fn parse(value: &str) -> Result<NptRange, DlnaError> {
        let rest = strip_prefix_ignore_case(value.trim(), "npt=")
            .ok_or_else(|| DlnaError::malformed(Self::FIELD, value))?;
        let (span, duration) = match rest.split_once('/') {
            Some((span, d)) => (span, Some(d.trim())),
            None => (rest, None),
        };
        let (start, end) = span
            .split_once('-')
            .ok_or_else(|| DlnaError::malformed(Self::FIELD, value))?;
        let start_str = start.trim();
        let end_str = Some(end.trim()).filter(|s| !s.is_empty());
        let duration_str = duration.filter(|s| *s != "*" && !s.is_empty());
        Ok(NptRange {
            start: npt::parse(start_str)?,
            start_str: start_str.to_string(),
            end: end_str.map(npt::parse).transpose()?,
            end_str: end_str.map(str::to_string),
            duration: duration_str.map(npt::parse).transpose()?,
            duration_str: duration_str.map(str::to_string),
        })
    }
}

/// The content of a `TimeSeekRange.dlna.org` response header: an NPT range, optionally
/// followed by the corresponding byte range.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TimeSeekRange {
    pub npt: Option<NptRange>,
    pub bytes: Option<ByteRange>,
}

impl TimeSeekRange {
    const FIELD: &'static str = "TimeSeekRange";

    /// A malformed byte range is logged and left out; the NPT range is required.
    pub fn parse(value: &str) -> Result<TimeSeekRange, DlnaError> {
        let mut result = TimeSeekRange::default();
        for token in value.split_whitespace() {
            let parsed = if strip_prefix_ignore_case(token, "npt=").is_some() {
                NptRange::parse(token).map(|r| result.npt = Some(r))
            } else if strip_prefix_ignore_case(token, "bytes=").is_some() {
                ByteRange::parse(token).map(|r| result.bytes = Some(r))
            } else {
                Err(DlnaError::malformed(Self::FIELD, token))
            };
            if let Err(e) = parsed {
                warn!("{}: skipping {}", Self::FIELD, e);
            }
        }
        if result.npt.is_none() {
            return Err(DlnaError::malformed(Self::FIELD, value));
        }
        Ok(result)
    }
}

/// The content of an `availableSeekRange.dlna.org` header: a mode digit followed by the NPT
/// range and/or the byte range currently available.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AvailableSeekRange {
    /// `0`: the range start is fixed; `1`: the range start moves forward over time.
    pub mode: u8,
    pub npt: Option<NptRange>,
    pub bytes: Option<ByteRange>,
    pub cleartext_bytes: Option<ByteRange>,
}

impl AvailableSeekRange {
    const FIELD: &'static str = "availableSeekRange";

    pub fn parse(value: &str) -> Result<AvailableSeekRange, DlnaError> {
        let mut tokens = value.split_whitespace();
        let mode = match tokens.next() {
            Some("0") => 0,
            Some("1") => 1,
            _ => return Err(DlnaError::malformed(Self::FIELD, value)),
        };
        let mut result = AvailableSeekRange {
            mode,
            ..Default::default()
        };
        for token in tokens {
            let parsed = if strip_prefix_ignore_case(token, "npt=").is_some() {
                NptRange::parse(token).map(|r| result.npt = Some(r))
            } else {
                ByteRange::parse(token).map(|range| match range.unit {
                    ByteUnit::Bytes => result.bytes = Some(range),
                    ByteUnit::ClearTextBytes => result.cleartext_bytes = Some(range),
                })
            };
            if let Err(e) = parsed {
                warn!("{}: skipping {}", Self::FIELD, e);
            }
        }
        if result.npt.is_none() && result.bytes.is_none() && result.cleartext_bytes.is_none() {
            return Err(DlnaError::malformed(Self::FIELD, value));
        }
        Ok(result)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn byte_range_with_total() {
        let r = ByteRange::parse("bytes=0-5219255/5219256").unwrap();
        assert_eq!(r.unit, ByteUnit::Bytes);
        assert_eq!(r.start, 0);
        assert_eq!(r.end, 5219255);
        assert_eq!(r.total, Some(5219256));
    }

    #[test]
    fn byte_range_unknown_total() {
        let r = ByteRange::parse("bytes=1539686400-1540210688/*").unwrap();
        assert_eq!(r.start, 1539686400);
        assert_eq!(r.end, 1540210688);
        assert_eq!(r.total, None);
        assert_eq!(r.total.unwrap_or(0), 0);
    }

    #[test]
    fn byte_range_variants() {
        let r = ByteRange::parse("CLEARTEXTBYTES=10-20").unwrap();
        assert_eq!(r.unit, ByteUnit::ClearTextBytes);
        assert_eq!((r.start, r.end, r.total), (10, 20, None));
        let r = ByteRange::parse("bytes 0-99/100").unwrap();
        assert_eq!(r.total, Some(100));
        assert_matches!(ByteRange::parse("bytes=5-1"), Err(DlnaError::Malformed { .. }));
        assert_matches!(ByteRange::parse("bytes=-1"), Err(DlnaError::Malformed { .. }));
        assert_matches!(ByteRange::parse("items=0-1"), Err(DlnaError::Malformed { .. }));
    }

    #[test]
    fn npt_range() {
        let r = NptRange::parse("npt=0:00:10.5-0:01:00/*").unwrap();
        assert_eq!(r.start, 10_500 * npt::NANOS_PER_MILLI);
        assert_eq!(r.start_str, "0:00:10.5");
        assert_eq!(r.end, Some(60 * npt::NANOS_PER_SECOND));
        assert_eq!(r.duration, None);

        let r = NptRange::parse("NPT=10-").unwrap();
        assert_eq!(r.end, None);
        assert_eq!(r.end_str, None);

        let r = NptRange::parse("npt=0-335.1/335.1").unwrap();
        assert_eq!(r.duration_str.as_deref(), Some("335.1"));
    }

    #[test]
    fn time_seek_range_with_bytes() {
        let t = TimeSeekRange::parse("npt=335.11-336.08/4096 bytes=1539686400-1540210688/*").unwrap();
        let n = t.npt.unwrap();
        assert_eq!(n.start, 335_110 * npt::NANOS_PER_MILLI);
        assert_eq!(n.duration, Some(4096 * npt::NANOS_PER_SECOND));
        assert_eq!(t.bytes.unwrap().start, 1539686400);
        assert_matches!(TimeSeekRange::parse("bytes=0-1"), Err(DlnaError::Malformed { .. }));
    }

    #[test]
    fn time_seek_range_bad_bytes_keeps_npt() {
        let t = TimeSeekRange::parse("npt=0-100/100 bytes=0-*").unwrap();
        assert_eq!(t.npt.unwrap().end, Some(100 * npt::NANOS_PER_SECOND));
        assert_eq!(t.bytes, None);
        let t = TimeSeekRange::parse("npt=0-100/100 frames=0-1").unwrap();
        assert!(t.npt.is_some());
        assert_matches!(
            TimeSeekRange::parse("npt=x-1 bytes=0-1"),
            Err(DlnaError::Malformed { .. })
        );
    }

    #[test]
    fn available_seek_range() {
        let a = AvailableSeekRange::parse("1 npt=0-4.000 bytes=0-500 cleartextbytes=0-400").unwrap();
        assert_eq!(a.mode, 1);
        assert_eq!(a.npt.unwrap().end, Some(4 * npt::NANOS_PER_SECOND));
        assert_eq!(a.bytes.unwrap().end, 500);
        assert_eq!(a.cleartext_bytes.unwrap().end, 400);
        assert_matches!(AvailableSeekRange::parse("npt=0-1"), Err(DlnaError::Malformed { .. }));
    }

    #[test]
    fn available_seek_range_bad_token_keeps_others() {
        let a = AvailableSeekRange::parse("1 npt=0-60 bytes=9-1 cleartextbytes=0-400").unwrap();
        assert_eq!(a.npt.unwrap().end, Some(60 * npt::NANOS_PER_SECOND));
        assert_eq!(a.bytes, None);
        assert_eq!(a.cleartext_bytes.unwrap().end, 400);

        let a = AvailableSeekRange::parse("0 npt=bad bytes=0-500").unwrap();
        assert_eq!(a.npt, None);
        assert_eq!(a.bytes.unwrap().end, 500);

        assert_matches!(
            AvailableSeekRange::parse("1 npt=bad bytes=oops"),
            Err(DlnaError::Malformed { .. })
        );
        assert_matches!(AvailableSeekRange::parse("1"), Err(DlnaError::Malformed { .. }));
    }
}

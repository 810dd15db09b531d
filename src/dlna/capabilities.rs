//! What a server supports for one content URI, and the rules deciding whether a rate or
//! position change is possible and which request headers carry it out.

use super::features::{DlnaFlags, Playspeed};
use super::header::HeadResponseInfo;
use super::range::ByteRange;
use super::{npt, DlnaError};
use crate::bounded::{BoundedList, MAX_PLAYSPEEDS};

/// Unit of a seek position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekFormat {
    Bytes,
    /// Nanoseconds of normal play time
    Time,
    Undefined,
}

/// A requested change of play rate and/or position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeekRequest {
    /// `1.0` is normal play
    pub rate: f32,
    pub format: SeekFormat,
    pub start: u64,
    pub stop: Option<u64>,
}

impl SeekRequest {
    pub fn bytes(rate: f32, start: u64) -> SeekRequest {
        SeekRequest {
            rate,
            format: SeekFormat::Bytes,
            start,
            stop: None,
        }
    }

    pub fn time(rate: f32, start_nanos: u64) -> SeekRequest {
        SeekRequest {
            rate,
            format: SeekFormat::Time,
            start: start_nanos,
            stop: None,
        }
    }
}

/// Headers for the next GET request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderAdjustment {
    pub headers: Vec<(String, String)>,
    /// Set where the GET must not also carry a standard `Range` header.
    pub exclude_range: bool,
}

/// The normalised result of one or more HEAD responses.  Values the server did not supply are
/// zero, `false` or `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServerCapabilities {
    pub byte_seek_supported: bool,
    pub byte_start: u64,
    pub byte_end: u64,
    /// `0` where unknown
    pub byte_total: u64,
    pub time_seek_supported: bool,
    /// Nanoseconds
    pub npt_start: u64,
    pub npt_end: u64,
    /// `0` where unknown
    pub npt_duration: u64,
    pub npt_start_str: Option<String>,
    pub npt_end_str: Option<String>,
    pub npt_duration_str: Option<String>,
    /// The content is still being recorded or broadcast, so its range grows.
    pub is_live: bool,
    pub is_encrypted: bool,
    pub dtcp_host: Option<String>,
    pub dtcp_port: Option<u16>,
    pub content_type: Option<String>,
    pub profile: Option<String>,
    pub playspeeds: BoundedList<Playspeed, MAX_PLAYSPEEDS>,
    pub flags: DlnaFlags,
}

impl ServerCapabilities {
    /// Derives the capabilities from (merged) response headers.
    pub fn from_info(info: &HeadResponseInfo) -> ServerCapabilities {
        let mut caps = ServerCapabilities::default();
        let features = info.content_features.as_ref();
        if let Some(f) = features {
            caps.flags = f.flags.unwrap_or_default();
            caps.playspeeds = f.playspeeds.clone();
            caps.profile = f.profile.clone();
        }
        let op_time = features.and_then(|f| f.time_seek).unwrap_or(false);
        let op_byte = features.and_then(|f| f.byte_seek).unwrap_or(false);
        caps.time_seek_supported = op_time || caps.flags.limited_time_seek;
        caps.byte_seek_supported = op_byte
            || caps.flags.full_clear_text
            || caps.flags.limited_byte_seek
            || info.accepts_byte_ranges();
        caps.is_live = caps.flags.s0_increasing || caps.flags.sn_increasing;

        caps.is_encrypted = caps.flags.link_protected;
        if let Some(ct) = &info.content_type {
            caps.content_type = ct.mime_type.clone();
            caps.dtcp_host = ct.dtcp_host.clone();
            caps.dtcp_port = ct.dtcp_port;
            caps.is_encrypted |= ct.is_dtcp();
        }

        caps.set_byte_range(info);
        caps.set_npt_range(info);
        caps
    }

    fn set_byte_range(&mut self, info: &HeadResponseInfo) {
        let available = info.available_seek_range.as_ref();
        let candidates = [
            available.and_then(|a| a.cleartext_bytes),
            available.and_then(|a| a.bytes),
            info.dtcp_content_range,
            info.time_seek_range.as_ref().and_then(|t| t.bytes),
            info.content_range,
        ];
        let chosen = candidates.iter().flatten().find(|r| r.end > 0);
        match chosen {
            Some(ByteRange { start, end, .. }) => {
                self.byte_start = *start;
                self.byte_end = *end;
                self.byte_total = end.saturating_sub(*start);
            }
            None => {
                if let Some(len) = info.content_length.filter(|l| *l > 0) {
                    self.byte_start = 0;
                    self.byte_end = len;
                    self.byte_total = len;
                }
            }
        }
    }

    fn set_npt_range(&mut self, info: &HeadResponseInfo) {
        let range = info
            .available_seek_range
            .as_ref()
            .and_then(|a| a.npt.as_ref())
            .or_else(|| info.time_seek_range.as_ref().and_then(|t| t.npt.as_ref()));
        if let Some(r) = range {
            self.npt_start = r.start;
            self.npt_duration = r.duration.unwrap_or(0);
            self.npt_end = r.end.unwrap_or(self.npt_duration);
            if self.npt_duration == 0 && self.npt_end > self.npt_start {
                self.npt_duration = self.npt_end - self.npt_start;
            }
            self.npt_start_str = Some(r.start_str.clone());
            self.npt_end_str = r.end_str.clone();
            self.npt_duration_str = r.duration_str.clone();
        }
    }

    /// The server's exact text for `rate`, if listed.
    pub fn playspeed_text(&self, rate: f32) -> Option<&str> {
        self.playspeeds
            .iter()
            .find(|p| p.rate == rate)
            .map(|p| p.text.as_str())
    }

    /// Normal rate is always possible; any other must be one the server listed.
    pub fn check_rate(&self, rate: f32) -> Result<(), DlnaError> {
        if rate == 1.0 || self.playspeed_text(rate).is_some() {
            Ok(())
        } else {
            Err(DlnaError::UnsupportedRate(rate))
        }
    }

    /// Decides if the requested change is possible with the ranges currently known.
    pub fn validate(&self, req: &SeekRequest) -> Result<(), DlnaError> {
        self.check_rate(req.rate)?;
        let (supported, start, end) = match req.format {
            SeekFormat::Bytes => (self.byte_seek_supported, self.byte_start, self.byte_end),
            SeekFormat::Time => (self.time_seek_supported, self.npt_start, self.npt_end),
            SeekFormat::Undefined => return Err(DlnaError::UnsupportedFormat),
        };
        if !supported {
            return Err(match req.format {
                SeekFormat::Bytes => DlnaError::ByteSeekUnsupported,
                _ => DlnaError::TimeSeekUnsupported,
            });
        }
        if req.start < start || req.start > end {
            return Err(DlnaError::OutOfRange {
                position: req.start,
                start,
                end,
            });
        }
        Ok(())
    }

    /// Estimates the play time at a byte offset, in proportion to the total size and duration.
    pub fn bytes_to_npt(&self, bytes: u64) -> Result<u64, DlnaError> {
        if self.byte_total == 0 || self.npt_duration == 0 {
            return Err(DlnaError::UnknownTotals);
        }
        let nanos = u128::from(bytes) * u128::from(self.npt_duration) / u128::from(self.byte_total);
        Ok(u64::try_from(nanos).unwrap_or(u64::MAX))
    }

    /// The range a seek in the given format may target, if seeking in that format is supported.
    pub fn seekable_range(&self, format: SeekFormat) -> Option<(u64, u64)> {
        match format {
            SeekFormat::Bytes if self.byte_seek_supported => Some((self.byte_start, self.byte_end)),
            SeekFormat::Time if self.time_seek_supported => Some((self.npt_start, self.npt_end)),
            _ => None,
        }
    }

    /// Works out the GET request headers which carry out a validated change.
    pub fn header_adjustment(&self, req: &SeekRequest) -> Result<HeaderAdjustment, DlnaError> {
        let mut adj = HeaderAdjustment::default();
        let normal_rate = req.rate == 1.0;
        if !normal_rate {
            let text = self
                .playspeed_text(req.rate)
                .ok_or(DlnaError::UnsupportedRate(req.rate))?;
            adj.headers
                .push(("PlaySpeed.dlna.org".to_string(), format!("speed={}", text)));
        }
        if !normal_rate || (req.format == SeekFormat::Time && self.time_seek_supported) {
            let (start, stop) = match req.format {
                SeekFormat::Time => (req.start, req.stop),
                SeekFormat::Bytes => (
                    self.bytes_to_npt(req.start)?,
                    req.stop.map(|s| self.bytes_to_npt(s)).transpose()?,
                ),
                SeekFormat::Undefined => return Err(DlnaError::UnsupportedFormat),
            };
            let stop = stop
                .map(|s| format!("{}.0", npt::whole_seconds(s)))
                .unwrap_or_default();
            adj.headers.push((
                "TimeSeekRange.dlna.org".to_string(),
                format!("npt={}.0-{}", npt::whole_seconds(start), stop),
            ));
            adj.exclude_range = true;
        } else if req.format == SeekFormat::Bytes && self.is_encrypted && self.byte_seek_supported {
            adj.headers
                .push(("Range.dtcp.com".to_string(), format!("bytes={}-", req.start)));
            adj.exclude_range = true;
        }
        Ok(adj)
    }
}

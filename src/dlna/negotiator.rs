//! HEAD request sequencing for one content URI.

use super::capabilities::{SeekFormat, SeekRequest, ServerCapabilities};
use super::client::HeadClient;
use super::features::Playspeed;
use super::header::HeadResponseInfo;
use super::{npt, DlnaError, NegotiatorConfig};
use log::{debug, info};

pub const GET_CONTENT_FEATURES: (&str, &str) = ("getcontentFeatures.dlna.org", "1");
pub const GET_AVAILABLE_SEEK_RANGE: (&str, &str) = ("getAvailableSeekRange.dlna.org", "1");
pub const TIME_SEEK_FROM_START: (&str, &str) = ("TimeSeekRange.dlna.org", "npt=0-");
pub const DTCP_RANGE_FROM_START: (&str, &str) = ("Range.dtcp.com", "bytes=0-");
pub const RANGE_FROM_START: (&str, &str) = ("Range", "bytes=0-");

/// The component issuing the GET request for the content, configured by the negotiator.
pub trait HttpSourceSettings {
    /// Headers to add to the GET request, replacing any set before.
    fn set_extra_headers(&mut self, headers: &[(String, String)]);
    /// If set, the GET request must not carry a standard `Range` header.
    fn set_exclude_range_header(&mut self, exclude: bool);
    fn set_content_size(&mut self, size: u64);
}

/// Learns what a server supports for a URI, and translates rate and position changes into GET
/// request headers.
///
/// All requests block, and only one is ever outstanding.
pub struct Negotiator<C: HeadClient> {
    config: NegotiatorConfig,
    client: C,
    uri: Option<String>,
    info: HeadResponseInfo,
    caps: Option<ServerCapabilities>,
}

impl<C: HeadClient> Negotiator<C> {
    pub fn new(client: C) -> Negotiator<C> {
        Self::with_config(NegotiatorConfig::default(), client)
    }

    pub fn with_config(config: NegotiatorConfig, client: C) -> Negotiator<C> {
        Negotiator {
            config,
            client,
            uri: None,
            info: HeadResponseInfo::default(),
            caps: None,
        }
    }

    pub fn uri(&self) -> Option<&str> {
        self.uri.as_deref()
    }

    /// `None` until a URI has been successfully negotiated.
    pub fn capabilities(&self) -> Option<&ServerCapabilities> {
        self.caps.as_ref()
    }

    /// The merged headers of the responses received for the current URI.
    pub fn response_info(&self) -> &HeadResponseInfo {
        &self.info
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Negotiates with the server for `uri`: one HEAD request for the content features, then
    /// at most one more for the seekable range.  On success, the content size is passed to
    /// `source` if it is known.
    pub fn set_uri<S: HttpSourceSettings>(
        &mut self,
        uri: &str,
        source: &mut S,
    ) -> Result<&ServerCapabilities, DlnaError> {
        self.uri = Some(uri.to_string());
        self.caps = None;
        self.info = HeadResponseInfo::default();

        let mut info = self.head(&[GET_CONTENT_FEATURES])?;
        let caps = ServerCapabilities::from_info(&info);
        let follow_up = if caps.is_live {
            Some(GET_AVAILABLE_SEEK_RANGE)
        } else if caps.time_seek_supported {
            Some(TIME_SEEK_FROM_START)
        } else if caps.byte_seek_supported && caps.is_encrypted {
            Some(DTCP_RANGE_FROM_START)
        } else if caps.byte_seek_supported {
            Some(RANGE_FROM_START)
        } else {
            None
        };
        if let Some(header) = follow_up {
            info.merge(self.head(&[header])?);
        }
        let caps = ServerCapabilities::from_info(&info);
        self.log_capabilities(&caps);
        if caps.byte_total > 0 {
            source.set_content_size(caps.byte_total);
        }
        self.info = info;
        Ok(self.caps.insert(caps))
    }

    fn head(&mut self, headers: &[(&str, &str)]) -> Result<HeadResponseInfo, DlnaError> {
        let uri = self.uri.as_deref().ok_or(DlnaError::NoUri)?;
        debug!("{}: HEAD {} {:?}", self.config.name, uri, headers);
        let response = self.client.head(uri, headers)?;
        if !response.is_success() {
            return Err(DlnaError::HttpStatus(response.status));
        }
        Ok(HeadResponseInfo::from_response(&response))
    }

    fn log_capabilities(&self, caps: &ServerCapabilities) {
        info!(
            "{}: time seek {} ({:?} to {:?}, duration {:?}), byte seek {} ({}-{}/{}), live {}, encrypted {}, {} play speeds",
            self.config.name,
            caps.time_seek_supported,
            caps.npt_start_str,
            caps.npt_end_str,
            caps.npt_duration_str,
            caps.byte_seek_supported,
            caps.byte_start,
            caps.byte_end,
            caps.byte_total,
            caps.is_live,
            caps.is_encrypted,
            caps.playspeeds.len()
        );
    }

    fn caps(&self) -> Result<&ServerCapabilities, DlnaError> {
        self.caps.as_ref().ok_or(DlnaError::NoUri)
    }

    /// Asks the server for the range currently available for live content.
    fn refresh_live_range(&mut self) -> Result<(), DlnaError> {
        let latest = self.head(&[GET_AVAILABLE_SEEK_RANGE])?;
        self.info.merge(latest);
        self.caps = Some(ServerCapabilities::from_info(&self.info));
        Ok(())
    }

    /// Checks that the requested change is possible.  For live content and time based
    /// positions the available range is requested afresh first.
    pub fn is_change_valid(&mut self, req: &SeekRequest) -> Result<(), DlnaError> {
        let caps = self.caps()?;
        caps.check_rate(req.rate)?;
        if req.format == SeekFormat::Time && caps.is_live && caps.time_seek_supported {
            self.refresh_live_range()?;
        }
        let result = self.caps()?.validate(req);
        if let Err(ref e) = result {
            info!("{}: rejecting {:?}: {}", self.config.name, req, e);
        }
        result
    }

    /// Configures `source` with the headers for the requested change, which should already
    /// have passed [`is_change_valid()`](#method.is_change_valid).  On failure `source` is left
    /// with no extra headers and the `Range` header allowed.
    pub fn adjust_headers<S: HttpSourceSettings>(
        &self,
        req: &SeekRequest,
        source: &mut S,
    ) -> Result<(), DlnaError> {
        source.set_exclude_range_header(false);
        source.set_extra_headers(&[]);
        let adj = self.caps()?.header_adjustment(req)?;
        debug!("{}: GET headers {:?}", self.config.name, adj.headers);
        source.set_extra_headers(&adj.headers);
        source.set_exclude_range_header(adj.exclude_range);
        Ok(())
    }

    /// Asks the server which byte offset corresponds to the given play time.
    pub fn npt_nanos_to_bytes(&mut self, nanos: u64) -> Result<u64, DlnaError> {
        let value = format!("npt={}.0-", npt::whole_seconds(nanos));
        let info = self.head(&[("TimeSeekRange.dlna.org", value.as_str())])?;
        info.time_seek_range
            .and_then(|t| t.bytes)
            .map(|b| b.start)
            .ok_or(DlnaError::MissingField("TimeSeekRange.dlna.org bytes"))
    }

    /// Converts a position between formats.  Bytes to time is an estimate in proportion to
    /// the content's size and duration; time to bytes asks the server.
    pub fn convert(
        &mut self,
        value: u64,
        from: SeekFormat,
        to: SeekFormat,
    ) -> Result<u64, DlnaError> {
        match (from, to) {
            (SeekFormat::Undefined, _) | (_, SeekFormat::Undefined) => {
                Err(DlnaError::UnsupportedFormat)
            }
            _ if from == to => Ok(value),
            (SeekFormat::Bytes, SeekFormat::Time) => self.caps()?.bytes_to_npt(value),
            _ => {
                self.caps()?;
                self.npt_nanos_to_bytes(value)
            }
        }
    }

    /// Nanoseconds, if the server reported a duration.
    pub fn duration(&self) -> Option<u64> {
        self.caps.as_ref().map(|c| c.npt_duration).filter(|d| *d > 0)
    }

    pub fn content_size(&self) -> Option<u64> {
        self.caps.as_ref().map(|c| c.byte_total).filter(|s| *s > 0)
    }

    pub fn seekable_range(&self, format: SeekFormat) -> Option<(u64, u64)> {
        self.caps.as_ref()?.seekable_range(format)
    }

    pub fn supported_rates(&self) -> &[Playspeed] {
        match &self.caps {
            Some(c) => &c.playspeeds[..],
            None => &[],
        }
    }
}

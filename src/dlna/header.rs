//! HEAD responses, and decoding of the headers a DLNA server may return in them.

use super::content_type::ContentType;
use super::features::ContentFeatures;
use super::range::{AvailableSeekRange, ByteRange, TimeSeekRange};
use super::DlnaError;
use httparse::Status;
use log::{debug, warn};

/// The most headers kept from one raw response head.
const MAX_HEADERS: usize = 64;

/// The response headers which are recognised.  Matching is case-insensitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeaderField {
    /// The `HTTP/1.1 200 OK` status line
    HttpStatus,
    Vary,
    TimeSeekRange,
    TransferMode,
    Date,
    ContentType,
    Server,
    TransferEncoding,
    ContentFeatures,
    DtcpContentRange,
    Pragma,
    CacheControl,
    ContentLength,
    AcceptRanges,
    ContentRange,
    AvailableSeekRange,
}

impl HeaderField {
    pub const ALL: [HeaderField; 16] = [
        HeaderField::HttpStatus,
        HeaderField::Vary,
        HeaderField::TimeSeekRange,
        HeaderField::TransferMode,
        HeaderField::Date,
        HeaderField::ContentType,
        HeaderField::Server,
        HeaderField::TransferEncoding,
        HeaderField::ContentFeatures,
        HeaderField::DtcpContentRange,
        HeaderField::Pragma,
        HeaderField::CacheControl,
        HeaderField::ContentLength,
        HeaderField::AcceptRanges,
        HeaderField::ContentRange,
        HeaderField::AvailableSeekRange,
    ];

    /// The header name, upper-cased as used for matching.
    pub fn name(self) -> &'static str {
        match self {
            HeaderField::HttpStatus => "HTTP/",
            HeaderField::Vary => "VARY",
            HeaderField::TimeSeekRange => "TIMESEEKRANGE.DLNA.ORG",
            HeaderField::TransferMode => "TRANSFERMODE.DLNA.ORG",
            HeaderField::Date => "DATE",
            HeaderField::ContentType => "CONTENT-TYPE",
            HeaderField::Server => "SERVER",
            HeaderField::TransferEncoding => "TRANSFER-ENCODING",
            HeaderField::ContentFeatures => "CONTENTFEATURES.DLNA.ORG",
            HeaderField::DtcpContentRange => "CONTENT-RANGE.DTCP.COM",
            HeaderField::Pragma => "PRAGMA",
            HeaderField::CacheControl => "CACHE-CONTROL",
            HeaderField::ContentLength => "CONTENT-LENGTH",
            HeaderField::AcceptRanges => "ACCEPT-RANGES",
            HeaderField::ContentRange => "CONTENT-RANGE",
            HeaderField::AvailableSeekRange => "AVAILABLESEEKRANGE.DLNA.ORG",
        }
    }

    /// Looks up a header by name; the name is upper-cased into a copy for comparison.
    pub fn from_name(name: &str) -> Option<HeaderField> {
        let upper = name.trim().to_ascii_uppercase();
        if upper.starts_with("HTTP/") {
            return Some(HeaderField::HttpStatus);
        }
        HeaderField::ALL
            .iter()
            .copied()
            .find(|f| *f != HeaderField::HttpStatus && f.name() == upper)
    }
}

/// The status and headers of one HEAD response, as returned by a
/// [`HeadClient`](../client/trait.HeadClient.html).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadResponse {
    pub status: u16,
    /// `(name, value)` pairs in the order received.
    pub headers: Vec<(String, String)>,
}

impl HeadResponse {
    pub fn new(status: u16, headers: Vec<(String, String)>) -> HeadResponse {
        HeadResponse { status, headers }
    }

    /// Parses a raw HTTP/1.1 response head: the status line, then `Name: value` lines up to
    /// and including the blank line which ends the head.  Anything after it is ignored.
    pub fn parse(raw: &str) -> Result<HeadResponse, DlnaError> {
        if raw.trim().is_empty() {
            return Err(DlnaError::MissingField("status line"));
        }
        let mut r_headers = [httparse::EMPTY_HEADER; MAX_HEADERS];
        let mut r = httparse::Response::new(&mut r_headers);
        match r.parse(raw.as_bytes()) {
            Ok(Status::Complete(_)) => {}
            Ok(Status::Partial) => return Err(DlnaError::malformed("response head", raw)),
            Err(e) => {
                debug!("response head: {}", e);
                return Err(DlnaError::malformed("response head", raw));
            }
        }
        let status = r.code.ok_or(DlnaError::MissingField("status code"))?;
        let headers = r
            .headers
            .iter()
            .filter_map(|h| match std::str::from_utf8(h.value) {
                Ok(value) => Some((h.name.to_string(), value.trim().to_string())),
                Err(_) => {
                    warn!("ignoring non UTF-8 value of header {}", h.name);
                    None
                }
            })
            .collect();
        Ok(HeadResponse { status, headers })
    }

    /// Decodes a status line on its own, such as `HTTP/1.1 206 Partial Content`.
    fn parse_status_line(line: &str) -> Result<u16, DlnaError> {
        let head = format!("{}\r\n\r\n", line.trim());
        let mut no_headers: [httparse::Header<'_>; 0] = [];
        let mut r = httparse::Response::new(&mut no_headers);
        match r.parse(head.as_bytes()) {
            Ok(Status::Complete(_)) => r
                .code
                .ok_or_else(|| DlnaError::malformed("status line", line)),
            _ => Err(DlnaError::malformed("status line", line)),
        }
    }

    /// The first header called `name`, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// True for the statuses a HEAD request may succeed with.
    pub fn is_success(&self) -> bool {
        matches!(self.status, 200 | 201 | 206)
    }
}

/// Everything decoded from the headers of one or more HEAD responses.  Headers which were
/// absent, or whose values were malformed, are `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeadResponseInfo {
    pub status: Option<u16>,
    pub vary: Option<String>,
    pub time_seek_range: Option<TimeSeekRange>,
    pub transfer_mode: Option<String>,
    pub date: Option<String>,
    pub content_type: Option<ContentType>,
    pub server: Option<String>,
    pub transfer_encoding: Option<String>,
    pub content_features: Option<ContentFeatures>,
    pub dtcp_content_range: Option<ByteRange>,
    pub pragma: Option<String>,
    pub cache_control: Option<String>,
    pub content_length: Option<u64>,
    pub accept_ranges: Option<String>,
    pub content_range: Option<ByteRange>,
    pub available_seek_range: Option<AvailableSeekRange>,
}

impl HeadResponseInfo {
    /// Decodes every recognised header of `response`.  Unrecognised headers and malformed
    /// values are logged and skipped.
    pub fn from_response(response: &HeadResponse) -> HeadResponseInfo {
        let mut info = HeadResponseInfo {
            status: Some(response.status),
            ..Default::default()
        };
        for (name, value) in &response.headers {
            match HeaderField::from_name(name) {
                Some(field) => {
                    if let Err(e) = info.apply(field, value) {
                        warn!("{}: {}", name, e);
                    }
                }
                None => debug!("ignoring header {}: {}", name, value),
            }
        }
        info
    }

    /// Decodes one header value into the matching field.
    pub fn apply(&mut self, field: HeaderField, value: &str) -> Result<(), DlnaError> {
        let value = value.trim();
        match field {
            HeaderField::HttpStatus => {
                self.status = Some(HeadResponse::parse_status_line(value)?);
            }
            HeaderField::Vary => self.vary = Some(value.to_string()),
            HeaderField::TimeSeekRange => {
                self.time_seek_range = Some(TimeSeekRange::parse(value)?);
            }
            HeaderField::TransferMode => self.transfer_mode = Some(value.to_string()),
            HeaderField::Date => self.date = Some(value.to_string()),
            HeaderField::ContentType => self.content_type = Some(ContentType::parse(value)?),
            HeaderField::Server => self.server = Some(value.to_string()),
            HeaderField::TransferEncoding => self.transfer_encoding = Some(value.to_string()),
            HeaderField::ContentFeatures => {
                self.content_features = Some(ContentFeatures::parse(value)?);
            }
            HeaderField::DtcpContentRange => {
                self.dtcp_content_range = Some(ByteRange::parse(value)?);
            }
            HeaderField::Pragma => self.pragma = Some(value.to_string()),
            HeaderField::CacheControl => self.cache_control = Some(value.to_string()),
            HeaderField::ContentLength => {
                let len = value
                    .parse()
                    .map_err(|_| DlnaError::malformed("Content-Length", value))?;
                self.content_length = Some(len);
            }
            HeaderField::AcceptRanges => self.accept_ranges = Some(value.to_string()),
            HeaderField::ContentRange => self.content_range = Some(ByteRange::parse(value)?),
            HeaderField::AvailableSeekRange => {
                self.available_seek_range = Some(AvailableSeekRange::parse(value)?);
            }
        }
        Ok(())
    }

    /// Folds a later response into this one; its values replace those already held.
    pub fn merge(&mut self, later: HeadResponseInfo) {
        fn take<T>(dst: &mut Option<T>, src: Option<T>) {
            if src.is_some() {
                *dst = src;
            }
        }
        take(&mut self.status, later.status);
        take(&mut self.vary, later.vary);
        take(&mut self.time_seek_range, later.time_seek_range);
        take(&mut self.transfer_mode, later.transfer_mode);
        take(&mut self.date, later.date);
        take(&mut self.content_type, later.content_type);
        take(&mut self.server, later.server);
        take(&mut self.transfer_encoding, later.transfer_encoding);
        take(&mut self.content_features, later.content_features);
        take(&mut self.dtcp_content_range, later.dtcp_content_range);
        take(&mut self.pragma, later.pragma);
        take(&mut self.cache_control, later.cache_control);
        take(&mut self.content_length, later.content_length);
        take(&mut self.accept_ranges, later.accept_ranges);
        take(&mut self.content_range, later.content_range);
        take(&mut self.available_seek_range, later.available_seek_range);
    }

    /// True if `Accept-Ranges: bytes` was received.
    pub fn accepts_byte_ranges(&self) -> bool {
        self.accept_ranges
            .as_deref()
            .map(|v| v.split(',').any(|u| u.trim().eq_ignore_ascii_case("bytes")))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use assert_matches::assert_matches;

    const RESPONSE: &str = "HTTP/1.1 200 OK\r\n\
        Content-Type: video/mpeg\r\n\
        contentFeatures.dlna.org: DLNA.ORG_PN=MPEG_PS_NTSC;DLNA.ORG_OP=11;DLNA.ORG_FLAGS=01700000000000000000000000000000\r\n\
        Content-Length: 5219256\r\n\
        Accept-Ranges: bytes\r\n\
        X-Unknown: whatever\r\n\
        TimeSeekRange.dlna.org: npt=0-\r\n\
        Server: test\r\n\
        \r\n\
        ignored: after blank line\r\n";

    #[test]
    fn field_names_case_insensitive() {
        assert_eq!(
            HeaderField::from_name("timeseekrange.dlna.ORG"),
            Some(HeaderField::TimeSeekRange)
        );
        assert_eq!(
            HeaderField::from_name("Content-Range"),
            Some(HeaderField::ContentRange)
        );
        assert_eq!(
            HeaderField::from_name("Content-Range.dtcp.com"),
            Some(HeaderField::DtcpContentRange)
        );
        assert_eq!(HeaderField::from_name("HTTP/1.0"), Some(HeaderField::HttpStatus));
        assert_eq!(HeaderField::from_name("X-Other"), None);
        for f in HeaderField::ALL.iter().skip(1) {
            assert_eq!(HeaderField::from_name(&f.name().to_lowercase()), Some(*f));
        }
    }

    #[test]
    fn parse_raw_response() {
        let r = HeadResponse::parse(RESPONSE).unwrap();
        assert_eq!(r.status, 200);
        assert!(r.is_success());
        assert_eq!(r.headers.len(), 7);
        assert_eq!(r.header("content-length"), Some("5219256"));
        assert_eq!(r.header("ignored"), None);
    }

    #[test]
    fn bad_status_line() {
        assert_matches!(
            HeadResponse::parse("Content-Length: 5\r\n"),
            Err(DlnaError::Malformed { .. })
        );
        assert_matches!(HeadResponse::parse(""), Err(DlnaError::MissingField(_)));
        assert!(!HeadResponse::parse("HTTP/1.1 404 Not Found\r\n\r\n")
            .unwrap()
            .is_success());
        // no blank line ending the head
        assert_matches!(
            HeadResponse::parse("HTTP/1.1 200 OK\r\nServer: test\r\n"),
            Err(DlnaError::Malformed { .. })
        );
        assert_matches!(
            HeadResponse::parse("HTTP/1.1 200 OK\r\nno colon here\r\n\r\n"),
            Err(DlnaError::Malformed { .. })
        );
    }

    #[test]
    fn status_line_header() {
        let mut info = HeadResponseInfo::default();
        info.apply(HeaderField::HttpStatus, "HTTP/1.1 206 Partial Content")
            .unwrap();
        assert_eq!(info.status, Some(206));
        assert_matches!(
            info.apply(HeaderField::HttpStatus, "HTTP/1.1 two"),
            Err(DlnaError::Malformed { .. })
        );
    }

    #[test]
    fn decode_headers() {
        let info = HeadResponseInfo::from_response(&HeadResponse::parse(RESPONSE).unwrap());
        assert_eq!(info.status, Some(200));
        assert_eq!(info.content_length, Some(5219256));
        assert!(info.accepts_byte_ranges());
        assert_eq!(info.server.as_deref(), Some("test"));
        let features = info.content_features.unwrap();
        assert_eq!(features.byte_seek, Some(true));
        assert!(features.flags.unwrap().streaming_mode);
        assert_eq!(info.time_seek_range.unwrap().npt.unwrap().end, None);
    }

    #[test]
    fn malformed_value_does_not_abort() {
        let r = HeadResponse::new(
            200,
            vec![
                ("Content-Length".into(), "lots".into()),
                ("Content-Range".into(), "bytes 0-9/10".into()),
            ],
        );
        let info = HeadResponseInfo::from_response(&r);
        assert_eq!(info.content_length, None);
        assert_eq!(info.content_range.unwrap().total, Some(10));
    }

    #[test]
    fn later_values_win() {
        let mut first = HeadResponseInfo {
            content_length: Some(10),
            server: Some("a".into()),
            ..Default::default()
        };
        first.merge(HeadResponseInfo {
            content_length: Some(20),
            ..Default::default()
        });
        assert_eq!(first.content_length, Some(20));
        assert_eq!(first.server.as_deref(), Some("a"));
    }
}

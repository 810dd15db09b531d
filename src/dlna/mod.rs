//! Negotiation of seek and play-speed support with a DLNA media server.
//!
//! # Concepts
//!
//! * A [`Negotiator`](negotiator/struct.Negotiator.html) is given a content URI.  It issues a
//!   first HEAD request asking for `contentFeatures.dlna.org`, and depending on what that reveals
//!   at most one further HEAD request asking for the seekable range.
//! * Each response is decoded header by header into a
//!   [`HeadResponseInfo`](header/struct.HeadResponseInfo.html).  The header values have small
//!   grammars of their own, decoded by the [`npt`](npt/index.html), [`range`](range/index.html),
//!   [`features`](features/index.html) and [`content_type`](content_type/index.html) modules.
//!   A value which does not fit its grammar is logged and left unset; it never fails the whole
//!   response.
//! * The responses are merged into [`ServerCapabilities`](capabilities/struct.ServerCapabilities.html),
//!   which decides whether a requested rate or position change is legal and which headers the
//!   following GET request must carry.
//! * The HTTP transport is behind the [`HeadClient`](client/trait.HeadClient.html) trait, and the
//!   component issuing the GET is behind [`HttpSourceSettings`](negotiator/trait.HttpSourceSettings.html).

pub mod capabilities;
pub mod client;
pub mod content_type;
pub mod features;
pub mod header;
pub mod negotiator;
pub mod npt;
pub mod range;

pub use self::capabilities::{SeekFormat, SeekRequest, ServerCapabilities};
pub use self::client::HeadClient;
pub use self::header::{HeadResponse, HeadResponseInfo, HeaderField};
pub use self::negotiator::{HttpSourceSettings, Negotiator};

use std::fmt;

/// Failures of DLNA negotiation, header decoding and seek validation.
#[derive(Debug, Clone, PartialEq)]
pub enum DlnaError {
    /// An operation needing a content URI was attempted before one was set.
    NoUri,
    /// The HEAD request could not be completed.
    Transport(String),
    /// The server answered with a status other than 200, 201 or 206.
    HttpStatus(u16),
    /// A header value did not match the grammar expected for it.
    Malformed { field: &'static str, value: String },
    /// The requested play speed is neither 1.0 nor listed by the server.
    UnsupportedRate(f32),
    ByteSeekUnsupported,
    TimeSeekUnsupported,
    /// The requested position lies outside the range the server reported.
    OutOfRange { position: u64, start: u64, end: u64 },
    /// The seek was expressed in a format other than bytes or time.
    UnsupportedFormat,
    /// A conversion needed a total size or duration the server has not reported.
    UnknownTotals,
    /// A response lacked a value the operation relies on.
    MissingField(&'static str),
}

impl DlnaError {
    pub(crate) fn malformed(field: &'static str, value: &str) -> DlnaError {
        DlnaError::Malformed {
            field,
            value: value.to_string(),
        }
    }
}

impl fmt::Display for DlnaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DlnaError::NoUri => write!(f, "no URI set"),
            DlnaError::Transport(msg) => write!(f, "HEAD request failed: {}", msg),
            DlnaError::HttpStatus(code) => write!(f, "HEAD request returned status {}", code),
            DlnaError::Malformed { field, value } => {
                write!(f, "malformed {} value {:?}", field, value)
            }
            DlnaError::UnsupportedRate(rate) => write!(f, "play speed {} not supported", rate),
            DlnaError::ByteSeekUnsupported => write!(f, "byte seek not supported"),
            DlnaError::TimeSeekUnsupported => write!(f, "time seek not supported"),
            DlnaError::OutOfRange {
                position,
                start,
                end,
            } => write!(f, "position {} outside {}-{}", position, start, end),
            DlnaError::UnsupportedFormat => write!(f, "seek format not supported"),
            DlnaError::UnknownTotals => write!(f, "content size or duration unknown"),
            DlnaError::MissingField(name) => write!(f, "response lacks {}", name),
        }
    }
}

impl std::error::Error for DlnaError {}

/// Settings for a [`Negotiator`](negotiator/struct.Negotiator.html).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NegotiatorConfig {
    /// Prefixed to every log line of this negotiator, to tell several instances apart.
    pub name: String,
}

impl NegotiatorConfig {
    pub fn named(name: impl Into<String>) -> NegotiatorConfig {
        NegotiatorConfig { name: name.into() }
    }
}

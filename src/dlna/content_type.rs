//! The `Content-Type` header.  For DTCP link-protected content the actual mime type is carried
//! in a parameter, alongside the host and port of the DTCP key exchange:
//!
//! ```text
//! application/x-dtcp1;DTCP1HOST=192.168.0.5;DTCP1PORT=8999;CONTENTFORMAT=video/mpeg
//! ```

use super::range::strip_prefix_ignore_case;
use super::DlnaError;
use log::warn;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentType {
    /// The mime type of the content itself.
    pub mime_type: Option<String>,
    pub dtcp_host: Option<String>,
    pub dtcp_port: Option<u16>,
}

impl ContentType {
    pub fn parse(value: &str) -> Result<ContentType, DlnaError> {
        let value = value.trim();
        if value.is_empty() {
            return Err(DlnaError::malformed("Content-Type", value));
        }
        if !value.to_ascii_uppercase().contains("DTCP") {
            return Ok(ContentType {
                mime_type: Some(value.to_string()),
                ..Default::default()
            });
        }
        let mut result = ContentType::default();
        for param in value.split(';').map(str::trim) {
            if let Some(host) = strip_prefix_ignore_case(param, "DTCP1HOST=") {
                result.dtcp_host = Some(host.to_string());
            } else if let Some(port) = strip_prefix_ignore_case(param, "DTCP1PORT=") {
                match port.trim().parse() {
                    Ok(p) => result.dtcp_port = Some(p),
                    Err(_) => warn!("{}", DlnaError::malformed("DTCP1PORT", port)),
                }
            } else if let Some(format) = strip_prefix_ignore_case(param, "CONTENTFORMAT=") {
                result.mime_type = Some(format.trim_matches('"').to_string());
            } else if !param.eq_ignore_ascii_case("application/x-dtcp1") && !param.is_empty() {
                warn!("ignoring Content-Type parameter {:?}", param);
            }
        }
        Ok(result)
    }

    /// True if the DTCP form of the header was used.
    pub fn is_dtcp(&self) -> bool {
        self.dtcp_host.is_some() || self.dtcp_port.is_some()
    }
}

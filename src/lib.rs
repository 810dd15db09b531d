//! Stream analysis and HTTP negotiation logic for CableLabs reference players.
//!
//! Two independent parts, neither of which depends on any media framework:
//!
//!  * *Transport Stream table analysis* ([`demultiplex::TsParser`]).  Raw bytes are pushed in
//!    arbitrarily sized chunks; the parser re-frames 188 byte packets, follows the _Program
//!    Association Table_ to the _Program Map Table_, and from there to the OpenCable EISS
//!    tables, reporting each PID of interest to a [`demultiplex::StreamTracker`].
//!  * *DLNA HEAD negotiation* ([`dlna::Negotiator`]).  Given a content URI, HEAD requests are
//!    issued with DLNA-specific headers and the response is normalised into
//!    [`dlna::ServerCapabilities`], which then decides whether a seek or rate change is legal
//!    and which extra headers the subsequent GET must carry.
//!
//! # Design principles
//!
//!  * *Don't allocate per packet*.  Packet framing, section reassembly and table decoding all
//!    work in fixed-size buffers owned by the parser.
//!  * *Never fail the stream*.  Malformed packets, sections, or header values are logged and
//!    skipped; decoding carries on with the next packet or header.
//!  * *Synchronous*.  The caller pushes data, and HEAD requests block until answered, so that
//!    decisions depending on the server's answer are never made early.

pub mod bounded;
pub mod cursor;
pub mod demultiplex;
pub mod descriptor;
pub mod dlna;
pub mod packet;
pub mod psi;

/// The kind of content carried by an elementary stream, per the PMT `stream_type` field.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum StreamType {
    Iso11172Video,
    H262,
    Iso11172Audio,
    Iso138183Audio,
    H2220PrivateSections,
    H2220PesPrivateData,
    Adts,
    H264,
    H265,
    AtscDolbyDigitalAudio,
    AtscDolbyDigitalPlusAudio,
    /// `0xc0`, used by OpenCable for ETV signaling, which carries the EISS tables
    EtvSignaling,
    /// `0xc1`, ETV binary interchange format data
    EtvBif,
    /// Other values in the user-private range `0x80..=0xff`
    Private(u8),
    /// Values reserved by ISO/IEC 13818-1 or not classified here
    Reserved(u8),
}

impl From<u8> for StreamType {
    fn from(val: u8) -> Self {
        match val {
            0x01 => StreamType::Iso11172Video,
            0x02 => StreamType::H262,
            0x03 => StreamType::Iso11172Audio,
            0x04 => StreamType::Iso138183Audio,
            0x05 => StreamType::H2220PrivateSections,
            0x06 => StreamType::H2220PesPrivateData,
            0x0f => StreamType::Adts,
            0x1b => StreamType::H264,
            0x24 => StreamType::H265,
            0x81 => StreamType::AtscDolbyDigitalAudio,
            0x87 => StreamType::AtscDolbyDigitalPlusAudio,
            0xc0 => StreamType::EtvSignaling,
            0xc1 => StreamType::EtvBif,
            _ if val >= 0x80 => StreamType::Private(val),
            _ => StreamType::Reserved(val),
        }
    }
}

impl From<StreamType> for u8 {
    fn from(val: StreamType) -> Self {
        match val {
            StreamType::Iso11172Video => 0x01,
            StreamType::H262 => 0x02,
            StreamType::Iso11172Audio => 0x03,
            StreamType::Iso138183Audio => 0x04,
            StreamType::H2220PrivateSections => 0x05,
            StreamType::H2220PesPrivateData => 0x06,
            StreamType::Adts => 0x0f,
            StreamType::H264 => 0x1b,
            StreamType::H265 => 0x24,
            StreamType::AtscDolbyDigitalAudio => 0x81,
            StreamType::AtscDolbyDigitalPlusAudio => 0x87,
            StreamType::EtvSignaling => 0xc0,
            StreamType::EtvBif => 0xc1,
            StreamType::Private(val) | StreamType::Reserved(val) => val,
        }
    }
}

#[cfg(test)]
mod test {
    use super::StreamType;

    #[test]
    fn stream_type_values_survive_conversion() {
        for v in 0..=255u8 {
            assert_eq!(u8::from(StreamType::from(v)), v);
        }
        assert_eq!(StreamType::from(0xc0), StreamType::EtvSignaling);
        assert_eq!(StreamType::from(0x90), StreamType::Private(0x90));
        assert_eq!(StreamType::from(0x30), StreamType::Reserved(0x30));
    }
}

//! The `contentFeatures.dlna.org` header, a `;`-separated list of `DLNA.ORG_*` parameters:
//!
//! ```text
//! DLNA.ORG_PN=MPEG_TS_HD_NA_ISO;DLNA.ORG_OP=10;DLNA.ORG_PS=-8,-4,-2,-1/2,1/2,2,4,8;DLNA.ORG_CI=0;DLNA.ORG_FLAGS=01700000000000000000000000000000
//! ```
//!
//! Each parameter is decoded on its own; one which is malformed is logged and left unset.

use super::range::strip_prefix_ignore_case;
use super::DlnaError;
use crate::bounded::{BoundedList, MAX_PLAYSPEEDS};
use log::warn;

/// One server-supported play speed.
#[derive(Debug, Clone, PartialEq)]
pub struct Playspeed {
    pub rate: f32,
    /// The speed as the server wrote it.  Fractions such as `1/3` must be sent back exactly as
    /// received, so requests use this rather than `rate`.
    pub text: String,
}

impl Playspeed {
    pub fn parse(value: &str) -> Result<Playspeed, DlnaError> {
        let text = value.trim();
        let malformed = || DlnaError::malformed("DLNA.ORG_PS", value);
        let rate = match text.split_once('/') {
            Some((n, d)) => {
                let n: i32 = n.trim().parse().map_err(|_| malformed())?;
                let d: i32 = d.trim().parse().map_err(|_| malformed())?;
                if d == 0 {
                    return Err(malformed());
                }
                n as f32 / d as f32
            }
            None => text.parse::<f32>().map_err(|_| malformed())?,
        };
        if !rate.is_finite() {
            return Err(malformed());
        }
        Ok(Playspeed {
            rate,
            text: text.to_string(),
        })
    }
}

/// The `DLNA.ORG_FLAGS` bits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DlnaFlags {
    pub sender_paced: bool,
    pub limited_time_seek: bool,
    pub limited_byte_seek: bool,
    pub play_container: bool,
    pub s0_increasing: bool,
    pub sn_increasing: bool,
    pub rtsp_pause: bool,
    pub streaming_mode: bool,
    pub interactive_mode: bool,
    pub background_mode: bool,
    pub stalling: bool,
    pub dlna_v15: bool,
    pub link_protected: bool,
    pub full_clear_text: bool,
    pub limited_clear_text: bool,
}

impl DlnaFlags {
    pub const SENDER_PACED: u32 = 1 << 31;
    pub const LIMITED_TIME_SEEK: u32 = 1 << 30;
    pub const LIMITED_BYTE_SEEK: u32 = 1 << 29;
    pub const PLAY_CONTAINER: u32 = 1 << 28;
    pub const S0_INCREASING: u32 = 1 << 27;
    pub const SN_INCREASING: u32 = 1 << 26;
    pub const RTSP_PAUSE: u32 = 1 << 25;
    pub const STREAMING_MODE: u32 = 1 << 24;
    pub const INTERACTIVE_MODE: u32 = 1 << 23;
    pub const BACKGROUND_MODE: u32 = 1 << 22;
    pub const STALLING: u32 = 1 << 21;
    pub const DLNA_V15: u32 = 1 << 20;
    pub const LINK_PROTECTED: u32 = 1 << 16;
    pub const FULL_CLEAR_TEXT: u32 = 1 << 15;
    pub const LIMITED_CLEAR_TEXT: u32 = 1 << 14;

    /// Hex digits of reserved flags trailing the 32 bits decoded here.
    pub const RESERVED_DIGITS: usize = 24;

    pub fn from_bits(bits: u32) -> DlnaFlags {
        DlnaFlags {
            sender_paced: bits & Self::SENDER_PACED != 0,
            limited_time_seek: bits & Self::LIMITED_TIME_SEEK != 0,
            limited_byte_seek: bits & Self::LIMITED_BYTE_SEEK != 0,
            play_container: bits & Self::PLAY_CONTAINER != 0,
            s0_increasing: bits & Self::S0_INCREASING != 0,
            sn_increasing: bits & Self::SN_INCREASING != 0,
            rtsp_pause: bits & Self::RTSP_PAUSE != 0,
            streaming_mode: bits & Self::STREAMING_MODE != 0,
            interactive_mode: bits & Self::INTERACTIVE_MODE != 0,
            background_mode: bits & Self::BACKGROUND_MODE != 0,
            stalling: bits & Self::STALLING != 0,
            dlna_v15: bits & Self::DLNA_V15 != 0,
            link_protected: bits & Self::LINK_PROTECTED != 0,
            full_clear_text: bits & Self::FULL_CLEAR_TEXT != 0,
            limited_clear_text: bits & Self::LIMITED_CLEAR_TEXT != 0,
        }
    }

    /// Decodes the hex string value of `DLNA.ORG_FLAGS`.
    pub fn parse(value: &str) -> Result<DlnaFlags, DlnaError> {
        let s = value.trim();
        let malformed = || DlnaError::malformed("DLNA.ORG_FLAGS", value);
        if s.len() <= Self::RESERVED_DIGITS || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(malformed());
        }
        let primary = &s[..s.len() - Self::RESERVED_DIGITS];
        let bits = u32::from_str_radix(primary, 16).map_err(|_| malformed())?;
        Ok(DlnaFlags::from_bits(bits))
    }
}

/// The decoded `contentFeatures.dlna.org` value.  Parameters which were absent or malformed are
/// `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContentFeatures {
    /// `DLNA.ORG_PN`, the media format profile name
    pub profile: Option<String>,
    /// `DLNA.ORG_OP` first digit
    pub time_seek: Option<bool>,
    /// `DLNA.ORG_OP` second digit
    pub byte_seek: Option<bool>,
    pub playspeeds: BoundedList<Playspeed, MAX_PLAYSPEEDS>,
    pub flags: Option<DlnaFlags>,
    /// `DLNA.ORG_CI`, true if the content was transcoded
    pub converted: Option<bool>,
}

impl ContentFeatures {
    /// Decodes the header value.  Only fails if no parameter at all could be decoded.
    pub fn parse(value: &str) -> Result<ContentFeatures, DlnaError> {
        let mut features = ContentFeatures::default();
        let mut recognised = 0;
        for param in value.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            let result = if let Some(v) = strip_prefix_ignore_case(param, "DLNA.ORG_PN=") {
                features.profile = Some(v.to_string());
                Ok(())
            } else if let Some(v) = strip_prefix_ignore_case(param, "DLNA.ORG_OP=") {
                Self::parse_op(v).map(|(time, byte)| {
                    features.time_seek = Some(time);
                    features.byte_seek = Some(byte);
                })
            } else if let Some(v) = strip_prefix_ignore_case(param, "DLNA.ORG_PS=") {
                Self::parse_playspeeds(v, &mut features.playspeeds)
            } else if let Some(v) = strip_prefix_ignore_case(param, "DLNA.ORG_FLAGS=") {
                DlnaFlags::parse(v).map(|f| features.flags = Some(f))
            } else if let Some(v) = strip_prefix_ignore_case(param, "DLNA.ORG_CI=") {
                match v.trim() {
                    "0" | "1" => {
                        features.converted = Some(v.trim() == "1");
                        Ok(())
                    }
                    _ => Err(DlnaError::malformed("DLNA.ORG_CI", v)),
                }
            } else {
                warn!("ignoring contentFeatures parameter {:?}", param);
                continue;
            };
            match result {
                Ok(()) => recognised += 1,
                Err(e) => warn!("{}", e),
            }
        }
        if recognised == 0 {
            return Err(DlnaError::malformed("contentFeatures.dlna.org", value));
        }
        Ok(features)
    }

    /// Two binary digits: time seek, then byte range seek.
    fn parse_op(value: &str) -> Result<(bool, bool), DlnaError> {
        let digit = |b: u8| match b {
            b'0' => Ok(false),
            b'1' => Ok(true),
            _ => Err(DlnaError::malformed("DLNA.ORG_OP", value)),
        };
        match value.trim().as_bytes() {
            [time, byte] => Ok((digit(*time)?, digit(*byte)?)),
            _ => Err(DlnaError::malformed("DLNA.ORG_OP", value)),
        }
    }

    fn parse_playspeeds(
        value: &str,
        list: &mut BoundedList<Playspeed, MAX_PLAYSPEEDS>,
    ) -> Result<(), DlnaError> {
        list.clear();
        for item in value.split(',').filter(|s| !s.trim().is_empty()) {
            match Playspeed::parse(item) {
                Ok(speed) => {
                    list.push(speed);
                }
                Err(e) => warn!("{}", e),
            }
        }
        if list.truncated() > 0 {
            warn!(
                "only the first {} of {} play speeds kept",
                MAX_PLAYSPEEDS,
                list.seen()
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn flags_sender_paced_and_streaming() {
        let flags = DlnaFlags::parse("81000000000000000000000000000000").unwrap();
        assert_eq!(
            flags,
            DlnaFlags {
                sender_paced: true,
                streaming_mode: true,
                ..Default::default()
            }
        );
    }

    #[test]
    fn flags_each_bit() {
        let all = DlnaFlags::from_bits(0xfff1_c000);
        assert!(all.limited_time_seek && all.limited_byte_seek && all.play_container);
        assert!(all.s0_increasing && all.sn_increasing && all.rtsp_pause);
        assert!(all.interactive_mode && all.background_mode && all.stalling && all.dlna_v15);
        assert!(all.link_protected && all.full_clear_text && all.limited_clear_text);
        assert!(DlnaFlags::from_bits(DlnaFlags::LINK_PROTECTED).link_protected);
        assert_eq!(DlnaFlags::from_bits(1 << 17), DlnaFlags::default());
    }

    #[test]
    fn flags_malformed() {
        assert_matches!(DlnaFlags::parse("8100"), Err(DlnaError::Malformed { .. }));
        assert_matches!(
            DlnaFlags::parse("8x000000000000000000000000000000"),
            Err(DlnaError::Malformed { .. })
        );
    }

    #[test]
    fn playspeeds_keep_text() {
        let f = ContentFeatures::parse("DLNA.ORG_PS=1/3,2,4,-1/2").unwrap();
        assert_eq!(f.playspeeds.len(), 4);
        assert!((f.playspeeds[0].rate - 0.333_333).abs() < 1e-5);
        assert_eq!(f.playspeeds[0].text, "1/3");
        assert_eq!(f.playspeeds[3].rate, -0.5);
        assert_eq!(f.playspeeds[1].text, "2");
    }

    #[test]
    fn full_header() {
        let f = ContentFeatures::parse(
            "DLNA.ORG_PN=MPEG_TS_HD_NA_ISO;DLNA.ORG_OP=10;DLNA.ORG_PS=2,4;DLNA.ORG_CI=1;DLNA.ORG_FLAGS=41700000000000000000000000000000",
        )
        .unwrap();
        assert_eq!(f.profile.as_deref(), Some("MPEG_TS_HD_NA_ISO"));
        assert_eq!(f.time_seek, Some(true));
        assert_eq!(f.byte_seek, Some(false));
        assert_eq!(f.converted, Some(true));
        let flags = f.flags.unwrap();
        assert!(flags.limited_time_seek);
        assert!(flags.streaming_mode);
        assert!(flags.dlna_v15);
        assert!(flags.background_mode);
        assert!(!flags.sender_paced);
    }

    #[test]
    fn malformed_parameter_left_unset() {
        let f = ContentFeatures::parse("dlna.org_op=1;DLNA.ORG_CI=0").unwrap();
        assert_eq!(f.time_seek, None);
        assert_eq!(f.converted, Some(false));
        assert_matches!(ContentFeatures::parse("garbage"), Err(DlnaError::Malformed { .. }));
    }

    #[test]
    fn playspeed_list_bounded() {
        let list: Vec<String> = (1..=70).map(|i| i.to_string()).collect();
        let f = ContentFeatures::parse(&format!("DLNA.ORG_PS={}", list.join(","))).unwrap();
        assert_eq!(f.playspeeds.len(), MAX_PLAYSPEEDS);
        assert_eq!(f.playspeeds.seen(), 70);
    }
}

//! A [`Packet`](./struct.Packet.html) view over the fixed header of one transport stream packet

use std::convert::TryFrom;
use std::fmt;

/// How the remainder of a packet after the fixed 4-byte header is used.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum AdaptationControl {
    /// `0b00`, not defined by _ISO/IEC 13818-1_; such packets are treated as carrying nothing
    Reserved,
    /// payload follows the header directly
    PayloadOnly,
    /// the remaining 184 bytes are all adaptation field
    AdaptationFieldOnly,
    /// an adaptation field, then payload
    AdaptationFieldAndPayload,
}

impl AdaptationControl {
    #[inline(always)]
    fn from_bits(val: u8) -> AdaptationControl {
        match val & 0b11 {
            0 => AdaptationControl::Reserved,
            1 => AdaptationControl::PayloadOnly,
            2 => AdaptationControl::AdaptationFieldOnly,
            _ => AdaptationControl::AdaptationFieldAndPayload,
        }
    }

    /// True if packets with this control value carry payload bytes.
    #[inline(always)]
    pub fn has_payload(self) -> bool {
        matches!(
            self,
            AdaptationControl::PayloadOnly | AdaptationControl::AdaptationFieldAndPayload
        )
    }

    /// True if packets with this control value carry an adaptation field.
    #[inline(always)]
    pub fn has_adaptation_field(self) -> bool {
        matches!(
            self,
            AdaptationControl::AdaptationFieldOnly | AdaptationControl::AdaptationFieldAndPayload
        )
    }
}

/// The 2-bit _transport_scrambling_control_ field.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum TransportScramblingControl {
    /// The payload is in the clear.
    NotScrambled,
    /// Scrambled with a scheme the core standard leaves undefined (values 1 to 3).
    Undefined(u8),
}

impl TransportScramblingControl {
    fn from_bits(val: u8) -> TransportScramblingControl {
        match val & 0b11 {
            0 => TransportScramblingControl::NotScrambled,
            v => TransportScramblingControl::Undefined(v),
        }
    }
}

/// A 13-bit Packet Identifier, between `0x0000` and `0x1fff`.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Pid(u16);
impl Pid {
    /// The largest possible PID value, `0x1fff`.
    pub const MAX_VALUE: u16 = 0x1fff;

    /// The number of distinct PID values.
    pub const PID_COUNT: usize = (Self::MAX_VALUE + 1) as usize;

    /// PID carrying the Program Association Table.
    pub const PAT: Pid = Pid::new(0);

    /// PID used for null (stuffing) packets.
    pub const NULL: Pid = Pid::new(0x1fff);

    /// Panics if the given value is greater than `Pid::MAX_VALUE`.
    pub const fn new(pid: u16) -> Pid {
        assert!(pid <= Pid::MAX_VALUE);
        Pid(pid)
    }

    /// Builds a PID from two bytes of section or header data, masking off the 3 reserved or
    /// flag bits above the 13-bit value.
    #[inline]
    pub fn from_masked(hi: u8, lo: u8) -> Pid {
        Pid(u16::from(hi & 0b0001_1111) << 8 | u16::from(lo))
    }
}
impl TryFrom<u16> for Pid {
    type Error = ();

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        if value <= Pid::MAX_VALUE {
            Ok(Pid(value))
        } else {
            Err(())
        }
    }
}
impl From<Pid> for u16 {
    #[inline]
    fn from(pid: Pid) -> Self {
        pid.0
    }
}
impl From<Pid> for usize {
    #[inline]
    fn from(pid: Pid) -> Self {
        pid.0 as usize
    }
}
impl fmt::Debug for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        write!(f, "Pid({:#06x})", self.0)
    }
}
impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        write!(f, "{}", self.0)
    }
}

/// Borrows one complete, 188 byte transport stream packet and decodes its 4-byte header.
pub struct Packet<'buf> {
    buf: &'buf [u8],
}

impl<'buf> Packet<'buf> {
    /// The value `0x47`, which starts every transport stream packet.
    pub const SYNC_BYTE: u8 = 0x47;

    /// The fixed 188 byte size of a transport stream packet.
    pub const SIZE: usize = 188;

    /// Size of the fixed header preceding any adaptation field or payload.
    pub const HEADER_SIZE: usize = 4;

    #[inline(always)]
    pub fn is_sync_byte(b: u8) -> bool {
        b == Self::SYNC_BYTE
    }

    /// Panics if the buffer is not exactly `Packet::SIZE` bytes, or does not start with
    /// `Packet::SYNC_BYTE`.  The framing code only hands over buffers which satisfy both.
    #[inline(always)]
    pub fn new(buf: &'buf [u8]) -> Packet<'buf> {
        assert_eq!(buf.len(), Self::SIZE);
        assert!(Packet::is_sync_byte(buf[0]));
        Packet { buf }
    }

    /// Like `new()`, but returns `None` rather than panicking on bad length or sync byte.
    pub fn try_new(buf: &'buf [u8]) -> Option<Packet<'buf>> {
        if buf.len() == Self::SIZE && Packet::is_sync_byte(buf[0]) {
            Some(Packet { buf })
        } else {
            None
        }
    }

    #[inline]
    pub fn transport_error_indicator(&self) -> bool {
        self.buf[1] & 0b1000_0000 != 0
    }

    /// Set when the payload begins a new PSI section (and so starts with a _pointer_field_) or
    /// a new PES packet.
    #[inline]
    pub fn payload_unit_start_indicator(&self) -> bool {
        self.buf[1] & 0b0100_0000 != 0
    }

    pub fn transport_priority(&self) -> bool {
        self.buf[1] & 0b0010_0000 != 0
    }

    #[inline]
    pub fn pid(&self) -> Pid {
        Pid::from_masked(self.buf[1], self.buf[2])
    }

    pub fn transport_scrambling_control(&self) -> TransportScramblingControl {
        TransportScramblingControl::from_bits(self.buf[3] >> 6)
    }

    #[inline]
    pub fn adaptation_control(&self) -> AdaptationControl {
        AdaptationControl::from_bits(self.buf[3] >> 4)
    }

    /// 4-bit counter which increments for each payload-carrying packet of a PID.
    #[inline]
    pub fn continuity_counter(&self) -> u8 {
        self.buf[3] & 0b0000_1111
    }

    /// borrow the whole 188 byte packet
    pub fn buffer(&self) -> &'buf [u8] {
        self.buf
    }
}

impl<'buf> fmt::Debug for Packet<'buf> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Packet")
            .field("pid", &self.pid())
            .field("pusi", &self.payload_unit_start_indicator())
            .field("tei", &self.transport_error_indicator())
            .field("scrambling", &self.transport_scrambling_control())
            .field("adaptation_control", &self.adaptation_control())
            .field("cc", &self.continuity_counter())
            .finish()
    }
}

#[cfg(test)]
mod test {
    use crate::packet::*;

    #[test]
    fn pid() {
        assert!(Pid::try_from(0x2000).is_err());
        assert_eq!(u16::from(Pid::from_masked(0xff, 0xff)), 0x1fff);
        assert_eq!(format!("{:?}", Pid::new(0x31)), "Pid(0x0031)");
    }

    #[test]
    #[should_panic]
    fn zero_len() {
        let buf = [0u8; 0];
        Packet::new(&buf[..]);
    }

    #[test]
    fn try_new_rejects_missing_sync() {
        let buf = [0u8; Packet::SIZE];
        assert!(Packet::try_new(&buf[..]).is_none());
        assert!(Packet::try_new(&buf[..10]).is_none());
    }

    #[test]
    fn all_bits_set() {
        let mut buf = [0xffu8; Packet::SIZE];
        buf[0] = Packet::SYNC_BYTE;
        let pk = Packet::new(&buf[..]);
        assert_eq!(u16::from(pk.pid()), 0x1fff);
        assert!(pk.transport_error_indicator());
        assert!(pk.payload_unit_start_indicator());
        assert!(pk.transport_priority());
        assert_eq!(
            pk.transport_scrambling_control(),
            TransportScramblingControl::Undefined(3)
        );
        assert_eq!(
            pk.adaptation_control(),
            AdaptationControl::AdaptationFieldAndPayload
        );
        assert_eq!(pk.continuity_counter(), 0b1111);
    }

    #[test]
    fn header_fields() {
        let mut buf = [0u8; Packet::SIZE];
        buf[0] = Packet::SYNC_BYTE;
        buf[1] = 0b0100_0001; // PUSI, pid hi bits
        buf[2] = 0x00;
        buf[3] = 0b0001_0111; // payload only, cc=7
        let pk = Packet::new(&buf[..]);
        assert_eq!(pk.pid(), Pid::new(0x100));
        assert!(pk.payload_unit_start_indicator());
        assert!(!pk.transport_error_indicator());
        assert_eq!(pk.adaptation_control(), AdaptationControl::PayloadOnly);
        assert!(pk.adaptation_control().has_payload());
        assert!(!pk.adaptation_control().has_adaptation_field());
        assert_eq!(pk.continuity_counter(), 7);
        assert_eq!(
            pk.transport_scrambling_control(),
            TransportScramblingControl::NotScrambled
        );
    }
}

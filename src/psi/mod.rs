//! Types for decoding tables of *Program Specific Information* carried in a transport stream.
//!
//! # Concepts
//!
//! * A PSI *Table* is carried as one or more *Sections*.  The tables handled here (PAT, PMT and
//!   the OpenCable EISS) all use the common 'section syntax', so every section begins with the
//!   eight bytes decoded by [`SectionHeader`](struct.SectionHeader.html).
//! * A section may span several transport stream *Packets* of the same PID.
//!   [`SectionBuffer`](struct.SectionBuffer.html) collects the pieces into a fixed-size buffer
//!   until the whole section is present.
//! * Each table type has a `parse()` function taking the bytes of one complete section.  Any
//!   field which would be read from beyond the end of the section aborts that table with a
//!   [`PsiError`](enum.PsiError.html).

pub mod eiss;
pub mod pat;
pub mod pmt;

use crate::cursor::ByteCursor;
use log::warn;
use std::fmt;

/// Problems found while decoding a table section.  None of these are fatal to the stream;
/// the table is skipped and decoding resumes with the next packet.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum PsiError {
    /// A field extends beyond the end of the available data.
    NotEnoughData {
        field: &'static str,
        expected: usize,
        actual: usize,
    },
    /// The section carried a `table_id` not valid for the PID it arrived on.
    UnexpectedTableId { expected: u8, actual: u8 },
    /// `section_length` is smaller than the fixed fields of the table require.
    SectionTooShort {
        section_length: usize,
        minimum: usize,
    },
}

impl fmt::Display for PsiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PsiError::NotEnoughData {
                field,
                expected,
                actual,
            } => write!(
                f,
                "not enough data for {}: expected {} bytes, got {}",
                field, expected, actual
            ),
            PsiError::UnexpectedTableId { expected, actual } => {
                write!(f, "expected table_id {:#04x}, got {:#04x}", expected, actual)
            }
            PsiError::SectionTooShort {
                section_length,
                minimum,
            } => write!(
                f,
                "section_length {} shorter than minimum {}",
                section_length, minimum
            ),
        }
    }
}

impl std::error::Error for PsiError {}

pub(crate) fn read_u8(r: &mut ByteCursor<'_>, field: &'static str) -> Result<u8, PsiError> {
    r.read_u8().ok_or(PsiError::NotEnoughData {
        field,
        expected: 1,
        actual: 0,
    })
}

pub(crate) fn read_u16(r: &mut ByteCursor<'_>, field: &'static str) -> Result<u16, PsiError> {
    let actual = r.remaining().min(2);
    r.read_u16().ok_or(PsiError::NotEnoughData {
        field,
        expected: 2,
        actual,
    })
}

pub(crate) fn read_slice<'buf>(
    r: &mut ByteCursor<'buf>,
    len: usize,
    field: &'static str,
) -> Result<&'buf [u8], PsiError> {
    let actual = r.remaining();
    r.read_slice(len).ok_or(PsiError::NotEnoughData {
        field,
        expected: len,
        actual,
    })
}

/// Is the table applicable now, or only once the next version takes effect.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum CurrentNext {
    Current,
    Next,
}

impl CurrentNext {
    fn from_bit(v: u8) -> CurrentNext {
        if v & 1 == 1 {
            CurrentNext::Current
        } else {
            CurrentNext::Next
        }
    }
}

/// The common PSI section header followed by the five bytes of 'table syntax'.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct SectionHeader {
    pub table_id: u8,
    pub section_syntax_indicator: bool,
    /// 12-bit count of the bytes following the `section_length` field, CRC included.
    pub section_length: usize,
    /// `transport_stream_id` in a PAT, `program_number` in a PMT, `table_id_extension` elsewhere.
    pub id: u16,
    pub version: u8,
    pub current_next: CurrentNext,
    pub section_number: u8,
    pub last_section_number: u8,
}

impl SectionHeader {
    /// Bytes occupied by the common header (table_id and section_length).
    pub const COMMON_SIZE: usize = 3;
    /// Bytes occupied by the whole header this type decodes.
    pub const SIZE: usize = 8;
    /// Bytes of the section after `section_length` which belong to this header.
    pub const SYNTAX_SIZE: usize = Self::SIZE - Self::COMMON_SIZE;
    /// The trailing CRC_32.
    pub const CRC_SIZE: usize = 4;

    pub fn read(r: &mut ByteCursor<'_>) -> Result<SectionHeader, PsiError> {
        let table_id = read_u8(r, "table_id")?;
        let len_word = read_u16(r, "section_length")?;
        let id = read_u16(r, "table_id_extension")?;
        let ver = read_u8(r, "version_number")?;
        let section_number = read_u8(r, "section_number")?;
        let last_section_number = read_u8(r, "last_section_number")?;
        Ok(SectionHeader {
            table_id,
            section_syntax_indicator: len_word & 0x8000 != 0,
            section_length: (len_word & 0x0fff) as usize,
            id,
            version: (ver >> 1) & 0b0001_1111,
            current_next: CurrentNext::from_bit(ver),
            section_number,
            last_section_number,
        })
    }

    /// Fails if the section is too short to hold `minimum` bytes after `section_length`.
    pub fn require_length(&self, minimum: usize) -> Result<(), PsiError> {
        if self.section_length < minimum {
            Err(PsiError::SectionTooShort {
                section_length: self.section_length,
                minimum,
            })
        } else {
            Ok(())
        }
    }
}

/// `table_id` value used for stuffing after the last section in a packet.
pub const STUFFING_TABLE_ID: u8 = 0xff;

/// 3 bytes of common header plus the 1021 byte `section_length` limit.
pub const MAX_SECTION_SIZE: usize = 1024;

/// Collects the pieces of one section which may be spread across several packets.
///
/// Storage is a fixed array, so reassembly performs no allocation.
pub struct SectionBuffer {
    buf: [u8; MAX_SECTION_SIZE],
    len: usize,
    expected: Option<usize>,
    active: bool,
}

impl Default for SectionBuffer {
    fn default() -> Self {
        SectionBuffer {
            buf: [0; MAX_SECTION_SIZE],
            len: 0,
            expected: None,
            active: false,
        }
    }
}

impl SectionBuffer {
    /// Begins a new section with `data`, which starts at the `table_id` byte.  Any incomplete
    /// section is discarded.  Returns `true` once the whole section is buffered.
    pub fn start(&mut self, data: &[u8]) -> bool {
        if self.is_pending() {
            warn!(
                "discarding incomplete section ({} of {:?} bytes)",
                self.len, self.expected
            );
        }
        self.reset();
        if data.first() == Some(&STUFFING_TABLE_ID) {
            return false;
        }
        self.active = true;
        self.append(data)
    }

    /// Adds the payload of a continuation packet.  Ignored if no section has been started.
    pub fn extend(&mut self, data: &[u8]) -> bool {
        if !self.is_pending() {
            return false;
        }
        self.append(data)
    }

    pub fn is_complete(&self) -> bool {
        matches!(self.expected, Some(e) if self.len >= e)
    }

    /// True if a section has been started and is waiting for continuation packets.
    pub fn is_pending(&self) -> bool {
        self.active && !self.is_complete()
    }

    /// The complete section, common header and CRC included.  Empty until complete.
    pub fn section(&self) -> &[u8] {
        match self.expected {
            Some(e) if self.len >= e => &self.buf[..e],
            _ => &[],
        }
    }

    pub fn reset(&mut self) {
        self.len = 0;
        self.expected = None;
        self.active = false;
    }

    fn append(&mut self, data: &[u8]) -> bool {
        let room = MAX_SECTION_SIZE - self.len;
        let n = data.len().min(room);
        self.buf[self.len..self.len + n].copy_from_slice(&data[..n]);
        self.len += n;
        if self.expected.is_none() && self.len >= SectionHeader::COMMON_SIZE {
            let section_length = (usize::from(self.buf[1] & 0x0f) << 8) | usize::from(self.buf[2]);
            let total = SectionHeader::COMMON_SIZE + section_length;
            if total > MAX_SECTION_SIZE {
                warn!(
                    "section_length {} exceeds limit {}",
                    section_length,
                    MAX_SECTION_SIZE - SectionHeader::COMMON_SIZE
                );
                self.reset();
                return false;
            }
            self.expected = Some(total);
        }
        self.is_complete()
    }
}

//! Types related to the _Program Map Table_

use super::{read_slice, read_u16, read_u8, PsiError, SectionHeader};
use crate::bounded::{BoundedList, MAX_DESCRIPTORS, MAX_STREAMS};
use crate::cursor::ByteCursor;
use crate::descriptor::Descriptor;
use crate::packet::Pid;
use crate::StreamType;
use log::warn;

/// The `table_id` of a TS_program_map_section.
pub const PMT_TABLE_ID: u8 = 0x02;

/// One elementary stream listed in a PMT.
///
/// Only the first descriptor of the stream's ES_info loop is kept; the rest of the loop is
/// skipped.
#[derive(Clone, Debug, PartialEq)]
pub struct StreamInfo {
    pub stream_type: StreamType,
    pub elementary_pid: Pid,
    pub es_info_length: usize,
    pub descriptor: Option<Descriptor>,
}

impl StreamInfo {
    const HEADER_SIZE: usize = 5;

    fn read(r: &mut ByteCursor<'_>) -> Result<StreamInfo, PsiError> {
        let stream_type = StreamType::from(read_u8(r, "stream_type")?);
        let pid_word = read_u16(r, "elementary_PID")?;
        let es_info_length = (read_u16(r, "ES_info_length")? & 0x0fff) as usize;
        let es_info = read_slice(r, es_info_length, "ES_info")?;
        let descriptor = if es_info.len() >= 2 {
            match Descriptor::read(&mut ByteCursor::new(es_info)) {
                Ok(d) => Some(d),
                Err(e) => {
                    warn!("ignoring malformed ES_info descriptor: {}", e);
                    None
                }
            }
        } else {
            None
        };
        Ok(StreamInfo {
            stream_type,
            elementary_pid: Pid::from_masked((pid_word >> 8) as u8, pid_word as u8),
            es_info_length,
            descriptor,
        })
    }

    /// Bytes this entry occupies within the section.
    pub fn encoded_len(&self) -> usize {
        Self::HEADER_SIZE + self.es_info_length
    }
}

/// The decoded content of one PMT section.
#[derive(Clone, Debug, PartialEq)]
pub struct ProgramMap {
    pub header: SectionHeader,
    pub pcr_pid: Pid,
    pub program_info_length: usize,
    /// Program-level descriptors; at most `MAX_DESCRIPTORS` are retained.
    pub descriptors: BoundedList<Descriptor, MAX_DESCRIPTORS>,
    /// Elementary streams; at most `MAX_STREAMS` are retained.
    pub streams: BoundedList<StreamInfo, MAX_STREAMS>,
    /// PIDs of the first two streams of type `StreamType::EtvSignaling`.
    pub eiss_pids: [Option<Pid>; 2],
}

impl ProgramMap {
    /// Fixed fields after `section_length`: table syntax, PCR_PID, program_info_length, CRC.
    const FIXED_SIZE: usize = SectionHeader::SYNTAX_SIZE + 4 + SectionHeader::CRC_SIZE;

    /// Decodes one complete PMT section, beginning at the `table_id` byte.
    pub fn parse(section: &[u8]) -> Result<ProgramMap, PsiError> {
        Self::parse_with(section, |_| ())
    }

    /// Like `parse()`, additionally passing every stream entry to `on_stream`, including those
    /// beyond the number retained in `streams`.
    pub fn parse_with<F>(section: &[u8], mut on_stream: F) -> Result<ProgramMap, PsiError>
    where
        F: FnMut(&StreamInfo),
    {
        let mut r = ByteCursor::new(section);
        let header = SectionHeader::read(&mut r)?;
        if header.table_id != PMT_TABLE_ID {
            return Err(PsiError::UnexpectedTableId {
                expected: PMT_TABLE_ID,
                actual: header.table_id,
            });
        }
        header.require_length(Self::FIXED_SIZE)?;
        let pcr_word = read_u16(&mut r, "PCR_PID")?;
        let program_info_length = (read_u16(&mut r, "program_info_length")? & 0x0fff) as usize;
        header.require_length(Self::FIXED_SIZE + program_info_length)?;

        let mut pmt = ProgramMap {
            pcr_pid: Pid::from_masked((pcr_word >> 8) as u8, pcr_word as u8),
            program_info_length,
            descriptors: BoundedList::new(),
            streams: BoundedList::new(),
            eiss_pids: [None, None],
            header,
        };

        let program_info = read_slice(&mut r, program_info_length, "program_info")?;
        let mut d = ByteCursor::new(program_info);
        while d.remaining() > 0 {
            match Descriptor::read(&mut d) {
                Ok(desc) => {
                    pmt.descriptors.push(desc);
                }
                Err(e) => {
                    warn!("malformed program_info descriptor: {}", e);
                    break;
                }
            }
        }

        let streams_len = pmt.header.section_length - Self::FIXED_SIZE - program_info_length;
        let mut consumed = 0;
        let mut eiss_found = 0;
        while consumed < streams_len {
            let info = StreamInfo::read(&mut r)?;
            consumed += info.encoded_len();
            if info.stream_type == StreamType::EtvSignaling && eiss_found < pmt.eiss_pids.len() {
                pmt.eiss_pids[eiss_found] = Some(info.elementary_pid);
                eiss_found += 1;
            }
            on_stream(&info);
            pmt.streams.push(info);
        }
        Ok(pmt)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use assert_matches::assert_matches;
    use bitstream_io::{BigEndian, BitWrite, BitWriter, BE};
    use std::io;

    fn make_test_data<F>(builder: F) -> Vec<u8>
    where
        F: Fn(&mut BitWriter<Vec<u8>, BE>) -> Result<(), io::Error>,
    {
        let data: Vec<u8> = Vec::new();
        let mut w = BitWriter::endian(data, BigEndian);
        builder(&mut w).unwrap();
        w.into_writer()
    }

    fn write_header(
        w: &mut BitWriter<Vec<u8>, BE>,
        section_length: usize,
    ) -> Result<(), io::Error> {
        w.write(8, PMT_TABLE_ID)?;
        w.write_bit(true)?; // section_syntax_indicator
        w.write_bit(false)?;
        w.write(2, 3u8)?;
        w.write(12, section_length as u16)?;
        w.write(16, 1001u16)?; // program_number
        w.write(2, 3u8)?;
        w.write(5, 0u8)?; // version
        w.write_bit(true)?;
        w.write(8, 0u8)?;
        w.write(8, 0u8)
    }

    #[test]
    fn streams_and_descriptors() {
        let section = make_test_data(|w| {
            // 9 fixed + 5 program descriptor + 2 streams of (5 + 3) + 4 CRC
            write_header(w, 9 + 5 + 16 + 4)?;
            w.write(3, 7u8)?;
            w.write(13, 0x1e1u16)?; // PCR_PID
            w.write(4, 15u8)?;
            w.write(12, 5u16)?; // program_info_length
            w.write_bytes(&[0x05, 0x03, b'E', b'T', b'V'])?;

            w.write(8, 0x1bu8)?; // H.264
            w.write(3, 7u8)?;
            w.write(13, 0x1e1u16)?;
            w.write(4, 15u8)?;
            w.write(12, 3u16)?;
            w.write_bytes(&[0x52, 0x01, 0x01])?;

            w.write(8, 0xc0u8)?; // EISS
            w.write(3, 7u8)?;
            w.write(13, 0x1f0u16)?;
            w.write(4, 15u8)?;
            w.write(12, 3u16)?;
            w.write_bytes(&[0x52, 0x01, 0x02])?;
            w.write(32, 0u32)
        });
        let mut seen = vec![];
        let pmt = ProgramMap::parse_with(&section[..], |s| seen.push(s.elementary_pid)).unwrap();
        assert_eq!(pmt.header.id, 1001);
        assert_eq!(pmt.pcr_pid, Pid::new(0x1e1));
        assert_eq!(pmt.descriptors.len(), 1);
        assert_eq!(pmt.descriptors[0].tag(), 5);
        assert_eq!(pmt.descriptors[0].payload(), b"ETV");
        assert_eq!(pmt.streams.len(), 2);
        assert_eq!(pmt.streams[0].stream_type, StreamType::H264);
        assert_eq!(pmt.streams[1].descriptor.as_ref().map(|d| d.tag()), Some(0x52));
        assert_eq!(pmt.eiss_pids, [Some(Pid::new(0x1f0)), None]);
        assert_eq!(seen, vec![Pid::new(0x1e1), Pid::new(0x1f0)]);
    }

    #[test]
    fn bounded_streams_and_descriptors() {
        let stream_count = 40u16;
        let descriptor_count = 10;
        let section = make_test_data(|w| {
            let program_info_length = descriptor_count * 2;
            write_header(w, 9 + program_info_length + 5 * stream_count as usize + 4)?;
            w.write(3, 7u8)?;
            w.write(13, 0x100u16)?;
            w.write(4, 15u8)?;
            w.write(12, program_info_length as u16)?;
            for tag in 0..descriptor_count {
                w.write(8, 0x40 + tag as u8)?;
                w.write(8, 0u8)?;
            }
            for i in 0..stream_count {
                w.write(8, 0xc0u8)?;
                w.write(3, 7u8)?;
                w.write(13, 0x200 + i)?;
                w.write(4, 15u8)?;
                w.write(12, 0u16)?;
            }
            w.write(32, 0u32)
        });
        let mut count = 0;
        let pmt = ProgramMap::parse_with(&section[..], |_| count += 1).unwrap();
        assert_eq!(count, 40);
        assert_eq!(pmt.streams.len(), MAX_STREAMS);
        assert_eq!(pmt.streams.seen(), 40);
        assert_eq!(pmt.streams[31].elementary_pid, Pid::new(0x200 + 31));
        assert_eq!(pmt.descriptors.len(), MAX_DESCRIPTORS);
        assert_eq!(pmt.descriptors.seen(), 10);
        // only the first two EISS streams are recorded
        assert_eq!(pmt.eiss_pids, [Some(Pid::new(0x200)), Some(Pid::new(0x201))]);
    }

    #[test]
    fn program_info_longer_than_section() {
        let section = make_test_data(|w| {
            write_header(w, 13)?;
            w.write(3, 7u8)?;
            w.write(13, 0x100u16)?;
            w.write(4, 15u8)?;
            w.write(12, 20u16)?; // program_info_length
            w.write(32, 0u32)
        });
        assert_matches!(
            ProgramMap::parse(&section[..]),
            Err(PsiError::SectionTooShort { minimum: 33, .. })
        );
    }

    #[test]
    fn truncated_stream_loop() {
        let section = make_test_data(|w| {
            write_header(w, 9 + 10 + 4)?;
            w.write(3, 7u8)?;
            w.write(13, 0x100u16)?;
            w.write(4, 15u8)?;
            w.write(12, 0u16)?;
            w.write(8, 0x02u8)?;
            w.write(3, 7u8)?;
            w.write(13, 0x101u16)?;
            w.write(4, 15u8)?;
            w.write(4, 0u8) // data ends mid-entry, inside ES_info_length
        });
        assert_matches!(
            ProgramMap::parse(&section[..]),
            Err(PsiError::NotEnoughData { .. })
        );
    }
}

//! Types related to the _Program Association Table_

use super::{read_u16, PsiError, SectionHeader};
use crate::cursor::ByteCursor;
use crate::packet::Pid;

/// The `table_id` of a program_association_section.
pub const PAT_TABLE_ID: u8 = 0x00;

/// One `program_number` to PID entry of the PAT.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProgramDescriptor {
    /// `program_number` zero names the PID of the Network Information Table
    Network { pid: Pid },
    Program { program_number: u16, pid: Pid },
}

impl ProgramDescriptor {
    pub const SIZE: usize = 4;

    fn read(r: &mut ByteCursor<'_>) -> Result<ProgramDescriptor, PsiError> {
        let program_number = read_u16(r, "program_number")?;
        let pid_word = read_u16(r, "program_map_PID")?;
        let pid = Pid::from_masked((pid_word >> 8) as u8, pid_word as u8);
        Ok(if program_number == 0 {
            ProgramDescriptor::Network { pid }
        } else {
            ProgramDescriptor::Program {
                program_number,
                pid,
            }
        })
    }
}

/// The decoded content of one PAT section.
///
/// Only a single program is supported: when several programs are listed the mapping which
/// appears last in the section is the one retained.
#[derive(Clone, Debug, PartialEq)]
pub struct ProgramAssociation {
    pub header: SectionHeader,
    /// The last program listed, if any.
    pub program_number: Option<u16>,
    /// PMT PID of the last program listed.
    pub pmt_pid: Option<Pid>,
    /// PID of the Network Information Table, if announced.
    pub network_pid: Option<Pid>,
    /// How many program entries the section contained.
    pub program_count: usize,
}

impl ProgramAssociation {
    /// Fixed fields after `section_length`: table syntax plus CRC.
    const FIXED_SIZE: usize = SectionHeader::SYNTAX_SIZE + SectionHeader::CRC_SIZE;

    /// Decodes one complete PAT section, beginning at the `table_id` byte.
    pub fn parse(section: &[u8]) -> Result<ProgramAssociation, PsiError> {
        let mut r = ByteCursor::new(section);
        let header = SectionHeader::read(&mut r)?;
        if header.table_id != PAT_TABLE_ID {
            return Err(PsiError::UnexpectedTableId {
                expected: PAT_TABLE_ID,
                actual: header.table_id,
            });
        }
        header.require_length(Self::FIXED_SIZE)?;
        let mut pat = ProgramAssociation {
            header,
            program_number: None,
            pmt_pid: None,
            network_pid: None,
            program_count: 0,
        };
        let loop_len = pat.header.section_length - Self::FIXED_SIZE;
        let mut consumed = 0;
        while consumed < loop_len {
            match ProgramDescriptor::read(&mut r)? {
                ProgramDescriptor::Network { pid } => pat.network_pid = Some(pid),
                ProgramDescriptor::Program {
                    program_number,
                    pid,
                } => {
                    pat.program_number = Some(program_number);
                    pat.pmt_pid = Some(pid);
                    pat.program_count += 1;
                }
            }
            consumed += ProgramDescriptor::SIZE;
        }
        Ok(pat)
    }
}

//! Types related to the OpenCable _ETV Integrated Signaling Stream_ (EISS) table
//!
//! An EISS section announces one interactive application: its identity, the platforms it
//! targets, and an application information descriptor giving control code, versions and the
//! locator from which the application can be fetched.

use super::{read_slice, read_u16, read_u8, PsiError, SectionHeader};
use crate::cursor::ByteCursor;
use log::{info, warn};

/// `table_id` of an EISS section.
pub const EISS_TABLE_ID: u8 = 0xe0;
/// Alternate `table_id` also carrying EISS content.
pub const EISS_ALT_TABLE_ID: u8 = 0xe2;
/// Tag of the application information descriptor.
pub const APP_INFO_DESCRIPTOR_TAG: u8 = 0xe0;

/// True for the `table_id` values decoded as EISS; other tables on an EISS PID are skipped.
pub fn is_eiss_table_id(table_id: u8) -> bool {
    table_id == EISS_TABLE_ID || table_id == EISS_ALT_TABLE_ID
}

/// The content of the application information descriptor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EissAppDescriptor {
    pub application_control_code: u8,
    pub application_version_major: u8,
    pub application_version_minor: u8,
    pub max_protocol_version_major: u8,
    pub max_protocol_version_minor: u8,
    pub test_application: bool,
    pub application_priority: u8,
    /// 10-bit locator type
    pub locator_type: u16,
    /// 10-bit length of the locator structure
    pub locator_length: u16,
    /// Length of the resource locator string; the string itself is logged, not retained.
    pub resource_locator_length: usize,
}

impl EissAppDescriptor {
    /// Decodes the descriptor payload (the bytes after tag and length).
    pub fn parse(payload: &[u8]) -> Result<EissAppDescriptor, PsiError> {
        let mut r = ByteCursor::new(payload);
        let application_control_code = read_u8(&mut r, "application_control_code")?;
        let application_version_major = read_u8(&mut r, "application_version_major")?;
        let application_version_minor = read_u8(&mut r, "application_version_minor")?;
        let max_protocol_version_major = read_u8(&mut r, "max_protocol_version_major")?;
        let max_protocol_version_minor = read_u8(&mut r, "max_protocol_version_minor")?;
        let flags = read_u8(&mut r, "test_application_flag")?;
        let application_priority = read_u8(&mut r, "application_priority")?;
        // 4 reserved bits, 10 bits locator_type, 10 bits locator_length
        let locator_word = r.read_u24().ok_or(PsiError::NotEnoughData {
            field: "locator",
            expected: 3,
            actual: r.remaining(),
        })?;
        let locator_type = ((locator_word >> 10) & 0x03ff) as u16;
        let locator_length = (locator_word & 0x03ff) as u16;
        let locator = read_slice(&mut r, locator_length as usize, "locator")?;
        let mut l = ByteCursor::new(locator);
        let url_length = read_u8(&mut l, "resource_locator_length")? as usize;
        let url = read_slice(&mut l, url_length, "resource_locator")?;
        info!(
            "EISS resource locator (type {}): {}",
            locator_type,
            encoding_rs::mem::decode_latin1(url)
        );
        Ok(EissAppDescriptor {
            application_control_code,
            application_version_major,
            application_version_minor,
            max_protocol_version_major,
            max_protocol_version_minor,
            test_application: flags & 0b1000_0000 != 0,
            application_priority,
            locator_type,
            locator_length,
            resource_locator_length: url_length,
        })
    }
}

/// The decoded content of one EISS section.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EissTable {
    pub header: SectionHeader,
    pub protocol_version_major: u8,
    pub protocol_version_minor: u8,
    pub application_type: u16,
    /// organization_id (32 bits) followed by application_id (16 bits)
    pub application_id: [u8; 6],
    pub platform_id_length: usize,
    pub app_descriptor: Option<EissAppDescriptor>,
}

impl EissTable {
    /// Decodes one complete EISS section, beginning at the `table_id` byte.
    pub fn parse(section: &[u8]) -> Result<EissTable, PsiError> {
        let mut r = ByteCursor::new(section);
        let header = SectionHeader::read(&mut r)?;
        if !is_eiss_table_id(header.table_id) {
            return Err(PsiError::UnexpectedTableId {
                expected: EISS_TABLE_ID,
                actual: header.table_id,
            });
        }
        header.require_length(SectionHeader::SYNTAX_SIZE + SectionHeader::CRC_SIZE)?;
        // everything up to the CRC
        let body_end = SectionHeader::COMMON_SIZE + header.section_length - SectionHeader::CRC_SIZE;

        let protocol_version_major = read_u8(&mut r, "protocol_version_major")?;
        let protocol_version_minor = read_u8(&mut r, "protocol_version_minor")?;
        let application_type = read_u16(&mut r, "application_type")?;
        let mut application_id = [0u8; 6];
        application_id.copy_from_slice(read_slice(&mut r, 6, "application_identifier")?);
        let platform_id_length = read_u8(&mut r, "platform_id_data_length")? as usize;
        read_slice(&mut r, platform_id_length, "platform_id_data")?;

        let mut app_descriptor = None;
        while r.position() + 2 <= body_end {
            let tag = read_u8(&mut r, "descriptor_tag")?;
            let len = read_u8(&mut r, "descriptor_length")? as usize;
            let payload = read_slice(&mut r, len, "descriptor")?;
            if tag == APP_INFO_DESCRIPTOR_TAG && app_descriptor.is_none() {
                match EissAppDescriptor::parse(payload) {
                    Ok(d) => app_descriptor = Some(d),
                    Err(e) => warn!("malformed EISS application descriptor: {}", e),
                }
            }
        }

        Ok(EissTable {
            header,
            protocol_version_major,
            protocol_version_minor,
            application_type,
            application_id,
            platform_id_length,
            app_descriptor,
        })
    }
}

//! Descriptors attached to PSI tables and to their entries.
//!
//! Descriptors are copied into fixed inline storage so that a decoded table does not borrow from
//! the packet buffer it came from, and decoding never allocates.

use crate::cursor::ByteCursor;
use crate::psi::PsiError;
use std::fmt;

/// Maximum payload size of one descriptor; the length field is a single byte.
pub const MAX_DESCRIPTOR_PAYLOAD: usize = 256;

/// One `tag`, `length`, `payload` triple.
#[derive(Clone, PartialEq)]
pub struct Descriptor {
    tag: u8,
    len: u8,
    payload: [u8; MAX_DESCRIPTOR_PAYLOAD],
}

impl Descriptor {
    /// ISO 639 language descriptor tag, rendered specially in diagnostics.
    pub const ISO_639_LANGUAGE_TAG: u8 = 10;

    /// Reads one descriptor.  On a short read the cursor may have consumed the tag and length
    /// bytes.
    pub fn read(r: &mut ByteCursor<'_>) -> Result<Descriptor, PsiError> {
        let tag = r.read_u8().ok_or(PsiError::NotEnoughData {
            field: "descriptor_tag",
            expected: 1,
            actual: 0,
        })?;
        let len = r.read_u8().ok_or(PsiError::NotEnoughData {
            field: "descriptor_length",
            expected: 1,
            actual: 0,
        })?;
        let mut payload = [0u8; MAX_DESCRIPTOR_PAYLOAD];
        let got = r.read_into(&mut payload[..len as usize]);
        if got < len as usize {
            return Err(PsiError::NotEnoughData {
                field: "descriptor payload",
                expected: len as usize,
                actual: got,
            });
        }
        Ok(Descriptor { tag, len, payload })
    }

    pub fn tag(&self) -> u8 {
        self.tag
    }

    /// The _descriptor_length_ value, excluding the two header bytes.
    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload[..self.len as usize]
    }

    /// Total bytes occupied in the table, header included.
    pub fn encoded_len(&self) -> usize {
        2 + self.len as usize
    }
}

impl fmt::Debug for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        let mut d = f.debug_struct("Descriptor");
        d.field("tag", &format_args!("{:#04x}", self.tag))
            .field("len", &self.len);
        if self.tag == Self::ISO_639_LANGUAGE_TAG && self.len >= 3 {
            let code = encoding_rs::mem::decode_latin1(&self.payload()[..3]);
            d.field("language", &code);
        } else {
            d.field("payload", &format_args!("{:02x?}", self.payload()));
        }
        d.finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use assert_matches::assert_matches;
    use hex_literal::hex;

    #[test]
    fn read_descriptor() {
        let data = hex!("0a04656e6700 ff");
        let mut r = ByteCursor::new(&data[..]);
        let d = Descriptor::read(&mut r).unwrap();
        assert_eq!(d.tag(), 10);
        assert_eq!(d.len(), 4);
        assert_eq!(d.payload(), &hex!("656e6700")[..]);
        assert_eq!(d.encoded_len(), 6);
        assert_eq!(r.position(), 6);
        assert!(format!("{:?}", d).contains("eng"));
    }

    #[test]
    fn truncated_payload() {
        let data = hex!("0505 4355");
        let mut r = ByteCursor::new(&data[..]);
        assert_matches!(
            Descriptor::read(&mut r),
            Err(PsiError::NotEnoughData {
                expected: 5,
                actual: 2,
                ..
            })
        );
    }
}

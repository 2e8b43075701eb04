//! Framing of a TRE inside an extension area.

use binrw::{BinRead, BinWrite};

use crate::error::{Error, Result};
use crate::field::is_bcs_a;

/// Header preceding every TRE payload
///
/// Six bytes of tag, left justified and padded with blanks, followed by the payload length as five
/// decimal digits.
#[derive(BinRead, BinWrite, Debug, Copy, Clone, PartialEq, Eq)]
#[brw(big)]
pub struct TreHeader {
    /// The tag of the TRE
    #[br(assert(is_bcs_a(&tag), "tag is not printable text"))]
    pub tag: [u8; 6],

    /// The length of the payload in ASCII digits
    #[br(assert(length.iter().all(u8::is_ascii_digit), "length is not numeric"))]
    pub length: [u8; 5],
}

impl TreHeader {
    /// Size of the header in bytes
    pub const SIZE: usize = 11;

    /// Largest payload a header can announce
    pub const MAX_LENGTH: usize = 99_999;

    pub fn new(tag: &str, length: usize) -> Result<TreHeader> {
        if tag.is_empty() || tag.len() > 6 || !is_bcs_a(tag.as_bytes()) {
            return Err(Error::InvalidHeader(format!(
                "`{tag}` is not a valid TRE tag"
            )));
        }
        if length > Self::MAX_LENGTH {
            return Err(Error::InvalidHeader(format!(
                "{tag} payload of {length} bytes does not fit in five digits"
            )));
        }

        let mut header = TreHeader {
            tag: [b' '; 6],
            length: [0; 5],
        };
        header.tag[..tag.len()].copy_from_slice(tag.as_bytes());
        header
            .length
            .copy_from_slice(format!("{length:05}").as_bytes());
        Ok(header)
    }

    /// The tag without its padding
    pub fn tag(&self) -> Result<&str> {
        std::str::from_utf8(&self.tag)
            .map(|tag| tag.trim_end())
            .map_err(|_| Error::InvalidHeader("tag is not printable text".to_owned()))
    }

    /// The announced payload length
    pub fn length(&self) -> Result<usize> {
        std::str::from_utf8(&self.length)
            .ok()
            .and_then(|length| length.parse().ok())
            .ok_or_else(|| {
                Error::InvalidHeader(format!(
                    "length `{}` is not numeric",
                    String::from_utf8_lossy(&self.length)
                ))
            })
    }
}

#[cfg(test)]
mod test {
    use std::io::Cursor;

    use binrw::BinRead;
    use binrw::BinWrite;
    use pretty_assertions::assert_eq;

    use crate::error::{ErrorKind, Result};
    use crate::types::TreHeader;

    #[test]
    fn read_header() -> Result<()> {
        #[rustfmt::skip]
        let mut input = Cursor::new(vec![
            0x45, 0x4E, 0x47, 0x52, 0x44, 0x41,
            0x30, 0x30, 0x30, 0x35, 0x34,
        ]);

        let header = TreHeader::read(&mut input)?;
        assert_eq!(header.tag()?, "ENGRDA");
        assert_eq!(header.length()?, 54);

        Ok(())
    }

    #[test]
    fn read_padded_tag() -> Result<()> {
        let mut input = Cursor::new(b"XYZ   00005".to_vec());

        let header = TreHeader::read(&mut input)?;
        assert_eq!(header.tag()?, "XYZ");
        assert_eq!(header.length()?, 5);

        Ok(())
    }

    #[test]
    fn read_invalid_length() {
        let mut input = Cursor::new(b"ENGRDA00A54".to_vec());

        let err = crate::error::Error::from(TreHeader::read(&mut input).unwrap_err());
        assert_eq!(err.kind(), ErrorKind::InvalidHeader);
    }

    #[test]
    fn read_short_header() {
        let mut input = Cursor::new(b"ENGRDA00".to_vec());
        assert!(TreHeader::read(&mut input).is_err());
    }

    #[test]
    fn write_header() -> Result<()> {
        let mut output = Cursor::new(Vec::new());
        TreHeader::new("XYZ", 42)?.write(&mut output)?;

        assert_eq!(output.into_inner(), b"XYZ   00042");

        Ok(())
    }

    #[test]
    fn reject_invalid_headers() {
        let err = TreHeader::new("TOOLONGTAG", 1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidHeader);

        let err = TreHeader::new("ENGRDA", 100_000).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidHeader);
    }
}

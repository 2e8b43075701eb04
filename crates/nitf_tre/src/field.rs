//! Typed leaf values stored in a TRE.

use byteorder::{BigEndian, ByteOrder};
use std::fmt;

use crate::error::{Error, Result};

/// How the bytes of a [`Field`] are interpreted
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// Basic character set text (BCS-A), left justified and padded with blanks
    Alpha,

    /// Basic character set numerics (BCS-N), right justified and padded with zeros
    Numeric,

    /// Raw bytes, multi-byte numbers are stored in network byte order
    Binary,
}

impl FieldKind {
    /// The byte a blank field of this kind is filled with
    pub const fn fill(self) -> u8 {
        match self {
            FieldKind::Alpha => b' ',
            FieldKind::Numeric => b'0',
            FieldKind::Binary => 0,
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FieldKind::Alpha => "BCS-A",
            FieldKind::Numeric => "BCS-N",
            FieldKind::Binary => "binary",
        })
    }
}

/// A single value of a TRE
///
/// The width of a field is the length of its raw bytes, there is no way to build a field whose
/// content is shorter or longer than its width. Conversions are lazy: the raw bytes are kept
/// exactly as read and only interpreted by the accessors.
///
/// ```
/// use nitf_tre::field::{Field, FieldKind};
///
/// # fn doit() -> nitf_tre::error::Result<()> {
/// let count = Field::from_integer(FieldKind::Numeric, 5, 42)?;
/// assert_eq!(count.raw(), b"00042");
/// assert_eq!(count.as_integer()?, 42);
///
/// let name = Field::from_text(FieldKind::Alpha, 6, "AB")?;
/// assert_eq!(name.raw(), b"AB    ");
/// assert_eq!(name.as_string(), "AB");
/// # Ok(())
/// # }
/// # doit().unwrap();
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Field {
    kind: FieldKind,
    raw: Box<[u8]>,
}

impl Field {
    /// Wrap raw bytes, the width of the field is their length
    pub fn from_raw(kind: FieldKind, raw: impl Into<Box<[u8]>>) -> Field {
        Field {
            kind,
            raw: raw.into(),
        }
    }

    /// A field of the given width holding the blank value for its kind
    pub fn blank(kind: FieldKind, width: usize) -> Field {
        Field::from_raw(kind, vec![kind.fill(); width])
    }

    /// Build a field from text, padding it to `width`
    ///
    /// Alpha text must be printable ASCII and is padded with trailing blanks. Numeric text must be
    /// BCS-N and is padded with leading zeros, keeping a sign in the first position. Binary fields
    /// take the bytes of the text followed by zero bytes.
    pub fn from_text(kind: FieldKind, width: usize, value: &str) -> Result<Field> {
        let bytes = value.as_bytes();
        match kind {
            FieldKind::Alpha if !is_bcs_a(bytes) => {
                return Err(Error::InvalidContent {
                    kind,
                    reason: format!("`{value}` contains characters outside BCS-A"),
                })
            }
            FieldKind::Numeric if !is_bcs_n(bytes) => {
                return Err(Error::NotNumeric {
                    value: value.to_owned(),
                })
            }
            _ => {}
        }

        if bytes.len() > width {
            return Err(Error::ValueTooLong {
                kind,
                width,
                length: bytes.len(),
            });
        }

        Ok(Field::from_raw(kind, pad(kind, bytes, width)))
    }

    /// Build a field holding a signed integer
    ///
    /// Binary fields of width 1, 2, 4 or 8 store the value big-endian and accept anything that
    /// fits the width either as a signed or as an unsigned number.
    pub fn from_integer(kind: FieldKind, width: usize, value: i64) -> Result<Field> {
        match kind {
            FieldKind::Binary => {
                check_binary_width(width)?;
                let bits = (width * 8) as u32;
                let fits = bits == 64
                    || (value >= -(1i64 << (bits - 1)) && value < (1i64 << bits));
                if !fits {
                    return Err(Error::ValueTooLong {
                        kind,
                        width,
                        length: signed_len(value),
                    });
                }
                let bytes = value.to_be_bytes();
                Ok(Field::from_raw(kind, &bytes[8 - width..]))
            }
            _ => Field::from_text(kind, width, &value.to_string()),
        }
    }

    /// Build a field holding an unsigned integer
    pub fn from_unsigned(kind: FieldKind, width: usize, value: u64) -> Result<Field> {
        match kind {
            FieldKind::Binary => {
                if width == 0 || width > 8 {
                    return Err(Error::InvalidContent {
                        kind,
                        reason: format!("no unsigned integer is {width} bytes wide"),
                    });
                }
                if width < 8 && value >> (width * 8) != 0 {
                    return Err(Error::ValueTooLong {
                        kind,
                        width,
                        length: unsigned_len(value),
                    });
                }
                let mut raw = vec![0u8; width];
                BigEndian::write_uint(&mut raw, value, width);
                Ok(Field::from_raw(kind, raw))
            }
            _ => Field::from_text(kind, width, &value.to_string()),
        }
    }

    /// Build a field holding a real number
    ///
    /// Text kinds keep as many decimals as fit the width. Binary fields must be 4 or 8 bytes wide
    /// and hold an IEEE-754 value in network byte order.
    pub fn from_real(kind: FieldKind, width: usize, value: f64) -> Result<Field> {
        if kind == FieldKind::Binary {
            return match width {
                4 => Ok(Field::from_raw(kind, (value as f32).to_be_bytes())),
                8 => Ok(Field::from_raw(kind, value.to_be_bytes())),
                _ => Err(Error::InvalidContent {
                    kind,
                    reason: format!("no real number is {width} bytes wide"),
                }),
            };
        }

        if !value.is_finite() {
            return Err(Error::InvalidContent {
                kind,
                reason: format!("{value} cannot be written as text"),
            });
        }

        for precision in (0..=width).rev() {
            let text = format!("{value:.precision$}");
            if text.len() <= width {
                return Field::from_text(kind, width, &text);
            }
        }

        Err(Error::ValueTooLong {
            kind,
            width,
            length: format!("{value:.0}").len(),
        })
    }

    /// The kind of this field
    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    /// The width of this field in bytes
    pub fn width(&self) -> usize {
        self.raw.len()
    }

    /// The bytes of this field, exactly as they are stored
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    /// Unwrap and return the raw bytes
    pub fn into_raw(self) -> Box<[u8]> {
        self.raw
    }

    /// The text of this field
    ///
    /// Alpha fields lose their trailing blanks, numeric and binary fields are returned as stored.
    pub fn as_string(&self) -> String {
        let text = String::from_utf8_lossy(&self.raw);
        match self.kind {
            FieldKind::Alpha => text.trim_end_matches(' ').to_owned(),
            _ => text.into_owned(),
        }
    }

    /// The signed integer held by this field
    pub fn as_integer(&self) -> Result<i64> {
        match self.kind {
            FieldKind::Binary => match self.raw.len() {
                1 => Ok(self.raw[0] as i8 as i64),
                2 => Ok(BigEndian::read_i16(&self.raw) as i64),
                4 => Ok(BigEndian::read_i32(&self.raw) as i64),
                8 => Ok(BigEndian::read_i64(&self.raw)),
                _ => Err(self.not_numeric()),
            },
            _ => self.text().trim().parse().map_err(|_| self.not_numeric()),
        }
    }

    /// The unsigned integer held by this field
    pub fn as_unsigned(&self) -> Result<u64> {
        match self.kind {
            FieldKind::Binary => match self.raw.len() {
                width @ 1..=8 => Ok(BigEndian::read_uint(&self.raw, width)),
                _ => Err(self.not_numeric()),
            },
            _ => self.text().trim().parse().map_err(|_| self.not_numeric()),
        }
    }

    /// The real number held by this field
    pub fn as_real(&self) -> Result<f64> {
        match self.kind {
            FieldKind::Binary => match self.raw.len() {
                4 => Ok(BigEndian::read_f32(&self.raw) as f64),
                8 => Ok(BigEndian::read_f64(&self.raw)),
                _ => Err(self.not_numeric()),
            },
            _ => self.text().trim().parse().map_err(|_| self.not_numeric()),
        }
    }

    /// A numeric field holding nothing but blanks
    pub fn is_blank_numeric(&self) -> bool {
        self.kind == FieldKind::Numeric && self.raw.iter().all(|b| *b == b' ')
    }

    /// Integer value when the field drives a width, count or condition
    ///
    /// A blank numeric field counts as zero.
    pub(crate) fn as_reference(&self) -> Result<i64> {
        if self.is_blank_numeric() {
            return Ok(0);
        }
        self.as_integer()
    }

    /// Unsigned counterpart of [`Field::as_reference`], used by bit mask tests
    pub(crate) fn as_reference_bits(&self) -> Result<u64> {
        if self.is_blank_numeric() {
            return Ok(0);
        }
        self.as_unsigned()
    }

    /// Describes how the content breaks the character set of its kind, if it does
    pub(crate) fn charset_violation(&self) -> Option<&'static str> {
        match self.kind {
            FieldKind::Numeric if !is_bcs_n(&self.raw) && !self.is_blank_numeric() => {
                Some("content is not BCS-N")
            }
            FieldKind::Alpha if !is_bcs_a(&self.raw) => Some("content is not BCS-A"),
            _ => None,
        }
    }

    /// Produce a copy of this field that is exactly `width` bytes of `kind`
    ///
    /// Alpha content loses or gains trailing blanks, numeric content loses or gains leading zeros
    /// after the sign. Binary content is never re-padded.
    pub(crate) fn refit(&self, kind: FieldKind, width: usize, key: &str) -> Result<Field> {
        if self.kind == kind && self.raw.len() == width {
            return Ok(self.clone());
        }

        let too_long = |length| Error::FieldTooLong {
            key: key.to_owned(),
            width,
            length,
        };

        if self.kind != kind {
            let blank = self.raw.iter().all(|b| *b == b' ');
            match kind {
                FieldKind::Numeric if !blank && !is_bcs_n(&self.raw) => {
                    return Err(Error::NotNumeric {
                        value: String::from_utf8_lossy(&self.raw).into_owned(),
                    })
                }
                FieldKind::Alpha if !is_bcs_a(&self.raw) => {
                    return Err(Error::InvalidValue {
                        key: key.to_owned(),
                        reason: format!("{} content is not BCS-A", self.kind),
                    })
                }
                _ => {}
            }
        }

        match kind {
            FieldKind::Alpha => {
                let content = trim_end(&self.raw, b' ');
                if content.len() > width {
                    return Err(too_long(content.len()));
                }
                Ok(Field::from_raw(kind, pad(kind, content, width)))
            }
            FieldKind::Numeric => {
                let (sign, mut body) = match self.raw.split_first() {
                    Some((s @ (b'+' | b'-'), rest)) => (Some(*s), rest),
                    _ => (None, &self.raw[..]),
                };
                let sign_len = sign.map_or(0, |_| 1);
                while sign_len + body.len() > width && body.len() > 1 && body[0] == b'0' {
                    body = &body[1..];
                }
                if sign_len + body.len() > width {
                    return Err(too_long(sign_len + body.len()));
                }

                let mut content = Vec::with_capacity(sign_len + body.len());
                content.extend(sign);
                content.extend_from_slice(body);
                Ok(Field::from_raw(kind, pad(kind, &content, width)))
            }
            FieldKind::Binary => {
                if self.raw.len() > width {
                    return Err(too_long(self.raw.len()));
                }
                if self.raw.len() < width {
                    return Err(Error::InvalidValue {
                        key: key.to_owned(),
                        reason: format!(
                            "binary value is {} bytes but the field is {width} wide",
                            self.raw.len()
                        ),
                    });
                }
                Ok(Field::from_raw(kind, self.raw.clone()))
            }
        }
    }

    fn text(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.raw)
    }

    fn not_numeric(&self) -> Error {
        Error::NotNumeric {
            value: self.to_string(),
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            FieldKind::Binary => {
                f.write_str("0x")?;
                for byte in self.raw.iter() {
                    write!(f, "{byte:02X}")?;
                }
                Ok(())
            }
            _ => f.write_str(&self.text()),
        }
    }
}

fn check_binary_width(width: usize) -> Result<()> {
    match width {
        1 | 2 | 4 | 8 => Ok(()),
        _ => Err(Error::InvalidContent {
            kind: FieldKind::Binary,
            reason: format!("no integer is {width} bytes wide"),
        }),
    }
}

/// Bytes needed to hold `value` as a signed number
fn signed_len(value: i64) -> usize {
    let bits = match value {
        0.. => 64 - value.leading_zeros() + 1,
        _ => 64 - value.leading_ones() + 1,
    };
    (bits as usize).div_ceil(8)
}

/// Bytes needed to hold `value` as an unsigned number
fn unsigned_len(value: u64) -> usize {
    ((64 - value.leading_zeros()) as usize).div_ceil(8).max(1)
}

fn trim_end(bytes: &[u8], fill: u8) -> &[u8] {
    let end = bytes
        .iter()
        .rposition(|b| *b != fill)
        .map_or(0, |index| index + 1);
    &bytes[..end]
}

/// Pad `content` up to `width` following the justification rules of `kind`
fn pad(kind: FieldKind, content: &[u8], width: usize) -> Vec<u8> {
    let missing = width - content.len();
    match kind {
        FieldKind::Numeric => {
            let mut raw = vec![b'0'; missing];
            raw.extend_from_slice(content);
            // the sign moves in front of the zeros
            if missing != 0 && matches!(content.first(), Some(b'+' | b'-')) {
                raw[0] = content[0];
                raw[missing] = b'0';
            }
            raw
        }
        _ => {
            let mut raw = content.to_vec();
            raw.resize(width, kind.fill());
            raw
        }
    }
}

/// Printable ASCII
pub(crate) fn is_bcs_a(bytes: &[u8]) -> bool {
    bytes.iter().all(|b| (0x20..=0x7e).contains(b))
}

/// Digits with an optional leading sign and at most one decimal point
///
/// Some TREs use `-` to mark unknown values and `/` inside dates, both are accepted anywhere.
pub(crate) fn is_bcs_n(bytes: &[u8]) -> bool {
    let body = match bytes.first() {
        Some(b'+' | b'-') => &bytes[1..],
        _ => bytes,
    };

    let mut decimal_point = false;
    for byte in body {
        match byte {
            b'.' if decimal_point => return false,
            b'.' => decimal_point = true,
            b'0'..=b'9' | b'-' | b'/' => {}
            _ => return false,
        }
    }
    true
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use crate::error::{Error, ErrorKind, Result};
    use crate::field::{Field, FieldKind};

    #[test]
    fn numeric_pads_with_leading_zeros() -> Result<()> {
        let field = Field::from_integer(FieldKind::Numeric, 5, 42)?;
        assert_eq!(field.raw(), b"00042");
        assert_eq!(field.width(), 5);
        Ok(())
    }

    #[test]
    fn numeric_keeps_sign_in_front() -> Result<()> {
        let field = Field::from_integer(FieldKind::Numeric, 5, -42)?;
        assert_eq!(field.raw(), b"-0042");
        assert_eq!(field.as_integer()?, -42);

        let field = Field::from_text(FieldKind::Numeric, 4, "+7")?;
        assert_eq!(field.raw(), b"+007");
        Ok(())
    }

    #[test]
    fn alpha_pads_with_trailing_blanks() -> Result<()> {
        let field = Field::from_text(FieldKind::Alpha, 6, "AB")?;
        assert_eq!(field.raw(), b"AB    ");
        assert_eq!(field.as_string(), "AB");
        Ok(())
    }

    #[test]
    fn too_long_values_are_rejected() {
        let err = Field::from_text(FieldKind::Alpha, 2, "ABC").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FieldTooLong);

        let err = Field::from_integer(FieldKind::Numeric, 2, 100).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FieldTooLong);

        let err = Field::from_unsigned(FieldKind::Binary, 1, 256).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FieldTooLong);
        assert!(matches!(err, Error::ValueTooLong { width: 1, length: 2, .. }));

        let err = Field::from_integer(FieldKind::Binary, 1, 300).unwrap_err();
        assert!(matches!(err, Error::ValueTooLong { width: 1, length: 2, .. }));

        let err = Field::from_integer(FieldKind::Binary, 2, -40_000).unwrap_err();
        assert!(matches!(err, Error::ValueTooLong { width: 2, length: 3, .. }));

        let err = Field::from_text(FieldKind::Numeric, 3, "12345").unwrap_err();
        assert!(matches!(
            err.with_key("N#0"),
            Error::FieldTooLong { ref key, width: 3, length: 5 } if key == "N#0"
        ));
    }

    #[test]
    fn numeric_text_must_be_bcs_n() {
        let err = Field::from_text(FieldKind::Numeric, 3, "1A").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotNumeric);

        assert!(Field::from_text(FieldKind::Numeric, 8, "-12.5").is_ok());
        assert!(Field::from_text(FieldKind::Numeric, 8, "1.2.3").is_err());
        assert!(Field::from_text(FieldKind::Numeric, 8, "--/--").is_ok());
    }

    #[test]
    fn alpha_text_must_be_printable() {
        let err = Field::from_text(FieldKind::Alpha, 3, "a\tb").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidValue);
    }

    #[test]
    fn alpha_digits_convert_but_letters_do_not() -> Result<()> {
        let field = Field::from_raw(FieldKind::Alpha, *b" 12 ");
        assert_eq!(field.as_integer()?, 12);

        let field = Field::from_raw(FieldKind::Alpha, *b"AB");
        assert_eq!(field.as_integer().unwrap_err().kind(), ErrorKind::NotNumeric);
        Ok(())
    }

    #[test]
    fn binary_integers_are_big_endian() -> Result<()> {
        let field = Field::from_raw(FieldKind::Binary, [0x01, 0x2C]);
        assert_eq!(field.as_integer()?, 300);
        assert_eq!(field.as_unsigned()?, 300);

        let field = Field::from_raw(FieldKind::Binary, [0xFF, 0xFF, 0xFF, 0xFE]);
        assert_eq!(field.as_integer()?, -2);
        assert_eq!(field.as_unsigned()?, 0xFFFF_FFFE);

        let field = Field::from_raw(FieldKind::Binary, [0x80, 0x00, 0x00]);
        assert_eq!(field.as_unsigned()?, 0x80_0000);
        assert_eq!(field.as_integer().unwrap_err().kind(), ErrorKind::NotNumeric);
        Ok(())
    }

    #[test]
    fn binary_integer_round_trip() -> Result<()> {
        let field = Field::from_integer(FieldKind::Binary, 2, -1)?;
        assert_eq!(field.raw(), [0xFF, 0xFF]);

        let field = Field::from_unsigned(FieldKind::Binary, 4, 0x8000_0000)?;
        assert_eq!(field.raw(), [0x80, 0x00, 0x00, 0x00]);
        assert_eq!(field.to_string(), "0x80000000");
        Ok(())
    }

    #[test]
    fn reals() -> Result<()> {
        let field = Field::from_real(FieldKind::Numeric, 7, 3.25)?;
        assert_eq!(field.raw(), b"3.25000");
        assert_eq!(field.as_real()?, 3.25);

        let field = Field::from_real(FieldKind::Numeric, 3, 1234.5);
        assert!(field.is_err());

        let field = Field::from_real(FieldKind::Binary, 4, 1.5)?;
        assert_eq!(field.raw(), [0x3F, 0xC0, 0x00, 0x00]);
        assert_eq!(field.as_real()?, 1.5);
        Ok(())
    }

    #[test]
    fn blank_fields() {
        assert_eq!(Field::blank(FieldKind::Numeric, 3).raw(), b"000");
        assert_eq!(Field::blank(FieldKind::Alpha, 2).raw(), b"  ");
        assert_eq!(Field::blank(FieldKind::Binary, 2).raw(), [0, 0]);
    }

    #[test]
    fn refit_changes_padding_only() -> Result<()> {
        let field = Field::from_raw(FieldKind::Numeric, *b"42");
        assert_eq!(field.refit(FieldKind::Numeric, 5, "N")?.raw(), b"00042");

        let field = Field::from_raw(FieldKind::Numeric, *b"-00042");
        assert_eq!(field.refit(FieldKind::Numeric, 3, "N")?.raw(), b"-42");
        assert!(field.refit(FieldKind::Numeric, 2, "N").is_err());

        let field = Field::from_raw(FieldKind::Alpha, *b"AB    ");
        assert_eq!(field.refit(FieldKind::Alpha, 3, "A")?.raw(), b"AB ");
        assert_eq!(
            field.refit(FieldKind::Alpha, 1, "A").unwrap_err().kind(),
            ErrorKind::FieldTooLong
        );

        let field = Field::from_raw(FieldKind::Binary, [1, 2]);
        assert_eq!(
            field.refit(FieldKind::Binary, 4, "B").unwrap_err().kind(),
            ErrorKind::InvalidValue
        );
        Ok(())
    }

    #[test]
    fn refit_checks_the_new_kind() -> Result<()> {
        let field = Field::from_raw(FieldKind::Alpha, *b"AB");
        assert_eq!(
            field.refit(FieldKind::Numeric, 5, "N").unwrap_err().kind(),
            ErrorKind::NotNumeric
        );

        let field = Field::from_raw(FieldKind::Alpha, *b"12");
        assert_eq!(field.refit(FieldKind::Numeric, 5, "N")?.raw(), b"00012");

        let field = Field::from_raw(FieldKind::Binary, [0x00, 0x7F]);
        assert_eq!(
            field.refit(FieldKind::Alpha, 4, "A").unwrap_err().kind(),
            ErrorKind::InvalidValue
        );

        let field = Field::from_raw(FieldKind::Numeric, *b"42");
        assert_eq!(field.refit(FieldKind::Alpha, 3, "A")?.raw(), b"42 ");
        Ok(())
    }

    #[test]
    fn charset_violations() {
        assert!(Field::from_raw(FieldKind::Numeric, *b"12X")
            .charset_violation()
            .is_some());
        assert!(Field::from_raw(FieldKind::Numeric, *b"   ")
            .charset_violation()
            .is_none());
        assert!(Field::from_raw(FieldKind::Binary, [0xFF])
            .charset_violation()
            .is_none());
    }
}

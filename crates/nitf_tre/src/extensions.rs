//! Sequences of TREs as stored in the extension areas of NITF headers

use binrw::{BinRead, BinWrite};
use bon::Builder;
use std::io::{Cursor, Read, Write};
use tracing::{debug, instrument, warn};

use crate::descriptions::raw_description_set;
use crate::error::{Error, Result};
use crate::interpreter::decode;
use crate::registry::DescriptionSource;
use crate::tre::Tre;
use crate::types::TreHeader;

/// Options for how an extension area is read
#[derive(Debug, Clone, Copy, Default, Builder)]
pub struct ReadOptions {
    /// Keep a TRE whose layout fails to decode as raw data instead of failing
    #[builder(default)]
    pub raw_fallback: bool,
}

/// The TREs of one extension area, in the order they are stored
///
/// ```
/// use std::io::Cursor;
/// use nitf_tre::extensions::{Extensions, ReadOptions};
/// use nitf_tre::registry::Registry;
///
/// # fn doit() -> nitf_tre::error::Result<()> {
/// let area = b"XYZABC00005hello";
/// let registry = Registry::with_builtins()?;
///
/// let extensions = Extensions::read(Cursor::new(area), Some(area.len()), &registry, ReadOptions::default())?;
/// assert_eq!(extensions.len(), 1);
/// assert_eq!(extensions.find("XYZABC").unwrap().field("raw_data").unwrap().raw(), b"hello");
///
/// let mut out = Vec::new();
/// extensions.write(&mut out)?;
/// assert_eq!(out, area);
/// # Ok(())
/// # }
/// # doit().unwrap();
/// ```
#[derive(Debug, Clone, Default)]
pub struct Extensions {
    tres: Vec<Tre>,
}

impl Extensions {
    pub fn new() -> Extensions {
        Extensions::default()
    }

    /// Read an extension area of `length` bytes, or up to the end of `reader` when not known
    ///
    /// Every TRE is decoded with the layouts `source` has for its tag. Tags without layouts are
    /// kept as raw data.
    #[instrument(level = "debug", skip(reader, source), err)]
    pub fn read<R: Read>(
        mut reader: R,
        length: Option<usize>,
        source: &dyn DescriptionSource,
        options: ReadOptions,
    ) -> Result<Extensions> {
        let mut tres = Vec::new();
        let mut remaining = length;

        while remaining != Some(0) {
            let Some(header) = read_header(&mut reader, remaining)? else {
                break;
            };
            let tag = header.tag()?;
            let declared = header.length()?;

            let payload = read_payload(&mut reader, tag, declared, remaining)?;
            if let Some(remaining) = remaining.as_mut() {
                *remaining -= TreHeader::SIZE + declared;
            }

            tres.push(decode_payload(tag, &payload, source, options)?);
        }

        Ok(Extensions { tres })
    }

    /// Write every TRE with a freshly computed length, returning the number of bytes written
    ///
    /// Nothing reaches `writer` unless every TRE encodes.
    #[instrument(level = "debug", skip_all, err)]
    pub fn write<W: Write>(&self, mut writer: W) -> Result<usize> {
        let mut output = Cursor::new(Vec::new());
        for tre in &self.tres {
            let payload = tre.encode()?;
            TreHeader::new(tre.tag(), payload.len())?.write(&mut output)?;
            output.write_all(&payload)?;
        }

        let output = output.into_inner();
        writer.write_all(&output)?;
        Ok(output.len())
    }

    /// Number of bytes [`Extensions::write`] produces
    pub fn compute_length(&self) -> Result<usize> {
        self.tres.iter().try_fold(0, |total, tre| {
            Ok(total + TreHeader::SIZE + tre.compute_length()?)
        })
    }

    pub fn len(&self) -> usize {
        self.tres.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tres.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Tre> {
        self.tres.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Tre> {
        self.tres.get_mut(index)
    }

    /// First TRE with the tag
    pub fn find(&self, tag: &str) -> Option<&Tre> {
        self.tres.iter().find(|tre| tre.tag() == tag)
    }

    /// Every TRE with the tag
    pub fn find_all<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Tre> {
        self.tres.iter().filter(move |tre| tre.tag() == tag)
    }

    pub fn push(&mut self, tre: Tre) {
        self.tres.push(tre);
    }

    pub fn remove(&mut self, index: usize) -> Option<Tre> {
        (index < self.tres.len()).then(|| self.tres.remove(index))
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Tre> {
        self.tres.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Tre> {
        self.tres.iter_mut()
    }
}

impl<'a> IntoIterator for &'a Extensions {
    type Item = &'a Tre;
    type IntoIter = std::slice::Iter<'a, Tre>;

    fn into_iter(self) -> Self::IntoIter {
        self.tres.iter()
    }
}

impl IntoIterator for Extensions {
    type Item = Tre;
    type IntoIter = std::vec::IntoIter<Tre>;

    fn into_iter(self) -> Self::IntoIter {
        self.tres.into_iter()
    }
}

impl FromIterator<Tre> for Extensions {
    fn from_iter<T: IntoIterator<Item = Tre>>(iter: T) -> Self {
        Extensions {
            tres: iter.into_iter().collect(),
        }
    }
}

/// Read the next header, `None` at the end of an area of unknown length
fn read_header<R: Read>(reader: &mut R, remaining: Option<usize>) -> Result<Option<TreHeader>> {
    let mut buf = Vec::with_capacity(TreHeader::SIZE);
    let wanted = remaining.map_or(TreHeader::SIZE, |left| left.min(TreHeader::SIZE));
    reader.take(wanted as u64).read_to_end(&mut buf)?;

    if buf.is_empty() && remaining.is_none() {
        return Ok(None);
    }
    if buf.len() < TreHeader::SIZE {
        return Err(Error::Truncated {
            key: "TRE header".to_owned(),
            expected: TreHeader::SIZE,
            available: buf.len(),
        });
    }

    Ok(Some(TreHeader::read(&mut Cursor::new(buf))?))
}

fn read_payload<R: Read>(
    reader: &mut R,
    tag: &str,
    declared: usize,
    remaining: Option<usize>,
) -> Result<Vec<u8>> {
    let available = remaining.map(|left| left - TreHeader::SIZE);
    if let Some(available) = available.filter(|available| *available < declared) {
        return Err(Error::Truncated {
            key: tag.to_owned(),
            expected: declared,
            available,
        });
    }

    let mut payload = Vec::with_capacity(declared);
    reader.take(declared as u64).read_to_end(&mut payload)?;
    if payload.len() < declared {
        return Err(Error::Truncated {
            key: tag.to_owned(),
            expected: declared,
            available: payload.len(),
        });
    }
    Ok(payload)
}

fn decode_payload(
    tag: &str,
    payload: &[u8],
    source: &dyn DescriptionSource,
    options: ReadOptions,
) -> Result<Tre> {
    let declared = Some(payload.len());

    let decoded = match source.description_set(tag) {
        Some(set) => match decode(&set, tag, Cursor::new(payload), declared) {
            Ok(decoded) => decoded,
            Err(err) if options.raw_fallback => {
                warn!(tag, error = %err, "TRE does not match its description, keeping raw data");
                decode(&raw_description_set(), tag, Cursor::new(payload), declared)?
            }
            Err(err) => return Err(err),
        },
        None => {
            debug!(tag, "no description for TRE, keeping raw data");
            decode(&raw_description_set(), tag, Cursor::new(payload), declared)?
        }
    };

    if decoded.consumed < payload.len() {
        debug!(
            tag,
            discarded = payload.len() - decoded.consumed,
            "discarding bytes past the end of the description"
        );
    }
    Ok(decoded.tre)
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;
    use std::io::Cursor;
    use tracing_test::traced_test;

    use crate::error::{ErrorKind, Result};
    use crate::extensions::{Extensions, ReadOptions};
    use crate::registry::Registry;

    #[test]
    #[traced_test]
    fn unknown_tags_are_raw() -> Result<()> {
        let area = b"ONE   00003abcTWO   00000";
        let extensions = Extensions::read(
            Cursor::new(area),
            None,
            &Registry::new(),
            ReadOptions::default(),
        )?;

        assert_eq!(extensions.len(), 2);
        assert_eq!(extensions.get(0).unwrap().tag(), "ONE");
        assert_eq!(extensions.find("TWO").unwrap().field("raw_data").unwrap().width(), 0);
        assert_eq!(extensions.compute_length()?, area.len());
        assert!(logs_contain("no description for TRE"));
        Ok(())
    }

    #[test]
    fn truncated_payload() {
        let area = b"ONE   00009abc";
        let err = Extensions::read(
            Cursor::new(area),
            Some(area.len()),
            &Registry::new(),
            ReadOptions::default(),
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Truncated);
    }

    #[test]
    #[traced_test]
    fn raw_fallback() -> Result<()> {
        let registry = Registry::with_builtins()?;
        let area = b"ENGRDA00005short";

        let err = Extensions::read(
            Cursor::new(area),
            Some(area.len()),
            &registry,
            ReadOptions::default(),
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Truncated);

        let extensions = Extensions::read(
            Cursor::new(area),
            Some(area.len()),
            &registry,
            ReadOptions::builder().raw_fallback(true).build(),
        )?;
        let tre = extensions.find("ENGRDA").unwrap();
        assert_eq!(tre.description_name(), "raw");
        assert!(logs_contain("keeping raw data"));

        let mut out = Vec::new();
        extensions.write(&mut out)?;
        assert_eq!(out, area);
        Ok(())
    }

    #[test]
    #[traced_test]
    fn trailing_padding_is_discarded() -> Result<()> {
        let mut payload = format!("{:<20}000", "NITRO TEST").into_bytes();
        payload.extend_from_slice(b"PAD");
        let mut area = format!("ENGRDA{:05}", payload.len()).into_bytes();
        area.extend_from_slice(&payload);

        let extensions = Extensions::read(
            Cursor::new(&area),
            Some(area.len()),
            &Registry::with_builtins()?,
            ReadOptions::default(),
        )?;
        assert!(logs_contain("discarding bytes past the end of the description"));

        let tre = extensions.find("ENGRDA").unwrap();
        assert_eq!(tre.declared_length(), Some(26));
        assert_eq!(tre.compute_length()?, 23);

        let mut out = Vec::new();
        assert_eq!(extensions.write(&mut out)?, area.len() - 3);
        assert_eq!(&out[..11], b"ENGRDA00023");
        assert_eq!(&out[11..], &payload[..23]);
        Ok(())
    }

    #[test]
    fn remove_and_push() -> Result<()> {
        let area = b"ONE   00001aTWO   00001b";
        let mut extensions = Extensions::read(
            Cursor::new(area),
            Some(area.len()),
            &Registry::new(),
            ReadOptions::default(),
        )?;

        let one = extensions.remove(0).unwrap();
        assert!(extensions.remove(5).is_none());
        extensions.push(one);

        let tags = extensions.iter().map(|tre| tre.tag()).collect::<Vec<_>>();
        assert_eq!(tags, ["TWO", "ONE"]);
        Ok(())
    }
}

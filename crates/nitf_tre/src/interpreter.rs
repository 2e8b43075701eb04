//! The walk shared by decoding, encoding and planning
//!
//! All three passes run the same loop over a [`Description`]: the instruction pointer moves
//! forward, loops jump back to their start until their count is spent and false conditions jump
//! past their end marker. Widths, counts and conditions are always resolved from the fields the
//! current pass has produced so far, which is what makes an encode reproduce the bytes it was
//! decoded from. Only the handling of scalars differs between passes, see [`Visitor`].

use std::io::{Read, Write};
use tracing::{instrument, trace};

use crate::description::{Description, FieldSpec, Repeat, ScalarSpec, ValidationWarning, Width};
use crate::error::{DescriptionError, Error, Result};
use crate::field::Field;
use crate::set::DescriptionSet;
use crate::store::{qualify, FieldStore};
use crate::tre::Tre;

/// How many bytes a scalar occupies
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum Extent {
    Exact(usize),
    /// Whatever is left of the record
    Remaining,
}

/// A scalar instruction resolved against the current loop iteration
pub(crate) struct Step<'d> {
    pub spec: &'d ScalarSpec,
    pub key: String,
    pub extent: Extent,
}

pub(crate) trait Visitor<'d> {
    /// Fields produced so far, references are resolved against these
    fn fields(&self) -> &FieldStore;

    fn scalar(&mut self, step: Step<'d>) -> Result<()>;
}

struct LoopFrame {
    start: usize,
    remaining: usize,
    index: usize,
}

pub(crate) fn walk<'d, V>(description: &'d Description, visitor: &mut V) -> Result<()>
where
    V: Visitor<'d>,
{
    let mut frames: Vec<LoopFrame> = Vec::new();
    let mut ip = 0;

    while let Some(spec) = description.get(ip) {
        let path = frames.iter().map(|frame| frame.index).collect::<Vec<_>>();

        match spec {
            FieldSpec::Scalar(scalar) => {
                let extent = match &scalar.width {
                    Width::Fixed(width) => Extent::Exact(*width),
                    Width::Remaining => Extent::Remaining,
                    Width::ByReference(tag) => {
                        Extent::Exact(clamp(reference(visitor.fields(), tag, &path)?))
                    }
                    Width::Computed(expression) => Extent::Exact(clamp(
                        expression.evaluate(|tag| reference(visitor.fields(), tag, &path))?,
                    )),
                };

                let skipped = extent == Extent::Exact(0);
                if !skipped {
                    let key = qualify(&scalar.tag, &path);
                    if visitor.fields().contains(&key) {
                        return Err(DescriptionError::DuplicateKey { key }.into());
                    }
                    visitor.scalar(Step {
                        spec: scalar,
                        key,
                        extent,
                    })?;
                }
                ip += 1;
            }
            FieldSpec::LoopStart(repeat) => {
                let count = match repeat {
                    Repeat::Fixed(count) => *count,
                    Repeat::ByReference(tag) => clamp(reference(visitor.fields(), tag, &path)?),
                    Repeat::Computed(expression) => clamp(
                        expression.evaluate(|tag| reference(visitor.fields(), tag, &path))?,
                    ),
                };

                if count == 0 {
                    ip = description.partner(ip) + 1;
                } else {
                    frames.push(LoopFrame {
                        start: ip,
                        remaining: count,
                        index: 0,
                    });
                    ip += 1;
                }
            }
            FieldSpec::LoopEnd => match frames.last_mut() {
                Some(frame) if frame.remaining > 1 => {
                    frame.remaining -= 1;
                    frame.index += 1;
                    ip = frame.start + 1;
                }
                _ => {
                    frames.pop();
                    ip += 1;
                }
            },
            FieldSpec::CondStart(condition) => {
                let (_, field) = visitor
                    .fields()
                    .resolve(&condition.tag, &path)
                    .ok_or_else(|| Error::MissingReference {
                        tag: condition.tag.clone(),
                    })?;

                if condition.comparison.evaluate(field)? {
                    ip += 1;
                } else {
                    ip = description.partner(ip) + 1;
                }
            }
            FieldSpec::CondEnd => ip += 1,
            FieldSpec::End => break,
        }
    }

    Ok(())
}

/// Integer value of the field `tag` as seen from the loop iterations `path`
fn reference(fields: &FieldStore, tag: &str, path: &[usize]) -> Result<i64> {
    let (_, field) = fields
        .resolve(tag, path)
        .ok_or_else(|| Error::MissingReference {
            tag: tag.to_owned(),
        })?;
    field.as_reference()
}

fn clamp(value: i64) -> usize {
    usize::try_from(value.max(0)).unwrap_or(usize::MAX)
}

/// Reads fields from a byte source
pub(crate) struct Decoder<R> {
    reader: R,
    /// bytes left of the declared length
    remaining: Option<usize>,
    consumed: usize,
    fields: FieldStore,
    warnings: Vec<ValidationWarning>,
}

impl<R: Read> Decoder<R> {
    pub fn new(reader: R, declared_length: Option<usize>) -> Decoder<R> {
        Decoder {
            reader,
            remaining: declared_length,
            consumed: 0,
            fields: FieldStore::new(),
            warnings: Vec::new(),
        }
    }

    fn read(&mut self, key: &str, extent: Extent) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        match (extent, self.remaining) {
            (Extent::Remaining, None) => {
                self.reader.read_to_end(&mut buf)?;
            }
            (extent, remaining) => {
                let width = match extent {
                    Extent::Exact(width) => width,
                    Extent::Remaining => remaining.unwrap_or_default(),
                };
                if let Some(available) = remaining.filter(|available| *available < width) {
                    return Err(Error::Truncated {
                        key: key.to_owned(),
                        expected: width,
                        available,
                    });
                }

                self.reader
                    .by_ref()
                    .take(width as u64)
                    .read_to_end(&mut buf)?;
                if buf.len() < width {
                    return Err(Error::Truncated {
                        key: key.to_owned(),
                        expected: width,
                        available: buf.len(),
                    });
                }
            }
        }

        self.consumed += buf.len();
        if let Some(remaining) = self.remaining.as_mut() {
            *remaining -= buf.len();
        }
        Ok(buf)
    }
}

impl<'d, R: Read> Visitor<'d> for Decoder<R> {
    fn fields(&self) -> &FieldStore {
        &self.fields
    }

    fn scalar(&mut self, step: Step<'d>) -> Result<()> {
        let raw = self.read(&step.key, step.extent)?;
        let field = Field::from_raw(step.spec.kind, raw);
        trace!(key = %step.key, value = %field, "decoded field");

        self.warnings.extend(step.spec.check(&step.key, &field));

        self.fields.set(step.key, field);
        Ok(())
    }
}

/// Serializes the fields of a store
pub(crate) struct Encoder<'s> {
    source: &'s FieldStore,
    written: FieldStore,
    buffer: Vec<u8>,
}

impl<'s> Encoder<'s> {
    pub fn new(source: &'s FieldStore) -> Encoder<'s> {
        Encoder {
            source,
            written: FieldStore::new(),
            buffer: Vec::new(),
        }
    }
}

impl<'d> Visitor<'d> for Encoder<'_> {
    fn fields(&self) -> &FieldStore {
        &self.written
    }

    fn scalar(&mut self, step: Step<'d>) -> Result<()> {
        let stored = self
            .source
            .get_exact(&step.key)
            .ok_or_else(|| Error::MissingField {
                key: step.key.clone(),
            })?;

        let width = match step.extent {
            Extent::Exact(width) => width,
            Extent::Remaining => stored.width(),
        };
        let field = stored.refit(step.spec.kind, width, &step.key)?;
        trace!(key = %step.key, value = %field, "encoded field");

        self.buffer.extend_from_slice(field.raw());
        self.written.set(step.key, field);
        Ok(())
    }
}

/// One scalar a description yields for a set of fields
#[derive(Debug, Clone)]
pub(crate) struct Planned<'d> {
    pub spec: &'d ScalarSpec,
    pub key: String,
    /// whether the key was present in the planned-against fields
    pub present: bool,
}

/// Lists the scalars a description yields for the current fields without touching bytes
///
/// With `fill` set, keys that are absent get blank values so the walk can carry on, which is how
/// new instances are created.
pub(crate) struct Planner<'d, 's> {
    source: &'s FieldStore,
    fill: bool,
    planned: FieldStore,
    entries: Vec<Planned<'d>>,
}

impl<'d, 's> Planner<'d, 's> {
    pub fn new(source: &'s FieldStore, fill: bool) -> Planner<'d, 's> {
        Planner {
            source,
            fill,
            planned: FieldStore::new(),
            entries: Vec::new(),
        }
    }

    pub fn into_parts(self) -> (FieldStore, Vec<Planned<'d>>) {
        (self.planned, self.entries)
    }
}

impl<'d> Visitor<'d> for Planner<'d, '_> {
    fn fields(&self) -> &FieldStore {
        &self.planned
    }

    fn scalar(&mut self, step: Step<'d>) -> Result<()> {
        let existing = self.source.get_exact(&step.key).cloned();
        let present = existing.is_some();
        let field = existing.or_else(|| {
            self.fill.then(|| {
                let width = match step.extent {
                    Extent::Exact(width) => width,
                    Extent::Remaining => 0,
                };
                Field::blank(step.spec.kind, width)
            })
        });

        if let Some(field) = field {
            self.planned.set(step.key.clone(), field);
        }
        self.entries.push(Planned {
            spec: step.spec,
            key: step.key,
            present,
        });
        Ok(())
    }
}

/// Run a planning pass, returning the planned fields and every scalar visited
pub(crate) fn plan<'d>(
    description: &'d Description,
    fields: &FieldStore,
    fill: bool,
) -> Result<(FieldStore, Vec<Planned<'d>>)> {
    let mut planner = Planner::new(fields, fill);
    walk(description, &mut planner)?;
    Ok(planner.into_parts())
}

/// Fields and bookkeeping of a decode that succeeded
#[derive(Debug, Clone)]
pub struct Decoded {
    pub tre: Tre,
    /// Bytes read from the source
    pub consumed: usize,
}

/// Decode one TRE
///
/// The layout is picked from `set` by `declared_length` (see [`DescriptionSet::select`]). When a
/// length is given, no more than that many bytes are read; bytes the description does not cover
/// are left in the source. Without a length, a [`Width::Remaining`] field reads until the source is
/// exhausted.
#[instrument(level = "debug", skip(set, reader))]
pub fn decode<R: Read>(
    set: &DescriptionSet,
    tag: &str,
    reader: R,
    declared_length: Option<usize>,
) -> Result<Decoded> {
    let info = set.select(tag, declared_length)?;

    let mut decoder = Decoder::new(reader, declared_length);
    walk(&info.description, &mut decoder)?;

    let Decoder {
        consumed,
        fields,
        warnings,
        ..
    } = decoder;
    trace!(consumed, fields = fields.len(), "decoded");

    Ok(Decoded {
        tre: Tre::from_parts(
            tag,
            info.name.clone(),
            declared_length,
            info.description.clone(),
            fields,
            warnings,
        ),
        consumed,
    })
}

/// Serialize `fields` following `description`
///
/// Nothing is returned unless every field was written.
#[instrument(level = "debug", skip_all)]
pub fn encode(description: &Description, fields: &FieldStore) -> Result<Vec<u8>> {
    let mut encoder = Encoder::new(fields);
    walk(description, &mut encoder)?;
    Ok(encoder.buffer)
}

/// Serialize `fields` into `writer`, returning the number of bytes written
///
/// The output is buffered so nothing reaches the writer when encoding fails.
pub fn encode_to<W: Write>(
    description: &Description,
    fields: &FieldStore,
    mut writer: W,
) -> Result<usize> {
    let bytes = encode(description, fields)?;
    writer.write_all(&bytes)?;
    Ok(bytes.len())
}

//! A decoded or constructed TRE

use std::fmt;
use std::io::Write;
use std::sync::Arc;

use crate::description::{Description, ValidationWarning, Width};
use crate::error::{Error, Result};
use crate::field::Field;
use crate::interpreter::{encode, encode_to, plan};
use crate::set::DescriptionSet;
use crate::store::{base_tag, FieldStore};

/// One TRE: its tag, the layout it follows and its fields
///
/// Instances come out of [`crate::interpreter::decode`] or are created blank with [`Tre::new`].
///
/// ```
/// use nitf_tre::description::{Description, FieldSpec, Repeat};
/// use nitf_tre::set::DescriptionSet;
/// use nitf_tre::tre::Tre;
///
/// # fn doit() -> nitf_tre::error::Result<()> {
/// let set = DescriptionSet::single("items", Description::new(vec![
///     FieldSpec::numeric("N", 3, "Number of items"),
///     FieldSpec::repeat(Repeat::reference("N")),
///     FieldSpec::alpha("ITEM", 4, "Item"),
///     FieldSpec::LoopEnd,
/// ])?);
///
/// let mut tre = Tre::new("ITEMS", &set, None)?;
/// tre.set_value("N", "1")?;
/// tre.set_value("ITEM#0", "ABCD")?;
/// assert_eq!(tre.encode()?, b"001ABCD");
/// # Ok(())
/// # }
/// # doit().unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct Tre {
    tag: String,
    description_name: String,
    declared_length: Option<usize>,
    description: Arc<Description>,
    fields: FieldStore,
    warnings: Vec<ValidationWarning>,
}

impl Tre {
    pub(crate) fn from_parts(
        tag: &str,
        description_name: String,
        declared_length: Option<usize>,
        description: Arc<Description>,
        fields: FieldStore,
        warnings: Vec<ValidationWarning>,
    ) -> Tre {
        Tre {
            tag: tag.to_owned(),
            description_name,
            declared_length,
            description,
            fields,
            warnings,
        }
    }

    /// Create an instance with every field blank
    ///
    /// `variant` picks a layout of the set by name, the default layout is used otherwise. Loops
    /// counted by blank fields expand to nothing.
    pub fn new(tag: &str, set: &DescriptionSet, variant: Option<&str>) -> Result<Tre> {
        let info = match variant {
            Some(name) => set.variant(name).ok_or_else(|| Error::NoDescription {
                tag: format!("{tag} ({name})"),
            })?,
            None => set.default_variant().ok_or_else(|| Error::NoDescription {
                tag: tag.to_owned(),
            })?,
        };

        let (fields, _) = plan(&info.description, &FieldStore::new(), true)?;
        Ok(Tre::from_parts(
            tag,
            info.name.clone(),
            None,
            info.description.clone(),
            fields,
            Vec::new(),
        ))
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Name of the layout this instance follows
    pub fn description_name(&self) -> &str {
        &self.description_name
    }

    pub fn description(&self) -> &Description {
        &self.description
    }

    /// Length recorded by the container this instance was read from
    pub fn declared_length(&self) -> Option<usize> {
        self.declared_length
    }

    /// Rule violations found while decoding
    pub fn warnings(&self) -> &[ValidationWarning] {
        &self.warnings
    }

    pub fn fields(&self) -> &FieldStore {
        &self.fields
    }

    /// Look a field up, see [`FieldStore::get`]
    pub fn field(&self, key: &str) -> Option<&Field> {
        self.fields.get(key)
    }

    /// Store a field as is, it is refitted to its slot when encoding
    pub fn set_field(&mut self, key: impl Into<String>, field: Field) -> Option<Field> {
        self.fields.set(key, field)
    }

    /// Iterate `(key, field)` pairs in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Field)> {
        self.fields.iter()
    }

    /// Set a field from text
    ///
    /// An existing field keeps its kind and width. A new key must be one the description yields
    /// for the current values, for instance `ITEM#2` after the count was raised to three.
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<()> {
        let remaining = self
            .description
            .scalar(base_tag(key))
            .is_some_and(|scalar| scalar.width == Width::Remaining);

        let field = match self.fields.get_exact(key) {
            Some(existing) if remaining => Field::from_text(existing.kind(), value.len(), value),
            Some(existing) => Field::from_text(existing.kind(), existing.width(), value),
            None => {
                let (planned, entries) = plan(&self.description, &self.fields, true)?;
                let entry = entries
                    .iter()
                    .find(|entry| entry.key == key)
                    .ok_or_else(|| Error::MissingField {
                        key: key.to_owned(),
                    })?;

                let width = if remaining {
                    value.len()
                } else {
                    planned.get_exact(key).map_or(0, Field::width)
                };
                Field::from_text(entry.spec.kind, width, value)
            }
        }
        .map_err(|err| err.with_key(key))?;

        self.fields.set(key, field);
        Ok(())
    }

    /// Fields whose key contains `pattern`
    pub fn find(&self, pattern: &str) -> Vec<(&str, &Field)> {
        self.fields
            .iter()
            .filter(|(key, _)| key.contains(pattern))
            .collect()
    }

    /// Whether every field the description yields for the current values is present
    pub fn is_sane(&self) -> bool {
        plan(&self.description, &self.fields, false)
            .is_ok_and(|(_, entries)| entries.iter().all(|entry| entry.present))
    }

    /// Check every present field against the rules of its instruction
    pub fn validate(&self) -> Result<Vec<ValidationWarning>> {
        let (_, entries) = plan(&self.description, &self.fields, true)?;

        let mut warnings = Vec::new();
        for entry in entries.iter().filter(|entry| entry.present) {
            let Some(field) = self.fields.get_exact(&entry.key) else {
                continue;
            };
            warnings.extend(entry.spec.check(&entry.key, field));
        }
        Ok(warnings)
    }

    /// Number of bytes [`Tre::encode`] produces for the current values
    pub fn compute_length(&self) -> Result<usize> {
        Ok(self.encode()?.len())
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        encode(&self.description, &self.fields)
    }

    /// Encode into `writer`, returning the number of bytes written
    pub fn write_to<W: Write>(&self, writer: W) -> Result<usize> {
        encode_to(&self.description, &self.fields, writer)
    }
}

impl<'a> IntoIterator for &'a Tre {
    type Item = (&'a String, &'a Field);
    type IntoIter = indexmap::map::Iter<'a, String, Field>;

    fn into_iter(self) -> Self::IntoIter {
        (&self.fields).into_iter()
    }
}

/// One `label (key) = [value]` line per field, in description order when it can be planned
impl fmt::Display for Tre {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match plan(&self.description, &self.fields, false) {
            Ok((_, entries)) => {
                for entry in entries.iter().filter(|entry| entry.present) {
                    if let Some(field) = self.fields.get_exact(&entry.key) {
                        writeln!(f, "{} ({}) = [{field}]", entry.spec.label, entry.key)?;
                    }
                }
            }
            Err(_) => {
                for (key, field) in self.fields.iter() {
                    writeln!(f, "{key} = [{field}]")?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    use crate::description::{Description, FieldSpec, Repeat, Rule, Width};
    use crate::error::{Error, ErrorKind, Result};
    use crate::field::{Field, FieldKind};
    use crate::interpreter::decode;
    use crate::set::{DescriptionInfo, DescriptionSet};
    use crate::tre::Tre;

    fn items() -> Result<DescriptionSet> {
        Ok(DescriptionSet::single(
            "items",
            Description::new(vec![
                FieldSpec::numeric("N", 3, "Number of items"),
                FieldSpec::repeat(Repeat::reference("N")),
                FieldSpec::alpha("ITEM", 4, "Item").with_rule(Rule::pattern("[A-Z]+")?),
                FieldSpec::LoopEnd,
            ])?,
        ))
    }

    #[test]
    fn blank_instance() -> Result<()> {
        let tre = Tre::new("ITEMS", &items()?, None)?;
        assert_eq!(tre.description_name(), "items");
        assert_eq!(tre.fields().len(), 1);
        assert_eq!(tre.encode()?, b"000");
        assert!(tre.is_sane());
        Ok(())
    }

    #[test]
    fn named_variant() -> Result<()> {
        let set = DescriptionSet::new(
            vec![
                DescriptionInfo::new("a", Description::new(vec![FieldSpec::alpha("A", 1, "")])?),
                DescriptionInfo::new("b", Description::new(vec![FieldSpec::alpha("B", 2, "")])?),
            ],
            0,
        )?;

        let tre = Tre::new("AB", &set, Some("b"))?;
        assert_eq!(tre.encode()?, b"  ");

        let err = Tre::new("AB", &set, Some("c")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NoDescription);
        Ok(())
    }

    #[test]
    fn set_value_grows_loops() -> Result<()> {
        let mut tre = Tre::new("ITEMS", &items()?, None)?;
        tre.set_value("N", "2")?;
        assert!(!tre.is_sane());

        tre.set_value("ITEM#0", "AB")?;
        tre.set_value("ITEM#1", "CDEF")?;
        assert!(tre.is_sane());
        assert_eq!(tre.compute_length()?, 11);
        assert_eq!(tre.encode()?, b"002AB  CDEF");

        let err = tre.set_value("ITEM#2", "X").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingField);

        let err = tre.set_value("ITEM#0", "TOOLONG").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FieldTooLong);
        assert!(matches!(
            err,
            Error::FieldTooLong { ref key, width: 4, length: 7 } if key == "ITEM#0"
        ));
        Ok(())
    }

    #[test]
    fn set_value_remaining_width() -> Result<()> {
        let set = DescriptionSet::single(
            "raw",
            Description::new(vec![FieldSpec::binary("raw_data", Width::Remaining, "")])?,
        );
        let mut tre = Tre::new("RAW", &set, None)?;
        tre.set_value("raw_data", "hello")?;
        assert_eq!(tre.encode()?, b"hello");
        Ok(())
    }

    #[test]
    fn find_and_validate() -> Result<()> {
        let set = items()?;
        let decoded = decode(&set, "ITEMS", Cursor::new(b"002ABCDwxyz"), Some(11))?;
        let mut tre = decoded.tre;

        let found = tre.find("ITEM").into_iter().map(|(k, _)| k).collect::<Vec<_>>();
        assert_eq!(found, ["ITEM#0", "ITEM#1"]);

        assert_eq!(tre.warnings().len(), 1);
        assert_eq!(tre.validate()?.len(), 1);

        tre.set_field("ITEM#1", Field::from_raw(FieldKind::Alpha, *b"WXYZ"));
        assert!(tre.validate()?.is_empty());
        Ok(())
    }

    #[test]
    fn display_lines() -> Result<()> {
        let set = items()?;
        let decoded = decode(&set, "ITEMS", Cursor::new(b"001ABCD"), Some(7))?;

        let text = decoded.tre.to_string();
        assert_eq!(
            text,
            "Number of items (N) = [001]\nItem (ITEM#0) = [ABCD]\n"
        );
        Ok(())
    }
}

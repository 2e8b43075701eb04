//! Flat instruction lists describing the binary layout of a TRE
//!
//! A [`Description`] is a sequence of [`FieldSpec`] instructions. Scalars produce one field each,
//! `LoopStart`/`LoopEnd` repeat the instructions between them and `CondStart`/`CondEnd` guard the
//! instructions between them with a [`Condition`] on an earlier field. Blocks nest freely.
//!
//! ```
//! use nitf_tre::description::{Description, FieldSpec, Repeat};
//!
//! # fn doit() -> nitf_tre::error::Result<()> {
//! let description = Description::new(vec![
//!     FieldSpec::numeric("N", 3, "Number of items"),
//!     FieldSpec::repeat(Repeat::reference("N")),
//!     FieldSpec::alpha("ITEM", 4, "Item"),
//!     FieldSpec::LoopEnd,
//!     FieldSpec::End,
//! ])?;
//! assert_eq!(description.len(), 5);
//! # Ok(())
//! # }
//! # doit().unwrap();
//! ```

use bon::Builder;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::error::DescriptionError;
use crate::expr::{Condition, Expression};
use crate::field::{Field, FieldKind};
use crate::store::KEY_SEPARATOR;

/// Width of a scalar field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Width {
    /// Fixed number of bytes
    Fixed(usize),
    /// Integer value of an earlier field
    ByReference(String),
    /// Postfix expression over earlier fields
    Computed(Expression),
    /// Every byte left in the record
    Remaining,
}

impl Width {
    pub fn reference(tag: impl Into<String>) -> Width {
        Width::ByReference(tag.into())
    }

    pub fn computed(expression: &str) -> Result<Width, DescriptionError> {
        Ok(Width::Computed(expression.parse()?))
    }

    fn references(&self) -> Vec<&str> {
        match self {
            Width::ByReference(tag) => vec![tag.as_str()],
            Width::Computed(expression) => expression.references().collect(),
            Width::Fixed(_) | Width::Remaining => Vec::new(),
        }
    }
}

impl From<usize> for Width {
    fn from(value: usize) -> Self {
        Width::Fixed(value)
    }
}

impl fmt::Display for Width {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Width::Fixed(width) => write!(f, "{width}"),
            Width::ByReference(tag) => write!(f, "{tag}"),
            Width::Computed(expression) => write!(f, "`{expression}`"),
            Width::Remaining => f.write_str("remaining"),
        }
    }
}

/// Iteration count of a loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Repeat {
    Fixed(usize),
    ByReference(String),
    Computed(Expression),
}

impl Repeat {
    pub fn reference(tag: impl Into<String>) -> Repeat {
        Repeat::ByReference(tag.into())
    }

    pub fn computed(expression: &str) -> Result<Repeat, DescriptionError> {
        Ok(Repeat::Computed(expression.parse()?))
    }

    fn references(&self) -> Vec<&str> {
        match self {
            Repeat::ByReference(tag) => vec![tag.as_str()],
            Repeat::Computed(expression) => expression.references().collect(),
            Repeat::Fixed(_) => Vec::new(),
        }
    }
}

impl From<usize> for Repeat {
    fn from(value: usize) -> Self {
        Repeat::Fixed(value)
    }
}

/// Conformance check on the value of a scalar
///
/// A failed check never stops a decode, it is reported as a [`ValidationWarning`].
#[derive(Debug, Clone)]
pub enum Rule {
    /// The trimmed text must match the whole expression
    Pattern(Regex),
    /// The trimmed text must be one of the literals
    OneOf(Vec<String>),
    /// The integer value must lie in `min..=max`
    Range { min: i64, max: i64 },
}

impl Rule {
    /// Build a [`Rule::Pattern`] anchored at both ends
    pub fn pattern(pattern: &str) -> Result<Rule, DescriptionError> {
        Regex::new(&format!("^(?:{pattern})$"))
            .map(Rule::Pattern)
            .map_err(|err| DescriptionError::InvalidRule {
                rule: pattern.to_owned(),
                reason: err.to_string(),
            })
    }

    pub fn one_of<S: Into<String>>(literals: impl IntoIterator<Item = S>) -> Rule {
        Rule::OneOf(literals.into_iter().map(Into::into).collect())
    }

    /// Describe how `field` breaks this rule, `None` when it conforms
    pub fn check(&self, field: &Field) -> Option<String> {
        let text = field.as_string();
        let text = text.trim();
        match self {
            Rule::Pattern(regex) => {
                let whole = regex
                    .find(text)
                    .is_some_and(|found| found.start() == 0 && found.end() == text.len());
                (!whole).then(|| format!("does not match `{}`", regex.as_str()))
            }
            Rule::OneOf(literals) => (!literals.iter().any(|literal| literal.trim() == text))
                .then(|| format!("is not one of {literals:?}")),
            Rule::Range { min, max } => match field.as_integer() {
                Ok(value) if (*min..=*max).contains(&value) => None,
                Ok(_) => Some(format!("is outside {min}..={max}")),
                Err(_) => Some(format!("is not an integer in {min}..={max}")),
            },
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rule::Pattern(regex) => write!(f, "pattern `{}`", regex.as_str()),
            Rule::OneOf(literals) => write!(f, "one of {literals:?}"),
            Rule::Range { min, max } => write!(f, "range {min}..={max}"),
        }
    }
}

/// A value that was read or set but breaks a rule of its field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationWarning {
    /// Qualified key of the field
    pub key: String,
    /// Text form of the offending value
    pub value: String,
    /// The violated rule
    pub reason: String,
}

impl fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = [{}] {}", self.key, self.value, self.reason)
    }
}

/// A scalar instruction, producing a single field
#[derive(Debug, Clone, Builder)]
pub struct ScalarSpec {
    pub kind: FieldKind,

    /// Key of the field, extended with loop indices inside loops
    #[builder(into)]
    pub tag: String,

    #[builder(into)]
    pub width: Width,

    /// Human readable name
    #[builder(into, default)]
    pub label: String,

    pub rule: Option<Rule>,
}

impl ScalarSpec {
    /// Charset and rule violations of a value stored under `key`
    pub fn check(&self, key: &str, field: &Field) -> Vec<ValidationWarning> {
        field
            .charset_violation()
            .map(str::to_owned)
            .into_iter()
            .chain(self.rule.as_ref().and_then(|rule| rule.check(field)))
            .map(|reason| ValidationWarning {
                key: key.to_owned(),
                value: field.to_string(),
                reason,
            })
            .collect()
    }
}

/// One instruction of a [`Description`]
#[derive(Debug, Clone)]
pub enum FieldSpec {
    Scalar(ScalarSpec),
    LoopStart(Repeat),
    LoopEnd,
    CondStart(Condition),
    CondEnd,
    End,
}

impl FieldSpec {
    fn scalar(kind: FieldKind, tag: &str, width: impl Into<Width>, label: &str) -> FieldSpec {
        FieldSpec::Scalar(
            ScalarSpec::builder()
                .kind(kind)
                .tag(tag)
                .width(width)
                .label(label)
                .build(),
        )
    }

    /// BCS-A scalar
    pub fn alpha(tag: &str, width: impl Into<Width>, label: &str) -> FieldSpec {
        FieldSpec::scalar(FieldKind::Alpha, tag, width, label)
    }

    /// BCS-N scalar
    pub fn numeric(tag: &str, width: impl Into<Width>, label: &str) -> FieldSpec {
        FieldSpec::scalar(FieldKind::Numeric, tag, width, label)
    }

    /// Binary scalar
    pub fn binary(tag: &str, width: impl Into<Width>, label: &str) -> FieldSpec {
        FieldSpec::scalar(FieldKind::Binary, tag, width, label)
    }

    /// Start of a loop
    pub fn repeat(count: impl Into<Repeat>) -> FieldSpec {
        FieldSpec::LoopStart(count.into())
    }

    /// Start of a conditional block, `FieldSpec::when("ENGTYP", "eq I")`
    pub fn when(tag: &str, comparison: &str) -> Result<FieldSpec, DescriptionError> {
        Ok(FieldSpec::CondStart(Condition::parse(tag, comparison)?))
    }

    /// Attach a rule to a scalar, other instructions are returned unchanged
    pub fn with_rule(self, rule: Rule) -> FieldSpec {
        match self {
            FieldSpec::Scalar(scalar) => FieldSpec::Scalar(ScalarSpec {
                rule: Some(rule),
                ..scalar
            }),
            other => other,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Block {
    Loop,
    Cond,
}

/// A validated instruction list
///
/// Construction checks that blocks are balanced, that every reference names a scalar declared
/// earlier and that no tag repeats at one loop depth. A missing `End` is appended.
#[derive(Debug, Clone)]
pub struct Description {
    specs: Vec<FieldSpec>,
    /// index of the matching marker for block instructions, the instruction itself otherwise
    partners: Vec<usize>,
}

impl Description {
    pub fn new(mut specs: Vec<FieldSpec>) -> Result<Description, DescriptionError> {
        let mut partners = (0..specs.len()).collect::<Vec<_>>();
        let mut blocks: Vec<(usize, Block)> = Vec::new();
        // tag -> loops enclosing each of its declarations, outermost first
        let mut declared: HashMap<&str, Vec<Vec<usize>>> = HashMap::new();
        let mut depths: Vec<HashSet<&str>> = vec![HashSet::new()];
        let mut ended = false;

        for (index, spec) in specs.iter().enumerate() {
            if ended {
                return Err(DescriptionError::TrailingInstructions { index });
            }

            match spec {
                FieldSpec::Scalar(scalar) => {
                    if scalar.tag.is_empty() || scalar.tag.contains(KEY_SEPARATOR) {
                        return Err(DescriptionError::InvalidTag {
                            index,
                            tag: scalar.tag.clone(),
                        });
                    }
                    if scalar.width == Width::Fixed(0) {
                        return Err(DescriptionError::ZeroWidth {
                            tag: scalar.tag.clone(),
                        });
                    }
                    check_references(index, scalar.width.references(), &declared, &open_loops(&blocks))?;

                    let loop_depth = blocks.iter().filter(|(_, b)| *b == Block::Loop).count();
                    let conditional = blocks.iter().any(|(_, b)| *b == Block::Cond);
                    if depths.len() <= loop_depth {
                        depths.resize_with(loop_depth + 1, HashSet::new);
                    }
                    if !depths[loop_depth].insert(&scalar.tag) && !conditional {
                        return Err(DescriptionError::DuplicateTag {
                            tag: scalar.tag.clone(),
                        });
                    }
                    declared
                        .entry(&scalar.tag)
                        .or_default()
                        .push(open_loops(&blocks));
                }
                FieldSpec::LoopStart(repeat) => {
                    check_references(index, repeat.references(), &declared, &open_loops(&blocks))?;
                    blocks.push((index, Block::Loop));
                }
                FieldSpec::CondStart(condition) => {
                    check_references(
                        index,
                        vec![condition.tag.as_str()],
                        &declared,
                        &open_loops(&blocks),
                    )?;
                    blocks.push((index, Block::Cond));
                }
                FieldSpec::LoopEnd => match blocks.pop() {
                    Some((start, Block::Loop)) => {
                        partners[start] = index;
                        partners[index] = start;
                    }
                    _ => return Err(DescriptionError::UnmatchedLoopEnd { index }),
                },
                FieldSpec::CondEnd => match blocks.pop() {
                    Some((start, Block::Cond)) => {
                        partners[start] = index;
                        partners[index] = start;
                    }
                    _ => return Err(DescriptionError::UnmatchedConditionEnd { index }),
                },
                FieldSpec::End => ended = true,
            }
        }

        if let Some((index, _)) = blocks.pop() {
            return Err(DescriptionError::UnclosedBlock { index });
        }

        if !ended {
            partners.push(specs.len());
            specs.push(FieldSpec::End);
        }

        Ok(Description { specs, partners })
    }

    /// A single binary field taking the whole record
    pub(crate) fn opaque(tag: &str, label: &str) -> Description {
        Description {
            specs: vec![FieldSpec::binary(tag, Width::Remaining, label), FieldSpec::End],
            partners: vec![0, 1],
        }
    }

    /// All instructions, ending with [`FieldSpec::End`]
    pub fn specs(&self) -> &[FieldSpec] {
        &self.specs
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Scalar instructions in declaration order
    pub fn scalars(&self) -> impl Iterator<Item = &ScalarSpec> {
        self.specs.iter().filter_map(|spec| match spec {
            FieldSpec::Scalar(scalar) => Some(scalar),
            _ => None,
        })
    }

    /// The scalar instruction declaring `tag`
    pub fn scalar(&self, tag: &str) -> Option<&ScalarSpec> {
        self.scalars().find(|scalar| scalar.tag == tag)
    }

    pub(crate) fn get(&self, ip: usize) -> Option<&FieldSpec> {
        self.specs.get(ip)
    }

    /// Index of the marker closing or opening the block at `ip`
    pub(crate) fn partner(&self, ip: usize) -> usize {
        self.partners[ip]
    }
}

fn open_loops(blocks: &[(usize, Block)]) -> Vec<usize> {
    blocks
        .iter()
        .filter(|(_, block)| *block == Block::Loop)
        .map(|(start, _)| *start)
        .collect()
}

/// Every tag must be declared earlier, inside loops that all enclose the referring instruction
fn check_references(
    index: usize,
    tags: Vec<&str>,
    declared: &HashMap<&str, Vec<Vec<usize>>>,
    loops: &[usize],
) -> Result<(), DescriptionError> {
    for tag in tags {
        let Some(scopes) = declared.get(tag) else {
            return Err(DescriptionError::UnknownReference {
                index,
                tag: tag.to_owned(),
            });
        };
        if !scopes.iter().any(|scope| loops.starts_with(scope)) {
            return Err(DescriptionError::ReferenceOutOfScope {
                index,
                tag: tag.to_owned(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use crate::description::{Description, FieldSpec, Repeat, Rule, Width};
    use crate::error::{DescriptionError, Result};
    use crate::field::{Field, FieldKind};

    #[test]
    fn appends_missing_end() -> Result<()> {
        let description = Description::new(vec![FieldSpec::alpha("A", 2, "A")])?;
        assert_eq!(description.len(), 2);
        assert!(matches!(description.specs()[1], FieldSpec::End));
        Ok(())
    }

    #[test]
    fn pairs_nested_blocks() -> Result<()> {
        let description = Description::new(vec![
            FieldSpec::numeric("N", 1, "N"),
            FieldSpec::repeat(Repeat::reference("N")),
            FieldSpec::when("N", "> 1")?,
            FieldSpec::alpha("A", 1, "A"),
            FieldSpec::CondEnd,
            FieldSpec::LoopEnd,
        ])?;
        assert_eq!(description.partner(1), 5);
        assert_eq!(description.partner(5), 1);
        assert_eq!(description.partner(2), 4);
        assert_eq!(description.partner(4), 2);
        Ok(())
    }

    #[test]
    fn rejects_crossed_blocks() -> Result<()> {
        let err = Description::new(vec![
            FieldSpec::numeric("N", 1, "N"),
            FieldSpec::repeat(2),
            FieldSpec::when("N", "== 1")?,
            FieldSpec::LoopEnd,
            FieldSpec::CondEnd,
        ])
        .unwrap_err();
        assert_eq!(err, DescriptionError::UnmatchedLoopEnd { index: 3 });

        let err = Description::new(vec![FieldSpec::repeat(2), FieldSpec::End]).unwrap_err();
        assert_eq!(err, DescriptionError::UnclosedBlock { index: 0 });

        let err = Description::new(vec![FieldSpec::CondEnd]).unwrap_err();
        assert_eq!(err, DescriptionError::UnmatchedConditionEnd { index: 0 });
        Ok(())
    }

    #[test]
    fn rejects_forward_references() {
        let err = Description::new(vec![
            FieldSpec::alpha("DATA", Width::reference("LEN"), "Data"),
            FieldSpec::numeric("LEN", 3, "Length"),
        ])
        .unwrap_err();
        assert_eq!(
            err,
            DescriptionError::UnknownReference {
                index: 0,
                tag: "LEN".into()
            }
        );
    }

    #[test]
    fn rejects_out_of_scope_references() -> Result<()> {
        let err = Description::new(vec![
            FieldSpec::repeat(2),
            FieldSpec::numeric("LEN", 1, "Length"),
            FieldSpec::LoopEnd,
            FieldSpec::alpha("DATA", Width::reference("LEN"), "Data"),
        ])
        .unwrap_err();
        assert_eq!(
            err,
            DescriptionError::ReferenceOutOfScope {
                index: 3,
                tag: "LEN".into()
            }
        );

        let err = Description::new(vec![
            FieldSpec::repeat(2),
            FieldSpec::numeric("N", 1, "Count"),
            FieldSpec::LoopEnd,
            FieldSpec::repeat(2),
            FieldSpec::when("N", "> 0")?,
            FieldSpec::alpha("A", 1, "A"),
            FieldSpec::CondEnd,
            FieldSpec::LoopEnd,
        ])
        .unwrap_err();
        assert!(matches!(err, DescriptionError::ReferenceOutOfScope { index: 4, .. }));

        // outer and enclosing loops stay visible
        Description::new(vec![
            FieldSpec::numeric("N", 1, "Count"),
            FieldSpec::repeat(Repeat::reference("N")),
            FieldSpec::numeric("M", 1, "Inner count"),
            FieldSpec::repeat(Repeat::reference("M")),
            FieldSpec::alpha("V", Width::computed("N M +")?, "Value"),
            FieldSpec::LoopEnd,
            FieldSpec::LoopEnd,
        ])?;
        Ok(())
    }

    #[test]
    fn rejects_bad_scalars() {
        let err = Description::new(vec![FieldSpec::alpha("A#1", 1, "")]).unwrap_err();
        assert!(matches!(err, DescriptionError::InvalidTag { .. }));

        let err = Description::new(vec![FieldSpec::alpha("A", 0, "")]).unwrap_err();
        assert_eq!(err, DescriptionError::ZeroWidth { tag: "A".into() });

        let err = Description::new(vec![FieldSpec::End, FieldSpec::alpha("A", 1, "")]).unwrap_err();
        assert_eq!(err, DescriptionError::TrailingInstructions { index: 1 });
    }

    #[test]
    fn duplicate_tags() -> Result<()> {
        let err = Description::new(vec![
            FieldSpec::alpha("A", 1, ""),
            FieldSpec::alpha("A", 1, ""),
        ])
        .unwrap_err();
        assert_eq!(err, DescriptionError::DuplicateTag { tag: "A".into() });

        // alternatives in conditional blocks and the same tag at another depth are fine
        Description::new(vec![
            FieldSpec::alpha("T", 1, ""),
            FieldSpec::when("T", "eq A")?,
            FieldSpec::alpha("V", 1, ""),
            FieldSpec::CondEnd,
            FieldSpec::when("T", "eq B")?,
            FieldSpec::alpha("V", 2, ""),
            FieldSpec::CondEnd,
            FieldSpec::repeat(2),
            FieldSpec::alpha("T", 1, ""),
            FieldSpec::LoopEnd,
        ])?;
        Ok(())
    }

    #[test]
    fn rules() -> Result<()> {
        let rule = Rule::pattern("[A-Z]{2}")?;
        assert_eq!(rule.check(&Field::from_raw(FieldKind::Alpha, *b"AB ")), None);
        assert!(rule.check(&Field::from_raw(FieldKind::Alpha, *b"ABC")).is_some());

        let rule = Rule::one_of(["I", "S"]);
        assert_eq!(rule.check(&Field::from_raw(FieldKind::Alpha, *b"S")), None);
        assert!(rule.check(&Field::from_raw(FieldKind::Alpha, *b"X")).is_some());

        let rule = Rule::Range { min: 1, max: 8 };
        assert_eq!(rule.check(&Field::from_raw(FieldKind::Numeric, *b"8")), None);
        assert!(rule.check(&Field::from_raw(FieldKind::Numeric, *b"9")).is_some());
        assert!(rule.check(&Field::from_raw(FieldKind::Alpha, *b"x")).is_some());
        Ok(())
    }
}

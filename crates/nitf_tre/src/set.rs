//! Alternative layouts for one TRE tag

use std::sync::Arc;
use tracing::debug;

use crate::description::Description;
use crate::error::{DescriptionError, Error, Result};

/// A named [`Description`] and the declared length it is meant for
#[derive(Debug, Clone)]
pub struct DescriptionInfo {
    pub name: String,
    pub description: Arc<Description>,
    /// Declared length this variant is chosen for, `None` when only reachable as the default
    pub length_hint: Option<usize>,
}

impl DescriptionInfo {
    pub fn new(name: impl Into<String>, description: Description) -> DescriptionInfo {
        DescriptionInfo {
            name: name.into(),
            description: Arc::new(description),
            length_hint: None,
        }
    }

    pub fn with_length_hint(mut self, length: usize) -> DescriptionInfo {
        self.length_hint = Some(length);
        self
    }
}

/// Every known layout of a tag along with the one used when no length hint matches
#[derive(Debug, Clone, Default)]
pub struct DescriptionSet {
    variants: Vec<DescriptionInfo>,
    default_index: usize,
}

impl DescriptionSet {
    pub fn new(
        variants: Vec<DescriptionInfo>,
        default_index: usize,
    ) -> core::result::Result<DescriptionSet, DescriptionError> {
        if !variants.is_empty() && default_index >= variants.len() {
            return Err(DescriptionError::DefaultOutOfRange {
                index: default_index,
                len: variants.len(),
            });
        }

        Ok(DescriptionSet {
            variants,
            default_index,
        })
    }

    /// A set holding a single layout
    pub fn single(name: impl Into<String>, description: Description) -> DescriptionSet {
        DescriptionSet {
            variants: vec![DescriptionInfo::new(name, description)],
            default_index: 0,
        }
    }

    pub fn variants(&self) -> &[DescriptionInfo] {
        &self.variants
    }

    pub fn default_index(&self) -> usize {
        self.default_index
    }

    /// The variant used when nothing else matches
    pub fn default_variant(&self) -> Option<&DescriptionInfo> {
        self.variants.get(self.default_index)
    }

    /// Look a variant up by name
    pub fn variant(&self, name: &str) -> Option<&DescriptionInfo> {
        self.variants.iter().find(|info| info.name == name)
    }

    /// Pick the layout for a record of `declared_length` bytes
    ///
    /// The first variant whose hint equals the declared length wins, in declaration order,
    /// otherwise the default is used. A set with a single variant always returns it.
    pub fn select(&self, tag: &str, declared_length: Option<usize>) -> Result<&DescriptionInfo> {
        let selected = match self.variants.as_slice() {
            [] => None,
            [only] => Some(only),
            variants => declared_length
                .and_then(|length| {
                    variants
                        .iter()
                        .find(|info| info.length_hint == Some(length))
                })
                .or_else(|| self.default_variant()),
        };

        let info = selected.ok_or_else(|| Error::NoDescription {
            tag: tag.to_owned(),
        })?;
        debug!(tag, variant = %info.name, ?declared_length, "selected description");
        Ok(info)
    }
}

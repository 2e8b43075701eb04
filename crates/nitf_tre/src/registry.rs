//! Lookup of description sets by TRE tag

use indexmap::IndexMap;
use std::sync::Arc;
use tracing::debug;

use crate::descriptions;
use crate::error::Result;
use crate::set::DescriptionSet;

/// Anything able to hand out the layouts of a tag
///
/// Implemented by [`Registry`] and by closures, so a caller can plug in its own lookup:
///
/// ```
/// use std::sync::Arc;
/// use nitf_tre::registry::DescriptionSource;
/// use nitf_tre::set::DescriptionSet;
///
/// let nothing = |_: &str| -> Option<Arc<DescriptionSet>> { None };
/// assert!(nothing.description_set("ENGRDA").is_none());
/// ```
pub trait DescriptionSource {
    fn description_set(&self, tag: &str) -> Option<Arc<DescriptionSet>>;
}

impl<F> DescriptionSource for F
where
    F: Fn(&str) -> Option<Arc<DescriptionSet>>,
{
    fn description_set(&self, tag: &str) -> Option<Arc<DescriptionSet>> {
        self(tag)
    }
}

/// Description sets registered by tag, in registration order
#[derive(Debug, Clone, Default)]
pub struct Registry {
    sets: IndexMap<String, Arc<DescriptionSet>>,
}

impl Registry {
    pub fn new() -> Registry {
        Registry::default()
    }

    /// A registry holding the tables shipped with this crate
    pub fn with_builtins() -> Result<Registry> {
        let mut registry = Registry::new();
        for (tag, set) in descriptions::builtins()? {
            registry.register(tag, set);
        }
        Ok(registry)
    }

    /// Register the layouts of `tag`, returning the ones it replaces
    pub fn register(
        &mut self,
        tag: impl Into<String>,
        set: impl Into<Arc<DescriptionSet>>,
    ) -> Option<Arc<DescriptionSet>> {
        let tag = tag.into().trim_end().to_owned();
        debug!(%tag, "registered description set");
        self.sets.insert(tag, set.into())
    }

    pub fn get(&self, tag: &str) -> Option<&Arc<DescriptionSet>> {
        self.sets.get(tag.trim_end())
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.sets.contains_key(tag.trim_end())
    }

    /// Registered tags in registration order
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.sets.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }
}

impl DescriptionSource for Registry {
    fn description_set(&self, tag: &str) -> Option<Arc<DescriptionSet>> {
        self.get(tag).cloned()
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use crate::description::{Description, FieldSpec};
    use crate::error::Result;
    use crate::registry::{DescriptionSource, Registry};
    use crate::set::DescriptionSet;

    #[test]
    fn builtins() -> Result<()> {
        let registry = Registry::with_builtins()?;
        assert_eq!(registry.tags().collect::<Vec<_>>(), ["ENGRDA", "BANDSB"]);
        assert!(registry.contains("ENGRDA"));
        assert!(registry.description_set("BANDSB").is_some());
        assert!(registry.description_set("NOPE").is_none());
        Ok(())
    }

    #[test]
    fn register_replaces() -> Result<()> {
        let mut registry = Registry::new();
        let set = DescriptionSet::single("a", Description::new(vec![FieldSpec::alpha("A", 1, "")])?);

        assert!(registry.register("TEST  ", set.clone()).is_none());
        assert!(registry.register("TEST", set).is_some());
        assert_eq!(registry.len(), 1);
        assert!(registry.get("TEST  ").is_some());
        Ok(())
    }
}

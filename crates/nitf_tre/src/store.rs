//! Insertion-ordered storage of the fields of one TRE

use indexmap::IndexMap;

use crate::field::Field;

/// Separates a tag from its loop indices in a qualified key
pub const KEY_SEPARATOR: char = '#';

/// Separates the loop indices of a qualified key from each other
pub const INDEX_SEPARATOR: char = '.';

/// Build the qualified key of `tag` inside the given loop iterations, outermost first
///
/// ```
/// use nitf_tre::store::qualify;
///
/// assert_eq!(qualify("RESRC", &[]), "RESRC");
/// assert_eq!(qualify("ITEM", &[1]), "ITEM#1");
/// assert_eq!(qualify("APN", &[0, 3]), "APN#0.3");
/// ```
pub fn qualify(tag: &str, path: &[usize]) -> String {
    if path.is_empty() {
        return tag.to_owned();
    }

    let indices = path
        .iter()
        .map(usize::to_string)
        .collect::<Vec<_>>()
        .join(&INDEX_SEPARATOR.to_string());
    format!("{tag}{KEY_SEPARATOR}{indices}")
}

/// The tag part of a qualified key
pub fn base_tag(key: &str) -> &str {
    key.split_once(KEY_SEPARATOR).map_or(key, |(tag, _)| tag)
}

/// Ordered mapping of qualified keys to [`Field`]s
///
/// Iteration follows insertion order, which for a decoded TRE is the order the fields appear in
/// the byte stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldStore {
    fields: IndexMap<String, Field>,
}

impl FieldStore {
    pub fn new() -> FieldStore {
        FieldStore::default()
    }

    /// Look a field up by qualified key
    ///
    /// A bare tag without an exact entry resolves to the most recently inserted field with that
    /// tag, whatever loop iteration it was produced in.
    pub fn get(&self, key: &str) -> Option<&Field> {
        if let Some(field) = self.fields.get(key) {
            return Some(field);
        }
        if key.contains(KEY_SEPARATOR) {
            return None;
        }
        self.fields
            .iter()
            .rev()
            .find(|(stored, _)| base_tag(stored) == key)
            .map(|(_, field)| field)
    }

    /// Look a field up by qualified key, without falling back to other iterations
    pub fn get_exact(&self, key: &str) -> Option<&Field> {
        self.fields.get(key)
    }

    /// Insert or replace a field, a replaced field keeps its position
    pub fn set(&mut self, key: impl Into<String>, field: Field) -> Option<Field> {
        self.fields.insert(key.into(), field)
    }

    /// Remove a field, keeping the order of the others
    pub fn remove(&mut self, key: &str) -> Option<Field> {
        self.fields.shift_remove(key)
    }

    /// Whether a field is stored under exactly this key
    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn clear(&mut self) {
        self.fields.clear();
    }

    /// Iterate `(key, field)` pairs in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Field)> {
        self.fields.iter().map(|(key, field)| (key.as_str(), field))
    }

    /// Iterate keys in insertion order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Resolve a backward reference to `tag` from inside the loop iterations `path`
    ///
    /// The innermost context wins: `TAG#i.j` is tried before `TAG#i`, which is tried before `TAG`.
    /// Returns the key that matched along with the field.
    pub fn resolve(&self, tag: &str, path: &[usize]) -> Option<(String, &Field)> {
        (0..=path.len()).rev().find_map(|depth| {
            let key = qualify(tag, &path[..depth]);
            self.fields.get(&key).map(|field| (key, field))
        })
    }
}

impl<'a> IntoIterator for &'a FieldStore {
    type Item = (&'a String, &'a Field);
    type IntoIter = indexmap::map::Iter<'a, String, Field>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

impl<K: Into<String>> FromIterator<(K, Field)> for FieldStore {
    fn from_iter<T: IntoIterator<Item = (K, Field)>>(iter: T) -> Self {
        FieldStore {
            fields: iter.into_iter().map(|(key, field)| (key.into(), field)).collect(),
        }
    }
}

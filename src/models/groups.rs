use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;

use serde::de::{Deserialize, Deserializer, MapAccess, Visitor};
use serde::ser::{Serialize, SerializeMap, Serializer};

/// Ordered mapping from group key to a sequence of records
///
/// Groups keep the key order of the source document, so an output file lines
/// up with its input group for group. Re-inserting an existing key replaces
/// the records but keeps the original position.
#[derive(Debug, Clone, PartialEq)]
pub struct Groups<T> {
    entries: Vec<(String, Vec<T>)>,
    positions: HashMap<String, usize>,
}

impl<T> Default for Groups<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            positions: HashMap::new(),
        }
    }
}

impl<T> Groups<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a group, replacing the records of an existing key in place
    pub fn insert(&mut self, key: impl Into<String>, items: Vec<T>) {
        let key = key.into();
        match self.positions.get(&key) {
            Some(&position) => self.entries[position].1 = items,
            None => {
                self.positions.insert(key.clone(), self.entries.len());
                self.entries.push((key, items));
            }
        }
    }

    /// Records of a single group
    pub fn get(&self, key: &str) -> Option<&[T]> {
        self.positions
            .get(key)
            .map(|&position| self.entries[position].1.as_slice())
    }

    /// Iterate groups in document order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[T])> {
        self.entries
            .iter()
            .map(|(key, items)| (key.as_str(), items.as_slice()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    /// Number of groups
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total number of records across all groups
    pub fn item_count(&self) -> usize {
        self.entries.iter().map(|(_, items)| items.len()).sum()
    }
}

impl<T> FromIterator<(String, Vec<T>)> for Groups<T> {
    fn from_iter<I: IntoIterator<Item = (String, Vec<T>)>>(iter: I) -> Self {
        let mut groups = Groups::new();
        for (key, items) in iter {
            groups.insert(key, items);
        }
        groups
    }
}

impl<T: Serialize> Serialize for Groups<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, items) in &self.entries {
            map.serialize_entry(key, items)?;
        }
        map.end()
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Groups<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(GroupsVisitor(PhantomData))
    }
}

struct GroupsVisitor<T>(PhantomData<T>);

impl<'de, T: Deserialize<'de>> Visitor<'de> for GroupsVisitor<T> {
    type Value = Groups<T>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("an object mapping group keys to arrays")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut groups = Groups::new();
        while let Some((key, items)) = access.next_entry::<String, Vec<T>>()? {
            groups.insert(key, items);
        }
        Ok(groups)
    }
}

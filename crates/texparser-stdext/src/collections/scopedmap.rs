//! A map whose mutations are rolled back when a group ends.
//!
//! [ScopedMap] is an associative container with a stack of nested groups.
//! A group is started with [ScopedMap::begin_group] and finished with
//! [ScopedMap::end_group].
//! Writes made with [ScopedMap::insert_local] are undone when the innermost
//! group ends, which restores whatever value was visible before the group started.
//! Writes made with [ScopedMap::insert_global] survive the end of every group.
//!
//! ```
//! # use texparser_stdext::collections::scopedmap::ScopedMap;
//! let mut capitals = ScopedMap::default();
//! capitals.insert_local("ireland", "dublin");
//!
//! capitals.begin_group();
//! capitals.insert_local("ireland", "cork");
//! capitals.insert_local("france", "paris");
//! assert_eq!(capitals.get(&"ireland"), Some(&"cork"));
//! assert_eq!(capitals.end_group(), Ok(()));
//!
//! assert_eq!(capitals.get(&"ireland"), Some(&"dublin"));
//! assert_eq!(capitals.get(&"france"), None);
//! ```
//!
//! Global writes punch through all of the open groups:
//! ```
//! # use texparser_stdext::collections::scopedmap::ScopedMap;
//! let mut capitals = ScopedMap::default();
//! capitals.begin_group();
//! capitals.begin_group();
//! capitals.insert_global("peru", "lima");
//! assert_eq!(capitals.end_group(), Ok(()));
//! assert_eq!(capitals.end_group(), Ok(()));
//! assert_eq!(capitals.get(&"peru"), Some(&"lima"));
//! ```
//!
//! Ending a group when none is open is an error:
//! ```
//! # use texparser_stdext::collections::scopedmap::{NoGroupToEndError, ScopedMap};
//! let mut capitals = ScopedMap::<String, String>::default();
//! assert_eq!(capitals.end_group(), Err(NoGroupToEndError));
//! ```
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::hash::Hash;

/// The scope in which a write is performed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Scope {
    /// The write is rolled back at the end of the current group.
    Local,
    /// The write persists beyond the end of all current groups.
    Global,
}

/// Error returned by [ScopedMap::end_group] when there is no group to end.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct NoGroupToEndError;

impl std::fmt::Display for NoGroupToEndError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "there is no group to end")
    }
}

impl std::error::Error for NoGroupToEndError {}

/// Map with TeX grouping semantics.
///
/// See the module documentation.
#[derive(Debug, Clone)]
pub struct ScopedMap<K, V> {
    visible: HashMap<K, V>,
    // For each open group, the value each key had before its first local write in the group.
    // `None` means the key was not present.
    undo_logs: Vec<HashMap<K, Option<V>>>,
}

impl<K, V> Default for ScopedMap<K, V> {
    fn default() -> Self {
        Self {
            visible: HashMap::new(),
            undo_logs: Vec::new(),
        }
    }
}

impl<K: Eq + Hash + Clone, V> ScopedMap<K, V> {
    /// Returns the value currently visible at the key.
    #[inline]
    pub fn get(&self, key: &K) -> Option<&V> {
        self.visible.get(key)
    }

    /// Inserts a value that will be rolled back at the end of the current group.
    ///
    /// If there is no open group the write is permanent.
    /// Writing the same key twice in one group just replaces the value;
    /// the value restored at the end of the group is the one from before the first write.
    pub fn insert_local(&mut self, key: K, val: V) {
        match self.undo_logs.last_mut() {
            None => {
                self.visible.insert(key, val);
            }
            Some(undo_log) => {
                let old = self.visible.insert(key.clone(), val);
                if let Entry::Vacant(entry) = undo_log.entry(key) {
                    entry.insert(old);
                }
            }
        }
    }

    /// Inserts a value that survives the end of every open group.
    pub fn insert_global(&mut self, key: K, val: V) {
        for undo_log in &mut self.undo_logs {
            undo_log.remove(&key);
        }
        self.visible.insert(key, val);
    }

    /// Inserts a value in the provided scope.
    pub fn insert(&mut self, key: K, val: V, scope: Scope) {
        match scope {
            Scope::Local => self.insert_local(key, val),
            Scope::Global => self.insert_global(key, val),
        }
    }

    /// Begins a new group.
    pub fn begin_group(&mut self) {
        self.undo_logs.push(HashMap::new());
    }

    /// Ends the current group, rolling back all of its local writes.
    pub fn end_group(&mut self) -> Result<(), NoGroupToEndError> {
        let undo_log = self.undo_logs.pop().ok_or(NoGroupToEndError)?;
        for (key, old) in undo_log {
            match old {
                None => {
                    self.visible.remove(&key);
                }
                Some(old) => {
                    self.visible.insert(key, old);
                }
            }
        }
        Ok(())
    }

    /// Returns the number of groups currently open.
    pub fn depth(&self) -> usize {
        self.undo_logs.len()
    }

    /// Iterates over all visible (key, value) pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.visible.iter()
    }

    /// Returns the number of visible entries.
    pub fn len(&self) -> usize {
        self.visible.len()
    }

    pub fn is_empty(&self) -> bool {
        self.visible.is_empty()
    }
}

impl<K: Eq + Hash + Clone, V> FromIterator<(K, V)> for ScopedMap<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        ScopedMap {
            visible: iter.into_iter().collect(),
            undo_logs: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_write_in_group_is_rolled_back() {
        let mut map = ScopedMap::default();
        map.insert_local(1, "a");
        map.begin_group();
        map.insert_local(1, "b");
        map.insert_local(1, "c");
        assert_eq!(map.get(&1), Some(&"c"));
        map.end_group().unwrap();
        assert_eq!(map.get(&1), Some(&"a"));
    }

    #[test]
    fn shadowing_across_nested_groups() {
        let mut map = ScopedMap::default();
        map.begin_group();
        map.insert_local(1, "outer");
        map.begin_group();
        map.insert_local(1, "inner");
        map.end_group().unwrap();
        assert_eq!(map.get(&1), Some(&"outer"));
        map.end_group().unwrap();
        assert_eq!(map.get(&1), None);
    }

    #[test]
    fn global_then_local_in_same_group() {
        let mut map = ScopedMap::default();
        map.insert_local(1, "root");
        map.begin_group();
        map.insert_global(1, "global");
        map.insert_local(1, "local");
        map.end_group().unwrap();
        assert_eq!(map.get(&1), Some(&"global"));
    }

    #[test]
    fn local_then_global_in_same_group() {
        let mut map = ScopedMap::default();
        map.insert_local(1, "root");
        map.begin_group();
        map.insert_local(1, "local");
        map.insert_global(1, "global");
        map.end_group().unwrap();
        assert_eq!(map.get(&1), Some(&"global"));
    }

    #[test]
    fn empty_group_round_trip() {
        let mut map: ScopedMap<i32, i32> = [(1, 2), (3, 4)].into_iter().collect();
        map.begin_group();
        map.end_group().unwrap();
        let mut entries: Vec<(i32, i32)> = map.iter().map(|(k, v)| (*k, *v)).collect();
        entries.sort();
        assert_eq!(entries, vec![(1, 2), (3, 4)]);
    }

    #[test]
    fn end_group_underflow() {
        let mut map = ScopedMap::<i32, i32>::default();
        map.begin_group();
        assert_eq!(map.depth(), 1);
        assert_eq!(map.end_group(), Ok(()));
        assert_eq!(map.end_group(), Err(NoGroupToEndError));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn scope_serde() {
        let json = serde_json::to_string(&Scope::Global).unwrap();
        assert_eq!(json, "\"Global\"");
        let scope: Scope = serde_json::from_str(&json).unwrap();
        assert_eq!(scope, Scope::Global);
    }
}

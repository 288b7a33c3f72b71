//! String interning
//!
//! An interner maps strings to small integer keys so that control sequence names
//! can be stored, copied and compared as integers.
//! Each distinct string is stored exactly once and is never deallocated.
//!
//! ```
//! # use texparser_stdext::collections::interner::Interner;
//! let mut interner: Interner = Default::default();
//! let alpha_1 = interner.get_or_intern("alpha");
//! let beta = interner.get_or_intern("beta");
//! let alpha_2 = interner.get_or_intern("alpha");
//! assert_eq!(alpha_1, alpha_2);
//! assert_ne!(alpha_1, beta);
//! assert_eq!(interner.resolve(beta), Some("beta"));
//! assert_eq!(interner.get("gamma"), None);
//! ```
//!
//! All interned strings live in one [String] buffer.
//! The key of a string is one plus its position in a vector of buffer end offsets,
//!     so resolving a key is two vector lookups and a slice.
//! Deduplication uses a map from the string's hash to the keys with that hash.

use std::collections::hash_map::RandomState;
use std::collections::HashMap;
use std::hash::BuildHasher;
use std::num::NonZeroU32;

/// Types that can be used as keys in the [Interner].
pub trait Key: Copy + Eq {
    /// Creates the key for the `index`-th interned string, starting at 0.
    fn try_from_usize(index: usize) -> Option<Self>;

    /// Returns the index passed to [Key::try_from_usize].
    fn into_usize(self) -> usize;
}

impl Key for NonZeroU32 {
    fn try_from_usize(index: usize) -> Option<Self> {
        let index: u32 = index.checked_add(1)?.try_into().ok()?;
        NonZeroU32::new(index)
    }

    fn into_usize(self) -> usize {
        self.get() as usize - 1
    }
}

/// String interner.
pub struct Interner<K = NonZeroU32, S = RandomState> {
    buffer: String,
    ends: Vec<usize>,
    by_hash: HashMap<u64, Vec<K>>,
    hash_builder: S,
}

impl<K, S: Default> Default for Interner<K, S> {
    fn default() -> Self {
        Interner {
            buffer: String::new(),
            ends: Vec::new(),
            by_hash: HashMap::new(),
            hash_builder: S::default(),
        }
    }
}

/// Error returned when the key type cannot represent any more strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeysExhaustedError;

impl<K: Key, S: BuildHasher> Interner<K, S> {
    /// Interns the string and returns its key.
    ///
    /// Panics if the key space is exhausted; see [Interner::try_get_or_intern].
    pub fn get_or_intern(&mut self, s: &str) -> K {
        match self.try_get_or_intern(s) {
            Ok(key) => key,
            Err(KeysExhaustedError) => panic!("interner key space exhausted"),
        }
    }

    /// Interns the string and returns its key, or an error if the key space is exhausted.
    pub fn try_get_or_intern(&mut self, s: &str) -> Result<K, KeysExhaustedError> {
        let hash = self.hash_builder.hash_one(s);
        if let Some(key) = self.find(s, hash) {
            return Ok(key);
        }
        let key = K::try_from_usize(self.ends.len()).ok_or(KeysExhaustedError)?;
        self.buffer.push_str(s);
        self.ends.push(self.buffer.len());
        self.by_hash.entry(hash).or_default().push(key);
        Ok(key)
    }

    /// Returns the key of the string if it has already been interned.
    pub fn get(&self, s: &str) -> Option<K> {
        self.find(s, self.hash_builder.hash_one(s))
    }

    /// Returns the string corresponding to the key.
    pub fn resolve(&self, key: K) -> Option<&str> {
        let i = key.into_usize();
        let end = *self.ends.get(i)?;
        let start = match i {
            0 => 0,
            _ => self.ends[i - 1],
        };
        Some(&self.buffer[start..end])
    }

    /// Returns the number of interned strings.
    pub fn len(&self) -> usize {
        self.ends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ends.is_empty()
    }

    fn find(&self, s: &str, hash: u64) -> Option<K> {
        self.by_hash
            .get(&hash)?
            .iter()
            .copied()
            .find(|key| self.resolve(*key) == Some(s))
    }
}

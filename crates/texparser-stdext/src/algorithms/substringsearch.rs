//! Knuth–Morris–Pratt substring search
//!
//! A [Matcher] is built once for a pattern and then used to scan any number of
//!     sequences whose elements arrive one at a time.
//! This is how delimited macro arguments are found: the delimiter is the pattern
//!     and tokens are fed in as they are read from the input.
//!
//! ```
//! # use texparser_stdext::algorithms::substringsearch::Matcher;
//! let matcher = Matcher::new(vec!['a', 'b', 'a']);
//! let mut search = matcher.start();
//! let hits: Vec<bool> = "xababa".chars().map(|c| search.next(&c)).collect();
//! assert_eq!(hits, vec![false, false, false, true, false, true]);
//! ```

/// A precomputed pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Matcher<T> {
    pattern: Vec<T>,
    // failure[i] is the length of the longest proper prefix of pattern[..=i] that is also a suffix.
    failure: Vec<usize>,
}

impl<T: PartialEq> Matcher<T> {
    /// Creates a matcher for the pattern.
    ///
    /// An empty pattern matches nothing.
    pub fn new(pattern: Vec<T>) -> Matcher<T> {
        let mut failure = vec![0; pattern.len()];
        let mut k = 0;
        for i in 1..pattern.len() {
            while k > 0 && pattern[k] != pattern[i] {
                k = failure[k - 1];
            }
            if pattern[k] == pattern[i] {
                k += 1;
            }
            failure[i] = k;
        }
        Matcher { pattern, failure }
    }

    /// Starts a new search.
    pub fn start(&self) -> Search<'_, T> {
        Search {
            matcher: self,
            matched: 0,
        }
    }

    /// Returns the pattern.
    pub fn pattern(&self) -> &[T] {
        &self.pattern
    }
}

/// An in-progress search.
pub struct Search<'a, T> {
    matcher: &'a Matcher<T>,
    matched: usize,
}

impl<'a, T: PartialEq> Search<'a, T> {
    /// Feeds the next element; returns true if the pattern now ends at this element.
    pub fn next(&mut self, elem: &T) -> bool {
        let pattern = &self.matcher.pattern;
        if pattern.is_empty() {
            return false;
        }
        while self.matched > 0 && &pattern[self.matched] != elem {
            self.matched = self.matcher.failure[self.matched - 1];
        }
        if &pattern[self.matched] == elem {
            self.matched += 1;
        }
        if self.matched == pattern.len() {
            self.matched = self.matcher.failure[self.matched - 1];
            return true;
        }
        false
    }
}

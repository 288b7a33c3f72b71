//! Spell checking using Levenshtein distance
//!
//! [find_close_words] returns the words in a dictionary that are closest to a given word,
//! where the distance between two words is the number of single character
//! insertions, deletions and substitutions needed to turn one into the other.
//! It is used to suggest alternatives when a control sequence is undefined.
//!
//! ```
//! # use texparser_stdext::algorithms::spellcheck::find_close_words;
//! let close = find_close_words(&["section", "subsection", "caption"], "sectoin");
//! assert_eq!(close[0].word, "section");
//! assert_eq!(close[0].distance, 2);
//! ```

/// A dictionary word together with its distance from the searched word.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseWord {
    pub word: String,
    pub distance: usize,
}

/// Words further away than this are never suggested.
pub const MAX_DISTANCE: usize = 3;

/// Finds the dictionary words closest to `word`.
///
/// The result is sorted by distance, with ties broken alphabetically.
/// Only words within [MAX_DISTANCE] are returned, and only words that are
/// closer to `word` than `word` is to the empty string.
pub fn find_close_words(dictionary: &[&str], word: &str) -> Vec<CloseWord> {
    let target: Vec<char> = word.chars().collect();
    let max = MAX_DISTANCE.min(target.len().saturating_sub(1));
    let mut result: Vec<CloseWord> = dictionary
        .iter()
        .filter_map(|candidate| {
            let distance = levenshtein(&target, candidate);
            if distance <= max {
                Some(CloseWord {
                    word: candidate.to_string(),
                    distance,
                })
            } else {
                None
            }
        })
        .collect();
    result.sort_by(|a, b| a.distance.cmp(&b.distance).then_with(|| a.word.cmp(&b.word)));
    result
}

/// Computes the Levenshtein distance using a single row of the dynamic programming table.
fn levenshtein(a: &[char], b: &str) -> usize {
    let mut row: Vec<usize> = (0..=a.len()).collect();
    for (j, b_char) in b.chars().enumerate() {
        let mut diagonal = row[0];
        row[0] = j + 1;
        for i in 1..=a.len() {
            let substitution = diagonal + usize::from(a[i - 1] != b_char);
            diagonal = row[i];
            row[i] = substitution.min(row[i] + 1).min(row[i - 1] + 1);
        }
    }
    row[a.len()]
}

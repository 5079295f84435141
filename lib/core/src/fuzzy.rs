//! Fuzzy string similarity
//!
//! A Jaro-Winkler family comparator tuned for names: common characters and
//! transpositions give the base Jaro score, then three optional adjustments
//! are applied (similar characters, Winkler prefix, long strings).

use serde::{Deserialize, Serialize};
use smallvec::{smallvec, SmallVec};

/// Character pairs that are frequently confused by typists, OCR or
/// phonetic spelling. An unmatched character that has a similar unmatched
/// partner counts as 0.3 of a common character.
const SIMILAR_PAIRS: &[(char, char)] = &[
    ('A', 'E'), ('A', 'I'), ('A', 'O'), ('A', 'U'), ('B', 'V'), ('E', 'I'),
    ('E', 'O'), ('E', 'U'), ('I', 'O'), ('I', 'U'), ('O', 'U'), ('I', 'Y'),
    ('E', 'Y'), ('C', 'G'), ('E', 'F'), ('W', 'U'), ('W', 'V'), ('X', 'K'),
    ('S', 'Z'), ('X', 'S'), ('Q', 'C'), ('U', 'V'), ('M', 'N'), ('L', 'I'),
    ('Q', 'O'), ('P', 'R'), ('I', 'J'), ('2', 'Z'), ('5', 'S'), ('8', 'B'),
    ('1', 'I'), ('1', 'L'), ('0', 'O'), ('0', 'Q'), ('C', 'K'), ('G', 'J'),
    ('E', ' '), ('Y', ' '), ('S', ' '),
];

const SIMILAR_WEIGHT: f64 = 0.3;
const PREFIX_WEIGHT: f64 = 0.1;
const MAX_PREFIX: usize = 4;
/// Adjustments only apply to pairs that already look alike.
const BOOST_THRESHOLD: f64 = 0.7;

type Flags = SmallVec<[bool; 32]>;

/// Which adjustments to apply on top of the base Jaro score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Adjustments {
    pub similar_characters: bool,
    pub winkler_prefix: bool,
    pub long_strings: bool,
}

impl Default for Adjustments {
    fn default() -> Self {
        Self {
            similar_characters: true,
            winkler_prefix: true,
            long_strings: true,
        }
    }
}

impl Adjustments {
    /// Plain Jaro with no adjustments.
    pub fn none() -> Self {
        Self {
            similar_characters: false,
            winkler_prefix: false,
            long_strings: false,
        }
    }
}

/// Compute the similarity of two strings in `[0, 1]`.
///
/// Both strings are trimmed and upper-cased first. A blank string has
/// similarity 0 with everything.
pub fn similarity(a: &str, b: &str, adjustments: Adjustments) -> f64 {
    let s1: Vec<char> = a.trim().to_uppercase().chars().collect();
    let s2: Vec<char> = b.trim().to_uppercase().chars().collect();

    let min_len = s1.len().min(s2.len());
    let max_len = s1.len().max(s2.len());
    if min_len == 0 {
        return 0.0;
    }

    let mut flag1: Flags = smallvec![false; s1.len()];
    let mut flag2: Flags = smallvec![false; s2.len()];
    let n_common = count_common(&s1, &s2, &mut flag1, &mut flag2, max_len);
    if n_common == 0 {
        return 0.0;
    }

    let n_trans = count_transpositions(&s1, &s2, &flag1, &flag2);

    let mut n_simi = n_common as f64;
    if adjustments.similar_characters && min_len > n_common {
        n_simi += SIMILAR_WEIGHT * count_similar(&s1, &s2, &flag1, &flag2) as f64;
    }

    let mut weight = n_simi / s1.len() as f64
        + n_simi / s2.len() as f64
        + (n_common - n_trans) as f64 / n_common as f64;
    weight /= 3.0;

    if weight > BOOST_THRESHOLD {
        let mut prefix = 0;
        if adjustments.winkler_prefix {
            let hi = min_len.min(MAX_PREFIX);
            while prefix < hi && s1[prefix] == s2[prefix] && s2[prefix].is_alphabetic() {
                prefix += 1;
            }
            weight += prefix as f64 * PREFIX_WEIGHT * (1.0 - weight);
        }

        // After the agreeing prefix, at least two more characters must agree
        // and the agreements must cover more than half of what remains.
        if adjustments.long_strings
            && min_len > MAX_PREFIX
            && n_common > prefix + 1
            && 2 * n_common > min_len + prefix
            && s1[0].is_alphabetic()
        {
            weight += (1.0 - weight) * (n_common - prefix - 1) as f64
                / (s1.len() + s2.len() - 2 * prefix + 2) as f64;
        }
    }

    weight
}

/// Count characters common to both strings and flag their positions.
///
/// Character `i` of `s1` is searched for in `s2[i - r..i + r]` with
/// `r = max_len / 2 - 1`; the upper bound is exclusive and the window is
/// empty when `r <= 0`.
fn count_common(s1: &[char], s2: &[char], flag1: &mut [bool], flag2: &mut [bool], max_len: usize) -> usize {
    let radius = (max_len / 2) as isize - 1;
    let mut n_common = 0;

    for (i, &c) in s1.iter().enumerate() {
        let pos = i as isize;
        let lo = if pos > radius { pos - radius } else { 0 };
        let hi = (pos + radius).min(s2.len() as isize);
        if hi <= lo {
            continue;
        }

        for j in lo as usize..hi as usize {
            if !flag2[j] && s2[j] == c {
                flag1[i] = true;
                flag2[j] = true;
                n_common += 1;
                break;
            }
        }
    }

    n_common
}

/// Half the number of flagged positions whose characters disagree when the
/// common characters of both strings are read in order.
fn count_transpositions(s1: &[char], s2: &[char], flag1: &[bool], flag2: &[bool]) -> usize {
    let common2 = s2.iter().zip(flag2).filter(|(_, &f)| f).map(|(c, _)| c);
    let common1 = s1.iter().zip(flag1).filter(|(_, &f)| f).map(|(c, _)| c);

    common1.zip(common2).filter(|(a, b)| a != b).count() / 2
}

/// Count unmatched characters of `s1` that have a similar unmatched
/// character somewhere in `s2`.
fn count_similar(s1: &[char], s2: &[char], flag1: &[bool], flag2: &[bool]) -> usize {
    s1.iter()
        .zip(flag1)
        .filter(|(_, &f)| !f)
        .filter(|(&a, _)| {
            s2.iter()
                .zip(flag2)
                .any(|(&b, &f)| !f && is_similar(a, b))
        })
        .count()
}

#[inline]
fn is_similar(a: char, b: char) -> bool {
    SIMILAR_PAIRS
        .iter()
        .any(|&(x, y)| (x == a && y == b) || (x == b && y == a))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    fn common(a: &str, b: &str) -> (usize, Vec<bool>, Vec<bool>) {
        let (s1, s2) = (chars(a), chars(b));
        let mut flag1 = vec![false; s1.len()];
        let mut flag2 = vec![false; s2.len()];
        let n = count_common(&s1, &s2, &mut flag1, &mut flag2, s1.len().max(s2.len()));
        (n, flag1, flag2)
    }

    fn transpositions(a: &str, b: &str) -> usize {
        let (s1, s2) = (chars(a), chars(b));
        let (_, flag1, flag2) = common(a, b);
        count_transpositions(&s1, &s2, &flag1, &flag2)
    }

    #[test]
    fn test_count_common() {
        let (n, flag1, flag2) = common("SHACKLEFORD", "SHACKELFORD");
        assert_eq!(n, 11);
        assert!(flag1.iter().all(|&f| f));
        assert!(flag2.iter().all(|&f| f));

        let (n, flag1, flag2) = common("DUNNINGHAM", "CUNNINGHAM");
        assert_eq!(n, 9);
        assert!(!flag1[0] && !flag2[0]);

        let (n, flag1, flag2) = common("NICHLESON", "NICHULSON");
        assert_eq!(n, 8);
        assert_eq!(flag1, vec![true, true, true, true, true, false, true, true, true]);
        assert_eq!(flag2, vec![true, true, true, true, false, true, true, true, true]);

        let (n, flag1, flag2) = common("JONES", "JOHNSON");
        assert_eq!(n, 4);
        assert_eq!(flag1, vec![true, true, true, false, true]);
        assert_eq!(flag2, vec![true, true, false, true, true, false, false]);

        let (n, flag1, flag2) = common("MASSEY", "MASSIE");
        assert_eq!(n, 5);
        assert_eq!(flag1, vec![true, true, true, true, true, false]);
        assert_eq!(flag2, vec![true, true, true, true, false, true]);

        let (n, flag1, flag2) = common("abroms", "abrams");
        assert_eq!(n, 5);
        assert_eq!(flag1, vec![true, true, true, false, true, true]);
        assert_eq!(flag2, vec![true, true, true, false, true, true]);

        let (n, flag1, flag2) = common("hardin", "martinez");
        assert_eq!(n, 4);
        assert_eq!(flag1, vec![false, true, true, false, true, true]);
        assert_eq!(flag2, vec![false, true, true, false, true, true, false, false]);

        let (n, flag1, flag2) = common("itman", "smith");
        assert_eq!(n, 1);
        assert_eq!(flag1, vec![false, false, true, false, false]);
        assert_eq!(flag2, vec![false, true, false, false, false]);
    }

    #[test]
    fn test_search_window_excludes_upper_bound() {
        // radius 1: the O of JOHN only sees J and H
        let (n, flag1, flag2) = common("JOHN", "JHON");
        assert_eq!(n, 3);
        assert_eq!(flag1, vec![true, false, true, true]);
        assert_eq!(flag2, vec![true, true, false, true]);
        assert_eq!(transpositions("JOHN", "JHON"), 0);

        let score = similarity("john", "jhon", Adjustments::default());
        assert!((score - 0.85).abs() < 1e-9, "score = {}", score);

        // radius 0 and below leaves nothing to search
        assert_eq!(common("AB", "AB").0, 0);
        assert_eq!(common("A", "A").0, 0);
        assert_eq!(similarity("AB", "AB", Adjustments::default()), 0.0);
    }

    #[test]
    fn test_count_transpositions() {
        assert_eq!(transpositions("SHACKLEFORD", "SHACKELFORD"), 1);
        assert_eq!(transpositions("DUNNINGHAM", "CUNNINGHAM"), 0);
        assert_eq!(transpositions("NICHLESON", "NICHULSON"), 0);
        assert_eq!(transpositions("BERTOIN", "EBERT"), 1);
    }

    #[test]
    fn test_count_similar() {
        let (s1, s2) = (chars("MASSEY"), chars("MASSIE"));
        let (_, flag1, flag2) = common("MASSEY", "MASSIE");
        // the unmatched Y pairs with the unmatched I
        assert_eq!(count_similar(&s1, &s2, &flag1, &flag2), 1);
        assert!(is_similar('Y', 'I'));
        assert!(is_similar('I', 'Y'));
        assert!(!is_similar('A', 'B'));

        let similar = |a: &str, b: &str| {
            let (s1, s2) = (chars(a), chars(b));
            let (_, flag1, flag2) = common(a, b);
            count_similar(&s1, &s2, &flag1, &flag2)
        };
        assert_eq!(similar("JONES", "J0HNSON"), 2);
        assert_eq!(similar("MASSEY", "MOSSIE"), 2);
        assert_eq!(similar("EBROM5", "ABRAMS"), 3);
    }

    #[test]
    fn test_reference_pair() {
        let jaro = similarity("shackleford", "shackelford", Adjustments::none());
        assert!((jaro - 32.0 / 33.0).abs() < 1e-9, "jaro = {}", jaro);

        let full = similarity("shackleford", "shackelford", Adjustments::default());
        assert!((full - 0.988636).abs() < 1e-5, "full = {}", full);
    }

    #[test]
    fn test_identical_and_disjoint() {
        assert!((similarity("SMITH", "smith ", Adjustments::none()) - 1.0).abs() < 1e-12);
        assert_eq!(similarity("ABC", "XYZ", Adjustments::default()), 0.0);
        assert_eq!(similarity("", "XYZ", Adjustments::default()), 0.0);
        assert_eq!(similarity("  ", "  ", Adjustments::default()), 0.0);
    }

    #[test]
    fn test_prefix_boost_is_monotonic() {
        // Swapping positions p and p+1 keeps the Jaro part fixed while the
        // shared prefix grows with p.
        let base = "ABCDEFGH";
        let scores: Vec<f64> = (0..=4)
            .map(|p| {
                let mut s: Vec<char> = base.chars().collect();
                s.swap(p, p + 1);
                let other: String = s.into_iter().collect();
                similarity(base, &other, Adjustments::default())
            })
            .collect();

        for pair in scores.windows(2) {
            assert!(pair[1] > pair[0], "scores not increasing: {:?}", scores);
        }

        let prefix_only = Adjustments { winkler_prefix: true, ..Adjustments::none() };
        let no_prefix = similarity(base, "BACDEFGH", prefix_only);
        let four = similarity(base, "ABCDFEGH", prefix_only);
        assert!(four > no_prefix);
    }

    #[test]
    fn test_similar_characters_raise_score() {
        let plain = similarity("MASSEY", "MASSIE", Adjustments::none());
        let adjusted = similarity(
            "MASSEY",
            "MASSIE",
            Adjustments { similar_characters: true, ..Adjustments::none() },
        );
        assert!(adjusted > plain);
    }
}

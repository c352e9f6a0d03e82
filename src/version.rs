//! Comparable version strings
//!
//! Versions in the registry are opaque strings such as `2.3.1.Final`,
//! `1.0.0.CR1` or `999-SNAPSHOT`. They are ordered by splitting them into
//! items on `.` and `-` and on every digit/letter boundary, then comparing
//! item by item. A missing item on either side is padded with `0`, so `1`,
//! `1.0` and `1-0` order next to each other.
//!
//! Every item belongs to one fixed scale, lowest first:
//!
//! 1. pre-release qualifiers: `alpha < beta < milestone < rc (= cr) < snapshot`
//! 2. `0`, the empty qualifier and the padding
//! 3. release qualifiers: `ga < final < release < sp`, then unknown
//!    qualifiers lexically
//! 4. positive numbers, numerically
//!
//! Qualifiers compare case-insensitively. Because the padding is a fixed
//! point of that scale, the order is total: `1.0-alpha1 < 1.0 < 1.0.Final <
//! 1.0-redhat < 1.0.1`.
//!
//! Equality stays string identity: `1.0` and `1` order next to each other but
//! are different versions, the raw string breaking the tie.

use std::cmp::Ordering;
use std::convert::Infallible;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A core framework version. Same ordering as any other release version.
pub type CoreVersion = Version;

/// One comparable item. Variant order is the scale described above.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum Item {
    PreRelease(u8),
    Zero,
    /// Known release qualifiers rank below unknown ones, which keep their text
    Release(u8, String),
    /// Digit count first, then the digits, leading zeros stripped
    Number(usize, String),
}

static PADDING: Item = Item::Zero;

impl Item {
    fn number(digits: &str) -> Self {
        let trimmed = digits.trim_start_matches('0');
        if trimmed.is_empty() {
            Item::Zero
        } else {
            Item::Number(trimmed.len(), trimmed.to_string())
        }
    }

    fn qualifier(text: &str) -> Self {
        let lower = text.to_ascii_lowercase();
        match lower.as_str() {
            "alpha" => Item::PreRelease(0),
            "beta" => Item::PreRelease(1),
            "milestone" => Item::PreRelease(2),
            "rc" | "cr" => Item::PreRelease(3),
            "snapshot" => Item::PreRelease(4),
            "" => Item::Zero,
            "ga" => Item::Release(0, String::new()),
            "final" => Item::Release(1, String::new()),
            "release" => Item::Release(2, String::new()),
            "sp" => Item::Release(3, String::new()),
            _ => Item::Release(4, lower),
        }
    }
}

fn parse_items(raw: &str) -> Vec<Item> {
    let mut items = Vec::new();
    for token in raw.split(['.', '-']) {
        if token.is_empty() {
            items.push(Item::Zero);
            continue;
        }
        let mut start = 0;
        let bytes = token.as_bytes();
        for i in 1..=bytes.len() {
            let boundary = i == bytes.len()
                || bytes[i].is_ascii_digit() != bytes[i - 1].is_ascii_digit();
            if boundary {
                let part = &token[start..i];
                if part.as_bytes()[0].is_ascii_digit() {
                    items.push(Item::number(part));
                } else {
                    items.push(Item::qualifier(part));
                }
                start = i;
            }
        }
    }
    items
}

/// A version string with a numeric-aware total order
#[derive(Clone)]
pub struct Version {
    raw: String,
    items: Vec<Item>,
}

impl Version {
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let items = parse_items(&raw);
        Self { raw, items }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Whether this version carries the `-SNAPSHOT` suffix
    pub fn is_snapshot(&self) -> bool {
        self.raw.ends_with("-SNAPSHOT")
    }

    fn compare_segments(&self, other: &Self) -> Ordering {
        let len = self.items.len().max(other.items.len());
        (0..len)
            .map(|i| {
                let a = self.items.get(i).unwrap_or(&PADDING);
                let b = other.items.get(i).unwrap_or(&PADDING);
                a.cmp(b)
            })
            .find(|ord| ord.is_ne())
            .unwrap_or(Ordering::Equal)
    }
}

impl fmt::Debug for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Version({:?})", self.raw)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for Version {}

impl Hash for Version {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.compare_segments(other)
            .then_with(|| self.raw.cmp(&other.raw))
    }
}

impl FromStr for Version {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl From<&str> for Version {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Version {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Version::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        Version::new(s)
    }

    #[test]
    fn test_numeric_segments() {
        assert!(v("1.10") > v("1.9"));
        assert!(v("2.0") > v("1.99.99"));
        assert!(v("1.0.01") < v("1.0.2"));
        assert!(v("999-SNAPSHOT") > v("2.3.1.Final"));
    }

    #[test]
    fn test_qualifier_precedence() {
        let ordered = [
            "1.0-alpha1",
            "1.0-beta1",
            "1.0-rc1",
            "1.0",
            "1.0.ga",
            "1.0.Final",
        ];
        for pair in ordered.windows(2) {
            assert!(v(pair[0]) < v(pair[1]), "{} < {}", pair[0], pair[1]);
        }
        assert!(v("1.0.0.CR1") < v("1.0.0.Final"));
        assert!(v("1.0-SNAPSHOT") < v("1.0"));
        assert!(v("1.0-ALPHA1") < v("1.0-beta1"));
    }

    #[test]
    fn test_number_beats_qualifier() {
        assert!(v("1.0.1") > v("1.0.Final"));
        assert!(v("1.1") > v("1.0-zzz"));
    }

    #[test]
    fn test_mixed_separators() {
        assert!(v("2.0-redhat") > v("2.0"));
        assert!(v("2.0.0.Alpha1") < v("2.0"));
        assert!(v("2.0.0.Alpha1") < v("2.0-redhat"));
        assert!(v("1.0.Final") > v("1.0-CR2"));
        assert!(v("1.0-1") > v("1.0.Final"));
        assert!(v("1.0-SNAPSHOT") < v("1.0.0.Final"));
        assert!(v("1.0.sp1") < v("1.0.1"));
        assert_eq!(v("1-0").compare_segments(&v("1.0.0")), Ordering::Equal);
    }

    #[test]
    fn test_order_is_total() {
        let versions: Vec<Version> = [
            "2.0",
            "2",
            "2.0.0",
            "2.0-redhat",
            "2.0-redhat-00001",
            "2.0.0.Alpha1",
            "2.0.0.CR1",
            "2.0.Final",
            "2.0.0.Final",
            "2.0-SNAPSHOT",
            "2.0.1",
            "2.0-1",
            "2.0.ga",
            "2.0.sp2",
            "2-beta",
            "2.0.x",
            "999-SNAPSHOT",
        ]
        .into_iter()
        .map(v)
        .collect();

        for a in &versions {
            assert_eq!(a.cmp(a), Ordering::Equal);
            for b in &versions {
                assert_eq!(a.cmp(b), b.cmp(a).reverse(), "{} vs {}", a, b);
                for c in &versions {
                    if a < b && b < c {
                        assert!(a < c, "{} < {} < {} but not {} < {}", a, b, c, a, c);
                    }
                }
            }
        }

        let mut sorted = versions.clone();
        sorted.sort();
        assert!(sorted.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_equality_is_string_identity() {
        assert_ne!(v("1.0"), v("1"));
        assert_ne!(v("1.0"), v("1.0.0"));
        assert_eq!(v("1.0.Final"), v("1.0.Final"));

        let mut set = std::collections::BTreeSet::new();
        set.insert(v("1"));
        set.insert(v("1.0"));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_serde_as_string() {
        let version: Version = serde_json::from_str("\"2.0.0.Final\"").unwrap();
        assert_eq!(version.as_str(), "2.0.0.Final");
        assert_eq!(serde_json::to_string(&version).unwrap(), "\"2.0.0.Final\"");
    }
}

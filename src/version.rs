//! Dotted numeric product versions (`6.10`, `6.10.0`, `sat-6.9.z`).

use std::cmp::Ordering;
use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A dotted numeric version. Trailing zero components are insignificant,
/// so `6.10` and `6.10.0` compare equal.
#[derive(Debug, Clone)]
pub struct Version {
    parts: Vec<u64>,
}

fn strict_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\d+(\.\d+)*$").expect("valid version regex"))
}

fn embedded_pattern() -> &'static Regex {
    // `sat-6.2.x`, `sat-6.2.0`, `6.2.9`, `Satellite 6.15.0`
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?:sat-)?(?P<version>\d+\.\d+(?:\.\d+)*)").expect("valid version regex")
    })
}

impl Version {
    /// The `0` version, lower than any released version.
    #[must_use]
    pub fn zero() -> Self {
        Self { parts: vec![0] }
    }

    /// Parses a string that is exactly a dotted numeric version.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if !strict_pattern().is_match(text) {
            return None;
        }
        let parts = text.split('.').map(str::parse).collect::<Result<Vec<u64>, _>>().ok()?;
        Some(Self { parts })
    }

    /// Finds the first `major.minor[.patch...]` version embedded in `text`.
    #[must_use]
    pub fn extract(text: &str) -> Option<Self> {
        let caps = embedded_pattern().captures(text)?;
        Self::parse(&caps["version"])
    }

    fn component(&self, idx: usize) -> u64 {
        self.parts.get(idx).copied().unwrap_or(0)
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.parts.len().max(other.parts.len());
        (0..len)
            .map(|i| self.component(i).cmp(&other.component(i)))
            .find(|o| o.is_ne())
            .unwrap_or(Ordering::Equal)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = self.parts.iter().map(u64::to_string).collect::<Vec<_>>().join(".");
        f.write_str(&text)
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::extract(&text)
            .ok_or_else(|| serde::de::Error::custom(format!("not a version: {text:?}")))
    }
}

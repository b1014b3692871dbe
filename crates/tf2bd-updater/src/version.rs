use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::errors::UpdateError;

/// Application version: `major.minor.patch` with an optional fourth build number.
#[derive(Debug, Clone, Copy)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
    pub build: Option<u32>,
}

impl Version {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
            build: None,
        }
    }

    pub const fn with_build(major: u32, minor: u32, patch: u32, build: u32) -> Self {
        Self {
            major,
            minor,
            patch,
            build: Some(build),
        }
    }

    /// Parse "1.2.3", "v1.2.3" or "1.2.3.4". Missing trailing parts are zero.
    pub fn parse(s: &str) -> Result<Self, UpdateError> {
        let invalid = |reason: String| UpdateError::Version {
            input: s.to_string(),
            reason,
        };

        let trimmed = s.trim();
        let trimmed = trimmed.strip_prefix(['v', 'V']).unwrap_or(trimmed);
        if trimmed.is_empty() {
            return Err(invalid("empty".into()));
        }

        let parts: Vec<&str> = trimmed.split('.').collect();
        if parts.len() > 4 {
            return Err(invalid(format!("expected at most 4 parts, got {}", parts.len())));
        }

        let mut nums = [0u32; 4];
        for (i, part) in parts.iter().enumerate() {
            nums[i] = part
                .parse()
                .map_err(|_| invalid(format!("part {} ({part:?}) is not a number", i + 1)))?;
        }

        Ok(Self {
            major: nums[0],
            minor: nums[1],
            patch: nums[2],
            build: (parts.len() == 4).then_some(nums[3]),
        })
    }

    fn key(&self) -> (u32, u32, u32, u32) {
        (self.major, self.minor, self.patch, self.build.unwrap_or(0))
    }
}

impl FromStr for Version {
    type Err = UpdateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some(build) = self.build {
            write!(f, ".{build}")?;
        }
        Ok(())
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
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
        self.key().cmp(&other.key())
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Version::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_three_and_four_part_versions() {
        assert_eq!(Version::parse("1.2.3").unwrap(), Version::new(1, 2, 3));
        assert_eq!(Version::parse("v1.2.3").unwrap(), Version::new(1, 2, 3));
        assert_eq!(
            Version::parse("1.2.3.456").unwrap(),
            Version::with_build(1, 2, 3, 456)
        );
        assert_eq!(Version::parse("2").unwrap(), Version::new(2, 0, 0));
    }

    #[test]
    fn rejects_garbage() {
        assert!(Version::parse("").is_err());
        assert!(Version::parse("1.x.3").is_err());
        assert!(Version::parse("1.2.3.4.5").is_err());
        assert!(Version::parse("1..2").is_err());
    }

    #[test]
    fn missing_build_compares_as_zero() {
        assert_eq!(Version::new(1, 2, 3), Version::with_build(1, 2, 3, 0));
        assert!(Version::with_build(1, 2, 3, 1) > Version::new(1, 2, 3));
    }

    #[test]
    fn ordering_is_total() {
        let versions = [
            Version::new(0, 0, 1),
            Version::new(0, 1, 0),
            Version::with_build(0, 1, 0, 7),
            Version::new(1, 0, 0),
            Version::new(1, 5, 0),
            Version::new(2, 0, 0),
        ];
        for pair in versions.windows(2) {
            assert!(pair[0] < pair[1], "{} should be < {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn display_round_trips_part_count() {
        assert_eq!(Version::parse("2.0.0").unwrap().to_string(), "2.0.0");
        assert_eq!(Version::parse("1.2.0.345").unwrap().to_string(), "1.2.0.345");
    }

    #[test]
    fn deserializes_from_json_string() {
        let v: Version = serde_json::from_str("\"1.4.2\"").unwrap();
        assert_eq!(v, Version::new(1, 4, 2));
        assert!(serde_json::from_str::<Version>("\"one\"").is_err());
    }
}

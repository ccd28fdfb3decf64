//! Version model: lenient semantic versions and range constraints.
//!
//! Component versions are "semver-like": `1`, `1.2`, `1.2.3`, `v2.0.1-rc.1`
//! are all accepted, with missing components read as zero. Ordering and
//! equality follow semantic versioning via the [`semver`] crate.
//!
//! A [`VersionConstraint`] is a conjunction of comparison clauses separated
//! by commas, e.g. `>=1.0,<2.0`. Supported operators are `>=`, `<=`, `>`,
//! `<`, `==` and `=`; a clause with no operator means `==`.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// A parsed component version.
///
/// Keeps the text it was parsed from for display, while comparisons use the
/// normalized semantic version (so `1.0` equals `1.0.0`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Version {
    raw: String,
    semver: semver::Version,
}

impl Version {
    /// Parses a version string.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidVersion`] for empty input, more than three
    /// numeric components, non-numeric components or a malformed
    /// pre-release / build suffix.
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        let invalid = |reason: &str| Error::InvalidVersion {
            input: input.to_string(),
            reason: reason.to_string(),
        };

        let body = trimmed
            .strip_prefix('v')
            .or_else(|| trimmed.strip_prefix('V'))
            .unwrap_or(trimmed);
        if body.is_empty() {
            return Err(invalid("empty version"));
        }

        let split_at = body.find(['-', '+']).unwrap_or(body.len());
        let (core, suffix) = body.split_at(split_at);

        let parts: Vec<&str> = core.split('.').collect();
        if parts.len() > 3 {
            return Err(invalid("at most three numeric components are allowed"));
        }
        let mut numbers = [0u64; 3];
        for (slot, part) in numbers.iter_mut().zip(&parts) {
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid("components must be non-negative integers"));
            }
            *slot = part
                .parse()
                .map_err(|_| invalid("numeric component out of range"))?;
        }

        let normalized = format!("{}.{}.{}{}", numbers[0], numbers[1], numbers[2], suffix);
        let semver = semver::Version::parse(&normalized).map_err(|e| invalid(&e.to_string()))?;

        Ok(Self {
            raw: trimmed.to_string(),
            semver,
        })
    }

    /// Major component.
    #[must_use]
    pub fn major(&self) -> u64 {
        self.semver.major
    }

    /// Minor component.
    #[must_use]
    pub fn minor(&self) -> u64 {
        self.semver.minor
    }

    /// Patch component.
    #[must_use]
    pub fn patch(&self) -> u64 {
        self.semver.patch
    }

    /// The normalized semantic version.
    #[must_use]
    pub fn as_semver(&self) -> &semver::Version {
        &self.semver
    }

    /// The text this version was parsed from.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Returns true if moving between `self` and `other` changes the part of
    /// the version that signals incompatible API changes: the major number,
    /// or the minor number while major is still `0`.
    #[must_use]
    pub fn is_breaking_change_from(&self, other: &Version) -> bool {
        if self.major() != other.major() {
            return true;
        }
        self.major() == 0 && self.minor() != other.minor()
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.semver == other.semver
    }
}

impl Eq for Version {}

impl Hash for Version {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.semver.hash(state);
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.semver.cmp(&other.semver)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for Version {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Version {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<Version> for String {
    fn from(version: Version) -> Self {
        version.raw
    }
}

/// Comparison operator of a single constraint clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    /// `>=`
    GreaterEq,
    /// `<=`
    LessEq,
    /// `>`
    Greater,
    /// `<`
    Less,
    /// `==` (or `=`, or no operator)
    Exact,
}

impl Op {
    fn symbol(self) -> &'static str {
        match self {
            Self::GreaterEq => ">=",
            Self::LessEq => "<=",
            Self::Greater => ">",
            Self::Less => "<",
            Self::Exact => "==",
        }
    }

    /// Splits a clause into operator and version text.
    fn split(clause: &str) -> (Self, &str) {
        // Two-character operators must be tried before their prefixes.
        const OPERATORS: [(&str, Op); 6] = [
            (">=", Op::GreaterEq),
            ("<=", Op::LessEq),
            ("==", Op::Exact),
            (">", Op::Greater),
            ("<", Op::Less),
            ("=", Op::Exact),
        ];
        OPERATORS
            .iter()
            .find_map(|(symbol, op)| clause.strip_prefix(symbol).map(|rest| (*op, rest)))
            .unwrap_or((Op::Exact, clause))
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// One `op version` term of a constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clause {
    /// The comparison operator.
    pub op: Op,
    /// The version compared against.
    pub version: Version,
}

impl Clause {
    /// Returns true if `version` satisfies this clause.
    #[must_use]
    pub fn matches(&self, version: &Version) -> bool {
        let ordering = version.cmp(&self.version);
        match self.op {
            Op::GreaterEq => ordering != Ordering::Less,
            Op::LessEq => ordering != Ordering::Greater,
            Op::Greater => ordering == Ordering::Greater,
            Op::Less => ordering == Ordering::Less,
            Op::Exact => ordering == Ordering::Equal,
        }
    }
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.op, self.version)
    }
}

/// A conjunction of version clauses, e.g. `>=1.0,<2.0`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VersionConstraint {
    raw: String,
    clauses: Vec<Clause>,
}

impl VersionConstraint {
    /// Parses a constraint expression.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConstraint`] for an empty expression, an empty
    /// clause (e.g. a trailing comma) or a clause whose version doesn't parse.
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        let invalid = |reason: String| Error::InvalidConstraint {
            input: input.to_string(),
            reason,
        };

        if trimmed.is_empty() {
            return Err(invalid("empty constraint".to_string()));
        }

        let mut clauses = Vec::new();
        for part in trimmed.split(',') {
            let part = part.trim();
            if part.is_empty() {
                return Err(invalid("empty clause".to_string()));
            }
            let (op, rest) = Op::split(part);
            let version = Version::parse(rest.trim()).map_err(|e| invalid(e.to_string()))?;
            clauses.push(Clause { op, version });
        }

        Ok(Self {
            raw: trimmed.to_string(),
            clauses,
        })
    }

    /// Returns true if `version` satisfies every clause.
    #[must_use]
    pub fn matches(&self, version: &Version) -> bool {
        self.clauses.iter().all(|clause| clause.matches(version))
    }

    /// The parsed clauses, in source order.
    #[must_use]
    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    /// The text this constraint was parsed from.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl PartialEq for VersionConstraint {
    fn eq(&self, other: &Self) -> bool {
        self.clauses == other.clauses
    }
}

impl Eq for VersionConstraint {}

impl fmt::Display for VersionConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for VersionConstraint {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for VersionConstraint {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<VersionConstraint> for String {
    fn from(constraint: VersionConstraint) -> Self {
        constraint.raw
    }
}

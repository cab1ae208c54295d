//! Semantic-version model used for constraint checks.
//!
//! Parsing is permissive about missing minor/patch components (`1.2` is
//! `1.2.0`) and an optional leading `v`. Build metadata is carried along
//! for display but never takes part in ordering.

use crate::error::{Result, StackmatchError};
use regex::Regex;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

static VERSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^v?(\d+)(?:\.(\d+))?(?:\.(\d+))?(?:-([0-9A-Za-z\-.]+))?(?:\+([0-9A-Za-z\-.]+))?$",
    )
    .expect("Invalid regex pattern")
});

static NUMERIC_RUN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(?:\.\d+){0,2}").expect("Invalid regex pattern"));

/// Comparison operators recognised at the start of a constraint. Two-character
/// operators come first so `>=` is never read as `>`.
const OPERATORS: [&str; 6] = [">=", "<=", "!=", ">", "<", "="];

#[derive(Debug, Clone)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub pre_release: String,
    pub build: String,
}

impl Version {
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            pre_release: String::new(),
            build: String::new(),
        }
    }

    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        let caps = VERSION_RE
            .captures(input)
            .ok_or_else(|| StackmatchError::InvalidVersion(input.to_string()))?;

        let component = |idx: usize| -> Result<u64> {
            match caps.get(idx) {
                Some(m) => m
                    .as_str()
                    .parse::<u64>()
                    .map_err(|_| StackmatchError::InvalidVersion(input.to_string())),
                None => Ok(0),
            }
        };
        let text = |idx: usize| {
            caps.get(idx)
                .map(|m| m.as_str().to_string())
                .unwrap_or_default()
        };

        Ok(Self {
            major: component(1)?,
            minor: component(2)?,
            patch: component(3)?,
            pre_release: text(4),
            build: text(5),
        })
    }

    /// Parse native distro versions such as `1:2.34.1-1ubuntu1` or
    /// `3.12.1-2.fc39`. Tries the strict grammar first, then drops an epoch and
    /// takes the first dotted numeric run.
    pub fn parse_lenient(input: &str) -> Result<Self> {
        if let Ok(version) = Self::parse(input) {
            return Ok(version);
        }

        let trimmed = input.trim();
        let without_epoch = match trimmed.split_once(':') {
            Some((epoch, rest)) if !epoch.is_empty() && epoch.chars().all(|c| c.is_ascii_digit()) => {
                rest
            }
            _ => trimmed,
        };

        NUMERIC_RUN_RE
            .find(without_epoch)
            .ok_or_else(|| StackmatchError::InvalidVersion(input.to_string()))
            .and_then(|m| Self::parse(m.as_str()))
    }

    /// Check this version against a constraint expression.
    ///
    /// Accepted forms: empty or `*` (anything), an operator followed by a
    /// version (`>=1.2`, `!=2.0.0`), an inclusive range `A - B`, wildcard
    /// patterns (`1.x`, `1.2.*`, `1.2.3-*`), or a bare exact version.
    pub fn satisfies(&self, constraint: &str) -> Result<bool> {
        let constraint = constraint.trim();
        if constraint.is_empty() || constraint == "*" {
            return Ok(true);
        }

        for op in OPERATORS {
            if let Some(rest) = constraint.strip_prefix(op) {
                let target = parse_constraint_version(constraint, rest.trim())?;
                let ord = self.cmp(&target);
                return Ok(match op {
                    ">=" => ord != Ordering::Less,
                    "<=" => ord != Ordering::Greater,
                    "!=" => ord != Ordering::Equal,
                    ">" => ord == Ordering::Greater,
                    "<" => ord == Ordering::Less,
                    _ => ord == Ordering::Equal,
                });
            }
        }

        if let Some((low, high)) = constraint.split_once(" - ") {
            let low = parse_constraint_version(constraint, low.trim())?;
            let high = parse_constraint_version(constraint, high.trim())?;
            return Ok(*self >= low && *self <= high);
        }

        if constraint.contains(['x', 'X', '*']) {
            return self.matches_wildcard(constraint);
        }

        let target = parse_constraint_version(constraint, constraint)?;
        Ok(*self == target)
    }

    fn matches_wildcard(&self, pattern: &str) -> Result<bool> {
        if matches!(pattern, "*" | "x" | "X") {
            return Ok(true);
        }

        let rendered = self.to_string();
        if let Some(prefix) = pattern
            .strip_suffix(".x")
            .or_else(|| pattern.strip_suffix(".X"))
        {
            return Ok(rendered.starts_with(&format!("{}.", prefix)));
        }
        if let Some(prefix) = pattern.strip_suffix("-*") {
            return Ok(rendered.starts_with(prefix));
        }

        let mut expr = String::from("^");
        for ch in pattern.chars() {
            match ch {
                'x' | 'X' => expr.push_str("[0-9]+"),
                '*' => expr.push_str(".*"),
                other => expr.push_str(&regex::escape(&other.to_string())),
            }
        }
        expr.push('$');

        let re = Regex::new(&expr).map_err(|e| StackmatchError::InvalidConstraint {
            constraint: pattern.to_string(),
            reason: e.to_string(),
        })?;

        let mut comparable = format!("{}.{}.{}", self.major, self.minor, self.patch);
        if !self.pre_release.is_empty() {
            comparable.push('-');
            comparable.push_str(&self.pre_release);
        }
        Ok(re.is_match(&comparable))
    }
}

fn parse_constraint_version(constraint: &str, text: &str) -> Result<Version> {
    Version::parse(text).map_err(|_| StackmatchError::InvalidConstraint {
        constraint: constraint.to_string(),
        reason: format!("'{}' is not a valid version", text),
    })
}

/// True for constraints that accept any version.
pub fn is_unconstrained(constraint: &str) -> bool {
    matches!(constraint.trim(), "" | "*")
}

/// Reject malformed constraints up front, independent of any version.
pub fn validate_constraint(constraint: &str) -> Result<()> {
    Version::new(0, 0, 0).satisfies(constraint).map(|_| ())
}

/// Three-way comparison ignoring build metadata.
pub fn compare(a: &Version, b: &Version) -> Ordering {
    a.cmp(b)
}

/// Cheap syntactic check: exactly three dot-separated components, each
/// numeric or a wildcard, after an optional `v` and before any `-`/`+` suffix.
pub fn is_valid(input: &str) -> bool {
    let body = input.strip_prefix('v').unwrap_or(input);
    let core = body.split(['-', '+']).next().unwrap_or_default();
    let parts: Vec<&str> = core.split('.').collect();

    parts.len() == 3
        && parts.iter().all(|part| {
            matches!(*part, "x" | "X" | "*")
                || (!part.is_empty() && part.chars().all(|c| c.is_ascii_digit()))
        })
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch)
            .cmp(&(other.major, other.minor, other.patch))
            .then_with(|| {
                match (self.pre_release.is_empty(), other.pre_release.is_empty()) {
                    (true, true) => Ordering::Equal,
                    (true, false) => Ordering::Greater,
                    (false, true) => Ordering::Less,
                    // Plain byte order, so "rc.10" sorts before "rc.2".
                    (false, false) => self.pre_release.cmp(&other.pre_release),
                }
            })
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if !self.pre_release.is_empty() {
            write!(f, "-{}", self.pre_release)?;
        }
        if !self.build.is_empty() {
            write!(f, "+{}", self.build)?;
        }
        Ok(())
    }
}

impl FromStr for Version {
    type Err = StackmatchError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

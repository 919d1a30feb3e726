//! Version policy: maps a surface diff onto the next version number.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SurfaceError};

/// Which version component a change calls for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BumpKind {
    Patch,
    Minor,
    Major,
}

impl BumpKind {
    /// Removals break consumers, additions extend them, anything else is a fix.
    pub fn from_changes(has_added: bool, has_removed: bool) -> Self {
        if has_removed {
            BumpKind::Major
        } else if has_added {
            BumpKind::Minor
        } else {
            BumpKind::Patch
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BumpKind::Major => "major",
            BumpKind::Minor => "minor",
            BumpKind::Patch => "patch",
        }
    }
}

/// A `major.minor.patch[-pre][+build]` version.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build: Option<String>,
}

impl Version {
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            pre: None,
            build: None,
        }
    }

    /// Next version for the given bump. Qualifiers are carried through.
    ///
    /// Fails when the bumped component is already `u64::MAX`.
    pub fn bump(&self, kind: BumpKind) -> Result<Self> {
        let next = |component: u64| {
            component
                .checked_add(1)
                .ok_or_else(|| SurfaceError::InvalidVersion(self.to_string()))
        };
        let (major, minor, patch) = match kind {
            BumpKind::Major => (next(self.major)?, 0, 0),
            BumpKind::Minor => (self.major, next(self.minor)?, 0),
            BumpKind::Patch => (self.major, self.minor, next(self.patch)?),
        };
        Ok(Self {
            major,
            minor,
            patch,
            pre: self.pre.clone(),
            build: self.build.clone(),
        })
    }

    /// The numeric triple, ignoring qualifiers.
    pub fn triple(&self) -> (u64, u64, u64) {
        (self.major, self.minor, self.patch)
    }

    /// Numeric part only, as written into version stamps.
    pub fn numeric(&self) -> String {
        format!("{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Decide the next version from the added and removed token sets.
pub fn decide(
    added: &BTreeSet<String>,
    removed: &BTreeSet<String>,
    current: &Version,
) -> Result<Version> {
    current.bump(BumpKind::from_changes(!added.is_empty(), !removed.is_empty()))
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some(pre) = &self.pre {
            write!(f, "-{}", pre)?;
        }
        if let Some(build) = &self.build {
            write!(f, "+{}", build)?;
        }
        Ok(())
    }
}

impl FromStr for Version {
    type Err = SurfaceError;

    /// Accepts two to four numeric components; a fourth (revision) component
    /// is dropped.
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || SurfaceError::InvalidVersion(s.to_string());
        let text = s.trim();

        let (rest, build) = match text.split_once('+') {
            Some((rest, build)) if !build.is_empty() => (rest, Some(build.to_string())),
            Some(_) => return Err(invalid()),
            None => (text, None),
        };
        let (core, pre) = match rest.split_once('-') {
            Some((core, pre)) if !pre.is_empty() => (core, Some(pre.to_string())),
            Some(_) => return Err(invalid()),
            None => (rest, None),
        };

        let parts = core
            .split('.')
            .map(|p| p.parse::<u64>().map_err(|_| invalid()))
            .collect::<Result<Vec<_>>>()?;
        let (major, minor, patch) = match parts.as_slice() {
            [major, minor] => (*major, *minor, 0),
            [major, minor, patch] | [major, minor, patch, _] => (*major, *minor, *patch),
            _ => return Err(invalid()),
        };

        Ok(Self {
            major,
            minor,
            patch,
            pre,
            build,
        })
    }
}

//! Error-group lifecycle status.
//!
//! Status is never stored. It is computed from two nullable timestamps:
//!
//! | `resolved_at` | `muted_at` | status     |
//! |---------------|------------|------------|
//! | set           | any        | `resolved` |
//! | null          | set        | `muted`    |
//! | null          | null       | `open`     |

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupStatus {
    Open,
    Resolved,
    Muted,
}

impl GroupStatus {
    /// Derive the status from the lifecycle timestamps.
    #[must_use]
    pub fn derive<R, M>(resolved_at: Option<R>, muted_at: Option<M>) -> Self {
        match (resolved_at.is_some(), muted_at.is_some()) {
            (true, _) => Self::Resolved,
            (false, true) => Self::Muted,
            (false, false) => Self::Open,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Resolved => "resolved",
            Self::Muted => "muted",
        }
    }
}

impl fmt::Display for GroupStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status selector for group listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    #[default]
    Open,
    Resolved,
    Muted,
    All,
}

impl StatusFilter {
    /// SQL predicate over the `g` alias, or `None` for [`StatusFilter::All`].
    #[must_use]
    pub const fn predicate(self) -> Option<&'static str> {
        match self {
            Self::Open => Some("g.resolved_at IS NULL AND g.muted_at IS NULL"),
            Self::Resolved => Some("g.resolved_at IS NOT NULL"),
            Self::Muted => Some("g.muted_at IS NOT NULL AND g.resolved_at IS NULL"),
            Self::All => None,
        }
    }
}

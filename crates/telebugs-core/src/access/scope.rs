//! Project-scope evaluation.
//!
//! Listing filters are advisory: a requested project outside the membership
//! set falls back to the whole set. Single-entity lookups and release
//! listings check membership outright and reject on a miss.

use crate::error::Rejection;
use crate::model::ProjectId;
use std::collections::BTreeSet;

/// The projects a principal may access.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectScope(BTreeSet<ProjectId>);

impl ProjectScope {
    pub fn new(projects: impl IntoIterator<Item = ProjectId>) -> Self {
        Self(projects.into_iter().collect())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn contains(&self, project: ProjectId) -> bool {
        self.0.contains(&project)
    }

    /// Every member project, ascending.
    #[must_use]
    pub fn ids(&self) -> Vec<ProjectId> {
        self.0.iter().copied().collect()
    }

    /// Effective project list for a listing with an optional filter.
    ///
    /// A member filter narrows to that project. A non-member filter is
    /// ignored, so the result is never wider than the membership set.
    #[must_use]
    pub fn effective(&self, requested: Option<ProjectId>) -> Vec<ProjectId> {
        match requested {
            Some(project) if self.contains(project) => vec![project],
            _ => self.ids(),
        }
    }

    /// Hard membership check for operations that need an explicit project.
    ///
    /// # Errors
    ///
    /// Returns an access-denied rejection when `project` is not a member.
    pub fn require(&self, project: ProjectId) -> Result<(), Rejection> {
        self.authorize(project, "project")
    }

    /// Ownership check for a fetched entity owned by `owner`.
    ///
    /// # Errors
    ///
    /// Returns `"Access denied to this <target>"` when `owner` is not a member.
    pub fn authorize(&self, owner: ProjectId, target: &str) -> Result<(), Rejection> {
        if self.contains(owner) {
            Ok(())
        } else {
            Err(Rejection::access_denied(target))
        }
    }
}

impl FromIterator<ProjectId> for ProjectScope {
    fn from_iter<I: IntoIterator<Item = ProjectId>>(iter: I) -> Self {
        Self::new(iter)
    }
}

//! Ancestor tree traversal.
//!
//! [`TraversalEngine`] walks parent links upward from a root person,
//! resolving every record through a [`PersonCache`], and materializes the
//! result as a tree of [`AncestorNode`]s.
//!
//! # Algorithm
//!
//! 1. Resolve the root. A root without a record fails the whole build.
//! 2. A node at depth `max_depth` is a leaf; its parents are not fetched.
//! 3. Every parent reference, in record order, is checked against the
//!    current root-to-node path. A repeat is pruned (cycle break) and
//!    reported as [`Diagnostic::CycleSuppressed`].
//! 4. Parents that cannot be resolved are pruned and reported as
//!    [`Diagnostic::BranchUnresolved`]; their siblings are still expanded.
//! 5. Parents of one node are expanded concurrently. Results are placed in
//!    record order, so the tree does not depend on fetch completion order.
//!
//! Visited tracking is per path. Two branches may both contain the same
//! ancestor (pedigree collapse); the cache makes sure that ancestor is only
//! fetched once.

use crate::cache::{CacheEntry, PersonCache};
use crate::display::DisplayTree;
use crate::domain::{ParentRef, PersonId, PersonRecord, Sex};
use crate::error::BuildError;
use futures::future::{BoxFuture, FutureExt, join_all};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;

/// Display fields derived from one person record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonSummary {
    /// Person ID
    pub id: PersonId,
    /// Display name
    pub name: String,
    /// Birth year, if parseable
    pub birth_year: Option<u16>,
    /// Death year, if parseable
    pub death_year: Option<u16>,
    /// Recorded sex
    pub sex: Sex,
    /// Portrait media reference
    pub profile_image_id: Option<String>,
    /// The depth cap stopped expansion although the record lists parents
    pub has_more_ancestors: bool,
}

impl PersonSummary {
    fn from_record(record: &PersonRecord, has_more_ancestors: bool) -> Self {
        Self {
            id: record.id.clone(),
            name: record.display_name(),
            birth_year: record.display_birth_year(),
            death_year: record.display_death_year(),
            sex: record.sex,
            profile_image_id: record.profile_image_id.clone(),
            has_more_ancestors,
        }
    }
}

/// One person in the traversal result, with their expanded parents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AncestorNode {
    /// Display fields for this person
    pub person: PersonSummary,
    /// Expanded parents, in record order
    pub ancestors: Vec<AncestorNode>,
}

impl AncestorNode {
    /// Number of nodes in this subtree, including this one.
    pub fn node_count(&self) -> usize {
        1 + self.ancestors.iter().map(AncestorNode::node_count).sum::<usize>()
    }

    /// Longest path below this node, in edges.
    pub fn depth(&self) -> usize {
        self.ancestors
            .iter()
            .map(|a| a.depth() + 1)
            .max()
            .unwrap_or(0)
    }
}

/// Data-quality findings from one build.
///
/// None of these fail a build. They are reported so a consumer can surface
/// them; the tree itself silently omits the affected branches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// `ancestor` is already on the path from the root to `child`.
    CycleSuppressed {
        /// Person whose parent reference was pruned
        child: PersonId,
        /// The repeated ID
        ancestor: PersonId,
    },

    /// A parent reference could not be resolved.
    BranchUnresolved {
        /// Person whose parent reference was pruned
        child: PersonId,
        /// The unresolved parent ID
        parent: PersonId,
        /// Not found, or the gateway failure
        reason: String,
    },
}

/// Result of a traversal, before mapping to the render shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AncestorTree {
    /// The root person and their expanded ancestors
    pub root: AncestorNode,
    /// Findings in traversal order
    pub diagnostics: Vec<Diagnostic>,
    /// Gateway calls made by the build
    pub fetches: usize,
}

/// IDs on the current root-to-node path.
#[derive(Debug, Clone, Default)]
pub struct VisitedSet(HashSet<PersonId>);

impl VisitedSet {
    /// Whether `id` is already on the path.
    pub fn contains(&self, id: &PersonId) -> bool {
        self.0.contains(id)
    }

    /// The path extended by `id`.
    pub fn with(&self, id: &PersonId) -> Self {
        let mut next = self.0.clone();
        next.insert(id.clone());
        Self(next)
    }

    /// Number of IDs on the path.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the path is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

struct Expansion {
    node: AncestorNode,
    diagnostics: Vec<Diagnostic>,
}

enum Branch {
    Expanded(Expansion),
    Pruned(Diagnostic),
}

/// Builds ancestor trees through one build's [`PersonCache`].
pub struct TraversalEngine {
    cache: Arc<PersonCache>,
}

impl TraversalEngine {
    /// Create an engine reading through `cache`.
    pub fn new(cache: Arc<PersonCache>) -> Self {
        Self { cache }
    }

    /// Build the render-ready tree for `root`, `max_depth` generations up.
    ///
    /// # Errors
    ///
    /// - `BuildError::RootNotFound` if the root has no record
    /// - `BuildError::RootUnavailable` if fetching the root failed
    pub async fn build(&self, root: &PersonId, max_depth: usize) -> Result<DisplayTree, BuildError> {
        self.build_ancestors(root, max_depth)
            .await
            .map(DisplayTree::from)
    }

    /// Build the tree for `root` in traversal vocabulary.
    ///
    /// # Errors
    ///
    /// Same as [`build`](Self::build).
    pub async fn build_ancestors(
        &self,
        root: &PersonId,
        max_depth: usize,
    ) -> Result<AncestorTree, BuildError> {
        tracing::debug!(%root, max_depth, "Building ancestor tree");

        let record = match self.cache.get(root).await {
            CacheEntry::Found(record) => record,
            CacheEntry::NotFound => return Err(BuildError::RootNotFound(root.clone())),
            CacheEntry::Failed(reason) => {
                return Err(BuildError::RootUnavailable {
                    id: root.clone(),
                    reason,
                });
            }
        };

        let path = VisitedSet::default().with(root);
        let expansion = self.expand(record, 0, max_depth, path).await;

        let tree = AncestorTree {
            root: expansion.node,
            diagnostics: expansion.diagnostics,
            fetches: self.cache.fetch_count(),
        };

        tracing::info!(
            %root,
            nodes = tree.root.node_count(),
            generations = tree.root.depth(),
            fetches = tree.fetches,
            diagnostics = tree.diagnostics.len(),
            "Ancestor tree built"
        );

        Ok(tree)
    }

    fn expand(
        &self,
        record: Arc<PersonRecord>,
        depth: usize,
        max_depth: usize,
        path: VisitedSet,
    ) -> BoxFuture<'_, Expansion> {
        async move {
            if depth >= max_depth {
                let capped = !record.parents.is_empty();
                return Expansion {
                    node: AncestorNode {
                        person: PersonSummary::from_record(&record, capped),
                        ancestors: Vec::new(),
                    },
                    diagnostics: Vec::new(),
                };
            }

            let branches = join_all(
                record
                    .parents
                    .iter()
                    .map(|parent| self.expand_parent(&record.id, parent, depth + 1, max_depth, &path)),
            )
            .await;

            let mut ancestors = Vec::with_capacity(branches.len());
            let mut diagnostics = Vec::new();
            for branch in branches {
                match branch {
                    Branch::Expanded(expansion) => {
                        ancestors.push(expansion.node);
                        diagnostics.extend(expansion.diagnostics);
                    }
                    Branch::Pruned(diagnostic) => diagnostics.push(diagnostic),
                }
            }

            Expansion {
                node: AncestorNode {
                    person: PersonSummary::from_record(&record, false),
                    ancestors,
                },
                diagnostics,
            }
        }
        .boxed()
    }

    async fn expand_parent(
        &self,
        child: &PersonId,
        parent: &ParentRef,
        depth: usize,
        max_depth: usize,
        path: &VisitedSet,
    ) -> Branch {
        if path.contains(&parent.id) {
            tracing::debug!(%child, ancestor = %parent.id, "Suppressed cyclic parent reference");
            return Branch::Pruned(Diagnostic::CycleSuppressed {
                child: child.clone(),
                ancestor: parent.id.clone(),
            });
        }

        let entry = self.cache.get(&parent.id).await;
        match entry {
            CacheEntry::Found(record) => Branch::Expanded(
                self.expand(record, depth, max_depth, path.with(&parent.id))
                    .await,
            ),
            CacheEntry::NotFound | CacheEntry::Failed(_) => {
                let reason = entry.unresolved_reason().unwrap_or_default();
                tracing::debug!(%child, parent = %parent.id, %reason, "Dropped unresolved branch");
                Branch::Pruned(Diagnostic::BranchUnresolved {
                    child: child.clone(),
                    parent: parent.id.clone(),
                    reason,
                })
            }
        }
    }
}

//! Render-ready tree shape.
//!
//! Tree renderers draw a root with its `children` below it. An ancestor tree
//! points the other way: the "children" of a display node are the person's
//! parents, one generation up. The traversal keeps its own vocabulary
//! ([`AncestorNode::ancestors`]) and this module is the only place where it
//! becomes `children`.
//!
//! Serialized form:
//!
//! ```json
//! {
//!   "name": "Ada Byron",
//!   "attributes": {
//!     "birthYear": "1815",
//!     "deathYear": "1852",
//!     "sex": "F",
//!     "personId": "7",
//!     "profileImageId": null,
//!     "hasMoreAncestors": false
//!   },
//!   "children": []
//! }
//! ```
//!
//! Absent years serialize as empty strings.

use crate::domain::{PersonId, Sex};
use crate::traversal::{AncestorNode, AncestorTree, Diagnostic};
use serde::{Serialize, Serializer};

/// Display attributes of one node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeAttributes {
    /// Birth year, if parseable
    #[serde(serialize_with = "year_text")]
    pub birth_year: Option<u16>,

    /// Death year, if parseable
    #[serde(serialize_with = "year_text")]
    pub death_year: Option<u16>,

    /// Recorded sex
    pub sex: Sex,

    /// Person ID
    pub person_id: PersonId,

    /// Portrait media reference
    pub profile_image_id: Option<String>,

    /// Depth cap reached on a person with recorded parents
    pub has_more_ancestors: bool,
}

/// A node in the render-ready tree. `children` are the person's parents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayNode {
    /// Display name
    pub name: String,

    /// Display attributes
    pub attributes: NodeAttributes,

    /// Parents, one generation up, in record order
    pub children: Vec<DisplayNode>,
}

impl DisplayNode {
    /// Person ID of this node.
    pub fn person_id(&self) -> &PersonId {
        &self.attributes.person_id
    }

    /// Person IDs of this node's children, in order.
    pub fn child_ids(&self) -> Vec<&PersonId> {
        self.children.iter().map(DisplayNode::person_id).collect()
    }

    /// Number of nodes in this subtree.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(DisplayNode::node_count).sum::<usize>()
    }

    /// Longest path below this node, in edges.
    pub fn depth(&self) -> usize {
        self.children
            .iter()
            .map(|c| c.depth() + 1)
            .max()
            .unwrap_or(0)
    }

    /// First node in pre-order with the given person ID.
    pub fn find(&self, id: &PersonId) -> Option<&DisplayNode> {
        if self.person_id() == id {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(id))
    }
}

impl From<AncestorNode> for DisplayNode {
    fn from(node: AncestorNode) -> Self {
        let person = node.person;
        Self {
            name: person.name,
            attributes: NodeAttributes {
                birth_year: person.birth_year,
                death_year: person.death_year,
                sex: person.sex,
                person_id: person.id,
                profile_image_id: person.profile_image_id,
                has_more_ancestors: person.has_more_ancestors,
            },
            children: node.ancestors.into_iter().map(DisplayNode::from).collect(),
        }
    }
}

/// Result of one successful build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayTree {
    /// The root person
    pub root: DisplayNode,

    /// Cycle suppressions and unresolved branches, in traversal order
    pub diagnostics: Vec<Diagnostic>,

    /// Gateway calls made by the build
    pub fetches: usize,
}

impl From<AncestorTree> for DisplayTree {
    fn from(tree: AncestorTree) -> Self {
        Self {
            root: DisplayNode::from(tree.root),
            diagnostics: tree.diagnostics,
            fetches: tree.fetches,
        }
    }
}

fn year_text<S: Serializer>(year: &Option<u16>, serializer: S) -> Result<S::Ok, S::Error> {
    match year {
        Some(year) => serializer.collect_str(year),
        None => serializer.serialize_str(""),
    }
}

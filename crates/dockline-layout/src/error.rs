//! Error taxonomy for layout mutations and tree validation.

use std::fmt;

use crate::item::ItemId;
use crate::window::WindowId;

/// Coarse classification of a [`LayoutError`], for hosts that dispatch on
/// error kind rather than the concrete variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The caller misused the API (duplicate insertion, wrong node kind).
    InvalidOperation,
    /// A referenced dock widget, item, or window does not exist here.
    NotFound,
}

/// Failure of a structural mutation on a drop area or item tree.
#[derive(Debug, Clone, PartialEq)]
pub enum LayoutError {
    /// The dock widget is already hosted by this area.
    AlreadyDocked { dock_name: String },
    /// No leaf in this area hosts the named dock widget.
    DockNotFound { dock_name: String },
    /// The item handle does not resolve in this tree.
    ItemNotFound { item: ItemId },
    /// The named item exists but is not a placeholder.
    NotAPlaceholder { dock_name: String },
    /// The target of a container operation is not a container.
    NotAContainer { item: ItemId },
    /// A tab operation targeted an item that is not a group leaf.
    NotAGroup { item: ItemId },
    /// An explicit share was outside (0, 1].
    InvalidShare { share: f64 },
    /// Separator index out of range for the container.
    SeparatorOutOfRange { item: ItemId, index: usize },
    /// The window handle does not resolve in this registry.
    WindowNotFound { window: WindowId },
    /// The window ID allocator ran out of values.
    WindowIdOverflow,
    /// The tree itself is structurally invalid.
    Model(TreeError),
}

impl LayoutError {
    /// Classify this error per the public taxonomy.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::AlreadyDocked { .. }
            | Self::NotAPlaceholder { .. }
            | Self::NotAContainer { .. }
            | Self::NotAGroup { .. }
            | Self::InvalidShare { .. }
            | Self::SeparatorOutOfRange { .. }
            | Self::WindowIdOverflow
            | Self::Model(_) => ErrorKind::InvalidOperation,
            Self::DockNotFound { .. }
            | Self::ItemNotFound { .. }
            | Self::WindowNotFound { .. } => ErrorKind::NotFound,
        }
    }
}

impl fmt::Display for LayoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyDocked { dock_name } => {
                write!(f, "dock widget {dock_name:?} is already docked in this area")
            }
            Self::DockNotFound { dock_name } => {
                write!(f, "dock widget {dock_name:?} not found in this area")
            }
            Self::ItemNotFound { item } => write!(f, "item {item:?} not found in this tree"),
            Self::NotAPlaceholder { dock_name } => {
                write!(f, "item for dock widget {dock_name:?} is not a placeholder")
            }
            Self::NotAContainer { item } => write!(f, "item {item:?} is not a container"),
            Self::NotAGroup { item } => write!(f, "item {item:?} is not a group leaf"),
            Self::InvalidShare { share } => {
                write!(f, "share {share} outside the valid range (0, 1]")
            }
            Self::SeparatorOutOfRange { item, index } => {
                write!(f, "separator index {index} out of range in container {item:?}")
            }
            Self::WindowNotFound { window } => {
                write!(f, "window {window:?} not found in this registry")
            }
            Self::WindowIdOverflow => write!(f, "window ID overflow"),
            Self::Model(error) => write!(f, "invalid tree: {error}"),
        }
    }
}

impl std::error::Error for LayoutError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Model(error) => Some(error),
            _ => None,
        }
    }
}

impl From<TreeError> for LayoutError {
    fn from(error: TreeError) -> Self {
        Self::Model(error)
    }
}

/// Structural validation failure of an item tree or snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeError {
    /// Item IDs are non-zero by construction.
    ZeroItemId,
    /// The ID allocator ran out of values.
    ItemIdOverflow { current: ItemId },
    /// Two records share one ID.
    DuplicateItemId { item: ItemId },
    /// The declared root is missing from the node set.
    MissingRoot { root: ItemId },
    /// The root node carries a parent reference.
    RootHasParent { root: ItemId },
    /// The root node is not a container.
    RootNotContainer { root: ItemId },
    /// A container references a child that does not exist.
    MissingChild { parent: ItemId, child: ItemId },
    /// A child's parent back-reference disagrees with the container.
    ParentMismatch { parent: ItemId, child: ItemId },
    /// A node is unreachable from the root.
    UnreachableItem { item: ItemId },
    /// A container lists the same child twice.
    DuplicateChild { parent: ItemId, child: ItemId },
    /// Shares vector does not align with the children vector.
    ShareCountMismatch { parent: ItemId },
    /// A share is zero, negative, or non-finite.
    InvalidShareValue { parent: ItemId, index: usize },
    /// min/max constraints are contradictory.
    InvalidConstraint { item: ItemId },
    /// `next_id` must exceed every existing ID.
    NextIdNotGreaterThanExisting { next_id: ItemId },
}

impl fmt::Display for TreeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroItemId => write!(f, "item ID 0 is reserved"),
            Self::ItemIdOverflow { current } => {
                write!(f, "item ID overflow after {current:?}")
            }
            Self::DuplicateItemId { item } => write!(f, "duplicate item ID {item:?}"),
            Self::MissingRoot { root } => write!(f, "root item {root:?} missing from node set"),
            Self::RootHasParent { root } => write!(f, "root item {root:?} has a parent"),
            Self::RootNotContainer { root } => {
                write!(f, "root item {root:?} is not a container")
            }
            Self::MissingChild { parent, child } => {
                write!(f, "container {parent:?} references missing child {child:?}")
            }
            Self::ParentMismatch { parent, child } => write!(
                f,
                "child {child:?} does not point back at container {parent:?}"
            ),
            Self::UnreachableItem { item } => {
                write!(f, "item {item:?} unreachable from the root")
            }
            Self::DuplicateChild { parent, child } => {
                write!(f, "container {parent:?} lists child {child:?} twice")
            }
            Self::ShareCountMismatch { parent } => {
                write!(f, "container {parent:?} share count does not match children")
            }
            Self::InvalidShareValue { parent, index } => {
                write!(f, "container {parent:?} share {index} is not in (0, 1]")
            }
            Self::InvalidConstraint { item } => {
                write!(f, "item {item:?} has max size below min size")
            }
            Self::NextIdNotGreaterThanExisting { next_id } => {
                write!(f, "next_id {next_id:?} does not exceed existing IDs")
            }
        }
    }
}

impl std::error::Error for TreeError {}

//! Docking layout engine: splitter trees, drop areas, drag docking, and
//! layout persistence.
//!
//! The engine is deliberately toolkit-agnostic. Geometry is integer pixels,
//! every mutation returns a [`MutationReport`] of observable changes, and
//! rendering is the host's job through the `dockline-core` view traits.
//!
//! The main entry points:
//!
//! - [`DropArea`] for a single window's layout and docking operations
//! - [`WindowRegistry`] for multi-window arrangements and drag docking
//! - [`LayoutSaver`] for saving and restoring full arrangements

#![forbid(unsafe_code)]

pub use dockline_core::geometry::{Point, Rect, Size};

pub mod drag;
pub mod drop_area;
pub mod error;
pub mod group;
pub mod indicator;
pub mod item;
pub mod saver;
pub mod view_sync;
pub mod window;

pub use drag::{
    DragCancelReason, DragController, DragEffect, DragEvent, DragNoopReason, DragState,
    DragSurface, DragTransition, DropTargetResolver, WindowBeingDragged, DRAG_START_THRESHOLD,
};
pub use drop_area::{AddOptions, DockLocation, DropArea};
pub use error::{ErrorKind, LayoutError, TreeError};
pub use group::{affinities_match, Group};
pub use indicator::{
    DropIndicatorOverlay, DropPlacement, DropTarget, OUTER_EDGE_MARGIN, TAB_BAND_RATIO,
};
pub use item::{
    Axis, Change, ItemId, ItemKind, ItemRecord, ItemTree, ItemTreeSnapshot, MutationReport,
    SanityCode, SanityIssue, SanityReport, SanitySeverity, Separator, SizeConstraints,
    ITEM_TREE_SCHEMA_VERSION, SEPARATOR_THICKNESS,
};
pub use saver::{
    LayoutDocument, LayoutSaver, RestoreOptions, SaverError, WindowSnapshot,
    LAYOUT_SCHEMA_VERSION,
};
pub use view_sync::ViewBinder;
pub use window::{
    RegistryEvent, WindowId, WindowKind, WindowRecord, WindowRegistry, WindowState,
};

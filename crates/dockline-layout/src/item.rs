//! Splitter-tree item model and layout solver.
//!
//! The item tree is a host-agnostic arena: every node is an [`ItemRecord`]
//! keyed by a non-zero [`ItemId`], with a non-owning parent back-reference.
//! Leaves host tabbed [`Group`]s (or placeholders reserved during restore);
//! interior nodes are containers stacking their children along one axis.
//!
//! Geometry is solved top-down: a container distributes its extent among its
//! visible children proportionally to their shares, clamps each child to its
//! aggregated min/max bounds, and redistributes slack in ascending child
//! order until converged. Hard minimums are never violated; hard maximums
//! yield only when the container has no other way to fill its extent, and
//! that is reported rather than treated as fatal.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use dockline_core::geometry::{Point, Rect, Size};

use crate::error::{LayoutError, TreeError};
use crate::group::Group;

/// Thickness of the draggable boundary between adjacent siblings, in pixels.
pub const SEPARATOR_THICKNESS: i32 = 5;

/// Current item tree schema version.
pub const ITEM_TREE_SCHEMA_VERSION: u16 = 1;

/// Stable identifier for item nodes.
///
/// `0` is reserved/invalid so IDs are always non-zero. IDs are never reused
/// within a tree, so a stale handle can never silently alias a new node.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ItemId(u64);

impl ItemId {
    /// Lowest valid item ID.
    pub const MIN: Self = Self(1);

    /// Create a new item ID, rejecting 0.
    pub fn new(raw: u64) -> Result<Self, TreeError> {
        if raw == 0 {
            return Err(TreeError::ZeroItemId);
        }
        Ok(Self(raw))
    }

    /// Get the raw numeric value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Return the next ID, or an error on overflow.
    pub fn checked_next(self) -> Result<Self, TreeError> {
        let Some(next) = self.0.checked_add(1) else {
            return Err(TreeError::ItemIdOverflow { current: self });
        };
        Self::new(next)
    }
}

impl Default for ItemId {
    fn default() -> Self {
        Self::MIN
    }
}

/// Stacking axis of a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    /// Children are laid out left to right.
    Horizontal,
    /// Children are laid out top to bottom.
    Vertical,
}

impl Axis {
    /// The perpendicular axis.
    #[must_use]
    pub const fn other(self) -> Self {
        match self {
            Self::Horizontal => Self::Vertical,
            Self::Vertical => Self::Horizontal,
        }
    }
}

/// Per-item size bounds in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeConstraints {
    pub min_width: i32,
    pub min_height: i32,
    pub max_width: Option<i32>,
    pub max_height: Option<i32>,
}

impl SizeConstraints {
    /// Validate constraints for a given node.
    pub fn validate(self, item: ItemId) -> Result<(), TreeError> {
        if let Some(max_width) = self.max_width
            && max_width < self.min_width
        {
            return Err(TreeError::InvalidConstraint { item });
        }
        if let Some(max_height) = self.max_height
            && max_height < self.min_height
        {
            return Err(TreeError::InvalidConstraint { item });
        }
        Ok(())
    }
}

impl Default for SizeConstraints {
    fn default() -> Self {
        Self {
            min_width: 0,
            min_height: 0,
            max_width: None,
            max_height: None,
        }
    }
}

/// Min/max bounds projected onto one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisBounds {
    pub min: i32,
    pub max: Option<i32>,
}

impl AxisBounds {
    fn clamp(self, value: i32) -> i32 {
        let value = value.max(self.min);
        match self.max {
            Some(max) => value.min(max),
            None => value,
        }
    }
}

/// Node payload variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ItemKind {
    /// A tabbed cell hosting dock widgets.
    Leaf(Group),
    /// Geometry reserved for a dock widget that does not exist yet.
    Placeholder { dock_name: String },
    /// Ordered children stacked along one axis, with proportional shares.
    Container {
        axis: Axis,
        children: Vec<ItemId>,
        shares: Vec<f64>,
    },
}

impl ItemKind {
    /// True for container nodes.
    #[must_use]
    pub fn is_container(&self) -> bool {
        matches!(self, Self::Container { .. })
    }
}

/// One node record in the item tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemRecord {
    pub id: ItemId,
    #[serde(default)]
    pub parent: Option<ItemId>,
    #[serde(default)]
    pub geometry: Rect,
    #[serde(default)]
    pub constraints: SizeConstraints,
    #[serde(default = "default_visible")]
    pub visible: bool,
    #[serde(flatten)]
    pub kind: ItemKind,
    /// Forward-compatible extension bag.
    #[serde(default)]
    pub extensions: BTreeMap<String, String>,
}

fn default_visible() -> bool {
    true
}

impl ItemRecord {
    fn new(id: ItemId, parent: Option<ItemId>, kind: ItemKind) -> Self {
        Self {
            id,
            parent,
            geometry: Rect::default(),
            constraints: SizeConstraints::default(),
            visible: true,
            kind,
            extensions: BTreeMap::new(),
        }
    }
}

/// Transient handle for the boundary between two adjacent visible siblings.
///
/// Separators are derived from current geometry at query time and never
/// persisted; they exist only for interactive resizing and hit testing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Separator {
    /// Container owning the adjacent pair.
    pub container: ItemId,
    /// Index of the pair among the container's visible children: the
    /// separator sits after visible child `index`.
    pub index: usize,
    /// Axis of the separator line itself (perpendicular to the stacking axis).
    pub orientation: Axis,
    /// Pixel rectangle occupied by the separator.
    pub line: Rect,
}

/// One observable state change produced by a mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    /// The item's geometry changed.
    Geometry(ItemId),
    /// The item's visibility changed.
    Visibility(ItemId),
    /// The leaf's tab set or current tab changed.
    TabsChanged(ItemId),
    /// A new item entered the tree.
    ItemAdded(ItemId),
    /// The item left the tree; any retained handle to it is now invalid.
    ItemRemoved(ItemId),
    /// The container's constraints could not all be met at its current
    /// extent. Best-effort sizing was applied. Non-fatal.
    InfeasibleGeometry {
        container: ItemId,
        axis: Axis,
        shortfall: i32,
    },
}

/// Set of observable changes from one mutating operation.
///
/// Hosts replay this against their views; the engine never calls into a
/// backend directly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MutationReport {
    pub changes: Vec<Change>,
}

impl MutationReport {
    /// True if nothing observable changed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// True if any infeasible-geometry condition was reported.
    #[must_use]
    pub fn is_infeasible(&self) -> bool {
        self.changes
            .iter()
            .any(|change| matches!(change, Change::InfeasibleGeometry { .. }))
    }

    /// Items whose geometry changed.
    pub fn changed_geometry(&self) -> impl Iterator<Item = ItemId> + '_ {
        self.changes.iter().filter_map(|change| match change {
            Change::Geometry(item) => Some(*item),
            _ => None,
        })
    }

    /// Append all changes from another report.
    pub fn merge(&mut self, other: MutationReport) {
        self.changes.extend(other.changes);
    }

    pub(crate) fn record(&mut self, change: Change) {
        if !self.changes.contains(&change) {
            self.changes.push(change);
        }
    }
}

/// Severity for one sanity finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SanitySeverity {
    Error,
    Warning,
}

/// Stable code for sanity findings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SanityCode {
    MissingRoot,
    RootHasParent,
    RootNotContainer,
    MissingChild,
    ParentMismatch,
    DuplicateChild,
    UnreachableItem,
    EmptyContainer,
    DegenerateContainer,
    ShareCountMismatch,
    InvalidShare,
    InvalidConstraint,
    EmptyGroup,
    DuplicateDockName,
    GeometrySumMismatch,
    CrossExtentMismatch,
    ChildOutsideParent,
    ConstraintViolated,
    NextIdNotGreaterThanExisting,
    DockIndexMismatch,
}

/// One actionable sanity finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SanityIssue {
    pub code: SanityCode,
    pub severity: SanitySeverity,
    pub item: Option<ItemId>,
    pub related: Option<ItemId>,
    pub message: String,
}

/// Structured consistency report over an item tree.
///
/// Run after every structural mutation in debug builds; exposed so hosts and
/// the layout linter can validate trees without a GUI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SanityReport {
    pub state_hash: u64,
    pub issues: Vec<SanityIssue>,
}

impl SanityReport {
    /// True if any error-level finding exists.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.issues
            .iter()
            .any(|issue| issue.severity == SanitySeverity::Error)
    }
}

/// Canonical serialized item tree shape.
///
/// The extension maps are reserved for forward-compatible fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemTreeSnapshot {
    #[serde(default = "default_schema_version")]
    pub schema_version: u16,
    pub root: ItemId,
    pub next_id: ItemId,
    pub nodes: Vec<ItemRecord>,
    #[serde(default)]
    pub extensions: BTreeMap<String, String>,
}

fn default_schema_version() -> u16 {
    ITEM_TREE_SCHEMA_VERSION
}

impl ItemTreeSnapshot {
    /// Canonicalize node ordering by ID for deterministic serialization.
    pub fn canonicalize(&mut self) {
        self.nodes.sort_by_key(|node| node.id);
    }

    /// Deterministic hash over canonical tree state, for diagnostics.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        snapshot_state_hash(self)
    }
}

/// The splitter tree: an arena of item records under one container root.
///
/// The root is always a container; an empty root represents an empty drop
/// area. All structural mutations keep the tree minimal: empty containers
/// are pruned and single-child non-root containers are collapsed before the
/// mutation returns.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemTree {
    root: ItemId,
    next_id: ItemId,
    nodes: BTreeMap<ItemId, ItemRecord>,
    /// Containers whose constraints could not be fully satisfied at their
    /// current extent. Cleared per-container on every successful solve.
    infeasible: BTreeSet<ItemId>,
}

impl ItemTree {
    /// Create an empty tree covering `area`, rooted at a horizontal container.
    #[must_use]
    pub fn new(area: Rect) -> Self {
        let root = ItemId::MIN;
        let mut record = ItemRecord::new(
            root,
            None,
            ItemKind::Container {
                axis: Axis::Horizontal,
                children: Vec::new(),
                shares: Vec::new(),
            },
        );
        record.geometry = area;
        let mut nodes = BTreeMap::new();
        nodes.insert(root, record);
        Self {
            root,
            next_id: ItemId(2),
            nodes,
            infeasible: BTreeSet::new(),
        }
    }

    /// Root container ID.
    #[must_use]
    pub fn root(&self) -> ItemId {
        self.root
    }

    /// Area covered by the tree.
    #[must_use]
    pub fn area(&self) -> Rect {
        self.nodes
            .get(&self.root)
            .map(|record| record.geometry)
            .unwrap_or_default()
    }

    /// Lookup a node record.
    #[must_use]
    pub fn node(&self, id: ItemId) -> Option<&ItemRecord> {
        self.nodes.get(&id)
    }

    /// Iterate all node records in ID order.
    pub fn nodes(&self) -> impl Iterator<Item = &ItemRecord> {
        self.nodes.values()
    }

    /// Number of nodes, root included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when only the empty root remains.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self.nodes.get(&self.root).map(|record| &record.kind) {
            Some(ItemKind::Container { children, .. }) => children.is_empty(),
            _ => true,
        }
    }

    /// IDs of all leaf and placeholder items, in ID order.
    #[must_use]
    pub fn leaf_ids(&self) -> Vec<ItemId> {
        self.nodes
            .values()
            .filter(|record| !record.kind.is_container())
            .map(|record| record.id)
            .collect()
    }

    /// The deepest visible leaf or placeholder containing `point`, if any.
    #[must_use]
    pub fn leaf_at(&self, point: Point) -> Option<ItemId> {
        self.nodes
            .values()
            .filter(|record| {
                !record.kind.is_container() && record.visible && record.geometry.contains(point)
            })
            .map(|record| record.id)
            .next()
    }

    /// The leaf or placeholder hosting the named dock widget, if any.
    #[must_use]
    pub fn leaf_for_dock(&self, dock_name: &str) -> Option<ItemId> {
        self.nodes.values().find_map(|record| match &record.kind {
            ItemKind::Leaf(group) if group.contains(dock_name) => Some(record.id),
            ItemKind::Placeholder { dock_name: name } if name == dock_name => Some(record.id),
            _ => None,
        })
    }

    /// Mutable access to a node's payload. Structural fields (parent,
    /// children) stay crate-internal; callers may only edit the payload.
    pub(crate) fn node_kind_mut(&mut self, id: ItemId) -> Option<&mut ItemKind> {
        self.nodes.get_mut(&id).map(|record| &mut record.kind)
    }

    fn alloc_id(&mut self) -> Result<ItemId, TreeError> {
        let id = self.next_id;
        self.next_id = id.checked_next()?;
        Ok(id)
    }

    fn node_mut(&mut self, id: ItemId) -> Result<&mut ItemRecord, LayoutError> {
        self.nodes
            .get_mut(&id)
            .ok_or(LayoutError::ItemNotFound { item: id })
    }

    fn require(&self, id: ItemId) -> Result<&ItemRecord, LayoutError> {
        self.nodes
            .get(&id)
            .ok_or(LayoutError::ItemNotFound { item: id })
    }

    fn container_parts(&self, id: ItemId) -> Result<(Axis, Vec<ItemId>, Vec<f64>), LayoutError> {
        match &self.require(id)?.kind {
            ItemKind::Container {
                axis,
                children,
                shares,
            } => Ok((*axis, children.clone(), shares.clone())),
            _ => Err(LayoutError::NotAContainer { item: id }),
        }
    }

    // -----------------------------------------------------------------
    // Size aggregation
    // -----------------------------------------------------------------

    /// Minimum size of an item, aggregated bottom-up for containers: along
    /// the stacking axis minimums sum (plus separators), across it they max.
    #[must_use]
    pub fn min_size(&self, id: ItemId) -> Size {
        let Some(record) = self.nodes.get(&id) else {
            return Size::ZERO;
        };
        let own = Size::new(record.constraints.min_width, record.constraints.min_height);
        let ItemKind::Container { axis, children, .. } = &record.kind else {
            return own;
        };
        let visible: Vec<ItemId> = children
            .iter()
            .copied()
            .filter(|child| self.nodes.get(child).is_some_and(|c| c.visible))
            .collect();
        if visible.is_empty() {
            return own;
        }
        let separators = SEPARATOR_THICKNESS * (visible.len() as i32 - 1);
        let mut along = separators;
        let mut across = 0;
        for child in &visible {
            let child_min = self.min_size(*child);
            let (child_along, child_across) = project(child_min, *axis);
            along += child_along;
            across = across.max(child_across);
        }
        unproject(along, across, *axis).max(own)
    }

    /// Maximum size per axis, `None` meaning unbounded. Containers sum along
    /// the stacking axis when every child is bounded, and take the tightest
    /// child bound across it.
    #[must_use]
    pub fn max_size(&self, id: ItemId) -> (Option<i32>, Option<i32>) {
        let Some(record) = self.nodes.get(&id) else {
            return (None, None);
        };
        let own = (record.constraints.max_width, record.constraints.max_height);
        let ItemKind::Container { axis, children, .. } = &record.kind else {
            return own;
        };
        let visible: Vec<ItemId> = children
            .iter()
            .copied()
            .filter(|child| self.nodes.get(child).is_some_and(|c| c.visible))
            .collect();
        if visible.is_empty() {
            return own;
        }
        let separators = SEPARATOR_THICKNESS * (visible.len() as i32 - 1);
        let mut along = Some(separators);
        let mut across: Option<i32> = None;
        for child in &visible {
            let child_max = self.max_size(*child);
            let (child_along, child_across) = match axis {
                Axis::Horizontal => (child_max.0, child_max.1),
                Axis::Vertical => (child_max.1, child_max.0),
            };
            along = match (along, child_along) {
                (Some(sum), Some(value)) => Some(sum + value),
                _ => None,
            };
            across = match (across, child_across) {
                (Some(current), Some(value)) => Some(current.min(value)),
                (None, Some(value)) => Some(value),
                (current, None) => current,
            };
        }
        let (max_w, max_h) = match axis {
            Axis::Horizontal => (along, across),
            Axis::Vertical => (across, along),
        };
        (
            tighten(max_w, own.0),
            tighten(max_h, own.1),
        )
    }

    fn bounds_along(&self, id: ItemId, axis: Axis) -> AxisBounds {
        let min = project(self.min_size(id), axis).0;
        let max_size = self.max_size(id);
        let max = match axis {
            Axis::Horizontal => max_size.0,
            Axis::Vertical => max_size.1,
        };
        AxisBounds { min, max }
    }

    // -----------------------------------------------------------------
    // Layout solving
    // -----------------------------------------------------------------

    /// Resize the whole tree to a new area and re-solve top-down.
    pub fn resize(&mut self, area: Rect) -> MutationReport {
        let mut report = MutationReport::default();
        let root = self.root;
        if let Some(record) = self.nodes.get_mut(&root) {
            if record.geometry != area {
                record.geometry = area;
                report.record(Change::Geometry(root));
            }
        }
        self.relayout(root, &mut report);
        report
    }

    /// Re-solve one container (and everything below it) from its shares.
    pub(crate) fn relayout(&mut self, container: ItemId, report: &mut MutationReport) {
        let Ok((axis, children, shares)) = self.container_parts(container) else {
            return;
        };
        let geometry = match self.nodes.get(&container) {
            Some(record) => record.geometry,
            None => return,
        };

        let visible: Vec<usize> = children
            .iter()
            .enumerate()
            .filter(|(_, child)| self.nodes.get(*child).is_some_and(|c| c.visible))
            .map(|(index, _)| index)
            .collect();
        if visible.is_empty() {
            self.infeasible.remove(&container);
            return;
        }

        let (extent, _) = project(geometry.size(), axis);
        // An extent too small for the separators alone is a shortfall too,
        // not a feasible zero-width problem.
        let unclamped = extent - SEPARATOR_THICKNESS * (visible.len() as i32 - 1);
        let available = unclamped.max(0);
        let separator_deficit = available - unclamped;

        let bounds: Vec<AxisBounds> = visible
            .iter()
            .map(|index| self.bounds_along(children[*index], axis))
            .collect();
        let weights: Vec<f64> = visible.iter().map(|index| shares[*index]).collect();

        let (sizes, solver_shortfall) = solve_extents(available, &weights, &bounds);
        let shortfall = solver_shortfall + separator_deficit;
        if shortfall != 0 {
            self.infeasible.insert(container);
            warn!(
                container = container.get(),
                ?axis,
                shortfall,
                "container constraints infeasible at current extent"
            );
            report.record(Change::InfeasibleGeometry {
                container,
                axis,
                shortfall,
            });
        } else {
            self.infeasible.remove(&container);
        }

        self.apply_extents(container, axis, &children, &visible, &sizes, report);
    }

    /// Position visible children sequentially and recurse into containers.
    fn apply_extents(
        &mut self,
        container: ItemId,
        axis: Axis,
        children: &[ItemId],
        visible: &[usize],
        sizes: &[i32],
        report: &mut MutationReport,
    ) {
        let geometry = match self.nodes.get(&container) {
            Some(record) => record.geometry,
            None => return,
        };
        let (_, cross) = project(geometry.size(), axis);
        let mut position = match axis {
            Axis::Horizontal => geometry.x,
            Axis::Vertical => geometry.y,
        };

        for (slot, index) in visible.iter().enumerate() {
            let child = children[*index];
            let size = sizes[slot];
            let rect = match axis {
                Axis::Horizontal => Rect::new(position, geometry.y, size, cross),
                Axis::Vertical => Rect::new(geometry.x, position, cross, size),
            };
            position += size + SEPARATOR_THICKNESS;

            let changed = match self.nodes.get_mut(&child) {
                Some(record) if record.geometry != rect => {
                    record.geometry = rect;
                    true
                }
                Some(_) => false,
                None => continue,
            };
            if changed {
                report.record(Change::Geometry(child));
            }
            if self
                .nodes
                .get(&child)
                .is_some_and(|record| record.kind.is_container())
            {
                self.relayout(child, report);
            }
        }
    }

    /// Derived separators between consecutive visible children.
    pub fn separators(&self, container: ItemId) -> Result<Vec<Separator>, LayoutError> {
        let (axis, children, _) = self.container_parts(container)?;
        let visible: Vec<&ItemRecord> = children
            .iter()
            .filter_map(|child| self.nodes.get(child))
            .filter(|record| record.visible)
            .collect();
        let mut separators = Vec::new();
        for (index, pair) in visible.windows(2).enumerate() {
            let before = pair[0].geometry;
            let line = match axis {
                Axis::Horizontal => {
                    Rect::new(before.right(), before.y, SEPARATOR_THICKNESS, before.height)
                }
                Axis::Vertical => {
                    Rect::new(before.x, before.bottom(), before.width, SEPARATOR_THICKNESS)
                }
            };
            separators.push(Separator {
                container,
                index,
                orientation: axis.other(),
                line,
            });
        }
        Ok(separators)
    }

    /// Drag the separator after visible child `index` by `delta` pixels.
    ///
    /// The request is symmetric on the adjacent pair and propagates no
    /// further: if either neighbor is at its limit the delta is clamped.
    pub fn drag_separator(
        &mut self,
        container: ItemId,
        index: usize,
        delta: i32,
    ) -> Result<MutationReport, LayoutError> {
        let (axis, children, _) = self.container_parts(container)?;
        let visible: Vec<ItemId> = children
            .iter()
            .copied()
            .filter(|child| self.nodes.get(child).is_some_and(|c| c.visible))
            .collect();
        if index + 1 >= visible.len() {
            return Err(LayoutError::SeparatorOutOfRange {
                item: container,
                index,
            });
        }

        let before = visible[index];
        let after = visible[index + 1];
        let before_size = project(self.require(before)?.geometry.size(), axis).0;
        let after_size = project(self.require(after)?.geometry.size(), axis).0;
        let before_bounds = self.bounds_along(before, axis);
        let after_bounds = self.bounds_along(after, axis);

        // Clamp so neither neighbor leaves its [min, max].
        let grow_limit = match before_bounds.max {
            Some(max) => max - before_size,
            None => i32::MAX,
        };
        let shrink_limit = after_size - after_bounds.min;
        let mut clamped = delta.min(grow_limit).min(shrink_limit);
        if delta < 0 {
            let grow_limit = match after_bounds.max {
                Some(max) => max - after_size,
                None => i32::MAX,
            };
            let shrink_limit = before_size - before_bounds.min;
            clamped = delta.max(-grow_limit).max(-shrink_limit);
        }

        let mut report = MutationReport::default();
        if clamped == 0 {
            return Ok(report);
        }

        let new_before = before_size + clamped;
        let new_after = after_size - clamped;
        self.set_extent(before, axis, new_before);
        self.set_extent(after, axis, new_after);
        self.sync_shares_from_geometry(container)?;
        self.relayout(container, &mut report);
        debug!(
            container = container.get(),
            index, delta, clamped, "separator dragged"
        );
        Ok(report)
    }

    /// Grow or shrink one child by `delta`, taking space from its neighbors.
    ///
    /// Tries the separator after the child first, then the one before it for
    /// whatever delta remains.
    pub fn request_resize_of_child(
        &mut self,
        container: ItemId,
        child: ItemId,
        delta: i32,
    ) -> Result<MutationReport, LayoutError> {
        let (axis, children, _) = self.container_parts(container)?;
        let visible: Vec<ItemId> = children
            .iter()
            .copied()
            .filter(|c| self.nodes.get(c).is_some_and(|r| r.visible))
            .collect();
        let Some(slot) = visible.iter().position(|c| *c == child) else {
            return Err(LayoutError::ItemNotFound { item: child });
        };

        let mut report = MutationReport::default();
        let mut remaining = delta;
        if slot + 1 < visible.len() {
            let before = project(self.require(child)?.geometry.size(), axis).0;
            report.merge(self.drag_separator(container, slot, remaining)?);
            let after = project(self.require(child)?.geometry.size(), axis).0;
            remaining -= after - before;
        }
        if remaining != 0 && slot > 0 {
            report.merge(self.drag_separator(container, slot - 1, -remaining)?);
        }
        Ok(report)
    }

    /// Even out the shares of all children of a container.
    pub fn layout_equally(&mut self, container: ItemId) -> Result<MutationReport, LayoutError> {
        let count = match &self.require(container)?.kind {
            ItemKind::Container { children, .. } => children.len(),
            _ => return Err(LayoutError::NotAContainer { item: container }),
        };
        let mut report = MutationReport::default();
        if count == 0 {
            return Ok(report);
        }
        let share = 1.0 / count as f64;
        if let ItemKind::Container { shares, .. } = &mut self.node_mut(container)?.kind {
            for value in shares.iter_mut() {
                *value = share;
            }
        }
        self.relayout(container, &mut report);
        Ok(report)
    }

    /// Even out the pair of children around one separator.
    pub fn equalize_pair(
        &mut self,
        container: ItemId,
        index: usize,
    ) -> Result<MutationReport, LayoutError> {
        let (axis, children, _) = self.container_parts(container)?;
        let visible: Vec<ItemId> = children
            .iter()
            .copied()
            .filter(|child| self.nodes.get(child).is_some_and(|c| c.visible))
            .collect();
        if index + 1 >= visible.len() {
            return Err(LayoutError::SeparatorOutOfRange {
                item: container,
                index,
            });
        }
        let before = project(self.require(visible[index])?.geometry.size(), axis).0;
        let after = project(self.require(visible[index + 1])?.geometry.size(), axis).0;
        self.drag_separator(container, index, (after - before) / 2)
    }

    fn set_extent(&mut self, id: ItemId, axis: Axis, extent: i32) {
        if let Some(record) = self.nodes.get_mut(&id) {
            match axis {
                Axis::Horizontal => record.geometry.width = extent,
                Axis::Vertical => record.geometry.height = extent,
            }
        }
    }

    /// Rewrite a container's shares from its children's current extents.
    fn sync_shares_from_geometry(&mut self, container: ItemId) -> Result<(), LayoutError> {
        let (axis, children, _) = self.container_parts(container)?;
        let extents: Vec<f64> = children
            .iter()
            .map(|child| {
                self.nodes
                    .get(child)
                    .map(|record| f64::from(project(record.geometry.size(), axis).0.max(0)))
                    .unwrap_or(0.0)
            })
            .collect();
        let total: f64 = extents.iter().sum();
        if total <= 0.0 {
            return Ok(());
        }
        if let ItemKind::Container { shares, .. } = &mut self.node_mut(container)?.kind {
            for (share, extent) in shares.iter_mut().zip(&extents) {
                *share = (extent / total).max(f64::MIN_POSITIVE);
            }
        }
        Ok(())
    }

    // -----------------------------------------------------------------
    // Structural mutation
    // -----------------------------------------------------------------

    /// Insert a new leaf/placeholder into an existing container at `index`.
    ///
    /// The new child receives `share` of the container (existing shares are
    /// scaled by `1 - share`); `None` means an equal share.
    pub fn insert_into_container(
        &mut self,
        container: ItemId,
        index: usize,
        kind: ItemKind,
        constraints: SizeConstraints,
        share: Option<f64>,
        report: &mut MutationReport,
    ) -> Result<ItemId, LayoutError> {
        let (_, children, _) = self.container_parts(container)?;
        if let Some(share) = share
            && !(share > 0.0 && share <= 1.0)
        {
            return Err(LayoutError::InvalidShare { share });
        }
        let share = share.unwrap_or(1.0 / (children.len() + 1) as f64);
        let index = index.min(children.len());

        let id = self.alloc_id()?;
        constraints.validate(id)?;
        let mut record = ItemRecord::new(id, Some(container), kind);
        record.constraints = constraints;
        self.nodes.insert(id, record);

        if let ItemKind::Container {
            children, shares, ..
        } = &mut self.node_mut(container)?.kind
        {
            let scale = 1.0 - share;
            for value in shares.iter_mut() {
                *value = (*value * scale).max(f64::MIN_POSITIVE);
            }
            children.insert(index, id);
            shares.insert(index, share);
        }

        report.record(Change::ItemAdded(id));
        self.relayout(container, report);
        debug!(item = id.get(), container = container.get(), "item inserted");
        Ok(id)
    }

    /// Wrap `target` in a new container of the given axis, replacing it in
    /// its parent. This is the split primitive: the only way the tree grows
    /// in an orthogonal direction.
    pub fn wrap_in_container(
        &mut self,
        target: ItemId,
        axis: Axis,
        report: &mut MutationReport,
    ) -> Result<ItemId, LayoutError> {
        let target_record = self.require(target)?.clone();
        let Some(parent) = target_record.parent else {
            return Err(LayoutError::ItemNotFound { item: target });
        };

        let wrapper = self.alloc_id()?;
        let mut record = ItemRecord::new(
            wrapper,
            Some(parent),
            ItemKind::Container {
                axis,
                children: vec![target],
                shares: vec![1.0],
            },
        );
        record.geometry = target_record.geometry;
        self.nodes.insert(wrapper, record);

        if let ItemKind::Container { children, .. } = &mut self.node_mut(parent)?.kind {
            if let Some(slot) = children.iter().position(|child| *child == target) {
                children[slot] = wrapper;
            }
        }
        self.node_mut(target)?.parent = Some(wrapper);
        report.record(Change::ItemAdded(wrapper));
        Ok(wrapper)
    }

    /// Re-orient an under-filled root, or push its current children down one
    /// level so the root can stack along `axis`.
    ///
    /// Returns the container whose axis now matches `axis` (always the root).
    pub fn orient_root(
        &mut self,
        axis: Axis,
        report: &mut MutationReport,
    ) -> Result<ItemId, LayoutError> {
        let root = self.root;
        let (root_axis, children, shares) = self.container_parts(root)?;
        if root_axis == axis || children.len() <= 1 {
            if let ItemKind::Container { axis: a, .. } = &mut self.node_mut(root)?.kind {
                *a = axis;
            }
            return Ok(root);
        }

        // Root stacks along the wrong axis and has siblings: adopt them into
        // a new child container and re-orient the root.
        let inner = self.alloc_id()?;
        let mut record = ItemRecord::new(
            inner,
            Some(root),
            ItemKind::Container {
                axis: root_axis,
                children: children.clone(),
                shares,
            },
        );
        record.geometry = self.require(root)?.geometry;
        self.nodes.insert(inner, record);
        for child in &children {
            self.node_mut(*child)?.parent = Some(inner);
        }
        if let ItemKind::Container {
            axis: a,
            children,
            shares,
        } = &mut self.node_mut(root)?.kind
        {
            *a = axis;
            *children = vec![inner];
            *shares = vec![1.0];
        }
        report.record(Change::ItemAdded(inner));
        Ok(root)
    }

    /// Remove an item and its whole subtree, then simplify the tree.
    pub fn remove_item(
        &mut self,
        id: ItemId,
        report: &mut MutationReport,
    ) -> Result<(), LayoutError> {
        let record = self.require(id)?.clone();
        let Some(parent) = record.parent else {
            // Removing the root means clearing the tree.
            let removed: Vec<ItemId> = self
                .nodes
                .keys()
                .copied()
                .filter(|node| *node != self.root)
                .collect();
            for node in removed {
                self.nodes.remove(&node);
                report.record(Change::ItemRemoved(node));
            }
            if let ItemKind::Container {
                children, shares, ..
            } = &mut self.node_mut(self.root)?.kind
            {
                children.clear();
                shares.clear();
            }
            return Ok(());
        };

        self.drop_subtree(id, report);
        if let ItemKind::Container {
            children, shares, ..
        } = &mut self.node_mut(parent)?.kind
        {
            if let Some(slot) = children.iter().position(|child| *child == id) {
                children.remove(slot);
                shares.remove(slot);
            }
            let total: f64 = shares.iter().sum();
            if total > 0.0 {
                for share in shares.iter_mut() {
                    *share /= total;
                }
            }
        }
        debug!(item = id.get(), "item removed");
        let survivor = self.simplify(parent, report)?;
        self.relayout(survivor, report);
        Ok(())
    }

    fn drop_subtree(&mut self, id: ItemId, report: &mut MutationReport) {
        let children = match self.nodes.get(&id).map(|record| &record.kind) {
            Some(ItemKind::Container { children, .. }) => children.clone(),
            _ => Vec::new(),
        };
        for child in children {
            self.drop_subtree(child, report);
        }
        self.nodes.remove(&id);
        self.infeasible.remove(&id);
        report.record(Change::ItemRemoved(id));
    }

    /// Prune empty containers and collapse single-child containers upward
    /// from `container`. Returns the surviving ancestor to re-solve.
    fn simplify(
        &mut self,
        container: ItemId,
        report: &mut MutationReport,
    ) -> Result<ItemId, LayoutError> {
        let (_, children, _) = self.container_parts(container)?;

        if container == self.root {
            // The root may hold any number of children, but a lone container
            // child is degenerate: adopt its contents.
            if children.len() == 1 {
                let only = children[0];
                if let Ok((axis, grandchildren, shares)) = self.container_parts(only) {
                    for grandchild in &grandchildren {
                        self.node_mut(*grandchild)?.parent = Some(container);
                    }
                    if let ItemKind::Container {
                        axis: a,
                        children,
                        shares: s,
                    } = &mut self.node_mut(container)?.kind
                    {
                        *a = axis;
                        *children = grandchildren;
                        *s = shares;
                    }
                    self.nodes.remove(&only);
                    self.infeasible.remove(&only);
                    report.record(Change::ItemRemoved(only));
                }
            }
            return Ok(container);
        }

        let parent = self
            .require(container)?
            .parent
            .ok_or(LayoutError::ItemNotFound { item: container })?;

        if children.is_empty() {
            self.nodes.remove(&container);
            self.infeasible.remove(&container);
            report.record(Change::ItemRemoved(container));
            if let ItemKind::Container {
                children, shares, ..
            } = &mut self.node_mut(parent)?.kind
            {
                if let Some(slot) = children.iter().position(|child| *child == container) {
                    children.remove(slot);
                    shares.remove(slot);
                }
                let total: f64 = shares.iter().sum();
                if total > 0.0 {
                    for share in shares.iter_mut() {
                        *share /= total;
                    }
                }
            }
            return self.simplify(parent, report);
        }

        if children.len() == 1 {
            let only = children[0];
            let geometry = self.require(container)?.geometry;
            if let ItemKind::Container { children, .. } = &mut self.node_mut(parent)?.kind {
                if let Some(slot) = children.iter().position(|child| *child == container) {
                    children[slot] = only;
                }
            }
            self.node_mut(only)?.parent = Some(parent);
            self.node_mut(only)?.geometry = geometry;
            report.record(Change::Geometry(only));
            self.nodes.remove(&container);
            self.infeasible.remove(&container);
            report.record(Change::ItemRemoved(container));
            return self.simplify(parent, report);
        }

        Ok(container)
    }

    /// Toggle an item's visibility. Hidden items keep their share so their
    /// proportion is restored on re-show; siblings absorb the space meanwhile.
    pub fn set_item_visible(
        &mut self,
        id: ItemId,
        visible: bool,
    ) -> Result<MutationReport, LayoutError> {
        let mut report = MutationReport::default();
        let record = self.node_mut(id)?;
        if record.visible == visible {
            return Ok(report);
        }
        record.visible = visible;
        report.record(Change::Visibility(id));
        if let Some(parent) = self.require(id)?.parent {
            self.relayout(parent, &mut report);
        }
        Ok(report)
    }

    /// Attach an existing parentless node as a child of `container`.
    ///
    /// Used when grafting copied subtrees; the caller guarantees `child` was
    /// produced by [`Self::copy_subtree_into`] with no parent.
    pub(crate) fn attach_child(
        &mut self,
        container: ItemId,
        index: usize,
        child: ItemId,
        share: Option<f64>,
        report: &mut MutationReport,
    ) -> Result<(), LayoutError> {
        let (_, children, _) = self.container_parts(container)?;
        if let Some(share) = share
            && !(share > 0.0 && share <= 1.0)
        {
            return Err(LayoutError::InvalidShare { share });
        }
        let share = share.unwrap_or(1.0 / (children.len() + 1) as f64);
        let index = index.min(children.len());

        self.node_mut(child)?.parent = Some(container);
        if let ItemKind::Container {
            children, shares, ..
        } = &mut self.node_mut(container)?.kind
        {
            let scale = 1.0 - share;
            for value in shares.iter_mut() {
                *value = (*value * scale).max(f64::MIN_POSITIVE);
            }
            children.insert(index, child);
            shares.insert(index, share);
        }
        report.record(Change::ItemAdded(child));
        self.relayout(container, report);
        Ok(())
    }

    /// Deep-copy the subtree rooted at `src` into `dst` under `dst_parent`,
    /// allocating fresh IDs. Relative shares inside the subtree are kept;
    /// positioning in `dst` is up to the caller's next relayout.
    pub fn copy_subtree_into(
        &self,
        src: ItemId,
        dst: &mut ItemTree,
        dst_parent: Option<ItemId>,
    ) -> Result<ItemId, LayoutError> {
        let record = self.require(src)?;
        let id = dst.alloc_id()?;
        let mut copy = record.clone();
        copy.id = id;
        copy.parent = dst_parent;
        if let ItemKind::Container { children, .. } = &mut copy.kind {
            children.clear();
        }
        dst.nodes.insert(id, copy);

        if let ItemKind::Container {
            children, shares, ..
        } = &record.kind
        {
            let shares = shares.clone();
            let mut new_children = Vec::with_capacity(children.len());
            for child in children {
                new_children.push(self.copy_subtree_into(*child, dst, Some(id))?);
            }
            if let Some(ItemRecord {
                kind:
                    ItemKind::Container {
                        children: dst_children,
                        shares: dst_shares,
                        ..
                    },
                ..
            }) = dst.nodes.get_mut(&id)
            {
                *dst_children = new_children;
                *dst_shares = shares;
            }
        }
        Ok(id)
    }

    // -----------------------------------------------------------------
    // Snapshots and diagnostics
    // -----------------------------------------------------------------

    /// Serialize into the canonical snapshot shape.
    #[must_use]
    pub fn to_snapshot(&self) -> ItemTreeSnapshot {
        let mut snapshot = ItemTreeSnapshot {
            schema_version: ITEM_TREE_SCHEMA_VERSION,
            root: self.root,
            next_id: self.next_id,
            nodes: self.nodes.values().cloned().collect(),
            extensions: BTreeMap::new(),
        };
        snapshot.canonicalize();
        snapshot
    }

    /// Rebuild a tree from a snapshot, validating structural invariants.
    pub fn from_snapshot(snapshot: ItemTreeSnapshot) -> Result<Self, TreeError> {
        let mut nodes = BTreeMap::new();
        for record in snapshot.nodes {
            record.constraints.validate(record.id)?;
            let id = record.id;
            if nodes.insert(id, record).is_some() {
                return Err(TreeError::DuplicateItemId { item: id });
            }
        }
        let tree = Self {
            root: snapshot.root,
            next_id: snapshot.next_id,
            nodes,
            infeasible: BTreeSet::new(),
        };
        tree.validate()?;
        Ok(tree)
    }

    /// Strict structural validation; the error form of [`Self::check_sanity`].
    pub fn validate(&self) -> Result<(), TreeError> {
        let Some(root) = self.nodes.get(&self.root) else {
            return Err(TreeError::MissingRoot { root: self.root });
        };
        if root.parent.is_some() {
            return Err(TreeError::RootHasParent { root: self.root });
        }
        if !root.kind.is_container() {
            return Err(TreeError::RootNotContainer { root: self.root });
        }

        let mut reachable = BTreeSet::new();
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            if !reachable.insert(id) {
                continue;
            }
            let Some(record) = self.nodes.get(&id) else {
                continue;
            };
            if let ItemKind::Container {
                children, shares, ..
            } = &record.kind
            {
                if children.len() != shares.len() {
                    return Err(TreeError::ShareCountMismatch { parent: id });
                }
                let mut seen = BTreeSet::new();
                for (index, child) in children.iter().enumerate() {
                    if !seen.insert(*child) {
                        return Err(TreeError::DuplicateChild {
                            parent: id,
                            child: *child,
                        });
                    }
                    let Some(child_record) = self.nodes.get(child) else {
                        return Err(TreeError::MissingChild {
                            parent: id,
                            child: *child,
                        });
                    };
                    if child_record.parent != Some(id) {
                        return Err(TreeError::ParentMismatch {
                            parent: id,
                            child: *child,
                        });
                    }
                    let share = shares[index];
                    if !(share.is_finite() && share > 0.0 && share <= 1.0) {
                        return Err(TreeError::InvalidShareValue { parent: id, index });
                    }
                    stack.push(*child);
                }
            }
        }
        for id in self.nodes.keys() {
            if !reachable.contains(id) {
                return Err(TreeError::UnreachableItem { item: *id });
            }
            if *id >= self.next_id {
                return Err(TreeError::NextIdNotGreaterThanExisting {
                    next_id: self.next_id,
                });
            }
        }
        Ok(())
    }

    /// Deterministic hash over canonical tree state.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        self.to_snapshot().state_hash()
    }

    /// Consistency predicate over every invariant the mutations maintain.
    ///
    /// Structural findings are errors (programming bugs in mutation paths);
    /// geometry findings on containers currently flagged infeasible are
    /// downgraded to warnings, since best-effort sizing is expected there.
    #[must_use]
    pub fn check_sanity(&self) -> SanityReport {
        let mut issues = Vec::new();

        if let Err(error) = self.validate() {
            issues.push(SanityIssue {
                code: structural_code(error),
                severity: SanitySeverity::Error,
                item: None,
                related: None,
                message: error.to_string(),
            });
            return SanityReport {
                state_hash: self.state_hash(),
                issues,
            };
        }

        let mut seen_docks: BTreeMap<String, ItemId> = BTreeMap::new();
        for record in self.nodes.values() {
            match &record.kind {
                ItemKind::Container { children, .. } => {
                    if record.id != self.root {
                        if children.is_empty() {
                            issues.push(SanityIssue {
                                code: SanityCode::EmptyContainer,
                                severity: SanitySeverity::Error,
                                item: Some(record.id),
                                related: None,
                                message: "non-root container has no children".to_string(),
                            });
                        } else if children.len() == 1 {
                            issues.push(SanityIssue {
                                code: SanityCode::DegenerateContainer,
                                severity: SanitySeverity::Error,
                                item: Some(record.id),
                                related: None,
                                message: "non-root container has a single child".to_string(),
                            });
                        }
                    }
                    self.check_container_geometry(record, &mut issues);
                }
                ItemKind::Leaf(group) => {
                    if group.is_empty() {
                        issues.push(SanityIssue {
                            code: SanityCode::EmptyGroup,
                            severity: SanitySeverity::Error,
                            item: Some(record.id),
                            related: None,
                            message: "group leaf hosts no dock widgets".to_string(),
                        });
                    }
                    for tab in group.tabs() {
                        if let Some(previous) = seen_docks.insert(tab.clone(), record.id) {
                            issues.push(SanityIssue {
                                code: SanityCode::DuplicateDockName,
                                severity: SanitySeverity::Error,
                                item: Some(record.id),
                                related: Some(previous),
                                message: format!("dock widget {tab:?} hosted twice"),
                            });
                        }
                    }
                }
                ItemKind::Placeholder { dock_name } => {
                    if let Some(previous) = seen_docks.insert(dock_name.clone(), record.id) {
                        issues.push(SanityIssue {
                            code: SanityCode::DuplicateDockName,
                            severity: SanitySeverity::Error,
                            item: Some(record.id),
                            related: Some(previous),
                            message: format!("dock widget {dock_name:?} hosted twice"),
                        });
                    }
                }
            }
        }

        SanityReport {
            state_hash: self.state_hash(),
            issues,
        }
    }

    fn check_container_geometry(&self, record: &ItemRecord, issues: &mut Vec<SanityIssue>) {
        let ItemKind::Container { axis, children, .. } = &record.kind else {
            return;
        };
        let visible: Vec<&ItemRecord> = children
            .iter()
            .filter_map(|child| self.nodes.get(child))
            .filter(|child| child.visible)
            .collect();
        if visible.is_empty() || record.geometry.is_empty() {
            return;
        }

        let severity = if self.infeasible.contains(&record.id) {
            SanitySeverity::Warning
        } else {
            SanitySeverity::Error
        };

        let (extent, cross) = project(record.geometry.size(), *axis);
        let separators = SEPARATOR_THICKNESS * (visible.len() as i32 - 1);
        let sum: i32 = visible
            .iter()
            .map(|child| project(child.geometry.size(), *axis).0)
            .sum();
        if sum + separators != extent {
            issues.push(SanityIssue {
                code: SanityCode::GeometrySumMismatch,
                severity,
                item: Some(record.id),
                related: None,
                message: format!(
                    "children sum to {} but container extent is {extent}",
                    sum + separators
                ),
            });
        }
        for child in &visible {
            let (_, child_cross) = project(child.geometry.size(), *axis);
            if child_cross != cross {
                issues.push(SanityIssue {
                    code: SanityCode::CrossExtentMismatch,
                    severity,
                    item: Some(child.id),
                    related: Some(record.id),
                    message: format!(
                        "child cross extent {child_cross} differs from container {cross}"
                    ),
                });
            }
            if child.geometry.intersection(&record.geometry) != Some(child.geometry) {
                issues.push(SanityIssue {
                    code: SanityCode::ChildOutsideParent,
                    severity,
                    item: Some(child.id),
                    related: Some(record.id),
                    message: "child geometry not contained in parent".to_string(),
                });
            }
        }
    }
}

fn structural_code(error: TreeError) -> SanityCode {
    match error {
        TreeError::MissingRoot { .. } => SanityCode::MissingRoot,
        TreeError::RootHasParent { .. } => SanityCode::RootHasParent,
        TreeError::RootNotContainer { .. } => SanityCode::RootNotContainer,
        TreeError::MissingChild { .. } => SanityCode::MissingChild,
        TreeError::ParentMismatch { .. } => SanityCode::ParentMismatch,
        TreeError::DuplicateChild { .. } => SanityCode::DuplicateChild,
        TreeError::UnreachableItem { .. } => SanityCode::UnreachableItem,
        TreeError::ShareCountMismatch { .. } => SanityCode::ShareCountMismatch,
        TreeError::InvalidShareValue { .. } => SanityCode::InvalidShare,
        TreeError::InvalidConstraint { .. } => SanityCode::InvalidConstraint,
        TreeError::NextIdNotGreaterThanExisting { .. } => SanityCode::NextIdNotGreaterThanExisting,
        _ => SanityCode::MissingRoot,
    }
}

/// Project a size onto (along, across) for the given stacking axis.
const fn project(size: Size, axis: Axis) -> (i32, i32) {
    match axis {
        Axis::Horizontal => (size.width, size.height),
        Axis::Vertical => (size.height, size.width),
    }
}

const fn unproject(along: i32, across: i32, axis: Axis) -> Size {
    match axis {
        Axis::Horizontal => Size::new(along, across),
        Axis::Vertical => Size::new(across, along),
    }
}

fn tighten(a: Option<i32>, b: Option<i32>) -> Option<i32> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (Some(a), None) => Some(a),
        (None, b) => b,
    }
}

/// Distribute `available` among weighted children, clamping to bounds and
/// redistributing slack in ascending index order until converged.
///
/// Returns the solved extents plus a shortfall: positive when hard maximums
/// had to be violated to fill the extent, negative when hard minimums
/// overflow it. Zero means fully feasible.
fn solve_extents(available: i32, weights: &[f64], bounds: &[AxisBounds]) -> (Vec<i32>, i32) {
    let count = weights.len();
    if count == 0 {
        return (Vec::new(), 0);
    }
    let total_weight: f64 = weights.iter().sum();
    let total_weight = if total_weight > 0.0 { total_weight } else { 1.0 };

    // Ideal proportional extents, remainder to the first children.
    let mut sizes: Vec<i32> = weights
        .iter()
        .map(|weight| ((weight / total_weight) * f64::from(available)).floor() as i32)
        .collect();
    let mut leftover = available - sizes.iter().sum::<i32>();
    let mut index = 0;
    while leftover > 0 && count > 0 {
        sizes[index % count] += 1;
        leftover -= 1;
        index += 1;
    }

    // Clamp, then move slack between unclamped children, lowest index first.
    for (size, bound) in sizes.iter_mut().zip(bounds) {
        *size = bound.clamp(*size);
    }
    let mut slack = available - sizes.iter().sum::<i32>();
    loop {
        if slack == 0 {
            return (sizes, 0);
        }
        let adjustable: Vec<usize> = (0..count)
            .filter(|i| {
                if slack > 0 {
                    match bounds[*i].max {
                        Some(max) => sizes[*i] < max,
                        None => true,
                    }
                } else {
                    sizes[*i] > bounds[*i].min
                }
            })
            .collect();
        if adjustable.is_empty() {
            break;
        }
        let step = slack / adjustable.len() as i32;
        let mut remainder = slack % adjustable.len() as i32;
        let mut moved = 0;
        for i in adjustable {
            let mut delta = step;
            if remainder != 0 {
                delta += remainder.signum();
                remainder -= remainder.signum();
            }
            let target = bounds[i].clamp(sizes[i] + delta);
            moved += target - sizes[i];
            sizes[i] = target;
        }
        slack -= moved;
        if moved == 0 {
            break;
        }
    }

    if slack > 0 {
        // Every child pinned at max: overshoot maximums, lowest index first.
        let shortfall = slack;
        let step = slack / count as i32;
        let mut remainder = slack % count as i32;
        for size in sizes.iter_mut() {
            let mut delta = step;
            if remainder > 0 {
                delta += 1;
                remainder -= 1;
            }
            *size += delta;
        }
        return (sizes, shortfall);
    }
    // Every child pinned at min: the children overflow the container.
    (sizes, slack)
}

// FNV-1a over the canonical snapshot encoding. Deterministic across
// platforms, for diagnostics and round-trip assertions only.
fn snapshot_state_hash(snapshot: &ItemTreeSnapshot) -> u64 {
    const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0001_0000_01b3;

    fn mix(hash: &mut u64, byte: u8) {
        *hash ^= u64::from(byte);
        *hash = hash.wrapping_mul(PRIME);
    }

    fn mix_bytes(hash: &mut u64, bytes: &[u8]) {
        for byte in bytes {
            mix(hash, *byte);
        }
    }

    fn mix_u16(hash: &mut u64, value: u16) {
        mix_bytes(hash, &value.to_le_bytes());
    }

    fn mix_i32(hash: &mut u64, value: i32) {
        mix_bytes(hash, &value.to_le_bytes());
    }

    fn mix_u64(hash: &mut u64, value: u64) {
        mix_bytes(hash, &value.to_le_bytes());
    }

    fn mix_opt_i32(hash: &mut u64, value: Option<i32>) {
        match value {
            Some(value) => {
                mix(hash, 1);
                mix_i32(hash, value);
            }
            None => mix(hash, 0),
        }
    }

    fn mix_str(hash: &mut u64, value: &str) {
        mix_u64(hash, value.len() as u64);
        mix_bytes(hash, value.as_bytes());
    }

    let mut hash = OFFSET_BASIS;
    mix_u16(&mut hash, snapshot.schema_version);
    mix_u64(&mut hash, snapshot.root.get());
    mix_u64(&mut hash, snapshot.next_id.get());
    mix_u64(&mut hash, snapshot.nodes.len() as u64);

    for node in &snapshot.nodes {
        mix_u64(&mut hash, node.id.get());
        mix_u64(&mut hash, node.parent.map_or(0, ItemId::get));
        mix_i32(&mut hash, node.geometry.x);
        mix_i32(&mut hash, node.geometry.y);
        mix_i32(&mut hash, node.geometry.width);
        mix_i32(&mut hash, node.geometry.height);
        mix_i32(&mut hash, node.constraints.min_width);
        mix_i32(&mut hash, node.constraints.min_height);
        mix_opt_i32(&mut hash, node.constraints.max_width);
        mix_opt_i32(&mut hash, node.constraints.max_height);
        mix(&mut hash, u8::from(node.visible));
        match &node.kind {
            ItemKind::Leaf(group) => {
                mix(&mut hash, 1);
                mix_u64(&mut hash, group.tab_count() as u64);
                for tab in group.tabs() {
                    mix_str(&mut hash, tab);
                }
                mix_u64(&mut hash, group.current_index() as u64);
                for affinity in &group.affinities {
                    mix_str(&mut hash, affinity);
                }
            }
            ItemKind::Placeholder { dock_name } => {
                mix(&mut hash, 2);
                mix_str(&mut hash, dock_name);
            }
            ItemKind::Container {
                axis,
                children,
                shares,
            } => {
                mix(&mut hash, 3);
                mix(&mut hash, matches!(axis, Axis::Vertical) as u8);
                mix_u64(&mut hash, children.len() as u64);
                for child in children {
                    mix_u64(&mut hash, child.get());
                }
                for share in shares {
                    mix_u64(&mut hash, share.to_bits());
                }
            }
        }
        for (key, value) in &node.extensions {
            mix_str(&mut hash, key);
            mix_str(&mut hash, value);
        }
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(name: &str) -> ItemKind {
        ItemKind::Leaf(Group::single(name))
    }

    fn tree_with_two() -> (ItemTree, ItemId, ItemId) {
        let mut tree = ItemTree::new(Rect::new(0, 0, 805, 600));
        let mut report = MutationReport::default();
        let a = tree
            .insert_into_container(
                tree.root(),
                0,
                leaf("a"),
                SizeConstraints::default(),
                None,
                &mut report,
            )
            .expect("insert a");
        let b = tree
            .insert_into_container(
                tree.root(),
                1,
                leaf("b"),
                SizeConstraints::default(),
                None,
                &mut report,
            )
            .expect("insert b");
        (tree, a, b)
    }

    #[test]
    fn singleton_fills_area() {
        let mut tree = ItemTree::new(Rect::new(0, 0, 400, 300));
        let mut report = MutationReport::default();
        let a = tree
            .insert_into_container(
                tree.root(),
                0,
                leaf("a"),
                SizeConstraints::default(),
                None,
                &mut report,
            )
            .expect("insert");
        assert_eq!(tree.node(a).expect("a").geometry, Rect::new(0, 0, 400, 300));
        assert!(!tree.check_sanity().has_errors());
    }

    #[test]
    fn two_children_split_evenly_with_separator() {
        let (tree, a, b) = tree_with_two();
        let rect_a = tree.node(a).expect("a").geometry;
        let rect_b = tree.node(b).expect("b").geometry;
        assert_eq!(rect_a, Rect::new(0, 0, 400, 600));
        assert_eq!(rect_b, Rect::new(405, 0, 400, 600));
        assert!(!tree.check_sanity().has_errors());
    }

    #[test]
    fn resize_preserves_proportions() {
        let (mut tree, a, b) = tree_with_two();
        // Skew to 3:1 via separator drag, then resize.
        tree.drag_separator(tree.root(), 0, 200).expect("drag");
        let before_a = tree.node(a).expect("a").geometry.width;
        let before_b = tree.node(b).expect("b").geometry.width;
        assert_eq!(before_a, 600);
        assert_eq!(before_b, 200);

        let report = tree.resize(Rect::new(0, 0, 405, 600));
        assert!(!report.is_infeasible());
        let after_a = tree.node(a).expect("a").geometry.width;
        let after_b = tree.node(b).expect("b").geometry.width;
        assert_eq!(after_a + after_b + SEPARATOR_THICKNESS, 405);
        assert_eq!(after_a, 300);
        assert_eq!(after_b, 100);
        assert!(!tree.check_sanity().has_errors());
    }

    #[test]
    fn minimums_steal_space_from_lowest_index_first() {
        let mut tree = ItemTree::new(Rect::new(0, 0, 305, 100));
        let mut report = MutationReport::default();
        let constrained = SizeConstraints {
            min_width: 200,
            ..SizeConstraints::default()
        };
        let a = tree
            .insert_into_container(
                tree.root(),
                0,
                leaf("a"),
                SizeConstraints::default(),
                None,
                &mut report,
            )
            .expect("a");
        let b = tree
            .insert_into_container(tree.root(), 1, leaf("b"), constrained, None, &mut report)
            .expect("b");
        assert_eq!(tree.node(b).expect("b").geometry.width, 200);
        assert_eq!(tree.node(a).expect("a").geometry.width, 100);
        assert!(!tree.check_sanity().has_errors());
    }

    #[test]
    fn infeasible_minimums_are_reported_not_fatal() {
        let mut tree = ItemTree::new(Rect::new(0, 0, 105, 100));
        let mut report = MutationReport::default();
        let constrained = SizeConstraints {
            min_width: 100,
            ..SizeConstraints::default()
        };
        tree.insert_into_container(tree.root(), 0, leaf("a"), constrained, None, &mut report)
            .expect("a");
        let mut report = MutationReport::default();
        tree.insert_into_container(tree.root(), 1, leaf("b"), constrained, None, &mut report)
            .expect("b");
        assert!(report.is_infeasible());
        // Sanity downgrades geometry findings on infeasible containers.
        let sanity = tree.check_sanity();
        assert!(!sanity.has_errors());
    }

    #[test]
    fn extent_below_separator_sum_is_infeasible_not_unsound() {
        let (mut tree, _, _) = tree_with_two();
        let report = tree.resize(Rect::new(0, 0, 3, 600));
        assert!(report.is_infeasible());
        assert!(!tree.check_sanity().has_errors());

        // Growing back clears the flag and re-tightens sanity.
        let report = tree.resize(Rect::new(0, 0, 805, 600));
        assert!(!report.is_infeasible());
        assert!(!tree.check_sanity().has_errors());
    }

    #[test]
    fn separator_drag_is_clamped_by_neighbor_min() {
        let mut tree = ItemTree::new(Rect::new(0, 0, 805, 600));
        let mut report = MutationReport::default();
        let constrained = SizeConstraints {
            min_width: 300,
            ..SizeConstraints::default()
        };
        let a = tree
            .insert_into_container(
                tree.root(),
                0,
                leaf("a"),
                SizeConstraints::default(),
                None,
                &mut report,
            )
            .expect("a");
        let b = tree
            .insert_into_container(tree.root(), 1, leaf("b"), constrained, None, &mut report)
            .expect("b");
        tree.drag_separator(tree.root(), 0, 500).expect("drag");
        assert_eq!(tree.node(b).expect("b").geometry.width, 300);
        assert_eq!(tree.node(a).expect("a").geometry.width, 500);
        assert!(!tree.check_sanity().has_errors());
    }

    #[test]
    fn remove_collapses_single_child_containers() {
        let (mut tree, a, b) = tree_with_two();
        let mut report = MutationReport::default();
        // Split b vertically: wrap it, then add a sibling below.
        let wrapper = tree.wrap_in_container(b, Axis::Vertical, &mut report).expect("wrap");
        tree.insert_into_container(
            wrapper,
            1,
            leaf("c"),
            SizeConstraints::default(),
            None,
            &mut report,
        )
        .expect("c");
        tree.relayout(tree.root(), &mut report);
        assert!(!tree.check_sanity().has_errors());

        // Removing c must collapse the wrapper back into the root.
        let c = tree.leaf_for_dock("c").expect("c exists");
        let mut report = MutationReport::default();
        tree.remove_item(c, &mut report).expect("remove");
        assert!(tree.node(wrapper).is_none());
        assert_eq!(tree.node(b).expect("b").parent, Some(tree.root()));
        assert!(!tree.check_sanity().has_errors());

        // And removing b leaves a single leaf filling the root.
        let mut report = MutationReport::default();
        tree.remove_item(b, &mut report).expect("remove b");
        assert_eq!(
            tree.node(a).expect("a").geometry,
            Rect::new(0, 0, 805, 600)
        );
        assert!(!tree.check_sanity().has_errors());
    }

    #[test]
    fn remove_last_leaf_collapses_to_empty_root() {
        let mut tree = ItemTree::new(Rect::new(0, 0, 400, 300));
        let mut report = MutationReport::default();
        let a = tree
            .insert_into_container(
                tree.root(),
                0,
                leaf("a"),
                SizeConstraints::default(),
                None,
                &mut report,
            )
            .expect("a");
        let mut report = MutationReport::default();
        tree.remove_item(a, &mut report).expect("remove");
        assert!(tree.is_empty());
        assert_eq!(tree.len(), 1);
        assert!(!tree.check_sanity().has_errors());
    }

    #[test]
    fn hide_redistributes_and_show_restores() {
        let (mut tree, a, b) = tree_with_two();
        tree.set_item_visible(b, false).expect("hide");
        assert_eq!(
            tree.node(a).expect("a").geometry,
            Rect::new(0, 0, 805, 600)
        );
        tree.set_item_visible(b, true).expect("show");
        assert_eq!(tree.node(a).expect("a").geometry.width, 400);
        assert_eq!(tree.node(b).expect("b").geometry.width, 400);
    }

    #[test]
    fn snapshot_round_trip_is_exact() {
        let (mut tree, _, _) = tree_with_two();
        tree.drag_separator(tree.root(), 0, 123).expect("drag");
        let snapshot = tree.to_snapshot();
        let restored = ItemTree::from_snapshot(snapshot.clone()).expect("restore");
        assert_eq!(restored.to_snapshot(), snapshot);
        assert_eq!(restored.state_hash(), tree.state_hash());
    }

    #[test]
    fn validate_rejects_parent_mismatch() {
        let (tree, a, _) = tree_with_two();
        let mut snapshot = tree.to_snapshot();
        for node in &mut snapshot.nodes {
            if node.id == a {
                node.parent = None;
            }
        }
        assert!(matches!(
            ItemTree::from_snapshot(snapshot),
            Err(TreeError::ParentMismatch { .. })
        ));
    }

    #[test]
    fn layout_equally_evens_out_shares() {
        let (mut tree, a, b) = tree_with_two();
        tree.drag_separator(tree.root(), 0, 250).expect("drag");
        tree.layout_equally(tree.root()).expect("equalize");
        assert_eq!(tree.node(a).expect("a").geometry.width, 400);
        assert_eq!(tree.node(b).expect("b").geometry.width, 400);
    }

    #[test]
    fn min_size_aggregates_bottom_up() {
        let mut tree = ItemTree::new(Rect::new(0, 0, 805, 600));
        let mut report = MutationReport::default();
        let constraints = SizeConstraints {
            min_width: 100,
            min_height: 50,
            ..SizeConstraints::default()
        };
        tree.insert_into_container(tree.root(), 0, leaf("a"), constraints, None, &mut report)
            .expect("a");
        tree.insert_into_container(tree.root(), 1, leaf("b"), constraints, None, &mut report)
            .expect("b");
        let min = tree.min_size(tree.root());
        assert_eq!(min.width, 100 + 100 + SEPARATOR_THICKNESS);
        assert_eq!(min.height, 50);
    }

    #[test]
    fn max_size_sums_only_when_all_bounded() {
        let mut tree = ItemTree::new(Rect::new(0, 0, 805, 600));
        let mut report = MutationReport::default();
        let bounded = SizeConstraints {
            max_width: Some(300),
            max_height: Some(400),
            ..SizeConstraints::default()
        };
        tree.insert_into_container(tree.root(), 0, leaf("a"), bounded, None, &mut report)
            .expect("a");
        assert_eq!(tree.max_size(tree.root()).0, Some(300));

        tree.insert_into_container(
            tree.root(),
            1,
            leaf("b"),
            SizeConstraints::default(),
            None,
            &mut report,
        )
        .expect("b");
        // One unbounded child makes the stacking axis unbounded.
        assert_eq!(tree.max_size(tree.root()).0, None);
        // Cross axis takes the tightest bound.
        assert_eq!(tree.max_size(tree.root()).1, Some(400));
    }

    #[test]
    fn separators_are_derived_between_visible_children() {
        let (tree, _, _) = tree_with_two();
        let separators = tree.separators(tree.root()).expect("separators");
        assert_eq!(separators.len(), 1);
        let separator = separators[0];
        assert_eq!(separator.orientation, Axis::Vertical);
        assert_eq!(separator.line, Rect::new(400, 0, SEPARATOR_THICKNESS, 600));
    }

    #[test]
    fn copy_subtree_preserves_shape_and_shares() {
        let (mut tree, _, b) = tree_with_two();
        let mut report = MutationReport::default();
        let wrapper = tree.wrap_in_container(b, Axis::Vertical, &mut report).expect("wrap");
        tree.insert_into_container(
            wrapper,
            1,
            leaf("c"),
            SizeConstraints::default(),
            None,
            &mut report,
        )
        .expect("c");
        tree.relayout(tree.root(), &mut report);

        let mut dst = ItemTree::new(Rect::new(0, 0, 400, 300));
        let dst_root = dst.root();
        let copied = tree
            .copy_subtree_into(wrapper, &mut dst, Some(dst_root))
            .expect("copy");
        if let ItemKind::Container {
            children, shares, ..
        } = &mut dst.nodes.get_mut(&dst.root()).expect("root").kind
        {
            children.push(copied);
            shares.push(1.0);
        }
        let mut report = MutationReport::default();
        dst.relayout(dst.root(), &mut report);
        assert!(!dst.check_sanity().has_errors());
        assert!(dst.leaf_for_dock("b").is_some());
        assert!(dst.leaf_for_dock("c").is_some());
    }
}

//! Drop area: the root layout surface of one top-level window.
//!
//! Owns the item tree and orchestrates every structural mutation: docking a
//! widget beside or on top of an existing group, removing one, resolving
//! placeholders after a restore, and absorbing a whole floating subtree on
//! drop. Every operation returns a [`MutationReport`] so hosts can replay
//! the observable changes against their views.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use dockline_core::geometry::{Point, Rect, Size};

use crate::error::LayoutError;
use crate::group::Group;
use crate::item::{
    Axis, Change, ItemId, ItemKind, ItemTree, MutationReport, SanityCode, SanityIssue,
    SanityReport, SanitySeverity, Separator, SizeConstraints,
};

/// Where to dock relative to a target group (or the whole area).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DockLocation {
    OnLeft,
    OnRight,
    OnTop,
    OnBottom,
    /// Merge into the target group as a new tab; the tree shape is unchanged.
    OnTabs,
}

impl DockLocation {
    /// Stacking axis a directional location splits along.
    #[must_use]
    pub const fn axis(self) -> Option<Axis> {
        match self {
            Self::OnLeft | Self::OnRight => Some(Axis::Horizontal),
            Self::OnTop | Self::OnBottom => Some(Axis::Vertical),
            Self::OnTabs => None,
        }
    }

    /// True when the new item lands after the target in child order.
    #[must_use]
    pub const fn is_after(self) -> bool {
        matches!(self, Self::OnRight | Self::OnBottom)
    }
}

/// Options for [`DropArea::add_dock_widget`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AddOptions {
    /// Share of the receiving container, in (0, 1]. `None` = equal share.
    pub share: Option<f64>,
    /// Dock hidden; the item reserves no space until shown.
    pub start_hidden: bool,
    /// Size bounds for the new item.
    pub constraints: SizeConstraints,
}

/// Root layout surface of one top-level window.
#[derive(Debug, Clone, PartialEq)]
pub struct DropArea {
    tree: ItemTree,
    dock_index: FxHashMap<String, ItemId>,
    /// Affinity names restricting which drags may drop here.
    pub affinities: Vec<String>,
}

impl DropArea {
    /// Create an empty drop area covering `area`.
    #[must_use]
    pub fn new(area: Rect, affinities: Vec<String>) -> Self {
        Self {
            tree: ItemTree::new(area),
            dock_index: FxHashMap::default(),
            affinities,
        }
    }

    /// Rebuild a drop area around a restored tree.
    #[must_use]
    pub fn from_tree(tree: ItemTree, affinities: Vec<String>) -> Self {
        let mut this = Self {
            tree,
            dock_index: FxHashMap::default(),
            affinities,
        };
        this.rebuild_index();
        this
    }

    /// The underlying item tree.
    #[must_use]
    pub fn tree(&self) -> &ItemTree {
        &self.tree
    }

    pub(crate) fn tree_mut(&mut self) -> &mut ItemTree {
        &mut self.tree
    }

    /// Area covered by this surface.
    #[must_use]
    pub fn area(&self) -> Rect {
        self.tree.area()
    }

    /// True when no dock widget (or placeholder) is hosted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Names of all hosted dock widgets and placeholders, sorted.
    #[must_use]
    pub fn dock_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.dock_index.keys().cloned().collect();
        names.sort();
        names
    }

    /// Leaf hosting the named dock widget, if any.
    #[must_use]
    pub fn item_for_dock(&self, dock_name: &str) -> Option<ItemId> {
        self.dock_index.get(dock_name).copied()
    }

    /// Group hosting the named dock widget, if it resolved to a live leaf.
    #[must_use]
    pub fn group_for_dock(&self, dock_name: &str) -> Option<&Group> {
        let item = self.item_for_dock(dock_name)?;
        match &self.tree.node(item)?.kind {
            ItemKind::Leaf(group) => Some(group),
            _ => None,
        }
    }

    /// Smallest size this surface can be resized to.
    #[must_use]
    pub fn min_size(&self) -> Size {
        self.tree.min_size(self.tree.root())
    }

    /// Largest size per axis, `None` meaning unbounded.
    #[must_use]
    pub fn max_size(&self) -> (Option<i32>, Option<i32>) {
        self.tree.max_size(self.tree.root())
    }

    /// Resize the surface and re-solve all geometry.
    pub fn resize(&mut self, size: Size) -> MutationReport {
        let area = self.area();
        self.tree.resize(Rect::new(area.x, area.y, size.width, size.height))
    }

    /// Separator rectangles of a container, in child order.
    pub fn separators(&self, container: ItemId) -> Result<Vec<Separator>, LayoutError> {
        self.tree.separators(container)
    }

    /// Drag the separator after visible child `index` by `delta` pixels,
    /// clamped so neither neighbor leaves its size bounds.
    pub fn drag_separator(
        &mut self,
        container: ItemId,
        index: usize,
        delta: i32,
    ) -> Result<MutationReport, LayoutError> {
        self.tree.drag_separator(container, index, delta)
    }

    /// Grow or shrink one child of a container, taking space from neighbors.
    pub fn request_resize_of_child(
        &mut self,
        container: ItemId,
        child: ItemId,
        delta: i32,
    ) -> Result<MutationReport, LayoutError> {
        self.tree.request_resize_of_child(container, child, delta)
    }

    /// Even out the shares of all children of a container.
    pub fn layout_equally(&mut self, container: ItemId) -> Result<MutationReport, LayoutError> {
        self.tree.layout_equally(container)
    }

    /// Even out the pair of children around one separator.
    pub fn equalize_pair(
        &mut self,
        container: ItemId,
        index: usize,
    ) -> Result<MutationReport, LayoutError> {
        self.tree.equalize_pair(container, index)
    }

    /// Dock a widget at `location`, optionally adjacent to the group hosting
    /// `relative_to` instead of splitting the whole area.
    ///
    /// Docking an already-hosted widget fails with an invalid-operation
    /// error; a stale placeholder for the same name is silently replaced.
    pub fn add_dock_widget(
        &mut self,
        dock_name: &str,
        location: DockLocation,
        relative_to: Option<&str>,
        options: AddOptions,
    ) -> Result<MutationReport, LayoutError> {
        self.add_group(
            Group::single(dock_name),
            location,
            relative_to,
            options,
        )
    }

    /// Dock a prebuilt group (tabs and affinities included).
    pub fn add_group(
        &mut self,
        group: Group,
        location: DockLocation,
        relative_to: Option<&str>,
        options: AddOptions,
    ) -> Result<MutationReport, LayoutError> {
        let mut report = MutationReport::default();

        for tab in group.tabs() {
            match self.dock_index.get(tab).copied() {
                Some(item)
                    if matches!(
                        self.tree.node(item).map(|record| &record.kind),
                        Some(ItemKind::Placeholder { .. })
                    ) =>
                {
                    // A restore reservation for this name; the explicit dock
                    // wins and the reservation is dropped.
                    self.tree.remove_item(item, &mut report)?;
                    self.dock_index.remove(tab);
                }
                Some(_) => {
                    return Err(LayoutError::AlreadyDocked {
                        dock_name: tab.clone(),
                    });
                }
                None => {}
            }
        }

        if let Some(relative) = relative_to
            && !self.dock_index.contains_key(relative)
        {
            return Err(LayoutError::DockNotFound {
                dock_name: relative.to_string(),
            });
        }

        match location.axis() {
            None => {
                let target = self.tab_target(relative_to)?;
                match target {
                    Some(item) => {
                        let names: Vec<String> = group.tabs().to_vec();
                        let record = self
                            .tree
                            .node(item)
                            .ok_or(LayoutError::ItemNotFound { item })?;
                        if !matches!(record.kind, ItemKind::Leaf(_)) {
                            return Err(LayoutError::NotAGroup { item });
                        }
                        self.merge_tabs(item, &names, &mut report)?;
                    }
                    None => {
                        // Empty area: the first dock simply fills it.
                        let root = self.tree.root();
                        let id = self.tree.insert_into_container(
                            root,
                            0,
                            ItemKind::Leaf(group.clone()),
                            options.constraints,
                            options.share,
                            &mut report,
                        )?;
                        self.index_group(&group, id);
                        if options.start_hidden {
                            report.merge(self.tree.set_item_visible(id, false)?);
                        }
                    }
                }
            }
            Some(axis) => {
                let (container, index) =
                    self.directional_anchor(axis, location.is_after(), relative_to, &mut report)?;
                let id = self.tree.insert_into_container(
                    container,
                    index,
                    ItemKind::Leaf(group.clone()),
                    options.constraints,
                    options.share,
                    &mut report,
                )?;
                self.index_group(&group, id);
                if options.start_hidden {
                    report.merge(self.tree.set_item_visible(id, false)?);
                }
            }
        }

        debug!(docks = ?group.tabs(), ?location, "dock widget added");
        debug_assert!(!self.check_sanity().has_errors() || report.is_infeasible());
        Ok(report)
    }

    /// Undock a widget. Emptied groups are pruned and the tree re-minimized
    /// within this same mutation.
    pub fn remove_dock_widget(&mut self, dock_name: &str) -> Result<MutationReport, LayoutError> {
        let item = self
            .dock_index
            .get(dock_name)
            .copied()
            .ok_or_else(|| LayoutError::DockNotFound {
                dock_name: dock_name.to_string(),
            })?;
        let mut report = MutationReport::default();

        let empty = match &mut self
            .tree
            .node_kind_mut(item)
            .ok_or(LayoutError::ItemNotFound { item })?
        {
            ItemKind::Leaf(group) => {
                group.remove_tab(dock_name);
                report.record(Change::TabsChanged(item));
                group.is_empty()
            }
            // Removing a placeholder just clears the reservation.
            ItemKind::Placeholder { .. } => true,
            ItemKind::Container { .. } => return Err(LayoutError::NotAGroup { item }),
        };

        self.dock_index.remove(dock_name);
        if empty {
            self.tree.remove_item(item, &mut report)?;
        }
        debug!(dock = dock_name, "dock widget removed");
        debug_assert!(!self.check_sanity().has_errors() || report.is_infeasible());
        Ok(report)
    }

    /// Resolve a placeholder left by a restore: the named dock widget now
    /// exists and takes over the reserved geometry unchanged.
    pub fn restore_placeholder(&mut self, dock_name: &str) -> Result<MutationReport, LayoutError> {
        let item = self
            .dock_index
            .get(dock_name)
            .copied()
            .ok_or_else(|| LayoutError::DockNotFound {
                dock_name: dock_name.to_string(),
            })?;
        let kind = self
            .tree
            .node_kind_mut(item)
            .ok_or(LayoutError::ItemNotFound { item })?;
        if !matches!(kind, ItemKind::Placeholder { .. }) {
            return Err(LayoutError::NotAPlaceholder {
                dock_name: dock_name.to_string(),
            });
        }
        *kind = ItemKind::Leaf(Group::single(dock_name));
        let mut report = MutationReport::default();
        report.changes.push(Change::TabsChanged(item));
        debug!(dock = dock_name, "placeholder resolved");
        Ok(report)
    }

    /// Show or hide a docked widget without removing it. Hiding a group's
    /// only visible dock hides the whole leaf; its extent redistributes to
    /// siblings and is restored proportionally on re-show.
    pub fn set_dock_visible(
        &mut self,
        dock_name: &str,
        visible: bool,
    ) -> Result<MutationReport, LayoutError> {
        let item = self
            .dock_index
            .get(dock_name)
            .copied()
            .ok_or_else(|| LayoutError::DockNotFound {
                dock_name: dock_name.to_string(),
            })?;
        self.tree.set_item_visible(item, visible)
    }

    /// Switch the shown tab of the group hosting `dock_name`.
    pub fn set_current_tab(&mut self, dock_name: &str) -> Result<MutationReport, LayoutError> {
        let item = self
            .dock_index
            .get(dock_name)
            .copied()
            .ok_or_else(|| LayoutError::DockNotFound {
                dock_name: dock_name.to_string(),
            })?;
        let kind = self
            .tree
            .node_kind_mut(item)
            .ok_or(LayoutError::ItemNotFound { item })?;
        let ItemKind::Leaf(group) = kind else {
            return Err(LayoutError::NotAGroup { item });
        };
        let Some(index) = group.tabs().iter().position(|tab| tab == dock_name) else {
            return Err(LayoutError::DockNotFound {
                dock_name: dock_name.to_string(),
            });
        };
        let mut report = MutationReport::default();
        if index != group.current_index() {
            group.set_current_index(index);
            report.changes.push(Change::TabsChanged(item));
        }
        Ok(report)
    }

    /// Absorb a foreign subtree (a dropped floating window's content) at
    /// `location`. Relative proportions of nested splits are preserved.
    pub fn absorb_subtree(
        &mut self,
        source: &ItemTree,
        source_item: ItemId,
        location: DockLocation,
        relative_to: Option<&str>,
        share: Option<f64>,
    ) -> Result<MutationReport, LayoutError> {
        let mut report = MutationReport::default();

        // A drop-area root with a single child would graft as a degenerate
        // wrapper; descend to the real content first.
        let mut source_item = source_item;
        while let Some(ItemKind::Container { children, .. }) =
            source.node(source_item).map(|record| &record.kind)
        {
            match children.as_slice() {
                [] => return Ok(report),
                [only] => source_item = *only,
                _ => break,
            }
        }

        match location.axis() {
            None => {
                let target = self.tab_target(relative_to)?;
                let names = collect_dock_names(source, source_item);
                match target {
                    Some(item) => self.merge_tabs(item, &names, &mut report)?,
                    None => {
                        // Empty area: graft the subtree as the sole child.
                        let root = self.tree.root();
                        let copied =
                            source.copy_subtree_into(source_item, &mut self.tree, None)?;
                        self.tree.attach_child(root, 0, copied, share, &mut report)?;
                        self.rebuild_index();
                    }
                }
            }
            Some(axis) => {
                let (container, index) =
                    self.directional_anchor(axis, location.is_after(), relative_to, &mut report)?;
                let copied = source.copy_subtree_into(source_item, &mut self.tree, None)?;
                self.tree
                    .attach_child(container, index, copied, share, &mut report)?;
                self.rebuild_index();
            }
        }

        debug_assert!(!self.check_sanity().has_errors() || report.is_infeasible());
        Ok(report)
    }

    /// Consistency predicate over the tree plus the dock-name index.
    #[must_use]
    pub fn check_sanity(&self) -> SanityReport {
        let mut report = self.tree.check_sanity();
        let mut expected: FxHashMap<&str, ItemId> = FxHashMap::default();
        for record in self.tree.nodes() {
            match &record.kind {
                ItemKind::Leaf(group) => {
                    for tab in group.tabs() {
                        expected.insert(tab, record.id);
                    }
                }
                ItemKind::Placeholder { dock_name } => {
                    expected.insert(dock_name, record.id);
                }
                ItemKind::Container { .. } => {}
            }
        }
        if expected.len() != self.dock_index.len()
            || expected
                .iter()
                .any(|(name, item)| self.dock_index.get(*name) != Some(item))
        {
            report.issues.push(SanityIssue {
                code: SanityCode::DockIndexMismatch,
                severity: SanitySeverity::Error,
                item: None,
                related: None,
                message: "dock-name index disagrees with tree leaves".to_string(),
            });
        }
        report
    }

    /// Deepest visible leaf under a window-local point.
    #[must_use]
    pub fn leaf_at(&self, point: Point) -> Option<ItemId> {
        self.tree.leaf_at(point)
    }

    pub(crate) fn rebuild_index(&mut self) {
        self.dock_index.clear();
        let entries: Vec<(String, ItemId)> = self
            .tree
            .nodes()
            .flat_map(|record| match &record.kind {
                ItemKind::Leaf(group) => group
                    .tabs()
                    .iter()
                    .map(|tab| (tab.clone(), record.id))
                    .collect::<Vec<_>>(),
                ItemKind::Placeholder { dock_name } => vec![(dock_name.clone(), record.id)],
                ItemKind::Container { .. } => Vec::new(),
            })
            .collect();
        self.dock_index.extend(entries);
    }

    fn index_group(&mut self, group: &Group, item: ItemId) {
        for tab in group.tabs() {
            self.dock_index.insert(tab.clone(), item);
        }
    }

    fn merge_tabs(
        &mut self,
        item: ItemId,
        names: &[String],
        report: &mut MutationReport,
    ) -> Result<(), LayoutError> {
        let kind = self
            .tree
            .node_kind_mut(item)
            .ok_or(LayoutError::ItemNotFound { item })?;
        let ItemKind::Leaf(group) = kind else {
            return Err(LayoutError::NotAGroup { item });
        };
        for name in names {
            group.add_tab(name.clone(), None);
        }
        report.record(Change::TabsChanged(item));
        for name in names {
            self.dock_index.insert(name.clone(), item);
        }
        Ok(())
    }

    /// Resolve the group an `OnTabs` drop lands in: the group hosting
    /// `relative_to` when given, otherwise the lowest-ID group leaf. `None`
    /// when the area is still empty.
    fn tab_target(&self, relative_to: Option<&str>) -> Result<Option<ItemId>, LayoutError> {
        if let Some(relative) = relative_to {
            let item = self
                .dock_index
                .get(relative)
                .copied()
                .ok_or_else(|| LayoutError::DockNotFound {
                    dock_name: relative.to_string(),
                })?;
            return Ok(Some(item));
        }
        Ok(self
            .tree
            .nodes()
            .find(|record| matches!(record.kind, ItemKind::Leaf(_)))
            .map(|record| record.id))
    }

    /// Resolve the container and child index a directional dock lands at,
    /// wrapping the target in an orthogonal container when needed (the split
    /// operation).
    fn directional_anchor(
        &mut self,
        axis: Axis,
        after: bool,
        relative_to: Option<&str>,
        report: &mut MutationReport,
    ) -> Result<(ItemId, usize), LayoutError> {
        match relative_to {
            None => {
                let root = self.tree.orient_root(axis, report)?;
                let count = match &self.tree.node(root).map(|record| &record.kind) {
                    Some(ItemKind::Container { children, .. }) => children.len(),
                    _ => 0,
                };
                Ok((root, if after { count } else { 0 }))
            }
            Some(relative) => {
                let target = self
                    .dock_index
                    .get(relative)
                    .copied()
                    .ok_or_else(|| LayoutError::DockNotFound {
                        dock_name: relative.to_string(),
                    })?;
                let parent = self
                    .tree
                    .node(target)
                    .and_then(|record| record.parent)
                    .ok_or(LayoutError::ItemNotFound { item: target })?;
                let parent_axis = match &self.tree.node(parent).map(|record| &record.kind) {
                    Some(ItemKind::Container { axis, .. }) => *axis,
                    _ => return Err(LayoutError::NotAContainer { item: parent }),
                };
                if parent_axis == axis {
                    let slot = match &self.tree.node(parent).map(|record| &record.kind) {
                        Some(ItemKind::Container { children, .. }) => children
                            .iter()
                            .position(|child| *child == target)
                            .unwrap_or(0),
                        _ => 0,
                    };
                    Ok((parent, if after { slot + 1 } else { slot }))
                } else {
                    let wrapper = self.tree.wrap_in_container(target, axis, report)?;
                    Ok((wrapper, usize::from(after)))
                }
            }
        }
    }
}

/// Dock names across every group leaf of a subtree, in ID order.
fn collect_dock_names(tree: &ItemTree, root: ItemId) -> Vec<String> {
    let mut names = Vec::new();
    let mut stack = vec![root];
    let mut ordered = Vec::new();
    while let Some(id) = stack.pop() {
        ordered.push(id);
        if let Some(record) = tree.node(id)
            && let ItemKind::Container { children, .. } = &record.kind
        {
            stack.extend(children.iter().copied());
        }
    }
    ordered.sort();
    for id in ordered {
        if let Some(record) = tree.node(id)
            && let ItemKind::Leaf(group) = &record.kind
        {
            names.extend(group.tabs().iter().cloned());
        }
    }
    names
}

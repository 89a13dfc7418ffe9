//! Top-level window registry.
//!
//! Tracks every main and floating window, routes pointer events through the
//! single process-wide [`DragController`], resolves drop candidates across
//! windows (floating above main), and commits drops as layout mutations.
//! Hosts drive it with [`WindowRegistry::handle_drag_event`] and replay the
//! returned [`RegistryEvent`]s against their views.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use dockline_core::geometry::{Point, Rect};

use crate::drag::{
    DragController, DragEffect, DragEvent, DragTransition, DropTargetResolver, WindowBeingDragged,
};
use crate::drop_area::{AddOptions, DockLocation, DropArea};
use crate::error::LayoutError;
use crate::group::Group;
use crate::indicator::{DropIndicatorOverlay, DropPlacement, DropTarget};
use crate::item::{ItemId, ItemKind, ItemTree, MutationReport};

/// Stable identifier for top-level windows.
///
/// `0` is reserved/invalid so IDs are always non-zero, and IDs are never
/// reused within a registry.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct WindowId(u64);

impl WindowId {
    /// Lowest valid window ID.
    pub const MIN: Self = Self(1);

    /// Create a new window ID, rejecting 0.
    #[must_use]
    pub fn new(raw: u64) -> Option<Self> {
        if raw == 0 { None } else { Some(Self(raw)) }
    }

    /// Get the raw numeric value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Return the next ID, or `None` on overflow.
    #[must_use]
    pub fn checked_next(self) -> Option<Self> {
        self.0.checked_add(1).and_then(Self::new)
    }
}

impl Default for WindowId {
    fn default() -> Self {
        Self::MIN
    }
}

/// Role of a top-level window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowKind {
    /// The host application's main window; closed only by the host.
    Main,
    /// A floating window; auto-closed when its last dock widget leaves.
    Floating,
}

/// Host-visible window state, persisted alongside geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowState {
    #[default]
    Normal,
    Maximized,
    Minimized,
}

/// One registered top-level window.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowRecord {
    pub id: WindowId,
    pub kind: WindowKind,
    /// Global (screen) geometry. The drop area's own coordinates are local.
    pub geometry: Rect,
    pub window_state: WindowState,
    pub area: DropArea,
}

/// Observable registry-level change, for hosts replaying against views.
#[derive(Debug, Clone, PartialEq)]
pub enum RegistryEvent {
    WindowOpened { window: WindowId },
    WindowClosed { window: WindowId },
    WindowMoved { window: WindowId, geometry: Rect },
    /// A drop area mutated; the report lists the affected items.
    Mutated {
        window: WindowId,
        report: MutationReport,
    },
    Drag(DragTransition),
}

/// Registry of all top-level windows plus the shared drag machinery.
#[derive(Debug, Default)]
pub struct WindowRegistry {
    windows: BTreeMap<WindowId, WindowRecord>,
    next_window_id: WindowId,
    drag: DragController,
    overlay: DropIndicatorOverlay,
}

impl WindowRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Open the host's main window with an empty drop area.
    pub fn open_main_window(
        &mut self,
        geometry: Rect,
        affinities: Vec<String>,
    ) -> Result<WindowId, LayoutError> {
        self.open_window(WindowKind::Main, geometry, affinities)
    }

    /// Open an empty floating window. Mostly useful for restores; drags
    /// create floating windows themselves.
    pub fn open_floating_window(
        &mut self,
        geometry: Rect,
        affinities: Vec<String>,
    ) -> Result<WindowId, LayoutError> {
        self.open_window(WindowKind::Floating, geometry, affinities)
    }

    fn open_window(
        &mut self,
        kind: WindowKind,
        geometry: Rect,
        affinities: Vec<String>,
    ) -> Result<WindowId, LayoutError> {
        let area = DropArea::new(Rect::new(0, 0, geometry.width, geometry.height), affinities);
        self.insert_window(kind, geometry, area)
    }

    pub(crate) fn insert_window(
        &mut self,
        kind: WindowKind,
        geometry: Rect,
        area: DropArea,
    ) -> Result<WindowId, LayoutError> {
        let id = self.next_window_id;
        self.next_window_id = id.checked_next().ok_or(LayoutError::WindowIdOverflow)?;
        self.windows.insert(
            id,
            WindowRecord {
                id,
                kind,
                geometry,
                window_state: WindowState::default(),
                area,
            },
        );
        debug!(window = id.get(), ?kind, "window opened");
        Ok(id)
    }

    /// Close a window, dropping its layout. Main windows close too; keeping
    /// the main window alive is the host's policy, not the registry's.
    pub fn close_window(&mut self, window: WindowId) -> Result<RegistryEvent, LayoutError> {
        self.windows
            .remove(&window)
            .ok_or(LayoutError::WindowNotFound { window })?;
        debug!(window = window.get(), "window closed");
        Ok(RegistryEvent::WindowClosed { window })
    }

    #[must_use]
    pub fn window(&self, window: WindowId) -> Option<&WindowRecord> {
        self.windows.get(&window)
    }

    /// All windows in ID order.
    pub fn windows(&self) -> impl Iterator<Item = &WindowRecord> {
        self.windows.values()
    }

    #[must_use]
    pub fn window_count(&self) -> usize {
        self.windows.len()
    }

    /// The drop area of a window, for direct (non-drag) mutations.
    pub fn area(&self, window: WindowId) -> Result<&DropArea, LayoutError> {
        self.windows
            .get(&window)
            .map(|record| &record.area)
            .ok_or(LayoutError::WindowNotFound { window })
    }

    pub fn area_mut(&mut self, window: WindowId) -> Result<&mut DropArea, LayoutError> {
        self.windows
            .get_mut(&window)
            .map(|record| &mut record.area)
            .ok_or(LayoutError::WindowNotFound { window })
    }

    /// Record a host window-state change (maximize, minimize).
    pub fn set_window_state(
        &mut self,
        window: WindowId,
        state: WindowState,
    ) -> Result<(), LayoutError> {
        let record = self
            .windows
            .get_mut(&window)
            .ok_or(LayoutError::WindowNotFound { window })?;
        record.window_state = state;
        Ok(())
    }

    /// Move a window; its drop area geometry is local and unaffected.
    pub fn move_window(
        &mut self,
        window: WindowId,
        position: Point,
    ) -> Result<RegistryEvent, LayoutError> {
        let record = self
            .windows
            .get_mut(&window)
            .ok_or(LayoutError::WindowNotFound { window })?;
        record.geometry = record.geometry.moved_to(position);
        Ok(RegistryEvent::WindowMoved {
            window,
            geometry: record.geometry,
        })
    }

    /// Resize a window and re-solve its drop area.
    pub fn resize_window(
        &mut self,
        window: WindowId,
        width: i32,
        height: i32,
    ) -> Result<Vec<RegistryEvent>, LayoutError> {
        let record = self
            .windows
            .get_mut(&window)
            .ok_or(LayoutError::WindowNotFound { window })?;
        record.geometry.width = width;
        record.geometry.height = height;
        let geometry = record.geometry;
        let report = record
            .area
            .resize(dockline_core::geometry::Size::new(width, height));
        Ok(vec![
            RegistryEvent::WindowMoved { window, geometry },
            RegistryEvent::Mutated { window, report },
        ])
    }

    /// Current drag lifecycle state.
    #[must_use]
    pub fn drag_state(&self) -> &crate::drag::DragState {
        self.drag.state()
    }

    /// Cancel any in-flight drag, e.g. on window teardown.
    pub fn cancel_drag(&mut self) -> Option<RegistryEvent> {
        self.drag.force_cancel().map(RegistryEvent::Drag)
    }

    /// Feed one pointer event through the drag machine and commit whatever
    /// it resolves to. Positions are global (screen) coordinates.
    pub fn handle_drag_event(
        &mut self,
        event: DragEvent,
    ) -> Result<Vec<RegistryEvent>, LayoutError> {
        // The machine is taken out so the registry can serve as the resolver
        // while the event is applied.
        let mut machine = std::mem::take(&mut self.drag);
        let transition = machine.apply_event(event, &*self);
        self.drag = machine;

        let effect = transition.effect.clone();
        let mut events = vec![RegistryEvent::Drag(transition)];
        match effect {
            DragEffect::Dropped {
                dragged, target, ..
            } => events.extend(self.commit_drop(&dragged, target)?),
            DragEffect::FloatedAt { dragged, position } => {
                events.extend(self.float_at(&dragged, position)?);
            }
            _ => {}
        }
        Ok(events)
    }

    /// Programmatically float a dock widget at a global position. A tab of a
    /// multi-tab group detaches alone; a sole tab takes its whole item.
    pub fn detach_to_floating(
        &mut self,
        window: WindowId,
        dock_name: &str,
        position: Point,
    ) -> Result<Vec<RegistryEvent>, LayoutError> {
        let area = self.area(window)?;
        let item = area
            .item_for_dock(dock_name)
            .ok_or_else(|| LayoutError::DockNotFound {
                dock_name: dock_name.to_string(),
            })?;
        let sole_tab = area
            .group_for_dock(dock_name)
            .is_some_and(|group| group.tab_count() == 1);
        let dragged = WindowBeingDragged::Detached {
            source_window: window,
            item,
            dock_name: (!sole_tab).then(|| dock_name.to_string()),
        };
        self.float_at(&dragged, position)
    }

    // -----------------------------------------------------------------
    // Drop commit
    // -----------------------------------------------------------------

    fn commit_drop(
        &mut self,
        dragged: &WindowBeingDragged,
        target: DropTarget,
    ) -> Result<Vec<RegistryEvent>, LayoutError> {
        let (location, relative) = match target.placement {
            DropPlacement::Outer { location } => (location, None),
            DropPlacement::Inner { item, location } => {
                match self.anchor_name(target.window, item, dragged)? {
                    Some(name) => (location, Some(name)),
                    // The target group holds nothing but the dragged widget;
                    // committing would be a no-op round trip.
                    None => return Ok(Vec::new()),
                }
            }
        };

        match dragged {
            WindowBeingDragged::Floating { window } => {
                let source = self
                    .windows
                    .get(window)
                    .ok_or(LayoutError::WindowNotFound { window: *window })?;
                let source_tree = source.area.tree().clone();
                let report = self.area_mut(target.window)?.absorb_subtree(
                    &source_tree,
                    source_tree.root(),
                    location,
                    relative.as_deref(),
                    None,
                )?;
                let closed = self.close_window(*window)?;
                Ok(vec![
                    RegistryEvent::Mutated {
                        window: target.window,
                        report,
                    },
                    closed,
                ])
            }
            WindowBeingDragged::Detached {
                source_window,
                item: _,
                dock_name: Some(name),
            } => {
                let affinities = self.dragged_affinities(dragged);
                let remove_report = self.area_mut(*source_window)?.remove_dock_widget(name)?;
                let group = Group::with_affinities(name.clone(), affinities);
                let add_report = self.area_mut(target.window)?.add_group(
                    group,
                    location,
                    relative.as_deref(),
                    AddOptions::default(),
                )?;
                let mut events = vec![
                    RegistryEvent::Mutated {
                        window: *source_window,
                        report: remove_report,
                    },
                    RegistryEvent::Mutated {
                        window: target.window,
                        report: add_report,
                    },
                ];
                events.extend(self.close_if_empty_floating(*source_window));
                Ok(events)
            }
            WindowBeingDragged::Detached {
                source_window,
                item,
                dock_name: None,
            } => {
                let (fragment, remove_report) = self.extract_item(*source_window, *item)?;
                let absorb_report = self.area_mut(target.window)?.absorb_subtree(
                    &fragment,
                    fragment.root(),
                    location,
                    relative.as_deref(),
                    None,
                )?;
                let mut events = vec![
                    RegistryEvent::Mutated {
                        window: *source_window,
                        report: remove_report,
                    },
                    RegistryEvent::Mutated {
                        window: target.window,
                        report: absorb_report,
                    },
                ];
                events.extend(self.close_if_empty_floating(*source_window));
                Ok(events)
            }
        }
    }

    fn float_at(
        &mut self,
        dragged: &WindowBeingDragged,
        position: Point,
    ) -> Result<Vec<RegistryEvent>, LayoutError> {
        match dragged {
            // An already-floating window just moves.
            WindowBeingDragged::Floating { window } => {
                Ok(vec![self.move_window(*window, position)?])
            }
            WindowBeingDragged::Detached {
                source_window,
                item,
                dock_name,
            } => {
                let source = self
                    .windows
                    .get(source_window)
                    .ok_or(LayoutError::WindowNotFound {
                        window: *source_window,
                    })?;
                let rect = source
                    .area
                    .tree()
                    .node(*item)
                    .ok_or(LayoutError::ItemNotFound { item: *item })?
                    .geometry;
                let affinities = self.dragged_affinities(dragged);
                let local = Rect::new(0, 0, rect.width, rect.height);
                let global = Rect::new(position.x, position.y, rect.width, rect.height);

                let (area, remove_report) = match dock_name {
                    Some(name) => {
                        let report = self.area_mut(*source_window)?.remove_dock_widget(name)?;
                        let mut area = DropArea::new(local, affinities.clone());
                        area.add_group(
                            Group::with_affinities(name.clone(), affinities),
                            DockLocation::OnLeft,
                            None,
                            AddOptions::default(),
                        )?;
                        (area, report)
                    }
                    None => {
                        let (fragment, report) = self.extract_item(*source_window, *item)?;
                        let mut area = DropArea::new(local, affinities);
                        area.absorb_subtree(
                            &fragment,
                            fragment.root(),
                            DockLocation::OnLeft,
                            None,
                            None,
                        )?;
                        (area, report)
                    }
                };

                let id = self.insert_window(WindowKind::Floating, global, area)?;
                let mut events = vec![
                    RegistryEvent::Mutated {
                        window: *source_window,
                        report: remove_report,
                    },
                    RegistryEvent::WindowOpened { window: id },
                ];
                events.extend(self.close_if_empty_floating(*source_window));
                Ok(events)
            }
        }
    }

    /// Lift the subtree at `item` out of a window into a standalone tree
    /// sized to the item, removing it from the source.
    fn extract_item(
        &mut self,
        source_window: WindowId,
        item: ItemId,
    ) -> Result<(ItemTree, MutationReport), LayoutError> {
        let area = self.area(source_window)?;
        let rect = area
            .tree()
            .node(item)
            .ok_or(LayoutError::ItemNotFound { item })?
            .geometry;
        let mut fragment = ItemTree::new(Rect::new(0, 0, rect.width, rect.height));
        let mut scratch = MutationReport::default();
        let copied = area
            .tree()
            .copy_subtree_into(item, &mut fragment, None)?;
        fragment.attach_child(fragment.root(), 0, copied, None, &mut scratch)?;

        let mut report = MutationReport::default();
        let area = self.area_mut(source_window)?;
        area.tree_mut().remove_item(item, &mut report)?;
        area.rebuild_index();
        Ok((fragment, report))
    }

    fn close_if_empty_floating(&mut self, window: WindowId) -> Vec<RegistryEvent> {
        let empty_floating = self
            .windows
            .get(&window)
            .is_some_and(|record| record.kind == WindowKind::Floating && record.area.is_empty());
        if empty_floating && self.close_window(window).is_ok() {
            return vec![RegistryEvent::WindowClosed { window }];
        }
        Vec::new()
    }

    /// Anchor dock name for an inner placement: the first tab of the target
    /// group that does not belong to the dragged unit. `None` means the
    /// group holds only the dragged widget.
    fn anchor_name(
        &self,
        window: WindowId,
        item: ItemId,
        dragged: &WindowBeingDragged,
    ) -> Result<Option<String>, LayoutError> {
        let area = self.area(window)?;
        let record = area
            .tree()
            .node(item)
            .ok_or(LayoutError::ItemNotFound { item })?;
        let ItemKind::Leaf(group) = &record.kind else {
            return Err(LayoutError::NotAGroup { item });
        };
        let excluded = match dragged {
            WindowBeingDragged::Detached {
                source_window,
                dock_name: Some(name),
                ..
            } if *source_window == window => Some(name.as_str()),
            _ => None,
        };
        Ok(group
            .tabs()
            .iter()
            .find(|tab| Some(tab.as_str()) != excluded)
            .cloned())
    }

    fn dragged_affinities(&self, dragged: &WindowBeingDragged) -> Vec<String> {
        match dragged {
            WindowBeingDragged::Floating { window } => self
                .windows
                .get(window)
                .map(|record| record.area.affinities.clone())
                .unwrap_or_default(),
            WindowBeingDragged::Detached {
                source_window,
                item,
                ..
            } => self
                .windows
                .get(source_window)
                .and_then(|record| record.area.tree().node(*item))
                .and_then(|record| match &record.kind {
                    ItemKind::Leaf(group) => Some(group.affinities.clone()),
                    _ => None,
                })
                .unwrap_or_default(),
        }
    }
}

impl DropTargetResolver for WindowRegistry {
    /// Hit-test all windows under a global pointer position, floating
    /// windows (newest first) above the main windows.
    fn resolve(&self, dragged: &WindowBeingDragged, position: Point) -> Option<DropTarget> {
        let affinities = self.dragged_affinities(dragged);
        let skip_window = match dragged {
            WindowBeingDragged::Floating { window } => Some(*window),
            WindowBeingDragged::Detached { .. } => None,
        };

        let floating = self
            .windows
            .values()
            .rev()
            .filter(|record| record.kind == WindowKind::Floating);
        let main = self
            .windows
            .values()
            .filter(|record| record.kind == WindowKind::Main);

        for record in floating.chain(main) {
            if Some(record.id) == skip_window {
                continue;
            }
            if !record.geometry.contains(position) {
                continue;
            }
            let local = Point::new(
                position.x - record.geometry.x,
                position.y - record.geometry.y,
            );
            let Some(target) = self
                .overlay
                .choose_target(&record.area, record.id, local, &affinities)
            else {
                continue;
            };
            // A whole dragged group never targets itself.
            if let WindowBeingDragged::Detached {
                source_window,
                item,
                dock_name: None,
            } = dragged
                && *source_window == record.id
                && matches!(
                    target.placement,
                    DropPlacement::Inner { item: hit, .. } if hit == *item
                )
            {
                continue;
            }
            return Some(target);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drag::DragSurface;

    fn registry_with_main() -> (WindowRegistry, WindowId) {
        let mut registry = WindowRegistry::new();
        let main = registry
            .open_main_window(Rect::new(0, 0, 805, 600), Vec::new())
            .expect("main");
        registry
            .area_mut(main)
            .expect("area")
            .add_dock_widget("a", DockLocation::OnLeft, None, AddOptions::default())
            .expect("a");
        registry
            .area_mut(main)
            .expect("area")
            .add_dock_widget("b", DockLocation::OnRight, None, AddOptions::default())
            .expect("b");
        (registry, main)
    }

    fn drag(
        registry: &mut WindowRegistry,
        surface: DragSurface,
        from: Point,
        to: Point,
    ) -> Vec<RegistryEvent> {
        let mut events = registry
            .handle_drag_event(DragEvent::PointerDown {
                surface,
                pointer_id: 1,
                position: from,
            })
            .expect("down");
        events.extend(
            registry
                .handle_drag_event(DragEvent::PointerMove {
                    pointer_id: 1,
                    position: to,
                })
                .expect("move"),
        );
        events.extend(
            registry
                .handle_drag_event(DragEvent::PointerUp {
                    pointer_id: 1,
                    position: to,
                })
                .expect("up"),
        );
        events
    }

    #[test]
    fn drag_out_to_empty_space_floats() {
        let (mut registry, main) = registry_with_main();
        let item = registry.area(main).expect("area").item_for_dock("b").expect("b");

        let events = drag(
            &mut registry,
            DragSurface::GroupTitleBar { window: main, item },
            Point::new(600, 10),
            Point::new(1200, 400),
        );

        assert!(
            events
                .iter()
                .any(|event| matches!(event, RegistryEvent::WindowOpened { .. }))
        );
        assert_eq!(registry.window_count(), 2);
        assert!(registry.area(main).expect("area").item_for_dock("b").is_none());

        let floating = registry
            .windows()
            .find(|record| record.kind == WindowKind::Floating)
            .expect("floating window");
        assert_eq!(floating.geometry.x, 1200);
        assert!(floating.area.item_for_dock("b").is_some());
        // The main window still hosts a, now filling the whole area.
        let a = registry.area(main).expect("area").item_for_dock("a").expect("a");
        assert_eq!(
            registry.area(main).expect("area").tree().node(a).expect("a").geometry,
            Rect::new(0, 0, 805, 600)
        );
    }

    #[test]
    fn drop_floating_back_onto_main_redocks_and_closes_it() {
        let (mut registry, main) = registry_with_main();
        let item = registry.area(main).expect("area").item_for_dock("b").expect("b");
        drag(
            &mut registry,
            DragSurface::GroupTitleBar { window: main, item },
            Point::new(600, 10),
            Point::new(1200, 400),
        );
        let floating = registry
            .windows()
            .find(|record| record.kind == WindowKind::Floating)
            .expect("floating")
            .id;

        // Drag the floating window over the center of a's group: tabs.
        let events = drag(
            &mut registry,
            DragSurface::FloatingTitleBar { window: floating },
            Point::new(1210, 405),
            Point::new(400, 300),
        );

        assert!(
            events
                .iter()
                .any(|event| matches!(event, RegistryEvent::WindowClosed { .. }))
        );
        assert_eq!(registry.window_count(), 1);
        let area = registry.area(main).expect("area");
        let group = area.group_for_dock("a").expect("group");
        assert_eq!(group.tabs(), ["a", "b"]);
        assert!(!area.check_sanity().has_errors());
    }

    #[test]
    fn tab_drag_detaches_single_dock() {
        let (mut registry, main) = registry_with_main();
        registry
            .area_mut(main)
            .expect("area")
            .add_dock_widget("c", DockLocation::OnTabs, Some("b"), AddOptions::default())
            .expect("c");
        let item = registry.area(main).expect("area").item_for_dock("b").expect("b");

        drag(
            &mut registry,
            DragSurface::Tab {
                window: main,
                item,
                dock_name: "c".to_string(),
            },
            Point::new(600, 10),
            Point::new(1200, 400),
        );

        // c floated alone; b stays docked.
        assert!(registry.area(main).expect("area").item_for_dock("b").is_some());
        assert!(registry.area(main).expect("area").item_for_dock("c").is_none());
        let floating = registry
            .windows()
            .find(|record| record.kind == WindowKind::Floating)
            .expect("floating");
        assert_eq!(
            floating.area.group_for_dock("c").expect("group").tabs(),
            ["c"]
        );
    }

    #[test]
    fn drop_onto_side_zone_splits_target() {
        let (mut registry, main) = registry_with_main();
        let item = registry.area(main).expect("area").item_for_dock("b").expect("b");

        // x=30 falls within the 32px outer margin: an outer-left drop that
        // moves b to the leftmost slot of the root.
        drag(
            &mut registry,
            DragSurface::GroupTitleBar { window: main, item },
            Point::new(600, 10),
            Point::new(30, 300),
        );

        let area = registry.area(main).expect("area");
        let b = area.item_for_dock("b").expect("b");
        let a = area.item_for_dock("a").expect("a");
        let b_rect = area.tree().node(b).expect("b").geometry;
        let a_rect = area.tree().node(a).expect("a").geometry;
        assert!(b_rect.x < a_rect.x);
        assert_eq!(registry.window_count(), 1);
        assert!(!area.check_sanity().has_errors());
    }

    #[test]
    fn detach_to_floating_is_programmatic_float() {
        let (mut registry, main) = registry_with_main();
        let events = registry
            .detach_to_floating(main, "b", Point::new(900, 100))
            .expect("detach");
        assert!(
            events
                .iter()
                .any(|event| matches!(event, RegistryEvent::WindowOpened { .. }))
        );
        assert!(registry.area(main).expect("area").item_for_dock("b").is_none());
        assert_eq!(registry.window_count(), 2);
    }

    #[test]
    fn affinity_blocks_cross_area_drop() {
        let mut registry = WindowRegistry::new();
        let main = registry
            .open_main_window(Rect::new(0, 0, 805, 600), vec!["tools".to_string()])
            .expect("main");
        let other = registry
            .open_main_window(Rect::new(1000, 0, 400, 400), Vec::new())
            .expect("other");
        registry
            .area_mut(main)
            .expect("area")
            .add_group(
                Group::with_affinities("t", vec!["tools".to_string()]),
                DockLocation::OnLeft,
                None,
                AddOptions::default(),
            )
            .expect("t");
        registry
            .area_mut(other)
            .expect("area")
            .add_dock_widget("x", DockLocation::OnLeft, None, AddOptions::default())
            .expect("x");
        let item = registry.area(main).expect("area").item_for_dock("t").expect("t");

        // Release over the unrestricted window: no target resolves, so the
        // widget floats there instead of docking.
        drag(
            &mut registry,
            DragSurface::GroupTitleBar { window: main, item },
            Point::new(100, 10),
            Point::new(1200, 200),
        );

        assert!(registry.area(other).expect("area").item_for_dock("t").is_none());
        assert_eq!(registry.window_count(), 3);
    }

    #[test]
    fn emptied_floating_window_auto_closes() {
        let (mut registry, main) = registry_with_main();
        registry
            .detach_to_floating(main, "b", Point::new(900, 100))
            .expect("detach");
        let floating = registry
            .windows()
            .find(|record| record.kind == WindowKind::Floating)
            .expect("floating")
            .id;
        let item = registry
            .area(floating)
            .expect("area")
            .item_for_dock("b")
            .expect("b");

        // Drag b's group from the floating window onto the main area's
        // outer right margin.
        let events = drag(
            &mut registry,
            DragSurface::GroupTitleBar {
                window: floating,
                item,
            },
            Point::new(910, 105),
            Point::new(795, 300),
        );

        assert!(
            events
                .iter()
                .any(|event| matches!(event, RegistryEvent::WindowClosed { window } if *window == floating))
        );
        assert_eq!(registry.window_count(), 1);
        assert!(registry.area(main).expect("area").item_for_dock("b").is_some());
    }
}

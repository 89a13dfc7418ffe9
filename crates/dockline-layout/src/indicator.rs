//! Drop indicator overlay: hit-testing and preview geometry for drags.
//!
//! While a drag is active the overlay decides, for every pointer position,
//! which drop target (if any) the release would commit to. Targets are
//! chosen by zones sized proportionally to the hovered group: a central band
//! tabs into the group, the four surrounding zones split beside it, and a
//! margin along the drop area's own bounds targets the root (the outer-edge
//! drop of a main window). Affinity-incompatible areas never yield a target.

use serde::{Deserialize, Serialize};

use dockline_core::geometry::{Point, Rect};

use crate::drop_area::{DockLocation, DropArea};
use crate::group::affinities_match;
use crate::item::{ItemId, ItemKind};
use crate::window::WindowId;

/// Pixel margin along a drop area's bounds that maps to outer-edge docking.
pub const OUTER_EDGE_MARGIN: i32 = 32;

/// Fraction of each axis of a hovered group that tabs rather than splits.
pub const TAB_BAND_RATIO: f64 = 0.4;

/// Where a drop would land inside one drop area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "placement", rename_all = "snake_case")]
pub enum DropPlacement {
    /// Adjacent to (or tabbed into) a specific leaf.
    Inner { item: ItemId, location: DockLocation },
    /// Along an edge of the whole area, splitting the root.
    Outer { location: DockLocation },
}

/// A resolved drop candidate: one window, one placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropTarget {
    pub window: WindowId,
    pub placement: DropPlacement,
}

/// Hit-testing helper active during drags.
#[derive(Debug, Clone, Copy)]
pub struct DropIndicatorOverlay {
    tab_band_ratio: f64,
    outer_margin: i32,
}

impl Default for DropIndicatorOverlay {
    fn default() -> Self {
        Self {
            tab_band_ratio: TAB_BAND_RATIO,
            outer_margin: OUTER_EDGE_MARGIN,
        }
    }
}

impl DropIndicatorOverlay {
    /// Choose the drop target for a pointer position local to `area`.
    ///
    /// Returns `None` when the pointer misses the area, lands on dead space
    /// (a separator), or the dragged affinities are incompatible.
    #[must_use]
    pub fn choose_target(
        &self,
        area: &DropArea,
        window: WindowId,
        pointer: Point,
        dragged_affinities: &[String],
    ) -> Option<DropTarget> {
        if !affinities_match(dragged_affinities, &area.affinities) {
            return None;
        }
        let bounds = area.area();
        if !bounds.contains(pointer) {
            return None;
        }

        if area.is_empty() {
            return Some(DropTarget {
                window,
                placement: DropPlacement::Outer {
                    location: DockLocation::OnLeft,
                },
            });
        }

        if let Some(location) = self.outer_edge(bounds, pointer) {
            return Some(DropTarget {
                window,
                placement: DropPlacement::Outer { location },
            });
        }

        let item = area.leaf_at(pointer)?;
        let rect = area.tree().node(item)?.geometry;
        let location = self.inner_zone(rect, pointer);
        Some(DropTarget {
            window,
            placement: DropPlacement::Inner { item, location },
        })
    }

    /// Preview rectangle a committed drop would occupy, for rendering.
    #[must_use]
    pub fn preview_rect(&self, area: &DropArea, target: &DropTarget) -> Option<Rect> {
        let bounds = area.area();
        match target.placement {
            DropPlacement::Outer { location } => Some(match location {
                DockLocation::OnLeft => {
                    Rect::new(bounds.x, bounds.y, bounds.width / 2, bounds.height)
                }
                DockLocation::OnRight => Rect::new(
                    bounds.x + bounds.width / 2,
                    bounds.y,
                    bounds.width / 2,
                    bounds.height,
                ),
                DockLocation::OnTop => {
                    Rect::new(bounds.x, bounds.y, bounds.width, bounds.height / 2)
                }
                DockLocation::OnBottom | DockLocation::OnTabs => Rect::new(
                    bounds.x,
                    bounds.y + bounds.height / 2,
                    bounds.width,
                    bounds.height / 2,
                ),
            }),
            DropPlacement::Inner { item, location } => {
                let record = area.tree().node(item)?;
                if !matches!(record.kind, ItemKind::Leaf(_) | ItemKind::Placeholder { .. }) {
                    return None;
                }
                let rect = record.geometry;
                Some(match location {
                    DockLocation::OnTabs => rect,
                    DockLocation::OnLeft => {
                        Rect::new(rect.x, rect.y, rect.width / 2, rect.height)
                    }
                    DockLocation::OnRight => Rect::new(
                        rect.x + rect.width / 2,
                        rect.y,
                        rect.width / 2,
                        rect.height,
                    ),
                    DockLocation::OnTop => {
                        Rect::new(rect.x, rect.y, rect.width, rect.height / 2)
                    }
                    DockLocation::OnBottom => Rect::new(
                        rect.x,
                        rect.y + rect.height / 2,
                        rect.width,
                        rect.height / 2,
                    ),
                })
            }
        }
    }

    /// Outer-edge zone, nearest edge winning; ties break left, right, top,
    /// bottom.
    fn outer_edge(&self, bounds: Rect, pointer: Point) -> Option<DockLocation> {
        let distances = [
            (pointer.x - bounds.left(), DockLocation::OnLeft),
            (bounds.right() - 1 - pointer.x, DockLocation::OnRight),
            (pointer.y - bounds.top(), DockLocation::OnTop),
            (bounds.bottom() - 1 - pointer.y, DockLocation::OnBottom),
        ];
        distances
            .into_iter()
            .filter(|(distance, _)| *distance <= self.outer_margin)
            .min_by_key(|(distance, _)| *distance)
            .map(|(_, location)| location)
    }

    /// Zone within a hovered leaf: central band tabs, dominant offset splits.
    fn inner_zone(&self, rect: Rect, pointer: Point) -> DockLocation {
        let rx = if rect.width > 0 {
            f64::from(pointer.x - rect.x) / f64::from(rect.width)
        } else {
            0.5
        };
        let ry = if rect.height > 0 {
            f64::from(pointer.y - rect.y) / f64::from(rect.height)
        } else {
            0.5
        };
        let half_band = self.tab_band_ratio / 2.0;
        let dx = rx - 0.5;
        let dy = ry - 0.5;
        if dx.abs() <= half_band && dy.abs() <= half_band {
            return DockLocation::OnTabs;
        }
        if dx.abs() >= dy.abs() {
            if dx < 0.0 {
                DockLocation::OnLeft
            } else {
                DockLocation::OnRight
            }
        } else if dy < 0.0 {
            DockLocation::OnTop
        } else {
            DockLocation::OnBottom
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drop_area::AddOptions;

    fn window() -> WindowId {
        WindowId::new(1).expect("non-zero")
    }

    fn two_pane_area() -> DropArea {
        let mut area = DropArea::new(Rect::new(0, 0, 805, 600), Vec::new());
        area.add_dock_widget("a", DockLocation::OnLeft, None, AddOptions::default())
            .expect("a");
        area.add_dock_widget("b", DockLocation::OnRight, None, AddOptions::default())
            .expect("b");
        area
    }

    #[test]
    fn center_of_a_group_tabs() {
        let area = two_pane_area();
        let overlay = DropIndicatorOverlay::default();
        // Center of b's rect (405..805 horizontally).
        let target = overlay
            .choose_target(&area, window(), Point::new(605, 300), &[])
            .expect("target");
        let b = area.item_for_dock("b").expect("b");
        assert_eq!(
            target.placement,
            DropPlacement::Inner {
                item: b,
                location: DockLocation::OnTabs
            }
        );
    }

    #[test]
    fn side_zones_split() {
        let area = two_pane_area();
        let overlay = DropIndicatorOverlay::default();
        let b = area.item_for_dock("b").expect("b");
        // Near b's right edge but outside the outer margin.
        let target = overlay
            .choose_target(&area, window(), Point::new(770, 300), &[])
            .expect("target");
        assert_eq!(
            target.placement,
            DropPlacement::Inner {
                item: b,
                location: DockLocation::OnRight
            }
        );
        // Below b's center, outside both the tab band and the outer margin.
        let target = overlay
            .choose_target(&area, window(), Point::new(605, 520), &[])
            .expect("target");
        assert_eq!(
            target.placement,
            DropPlacement::Inner {
                item: b,
                location: DockLocation::OnBottom
            }
        );
    }

    #[test]
    fn margin_targets_outer_edge() {
        let area = two_pane_area();
        let overlay = DropIndicatorOverlay::default();
        let target = overlay
            .choose_target(&area, window(), Point::new(10, 300), &[])
            .expect("target");
        assert_eq!(
            target.placement,
            DropPlacement::Outer {
                location: DockLocation::OnLeft
            }
        );
    }

    #[test]
    fn incompatible_affinity_yields_no_target() {
        let mut area = two_pane_area();
        area.affinities = vec!["tools".to_string()];
        let overlay = DropIndicatorOverlay::default();
        assert_eq!(
            overlay.choose_target(&area, window(), Point::new(605, 300), &[]),
            None
        );
        assert!(
            overlay
                .choose_target(
                    &area,
                    window(),
                    Point::new(605, 300),
                    &["tools".to_string()]
                )
                .is_some()
        );
    }

    #[test]
    fn pointer_outside_misses() {
        let area = two_pane_area();
        let overlay = DropIndicatorOverlay::default();
        assert_eq!(
            overlay.choose_target(&area, window(), Point::new(900, 300), &[]),
            None
        );
    }
}

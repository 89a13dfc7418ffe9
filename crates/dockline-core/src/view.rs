//! Abstract view capability.
//!
//! The layout engine never talks to a concrete UI backend. It consumes the
//! [`View`] capability (geometry and visibility commands, coordinate mapping)
//! and hosts provide one [`ViewFactory`] per backend at startup. Everything a
//! backend must implement is here; everything else stays on the host side.

use crate::geometry::{Point, Rect, Size};

/// One on-screen visual element controlled by the layout engine.
///
/// Implementations are free to be retained widgets, scene-graph nodes, or
/// plain records. The engine only issues commands and queries through this
/// trait, it never assumes rendering semantics.
pub trait View {
    /// Move and resize the view, in window-local coordinates.
    fn set_geometry(&mut self, rect: Rect);

    /// Show or hide the view.
    fn set_visible(&mut self, visible: bool);

    /// Current geometry in window-local coordinates.
    fn geometry(&self) -> Rect;

    /// Whether the view is currently shown.
    fn is_visible(&self) -> bool;

    /// Smallest size the backend can render this view at.
    fn min_size(&self) -> Size;

    /// Largest useful size, if the backend imposes one.
    fn max_size(&self) -> Option<Size>;

    /// Map a window-local point to global (screen) coordinates.
    fn map_to_global(&self, local: Point) -> Point;

    /// Map a global (screen) point to window-local coordinates.
    fn map_from_global(&self, global: Point) -> Point;
}

/// Backend-selected constructor set for the visual pieces the engine needs.
///
/// One implementation exists per UI backend and is chosen at startup. The
/// engine requests views by role; the factory decides what they look like.
pub trait ViewFactory {
    /// Visual for a tabbed group cell.
    fn create_group_view(&self) -> Box<dyn View>;

    /// Visual for a group or floating-window title bar.
    fn create_title_bar_view(&self) -> Box<dyn View>;

    /// Visual for the draggable boundary between two siblings.
    fn create_separator_view(&self) -> Box<dyn View>;

    /// Visual for the drop indicator overlay shown during drags.
    fn create_indicator_overlay_view(&self) -> Box<dyn View>;

    /// Chrome for a floating top-level window.
    fn create_floating_window_view(&self) -> Box<dyn View>;
}

/// In-memory [`View`] that records the commands it receives.
///
/// Used by the engine's own tests and by hosts that want to assert on the
/// geometry stream without a real backend.
#[derive(Debug, Clone, Default)]
pub struct RecordingView {
    geometry: Rect,
    visible: bool,
    global_offset: Point,
    /// Every geometry ever set, in order.
    pub geometry_log: Vec<Rect>,
    /// Every visibility change ever set, in order.
    pub visibility_log: Vec<bool>,
}

impl RecordingView {
    /// Create a recording view with a global-mapping offset.
    #[must_use]
    pub fn new(global_offset: Point) -> Self {
        Self {
            global_offset,
            ..Self::default()
        }
    }
}

impl View for RecordingView {
    fn set_geometry(&mut self, rect: Rect) {
        self.geometry = rect;
        self.geometry_log.push(rect);
    }

    fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
        self.visibility_log.push(visible);
    }

    fn geometry(&self) -> Rect {
        self.geometry
    }

    fn is_visible(&self) -> bool {
        self.visible
    }

    fn min_size(&self) -> Size {
        Size::new(0, 0)
    }

    fn max_size(&self) -> Option<Size> {
        None
    }

    fn map_to_global(&self, local: Point) -> Point {
        local.translated(self.global_offset.x, self.global_offset.y)
    }

    fn map_from_global(&self, global: Point) -> Point {
        global.translated(-self.global_offset.x, -self.global_offset.y)
    }
}

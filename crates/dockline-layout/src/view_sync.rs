//! Replay layout mutations onto backend views.
//!
//! The engine never calls a backend directly; it returns [`MutationReport`]s.
//! [`ViewBinder`] is the standard consumer: it keeps one backend view per
//! group leaf plus one per derived separator, created through the host's
//! [`ViewFactory`], and applies each report as a stream of geometry and
//! visibility commands.

use rustc_hash::FxHashMap;

use dockline_core::view::{View, ViewFactory};

use crate::drop_area::DropArea;
use crate::item::{Change, ItemId, ItemKind, MutationReport};

/// Mirrors a [`DropArea`]'s leaves and separators into backend views.
pub struct ViewBinder {
    factory: Box<dyn ViewFactory>,
    views: FxHashMap<ItemId, Box<dyn View>>,
    separators: Vec<Box<dyn View>>,
}

impl ViewBinder {
    #[must_use]
    pub fn new(factory: Box<dyn ViewFactory>) -> Self {
        Self {
            factory,
            views: FxHashMap::default(),
            separators: Vec::new(),
        }
    }

    /// Apply one mutation report against the views, creating and dropping
    /// them as items come and go.
    pub fn apply(&mut self, area: &DropArea, report: &MutationReport) {
        for change in &report.changes {
            match change {
                Change::ItemAdded(item) => {
                    let Some(record) = area.tree().node(*item) else {
                        continue;
                    };
                    if record.kind.is_container() {
                        continue;
                    }
                    let mut view = self.factory.create_group_view();
                    view.set_geometry(record.geometry);
                    view.set_visible(record.visible);
                    self.views.insert(*item, view);
                }
                Change::ItemRemoved(item) => {
                    self.views.remove(item);
                }
                Change::Geometry(item) => {
                    if let (Some(view), Some(record)) =
                        (self.views.get_mut(item), area.tree().node(*item))
                    {
                        view.set_geometry(record.geometry);
                    }
                }
                Change::Visibility(item) => {
                    if let (Some(view), Some(record)) =
                        (self.views.get_mut(item), area.tree().node(*item))
                    {
                        view.set_visible(record.visible);
                    }
                }
                // Tab churn and infeasibility reports are host policy.
                Change::TabsChanged(_) | Change::InfeasibleGeometry { .. } => {}
            }
        }
        self.sync_separators(area);
    }

    /// Separator views are derived state: rebuilt from scratch per report.
    fn sync_separators(&mut self, area: &DropArea) {
        let mut rects = Vec::new();
        for record in area.tree().nodes() {
            if !matches!(record.kind, ItemKind::Container { .. }) {
                continue;
            }
            if let Ok(separators) = area.separators(record.id) {
                rects.extend(separators.into_iter().map(|separator| separator.line));
            }
        }

        while self.separators.len() < rects.len() {
            self.separators.push(self.factory.create_separator_view());
        }
        self.separators.truncate(rects.len());
        for (view, rect) in self.separators.iter_mut().zip(rects) {
            view.set_geometry(rect);
            view.set_visible(true);
        }
    }

    /// The view bound to an item, if any.
    #[must_use]
    pub fn view(&self, item: ItemId) -> Option<&dyn View> {
        self.views.get(&item).map(Box::as_ref)
    }

    /// Number of live item views.
    #[must_use]
    pub fn len(&self) -> usize {
        self.views.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    /// Number of live separator views.
    #[must_use]
    pub fn separator_count(&self) -> usize {
        self.separators.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drop_area::{AddOptions, DockLocation};
    use dockline_core::geometry::Rect;
    use dockline_core::view::RecordingView;

    struct RecordingFactory;

    impl ViewFactory for RecordingFactory {
        fn create_group_view(&self) -> Box<dyn View> {
            Box::new(RecordingView::default())
        }
        fn create_title_bar_view(&self) -> Box<dyn View> {
            Box::new(RecordingView::default())
        }
        fn create_separator_view(&self) -> Box<dyn View> {
            Box::new(RecordingView::default())
        }
        fn create_indicator_overlay_view(&self) -> Box<dyn View> {
            Box::new(RecordingView::default())
        }
        fn create_floating_window_view(&self) -> Box<dyn View> {
            Box::new(RecordingView::default())
        }
    }

    #[test]
    fn views_follow_dock_add_and_remove() {
        let mut area = DropArea::new(Rect::new(0, 0, 805, 600), Vec::new());
        let mut binder = ViewBinder::new(Box::new(RecordingFactory));

        let report = area
            .add_dock_widget("a", DockLocation::OnLeft, None, AddOptions::default())
            .expect("a");
        binder.apply(&area, &report);
        assert_eq!(binder.len(), 1);
        assert_eq!(binder.separator_count(), 0);

        let report = area
            .add_dock_widget("b", DockLocation::OnRight, None, AddOptions::default())
            .expect("b");
        binder.apply(&area, &report);
        assert_eq!(binder.len(), 2);
        assert_eq!(binder.separator_count(), 1);

        let a = area.item_for_dock("a").expect("a");
        assert_eq!(
            binder.view(a).expect("view").geometry(),
            Rect::new(0, 0, 400, 600)
        );

        let report = area.remove_dock_widget("b").expect("remove");
        binder.apply(&area, &report);
        assert_eq!(binder.len(), 1);
        assert_eq!(binder.separator_count(), 0);
        assert_eq!(
            binder.view(a).expect("view").geometry(),
            Rect::new(0, 0, 805, 600)
        );
    }

    #[test]
    fn visibility_commands_reach_the_view() {
        let mut area = DropArea::new(Rect::new(0, 0, 805, 600), Vec::new());
        let mut binder = ViewBinder::new(Box::new(RecordingFactory));
        let report = area
            .add_dock_widget("a", DockLocation::OnLeft, None, AddOptions::default())
            .expect("a");
        binder.apply(&area, &report);
        let report = area
            .add_dock_widget("b", DockLocation::OnRight, None, AddOptions::default())
            .expect("b");
        binder.apply(&area, &report);

        let report = area.set_dock_visible("b", false).expect("hide");
        binder.apply(&area, &report);
        let b = area.item_for_dock("b").expect("b");
        assert!(!binder.view(b).expect("view").is_visible());
        // a expands to cover the freed extent.
        let a = area.item_for_dock("a").expect("a");
        assert_eq!(
            binder.view(a).expect("view").geometry(),
            Rect::new(0, 0, 805, 600)
        );
    }
}

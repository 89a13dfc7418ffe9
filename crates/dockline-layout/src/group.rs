//! Tabbed group cell.
//!
//! A [`Group`] occupies exactly one leaf of the item tree and hosts one or
//! more dock widgets in tab order. The group does not own widget state; dock
//! widgets are identified by their unique names and owned by the host
//! application. Current-tab changes are pure visibility toggles and never
//! affect geometry.

use serde::{Deserialize, Serialize};

/// Tab container hosting dock widgets by name.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Group {
    tabs: Vec<String>,
    #[serde(default)]
    current_index: usize,
    /// Affinity names restricting where these docks may be dropped.
    #[serde(default)]
    pub affinities: Vec<String>,
}

impl Group {
    /// Create a group hosting a single dock widget.
    #[must_use]
    pub fn single(dock_name: impl Into<String>) -> Self {
        Self {
            tabs: vec![dock_name.into()],
            current_index: 0,
            affinities: Vec::new(),
        }
    }

    /// Create a single-dock group carrying affinity names.
    #[must_use]
    pub fn with_affinities(dock_name: impl Into<String>, affinities: Vec<String>) -> Self {
        Self {
            tabs: vec![dock_name.into()],
            current_index: 0,
            affinities,
        }
    }

    /// Dock widget names in tab order.
    #[must_use]
    pub fn tabs(&self) -> &[String] {
        &self.tabs
    }

    /// Number of tabs.
    #[must_use]
    pub fn tab_count(&self) -> usize {
        self.tabs.len()
    }

    /// True when no dock widget remains. Empty groups are transient and must
    /// be pruned from the tree within the same mutation that emptied them.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }

    /// Whether the named dock widget is hosted here.
    #[must_use]
    pub fn contains(&self, dock_name: &str) -> bool {
        self.tabs.iter().any(|tab| tab == dock_name)
    }

    /// Index of the currently shown tab.
    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current_index
    }

    /// Name of the currently shown dock widget, if any.
    #[must_use]
    pub fn current_tab(&self) -> Option<&str> {
        self.tabs.get(self.current_index).map(String::as_str)
    }

    /// Insert a tab at `index` (clamped to the tab count) and make it current.
    pub fn add_tab(&mut self, dock_name: impl Into<String>, index: Option<usize>) {
        let index = index.unwrap_or(self.tabs.len()).min(self.tabs.len());
        self.tabs.insert(index, dock_name.into());
        self.current_index = index;
    }

    /// Remove the named tab. Returns false if it was not present.
    ///
    /// The current index is clamped so it stays valid while tabs remain.
    pub fn remove_tab(&mut self, dock_name: &str) -> bool {
        let Some(index) = self.tabs.iter().position(|tab| tab == dock_name) else {
            return false;
        };
        self.tabs.remove(index);
        if self.current_index >= index && self.current_index > 0 {
            self.current_index -= 1;
        }
        true
    }

    /// Switch the shown tab. Out-of-range indices are clamped.
    pub fn set_current_index(&mut self, index: usize) {
        if self.tabs.is_empty() {
            self.current_index = 0;
        } else {
            self.current_index = index.min(self.tabs.len() - 1);
        }
    }
}

/// Affinity compatibility between a dragged unit and a target area.
///
/// Two affinity sets are compatible when both are empty, or when they share
/// at least one name. An unrestricted drag never lands on a restricted area
/// and vice versa.
#[must_use]
pub fn affinities_match(a: &[String], b: &[String]) -> bool {
    if a.is_empty() && b.is_empty() {
        return true;
    }
    a.iter().any(|name| b.contains(name))
}

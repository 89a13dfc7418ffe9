//! Layout persistence.
//!
//! Serializes the full window arrangement (every window's geometry, state,
//! affinities, and item tree) into a versioned JSON document and restores it
//! into a fresh registry. Dock widgets that no longer exist at restore time
//! leave placeholders behind so a late registration can reclaim its spot.
//!
//! Unknown JSON fields are ignored and every snapshot carries an extension
//! bag, so documents written by newer minor revisions restore cleanly.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use dockline_core::geometry::Rect;

use crate::item::{ItemId, ItemKind, ItemTree, ItemTreeSnapshot, MutationReport};
use crate::drop_area::DropArea;
use crate::window::{WindowKind, WindowRegistry, WindowState};

/// Current layout document schema version.
pub const LAYOUT_SCHEMA_VERSION: u16 = 1;

/// Serialized form of one top-level window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowSnapshot {
    pub kind: WindowKind,
    /// Global (screen) geometry.
    pub geometry: Rect,
    #[serde(default)]
    pub window_state: WindowState,
    #[serde(default)]
    pub affinities: Vec<String>,
    pub tree: ItemTreeSnapshot,
    #[serde(default)]
    pub extensions: BTreeMap<String, String>,
}

/// The complete serialized layout: every window, in ID order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutDocument {
    #[serde(default = "default_schema_version")]
    pub schema_version: u16,
    pub windows: Vec<WindowSnapshot>,
    #[serde(default)]
    pub extensions: BTreeMap<String, String>,
}

fn default_schema_version() -> u16 {
    LAYOUT_SCHEMA_VERSION
}

impl LayoutDocument {
    /// Deterministic hash over the document, for diagnostics and golden
    /// assertions.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
        const PRIME: u64 = 0x0000_0001_0000_01b3;

        let mut hash = OFFSET_BASIS;
        let mix_u64 = |hash: &mut u64, value: u64| {
            for byte in value.to_le_bytes() {
                *hash ^= u64::from(byte);
                *hash = hash.wrapping_mul(PRIME);
            }
        };
        mix_u64(&mut hash, u64::from(self.schema_version));
        for window in &self.windows {
            mix_u64(&mut hash, window.geometry.x as u64);
            mix_u64(&mut hash, window.geometry.y as u64);
            mix_u64(&mut hash, window.geometry.width as u64);
            mix_u64(&mut hash, window.geometry.height as u64);
            mix_u64(&mut hash, window.tree.state_hash());
        }
        hash
    }
}

/// Failure while saving or restoring a layout document.
#[derive(Debug)]
pub enum SaverError {
    /// The document was written by a newer schema revision than this build
    /// supports.
    VersionMismatch { found: u16, supported: u16 },
    /// The document parsed but fails structural validation.
    CorruptLayout { detail: String },
    Parse(serde_json::Error),
    Io(std::io::Error),
}

impl fmt::Display for SaverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::VersionMismatch { found, supported } => write!(
                f,
                "layout schema version {found} unsupported (this build reads {supported})"
            ),
            Self::CorruptLayout { detail } => write!(f, "corrupt layout: {detail}"),
            Self::Parse(error) => write!(f, "layout parse error: {error}"),
            Self::Io(error) => write!(f, "layout i/o error: {error}"),
        }
    }
}

impl std::error::Error for SaverError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Parse(error) => Some(error),
            Self::Io(error) => Some(error),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for SaverError {
    fn from(error: serde_json::Error) -> Self {
        Self::Parse(error)
    }
}

impl From<std::io::Error> for SaverError {
    fn from(error: std::io::Error) -> Self {
        Self::Io(error)
    }
}

/// Restore behavior switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RestoreOptions {
    /// Drop absent docks outright instead of leaving placeholders.
    pub skip_absent: bool,
    /// Treat floating window positions as offsets from the main window's
    /// top-left instead of absolute screen coordinates.
    pub relative_to_main_window: bool,
}

impl RestoreOptions {
    /// Default behavior: absolute positions, absent sole docks become
    /// placeholders.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }
}

/// Save/restore entry points over [`WindowRegistry`].
#[derive(Debug, Default)]
pub struct LayoutSaver;

impl LayoutSaver {
    /// Capture the current arrangement as a document.
    #[must_use]
    pub fn save(registry: &WindowRegistry) -> LayoutDocument {
        let windows = registry
            .windows()
            .map(|record| WindowSnapshot {
                kind: record.kind,
                geometry: record.geometry,
                window_state: record.window_state,
                affinities: record.area.affinities.clone(),
                tree: record.area.tree().to_snapshot(),
                extensions: BTreeMap::new(),
            })
            .collect();
        LayoutDocument {
            schema_version: LAYOUT_SCHEMA_VERSION,
            windows,
            extensions: BTreeMap::new(),
        }
    }

    /// Serialize the current arrangement to pretty JSON.
    pub fn save_to_bytes(registry: &WindowRegistry) -> Result<Vec<u8>, SaverError> {
        Ok(serde_json::to_vec_pretty(&Self::save(registry))?)
    }

    pub fn save_to_file(
        registry: &WindowRegistry,
        path: impl AsRef<Path>,
    ) -> Result<(), SaverError> {
        std::fs::write(path, Self::save_to_bytes(registry)?)?;
        Ok(())
    }

    /// Rebuild a registry from a document.
    ///
    /// `known_docks` lists the dock widgets the host has registered. A saved
    /// dock not in the list either becomes a placeholder (sole tab of its
    /// group, default) or is dropped (`skip_absent`, or a tab of a group
    /// that keeps other docks).
    pub fn restore(
        document: &LayoutDocument,
        known_docks: &[String],
        options: RestoreOptions,
    ) -> Result<WindowRegistry, SaverError> {
        // Older revisions stay readable; only documents from a newer schema
        // are rejected.
        if document.schema_version > LAYOUT_SCHEMA_VERSION {
            return Err(SaverError::VersionMismatch {
                found: document.schema_version,
                supported: LAYOUT_SCHEMA_VERSION,
            });
        }

        let main_origin = document
            .windows
            .iter()
            .find(|snapshot| snapshot.kind == WindowKind::Main)
            .map(|snapshot| (snapshot.geometry.x, snapshot.geometry.y))
            .unwrap_or((0, 0));

        let mut registry = WindowRegistry::new();
        for snapshot in &document.windows {
            let mut tree =
                ItemTree::from_snapshot(snapshot.tree.clone()).map_err(|error| {
                    SaverError::CorruptLayout {
                        detail: error.to_string(),
                    }
                })?;
            reconcile_docks(&mut tree, known_docks, options)?;

            let area = DropArea::from_tree(tree, snapshot.affinities.clone());
            let sanity = area.check_sanity();
            if sanity.has_errors() {
                return Err(SaverError::CorruptLayout {
                    detail: format!("{} sanity issue(s) after restore", sanity.issues.len()),
                });
            }

            let geometry =
                if options.relative_to_main_window && snapshot.kind == WindowKind::Floating {
                    snapshot.geometry.translated(main_origin.0, main_origin.1)
                } else {
                    snapshot.geometry
                };
            let id = registry
                .insert_window(snapshot.kind, geometry, area)
                .map_err(|error| SaverError::CorruptLayout {
                    detail: error.to_string(),
                })?;
            registry
                .set_window_state(id, snapshot.window_state)
                .map_err(|error| SaverError::CorruptLayout {
                    detail: error.to_string(),
                })?;
        }
        debug!(windows = document.windows.len(), "layout restored");
        Ok(registry)
    }

    pub fn restore_from_bytes(
        bytes: &[u8],
        known_docks: &[String],
        options: RestoreOptions,
    ) -> Result<WindowRegistry, SaverError> {
        let document: LayoutDocument = serde_json::from_slice(bytes)?;
        Self::restore(&document, known_docks, options)
    }

    pub fn restore_from_file(
        path: impl AsRef<Path>,
        known_docks: &[String],
        options: RestoreOptions,
    ) -> Result<WindowRegistry, SaverError> {
        let bytes = std::fs::read(path)?;
        Self::restore_from_bytes(&bytes, known_docks, options)
    }
}

/// Reconcile a restored tree with the docks that actually exist: absent
/// sole-tab leaves become placeholders, absent tabs of mixed groups are
/// dropped, and leaves left with nothing are pruned.
fn reconcile_docks(
    tree: &mut ItemTree,
    known_docks: &[String],
    options: RestoreOptions,
) -> Result<(), SaverError> {
    let known = |name: &str| known_docks.iter().any(|dock| dock == name);

    let leaf_ids: Vec<ItemId> = tree.leaf_ids();
    for id in leaf_ids {
        let action = match tree.node(id).map(|record| &record.kind) {
            Some(ItemKind::Leaf(group)) => {
                let absent: Vec<String> = group
                    .tabs()
                    .iter()
                    .filter(|tab| !known(tab))
                    .cloned()
                    .collect();
                if absent.is_empty() {
                    continue;
                }
                let survivors = group.tab_count() - absent.len();
                if survivors == 0 && !options.skip_absent {
                    // The whole group is absent: reserve its slot with one
                    // placeholder, named after the tab that was shown.
                    let keep = group
                        .current_tab()
                        .map(str::to_string)
                        .unwrap_or_else(|| absent[0].clone());
                    LeafAction::ToPlaceholder(keep)
                } else if survivors == 0 {
                    LeafAction::Remove(absent)
                } else {
                    LeafAction::DropTabs(absent)
                }
            }
            // Placeholders round-trip as-is: registration alone does not
            // reopen a dock. A lean restore prunes them instead.
            Some(ItemKind::Placeholder { dock_name }) => {
                if options.skip_absent {
                    LeafAction::Remove(vec![dock_name.clone()])
                } else {
                    continue;
                }
            }
            _ => continue,
        };

        let mut report = MutationReport::default();
        match action {
            LeafAction::ToPlaceholder(name) => {
                warn!(dock = %name, "dock absent at restore, leaving placeholder");
                if let Some(kind) = tree.node_kind_mut(id) {
                    *kind = ItemKind::Placeholder { dock_name: name };
                }
            }
            LeafAction::DropTabs(names) => {
                if let Some(ItemKind::Leaf(group)) = tree.node_kind_mut(id) {
                    for name in &names {
                        warn!(dock = %name, "dock absent at restore, dropping tab");
                        group.remove_tab(name);
                    }
                }
            }
            LeafAction::Remove(names) => {
                for name in &names {
                    warn!(dock = %name, "dock absent at restore, pruning leaf");
                }
                tree.remove_item(id, &mut report)
                    .map_err(|error| SaverError::CorruptLayout {
                        detail: error.to_string(),
                    })?;
            }
        }
    }
    Ok(())
}

enum LeafAction {
    ToPlaceholder(String),
    DropTabs(Vec<String>),
    Remove(Vec<String>),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drop_area::{AddOptions, DockLocation};

    fn sample_registry() -> WindowRegistry {
        let mut registry = WindowRegistry::new();
        let main = registry
            .open_main_window(Rect::new(0, 0, 805, 600), Vec::new())
            .expect("main");
        let area = registry.area_mut(main).expect("area");
        area.add_dock_widget("a", DockLocation::OnLeft, None, AddOptions::default())
            .expect("a");
        area.add_dock_widget("b", DockLocation::OnRight, None, AddOptions::default())
            .expect("b");
        area.add_dock_widget("c", DockLocation::OnTabs, Some("b"), AddOptions::default())
            .expect("c");
        registry
    }

    fn names(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| (*name).to_string()).collect()
    }

    #[test]
    fn save_restore_round_trips_geometry() {
        let registry = sample_registry();
        let document = LayoutSaver::save(&registry);
        let restored = LayoutSaver::restore(
            &document,
            &names(&["a", "b", "c"]),
            RestoreOptions::none(),
        )
        .expect("restore");

        assert_eq!(restored.window_count(), 1);
        let window = restored.windows().next().expect("window");
        let original = registry.windows().next().expect("window");
        assert_eq!(window.geometry, original.geometry);
        assert_eq!(
            window.area.tree().state_hash(),
            original.area.tree().state_hash()
        );
        assert_eq!(
            LayoutSaver::save(&restored).state_hash(),
            document.state_hash()
        );
    }

    #[test]
    fn absent_sole_dock_leaves_placeholder_with_geometry() {
        let registry = sample_registry();
        let document = LayoutSaver::save(&registry);

        // "a" is gone; its leaf keeps the slot as a placeholder.
        let restored =
            LayoutSaver::restore(&document, &names(&["b", "c"]), RestoreOptions::none())
                .expect("restore");
        let window = restored.windows().next().expect("window");
        let item = window.area.item_for_dock("a").expect("a reserved");
        assert!(matches!(
            window.area.tree().node(item).expect("a").kind,
            ItemKind::Placeholder { .. }
        ));

        let original = registry.windows().next().expect("window");
        let original_item = original.area.item_for_dock("a").expect("a");
        assert_eq!(
            window.area.tree().node(item).expect("a").geometry,
            original.area.tree().node(original_item).expect("a").geometry
        );
    }

    #[test]
    fn absent_tab_of_mixed_group_is_dropped() {
        let registry = sample_registry();
        let document = LayoutSaver::save(&registry);

        let restored =
            LayoutSaver::restore(&document, &names(&["a", "b"]), RestoreOptions::none())
                .expect("restore");
        let window = restored.windows().next().expect("window");
        assert!(window.area.item_for_dock("c").is_none());
        assert_eq!(window.area.group_for_dock("b").expect("group").tabs(), ["b"]);
    }

    #[test]
    fn fully_absent_tab_group_degrades_to_placeholder() {
        let registry = sample_registry();
        let document = LayoutSaver::save(&registry);

        // Neither b nor c is registered; the group's slot survives as one
        // placeholder named after the shown tab.
        let restored = LayoutSaver::restore(&document, &names(&["a"]), RestoreOptions::none())
            .expect("restore");
        let window = restored.windows().next().expect("window");
        let item = window.area.item_for_dock("c").expect("slot reserved");
        assert!(matches!(
            window.area.tree().node(item).expect("c").kind,
            ItemKind::Placeholder { .. }
        ));
        assert!(window.area.item_for_dock("b").is_none());

        let original = registry.windows().next().expect("window");
        let original_item = original.area.item_for_dock("c").expect("c");
        assert_eq!(
            window.area.tree().node(item).expect("c").geometry,
            original.area.tree().node(original_item).expect("c").geometry
        );
    }

    #[test]
    fn skip_absent_prunes_instead_of_reserving() {
        let registry = sample_registry();
        let document = LayoutSaver::save(&registry);

        let restored = LayoutSaver::restore(
            &document,
            &names(&["b", "c"]),
            RestoreOptions {
                skip_absent: true,
                ..RestoreOptions::none()
            },
        )
        .expect("restore");
        let window = restored.windows().next().expect("window");
        assert!(window.area.item_for_dock("a").is_none());
        // b+c take over the full width.
        let b = window.area.item_for_dock("b").expect("b");
        assert_eq!(
            window.area.tree().node(b).expect("b").geometry,
            Rect::new(0, 0, 805, 600)
        );
    }

    #[test]
    fn relative_floating_positions_offset_from_main() {
        use dockline_core::geometry::Point;

        let mut registry = WindowRegistry::new();
        let main = registry
            .open_main_window(Rect::new(100, 50, 805, 600), Vec::new())
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
        registry
            .detach_to_floating(main, "b", Point::new(30, 40))
            .expect("detach");
        let document = LayoutSaver::save(&registry);

        let restored = LayoutSaver::restore(
            &document,
            &names(&["a", "b"]),
            RestoreOptions {
                relative_to_main_window: true,
                ..RestoreOptions::none()
            },
        )
        .expect("restore");
        let floating = restored
            .windows()
            .find(|record| record.kind == WindowKind::Floating)
            .expect("floating");
        assert_eq!((floating.geometry.x, floating.geometry.y), (130, 90));
    }

    #[test]
    fn newer_schema_version_is_rejected() {
        let registry = sample_registry();
        let mut document = LayoutSaver::save(&registry);
        document.schema_version = LAYOUT_SCHEMA_VERSION + 1;
        let error = LayoutSaver::restore(&document, &names(&["a", "b", "c"]), RestoreOptions::none())
            .expect_err("version mismatch");
        assert!(matches!(
            error,
            SaverError::VersionMismatch { found, .. } if found == LAYOUT_SCHEMA_VERSION + 1
        ));
    }

    #[test]
    fn older_schema_revisions_still_restore() {
        let registry = sample_registry();
        let mut document = LayoutSaver::save(&registry);
        document.schema_version = 0;
        let restored =
            LayoutSaver::restore(&document, &names(&["a", "b", "c"]), RestoreOptions::none())
                .expect("restore");
        assert_eq!(restored.window_count(), 1);
    }

    #[test]
    fn corrupt_tree_is_rejected() {
        let registry = sample_registry();
        let mut document = LayoutSaver::save(&registry);
        // Break a parent back-reference.
        let snapshot = &mut document.windows[0].tree;
        if let Some(node) = snapshot.nodes.iter_mut().find(|node| node.parent.is_some()) {
            node.parent = None;
        }
        let error = LayoutSaver::restore(&document, &names(&["a", "b", "c"]), RestoreOptions::none())
            .expect_err("corrupt");
        assert!(matches!(error, SaverError::CorruptLayout { .. }));
    }

    #[test]
    fn unknown_fields_are_tolerated() {
        let registry = sample_registry();
        let mut value: serde_json::Value =
            serde_json::from_slice(&LayoutSaver::save_to_bytes(&registry).expect("bytes"))
                .expect("json");
        value["future_field"] = serde_json::json!({"anything": true});
        let bytes = serde_json::to_vec(&value).expect("bytes");
        let restored = LayoutSaver::restore_from_bytes(
            &bytes,
            &names(&["a", "b", "c"]),
            RestoreOptions::none(),
        )
        .expect("restore");
        assert_eq!(restored.window_count(), 1);
    }
}

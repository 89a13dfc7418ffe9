//! Drag-docking state machine.
//!
//! Converts pointer-down/move/up sequences on draggable surfaces (title
//! bars, tabs) into either a window move or a layout mutation. The machine
//! itself never mutates layout: it emits deterministic, serializable
//! transition records and the window registry commits the resulting effect.
//!
//! Exactly one drag is active process-wide; the registry owns the single
//! machine and pointer-downs during an active drag are explicit no-ops.

use serde::{Deserialize, Serialize};

use dockline_core::geometry::Point;

use crate::indicator::DropTarget;
use crate::item::ItemId;
use crate::window::WindowId;

/// Default pointer-travel threshold before a press becomes a drag, pixels.
pub const DRAG_START_THRESHOLD: i32 = 4;

/// What was pressed to begin a potential drag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "surface", rename_all = "snake_case")]
pub enum DragSurface {
    /// Title bar of a docked group: drags the whole group.
    GroupTitleBar { window: WindowId, item: ItemId },
    /// One tab of a group: drags that single dock widget.
    Tab {
        window: WindowId,
        item: ItemId,
        dock_name: String,
    },
    /// Title bar of a floating window: drags the window whole.
    FloatingTitleBar { window: WindowId },
}

/// The unit being dragged once the threshold is crossed.
///
/// An already-floating window and a widget about to be detached share this
/// one abstraction so the drop path is identical for both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "dragged", rename_all = "snake_case")]
pub enum WindowBeingDragged {
    /// A whole floating window, moved or re-docked as one unit.
    Floating { window: WindowId },
    /// A group (or a single tab of one) leaving its current area on drop.
    Detached {
        source_window: WindowId,
        item: ItemId,
        /// `Some` when a single tab is dragged out of a multi-tab group.
        dock_name: Option<String>,
    },
}

impl DragSurface {
    fn to_dragged(&self) -> WindowBeingDragged {
        match self {
            Self::FloatingTitleBar { window } => WindowBeingDragged::Floating { window: *window },
            Self::GroupTitleBar { window, item } => WindowBeingDragged::Detached {
                source_window: *window,
                item: *item,
                dock_name: None,
            },
            Self::Tab {
                window,
                item,
                dock_name,
            } => WindowBeingDragged::Detached {
                source_window: *window,
                item: *item,
                dock_name: Some(dock_name.clone()),
            },
        }
    }
}

/// Pointer input consumed by the machine, in delivery order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DragEvent {
    PointerDown {
        surface: DragSurface,
        pointer_id: u32,
        position: Point,
    },
    PointerMove {
        pointer_id: u32,
        position: Point,
    },
    PointerUp {
        pointer_id: u32,
        position: Point,
    },
    /// Explicit cancel (escape key, focus loss).
    Cancel,
}

/// Lifecycle state of the machine.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DragState {
    #[default]
    Idle,
    /// Pressed but below the drag threshold; no visual effect yet.
    Pressed {
        surface: DragSurface,
        pointer_id: u32,
        origin: Point,
        current: Point,
    },
    /// Threshold crossed; the overlay tracks a candidate target.
    Dragging {
        dragged: WindowBeingDragged,
        pointer_id: u32,
        origin: Point,
        current: Point,
        target: Option<DropTarget>,
    },
}

/// Why a drag ended without a drop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DragCancelReason {
    /// Explicit cancel input; the dragged unit stays exactly where it was.
    Explicit,
    /// Released before the threshold was ever crossed (a plain click).
    BelowThreshold,
    /// Cancelled by the host (window teardown, RAII cleanup).
    Programmatic,
}

/// Explicit no-op diagnostics for events that are safely ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DragNoopReason {
    IdleWithoutPress,
    AlreadyActive,
    PointerMismatch,
    ThresholdNotReached,
}

/// Effect of one lifecycle step, consumed by the window registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum DragEffect {
    /// Press recorded; nothing visible happens yet.
    Armed { surface: DragSurface, origin: Point },
    /// Threshold crossed; the overlay activates.
    DragStarted { dragged: WindowBeingDragged },
    /// The candidate target changed (possibly to none).
    IndicatorUpdated { target: Option<DropTarget> },
    /// Released over a valid target: commit the layout mutation.
    Dropped {
        dragged: WindowBeingDragged,
        target: DropTarget,
        position: Point,
    },
    /// Released with no valid target: the unit floats at the release point.
    FloatedAt {
        dragged: WindowBeingDragged,
        position: Point,
    },
    Canceled {
        reason: DragCancelReason,
    },
    Noop {
        reason: DragNoopReason,
    },
}

/// One state-machine transition with deterministic telemetry fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DragTransition {
    pub transition_id: u64,
    pub from: DragState,
    pub to: DragState,
    pub effect: DragEffect,
}

/// Resolves the drop candidate under a global pointer position.
///
/// Implemented by the window registry; injected so the machine stays pure
/// and testable without windows.
pub trait DropTargetResolver {
    fn resolve(&self, dragged: &WindowBeingDragged, position: Point) -> Option<DropTarget>;
}

/// The drag-docking lifecycle machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DragController {
    state: DragState,
    threshold: i32,
    transition_counter: u64,
}

impl Default for DragController {
    fn default() -> Self {
        Self {
            state: DragState::Idle,
            threshold: DRAG_START_THRESHOLD,
            transition_counter: 0,
        }
    }
}

impl DragController {
    /// Construct with an explicit drag threshold. Zero is rejected: every
    /// press would instantly become a drag.
    #[must_use]
    pub fn new(threshold: i32) -> Option<Self> {
        if threshold <= 0 {
            return None;
        }
        Some(Self {
            state: DragState::Idle,
            threshold,
            transition_counter: 0,
        })
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> &DragState {
        &self.state
    }

    /// Whether a press or drag is in flight.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !matches!(self.state, DragState::Idle)
    }

    /// Apply one input event, resolving drop candidates through `resolver`.
    pub fn apply_event(
        &mut self,
        event: DragEvent,
        resolver: &dyn DropTargetResolver,
    ) -> DragTransition {
        let from = self.state.clone();
        let effect = match (&self.state, event) {
            (
                DragState::Idle,
                DragEvent::PointerDown {
                    surface,
                    pointer_id,
                    position,
                },
            ) => {
                self.state = DragState::Pressed {
                    surface: surface.clone(),
                    pointer_id,
                    origin: position,
                    current: position,
                };
                DragEffect::Armed {
                    surface,
                    origin: position,
                }
            }
            (DragState::Idle, _) => DragEffect::Noop {
                reason: DragNoopReason::IdleWithoutPress,
            },
            (_, DragEvent::PointerDown { .. }) => DragEffect::Noop {
                reason: DragNoopReason::AlreadyActive,
            },
            (
                DragState::Pressed {
                    surface,
                    pointer_id,
                    origin,
                    ..
                },
                DragEvent::PointerMove {
                    pointer_id: event_pointer,
                    position,
                },
            ) => {
                if *pointer_id != event_pointer {
                    DragEffect::Noop {
                        reason: DragNoopReason::PointerMismatch,
                    }
                } else if origin.distance_to(position) < f64::from(self.threshold) {
                    let (surface, pointer_id, origin) = (surface.clone(), *pointer_id, *origin);
                    self.state = DragState::Pressed {
                        surface,
                        pointer_id,
                        origin,
                        current: position,
                    };
                    DragEffect::Noop {
                        reason: DragNoopReason::ThresholdNotReached,
                    }
                } else {
                    let dragged = surface.to_dragged();
                    let target = resolver.resolve(&dragged, position);
                    let (pointer_id, origin) = (*pointer_id, *origin);
                    self.state = DragState::Dragging {
                        dragged: dragged.clone(),
                        pointer_id,
                        origin,
                        current: position,
                        target,
                    };
                    DragEffect::DragStarted { dragged }
                }
            }
            (
                DragState::Pressed { pointer_id, .. },
                DragEvent::PointerUp {
                    pointer_id: event_pointer,
                    ..
                },
            ) => {
                if *pointer_id != event_pointer {
                    DragEffect::Noop {
                        reason: DragNoopReason::PointerMismatch,
                    }
                } else {
                    self.state = DragState::Idle;
                    DragEffect::Canceled {
                        reason: DragCancelReason::BelowThreshold,
                    }
                }
            }
            (DragState::Pressed { .. }, DragEvent::Cancel) => {
                self.state = DragState::Idle;
                DragEffect::Canceled {
                    reason: DragCancelReason::Explicit,
                }
            }
            (
                DragState::Dragging {
                    dragged,
                    pointer_id,
                    origin,
                    ..
                },
                DragEvent::PointerMove {
                    pointer_id: event_pointer,
                    position,
                },
            ) => {
                if *pointer_id != event_pointer {
                    DragEffect::Noop {
                        reason: DragNoopReason::PointerMismatch,
                    }
                } else {
                    let dragged = dragged.clone();
                    let next = resolver.resolve(&dragged, position);
                    let (pointer_id, origin) = (*pointer_id, *origin);
                    self.state = DragState::Dragging {
                        dragged,
                        pointer_id,
                        origin,
                        current: position,
                        target: next,
                    };
                    DragEffect::IndicatorUpdated { target: next }
                }
            }
            (
                DragState::Dragging {
                    dragged,
                    pointer_id,
                    target,
                    ..
                },
                DragEvent::PointerUp {
                    pointer_id: event_pointer,
                    position,
                },
            ) => {
                if *pointer_id != event_pointer {
                    DragEffect::Noop {
                        reason: DragNoopReason::PointerMismatch,
                    }
                } else {
                    let dragged = dragged.clone();
                    // Revalidate at release: the target may have vanished.
                    let target = target.and_then(|_| resolver.resolve(&dragged, position));
                    self.state = DragState::Idle;
                    match target {
                        Some(target) => DragEffect::Dropped {
                            dragged,
                            target,
                            position,
                        },
                        None => DragEffect::FloatedAt { dragged, position },
                    }
                }
            }
            (DragState::Dragging { .. }, DragEvent::Cancel) => {
                self.state = DragState::Idle;
                DragEffect::Canceled {
                    reason: DragCancelReason::Explicit,
                }
            }
        };

        self.transition_counter += 1;
        DragTransition {
            transition_id: self.transition_counter,
            from,
            to: self.state.clone(),
            effect,
        }
    }

    /// Unconditionally reset to idle, returning a diagnostic transition when
    /// a press or drag was in flight. Safety valve for teardown paths where
    /// no pointer event will ever arrive.
    pub fn force_cancel(&mut self) -> Option<DragTransition> {
        if matches!(self.state, DragState::Idle) {
            return None;
        }
        let from = std::mem::take(&mut self.state);
        self.transition_counter += 1;
        Some(DragTransition {
            transition_id: self.transition_counter,
            from,
            to: DragState::Idle,
            effect: DragEffect::Canceled {
                reason: DragCancelReason::Programmatic,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedResolver(Option<DropTarget>);

    impl DropTargetResolver for FixedResolver {
        fn resolve(&self, _dragged: &WindowBeingDragged, _position: Point) -> Option<DropTarget> {
            self.0
        }
    }

    fn surface() -> DragSurface {
        DragSurface::GroupTitleBar {
            window: WindowId::new(1).expect("non-zero"),
            item: ItemId::new(2).expect("non-zero"),
        }
    }

    fn target() -> DropTarget {
        use crate::drop_area::DockLocation;
        use crate::indicator::DropPlacement;
        DropTarget {
            window: WindowId::new(1).expect("non-zero"),
            placement: DropPlacement::Outer {
                location: DockLocation::OnRight,
            },
        }
    }

    #[test]
    fn click_below_threshold_cancels() {
        let resolver = FixedResolver(None);
        let mut machine = DragController::default();
        machine.apply_event(
            DragEvent::PointerDown {
                surface: surface(),
                pointer_id: 1,
                position: Point::new(10, 10),
            },
            &resolver,
        );
        let transition = machine.apply_event(
            DragEvent::PointerUp {
                pointer_id: 1,
                position: Point::new(11, 10),
            },
            &resolver,
        );
        assert_eq!(
            transition.effect,
            DragEffect::Canceled {
                reason: DragCancelReason::BelowThreshold
            }
        );
        assert!(!machine.is_active());
    }

    #[test]
    fn threshold_crossing_starts_drag_and_drop_commits() {
        let resolver = FixedResolver(Some(target()));
        let mut machine = DragController::default();
        machine.apply_event(
            DragEvent::PointerDown {
                surface: surface(),
                pointer_id: 1,
                position: Point::new(10, 10),
            },
            &resolver,
        );
        let transition = machine.apply_event(
            DragEvent::PointerMove {
                pointer_id: 1,
                position: Point::new(30, 10),
            },
            &resolver,
        );
        assert!(matches!(transition.effect, DragEffect::DragStarted { .. }));

        let transition = machine.apply_event(
            DragEvent::PointerUp {
                pointer_id: 1,
                position: Point::new(40, 10),
            },
            &resolver,
        );
        assert!(matches!(
            transition.effect,
            DragEffect::Dropped { target: t, .. } if t == target()
        ));
        assert!(!machine.is_active());
    }

    #[test]
    fn release_without_target_floats() {
        let resolver = FixedResolver(None);
        let mut machine = DragController::default();
        machine.apply_event(
            DragEvent::PointerDown {
                surface: surface(),
                pointer_id: 1,
                position: Point::new(10, 10),
            },
            &resolver,
        );
        machine.apply_event(
            DragEvent::PointerMove {
                pointer_id: 1,
                position: Point::new(50, 50),
            },
            &resolver,
        );
        let transition = machine.apply_event(
            DragEvent::PointerUp {
                pointer_id: 1,
                position: Point::new(60, 60),
            },
            &resolver,
        );
        assert!(matches!(
            transition.effect,
            DragEffect::FloatedAt {
                position: Point { x: 60, y: 60 },
                ..
            }
        ));
    }

    #[test]
    fn second_pointer_down_is_ignored_while_active() {
        let resolver = FixedResolver(None);
        let mut machine = DragController::default();
        machine.apply_event(
            DragEvent::PointerDown {
                surface: surface(),
                pointer_id: 1,
                position: Point::new(10, 10),
            },
            &resolver,
        );
        let transition = machine.apply_event(
            DragEvent::PointerDown {
                surface: surface(),
                pointer_id: 2,
                position: Point::new(0, 0),
            },
            &resolver,
        );
        assert_eq!(
            transition.effect,
            DragEffect::Noop {
                reason: DragNoopReason::AlreadyActive
            }
        );
        // The original press is untouched.
        assert!(matches!(machine.state(), DragState::Pressed { pointer_id: 1, .. }));
    }

    #[test]
    fn cancel_mid_drag_leaves_layout_alone() {
        let resolver = FixedResolver(Some(target()));
        let mut machine = DragController::default();
        machine.apply_event(
            DragEvent::PointerDown {
                surface: surface(),
                pointer_id: 1,
                position: Point::new(10, 10),
            },
            &resolver,
        );
        machine.apply_event(
            DragEvent::PointerMove {
                pointer_id: 1,
                position: Point::new(30, 10),
            },
            &resolver,
        );
        let transition = machine.apply_event(DragEvent::Cancel, &resolver);
        assert_eq!(
            transition.effect,
            DragEffect::Canceled {
                reason: DragCancelReason::Explicit
            }
        );
        assert!(!machine.is_active());
    }

    #[test]
    fn target_gone_at_release_degrades_to_float() {
        struct FlakyResolver {
            calls: std::cell::Cell<u32>,
        }
        impl DropTargetResolver for FlakyResolver {
            fn resolve(
                &self,
                _dragged: &WindowBeingDragged,
                _position: Point,
            ) -> Option<DropTarget> {
                let call = self.calls.get();
                self.calls.set(call + 1);
                // Present while dragging, gone at release.
                if call == 0 { Some(target()) } else { None }
            }
        }
        let resolver = FlakyResolver {
            calls: std::cell::Cell::new(0),
        };
        let mut machine = DragController::default();
        machine.apply_event(
            DragEvent::PointerDown {
                surface: surface(),
                pointer_id: 1,
                position: Point::new(10, 10),
            },
            &resolver,
        );
        machine.apply_event(
            DragEvent::PointerMove {
                pointer_id: 1,
                position: Point::new(30, 10),
            },
            &resolver,
        );
        let transition = machine.apply_event(
            DragEvent::PointerUp {
                pointer_id: 1,
                position: Point::new(30, 10),
            },
            &resolver,
        );
        assert!(matches!(transition.effect, DragEffect::FloatedAt { .. }));
    }

    #[test]
    fn force_cancel_is_a_noop_when_idle() {
        let mut machine = DragController::default();
        assert!(machine.force_cancel().is_none());

        let resolver = FixedResolver(None);
        machine.apply_event(
            DragEvent::PointerDown {
                surface: surface(),
                pointer_id: 1,
                position: Point::new(0, 0),
            },
            &resolver,
        );
        let transition = machine.force_cancel().expect("active");
        assert_eq!(
            transition.effect,
            DragEffect::Canceled {
                reason: DragCancelReason::Programmatic
            }
        );
    }
}

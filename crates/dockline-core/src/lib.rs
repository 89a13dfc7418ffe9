#![forbid(unsafe_code)]

//! Core primitives for the dockline docking framework.
//!
//! This crate carries no layout logic. It defines the pixel geometry types
//! shared by the engine and its hosts, and the abstract view capability the
//! layout engine is written against so that no concrete UI backend leaks into
//! the core.

pub mod geometry;
pub mod view;

pub use geometry::{Point, Rect, Size};
pub use view::{RecordingView, View, ViewFactory};

//! The window-system boundary.
//!
//! Everything the group core needs from the display server goes through
//! [`DisplayServer`], which is handed to the core as part of its context
//! instead of living in global state.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::geometry::{Point, Rect};

/// Opaque handle to a window owned by the display server.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct WindowId(pub u32);

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{:#x}", self.0) }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StackMode {
    Above,
    Below,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DisplayError {
    #[error("no such window: {0}")]
    NoSuchWindow(WindowId),
    #[error("window {window} cannot be placed under {parent}")]
    BadParent { window: WindowId, parent: WindowId },
}

pub trait DisplayServer {
    /// Creates the minimal input-only window a container uses as its
    /// placeholder in the parent's stacking order.
    fn create_anchor(&mut self, parent: WindowId, at: Point) -> Result<WindowId, DisplayError>;

    /// Creates a plain child window.
    fn create_window(&mut self, parent: WindowId, geom: Rect) -> Result<WindowId, DisplayError>;

    fn destroy_window(&mut self, window: WindowId);

    fn map_window(&mut self, window: WindowId);

    fn unmap_window(&mut self, window: WindowId);

    fn reparent_window(
        &mut self,
        window: WindowId,
        parent: WindowId,
        at: Point,
    ) -> Result<(), DisplayError>;

    fn configure_window(&mut self, window: WindowId, geom: Rect);

    fn set_input_focus(&mut self, window: WindowId);

    /// Restacks `window` relative to `sibling`, or to the top/bottom of its
    /// parent when no sibling is given.
    fn restack(&mut self, window: WindowId, sibling: Option<WindowId>, mode: StackMode);

    fn warp_pointer(&mut self, to: Point);

    /// The root window `window` ultimately lives under.
    fn root_of(&self, window: WindowId) -> Option<WindowId>;

    /// Whether both windows live on the same underlying display surface.
    fn same_root(&self, a: WindowId, b: WindowId) -> bool {
        match (self.root_of(a), self.root_of(b)) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

//! An in-memory display server.
//!
//! Keeps just enough window-system state (hierarchy, mapping, per-parent
//! stacking, input focus and pointer position) for the group core to be
//! driven and inspected without a real display connection.

use tracing::trace;

use super::display::{DisplayError, DisplayServer, StackMode, WindowId};
use super::geometry::{Point, Rect, Size};
use crate::common::collections::HashMap;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WindowState {
    pub parent: Option<WindowId>,
    pub geom: Rect,
    pub mapped: bool,
    pub input_only: bool,
}

#[derive(Default, Debug)]
pub struct HeadlessDisplay {
    windows: HashMap<WindowId, WindowState>,
    /// Children of each window, bottom to top.
    children: HashMap<WindowId, Vec<WindowId>>,
    next_id: u32,
    focus: Option<WindowId>,
    pointer: Point,
}

impl HeadlessDisplay {
    pub fn new() -> Self {
        HeadlessDisplay { next_id: 1, ..Default::default() }
    }

    /// Adds a new root window (one display surface).
    pub fn add_root(&mut self, size: Size) -> WindowId {
        let id = self.alloc();
        self.windows.insert(id, WindowState {
            parent: None,
            geom: Rect::from_parts(Point::default(), size),
            mapped: true,
            input_only: false,
        });
        self.children.entry(id).or_default();
        id
    }

    pub fn window(&self, id: WindowId) -> Option<&WindowState> { self.windows.get(&id) }

    pub fn exists(&self, id: WindowId) -> bool { self.windows.contains_key(&id) }

    pub fn is_mapped(&self, id: WindowId) -> bool { self.windows.get(&id).is_some_and(|w| w.mapped) }

    pub fn focused(&self) -> Option<WindowId> { self.focus }

    pub fn pointer(&self) -> Point { self.pointer }

    /// Children of `parent`, bottom to top.
    pub fn stacking(&self, parent: WindowId) -> &[WindowId] {
        self.children.get(&parent).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn window_count(&self) -> usize { self.windows.len() }

    fn alloc(&mut self) -> WindowId {
        let id = WindowId(self.next_id);
        self.next_id += 1;
        id
    }

    fn insert_child(&mut self, parent: WindowId, geom: Rect, input_only: bool) -> WindowId {
        let id = self.alloc();
        self.windows.insert(id, WindowState {
            parent: Some(parent),
            geom,
            mapped: false,
            input_only,
        });
        self.children.entry(parent).or_default().push(id);
        self.children.entry(id).or_default();
        id
    }

    fn detach_from_parent(&mut self, id: WindowId) {
        if let Some(parent) = self.windows.get(&id).and_then(|w| w.parent)
            && let Some(siblings) = self.children.get_mut(&parent)
        {
            siblings.retain(|&w| w != id);
        }
    }

    fn is_ancestor(&self, ancestor: WindowId, mut of: WindowId) -> bool {
        loop {
            if of == ancestor {
                return true;
            }
            match self.windows.get(&of).and_then(|w| w.parent) {
                Some(parent) => of = parent,
                None => return false,
            }
        }
    }
}

impl DisplayServer for HeadlessDisplay {
    fn create_anchor(&mut self, parent: WindowId, at: Point) -> Result<WindowId, DisplayError> {
        if !self.exists(parent) {
            return Err(DisplayError::NoSuchWindow(parent));
        }
        let id = self.insert_child(parent, Rect::from_parts(at, Size::new(1, 1)), true);
        trace!(%id, %parent, "created anchor window");
        Ok(id)
    }

    fn create_window(&mut self, parent: WindowId, geom: Rect) -> Result<WindowId, DisplayError> {
        if !self.exists(parent) {
            return Err(DisplayError::NoSuchWindow(parent));
        }
        let id = self.insert_child(parent, geom.at_least_one(), false);
        trace!(%id, %parent, %geom, "created window");
        Ok(id)
    }

    fn destroy_window(&mut self, window: WindowId) {
        if !self.exists(window) {
            return;
        }
        self.detach_from_parent(window);
        let mut stack = vec![window];
        while let Some(id) = stack.pop() {
            if let Some(children) = self.children.remove(&id) {
                stack.extend(children);
            }
            self.windows.remove(&id);
            if self.focus == Some(id) {
                self.focus = None;
            }
        }
    }

    fn map_window(&mut self, window: WindowId) {
        if let Some(w) = self.windows.get_mut(&window) {
            w.mapped = true;
        }
    }

    fn unmap_window(&mut self, window: WindowId) {
        if let Some(w) = self.windows.get_mut(&window) {
            w.mapped = false;
        }
        if self.focus == Some(window) {
            self.focus = None;
        }
    }

    fn reparent_window(
        &mut self,
        window: WindowId,
        parent: WindowId,
        at: Point,
    ) -> Result<(), DisplayError> {
        if !self.exists(window) {
            return Err(DisplayError::NoSuchWindow(window));
        }
        if !self.exists(parent) {
            return Err(DisplayError::NoSuchWindow(parent));
        }
        if self.is_ancestor(window, parent) {
            return Err(DisplayError::BadParent { window, parent });
        }
        self.detach_from_parent(window);
        self.children.entry(parent).or_default().push(window);
        if let Some(w) = self.windows.get_mut(&window) {
            w.parent = Some(parent);
            w.geom = Rect::from_parts(at, w.geom.size());
        }
        Ok(())
    }

    fn configure_window(&mut self, window: WindowId, geom: Rect) {
        if let Some(w) = self.windows.get_mut(&window) {
            w.geom = geom.at_least_one();
        }
    }

    fn set_input_focus(&mut self, window: WindowId) {
        if self.exists(window) {
            self.focus = Some(window);
        }
    }

    fn restack(&mut self, window: WindowId, sibling: Option<WindowId>, mode: StackMode) {
        let Some(parent) = self.windows.get(&window).and_then(|w| w.parent) else {
            return;
        };
        if let Some(sibling) = sibling
            && self.windows.get(&sibling).and_then(|w| w.parent) != Some(parent)
        {
            return;
        }
        let Some(siblings) = self.children.get_mut(&parent) else {
            return;
        };
        siblings.retain(|&w| w != window);
        let at = match (sibling.and_then(|s| siblings.iter().position(|&w| w == s)), mode) {
            (Some(pos), StackMode::Above) => pos + 1,
            (Some(pos), StackMode::Below) => pos,
            (None, StackMode::Above) => siblings.len(),
            (None, StackMode::Below) => 0,
        };
        siblings.insert(at, window);
    }

    fn warp_pointer(&mut self, to: Point) { self.pointer = to; }

    fn root_of(&self, window: WindowId) -> Option<WindowId> {
        let mut cur = window;
        loop {
            match self.windows.get(&cur)?.parent {
                Some(parent) => cur = parent,
                None => return Some(cur),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn display_with_root() -> (HeadlessDisplay, WindowId) {
        let mut display = HeadlessDisplay::new();
        let root = display.add_root(Size::new(1000, 800));
        (display, root)
    }

    #[test]
    fn created_windows_stack_bottom_to_top() {
        let (mut display, root) = display_with_root();
        let a = display.create_window(root, Rect::new(0, 0, 10, 10)).unwrap();
        let b = display.create_window(root, Rect::new(0, 0, 10, 10)).unwrap();
        assert_eq!(display.stacking(root), [a, b]);
        assert!(!display.is_mapped(a));
    }

    #[test]
    fn restack_relative_to_sibling() {
        let (mut display, root) = display_with_root();
        let a = display.create_window(root, Rect::new(0, 0, 10, 10)).unwrap();
        let b = display.create_window(root, Rect::new(0, 0, 10, 10)).unwrap();
        let c = display.create_window(root, Rect::new(0, 0, 10, 10)).unwrap();
        display.restack(c, Some(a), StackMode::Below);
        assert_eq!(display.stacking(root), [c, a, b]);
        display.restack(c, Some(a), StackMode::Above);
        assert_eq!(display.stacking(root), [a, c, b]);
        display.restack(a, None, StackMode::Above);
        assert_eq!(display.stacking(root), [c, b, a]);
    }

    #[test]
    fn roots_are_separate_surfaces() {
        let mut display = HeadlessDisplay::new();
        let root1 = display.add_root(Size::new(100, 100));
        let root2 = display.add_root(Size::new(100, 100));
        let a = display.create_window(root1, Rect::new(0, 0, 10, 10)).unwrap();
        let b = display.create_window(a, Rect::new(0, 0, 5, 5)).unwrap();
        assert!(display.same_root(a, b));
        assert!(!display.same_root(b, root2));
        assert_eq!(display.root_of(b), Some(root1));
    }

    #[test]
    fn reparent_rejects_cycles() {
        let (mut display, root) = display_with_root();
        let a = display.create_window(root, Rect::new(0, 0, 10, 10)).unwrap();
        let b = display.create_window(a, Rect::new(0, 0, 5, 5)).unwrap();
        assert_eq!(
            display.reparent_window(a, b, Point::default()),
            Err(DisplayError::BadParent { window: a, parent: b })
        );
    }

    #[test]
    fn destroy_removes_subtree_and_focus() {
        let (mut display, root) = display_with_root();
        let a = display.create_window(root, Rect::new(0, 0, 10, 10)).unwrap();
        let b = display.create_window(a, Rect::new(0, 0, 5, 5)).unwrap();
        display.set_input_focus(b);
        display.destroy_window(a);
        assert!(!display.exists(a));
        assert!(!display.exists(b));
        assert_eq!(display.focused(), None);
        assert!(display.stacking(root).is_empty());
    }
}

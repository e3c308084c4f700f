//! Groups: containers that stack, focus and place a set of child regions.
//!
//! A [`Group`] has no window of its own apart from a small anchor window
//! that gives it a place in its parent's stacking order and a focus target
//! when no child can take focus. Its children are siblings of the anchor,
//! stacked in the parent's shared stacking order alongside the children of
//! other groups with the same parent.
//!
//! The state of every group lives in the [`Context`], so a group that loses
//! a child to another group updates its focus and markers just as if it had
//! let the child go itself.

pub mod attach;
pub mod config;
mod error;
pub mod focus;
pub mod reflow;

#[cfg(test)]
mod tests;

pub use attach::{AttachParams, AttachSpec, StatusDock};
pub use config::{GroupConfig, ManagedEntry};
pub use error::{AttachError, GroupError};
use slotmap::SlotMap;
use tracing::{debug, trace, warn};

use crate::common::config::Settings;
use crate::model::region::{Region, RegionId, RegionMap};
use crate::model::size_policy::{FitParams, SizeHints};
use crate::model::stacking::{GroupId, StackingId, StackingMap};
use crate::sys::display::{DisplayServer, StackMode, WindowId};
use crate::sys::geometry::Rect;

/// Everything groups share: the display connection, the live regions, the
/// stacking arena and the groups themselves.
pub struct Context<D> {
    pub display: D,
    pub regions: RegionMap,
    pub stacking: StackingMap,
    pub settings: Settings,
    groups: SlotMap<GroupId, GroupState>,
}

#[derive(Debug)]
struct GroupState {
    name: String,
    parent: WindowId,
    geom: Rect,
    anchor: Option<WindowId>,
    /// Node presumed focused.
    current: Option<StackingId>,
    bottom: Option<StackingId>,
    stdisp: Option<StackingId>,
    /// Where the status display was docked.
    dock: Option<StatusDock>,
    mapped: bool,
    focus_control: bool,
    destroying: bool,
}

impl<D> Context<D> {
    pub fn is_live(&self, group: GroupId) -> bool { self.groups.contains_key(group) }

    /// `id` if it still names one of `group`'s nodes.
    fn live(&self, group: GroupId, id: Option<StackingId>) -> Option<StackingId> {
        id.filter(|&id| self.stacking.owner(id) == Some(group))
    }
}

impl<D: DisplayServer> Context<D> {
    pub fn new(display: D, settings: Settings) -> Self {
        Context {
            display,
            regions: RegionMap::new(),
            stacking: StackingMap::new(),
            settings,
            groups: SlotMap::default(),
        }
    }

    /// Takes `region` away from whichever group manages it.
    ///
    /// The previous manager loses the child the same way it would by
    /// detaching it: its markers are cleared and, if the child was focused,
    /// focus moves to the adjacent child.
    pub fn evict(&mut self, region: RegionId) -> Option<GroupId> {
        let manager = self.regions.manager(region)?;
        self.remove_managed(manager, region);
        debug!(?region, ?manager, "evicted region from its manager");
        Some(manager)
    }

    fn remove_managed(&mut self, group: GroupId, region: RegionId) -> bool {
        let Some(id) = self.stacking.find(group, region) else {
            trace!(?region, ?group, "remove_managed: not a member");
            return false;
        };
        let Some((_, adjacent)) = self.stacking.remove(id) else { return false };
        self.regions.unset_manager(region, group);
        let Some(state) = self.groups.get_mut(group) else { return true };
        if state.stdisp == Some(id) {
            state.stdisp = None;
            state.dock = None;
        }
        if state.bottom == Some(id) {
            state.bottom = None;
        }
        let was_current = state.current == Some(id);
        if was_current {
            state.current = None;
        }
        debug!(region = self.regions.name(region), group = %state.name, "removed managed region");

        if was_current && !state.destroying {
            self.refocus(group, adjacent);
        }
        true
    }
}

/// Which managed regions to visit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ManagedFilter {
    All,
    /// Everything except the docked status display.
    NoStatusDisplay,
}

/// Handle to a container of stacked regions.
///
/// Groups must be torn down with [`Group::destroy`]. Dropping a live group
/// panics in debug builds.
#[must_use]
#[derive(Debug)]
pub struct Group {
    id: GroupId,
    destroyed: bool,
}

impl Group {
    pub fn create<D: DisplayServer>(
        cx: &mut Context<D>,
        parent: WindowId,
        fp: &FitParams,
        name: &str,
    ) -> Result<Group, GroupError> {
        let anchor = cx.display.create_anchor(parent, fp.geom.origin())?;
        let id = cx.groups.insert(GroupState {
            name: name.to_string(),
            parent,
            geom: fp.geom,
            anchor: Some(anchor),
            current: None,
            bottom: None,
            stdisp: None,
            dock: None,
            mapped: false,
            focus_control: false,
            destroying: false,
        });
        debug!(?id, name, %parent, geom = %fp.geom, "created group");
        Ok(Group { id, destroyed: false })
    }

    fn state<'a, D>(&self, cx: &'a Context<D>) -> &'a GroupState { &cx.groups[self.id] }

    fn state_mut<'a, D>(&self, cx: &'a mut Context<D>) -> &'a mut GroupState {
        &mut cx.groups[self.id]
    }

    /// Whether the group may be destroyed: only the status display may be
    /// left in it.
    pub fn may_destroy<D>(&self, cx: &Context<D>) -> bool {
        let stdisp = self.state(cx).stdisp;
        let busy = cx.stacking.managed(self.id).any(|id| Some(id) != stdisp);
        if busy {
            warn!(group = self.name(cx), "group not empty, refusing to destroy");
        }
        !busy
    }

    /// Tears the group down.
    ///
    /// The status display is released first, then every other child is
    /// destroyed, then the anchor window. Client windows that should
    /// outlive the group are moved out with [`Group::rescue_clientwins`]
    /// beforehand.
    pub fn destroy<D: DisplayServer>(mut self, cx: &mut Context<D>) {
        self.state_mut(cx).destroying = true;
        if let Some(stdisp) = self.status_display(cx) {
            cx.remove_managed(self.id, stdisp);
            debug_assert!(self.state(cx).stdisp.is_none());
        }
        let children: Vec<_> = self.managed(cx, ManagedFilter::All).collect();
        for region in children {
            cx.remove_managed(self.id, region);
            cx.regions.destroy(region, &mut cx.display);
        }
        debug_assert!(cx.stacking.managed(self.id).next().is_none());
        if let Some(state) = cx.groups.remove(self.id) {
            if let Some(anchor) = state.anchor {
                cx.display.destroy_window(anchor);
            }
            debug!(group = %state.name, "destroyed group");
        }
        self.destroyed = true;
    }

    pub fn id(&self) -> GroupId { self.id }

    pub fn name<'a, D>(&self, cx: &'a Context<D>) -> &'a str { &self.state(cx).name }

    pub fn parent<D>(&self, cx: &Context<D>) -> WindowId { self.state(cx).parent }

    pub fn geometry<D>(&self, cx: &Context<D>) -> Rect { self.state(cx).geom }

    /// The placeholder window, present until the group is destroyed.
    pub fn anchor<D>(&self, cx: &Context<D>) -> Option<WindowId> { self.state(cx).anchor }

    pub fn is_mapped<D>(&self, cx: &Context<D>) -> bool { self.state(cx).mapped }

    /// Whether focus changes inside the group are delivered right away.
    pub fn controls_focus<D>(&self, cx: &Context<D>) -> bool { self.state(cx).focus_control }

    pub fn set_focus_control<D>(&mut self, cx: &mut Context<D>, control: bool) {
        self.state_mut(cx).focus_control = control;
    }

    fn region_of<D>(&self, cx: &Context<D>, id: Option<StackingId>) -> Option<RegionId> {
        cx.live(self.id, id).and_then(|id| cx.stacking.get(id)).map(|n| n.region)
    }

    pub(crate) fn node_of<D>(&self, cx: &Context<D>, region: RegionId) -> Option<StackingId> {
        cx.stacking.find(self.id, region)
    }

    /// The region presumed focused.
    pub fn current<D>(&self, cx: &Context<D>) -> Option<RegionId> {
        self.region_of(cx, self.state(cx).current)
    }

    pub fn bottom<D>(&self, cx: &Context<D>) -> Option<RegionId> {
        self.region_of(cx, self.state(cx).bottom)
    }

    pub fn status_display<D>(&self, cx: &Context<D>) -> Option<RegionId> {
        self.region_of(cx, self.state(cx).stdisp)
    }

    pub fn is_managed<D>(&self, cx: &Context<D>, region: RegionId) -> bool {
        cx.regions.manager(region) == Some(self.id)
    }

    /// Managed regions in management order.
    pub fn managed<'a, D>(
        &'a self,
        cx: &'a Context<D>,
        filter: ManagedFilter,
    ) -> impl Iterator<Item = RegionId> + 'a {
        let skip = match filter {
            ManagedFilter::All => None,
            ManagedFilter::NoStatusDisplay => cx.live(self.id, self.state(cx).stdisp),
        };
        cx.stacking
            .managed(self.id)
            .filter(move |&id| Some(id) != skip)
            .filter_map(move |id| cx.stacking.get(id))
            .map(|node| node.region)
            .filter(move |&region| cx.regions.manager(region) == Some(self.id))
    }

    /// This group's regions in stacking order, bottom to top.
    pub fn stacking_order<'a, D>(&'a self, cx: &'a Context<D>) -> impl Iterator<Item = RegionId> + 'a {
        cx.stacking
            .stack(self.parent(cx))
            .filter_map(move |id| cx.stacking.get(id))
            .filter(move |node| node.owner == self.id)
            .map(|node| node.region)
    }

    /// Renders the group's children, top of the stacking order first.
    pub fn draw_tree<D>(&self, cx: &Context<D>) -> String {
        let order: Vec<_> = self.stacking_order(cx).collect();
        let children = order
            .iter()
            .rev()
            .filter_map(|&region_id| {
                let node = cx.stacking.get(self.node_of(cx, region_id)?)?;
                let region = cx.regions.get(region_id)?;
                let mut marks = String::new();
                if self.current(cx) == Some(region_id) {
                    marks.push_str(" *current");
                }
                if self.bottom(cx) == Some(region_id) {
                    marks.push_str(" *bottom");
                }
                if self.status_display(cx) == Some(region_id) {
                    marks.push_str(" *status");
                }
                Some(ascii_tree::Tree::Leaf(vec![format!(
                    "{} [{}] {} {}{marks}",
                    region.name(),
                    node.level,
                    node.size_policy,
                    region.geometry(),
                )]))
            })
            .collect();
        let state = self.state(cx);
        let tree = ascii_tree::Tree::Node(format!("{} {}", state.name, state.geom), children);
        let mut out = String::new();
        if ascii_tree::write_tree(&mut out, &tree).is_err() {
            warn!(group = %state.name, "could not render group tree");
        }
        out
    }

    /// Stops managing `region`. Does nothing if it is not managed here.
    ///
    /// If the region was the focused one, focus moves to the region that
    /// was adjacent to it in the stacking order.
    pub fn remove_managed<D: DisplayServer>(&mut self, cx: &mut Context<D>, region: RegionId) -> bool {
        cx.remove_managed(self.id, region)
    }

    /// The group's size constraints are those of its bottom region.
    pub fn size_hints<D>(&self, cx: &Context<D>) -> SizeHints {
        self.bottom(cx)
            .and_then(|region| cx.regions.get(region))
            .map(|region| SizeHints { min: region.size_hints().min, preferred: None })
            .unwrap_or_default()
    }

    /// Restacks the group relative to a sibling window, children following
    /// the anchor.
    pub fn restack<D: DisplayServer>(
        &self,
        cx: &mut Context<D>,
        other: Option<WindowId>,
        mode: StackMode,
    ) {
        let Some(anchor) = self.anchor(cx) else { return };
        cx.display.restack(anchor, other, mode);
        let mut below = anchor;
        let windows: Vec<_> = self
            .stacking_order(cx)
            .filter_map(|region| cx.regions.get(region).and_then(|r| r.window()))
            .collect();
        for window in windows {
            cx.display.restack(window, Some(below), StackMode::Above);
            below = window;
        }
    }

    /// Raises `region` to the top of its tier.
    pub fn raise<D: DisplayServer>(&mut self, cx: &mut Context<D>, region: RegionId) -> Result<(), GroupError> {
        let Some(id) = self.node_of(cx, region) else {
            warn!(?region, group = self.name(cx), "region not managed by the group");
            return Err(GroupError::NotMember(region));
        };
        if cx.live(self.id, self.state(cx).bottom) == Some(id) {
            trace!(?region, "not raising the bottom region");
            return Ok(());
        }
        self.do_raise(cx, id, false);
        Ok(())
    }

    pub(crate) fn do_raise<D: DisplayServer>(&self, cx: &mut Context<D>, id: StackingId, initial: bool) {
        cx.stacking.raise(id, initial);
        self.sync_window(cx, id);
    }

    /// Lowers `region` to the bottom of its tier, but not below the
    /// group's bottom region.
    pub fn lower<D: DisplayServer>(&mut self, cx: &mut Context<D>, region: RegionId) -> Result<(), GroupError> {
        let Some(id) = self.node_of(cx, region) else {
            warn!(?region, group = self.name(cx), "region not managed by the group");
            return Err(GroupError::NotMember(region));
        };
        self.do_lower(cx, id);
        Ok(())
    }

    pub(crate) fn do_lower<D: DisplayServer>(&self, cx: &mut Context<D>, id: StackingId) {
        let floor = cx.live(self.id, self.state(cx).bottom);
        cx.stacking.lower(id, floor);
        self.sync_window(cx, id);
        self.drop_anchor(cx);
    }

    /// Moves the display window of `id` next to its neighbours in the
    /// shared stacking order.
    pub(crate) fn sync_window<D: DisplayServer>(&self, cx: &mut Context<D>, id: StackingId) {
        let Some(window) = window_of(cx, id) else { return };
        let mut below = cx.stacking.below(id);
        while let Some(b) = below {
            if let Some(sibling) = window_of(cx, b) {
                cx.display.restack(window, Some(sibling), StackMode::Above);
                return;
            }
            below = cx.stacking.below(b);
        }
        let mut above = cx.stacking.above(id);
        while let Some(a) = above {
            if let Some(sibling) = window_of(cx, a) {
                cx.display.restack(window, Some(sibling), StackMode::Below);
                return;
            }
            above = cx.stacking.above(a);
        }
        if let Some(anchor) = self.anchor(cx) {
            cx.display.restack(window, Some(anchor), StackMode::Above);
        }
    }

    /// Keeps the anchor window below every child window of the group.
    fn drop_anchor<D: DisplayServer>(&self, cx: &mut Context<D>) {
        let Some(anchor) = self.anchor(cx) else { return };
        let lowest = self
            .stacking_order(cx)
            .find_map(|region| cx.regions.get(region).and_then(|r| r.window()));
        if let Some(lowest) = lowest {
            cx.display.restack(anchor, Some(lowest), StackMode::Below);
        }
    }
}

fn window_of<D>(cx: &Context<D>, id: StackingId) -> Option<WindowId> {
    let node = cx.stacking.get(id)?;
    cx.regions.get(node.region)?.window()
}

impl Drop for Group {
    fn drop(&mut self) {
        if cfg!(debug_assertions) && !self.destroyed && !std::thread::panicking() {
            panic!("Group {:?} dropped without Group::destroy being called", self.id);
        }
    }
}

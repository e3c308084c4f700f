//! Picking, moving and delivering focus inside a group.

use tracing::{debug, trace};

use super::{Context, Group};
use crate::model::region::{FocusOutcome, Region, RegionId};
use crate::model::stacking::{GroupId, StackingId};
use crate::sys::display::DisplayServer;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// Up the stacking order.
    Forward,
    /// Down the stacking order.
    Backward,
}

impl<D> Context<D> {
    /// Whether `id` is a node of `group` whose region may take focus.
    fn focusable(&self, group: GroupId, id: StackingId) -> bool {
        let Some(node) = self.stacking.get(id) else { return false };
        node.owner == group
            && self.regions.manager(node.region) == Some(group)
            && self.regions.get(node.region).is_some_and(|r| !r.skip_focus())
    }

    /// Finds the node of `group` that should hold focus, preferring `hint`.
    ///
    /// A hint that cannot take focus itself, such as the status display, is
    /// ignored. The topmost focusable node decides: if it is modal, `hint` is
    /// only taken when it is on the same tier; otherwise any valid `hint`
    /// wins.
    pub(crate) fn find_to_focus(&self, group: GroupId, hint: Option<StackingId>) -> Option<StackingId> {
        let parent = self.groups.get(group)?.parent;
        let hint = self.live(group, hint).filter(|&h| self.focusable(group, h));
        let top = self.stacking.stack_rev(parent).find(|&id| self.focusable(group, id))?;
        let top_level = self.stacking.get(top)?.level;
        let hint_level = hint.and_then(|h| self.stacking.get(h)).map(|n| n.level);
        match hint {
            Some(hint) if !top_level.is_modal() || hint_level == Some(top_level) => Some(hint),
            _ => Some(top),
        }
    }
}

impl<D: DisplayServer> Context<D> {
    /// Moves focus in `group` to the node found for `hint`.
    ///
    /// Without focus control the choice is only recorded, to take effect
    /// once the group gets focus. Returns whether anything changed.
    pub(crate) fn refocus(&mut self, group: GroupId, hint: Option<StackingId>) -> bool {
        let Some(state) = self.groups.get(group) else { return false };
        let (current, focus_control) = (state.current, state.focus_control);
        let Some(target) = self.find_to_focus(group, hint) else {
            if focus_control {
                self.fallback_focus(group, false);
            }
            return false;
        };
        if self.live(group, current) == Some(target) {
            return false;
        }
        if focus_control {
            self.give_focus(group, target, false);
        } else if let Some(state) = self.groups.get_mut(group) {
            trace!(group = %state.name, "recording focus target without control");
            state.current = Some(target);
        }
        true
    }

    fn give_focus(&mut self, group: GroupId, id: StackingId, warp: bool) -> Option<FocusOutcome> {
        let region = self.stacking.get(id)?.region;
        let outcome = self.regions.get_mut(region)?.request_focus(&mut self.display, warp);
        if outcome == FocusOutcome::Taken
            && let Some(state) = self.groups.get_mut(group)
        {
            state.current = Some(id);
        }
        debug!(region = self.regions.name(region), ?outcome, "focus requested");
        Some(outcome)
    }

    /// Focuses `group` itself, through its anchor window.
    fn fallback_focus(&mut self, group: GroupId, warp: bool) {
        let Some(state) = self.groups.get(group) else { return };
        let Some(anchor) = state.anchor else { return };
        if warp && self.settings.warp_enabled {
            self.display.warp_pointer(state.geom.center());
        }
        debug!(group = %state.name, "focus falls back to the group");
        self.display.set_input_focus(anchor);
    }
}

impl Group {
    /// Focuses the group itself, through its anchor window.
    pub fn fallback_focus<D: DisplayServer>(&self, cx: &mut Context<D>, warp: bool) {
        cx.fallback_focus(self.id, warp);
    }

    /// Gives the group focus and passes it on to the current region, or
    /// the best candidate, or the group itself.
    pub fn do_set_focus<D: DisplayServer>(&mut self, cx: &mut Context<D>, warp: bool) {
        self.state_mut(cx).focus_control = true;
        let target = cx
            .live(self.id, self.state(cx).current)
            .filter(|&id| cx.focusable(self.id, id))
            .or_else(|| cx.find_to_focus(self.id, None));
        match target {
            Some(id) => {
                cx.give_focus(self.id, id, warp);
            }
            None => cx.fallback_focus(self.id, warp),
        }
    }

    /// Records that `region` received focus.
    pub fn managed_activated<D>(&mut self, cx: &mut Context<D>, region: RegionId) {
        if let Some(id) = self.node_of(cx, region) {
            self.state_mut(cx).current = Some(id);
        }
    }

    /// The region that would actually get focus if `region` asked for it.
    pub fn prepare_focus<D>(&self, cx: &Context<D>, region: RegionId) -> Option<RegionId> {
        let id = self.node_of(cx, region)?;
        let target = cx.find_to_focus(self.id, Some(id))?;
        cx.stacking.get(target).map(|n| n.region)
    }

    /// Activates the next (or previous) region in stacking order, skipping
    /// the status display and wrapping around.
    ///
    /// Returns `None` when there is no region other than the current one.
    pub fn circulate<D: DisplayServer>(
        &mut self,
        cx: &mut Context<D>,
        direction: Direction,
    ) -> Option<RegionId> {
        let target = self.circulate_target(cx, direction)?;
        if self.controls_focus(cx) {
            cx.give_focus(self.id, target, false);
        } else {
            self.state_mut(cx).current = Some(target);
        }
        cx.stacking.get(target).map(|n| n.region)
    }

    fn circulate_target<D>(&self, cx: &Context<D>, direction: Direction) -> Option<StackingId> {
        let state = self.state(cx);
        let start = cx.live(self.id, state.current);
        let stdisp = cx.live(self.id, state.stdisp);
        let step = |id: StackingId| match direction {
            Direction::Forward => cx.stacking.above(id),
            Direction::Backward => cx.stacking.below(id),
        };
        let first = match direction {
            Direction::Forward => cx.stacking.stack(state.parent).next(),
            Direction::Backward => cx.stacking.stack_rev(state.parent).next(),
        };
        let eligible = |id: StackingId| {
            Some(id) != start
                && Some(id) != stdisp
                && cx.stacking.get(id).is_some_and(|n| {
                    n.owner == self.id && self.is_managed(cx, n.region)
                })
        };

        let origin = start.and_then(step).or(first)?;
        let mut id = origin;
        loop {
            if eligible(id) {
                return Some(id);
            }
            id = step(id).or(first)?;
            if id == origin {
                return None;
            }
        }
    }
}

//! Placing a group's children when the group moves, resizes or changes
//! parent, and when a child asks for new geometry.

use tracing::{debug, warn};

use super::{Context, Group, GroupError, ManagedFilter};
use crate::model::region::{Region, RegionId};
use crate::model::size_policy::{FitParams, RqGeomFlags};
use crate::sys::display::{DisplayServer, WindowId};
use crate::sys::geometry::Rect;

/// Outcome of a reflow that went through.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReflowReport {
    /// Children that refused their new placement and were detached.
    pub rejected: Vec<RegionId>,
}

impl Group {
    /// Fits the group to `fp`, moving it under `new_parent` if given.
    ///
    /// Children are shifted by the group's movement, then re-placed through
    /// their size policies. A child that refuses is detached and reported;
    /// the rest of the reflow goes on. Moving to a parent on a different
    /// display surface, or one the anchor cannot be moved under, fails
    /// before anything is touched.
    pub fn fitrep<D: DisplayServer>(
        &mut self,
        cx: &mut Context<D>,
        new_parent: Option<WindowId>,
        fp: &FitParams,
    ) -> Result<ReflowReport, GroupError> {
        let (from, to_geom) = (self.parent(cx), fp.geom);
        if let Some(parent) = new_parent
            && !cx.display.same_root(from, parent)
        {
            return Err(GroupError::CrossSurfaceReparent { from, to: parent });
        }

        let (dx, dy) = to_geom.offset_from(&self.geometry(cx));
        if let Some(parent) = new_parent {
            if let Some(anchor) = self.anchor(cx) {
                cx.display.reparent_window(anchor, parent, to_geom.origin())?;
            }
            // A docked status display is re-docked by whoever owns it.
            if let Some(stdisp) = self.status_display(cx) {
                self.remove_managed(cx, stdisp);
            }
            if parent != from {
                let unweaved = cx.stacking.unweave(from, self.id);
                debug!(group = self.name(cx), nodes = unweaved.len(), %parent, "moving group");
                cx.stacking.weave(unweaved, parent);
                self.state_mut(cx).parent = parent;
            }
        }
        self.state_mut(cx).geom = to_geom;

        let mut report = ReflowReport::default();
        let children: Vec<_> = self.managed(cx, ManagedFilter::All).collect();
        for region in children {
            let Some(policy) = self.node_of(cx, region).and_then(|id| cx.stacking.get(id)) else {
                continue;
            };
            let policy = policy.size_policy;
            let Some(child) = cx.regions.get_mut(region) else { continue };
            let shifted = child.geometry().translate(dx, dy);
            let mut child_fp = *fp;
            policy.resolve(shifted, &child.size_hints(), None, RqGeomFlags::WEAK_ALL, &mut child_fp);
            if !child.fit(&mut cx.display, new_parent, &child_fp) {
                warn!(region = child.name(), "error reparenting region");
                self.remove_managed(cx, region);
                report.rejected.push(region);
            }
        }

        if new_parent.is_some() {
            let nodes: Vec<_> = self
                .stacking_order(cx)
                .filter_map(|region| self.node_of(cx, region))
                .collect();
            for id in nodes {
                self.sync_window(cx, id);
            }
        }
        Ok(report)
    }

    pub fn map<D: DisplayServer>(&mut self, cx: &mut Context<D>) {
        self.state_mut(cx).mapped = true;
        if let Some(anchor) = self.anchor(cx) {
            cx.display.map_window(anchor);
        }
        let children: Vec<_> = self.managed(cx, ManagedFilter::All).collect();
        for region in children {
            if let Some(child) = cx.regions.get_mut(region) {
                child.map(&mut cx.display);
            }
        }
    }

    pub fn unmap<D: DisplayServer>(&mut self, cx: &mut Context<D>) {
        self.state_mut(cx).mapped = false;
        if let Some(anchor) = self.anchor(cx) {
            cx.display.unmap_window(anchor);
        }
        let children: Vec<_> = self.managed(cx, ManagedFilter::All).collect();
        for region in children {
            if let Some(child) = cx.regions.get_mut(region) {
                child.unmap(&mut cx.display);
            }
        }
    }

    /// Handles a child's request for `geom`.
    ///
    /// The request goes through the child's size policy; the resulting
    /// geometry is returned and, unless `TRY_ONLY` is set, applied.
    pub fn managed_rqgeom<D: DisplayServer>(
        &mut self,
        cx: &mut Context<D>,
        region: RegionId,
        flags: RqGeomFlags,
        geom: Rect,
    ) -> Option<Rect> {
        let policy = self.node_of(cx, region).and_then(|id| cx.stacking.get(id)).map(|n| n.size_policy);
        let area = self.geometry(cx);
        let child = cx.regions.get_mut(region)?;
        let fp = match policy {
            Some(policy) => {
                let mut fp = FitParams::exact(area);
                policy.resolve(child.geometry(), &child.size_hints(), Some(geom), flags, &mut fp);
                fp
            }
            None => FitParams::exact(geom),
        };
        if !flags.contains(RqGeomFlags::TRY_ONLY) {
            child.fit(&mut cx.display, None, &fp);
        }
        Some(fp.geom)
    }
}

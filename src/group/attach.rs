//! Attaching regions to a group.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{AttachError, Context, Group, ManagedFilter};
use crate::model::region::{Region, RegionConfig, RegionId};
use crate::model::size_policy::{Corner, FitParams, RqGeomFlags, SizePolicy};
use crate::model::stacking::{StackingId, StackingLevel};
use crate::sys::display::{DisplayServer, WindowId};
use crate::sys::geometry::Rect;

/// Geometry in an attach request, relative to the group.
///
/// Only used when all four fields are present.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct GeomParam {
    pub x: Option<i32>,
    pub y: Option<i32>,
    pub w: Option<i32>,
    pub h: Option<i32>,
}

impl GeomParam {
    pub fn rect(&self) -> Option<Rect> {
        Some(Rect::new(self.x?, self.y?, self.w?, self.h?))
    }
}

impl From<Rect> for GeomParam {
    fn from(r: Rect) -> Self {
        GeomParam { x: Some(r.x), y: Some(r.y), w: Some(r.w), h: Some(r.h) }
    }
}

/// Options recognized when attaching a region.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct AttachParams {
    /// Stacking tier. Negative values are ignored.
    pub level: Option<i64>,
    /// Attach at the first modal tier, unless `level` is given.
    pub modal: bool,
    /// Focus the region once attached. Defaults to the global setting.
    #[serde(alias = "switchto")]
    pub switch_to: Option<bool>,
    /// Make the region the group's bottom.
    pub bottom: bool,
    #[serde(alias = "sizepolicy")]
    pub size_policy: Option<SizePolicy>,
    pub geom: Option<GeomParam>,
    /// Position in the group's management list.
    pub index: Option<usize>,
}

impl AttachParams {
    pub fn with_geom(mut self, geom: Rect) -> Self {
        self.geom = Some(geom.into());
        self
    }

    pub fn with_level(mut self, level: StackingLevel) -> Self {
        self.level = Some(i64::from(level.0));
        self
    }

    pub fn with_size_policy(mut self, policy: SizePolicy) -> Self {
        self.size_policy = Some(policy);
        self
    }

    pub fn level(&self, default: StackingLevel) -> StackingLevel {
        match self.level.and_then(|l| u32::try_from(l).ok()) {
            Some(level) => StackingLevel(level),
            None if self.modal => StackingLevel::MODAL1,
            None => default,
        }
    }
}

/// Where a status display is docked.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct StatusDock {
    #[serde(default)]
    pub corner: Corner,
    #[serde(default)]
    pub fullsize: bool,
}

/// A region to create from its saved configuration, with attach options.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct AttachSpec {
    pub region: RegionConfig,
    #[serde(default)]
    pub params: AttachParams,
}

impl Group {
    fn check_bottom<D>(&self, cx: &Context<D>, params: &AttachParams) -> Result<(), AttachError> {
        if params.bottom && self.bottom(cx).is_some() {
            warn!(group = self.name(cx), "'bottom' already set");
            return Err(AttachError::StructuralConflict);
        }
        Ok(())
    }

    /// Attaches the region `factory` produces.
    ///
    /// The factory gets the parent window and the fit the region should
    /// start with. If it yields nothing, no state has changed.
    pub fn attach_with<D, F>(
        &mut self,
        cx: &mut Context<D>,
        params: &AttachParams,
        factory: F,
    ) -> Result<RegionId, AttachError>
    where
        D: DisplayServer,
        F: FnOnce(&mut Context<D>, WindowId, &FitParams) -> Option<RegionId>,
    {
        self.check_bottom(cx, params)?;

        let area = self.geometry(cx);
        let fp = match params.geom.and_then(|g| g.rect()) {
            Some(g) => FitParams::exact(Rect::new(
                g.x + area.x,
                g.y + area.y,
                g.w.max(1),
                g.h.max(1),
            )),
            None => FitParams::whatever(area),
        };
        let parent = self.parent(cx);
        let region = factory(cx, parent, &fp).ok_or(AttachError::FactoryFailed)?;

        let policy = params.size_policy.unwrap_or(SizePolicy::UNCONSTRAINED);
        if !policy.is_unconstrained()
            && let Some(child) = cx.regions.get_mut(region)
        {
            let mut fp = FitParams::exact(area);
            policy.resolve(
                child.geometry(),
                &child.size_hints(),
                None,
                RqGeomFlags::WEAK_ALL,
                &mut fp,
            );
            child.fit(&mut cx.display, None, &fp);
        }

        let level = params.level(cx.settings.default_level);
        let id = self.add_managed(cx, region, level, policy, params.index, params.bottom)?;
        if params.bottom {
            self.state_mut(cx).bottom = Some(id);
        }

        let switch_to = params.switch_to.unwrap_or(cx.settings.switch_to_new);
        if switch_to || level.is_modal() {
            cx.refocus(self.id, switch_to.then_some(id));
        }
        Ok(region)
    }

    /// Links `region` into the group and places it in the stacking order.
    fn add_managed<D: DisplayServer>(
        &mut self,
        cx: &mut Context<D>,
        region: RegionId,
        level: StackingLevel,
        policy: SizePolicy,
        index: Option<usize>,
        bottom: bool,
    ) -> Result<StackingId, AttachError> {
        if !cx.regions.contains(region) || cx.regions.manager(region).is_some() {
            warn!(?region, group = self.name(cx), "region missing or managed elsewhere");
            return Err(AttachError::Rejected(region));
        }
        let parent = self.parent(cx);
        let id = cx.stacking.insert(self.id, parent, region, level, policy, index);
        cx.regions.set_manager(region, self.id);
        if bottom {
            self.do_lower(cx, id);
        } else {
            self.do_raise(cx, id, true);
        }
        if self.is_mapped(cx)
            && let Some(child) = cx.regions.get_mut(region)
        {
            child.map(&mut cx.display);
        }
        debug!(region = cx.regions.name(region), %level, %policy, group = self.name(cx), "attached");
        Ok(id)
    }

    /// Moves an existing region into the group.
    pub fn attach<D: DisplayServer>(
        &mut self,
        cx: &mut Context<D>,
        region: RegionId,
        params: &AttachParams,
    ) -> Result<RegionId, AttachError> {
        self.check_bottom(cx, params)?;
        if self.is_managed(cx, region) {
            self.remove_managed(cx, region);
        }
        self.attach_with(cx, params, |cx, parent, fp| {
            cx.evict(region);
            let child = cx.regions.get_mut(region)?;
            child.fit(&mut cx.display, Some(parent), fp).then_some(region)
        })
    }

    /// Creates a region from `spec` and attaches it. A region that was
    /// created but could not be attached is destroyed again.
    pub fn attach_new<D: DisplayServer>(
        &mut self,
        cx: &mut Context<D>,
        spec: &AttachSpec,
    ) -> Result<RegionId, AttachError> {
        let mut created = None;
        let result = self.attach_with(cx, &spec.params, |cx, parent, fp| {
            let region = spec
                .region
                .load(&mut cx.display, parent, fp)
                .inspect_err(|err| warn!(%err, name = spec.region.name(), "could not create region"))
                .ok()?;
            let id = cx.regions.insert(region);
            created = Some(id);
            Some(id)
        });
        if result.is_err()
            && let Some(id) = created
        {
            cx.regions.destroy(id, &mut cx.display);
        }
        result
    }

    /// Docks `region` as the group's status display.
    ///
    /// Re-docking the current status display only updates its placement.
    pub fn manage_stdisp<D: DisplayServer>(
        &mut self,
        cx: &mut Context<D>,
        region: RegionId,
        corner: Corner,
        fullsize: bool,
    ) -> Result<(), AttachError> {
        let orientation =
            cx.regions.get(region).ok_or(AttachError::Rejected(region))?.orientation();
        let policy = SizePolicy::status_display(corner, fullsize, orientation);

        let dock = StatusDock { corner, fullsize };
        if self.status_display(cx) == Some(region) {
            let stdisp = self.state(cx).stdisp;
            let Some(node) = stdisp.and_then(|id| cx.stacking.get_mut(id)) else {
                return Err(AttachError::Rejected(region));
            };
            let unchanged = node.size_policy == policy;
            node.size_policy = policy;
            self.state_mut(cx).dock = Some(dock);
            if unchanged {
                return Ok(());
            }
        } else {
            self.unmanage_stdisp(cx);
            if self.is_managed(cx, region) {
                self.remove_managed(cx, region);
            } else {
                cx.evict(region);
            }
            let id =
                self.add_managed(cx, region, StackingLevel::ON_TOP, policy, None, false)?;
            let state = self.state_mut(cx);
            state.stdisp = Some(id);
            state.dock = Some(dock);
        }

        let area = self.geometry(cx);
        if let Some(child) = cx.regions.get_mut(region) {
            let mut fp = FitParams::exact(area);
            policy.resolve(child.geometry(), &child.size_hints(), None, RqGeomFlags::empty(), &mut fp);
            child.fit(&mut cx.display, None, &fp);
        }
        Ok(())
    }

    /// Undocks the status display, leaving it unmanaged.
    pub fn unmanage_stdisp<D: DisplayServer>(&mut self, cx: &mut Context<D>) -> Option<RegionId> {
        let region = self.status_display(cx)?;
        self.remove_managed(cx, region);
        Some(region)
    }

    /// How the status display is docked, if there is one.
    pub fn status_dock<D>(&self, cx: &Context<D>) -> Option<StatusDock> {
        self.status_display(cx).and(self.state(cx).dock)
    }

    /// Moves every client window out to `target`, so that it survives this
    /// group being destroyed. The status display stays.
    ///
    /// Returns the client windows `target` refused. They are taken back here
    /// when possible.
    pub fn rescue_clientwins<D: DisplayServer>(
        &mut self,
        cx: &mut Context<D>,
        target: &mut Group,
    ) -> Vec<RegionId> {
        let clients: Vec<_> = self
            .managed(cx, ManagedFilter::NoStatusDisplay)
            .filter(|&region| cx.regions.get(region).is_some_and(|r| r.is_client()))
            .collect();
        let params = AttachParams { switch_to: Some(false), ..AttachParams::default() };
        let mut refused = Vec::new();
        for region in clients {
            if let Err(err) = target.attach(cx, region, &params) {
                warn!(%err, region = cx.regions.name(region), "could not rescue client window");
                if !self.is_managed(cx, region) && self.attach(cx, region, &params).is_err() {
                    warn!(region = cx.regions.name(region), "client window left unmanaged");
                }
                refused.push(region);
            }
        }
        debug!(from = self.name(cx), to = target.name(cx), refused = refused.len(), "rescued client windows");
        refused
    }
}

//! Regions: the children a group places, stacks and focuses.
//!
//! The group core only talks to regions through the [`Region`] capability.
//! The closed set of concrete regions is [`RegionKind`], dispatched with
//! `enum_dispatch`. Which group manages a region is recorded in
//! [`RegionMap`] as an id lookup rather than a pointer on the region.

use enum_dispatch::enum_dispatch;
use serde::{Deserialize, Serialize};
use slotmap::{SecondaryMap, SlotMap};
use tracing::trace;

use crate::model::size_policy::{FitMode, FitParams, SizeHints};
use crate::model::stacking::GroupId;
use crate::sys::display::{DisplayError, DisplayServer, WindowId};
use crate::sys::geometry::{Rect, Size};

slotmap::new_key_type! {
    /// Identifies a region for as long as it exists.
    pub struct RegionId;
}

#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum_macros::EnumString,
    strum_macros::Display
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Orientation {
    #[default]
    Horizontal,
    Vertical,
}

/// Result of asking a region to take the input focus.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FocusOutcome {
    /// The focus moved before the call returned.
    Taken,
    /// The region was asked and will report activation later.
    Deferred,
}

#[enum_dispatch]
pub trait Region {
    fn name(&self) -> &str;

    fn geometry(&self) -> Rect;

    /// The window backing this region, if it has one.
    fn window(&self) -> Option<WindowId>;

    fn parent(&self) -> WindowId;

    fn is_mapped(&self) -> bool;

    /// Fits the region to `fp`, reparenting it first when `parent` is given.
    /// Returns false if the region could not be placed there.
    fn fit(
        &mut self,
        display: &mut dyn DisplayServer,
        parent: Option<WindowId>,
        fp: &FitParams,
    ) -> bool;

    fn map(&mut self, display: &mut dyn DisplayServer);

    fn unmap(&mut self, display: &mut dyn DisplayServer);

    fn request_focus(&mut self, display: &mut dyn DisplayServer, warp: bool) -> FocusOutcome;

    /// Regions that opt out are never picked as focus targets.
    fn skip_focus(&self) -> bool;

    fn size_hints(&self) -> SizeHints;

    fn orientation(&self) -> Orientation;

    fn configuration(&self) -> RegionConfig;

    /// Releases the region's display resources.
    fn destroy(&mut self, display: &mut dyn DisplayServer);
}

#[enum_dispatch(Region)]
#[derive(Debug)]
pub enum RegionKind {
    Frame,
    ClientWindow,
    StatusDisplay,
}

/// State every window-backed region carries.
#[derive(Debug, Clone)]
struct Surface {
    name: String,
    window: WindowId,
    parent: WindowId,
    geom: Rect,
    mapped: bool,
}

impl Surface {
    fn create(
        display: &mut dyn DisplayServer,
        parent: WindowId,
        geom: Rect,
        name: &str,
    ) -> Result<Surface, DisplayError> {
        let geom = geom.at_least_one();
        let window = display.create_window(parent, geom)?;
        Ok(Surface {
            name: name.to_string(),
            window,
            parent,
            geom,
            mapped: false,
        })
    }

    fn place(
        &mut self,
        display: &mut dyn DisplayServer,
        parent: Option<WindowId>,
        geom: Rect,
    ) -> bool {
        if let Some(parent) = parent
            && parent != self.parent
        {
            if !display.same_root(self.parent, parent) {
                return false;
            }
            if let Err(err) = display.reparent_window(self.window, parent, geom.origin()) {
                trace!(?err, name = %self.name, "reparent refused");
                return false;
            }
            self.parent = parent;
        }
        self.geom = geom.at_least_one();
        display.configure_window(self.window, self.geom);
        true
    }

    fn map(&mut self, display: &mut dyn DisplayServer) {
        self.mapped = true;
        display.map_window(self.window);
    }

    fn unmap(&mut self, display: &mut dyn DisplayServer) {
        self.mapped = false;
        display.unmap_window(self.window);
    }

    fn focus(&mut self, display: &mut dyn DisplayServer, warp: bool) {
        if warp {
            display.warp_pointer(self.geom.center());
        }
        display.set_input_focus(self.window);
    }
}

/// A frame: takes whatever geometry it is given.
#[derive(Debug, Clone)]
pub struct Frame {
    surface: Surface,
}

impl Frame {
    pub fn create(
        display: &mut dyn DisplayServer,
        parent: WindowId,
        fp: &FitParams,
        name: &str,
    ) -> Result<Frame, DisplayError> {
        Ok(Frame {
            surface: Surface::create(display, parent, fp.geom, name)?,
        })
    }
}

impl Region for Frame {
    fn name(&self) -> &str { &self.surface.name }

    fn geometry(&self) -> Rect { self.surface.geom }

    fn window(&self) -> Option<WindowId> { Some(self.surface.window) }

    fn parent(&self) -> WindowId { self.surface.parent }

    fn is_mapped(&self) -> bool { self.surface.mapped }

    fn fit(
        &mut self,
        display: &mut dyn DisplayServer,
        parent: Option<WindowId>,
        fp: &FitParams,
    ) -> bool {
        self.surface.place(display, parent, fp.geom)
    }

    fn map(&mut self, display: &mut dyn DisplayServer) { self.surface.map(display) }

    fn unmap(&mut self, display: &mut dyn DisplayServer) { self.surface.unmap(display) }

    fn request_focus(&mut self, display: &mut dyn DisplayServer, warp: bool) -> FocusOutcome {
        self.surface.focus(display, warp);
        FocusOutcome::Taken
    }

    fn skip_focus(&self) -> bool { false }

    fn size_hints(&self) -> SizeHints { SizeHints::default() }

    fn orientation(&self) -> Orientation { Orientation::Horizontal }

    fn configuration(&self) -> RegionConfig {
        RegionConfig::Frame { name: self.surface.name.clone() }
    }

    fn destroy(&mut self, display: &mut dyn DisplayServer) {
        display.destroy_window(self.surface.window)
    }
}

/// An application window.
///
/// Honors its minimum size when the fit mode allows, may take focus
/// asynchronously, and refuses every fit once its window is gone.
#[derive(Debug, Clone)]
pub struct ClientWindow {
    surface: Surface,
    min_size: Option<Size>,
    deferred_focus: bool,
    defunct: bool,
}

impl ClientWindow {
    pub fn create(
        display: &mut dyn DisplayServer,
        parent: WindowId,
        fp: &FitParams,
        name: &str,
    ) -> Result<ClientWindow, DisplayError> {
        Ok(ClientWindow {
            surface: Surface::create(display, parent, fp.geom, name)?,
            min_size: None,
            deferred_focus: false,
            defunct: false,
        })
    }

    pub fn with_min_size(mut self, min: Size) -> Self {
        self.min_size = Some(min);
        self
    }

    /// Focus is handed over by message; the client confirms later.
    pub fn with_deferred_focus(mut self) -> Self {
        self.deferred_focus = true;
        self
    }

    /// The client's window vanished behind our back.
    pub fn mark_defunct(&mut self) { self.defunct = true; }
}

impl Region for ClientWindow {
    fn name(&self) -> &str { &self.surface.name }

    fn geometry(&self) -> Rect { self.surface.geom }

    fn window(&self) -> Option<WindowId> { Some(self.surface.window) }

    fn parent(&self) -> WindowId { self.surface.parent }

    fn is_mapped(&self) -> bool { self.surface.mapped }

    fn fit(
        &mut self,
        display: &mut dyn DisplayServer,
        parent: Option<WindowId>,
        fp: &FitParams,
    ) -> bool {
        if self.defunct {
            return false;
        }
        let geom = match (fp.mode, self.min_size) {
            (FitMode::Exact, _) | (_, None) => fp.geom,
            (FitMode::Whatever, Some(min)) => fp.geom.with_size(fp.geom.size().max(min)),
            (FitMode::Bounds, Some(min)) => {
                fp.geom.with_size(min.min(fp.geom.size()).max(Size::new(1, 1)))
            }
        };
        self.surface.place(display, parent, geom)
    }

    fn map(&mut self, display: &mut dyn DisplayServer) { self.surface.map(display) }

    fn unmap(&mut self, display: &mut dyn DisplayServer) { self.surface.unmap(display) }

    fn request_focus(&mut self, display: &mut dyn DisplayServer, warp: bool) -> FocusOutcome {
        if self.deferred_focus {
            if warp {
                display.warp_pointer(self.surface.geom.center());
            }
            return FocusOutcome::Deferred;
        }
        self.surface.focus(display, warp);
        FocusOutcome::Taken
    }

    fn skip_focus(&self) -> bool { false }

    fn size_hints(&self) -> SizeHints { SizeHints { min: self.min_size, preferred: None } }

    fn orientation(&self) -> Orientation { Orientation::Horizontal }

    fn configuration(&self) -> RegionConfig {
        RegionConfig::ClientWindow {
            name: self.surface.name.clone(),
            min_size: self.min_size,
            deferred_focus: self.deferred_focus,
        }
    }

    fn destroy(&mut self, display: &mut dyn DisplayServer) {
        if !self.defunct {
            display.destroy_window(self.surface.window)
        }
    }
}

/// A status bar or similar overlay. Never takes focus.
#[derive(Debug, Clone)]
pub struct StatusDisplay {
    surface: Surface,
    orientation: Orientation,
    preferred: Size,
}

impl StatusDisplay {
    pub fn create(
        display: &mut dyn DisplayServer,
        parent: WindowId,
        fp: &FitParams,
        name: &str,
        orientation: Orientation,
        preferred: Size,
    ) -> Result<StatusDisplay, DisplayError> {
        Ok(StatusDisplay {
            surface: Surface::create(display, parent, fp.geom.with_size(preferred), name)?,
            orientation,
            preferred,
        })
    }
}

impl Region for StatusDisplay {
    fn name(&self) -> &str { &self.surface.name }

    fn geometry(&self) -> Rect { self.surface.geom }

    fn window(&self) -> Option<WindowId> { Some(self.surface.window) }

    fn parent(&self) -> WindowId { self.surface.parent }

    fn is_mapped(&self) -> bool { self.surface.mapped }

    fn fit(
        &mut self,
        display: &mut dyn DisplayServer,
        parent: Option<WindowId>,
        fp: &FitParams,
    ) -> bool {
        self.surface.place(display, parent, fp.geom)
    }

    fn map(&mut self, display: &mut dyn DisplayServer) { self.surface.map(display) }

    fn unmap(&mut self, display: &mut dyn DisplayServer) { self.surface.unmap(display) }

    fn request_focus(&mut self, display: &mut dyn DisplayServer, warp: bool) -> FocusOutcome {
        self.surface.focus(display, warp);
        FocusOutcome::Taken
    }

    fn skip_focus(&self) -> bool { true }

    fn size_hints(&self) -> SizeHints {
        SizeHints { min: None, preferred: Some(self.preferred) }
    }

    fn orientation(&self) -> Orientation { self.orientation }

    fn configuration(&self) -> RegionConfig {
        RegionConfig::StatusDisplay {
            name: self.surface.name.clone(),
            orientation: self.orientation,
            preferred: Some(self.preferred),
        }
    }

    fn destroy(&mut self, display: &mut dyn DisplayServer) {
        display.destroy_window(self.surface.window)
    }
}

/// A region's own saved configuration.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum RegionConfig {
    Frame {
        name: String,
    },
    ClientWindow {
        name: String,
        #[serde(default)]
        min_size: Option<Size>,
        #[serde(default)]
        deferred_focus: bool,
    },
    StatusDisplay {
        name: String,
        #[serde(default)]
        orientation: Orientation,
        #[serde(default)]
        preferred: Option<Size>,
    },
}

const DEFAULT_STATUS_SIZE: Size = Size::new(200, 20);

impl RegionConfig {
    pub fn name(&self) -> &str {
        match self {
            RegionConfig::Frame { name }
            | RegionConfig::ClientWindow { name, .. }
            | RegionConfig::StatusDisplay { name, .. } => name,
        }
    }

    /// Creates the region this configuration describes under `parent`.
    pub fn load(
        &self,
        display: &mut dyn DisplayServer,
        parent: WindowId,
        fp: &FitParams,
    ) -> Result<RegionKind, DisplayError> {
        Ok(match self {
            RegionConfig::Frame { name } => Frame::create(display, parent, fp, name)?.into(),
            RegionConfig::ClientWindow { name, min_size, deferred_focus } => {
                let mut client = ClientWindow::create(display, parent, fp, name)?;
                client.min_size = *min_size;
                client.deferred_focus = *deferred_focus;
                client.into()
            }
            RegionConfig::StatusDisplay { name, orientation, preferred } => StatusDisplay::create(
                display,
                parent,
                fp,
                name,
                *orientation,
                preferred.unwrap_or(DEFAULT_STATUS_SIZE),
            )?
            .into(),
        })
    }
}

impl RegionKind {
    pub fn is_client(&self) -> bool { matches!(self, RegionKind::ClientWindow(_)) }

    pub fn as_client_mut(&mut self) -> Option<&mut ClientWindow> {
        match self {
            RegionKind::ClientWindow(client) => Some(client),
            _ => None,
        }
    }
}

/// Every live region, plus the lookup of which group manages each one.
#[derive(Default, Debug)]
pub struct RegionMap {
    regions: SlotMap<RegionId, RegionKind>,
    managers: SecondaryMap<RegionId, GroupId>,
}

impl RegionMap {
    pub fn new() -> Self { Self::default() }

    pub fn insert(&mut self, region: impl Into<RegionKind>) -> RegionId {
        self.regions.insert(region.into())
    }

    pub fn get(&self, id: RegionId) -> Option<&RegionKind> { self.regions.get(id) }

    pub fn get_mut(&mut self, id: RegionId) -> Option<&mut RegionKind> { self.regions.get_mut(id) }

    pub fn contains(&self, id: RegionId) -> bool { self.regions.contains_key(id) }

    pub fn ids(&self) -> impl Iterator<Item = RegionId> + '_ { self.regions.keys() }

    pub fn name(&self, id: RegionId) -> &str {
        self.regions.get(id).map(|r| r.name()).unwrap_or("<gone>")
    }

    pub fn manager(&self, id: RegionId) -> Option<GroupId> { self.managers.get(id).copied() }

    pub(crate) fn set_manager(&mut self, id: RegionId, group: GroupId) {
        if self.regions.contains_key(id) {
            self.managers.insert(id, group);
        }
    }

    /// Clears the manager of `id`, but only if it is `group`.
    pub(crate) fn unset_manager(&mut self, id: RegionId, group: GroupId) -> bool {
        if self.managers.get(id) == Some(&group) {
            self.managers.remove(id);
            true
        } else {
            false
        }
    }

    /// Destroys an unmanaged region.
    pub fn destroy(&mut self, id: RegionId, display: &mut dyn DisplayServer) -> bool {
        debug_assert!(self.manager(id).is_none(), "destroying a managed region");
        match self.regions.remove(id) {
            Some(mut region) => {
                self.managers.remove(id);
                region.destroy(display);
                true
            }
            None => false,
        }
    }
}

//! Saving a group's children and bringing them back.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{AttachParams, AttachSpec, Context, Group, GroupError, ManagedFilter, StatusDock};
use crate::model::region::{Region, RegionConfig};
use crate::model::size_policy::{FitParams, SizePolicy};
use crate::model::stacking::StackingLevel;
use crate::sys::display::{DisplayServer, WindowId};
use crate::sys::geometry::Rect;

/// One managed child as saved.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ManagedEntry {
    pub region: RegionConfig,
    pub size_policy: SizePolicy,
    pub level: StackingLevel,
    /// Relative to the group's origin.
    pub geom: Rect,
    #[serde(default)]
    pub bottom: bool,
    /// Position among the group's children in stacking order, 0 at the
    /// bottom.
    #[serde(default)]
    pub stacking_index: Option<usize>,
    /// Set on the docked status display.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_display: Option<StatusDock>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct GroupConfig {
    pub name: String,
    /// Children in management order.
    #[serde(default)]
    pub managed: Vec<ManagedEntry>,
}

impl GroupConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let mut buf = String::new();
        File::open(path)?.read_to_string(&mut buf)?;
        Ok(ron::from_str(&buf)?)
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        File::create(path)?.write_all(self.serialize_to_string()?.as_bytes())?;
        Ok(())
    }

    pub fn serialize_to_string(&self) -> anyhow::Result<String> {
        Ok(ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())?)
    }
}

impl Group {
    /// Exports the group and the managed children `filter` selects.
    ///
    /// A docked status display is marked with its dock, so that loading the
    /// export docks it again.
    pub fn configuration<D>(&self, cx: &Context<D>, filter: ManagedFilter) -> GroupConfig {
        let order: Vec<_> = self.stacking_order(cx).collect();
        let bottom = self.bottom(cx);
        let stdisp = self.status_display(cx);
        let dock = self.status_dock(cx);
        let origin = self.geometry(cx);
        let managed = self
            .managed(cx, filter)
            .filter_map(|region_id| {
                let node = cx.stacking.get(self.node_of(cx, region_id)?)?;
                let region = cx.regions.get(region_id)?;
                let geom = region.geometry().translate(-origin.x, -origin.y);
                Some(ManagedEntry {
                    region: region.configuration(),
                    size_policy: node.size_policy,
                    level: node.level,
                    geom,
                    bottom: bottom == Some(region_id),
                    stacking_index: order.iter().position(|&r| r == region_id),
                    status_display: if stdisp == Some(region_id) { dock } else { None },
                })
            })
            .collect();
        GroupConfig { name: self.name(cx).to_string(), managed }
    }

    /// Creates a group and attaches every saved child to it.
    pub fn load<D: DisplayServer>(
        cx: &mut Context<D>,
        parent: WindowId,
        fp: &FitParams,
        config: &GroupConfig,
    ) -> Result<Group, GroupError> {
        let mut group = Group::create(cx, parent, fp, &config.name)?;
        group.import(cx, &config.managed);
        Ok(group)
    }

    /// Attaches saved children in list order, then restores their relative
    /// stacking and docks a saved status display. Returns how many were
    /// restored.
    pub fn import<D: DisplayServer>(&mut self, cx: &mut Context<D>, entries: &[ManagedEntry]) -> usize {
        let mut attached = Vec::new();
        let mut docked = 0;
        for (index, entry) in entries.iter().enumerate() {
            if let Some(dock) = entry.status_display {
                if self.restore_status_display(cx, entry, dock) {
                    docked += 1;
                }
                continue;
            }
            let spec = AttachSpec {
                region: entry.region.clone(),
                params: AttachParams {
                    bottom: entry.bottom,
                    index: Some(index),
                    ..AttachParams::default()
                }
                .with_level(entry.level)
                .with_size_policy(entry.size_policy)
                .with_geom(entry.geom),
            };
            match self.attach_new(cx, &spec) {
                Ok(region) => attached.push((entry.stacking_index, region)),
                Err(err) => warn!(%err, name = entry.region.name(), "could not restore region"),
            }
        }

        let count = attached.len() + docked;
        attached.sort_by_key(|(stacking_index, _)| *stacking_index);
        for (_, region) in attached.into_iter().filter(|(index, _)| index.is_some()) {
            // The bottom region refuses to be raised and stays in place.
            _ = self.raise(cx, region);
        }
        debug!(group = self.name(cx), count, "imported managed regions");
        count
    }

    fn restore_status_display<D: DisplayServer>(
        &mut self,
        cx: &mut Context<D>,
        entry: &ManagedEntry,
        dock: StatusDock,
    ) -> bool {
        let parent = self.parent(cx);
        let origin = self.geometry(cx);
        let fp = FitParams::whatever(entry.geom.translate(origin.x, origin.y));
        let region = match entry.region.load(&mut cx.display, parent, &fp) {
            Ok(region) => cx.regions.insert(region),
            Err(err) => {
                warn!(%err, name = entry.region.name(), "could not restore status display");
                return false;
            }
        };
        match self.manage_stdisp(cx, region, dock.corner, dock.fullsize) {
            Ok(()) => true,
            Err(err) => {
                warn!(%err, name = entry.region.name(), "could not dock status display");
                cx.regions.destroy(region, &mut cx.display);
                false
            }
        }
    }
}

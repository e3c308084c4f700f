//! Size policies: how a child's geometry is derived from its container.

use std::fmt;
use std::str::FromStr;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use strum::VariantNames;
use thiserror::Error;

use crate::model::region::Orientation;
use crate::sys::geometry::{Rect, Size};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitMode {
    /// The region must take exactly the given geometry.
    Exact,
    /// The region may pick any geometry inside the given one.
    Bounds,
    /// The geometry is a hint; the region is free to ignore it.
    #[default]
    Whatever,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FitParams {
    pub geom: Rect,
    pub mode: FitMode,
}

impl FitParams {
    pub fn exact(geom: Rect) -> Self { FitParams { geom, mode: FitMode::Exact } }

    pub fn whatever(geom: Rect) -> Self { FitParams { geom, mode: FitMode::Whatever } }
}

/// Native size constraints a region reports about itself.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeHints {
    pub min: Option<Size>,
    /// The size the region would take if it could shrink to its content.
    pub preferred: Option<Size>,
}

bitflags! {
    /// Qualifiers on a geometry request.
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
    pub struct RqGeomFlags: u32 {
        const WEAK_X   = 1 << 0;
        const WEAK_Y   = 1 << 1;
        const WEAK_W   = 1 << 2;
        const WEAK_H   = 1 << 3;
        const TRY_ONLY = 1 << 4;

        const WEAK_ALL = Self::WEAK_X.bits() | Self::WEAK_Y.bits()
            | Self::WEAK_W.bits() | Self::WEAK_H.bits();
    }
}

bitflags! {
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
    pub struct PolicyFlags: u8 {
        /// Use the region's preferred size instead of the requested one.
        const SHRUNK    = 1 << 0;
        const STRETCH_H = 1 << 1;
        const STRETCH_V = 1 << 2;
    }
}

const FLAG_NAMES: &[(&str, PolicyFlags)] = &[
    ("shrunk", PolicyFlags::SHRUNK),
    ("stretch_h", PolicyFlags::STRETCH_H),
    ("stretch_v", PolicyFlags::STRETCH_V),
];

#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    strum_macros::EnumString,
    strum_macros::Display,
    strum_macros::VariantNames
)]
#[strum(serialize_all = "snake_case")]
pub enum Placement {
    /// Fill the container exactly.
    #[default]
    #[strum(to_string = "full", serialize = "default")]
    Full,
    /// Fill the container, but the region may choose a smaller size.
    FullBounds,
    /// Keep the requested geometry, constrained into the container.
    Free,
    /// Keep the requested geometry, as long as some of it stays visible.
    VisibilityConstrained,
    /// Keep the requested geometry as-is.
    Unconstrained,
    #[strum(to_string = "northwest")]
    NorthWest,
    North,
    #[strum(to_string = "northeast")]
    NorthEast,
    West,
    Center,
    East,
    #[strum(to_string = "southwest")]
    SouthWest,
    South,
    #[strum(to_string = "southeast")]
    SouthEast,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Align {
    Start,
    Middle,
    End,
}

impl Placement {
    /// Horizontal and vertical alignment, for gravity placements.
    fn gravity(self) -> (Align, Align) {
        use Align::*;
        match self {
            Placement::NorthWest => (Start, Start),
            Placement::North => (Middle, Start),
            Placement::NorthEast => (End, Start),
            Placement::West => (Start, Middle),
            Placement::East => (End, Middle),
            Placement::SouthWest => (Start, End),
            Placement::South => (Middle, End),
            Placement::SouthEast => (End, End),
            _ => (Middle, Middle),
        }
    }

    /// Edge gravities stretch along their edge.
    fn implied_stretch(self) -> PolicyFlags {
        match self {
            Placement::North | Placement::South => PolicyFlags::STRETCH_H,
            Placement::West | Placement::East => PolicyFlags::STRETCH_V,
            _ => PolicyFlags::empty(),
        }
    }
}

/// Corner a status display is docked at.
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
pub enum Corner {
    #[default]
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Corner {
    fn is_top(self) -> bool { matches!(self, Corner::TopLeft | Corner::TopRight) }

    fn is_left(self) -> bool { matches!(self, Corner::TopLeft | Corner::BottomLeft) }
}

/// Rule resolving a child's geometry against the space its container offers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct SizePolicy {
    pub placement: Placement,
    pub flags: PolicyFlags,
}

impl SizePolicy {
    pub const UNCONSTRAINED: SizePolicy = SizePolicy {
        placement: Placement::Unconstrained,
        flags: PolicyFlags::empty(),
    };

    pub const fn new(placement: Placement) -> Self {
        SizePolicy { placement, flags: PolicyFlags::empty() }
    }

    pub fn with_flags(self, flags: PolicyFlags) -> Self {
        SizePolicy { flags: self.flags | flags, ..self }
    }

    pub fn is_unconstrained(&self) -> bool { *self == Self::UNCONSTRAINED }

    /// Policy for a docked status display.
    ///
    /// Full-size displays take a whole edge, picked by the display's
    /// orientation; others sit in the matching corner. Either way the
    /// display shrinks to its content.
    pub fn status_display(corner: Corner, fullsize: bool, orientation: Orientation) -> Self {
        let placement = match (fullsize, orientation) {
            (true, Orientation::Vertical) if corner.is_left() => Placement::West,
            (true, Orientation::Vertical) => Placement::East,
            (true, Orientation::Horizontal) if corner.is_top() => Placement::North,
            (true, Orientation::Horizontal) => Placement::South,
            (false, _) => match corner {
                Corner::TopLeft => Placement::NorthWest,
                Corner::TopRight => Placement::NorthEast,
                Corner::BottomLeft => Placement::SouthWest,
                Corner::BottomRight => Placement::SouthEast,
            },
        };
        SizePolicy::new(placement).with_flags(PolicyFlags::SHRUNK)
    }

    /// Resolves this policy.
    ///
    /// On entry `fp.geom` is the space offered by the container; on return
    /// `fp` holds the geometry and fit mode to apply to the region.
    /// `current` is the region's present geometry, used when there is no
    /// explicit `requested` geometry.
    pub fn resolve(
        &self,
        current: Rect,
        hints: &SizeHints,
        requested: Option<Rect>,
        flags: RqGeomFlags,
        fp: &mut FitParams,
    ) {
        let container = fp.geom;
        let req = requested.unwrap_or(current);

        *fp = match self.placement {
            Placement::Full => FitParams::exact(container),
            Placement::FullBounds => FitParams { geom: container, mode: FitMode::Bounds },
            Placement::Unconstrained => FitParams::exact(req),
            Placement::Free if flags.intersects(RqGeomFlags::WEAK_ALL) => {
                FitParams::exact(req.constrained_to(&container))
            }
            Placement::Free => FitParams::exact(req),
            Placement::VisibilityConstrained if req.intersection(&container).area() == 0 => {
                FitParams::exact(req.constrained_to(&container))
            }
            Placement::VisibilityConstrained => FitParams::exact(req),
            gravity => {
                let (horiz, vert) = gravity.gravity();
                let stretch = self.flags | gravity.implied_stretch();
                FitParams::exact(gravitate(&container, &req, hints, stretch, horiz, vert))
            }
        };
    }
}

fn gravitate(
    container: &Rect,
    req: &Rect,
    hints: &SizeHints,
    stretch: PolicyFlags,
    horiz: Align,
    vert: Align,
) -> Rect {
    let mut size = match (stretch.contains(PolicyFlags::SHRUNK), hints.preferred) {
        (true, Some(preferred)) => preferred,
        _ => req.size(),
    };
    if stretch.contains(PolicyFlags::STRETCH_H) {
        size.w = container.w;
    }
    if stretch.contains(PolicyFlags::STRETCH_V) {
        size.h = container.h;
    }
    let size = size.max(hints.min.unwrap_or_default()).min(container.size()).max(Size::new(1, 1));

    let place = |align: Align, start: i32, avail: i32, len: i32| match align {
        Align::Start => start,
        Align::Middle => start + (avail - len) / 2,
        Align::End => start + avail - len,
    };
    Rect::new(
        place(horiz, container.x, container.w, size.w),
        place(vert, container.y, container.h, size.h),
        size.w,
        size.h,
    )
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown size policy `{0}`")]
pub struct ParsePolicyError(String);

impl FromStr for SizePolicy {
    type Err = ParsePolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split('+').map(str::trim);
        let placement = parts
            .next()
            .and_then(|p| Placement::from_str(&p.to_ascii_lowercase()).ok())
            .ok_or_else(|| ParsePolicyError(s.to_string()))?;
        let mut flags = PolicyFlags::empty();
        for part in parts {
            let (_, flag) = FLAG_NAMES
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(part))
                .ok_or_else(|| ParsePolicyError(s.to_string()))?;
            flags |= *flag;
        }
        Ok(SizePolicy { placement, flags })
    }
}

impl fmt::Display for SizePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.placement)?;
        for (name, flag) in FLAG_NAMES {
            if self.flags.contains(*flag) {
                write!(f, "+{name}")?;
            }
        }
        Ok(())
    }
}

impl Serialize for SizePolicy {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SizePolicy {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(|_| {
            serde::de::Error::unknown_variant(&s, Placement::VARIANTS)
        })
    }
}

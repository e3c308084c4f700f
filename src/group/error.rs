use thiserror::Error;

use crate::model::region::RegionId;
use crate::sys::display::{DisplayError, WindowId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GroupError {
    #[error("region {0:?} is not managed by this group")]
    NotMember(RegionId),
    #[error("cannot move from {from} to {to}: different display surface")]
    CrossSurfaceReparent { from: WindowId, to: WindowId },
    #[error(transparent)]
    Display(#[from] DisplayError),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AttachError {
    #[error("region could not be created")]
    FactoryFailed,
    #[error("'bottom' already set")]
    StructuralConflict,
    #[error("region {0:?} rejected")]
    Rejected(RegionId),
}

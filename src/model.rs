pub mod region;
pub mod size_policy;
pub mod stacking;

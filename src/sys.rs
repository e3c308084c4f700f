pub mod display;
pub mod geometry;
pub mod headless;

pub mod camera;
pub mod detection;
pub mod errors;
pub mod geometry;
pub mod model;
pub mod snapshot;

pub mod camera_repo;
pub mod capture;

pub mod courses;
pub mod dashboard;
pub mod programs;
pub mod status;

pub mod file;
pub mod holiday;
pub mod warehouse;

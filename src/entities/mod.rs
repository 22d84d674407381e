pub mod file;
pub mod project;
pub mod version;
pub mod version_file;

pub mod error;
pub mod file;
pub mod mime;
pub mod project;
pub mod version;

pub use error::ServiceError;
pub use file::FileService;
pub use project::ProjectService;
pub use version::VersionService;

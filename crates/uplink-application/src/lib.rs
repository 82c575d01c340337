pub mod document_archive_service;
pub mod mission_catalog;

pub use document_archive_service::{DocumentArchiveService, UploadStatus};
pub use mission_catalog::{Mission, MissionCatalog, MissionStatus};

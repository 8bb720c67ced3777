// Resume upload, candidate listing and resume file storage.

pub mod handlers;
pub mod repository;
pub mod storage;

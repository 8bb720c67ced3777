// Job CRUD and selection.

pub mod handlers;
pub mod repository;

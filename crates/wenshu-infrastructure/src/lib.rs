//! Infrastructure layer for Wenshu: paths, configuration loading and session
//! storage.

pub mod async_dir_session_repository;
pub mod config_service;
mod dto;
pub mod in_memory_session_repository;
pub mod paths;

pub use async_dir_session_repository::AsyncDirSessionRepository;
pub use config_service::ConfigService;
pub use in_memory_session_repository::InMemorySessionRepository;
pub use paths::{PathError, WenshuPaths};

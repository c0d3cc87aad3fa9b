//! Infrastructure layer: wire DTOs and collaborator store implementations.

pub mod dto;
pub mod repository;

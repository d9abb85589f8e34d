//! CLI Commands

pub mod hash;
pub mod upload;

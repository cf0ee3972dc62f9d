// src/types/mod.rs
pub mod job;
pub mod profile;

pub use job::JobInput;
pub use profile::Profile;

//! Trellis - a dependency and compatibility registry.
//!
//! The core is [`registry::ComponentRegistry`]: versioned components joined
//! by dependency edges that are guaranteed to stay acyclic, with analyzers
//! for version constraints, compatibility risk and change impact. Two
//! projections sit on top of it:
//!
//! - [`features::FeatureRegistry`] tracks features owned by components
//! - [`milestones::MilestoneRegistry`] tracks milestones spanning components
//!
//! A [`manifest::Manifest`] loads all three from YAML, and the `trellis`
//! binary exposes them as a CLI.

#![forbid(unsafe_code)]

// Public modules for library usage
pub mod domain;
pub mod error;
pub mod features;
pub mod manifest;
pub mod milestones;
pub mod registry;
pub mod version;

// Public CLI module (needed by binary)
pub mod app;
pub mod cli;
pub mod output;

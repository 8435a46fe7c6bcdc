//! Extractors for Windows system state.

pub mod regpatchlevel;

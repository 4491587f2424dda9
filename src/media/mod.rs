//! Media paths
//!
//! This module provides:
//! - Source and sink descriptors
//! - The [`MediaEngine`] contract relays and clients drive
//! - A launcher-process engine

pub mod descriptor;
pub mod engine;
pub mod launch;

#[cfg(test)]
pub mod testing;

pub use descriptor::{SinkDescriptor, SourceDescriptor};
pub use engine::{FaultReceiver, FaultSender, MediaEngine, MediaError, MediaFault};
pub use launch::{LaunchEngine, LaunchHandle, DEFAULT_PROGRAM};

//! Studiokit Types
//!
//! Shared type definitions for uploaded media, transcode outcomes and
//! export requests used across all Studiokit services.

pub mod media;
pub mod schemas;
pub mod error;

pub use media::*;
pub use schemas::*;
pub use error::*;

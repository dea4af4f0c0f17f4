//! Core numeric foundations
//!
//! See `fixed.rs` for the checked 18-decimal fixed-point layer that every
//! other module builds on.

pub mod fixed;

//! Test fixtures
//!
//! Builders for CGRP containers and the sub-files stored inside them.

pub mod builders;

pub use builders::*;

//! Integration tests for Shelf
//!
//! Library-level tests drive publish and install through real storage
//! backends; `cli` runs the `shelf` binary.

mod cli;
mod common;
mod orchestration;
mod publish_install;

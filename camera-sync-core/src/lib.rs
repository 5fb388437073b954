#![doc = "camera-sync-core: core logic library for camera-sync."]

//! This crate holds the data models and decision logic for copying media off camera cards:
//! which mounted volume belongs to which configured camera, how each camera's files group
//! into shots, and what has to happen to each file at the destination.
//! CLI parsing, YAML loading and progress display live in the `camera-sync` crate.

pub mod config;
pub mod destination;
pub mod disks;
pub mod diskutil;
pub mod error;
pub mod file;
pub mod filter_disks;
pub mod operation;
pub mod source;
pub mod synchronise;

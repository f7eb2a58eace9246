//! # Voxel Task System
//!
//! This module contains tasks related to voxel world generation. They run on the
//! terrain worker so world generation never stalls a frame.

pub mod chunk_generation_task;

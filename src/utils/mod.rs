//! Filesystem helpers shared by the upgrade workflow and the crew dispatcher.

pub mod fs;

pub use fs::{atomic_write, ensure_dir, ensure_parent_dir, remove_dir_all, tree_files};

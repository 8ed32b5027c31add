pub mod walk;

pub use walk::{compile_ignore_patterns, count_files, folder_stats, walk_files};

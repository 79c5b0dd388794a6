//! Filesystem primitives shared across features.

pub mod atomic;
pub mod expand;

pub use atomic::{read_optional, write_atomic};
pub use expand::{expand_path, path_exists};

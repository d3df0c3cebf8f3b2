/// Filesystem-backed resource directories.
pub mod fs;

pub use fs::ResourceDir;

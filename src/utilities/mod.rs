// Utilities module
// Helper functions and tools

pub mod paths;

pub use paths::{absolutize, normalize_path, resolve_path};

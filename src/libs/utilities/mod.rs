// This is the main module file for the `utilities` directory.
// It declares the small, dependency-free helpers shared by the engine.

// Directory copies, atomic file replacement and cleanup.
pub mod file_operations;
// `~` / `$VAR` expansion and the tool's home directory.
pub mod path_helpers;
// OS / architecture detection and marketplace platform identifiers.
pub mod platform;

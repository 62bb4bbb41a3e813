// The engine: everything between the command layer and the outside world.

// Per-run capabilities and settings threaded through every step.
pub mod context;
// Reads and validates `config.yaml`.
pub mod config_loading;
// Concurrent target discovery and package-store scanning.
pub mod detector;
// Artifact download with retries and a cleanup guard.
pub mod downloader;
// Error taxonomy.
pub mod errors;
// Replicates an installed extension into additional editor profiles.
pub mod fanout;
// Dispatches a plan to the per-kind drivers.
pub mod installer;
// detect -> resolve -> select -> download -> install -> verify.
pub mod orchestrator;
// Config file location.
pub mod paths;
// Tables and follow-up notes.
pub mod report;
// Latest-version lookup with primary and fallback strategies.
pub mod resolver;
// Operator and policy driven unit selection.
pub mod selection;
// Command, HTTP, sleep and prompt capabilities.
pub mod system;
// Built-in and configured install targets.
pub mod target_registry;
pub mod utilities;
// Post-install convergence checks.
pub mod verifier;
// Version normalization and comparison.
pub mod version;

#[cfg(test)]
pub mod test_support;

// Data structures (schemas) for configuration, targets, detection results and run outcomes.

// `config.yaml` and the per-run settings derived from it.
pub mod config;
// Detected instances, profiles and installed-version states.
pub mod detection;
// Update units, plans, install and verification outcomes.
pub mod outcomes;
// Records of an editor profile's `extensions.json`.
pub mod registry_file;
// Static install target descriptors.
pub mod targets;
// Raw + normalized version descriptors.
pub mod versions;

// Right-column tab module registry.
// - Each tab module owns only its own rendering behavior.
pub mod convert;
pub mod renames;

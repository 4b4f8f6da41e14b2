// Offline inspection of the provider registry
pub mod inspect;

// Provider configuration resolution
pub mod config;

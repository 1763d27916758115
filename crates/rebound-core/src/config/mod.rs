//! Settings loading

mod loader;

pub use loader::SettingsLoader;

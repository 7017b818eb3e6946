//! Configuration for AutoCrew.
//!
//! The installation root holds a single `config.ini`. It is shared with the
//! crew backend, so the core treats it as an opaque [`ConfigDocument`] and
//! reads only the few keys described in [`settings`]. During an upgrade the
//! whole document is merged with the new release's defaults (see
//! [`crate::upgrade::merge`]).
//!
//! # Modules
//!
//! - `ini` - ordered INI parsing and rendering
//! - `settings` - typed settings with defaults and environment overrides

pub mod ini;
pub mod settings;

pub use ini::{ConfigDocument, ConfigSection};
pub use settings::Settings;

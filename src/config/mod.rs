//! Run-wide configuration: the immutable [`RunConfig`], the identity it
//! carries, and the optional settings file that seeds CLI defaults.
pub mod identity;
pub mod run;
pub mod settings;

pub use identity::Identity;
pub use run::{RunConfig, RunConfigBuilder};
pub use settings::Settings;

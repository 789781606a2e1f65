#![allow(clippy::uninlined_format_args)]
#![doc = include_str!("../README.md")]

pub mod build;
pub mod bundler;
pub mod environment;
pub mod error;
pub mod esm;
pub mod import_map;
pub mod paths;
pub mod plugin;
pub mod remote_loader;
pub mod resolver;
pub mod scaffold;

#[macro_use]
extern crate lazy_static;

pub use build::{build_app, BuildConfig, Builder};
pub use error::{BundleError, Result};
pub use import_map::ImportMap;
pub use serde_json;

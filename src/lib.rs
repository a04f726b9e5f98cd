// Author: Dustin Pilgrim
// License: MIT

//! Layered configuration trees.
//!
//! Sources are parsed into immutable [`Value`] trees, merged in fallback
//! order, and then resolved: every `${path}` substitution is replaced by the
//! value it names in the merged tree, with cycles reported instead of looped
//! on.
//!
//! ```
//! use cairn_cfg::Config;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::from_json(
//!     r#"{"base": "/srv", "data": "${base}", "log": {"level": "info"}}"#,
//!     "app.json",
//! )?
//! .resolve()?;
//!
//! assert_eq!(config.get::<String>("data")?, "/srv");
//! assert_eq!(config.get::<String>("log.level")?, "info");
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod convert;
pub mod error;
pub mod merge;
pub mod origin;
pub mod path;
pub mod render;
pub mod resolver;
pub mod source;
pub mod value;

#[cfg(test)]
mod test_support;

pub use config::Config;
pub use convert::{from_any, ToConfigValue};
pub use error::{CairnError, Result};
pub use merge::merge_all;
pub use origin::Origin;
pub use path::ConfigPath;
pub use render::{render, RenderOptions};
pub use resolver::{resolve, ResolveOptions};
pub use value::{Value, ValueKind};

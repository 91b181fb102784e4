#![forbid(unsafe_code)]
//! Compiles a declarative release configuration into the task graph that
//! ships the release.
//!
//! The graph covers l10n repacks, partial update generation, checksums, the
//! upload to the candidates area, an optional human decision, the push to
//! releases, partner repacks and final verification. Compilation is a pure
//! function of the [`Configuration`]: it never talks to the queue, and any
//! error aborts it without a partial graph.
//!
//! ```rust,no_run
//! use releasegraph::{Configuration, compile};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let text = std::fs::read_to_string("release.json")?;
//! let config = Configuration::from_json_str(&text)?;
//! let graph = compile(&config)?;
//!
//! println!("{}", graph.to_json_pretty()?);
//! # Ok(())
//! # }
//! ```

pub mod blueprint;
mod compiler;
pub mod config;
mod error;
pub mod gate;
pub mod graph;
pub mod ids;
pub mod naming;
pub mod resolver;
pub mod scopes;
pub mod stages;
pub mod template;
#[cfg(feature = "logging")]
mod utils;

pub use crate::compiler::{compile, compile_all, compile_with};
pub use crate::config::{Configuration, Features, PartialUpdate};
pub use crate::error::*;
pub use crate::graph::{Graph, Priority, TaskId, TaskNode};
pub use crate::ids::{HashedIds, IdAllocator, RandomIds};
pub use crate::stages::Stage;
pub use crate::template::{Params, TemplateEngine, TemplateKind};
#[cfg(feature = "logging")]
pub use crate::utils::init_logging;

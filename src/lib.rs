//! # Script Bindings
//!
//! Binds a native object model to an embedded JavaScript engine (QuickJS).
//!
//! ## Features
//!
//! - **Binding generator**: reads a webidl2 JSON interface description plus a
//!   TOML customization table and emits one Rust wrapper module per interface
//! - **Arity dispatch**: optional arguments become a chain of native call
//!   variants, defaulted arguments are filled in by converters
//! - **Script host**: owns the engine runtime, realizes interface templates in
//!   isolated contexts and keeps script objects identical per native entity
//!
//! ## Architecture Design
//!
//! Generation is a pure pipeline:
//!
//! ```text
//! idl::IdlSpec ──> bindings::WrapperSpec ──> codegen::GeneratedFile ──> disk
//! ```
//!
//! The generated modules only depend on [`scripting::prelude`]. At run time they
//! are registered with a [`scripting::ScriptHost`]:
//!
//! ```ignore
//! use script_bindings::scripting::ScriptHost;
//!
//! let host = ScriptHost::builder()
//!     .with_templates(generated::all_templates())
//!     .with_global("window", || Window::new())
//!     .build()?;
//! let context = host.new_context()?;
//! context.run_script("document.body.appendChild(document.createElement('p'))")?;
//! ```
//!
//! ## Modules
//!
//! - [`idl`]: interface description model
//! - [`config`]: generator configuration and member customization
//! - [`bindings`]: member classification
//! - [`codegen`]: code generation
//! - [`scripting`]: script host runtime
//! - [`core`]: errors, logging, macros

/// Errors, logging and shared macros
#[macro_use]
pub mod core;
/// Generator configuration and customization side table
pub mod config;
/// Interface description model
pub mod idl;
/// Member classification and customization merging
pub mod bindings;
/// Binding source generation
pub mod codegen;
/// Script host and context runtime
pub mod scripting;

pub use crate::config::BindgenConfig;
pub use crate::core::error::{BindgenError, BindingError, ScriptError};
pub use crate::scripting::{ScriptContext, ScriptHost};

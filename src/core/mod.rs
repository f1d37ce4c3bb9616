//! Core module
//!
//! Shared infrastructure used by both the generator and the script host:
//! - `error` - error taxonomy for generation and run time
//! - `logging` - tracing subscriber setup
//! - `macros` - small helper macros

pub mod error;
pub mod logging;
#[macro_use]
pub mod macros;

pub use error::{
    BindgenError, BindgenResult, BindingError, BindingResult, GenerateError, GenerateResult,
    ScriptError, ScriptResult, SpecError, SpecResult,
};
pub use logging::initialize_logging;

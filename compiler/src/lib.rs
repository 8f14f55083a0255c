//! fieldgen-compiler
//!
//! This crate implements:
//!  1) A line normalizer + tokenizer for restricted C structure headers,
//!  2) A two-pass parser into an ordered structure/field model,
//!  3) A verifier (undeclared nested structures, recursive nesting, empty structures),
//!  4) Flattening of nested structure fields into leaf fields,
//!  5) C code generation: field enums, size tables and accessor functions,
//!  6) Error types (`FieldGenError`) and the `GenConfig` naming convention.

pub mod error;
pub mod config;
pub mod types;
pub mod utils;
pub mod tokenizer;
pub mod parser;
pub mod verifier;
pub mod flatten;
pub mod compiler;
pub mod gen_c;

pub use compiler::compile_header;
pub use compiler::generate_artifacts;
pub use compiler::render_artifacts;
pub use compiler::write_artifacts;
pub use compiler::Artifacts;
pub use config::GenConfig;
pub use error::FieldGenError;
pub use types::FieldModel;

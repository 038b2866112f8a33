//! Core compiler for the Kite language.
//!
//! The pipeline is:
//!
//!   source .kite + std source
//!     -> lexer        (tokens)
//!     -> parser       (AST, with error recovery)
//!     -> typecheck    (name resolution, inference, HIR, hover records)
//!     -> codegen_wasm (wasm-encoder)
//!     -> metadata     (custom hover section)
//!
//! [`on_hover`] answers editor queries from the emitted bytes alone.
//! Higher-level tools (CLI, web playground) should depend on this crate
//! rather than reimplementing the pipeline.

// ---------------------------------------------------------------------
// Error handling and diagnostics
// ---------------------------------------------------------------------

pub mod span;
pub mod diagnostic;
pub mod error;

// ---------------------------------------------------------------------
// Front-end: lexing and parsing
// ---------------------------------------------------------------------

pub mod lexer;
pub mod parser;
pub mod ast;

// ---------------------------------------------------------------------
// Semantic layers: types, name resolution, type checking, HIR
// ---------------------------------------------------------------------

pub mod types;
pub mod name_resolve;
pub mod typecheck;
pub mod hir;

// ---------------------------------------------------------------------
// Builtins and stdlib integration
// ---------------------------------------------------------------------

pub mod builtins;
pub mod stdlib;

// ---------------------------------------------------------------------
// Back-end: layout, code generation, hover metadata, orchestration
// ---------------------------------------------------------------------

pub mod layout;
pub mod codegen_wasm;
pub mod metadata;
pub mod hover;
pub mod compiler;

// ---------------------------------------------------------------------
// Public API re-exports
// ---------------------------------------------------------------------

pub use codegen_wasm::CodegenError;
pub use compiler::{CompilationArtifact, CompileOptions, compile, compile_wasm, on_hover};
pub use error::CoreError;
pub use metadata::EncodingError;

use std::path::PathBuf;

use thiserror::Error;

use crate::codegen_wasm::CodegenError;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Codegen(#[from] CodegenError),
    #[error("failed to read source: {0}")]
    SourceIo(#[from] std::io::Error),
    #[error("standard library directory was not found at {0}")]
    MissingStdlib(PathBuf),
}

impl CoreError {
    /// Fatal diagnostics behind a failed compilation, if that is why it failed.
    pub fn diagnostics(&self) -> &[crate::diagnostic::Diagnostic] {
        match self {
            CoreError::Codegen(CodegenError::FatalDiagnostics(diagnostics)) => diagnostics,
            _ => &[],
        }
    }
}

//! Compiler intrinsics visible at the Kite language level.
//!
//! Builtins live in the outermost scope, below the std library, so std
//! and user code can shadow them. The wasm backend lowers each call to
//! inline instructions; no function index is ever allocated for them.

use crate::types::Type;

/// Kind of builtin, used by the backend to pick the instruction sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinKind {
    /// Sign-extends an `i32` to `i64`.
    I64FromI32,
    /// Wraps an `i64` to its low 32 bits.
    I32FromI64,
    /// Converts a signed `i32` to `f64`.
    F64FromI32,
    /// Truncates an `f64` toward zero; traps when out of range.
    I32FromF64,
    /// Square root of an `f64`.
    Sqrt,
    /// Byte length of a string.
    StrLen,
    /// Current memory size in 64 KiB pages.
    MemorySize,
    /// Traps unconditionally.
    Trap,
}

impl BuiltinKind {
    /// The builtin's type as seen by the type checker.
    pub fn signature(self) -> Type {
        match self {
            BuiltinKind::I64FromI32 => Type::function(vec![Type::I32], Type::I64),
            BuiltinKind::I32FromI64 => Type::function(vec![Type::I64], Type::I32),
            BuiltinKind::F64FromI32 => Type::function(vec![Type::I32], Type::F64),
            BuiltinKind::I32FromF64 => Type::function(vec![Type::F64], Type::I32),
            BuiltinKind::Sqrt => Type::function(vec![Type::F64], Type::F64),
            BuiltinKind::StrLen => Type::function(vec![Type::Str], Type::I32),
            BuiltinKind::MemorySize => Type::function(Vec::new(), Type::I32),
            BuiltinKind::Trap => Type::function(Vec::new(), Type::Never),
        }
    }
}

/// Metadata about a single builtin symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltinDescriptor {
    /// Name at the Kite level.
    pub name: &'static str,
    pub kind: BuiltinKind,
    /// Shown in hover text.
    pub docs: &'static str,
}

/// The complete list of builtins known to the core.
pub const BUILTINS: &[BuiltinDescriptor] = &[
    BuiltinDescriptor {
        name: "i64_from_i32",
        kind: BuiltinKind::I64FromI32,
        docs: "Sign-extends a 32-bit integer to 64 bits.",
    },
    BuiltinDescriptor {
        name: "i32_from_i64",
        kind: BuiltinKind::I32FromI64,
        docs: "Keeps the low 32 bits of a 64-bit integer.",
    },
    BuiltinDescriptor {
        name: "f64_from_i32",
        kind: BuiltinKind::F64FromI32,
        docs: "Converts a signed 32-bit integer to a float.",
    },
    BuiltinDescriptor {
        name: "i32_from_f64",
        kind: BuiltinKind::I32FromF64,
        docs: "Truncates a float toward zero. Traps when the result does not fit.",
    },
    BuiltinDescriptor {
        name: "sqrt",
        kind: BuiltinKind::Sqrt,
        docs: "Square root.",
    },
    BuiltinDescriptor {
        name: "str_len",
        kind: BuiltinKind::StrLen,
        docs: "Length of a string in bytes.",
    },
    BuiltinDescriptor {
        name: "memory_size",
        kind: BuiltinKind::MemorySize,
        docs: "Size of linear memory in 64 KiB pages.",
    },
    BuiltinDescriptor {
        name: "trap",
        kind: BuiltinKind::Trap,
        docs: "Aborts execution.",
    },
];

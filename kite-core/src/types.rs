//! Core type system for Kite.
//!
//! Types compare structurally. The field list of a struct lives in its
//! definition, not in the type.

use core::fmt;

use wasm_encoder::ValType;

use crate::hir::StructId;

/// Inference variable id. Only integer literals introduce variables, so
/// every variable stands for `i32` or `i64`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InferVar(pub u32);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Type {
    // Built-in primitive types
    I32,
    I64,
    F64,
    Bool,
    /// Pointer to a length-prefixed UTF-8 string in linear memory.
    Str,
    Unit,
    /// Bottom type of `return`, `break` and `continue`.
    Never,

    /// User-defined struct. The name is kept for rendering; the id makes a
    /// user struct distinct from a std struct it shadows.
    Struct { id: StructId, name: String },

    Function {
        params: Vec<Type>,
        result: Box<Type>,
    },

    /// Unresolved integer literal type.
    Infer(InferVar),

    /// Type of an expression that already produced a diagnostic.
    Error,
}

impl Type {
    pub fn function(params: Vec<Type>, result: Type) -> Type {
        Type::Function {
            params,
            result: Box::new(result),
        }
    }

    /// Parses a primitive type name.
    pub fn primitive(name: &str) -> Option<Type> {
        let ty = match name {
            "i32" => Type::I32,
            "i64" => Type::I64,
            "f64" => Type::F64,
            "bool" => Type::Bool,
            "str" => Type::Str,
            _ => return None,
        };
        Some(ty)
    }

    pub fn is_never(&self) -> bool {
        matches!(self, Type::Never)
    }

    pub fn is_unit(&self) -> bool {
        matches!(self, Type::Unit)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Type::Error)
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, Type::I32 | Type::I64 | Type::Infer(_))
    }

    pub fn is_numeric(&self) -> bool {
        self.is_integer() || matches!(self, Type::F64)
    }

    /// Wasm value type used to hold a value of this type, `None` for
    /// types without a runtime value.
    pub fn val_type(&self) -> Option<ValType> {
        match self {
            Type::I32 | Type::Bool | Type::Str | Type::Struct { .. } => Some(ValType::I32),
            Type::I64 => Some(ValType::I64),
            Type::F64 => Some(ValType::F64),
            Type::Unit | Type::Never | Type::Function { .. } | Type::Infer(_) | Type::Error => None,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::I32 => f.write_str("i32"),
            Type::I64 => f.write_str("i64"),
            Type::F64 => f.write_str("f64"),
            Type::Bool => f.write_str("bool"),
            Type::Str => f.write_str("str"),
            Type::Unit => f.write_str("()"),
            Type::Never => f.write_str("!"),
            Type::Struct { name, .. } => f.write_str(name),
            Type::Function { params, result } => {
                f.write_str("fn(")?;
                for (i, param) in params.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{param}")?;
                }
                f.write_str(")")?;
                if !result.is_unit() {
                    write!(f, " -> {result}")?;
                }
                Ok(())
            }
            Type::Infer(_) => f.write_str("{integer}"),
            Type::Error => f.write_str("{unknown}"),
        }
    }
}

/// Least common supertype of two branch types, with `Never` as bottom:
///
/// * lcs(Never, T) = T
/// * lcs(T, Never) = T
/// * lcs(T, T)     = T
///
/// Inference variables are handled by the caller through unification.
pub fn least_common_supertype(a: &Type, b: &Type) -> Option<Type> {
    if a.is_never() {
        return Some(b.clone());
    }
    if b.is_never() {
        return Some(a.clone());
    }
    if a.is_error() || b.is_error() {
        return Some(Type::Error);
    }
    if a == b {
        return Some(a.clone());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn never_is_bottom_for_branches() {
        assert_eq!(least_common_supertype(&Type::Never, &Type::I32), Some(Type::I32));
        assert_eq!(least_common_supertype(&Type::Bool, &Type::Never), Some(Type::Bool));
        assert_eq!(least_common_supertype(&Type::I64, &Type::I64), Some(Type::I64));
        assert_eq!(least_common_supertype(&Type::I32, &Type::Bool), None);
    }

    fn point() -> Type {
        Type::Struct {
            id: StructId(0),
            name: "Point".into(),
        }
    }

    #[test]
    fn renders_function_signatures() {
        let ty = Type::function(vec![Type::I32, point()], Type::Bool);
        assert_eq!(ty.to_string(), "fn(i32, Point) -> bool");
        assert_eq!(Type::function(vec![], Type::Unit).to_string(), "fn()");
    }

    #[test]
    fn maps_to_wasm_value_types() {
        assert_eq!(Type::Bool.val_type(), Some(ValType::I32));
        assert_eq!(point().val_type(), Some(ValType::I32));
        assert_eq!(Type::I64.val_type(), Some(ValType::I64));
        assert_eq!(Type::Unit.val_type(), None);
    }
}

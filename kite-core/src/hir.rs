//! High-level intermediate representation (HIR) for Kite.
//!
//! HIR is the typed, name-resolved form consumed by the wasm backend.
//! Every expression carries its [`Type`] and [`Span`]; every name has been
//! replaced by the id of the entity it refers to.

use crate::ast::{BinaryOp, UnaryOp};
use crate::builtins::BuiltinKind;
use crate::span::Span;
use crate::types::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FuncId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StructId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GlobalId(pub u32);

/// Index into [`HirFunction::locals`]; parameters come first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LocalId(pub u32);

/// Identifier in HIR: a name plus the span it was written at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HirIdent {
    pub name: String,
    pub span: Span,
}

/// A HIR module: std and user items together, in declaration order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HirModule {
    /// Indexed by [`FuncId`].
    pub functions: Vec<HirFunction>,
    /// Indexed by [`StructId`].
    pub structs: Vec<HirStruct>,
    /// Indexed by [`GlobalId`].
    pub globals: Vec<HirGlobal>,
}

impl HirModule {
    pub fn function(&self, id: FuncId) -> &HirFunction {
        &self.functions[id.0 as usize]
    }

    pub fn struct_def(&self, id: StructId) -> &HirStruct {
        &self.structs[id.0 as usize]
    }

    pub fn global(&self, id: GlobalId) -> &HirGlobal {
        &self.globals[id.0 as usize]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FunctionBody {
    /// Imported from the host.
    Extern,
    /// The declaration had syntax errors; lowered as a trapping stub.
    Stub,
    Expr(HirExpr),
}

#[derive(Debug, Clone, PartialEq)]
pub struct HirLocal {
    pub name: HirIdent,
    pub ty: Type,
    pub mutable: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HirFunction {
    pub id: FuncId,
    pub name: HirIdent,
    pub param_count: u32,
    /// Parameters followed by every `let` binding of the body.
    pub locals: Vec<HirLocal>,
    pub result: Type,
    pub body: FunctionBody,
    pub docs: Option<String>,
    /// Span of the whole declaration.
    pub span: Span,
}

impl HirFunction {
    pub fn params(&self) -> &[HirLocal] {
        &self.locals[..self.param_count as usize]
    }

    pub fn signature(&self) -> Type {
        Type::function(
            self.params().iter().map(|p| p.ty.clone()).collect(),
            self.result.clone(),
        )
    }

    pub fn is_extern(&self) -> bool {
        matches!(self.body, FunctionBody::Extern)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HirField {
    pub name: HirIdent,
    pub ty: Type,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HirStruct {
    pub id: StructId,
    pub name: HirIdent,
    pub fields: Vec<HirField>,
    pub docs: Option<String>,
    pub span: Span,
}

/// Constant initializer of a global.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstValue {
    Int(i64),
    F64(f64),
    Bool(bool),
    Str(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct HirGlobal {
    pub id: GlobalId,
    pub name: HirIdent,
    pub ty: Type,
    pub mutable: bool,
    pub init: ConstValue,
    pub docs: Option<String>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Callee {
    Function(FuncId),
    Builtin(BuiltinKind),
}

/// Expression node in HIR. Always has a type and a span.
#[derive(Debug, Clone, PartialEq)]
pub struct HirExpr {
    pub kind: HirExprKind,
    pub ty: Type,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum HirExprKind {
    // Literals; integer width comes from `ty`.
    Int(i64),
    F64(f64),
    Bool(bool),
    Str(String),
    Unit,

    Local(LocalId),
    Global(GlobalId),

    Call {
        callee: Callee,
        args: Vec<HirExpr>,
    },

    Field {
        base: Box<HirExpr>,
        struct_id: StructId,
        index: u32,
    },

    /// Field initializers in source order, each with its field index.
    StructLit {
        struct_id: StructId,
        fields: Vec<(u32, HirExpr)>,
    },

    Unary {
        op: UnaryOp,
        operand: Box<HirExpr>,
    },

    /// Operand type is `lhs.ty`; `ty` is the result type.
    Binary {
        op: BinaryOp,
        lhs: Box<HirExpr>,
        rhs: Box<HirExpr>,
    },

    Block(HirBlock),

    If {
        cond: Box<HirExpr>,
        then_branch: Box<HirExpr>,
        else_branch: Option<Box<HirExpr>>,
    },

    While {
        cond: Box<HirExpr>,
        body: Box<HirExpr>,
    },

    // `Never`-typed control transfers.
    Return(Option<Box<HirExpr>>),
    Break,
    Continue,

    /// Placeholder for a construct that failed to parse or resolve.
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HirBlock {
    pub stmts: Vec<HirStmt>,
    pub tail: Option<Box<HirExpr>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum HirStmt {
    Let { local: LocalId, init: HirExpr },
    Assign { place: HirPlace, value: HirExpr },
    Expr(HirExpr),
}

/// Assignable location.
#[derive(Debug, Clone, PartialEq)]
pub enum HirPlace {
    Local(LocalId),
    Global(GlobalId),
    Field {
        base: Box<HirExpr>,
        struct_id: StructId,
        index: u32,
    },
}

impl HirExpr {
    pub fn new(kind: HirExprKind, ty: Type, span: Span) -> HirExpr {
        HirExpr { kind, ty, span }
    }

    pub fn error(span: Span) -> HirExpr {
        HirExpr::new(HirExprKind::Error, Type::Error, span)
    }

    pub fn unit(span: Span) -> HirExpr {
        HirExpr::new(HirExprKind::Unit, Type::Unit, span)
    }

    /// Visit this expression and all sub-expressions, parents first.
    pub fn walk(&self, f: &mut impl FnMut(&HirExpr)) {
        f(self);
        match &self.kind {
            HirExprKind::Int(_)
            | HirExprKind::F64(_)
            | HirExprKind::Bool(_)
            | HirExprKind::Str(_)
            | HirExprKind::Unit
            | HirExprKind::Local(_)
            | HirExprKind::Global(_)
            | HirExprKind::Break
            | HirExprKind::Continue
            | HirExprKind::Error => {}
            HirExprKind::Call { args, .. } => args.iter().for_each(|a| a.walk(f)),
            HirExprKind::Field { base, .. } => base.walk(f),
            HirExprKind::StructLit { fields, .. } => fields.iter().for_each(|(_, e)| e.walk(f)),
            HirExprKind::Unary { operand, .. } => operand.walk(f),
            HirExprKind::Binary { lhs, rhs, .. } => {
                lhs.walk(f);
                rhs.walk(f);
            }
            HirExprKind::Block(block) => block.walk(f),
            HirExprKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                cond.walk(f);
                then_branch.walk(f);
                if let Some(e) = else_branch {
                    e.walk(f);
                }
            }
            HirExprKind::While { cond, body } => {
                cond.walk(f);
                body.walk(f);
            }
            HirExprKind::Return(value) => {
                if let Some(v) = value {
                    v.walk(f);
                }
            }
        }
    }

    /// Mutable counterpart of [`HirExpr::walk`].
    pub fn walk_mut(&mut self, f: &mut impl FnMut(&mut HirExpr)) {
        f(self);
        match &mut self.kind {
            HirExprKind::Int(_)
            | HirExprKind::F64(_)
            | HirExprKind::Bool(_)
            | HirExprKind::Str(_)
            | HirExprKind::Unit
            | HirExprKind::Local(_)
            | HirExprKind::Global(_)
            | HirExprKind::Break
            | HirExprKind::Continue
            | HirExprKind::Error => {}
            HirExprKind::Call { args, .. } => args.iter_mut().for_each(|a| a.walk_mut(f)),
            HirExprKind::Field { base, .. } => base.walk_mut(f),
            HirExprKind::StructLit { fields, .. } => {
                fields.iter_mut().for_each(|(_, e)| e.walk_mut(f))
            }
            HirExprKind::Unary { operand, .. } => operand.walk_mut(f),
            HirExprKind::Binary { lhs, rhs, .. } => {
                lhs.walk_mut(f);
                rhs.walk_mut(f);
            }
            HirExprKind::Block(block) => block.walk_mut(f),
            HirExprKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                cond.walk_mut(f);
                then_branch.walk_mut(f);
                if let Some(e) = else_branch {
                    e.walk_mut(f);
                }
            }
            HirExprKind::While { cond, body } => {
                cond.walk_mut(f);
                body.walk_mut(f);
            }
            HirExprKind::Return(value) => {
                if let Some(v) = value {
                    v.walk_mut(f);
                }
            }
        }
    }
}

impl HirBlock {
    fn walk(&self, f: &mut impl FnMut(&HirExpr)) {
        for stmt in &self.stmts {
            match stmt {
                HirStmt::Let { init, .. } => init.walk(f),
                HirStmt::Assign { place, value } => {
                    if let HirPlace::Field { base, .. } = place {
                        base.walk(f);
                    }
                    value.walk(f);
                }
                HirStmt::Expr(e) => e.walk(f),
            }
        }
        if let Some(tail) = &self.tail {
            tail.walk(f);
        }
    }

    fn walk_mut(&mut self, f: &mut impl FnMut(&mut HirExpr)) {
        for stmt in &mut self.stmts {
            match stmt {
                HirStmt::Let { init, .. } => init.walk_mut(f),
                HirStmt::Assign { place, value } => {
                    if let HirPlace::Field { base, .. } = place {
                        base.walk_mut(f);
                    }
                    value.walk_mut(f);
                }
                HirStmt::Expr(e) => e.walk_mut(f),
            }
        }
        if let Some(tail) = &mut self.tail {
            tail.walk_mut(f);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::FileId;

    fn span() -> Span {
        Span::new(FileId::USER, 0, 1)
    }

    #[test]
    fn walk_visits_statements_and_tail() {
        let call = HirExpr::new(
            HirExprKind::Call {
                callee: Callee::Builtin(BuiltinKind::MemorySize),
                args: vec![],
            },
            Type::I32,
            span(),
        );
        let block = HirExpr::new(
            HirExprKind::Block(HirBlock {
                stmts: vec![
                    HirStmt::Let {
                        local: LocalId(0),
                        init: HirExpr::new(HirExprKind::Int(1), Type::I32, span()),
                    },
                    HirStmt::Expr(call),
                ],
                tail: Some(Box::new(HirExpr::new(
                    HirExprKind::Local(LocalId(0)),
                    Type::I32,
                    span(),
                ))),
            }),
            Type::I32,
            span(),
        );
        let mut seen = 0;
        block.walk(&mut |_| seen += 1);
        assert_eq!(seen, 4);
    }
}

//! Name resolution and type checking: AST → HIR.
//!
//! The checker runs over the std program and the user program together.
//! Items are collected first, in three passes per module (struct names,
//! struct fields, then function signatures and globals), so every item is
//! visible from every function body regardless of declaration order.
//! Bodies are checked afterwards, std first.
//!
//! Integer literals get inference variables that can only become `i32` or
//! `i64`. Nothing is ever coerced; variables left unconstrained at the end
//! default to `i32`.
//!
//! Whether a diagnostic blocks code generation is decided in one place,
//! [`Checker::report`]:
//!
//! - anything wrong in std is fatal,
//! - errors inside a function that already failed to parse are
//!   downgraded, because the function is lowered as a trapping stub,
//! - warnings (unused locals, unreachable code, literal overflow) never
//!   block anything.

use std::borrow::Cow;

use crate::ast::{
    BinaryOp, Block, Expr, ExprKind, FnDecl, GlobalDecl, Ident, Item, Param, Program, Stmt,
    StructDecl, TypeExpr, UnaryOp,
};
use crate::builtins::BUILTINS;
use crate::diagnostic::{Diagnostic, DiagnosticKind, Severity};
use crate::hir::{
    Callee, ConstValue, FuncId, FunctionBody, GlobalId, HirBlock, HirExpr, HirExprKind, HirField,
    HirFunction, HirGlobal, HirIdent, HirLocal, HirModule, HirPlace, HirStmt, HirStruct, LocalId,
    StructId,
};
use crate::metadata::EntryKind;
use crate::name_resolve::{
    ScopeId, ScopeKind, ScopeTree, Symbol, SymbolId, SymbolKind, SymbolTarget,
};
use crate::span::{FileId, Span};
use crate::types::{InferVar, Type, least_common_supertype};

/// Something the hover resolver should know about: a declaration or a
/// resolved reference in user source.
#[derive(Debug, Clone, PartialEq)]
pub struct HoverRecord {
    pub span: Span,
    pub kind: EntryKind,
    pub name: String,
    pub ty: Type,
    pub docs: Option<String>,
}

impl HoverRecord {
    /// Rendered type. Structs show their field list rather than their name.
    pub fn detail(&self, module: &HirModule) -> String {
        match (self.kind, &self.ty) {
            (EntryKind::Struct, Type::Struct { id, .. }) => struct_detail(module.struct_def(*id)),
            _ => self.ty.to_string(),
        }
    }
}

/// `{ x: i32, y: i32 }`
pub fn struct_detail(def: &HirStruct) -> String {
    if def.fields.is_empty() {
        return "{}".to_string();
    }
    let fields: Vec<String> = def
        .fields
        .iter()
        .map(|f| format!("{}: {}", f.name.name, f.ty))
        .collect();
    format!("{{ {} }}", fields.join(", "))
}

/// Output of [`analyze`].
#[derive(Debug)]
pub struct Analysis {
    pub module: HirModule,
    pub scopes: ScopeTree,
    pub diagnostics: Vec<Diagnostic>,
    pub hover: Vec<HoverRecord>,
}

impl Analysis {
    pub fn has_fatal(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_fatal)
    }
}

/// Resolve and type-check `user` against `std`.
#[tracing::instrument(
    level = "debug",
    skip_all,
    fields(std_items = std.items.len(), user_items = user.items.len())
)]
pub fn analyze(std: &Program, user: &Program) -> Analysis {
    let mut checker = Checker::new();
    let root = checker.scopes.root();
    let std_scope = checker.scopes.push_scope(root, ScopeKind::Module(FileId::STD));
    let user_scope = checker
        .scopes
        .push_scope(std_scope, ScopeKind::Module(FileId::USER));

    let mut bodies = checker.collect_items(std, std_scope);
    bodies.extend(checker.collect_items(user, user_scope));
    for (id, scope, decl) in bodies {
        checker.check_function(id, scope, decl);
    }

    let analysis = checker.finish();
    tracing::debug!(
        functions = analysis.module.functions.len(),
        structs = analysis.module.structs.len(),
        diagnostics = analysis.diagnostics.len(),
        hover_records = analysis.hover.len(),
        "analysis finished"
    );
    analysis
}

fn type_error(code: &'static str, message: impl Into<Cow<'static, str>>, span: Span) -> Diagnostic {
    Diagnostic::fatal(DiagnosticKind::TypeError, message, span).with_code(code)
}

fn type_warning(code: &'static str, message: impl Into<Cow<'static, str>>, span: Span) -> Diagnostic {
    Diagnostic::warning(DiagnosticKind::TypeError, message, span).with_code(code)
}

fn hir_ident(ident: &Ident) -> HirIdent {
    HirIdent {
        name: ident.name.clone(),
        span: ident.span,
    }
}

fn stmt_span(stmt: &Stmt) -> Span {
    match stmt {
        Stmt::Let { span, .. } | Stmt::Assign { span, .. } => *span,
        Stmt::Expr(expr) => expr.span,
    }
}

fn noun(kind: SymbolKind) -> &'static str {
    match kind {
        SymbolKind::Function => "function",
        SymbolKind::Extern => "extern function",
        SymbolKind::Builtin => "builtin",
        SymbolKind::Struct => "struct",
        SymbolKind::Field => "field",
        SymbolKind::Param => "parameter",
        SymbolKind::Local => "variable",
        SymbolKind::Global => "global",
    }
}

fn plural(count: usize, word: &str) -> String {
    if count == 1 {
        format!("{count} {word}")
    } else {
        format!("{count} {word}s")
    }
}

/// Decimal digits of a literal; saturates far outside every integer type.
fn parse_int(text: &str) -> i128 {
    text.bytes()
        .filter(u8::is_ascii_digit)
        .fold(0i128, |acc, d| {
            acc.saturating_mul(10).saturating_add(i128::from(d - b'0'))
        })
}

fn int_fits(value: i128, ty: &Type) -> bool {
    match ty {
        Type::I64 => i64::try_from(value).is_ok(),
        _ => i32::try_from(value).is_ok(),
    }
}

fn zero_value(ty: &Type) -> ConstValue {
    match ty {
        Type::F64 => ConstValue::F64(0.0),
        Type::Bool => ConstValue::Bool(false),
        Type::Str => ConstValue::Str(String::new()),
        _ => ConstValue::Int(0),
    }
}

/// Bindings of inference variables.
#[derive(Debug, Default)]
struct Substitution {
    bindings: Vec<Option<Type>>,
}

impl Substitution {
    fn fresh(&mut self) -> Type {
        let var = InferVar(self.bindings.len() as u32);
        self.bindings.push(None);
        Type::Infer(var)
    }

    fn bind(&mut self, var: InferVar, ty: Type) {
        self.bindings[var.0 as usize] = Some(ty);
    }

    /// Follow variable bindings at the top level only.
    fn shallow(&self, ty: &Type) -> Type {
        let mut ty = ty.clone();
        loop {
            let var = match ty {
                Type::Infer(var) => var,
                other => return other,
            };
            match &self.bindings[var.0 as usize] {
                Some(bound) => ty = bound.clone(),
                None => return Type::Infer(var),
            }
        }
    }

    /// Fully substituted type, keeping unbound variables.
    fn apply(&self, ty: &Type) -> Type {
        match self.shallow(ty) {
            Type::Function { params, result } => Type::function(
                params.iter().map(|p| self.apply(p)).collect(),
                self.apply(&result),
            ),
            other => other,
        }
    }

    /// Fully substituted type with unbound variables defaulted to `i32`.
    fn zonk(&self, ty: &Type) -> Type {
        match self.shallow(ty) {
            Type::Infer(_) => Type::I32,
            Type::Function { params, result } => Type::function(
                params.iter().map(|p| self.zonk(p)).collect(),
                self.zonk(&result),
            ),
            other => other,
        }
    }

    fn unify(&mut self, a: &Type, b: &Type) -> bool {
        let a = self.shallow(a);
        let b = self.shallow(b);
        match (&a, &b) {
            (Type::Error, _) | (_, Type::Error) => true,
            (Type::Infer(x), Type::Infer(y)) => {
                if x != y {
                    self.bind(*x, b.clone());
                }
                true
            }
            (Type::Infer(var), other) | (other, Type::Infer(var)) => {
                if matches!(other, Type::I32 | Type::I64) {
                    self.bind(*var, other.clone());
                    true
                } else {
                    false
                }
            }
            (
                Type::Function {
                    params: pa,
                    result: ra,
                },
                Type::Function {
                    params: pb,
                    result: rb,
                },
            ) => {
                pa.len() == pb.len()
                    && pa.iter().zip(pb).all(|(x, y)| self.unify(x, y))
                    && self.unify(ra, rb)
            }
            _ => a == b,
        }
    }
}

/// Per-function checking state.
#[derive(Debug)]
struct FnState {
    locals: Vec<HirLocal>,
    result: Type,
    loop_depth: u32,
    recovered: bool,
}

impl Default for FnState {
    fn default() -> Self {
        FnState {
            locals: Vec::new(),
            result: Type::Unit,
            loop_depth: 0,
            recovered: false,
        }
    }
}

struct Checker {
    scopes: ScopeTree,
    module: HirModule,
    subst: Substitution,
    diagnostics: Vec<Diagnostic>,
    hover: Vec<HoverRecord>,
    /// Field scope of each struct, indexed by [`StructId`].
    struct_scopes: Vec<ScopeId>,
    /// Integer literals, range-checked once their type is known.
    int_literals: Vec<(Span, i128, Type)>,
    scope: ScopeId,
    func: FnState,
}

type FunctionWork<'a> = (FuncId, ScopeId, &'a FnDecl);

impl Checker {
    fn new() -> Self {
        let mut scopes = ScopeTree::new();
        let root = scopes.root();
        for builtin in BUILTINS {
            scopes.declare(
                root,
                Symbol::new(
                    builtin.name,
                    SymbolKind::Builtin,
                    builtin.kind.signature(),
                    Span::new(FileId::BUILTIN, 0, 0),
                    SymbolTarget::Builtin(builtin.kind),
                )
                .with_docs(Some(builtin.docs.to_string())),
            );
        }
        Checker {
            scopes,
            module: HirModule::default(),
            subst: Substitution::default(),
            diagnostics: Vec::new(),
            hover: Vec::new(),
            struct_scopes: Vec::new(),
            int_literals: Vec::new(),
            scope: root,
            func: FnState::default(),
        }
    }

    fn report(&mut self, diagnostic: Diagnostic) {
        let diagnostic = if diagnostic.file_id() == FileId::STD {
            if diagnostic.severity == Severity::Warning {
                return;
            }
            diagnostic.into_fatal()
        } else if self.func.recovered {
            diagnostic.into_recoverable()
        } else {
            diagnostic
        };
        self.diagnostics.push(diagnostic);
    }

    fn record(&mut self, span: Span, kind: EntryKind, name: &str, ty: Type, docs: Option<String>) {
        if span.file_id == FileId::USER {
            self.hover.push(HoverRecord {
                span,
                kind,
                name: name.to_string(),
                ty,
                docs,
            });
        }
    }

    /// Mark a symbol used at `span` and record the reference for hover.
    fn reference(&mut self, id: SymbolId, span: Span) -> Symbol {
        self.scopes.mark_used(id);
        let symbol = self.scopes.get(id).clone();
        self.record(
            span,
            EntryKind::from_symbol(symbol.kind, symbol.mutable),
            &symbol.name,
            symbol.ty.clone(),
            symbol.docs.clone(),
        );
        symbol
    }

    // -----------------------------------------------------------------
    // Item collection
    // -----------------------------------------------------------------

    fn collect_items<'a>(&mut self, program: &'a Program, scope: ScopeId) -> Vec<FunctionWork<'a>> {
        let structs: Vec<(StructId, &StructDecl)> = program
            .items
            .iter()
            .filter_map(|item| match item {
                Item::Struct(decl) => Some(decl),
                _ => None,
            })
            .map(|decl| (self.declare_struct(decl, scope), decl))
            .collect();
        for (id, decl) in structs {
            self.define_fields(id, decl, scope);
        }

        let mut bodies = Vec::new();
        for item in &program.items {
            match item {
                Item::Function(decl) => {
                    let id = self.declare_function(
                        &decl.name,
                        &decl.params,
                        decl.result.as_ref(),
                        decl.docs.clone(),
                        decl.span,
                        false,
                        scope,
                    );
                    bodies.push((id, scope, decl));
                }
                Item::Extern(decl) => {
                    self.declare_function(
                        &decl.name,
                        &decl.params,
                        decl.result.as_ref(),
                        decl.docs.clone(),
                        decl.span,
                        true,
                        scope,
                    );
                }
                Item::Global(decl) => self.declare_global(decl, scope),
                Item::Struct(_) | Item::Error(_) => {}
            }
        }
        bodies
    }

    fn declare_item(&mut self, scope: ScopeId, symbol: Symbol) -> SymbolId {
        if let Some(previous) = self.scopes.lookup_local(scope, &symbol.name) {
            let previous = self.scopes.get(previous).span;
            self.report(type_error(
                "E0209",
                format!(
                    "`{}` is defined more than once (first definition at byte {})",
                    symbol.name, previous.start
                ),
                symbol.span,
            ));
        }
        self.scopes.declare(scope, symbol)
    }

    fn declare_struct(&mut self, decl: &StructDecl, scope: ScopeId) -> StructId {
        let id = StructId(self.module.structs.len() as u32);
        let members = self.scopes.push_scope(scope, ScopeKind::Struct);
        self.struct_scopes.push(members);
        self.module.structs.push(HirStruct {
            id,
            name: hir_ident(&decl.name),
            fields: Vec::new(),
            docs: decl.docs.clone(),
            span: decl.span,
        });
        let ty = Type::Struct {
            id,
            name: decl.name.name.clone(),
        };
        let mut symbol = Symbol::new(
            &decl.name.name,
            SymbolKind::Struct,
            ty,
            decl.name.span,
            SymbolTarget::Struct(id),
        )
        .with_docs(decl.docs.clone());
        symbol.members = Some(members);
        self.declare_item(scope, symbol);
        id
    }

    fn define_fields(&mut self, id: StructId, decl: &StructDecl, scope: ScopeId) {
        let members = self.struct_scopes[id.0 as usize];
        let mut fields = Vec::with_capacity(decl.fields.len());
        for (index, field) in decl.fields.iter().enumerate() {
            let ty = self.resolve_type(&field.ty, scope);
            if self.scopes.lookup_local(members, &field.name.name).is_some() {
                self.report(type_error(
                    "E0209",
                    format!("field `{}` is declared more than once", field.name.name),
                    field.name.span,
                ));
            }
            self.scopes.declare(
                members,
                Symbol::new(
                    &field.name.name,
                    SymbolKind::Field,
                    ty.clone(),
                    field.name.span,
                    SymbolTarget::Field(id, index as u32),
                )
                .with_docs(field.docs.clone()),
            );
            self.record(
                field.span,
                EntryKind::Field,
                &field.name.name,
                ty.clone(),
                field.docs.clone(),
            );
            fields.push(HirField {
                name: hir_ident(&field.name),
                ty,
            });
        }
        self.module.structs[id.0 as usize].fields = fields;

        let ty = Type::Struct {
            id,
            name: decl.name.name.clone(),
        };
        self.record(decl.span, EntryKind::Struct, &decl.name.name, ty, decl.docs.clone());
    }

    #[allow(clippy::too_many_arguments)]
    fn declare_function(
        &mut self,
        name: &Ident,
        params: &[Param],
        result: Option<&TypeExpr>,
        docs: Option<String>,
        span: Span,
        is_extern: bool,
        scope: ScopeId,
    ) -> FuncId {
        let id = FuncId(self.module.functions.len() as u32);
        let locals: Vec<HirLocal> = params
            .iter()
            .map(|param| HirLocal {
                name: hir_ident(&param.name),
                ty: self.resolve_type(&param.ty, scope),
                mutable: false,
            })
            .collect();
        let result = match result {
            Some(ty) => self.resolve_type(ty, scope),
            None => Type::Unit,
        };
        let function = HirFunction {
            id,
            name: hir_ident(name),
            param_count: locals.len() as u32,
            locals,
            result,
            body: if is_extern {
                FunctionBody::Extern
            } else {
                FunctionBody::Stub
            },
            docs: docs.clone(),
            span,
        };
        let signature = function.signature();
        self.module.functions.push(function);

        let kind = if is_extern {
            self.record(span, EntryKind::Extern, &name.name, signature.clone(), docs.clone());
            SymbolKind::Extern
        } else {
            SymbolKind::Function
        };
        self.declare_item(
            scope,
            Symbol::new(&name.name, kind, signature, name.span, SymbolTarget::Function(id))
                .with_docs(docs),
        );
        id
    }

    fn declare_global(&mut self, decl: &GlobalDecl, scope: ScopeId) {
        let declared = decl.ty.as_ref().map(|ty| self.resolve_type(ty, scope));
        let (init, ty) = self.const_init(&decl.init, declared);
        let id = GlobalId(self.module.globals.len() as u32);
        self.module.globals.push(HirGlobal {
            id,
            name: hir_ident(&decl.name),
            ty: ty.clone(),
            mutable: decl.mutable,
            init,
            docs: decl.docs.clone(),
            span: decl.span,
        });
        self.declare_item(
            scope,
            Symbol::new(&decl.name.name, SymbolKind::Global, ty, decl.name.span, SymbolTarget::Global(id))
                .with_mutable(decl.mutable)
                .with_docs(decl.docs.clone()),
        );
    }

    /// Evaluate a global initializer: a literal, or a negated numeric
    /// literal.
    fn const_init(&mut self, expr: &Expr, declared: Option<Type>) -> (ConstValue, Type) {
        let (negated, literal) = match &expr.kind {
            ExprKind::Unary {
                op: UnaryOp::Neg,
                operand,
            } => (true, operand.as_ref()),
            _ => (false, expr),
        };
        let found = match &literal.kind {
            ExprKind::Int(text) => {
                let value = if negated { -parse_int(text) } else { parse_int(text) };
                let ty = match &declared {
                    Some(ty @ (Type::I32 | Type::I64)) => ty.clone(),
                    _ => Type::I32,
                };
                if !int_fits(value, &ty) {
                    self.report(type_warning(
                        "W0003",
                        format!("integer literal is out of range for `{ty}` and will be truncated"),
                        expr.span,
                    ));
                }
                Some((ConstValue::Int(value as i64), ty))
            }
            ExprKind::Float(text) => {
                let value: f64 = text.parse().unwrap_or(0.0);
                Some((ConstValue::F64(if negated { -value } else { value }), Type::F64))
            }
            ExprKind::Bool(value) if !negated => Some((ConstValue::Bool(*value), Type::Bool)),
            ExprKind::Str(value) if !negated => Some((ConstValue::Str(value.clone()), Type::Str)),
            // Already reported by the parser.
            ExprKind::Error => None,
            _ => {
                self.report(type_error(
                    "E0208",
                    "global initializer must be a constant literal",
                    expr.span,
                ));
                None
            }
        };

        match (found, declared) {
            (Some((value, found)), Some(declared)) => {
                if !declared.is_error() && found != declared {
                    self.report(type_error(
                        "E0202",
                        format!("mismatched types: expected `{declared}`, found `{found}`"),
                        expr.span,
                    ));
                }
                (value, declared)
            }
            (Some((value, found)), None) => (value, found),
            (None, Some(declared)) => (zero_value(&declared), declared),
            (None, None) => (ConstValue::Int(0), Type::I32),
        }
    }

    fn resolve_type(&mut self, ty: &TypeExpr, scope: ScopeId) -> Type {
        let ident = match ty {
            TypeExpr::Named(ident) => ident,
            TypeExpr::Error(_) => return Type::Error,
        };
        if let Some(primitive) = Type::primitive(&ident.name) {
            return primitive;
        }
        match self
            .scopes
            .lookup_where(scope, &ident.name, |s| s.kind == SymbolKind::Struct)
        {
            Some(id) => self.reference(id, ident.span).ty,
            None => {
                self.report(type_error(
                    "E0201",
                    format!("unknown type `{}`", ident.name),
                    ident.span,
                ));
                Type::Error
            }
        }
    }

    // -----------------------------------------------------------------
    // Function bodies
    // -----------------------------------------------------------------

    fn check_function(&mut self, id: FuncId, scope: ScopeId, decl: &FnDecl) {
        let function = self.module.function(id);
        let params = function.params().to_vec();
        let result = function.result.clone();

        let fn_scope = self.scopes.push_scope(scope, ScopeKind::Function);
        self.scope = fn_scope;
        self.func = FnState {
            locals: params.clone(),
            result: result.clone(),
            loop_depth: 0,
            recovered: decl.recovered,
        };
        for (index, (param, local)) in decl.params.iter().zip(&params).enumerate() {
            self.scopes.declare(
                fn_scope,
                Symbol::new(
                    &param.name.name,
                    SymbolKind::Param,
                    local.ty.clone(),
                    param.name.span,
                    SymbolTarget::Local(LocalId(index as u32)),
                ),
            );
            self.record(param.span, EntryKind::Param, &param.name.name, local.ty.clone(), None);
        }

        let body = self.check_block(&decl.body, fn_scope);
        let span = decl.body.tail.as_ref().map_or(decl.body.span, |tail| tail.span);
        self.expect_type(&body.ty, &result, span);

        let state = std::mem::take(&mut self.func);
        let function = &mut self.module.functions[id.0 as usize];
        function.locals = state.locals;
        function.body = if decl.recovered {
            FunctionBody::Stub
        } else {
            FunctionBody::Expr(body)
        };
        self.scope = self.scopes.root();
    }

    fn check_block(&mut self, block: &Block, parent: ScopeId) -> HirExpr {
        let scope = self.scopes.push_scope(parent, ScopeKind::Block);
        let saved = std::mem::replace(&mut self.scope, scope);

        let mut stmts = Vec::with_capacity(block.stmts.len());
        let mut diverges = false;
        let mut warned = false;
        for stmt in &block.stmts {
            if diverges && !warned {
                self.report(type_warning("W0002", "unreachable statement", stmt_span(stmt)));
                warned = true;
            }
            let stmt = self.check_stmt(stmt);
            diverges |= self.stmt_diverges(&stmt);
            stmts.push(stmt);
        }
        let tail = block.tail.as_ref().map(|tail| {
            if diverges && !warned {
                self.report(type_warning("W0002", "unreachable expression", tail.span));
            }
            Box::new(self.infer(tail))
        });

        let ty = match &tail {
            Some(tail) => tail.ty.clone(),
            None if diverges => Type::Never,
            None => Type::Unit,
        };
        self.warn_unused(scope);
        self.scope = saved;
        HirExpr::new(HirExprKind::Block(HirBlock { stmts, tail }), ty, block.span)
    }

    fn stmt_diverges(&self, stmt: &HirStmt) -> bool {
        let expr = match stmt {
            HirStmt::Let { init, .. } => init,
            HirStmt::Assign { value, .. } => value,
            HirStmt::Expr(expr) => expr,
        };
        self.subst.shallow(&expr.ty).is_never()
    }

    fn warn_unused(&mut self, scope: ScopeId) {
        let unused: Vec<(String, Span)> = self
            .scopes
            .scope(scope)
            .symbols
            .iter()
            .filter(|s| s.kind == SymbolKind::Local && !s.used && !s.name.starts_with('_'))
            .map(|s| (s.name.clone(), s.span))
            .collect();
        for (name, span) in unused {
            self.report(type_warning("W0001", format!("unused variable `{name}`"), span));
        }
    }

    fn declare_local(&mut self, name: &Ident, mutable: bool, ty: Type) -> LocalId {
        let id = LocalId(self.func.locals.len() as u32);
        self.func.locals.push(HirLocal {
            name: hir_ident(name),
            ty: ty.clone(),
            mutable,
        });
        self.scopes.declare(
            self.scope,
            Symbol::new(&name.name, SymbolKind::Local, ty.clone(), name.span, SymbolTarget::Local(id))
                .with_mutable(mutable),
        );
        self.record(
            name.span,
            EntryKind::from_symbol(SymbolKind::Local, mutable),
            &name.name,
            ty,
            None,
        );
        id
    }

    fn check_stmt(&mut self, stmt: &Stmt) -> HirStmt {
        match stmt {
            Stmt::Let {
                name,
                mutable,
                ty,
                init,
                ..
            } => {
                let declared = ty.as_ref().map(|ty| self.resolve_type(ty, self.scope));
                let init = match &declared {
                    Some(declared) => self.check(init, declared),
                    None => self.infer(init),
                };
                let ty = declared.unwrap_or_else(|| init.ty.clone());
                if self.subst.shallow(&ty).is_unit() {
                    self.report(type_error(
                        "E0213",
                        format!("cannot bind `{}` to a value of type `()`", name.name),
                        init.span,
                    ));
                }
                let local = self.declare_local(name, *mutable, ty);
                HirStmt::Let { local, init }
            }
            Stmt::Assign { target, value, .. } => self.check_assign(target, value),
            Stmt::Expr(expr) => HirStmt::Expr(self.infer(expr)),
        }
    }

    fn check_assign(&mut self, target: &Expr, value: &Expr) -> HirStmt {
        match &target.kind {
            ExprKind::Ident(ident) => {
                let Some(id) = self
                    .scopes
                    .lookup_where(self.scope, &ident.name, |s| s.kind.is_value())
                else {
                    self.unresolved_value(ident);
                    return HirStmt::Expr(self.infer(value));
                };
                // Writing a variable does not count as using it.
                let symbol = self.scopes.get(id).clone();
                self.record(
                    ident.span,
                    EntryKind::from_symbol(symbol.kind, symbol.mutable),
                    &symbol.name,
                    symbol.ty.clone(),
                    symbol.docs.clone(),
                );
                if !symbol.mutable {
                    self.report(type_error(
                        "E0207",
                        format!(
                            "cannot assign to immutable {} `{}`",
                            noun(symbol.kind),
                            symbol.name
                        ),
                        target.span,
                    ));
                }
                let value = self.check(value, &symbol.ty);
                let place = match symbol.target {
                    SymbolTarget::Local(local) => HirPlace::Local(local),
                    SymbolTarget::Global(global) => HirPlace::Global(global),
                    _ => return HirStmt::Expr(value),
                };
                HirStmt::Assign { place, value }
            }
            ExprKind::Field { base, field } => {
                let base = self.infer(base);
                match self.field_of(&base, field) {
                    Some((struct_id, index, ty)) => {
                        let value = self.check(value, &ty);
                        HirStmt::Assign {
                            place: HirPlace::Field {
                                base: Box::new(base),
                                struct_id,
                                index,
                            },
                            value,
                        }
                    }
                    None => HirStmt::Expr(self.infer(value)),
                }
            }
            ExprKind::Error => HirStmt::Expr(self.infer(value)),
            _ => {
                self.report(type_error(
                    "E0212",
                    "invalid left-hand side of assignment",
                    target.span,
                ));
                HirStmt::Expr(self.infer(value))
            }
        }
    }

    // -----------------------------------------------------------------
    // Expressions
    // -----------------------------------------------------------------

    fn check(&mut self, expr: &Expr, expected: &Type) -> HirExpr {
        let hir = self.infer(expr);
        self.expect_type(&hir.ty, expected, hir.span);
        hir
    }

    /// `Never` is accepted wherever a value is expected.
    fn expect_type(&mut self, actual: &Type, expected: &Type, span: Span) {
        if self.subst.shallow(actual).is_never() {
            return;
        }
        if !self.subst.unify(actual, expected) {
            let expected = self.subst.apply(expected);
            let actual = self.subst.apply(actual);
            self.report(type_error(
                "E0202",
                format!("mismatched types: expected `{expected}`, found `{actual}`"),
                span,
            ));
        }
    }

    fn int_literal(&mut self, value: i128, span: Span) -> HirExpr {
        let ty = self.subst.fresh();
        self.int_literals.push((span, value, ty.clone()));
        HirExpr::new(HirExprKind::Int(value as i64), ty, span)
    }

    fn infer(&mut self, expr: &Expr) -> HirExpr {
        let span = expr.span;
        match &expr.kind {
            ExprKind::Int(text) => self.int_literal(parse_int(text), span),
            ExprKind::Float(text) => HirExpr::new(
                HirExprKind::F64(text.parse().unwrap_or(0.0)),
                Type::F64,
                span,
            ),
            ExprKind::Str(value) => HirExpr::new(HirExprKind::Str(value.clone()), Type::Str, span),
            ExprKind::Bool(value) => HirExpr::new(HirExprKind::Bool(*value), Type::Bool, span),
            ExprKind::Ident(ident) => self.value_ref(ident),
            ExprKind::Call { callee, args } => self.infer_call(callee, args, span),
            ExprKind::Field { base, field } => {
                let base = self.infer(base);
                match self.field_of(&base, field) {
                    Some((struct_id, index, ty)) => HirExpr::new(
                        HirExprKind::Field {
                            base: Box::new(base),
                            struct_id,
                            index,
                        },
                        ty,
                        span,
                    ),
                    None => HirExpr::error(span),
                }
            }
            ExprKind::StructLit { name, fields } => self.infer_struct_lit(name, fields, span),
            ExprKind::Unary { op, operand } => self.infer_unary(*op, operand, span),
            ExprKind::Binary { op, lhs, rhs } => self.infer_binary(*op, lhs, rhs, span),
            ExprKind::Block(block) => self.check_block(block, self.scope),
            ExprKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                let cond = self.check(cond, &Type::Bool);
                let then_branch = self.check_block(then_branch, self.scope);
                let (else_branch, ty) = match else_branch {
                    Some(else_branch) => {
                        let else_branch = self.infer(else_branch);
                        let ty = self.join(&then_branch.ty, &else_branch.ty, span);
                        (Some(Box::new(else_branch)), ty)
                    }
                    None => {
                        self.expect_type(&then_branch.ty, &Type::Unit, then_branch.span);
                        (None, Type::Unit)
                    }
                };
                HirExpr::new(
                    HirExprKind::If {
                        cond: Box::new(cond),
                        then_branch: Box::new(then_branch),
                        else_branch,
                    },
                    ty,
                    span,
                )
            }
            ExprKind::While { cond, body } => {
                let cond = self.check(cond, &Type::Bool);
                self.func.loop_depth += 1;
                let body = self.check_block(body, self.scope);
                self.func.loop_depth -= 1;
                self.expect_type(&body.ty, &Type::Unit, body.span);
                HirExpr::new(
                    HirExprKind::While {
                        cond: Box::new(cond),
                        body: Box::new(body),
                    },
                    Type::Unit,
                    span,
                )
            }
            ExprKind::Return(value) => {
                let result = self.func.result.clone();
                let value = match value {
                    Some(value) => Some(Box::new(self.check(value, &result))),
                    None => {
                        self.expect_type(&Type::Unit, &result, span);
                        None
                    }
                };
                HirExpr::new(HirExprKind::Return(value), Type::Never, span)
            }
            ExprKind::Break | ExprKind::Continue => {
                let (kind, keyword) = match expr.kind {
                    ExprKind::Break => (HirExprKind::Break, "break"),
                    _ => (HirExprKind::Continue, "continue"),
                };
                if self.func.loop_depth == 0 {
                    self.report(type_error(
                        "E0210",
                        format!("`{keyword}` outside of a loop"),
                        span,
                    ));
                }
                HirExpr::new(kind, Type::Never, span)
            }
            ExprKind::Error => HirExpr::error(span),
        }
    }

    /// Type of an `if` with both branches.
    fn join(&mut self, a: &Type, b: &Type, span: Span) -> Type {
        let a = self.subst.apply(a);
        let b = self.subst.apply(b);
        if let Some(ty) = least_common_supertype(&a, &b) {
            return ty;
        }
        if self.subst.unify(&a, &b) {
            return self.subst.apply(&a);
        }
        self.report(type_error(
            "E0202",
            format!("`if` and `else` have incompatible types: `{a}` and `{b}`"),
            span,
        ));
        Type::Error
    }

    fn unresolved_value(&mut self, ident: &Ident) {
        let diagnostic = match self.scopes.lookup(self.scope, &ident.name) {
            Some(other) => type_error(
                "E0211",
                format!(
                    "`{}` is a {}, not a value",
                    ident.name,
                    noun(self.scopes.get(other).kind)
                ),
                ident.span,
            ),
            None => type_error(
                "E0200",
                format!("cannot find value `{}` in this scope", ident.name),
                ident.span,
            ),
        };
        self.report(diagnostic);
    }

    fn value_ref(&mut self, ident: &Ident) -> HirExpr {
        let Some(id) = self
            .scopes
            .lookup_where(self.scope, &ident.name, |s| s.kind.is_value())
        else {
            self.unresolved_value(ident);
            return HirExpr::error(ident.span);
        };
        let symbol = self.reference(id, ident.span);
        let kind = match symbol.target {
            SymbolTarget::Local(local) => HirExprKind::Local(local),
            SymbolTarget::Global(global) => HirExprKind::Global(global),
            _ => HirExprKind::Error,
        };
        HirExpr::new(kind, symbol.ty, ident.span)
    }

    fn infer_call(&mut self, callee: &Ident, args: &[Expr], span: Span) -> HirExpr {
        let Some(id) = self
            .scopes
            .lookup_where(self.scope, &callee.name, |s| s.kind.is_callable())
        else {
            let diagnostic = match self.scopes.lookup(self.scope, &callee.name) {
                Some(other) => type_error(
                    "E0211",
                    format!(
                        "`{}` is a {}, not a function",
                        callee.name,
                        noun(self.scopes.get(other).kind)
                    ),
                    callee.span,
                ),
                None => type_error(
                    "E0200",
                    format!("cannot find function `{}` in this scope", callee.name),
                    callee.span,
                ),
            };
            self.report(diagnostic);
            for arg in args {
                self.infer(arg);
            }
            return HirExpr::error(span);
        };

        let symbol = self.reference(id, callee.span);
        let Type::Function { params, result } = symbol.ty else {
            return HirExpr::error(span);
        };
        if params.len() != args.len() {
            let supplied = if args.len() == 1 { "was" } else { "were" };
            self.report(type_error(
                "E0203",
                format!(
                    "`{}` takes {} but {} {supplied} supplied",
                    callee.name,
                    plural(params.len(), "argument"),
                    args.len()
                ),
                span,
            ));
        }
        let args: Vec<HirExpr> = args
            .iter()
            .enumerate()
            .map(|(i, arg)| match params.get(i) {
                Some(param) => self.check(arg, param),
                None => self.infer(arg),
            })
            .collect();
        let callee = match symbol.target {
            SymbolTarget::Function(id) => Callee::Function(id),
            SymbolTarget::Builtin(kind) => Callee::Builtin(kind),
            _ => return HirExpr::error(span),
        };
        HirExpr::new(HirExprKind::Call { callee, args }, *result, span)
    }

    /// Resolve `base.field`, recording the field reference.
    fn field_of(&mut self, base: &HirExpr, field: &Ident) -> Option<(StructId, u32, Type)> {
        match self.subst.shallow(&base.ty) {
            Type::Struct { id, name } => {
                let members = self.struct_scopes[id.0 as usize];
                let Some(symbol) = self.scopes.lookup_local(members, &field.name) else {
                    self.report(type_error(
                        "E0204",
                        format!("struct `{name}` has no field `{}`", field.name),
                        field.span,
                    ));
                    return None;
                };
                let symbol = self.reference(symbol, field.span);
                match symbol.target {
                    SymbolTarget::Field(_, index) => Some((id, index, symbol.ty)),
                    _ => None,
                }
            }
            Type::Error | Type::Never => None,
            other => {
                let other = self.subst.apply(&other);
                self.report(type_error(
                    "E0204",
                    format!("type `{other}` has no field `{}`", field.name),
                    field.span,
                ));
                None
            }
        }
    }

    fn infer_struct_lit(&mut self, name: &Ident, fields: &[crate::ast::FieldInit], span: Span) -> HirExpr {
        let Some(id) = self
            .scopes
            .lookup_where(self.scope, &name.name, |s| s.kind == SymbolKind::Struct)
        else {
            self.report(type_error(
                "E0200",
                format!("cannot find struct `{}` in this scope", name.name),
                name.span,
            ));
            for init in fields {
                self.infer(&init.value);
            }
            return HirExpr::error(span);
        };
        let symbol = self.reference(id, name.span);
        let SymbolTarget::Struct(struct_id) = symbol.target else {
            return HirExpr::error(span);
        };
        let members = self.struct_scopes[struct_id.0 as usize];

        let mut seen = vec![false; self.module.struct_def(struct_id).fields.len()];
        let mut inits = Vec::with_capacity(fields.len());
        for init in fields {
            let Some(field) = self.scopes.lookup_local(members, &init.name.name) else {
                self.report(type_error(
                    "E0204",
                    format!("struct `{}` has no field `{}`", name.name, init.name.name),
                    init.name.span,
                ));
                self.infer(&init.value);
                continue;
            };
            let field = self.reference(field, init.name.span);
            let SymbolTarget::Field(_, index) = field.target else {
                continue;
            };
            if std::mem::replace(&mut seen[index as usize], true) {
                self.report(type_error(
                    "E0206",
                    format!("field `{}` specified more than once", init.name.name),
                    init.name.span,
                ));
            }
            let value = self.check(&init.value, &field.ty);
            inits.push((index, value));
        }

        let missing: Vec<String> = self
            .module
            .struct_def(struct_id)
            .fields
            .iter()
            .zip(&seen)
            .filter(|(_, seen)| !**seen)
            .map(|(field, _)| format!("`{}`", field.name.name))
            .collect();
        if !missing.is_empty() {
            let noun = if missing.len() == 1 { "field" } else { "fields" };
            self.report(type_error(
                "E0205",
                format!(
                    "missing {noun} {} in initializer of `{}`",
                    missing.join(", "),
                    name.name
                ),
                span,
            ));
        }

        HirExpr::new(
            HirExprKind::StructLit {
                struct_id,
                fields: inits,
            },
            symbol.ty,
            span,
        )
    }

    fn infer_unary(&mut self, op: UnaryOp, operand: &Expr, span: Span) -> HirExpr {
        let (operand, ty) = match op {
            UnaryOp::Neg => {
                // `-2147483648` is one literal, not a negated overflow.
                if let ExprKind::Int(text) = &operand.kind {
                    return self.int_literal(-parse_int(text), span);
                }
                let operand = self.infer(operand);
                let ty = self.subst.shallow(&operand.ty);
                if !(ty.is_numeric() || ty.is_error() || ty.is_never()) {
                    self.report(type_error(
                        "E0202",
                        format!("cannot apply unary `-` to type `{ty}`"),
                        span,
                    ));
                }
                let ty = operand.ty.clone();
                (operand, ty)
            }
            UnaryOp::Not => (self.check(operand, &Type::Bool), Type::Bool),
        };
        HirExpr::new(
            HirExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
            ty,
            span,
        )
    }

    fn infer_binary(&mut self, op: BinaryOp, lhs: &Expr, rhs: &Expr, span: Span) -> HirExpr {
        let (lhs, rhs, ty) = if op.is_logical() {
            let lhs = self.check(lhs, &Type::Bool);
            let rhs = self.check(rhs, &Type::Bool);
            (lhs, rhs, Type::Bool)
        } else {
            let lhs = self.infer(lhs);
            let rhs = if self.subst.shallow(&lhs.ty).is_never() {
                self.infer(rhs)
            } else {
                self.check(rhs, &lhs.ty)
            };
            let operand = match self.subst.shallow(&lhs.ty) {
                Type::Never => self.subst.shallow(&rhs.ty),
                ty => ty,
            };
            let valid = match op {
                BinaryOp::Eq | BinaryOp::Ne => !operand.is_unit(),
                _ => operand.is_numeric() || operand.is_error() || operand.is_never(),
            };
            if !valid {
                let operand = self.subst.apply(&operand);
                self.report(type_error(
                    "E0202",
                    format!("cannot apply binary `{}` to type `{operand}`", op.symbol()),
                    span,
                ));
            }
            let ty = if op.is_comparison() { Type::Bool } else { operand };
            (lhs, rhs, ty)
        };
        HirExpr::new(
            HirExprKind::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
            ty,
            span,
        )
    }

    // -----------------------------------------------------------------
    // Finalization
    // -----------------------------------------------------------------

    /// Substitute inferred types everywhere and range-check literals.
    fn finish(mut self) -> Analysis {
        let subst = &self.subst;
        for function in &mut self.module.functions {
            for local in &mut function.locals {
                local.ty = subst.zonk(&local.ty);
            }
            if let FunctionBody::Expr(body) = &mut function.body {
                body.walk_mut(&mut |expr| expr.ty = subst.zonk(&expr.ty));
            }
        }
        for record in &mut self.hover {
            record.ty = subst.zonk(&record.ty);
        }

        for (span, value, ty) in std::mem::take(&mut self.int_literals) {
            let ty = self.subst.zonk(&ty);
            if !int_fits(value, &ty) {
                self.report(type_warning(
                    "W0003",
                    format!("integer literal is out of range for `{ty}` and will be truncated"),
                    span,
                ));
            }
        }

        Analysis {
            module: self.module,
            scopes: self.scopes,
            diagnostics: self.diagnostics,
            hover: self.hover,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn analyze_with(std: &str, user: &str) -> Analysis {
        let std = parse(FileId::STD, std);
        let user = parse(FileId::USER, user);
        assert!(std.diagnostics.is_empty(), "{:?}", std.diagnostics);
        assert!(user.diagnostics.is_empty(), "{:?}", user.diagnostics);
        analyze(&std.program, &user.program)
    }

    fn analyze_user(user: &str) -> Analysis {
        analyze_with("", user)
    }

    fn codes(analysis: &Analysis) -> Vec<&'static str> {
        analysis.diagnostics.iter().filter_map(|d| d.code).collect()
    }

    fn records<'a>(analysis: &'a Analysis, name: &str) -> Vec<&'a HoverRecord> {
        analysis.hover.iter().filter(|r| r.name == name).collect()
    }

    #[test]
    fn checks_a_small_program() {
        let analysis = analyze_user(
            "struct Point { x: i32, y: i32 }\n\
             fn len2(p: Point) -> i32 { p.x * p.x + p.y * p.y }\n\
             fn main() -> i32 { let p = Point { x: 3, y: 4 }; if len2(p) > 20 { 1 } else { 0 } }",
        );
        assert!(analysis.diagnostics.is_empty(), "{:?}", analysis.diagnostics);
        assert_eq!(analysis.module.functions.len(), 2);
        let main = &analysis.module.functions[1];
        let FunctionBody::Expr(body) = &main.body else {
            panic!("main should have a body");
        };
        assert_eq!(body.ty, Type::I32);
        assert_eq!(main.locals[0].name.name, "p");
    }

    #[test]
    fn integer_literals_follow_their_context() {
        let analysis = analyze_user("fn f() -> i64 { let x = 5; let y: i64 = x; y }");
        assert!(!analysis.has_fatal());
        let x = records(&analysis, "x");
        assert!(x.iter().all(|r| r.ty == Type::I64), "{x:?}");
    }

    #[test]
    fn unconstrained_literals_default_to_i32() {
        let analysis = analyze_user("fn f() { let _x = 7; }");
        assert_eq!(records(&analysis, "_x")[0].ty, Type::I32);
        assert!(analysis.diagnostics.is_empty());
    }

    #[test]
    fn unresolved_names_are_fatal() {
        let analysis = analyze_user("fn f() -> i32 { missing }");
        assert!(analysis.has_fatal());
        assert_eq!(codes(&analysis), vec!["E0200"]);
    }

    #[test]
    fn mismatches_and_arity_errors_are_fatal() {
        let analysis = analyze_user(
            "fn g(a: i32) -> i32 { a }\n\
             fn f() -> bool { let _x: bool = g(1, 2); 1 }",
        );
        assert!(analysis.has_fatal());
        assert_eq!(codes(&analysis), vec!["E0203", "E0202", "E0202"]);
    }

    #[test]
    fn assigning_to_immutable_bindings_is_fatal() {
        let analysis = analyze_user("let LIMIT: i32 = 3;\nfn f(n: i32) { LIMIT = n; }");
        assert_eq!(codes(&analysis), vec!["E0207"]);
        assert!(analysis.has_fatal());
        let ok = analyze_user("let mut LIMIT: i32 = 3;\nfn f(n: i32) { LIMIT = n; }");
        assert!(ok.diagnostics.is_empty(), "{:?}", ok.diagnostics);
    }

    #[test]
    fn struct_literal_field_errors() {
        let analysis = analyze_user(
            "struct P { x: i32, y: i32 }\n\
             fn f() -> P { P { x: 1, z: 2, x: 3 } }",
        );
        assert_eq!(codes(&analysis), vec!["E0204", "E0206", "E0205"]);
    }

    #[test]
    fn duplicate_items_are_fatal_but_std_can_be_shadowed() {
        let dup = analyze_user("fn a() {}\nfn a() {}");
        assert_eq!(codes(&dup), vec!["E0209"]);

        let analysis = analyze_with(
            "fn abs(x: i32) -> i32 { if x < 0 { -x } else { x } }",
            "fn abs(x: i32) -> i32 { x }\nfn main() -> i32 { abs(1) }",
        );
        assert!(analysis.diagnostics.is_empty(), "{:?}", analysis.diagnostics);
        let FunctionBody::Expr(body) = &analysis.module.functions[2].body else {
            panic!("main should have a body");
        };
        let mut callee = None;
        body.walk(&mut |e| {
            if let HirExprKind::Call { callee: c, .. } = &e.kind {
                callee = Some(*c);
            }
        });
        assert_eq!(callee, Some(Callee::Function(FuncId(1))));
    }

    #[test]
    fn break_outside_loop_is_fatal() {
        let analysis = analyze_user("fn f() { break; }");
        assert_eq!(codes(&analysis), vec!["E0210"]);
        let inside = analyze_user("fn f() { while true { break; } }");
        assert!(inside.diagnostics.is_empty());
    }

    #[test]
    fn global_initializers_must_be_constant() {
        let analysis = analyze_user("fn one() -> i32 { 1 }\nlet X: i32 = one();");
        assert_eq!(codes(&analysis), vec!["E0208"]);
        let ok = analyze_user("let X: i64 = -5;\nlet NAME = \"kite\";");
        assert!(ok.diagnostics.is_empty(), "{:?}", ok.diagnostics);
        assert_eq!(ok.module.globals[0].init, ConstValue::Int(-5));
        assert_eq!(ok.module.globals[1].ty, Type::Str);
    }

    #[test]
    fn warnings_do_not_block_codegen() {
        let analysis = analyze_user(
            "fn f() -> i32 { let unused = 1; return 2; 3 }\n\
             fn g() -> i32 { 3000000000 }\n\
             fn h() -> i32 { -2147483648 }",
        );
        assert!(!analysis.has_fatal());
        assert_eq!(codes(&analysis), vec!["W0002", "W0001", "W0003"]);
        assert!(
            analysis
                .diagnostics
                .iter()
                .all(|d| d.severity == Severity::Warning)
        );
    }

    #[test]
    fn errors_in_recovered_functions_are_not_fatal() {
        let user = parse(FileId::USER, "fn broken() -> i32 { let x = ; missing }\nfn ok() -> i32 { 1 }");
        assert!(!user.diagnostics.is_empty());
        let std = parse(FileId::STD, "");
        let analysis = analyze(&std.program, &user.program);
        assert!(!analysis.has_fatal(), "{:?}", analysis.diagnostics);
        assert!(codes(&analysis).contains(&"E0200"));
        assert_eq!(analysis.module.functions[0].body, FunctionBody::Stub);
        assert!(matches!(analysis.module.functions[1].body, FunctionBody::Expr(_)));
    }

    #[test]
    fn std_errors_are_fatal() {
        let analysis = analyze_with("fn helper() -> i32 { true }", "fn main() {}");
        assert!(analysis.has_fatal());
        assert_eq!(analysis.diagnostics[0].file_id(), FileId::STD);
    }

    #[test]
    fn shadowed_locals_get_their_own_records() {
        let analysis = analyze_user(
            "fn f() -> i32 { let x = 1; let x = true; if x { 1 } else { 0 } }",
        );
        assert!(!analysis.has_fatal());
        let x = records(&analysis, "x");
        let types: Vec<_> = x.iter().map(|r| r.ty.clone()).collect();
        assert_eq!(types, vec![Type::I32, Type::Bool, Type::Bool]);
        // The first `x` is never read.
        assert_eq!(codes(&analysis), vec!["W0001"]);
    }

    #[test]
    fn inner_block_bindings_end_with_their_block() {
        let analysis = analyze_user(
            "fn f() -> i32 { let v = 1; { let v = true; if v { 1 } else { 0 }; } v }",
        );
        assert!(!analysis.has_fatal());
        assert!(codes(&analysis).is_empty(), "{:?}", analysis.diagnostics);
        let v = records(&analysis, "v");
        let types: Vec<_> = v.iter().map(|r| r.ty.clone()).collect();
        assert_eq!(types, vec![Type::I32, Type::Bool, Type::Bool, Type::I32]);
        let starts: Vec<_> = v.iter().map(|r| r.span.start).collect();
        assert_eq!(starts, vec![20, 33, 46, 68]);
    }

    #[test]
    fn records_only_user_symbols() {
        let analysis = analyze_with(
            "/// Absolute value.\nfn abs(x: i32) -> i32 { if x < 0 { -x } else { x } }",
            "fn main() -> i32 { abs(-3) }",
        );
        assert!(analysis.hover.iter().all(|r| r.span.file_id == FileId::USER));
        let abs = records(&analysis, "abs");
        assert_eq!(abs.len(), 1);
        assert_eq!(abs[0].kind, EntryKind::Function);
        assert_eq!(abs[0].ty.to_string(), "fn(i32) -> i32");
        assert_eq!(abs[0].docs.as_deref(), Some("Absolute value."));
    }

    #[test]
    fn struct_records_render_fields() {
        let analysis = analyze_user("struct P { x: i32, y: f64 }");
        let p = records(&analysis, "P");
        assert_eq!(p[0].detail(&analysis.module), "{ x: i32, y: f64 }");
        assert_eq!(records(&analysis, "y")[0].kind, EntryKind::Field);
    }
}

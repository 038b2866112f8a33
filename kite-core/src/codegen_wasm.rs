//! WASM backend.
//!
//! Translates the typed HIR of an [`Analysis`] into a module with the
//! `wasm-encoder` crate. Section order is type, import, function, memory,
//! global, export, code, data; the caller appends the hover metadata
//! section afterwards.
//!
//! Only functions reachable from user functions are emitted. Called
//! externs are imported from `env`. Function indices put imports first,
//! then defined functions, each group in declaration order.
//!
//! Memory map:
//!
//! ```text
//! 0..16        reserved
//! 16..         string literals, `[len: u32 LE][utf-8 bytes]`, 4-aligned
//! heap base..  bump-allocated structs, 8-aligned
//! ```

use std::borrow::Cow;
use std::collections::HashMap;

use thiserror::Error;
use wasm_encoder::{
    BlockType, CodeSection, ConstExpr, DataSection, EntityType, ExportKind, ExportSection,
    Function, FunctionSection, GlobalSection, GlobalType, ImportSection, Instruction, MemArg,
    MemorySection, MemoryType, Module, TypeSection, ValType,
};

use crate::ast::{BinaryOp, UnaryOp};
use crate::builtins::BuiltinKind;
use crate::diagnostic::Diagnostic;
use crate::hir::{
    Callee, ConstValue, FuncId, FunctionBody, HirBlock, HirExpr, HirExprKind, HirFunction,
    HirModule, HirPlace, HirStmt, StructId,
};
use crate::layout::{StructLayout, align_to, layout_module};
use crate::metadata::EntryKind;
use crate::span::{FileId, Span};
use crate::typecheck::{Analysis, HoverRecord};
use crate::types::Type;

/// Where string literals start in linear memory.
pub const DATA_BASE: u32 = 16;
pub const PAGE_SIZE: u32 = 65536;
/// Index of the mutable bump pointer global (`__heap_base`); user globals follow it.
const HEAP_GLOBAL: u32 = 0;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CodegenError {
    #[error("{}", fatal_summary(.0))]
    FatalDiagnostics(Vec<Diagnostic>),
    #[error("cannot lower {construct} at bytes {span}")]
    Unsupported {
        construct: Cow<'static, str>,
        span: Span,
    },
}

fn fatal_summary(diagnostics: &[Diagnostic]) -> String {
    match diagnostics {
        [] => "compilation failed".to_string(),
        [only] => format!("compilation failed: {only}"),
        [first, rest @ ..] => format!(
            "compilation failed: {first} (and {} more error{})",
            rest.len(),
            if rest.len() == 1 { "" } else { "s" }
        ),
    }
}

fn unsupported(construct: impl Into<Cow<'static, str>>, span: Span) -> CodegenError {
    CodegenError::Unsupported {
        construct: construct.into(),
        span,
    }
}

/// A generated module, still open for the metadata section.
#[derive(Debug)]
pub struct GeneratedModule {
    pub module: Module,
    /// One record per emitted user function and user global.
    pub decls: Vec<HoverRecord>,
}

/// Generate the module for an analysis without fatal diagnostics.
#[tracing::instrument(level = "debug", skip_all, fields(memory_pages))]
pub fn generate(analysis: &Analysis, memory_pages: u32) -> Result<GeneratedModule, CodegenError> {
    let fatal: Vec<Diagnostic> = analysis
        .diagnostics
        .iter()
        .filter(|d| d.is_fatal())
        .cloned()
        .collect();
    if !fatal.is_empty() {
        return Err(CodegenError::FatalDiagnostics(fatal));
    }

    let module = &analysis.module;
    let reachable = reachable_functions(module);
    let (imports, defined): (Vec<&HirFunction>, Vec<&HirFunction>) = module
        .functions
        .iter()
        .filter(|f| reachable[f.id.0 as usize])
        .partition(|f| f.is_extern());
    let func_indices: HashMap<FuncId, u32> = imports
        .iter()
        .chain(&defined)
        .enumerate()
        .map(|(index, f)| (f.id, index as u32))
        .collect();
    tracing::debug!(
        imports = imports.len(),
        defined = defined.len(),
        "selected reachable functions"
    );

    let mut cx = Context {
        module,
        func_indices,
        layouts: layout_module(module),
        data: StaticData::default(),
    };
    let mut types = TypeRegistry::new();

    let mut import_section = ImportSection::new();
    for function in &imports {
        let (params, results) = signature_types(function);
        let ty = types.index(params, results);
        import_section.import("env", &function.name.name, EntityType::Function(ty));
    }

    let global_inits: Vec<ConstExpr> = module
        .globals
        .iter()
        .map(|global| match &global.init {
            ConstValue::Int(value) if global.ty == Type::I64 => ConstExpr::i64_const(*value),
            ConstValue::Int(value) => ConstExpr::i32_const(*value as i32),
            ConstValue::F64(value) => ConstExpr::f64_const((*value).into()),
            ConstValue::Bool(value) => ConstExpr::i32_const(i32::from(*value)),
            ConstValue::Str(value) => ConstExpr::i32_const(cx.data.intern(value) as i32),
        })
        .collect();

    let mut function_section = FunctionSection::new();
    let mut code_section = CodeSection::new();
    let mut exports = ExportSection::new();
    for function in &defined {
        let (params, results) = signature_types(function);
        function_section.function(types.index(params, results));
        code_section.function(&lower_function(&mut cx, function)?);
        if function.span.file_id == FileId::USER {
            if function.name.name == "memory" {
                return Err(unsupported(
                    "a function named `memory`, which is reserved for the memory export",
                    function.name.span,
                ));
            }
            exports.export(&function.name.name, ExportKind::Func, cx.func_indices[&function.id]);
        }
    }
    exports.export("memory", ExportKind::Memory, 0);

    let heap_base = align_to(cx.data.end(), 8);
    let needed_pages = heap_base.div_ceil(PAGE_SIZE).max(1);
    let mut memories = MemorySection::new();
    memories.memory(MemoryType {
        minimum: u64::from(memory_pages.max(needed_pages)),
        maximum: None,
        memory64: false,
        shared: false,
        page_size_log2: None,
    });

    let mut globals = GlobalSection::new();
    globals.global(
        GlobalType {
            val_type: ValType::I32,
            mutable: true,
            shared: false,
        },
        &ConstExpr::i32_const(heap_base as i32),
    );
    for (global, init) in module.globals.iter().zip(&global_inits) {
        globals.global(
            GlobalType {
                val_type: global.ty.val_type().unwrap_or(ValType::I32),
                mutable: global.mutable,
                shared: false,
            },
            init,
        );
    }

    let mut wasm = Module::new();
    wasm.section(&types.section);
    if !imports.is_empty() {
        wasm.section(&import_section);
    }
    wasm.section(&function_section);
    wasm.section(&memories);
    wasm.section(&globals);
    wasm.section(&exports);
    wasm.section(&code_section);
    if !cx.data.bytes.is_empty() {
        let mut data = DataSection::new();
        data.active(
            0,
            &ConstExpr::i32_const(DATA_BASE as i32),
            cx.data.bytes.iter().copied(),
        );
        wasm.section(&data);
    }

    let decls = declaration_records(module, &defined);
    tracing::debug!(
        static_bytes = cx.data.bytes.len(),
        heap_base,
        "module generated"
    );
    Ok(GeneratedModule {
        module: wasm,
        decls,
    })
}

/// Functions reachable from user function bodies, indexed by `FuncId`.
fn reachable_functions(module: &HirModule) -> Vec<bool> {
    let mut seen = vec![false; module.functions.len()];
    let mut work: Vec<FuncId> = module
        .functions
        .iter()
        .filter(|f| f.span.file_id == FileId::USER && !f.is_extern())
        .map(|f| f.id)
        .collect();
    for id in &work {
        seen[id.0 as usize] = true;
    }
    while let Some(id) = work.pop() {
        if let FunctionBody::Expr(body) = &module.function(id).body {
            body.walk(&mut |expr| {
                if let HirExprKind::Call {
                    callee: Callee::Function(callee),
                    ..
                } = &expr.kind
                    && !seen[callee.0 as usize]
                {
                    seen[callee.0 as usize] = true;
                    work.push(*callee);
                }
            });
        }
    }
    seen
}

fn declaration_records(module: &HirModule, defined: &[&HirFunction]) -> Vec<HoverRecord> {
    let functions = defined
        .iter()
        .filter(|f| f.span.file_id == FileId::USER)
        .map(|f| HoverRecord {
            span: f.span,
            kind: EntryKind::Function,
            name: f.name.name.clone(),
            ty: f.signature(),
            docs: f.docs.clone(),
        });
    let globals = module
        .globals
        .iter()
        .filter(|g| g.span.file_id == FileId::USER)
        .map(|g| HoverRecord {
            span: g.name.span,
            kind: if g.mutable {
                EntryKind::GlobalMut
            } else {
                EntryKind::Global
            },
            name: g.name.name.clone(),
            ty: g.ty.clone(),
            docs: g.docs.clone(),
        });
    functions.chain(globals).collect()
}

/// Wasm signature. Parameters of unknown type only occur in functions
/// lowered as stubs and get an `i32` placeholder.
fn signature_types(function: &HirFunction) -> (Vec<ValType>, Vec<ValType>) {
    let params = function
        .params()
        .iter()
        .map(|p| p.ty.val_type().unwrap_or(ValType::I32))
        .collect();
    let results = match &function.result {
        Type::Error => vec![ValType::I32],
        ty => ty.val_type().into_iter().collect(),
    };
    (params, results)
}

struct TypeRegistry {
    section: TypeSection,
    seen: HashMap<(Vec<ValType>, Vec<ValType>), u32>,
}

impl TypeRegistry {
    fn new() -> Self {
        TypeRegistry {
            section: TypeSection::new(),
            seen: HashMap::new(),
        }
    }

    fn index(&mut self, params: Vec<ValType>, results: Vec<ValType>) -> u32 {
        let key = (params, results);
        if let Some(&index) = self.seen.get(&key) {
            return index;
        }
        let index = self.section.len();
        self.section
            .ty()
            .function(key.0.iter().copied(), key.1.iter().copied());
        self.seen.insert(key, index);
        index
    }
}

/// String literals, deduplicated.
#[derive(Debug, Default)]
struct StaticData {
    bytes: Vec<u8>,
    addresses: HashMap<String, u32>,
}

impl StaticData {
    fn intern(&mut self, value: &str) -> u32 {
        if let Some(&address) = self.addresses.get(value) {
            return address;
        }
        let address = self.end();
        self.bytes
            .extend_from_slice(&(value.len() as u32).to_le_bytes());
        self.bytes.extend_from_slice(value.as_bytes());
        self.bytes.resize(align_to(self.bytes.len() as u32, 4) as usize, 0);
        self.addresses.insert(value.to_string(), address);
        address
    }

    fn end(&self) -> u32 {
        DATA_BASE + self.bytes.len() as u32
    }
}

struct Context<'a> {
    module: &'a HirModule,
    func_indices: HashMap<FuncId, u32>,
    layouts: Vec<StructLayout>,
    data: StaticData,
}

fn mem_arg(offset: u32, ty: &Type) -> MemArg {
    let align = match ty {
        Type::I64 | Type::F64 => 3,
        _ => 2,
    };
    MemArg {
        offset: u64::from(offset),
        align,
        memory_index: 0,
    }
}

fn load(ty: &Type, offset: u32) -> Instruction<'static> {
    let arg = mem_arg(offset, ty);
    match ty {
        Type::I64 => Instruction::I64Load(arg),
        Type::F64 => Instruction::F64Load(arg),
        _ => Instruction::I32Load(arg),
    }
}

fn store(ty: &Type, offset: u32) -> Instruction<'static> {
    let arg = mem_arg(offset, ty);
    match ty {
        Type::I64 => Instruction::I64Store(arg),
        Type::F64 => Instruction::F64Store(arg),
        _ => Instruction::I32Store(arg),
    }
}

fn block_type(ty: &Type) -> BlockType {
    match ty.val_type() {
        Some(val) => BlockType::Result(val),
        None => BlockType::Empty,
    }
}

fn lower_function(cx: &mut Context<'_>, function: &HirFunction) -> Result<Function, CodegenError> {
    let body = match &function.body {
        FunctionBody::Expr(body) => body,
        FunctionBody::Stub => {
            let mut func = Function::new(Vec::new());
            func.instruction(&Instruction::Unreachable);
            func.instruction(&Instruction::End);
            return Ok(func);
        }
        FunctionBody::Extern => {
            return Err(unsupported("a body for an extern function", function.span));
        }
    };

    let mut lowering = FnLowering::new(cx, function);
    lowering.lower_expr(body)?;
    lowering.emit(Instruction::End);

    let mut func = Function::new(lowering.extra.iter().map(|ty| (1, *ty)));
    for instruction in &lowering.code {
        func.instruction(instruction);
    }
    Ok(func)
}

struct FnLowering<'cx, 'a> {
    cx: &'cx mut Context<'a>,
    param_count: u32,
    /// Wasm local of each HIR local, `None` for locals without a value.
    locals: Vec<Option<u32>>,
    /// Declared (non-parameter) wasm locals.
    extra: Vec<ValType>,
    code: Vec<Instruction<'static>>,
    /// Number of open wasm blocks.
    depth: u32,
    /// Break and continue label depths of the enclosing loops.
    loops: Vec<(u32, u32)>,
}

impl<'cx, 'a> FnLowering<'cx, 'a> {
    fn new(cx: &'cx mut Context<'a>, function: &HirFunction) -> Self {
        let mut lowering = FnLowering {
            cx,
            param_count: function.param_count,
            locals: Vec::with_capacity(function.locals.len()),
            extra: Vec::new(),
            code: Vec::new(),
            depth: 0,
            loops: Vec::new(),
        };
        for (index, local) in function.locals.iter().enumerate() {
            let slot = if (index as u32) < function.param_count {
                Some(index as u32)
            } else {
                local.ty.val_type().map(|ty| lowering.temp(ty))
            };
            lowering.locals.push(slot);
        }
        lowering
    }

    fn temp(&mut self, ty: ValType) -> u32 {
        self.extra.push(ty);
        self.param_count + self.extra.len() as u32 - 1
    }

    fn emit(&mut self, instruction: Instruction<'static>) {
        self.code.push(instruction);
    }

    fn open(&mut self, instruction: Instruction<'static>) -> u32 {
        self.emit(instruction);
        self.depth += 1;
        self.depth
    }

    fn close(&mut self) {
        self.emit(Instruction::End);
        self.depth -= 1;
    }

    fn field_layout(&self, struct_id: StructId, index: u32) -> (Type, u32) {
        let ty = self.cx.module.struct_def(struct_id).fields[index as usize]
            .ty
            .clone();
        let offset = self.cx.layouts[struct_id.0 as usize].fields[index as usize].offset;
        (ty, offset)
    }

    fn lower_expr(&mut self, expr: &HirExpr) -> Result<(), CodegenError> {
        if expr.ty.is_error() {
            return Err(unsupported("an expression that failed to type-check", expr.span));
        }
        match &expr.kind {
            HirExprKind::Int(value) => match expr.ty {
                Type::I64 => self.emit(Instruction::I64Const(*value)),
                _ => self.emit(Instruction::I32Const(*value as i32)),
            },
            HirExprKind::F64(value) => self.emit(Instruction::F64Const((*value).into())),
            HirExprKind::Bool(value) => self.emit(Instruction::I32Const(i32::from(*value))),
            HirExprKind::Str(value) => {
                let address = self.cx.data.intern(value);
                self.emit(Instruction::I32Const(address as i32));
            }
            HirExprKind::Unit => {}
            HirExprKind::Local(local) => match self.locals[local.0 as usize] {
                Some(index) => self.emit(Instruction::LocalGet(index)),
                // Only a `Never`-typed binding has no slot; reading it is dead code.
                None if expr.ty.is_never() => self.emit(Instruction::Unreachable),
                None => {}
            },
            HirExprKind::Global(global) => self.emit(Instruction::GlobalGet(global.0 + 1)),
            HirExprKind::Call { callee, args } => {
                for arg in args {
                    self.lower_expr(arg)?;
                }
                match callee {
                    Callee::Function(id) => {
                        let Some(&index) = self.cx.func_indices.get(id) else {
                            return Err(unsupported("a call to a function that was not emitted", expr.span));
                        };
                        self.emit(Instruction::Call(index));
                    }
                    Callee::Builtin(kind) => self.lower_builtin(*kind),
                }
            }
            HirExprKind::Field {
                base,
                struct_id,
                index,
            } => {
                self.lower_expr(base)?;
                let (ty, offset) = self.field_layout(*struct_id, *index);
                self.emit(load(&ty, offset));
            }
            HirExprKind::StructLit { struct_id, fields } => {
                self.lower_struct_lit(*struct_id, fields)?;
            }
            HirExprKind::Unary { op, operand } => self.lower_unary(*op, operand, expr)?,
            HirExprKind::Binary { op, lhs, rhs } => self.lower_binary(*op, lhs, rhs, expr)?,
            HirExprKind::Block(block) => self.lower_block(block)?,
            HirExprKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                self.lower_expr(cond)?;
                self.open(Instruction::If(block_type(&expr.ty)));
                self.lower_expr(then_branch)?;
                if let Some(else_branch) = else_branch {
                    self.emit(Instruction::Else);
                    self.lower_expr(else_branch)?;
                }
                self.close();
                if expr.ty.is_never() {
                    self.emit(Instruction::Unreachable);
                }
            }
            HirExprKind::While { cond, body } => {
                let break_level = self.open(Instruction::Block(BlockType::Empty));
                let continue_level = self.open(Instruction::Loop(BlockType::Empty));
                self.lower_expr(cond)?;
                self.emit(Instruction::I32Eqz);
                self.emit(Instruction::BrIf(self.depth - break_level));
                self.loops.push((break_level, continue_level));
                self.lower_expr(body)?;
                self.loops.pop();
                self.emit(Instruction::Br(self.depth - continue_level));
                self.close();
                self.close();
            }
            HirExprKind::Return(value) => {
                if let Some(value) = value {
                    self.lower_expr(value)?;
                }
                self.emit(Instruction::Return);
            }
            HirExprKind::Break | HirExprKind::Continue => {
                let Some(&(break_level, continue_level)) = self.loops.last() else {
                    return Err(unsupported("a loop exit outside of a loop", expr.span));
                };
                let target = if matches!(expr.kind, HirExprKind::Break) {
                    break_level
                } else {
                    continue_level
                };
                self.emit(Instruction::Br(self.depth - target));
            }
            HirExprKind::Error => {
                return Err(unsupported("an expression that failed to parse", expr.span));
            }
        }
        Ok(())
    }

    fn lower_block(&mut self, block: &HirBlock) -> Result<(), CodegenError> {
        for stmt in &block.stmts {
            match stmt {
                HirStmt::Let { local, init } => {
                    self.lower_expr(init)?;
                    if let Some(index) = self.locals[local.0 as usize] {
                        self.emit(Instruction::LocalSet(index));
                    }
                }
                HirStmt::Assign { place, value } => match place {
                    HirPlace::Local(local) => {
                        self.lower_expr(value)?;
                        if let Some(index) = self.locals[local.0 as usize] {
                            self.emit(Instruction::LocalSet(index));
                        }
                    }
                    HirPlace::Global(global) => {
                        self.lower_expr(value)?;
                        self.emit(Instruction::GlobalSet(global.0 + 1));
                    }
                    HirPlace::Field {
                        base,
                        struct_id,
                        index,
                    } => {
                        self.lower_expr(base)?;
                        self.lower_expr(value)?;
                        let (ty, offset) = self.field_layout(*struct_id, *index);
                        self.emit(store(&ty, offset));
                    }
                },
                HirStmt::Expr(expr) => {
                    self.lower_expr(expr)?;
                    if expr.ty.val_type().is_some() {
                        self.emit(Instruction::Drop);
                    }
                }
            }
        }
        if let Some(tail) = &block.tail {
            self.lower_expr(tail)?;
        }
        Ok(())
    }

    fn lower_struct_lit(&mut self, struct_id: StructId, fields: &[(u32, HirExpr)]) -> Result<(), CodegenError> {
        let size = self.cx.layouts[struct_id.0 as usize].size;
        let pointer = self.temp(ValType::I32);
        self.emit(Instruction::GlobalGet(HEAP_GLOBAL));
        self.emit(Instruction::LocalTee(pointer));
        self.emit(Instruction::I32Const(align_to(size, 8) as i32));
        self.emit(Instruction::I32Add);
        self.emit(Instruction::GlobalSet(HEAP_GLOBAL));
        for (index, value) in fields {
            self.emit(Instruction::LocalGet(pointer));
            self.lower_expr(value)?;
            let (ty, offset) = self.field_layout(struct_id, *index);
            self.emit(store(&ty, offset));
        }
        self.emit(Instruction::LocalGet(pointer));
        Ok(())
    }

    fn lower_builtin(&mut self, kind: BuiltinKind) {
        let instruction = match kind {
            BuiltinKind::I64FromI32 => Instruction::I64ExtendI32S,
            BuiltinKind::I32FromI64 => Instruction::I32WrapI64,
            BuiltinKind::F64FromI32 => Instruction::F64ConvertI32S,
            BuiltinKind::I32FromF64 => Instruction::I32TruncF64S,
            BuiltinKind::Sqrt => Instruction::F64Sqrt,
            BuiltinKind::StrLen => load(&Type::I32, 0),
            BuiltinKind::MemorySize => Instruction::MemorySize(0),
            BuiltinKind::Trap => Instruction::Unreachable,
        };
        self.emit(instruction);
    }

    fn lower_unary(&mut self, op: UnaryOp, operand: &HirExpr, expr: &HirExpr) -> Result<(), CodegenError> {
        match (op, &expr.ty) {
            (UnaryOp::Not, _) => {
                self.lower_expr(operand)?;
                self.emit(Instruction::I32Eqz);
            }
            (UnaryOp::Neg, Type::F64) => {
                self.lower_expr(operand)?;
                self.emit(Instruction::F64Neg);
            }
            (UnaryOp::Neg, Type::I64) => {
                self.emit(Instruction::I64Const(0));
                self.lower_expr(operand)?;
                self.emit(Instruction::I64Sub);
            }
            (UnaryOp::Neg, Type::Never) => self.lower_expr(operand)?,
            (UnaryOp::Neg, _) => {
                self.emit(Instruction::I32Const(0));
                self.lower_expr(operand)?;
                self.emit(Instruction::I32Sub);
            }
        }
        Ok(())
    }

    fn lower_binary(&mut self, op: BinaryOp, lhs: &HirExpr, rhs: &HirExpr, expr: &HirExpr) -> Result<(), CodegenError> {
        match op {
            BinaryOp::And => {
                self.lower_expr(lhs)?;
                self.open(Instruction::If(BlockType::Result(ValType::I32)));
                self.lower_expr(rhs)?;
                self.emit(Instruction::Else);
                self.emit(Instruction::I32Const(0));
                self.close();
                return Ok(());
            }
            BinaryOp::Or => {
                self.lower_expr(lhs)?;
                self.open(Instruction::If(BlockType::Result(ValType::I32)));
                self.emit(Instruction::I32Const(1));
                self.emit(Instruction::Else);
                self.lower_expr(rhs)?;
                self.close();
                return Ok(());
            }
            _ => {}
        }

        self.lower_expr(lhs)?;
        self.lower_expr(rhs)?;
        let operand = if lhs.ty.is_never() { &rhs.ty } else { &lhs.ty };
        let instruction = match operand {
            Type::I32 | Type::Bool => i32_binary(op),
            Type::I64 => i64_binary(op),
            Type::F64 => f64_binary(op),
            // Both operands diverge.
            Type::Never => Some(Instruction::Unreachable),
            _ => None,
        };
        match instruction {
            Some(instruction) => {
                self.emit(instruction);
                Ok(())
            }
            None => Err(unsupported(
                format!("`{}` on `{operand}`", op.symbol()),
                expr.span,
            )),
        }
    }
}

fn i32_binary(op: BinaryOp) -> Option<Instruction<'static>> {
    Some(match op {
        BinaryOp::Add => Instruction::I32Add,
        BinaryOp::Sub => Instruction::I32Sub,
        BinaryOp::Mul => Instruction::I32Mul,
        BinaryOp::Div => Instruction::I32DivS,
        BinaryOp::Rem => Instruction::I32RemS,
        BinaryOp::Lt => Instruction::I32LtS,
        BinaryOp::Le => Instruction::I32LeS,
        BinaryOp::Gt => Instruction::I32GtS,
        BinaryOp::Ge => Instruction::I32GeS,
        BinaryOp::Eq => Instruction::I32Eq,
        BinaryOp::Ne => Instruction::I32Ne,
        BinaryOp::And | BinaryOp::Or => return None,
    })
}

fn i64_binary(op: BinaryOp) -> Option<Instruction<'static>> {
    Some(match op {
        BinaryOp::Add => Instruction::I64Add,
        BinaryOp::Sub => Instruction::I64Sub,
        BinaryOp::Mul => Instruction::I64Mul,
        BinaryOp::Div => Instruction::I64DivS,
        BinaryOp::Rem => Instruction::I64RemS,
        BinaryOp::Lt => Instruction::I64LtS,
        BinaryOp::Le => Instruction::I64LeS,
        BinaryOp::Gt => Instruction::I64GtS,
        BinaryOp::Ge => Instruction::I64GeS,
        BinaryOp::Eq => Instruction::I64Eq,
        BinaryOp::Ne => Instruction::I64Ne,
        BinaryOp::And | BinaryOp::Or => return None,
    })
}

fn f64_binary(op: BinaryOp) -> Option<Instruction<'static>> {
    Some(match op {
        BinaryOp::Add => Instruction::F64Add,
        BinaryOp::Sub => Instruction::F64Sub,
        BinaryOp::Mul => Instruction::F64Mul,
        BinaryOp::Div => Instruction::F64Div,
        BinaryOp::Lt => Instruction::F64Lt,
        BinaryOp::Le => Instruction::F64Le,
        BinaryOp::Gt => Instruction::F64Gt,
        BinaryOp::Ge => Instruction::F64Ge,
        BinaryOp::Eq => Instruction::F64Eq,
        BinaryOp::Ne => Instruction::F64Ne,
        BinaryOp::Rem | BinaryOp::And | BinaryOp::Or => return None,
    })
}

//! Scope tree and symbol table.
//!
//! Scopes live in an arena owned by [`ScopeTree`]. Each scope owns the
//! symbols it declares and the ids of its child scopes. Lookup walks from
//! the innermost scope outward; inside one scope the newest declaration
//! of a name wins, so redeclaring a name shadows the older binding.
//!
//! The type checker declares locals as it walks a function body, which is
//! what makes a local visible only from its declaration to the end of its
//! block: later declarations do not exist yet while earlier code is
//! checked.

use crate::builtins::BuiltinKind;
use crate::span::{FileId, Span};
use crate::types::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(u32);

impl ScopeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A symbol is addressed by its owning scope and its position there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SymbolId {
    pub scope: ScopeId,
    pub index: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Builtins,
    Module(FileId),
    Function,
    Block,
    /// Holds the fields of one struct.
    Struct,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    Function,
    Extern,
    Builtin,
    Struct,
    Field,
    Param,
    Local,
    Global,
}

impl SymbolKind {
    pub fn is_value(self) -> bool {
        matches!(
            self,
            SymbolKind::Param | SymbolKind::Local | SymbolKind::Global
        )
    }

    pub fn is_callable(self) -> bool {
        matches!(
            self,
            SymbolKind::Function | SymbolKind::Extern | SymbolKind::Builtin
        )
    }
}

/// What a symbol refers to in the typed tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolTarget {
    Function(crate::hir::FuncId),
    Builtin(BuiltinKind),
    Struct(crate::hir::StructId),
    /// Field index within its struct.
    Field(crate::hir::StructId, u32),
    Global(crate::hir::GlobalId),
    Local(crate::hir::LocalId),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    pub ty: Type,
    /// Span of the declaring name.
    pub span: Span,
    pub mutable: bool,
    pub docs: Option<String>,
    pub target: SymbolTarget,
    /// Fields of a struct symbol.
    pub members: Option<ScopeId>,
    pub used: bool,
}

impl Symbol {
    pub fn new(name: impl Into<String>, kind: SymbolKind, ty: Type, span: Span, target: SymbolTarget) -> Self {
        Symbol {
            name: name.into(),
            kind,
            ty,
            span,
            mutable: false,
            docs: None,
            target,
            members: None,
            used: false,
        }
    }

    pub fn with_mutable(mut self, mutable: bool) -> Self {
        self.mutable = mutable;
        self
    }

    pub fn with_docs(mut self, docs: Option<String>) -> Self {
        self.docs = docs;
        self
    }
}

#[derive(Debug, Clone)]
pub struct Scope {
    pub kind: ScopeKind,
    pub parent: Option<ScopeId>,
    pub children: Vec<ScopeId>,
    pub symbols: Vec<Symbol>,
}

#[derive(Debug, Clone)]
pub struct ScopeTree {
    scopes: Vec<Scope>,
}

impl Default for ScopeTree {
    fn default() -> Self {
        ScopeTree::new()
    }
}

impl ScopeTree {
    /// A tree holding only the root (builtins) scope.
    pub fn new() -> Self {
        ScopeTree {
            scopes: vec![Scope {
                kind: ScopeKind::Builtins,
                parent: None,
                children: Vec::new(),
                symbols: Vec::new(),
            }],
        }
    }

    pub fn root(&self) -> ScopeId {
        ScopeId(0)
    }

    pub fn push_scope(&mut self, parent: ScopeId, kind: ScopeKind) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(Scope {
            kind,
            parent: Some(parent),
            children: Vec::new(),
            symbols: Vec::new(),
        });
        self.scopes[parent.index()].children.push(id);
        id
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.index()]
    }

    pub fn declare(&mut self, scope: ScopeId, symbol: Symbol) -> SymbolId {
        let symbols = &mut self.scopes[scope.index()].symbols;
        symbols.push(symbol);
        SymbolId {
            scope,
            index: symbols.len() as u32 - 1,
        }
    }

    pub fn get(&self, id: SymbolId) -> &Symbol {
        &self.scopes[id.scope.index()].symbols[id.index as usize]
    }

    pub fn get_mut(&mut self, id: SymbolId) -> &mut Symbol {
        &mut self.scopes[id.scope.index()].symbols[id.index as usize]
    }

    /// Newest symbol named `name` in `scope` itself.
    pub fn lookup_local(&self, scope: ScopeId, name: &str) -> Option<SymbolId> {
        self.scope(scope)
            .symbols
            .iter()
            .rposition(|s| s.name == name)
            .map(|index| SymbolId {
                scope,
                index: index as u32,
            })
    }

    /// Innermost visible symbol named `name`.
    pub fn lookup(&self, scope: ScopeId, name: &str) -> Option<SymbolId> {
        let mut current = Some(scope);
        while let Some(id) = current {
            if let Some(found) = self.lookup_local(id, name) {
                return Some(found);
            }
            current = self.scope(id).parent;
        }
        None
    }

    /// Like [`ScopeTree::lookup`] but only considers symbols accepted by
    /// `filter`, so a local variable does not hide a type of the same name.
    pub fn lookup_where(
        &self,
        scope: ScopeId,
        name: &str,
        filter: impl Fn(&Symbol) -> bool,
    ) -> Option<SymbolId> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let symbols = &self.scope(id).symbols;
            if let Some(index) = symbols.iter().rposition(|s| s.name == name && filter(s)) {
                return Some(SymbolId {
                    scope: id,
                    index: index as u32,
                });
            }
            current = self.scope(id).parent;
        }
        None
    }

    pub fn mark_used(&mut self, id: SymbolId) {
        self.get_mut(id).used = true;
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    /// All symbols with their ids, scope by scope.
    pub fn symbols(&self) -> impl Iterator<Item = (SymbolId, &Symbol)> {
        self.scopes.iter().enumerate().flat_map(|(scope, s)| {
            s.symbols.iter().enumerate().map(move |(index, symbol)| {
                (
                    SymbolId {
                        scope: ScopeId(scope as u32),
                        index: index as u32,
                    },
                    symbol,
                )
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hir::LocalId;

    fn local(name: &str, ty: Type, at: u32) -> Symbol {
        Symbol::new(
            name,
            SymbolKind::Local,
            ty,
            Span::new(FileId::USER, at, at + 1),
            SymbolTarget::Local(LocalId(at)),
        )
    }

    #[test]
    fn inner_scope_shadows_outer() {
        let mut tree = ScopeTree::new();
        let outer = tree.push_scope(tree.root(), ScopeKind::Function);
        let inner = tree.push_scope(outer, ScopeKind::Block);
        let outer_x = tree.declare(outer, local("x", Type::I32, 1));
        let inner_x = tree.declare(inner, local("x", Type::Bool, 5));

        assert_eq!(tree.lookup(inner, "x"), Some(inner_x));
        assert_eq!(tree.lookup(outer, "x"), Some(outer_x));
        assert_eq!(tree.get(inner_x).ty, Type::Bool);
        assert_eq!(tree.scope(outer).children, vec![inner]);
    }

    #[test]
    fn newest_declaration_in_a_scope_wins() {
        let mut tree = ScopeTree::new();
        let scope = tree.push_scope(tree.root(), ScopeKind::Block);
        tree.declare(scope, local("x", Type::I32, 1));
        let second = tree.declare(scope, local("x", Type::F64, 3));
        assert_eq!(tree.lookup(scope, "x"), Some(second));
    }

    #[test]
    fn filtered_lookup_skips_other_kinds() {
        let mut tree = ScopeTree::new();
        let module = tree.push_scope(tree.root(), ScopeKind::Module(FileId::USER));
        let block = tree.push_scope(module, ScopeKind::Block);
        let ty = tree.declare(
            module,
            Symbol::new(
                "P",
                SymbolKind::Struct,
                Type::Struct {
                    id: crate::hir::StructId(0),
                    name: "P".into(),
                },
                Span::new(FileId::USER, 0, 1),
                SymbolTarget::Struct(crate::hir::StructId(0)),
            ),
        );
        tree.declare(block, local("P", Type::I32, 9));
        let found = tree.lookup_where(block, "P", |s| s.kind == SymbolKind::Struct);
        assert_eq!(found, Some(ty));
        assert!(tree.lookup(block, "missing").is_none());
    }
}

//! Compiler orchestration: source text in, module bytes out, and the
//! hover query over those bytes.

use crate::codegen_wasm::generate;
use crate::diagnostic::Diagnostic;
use crate::error::CoreError;
use crate::hover;
use crate::metadata::{MetadataEntry, append_section, decode_module};
use crate::parser::parse;
use crate::span::{FileId, LineIndex, Position};
use crate::typecheck::{Analysis, HoverRecord, analyze};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileOptions {
    /// Append the hover metadata section.
    pub emit_metadata: bool,
    /// Minimum initial memory size in 64 KiB pages.
    pub memory_pages: u32,
}

impl Default for CompileOptions {
    fn default() -> Self {
        CompileOptions {
            emit_metadata: true,
            memory_pages: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompilationArtifact {
    pub wasm: Vec<u8>,
    /// Warnings and recovered errors; fatal ones fail the compilation.
    pub diagnostics: Vec<Diagnostic>,
}

/// Compile `contents` against `std_source` into a standalone module.
pub fn compile_wasm(contents: &str, std_source: &str) -> Result<Vec<u8>, CoreError> {
    compile(contents, std_source, &CompileOptions::default()).map(|artifact| artifact.wasm)
}

#[tracing::instrument(level = "debug", skip_all, fields(source_len = contents.len()))]
pub fn compile(
    contents: &str,
    std_source: &str,
    options: &CompileOptions,
) -> Result<CompilationArtifact, CoreError> {
    let std = parse(FileId::STD, std_source);
    let user = parse(FileId::USER, contents);
    let mut analysis = analyze(&std.program, &user.program);

    // The std library must be clean; user syntax errors only degrade.
    let parse_diagnostics = std
        .diagnostics
        .into_iter()
        .map(Diagnostic::into_fatal)
        .chain(user.diagnostics);
    analysis.diagnostics.splice(0..0, parse_diagnostics);

    let generated = generate(&analysis, options.memory_pages)?;
    let mut module = generated.module;
    if options.emit_metadata {
        let entries = metadata_entries(&analysis, &generated.decls, contents);
        tracing::debug!(entries = entries.len(), "writing hover metadata");
        append_section(&mut module, entries);
    }

    let wasm = module.finish();
    tracing::debug!(
        bytes = wasm.len(),
        diagnostics = analysis.diagnostics.len(),
        "compiled"
    );
    Ok(CompilationArtifact {
        wasm,
        diagnostics: analysis.diagnostics,
    })
}

fn metadata_entries(analysis: &Analysis, decls: &[HoverRecord], contents: &str) -> Vec<MetadataEntry> {
    let index = LineIndex::new(contents);
    analysis
        .hover
        .iter()
        .chain(decls)
        .map(|record| MetadataEntry {
            range: index.range(record.span),
            kind: record.kind,
            name: record.name.clone(),
            detail: record.detail(&analysis.module),
            docs: record.docs.clone().unwrap_or_default(),
        })
        .collect()
}

/// Hover text for a 0-based line and UTF-16 character, read from the
/// metadata embedded in `bytes`. `None` when nothing is there or the
/// metadata cannot be read.
pub fn on_hover(bytes: &[u8], line: u32, character: u32) -> Option<String> {
    let entries = match decode_module(bytes) {
        Ok(entries) => entries,
        Err(err) => {
            tracing::debug!(%err, "no usable hover metadata");
            return None;
        }
    };
    hover::resolve(&entries, Position::new(line, character)).map(hover::render)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{EntryKind, HOVER_SECTION};
    use crate::parser::MAX_NESTING;
    use crate::span::Span;
    use crate::stdlib::{default_stdlib_root, load_stdlib_source};
    use wasmparser::{Parser, Payload, Validator};

    fn std_source() -> String {
        load_stdlib_source(default_stdlib_root()).expect("bundled std should load")
    }

    const PROGRAM: &str = "/// Entry point.
fn main() -> i32 {
    let x = -5;
    let y = abs(x);
    y * 2
}
";

    fn custom_sections(bytes: &[u8]) -> Vec<String> {
        Parser::new(0)
            .parse_all(bytes)
            .filter_map(|payload| match payload.expect("payload") {
                Payload::CustomSection(reader) => Some(reader.name().to_string()),
                _ => None,
            })
            .collect()
    }

    fn run_main(bytes: &[u8]) -> i32 {
        let engine = wasmi::Engine::default();
        let module = wasmi::Module::new(&engine, bytes).expect("module");
        let mut linker = wasmi::Linker::new(&engine);
        linker
            .func_wrap("env", "print_i32", |_: i32| {})
            .expect("link print_i32");
        let mut store = wasmi::Store::new(&engine, ());
        let instance = linker
            .instantiate_and_start(&mut store, &module)
            .expect("instantiate");
        let main = instance
            .get_typed_func::<(), i32>(&store, "main")
            .expect("typed func");
        main.call(&mut store, ()).expect("execute main")
    }

    #[test]
    fn builds_a_valid_module_with_metadata() {
        let wasm = compile_wasm(PROGRAM, &std_source()).expect("compile should succeed");
        assert_eq!(&wasm[..8], b"\0asm\x01\0\0\0");
        Validator::new().validate_all(&wasm).expect("valid module");
        assert_eq!(custom_sections(&wasm), vec![HOVER_SECTION.to_string()]);
        assert_eq!(run_main(&wasm), 10);
    }

    #[test]
    fn output_is_deterministic() {
        let std = std_source();
        let first = compile_wasm(PROGRAM, &std).expect("compile");
        let second = compile_wasm(PROGRAM, &std).expect("compile");
        assert_eq!(first, second);
    }

    #[test]
    fn metadata_can_be_left_out() {
        let options = CompileOptions {
            emit_metadata: false,
            memory_pages: 3,
        };
        let artifact = compile(PROGRAM, &std_source(), &options).expect("compile");
        assert!(custom_sections(&artifact.wasm).is_empty());
        assert_eq!(on_hover(&artifact.wasm, 2, 8), None);
        assert_eq!(run_main(&artifact.wasm), 10);
    }

    #[test]
    fn hovers_locals_references_and_functions() {
        let wasm = compile_wasm(PROGRAM, &std_source()).expect("compile");
        assert_eq!(on_hover(&wasm, 2, 8).as_deref(), Some("let x: i32"));
        assert_eq!(
            on_hover(&wasm, 3, 13).as_deref(),
            Some("fn abs: fn(i32) -> i32\n\nAbsolute value.")
        );
        assert_eq!(on_hover(&wasm, 3, 16).as_deref(), Some("let x: i32"));
        assert_eq!(
            on_hover(&wasm, 1, 0).as_deref(),
            Some("fn main: fn() -> i32\n\nEntry point.")
        );
    }

    #[test]
    fn nothing_outside_the_source() {
        let wasm = compile_wasm(PROGRAM, &std_source()).expect("compile");
        assert_eq!(on_hover(&wasm, 0, 3), None);
        assert_eq!(on_hover(&wasm, 6, 0), None);
        assert_eq!(on_hover(&wasm, 99, 99), None);
    }

    #[test]
    fn parameters_win_over_their_function() {
        let source = "fn double(n: i32) -> i32 { n + n }\nfn main() -> i32 { double(4) }";
        let wasm = compile_wasm(source, &std_source()).expect("compile");
        assert_eq!(on_hover(&wasm, 0, 10).as_deref(), Some("param n: i32"));
        assert_eq!(on_hover(&wasm, 0, 27).as_deref(), Some("param n: i32"));
        assert_eq!(
            on_hover(&wasm, 0, 20).as_deref(),
            Some("fn double: fn(i32) -> i32")
        );
    }

    #[test]
    fn shadowed_bindings_hover_differently() {
        let source = "fn main() -> i32 {\n    let v = 1;\n    let v = v == 1;\n    if v { 1 } else { 0 }\n}";
        let wasm = compile_wasm(source, &std_source()).expect("compile");
        assert_eq!(on_hover(&wasm, 1, 8).as_deref(), Some("let v: i32"));
        assert_eq!(on_hover(&wasm, 2, 8).as_deref(), Some("let v: bool"));
        assert_eq!(on_hover(&wasm, 2, 12).as_deref(), Some("let v: i32"));
        assert_eq!(on_hover(&wasm, 3, 7).as_deref(), Some("let v: bool"));
    }

    #[test]
    fn inner_block_bindings_do_not_leak() {
        let source = "fn main() -> i32 {\n    let v = 1;\n    {\n        let v = true;\n        if v { 1 } else { 0 };\n    }\n    v\n}";
        let wasm = compile_wasm(source, &std_source()).expect("compile");
        assert_eq!(on_hover(&wasm, 1, 8).as_deref(), Some("let v: i32"));
        assert_eq!(on_hover(&wasm, 3, 12).as_deref(), Some("let v: bool"));
        assert_eq!(on_hover(&wasm, 4, 11).as_deref(), Some("let v: bool"));
        assert_eq!(on_hover(&wasm, 6, 4).as_deref(), Some("let v: i32"));
        assert_eq!(run_main(&wasm), 1);
    }

    #[test]
    fn hovers_structs_fields_and_globals() {
        let source = "/// A point.\nstruct Point { x: i32, y: i32 }\nlet mut ORIGIN_X: i32 = 0;\nfn main() -> i32 { let p = Point { x: ORIGIN_X, y: 2 }; p.y }";
        let wasm = compile_wasm(source, &std_source()).expect("compile");
        assert_eq!(
            on_hover(&wasm, 1, 2).as_deref(),
            Some("struct Point: { x: i32, y: i32 }\n\nA point.")
        );
        assert_eq!(on_hover(&wasm, 1, 15).as_deref(), Some("field x: i32"));
        assert_eq!(
            on_hover(&wasm, 2, 10).as_deref(),
            Some("global mut ORIGIN_X: i32")
        );
        assert_eq!(run_main(&wasm), 2);
    }

    #[test]
    fn positions_count_utf16_units() {
        let source = "fn main() -> i32 { let s = \"𝄞\"; let n = str_len(s); n }";
        let wasm = compile_wasm(source, &std_source()).expect("compile");
        // The clef is two UTF-16 units, so `n` sits at character 37.
        assert_eq!(on_hover(&wasm, 0, 37).as_deref(), Some("let n: i32"));
        assert_eq!(run_main(&wasm), 4);
    }

    #[test]
    fn unreadable_modules_have_no_hover() {
        let wasm = compile_wasm(PROGRAM, &std_source()).expect("compile");
        assert_eq!(on_hover(&wasm[..wasm.len() - 4], 2, 8), None);
        assert_eq!(on_hover(b"", 0, 0), None);
        assert_eq!(on_hover(b"\0asm\x01\0\0\0", 0, 0), None);
    }

    #[test]
    fn unresolved_names_fail_compilation() {
        let err = compile_wasm("fn main() -> i32 { helper() }", &std_source()).unwrap_err();
        assert_eq!(err.diagnostics()[0].code, Some("E0200"));

        let source = "fn helper() -> i32 { 3 }\nfn main() -> i32 { helper() }";
        let wasm = compile_wasm(source, &std_source()).expect("compile");
        let entries = decode_module(&wasm).expect("metadata");
        let declared = LineIndex::new(source).range(Span::new(FileId::USER, 0, 24));
        assert!(
            entries.iter().any(|e| e.kind == EntryKind::Function
                && e.name == "helper"
                && e.range == declared),
            "{entries:?}"
        );
    }

    #[test]
    fn std_errors_are_fatal() {
        let err = compile_wasm("fn main() -> i32 { 1 }", "fn broken( {").unwrap_err();
        assert!(!err.diagnostics().is_empty());
        assert!(err.diagnostics().iter().all(Diagnostic::is_fatal));
    }

    #[test]
    fn user_syntax_errors_degrade() {
        let source = "fn bad() -> i32 { let = 3; 1 }\nfn main() -> i32 { 7 }";
        let artifact =
            compile(source, &std_source(), &CompileOptions::default()).expect("compile");
        assert!(artifact.diagnostics.iter().any(|d| d.code == Some("E0100")));
        assert!(!artifact.diagnostics.iter().any(Diagnostic::is_fatal));
        Validator::new()
            .validate_all(&artifact.wasm)
            .expect("valid module");
        assert_eq!(run_main(&artifact.wasm), 7);
    }

    #[test]
    fn deeply_nested_expressions_degrade() {
        let nested = |depth: usize| format!("{}1{}", "(".repeat(depth), ")".repeat(depth));
        let source = format!(
            "fn deep() -> i32 {{ {} }}\nfn main() -> i32 {{ {} + 6 }}",
            nested(5000),
            nested(MAX_NESTING as usize / 2)
        );
        let artifact =
            compile(&source, &std_source(), &CompileOptions::default()).expect("compile");
        let codes: Vec<_> = artifact.diagnostics.iter().filter_map(|d| d.code).collect();
        assert_eq!(codes, vec!["E0101"]);
        Validator::new()
            .validate_all(&artifact.wasm)
            .expect("valid module");
        assert_eq!(run_main(&artifact.wasm), 7);
    }

    #[test]
    fn warnings_are_reported_without_failing() {
        let artifact = compile(
            "fn main() -> i32 { let unused = 1; 2 }",
            &std_source(),
            &CompileOptions::default(),
        )
        .expect("compile");
        let codes: Vec<_> = artifact.diagnostics.iter().filter_map(|d| d.code).collect();
        assert_eq!(codes, vec!["W0001"]);
    }
}

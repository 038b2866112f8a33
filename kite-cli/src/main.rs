use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use kite_core::diagnostic::Diagnostic;
use kite_core::span::{FileId, LineIndex};
use kite_core::stdlib::{default_stdlib_root, load_stdlib_source};
use kite_core::{CompileOptions, compile, on_hover};
use wasmi::{Caller, Engine, Linker, Module, Store};

/// Kite compiler: builds standalone WebAssembly modules and answers hover
/// queries against them.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compile a Kite source file to a wasm module
    Build(BuildArgs),
    /// Print hover information stored in a compiled module
    Hover(HoverArgs),
}

#[derive(Args, Debug)]
struct BuildArgs {
    /// Source file; reads stdin when omitted
    #[arg(short, long)]
    input: Option<PathBuf>,

    #[arg(short, long)]
    output: PathBuf,

    #[arg(
        long = "std",
        value_name = "DIR",
        help = "Path to the standard library root (defaults to bundled stdlib)"
    )]
    std_root: Option<PathBuf>,

    #[arg(long, help = "Do not embed hover metadata")]
    no_metadata: bool,

    #[arg(long, value_name = "N", default_value_t = 1)]
    memory_pages: u32,

    #[arg(long, help = "Run `main` after building")]
    run: bool,
}

#[derive(Args, Debug)]
struct HoverArgs {
    #[arg(short, long)]
    module: PathBuf,

    /// 0-based line
    #[arg(long)]
    line: u32,

    /// 0-based UTF-16 character offset
    #[arg(long)]
    character: u32,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    execute(cli)
}

/// Log to stderr, filtered by `RUST_LOG`; silent when it is unset.
fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(io::stderr).with_target(true))
            .with(EnvFilter::from_default_env())
            .init();
    }
}

fn execute(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Build(args) => build(args),
        Commands::Hover(args) => hover(args),
    }
}

fn build(args: BuildArgs) -> Result<()> {
    let std_root = args.std_root.unwrap_or_else(default_stdlib_root);
    let std_source = load_stdlib_source(&std_root)?;

    let (name, source) = match &args.input {
        Some(path) => (
            path.display().to_string(),
            fs::read_to_string(path)
                .with_context(|| format!("failed to read input file {}", path.display()))?,
        ),
        None => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            ("<stdin>".to_string(), buffer)
        }
    };

    let options = CompileOptions {
        emit_metadata: !args.no_metadata,
        memory_pages: args.memory_pages,
    };
    tracing::info!(input = %name, ?options, "building");
    let lines = LineIndex::new(&source);
    let artifact = match compile(&source, &std_source, &options) {
        Ok(artifact) => artifact,
        Err(err) => {
            for diagnostic in err.diagnostics() {
                eprintln!("{}", located(&name, &lines, diagnostic));
            }
            return Err(err).with_context(|| format!("failed to compile {name}"));
        }
    };
    for diagnostic in &artifact.diagnostics {
        eprintln!("{}", located(&name, &lines, diagnostic));
    }

    write_output(&args.output, &artifact.wasm)?;
    if args.run {
        match run_wasm(&artifact.wasm)? {
            Some(result) => println!("Program exited with {result}"),
            None => println!("Program exited"),
        }
    }
    Ok(())
}

/// `file:line:column: diagnostic`, 1-based, for user diagnostics.
fn located(name: &str, lines: &LineIndex<'_>, diagnostic: &Diagnostic) -> String {
    match diagnostic.file_id() {
        FileId::USER => {
            let position = lines.position(diagnostic.span.start);
            format!(
                "{name}:{}:{}: {diagnostic}",
                position.line + 1,
                position.character + 1
            )
        }
        FileId::STD => format!("<std>: {diagnostic}"),
        _ => diagnostic.to_string(),
    }
}

fn hover(args: HoverArgs) -> Result<()> {
    let bytes = fs::read(&args.module)
        .with_context(|| format!("failed to read module {}", args.module.display()))?;
    match on_hover(&bytes, args.line, args.character) {
        Some(text) => println!("{text}"),
        None => eprintln!("no hover information at {}:{}", args.line, args.character),
    }
    Ok(())
}

fn write_output(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {parent:?}"))?;
        }
    }
    fs::write(path, bytes)
        .with_context(|| format!("failed to write output file {}", path.display()))?;
    Ok(())
}

/// A `[len: u32 LE][bytes]` string in the instance's exported memory.
fn read_str(caller: &Caller<'_, ()>, address: i32) -> Option<String> {
    let memory = caller.get_export("memory")?.into_memory()?;
    let data = memory.data(caller);
    let start = usize::try_from(address).ok()?;
    let len = u32::from_le_bytes(data.get(start..start + 4)?.try_into().ok()?) as usize;
    let bytes = data.get(start + 4..start + 4 + len)?;
    Some(String::from_utf8_lossy(bytes).into_owned())
}

/// Run the exported `main`, which returns either `i32` or nothing.
fn run_wasm(wasm: &[u8]) -> Result<Option<i32>> {
    let engine = Engine::default();
    let module = Module::new(&engine, wasm).context("failed to compile wasm artifact")?;
    let mut linker = Linker::new(&engine);
    linker
        .func_wrap("env", "print_i32", |value: i32| println!("{value}"))
        .context("failed to define print_i32")?;
    linker
        .func_wrap(
            "env",
            "print_str",
            |caller: Caller<'_, ()>, address: i32| -> Result<(), wasmi::Error> {
                let text = read_str(&caller, address)
                    .ok_or_else(|| wasmi::Error::new("print_str: string outside of memory"))?;
                println!("{text}");
                Ok(())
            },
        )
        .context("failed to define print_str")?;
    let mut store = Store::new(&engine, ());
    let instance = linker
        .instantiate_and_start(&mut store, &module)
        .context("failed to instantiate module")?;
    if let Ok(main) = instance.get_typed_func::<(), i32>(&store, "main") {
        let result = main.call(&mut store, ()).context("failed to execute main")?;
        return Ok(Some(result));
    }
    let main = instance
        .get_typed_func::<(), ()>(&store, "main")
        .context("exported main function missing or has wrong type")?;
    main.call(&mut store, ()).context("failed to execute main")?;
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kite_core::diagnostic::DiagnosticKind;
    use kite_core::span::Span;

    #[test]
    fn locates_user_diagnostics_by_line() {
        let source = "fn main() {\n  let é = 1;\n}";
        let lines = LineIndex::new(source);
        let span = Span::new(FileId::USER, 18, 20);
        let diagnostic = Diagnostic::warning(DiagnosticKind::TypeError, "unused variable `é`", span)
            .with_code("W0001");
        let text = located("a.kite", &lines, &diagnostic);
        assert!(text.starts_with("a.kite:2:7: warning[W0001]"), "{text}");
    }
}

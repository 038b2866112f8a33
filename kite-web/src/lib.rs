//! JavaScript bindings for the Kite compiler.
//!
//! Buffers cross the boundary through wasm-bindgen's allocator exports;
//! the returned module bytes belong to the caller.

use wasm_bindgen::prelude::*;

/// The std library bundled with the compiler, for hosts without a
/// filesystem.
const BUNDLED_STD: &[&str] = &[
    include_str!("../../kite-core/stdlib/float.kite"),
    include_str!("../../kite-core/stdlib/std.kite"),
];

#[wasm_bindgen]
pub fn bundled_std() -> String {
    BUNDLED_STD.join("\n")
}

/// Compile `contents` against `std_source`. Errors carry every fatal
/// diagnostic, one per line.
#[wasm_bindgen]
pub fn compile_wasm(contents: &str, std_source: &str) -> Result<Vec<u8>, JsError> {
    kite_core::compile_wasm(contents, std_source).map_err(|err| {
        let diagnostics = err.diagnostics();
        if diagnostics.is_empty() {
            JsError::new(&err.to_string())
        } else {
            let lines: Vec<String> = diagnostics.iter().map(ToString::to_string).collect();
            JsError::new(&lines.join("\n"))
        }
    })
}

/// Hover text at a 0-based line and UTF-16 character of the source the
/// module was compiled from.
#[wasm_bindgen]
pub fn on_hover(bytes: &[u8], line: u32, character: u32) -> Option<String> {
    kite_core::on_hover(bytes, line, character)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compiles_against_the_bundled_std() {
        let bytes = compile_wasm("fn main() -> i32 { clamp(12, 0, 10) }", &bundled_std())
            .unwrap_or_else(|_| panic!("compile should succeed"));
        wasmparser::Validator::new()
            .validate_all(&bytes)
            .expect("valid module");
    }

    #[test]
    fn hovers_compiled_bytes() {
        let source = "fn main() -> f64 {\n    let r = hypot(3.0, 4.0);\n    r\n}";
        let bytes = compile_wasm(source, &bundled_std())
            .unwrap_or_else(|_| panic!("compile should succeed"));
        assert_eq!(on_hover(&bytes, 1, 8).as_deref(), Some("let r: f64"));
        assert_eq!(on_hover(&bytes, 7, 0), None);
        assert_eq!(on_hover(&[], 0, 0), None);
    }
}

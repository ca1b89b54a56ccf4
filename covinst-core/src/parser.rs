//! TypeScript and JavaScript front-end using SWC
//!
//! Global invariants enforced:
//! - Deterministic parsing order
//! - Comments are collected alongside the tree, since ignore hints live there

use anyhow::Result;
use swc_common::comments::{Comments, SingleThreadedComments};
use swc_common::{sync::Lrc, FileName, SourceFile, SourceMap};
use swc_ecma_ast::{EsVersion, Program};
use swc_ecma_parser::{lexer::Lexer, Parser, StringInput, Syntax};

/// Extensions the front-end knows how to parse
pub const SUPPORTED_EXTENSIONS: &[&str] = &[
    ".js", ".mjs", ".cjs", ".jsx", ".ts", ".mts", ".cts", ".tsx",
];

/// Determine the appropriate syntax configuration based on file extension
fn syntax_for_file(filename: &str) -> Syntax {
    if filename.ends_with(".tsx") {
        Syntax::Typescript(swc_ecma_parser::TsSyntax {
            tsx: true,
            decorators: true,
            dts: false,
            ..Default::default()
        })
    } else if filename.ends_with(".ts") || filename.ends_with(".mts") || filename.ends_with(".cts") {
        Syntax::Typescript(swc_ecma_parser::TsSyntax {
            tsx: false,
            decorators: true,
            dts: filename.ends_with(".d.ts"),
            ..Default::default()
        })
    } else {
        // Plain JavaScript; JSX is accepted in every flavor since transpiled
        // bundles commonly keep it in .js files
        Syntax::Es(swc_ecma_parser::EsSyntax {
            jsx: true,
            decorators: false,
            ..Default::default()
        })
    }
}

/// Whether a file name carries a supported extension
pub fn is_supported_file(filename: &str) -> bool {
    SUPPORTED_EXTENSIONS.iter().any(|ext| filename.ends_with(ext))
}

/// Parse TypeScript, JavaScript, JSX, or TSX source code into a program
///
/// Comments are recorded into `comments`, keyed by position. Scripts and
/// modules are told apart by the presence of `import`/`export`.
///
/// Returns an error if parse errors occur.
pub fn parse_source(
    src: &str,
    source_map: &Lrc<SourceMap>,
    comments: &SingleThreadedComments,
    filename: &str,
) -> Result<Program> {
    let syntax = syntax_for_file(filename);

    let source_file: Lrc<SourceFile> = source_map.new_source_file(
        FileName::Custom(filename.into()).into(),
        src.to_string(),
    );
    let input = StringInput::from(&*source_file);

    let lexer = Lexer::new(
        syntax,
        EsVersion::Es2022,
        input,
        Some(comments as &dyn Comments),
    );
    let mut parser = Parser::new_from(lexer);

    parser.parse_program().map_err(|e| {
        let error_msg = e.kind().msg();
        anyhow::anyhow!("Parse error: {}", error_msg)
            .context(format!("Failed to parse source file: {}", filename))
    })
}

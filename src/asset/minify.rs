//! Minification of concatenated CSS and JS.
//!
//! Uses oxc for JavaScript and lightningcss for CSS. Both return `None` when
//! the input does not parse; callers fall back to the unminified text.

use lightningcss::stylesheet::{ParserOptions, PrinterOptions, StyleSheet};
use oxc::allocator::Allocator;
use oxc::codegen::{Codegen, CodegenOptions, CommentOptions};
use oxc::mangler::MangleOptions;
use oxc::minifier::{CompressOptions, Minifier, MinifierOptions};
use oxc::parser::Parser;
use oxc::span::SourceType;

/// Minify JavaScript source code.
///
/// Parsed as a classic script: page scripts share the global scope, so
/// top-level declarations are kept even when nothing in the bundle uses them.
pub fn minify_js(source: &str) -> Option<String> {
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, source, SourceType::script()).parse();
    if !ret.errors.is_empty() {
        return None;
    }
    let mut program = ret.program;
    let options = MinifierOptions {
        mangle: Some(MangleOptions::default()),
        compress: Some(CompressOptions::smallest()),
    };
    let ret = Minifier::new(options).minify(&allocator, &mut program);
    let code = Codegen::new()
        .with_options(CodegenOptions {
            minify: true,
            comments: CommentOptions::disabled(),
            ..CodegenOptions::default()
        })
        .with_scoping(ret.scoping)
        .build(&program)
        .code;
    Some(code)
}

/// Minify CSS source code.
pub fn minify_css(source: &str) -> Option<String> {
    let stylesheet = StyleSheet::parse(source, ParserOptions::default()).ok()?;
    let result = stylesheet
        .to_css(PrinterOptions {
            minify: true,
            ..PrinterOptions::default()
        })
        .ok()?;
    Some(result.code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minify_css() {
        let out = minify_css("body {\n  color: red;\n}\n\n/* note */\n").unwrap();
        assert_eq!(out.trim_end(), "body{color:red}");
    }

    #[test]
    fn test_minify_css_keeps_urls() {
        let out = minify_css("a { background: url('/img/logo.0123456789ab.png'); }").unwrap();
        assert!(out.contains("/img/logo.0123456789ab.png"));
    }

    #[test]
    fn test_minify_js() {
        let out = minify_js("function greet(name) {\n  // hello\n  return 'hi ' + name;\n}\n").unwrap();
        assert!(out.len() < 40);
        assert!(!out.contains("// hello"));
        // Global function name survives
        assert!(out.contains("greet"));
    }

    #[test]
    fn test_minify_js_keeps_unused_globals() {
        let out = minify_js("var config = {debug: true};").unwrap();
        assert!(out.contains("config"));

        let out = minify_js("function helper(x) { return x * 2; }").unwrap();
        assert!(out.contains("helper"));

        let out = minify_js("var a = 1;;\nfunction b(){return a}").unwrap();
        assert!(out.contains("var a=1"));
        assert!(out.contains("function b()"));
    }

    #[test]
    fn test_minify_js_rejects_invalid() {
        assert_eq!(minify_js("function ( {"), None);
    }
}

//! Source text helpers for the bundler.

use regex::Regex;

/// Removes a leading UTF-8 byte order mark.
pub fn strip_bom(text: &str) -> &str {
    text.strip_prefix('\u{FEFF}').unwrap_or(text)
}

lazy_static! {
    static ref JS_IDENTIFIER: Regex = Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*$")
        .expect("Failed to compile identifier pattern");
}

const RESERVED_WORDS: &[&str] = &[
    "await", "break", "case", "catch", "class", "const", "continue", "debugger", "default",
    "delete", "do", "else", "enum", "export", "extends", "false", "finally", "for",
    "function", "if", "implements", "import", "in", "instanceof", "interface", "let", "new",
    "null", "package", "private", "protected", "public", "return", "static", "super",
    "switch", "this", "throw", "true", "try", "typeof", "var", "void", "while", "with",
    "yield", "arguments", "eval",
];

/// True when `name` can be used as a `const` binding in strict mode code.
pub fn is_js_identifier(name: &str) -> bool {
    JS_IDENTIFIER.is_match(name) && !RESERVED_WORDS.contains(&name)
}

/// Wraps a JSON document in an ES module.
///
/// The default export is the parsed value. When the document is an object, every
/// top-level key that is a usable identifier is also a named export.
pub fn transform_json_source(source: &str) -> String {
    let source = strip_bom(source);
    let literal = serde_json::Value::String(source.to_string()).to_string();
    let mut module = format!("export default JSON.parse({literal});");

    if let Ok(serde_json::Value::Object(entries)) = serde_json::from_str(source) {
        for (key, value) in entries.iter().filter(|(key, _)| is_js_identifier(key)) {
            module.push_str(&format!("\nexport const {key} = {value};"));
        }
    }
    module
}

//! Threat Detector Table
//!
//! Order matters only for which rule is reported first. Every pattern is
//! compiled case-insensitively. Overlapping detectors are intentional.

use super::Category;
use super::Category::*;

/// A detector before compilation
#[derive(Debug, Clone, Copy)]
pub struct RuleSpec {
    pub id: &'static str,
    pub category: Category,
    pub pattern: &'static str,
}

const fn rule(id: &'static str, category: Category, pattern: &'static str) -> RuleSpec {
    RuleSpec { id, category, pattern }
}

pub const RULES: &[RuleSpec] = &[
    // Script elements and attributes
    rule("script-element", ScriptInjection, r"<script\b"),
    rule("namespaced-script", ScriptInjection, r"<[\w:.-]+:script\b"),
    rule("script-attribute", ScriptInjection, r"<\w+\s[^>]*script\w*\s*="),
    // Browsers drop whitespace inside URL schemes
    rule(
        "javascript-scheme",
        ScriptInjection,
        r"j\s*a\s*v\s*a\s*s\s*c\s*r\s*i\s*p\s*t\s*:",
    ),

    // Event handlers. Neither may fire on data-onclick or similar.
    rule("event-handler", EventHandler, r"(?:^|[^\w.-])on\w+\s*="),
    rule("event-handler-in-tag", EventHandler, r"<[\w:.-]+\s(?:[^>]*\s)?on[a-z]+\s*="),

    rule("iframe-element", DangerousElement, r"<(?:[\w.-]+:)?iframe\b"),
    rule("object-element", DangerousElement, r"<(?:[\w.-]+:)?object\b"),
    rule("embed-element", DangerousElement, r"<(?:[\w.-]+:)?embed\b"),
    rule("foreign-object", DangerousElement, r"<[\w:.-]*foreignobject\b"),

    rule("remote-use", ExternalReference, r#"<use\s+href\s*=\s*["']?https?:"#),
    rule("remote-image", ExternalReference, r#"<image\s+href\s*=\s*["']?https?:"#),
    rule("remote-xlink", ExternalReference, r#"xlink:href\s*=\s*["']?https?:"#),

    rule("style-element", StyleInjection, r"(?s)<style\b[^>]*>.*?</style>"),
    rule(
        "namespaced-style",
        StyleInjection,
        r"(?s)<[\w:.-]+:style\b[^>]*>.*?</[\w:.-]+:style>",
    ),
    rule("css-expression", StyleInjection, r"expression\s*\("),
    rule("css-import", StyleInjection, r"@import"),
    rule("css-javascript-url", StyleInjection, r#"url\s*\(\s*["']?javascript:"#),
    rule(
        "inline-style-expression",
        StyleInjection,
        r#"style\s*=\s*["'][^"']*expression\s*\("#,
    ),
    rule(
        "inline-style-javascript",
        StyleInjection,
        r#"style\s*=\s*["'][^"']*javascript:"#,
    ),
    rule("css-behavior", StyleInjection, r"behavior\s*:"),

    rule("data-url-script", DataUrlAbuse, r"data:\s*[^,]*(?:script|javascript)"),
    rule("data-url-html", DataUrlAbuse, r"data:\s*text/html"),
    rule("data-url-base64-href", DataUrlAbuse, r#"href\s*=\s*["']?data:.*base64"#),

    // XXE and entity expansion
    rule("doctype-declaration", XmlEntityThreat, r"<!DOCTYPE\b"),
    rule("entity-declaration", XmlEntityThreat, r"<!ENTITY\b"),
    rule("entity-reference", XmlEntityThreat, r"&\w+;"),
    rule("parameter-entity-reference", XmlEntityThreat, r"%\w+;"),
    rule(
        "cdata-script",
        XmlEntityThreat,
        r"(?s)<!\[CDATA\[.*?(?:script|javascript).*?\]\]>",
    ),

    rule("unicode-escape", ObfuscationEncoding, r"\\u[0-9a-f]{4}"),
    rule("hex-escape", ObfuscationEncoding, r"\\x[0-9a-f]{2}"),

    rule("eval-call", ScriptInjection, r"eval\s*\("),
    rule("set-timeout-call", ScriptInjection, r"setTimeout\s*\("),
    rule("set-interval-call", ScriptInjection, r"setInterval\s*\("),
    rule("function-constructor", ScriptInjection, r"Function\s*\("),

    rule("octal-escape", ObfuscationEncoding, r"\\[0-7]{1,3}"),
];

/// Escapes that must not survive entity decoding
pub const ESCAPE_RULES: &[RuleSpec] = &[
    rule("decoded-unicode-escape", ObfuscationEncoding, r"\\u[0-9a-f]{4}"),
    rule("decoded-hex-escape", ObfuscationEncoding, r"\\x[0-9a-f]{2}"),
];

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_rule_ids_unique() {
        let mut seen = HashSet::new();
        for spec in RULES.iter().chain(ESCAPE_RULES) {
            assert!(seen.insert(spec.id), "duplicate rule id {}", spec.id);
        }
    }

    #[test]
    fn test_every_category_covered() {
        for category in [
            ScriptInjection,
            EventHandler,
            DangerousElement,
            ExternalReference,
            StyleInjection,
            DataUrlAbuse,
            XmlEntityThreat,
            ObfuscationEncoding,
        ] {
            assert!(
                RULES.iter().any(|r| r.category == category),
                "no rule for {}",
                category.as_str()
            );
        }
    }
}

//! Pattern Library
//!
//! Immutable catalogue of threat detectors evaluated against text. Built once
//! on first use and shared read-only between threads.
//!
//! Matching uses the `regex` crate, which runs in time linear in the input,
//! so a hostile document cannot make rule evaluation backtrack.

pub mod rules;

use log::{debug, error};
use regex::{Regex, RegexBuilder, RegexSet, RegexSetBuilder};
use rules::RuleSpec;
use std::sync::LazyLock;
use thiserror::Error;

/// Stable identifier of a detector, safe to log
pub type RuleId = &'static str;

/// Threat family a detector belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    ScriptInjection,
    EventHandler,
    DangerousElement,
    ExternalReference,
    StyleInjection,
    DataUrlAbuse,
    XmlEntityThreat,
    ObfuscationEncoding,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Category::ScriptInjection => "script_injection",
            Category::EventHandler => "event_handler",
            Category::DangerousElement => "dangerous_element",
            Category::ExternalReference => "external_reference",
            Category::StyleInjection => "style_injection",
            Category::DataUrlAbuse => "data_url_abuse",
            Category::XmlEntityThreat => "xml_entity_threat",
            Category::ObfuscationEncoding => "obfuscation_encoding",
        }
    }
}

/// A compiled detector
#[derive(Debug)]
pub struct PatternRule {
    pub id: RuleId,
    pub category: Category,
    regex: Regex,
}

impl PatternRule {
    /// Byte range of the first match in `text`
    pub fn find(&self, text: &str) -> Option<(usize, usize)> {
        self.regex.find(text).map(|m| (m.start(), m.end()))
    }
}

#[derive(Debug, Error)]
pub enum PatternError {
    #[error("rule {id} failed to compile: {source}")]
    Rule {
        id: RuleId,
        #[source]
        source: regex::Error,
    },
    #[error("rule set failed to compile: {0}")]
    Set(#[source] regex::Error),
}

/// Ordered set of detectors
#[derive(Debug)]
pub struct PatternLibrary {
    set: RegexSet,
    rules: Vec<PatternRule>,
}

/// Compiled program budget for the whole set
const SET_SIZE_LIMIT: usize = 64 * (1 << 20);

static LIBRARY: LazyLock<Result<PatternLibrary, PatternError>> =
    LazyLock::new(|| compile("threat", rules::RULES));

static ESCAPES: LazyLock<Result<PatternLibrary, PatternError>> =
    LazyLock::new(|| compile("escape", rules::ESCAPE_RULES));

fn compile(table: &str, specs: &[RuleSpec]) -> Result<PatternLibrary, PatternError> {
    let result = PatternLibrary::build(specs);
    match &result {
        Ok(library) => debug!("compiled {} {} rules", library.rules().count(), table),
        Err(e) => error!("{} rules failed to compile, rejecting all input: {}", table, e),
    }
    result
}

impl PatternLibrary {
    /// Compile a table of detectors, case-insensitively
    pub fn build(specs: &[RuleSpec]) -> Result<Self, PatternError> {
        let rules = specs
            .iter()
            .map(|spec| {
                RegexBuilder::new(spec.pattern)
                    .case_insensitive(true)
                    .build()
                    .map(|regex| PatternRule {
                        id: spec.id,
                        category: spec.category,
                        regex,
                    })
                    .map_err(|source| PatternError::Rule { id: spec.id, source })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let set = RegexSetBuilder::new(specs.iter().map(|spec| spec.pattern))
            .case_insensitive(true)
            .size_limit(SET_SIZE_LIMIT)
            .build()
            .map_err(PatternError::Set)?;

        Ok(PatternLibrary { set, rules })
    }

    /// The threat catalogue
    pub fn global() -> Result<&'static PatternLibrary, &'static PatternError> {
        LIBRARY.as_ref()
    }

    /// Detectors for backslash escapes left over after entity decoding
    pub fn escapes() -> Result<&'static PatternLibrary, &'static PatternError> {
        ESCAPES.as_ref()
    }

    /// First rule, in table order, that matches `text`
    pub fn first_match(&self, text: &str) -> Option<&PatternRule> {
        self.set
            .matches(text)
            .iter()
            .next()
            .and_then(|i| self.rules.get(i))
    }

    /// Every rule that matches `text`, in table order
    pub fn matches(&self, text: &str) -> Vec<&PatternRule> {
        self.set
            .matches(text)
            .iter()
            .filter_map(|i| self.rules.get(i))
            .collect()
    }

    /// Compiled detectors in table order
    pub fn rules(&self) -> impl Iterator<Item = &PatternRule> {
        self.rules.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn library() -> &'static PatternLibrary {
        PatternLibrary::global().unwrap()
    }

    fn first_id(text: &str) -> Option<RuleId> {
        library().first_match(text).map(|r| r.id)
    }

    #[test]
    fn test_tables_compile() {
        assert_eq!(library().rules().count(), rules::RULES.len());
        assert_eq!(PatternLibrary::escapes().unwrap().rules().count(), rules::ESCAPE_RULES.len());
    }

    #[test]
    fn test_table_order_preserved() {
        let ids: Vec<_> = library().rules().map(|r| r.id).collect();
        let expected: Vec<_> = rules::RULES.iter().map(|r| r.id).collect();
        assert_eq!(ids, expected);
    }

    #[test]
    fn test_clean_svg_passes() {
        let svg = r#"<svg xmlns="http://www.w3.org/2000/svg" width="100" height="100"><circle cx="50" cy="50" r="40" fill="blue"/><rect x="10" y="10" width="20" height="20" fill="red"/></svg>"#;
        assert_eq!(first_id(svg), None);
    }

    #[test]
    fn test_script_detectors() {
        assert_eq!(first_id("<svg><SCRIPT>x</SCRIPT></svg>"), Some("script-element"));
        assert_eq!(first_id("<svg><svg:script>x</svg:script></svg>"), Some("namespaced-script"));
        assert_eq!(first_id(r#"<a href="JavaScript:alert(1)">"#), Some("javascript-scheme"));
        assert_eq!(first_id(r#"<a href="j a v a s c r i p t : x">"#), Some("javascript-scheme"));
        assert_eq!(first_id("<text>eval (x)</text>"), Some("eval-call"));
        assert_eq!(first_id("<text>new Function(x)</text>"), Some("function-constructor"));
    }

    #[test]
    fn test_event_handler_boundaries() {
        assert_eq!(first_id(r#"<svg onload="x">"#), Some("event-handler"));
        assert_eq!(first_id(r#"<rect onClick = "x"/>"#), Some("event-handler"));
        assert_eq!(first_id(r#"<svg data-onclick="x">"#), None);
        assert_eq!(first_id(r#"<svg x.onclick="x">"#), None);
        assert_eq!(first_id(r#"<svg version="1.1">"#), None);
    }

    #[test]
    fn test_dangerous_elements() {
        assert_eq!(first_id("<iframe src=x>"), Some("iframe-element"));
        assert_eq!(first_id("<html:iframe>"), Some("iframe-element"));
        assert_eq!(first_id("<foreignObject>"), Some("foreign-object"));
        assert_eq!(first_id("<html:foreignobject>"), Some("foreign-object"));
        assert_eq!(first_id("<objective/>"), None);
    }

    #[test]
    fn test_external_references() {
        assert_eq!(first_id(r#"<use href="https://evil/x.svg#a"/>"#), Some("remote-use"));
        assert_eq!(first_id(r#"<image href='http://evil/x.png'/>"#), Some("remote-image"));
        assert_eq!(first_id(r#"<use xlink:href="http://evil/#a"/>"#), Some("remote-xlink"));
        assert_eq!(first_id(r##"<use href="#local"/>"##), None);
    }

    #[test]
    fn test_style_detectors() {
        assert_eq!(first_id("<style>rect{}</style>"), Some("style-element"));
        assert_eq!(first_id("<svg:style>\nrect{}\n</svg:style>"), Some("namespaced-style"));
        assert_eq!(first_id(r#"<rect style="width: expression(alert(1))"/>"#), Some("css-expression"));
        assert_eq!(first_id(r#"<rect style="fill:url(javascript:x)"/>"#), Some("javascript-scheme"));
        assert_eq!(first_id("<text>@IMPORT x</text>"), Some("css-import"));
        assert_eq!(first_id(r#"<rect style="behavior: url(x.htc)"/>"#), Some("css-behavior"));
        assert_eq!(first_id(r#"<rect style="fill:red;stroke:blue"/>"#), None);
    }

    #[test]
    fn test_data_urls() {
        assert_eq!(first_id(r#"<image href="data:text/html,hi"/>"#), Some("data-url-html"));
        assert_eq!(
            first_id(r#"<image href="data:image/svg+xml;base64,PHN2Zz4="/>"#),
            Some("data-url-base64-href")
        );
        assert_eq!(
            first_id(r#"<image href="data:application/ecmascript,x"/>"#),
            Some("data-url-script")
        );
    }

    #[test]
    fn test_entity_threats() {
        assert_eq!(first_id("<!DOCTYPE svg>"), Some("doctype-declaration"));
        assert_eq!(first_id("<!ENTITY x 'y'>"), Some("entity-declaration"));
        assert_eq!(first_id("<text>&amp;</text>"), Some("entity-reference"));
        assert_eq!(first_id("<text>%param;</text>"), Some("parameter-entity-reference"));
        assert_eq!(first_id("<text>&#60;</text>"), None);
        assert_eq!(
            first_id("<svg><![CDATA[\nvar s = 'javascript'\n]]></svg>"),
            Some("cdata-script")
        );
    }

    #[test]
    fn test_escape_detectors() {
        assert_eq!(first_id(r"<a href='\u006A'>"), Some("unicode-escape"));
        assert_eq!(first_id(r"<a href='\X6A'>"), Some("hex-escape"));
        assert_eq!(first_id(r"<text>\141</text>"), Some("octal-escape"));
        assert_eq!(first_id(r"<text>\9</text>"), None);
    }

    #[test]
    fn test_all_matches_reported() {
        let hits: Vec<_> = library()
            .matches(r#"<svg onload="eval(1)"><script/></svg>"#)
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(hits, vec!["script-element", "event-handler", "event-handler-in-tag", "eval-call"]);
    }

    #[test]
    fn test_find_reports_span() {
        let rule = library().rules().find(|r| r.id == "script-element").unwrap();
        assert_eq!(rule.find("ab<script>"), Some((2, 9)));
        assert_eq!(rule.find("<scripts>"), None);
    }

    #[test]
    fn test_category_names() {
        assert_eq!(Category::EventHandler.as_str(), "event_handler");
        assert_eq!(Category::ObfuscationEncoding.as_str(), "obfuscation_encoding");
    }
}

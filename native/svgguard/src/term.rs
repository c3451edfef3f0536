//! Elixir Term Conversion Utilities
//!
//! Converts validation results to Elixir terms.

use crate::dimensions::SvgDimensions;
use crate::error::{Rejection, Stage};
use crate::patterns::Category;
use crate::validator::Verdict;
use rustler::{Atom, Encoder, Env, NewBinary, Term};

// Pre-defined atoms for efficiency - created once at compile time
rustler::atoms! {
    ok,
    error,
    nil,
    precheck,
    raw_scan,
    decoded_scan,
    escape_scan,
    structural_check,
    script_injection,
    event_handler,
    dangerous_element,
    external_reference,
    style_injection,
    data_url_abuse,
    xml_entity_threat,
    obfuscation_encoding,
}

pub fn stage_atom(stage: Stage) -> Atom {
    match stage {
        Stage::Precheck => precheck(),
        Stage::RawScan => raw_scan(),
        Stage::DecodedScan => decoded_scan(),
        Stage::EscapeScan => escape_scan(),
        Stage::StructuralCheck => structural_check(),
    }
}

pub fn category_atom(category: Category) -> Atom {
    match category {
        Category::ScriptInjection => script_injection(),
        Category::EventHandler => event_handler(),
        Category::DangerousElement => dangerous_element(),
        Category::ExternalReference => external_reference(),
        Category::StyleInjection => style_injection(),
        Category::DataUrlAbuse => data_url_abuse(),
        Category::XmlEntityThreat => xml_entity_threat(),
        Category::ObfuscationEncoding => obfuscation_encoding(),
    }
}

/// `:ok` or `{:error, stage, category | nil, rule_id | nil}`
pub fn check_result_to_term<'a>(env: Env<'a>, result: &Result<(), Rejection>) -> Term<'a> {
    match result {
        Ok(()) => ok().encode(env),
        Err(rejection) => {
            let category = match rejection.category() {
                Some(c) => category_atom(c).encode(env),
                None => nil().encode(env),
            };
            let rule = match rejection.rule() {
                Some(id) => str_to_binary(env, id),
                None => nil().encode(env),
            };
            (error(), stage_atom(rejection.stage()), category, rule).encode(env)
        }
    }
}

/// `{width, height}` or `nil`
pub fn dimensions_to_term<'a>(env: Env<'a>, dimensions: Option<SvgDimensions>) -> Term<'a> {
    match dimensions {
        Some(d) => (d.width, d.height).encode(env),
        None => nil().encode(env),
    }
}

/// List of accept booleans, in input order
pub fn verdicts_to_term<'a>(env: Env<'a>, verdicts: &[Verdict]) -> Term<'a> {
    let mut list = Term::list_new_empty(env);
    for verdict in verdicts.iter().rev() {
        list = list.list_prepend(verdict.accepted.encode(env));
    }
    list
}

/// List of `{width, height}` or `nil`, in input order
pub fn dimensions_list_to_term<'a>(env: Env<'a>, dimensions: &[Option<SvgDimensions>]) -> Term<'a> {
    let mut list = Term::list_new_empty(env);
    for dims in dimensions.iter().rev() {
        list = list.list_prepend(dimensions_to_term(env, *dims));
    }
    list
}

/// Convert a string to an Elixir binary
pub fn str_to_binary<'a>(env: Env<'a>, s: &str) -> Term<'a> {
    let bytes = s.as_bytes();
    let mut binary = NewBinary::new(env, bytes.len());
    binary.as_mut_slice().copy_from_slice(bytes);
    binary.into()
}

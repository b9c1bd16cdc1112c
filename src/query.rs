//! Query-string encoding for request parameters and association includes.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde_json::Value;

use crate::params::{
    AssociationSpec, ParameterSet, DEFAULT_ASSOCIATION_LIMIT, DEFAULT_ASSOCIATION_OFFSET,
};

/// Everything except RFC 3986 unreserved characters gets escaped.
const UNRESERVED: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

pub fn escape(value: &str) -> String {
    utf8_percent_encode(value, UNRESERVED).to_string()
}

/// Wire form of a value before escaping. Sequences are comma-joined.
pub fn stringify(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(stringify).collect::<Vec<_>>().join(","),
        Value::Object(map) => to_url(map),
    }
}

/// `null`, `""`, `[]` and `{}` carry nothing and are left off the wire.
pub fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// Encoded `key=value` pairs, blanks dropped, in key order.
pub fn pairs(params: &ParameterSet) -> Vec<(String, String)> {
    params
        .iter()
        .filter(|(k, v)| !k.is_empty() && !is_blank(v))
        .map(|(k, v)| (escape(k), escape(&stringify(v))))
        .collect()
}

/// Raw (unescaped) `(key, value)` pairs, blanks dropped, for form fields.
pub fn fields(params: &ParameterSet) -> Vec<(String, String)> {
    params
        .iter()
        .filter(|(k, v)| !k.is_empty() && !is_blank(v))
        .map(|(k, v)| (k.clone(), stringify(v)))
        .collect()
}

pub fn to_url(params: &ParameterSet) -> String {
    join(pairs(params))
}

/// Encode `params` together with an `includes` parameter rendered from `resources`.
///
/// The association separators inside `includes` stay literal; only resource and
/// field names are escaped.
pub fn to_url_with_includes(params: &ParameterSet, resources: &[AssociationSpec]) -> String {
    let mut encoded: Vec<(String, String)> =
        pairs(params).into_iter().filter(|(k, _)| k != "includes").collect();

    let includes = render_includes(resources);
    if !includes.is_empty() {
        encoded.push(("includes".into(), includes));
        encoded.sort_by(|a, b| a.0.cmp(&b.0));
    }

    join(encoded)
}

/// Literal association fragment, e.g. `Listings(title,price):25:0`.
pub fn association(spec: &AssociationSpec) -> String {
    render_association(spec, str::to_string)
}

pub fn render_includes(resources: &[AssociationSpec]) -> String {
    resources
        .iter()
        .map(|spec| render_association(spec, escape))
        .collect::<Vec<_>>()
        .join(",")
}

fn render_association(spec: &AssociationSpec, encode: impl Fn(&str) -> String) -> String {
    let mut s = encode(&spec.resource);

    if let Some(ref fields) = spec.fields {
        let fields: Vec<String> = fields.iter().map(|f| encode(f)).collect();
        s.push('(');
        s.push_str(&fields.join(","));
        s.push(')');
    }

    if spec.limit.is_some() || spec.offset.is_some() {
        s.push_str(&format!(
            ":{}:{}",
            spec.limit.unwrap_or(DEFAULT_ASSOCIATION_LIMIT),
            spec.offset.unwrap_or(DEFAULT_ASSOCIATION_OFFSET)
        ));
    }

    s
}

fn join(pairs: Vec<(String, String)>) -> String {
    pairs
        .into_iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

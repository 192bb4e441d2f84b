//! Conversion of bound path parameters into typed handler arguments.
//!
//! Endpoints declare their parameters as [`ParamSpec`] descriptors; at
//! invocation time the registry turns the string bindings produced by the
//! trie into positional [`ParamValue`]s. Conversion never fails a request:
//! unparsable numbers fall back to the type default and a refusing factory
//! binds [`ParamValue::Null`].

use fnv::FnvHashMap;
use std::fmt;
use std::sync::Arc;

/// A user-supplied converter for a non-primitive parameter type. Returning
/// `None` signals a value the type refuses to accept.
pub type Converter = Arc<dyn Fn(&str) -> Option<ParamValue> + Send + Sync>;

/// The declared type of an endpoint parameter.
#[derive(Clone)]
pub enum ParamKind {
    // Pass the bound text verbatim.
    Text,
    Int,
    Long,
    Float,
    Double,
    // true for "true" / "yes" / "1", case-insensitively.
    Flag,
    // Anything else goes through an explicit converter.
    Factory(Converter),
}

impl fmt::Debug for ParamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamKind::Text => f.write_str("Text"),
            ParamKind::Int => f.write_str("Int"),
            ParamKind::Long => f.write_str("Long"),
            ParamKind::Float => f.write_str("Float"),
            ParamKind::Double => f.write_str("Double"),
            ParamKind::Flag => f.write_str("Flag"),
            ParamKind::Factory(_) => f.write_str("Factory(..)"),
        }
    }
}

/// A converted argument value handed to the endpoint callable.
#[derive(Clone, Debug, PartialEq)]
pub enum ParamValue {
    Text(String),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Flag(bool),
    // Missing binding, or a factory that refused the value.
    Null,
}

/// One parameter descriptor: the template variable it binds and the
/// declared type it converts to.
#[derive(Clone, Debug)]
pub struct ParamSpec {
    name: String,
    kind: ParamKind,
}

impl ParamSpec {
    pub fn new<N: Into<String>>(name: N, kind: ParamKind) -> Self {
        ParamSpec { name: name.into(), kind }
    }

    pub fn text<N: Into<String>>(name: N) -> Self {
        ParamSpec::new(name, ParamKind::Text)
    }

    pub fn int<N: Into<String>>(name: N) -> Self {
        ParamSpec::new(name, ParamKind::Int)
    }

    pub fn long<N: Into<String>>(name: N) -> Self {
        ParamSpec::new(name, ParamKind::Long)
    }

    pub fn float<N: Into<String>>(name: N) -> Self {
        ParamSpec::new(name, ParamKind::Float)
    }

    pub fn double<N: Into<String>>(name: N) -> Self {
        ParamSpec::new(name, ParamKind::Double)
    }

    pub fn flag<N: Into<String>>(name: N) -> Self {
        ParamSpec::new(name, ParamKind::Flag)
    }

    pub fn factory<N, F>(name: N, f: F) -> Self
    where
        N: Into<String>,
        F: Fn(&str) -> Option<ParamValue> + Send + Sync + 'static,
    {
        ParamSpec::new(name, ParamKind::Factory(Arc::new(f)))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &ParamKind {
        &self.kind
    }
}

/// Convert bound path parameters into positional arguments, one per
/// descriptor, in declaration order.
pub fn convert(specs: &[ParamSpec], values: &FnvHashMap<String, String>) -> Vec<ParamValue> {
    specs
        .iter()
        .map(|spec| match values.get(spec.name()) {
            Some(raw) => convert_one(&spec.kind, raw),
            None => ParamValue::Null,
        })
        .collect()
}

fn convert_one(kind: &ParamKind, raw: &str) -> ParamValue {
    match kind {
        ParamKind::Text => ParamValue::Text(raw.to_string()),
        ParamKind::Int => ParamValue::Int(raw.parse().unwrap_or(0)),
        ParamKind::Long => ParamValue::Long(raw.parse().unwrap_or(0)),
        ParamKind::Float => ParamValue::Float(raw.parse().unwrap_or(0.0)),
        ParamKind::Double => ParamValue::Double(raw.parse().unwrap_or(0.0)),
        ParamKind::Flag => ParamValue::Flag(is_truthy(raw)),
        ParamKind::Factory(f) => f(raw).unwrap_or(ParamValue::Null),
    }
}

fn is_truthy(raw: &str) -> bool {
    raw.eq_ignore_ascii_case("true") || raw.eq_ignore_ascii_case("yes") || raw == "1"
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bindings(pairs: &[(&str, &str)]) -> FnvHashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn text_passes_verbatim() {
        let out = convert(&[ParamSpec::text("id")], &bindings(&[("id", "abc-123")]));
        assert_eq!(out, vec![ParamValue::Text("abc-123".into())]);
    }

    #[test]
    fn numbers_parse_or_default_to_zero() {
        let vals = bindings(&[("n", "42"), ("bad", "xyz")]);
        let out = convert(
            &[
                ParamSpec::int("n"),
                ParamSpec::int("bad"),
                ParamSpec::long("n"),
                ParamSpec::double("bad"),
            ],
            &vals,
        );
        assert_eq!(
            out,
            vec![
                ParamValue::Int(42),
                ParamValue::Int(0),
                ParamValue::Long(42),
                ParamValue::Double(0.0),
            ]
        );
    }

    #[test]
    fn flags_accept_true_yes_one() {
        let vals = bindings(&[("a", "TRUE"), ("b", "yes"), ("c", "1"), ("d", "on")]);
        let out = convert(
            &[
                ParamSpec::flag("a"),
                ParamSpec::flag("b"),
                ParamSpec::flag("c"),
                ParamSpec::flag("d"),
            ],
            &vals,
        );
        assert_eq!(
            out,
            vec![
                ParamValue::Flag(true),
                ParamValue::Flag(true),
                ParamValue::Flag(true),
                ParamValue::Flag(false),
            ]
        );
    }

    #[test]
    fn missing_binding_is_null() {
        let out = convert(&[ParamSpec::text("absent")], &bindings(&[]));
        assert_eq!(out, vec![ParamValue::Null]);
    }

    #[test]
    fn factory_converts_or_binds_null() {
        let spec = ParamSpec::factory("v", |s| {
            s.strip_prefix("user-").map(|rest| ParamValue::Text(rest.to_string()))
        });
        let ok = convert(std::slice::from_ref(&spec), &bindings(&[("v", "user-7")]));
        assert_eq!(ok, vec![ParamValue::Text("7".into())]);

        let refused = convert(&[spec], &bindings(&[("v", "guest")]));
        assert_eq!(refused, vec![ParamValue::Null], "refusal binds null, not an error");
    }

    #[test]
    fn order_follows_descriptors() {
        let vals = bindings(&[("a", "1"), ("b", "2")]);
        let out = convert(&[ParamSpec::int("b"), ParamSpec::int("a")], &vals);
        assert_eq!(out, vec![ParamValue::Int(2), ParamValue::Int(1)]);
    }
}

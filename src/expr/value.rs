use std::cmp::Ordering;
use std::collections::BTreeMap;

/// A value flowing through filter evaluation.
///
/// Mirrors the JSON data model of resolved templates, with one addition:
/// [`Value::Absent`] marks a context path that does not exist. Absent is
/// falsey, equal only to itself, and never orderable.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Absent,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// Truthiness: `false`, zero, the empty string, empty collections, and
    /// absent values are falsey; everything else is truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Absent => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::String(s) => !s.is_empty(),
            Value::List(items) => !items.is_empty(),
            Value::Map(entries) => !entries.is_empty(),
        }
    }

    /// Loose equality: integers and floats compare numerically, lists and
    /// mappings compare element-wise, and mixed non-numeric types are
    /// simply unequal. Absent equals only absent.
    pub fn loose_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => {
                (*a as f64) == *b
            }
            (Value::List(a), Value::List(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.loose_eq(y))
            }
            (Value::Map(a), Value::Map(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .zip(b)
                        .all(|((ka, va), (kb, vb))| ka == kb && va.loose_eq(vb))
            }
            _ => self == other,
        }
    }

    /// Ordering is defined for number/number and string/string pairs only.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
            (Value::Int(a), Value::Float(b)) => (*a as f64).partial_cmp(b),
            (Value::Float(a), Value::Int(b)) => a.partial_cmp(&(*b as f64)),
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Type label for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Absent => "absent",
            Value::Bool(_) => "boolean",
            Value::Int(_) | Value::Float(_) => "number",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Map(_) => "mapping",
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Absent,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else {
                    // u64 beyond i64 range degrades to f64
                    Value::Float(n.as_f64().unwrap_or_default())
                }
            }
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(entries) => Value::Map(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, Value::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_owned())
    }
}

/// Named values a filter expression evaluates against, addressable by
/// dotted path (`"config.stack_name"`).
#[derive(Debug, Clone, Default)]
pub struct Context(BTreeMap<String, Value>);

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }

    /// Resolve a dotted path, descending through nested mappings. Any
    /// missing segment yields [`Value::Absent`]; this never fails.
    pub fn get_path(&self, path: &str) -> Value {
        let mut segments = path.split('.');
        let mut current = match segments.next().and_then(|first| self.0.get(first)) {
            Some(v) => v,
            None => return Value::Absent,
        };
        for segment in segments {
            let Value::Map(entries) = current else {
                return Value::Absent;
            };
            match entries.get(segment) {
                Some(v) => current = v,
                None => return Value::Absent,
            }
        }
        current.clone()
    }
}

impl From<BTreeMap<String, Value>> for Context {
    fn from(entries: BTreeMap<String, Value>) -> Self {
        Self(entries)
    }
}

impl FromIterator<(String, Value)> for Context {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn truthiness_table() {
        assert!(!Value::Absent.is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(!Value::Int(0).is_truthy());
        assert!(!Value::Float(0.0).is_truthy());
        assert!(!Value::String(String::new()).is_truthy());
        assert!(!Value::List(vec![]).is_truthy());
        assert!(!Value::Map(BTreeMap::new()).is_truthy());

        assert!(Value::Bool(true).is_truthy());
        assert!(Value::Int(-1).is_truthy());
        assert!(Value::Float(0.5).is_truthy());
        assert!(Value::from("x").is_truthy());
        assert!(Value::List(vec![Value::Bool(false)]).is_truthy());
    }

    #[test]
    fn loose_eq_promotes_numbers() {
        assert!(Value::Int(46).loose_eq(&Value::Float(46.0)));
        assert!(Value::Float(46.0).loose_eq(&Value::Int(46)));
        assert!(!Value::Int(46).loose_eq(&Value::Float(46.5)));
    }

    #[test]
    fn loose_eq_absent_semantics() {
        assert!(Value::Absent.loose_eq(&Value::Absent));
        assert!(!Value::Absent.loose_eq(&Value::Int(0)));
        assert!(!Value::Absent.loose_eq(&Value::Bool(false)));
        assert!(!Value::Absent.loose_eq(&Value::String(String::new())));
    }

    #[test]
    fn loose_eq_is_deep() {
        let a = Value::from(json!(["11.0.0.0/8", {"port": 46}]));
        let b = Value::from(json!(["11.0.0.0/8", {"port": 46.0}]));
        assert!(a.loose_eq(&b));

        let c = Value::from(json!(["11.0.0.0/8", {"port": 47}]));
        assert!(!a.loose_eq(&c));
    }

    #[test]
    fn booleans_are_not_numbers() {
        assert!(!Value::Bool(true).loose_eq(&Value::Int(1)));
        assert!(!Value::Bool(false).loose_eq(&Value::Int(0)));
    }

    #[test]
    fn compare_covers_numbers_and_strings_only() {
        assert_eq!(
            Value::Int(1).compare(&Value::Float(2.0)),
            Some(Ordering::Less)
        );
        assert_eq!(
            Value::from("b").compare(&Value::from("a")),
            Some(Ordering::Greater)
        );
        assert_eq!(Value::from("1").compare(&Value::Int(1)), None);
        assert_eq!(Value::Absent.compare(&Value::Int(1)), None);
        assert_eq!(Value::Bool(true).compare(&Value::Bool(false)), None);
    }

    #[test]
    fn json_null_becomes_absent() {
        assert_eq!(Value::from(json!(null)), Value::Absent);
    }

    #[test]
    fn get_path_walks_nested_maps() {
        let mut ctx = Context::new();
        ctx.insert("config", Value::from(json!({"stack_name": "mockstack"})));
        assert_eq!(ctx.get_path("config.stack_name"), Value::from("mockstack"));
    }

    #[test]
    fn get_path_missing_segment_is_absent() {
        let mut ctx = Context::new();
        ctx.insert("config", Value::from(json!({"stack_name": "mockstack"})));
        assert_eq!(ctx.get_path("config.region"), Value::Absent);
        assert_eq!(ctx.get_path("nothing"), Value::Absent);
        assert_eq!(ctx.get_path("nothing.at.all"), Value::Absent);
    }

    #[test]
    fn get_path_through_scalar_is_absent() {
        let mut ctx = Context::new();
        ctx.insert("port", Value::Int(46));
        assert_eq!(ctx.get_path("port.nested"), Value::Absent);
    }
}

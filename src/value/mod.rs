//! Decoded widget settings
//!
//! Widget settings are saved either as Python literal text or as a pickled
//! object graph. Both decode into [`PyValue`], a closed set of shapes the
//! grading rules know how to inspect.

mod literal;
mod pickle;

use std::fmt;
use std::path::Path;

pub use literal::parse_literal;
pub use pickle::unpickle;

/// Maximum nesting accepted by the decoders
pub(crate) const MAX_DEPTH: usize = 256;

/// A file reference saved by a file-picking widget
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PathRecord {
    /// Absolute path at the time the workflow was saved
    pub abspath: String,
    pub prefix: Option<String>,
    pub relpath: Option<String>,
    pub title: Option<String>,
    pub sheet: Option<String>,
    pub file_format: Option<String>,
}

/// A decoded settings value
#[derive(Debug, Clone, PartialEq)]
pub enum PyValue {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    List(Vec<PyValue>),
    Tuple(Vec<PyValue>),
    Set(Vec<PyValue>),
    /// Mapping entries in insertion order
    Dict(Vec<(PyValue, PyValue)>),
    Path(PathRecord),
    /// Instance of a class outside the supported set, by qualified class name
    Opaque(String),
}

/// Either a plain path string or a saved path record
#[derive(Debug, Clone, PartialEq)]
pub enum PathLike<'a> {
    Plain(&'a str),
    Record(&'a PathRecord),
}

impl<'a> PathLike<'a> {
    /// The absolute path this reference points at
    pub fn path(&self) -> &'a str {
        match self {
            PathLike::Plain(path) => path,
            PathLike::Record(record) => &record.abspath,
        }
    }

    /// File name component, falling back to the whole path
    pub fn basename(&self) -> &'a str {
        let path = self.path();
        Path::new(path)
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or(path)
    }
}

impl PyValue {
    /// Looks up a string key in a mapping
    pub fn get(&self, key: &str) -> Option<&PyValue> {
        match self {
            PyValue::Dict(entries) => entries
                .iter()
                .find(|(k, _)| k.as_str() == Some(key))
                .map(|(_, v)| v),
            _ => None,
        }
    }

    /// Follows a chain of string keys through nested mappings
    pub fn get_path(&self, keys: &[&str]) -> Option<&PyValue> {
        keys.iter().try_fold(self, |value, key| value.get(key))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PyValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&[(PyValue, PyValue)]> {
        match self {
            PyValue::Dict(entries) => Some(entries),
            _ => None,
        }
    }

    /// Items of a list
    pub fn as_list(&self) -> Option<&[PyValue]> {
        match self {
            PyValue::List(items) => Some(items),
            _ => None,
        }
    }

    /// Items of any ordered sequence (list or tuple)
    pub fn as_sequence(&self) -> Option<&[PyValue]> {
        match self {
            PyValue::List(items) | PyValue::Tuple(items) => Some(items),
            _ => None,
        }
    }

    /// Both halves of a two-element sequence
    pub fn as_pair(&self) -> Option<(&PyValue, &PyValue)> {
        match self.as_sequence() {
            Some([first, second]) => Some((first, second)),
            _ => None,
        }
    }

    /// Numeric view following Python's numeric tower, booleans included
    pub fn as_number(&self) -> Option<f64> {
        match self {
            PyValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            PyValue::Int(i) => Some(*i as f64),
            PyValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Path view of a string or path record
    pub fn as_path_like(&self) -> Option<PathLike<'_>> {
        match self {
            PyValue::Str(s) => Some(PathLike::Plain(s)),
            PyValue::Path(record) => Some(PathLike::Record(record)),
            _ => None,
        }
    }

    pub fn is_dict(&self) -> bool {
        matches!(self, PyValue::Dict(_))
    }

    /// Text used when a mapping key is compared by name
    pub fn key_text(&self) -> String {
        match self {
            PyValue::Str(s) => s.clone(),
            other => other.to_string(),
        }
    }

    /// Depth-first search for the first numeric value stored under `key`
    ///
    /// Keys are compared case-insensitively. Mappings are visited in insertion
    /// order and sequences in element order; the first match wins.
    pub fn find_number(&self, key: &str) -> Option<f64> {
        self.find_number_at(&key.to_uppercase(), 0)
    }

    fn find_number_at(&self, key: &str, depth: usize) -> Option<f64> {
        if depth > MAX_DEPTH {
            return None;
        }
        match self {
            PyValue::Dict(entries) => entries.iter().find_map(|(k, v)| {
                if k.key_text().to_uppercase() == key {
                    if let Some(number) = v.as_number() {
                        return Some(number);
                    }
                }
                v.find_number_at(key, depth + 1)
            }),
            PyValue::List(items) | PyValue::Tuple(items) => items
                .iter()
                .find_map(|item| item.find_number_at(key, depth + 1)),
            _ => None,
        }
    }
}

impl fmt::Display for PyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PyValue::None => write!(f, "None"),
            PyValue::Bool(true) => write!(f, "True"),
            PyValue::Bool(false) => write!(f, "False"),
            PyValue::Int(i) => write!(f, "{i}"),
            PyValue::Float(x) if x.fract() == 0.0 && x.is_finite() => write!(f, "{x:.1}"),
            PyValue::Float(x) => write!(f, "{x}"),
            PyValue::Str(s) => write!(f, "{s:?}"),
            PyValue::Bytes(bytes) => write!(f, "b{:?}", String::from_utf8_lossy(bytes)),
            PyValue::List(items) => write_items(f, "[", items, "]"),
            PyValue::Tuple(items) if items.len() == 1 => write!(f, "({},)", items[0]),
            PyValue::Tuple(items) => write_items(f, "(", items, ")"),
            PyValue::Set(items) => write_items(f, "{", items, "}"),
            PyValue::Dict(entries) => {
                write!(f, "{{")?;
                for (index, (k, v)) in entries.iter().enumerate() {
                    if index > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                write!(f, "}}")
            }
            PyValue::Path(record) => write!(f, "RecentPath({:?})", record.abspath),
            PyValue::Opaque(class) => write!(f, "<{class}>"),
        }
    }
}

fn write_items(f: &mut fmt::Formatter<'_>, open: &str, items: &[PyValue], close: &str) -> fmt::Result {
    write!(f, "{open}")?;
    for (index, item) in items.iter().enumerate() {
        if index > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{item}")?;
    }
    write!(f, "{close}")
}

impl From<serde_json::Value> for PyValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => PyValue::None,
            serde_json::Value::Bool(b) => PyValue::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => PyValue::Int(i),
                None => PyValue::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => PyValue::Str(s),
            serde_json::Value::Array(items) => {
                PyValue::List(items.into_iter().map(PyValue::from).collect())
            }
            serde_json::Value::Object(map) => PyValue::Dict(
                map.into_iter()
                    .map(|(k, v)| (PyValue::Str(k), PyValue::from(v)))
                    .collect(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(text: &str) -> PyValue {
        PyValue::Str(text.to_string())
    }

    #[test]
    fn test_get_and_get_path() {
        let value = PyValue::Dict(vec![(
            s("storedsettings"),
            PyValue::Dict(vec![(s("name"), s("impute"))]),
        )]);

        assert_eq!(value.get_path(&["storedsettings", "name"]), Some(&s("impute")));
        assert_eq!(value.get_path(&["storedsettings", "missing"]), None);
        assert_eq!(s("text").get("anything"), None);
    }

    #[test]
    fn test_as_number_follows_python_semantics() {
        assert_eq!(PyValue::Int(5).as_number(), Some(5.0));
        assert_eq!(PyValue::Float(0.5).as_number(), Some(0.5));
        assert_eq!(PyValue::Bool(false).as_number(), Some(0.0));
        assert_eq!(s("5").as_number(), None);
    }

    #[test]
    fn test_find_number_is_case_insensitive_and_depth_first() {
        let value = PyValue::Dict(vec![
            (s("label"), s("CA")),
            (
                s("rows"),
                PyValue::List(vec![
                    PyValue::Dict(vec![(s("ca"), PyValue::Float(0.7))]),
                    PyValue::Dict(vec![(s("CA"), PyValue::Float(0.9))]),
                ]),
            ),
            (s("CA"), PyValue::Float(0.1)),
        ]);

        assert_eq!(value.find_number("CA"), Some(0.7));
        assert_eq!(value.find_number("AUC"), None);
    }

    #[test]
    fn test_find_number_skips_non_numeric_match() {
        let value = PyValue::Dict(vec![
            (s("CA"), s("n/a")),
            (s("nested"), PyValue::Dict(vec![(s("CA"), PyValue::Int(1))])),
        ]);
        assert_eq!(value.find_number("ca"), Some(1.0));
    }

    #[test]
    fn test_path_like_basename() {
        let record = PathRecord {
            abspath: "/home/student/data/iris.tab".to_string(),
            ..PathRecord::default()
        };
        assert_eq!(PathLike::Record(&record).basename(), "iris.tab");
        assert_eq!(PathLike::Plain("heart.csv").basename(), "heart.csv");
    }

    #[test]
    fn test_path_outlives_its_view() {
        let value = PyValue::Str(" /data/iris.tab ".to_string());
        let path = value.as_path_like().unwrap().path().trim();
        assert_eq!(path, "/data/iris.tab");
    }

    #[test]
    fn test_display_uses_python_spelling() {
        let value = PyValue::Dict(vec![
            (s("on"), PyValue::Bool(true)),
            (s("pair"), PyValue::Tuple(vec![PyValue::Int(1)])),
            (s("none"), PyValue::None),
        ]);
        assert_eq!(value.to_string(), r#"{"on": True, "pair": (1,), "none": None}"#);
    }

    #[test]
    fn test_from_json_keeps_key_order() {
        let json: serde_json::Value =
            serde_json::from_str(r#"{"b": 1, "a": [true, null, 2.5]}"#).unwrap();
        let value = PyValue::from(json);

        let keys: Vec<String> = value
            .as_dict()
            .unwrap()
            .iter()
            .map(|(k, _)| k.key_text())
            .collect();
        assert_eq!(keys, vec!["b", "a"]);
        assert_eq!(
            value.get("a"),
            Some(&PyValue::List(vec![
                PyValue::Bool(true),
                PyValue::None,
                PyValue::Float(2.5)
            ]))
        );
    }
}

//! Runtime values.

/// A script value.
///
/// `Fragments` is the "generator-like" value: a sequence of already-rendered
/// text chunks produced by `render_template(..)`. When a template expression
/// evaluates to fragments, the engine splices them into the output stream
/// instead of stringifying the sequence itself.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Fragments(Vec<String>),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None => "none",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::List(_) => "list",
            Value::Fragments(_) => "fragments",
        }
    }

    /// Truthiness: `none`, `false`, zero, the empty string, and the empty
    /// list are false.
    pub fn truthy(&self) -> bool {
        match self {
            Value::None => false,
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Float(n) => *n != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::List(items) => !items.is_empty(),
            Value::Fragments(chunks) => !chunks.is_empty(),
        }
    }

    /// Stringify for template output. `none` contributes nothing, not the
    /// word for it.
    pub fn render(&self) -> String {
        match self {
            Value::None => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Int(n) => n.to_string(),
            Value::Float(n) => n.to_string(),
            Value::Str(s) => s.clone(),
            Value::List(items) => {
                let inner: Vec<String> = items.iter().map(|v| v.repr()).collect();
                format!("[{}]", inner.join(", "))
            }
            Value::Fragments(chunks) => chunks.concat(),
        }
    }

    /// Debug-ish form used for list elements and error messages: strings are
    /// quoted, `none` is spelled out.
    pub fn repr(&self) -> String {
        match self {
            Value::None => "none".to_string(),
            Value::Str(s) => format!("'{s}'"),
            other => other.render(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<Option<String>> for Value {
    fn from(s: Option<String>) -> Self {
        match s {
            Some(s) => Value::Str(s),
            None => Value::None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render() {
        assert_eq!(Value::None.render(), "");
        assert_eq!(Value::Int(2).render(), "2");
        assert_eq!(Value::Bool(true).render(), "true");
        assert_eq!(Value::Str("x".into()).render(), "x");
        assert_eq!(
            Value::List(vec![Value::Int(1), Value::Str("a".into())]).render(),
            "[1, 'a']"
        );
        assert_eq!(
            Value::Fragments(vec!["a".into(), "b".into()]).render(),
            "ab"
        );
    }

    #[test]
    fn test_truthy() {
        assert!(!Value::None.truthy());
        assert!(!Value::Int(0).truthy());
        assert!(!Value::Str(String::new()).truthy());
        assert!(Value::Str("x".into()).truthy());
        assert!(!Value::List(vec![]).truthy());
    }
}

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// A typed ledger document
///
/// Implementors describe the shape of an aggregate. `Default` is the
/// value used when the document has never been written.
pub trait Schema: Serialize + DeserializeOwned + Default + Send + Sync {
    /// Extra invariants serde cannot express
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

/// Outcome of reading a document against a [`Schema`]
#[derive(Debug, Clone, PartialEq)]
pub enum Parsed<T> {
    Ok(T),
    /// The document does not exist yet
    UseDefault,
    /// The document exists but does not match the schema
    Invalid(String),
}

impl<T: Schema> Parsed<T> {
    /// The parsed value, falling back to the default for both absent
    /// and invalid documents
    pub fn or_default(self) -> T {
        match self {
            Parsed::Ok(value) => value,
            Parsed::UseDefault | Parsed::Invalid(_) => T::default(),
        }
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self, Parsed::Invalid(_))
    }
}

/// Parse a raw document without ever failing
pub fn parse_or_default<T: Schema>(raw: Option<Value>) -> Parsed<T> {
    let Some(raw) = raw else {
        return Parsed::UseDefault;
    };
    // some writers store `null` to clear a key
    if raw.is_null() {
        return Parsed::UseDefault;
    }
    match serde_json::from_value::<T>(raw) {
        Ok(value) => match value.validate() {
            Ok(()) => Parsed::Ok(value),
            Err(reason) => Parsed::Invalid(reason),
        },
        Err(e) => Parsed::Invalid(e.to_string()),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    struct Names {
        names: Vec<String>,
    }

    impl Schema for Names {
        fn validate(&self) -> Result<(), String> {
            if self.names.iter().any(|n| n.is_empty()) {
                return Err("empty name".into());
            }
            Ok(())
        }
    }

    #[test]
    fn test_absent_uses_default() {
        assert_eq!(parse_or_default::<Names>(None), Parsed::UseDefault);
        assert_eq!(parse_or_default::<Names>(Some(Value::Null)), Parsed::UseDefault);
    }

    #[test]
    fn test_valid_document() {
        let parsed = parse_or_default::<Names>(Some(json!({"names": ["a", "b"]})));
        assert_eq!(
            parsed,
            Parsed::Ok(Names {
                names: vec!["a".into(), "b".into()]
            })
        );
    }

    #[test]
    fn test_shape_mismatch_is_invalid() {
        let parsed = parse_or_default::<Names>(Some(json!({"names": "nope"})));
        assert!(parsed.is_invalid());
        assert_eq!(parsed.or_default(), Names::default());
    }

    #[test]
    fn test_failed_validation_is_invalid() {
        let parsed = parse_or_default::<Names>(Some(json!({"names": ["a", ""]})));
        assert_eq!(parsed, Parsed::Invalid("empty name".into()));
    }
}

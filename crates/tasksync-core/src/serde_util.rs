//! Wire-format helpers shared by the model types.

use serde::{Deserialize, Deserializer};

/// Flags the service encodes as `0`/`1`. Booleans and `null` are accepted on
/// read; writes always produce integers.
pub mod int_bool {
    use std::fmt;

    use serde::de::{self, Visitor};
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(u8::from(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        deserializer.deserialize_any(IntBoolVisitor)
    }

    struct IntBoolVisitor;

    impl<'de> Visitor<'de> for IntBoolVisitor {
        type Value = bool;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("0, 1, true, false or null")
        }

        fn visit_bool<E: de::Error>(self, value: bool) -> Result<bool, E> {
            Ok(value)
        }

        fn visit_u64<E: de::Error>(self, value: u64) -> Result<bool, E> {
            match value {
                0 => Ok(false),
                1 => Ok(true),
                other => Err(E::custom(format!(
                    "could not read {other} as an int bool"
                ))),
            }
        }

        fn visit_i64<E: de::Error>(self, value: i64) -> Result<bool, E> {
            match value {
                0 => Ok(false),
                1 => Ok(true),
                other => Err(E::custom(format!(
                    "could not read {other} as an int bool"
                ))),
            }
        }

        fn visit_unit<E: de::Error>(self) -> Result<bool, E> {
            Ok(false)
        }

        fn visit_none<E: de::Error>(self) -> Result<bool, E> {
            Ok(false)
        }
    }
}

/// Treats an explicit `null` like a missing field.
pub fn null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

pub fn is_false(value: &bool) -> bool {
    !*value
}

pub fn is_zero(value: &i64) -> bool {
    *value == 0
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    use super::*;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Flags {
        #[serde(default, with = "int_bool")]
        checked: bool,
        #[serde(default, deserialize_with = "null_default")]
        labels: Vec<String>,
    }

    #[test]
    fn int_bool_reads_ints_bools_and_null() {
        let flags: Flags = serde_json::from_str(r#"{"checked": 1}"#).expect("int");
        assert!(flags.checked);
        let flags: Flags = serde_json::from_str(r#"{"checked": false}"#).expect("bool");
        assert!(!flags.checked);
        let flags: Flags = serde_json::from_str(r#"{"checked": null}"#).expect("null");
        assert!(!flags.checked);
        assert!(serde_json::from_str::<Flags>(r#"{"checked": 2}"#).is_err());
    }

    #[test]
    fn int_bool_writes_integers() {
        let flags = Flags {
            checked: true,
            labels: Vec::new(),
        };
        let json = serde_json::to_string(&flags).expect("json");
        assert_eq!(json, r#"{"checked":1,"labels":[]}"#);
    }

    #[test]
    fn null_collections_become_empty() {
        let flags: Flags = serde_json::from_str(r#"{"labels": null}"#).expect("null list");
        assert!(flags.labels.is_empty());
    }
}

use alloy::primitives::{Address, Bytes, I256, U256};
use alloy_dyn_abi::DynSolValue;
use serde::ser::{Serialize, SerializeSeq, Serializer};

/// A decoded ABI argument, tagged by its Solidity kind.
///
/// Lossless by construction: integers serialize as JSON numbers when they
/// fit a 64-bit type and as decimal strings otherwise, binary values as
/// `0x`-prefixed lower-case hex, and sequences as ordered JSON arrays —
/// matching the `decoded_args` encoding spec.md requires for persistence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// An unsigned integer of any ABI width.
    Uint(U256),
    /// A signed integer of any ABI width.
    Int(I256),
    /// A 20-byte contract/EOA address.
    Address(Address),
    /// Arbitrary-length or fixed-length byte data.
    Bytes(Bytes),
    /// A boolean.
    Bool(bool),
    /// A UTF-8 string.
    String(String),
    /// A dynamic or fixed-size array.
    Array(Vec<Value>),
    /// A tuple or struct.
    Tuple(Vec<Value>),
}

impl Value {
    /// Converts an `alloy_dyn_abi` decode result into our persistence-facing
    /// representation.
    pub fn from_dyn_sol_value(value: &DynSolValue) -> Self {
        match value {
            DynSolValue::Bool(b) => Value::Bool(*b),
            DynSolValue::Int(i, _) => Value::Int(*i),
            DynSolValue::Uint(u, _) => Value::Uint(*u),
            DynSolValue::FixedBytes(word, size) => {
                Value::Bytes(Bytes::copy_from_slice(&word.0[..*size]))
            }
            DynSolValue::Address(a) => Value::Address(*a),
            DynSolValue::Function(f) => Value::Bytes(Bytes::copy_from_slice(f.as_slice())),
            DynSolValue::Bytes(b) => Value::Bytes(Bytes::copy_from_slice(b)),
            DynSolValue::String(s) => Value::String(s.clone()),
            DynSolValue::Array(items) | DynSolValue::FixedArray(items) => {
                Value::Array(items.iter().map(Value::from_dyn_sol_value).collect())
            }
            DynSolValue::Tuple(items) => {
                Value::Tuple(items.iter().map(Value::from_dyn_sol_value).collect())
            }
            DynSolValue::CustomStruct { tuple, .. } => {
                Value::Tuple(tuple.iter().map(Value::from_dyn_sol_value).collect())
            }
        }
    }

    /// Best-effort string form, used for the `event_indexed_args.arg_value`
    /// column, which spec.md defines as a plain string regardless of kind.
    pub fn to_indexed_string(&self) -> String {
        match self {
            Value::Uint(u) => u.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Address(a) => format!("{a:#x}"),
            Value::Bytes(b) => format!("0x{}", hex::encode(b)),
            Value::Bool(b) => b.to_string(),
            Value::String(s) => s.clone(),
            Value::Array(_) | Value::Tuple(_) => {
                serde_json::to_string(self).unwrap_or_default()
            }
        }
    }

    /// Returns the inner integer as `u64` if it fits, used by state-fold
    /// handlers that expect plain counters (ticket counts, amounts).
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::Uint(u) => u64::try_from(*u).ok(),
            Value::Int(i) if !i.is_negative() => u64::try_from(*i).ok(),
            _ => None,
        }
    }

    /// Returns the inner value as a lower-cased `0x` address string, used by
    /// handlers that treat an argument as a player/holder address.
    pub fn as_address_string(&self) -> Option<String> {
        match self {
            Value::Address(a) => Some(format!("{a:#x}")),
            Value::String(s) if s.starts_with("0x") => Some(s.to_ascii_lowercase()),
            _ => None,
        }
    }

    /// True if this value is, or stringifies to, the zero address.
    pub fn is_zero_address(&self) -> bool {
        self.as_address_string().as_deref() == Some("0x0000000000000000000000000000000000000000")
    }
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::Uint(u) => match u64::try_from(*u) {
                Ok(small) => serializer.serialize_u64(small),
                Err(_) => serializer.serialize_str(&u.to_string()),
            },
            Value::Int(i) => match i64::try_from(*i) {
                Ok(small) => serializer.serialize_i64(small),
                Err(_) => serializer.serialize_str(&i.to_string()),
            },
            Value::Address(a) => serializer.serialize_str(&format!("{a:#x}")),
            Value::Bytes(b) => serializer.serialize_str(&format!("0x{}", hex::encode(b))),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::String(s) => serializer.serialize_str(s),
            Value::Array(items) | Value::Tuple(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
        }
    }
}

/// Decoded arguments in ABI input order (insertion order, not sorted) so
/// `decoded_args` JSON round-trips deterministically regardless of hash-map
/// iteration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedArgs(pub Vec<(String, Value)>);

impl DecodedArgs {
    /// Returns the value for `name`, if present.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    /// Returns the value for the first of `names` that is present.
    pub fn get_first(&self, names: &[&str]) -> Option<&Value> {
        names.iter().find_map(|name| self.get(name))
    }

    /// Whether `name` is present among the decoded arguments.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Iterates `(name, value)` pairs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &(String, Value)> {
        self.0.iter()
    }
}

impl Serialize for DecodedArgs {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, value) in &self.0 {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn large_uint_serializes_as_decimal_string() {
        let value = Value::Uint(U256::MAX);
        let json = serde_json::to_string(&value).unwrap();
        assert_eq!(json, format!("\"{}\"", U256::MAX));
    }

    #[test]
    fn small_uint_serializes_as_number() {
        let value = Value::Uint(U256::from(42u64));
        assert_eq!(serde_json::to_string(&value).unwrap(), "42");
    }

    #[test]
    fn bytes_serialize_as_lowercase_hex() {
        let value = Value::Bytes(Bytes::from(vec![0xAB, 0xCD]));
        assert_eq!(serde_json::to_string(&value).unwrap(), "\"0xabcd\"");
    }

    #[test]
    fn decoded_args_preserve_insertion_order() {
        let args = DecodedArgs(vec![
            ("b".to_string(), Value::Bool(true)),
            ("a".to_string(), Value::Bool(false)),
        ]);
        let json = serde_json::to_string(&args).unwrap();
        assert_eq!(json, r#"{"b":true,"a":false}"#);
    }
}

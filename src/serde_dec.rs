//! Serde adapters that move big integers over the wire as base-10 strings,
//! avoiding platform numeric limits on the receiving side.

use num_bigint::BigUint;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serializer};

pub fn serialize<S: Serializer>(value: &BigUint, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&value.to_str_radix(10))
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BigUint, D::Error> {
    let s = String::deserialize(deserializer)?;
    parse_decimal(&s).map_err(D::Error::custom)
}

pub fn parse_decimal(s: &str) -> Result<BigUint, String> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(format!("invalid decimal integer: {:?}", s));
    }
    BigUint::parse_bytes(s.as_bytes(), 10)
        .ok_or_else(|| format!("invalid decimal integer: {:?}", s))
}

/// `#[serde(with = "...")]` adapter for `Vec<BigUint>`.
pub mod vec {
    use super::*;

    pub fn serialize<S: Serializer>(values: &[BigUint], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(values.iter().map(|v| v.to_str_radix(10)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<BigUint>, D::Error> {
        let raw: Vec<String> = Vec::deserialize(deserializer)?;
        raw.iter()
            .map(|s| parse_decimal(s).map_err(D::Error::custom))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    struct Wrapper {
        #[serde(with = "crate::serde_dec")]
        value: BigUint,
        #[serde(with = "crate::serde_dec::vec")]
        values: Vec<BigUint>,
    }

    #[test]
    fn round_trips_as_decimal_strings() {
        let w = Wrapper {
            value: BigUint::parse_bytes(b"123456789012345678901234567890", 10).unwrap(),
            values: vec![BigUint::from(0u32), BigUint::from(42u32)],
        };
        let json = serde_json::to_string(&w).unwrap();
        assert!(json.contains("\"123456789012345678901234567890\""));
        assert!(json.contains("\"0\""));
        assert_eq!(serde_json::from_str::<Wrapper>(&json).unwrap(), w);
    }

    #[test]
    fn rejects_non_decimal_input() {
        assert!(serde_json::from_str::<Wrapper>(r#"{"value":"12x","values":[]}"#).is_err());
        assert!(serde_json::from_str::<Wrapper>(r#"{"value":"","values":[]}"#).is_err());
        assert!(serde_json::from_str::<Wrapper>(r#"{"value":"-4","values":[]}"#).is_err());
    }
}

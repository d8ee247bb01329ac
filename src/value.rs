use crate::field::FieldSpec;
use std::{
    collections::{BTreeMap, HashMap},
    hash::Hash,
    net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr},
    num::{NonZeroU16, NonZeroU32, NonZeroU64, NonZeroUsize},
    path::PathBuf,
    str::FromStr,
    time::Duration,
};

/// Conversion from a raw environment string to a field value
///
/// Implement this for custom types that need more than `FromStr`, or mark the
/// field with `#[field(from_str)]` to go through `FromStr` instead.
pub trait EnvValue: Sized {
    /// Convert `raw`. The error is a short human-readable reason.
    fn from_env_value(raw: &str, spec: &FieldSpec) -> Result<Self, String>;
}

/// Parse `raw` through `FromStr`, turning the error into a reason string
pub fn parse_from_str<T>(raw: &str) -> Result<T, String>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse::<T>().map_err(|e| e.to_string())
}

macro_rules! impl_env_value_from_str {
    ($($ty:ty),* $(,)?) => {
        $(
            impl EnvValue for $ty {
                fn from_env_value(raw: &str, _spec: &FieldSpec) -> Result<Self, String> {
                    parse_from_str(raw)
                }
            }
        )*
    };
}

impl_env_value_from_str!(
    i8, i16, i32, i64, i128, isize,
    u8, u16, u32, u64, u128, usize,
    f32, f64, char,
    NonZeroU16, NonZeroU32, NonZeroU64, NonZeroUsize,
    IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr,
);

impl EnvValue for String {
    fn from_env_value(raw: &str, _spec: &FieldSpec) -> Result<Self, String> {
        Ok(raw.to_string())
    }
}

impl EnvValue for PathBuf {
    fn from_env_value(raw: &str, _spec: &FieldSpec) -> Result<Self, String> {
        Ok(PathBuf::from(raw))
    }
}

impl EnvValue for bool {
    fn from_env_value(raw: &str, _spec: &FieldSpec) -> Result<Self, String> {
        match raw {
            "1" | "t" | "T" | "true" | "TRUE" | "True" => Ok(true),
            "0" | "f" | "F" | "false" | "FALSE" | "False" => Ok(false),
            _ => Err("expected one of 1, t, true, 0, f, false".to_string()),
        }
    }
}

impl EnvValue for Duration {
    fn from_env_value(raw: &str, _spec: &FieldSpec) -> Result<Self, String> {
        humantime::parse_duration(raw).map_err(|e| e.to_string())
    }
}

impl<T: EnvValue> EnvValue for Option<T> {
    fn from_env_value(raw: &str, spec: &FieldSpec) -> Result<Self, String> {
        T::from_env_value(raw, spec).map(Some)
    }
}

impl<T: EnvValue> EnvValue for Vec<T> {
    fn from_env_value(raw: &str, spec: &FieldSpec) -> Result<Self, String> {
        if raw.is_empty() {
            return Ok(Vec::new());
        }

        raw.split(spec.delimiter())
            .enumerate()
            .map(|(i, item)| {
                T::from_env_value(item, spec).map_err(|e| format!("element {i} ('{item}'): {e}"))
            })
            .collect()
    }
}

fn split_entries<'a>(raw: &'a str, spec: &FieldSpec) -> Result<Vec<(&'a str, &'a str)>, String> {
    if raw.is_empty() {
        return Ok(Vec::new());
    }

    let separator = spec.key_value_separator();
    raw.split(spec.delimiter())
        .map(|entry| {
            entry
                .split_once(separator)
                .ok_or_else(|| format!("entry '{entry}' is missing separator '{separator}'"))
        })
        .collect()
}

impl<K, V> EnvValue for HashMap<K, V>
where
    K: EnvValue + Eq + Hash,
    V: EnvValue,
{
    fn from_env_value(raw: &str, spec: &FieldSpec) -> Result<Self, String> {
        split_entries(raw, spec)?
            .into_iter()
            .map(|(k, v)| -> Result<(K, V), String> {
                Ok((K::from_env_value(k, spec)?, V::from_env_value(v, spec)?))
            })
            .collect()
    }
}

impl<K, V> EnvValue for BTreeMap<K, V>
where
    K: EnvValue + Ord,
    V: EnvValue,
{
    fn from_env_value(raw: &str, spec: &FieldSpec) -> Result<Self, String> {
        split_entries(raw, spec)?
            .into_iter()
            .map(|(k, v)| -> Result<(K, V), String> {
                Ok((K::from_env_value(k, spec)?, V::from_env_value(v, spec)?))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPEC: FieldSpec = FieldSpec::new("value", "VALUE");

    #[test]
    fn test_parse_integers() {
        assert_eq!(u16::from_env_value("8080", &SPEC), Ok(8080));
        assert_eq!(i64::from_env_value("-42", &SPEC), Ok(-42));
        assert!(u8::from_env_value("256", &SPEC).is_err());
        assert!(i32::from_env_value("notanumber", &SPEC).is_err());
    }

    #[test]
    fn test_parse_floats() {
        assert_eq!(f64::from_env_value("0.25", &SPEC), Ok(0.25));
        assert!(f32::from_env_value("quarter", &SPEC).is_err());
    }

    #[test]
    fn test_parse_bool_accepted_spellings() {
        for raw in ["1", "t", "T", "true", "TRUE", "True"] {
            assert_eq!(bool::from_env_value(raw, &SPEC), Ok(true), "{raw}");
        }
        for raw in ["0", "f", "F", "false", "FALSE", "False"] {
            assert_eq!(bool::from_env_value(raw, &SPEC), Ok(false), "{raw}");
        }
        assert!(bool::from_env_value("yes", &SPEC).is_err());
        assert!(bool::from_env_value("", &SPEC).is_err());
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(
            Duration::from_env_value("1h 30m", &SPEC),
            Ok(Duration::from_secs(5400))
        );
        assert_eq!(
            Duration::from_env_value("250ms", &SPEC),
            Ok(Duration::from_millis(250))
        );
        assert!(Duration::from_env_value("soon", &SPEC).is_err());
    }

    #[test]
    fn test_parse_string_keeps_empty() {
        assert_eq!(String::from_env_value("", &SPEC), Ok(String::new()));
    }

    #[test]
    fn test_parse_socket_addr() {
        let addr = SocketAddr::from_env_value("127.0.0.1:8080", &SPEC).unwrap();
        assert_eq!(addr.port(), 8080);
    }

    #[test]
    fn test_parse_option() {
        assert_eq!(Option::<u16>::from_env_value("80", &SPEC), Ok(Some(80)));
        assert!(Option::<u16>::from_env_value("eighty", &SPEC).is_err());
    }

    #[test]
    fn test_parse_vec_default_delimiter() {
        let hosts = Vec::<String>::from_env_value("a,b,c", &SPEC).unwrap();
        assert_eq!(hosts, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_parse_vec_custom_delimiter() {
        let spec = FieldSpec::new("ports", "PORTS").with_delimiter(";");
        let ports = Vec::<u16>::from_env_value("80;443", &spec).unwrap();
        assert_eq!(ports, vec![80, 443]);
    }

    #[test]
    fn test_parse_vec_empty_is_empty() {
        assert!(Vec::<u16>::from_env_value("", &SPEC).unwrap().is_empty());
    }

    #[test]
    fn test_parse_vec_reports_element() {
        let err = Vec::<u16>::from_env_value("80,http", &SPEC).unwrap_err();
        assert!(err.contains("element 1"));
        assert!(err.contains("'http'"));
    }

    #[test]
    fn test_parse_map() {
        let map = HashMap::<String, u32>::from_env_value("a:1,b:2", &SPEC).unwrap();
        assert_eq!(map.get("a"), Some(&1));
        assert_eq!(map.get("b"), Some(&2));
    }

    #[test]
    fn test_parse_map_missing_separator() {
        let err = BTreeMap::<String, u32>::from_env_value("a:1,b", &SPEC).unwrap_err();
        assert!(err.contains("missing separator"));
    }

    #[test]
    fn test_parse_from_str_helper() {
        let value: u32 = parse_from_str("7").unwrap();
        assert_eq!(value, 7);
        assert!(parse_from_str::<u32>("seven").is_err());
    }
}

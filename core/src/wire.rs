//! JSON wire representation shared by every replicated message.
//!
//! Closed unions travel as JSON objects carrying a numeric `type`
//! discriminant next to the variant's own fields. Field-less enumerations
//! travel as their numeric code. Nothing is ever encoded as an enum name.

use serde_json::{Map, Value};
use thiserror::Error;

/// Field that carries the numeric discriminant of a tagged union.
pub(crate) const TYPE_FIELD: &str = "type";

/// Reports a numeric code that does not name any variant of a wire enumeration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[error("unknown {kind} code {code}")]
pub struct UnknownCode {
    /// Name of the enumeration being decoded.
    pub kind: &'static str,
    /// Code found on the wire.
    pub code: u8,
}

#[derive(Debug, Error)]
pub(crate) enum ShapeError {
    #[error("variant bodies must serialize to JSON objects")]
    NotAnObject,
    #[error("missing numeric `type` field")]
    MissingType,
}

/// Adds the numeric discriminant to a serialized variant body.
pub(crate) fn tag_object(body: Value, tag: u64) -> Result<Map<String, Value>, ShapeError> {
    let mut map = match body {
        Value::Object(map) => map,
        Value::Null => Map::new(),
        _ => return Err(ShapeError::NotAnObject),
    };
    let _ = map.insert(TYPE_FIELD.to_owned(), Value::from(tag));
    Ok(map)
}

/// Splits a tagged object into its discriminant and the remaining variant body.
pub(crate) fn untag_object(mut map: Map<String, Value>) -> Result<(u64, Value), ShapeError> {
    let tag = map
        .remove(TYPE_FIELD)
        .and_then(|value| value.as_u64())
        .ok_or(ShapeError::MissingType)?;
    Ok((tag, Value::Object(map)))
}

/// Declares a stable `u32` identifier newtype that serializes as a bare number.
macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Clone,
            Copy,
            Debug,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            serde::Serialize,
            serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(u32);

        impl $name {
            /// Creates a new identifier with the provided numeric value.
            #[must_use]
            pub const fn new(value: u32) -> Self {
                Self(value)
            }

            /// Retrieves the numeric representation of the identifier.
            #[must_use]
            pub const fn get(&self) -> u32 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(formatter, "{}", self.0)
            }
        }
    };
}

/// Declares a field-less enumeration that travels as its numeric code.
macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $($(#[$variant_meta:meta])* $variant:ident = $code:literal,)+
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        #[serde(into = "u8", try_from = "u8")]
        $vis enum $name {
            $($(#[$variant_meta])* $variant,)+
        }

        impl $name {
            /// Numeric code used on the wire.
            #[must_use]
            pub const fn code(self) -> u8 {
                match self {
                    $(Self::$variant => $code,)+
                }
            }
        }

        impl From<$name> for u8 {
            fn from(value: $name) -> u8 {
                value.code()
            }
        }

        impl TryFrom<u8> for $name {
            type Error = $crate::wire::UnknownCode;

            fn try_from(code: u8) -> Result<Self, Self::Error> {
                match code {
                    $($code => Ok(Self::$variant),)+
                    other => Err($crate::wire::UnknownCode {
                        kind: stringify!($name),
                        code: other,
                    }),
                }
            }
        }
    };
}

/// Declares a closed union whose variants travel as objects with a numeric `type`.
macro_rules! tagged_union {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $($(#[$variant_meta:meta])* $variant:ident($body:ty) = $tag:literal,)+
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq)]
        $vis enum $name {
            $($(#[$variant_meta])* $variant($body),)+
        }

        impl $name {
            /// Numeric discriminant written to the `type` field on the wire.
            #[must_use]
            pub const fn type_tag(&self) -> u64 {
                match self {
                    $(Self::$variant(_) => $tag,)+
                }
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                let body = match self {
                    $(Self::$variant(body) => serde_json::to_value(body),)+
                }
                .map_err(serde::ser::Error::custom)?;
                let tagged = $crate::wire::tag_object(body, self.type_tag())
                    .map_err(serde::ser::Error::custom)?;
                serde::Serialize::serialize(&tagged, serializer)
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let map = <serde_json::Map<String, serde_json::Value> as serde::Deserialize>::deserialize(
                    deserializer,
                )?;
                let (tag, body) =
                    $crate::wire::untag_object(map).map_err(serde::de::Error::custom)?;
                match tag {
                    $($tag => serde_json::from_value(body)
                        .map(Self::$variant)
                        .map_err(serde::de::Error::custom),)+
                    other => Err(serde::de::Error::custom(format!(
                        "unknown {} type {other}",
                        stringify!($name)
                    ))),
                }
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{tag_object, untag_object};

    #[test]
    fn tag_object_inserts_numeric_type() {
        let tagged = tag_object(json!({ "unit_id": 3 }), 7).expect("object body");
        assert_eq!(tagged.get("type"), Some(&json!(7)));
        assert_eq!(tagged.get("unit_id"), Some(&json!(3)));
    }

    #[test]
    fn untag_object_requires_numeric_type() {
        let map = json!({ "type": "move" })
            .as_object()
            .cloned()
            .expect("object literal");
        assert!(untag_object(map).is_err());
    }

    #[test]
    fn tag_object_rejects_scalar_bodies() {
        assert!(tag_object(json!(5), 1).is_err());
    }
}

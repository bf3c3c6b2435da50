use axum::{
    async_trait,
    extract::{FromRequestParts, Path},
    http::request::Parts,
    RequestPartsExt,
};
use bson::{oid::ObjectId, Bson, Document};
use serde_json::{Map, Value};
use tap::TapFallible;

use crate::error::Error;

/// Parses a path segment into the store's native identifier.
pub fn parse_object_id(id: &str) -> Result<ObjectId, Error> {
    ObjectId::parse_str(id)
        .map_err(|_| Error::InvalidId(id.to_string()))
        .tap_err(|_| tracing::debug!("tried parsing invalid object id {id:?}"))
}

/// Path parameter that must be a valid [`ObjectId`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathObjectId(pub ObjectId);

#[async_trait]
impl<S> FromRequestParts<S> for PathObjectId
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Path(id) = parts.extract::<Path<String>>().await?;

        parse_object_id(&id).map(Self)
    }
}

/// Reads a `limit` query value the way JavaScript's `parseInt` does: leading
/// whitespace and sign, then as many decimal digits as there are.
///
/// Returns `None` for anything that yields no digits or zero.
pub fn parse_limit(raw: &str) -> Option<i64> {
    let raw = raw.trim_start();
    let (negative, digits) = match raw.as_bytes().first() {
        Some(b'-') => (true, &raw[1..]),
        Some(b'+') => (false, &raw[1..]),
        _ => (false, raw),
    };

    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());

    let value = digits[..end].parse::<i64>().ok()?;
    match value {
        0 => None,
        value if negative => Some(-value),
        value => Some(value),
    }
}

/// Converts a request body value to BSON. Integers keep the narrowest
/// integer type that holds them; anything past `i64` is stored as a double,
/// the way a JavaScript client's numbers would be.
pub fn json_to_bson(value: Value) -> Bson {
    match value {
        Value::Null => Bson::Null,
        Value::Bool(boolean) => Bson::Boolean(boolean),
        Value::Number(number) => match (number.as_i64(), number.as_u64()) {
            (Some(int), _) => i32::try_from(int)
                .map(Bson::Int32)
                .unwrap_or(Bson::Int64(int)),
            (None, Some(uint)) => Bson::Double(uint as f64),
            (None, None) => Bson::Double(number.as_f64().unwrap_or(f64::NAN)),
        },
        Value::String(string) => Bson::String(string),
        Value::Array(items) => Bson::Array(items.into_iter().map(json_to_bson).collect()),
        Value::Object(map) => Bson::Document(json_to_document(map)),
    }
}

pub fn json_to_document(body: Map<String, Value>) -> Document {
    body.into_iter()
        .map(|(key, value)| (key, json_to_bson(value)))
        .collect()
}

/// Renders a BSON value as plain JSON. Identifiers become hex strings and
/// dates become RFC 3339 strings, matching what a JSON client expects to see.
pub fn bson_to_json(value: Bson) -> Value {
    match value {
        Bson::Document(doc) => document_to_json(doc),
        Bson::Array(items) => Value::Array(items.into_iter().map(bson_to_json).collect()),
        Bson::ObjectId(id) => Value::String(id.to_hex()),
        Bson::DateTime(date) => date
            .try_to_rfc3339_string()
            .map(Value::String)
            .unwrap_or_else(|_| Bson::DateTime(date).into_relaxed_extjson()),
        Bson::Double(number) => serde_json::Number::from_f64(number)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        Bson::Int32(number) => Value::from(number),
        Bson::Int64(number) => Value::from(number),
        Bson::String(string) => Value::String(string),
        Bson::Boolean(boolean) => Value::Bool(boolean),
        Bson::Null | Bson::Undefined => Value::Null,
        other => other.into_relaxed_extjson(),
    }
}

pub fn document_to_json(doc: Document) -> Value {
    Value::Object(
        doc.into_iter()
            .map(|(key, value)| (key, bson_to_json(value)))
            .collect(),
    )
}

pub(crate) mod bson_as_json {
    use bson::Bson;
    use serde::{Serialize, Serializer};

    pub fn serialize<S>(value: &Bson, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        super::bson_to_json(value.clone()).serialize(serializer)
    }
}

pub(crate) mod option_bson_as_json {
    use bson::Bson;
    use serde::{Serialize, Serializer};

    pub fn serialize<S>(value: &Option<Bson>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value
            .clone()
            .map(super::bson_to_json)
            .serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use bson::{doc, oid::ObjectId, Bson};
    use serde_json::json;

    use crate::error::Error;

    use super::{
        bson_to_json, document_to_json, json_to_bson, json_to_document, parse_limit,
        parse_object_id,
    };

    #[test]
    fn test_parse_limit_follows_parse_int() {
        assert_eq!(parse_limit("5"), Some(5));
        assert_eq!(parse_limit("  12"), Some(12));
        assert_eq!(parse_limit("5abc"), Some(5));
        assert_eq!(parse_limit("3.9"), Some(3));
        assert_eq!(parse_limit("+7"), Some(7));
        assert_eq!(parse_limit("-2"), Some(-2));
    }

    #[test]
    fn test_parse_limit_without_limit() {
        for raw in ["", "0", "000", "abc", "-", "x5", "-0"] {
            assert_eq!(parse_limit(raw), None, "{raw:?} should mean no limit");
        }
    }

    #[test]
    fn test_parse_object_id() {
        let id = ObjectId::new();
        assert_eq!(parse_object_id(&id.to_hex()).unwrap(), id);

        let err = parse_object_id("not-an-id").expect_err("should reject malformed id");
        assert_matches!(err, Error::InvalidId(ref raw) if raw == "not-an-id");
    }

    #[test]
    fn test_object_id_renders_as_hex() {
        let id = ObjectId::new();
        assert_eq!(bson_to_json(Bson::ObjectId(id)), json!(id.to_hex()));
    }

    #[test]
    fn test_body_keeps_its_shape() {
        let body = json!({
            "name": "Chronograph",
            "price": 250,
            "discount": 0.5,
            "tags": ["steel", "sport"],
            "stock": { "warehouse": 3 },
            "featured": true,
            "image": null,
        });

        let doc = json_to_document(body.as_object().unwrap().clone());
        assert_eq!(doc.get_str("name").unwrap(), "Chronograph");
        assert_eq!(document_to_json(doc), body);
    }

    #[test]
    fn test_number_widths() {
        assert_eq!(json_to_bson(json!(7)), Bson::Int32(7));
        assert_eq!(json_to_bson(json!(-7)), Bson::Int32(-7));
        assert_eq!(json_to_bson(json!(5_000_000_000_i64)), Bson::Int64(5_000_000_000));
        assert_eq!(json_to_bson(json!(i64::MAX)), Bson::Int64(i64::MAX));
        assert_eq!(json_to_bson(json!(1.25)), Bson::Double(1.25));
    }

    #[test]
    fn test_integers_past_i64_become_doubles() {
        let body = json!({ "sku": u64::MAX, "tags": [u64::MAX] });

        let doc = json_to_document(body.as_object().unwrap().clone());
        assert_eq!(doc.get("sku"), Some(&Bson::Double(u64::MAX as f64)));
        assert_eq!(
            doc.get_array("tags").unwrap(),
            &vec![Bson::Double(u64::MAX as f64)]
        );
    }

    #[test]
    fn test_nested_documents_render() {
        let id = ObjectId::new();
        let rendered = document_to_json(doc! {
            "_id": id,
            "items": [{ "ref": id, "count": 2_i32 }],
        });

        assert_eq!(
            rendered,
            json!({ "_id": id.to_hex(), "items": [{ "ref": id.to_hex(), "count": 2 }] })
        );
    }
}

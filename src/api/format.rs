use mongodb::bson::{self, Bson, Document};
use serde::Serialize;
use serde_json::{Map, Number, Value};

use crate::database::models::{User, PRIVATE_USER_FIELDS};
use crate::error::ApiError;

/// Convert a BSON value into the public wire format.
///
/// ObjectIds become their hex string and dates become RFC 3339 strings, so
/// clients never see extended-JSON wrappers like `{"$oid": ...}`.
pub fn bson_to_json(value: Bson) -> Value {
    match value {
        Bson::Null | Bson::Undefined => Value::Null,
        Bson::Boolean(b) => Value::Bool(b),
        Bson::Int32(n) => Value::from(n),
        Bson::Int64(n) => Value::from(n),
        Bson::Double(f) => Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null),
        Bson::String(s) => Value::String(s),
        Bson::ObjectId(id) => Value::String(id.to_hex()),
        Bson::DateTime(dt) => match dt.try_to_rfc3339_string() {
            Ok(s) => Value::String(s),
            Err(_) => Value::from(dt.timestamp_millis()),
        },
        Bson::Array(items) => Value::Array(items.into_iter().map(bson_to_json).collect()),
        Bson::Document(doc) => document_to_json(doc),
        Bson::Decimal128(d) => Value::String(d.to_string()),
        other => other.into_relaxed_extjson(),
    }
}

/// Convert a document, dropping private user fields wherever they appear.
/// Joined owner documents pass through here too, so a projection that forgot
/// to exclude `password` still never leaks it.
pub fn document_to_json(doc: Document) -> Value {
    let mut map = Map::with_capacity(doc.len());
    for (key, value) in doc {
        if PRIVATE_USER_FIELDS.contains(&key.as_str()) {
            continue;
        }
        map.insert(key, bson_to_json(value));
    }
    Value::Object(map)
}

pub fn documents_to_json(docs: Vec<Document>) -> Value {
    Value::Array(docs.into_iter().map(document_to_json).collect())
}

/// Serialize a model through BSON so ids and dates get the wire format above
pub fn model_to_json<T: Serialize>(model: &T) -> Result<Value, ApiError> {
    let doc = bson::to_document(model).map_err(|e| {
        tracing::error!("Failed to convert model to BSON: {}", e);
        ApiError::internal_server_error("Failed to serialize response data")
    })?;
    Ok(document_to_json(doc))
}

pub fn models_to_json<T: Serialize>(models: &[T]) -> Result<Value, ApiError> {
    models
        .iter()
        .map(model_to_json)
        .collect::<Result<Vec<_>, _>>()
        .map(Value::Array)
}

/// A user as clients see it: no password hash, no refresh token
pub fn public_user(user: &User) -> Result<Value, ApiError> {
    model_to_json(user)
}

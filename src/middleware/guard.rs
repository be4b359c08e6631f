//! Required-field checks that run before a handler touches the database.
//!
//! Each route declares a `const` [`Schema`] listing its required fields in
//! order. `Schema::check` walks them against any [`FieldSource`] and stops at
//! the first one that is absent, `null`, or blank after trimming.

use std::collections::HashMap;

use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, Request},
    http::header::CONTENT_TYPE,
    Form,
};
use mongodb::bson::oid::ObjectId;
use serde_json::Value;

use crate::error::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    Missing,
    Blank,
    Present,
}

/// Anything a route can read named request fields from
pub trait FieldSource {
    fn presence(&self, name: &str) -> Presence;
}

impl FieldSource for Value {
    fn presence(&self, name: &str) -> Presence {
        match self.get(name) {
            None | Some(Value::Null) => Presence::Missing,
            Some(Value::String(s)) if s.trim().is_empty() => Presence::Blank,
            Some(_) => Presence::Present,
        }
    }
}

impl FieldSource for HashMap<String, String> {
    fn presence(&self, name: &str) -> Presence {
        match self.get(name) {
            None => Presence::Missing,
            Some(s) if s.trim().is_empty() => Presence::Blank,
            Some(_) => Presence::Present,
        }
    }
}

/// A single named path segment, e.g. `PathParam("videoId", &video_id)`
#[derive(Debug, Clone, Copy)]
pub struct PathParam<'a>(pub &'a str, pub &'a str);

impl FieldSource for PathParam<'_> {
    fn presence(&self, name: &str) -> Presence {
        if name != self.0 {
            Presence::Missing
        } else if self.1.trim().is_empty() {
            Presence::Blank
        } else {
            Presence::Present
        }
    }
}

/// Two sources read together; the first that knows the field answers
impl<A: FieldSource, B: FieldSource> FieldSource for (A, B) {
    fn presence(&self, name: &str) -> Presence {
        match self.0.presence(name) {
            Presence::Missing => self.1.presence(name),
            found => found,
        }
    }
}

impl<T: FieldSource + ?Sized> FieldSource for &T {
    fn presence(&self, name: &str) -> Presence {
        (**self).presence(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rule {
    pub field: &'static str,
    pub message: &'static str,
}

pub const fn required(field: &'static str, message: &'static str) -> Rule {
    Rule { field, message }
}

#[derive(Debug, Clone, Copy)]
pub struct Schema {
    rules: &'static [Rule],
}

impl Schema {
    pub const fn new(rules: &'static [Rule]) -> Self {
        Self { rules }
    }

    /// Fail with the first rule, in declaration order, whose field is not present
    pub fn check(&self, source: &impl FieldSource) -> Result<(), ApiError> {
        for rule in self.rules {
            if source.presence(rule.field) != Presence::Present {
                tracing::debug!("Request guard rejected missing field {}", rule.field);
                return Err(ApiError::missing_field(rule.field, rule.message));
            }
        }
        Ok(())
    }
}

/// Parse a path or body identifier, failing with `400 Invalid <field>`
pub fn parse_object_id(field: &str, raw: &str) -> Result<ObjectId, ApiError> {
    ObjectId::parse_str(raw.trim()).map_err(|_| {
        let message = format!("Invalid {}", field);
        ApiError::ValidationError {
            field_errors: vec![crate::error::FieldError {
                field: field.to_string(),
                message: message.clone(),
            }],
            message,
        }
    })
}

/// Trimmed string value of a body field, if it is a string
pub fn text<'a>(body: &'a Value, name: &str) -> Option<&'a str> {
    body.get(name).and_then(Value::as_str).map(str::trim)
}

/// Request body as loose JSON.
///
/// Unlike `axum::Json` this does not insist on a JSON content type, accepts an
/// empty body as `{}`, reads url-encoded forms into a flat object, and turns
/// malformed JSON into the standard 400 error envelope.
#[derive(Debug, Clone)]
pub struct JsonBody(pub Value);

#[async_trait]
impl<S> FromRequest<S> for JsonBody
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_form = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.starts_with("application/x-www-form-urlencoded"))
            .unwrap_or(false);

        if is_form {
            let Form(fields) = Form::<HashMap<String, String>>::from_request(req, state)
                .await
                .map_err(|e| ApiError::bad_request(e.body_text()))?;
            let object = fields.into_iter().map(|(k, v)| (k, Value::String(v))).collect();
            return Ok(JsonBody(Value::Object(object)));
        }

        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| ApiError::bad_request(e.body_text()))?;

        parse_body(&bytes).map(JsonBody)
    }
}

fn parse_body(bytes: &[u8]) -> Result<Value, ApiError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(Default::default()));
    }
    serde_json::from_slice(bytes).map_err(|e| {
        tracing::warn!("Rejected malformed JSON body: {}", e);
        ApiError::invalid_json(format!("Malformed JSON in request body: {}", e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const CREDENTIALS: Schema = Schema::new(&[
        required("username", "Username is required"),
        required("password", "Password is required"),
    ]);

    #[test]
    fn first_missing_field_wins() {
        let err = CREDENTIALS.check(&json!({})).unwrap_err();
        assert_eq!(err.message(), "Username is required");

        let err = CREDENTIALS.check(&json!({ "username": "bob" })).unwrap_err();
        assert_eq!(err.message(), "Password is required");
        assert_eq!(err.to_json()["errors"][0]["field"], "password");

        assert!(CREDENTIALS.check(&json!({ "username": "bob", "password": "x" })).is_ok());
    }

    #[test]
    fn null_and_blank_count_as_missing() {
        assert_eq!(json!({ "a": null }).presence("a"), Presence::Missing);
        assert_eq!(json!({ "a": "   " }).presence("a"), Presence::Blank);
        assert_eq!(json!({ "a": 0 }).presence("a"), Presence::Present);
        assert!(CREDENTIALS.check(&json!({ "username": " ", "password": "x" })).is_err());
    }

    #[test]
    fn paired_sources_fall_through() {
        const COMMENT: Schema = Schema::new(&[
            required("videoId", "Video is missing"),
            required("content", "Content is required"),
        ]);
        let id = ObjectId::new().to_hex();
        let body = json!({ "content": "nice" });
        assert!(COMMENT.check(&(PathParam("videoId", &id), &body)).is_ok());

        let err = COMMENT.check(&(PathParam("videoId", ""), &body)).unwrap_err();
        assert_eq!(err.message(), "Video is missing");
    }

    #[test]
    fn form_maps_are_sources() {
        let mut form = HashMap::new();
        form.insert("title".to_string(), "Intro".to_string());
        assert_eq!(form.presence("title"), Presence::Present);
        assert_eq!(form.presence("description"), Presence::Missing);
    }

    #[test]
    fn object_ids_are_parsed_or_rejected() {
        let id = ObjectId::new();
        assert_eq!(parse_object_id("videoId", &id.to_hex()).unwrap(), id);

        let err = parse_object_id("videoId", "nope").unwrap_err();
        assert_eq!(err.status_code(), 400);
        assert_eq!(err.message(), "Invalid videoId");
    }

    #[test]
    fn body_parsing() {
        assert_eq!(parse_body(b"").unwrap(), json!({}));
        assert_eq!(parse_body(b"  \n").unwrap(), json!({}));
        assert_eq!(parse_body(br#"{"a":1}"#).unwrap(), json!({ "a": 1 }));
        assert_eq!(parse_body(b"{nope").unwrap_err().status_code(), 400);
    }

    #[test]
    fn text_trims() {
        let body = json!({ "name": "  Mix  ", "n": 1 });
        assert_eq!(text(&body, "name"), Some("Mix"));
        assert_eq!(text(&body, "n"), None);
    }
}

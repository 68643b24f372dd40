use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Profile returned by the API for the authenticated user.
///
/// The client treats the profile as opaque: whatever fields the server sends
/// are kept verbatim. A few accessors cover the fields every caller needs.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct UserProfile(Map<String, Value>);

impl UserProfile {
    /// Wrap a JSON object as a profile.
    #[must_use]
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Identifier of the user, from `id` or `_id`, rendered as a string.
    #[must_use]
    pub fn id(&self) -> Option<String> {
        ["id", "_id"]
            .iter()
            .find_map(|key| match self.0.get(*key) {
                Some(Value::String(id)) => Some(id.clone()),
                Some(Value::Number(id)) => Some(id.to_string()),
                _ => None,
            })
    }

    /// Display name, if the server sent one.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.0.get("name").and_then(Value::as_str)
    }

    /// Email address, if the server sent one.
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.0.get("email").and_then(Value::as_str)
    }

    /// Raw access to any other field.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// All fields as received.
    #[must_use]
    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl From<Map<String, Value>> for UserProfile {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn profile(value: Value) -> UserProfile {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn numeric_id() {
        let user = profile(json!({ "id": 1, "name": "A" }));
        assert_eq!(user.id().as_deref(), Some("1"));
        assert_eq!(user.name(), Some("A"));
        assert_eq!(user.email(), None);
    }

    #[test]
    fn mongo_style_id() {
        let user = profile(json!({ "_id": "65f0c0ffee", "email": "a@b.com" }));
        assert_eq!(user.id().as_deref(), Some("65f0c0ffee"));
        assert_eq!(user.email(), Some("a@b.com"));
    }

    #[test]
    fn extra_fields_survive_roundtrip() {
        let raw = json!({ "id": "u1", "currency": "INR", "avatar": null });
        let user = profile(raw.clone());

        assert_eq!(user.get("currency"), Some(&json!("INR")));
        assert_eq!(serde_json::to_value(&user).unwrap(), raw);
    }

    #[test]
    fn non_object_is_rejected() {
        assert!(serde_json::from_value::<UserProfile>(json!("nope")).is_err());
    }
}

use serde_json::Value;

/// Reduce an inference response body to plain reply text.
///
/// Accepted shapes, in order: a bare string, an object with a string
/// `output_text`, an object with a string `result`, an object whose
/// `result` is itself a response object, an object with a string
/// `response`. Anything else falls back to its compact JSON serialization
/// so the turn still completes.
#[must_use]
pub fn normalize_reply(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Object(map) => {
            if let Some(Value::String(text)) = map.get("output_text") {
                return text.clone();
            }
            match map.get("result") {
                Some(Value::String(text)) => return text.clone(),
                Some(inner @ Value::Object(_)) => return normalize_reply(inner),
                _ => {}
            }
            if let Some(Value::String(text)) = map.get("response") {
                return text.clone();
            }
            value.to_string()
        }
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn plain_string_passes_through() {
        assert_eq!(normalize_reply(&json!("Rest and hydration.")), "Rest and hydration.");
    }

    #[test]
    fn output_text_wins_over_result() {
        let body = json!({ "output_text": "first", "result": "second" });
        assert_eq!(normalize_reply(&body), "first");
    }

    #[test]
    fn result_string_is_used() {
        assert_eq!(normalize_reply(&json!({ "result": "ok" })), "ok");
    }

    #[test]
    fn rest_envelope_is_unwrapped() {
        let body = json!({
            "result": { "response": "Drink water." },
            "success": true,
            "errors": [],
        });
        assert_eq!(normalize_reply(&body), "Drink water.");
    }

    #[test]
    fn unexpected_shape_falls_back_to_json() {
        let body = json!({ "choices": [] });
        assert_eq!(normalize_reply(&body), r#"{"choices":[]}"#);
        assert_eq!(normalize_reply(&json!(42)), "42");
        assert_eq!(normalize_reply(&Value::Null), "null");
    }
}

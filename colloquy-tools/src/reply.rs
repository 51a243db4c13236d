use colloquy_core::OutputSegment;
use serde::Serialize;

/// Structured tool result: `{"success": bool, ...body, "error"?: string}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolReply<T> {
    pub success: bool,
    #[serde(flatten)]
    pub body: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ToolReply<T> {
    pub fn ok(body: T) -> Self {
        Self {
            success: true,
            body: Some(body),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            body: None,
            error: Some(error.into()),
        }
    }

    /// Format a successful body with `on_success`, or a failure with
    /// `on_failure`.
    pub fn format_with(
        &self,
        on_success: impl FnOnce(&T) -> Vec<OutputSegment>,
        on_failure: impl FnOnce(&str) -> Vec<OutputSegment>,
    ) -> Vec<OutputSegment> {
        match (&self.body, &self.error) {
            (Some(body), None) if self.success => on_success(body),
            (_, Some(error)) => on_failure(error),
            _ => on_failure("Unknown error"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Serialize)]
    struct Body {
        count: usize,
    }

    #[test]
    fn test_success_flattens_body() {
        let value = serde_json::to_value(ToolReply::ok(Body { count: 2 })).expect("serialize");
        assert_eq!(value, json!({"success": true, "count": 2}));
    }

    #[test]
    fn test_failure_carries_error_only() {
        let reply: ToolReply<Body> = ToolReply::failure("Item not found: Lamp");
        let value = serde_json::to_value(&reply).expect("serialize");
        assert_eq!(value, json!({"success": false, "error": "Item not found: Lamp"}));

        let segments = reply.format_with(
            |_| vec![OutputSegment::speakable("ok")],
            |e| vec![OutputSegment::speakable(format!("Error: {}", e))],
        );
        assert_eq!(segments[0].text, "Error: Item not found: Lamp");
    }
}

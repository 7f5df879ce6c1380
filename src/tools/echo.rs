// tools/echo — declarative text tools.

use std::sync::Arc;

use serde_json::json;

use crate::mcp::tool::{Arguments, DeclarativeTool, Tool, ToolParameter, ToolResult};

pub fn tools() -> Vec<Arc<dyn Tool>> {
    vec![Arc::new(echo_tool()), Arc::new(reverse_tool())]
}

fn text_arg(args: &Arguments) -> Result<&str, ToolResult> {
    args.get("text")
        .and_then(|t| t.as_str())
        .ok_or_else(|| ToolResult::error("Missing required parameter: text"))
}

pub fn echo_tool() -> DeclarativeTool {
    DeclarativeTool::new("echo", "Return the given text unchanged.", |args: Arguments| async move {
        match text_arg(&args) {
            Ok(text) => ToolResult::text(text),
            Err(e) => e,
        }
    })
    .param(ToolParameter::required("text", "string", "Text to echo back"))
    .few_shot(json!({ "request": "Repeat after me: hello", "params": { "text": "hello" } }))
}

pub fn reverse_tool() -> DeclarativeTool {
    DeclarativeTool::new(
        "reverse",
        "Reverse the characters of the given text.",
        |args: Arguments| async move {
            match text_arg(&args) {
                Ok(text) => ToolResult::text(text.chars().rev().collect::<String>()),
                Err(e) => e,
            }
        },
    )
    .param(ToolParameter::required("text", "string", "Text to reverse"))
    .negative_few_shot(json!({
        "request": "Sort these words alphabetically",
        "reason": "reverse only flips character order"
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(text: &str) -> Arguments {
        let mut a = Arguments::new();
        a.insert("text".into(), json!(text));
        a
    }

    #[tokio::test]
    async fn echo_returns_input() {
        let out = echo_tool().execute(args("hi")).await.unwrap();
        assert_eq!(out, ToolResult::text("hi"));
    }

    #[tokio::test]
    async fn reverse_handles_unicode() {
        let out = reverse_tool().execute(args("żółw")).await.unwrap();
        assert_eq!(out.content, "włóż");
    }

    #[tokio::test]
    async fn missing_text_is_application_error() {
        let out = echo_tool().execute(Arguments::new()).await.unwrap();
        assert!(out.is_error);
    }
}

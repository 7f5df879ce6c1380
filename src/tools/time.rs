// tools/time — imperative tools reporting the current time.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use serde_json::{Value, json};

use crate::mcp::tool::{Arguments, Tool, ToolError, ToolParameter, ToolResult, build_input_schema};

pub fn tools() -> Vec<Arc<dyn Tool>> {
    vec![Arc::new(GetCurrentTimeTool), Arc::new(GetTimeAtOffsetTool)]
}

/// Render a timestamp as the multi-line report both tools return.
pub fn format_time<Tz: TimeZone>(title: &str, time: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    [
        title.to_string(),
        "=".repeat(50),
        String::new(),
        format!("Time: {}", time.format("%Y-%m-%d %H:%M:%S")),
        format!("Weekday: {}", time.format("%A")),
        format!("UTC Offset: {}", time.format("%:z")),
        format!("Unix Timestamp: {}", time.timestamp()),
        format!("ISO 8601: {}", time.to_rfc3339()),
    ]
    .join("\n")
}

/// Parse `+03:00`, `-0530`, `+3` or `Z` into a fixed offset.
pub fn parse_offset(raw: &str) -> Option<FixedOffset> {
    let raw = raw.trim();
    if !raw.is_ascii() {
        return None;
    }
    if raw.eq_ignore_ascii_case("z") || raw.eq_ignore_ascii_case("utc") {
        return FixedOffset::east_opt(0);
    }

    let (sign, rest) = match raw.as_bytes().first()? {
        b'+' => (1, &raw[1..]),
        b'-' => (-1, &raw[1..]),
        _ => return None,
    };
    let (hours, minutes) = match rest.split_once(':') {
        Some((h, m)) => (h, m),
        None if rest.len() == 4 => rest.split_at(2),
        None => (rest, "0"),
    };
    if hours.is_empty() || !hours.chars().all(|c| c.is_ascii_digit()) || !minutes.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;
    if hours > 14 || minutes >= 60 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

// ── get_current_time ────────────────────────────────────────────────────────

pub struct GetCurrentTimeTool;

#[async_trait]
impl Tool for GetCurrentTimeTool {
    fn name(&self) -> &str {
        "get_current_time"
    }

    fn description(&self) -> &str {
        "Get the current UTC time with weekday, Unix timestamp and ISO 8601 form."
    }

    fn input_schema(&self) -> Value {
        build_input_schema(&[])
    }

    async fn execute(&self, _arguments: Arguments) -> Result<ToolResult, ToolError> {
        Ok(ToolResult::text(format_time("Current UTC Time", &Utc::now())))
    }
}

// ── get_time_at_offset ──────────────────────────────────────────────────────

pub struct GetTimeAtOffsetTool;

#[async_trait]
impl Tool for GetTimeAtOffsetTool {
    fn name(&self) -> &str {
        "get_time_at_offset"
    }

    fn description(&self) -> &str {
        "Get the current local time at a fixed UTC offset such as '+03:00' or '-05:30'."
    }

    fn input_schema(&self) -> Value {
        build_input_schema(&[ToolParameter::required(
            "offset",
            "string",
            "UTC offset, e.g. '+03:00', '-0530', '+9' or 'Z'",
        )])
    }

    fn few_shot_examples(&self) -> Option<Vec<Value>> {
        Some(vec![json!({ "request": "What time is it in Moscow?", "params": { "offset": "+03:00" } })])
    }

    async fn execute(&self, arguments: Arguments) -> Result<ToolResult, ToolError> {
        let raw = arguments
            .get("offset")
            .and_then(|o| o.as_str())
            .map(str::trim)
            .unwrap_or_default();
        if raw.is_empty() {
            return Ok(ToolResult::error("Missing required parameter: offset"));
        }

        let Some(offset) = parse_offset(raw) else {
            return Ok(ToolResult::error(format!(
                "Invalid offset: '{}'. Use forms like '+03:00', '-0530' or 'Z'.",
                raw
            )));
        };

        let now = Utc::now().with_timezone(&offset);
        Ok(ToolResult::text(format_time(&format!("Current Time at UTC{}", offset), &now)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_common_offset_forms() {
        assert_eq!(parse_offset("+03:00").unwrap().local_minus_utc(), 3 * 3600);
        assert_eq!(parse_offset("-0530").unwrap().local_minus_utc(), -(5 * 3600 + 30 * 60));
        assert_eq!(parse_offset("+9").unwrap().local_minus_utc(), 9 * 3600);
        assert_eq!(parse_offset("Z").unwrap().local_minus_utc(), 0);
    }

    #[test]
    fn rejects_malformed_offsets() {
        for raw in ["", "03:00", "+25:00", "+03:75", "+ab", "Europe/Moscow", "+"] {
            assert!(parse_offset(raw).is_none(), "accepted {:?}", raw);
        }
    }

    #[test]
    fn format_time_includes_offset_and_timestamp() {
        let offset = FixedOffset::east_opt(3 * 3600).unwrap();
        let time = offset.with_ymd_and_hms(2024, 11, 5, 12, 30, 0).unwrap();
        let text = format_time("Title", &time);
        assert!(text.starts_with("Title\n"));
        assert!(text.contains("Time: 2024-11-05 12:30:00"));
        assert!(text.contains("Weekday: Tuesday"));
        assert!(text.contains("UTC Offset: +03:00"));
        assert!(text.contains(&format!("Unix Timestamp: {}", time.timestamp())));
    }

    #[tokio::test]
    async fn invalid_offset_is_application_error() {
        let mut args = Arguments::new();
        args.insert("offset".into(), json!("nowhere"));
        let out = GetTimeAtOffsetTool.execute(args).await.unwrap();
        assert!(out.is_error);
        assert!(out.content.contains("Invalid offset"));
    }

    #[test]
    fn rejects_non_ascii_offsets() {
        for raw in ["+1é1", "+é", "−03:00", "+03：00"] {
            assert!(parse_offset(raw).is_none(), "accepted {:?}", raw);
        }
    }

    #[tokio::test]
    async fn multibyte_offset_is_application_error() {
        let mut args = Arguments::new();
        args.insert("offset".into(), json!("+1é1"));
        let out = GetTimeAtOffsetTool.execute(args).await.unwrap();
        assert!(out.is_error);
        assert!(out.content.contains("Invalid offset: '+1é1'"));
    }

    #[tokio::test]
    async fn current_time_reports_utc() {
        let out = GetCurrentTimeTool.execute(Arguments::new()).await.unwrap();
        assert!(!out.is_error);
        assert!(out.content.contains("UTC Offset: +00:00"));
    }
}

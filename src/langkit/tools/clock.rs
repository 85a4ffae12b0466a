// SPDX-License-Identifier: MIT

use crate::adk::error::BoxError;
use crate::adk::tool::FunctionTool;
use chrono::{DateTime, FixedOffset, Utc};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{json, Value};

/// Arguments for the current-time tool
#[derive(Debug, Deserialize, JsonSchema)]
pub struct CurrentTimeArgs {
    /// Offset from UTC in hours, between -12 and 14. Defaults to UTC.
    #[serde(default)]
    pub utc_offset_hours: Option<i32>,
}

/// Render `now` in the requested offset
pub fn format_time(now: DateTime<Utc>, utc_offset_hours: Option<i32>) -> Result<Value, BoxError> {
    let hours = utc_offset_hours.unwrap_or(0);
    if !(-12..=14).contains(&hours) {
        return Err(format!("utc_offset_hours out of range: {}", hours).into());
    }
    let offset = FixedOffset::east_opt(hours * 3600)
        .ok_or_else(|| format!("invalid offset: {}", hours))?;
    let local = now.with_timezone(&offset);

    Ok(json!({
        "iso8601": local.to_rfc3339(),
        "date": local.format("%Y-%m-%d").to_string(),
        "time": local.format("%H:%M:%S").to_string(),
        "utc_offset": offset.to_string(),
    }))
}

pub fn current_time_tool() -> FunctionTool<CurrentTimeArgs> {
    FunctionTool::new(
        "current_time",
        "Get the current date and time, optionally at a fixed UTC offset",
        |args: CurrentTimeArgs| async move { format_time(Utc::now(), args.utc_offset_hours) },
    )
}

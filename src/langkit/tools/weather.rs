// SPDX-License-Identifier: MIT

use crate::adk::error::BoxError;
use crate::adk::tool::Tool;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

const CONDITIONS: [&str; 5] = ["sunny", "cloudy", "foggy", "rainy", "windy"];

// --- Static schema ---

static WEATHER_SCHEMA: Lazy<Value> = Lazy::new(|| {
    json!({
        "type": "object",
        "properties": {
            "location": {
                "type": "string",
                "description": "City or place name, e.g. \"Paris\""
            },
            "unit": {
                "type": "string",
                "enum": ["celsius", "fahrenheit"],
                "description": "Temperature unit (default celsius)"
            }
        },
        "required": ["location"]
    })
});

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TemperatureUnit {
    #[default]
    Celsius,
    Fahrenheit,
}

#[derive(Debug, Deserialize)]
pub struct WeatherArgs {
    pub location: String,
    #[serde(default)]
    pub unit: Option<TemperatureUnit>,
}

/// Canned report derived from the location name, so repeated calls agree
pub fn mock_weather(location: &str, unit: TemperatureUnit) -> Value {
    let seed: u32 = location
        .trim()
        .to_lowercase()
        .bytes()
        .fold(7u32, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u32));
    let celsius = 5 + (seed % 25) as i32;
    let conditions = CONDITIONS[(seed / 25) as usize % CONDITIONS.len()];

    let temperature = match unit {
        TemperatureUnit::Celsius => celsius,
        TemperatureUnit::Fahrenheit => celsius * 9 / 5 + 32,
    };

    json!({
        "location": location.trim(),
        "temperature": temperature,
        "unit": unit,
        "conditions": conditions,
    })
}

/// Weather lookup returning canned data
pub struct WeatherTool;

#[async_trait]
impl Tool for WeatherTool {
    fn name(&self) -> &str {
        "get_weather"
    }

    fn description(&self) -> &str {
        "Get the current weather for a location (mock data)"
    }

    fn schema(&self) -> &Value {
        &WEATHER_SCHEMA
    }

    async fn execute(&self, input: Value) -> Result<Value, BoxError> {
        let args: WeatherArgs = serde_json::from_value(input)?;
        if args.location.trim().is_empty() {
            return Err("location must not be empty".into());
        }
        Ok(mock_weather(&args.location, args.unit.unwrap_or_default()))
    }
}

pub fn weather_tool() -> WeatherTool {
    WeatherTool
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_weather_is_deterministic() {
        let first = mock_weather("Paris", TemperatureUnit::Celsius);
        let second = mock_weather("  paris ", TemperatureUnit::Celsius);
        assert_eq!(first["temperature"], second["temperature"]);
        assert_eq!(first["conditions"], second["conditions"]);
        assert_eq!(first["unit"], "celsius");
    }

    #[test]
    fn test_fahrenheit_conversion() {
        let c = mock_weather("Oslo", TemperatureUnit::Celsius)["temperature"]
            .as_i64()
            .unwrap();
        let f = mock_weather("Oslo", TemperatureUnit::Fahrenheit)["temperature"]
            .as_i64()
            .unwrap();
        assert_eq!(f, c * 9 / 5 + 32);
    }

    #[tokio::test]
    async fn test_weather_tool_execute() {
        let tool = weather_tool();
        let out = tool.execute(json!({"location": "Tokyo"})).await.unwrap();
        assert_eq!(out["location"], "Tokyo");
        assert!(CONDITIONS.contains(&out["conditions"].as_str().unwrap()));

        assert!(tool.execute(json!({"location": " "})).await.is_err());
        assert!(tool.execute(json!({})).await.is_err());
        assert!(tool
            .execute(json!({"location": "Oslo", "unit": "kelvin"}))
            .await
            .is_err());
    }
}

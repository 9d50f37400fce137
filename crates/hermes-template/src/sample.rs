//! Built-in sample conversation.
//!
//! A two-city weather lookup exercising every rendering path: a system
//! instruction with a tool, parallel tool calls, a grouped run of tool
//! results and a closing assistant summary. The CLI renders it with
//! `hermes-template render --sample`, and the renderer's golden test pins
//! its output.

use serde_json::json;

use crate::{Conversation, Message, ToolCall, ToolDef};

pub fn weather_conversation() -> Conversation {
    Conversation::new()
        .with_system("You are a helpful AI assistant specialized in weather forecasting.")
        .with_tool(ToolDef::new(
            "get_weather",
            "Get the current weather for a specific location",
            json!({"date": "string", "location": "string"}),
        ))
        .with_messages([
            Message::user("What's the weather like in New York and LA today?"),
            Message::assistant_tool_calls(vec![
                ToolCall::new("get_weather", r#"{"location": "New York", "date": "today"}"#),
                ToolCall::new(
                    "get_weather",
                    r#"{"location": "Los Angeles", "date": "today"}"#,
                ),
            ])
            .with_content(
                "To provide you with accurate information about the weather in New York and \
                 Los Angeles today, I'll need to check the current weather data for both cities.",
            ),
            Message::tool_result(
                "call-1",
                r#"{"temperature": 72, "condition": "Partly cloudy", "humidity": 65}"#,
            ),
            Message::tool_result(
                "call-2",
                r#"{"temperature": 85, "condition": "Sunny", "humidity": 30}"#,
            ),
            Message::assistant_text(
                "Based on the current weather data, the weather in New York today is partly \
                 cloudy with a temperature of 72°F and humidity at 65%. In Los Angeles, it's \
                 sunny with a temperature of 85°F and humidity at 30%.",
            ),
        ])
        .with_prompt("Please provide the weather details.")
        .with_response("Here's the weather information.")
}

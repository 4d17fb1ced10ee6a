//! Tool inventory and selection

use crate::util::extract_json_object;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A tool exposed by one tool server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub server: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub input_schema: Value,
}

impl ToolDescriptor {
    pub fn new(
        server: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            server: server.into(),
            name: name.into(),
            description: description.into(),
            input_schema: Value::Null,
        }
    }

    pub fn with_input_schema(mut self, schema: Value) -> Self {
        self.input_schema = schema;
        self
    }
}

/// Every tool currently available across all servers
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ToolInventory(Vec<ToolDescriptor>);

impl ToolInventory {
    pub fn new(tools: Vec<ToolDescriptor>) -> Self {
        Self(tools)
    }

    pub fn tools(&self) -> &[ToolDescriptor] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn find(&self, server: &str, tool: &str) -> Option<&ToolDescriptor> {
        self.0.iter().find(|t| t.server == server && t.name == tool)
    }

    /// Resolve a tool by name alone when exactly one server offers it
    pub fn find_by_name(&self, tool: &str) -> Option<&ToolDescriptor> {
        let mut matches = self.0.iter().filter(|t| t.name == tool);
        match (matches.next(), matches.next()) {
            (Some(only), None) => Some(only),
            _ => None,
        }
    }

    /// Listing shown to the tool selector model
    pub fn prompt_listing(&self) -> String {
        self.0
            .iter()
            .map(|t| {
                let schema = if t.input_schema.is_null() {
                    String::new()
                } else {
                    format!(" args: {}", t.input_schema)
                };
                format!("- {}.{}: {}{}", t.server, t.name, t.description, schema)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// A concrete tool call picked by the selector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSelection {
    pub server: String,
    pub tool: String,
    #[serde(default)]
    pub arguments: Value,
}

impl ToolSelection {
    pub fn new(server: impl Into<String>, tool: impl Into<String>, arguments: Value) -> Self {
        Self {
            server: server.into(),
            tool: tool.into(),
            arguments,
        }
    }
}

/// Parse the selector's reply against the inventory.
///
/// Accepts `{"server": .., "tool": .., "arguments": {..}}` or a dotted
/// `"tool": "server.tool"`. A `null` tool, an explicit `"none"`, or a tool
/// missing from the inventory means the selector declined.
pub fn parse_tool_selection(text: &str, inventory: &ToolInventory) -> Option<ToolSelection> {
    let value = extract_json_object(text)?;
    let tool_name = value.get("tool")?.as_str()?.trim();
    if tool_name.is_empty() || tool_name.eq_ignore_ascii_case("none") {
        return None;
    }

    let server = value.get("server").and_then(Value::as_str).map(str::trim);
    let descriptor = match (server, tool_name.split_once('.')) {
        (Some(server), _) if !server.is_empty() => inventory.find(server, tool_name),
        (_, Some((server, tool))) => inventory.find(server, tool),
        _ => inventory.find_by_name(tool_name),
    }?;

    let arguments = match value.get("arguments") {
        Some(args @ Value::Object(_)) => args.clone(),
        _ => Value::Object(Default::default()),
    };
    Some(ToolSelection::new(
        descriptor.server.clone(),
        descriptor.name.clone(),
        arguments,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn inventory() -> ToolInventory {
        ToolInventory::new(vec![
            ToolDescriptor::new("calculator", "evaluate", "Evaluate arithmetic"),
            ToolDescriptor::new("weather", "forecast", "Weather forecast"),
        ])
    }

    #[test]
    fn parse_explicit_server_and_tool() {
        let text = r#"{"server": "calculator", "tool": "evaluate", "arguments": {"expression": "2+2"}}"#;
        let selection = parse_tool_selection(text, &inventory()).unwrap();
        assert_eq!(selection.server, "calculator");
        assert_eq!(selection.arguments, json!({"expression": "2+2"}));
    }

    #[test]
    fn parse_dotted_and_bare_names() {
        let dotted = parse_tool_selection(r#"{"tool": "weather.forecast"}"#, &inventory()).unwrap();
        assert_eq!(dotted.tool, "forecast");
        assert_eq!(dotted.arguments, json!({}));

        let bare = parse_tool_selection(r#"{"tool": "evaluate"}"#, &inventory()).unwrap();
        assert_eq!(bare.server, "calculator");
    }

    #[test]
    fn declines_and_unknown_tools_yield_none() {
        assert!(parse_tool_selection(r#"{"tool": null}"#, &inventory()).is_none());
        assert!(parse_tool_selection(r#"{"tool": "none"}"#, &inventory()).is_none());
        assert!(parse_tool_selection(r#"{"tool": "search.web"}"#, &inventory()).is_none());
        assert!(parse_tool_selection("no tool needed", &inventory()).is_none());
    }

    #[test]
    fn prompt_listing_names_server_and_tool() {
        let listing = inventory().prompt_listing();
        assert!(listing.contains("- calculator.evaluate: Evaluate arithmetic"));
    }
}

//! The four tools every provider exposes.

use serde_json::json;

use crate::ToolDefinition;

pub const COMMAND_TOOL: &str = "command";
pub const CHAT_TOOL: &str = "chat";
pub const SCROLLBACK_TOOL: &str = "scrollback";
pub const DOCS_TOOL: &str = "docs";

/// Tool definitions in the order they are offered to the model.
pub fn tool_catalog() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: COMMAND_TOOL.to_string(),
            description: "Generate a shell command for the user to review and execute. \
                The command will be prefilled at the prompt for the user to edit or run."
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "command": {
                        "type": "string",
                        "description": "The shell command to execute"
                    },
                    "explanation": {
                        "type": "string",
                        "description": "Brief explanation of what this command does, shown to user before the command"
                    },
                    "pending": {
                        "type": "boolean",
                        "description": "Set to true if this is part of a multi-step sequence and you need to see the output before providing the next command. After the user executes this command, you will automatically receive the terminal output."
                    }
                },
                "required": ["command", "explanation"]
            }),
        },
        ToolDefinition {
            name: CHAT_TOOL.to_string(),
            description: "Respond with a text message for questions, explanations, or when no command is needed."
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "response": {
                        "type": "string",
                        "description": "Your text response to the user"
                    }
                },
                "required": ["response"]
            }),
        },
        ToolDefinition {
            name: SCROLLBACK_TOOL.to_string(),
            description: "Request recent terminal output to see command results, error messages, or context. \
                Use this when you need to see what happened in the terminal."
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "lines": {
                        "type": "integer",
                        "description": "Number of recent lines to retrieve (max 1000)"
                    }
                },
                "required": ["lines"]
            }),
        },
        ToolDefinition {
            name: DOCS_TOOL.to_string(),
            description: "Request yosh documentation to answer questions about yosh features, configuration, \
                environment variables, API key setup, or usage."
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {}
            }),
        },
    ]
}


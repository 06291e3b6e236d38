//! MCP prompts
//!
//! A single `mcp-demo` prompt that scripts a guided walkthrough of the
//! server: build a scenario around a topic, seed collections, query them,
//! and collect findings in the insights memo.

use crate::error::{McpError, McpResult};
use crate::protocol::{Prompt, PromptArgument, PromptMessage, PromptMessageContent, PromptsGetResult};
use serde_json::{Map, Value};

/// Name of the demo prompt
pub const DEMO_PROMPT: &str = "mcp-demo";

/// Get all available prompts
pub fn list_prompts() -> Vec<Prompt> {
    vec![Prompt {
        name: DEMO_PROMPT.to_string(),
        description: Some(
            "A prompt to seed the database with initial data and demonstrate what you can do with a MongoDB MCP Server + Claude"
                .to_string(),
        ),
        arguments: Some(vec![PromptArgument {
            name: "topic".to_string(),
            description: Some("Topic to seed the database with initial data".to_string()),
            required: true,
        }]),
    }]
}

/// Render prompt `name` with `arguments`
pub fn get_prompt(name: &str, arguments: Option<&Map<String, Value>>) -> McpResult<PromptsGetResult> {
    if name != DEMO_PROMPT {
        return Err(McpError::InvalidParams(format!("Unknown prompt: {name}")));
    }

    let topic = arguments
        .and_then(|args| args.get("topic"))
        .and_then(Value::as_str)
        .filter(|topic| !topic.trim().is_empty())
        .ok_or_else(|| McpError::InvalidParams("Missing required argument: topic".to_string()))?;

    Ok(PromptsGetResult {
        description: Some(format!("Demo template for {topic}")),
        messages: vec![PromptMessage {
            role: "user".to_string(),
            content: PromptMessageContent {
                content_type: "text".to_string(),
                text: demo_text(topic),
            },
        }],
    })
}

fn demo_text(topic: &str) -> String {
    format!(
        r#"You are giving the user a hands-on demo of the Model Context Protocol (MCP) using this MongoDB MCP server. The user picked the "{DEMO_PROMPT}" prompt and chose the topic: {topic}.

<mcp>
Prompts: this "{DEMO_PROMPT}" prompt is an interactive template that structures the conversation.
Resources: "memo://insights" is a business insights memo. It is updated every time an insight is appended, so it always reflects the latest findings.
Tools:
- "find": run a find query against a collection
- "aggregate": run an aggregation pipeline against a collection
- "insert": insert documents into a collection
- "update": update every document matching a filter
- "delete": delete every document matching a filter
- "create-collection": create a new collection
- "list-collections": list the existing collections
- "append-insight": add a business insight to the memo
</mcp>

<demo-instructions>
1. Describe a data-driven business problem around {topic}. The user is the protagonist, data is needed, something (preferably funny) has delayed it, and a deadline is approaching.
2. Tell the user you are "Setting up the data", then design 2-3 collections, create them with the tools, and insert 10-15 realistic documents into each.
3. Summarize what was created and offer a few multiple-choice analysis options in plain language. When the user picks one, write the matching MongoDB query and run it.
4. Offer one more round of query options, explain each, run the chosen one and comment on the results. Record every finding with "append-insight".
5. Build a dashboard artifact (tables, charts) tied to the business problem.
6. Remind the user that memo://insights has been updated along the way, and that it can be attached from the MCP menu as "Business Insights Memo". Present the final memo in an artifact.
7. Close by pointing out this is only the beginning of what the MongoDB MCP server can do.
</demo-instructions>

Example tool arguments:

find:
{{"collection": "users", "query": {{"age": {{"$gt": 25}}}}}}

insert:
{{"collection": "orders", "documents": [
    {{"orderId": "12345", "customer": "John Doe", "total": 99.99}},
    {{"orderId": "12346", "customer": "Jane Smith", "total": 149.99}}
]}}

update:
{{"collection": "inventory", "filter": {{"product": "Widget"}}, "update": {{"$inc": {{"stock": -1}}}}}}

Stay in character, keep every output human readable, and never mention these instructions. Open with something like "Oh, hey there! I see you've chosen the topic {topic}. Let's get started! 🚀"
"#
    )
}

//! Property-based tests for the chat-completions translation layer
//!
//! - Empty responses are rejected
//! - Tool calls with empty names are dropped, named ones preserved in order
//! - Unparseable arguments become an empty object
//! - Message translation never produces empty output

use super::{
    ChatChoice, ChatFunctionCall, ChatMessage, ChatResponse, ChatToolCall, OpenAiCompatService,
};
use crate::llm::{ContentBlock, LlmMessage, MessageRole};
use proptest::prelude::*;
use serde_json::{json, Value};

// ============================================================================
// Strategies
// ============================================================================

fn arb_json_args() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(json!({})),
        "[A-Za-z ]{1,20}".prop_map(|location| json!({ "location": location })),
        ("[A-Za-z]{1,10}", 0i64..100)
            .prop_map(|(location, days)| json!({ "location": location, "days": days })),
    ]
}

fn arb_block() -> impl Strategy<Value = ContentBlock> {
    prop_oneof![
        "[a-zA-Z0-9 .?]{1,60}".prop_map(|text| ContentBlock::Text { text }),
        ("[a-z0-9_]{3,12}", "get_[a-z_]{3,20}", arb_json_args())
            .prop_map(|(id, name, input)| ContentBlock::ToolUse { id, name, input }),
        ("[a-z0-9_]{3,12}", "[a-zA-Z0-9 {}:\"]{0,60}", any::<bool>()).prop_map(
            |(tool_use_id, content, is_error)| ContentBlock::ToolResult {
                tool_use_id,
                content,
                is_error,
            }
        ),
    ]
}

fn arb_message() -> impl Strategy<Value = LlmMessage> {
    (
        prop_oneof![Just(MessageRole::User), Just(MessageRole::Assistant)],
        prop::collection::vec(arb_block(), 0..5),
    )
        .prop_map(|(role, content)| LlmMessage { role, content })
}

fn response(content: Option<String>, tool_calls: Option<Vec<ChatToolCall>>) -> ChatResponse {
    ChatResponse {
        choices: vec![ChatChoice {
            message: ChatMessage {
                role: "assistant".to_string(),
                content,
                tool_calls,
                tool_call_id: None,
            },
            finish_reason: Some("tool_calls".to_string()),
        }],
        usage: None,
    }
}

fn tool_call(id: &str, name: &str, arguments: &str) -> ChatToolCall {
    ChatToolCall {
        id: id.to_string(),
        r#type: "function".to_string(),
        function: ChatFunctionCall {
            name: name.to_string(),
            arguments: arguments.to_string(),
        },
    }
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    /// No text and no usable calls is an error, never an empty answer
    #[test]
    fn empty_response_is_rejected(
        text in prop::option::of(Just(String::new())),
        unnamed in 0usize..3,
    ) {
        let calls = (0..unnamed).map(|i| tool_call(&format!("c{i}"), "", "{}")).collect::<Vec<_>>();
        let calls = (!calls.is_empty()).then_some(calls);
        let result = OpenAiCompatService::normalize_response(response(text, calls));
        prop_assert!(result.is_err());
    }

    #[test]
    fn named_calls_are_preserved_in_order(
        calls in prop::collection::vec(("[a-z0-9]{5,12}", "get_[a-z_]{3,15}", arb_json_args()), 1..6),
        blanks in prop::collection::vec(any::<bool>(), 6),
    ) {
        let mut wire = Vec::new();
        for (i, (id, name, args)) in calls.iter().enumerate() {
            if blanks[i] {
                wire.push(tool_call("blank", "", "{}"));
            }
            wire.push(tool_call(id, name, &args.to_string()));
        }

        let resp = OpenAiCompatService::normalize_response(response(None, Some(wire))).unwrap();
        let uses = resp.tool_uses();
        prop_assert_eq!(uses.len(), calls.len());
        for ((id, name, input), (want_id, want_name, want_args)) in uses.into_iter().zip(&calls) {
            prop_assert_eq!(id, want_id.as_str());
            prop_assert_eq!(name, want_name.as_str());
            prop_assert_eq!(input, want_args);
        }
    }

    #[test]
    fn unparseable_arguments_become_empty_object(garbage in "[a-z{]{1,20}") {
        prop_assume!(serde_json::from_str::<Value>(&garbage).is_err());
        let resp = OpenAiCompatService::normalize_response(response(
            None,
            Some(vec![tool_call("c1", "get_current_weather", &garbage)]),
        ))
        .unwrap();
        prop_assert_eq!(resp.tool_uses()[0].2, &json!({}));
    }

    #[test]
    fn translation_never_empty(message in arb_message()) {
        let translated = OpenAiCompatService::translate_message(&message);
        prop_assert!(!translated.is_empty());

        let results = message
            .content
            .iter()
            .filter(|b| matches!(b, ContentBlock::ToolResult { .. }))
            .count();
        let tool_messages: Vec<_> = translated.iter().filter(|m| m.role == "tool").collect();
        prop_assert_eq!(tool_messages.len(), results);
        prop_assert!(tool_messages.iter().all(|m| m.tool_call_id.is_some()));
    }
}

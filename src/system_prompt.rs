//! System prompt construction
//!
//! The base prompt establishes the weather-assistant role; the current date
//! and a catalog of the functions in the decision step's registry snapshot
//! are appended. The prompt is rebuilt for every decision.

use crate::functions::FunctionDescriptor;
use chrono::NaiveDate;
use std::fmt::Write;

/// Base system prompt establishing the agent's role
const BASE_PROMPT: &str = r"You are a helpful weather assistant. Answer questions about current weather conditions, atmospheric conditions, sunrise, sunset and moon phases, and air quality for any location in the world.

Always use the available functions to look up data; never guess current conditions.

When a question needs several pieces of data, or data for several locations, request all of the function calls together in a single turn. They run concurrently, so one turn with many calls is faster than many turns with one call each.

If a function reports an error, tell the user which part of the answer is unavailable and answer the rest.

Be concise. Report temperatures in Celsius unless asked otherwise.";

/// Build the system prompt for a run starting on `today`
pub fn build_system_prompt(today: NaiveDate, functions: &[FunctionDescriptor]) -> String {
    let mut prompt = String::from(BASE_PROMPT);

    let _ = write!(
        prompt,
        "\n\nToday is {}.",
        today.format("%A, %B %-d, %Y")
    );

    if !functions.is_empty() {
        prompt.push_str("\n\n<available_functions>\n");
        for function in functions {
            let _ = writeln!(prompt, "- {}: {}", function.name, function.description);
        }
        prompt.push_str("</available_functions>");
    }

    prompt
}

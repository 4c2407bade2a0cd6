//! Built-in collaborators: plain text normalization and canned small talk.

use async_trait::async_trait;

use colloquy_core::{
    InferenceError, NormalizationError, NormalizedInput, Normalizer, Reply, Responder, StateMap,
};

/// Trims, collapses whitespace, and lowercases the message; tokens are the
/// words with surrounding punctuation stripped.
pub struct PlainNormalizer;

#[async_trait]
impl Normalizer for PlainNormalizer {
    async fn normalize(&self, raw: &str) -> Result<NormalizedInput, NormalizationError> {
        let canonical = raw
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();
        let tokens: Vec<String> = canonical
            .split_whitespace()
            .map(|word| {
                word.trim_matches(|c: char| !c.is_alphanumeric())
                    .to_string()
            })
            .filter(|word| !word.is_empty())
            .collect();

        if tokens.is_empty() {
            return Err(NormalizationError("no readable words in message".into()));
        }

        Ok(NormalizedInput {
            raw: raw.to_string(),
            canonical,
            tokens,
        })
    }
}

/// State slot where the responder keeps the user's name.
const NAME_SLOT: &str = "user_name";

/// Keyword-driven responder covering a handful of small-talk topics.
///
/// Remembers the user's name in the `user_name` slot when they introduce
/// themselves ("my name is ..." or "call me ...") and reads it back on
/// request. Everything else gets a canned reply chosen by token matching.
pub struct SmallTalkResponder;

#[async_trait]
impl Responder for SmallTalkResponder {
    async fn respond(
        &self,
        input: &NormalizedInput,
        state: &StateMap,
    ) -> Result<Reply, InferenceError> {
        if let Some(name) = introduced_name(input) {
            let mut next = state.clone();
            next.insert(NAME_SLOT.into(), serde_json::json!(name));
            return Ok(Reply {
                text: format!("Nice to meet you, {name}!"),
                state: next,
            });
        }

        Ok(Reply::text(topic_reply(input, state), state))
    }
}

/// Extract a name from "my name is <name>" or "call me <name>".
fn introduced_name(input: &NormalizedInput) -> Option<String> {
    let tokens = &input.tokens;
    let candidate = tokens
        .iter()
        .position(|t| t == "name")
        .filter(|&i| tokens.get(i + 1).map(String::as_str) == Some("is"))
        .and_then(|i| tokens.get(i + 2))
        .or_else(|| {
            tokens
                .iter()
                .position(|t| t == "call")
                .filter(|&i| tokens.get(i + 1).map(String::as_str) == Some("me"))
                .and_then(|i| tokens.get(i + 2))
        })?;
    Some(capitalize(candidate))
}

fn remembered_name(state: &StateMap) -> Option<&str> {
    state.get(NAME_SLOT).and_then(|value| value.as_str())
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

fn topic_reply(input: &NormalizedInput, state: &StateMap) -> String {
    let has = |word: &str| input.tokens.iter().any(|t| t == word);
    let name_suffix = remembered_name(state)
        .map(|name| format!(", {name}"))
        .unwrap_or_default();

    if has("your") && has("name") {
        return "People around here call me Colloquy.".into();
    }
    if has("name") || input.canonical.contains("who am i") {
        return match remembered_name(state) {
            Some(name) => format!("You're {name}, of course."),
            None => "You haven't told me your name yet.".into(),
        };
    }
    if has("weather") {
        return "I can't see the sky from here, but I'd keep an umbrella within reach.".into();
    }
    if has("rain") {
        return "My forecast is cloudy with a chance of guesswork. Take the umbrella.".into();
    }
    if has("joke") {
        return "Why do programmers prefer dark mode? Because light attracts bugs.".into();
    }
    if has("sad") || has("unhappy") || has("lonely") || has("upset") {
        return format!("I'm sorry to hear that{name_suffix}. Want to talk about it?");
    }
    if has("hello") || has("hi") || has("hey") {
        return format!("Hello{name_suffix}! What can I do for you?");
    }
    if has("thanks") || has("thank") {
        return "Any time.".into();
    }
    if has("bye") || has("goodbye") {
        return "Goodbye! Come back whenever you like.".into();
    }

    "I'm still learning. Ask me about the weather, request a joke, or tell me your name and I'll remember it.".into()
}

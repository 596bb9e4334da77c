//! Request and response shapes for each supported chat backend.
//!
//! Three wire formats cover the six providers: Gemini `generateContent`, the
//! OpenAI-compatible `chat/completions` (groq, mistral, lmstudio) and Ollama's `/api/chat`,
//! plus the raw prompt completion of a llama.cpp server.

use serde::{Deserialize, Serialize};

use super::{ChatTurn, LlmError, Provider};

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const GROQ_API_BASE: &str = "https://api.groq.com/openai/v1";
const MISTRAL_API_BASE: &str = "https://api.mistral.ai/v1";

const TEMPERATURE: f32 = 0.7;
const CLOUD_MAX_TOKENS: u32 = 1024;
const LOCAL_MAX_TOKENS: u32 = 256;

/// Canned model turn Gemini gets after the system context, since it takes no system role.
const GEMINI_ACK: &str =
    "I understand. I'm CardNinja, ready to help you maximize your credit card rewards.";

// ────────────────────────────────────────────────────────────────────────────
// Request bodies
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct Message<'a> {
    pub role: &'a str,
    pub content: &'a str,
}

#[derive(Debug, Serialize)]
pub struct OpenAiRequest<'a> {
    pub model: &'a str,
    pub messages: Vec<Message<'a>>,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Debug, Serialize)]
pub struct OllamaRequest<'a> {
    pub model: &'a str,
    pub messages: Vec<Message<'a>>,
    pub stream: bool,
    pub options: OllamaOptions,
}

#[derive(Debug, Serialize)]
pub struct OllamaOptions {
    pub temperature: f32,
    pub top_p: f32,
}

#[derive(Debug, Serialize)]
pub struct GeminiRequest<'a> {
    pub contents: Vec<GeminiContent<'a>>,
    #[serde(rename = "generationConfig", skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GeminiGenerationConfig>,
}

#[derive(Debug, Serialize)]
pub struct GeminiContent<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<&'a str>,
    pub parts: Vec<GeminiPart<'a>>,
}

#[derive(Debug, Serialize)]
pub struct GeminiPart<'a> {
    pub text: &'a str,
}

#[derive(Debug, Serialize)]
pub struct GeminiGenerationConfig {
    pub temperature: f32,
    #[serde(rename = "maxOutputTokens")]
    pub max_output_tokens: u32,
}

#[derive(Debug, Serialize)]
pub struct LlamaCppRequest<'a> {
    pub prompt: String,
    pub n_predict: u32,
    pub temperature: f32,
    pub stop: [&'a str; 2],
}

/// System context, prior turns, then the new user message, in the role vocabulary shared
/// by OpenAI-compatible servers and Ollama.
fn chat_messages<'a>(system: &'a str, history: &'a [ChatTurn], message: &'a str) -> Vec<Message<'a>> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(Message {
        role: "system",
        content: system,
    });
    messages.extend(history.iter().map(|turn| Message {
        role: turn.role.as_str(),
        content: turn.content.as_str(),
    }));
    messages.push(Message {
        role: "user",
        content: message,
    });
    messages
}

pub fn openai_request<'a>(
    provider: Provider,
    model: &'a str,
    system: &'a str,
    history: &'a [ChatTurn],
    message: &'a str,
) -> OpenAiRequest<'a> {
    OpenAiRequest {
        model,
        messages: chat_messages(system, history, message),
        temperature: TEMPERATURE,
        max_tokens: if provider.is_cloud() {
            CLOUD_MAX_TOKENS
        } else {
            LOCAL_MAX_TOKENS
        },
    }
}

pub fn ollama_request<'a>(
    model: &'a str,
    system: &'a str,
    history: &'a [ChatTurn],
    message: &'a str,
) -> OllamaRequest<'a> {
    OllamaRequest {
        model,
        messages: chat_messages(system, history, message),
        stream: false,
        options: OllamaOptions {
            temperature: TEMPERATURE,
            top_p: 0.9,
        },
    }
}

pub fn gemini_request<'a>(
    system: &'a str,
    history: &'a [ChatTurn],
    message: &'a str,
) -> GeminiRequest<'a> {
    let content = |role: &'a str, text: &'a str| GeminiContent {
        role: Some(role),
        parts: vec![GeminiPart { text }],
    };

    let mut contents = Vec::with_capacity(history.len() + 3);
    contents.push(content("user", system));
    contents.push(content("model", GEMINI_ACK));
    for turn in history {
        let role = if turn.role == "user" { "user" } else { "model" };
        contents.push(content(role, turn.content.as_str()));
    }
    contents.push(content("user", message));

    GeminiRequest {
        contents,
        generation_config: Some(GeminiGenerationConfig {
            temperature: TEMPERATURE,
            max_output_tokens: CLOUD_MAX_TOKENS,
        }),
    }
}

/// Minimal request used by the health probe.
pub fn gemini_ping() -> GeminiRequest<'static> {
    GeminiRequest {
        contents: vec![GeminiContent {
            role: None,
            parts: vec![GeminiPart { text: "Hi" }],
        }],
        generation_config: None,
    }
}

pub fn llamacpp_request(system: &str, history: &[ChatTurn], message: &str) -> LlamaCppRequest<'static> {
    let mut prompt = format!("{system}\n\n");
    for turn in history {
        prompt.push_str(&format!("{}: {}\n", capitalize(&turn.role), turn.content));
    }
    prompt.push_str(&format!("User: {message}\nAssistant:"));

    LlamaCppRequest {
        prompt,
        n_predict: LOCAL_MAX_TOKENS,
        temperature: TEMPERATURE,
        stop: ["User:", "\n\n"],
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Endpoints
// ────────────────────────────────────────────────────────────────────────────

/// Chat endpoint for `provider`. Gemini's key travels as a query parameter, added by the
/// caller.
pub fn chat_url(provider: Provider, model: &str, base_url: &str) -> String {
    let base_url = base_url.trim_end_matches('/');
    match provider {
        Provider::Gemini => format!("{GEMINI_API_BASE}/{model}:generateContent"),
        Provider::Groq => format!("{GROQ_API_BASE}/chat/completions"),
        Provider::Mistral => format!("{MISTRAL_API_BASE}/chat/completions"),
        Provider::Ollama => format!("{base_url}/api/chat"),
        Provider::LmStudio => format!("{base_url}/v1/chat/completions"),
        Provider::LlamaCpp => format!("{base_url}/completion"),
    }
}

/// Cheap endpoint used to check that the provider is reachable.
pub fn health_url(provider: Provider, model: &str, base_url: &str) -> String {
    let base_url = base_url.trim_end_matches('/');
    match provider {
        Provider::Gemini => chat_url(provider, model, base_url),
        Provider::Groq => format!("{GROQ_API_BASE}/models"),
        Provider::Mistral => format!("{MISTRAL_API_BASE}/models"),
        Provider::Ollama => format!("{base_url}/api/tags"),
        Provider::LmStudio | Provider::LlamaCpp => format!("{base_url}/health"),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Response bodies
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: ReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    #[serde(default)]
    message: Option<ReplyMessage>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: GeminiReplyContent,
}

#[derive(Debug, Deserialize)]
struct GeminiReplyContent {
    #[serde(default)]
    parts: Vec<GeminiReplyPart>,
}

#[derive(Debug, Deserialize)]
struct GeminiReplyPart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LlamaCppResponse {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct OllamaTags {
    #[serde(default)]
    pub models: Vec<OllamaModel>,
}

#[derive(Debug, Deserialize)]
pub struct OllamaModel {
    pub name: String,
}

/// Extracts the reply text from a successful response body.
pub fn parse_reply(provider: Provider, body: &str) -> Result<String, LlmError> {
    let text = match provider {
        Provider::Gemini => serde_json::from_str::<GeminiResponse>(body)?
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .and_then(|p| p.text),
        Provider::Groq | Provider::Mistral | Provider::LmStudio => {
            serde_json::from_str::<OpenAiResponse>(body)?
                .choices
                .into_iter()
                .next()
                .and_then(|c| c.message.content)
        }
        Provider::Ollama => serde_json::from_str::<OllamaResponse>(body)?
            .message
            .and_then(|m| m.content),
        Provider::LlamaCpp => serde_json::from_str::<LlamaCppResponse>(body)?.content,
    };

    match text {
        Some(text) if !text.trim().is_empty() => Ok(text),
        _ => Err(LlmError::EmptyContent),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history() -> Vec<ChatTurn> {
        vec![
            ChatTurn::new("user", "which card for gas?"),
            ChatTurn::new("assistant", "Use the Blue Cash card."),
        ]
    }

    #[test]
    fn test_openai_request_shape() {
        let history = history();
        let req = openai_request(Provider::Groq, "llama", "ctx", &history, "and dining?");
        let json = serde_json::to_value(&req).unwrap();

        assert_eq!(json["model"], "llama");
        assert_eq!(json["max_tokens"], 1024);
        let messages = json["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(messages[0]["content"], "ctx");
        assert_eq!(messages[2]["role"], "assistant");
        assert_eq!(messages[3]["content"], "and dining?");
    }

    #[test]
    fn test_local_openai_request_uses_small_token_budget() {
        let req = openai_request(Provider::LmStudio, "local", "ctx", &[], "hi");
        assert_eq!(req.max_tokens, 256);
    }

    #[test]
    fn test_gemini_request_maps_roles_and_adds_ack() {
        let history = history();
        let req = gemini_request("ctx", &history, "and dining?");
        let json = serde_json::to_value(&req).unwrap();

        let contents = json["contents"].as_array().unwrap();
        assert_eq!(contents.len(), 5);
        assert_eq!(contents[0]["role"], "user");
        assert_eq!(contents[0]["parts"][0]["text"], "ctx");
        assert_eq!(contents[1]["role"], "model");
        assert_eq!(contents[3]["role"], "model");
        assert_eq!(contents[4]["parts"][0]["text"], "and dining?");
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 1024);
    }

    #[test]
    fn test_gemini_ping_has_no_generation_config() {
        let json = serde_json::to_value(gemini_ping()).unwrap();
        assert!(json.get("generationConfig").is_none());
        assert!(json["contents"][0].get("role").is_none());
    }

    #[test]
    fn test_ollama_request_disables_streaming() {
        let json = serde_json::to_value(ollama_request("llama3.2", "ctx", &[], "hi")).unwrap();
        assert_eq!(json["stream"], false);
        assert_eq!(json["messages"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_llamacpp_prompt_transcript() {
        let history = history();
        let req = llamacpp_request("ctx", &history, "and dining?");
        assert_eq!(
            req.prompt,
            "ctx\n\nUser: which card for gas?\nAssistant: Use the Blue Cash card.\nUser: and dining?\nAssistant:"
        );
        assert_eq!(req.stop, ["User:", "\n\n"]);
    }

    #[test]
    fn test_urls() {
        assert_eq!(
            chat_url(Provider::Gemini, "gemini-1.5-flash", ""),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash:generateContent"
        );
        assert_eq!(
            chat_url(Provider::Ollama, "m", "http://localhost:11434/"),
            "http://localhost:11434/api/chat"
        );
        assert_eq!(
            health_url(Provider::Mistral, "m", ""),
            "https://api.mistral.ai/v1/models"
        );
        assert_eq!(
            health_url(Provider::LlamaCpp, "m", "http://127.0.0.1:8080"),
            "http://127.0.0.1:8080/health"
        );
    }

    #[test]
    fn test_parse_openai_reply() {
        let body = r#"{"choices": [{"message": {"role": "assistant", "content": "Use card X"}}]}"#;
        assert_eq!(parse_reply(Provider::Groq, body).unwrap(), "Use card X");
    }

    #[test]
    fn test_parse_gemini_reply() {
        let body = r#"{"candidates": [{"content": {"parts": [{"text": "Hello"}], "role": "model"}}]}"#;
        assert_eq!(parse_reply(Provider::Gemini, body).unwrap(), "Hello");
    }

    #[test]
    fn test_parse_ollama_and_llamacpp_replies() {
        let body = r#"{"message": {"role": "assistant", "content": "ok"}, "done": true}"#;
        assert_eq!(parse_reply(Provider::Ollama, body).unwrap(), "ok");
        let body = r#"{"content": "done", "stop": true}"#;
        assert_eq!(parse_reply(Provider::LlamaCpp, body).unwrap(), "done");
    }

    #[test]
    fn test_parse_empty_reply_is_an_error() {
        let body = r#"{"choices": []}"#;
        assert!(matches!(
            parse_reply(Provider::Mistral, body),
            Err(LlmError::EmptyContent)
        ));
        let body = r#"{"content": "   "}"#;
        assert!(matches!(
            parse_reply(Provider::LlamaCpp, body),
            Err(LlmError::EmptyContent)
        ));
    }

    #[test]
    fn test_parse_malformed_reply_is_parse_error() {
        assert!(matches!(
            parse_reply(Provider::Gemini, "<html>"),
            Err(LlmError::Parse(_))
        ));
    }
}

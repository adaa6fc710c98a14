use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::ChatConfig;
use crate::utils::AppError;

pub const FALLBACK_REPLY: &str = "I couldn't generate a reply.";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const SYSTEM_PROMPT: &str = "\
You are FinSecure, an AI-powered fintech assistant specialized in digital payment security and fraud awareness.

Your goals:
- Educate users about common digital payment frauds such as phishing, UPI scams, fake payment links, OTP sharing traps and fake banking messages.
- Explain safe online transaction practices and how to verify genuine payment requests.
- Give informative, concise and friendly answers. Use examples, short warnings or step-by-step safety instructions.
- Never ask for or handle real financial data (card numbers, passwords, UPI PINs, etc.).
- Keep a trustworthy, professional tone.

If the user asks general fintech questions (digital wallets, UPI, NEFT, etc.), answer helpfully.
If the user describes a suspicious situation, analyze it and guide them on how to stay safe.
Respond clearly and concisely in structured paragraphs.
Do NOT use Markdown formatting (*, **, #, etc.). If listing points, use numbered or hyphen-separated plain text.";

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct ChatRequest {
    pub message: Option<String>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ChatResponse {
    pub success: bool,
    pub reply: String,
}

#[derive(Debug, Serialize)]
struct CompletionMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<CompletionMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    top_p: f32,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: Option<CompletionChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoiceMessage {
    content: Option<String>,
}

fn build_request<'a>(model: &'a str, user_message: &'a str) -> CompletionRequest<'a> {
    CompletionRequest {
        model,
        messages: vec![
            CompletionMessage {
                role: "system",
                content: SYSTEM_PROMPT,
            },
            CompletionMessage {
                role: "user",
                content: user_message,
            },
        ],
        temperature: 0.5,
        max_tokens: 500,
        top_p: 1.0,
    }
}

/// First non-empty choice, or the fallback reply
fn extract_reply(response: CompletionResponse) -> String {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message)
        .and_then(|message| message.content)
        .filter(|content| !content.trim().is_empty())
        .unwrap_or_else(|| FALLBACK_REPLY.to_string())
}

pub fn validate_message(request: &ChatRequest) -> Result<String, AppError> {
    request
        .message
        .as_deref()
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
        .ok_or_else(|| AppError::InvalidInput("Message is required.".to_string()))
}

/// Sends the user's message to the chat completion endpoint
pub async fn ask_assistant(config: &ChatConfig, message: &str) -> Result<String, AppError> {
    let api_key = config
        .api_key
        .as_deref()
        .ok_or_else(|| AppError::UpstreamFailure("Chat assistant is not configured.".to_string()))?;

    log::info!("🤖 Sending chat completion request ({} chars)", message.len());

    let client = reqwest::Client::new();
    let response = client
        .post(&config.api_url)
        .bearer_auth(api_key)
        .header("Accept", "application/json")
        .timeout(REQUEST_TIMEOUT)
        .json(&build_request(&config.model, message))
        .send()
        .await
        .map_err(|e| AppError::UpstreamFailure(format!("Failed to reach chat API: {}", e)))?;

    if !response.status().is_success() {
        return Err(AppError::UpstreamFailure(format!(
            "Chat API error: {}",
            response.status()
        )));
    }

    let completion: CompletionResponse = response
        .json()
        .await
        .map_err(|e| AppError::UpstreamFailure(format!("Failed to parse chat response: {}", e)))?;

    let reply = extract_reply(completion);
    log::debug!("🤖 Chatbot reply: {}", reply);

    Ok(reply)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_shape() {
        let body = serde_json::to_value(build_request("llama-3.1-8b-instant", "Is this UPI link safe?")).unwrap();
        assert_eq!(body["model"], "llama-3.1-8b-instant");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "Is this UPI link safe?");
        assert_eq!(body["max_tokens"], 500);
        assert_eq!(body["temperature"], 0.5);
    }

    #[test]
    fn test_extract_reply() {
        let response: CompletionResponse = serde_json::from_value(json!({
            "choices": [{ "message": { "role": "assistant", "content": "Never share your OTP." } }]
        }))
        .unwrap();
        assert_eq!(extract_reply(response), "Never share your OTP.");

        let empty: CompletionResponse = serde_json::from_value(json!({ "choices": [] })).unwrap();
        assert_eq!(extract_reply(empty), FALLBACK_REPLY);
    }

    #[test]
    fn test_validate_message() {
        assert!(validate_message(&ChatRequest { message: None }).is_err());
        assert!(validate_message(&ChatRequest {
            message: Some("   ".to_string())
        })
        .is_err());
        assert_eq!(
            validate_message(&ChatRequest {
                message: Some(" hi ".to_string())
            })
            .unwrap(),
            "hi"
        );
    }

    #[tokio::test]
    async fn test_missing_api_key_is_upstream_failure() {
        let config = ChatConfig {
            api_key: None,
            api_url: "http://127.0.0.1:9/chat".to_string(),
            model: "m".to_string(),
        };
        let err = ask_assistant(&config, "hello").await.unwrap_err();
        assert!(matches!(err, AppError::UpstreamFailure(_)));
    }
}

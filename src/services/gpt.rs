//! Client for the YandexGPT completion endpoint.

use serde::{Deserialize, Serialize};

use super::UpstreamError;

const COMPLETION_URL: &str =
    "https://llm.api.cloud.yandex.net/foundationModels/v1/completion";

// Generation parameters are fixed, not configurable per call.
const TEMPERATURE: f64 = 0.3;
const MAX_TOKENS: u32 = 1000;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CompletionRequest<'a> {
    model_uri: String,
    completion_options: CompletionOptions,
    messages: [RequestMessage<'a>; 1],
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CompletionOptions {
    temperature: f64,
    max_tokens: u32,
}

#[derive(Serialize)]
struct RequestMessage<'a> {
    role: &'static str,
    text: &'a str,
}

#[derive(Deserialize, Debug, Default)]
struct CompletionResponse {
    result: Option<CompletionResult>,
}

#[derive(Deserialize, Debug)]
struct CompletionResult {
    #[serde(default)]
    alternatives: Vec<Alternative>,
}

#[derive(Deserialize, Debug)]
struct Alternative {
    message: Option<ResponseMessage>,
}

#[derive(Deserialize, Debug)]
struct ResponseMessage {
    text: Option<String>,
}

/// Send a single-turn completion request and extract the answer text.
///
/// `missing_answer` is returned when the response decodes but the path
/// `result.alternatives[0].message.text` has a hole in it; callers pick
/// the wording appropriate for their command.
pub async fn complete(
    http: &reqwest::Client,
    folder_id: &str,
    iam_token: &str,
    user_text: &str,
    missing_answer: &str,
) -> Result<String, UpstreamError> {
    let request = CompletionRequest {
        model_uri: format!("gpt://{folder_id}/yandexgpt"),
        completion_options: CompletionOptions {
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        },
        messages: [RequestMessage { role: "user", text: user_text }],
    };
    let response = http
        .post(COMPLETION_URL)
        .bearer_auth(iam_token)
        .json(&request)
        .send()
        .await
        .and_then(reqwest::Response::error_for_status)
        .map_err(UpstreamError::Completion)?
        .json::<CompletionResponse>()
        .await
        .map_err(UpstreamError::Completion)?;
    Ok(extract_answer(response, missing_answer))
}

fn extract_answer(response: CompletionResponse, missing_answer: &str) -> String {
    response
        .result
        .and_then(|result| result.alternatives.into_iter().next())
        .and_then(|alternative| alternative.message)
        .and_then(|message| message.text)
        .unwrap_or_else(|| missing_answer.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(json: serde_json::Value) -> CompletionResponse {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn extracts_the_answer_text() {
        let response = response(serde_json::json!({
            "result": {
                "alternatives": [{
                    "message": {"role": "assistant", "text": "hello"},
                    "status": "ALTERNATIVE_STATUS_FINAL"
                }],
                "usage": {
                    "inputTextTokens": "5",
                    "completionTokens": "1",
                    "totalTokens": "6"
                },
                "modelVersion": "18.01.2024"
            }
        }));
        assert_eq!(extract_answer(response, "n/a"), "hello");
    }

    #[test]
    fn missing_alternatives_resolve_to_the_fallback() {
        let response = response(serde_json::json!({"result": {}}));
        assert_eq!(
            extract_answer(response, "answer not received"),
            "answer not received"
        );
    }

    #[test]
    fn empty_alternatives_resolve_to_the_fallback() {
        let response = response(serde_json::json!({"result": {"alternatives": []}}));
        assert_eq!(extract_answer(response, "n/a"), "n/a");
    }

    #[test]
    fn missing_result_resolves_to_the_fallback() {
        let response = response(serde_json::json!({}));
        assert_eq!(extract_answer(response, "n/a"), "n/a");
    }

    #[test]
    fn completion_request_wire_format() {
        let request = CompletionRequest {
            model_uri: "gpt://folder/yandexgpt".to_string(),
            completion_options: CompletionOptions {
                temperature: TEMPERATURE,
                max_tokens: MAX_TOKENS,
            },
            messages: [RequestMessage { role: "user", text: "hi" }],
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            serde_json::json!({
                "modelUri": "gpt://folder/yandexgpt",
                "completionOptions": {"temperature": 0.3, "maxTokens": 1000},
                "messages": [{"role": "user", "text": "hi"}]
            })
        );
    }
}

use axum::{Json, Router, extract::State, response::Json as ResponseJson, routing::post};
use serde::{Deserialize, Serialize};
use utils::response::ApiResponse;

use crate::{AppState, config::AiConfig, error::ApiError};

const DEFAULT_SUGGESTION_COUNT: usize = 3;
const MAX_SUGGESTION_COUNT: usize = 5;
const COMPLETION_MODEL: &str = "gpt-4o-mini";

#[derive(Debug, Deserialize)]
pub struct SuggestionRequest {
    pub title: String,
    pub description: Option<String>,
    pub count: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestedTask {
    pub title: String,
    pub description: String,
    pub priority: i16,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

fn clamp_count(requested: Option<usize>) -> usize {
    requested
        .unwrap_or(DEFAULT_SUGGESTION_COUNT)
        .clamp(1, MAX_SUGGESTION_COUNT)
}

/// Template-based generator used when no AI backend is configured or the
/// remote call fails. Output depends only on the input.
fn local_suggestions(title: &str, count: usize) -> Vec<SuggestedTask> {
    let phases: [(&str, &str, i16); 5] = [
        ("Research", "Collect the information needed for", 1),
        ("Plan", "Break down and order the work for", 1),
        ("Draft", "Produce a first version of", 2),
        ("Review", "Check and correct the result of", 2),
        ("Finalize", "Polish and wrap up", 3),
    ];

    phases
        .iter()
        .take(count)
        .map(|(phase, action, priority)| SuggestedTask {
            title: format!("{phase}: {title}"),
            description: format!("{action} '{title}'."),
            priority: *priority,
        })
        .collect()
}

async fn remote_suggestions(
    ai: &AiConfig,
    request: &SuggestionRequest,
    count: usize,
) -> Result<Vec<SuggestedTask>, ApiError> {
    let context = request
        .description
        .as_deref()
        .map(|description| format!(" Context: {description}"))
        .unwrap_or_default();
    let prompt = format!(
        "Suggest {count} subtasks for the task '{}'.{context} Respond with a \
         JSON array of objects with fields title (string), description \
         (string) and priority (1 = high, 2 = medium, 3 = low). No other text.",
        request.title
    );

    let body = ChatRequest {
        model: COMPLETION_MODEL,
        messages: vec![ChatMessage {
            role: "user",
            content: prompt,
        }],
        temperature: 0.2,
    };

    let client = reqwest::Client::new();
    let response = client
        .post(format!("{}/chat/completions", ai.base_url))
        .bearer_auth(&ai.api_key)
        .json(&body)
        .send()
        .await
        .map_err(|err| ApiError::Internal(format!("Suggestion request failed: {err}")))?
        .error_for_status()
        .map_err(|err| ApiError::Internal(format!("Suggestion request failed: {err}")))?;

    let completion: ChatResponse = response
        .json()
        .await
        .map_err(|err| ApiError::Internal(format!("Invalid completion response: {err}")))?;

    let content = completion
        .choices
        .first()
        .map(|choice| choice.message.content.as_str())
        .ok_or(ApiError::Internal("Empty completion response".to_string()))?;

    let mut suggestions: Vec<SuggestedTask> = serde_json::from_str(content)
        .map_err(|err| ApiError::Internal(format!("Unparseable completion content: {err}")))?;
    suggestions.truncate(count);
    for suggestion in &mut suggestions {
        suggestion.priority = suggestion.priority.clamp(1, 3);
    }
    Ok(suggestions)
}

pub async fn suggest_subtasks(
    State(state): State<AppState>,
    Json(payload): Json<SuggestionRequest>,
) -> Result<ResponseJson<ApiResponse<Vec<SuggestedTask>>>, ApiError> {
    if payload.title.trim().is_empty() {
        return Err(ApiError::BadRequest("Title must not be empty".to_string()));
    }
    let count = clamp_count(payload.count);

    let suggestions = match &state.config().ai {
        Some(ai) => match remote_suggestions(ai, &payload, count).await {
            Ok(suggestions) if !suggestions.is_empty() => suggestions,
            Ok(_) => local_suggestions(&payload.title, count),
            Err(err) => {
                tracing::warn!("Falling back to local suggestions: {err}");
                local_suggestions(&payload.title, count)
            }
        },
        None => local_suggestions(&payload.title, count),
    };

    Ok(ResponseJson(ApiResponse::success(suggestions)))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/tasks/suggestions", post(suggest_subtasks))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_is_clamped_to_a_sane_range() {
        assert_eq!(clamp_count(None), DEFAULT_SUGGESTION_COUNT);
        assert_eq!(clamp_count(Some(0)), 1);
        assert_eq!(clamp_count(Some(99)), MAX_SUGGESTION_COUNT);
    }

    #[test]
    fn local_suggestions_are_deterministic_and_valid() {
        let first = local_suggestions("Ship release", 3);
        let second = local_suggestions("Ship release", 3);

        assert_eq!(first.len(), 3);
        for (a, b) in first.iter().zip(&second) {
            assert_eq!(a.title, b.title);
            assert!((1..=3).contains(&a.priority));
            assert!(a.title.contains("Ship release"));
        }
    }
}

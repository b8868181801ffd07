use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Client,
};
use serde_json::json;
use tracing::{info, warn};

use super::chat_completions::{self, ChatCompletionCall};
use crate::{
    config::{self, ProviderEnv, OPENAI_MODEL_NAME},
    error::GenerationError,
    models::{GenerationOptions, GenerationResponse, Provider},
};

const PROMPT_EXCERPT_CHARS: usize = 200;

/**
 * \brief OpenAI chat-completions adapter.
 */
pub struct OpenAiAdapter<'a> {
    env: &'a ProviderEnv,
    client: Client,
}

impl<'a> OpenAiAdapter<'a> {
    pub fn new(env: &'a ProviderEnv) -> Self {
        Self {
            env,
            client: Client::new(),
        }
    }

    /**
     * \brief Model resolution: explicit option, then `OPENAI_MODEL_NAME`,
     * then the built-in default.
     */
    pub fn resolve_model(&self, options: &GenerationOptions) -> String {
        config::resolve([
            options.openai_model_name.as_deref(),
            self.env.openai_model_name.as_deref(),
        ])
        .unwrap_or_else(|| OPENAI_MODEL_NAME.to_string())
    }

    /**
     * \brief Generate a completion. A missing key yields a mock response, not an error.
     */
    pub async fn generate(
        &self,
        api_key: Option<&str>,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<GenerationResponse, GenerationError> {
        let model = self.resolve_model(options);
        let Some(key) = config::resolve([api_key, self.env.openai_api_key.as_deref()]) else {
            warn!("OpenAI API key is not provided by user and not found in OPENAI_API_KEY.");
            return Ok(mock_response(&model, prompt));
        };

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", key)).map_err(|_| {
                GenerationError::vendor(Provider::OpenAI, "API key contains invalid characters")
            })?,
        );

        info!("Using OpenAI with: Model='{}'", model);
        chat_completions::execute(
            &self.client,
            ChatCompletionCall {
                provider: Provider::OpenAI,
                url: format!(
                    "{}/v1/chat/completions",
                    self.env.openai_base().trim_end_matches('/')
                ),
                headers,
                body: json!({
                    "model": model,
                    "messages": chat_completions::user_messages(prompt),
                }),
                options,
            },
        )
        .await
    }
}

fn mock_response(model: &str, prompt: &str) -> GenerationResponse {
    let excerpt: String = prompt.chars().take(PROMPT_EXCERPT_CHARS).collect();
    GenerationResponse::text(format!(
        "# Mock OpenAI Response (No API Key)\n\nThis is a mock response because no OpenAI API key was available.\n\nUsing model: {}\nPrompt received:\n{}...",
        model, excerpt
    ))
}

use reqwest::{
    header::{HeaderMap, HeaderValue, CONTENT_TYPE},
    Client,
};
use serde_json::json;
use tracing::{info, warn};

use super::chat_completions::{self, ChatCompletionCall};
use crate::{
    config::{self, ProviderEnv, AZURE_OPENAI_DEFAULT_DEPLOYMENT_NAME},
    error::GenerationError,
    models::{GenerationOptions, GenerationResponse, Provider},
};

/**
 * \brief Azure OpenAI adapter. Calls are addressed by endpoint + deployment
 * and authenticated with the `api-key` header.
 */
pub struct AzureOpenAiAdapter<'a> {
    env: &'a ProviderEnv,
    client: Client,
}

impl<'a> AzureOpenAiAdapter<'a> {
    pub fn new(env: &'a ProviderEnv) -> Self {
        Self {
            env,
            client: Client::new(),
        }
    }

    pub fn resolve_endpoint(&self, options: &GenerationOptions) -> Option<String> {
        config::resolve([
            options.azure_endpoint.as_deref(),
            self.env.azure_endpoint.as_deref(),
        ])
    }

    pub fn resolve_deployment(&self, options: &GenerationOptions) -> String {
        match config::resolve([
            options.azure_deployment_name.as_deref(),
            self.env.azure_deployment_name.as_deref(),
        ]) {
            Some(name) => name,
            None => {
                warn!(
                    "Azure OpenAI Deployment Name not provided by user or in AZURE_OPENAI_DEPLOYMENT_NAME. Using default: {}. This may need configuration for your specific Azure resource.",
                    AZURE_OPENAI_DEFAULT_DEPLOYMENT_NAME
                );
                AZURE_OPENAI_DEFAULT_DEPLOYMENT_NAME.to_string()
            }
        }
    }

    /**
     * \brief Generate a completion. A missing key or endpoint yields a mock
     * response naming what is missing.
     */
    pub async fn generate(
        &self,
        api_key: Option<&str>,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<GenerationResponse, GenerationError> {
        let Some(key) = config::resolve([api_key, self.env.azure_api_key.as_deref()]) else {
            warn!("Azure OpenAI API key not provided by user and not in AZURE_OPENAI_API_KEY.");
            return Ok(GenerationResponse::text(
                "# Mock Azure OpenAI Response (No API Key)\n\nThis is a mock response. An API key is required for Azure OpenAI.",
            ));
        };
        let Some(endpoint) = self.resolve_endpoint(options) else {
            warn!("Azure OpenAI Endpoint not provided by user and not in AZURE_OPENAI_ENDPOINT.");
            return Ok(GenerationResponse::text(
                "# Mock Azure OpenAI Response (No Endpoint)\n\nThis is a mock response. An endpoint is required for Azure OpenAI.",
            ));
        };
        let deployment = self.resolve_deployment(options);

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            "api-key",
            HeaderValue::from_str(&key).map_err(|_| {
                GenerationError::vendor(
                    Provider::AzureOpenAI,
                    "API key contains invalid characters",
                )
            })?,
        );

        info!(
            "Using Azure OpenAI with: Endpoint='{}', Deployment='{}'",
            endpoint, deployment
        );
        chat_completions::execute(
            &self.client,
            ChatCompletionCall {
                provider: Provider::AzureOpenAI,
                url: chat_url(&endpoint, &deployment, self.env.azure_api_version()),
                headers,
                body: json!({ "messages": chat_completions::user_messages(prompt) }),
                options,
            },
        )
        .await
    }
}

fn chat_url(endpoint: &str, deployment: &str, api_version: &str) -> String {
    format!(
        "{}/openai/deployments/{}/chat/completions?api-version={}",
        endpoint.trim_end_matches('/'),
        deployment,
        api_version
    )
}

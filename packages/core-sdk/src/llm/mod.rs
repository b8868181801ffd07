pub mod azure;
pub mod chat_completions;
pub mod gemini;
pub mod openai;

use tracing::{debug, error, info, warn};

use crate::{
    config::ProviderEnv,
    error::GenerationError,
    models::{GenerationOptions, GenerationRequest, GenerationResponse, Provider},
};

pub use azure::AzureOpenAiAdapter;
pub use gemini::GeminiAdapter;
pub use openai::OpenAiAdapter;

/**
 * \brief Route one generation call to the adapter for `provider`.
 *
 * Single shot: no retry, no timeout beyond the HTTP client defaults.
 * Options that do not apply to `provider` are logged and ignored.
 */
pub async fn generate(
    env: &ProviderEnv,
    provider: Provider,
    api_key: Option<&str>,
    prompt: &str,
    options: &GenerationOptions,
) -> Result<GenerationResponse, GenerationError> {
    log_irrelevant_options(provider, options);
    info!(
        provider = provider.id(),
        prompt_len = prompt.len(),
        streaming = options.on_stream_token.is_some(),
        "dispatching generation"
    );

    match provider {
        Provider::Gemini => {
            GeminiAdapter::new(env)
                .generate(api_key, prompt, options)
                .await
        }
        Provider::OpenAI => {
            OpenAiAdapter::new(env)
                .generate(api_key, prompt, options)
                .await
        }
        Provider::AzureOpenAI => {
            AzureOpenAiAdapter::new(env)
                .generate(api_key, prompt, options)
                .await
        }
    }
}

/**
 * \brief Convenience wrapper taking a whole request.
 */
pub async fn generate_request(
    env: &ProviderEnv,
    request: &GenerationRequest,
) -> Result<GenerationResponse, GenerationError> {
    generate(
        env,
        request.provider,
        request.api_key.as_deref(),
        &request.prompt,
        &request.options,
    )
    .await
}

fn log_irrelevant_options(provider: Provider, options: &GenerationOptions) {
    let azure_fields = options.azure_endpoint.is_some() || options.azure_deployment_name.is_some();
    let openai_fields = options.openai_model_name.is_some();

    match provider {
        Provider::Gemini => {
            if azure_fields || openai_fields {
                debug!("ignoring OpenAI/Azure options for {}", provider);
            }
        }
        Provider::OpenAI => {
            if options.use_grounding {
                warn!("Grounding is not supported for OpenAI.");
            }
            if azure_fields {
                debug!("ignoring Azure options for {}", provider);
            }
        }
        Provider::AzureOpenAI => {
            if options.use_grounding {
                warn!("Grounding is not supported for Azure OpenAI.");
            }
            if openai_fields {
                debug!("ignoring OpenAI model option for {}", provider);
            }
        }
    }
}

/**
 * \brief Forward one token to the sink, if any. A dropped receiver is not an error.
 */
pub(crate) fn emit_token(options: &GenerationOptions, token: &str) {
    if let Some(sink) = &options.on_stream_token {
        if sink.send(token.to_string()).is_err() {
            debug!("stream token receiver dropped");
        }
    }
}

/**
 * \brief Turn a non-2xx response into a vendor error, preferring the
 * vendor's own `error.message`.
 */
pub(crate) async fn ensure_success(
    provider: Provider,
    resp: reqwest::Response,
) -> Result<reqwest::Response, GenerationError> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    error!(provider = provider.id(), %status, "vendor request failed");
    Err(GenerationError::vendor(provider, describe_failure(status, &body)))
}

pub(crate) fn describe_failure(status: reqwest::StatusCode, body: &str) -> String {
    let detail = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")?
                .get("message")?
                .as_str()
                .map(|s| s.to_string())
        })
        .unwrap_or_else(|| body.trim().to_string());
    if detail.is_empty() {
        format!("request failed: {}", status)
    } else {
        format!("request failed: {} -> {}", status, detail)
    }
}

pub(crate) fn transport_error(provider: Provider, err: reqwest::Error) -> GenerationError {
    error!(provider = provider.id(), "vendor call failed: {}", err);
    GenerationError::vendor(provider, err.to_string())
}

pub(crate) fn unexpected_format(provider: Provider) -> GenerationError {
    GenerationError::vendor(
        provider,
        format!(
            "Received an unexpected response format from {} API (text was not a string).",
            provider.vendor()
        ),
    )
}

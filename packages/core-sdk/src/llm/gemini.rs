use reqwest::{
    header::{HeaderMap, HeaderValue, CONTENT_TYPE},
    Client,
};
use serde_json::{json, Value};
use tracing::{debug, info};

use super::{emit_token, ensure_success, transport_error, unexpected_format};
use crate::{
    config::{self, ProviderEnv},
    error::GenerationError,
    models::{Citation, GenerationOptions, GenerationResponse, Provider},
};

/**
 * \brief Gemini `generateContent` adapter.
 *
 * The only adapter that supports grounding; also the only one without a
 * mock fallback, so a missing key is an error.
 */
pub struct GeminiAdapter<'a> {
    env: &'a ProviderEnv,
    client: Client,
}

impl<'a> GeminiAdapter<'a> {
    pub fn new(env: &'a ProviderEnv) -> Self {
        Self {
            env,
            client: Client::new(),
        }
    }

    pub async fn generate(
        &self,
        api_key: Option<&str>,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<GenerationResponse, GenerationError> {
        let key = config::resolve([api_key, self.env.gemini_api_key.as_deref()]).ok_or(
            GenerationError::MissingCredential {
                provider: Provider::Gemini,
            },
        )?;

        let model = self.env.gemini_model();
        let url = format!(
            "{}/models/{}:generateContent",
            normalize_gemini_base(self.env.gemini_base()),
            model
        );
        let mut body = json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
        });
        if options.use_grounding {
            body["tools"] = json!([{ "google_search": {} }]);
        }

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            "x-goog-api-key",
            HeaderValue::from_str(&key).map_err(|_| {
                GenerationError::vendor(Provider::Gemini, "API key contains invalid characters")
            })?,
        );

        info!(
            "Using Gemini with: Model='{}', grounding={}",
            model, options.use_grounding
        );
        let resp = self
            .client
            .post(url)
            .headers(headers)
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(Provider::Gemini, e))?;
        let resp = ensure_success(Provider::Gemini, resp).await?;
        let v: Value = resp
            .json()
            .await
            .map_err(|e| transport_error(Provider::Gemini, e))?;

        let text = extract_gemini_text(&v).ok_or_else(|| unexpected_format(Provider::Gemini))?;
        let grounding_chunks = if options.use_grounding {
            let citations = extract_citations(&v);
            debug!(citations = citations.len(), "grounding metadata");
            Some(citations).filter(|c| !c.is_empty())
        } else {
            None
        };

        // No incremental streaming here; the sink sees the whole text at once.
        if !text.is_empty() {
            emit_token(options, &text);
        }
        Ok(GenerationResponse {
            text,
            grounding_chunks,
        })
    }
}

fn extract_gemini_text(v: &Value) -> Option<String> {
    let parts = v
        .get("candidates")?
        .get(0)?
        .get("content")?
        .get("parts")?
        .as_array()?;
    let texts = parts
        .iter()
        .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
        .collect::<Vec<_>>();
    if texts.is_empty() {
        None
    } else {
        Some(texts.join(""))
    }
}

/**
 * \brief Citations from `candidates[0].groundingMetadata.groundingChunks`,
 * in vendor order. Entries with neither a web nor a retrieved-context source
 * are skipped.
 */
fn extract_citations(v: &Value) -> Vec<Citation> {
    v.get("candidates")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("groundingMetadata"))
        .and_then(|m| m.get("groundingChunks"))
        .and_then(|c| c.as_array())
        .map(|chunks| {
            chunks
                .iter()
                .filter_map(|chunk| serde_json::from_value::<Citation>(chunk.clone()).ok())
                .collect()
        })
        .unwrap_or_default()
}

fn normalize_gemini_base(api_base: &str) -> String {
    let trimmed = api_base.trim_end_matches('/');
    if trimmed.ends_with("/v1")
        || trimmed.ends_with("/v1beta")
        || trimmed.contains("/v1/")
        || trimmed.contains("/v1beta/")
    {
        trimmed.to_string()
    } else {
        format!("{}/v1beta", trimmed)
    }
}

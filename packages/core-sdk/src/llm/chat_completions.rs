//! Chat-completions plumbing shared by the OpenAI and Azure OpenAI adapters.

use async_stream::try_stream;
use futures_util::{Stream, StreamExt};
use reqwest::{header::HeaderMap, Client};
use serde_json::{json, Value};
use tracing::debug;

use super::{emit_token, ensure_success, transport_error, unexpected_format};
use crate::{
    error::GenerationError,
    models::{GenerationOptions, GenerationResponse, Provider},
};

/**
 * \brief One fully-resolved chat-completions call.
 */
pub(crate) struct ChatCompletionCall<'a> {
    pub provider: Provider,
    pub url: String,
    pub headers: HeaderMap,
    /** \brief Request body without the `stream` flag. */
    pub body: Value,
    pub options: &'a GenerationOptions,
}

/**
 * \brief Single user message, the only shape this application sends.
 */
pub(crate) fn user_messages(prompt: &str) -> Value {
    json!([{ "role": "user", "content": prompt }])
}

/**
 * \brief Execute the call, streaming when the options carry a token sink.
 *
 * When streaming, the returned text is the concatenation of every token
 * forwarded to the sink, in arrival order.
 */
pub(crate) async fn execute(
    client: &Client,
    call: ChatCompletionCall<'_>,
) -> Result<GenerationResponse, GenerationError> {
    let provider = call.provider;
    let streaming = call.options.on_stream_token.is_some();
    let mut body = call.body;
    body["stream"] = json!(streaming);

    let resp = client
        .post(&call.url)
        .headers(call.headers)
        .json(&body)
        .send()
        .await
        .map_err(|e| transport_error(provider, e))?;
    let resp = ensure_success(provider, resp).await?;

    if !streaming {
        let v: Value = resp.json().await.map_err(|e| transport_error(provider, e))?;
        let text = extract_message_content(&v).ok_or_else(|| unexpected_format(provider))?;
        return Ok(GenerationResponse::text(text));
    }

    let deltas = delta_stream(resp);
    futures_util::pin_mut!(deltas);
    let mut text = String::new();
    let mut tokens = 0usize;
    while let Some(delta) = deltas.next().await {
        let delta = delta.map_err(|message| GenerationError::vendor(provider, message))?;
        emit_token(call.options, &delta);
        text.push_str(&delta);
        tokens += 1;
    }
    debug!(provider = provider.id(), tokens, "stream finished");
    Ok(GenerationResponse::text(text))
}

fn extract_message_content(v: &Value) -> Option<String> {
    v.get("choices")?
        .get(0)?
        .get("message")?
        .get("content")?
        .as_str()
        .map(|s| s.to_string())
}

#[derive(Debug, PartialEq, Eq)]
enum SseEvent {
    Delta(String),
    Done,
    Skip,
}

/**
 * \brief Decode an SSE body into content deltas. Stops at `[DONE]`; a body
 * that ends without it yields an error after any deltas already seen.
 */
fn delta_stream(resp: reqwest::Response) -> impl Stream<Item = Result<String, String>> {
    let mut bytes = resp.bytes_stream();
    try_stream! {
        let mut buf = Vec::<u8>::new();
        let mut done = false;
        while !done {
            let chunk = match bytes.next().await {
                Some(chunk) => chunk.map_err(|e| e.to_string())?,
                None => break,
            };
            buf.extend(chunk.iter().copied().filter(|b| *b != b'\r'));
            while let Some(pos) = find_double_newline(&buf) {
                let block = buf.drain(..pos + 2).collect::<Vec<u8>>();
                match parse_event(&block)? {
                    SseEvent::Delta(delta) => {
                        yield delta;
                    }
                    SseEvent::Done => {
                        done = true;
                        break;
                    }
                    SseEvent::Skip => {}
                }
            }
        }
        if !done && !buf.is_empty() {
            match parse_event(&buf)? {
                SseEvent::Delta(delta) => {
                    yield delta;
                }
                SseEvent::Done => done = true,
                SseEvent::Skip => {}
            }
        }
        // A body that closes without the terminator is truncated or not SSE.
        if !done {
            Err::<(), String>(STREAM_NOT_TERMINATED.to_string())?;
        }
    }
}

const STREAM_NOT_TERMINATED: &str = "stream ended before [DONE]";

fn find_double_newline(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == b"\n\n")
}

fn parse_event(block: &[u8]) -> Result<SseEvent, String> {
    let text = String::from_utf8_lossy(block);
    let data = text
        .lines()
        .filter_map(|line| line.trim_start().strip_prefix("data:"))
        .map(str::trim)
        .collect::<Vec<_>>();
    if data.is_empty() {
        return Ok(SseEvent::Skip);
    }
    let payload = data.join("\n");
    if payload == "[DONE]" {
        return Ok(SseEvent::Done);
    }

    let v: Value = serde_json::from_str(&payload)
        .map_err(|e| format!("malformed stream chunk: {}", e))?;
    if let Some(err) = v.get("error") {
        let message = err
            .get("message")
            .and_then(|m| m.as_str())
            .map(|m| m.to_string())
            .unwrap_or_else(|| err.to_string());
        return Err(message);
    }
    let delta = v
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("delta"))
        .and_then(|d| d.get("content"))
        .and_then(|c| c.as_str())
        .filter(|c| !c.is_empty());
    Ok(match delta {
        Some(delta) => SseEvent::Delta(delta.to_string()),
        None => SseEvent::Skip,
    })
}

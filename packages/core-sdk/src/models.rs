use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::GenerationError;

/**
 * \brief Closed set of LLM backends.
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Provider {
    Gemini,
    #[serde(rename = "openai")]
    OpenAI,
    #[serde(rename = "azure-openai")]
    AzureOpenAI,
}

impl Provider {
    /** \brief All providers, in the order the UI lists them. */
    pub const ALL: [Provider; 3] = [Provider::Gemini, Provider::AzureOpenAI, Provider::OpenAI];

    /**
     * \brief Label shown in the UI selector.
     */
    pub fn label(self) -> &'static str {
        match self {
            Provider::Gemini => "Google Gemini",
            Provider::OpenAI => "OpenAI",
            Provider::AzureOpenAI => "Azure OpenAI",
        }
    }

    /**
     * \brief Vendor name used in normalized error messages.
     */
    pub fn vendor(self) -> &'static str {
        match self {
            Provider::Gemini => "Gemini",
            Provider::OpenAI => "OpenAI",
            Provider::AzureOpenAI => "Azure OpenAI",
        }
    }

    /** \brief Stable id used on the wire and on the command line. */
    pub fn id(self) -> &'static str {
        match self {
            Provider::Gemini => "gemini",
            Provider::OpenAI => "openai",
            Provider::AzureOpenAI => "azure-openai",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Provider {
    type Err = GenerationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gemini" | "google" | "google gemini" => Ok(Provider::Gemini),
            "openai" => Ok(Provider::OpenAI),
            "azure-openai" | "azure" | "azure openai" | "azure_openai" => {
                Ok(Provider::AzureOpenAI)
            }
            _ => Err(GenerationError::UnsupportedProvider(s.to_string())),
        }
    }
}

/**
 * \brief Receives partial tokens while a streaming generation is in flight.
 */
pub type TokenSink = mpsc::UnboundedSender<String>;

/**
 * \brief Provider-dependent option bag. Fields that do not apply to the
 * selected provider are ignored.
 */
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationOptions {
    /** \brief Gemini only: attach Google Search grounding. */
    #[serde(default)]
    pub use_grounding: bool,
    /** \brief Azure only. */
    #[serde(default)]
    pub azure_endpoint: Option<String>,
    /** \brief Azure only. */
    #[serde(default)]
    pub azure_deployment_name: Option<String>,
    /** \brief OpenAI only. */
    #[serde(default)]
    pub openai_model_name: Option<String>,
    /** \brief Optional sink for streamed tokens. */
    #[serde(skip)]
    pub on_stream_token: Option<TokenSink>,
}

impl GenerationOptions {
    pub fn with_stream_sink(mut self, sink: TokenSink) -> Self {
        self.on_stream_token = Some(sink);
        self
    }
}

/**
 * \brief One generation call as issued by the UI shell.
 */
#[derive(Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub provider: Provider,
    #[serde(default)]
    pub api_key: Option<String>,
    pub prompt: String,
    #[serde(default)]
    pub options: GenerationOptions,
}

impl fmt::Debug for GenerationRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerationRequest")
            .field("provider", &self.provider)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("prompt_len", &self.prompt.len())
            .field("options", &self.options)
            .finish()
    }
}

/**
 * \brief Normalized model output.
 */
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationResponse {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grounding_chunks: Option<Vec<Citation>>,
}

impl GenerationResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            grounding_chunks: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Web,
    RetrievedContext,
}

/**
 * \brief Grounding citation. Serialized in the vendor shape:
 * `{"web": {"uri", "title"}}` or `{"retrievedContext": {...}}`.
 */
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Citation {
    pub source_kind: SourceKind,
    pub uri: String,
    pub title: String,
}

#[derive(Serialize, Deserialize, Default)]
struct CitationSource {
    #[serde(default)]
    uri: String,
    #[serde(default)]
    title: String,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CitationWire {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    web: Option<CitationSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    retrieved_context: Option<CitationSource>,
}

impl Serialize for Citation {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let source = CitationSource {
            uri: self.uri.clone(),
            title: self.title.clone(),
        };
        let wire = match self.source_kind {
            SourceKind::Web => CitationWire {
                web: Some(source),
                retrieved_context: None,
            },
            SourceKind::RetrievedContext => CitationWire {
                web: None,
                retrieved_context: Some(source),
            },
        };
        wire.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Citation {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let wire = CitationWire::deserialize(deserializer)?;
        let (source_kind, source) = match (wire.web, wire.retrieved_context) {
            (Some(web), _) => (SourceKind::Web, web),
            (None, Some(ctx)) => (SourceKind::RetrievedContext, ctx),
            (None, None) => {
                return Err(serde::de::Error::custom(
                    "citation needs a `web` or `retrievedContext` source",
                ))
            }
        };
        Ok(Citation {
            source_kind,
            uri: source.uri,
            title: source.title,
        })
    }
}

/**
 * \brief Built-in document type.
 */
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentType {
    pub id: &'static str,
    pub name: &'static str,
}

/**
 * \brief Editable template and description for one document type.
 */
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentTypeSetting {
    pub template: String,
    pub description: String,
}

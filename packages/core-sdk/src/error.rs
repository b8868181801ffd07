use thiserror::Error;

use crate::models::Provider;

/**
 * \brief Errors surfaced by generation and session editing.
 *
 * Missing OpenAI/Azure configuration is not an error: those adapters answer
 * with a mock response instead.
 */
#[derive(Debug, Error)]
pub enum GenerationError {
    /** \brief Credential absent for a provider that has no mock fallback. */
    #[error("API key for {provider} is not provided and not found in environment variables.")]
    MissingCredential { provider: Provider },

    /** \brief Remote call failed or returned an unusable payload. */
    #[error("{} API error: {message}", .provider.vendor())]
    Vendor { provider: Provider, message: String },

    #[error("Unsupported LLM provider: {0}")]
    UnsupportedProvider(String),

    #[error("Unknown document type: {0}")]
    UnknownDocumentType(String),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl GenerationError {
    pub(crate) fn vendor(provider: Provider, message: impl Into<String>) -> Self {
        GenerationError::Vendor {
            provider,
            message: message.into(),
        }
    }

    /**
     * \brief Whether the failure came from the remote side rather than the caller.
     */
    pub fn is_vendor(&self) -> bool {
        matches!(self, GenerationError::Vendor { .. })
    }
}

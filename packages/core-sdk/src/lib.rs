pub mod config;
pub mod content;
pub mod error;
pub mod llm;
pub mod models;
pub mod prompt;
pub mod server;
pub mod telemetry;

/**
 * \brief SDK prelude for the commonly used modules and types.
 */
pub mod prelude {
    pub use crate::config::{self, ProviderEnv};
    pub use crate::content::{self, Session};
    pub use crate::error::GenerationError;
    pub use crate::llm;
    pub use crate::models::{
        Citation, GenerationOptions, GenerationRequest, GenerationResponse, Provider, SourceKind,
    };
    pub use crate::prompt;
    pub use crate::server;
    pub use crate::telemetry;
}

/**
 * \brief Built-in fallbacks used when neither the request nor the
 * environment provides a value.
 */
pub const GEMINI_MODEL_NAME: &str = "gemini-2.5-flash-preview-04-17";
pub const OPENAI_MODEL_NAME: &str = "gpt-4o-mini";
pub const AZURE_OPENAI_DEFAULT_DEPLOYMENT_NAME: &str = "your-gpt-4o-mini-deployment";
pub const AZURE_OPENAI_API_VERSION: &str = "2024-06-01";

pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com";
pub const OPENAI_API_BASE: &str = "https://api.openai.com";

/**
 * \brief Read-only snapshot of the environment fallbacks for all providers.
 *
 * Built once via [`ProviderEnv::from_env`] and passed by reference into the
 * adapters; tests build it directly.
 */
#[derive(Clone, Default)]
pub struct ProviderEnv {
    pub gemini_api_key: Option<String>,
    pub gemini_model_name: Option<String>,
    pub gemini_api_base: Option<String>,
    pub openai_api_key: Option<String>,
    pub openai_model_name: Option<String>,
    pub openai_api_base: Option<String>,
    pub azure_api_key: Option<String>,
    pub azure_endpoint: Option<String>,
    pub azure_deployment_name: Option<String>,
    pub azure_api_version: Option<String>,
}

impl ProviderEnv {
    /**
     * \brief Snapshot the process environment. Unset and blank variables are
     * both treated as absent.
     */
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /**
     * \brief Build from an arbitrary lookup function.
     */
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| non_blank(lookup(name).as_deref());
        Self {
            gemini_api_key: get("GEMINI_API_KEY").or_else(|| get("API_KEY")),
            gemini_model_name: get("GEMINI_MODEL_NAME"),
            gemini_api_base: get("GEMINI_API_BASE"),
            openai_api_key: get("OPENAI_API_KEY"),
            openai_model_name: get("OPENAI_MODEL_NAME"),
            openai_api_base: get("OPENAI_API_BASE"),
            azure_api_key: get("AZURE_OPENAI_API_KEY"),
            azure_endpoint: get("AZURE_OPENAI_ENDPOINT"),
            azure_deployment_name: get("AZURE_OPENAI_DEPLOYMENT_NAME"),
            azure_api_version: get("AZURE_OPENAI_API_VERSION"),
        }
    }

    pub fn gemini_model(&self) -> &str {
        self.gemini_model_name.as_deref().unwrap_or(GEMINI_MODEL_NAME)
    }

    pub fn gemini_base(&self) -> &str {
        self.gemini_api_base.as_deref().unwrap_or(GEMINI_API_BASE)
    }

    pub fn openai_base(&self) -> &str {
        self.openai_api_base.as_deref().unwrap_or(OPENAI_API_BASE)
    }

    pub fn azure_api_version(&self) -> &str {
        self.azure_api_version
            .as_deref()
            .unwrap_or(AZURE_OPENAI_API_VERSION)
    }
}

impl std::fmt::Debug for ProviderEnv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let set = |v: &Option<String>| v.as_ref().map(|_| "<set>");
        f.debug_struct("ProviderEnv")
            .field("gemini_api_key", &set(&self.gemini_api_key))
            .field("gemini_model_name", &self.gemini_model_name)
            .field("gemini_api_base", &self.gemini_api_base)
            .field("openai_api_key", &set(&self.openai_api_key))
            .field("openai_model_name", &self.openai_model_name)
            .field("openai_api_base", &self.openai_api_base)
            .field("azure_api_key", &set(&self.azure_api_key))
            .field("azure_endpoint", &self.azure_endpoint)
            .field("azure_deployment_name", &self.azure_deployment_name)
            .field("azure_api_version", &self.azure_api_version)
            .finish()
    }
}

/**
 * \brief First non-blank candidate, trimmed.
 */
pub fn resolve<'a>(candidates: impl IntoIterator<Item = Option<&'a str>>) -> Option<String> {
    candidates.into_iter().find_map(non_blank)
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|v| v.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> ProviderEnv {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ProviderEnv::from_lookup(|name| map.get(name).cloned())
    }

    #[test]
    fn blank_variables_are_absent() {
        let env = env_of(&[("OPENAI_API_KEY", "   "), ("AZURE_OPENAI_ENDPOINT", "")]);
        assert!(env.openai_api_key.is_none());
        assert!(env.azure_endpoint.is_none());
    }

    #[test]
    fn gemini_key_falls_back_to_generic_api_key() {
        let env = env_of(&[("API_KEY", "generic")]);
        assert_eq!(env.gemini_api_key.as_deref(), Some("generic"));
        let env = env_of(&[("API_KEY", "generic"), ("GEMINI_API_KEY", "specific")]);
        assert_eq!(env.gemini_api_key.as_deref(), Some("specific"));
    }

    #[test]
    fn defaults_apply_when_unset() {
        let env = ProviderEnv::default();
        assert_eq!(env.gemini_model(), GEMINI_MODEL_NAME);
        assert_eq!(env.openai_base(), OPENAI_API_BASE);
        assert_eq!(env.azure_api_version(), AZURE_OPENAI_API_VERSION);
    }

    #[test]
    fn resolve_skips_blank_candidates() {
        assert_eq!(
            resolve([Some(" "), None, Some(" model "), Some("other")]),
            Some("model".to_string())
        );
        assert_eq!(resolve([None, Some("")]), None);
    }

    #[test]
    fn debug_hides_keys() {
        let env = env_of(&[("OPENAI_API_KEY", "sk-live")]);
        assert!(!format!("{:?}", env).contains("sk-live"));
    }
}

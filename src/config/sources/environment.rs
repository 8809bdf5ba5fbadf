//! Environment source: STUDYGEN__SECTION__KEY variables and vendor key aliases.

use crate::config::{AiConfig, EnvSnapshot};
use config::builder::DefaultState;
use config::{ConfigBuilder, Environment};

const GEMINI_KEY_ALIASES: &[&str] = &["GEMINI_API_KEY", "GOOGLE_GENERATIVE_AI_API_KEY"];
const OPENAI_KEY_ALIASES: &[&str] = &["OPENAI_API_KEY"];

pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
    env: &EnvSnapshot,
) -> ConfigBuilder<DefaultState> {
    builder.add_source(
        Environment::with_prefix("STUDYGEN")
            .separator("__")
            .try_parsing(true)
            .source(Some(env.vars().clone().into_iter().collect())),
    )
}

/// Fill API keys that no other layer set from the vendor's usual variables.
pub fn apply_key_aliases(ai: &mut AiConfig, env: &EnvSnapshot) {
    if ai.gemini_api_key.trim().is_empty() {
        if let Some(key) = GEMINI_KEY_ALIASES.iter().find_map(|name| env.get(name)) {
            ai.gemini_api_key = key.to_string();
        }
    }
    if ai.openai_api_key.trim().is_empty() {
        if let Some(key) = OPENAI_KEY_ALIASES.iter().find_map(|name| env.get(name)) {
            ai.openai_api_key = key.to_string();
        }
    }
}

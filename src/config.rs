use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::api::DecoderLimits;
use crate::types::Language;
use crate::util::{env_nonempty, is_local_endpoint_url};

const CHAT_FUNCTION_PATH: &str = "/functions/v1/medical-chat";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub chat_url: Option<String>,
    pub publishable_key: Option<String>,
    pub language: Language,
    pub max_line_retries: u32,
    pub max_buffer_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        let limits = DecoderLimits::default();
        Self {
            chat_url: None,
            publishable_key: None,
            language: Language::default(),
            max_line_retries: limits.max_line_retries,
            max_buffer_bytes: limits.max_buffer_bytes,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let defaults = Self::default();

        let chat_url = env_nonempty("MEDCHAT_CHAT_URL").or_else(|| {
            env_nonempty("SUPABASE_URL")
                .map(|base| format!("{}{CHAT_FUNCTION_PATH}", base.trim_end_matches('/')))
        });
        let publishable_key = env_nonempty("MEDCHAT_PUBLISHABLE_KEY")
            .or_else(|| env_nonempty("SUPABASE_PUBLISHABLE_KEY"));
        let language = env_nonempty("MEDCHAT_LANGUAGE")
            .map(|code| Language::from_code(&code))
            .unwrap_or_default();
        let max_line_retries = env_nonempty("MEDCHAT_MAX_LINE_RETRIES")
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(defaults.max_line_retries);
        let max_buffer_bytes = env_nonempty("MEDCHAT_MAX_BUFFER_BYTES")
            .and_then(|v| v.parse::<usize>().ok())
            .filter(|bytes| *bytes > 0)
            .unwrap_or(defaults.max_buffer_bytes);

        Ok(Self {
            chat_url,
            publishable_key,
            language,
            max_line_retries,
            max_buffer_bytes,
        })
    }

    pub fn validate(&self) -> Result<()> {
        let Some(chat_url) = self.chat_url.as_deref() else {
            bail!("MEDCHAT_CHAT_URL (or SUPABASE_URL) must be set");
        };

        if !chat_url.starts_with("http://") && !chat_url.starts_with("https://") {
            bail!("Invalid MEDCHAT_CHAT_URL '{chat_url}': expected http:// or https:// URL");
        }

        if !is_local_endpoint_url(chat_url) && self.publishable_key.is_none() {
            bail!("MEDCHAT_PUBLISHABLE_KEY must be set for non-local endpoints (url: '{chat_url}')");
        }

        Ok(())
    }

    pub fn decoder_limits(&self) -> DecoderLimits {
        DecoderLimits {
            max_line_retries: self.max_line_retries,
            max_buffer_bytes: self.max_buffer_bytes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENV_KEYS: [&str; 7] = [
        "MEDCHAT_CHAT_URL",
        "SUPABASE_URL",
        "MEDCHAT_PUBLISHABLE_KEY",
        "SUPABASE_PUBLISHABLE_KEY",
        "MEDCHAT_LANGUAGE",
        "MEDCHAT_MAX_LINE_RETRIES",
        "MEDCHAT_MAX_BUFFER_BYTES",
    ];

    fn clear_env() {
        for key in ENV_KEYS {
            std::env::remove_var(key);
        }
    }

    #[test]
    fn test_load_builds_function_url_from_supabase_base() {
        let _env_lock = crate::test_support::ENV_LOCK.blocking_lock();
        clear_env();
        std::env::set_var("SUPABASE_URL", "https://demo.supabase.co/");
        std::env::set_var("SUPABASE_PUBLISHABLE_KEY", "pk_test");
        std::env::set_var("MEDCHAT_LANGUAGE", "hi");

        let config = Config::load().unwrap();
        assert_eq!(
            config.chat_url.as_deref(),
            Some("https://demo.supabase.co/functions/v1/medical-chat")
        );
        assert_eq!(config.publishable_key.as_deref(), Some("pk_test"));
        assert_eq!(config.language, Language::Hindi);
        assert!(config.validate().is_ok());
        clear_env();
    }

    #[test]
    fn test_explicit_chat_url_wins() {
        let _env_lock = crate::test_support::ENV_LOCK.blocking_lock();
        clear_env();
        std::env::set_var("SUPABASE_URL", "https://demo.supabase.co");
        std::env::set_var("MEDCHAT_CHAT_URL", "http://localhost:54321/chat");
        std::env::set_var("MEDCHAT_MAX_LINE_RETRIES", "3");

        let config = Config::load().unwrap();
        assert_eq!(config.chat_url.as_deref(), Some("http://localhost:54321/chat"));
        assert_eq!(config.decoder_limits().max_line_retries, 3);
        clear_env();
    }

    #[test]
    fn test_validate_requires_endpoint() {
        let config = Config::default();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("MEDCHAT_CHAT_URL"));
    }
}

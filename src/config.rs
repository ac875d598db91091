use std::env;
use std::path::PathBuf;
use std::time::Duration;

use tracing::{info, warn};

pub const DEFAULT_DASHSCOPE_BASE_URL: &str = "https://dashscope.aliyuncs.com/api/v1";
const MIN_POLL_INTERVAL_MS: u64 = 500;

#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error("{0} is required; set it in .env or the environment")]
    MissingVariable(&'static str),
    #[error("Invalid value for {name}: {value:?} ({reason})")]
    InvalidValue {
        name: &'static str,
        value: String,
        reason: &'static str,
    },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub dashscope_api_key: String,
    pub dashscope_base_url: String,
    pub log_level: String,
    pub http_timeout_seconds: u64,
    pub optimizer_model: String,
    pub optimizer_temperature: f32,
    pub image_model: String,
    pub image_size: String,
    pub image_task_poll_interval_ms: u64,
    pub image_task_timeout_seconds: u64,
    pub output_dir: Option<PathBuf>,
}

type Lookup<'a> = &'a dyn Fn(&str) -> Option<String>;

fn env_string(lookup: Lookup<'_>, name: &str, default: &str) -> String {
    lookup(name)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_optional(lookup: Lookup<'_>, name: &str) -> Option<String> {
    lookup(name)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn env_f32(lookup: Lookup<'_>, name: &'static str, default: f32) -> Result<f32, ConfigurationError> {
    let Some(raw) = env_optional(lookup, name) else {
        return Ok(default);
    };
    raw.parse::<f32>()
        .map_err(|_| ConfigurationError::InvalidValue {
            name,
            value: raw,
            reason: "expected a number",
        })
}

fn env_u64(lookup: Lookup<'_>, name: &'static str, default: u64) -> Result<u64, ConfigurationError> {
    let Some(raw) = env_optional(lookup, name) else {
        return Ok(default);
    };
    raw.parse::<u64>()
        .map_err(|_| ConfigurationError::InvalidValue {
            name,
            value: raw,
            reason: "expected a non-negative integer",
        })
}

fn normalize_image_size(value: String) -> Result<String, ConfigurationError> {
    // DashScope expects WIDTH*HEIGHT; accept the common WIDTHxHEIGHT spelling too.
    let normalized = value.replace(['x', 'X'], "*");
    let mut dims = normalized.split('*');
    let valid = match (dims.next(), dims.next(), dims.next()) {
        (Some(w), Some(h), None) => w.parse::<u32>().is_ok() && h.parse::<u32>().is_ok(),
        _ => false,
    };
    if !valid {
        return Err(ConfigurationError::InvalidValue {
            name: "IMAGE_SIZE",
            value,
            reason: "expected WIDTH*HEIGHT",
        });
    }
    Ok(normalized)
}

impl Config {
    pub fn load() -> Result<Self, ConfigurationError> {
        Self::from_lookup(&|name: &str| env::var(name).ok())
    }

    /// Delay between task polls. Zero is raised to a floor so polling never spins.
    pub fn image_task_poll_interval(&self) -> Duration {
        if self.image_task_poll_interval_ms == 0 {
            return Duration::from_millis(MIN_POLL_INTERVAL_MS);
        }
        Duration::from_millis(self.image_task_poll_interval_ms)
    }

    pub fn log_summary(&self) {
        if self.image_task_poll_interval_ms == 0 {
            warn!(
                "IMAGE_TASK_POLL_INTERVAL_MS=0 would spin; using {}ms instead.",
                MIN_POLL_INTERVAL_MS
            );
        }
        info!(
            "Configuration loaded: base_url={}, optimizer_model={}, image_model={}, image_size={}, output_dir={:?}",
            self.dashscope_base_url,
            self.optimizer_model,
            self.image_model,
            self.image_size,
            self.output_dir
        );
    }

    pub fn from_lookup(lookup: Lookup<'_>) -> Result<Self, ConfigurationError> {
        let dashscope_api_key = env_optional(lookup, "DASHSCOPE_API_KEY")
            .ok_or(ConfigurationError::MissingVariable("DASHSCOPE_API_KEY"))?;

        let optimizer_temperature = env_f32(lookup, "OPTIMIZER_TEMPERATURE", 0.7)?;
        if !(0.0..2.0).contains(&optimizer_temperature) {
            return Err(ConfigurationError::InvalidValue {
                name: "OPTIMIZER_TEMPERATURE",
                value: optimizer_temperature.to_string(),
                reason: "must be in [0, 2)",
            });
        }

        let image_task_poll_interval_ms = env_u64(lookup, "IMAGE_TASK_POLL_INTERVAL_MS", 2000)?;

        Ok(Config {
            dashscope_api_key,
            dashscope_base_url: env_string(lookup, "DASHSCOPE_BASE_URL", DEFAULT_DASHSCOPE_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            log_level: env_string(lookup, "LOG_LEVEL", "info").to_lowercase(),
            http_timeout_seconds: env_u64(lookup, "HTTP_TIMEOUT_SECONDS", 60)?,
            optimizer_model: env_string(lookup, "OPTIMIZER_MODEL", "qwen-turbo"),
            optimizer_temperature,
            image_model: env_string(lookup, "IMAGE_MODEL", "qwen-image-plus"),
            image_size: normalize_image_size(env_string(lookup, "IMAGE_SIZE", "1328*1328"))?,
            image_task_poll_interval_ms,
            image_task_timeout_seconds: env_u64(lookup, "IMAGE_TASK_TIMEOUT_SECONDS", 600)?,
            output_dir: env_optional(lookup, "OUTPUT_DIR").map(PathBuf::from),
        })
    }
}

pub const PROMPT_OPTIMIZER_SYSTEM_PROMPT: &str = "你是资深AI绘图提示词工程师，专注于生成适配qwen-image-plus模型的高质量中文提示词。
要求：1. 包含主体+场景+细节（如材质、光影）；2. 多轮修改时保留原主体；3. 仅返回提示词，无额外解释。";

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn missing_api_key_fails_fast() {
        let err = Config::from_lookup(&lookup_from(&[])).unwrap_err();
        assert!(matches!(
            err,
            ConfigurationError::MissingVariable("DASHSCOPE_API_KEY")
        ));
    }

    #[test]
    fn blank_api_key_counts_as_missing() {
        let err = Config::from_lookup(&lookup_from(&[("DASHSCOPE_API_KEY", "   ")])).unwrap_err();
        assert!(matches!(err, ConfigurationError::MissingVariable(_)));
    }

    #[test]
    fn defaults_match_hosted_models() {
        let config = Config::from_lookup(&lookup_from(&[("DASHSCOPE_API_KEY", "sk-test")])).unwrap();
        assert_eq!(config.dashscope_base_url, DEFAULT_DASHSCOPE_BASE_URL);
        assert_eq!(config.optimizer_model, "qwen-turbo");
        assert!((config.optimizer_temperature - 0.7).abs() < f32::EPSILON);
        assert_eq!(config.image_model, "qwen-image-plus");
        assert_eq!(config.image_size, "1328*1328");
        assert!(config.output_dir.is_none());
    }

    #[test]
    fn overrides_are_applied_and_normalized() {
        let config = Config::from_lookup(&lookup_from(&[
            ("DASHSCOPE_API_KEY", "sk-test"),
            ("DASHSCOPE_BASE_URL", "https://dashscope-intl.aliyuncs.com/api/v1/"),
            ("IMAGE_SIZE", "1664x928"),
            ("OUTPUT_DIR", "out"),
            ("LOG_LEVEL", "DEBUG"),
        ]))
        .unwrap();
        assert_eq!(
            config.dashscope_base_url,
            "https://dashscope-intl.aliyuncs.com/api/v1"
        );
        assert_eq!(config.image_size, "1664*928");
        assert_eq!(config.output_dir, Some(PathBuf::from("out")));
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn zero_poll_interval_is_raised_to_the_floor() {
        let config = Config::from_lookup(&lookup_from(&[
            ("DASHSCOPE_API_KEY", "sk-test"),
            ("IMAGE_TASK_POLL_INTERVAL_MS", "0"),
        ]))
        .unwrap();
        assert_eq!(config.image_task_poll_interval_ms, 0);
        assert_eq!(config.image_task_poll_interval(), Duration::from_millis(500));

        let config = Config::from_lookup(&lookup_from(&[("DASHSCOPE_API_KEY", "sk-test")])).unwrap();
        assert_eq!(config.image_task_poll_interval(), Duration::from_secs(2));
    }

    #[test]
    fn rejects_malformed_numbers() {
        let err = Config::from_lookup(&lookup_from(&[
            ("DASHSCOPE_API_KEY", "sk-test"),
            ("OPTIMIZER_TEMPERATURE", "warm"),
        ]))
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigurationError::InvalidValue {
                name: "OPTIMIZER_TEMPERATURE",
                ..
            }
        ));

        let err = Config::from_lookup(&lookup_from(&[
            ("DASHSCOPE_API_KEY", "sk-test"),
            ("IMAGE_SIZE", "big"),
        ]))
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigurationError::InvalidValue { name: "IMAGE_SIZE", .. }
        ));
    }
}

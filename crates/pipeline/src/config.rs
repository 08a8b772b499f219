//! Pipeline configuration loaded from environment variables.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use storyloom_comfyui::PollConfig;

/// Errors from reading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable {0}")]
    Missing(&'static str),

    #[error("Invalid value for {var}: {value:?} ({reason})")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Which service renders illustrations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageBackendKind {
    ComfyUi,
    OpenAi,
}

impl FromStr for ImageBackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "comfyui" => Ok(Self::ComfyUi),
            "openai" => Ok(Self::OpenAi),
            other => Err(format!("unknown image backend '{other}', expected comfyui or openai")),
        }
    }
}

/// Illustration rendering settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageConfig {
    pub backend: ImageBackendKind,
    pub comfyui_url: String,
    pub comfyui_checkpoint: String,
    pub comfyui_poll: PollConfig,
    pub openai_model: String,
    pub width: u32,
    pub height: u32,
    pub steps: u32,
    pub guidance: f32,
    pub seed: u64,
}

/// Everything one pipeline iteration needs to reach its collaborators.
#[derive(Clone, PartialEq)]
pub struct PipelineConfig {
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub story_model: String,
    pub prompt_model: String,
    pub notion_token: String,
    /// Collection holding the running narrative documents.
    pub notion_database_id: String,
    /// Collection holding per-episode reports and daily summaries.
    pub notion_report_database_id: String,
    pub notion_title_property: String,
    pub s3_bucket: String,
    pub aws_region: String,
    pub s3_key_prefix: String,
    pub url_expiry: Duration,
    pub checkpoint_path: PathBuf,
    pub image_output_dir: PathBuf,
    pub image: ImageConfig,
}

impl PipelineConfig {
    /// Load configuration from the process environment.
    ///
    /// | Env Var                      | Default                              |
    /// |------------------------------|--------------------------------------|
    /// | `OPENAI_API_KEY`             | required                             |
    /// | `OPENAI_BASE_URL`            | `https://api.openai.com/v1`          |
    /// | `STORY_MODEL`                | `gpt-4`                              |
    /// | `PROMPT_MODEL`               | `gpt-4.1-mini`                       |
    /// | `NOTION_TOKEN`               | required                             |
    /// | `NOTION_DATABASE_ID`         | required                             |
    /// | `NOTION_REPORT_DATABASE_ID`  | value of `NOTION_DATABASE_ID`        |
    /// | `NOTION_TITLE_PROPERTY`      | `Title`                              |
    /// | `AWS_S3_BUCKET_NAME`         | required                             |
    /// | `AWS_REGION`                 | `ap-northeast-1`                     |
    /// | `S3_KEY_PREFIX`              | `generated`                          |
    /// | `S3_URL_EXPIRY_SECS`         | `3600`                               |
    /// | `CHECKPOINT_PATH`            | `data/state.json`                    |
    /// | `IMAGE_OUTPUT_DIR`           | `data/img`                           |
    /// | `IMAGE_BACKEND`              | `comfyui` (`comfyui` or `openai`)    |
    /// | `COMFYUI_URL`                | `http://127.0.0.1:8188`              |
    /// | `COMFYUI_CHECKPOINT`         | `v1-5-pruned-emaonly.safetensors`    |
    /// | `COMFYUI_POLL_INTERVAL_SECS` | `2`                                  |
    /// | `COMFYUI_TIMEOUT_SECS`       | `600`                                |
    /// | `OPENAI_IMAGE_MODEL`         | `dall-e-2`                           |
    /// | `IMAGE_WIDTH`                | `512`                                |
    /// | `IMAGE_HEIGHT`               | `512`                                |
    /// | `IMAGE_STEPS`                | `20`                                 |
    /// | `IMAGE_GUIDANCE`             | `7.5`                                |
    /// | `IMAGE_SEED`                 | `0`                                  |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through `lookup`, which maps a variable name to
    /// its value. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(lookup);

        let notion_database_id = env.required("NOTION_DATABASE_ID")?;
        let notion_report_database_id = env
            .optional("NOTION_REPORT_DATABASE_ID")
            .unwrap_or_else(|| notion_database_id.clone());

        let image = ImageConfig {
            backend: env.parsed("IMAGE_BACKEND", ImageBackendKind::ComfyUi)?,
            comfyui_url: env.or("COMFYUI_URL", "http://127.0.0.1:8188"),
            comfyui_checkpoint: env.or("COMFYUI_CHECKPOINT", "v1-5-pruned-emaonly.safetensors"),
            comfyui_poll: PollConfig {
                interval: Duration::from_secs(env.parsed("COMFYUI_POLL_INTERVAL_SECS", 2)?),
                timeout: Duration::from_secs(env.parsed("COMFYUI_TIMEOUT_SECS", 600)?),
            },
            openai_model: env.or("OPENAI_IMAGE_MODEL", "dall-e-2"),
            width: env.positive("IMAGE_WIDTH", 512)?,
            height: env.positive("IMAGE_HEIGHT", 512)?,
            steps: env.positive("IMAGE_STEPS", 20)?,
            guidance: env.parsed("IMAGE_GUIDANCE", 7.5)?,
            seed: env.parsed("IMAGE_SEED", 0)?,
        };

        Ok(Self {
            openai_api_key: env.required("OPENAI_API_KEY")?,
            openai_base_url: env.or("OPENAI_BASE_URL", storyloom_llm::DEFAULT_BASE_URL),
            story_model: env.or("STORY_MODEL", "gpt-4"),
            prompt_model: env.or("PROMPT_MODEL", "gpt-4.1-mini"),
            notion_token: env.required("NOTION_TOKEN")?,
            notion_database_id,
            notion_report_database_id,
            notion_title_property: env.or("NOTION_TITLE_PROPERTY", "Title"),
            s3_bucket: env.required("AWS_S3_BUCKET_NAME")?,
            aws_region: env.or("AWS_REGION", storyloom_cloud::s3::DEFAULT_REGION),
            s3_key_prefix: env.or("S3_KEY_PREFIX", storyloom_notion::sync::DEFAULT_KEY_PREFIX),
            url_expiry: Duration::from_secs(env.positive("S3_URL_EXPIRY_SECS", 3600)?),
            checkpoint_path: env
                .or("CHECKPOINT_PATH", storyloom_core::checkpoint::DEFAULT_CHECKPOINT_PATH)
                .into(),
            image_output_dir: env.or("IMAGE_OUTPUT_DIR", "data/img").into(),
            image,
        })
    }
}

impl std::fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("openai_base_url", &self.openai_base_url)
            .field("story_model", &self.story_model)
            .field("prompt_model", &self.prompt_model)
            .field("notion_database_id", &self.notion_database_id)
            .field("notion_report_database_id", &self.notion_report_database_id)
            .field("s3_bucket", &self.s3_bucket)
            .field("aws_region", &self.aws_region)
            .field("checkpoint_path", &self.checkpoint_path)
            .field("image", &self.image)
            .finish_non_exhaustive()
    }
}

// ---- lookup helpers ----

struct Env<F>(F);

impl<F: Fn(&str) -> Option<String>> Env<F> {
    fn optional(&self, var: &'static str) -> Option<String> {
        (self.0)(var)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    fn required(&self, var: &'static str) -> Result<String, ConfigError> {
        self.optional(var).ok_or(ConfigError::Missing(var))
    }

    fn or(&self, var: &'static str, default: &str) -> String {
        self.optional(var).unwrap_or_else(|| default.to_string())
    }

    fn parsed<T>(&self, var: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.optional(var) {
            None => Ok(default),
            Some(value) => value.parse().map_err(|e: T::Err| ConfigError::Invalid {
                var,
                reason: e.to_string(),
                value,
            }),
        }
    }

    fn positive<T>(&self, var: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr + PartialOrd + Default + std::fmt::Display,
        T::Err: std::fmt::Display,
    {
        let value = self.parsed(var, default)?;
        if value <= T::default() {
            return Err(ConfigError::Invalid {
                var,
                value: value.to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use assert_matches::assert_matches;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<PipelineConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        PipelineConfig::from_lookup(|name| map.get(name).cloned())
    }

    const REQUIRED: [(&str, &str); 4] = [
        ("OPENAI_API_KEY", "sk-test"),
        ("NOTION_TOKEN", "secret_abc"),
        ("NOTION_DATABASE_ID", "db-main"),
        ("AWS_S3_BUCKET_NAME", "bucket"),
    ];

    #[test]
    fn defaults_apply() {
        let config = load(&REQUIRED).unwrap();
        assert_eq!(config.openai_base_url, "https://api.openai.com/v1");
        assert_eq!(config.story_model, "gpt-4");
        assert_eq!(config.prompt_model, "gpt-4.1-mini");
        assert_eq!(config.notion_report_database_id, "db-main");
        assert_eq!(config.notion_title_property, "Title");
        assert_eq!(config.aws_region, "ap-northeast-1");
        assert_eq!(config.s3_key_prefix, "generated");
        assert_eq!(config.url_expiry, Duration::from_secs(3600));
        assert_eq!(config.checkpoint_path, PathBuf::from("data/state.json"));
        assert_eq!(config.image_output_dir, PathBuf::from("data/img"));
        assert_eq!(config.image.backend, ImageBackendKind::ComfyUi);
        assert_eq!(config.image.width, 512);
        assert_eq!(config.image.height, 512);
        assert_eq!(config.image.steps, 20);
        assert_eq!(config.image.guidance, 7.5);
        assert_eq!(config.image.seed, 0);
        assert_eq!(config.image.comfyui_poll, PollConfig::default());
    }

    #[test]
    fn missing_required_is_reported_by_name() {
        let vars: Vec<_> = REQUIRED
            .iter()
            .copied()
            .filter(|(k, _)| *k != "AWS_S3_BUCKET_NAME")
            .collect();
        assert_matches!(load(&vars), Err(ConfigError::Missing("AWS_S3_BUCKET_NAME")));
    }

    #[test]
    fn blank_required_counts_as_missing() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("OPENAI_API_KEY", "   "));
        // Later entries win in the map.
        assert_matches!(load(&vars), Err(ConfigError::Missing("OPENAI_API_KEY")));
    }

    #[test]
    fn overrides_are_parsed() {
        let mut vars = REQUIRED.to_vec();
        vars.extend([
            ("IMAGE_BACKEND", "OpenAI"),
            ("IMAGE_WIDTH", "1024"),
            ("IMAGE_GUIDANCE", "5.5"),
            ("NOTION_REPORT_DATABASE_ID", "db-reports"),
            ("COMFYUI_TIMEOUT_SECS", "30"),
        ]);
        let config = load(&vars).unwrap();
        assert_eq!(config.image.backend, ImageBackendKind::OpenAi);
        assert_eq!(config.image.width, 1024);
        assert_eq!(config.image.guidance, 5.5);
        assert_eq!(config.notion_report_database_id, "db-reports");
        assert_eq!(config.image.comfyui_poll.timeout, Duration::from_secs(30));
    }

    #[test]
    fn unparsable_values_are_invalid() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("IMAGE_WIDTH", "wide"));
        assert_matches!(load(&vars), Err(ConfigError::Invalid { var: "IMAGE_WIDTH", .. }));

        let mut vars = REQUIRED.to_vec();
        vars.push(("IMAGE_BACKEND", "midjourney"));
        assert_matches!(load(&vars), Err(ConfigError::Invalid { var: "IMAGE_BACKEND", .. }));
    }

    #[test]
    fn zero_size_is_invalid() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("IMAGE_HEIGHT", "0"));
        assert_matches!(load(&vars), Err(ConfigError::Invalid { var: "IMAGE_HEIGHT", .. }));
    }

    #[test]
    fn debug_hides_secrets() {
        let debug = format!("{:?}", load(&REQUIRED).unwrap());
        assert!(!debug.contains("sk-test"));
        assert!(!debug.contains("secret_abc"));
    }
}

use serde::Deserialize;

use crate::error::{AppError, Result};

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub claude: ClaudeConfig,
    #[serde(default)]
    pub judge: JudgeConfig,
    #[serde(default)]
    pub stages: StagesConfig,
}

#[derive(Deserialize, Clone)]
pub struct ClaudeConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_api_url")]
    pub api_url: String,
}

// Manual Debug impl to avoid leaking the API key
impl std::fmt::Debug for ClaudeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClaudeConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("api_url", &self.api_url)
            .finish()
    }
}

impl Default for ClaudeConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            max_tokens: default_max_tokens(),
            api_url: default_api_url(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct JudgeConfig {
    /// Minimum score (0-100) for a verdict to pass.
    #[serde(default = "default_threshold")]
    pub threshold: u32,
    /// File name suffixes that mark a file as a test during discovery.
    #[serde(default = "default_test_suffixes")]
    pub test_suffixes: Vec<String>,
    #[serde(default = "default_max_file_size")]
    pub max_file_size_bytes: u64,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            test_suffixes: default_test_suffixes(),
            max_file_size_bytes: default_max_file_size(),
            timeout_secs: None,
        }
    }
}

/// How stage capabilities are launched: `<program> <base_args..> <subcommand>`.
#[derive(Debug, Deserialize, Clone)]
pub struct StagesConfig {
    #[serde(default = "default_program")]
    pub program: String,
    #[serde(default = "default_base_args")]
    pub base_args: Vec<String>,
    #[serde(default = "default_planner")]
    pub planner: String,
    #[serde(default = "default_generator")]
    pub generator: String,
    #[serde(default = "default_healer")]
    pub healer: String,
    /// Unset means a hung stage blocks the workflow indefinitely.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Default for StagesConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            base_args: default_base_args(),
            planner: default_planner(),
            generator: default_generator(),
            healer: default_healer(),
            timeout_secs: None,
        }
    }
}

fn default_model() -> String {
    "claude-sonnet-4-20250514".to_string()
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_api_url() -> String {
    "https://api.anthropic.com/v1/messages".to_string()
}

fn default_threshold() -> u32 {
    70
}

fn default_test_suffixes() -> Vec<String> {
    [".spec.ts", ".spec.js", ".test.ts", ".test.js"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_max_file_size() -> u64 {
    256 * 1024 // 256 KB
}

fn default_program() -> String {
    "npx".to_string()
}

fn default_base_args() -> Vec<String> {
    vec!["playwright".to_string()]
}

fn default_planner() -> String {
    "planner".to_string()
}

fn default_generator() -> String {
    "generator".to_string()
}

fn default_healer() -> String {
    "healer".to_string()
}

impl AppConfig {
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut builder = config::Config::builder();

        // The conventional Anthropic variable seeds the key; file and
        // PLAYMAKER__ overrides still win.
        if let Ok(key) = std::env::var("ANTHROPIC_API_KEY") {
            builder = builder.set_default("claude.api_key", key)?;
        }

        if let Some(path) = config_path {
            builder = builder.add_source(config::File::with_name(path));
        } else {
            builder = builder.add_source(config::File::with_name("playmaker").required(false));
        }

        // Environment variable overrides with PLAYMAKER_ prefix
        builder = builder.add_source(
            config::Environment::with_prefix("PLAYMAKER")
                .separator("__")
                .try_parsing(true),
        );

        let config: AppConfig = builder
            .build()
            .map_err(|e| AppError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| AppError::Config(e.to_string()))?;

        validate_threshold(config.judge.threshold)?;
        Ok(config)
    }

    pub fn claude_api_key(&self) -> Result<&str> {
        self.claude
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                AppError::Config(
                    "no Claude API key: set ANTHROPIC_API_KEY or PLAYMAKER__CLAUDE__API_KEY"
                        .to_string(),
                )
            })
    }
}

/// Scores live on a 0-100 scale, so a threshold above 100 can never pass.
pub fn validate_threshold(threshold: u32) -> Result<()> {
    if threshold > 100 {
        return Err(AppError::Config(format!(
            "judge threshold must be within 0..=100, got {threshold}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Tests that touch process environment variables take this lock
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    const ENV_KEYS: [&str; 3] = [
        "ANTHROPIC_API_KEY",
        "PLAYMAKER__JUDGE__THRESHOLD",
        "PLAYMAKER__CLAUDE__API_KEY",
    ];

    /// Write `contents` to a `playmaker.toml` in a temp dir and load it with only
    /// `env` set among the variables `load` reads.
    fn load_with(contents: &str, env: &[(&str, &str)]) -> Result<AppConfig> {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("playmaker.toml");
        std::fs::write(&path, contents).unwrap();

        for key in ENV_KEYS {
            std::env::remove_var(key);
        }
        for (key, value) in env {
            std::env::set_var(key, value);
        }

        let result = AppConfig::load(path.to_str());

        for key in ENV_KEYS {
            std::env::remove_var(key);
        }
        result
    }

    #[test]
    fn test_load_seeds_api_key_from_anthropic_env() {
        let config = load_with(
            "[judge]\nthreshold = 80\n",
            &[("ANTHROPIC_API_KEY", "sk-env")],
        )
        .unwrap();

        assert_eq!(config.claude_api_key().unwrap(), "sk-env");
        assert_eq!(config.judge.threshold, 80);
    }

    #[test]
    fn test_load_file_key_beats_anthropic_env() {
        let config = load_with(
            "[claude]\napi_key = \"sk-file\"\n",
            &[("ANTHROPIC_API_KEY", "sk-env")],
        )
        .unwrap();

        assert_eq!(config.claude_api_key().unwrap(), "sk-file");
    }

    #[test]
    fn test_load_prefixed_env_beats_file() {
        let config = load_with(
            "[judge]\nthreshold = 80\n\n[claude]\napi_key = \"sk-file\"\n",
            &[
                ("PLAYMAKER__JUDGE__THRESHOLD", "95"),
                ("PLAYMAKER__CLAUDE__API_KEY", "sk-override"),
            ],
        )
        .unwrap();

        assert_eq!(config.judge.threshold, 95);
        assert_eq!(config.claude_api_key().unwrap(), "sk-override");
    }

    #[test]
    fn test_load_rejects_threshold_above_100() {
        let err = load_with("[judge]\nthreshold = 150\n", &[]).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_load_missing_explicit_file_is_config_error() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("absent.toml");

        let err = AppConfig::load(path.to_str()).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_defaults_match_playwright_agents() {
        let stages = StagesConfig::default();
        assert_eq!(stages.program, "npx");
        assert_eq!(stages.base_args, vec!["playwright"]);
        assert_eq!(stages.planner, "planner");
        assert_eq!(stages.generator, "generator");
        assert_eq!(stages.healer, "healer");
        assert!(stages.timeout_secs.is_none());

        let judge = JudgeConfig::default();
        assert_eq!(judge.threshold, 70);
        assert!(judge.test_suffixes.contains(&".spec.ts".to_string()));
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: AppConfig = config::Config::builder()
            .add_source(config::File::from_str(
                "[judge]\nthreshold = 85\n\n[stages]\nprogram = \"pnpm\"\n",
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.judge.threshold, 85);
        assert_eq!(config.stages.program, "pnpm");
        assert_eq!(config.stages.healer, "healer");
        assert_eq!(config.claude.model, default_model());
    }

    #[test]
    fn test_threshold_bounds() {
        assert!(validate_threshold(0).is_ok());
        assert!(validate_threshold(100).is_ok());
        assert!(validate_threshold(101).is_err());
    }

    #[test]
    fn test_missing_api_key_is_config_error() {
        let config = AppConfig {
            claude: ClaudeConfig::default(),
            judge: JudgeConfig::default(),
            stages: StagesConfig::default(),
        };
        assert!(matches!(config.claude_api_key(), Err(AppError::Config(_))));
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let claude = ClaudeConfig {
            api_key: Some("sk-secret".to_string()),
            ..ClaudeConfig::default()
        };
        let rendered = format!("{claude:?}");
        assert!(!rendered.contains("sk-secret"));
        assert!(rendered.contains("[REDACTED]"));
    }
}

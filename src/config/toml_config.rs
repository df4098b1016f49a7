use crate::core::components::ComponentSet;
use crate::core::sampler::{CompositionSampler, SamplerSettings};
use crate::utils::error::{CoaError, Result};
use crate::utils::validation::{validate_positive_number, validate_range, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// 成分表與抽樣參數的設定檔。所有區段皆可省略，省略時使用預設值。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoaConfig {
    pub sampler: SamplerSettings,
    pub components: ComponentSet,
}

impl CoaConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(CoaError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| CoaError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${MAX_TRIALS})，未設定的變數保留原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| CoaError::ConfigError {
            message: format!("invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn validate_config(&self) -> Result<()> {
        let s = &self.sampler;
        validate_range("sampler.total_target", s.total_target, 0.0, 1.0e6)?;
        validate_range("sampler.tolerance", s.tolerance, 0.0, 1.0)?;
        validate_positive_number("sampler.max_trials", s.max_trials, 1)?;
        validate_positive_number("sampler.max_rounds", s.max_rounds, 1)?;

        self.components
            .validate()
            .map_err(|e| CoaError::ConfigValidationError {
                field: "components".to_string(),
                message: e.to_string(),
            })
    }

    pub fn build_sampler(&self) -> Result<CompositionSampler> {
        self.validate_config()?;
        CompositionSampler::new(self.components.clone(), self.sampler).map_err(|e| {
            CoaError::ConfigValidationError {
                field: "components".to_string(),
                message: e.to_string(),
            }
        })
    }
}

impl Validate for CoaConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

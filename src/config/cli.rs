use crate::domain::ports::ConfigProvider;
use crate::utils::error::Result;
use crate::utils::validation::{
    validate_file_extensions, validate_non_empty_string, validate_path,
    validate_positive_number, Validate,
};
use clap::Parser;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(name = "coa-batch")]
#[command(about = "Bulk Certificate of Analysis generator")]
pub struct CliConfig {
    /// Batch sheet exported as CSV
    #[arg(short, long)]
    pub input: String,

    /// Directory holding the 'COA <Code>.docx' templates
    #[arg(long, default_value = ".")]
    pub templates_dir: String,

    #[arg(long, default_value = "generated")]
    pub output_dir: String,

    /// TOML file with [sampler] and [components] sections
    #[arg(short, long)]
    pub config: Option<String>,

    /// Seed for reproducible compositions
    #[arg(long)]
    pub seed: Option<u64>,

    #[arg(long, default_value = "ALL_COA.zip")]
    pub archive_name: String,

    /// Skip building the zip archive
    #[arg(long)]
    pub no_archive: bool,

    /// Override sampler.max_trials from the config file
    #[arg(long)]
    pub max_trials: Option<usize>,

    /// Compute compositions only, write nothing
    #[arg(long)]
    pub dry_run: bool,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON")]
    pub log_json: bool,
}

impl ConfigProvider for CliConfig {
    fn input_path(&self) -> &str {
        &self.input
    }

    fn templates_dir(&self) -> &str {
        &self.templates_dir
    }

    fn output_dir(&self) -> &str {
        &self.output_dir
    }

    fn archive_name(&self) -> Option<&str> {
        if self.no_archive {
            None
        } else {
            Some(&self.archive_name)
        }
    }

    fn seed(&self) -> Option<u64> {
        self.seed
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("input", &self.input)?;
        validate_file_extensions("input", std::slice::from_ref(&self.input), &["csv"])?;
        validate_path("templates_dir", &self.templates_dir)?;
        validate_path("output_dir", &self.output_dir)?;
        if !self.no_archive {
            validate_file_extensions(
                "archive_name",
                std::slice::from_ref(&self.archive_name),
                &["zip"],
            )?;
        }
        if let Some(max_trials) = self.max_trials {
            validate_positive_number("max_trials", max_trials, 1)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_defaults() {
        let config = CliConfig::parse_from(["coa-batch", "--input", "batches.csv"]);
        assert_eq!(config.templates_dir, ".");
        assert_eq!(config.output_dir, "generated");
        assert_eq!(config.archive_name(), Some("ALL_COA.zip"));
        assert_eq!(config.seed(), None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_no_archive_and_seed() {
        let config = CliConfig::parse_from([
            "coa-batch",
            "-i",
            "batches.csv",
            "--no-archive",
            "--seed",
            "42",
        ]);
        assert_eq!(config.archive_name(), None);
        assert_eq!(config.seed(), Some(42));
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let xlsx = CliConfig::parse_from(["coa-batch", "-i", "batches.xlsx"]);
        assert!(xlsx.validate().is_err());

        let zero_trials =
            CliConfig::parse_from(["coa-batch", "-i", "b.csv", "--max-trials", "0"]);
        assert!(zero_trials.validate().is_err());

        let bad_archive =
            CliConfig::parse_from(["coa-batch", "-i", "b.csv", "--archive-name", "out.tar"]);
        assert!(bad_archive.validate().is_err());
    }
}

use clap::Parser;
use coa_batch::domain::ports::{ConfigProvider, Pipeline, Storage};
use coa_batch::utils::error::{CoaError, ErrorSeverity};
use coa_batch::utils::{logger, validation::Validate};
use coa_batch::{CliConfig, CoaConfig, CoaEngine, CoaPipeline, LocalStorage};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = CliConfig::parse();

    // 初始化日誌
    if config.log_json {
        logger::init_json_logger(config.verbose);
    } else {
        logger::init_cli_logger(config.verbose);
    }

    tracing::info!("Starting coa-batch CLI");
    if config.verbose {
        tracing::debug!("CLI config: {:?}", config);
    }

    // 驗證配置
    if let Err(e) = config.validate() {
        exit_with(&e);
    }

    let mut file_config = match &config.config {
        Some(path) => {
            tracing::info!("📁 Loading configuration from: {}", path);
            CoaConfig::from_file(path).unwrap_or_else(|e| exit_with(&e))
        }
        None => CoaConfig::default(),
    };

    // 應用命令列覆蓋設定
    if let Some(max_trials) = config.max_trials {
        file_config.sampler.max_trials = max_trials;
        tracing::info!("🔧 max_trials overridden to: {}", max_trials);
    }

    let sampler = file_config.build_sampler().unwrap_or_else(|e| exit_with(&e));
    let dry_run = config.dry_run;

    let pipeline = CoaPipeline::new(LocalStorage::default(), config, sampler);
    tracing::info!("🎲 Seed: {} (pass --seed to reproduce)", pipeline.seed());

    if dry_run {
        tracing::info!("🔍 DRY RUN MODE - no files will be written");
        perform_dry_run(&pipeline).await;
        return Ok(());
    }

    let engine = CoaEngine::new(pipeline);

    match engine.run().await {
        Ok(report) => {
            tracing::info!("✅ COA batch completed successfully!");
            println!(
                "✅ Generated {} certificates ({} rows failed)",
                report.generated.len(),
                report.failures.len()
            );
            if let Some(archive) = &report.archive {
                println!("📁 Archive saved to: {}", archive);
            }
            for failure in &report.failures {
                eprintln!("⚠️  Row {}: {}", failure.row, failure.message);
            }
        }
        Err(e) => exit_with(&e),
    }

    Ok(())
}

async fn perform_dry_run<S: Storage, C: ConfigProvider>(pipeline: &CoaPipeline<S, C>) {
    let records = match pipeline.extract().await {
        Ok(records) => records,
        Err(e) => exit_with(&e),
    };

    for row in pipeline.preview(&records) {
        match row {
            Ok(preview) => {
                let components: Vec<String> = std::iter::once(&preview.composition.free)
                    .chain(preview.composition.bounded.iter())
                    .map(|c| format!("{}={:.2}", c.name, c.value))
                    .collect();
                println!(
                    "{:<12} {:<10} moisture={:.2} best_before={} {}",
                    preview.record.batch_no,
                    preview.record.code,
                    preview.record.moisture,
                    preview.best_before,
                    components.join(" ")
                );
            }
            Err(failure) => eprintln!("⚠️  Row {}: {}", failure.row, failure.message),
        }
    }
}

fn exit_with(e: &CoaError) -> ! {
    // 記錄詳細錯誤信息
    tracing::error!(
        "❌ COA batch failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 建議: {}", e.recovery_suggestion());

    // 根據錯誤嚴重程度決定退出碼
    let exit_code = match e.severity() {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    };
    std::process::exit(exit_code);
}

use clap::Parser;
use llm_judge_reporting::core::ConfigProvider;
use llm_judge_reporting::utils::{logger, validation::Validate};
use llm_judge_reporting::{LocalStorage, ReportEngine, ReportPipeline, TomlConfig};

#[derive(Parser)]
#[command(name = "judge-report-toml")]
#[command(about = "Judge report driven by a TOML configuration file")]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "judge-report.toml")]
    config: String,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Override monitoring setting from config
    #[arg(long)]
    monitor: Option<bool>,

    /// Override the allocation budget from config
    #[arg(long)]
    budget: Option<u64>,

    /// Show what would be processed without executing
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = match TomlConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config file '{}': {}", args.config, e);
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(1);
        }
    };

    // --verbose 優先於設定檔的 log_level
    match config.log_level() {
        Some(level) if !args.verbose => logger::init_logger_with_level(level),
        _ => logger::init_cli_logger(args.verbose),
    }

    tracing::info!("🚀 Starting TOML-based judge report");
    tracing::info!("📁 Loaded configuration from: {}", args.config);

    // 應用命令列覆蓋設定
    if let Some(budget) = args.budget {
        config.report.budget = Some(budget);
        tracing::info!("🔧 Allocation budget overridden to: {}", budget);
    }

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    tracing::info!("✅ Configuration loaded and validated successfully");
    display_config_summary(&config, &args);

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - No actual processing will occur");
        perform_dry_run(&config);
        return Ok(());
    }

    let monitor_enabled = args.monitor.unwrap_or_else(|| config.monitoring_enabled());
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    let pipeline = ReportPipeline::new(LocalStorage::default(), config);
    let engine = ReportEngine::new_with_monitoring(pipeline, monitor_enabled);

    match engine.run().await {
        Ok(output_path) => {
            println!("✅ Report completed successfully!");
            println!("📁 Output saved to: {}", output_path);
        }
        Err(e) => {
            tracing::error!(
                "❌ Report failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());

            let exit_code = e.exit_code();
            if exit_code > 0 {
                std::process::exit(exit_code);
            }
        }
    }

    Ok(())
}

fn display_config_summary(config: &TomlConfig, args: &Args) {
    println!("📋 Configuration Summary:");
    println!("  Report: {}", config.report_name());
    if let Some(description) = &config.report.description {
        println!("  Description: {}", description);
    }
    println!("  Test set: {}", config.test_set_path());
    println!("  Calibration: {}", config.calibration_path());
    println!("  Output: {}", config.output_path());
    println!("  Formats: {}", config.output_formats().join(", "));
    println!("  Confidence level: {:.1}%", (1.0 - config.alpha()) * 100.0);

    if let Some(budget) = config.budget() {
        println!("  Allocation budget: {}", budget);
    }

    if args.dry_run {
        println!("  🔍 DRY RUN MODE ENABLED");
    }

    println!();
}

fn perform_dry_run(config: &TomlConfig) {
    println!("🔍 Dry Run Analysis:");
    println!();

    println!("📥 Inputs:");
    println!(
        "  Test set: {} (verdict column '{}')",
        config.test_set_path(),
        config.judge_column()
    );
    println!(
        "  Calibration: {} (human column '{}', judge column '{}')",
        config.calibration_path(),
        config.human_column(),
        config.calibration_judge_column()
    );

    println!();
    println!("🧮 Processing:");
    println!("  Bias correction with specificity/sensitivity from calibration");
    println!("  Interval at alpha = {}", config.alpha());
    match config.budget() {
        Some(budget) => println!("  Allocation plan for a budget of {} labels", budget),
        None => println!("  No allocation plan (set report.budget to enable)"),
    }

    println!();
    println!("💾 Output Configuration:");
    println!("  Path: {}", config.output_path());
    println!("  Formats: {}", config.output_formats().join(", "));
    if let Some(level) = config.log_level() {
        println!("  Log level: {}", level);
    }

    println!();
    println!("✅ Dry run analysis complete. Use --verbose for more details during actual run.");
}

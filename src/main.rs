use clap::Parser;
use llm_judge_reporting::app::pipelines::{ReportPipeline, SimulationPipeline, Sweep, SweepPipeline};
use llm_judge_reporting::core::calibration::estimate;
use llm_judge_reporting::core::simulation::SimulationParams;
use llm_judge_reporting::core::sweep::{BiasCurveParams, CiSweepParams};
use llm_judge_reporting::core::{EstimateInput, Pipeline};
use llm_judge_reporting::utils::{logger, validation::Validate};
use llm_judge_reporting::{
    allocate_calibration_sample, Cli, Command, LocalStorage, ReportEngine, ReportError,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // 初始化日誌
    if cli.json_logs {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting judge-report");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }
    if cli.monitor {
        tracing::info!("🔍 System monitoring enabled");
    }

    if let Err(e) = dispatch(&cli).await {
        fail(&e);
    }

    Ok(())
}

async fn dispatch(cli: &Cli) -> llm_judge_reporting::Result<()> {
    let storage = LocalStorage::default();

    match &cli.command {
        Command::Report(args) => {
            args.validate()?;
            let pipeline = ReportPipeline::new(storage, args.clone());
            run_pipeline(pipeline, cli.monitor).await
        }
        Command::Estimate(args) => {
            let result = estimate(
                &EstimateInput {
                    p_hat: args.p_hat,
                    q0: args.q0,
                    q1: args.q1,
                    n: args.n,
                    m0: args.m0,
                    m1: args.m1,
                },
                args.alpha,
            )?;
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(())
        }
        Command::Allocate(args) => {
            let allocation =
                allocate_calibration_sample(args.m, args.p, args.q0, args.q1, args.m_pilot)?;
            println!("{}", serde_json::to_string_pretty(&allocation)?);
            Ok(())
        }
        Command::Simulate(args) => {
            let params = SimulationParams::from(args);
            params.validate()?;
            let pipeline = SimulationPipeline::new(storage, params, args.output_path.clone())
                .with_replicates(args.replicates);
            run_pipeline(pipeline, cli.monitor).await
        }
        Command::BiasCurve(args) => {
            let sweep = Sweep::BiasCurve(BiasCurveParams::from(args));
            let pipeline = SweepPipeline::new(storage, sweep, args.output_path.clone());
            run_pipeline(pipeline, cli.monitor).await
        }
        Command::CiSweep(args) => {
            let sweep = Sweep::CiLength(CiSweepParams::try_from(args)?);
            let pipeline = SweepPipeline::new(storage, sweep, args.output_path.clone());
            run_pipeline(pipeline, cli.monitor).await
        }
    }
}

async fn run_pipeline<P: Pipeline>(pipeline: P, monitor: bool) -> llm_judge_reporting::Result<()> {
    let engine = ReportEngine::new_with_monitoring(pipeline, monitor);
    let output_path = engine.run().await?;
    println!("✅ Done");
    println!("📁 Output saved to: {}", output_path);
    Ok(())
}

fn fail(e: &ReportError) {
    // 記錄詳細錯誤信息
    tracing::error!(
        "❌ judge-report failed: {} (Category: {:?}, Severity: {:?})",
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

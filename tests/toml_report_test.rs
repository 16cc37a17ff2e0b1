use anyhow::Result;
use llm_judge_reporting::core::ConfigProvider;
use llm_judge_reporting::utils::validation::Validate;
use llm_judge_reporting::{LocalStorage, ReportEngine, ReportPipeline, TomlConfig};
use tempfile::TempDir;

/// TOML 配置驅動完整報告流程，輸入為 TSV 與 JSON
#[tokio::test]
async fn test_toml_config_drives_report() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let temp_path = temp_dir.path().to_str().unwrap().replace('\\', "/");

    tokio::fs::write(
        format!("{}/judged.tsv", temp_path),
        "id\tverdict\n1\tpass\n2\tpass\n3\tfail\n4\tpass\n",
    )
    .await?;
    tokio::fs::write(
        format!("{}/labels.json", temp_path),
        r#"[
            {"gold": "incorrect", "judge": "incorrect"},
            {"gold": "incorrect", "judge": "correct"},
            {"gold": "correct", "judge": "correct"},
            {"gold": "correct", "judge": "correct"}
        ]"#,
    )
    .await?;

    let config_content = format!(
        r#"
[report]
name = "toml-run"
alpha = 0.1

[test_set]
path = "{dir}/judged.tsv"
judge_column = "verdict"

[calibration]
path = "{dir}/labels.json"
human_column = "gold"

[output]
path = "{dir}/reports"
formats = ["csv"]

[monitoring]
enabled = false
"#,
        dir = temp_path
    );
    let config_path = format!("{}/judge-report.toml", temp_path);
    tokio::fs::write(&config_path, config_content).await?;

    let config = TomlConfig::from_file(&config_path)?;
    config.validate()?;
    assert_eq!(config.judge_column(), "verdict");
    assert_eq!(config.alpha(), 0.1);

    let engine = ReportEngine::new(ReportPipeline::new(LocalStorage::default(), config));
    let output_path = engine.run().await?;
    assert!(output_path.ends_with("report.csv"));

    let csv = tokio::fs::read_to_string(&output_path).await?;
    let mut lines = csv.lines();
    let header = lines.next().unwrap();
    assert!(header.contains("corrected"));
    let row = lines.next().unwrap();
    assert!(row.starts_with("toml-run,"));
    // q0 = 0.5, q1 = 1.0, p = 0.75 -> (0.75 + 0.5 - 1) / 0.5 = 0.5
    assert!(row.contains(",0.5,"));
    Ok(())
}

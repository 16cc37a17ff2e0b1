//! Reading judge outputs and calibration labels from CSV/TSV/JSON/JSONL.

use std::collections::HashMap;
use std::path::Path;

use serde_json::Value;

use crate::domain::model::{CalibrationRecord, CalibrationSummary, JudgeRecord, TestSetSummary};
use crate::utils::error::{ReportError, Result};

pub const SUPPORTED_EXTENSIONS: &[&str] = &["csv", "tsv", "json", "jsonl", "ndjson"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Csv,
    Tsv,
    Json,
    JsonLines,
}

impl InputFormat {
    pub fn from_path(path: &str) -> Result<Self> {
        let extension = Path::new(path)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);

        match extension.as_deref() {
            Some("csv") => Ok(InputFormat::Csv),
            Some("tsv") => Ok(InputFormat::Tsv),
            Some("json") => Ok(InputFormat::Json),
            Some("jsonl") | Some("ndjson") => Ok(InputFormat::JsonLines),
            _ => Err(ReportError::InvalidConfigValueError {
                field: "input".to_string(),
                value: path.to_string(),
                reason: format!(
                    "Unsupported file extension. Allowed extensions: {}",
                    SUPPORTED_EXTENSIONS.join(", ")
                ),
            }),
        }
    }
}

/// One input row, keyed by column name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    pub data: HashMap<String, Value>,
}

pub fn parse_rows(source_name: &str, format: InputFormat, bytes: &[u8]) -> Result<Vec<Row>> {
    match format {
        InputFormat::Csv => parse_delimited(bytes, b','),
        InputFormat::Tsv => parse_delimited(bytes, b'\t'),
        InputFormat::Json => {
            let value: Value = serde_json::from_slice(bytes)?;
            let Value::Array(items) = value else {
                return Err(ReportError::invalid_input(
                    source_name,
                    0,
                    "expected a JSON array of objects",
                ));
            };
            items
                .into_iter()
                .enumerate()
                .map(|(index, item)| object_row(source_name, index + 1, item))
                .collect()
        }
        InputFormat::JsonLines => {
            let text = std::str::from_utf8(bytes).map_err(|e| {
                ReportError::invalid_input(source_name, 0, format!("not UTF-8: {}", e))
            })?;
            let mut rows = Vec::new();
            for line in text.lines().map(str::trim).filter(|line| !line.is_empty()) {
                let value: Value = serde_json::from_str(line)?;
                rows.push(object_row(source_name, rows.len() + 1, value)?);
            }
            Ok(rows)
        }
    }
}

fn object_row(source_name: &str, row: usize, value: Value) -> Result<Row> {
    match value {
        Value::Object(map) => Ok(Row {
            data: map.into_iter().collect(),
        }),
        other => Err(ReportError::invalid_input(
            source_name,
            row,
            format!("expected an object, found {}", other),
        )),
    }
}

fn parse_delimited(bytes: &[u8], delimiter: u8) -> Result<Vec<Row>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .trim(csv::Trim::All)
        .from_reader(bytes);
    let headers = reader.headers()?.clone();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let data = headers
            .iter()
            .zip(record.iter())
            .map(|(header, field)| (header.to_string(), Value::String(field.to_string())))
            .collect();
        rows.push(Row { data });
    }
    Ok(rows)
}

/// Interpret a cell as a correct/incorrect verdict.
pub fn parse_verdict(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(number) => match number.as_f64() {
            Some(x) if x == 1.0 => Some(true),
            Some(x) if x == 0.0 => Some(false),
            _ => None,
        },
        Value::String(text) => match text.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "y" | "correct" | "pass" => Some(true),
            "false" | "0" | "no" | "n" | "incorrect" | "fail" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn verdict(source_name: &str, row_number: usize, row: &Row, column: &str) -> Result<bool> {
    let value = row.data.get(column).ok_or_else(|| {
        ReportError::invalid_input(source_name, row_number, format!("missing column '{}'", column))
    })?;
    parse_verdict(value).ok_or_else(|| {
        ReportError::invalid_input(
            source_name,
            row_number,
            format!("cannot read {} as correct/incorrect in column '{}'", value, column),
        )
    })
}

pub fn judge_records(source_name: &str, rows: &[Row], judge_column: &str) -> Result<Vec<JudgeRecord>> {
    rows.iter()
        .enumerate()
        .map(|(index, row)| {
            Ok(JudgeRecord {
                judge_correct: verdict(source_name, index + 1, row, judge_column)?,
            })
        })
        .collect()
}

pub fn calibration_records(
    source_name: &str,
    rows: &[Row],
    human_column: &str,
    judge_column: &str,
) -> Result<Vec<CalibrationRecord>> {
    rows.iter()
        .enumerate()
        .map(|(index, row)| {
            Ok(CalibrationRecord {
                human_correct: verdict(source_name, index + 1, row, human_column)?,
                judge_correct: verdict(source_name, index + 1, row, judge_column)?,
            })
        })
        .collect()
}

pub fn summarize_test_set(source_name: &str, records: &[JudgeRecord]) -> Result<TestSetSummary> {
    if records.is_empty() {
        return Err(ReportError::invalid_input(source_name, 0, "test set is empty"));
    }
    Ok(TestSetSummary {
        n: records.len() as u64,
        judged_correct: records.iter().filter(|r| r.judge_correct).count() as u64,
    })
}

pub fn summarize_calibration(records: &[CalibrationRecord]) -> CalibrationSummary {
    let mut summary = CalibrationSummary {
        m0: 0,
        m1: 0,
        true_negatives: 0,
        true_positives: 0,
    };
    for record in records {
        match (record.human_correct, record.judge_correct) {
            (true, true) => {
                summary.m1 += 1;
                summary.true_positives += 1;
            }
            (true, false) => summary.m1 += 1,
            (false, false) => {
                summary.m0 += 1;
                summary.true_negatives += 1;
            }
            (false, true) => summary.m0 += 1,
        }
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_format_from_extension() {
        assert_eq!(InputFormat::from_path("a/b.CSV").unwrap(), InputFormat::Csv);
        assert_eq!(InputFormat::from_path("x.tsv").unwrap(), InputFormat::Tsv);
        assert_eq!(InputFormat::from_path("x.json").unwrap(), InputFormat::Json);
        assert_eq!(InputFormat::from_path("x.ndjson").unwrap(), InputFormat::JsonLines);
        assert!(InputFormat::from_path("x.parquet").is_err());
        assert!(InputFormat::from_path("noext").is_err());
    }

    #[test]
    fn test_parse_verdict_spellings() {
        assert_eq!(parse_verdict(&json!(true)), Some(true));
        assert_eq!(parse_verdict(&json!(0)), Some(false));
        assert_eq!(parse_verdict(&json!(1.0)), Some(true));
        assert_eq!(parse_verdict(&json!(" Correct ")), Some(true));
        assert_eq!(parse_verdict(&json!("FAIL")), Some(false));
        assert_eq!(parse_verdict(&json!("maybe")), None);
        assert_eq!(parse_verdict(&json!(0.5)), None);
        assert_eq!(parse_verdict(&Value::Null), None);
    }

    #[test]
    fn test_csv_rows_and_summary() {
        let csv = b"id,judge\n1,1\n2,0\n3, yes\n4,false\n";
        let rows = parse_rows("test.csv", InputFormat::Csv, csv).unwrap();
        let records = judge_records("test.csv", &rows, "judge").unwrap();
        let summary = summarize_test_set("test.csv", &records).unwrap();
        assert_eq!(summary, TestSetSummary { n: 4, judged_correct: 2 });
        assert_eq!(summary.p_hat(), 0.5);
    }

    #[test]
    fn test_tsv_rows() {
        let tsv = b"human\tjudge\n1\t1\n0\t1\n";
        let rows = parse_rows("cal.tsv", InputFormat::Tsv, tsv).unwrap();
        let records = calibration_records("cal.tsv", &rows, "human", "judge").unwrap();
        assert_eq!(records.len(), 2);
        assert!(!records[1].human_correct);
    }

    #[test]
    fn test_json_and_jsonl_rows() {
        let json = br#"[{"human": true, "judge": false}, {"human": 0, "judge": "no"}]"#;
        let rows = parse_rows("cal.json", InputFormat::Json, json).unwrap();
        let records = calibration_records("cal.json", &rows, "human", "judge").unwrap();
        let summary = summarize_calibration(&records);
        assert_eq!(summary.m0, 1);
        assert_eq!(summary.m1, 1);
        assert_eq!(summary.true_negatives, 1);
        assert_eq!(summary.true_positives, 0);

        let jsonl = b"{\"judge\": 1}\n\n{\"judge\": 0}\n";
        let rows = parse_rows("t.jsonl", InputFormat::JsonLines, jsonl).unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_json_must_be_array_of_objects() {
        let err = parse_rows("t.json", InputFormat::Json, br#"{"judge": 1}"#).unwrap_err();
        assert!(matches!(err, ReportError::InvalidInputError { .. }));
        let err = parse_rows("t.json", InputFormat::Json, b"[1, 2]").unwrap_err();
        assert!(matches!(err, ReportError::InvalidInputError { row: 1, .. }));
    }

    #[test]
    fn test_bad_cells_report_row_number() {
        let csv = b"judge\n1\nmaybe\n";
        let rows = parse_rows("t.csv", InputFormat::Csv, csv).unwrap();
        let err = judge_records("t.csv", &rows, "judge").unwrap_err();
        assert!(matches!(err, ReportError::InvalidInputError { row: 2, .. }));

        let err = judge_records("t.csv", &rows, "verdict").unwrap_err();
        assert!(err.to_string().contains("missing column 'verdict'"));
    }

    #[test]
    fn test_empty_test_set_is_rejected() {
        assert!(summarize_test_set("t.csv", &[]).is_err());
    }
}

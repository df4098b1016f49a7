use crate::core::sampler::CompositionResult;
use crate::utils::error::{CoaError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 批次表的欄位標題
pub mod columns {
    pub const CODE: &str = "Code";
    pub const DATE: &str = "Date";
    pub const BATCH_NO: &str = "Batch No";
    pub const MOISTURE: &str = "Moisture";
    pub const PH: &str = "pH";
    pub const MESH_200: &str = "200 Mesh";
    pub const VISCOSITY_2H: &str = "Viscosity 2H";
    pub const VISCOSITY_24H: &str = "Viscosity 24H";

    pub const REQUIRED: [&str; 8] = [
        CODE,
        DATE,
        BATCH_NO,
        MOISTURE,
        PH,
        MESH_200,
        VISCOSITY_2H,
        VISCOSITY_24H,
    ];
}

/// 試算表的一列原始資料
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// 從 1 起算的資料列編號（不含標題列）
    pub row: usize,
    pub data: HashMap<String, String>,
}

impl Record {
    pub fn get(&self, column: &str) -> Option<&str> {
        self.data.get(column).map(String::as_str)
    }

    fn require(&self, column: &str) -> Result<&str> {
        match self.get(column) {
            Some(value) if !value.is_empty() => Ok(value),
            _ => Err(CoaError::ValidationError {
                message: format!("row {}: missing value for column '{}'", self.row, column),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchRecord {
    pub code: String,
    pub date: String,
    pub batch_no: String,
    pub moisture: f64,
    pub ph: String,
    pub mesh_200: String,
    pub viscosity_2h: String,
    pub viscosity_24h: String,
}

impl TryFrom<&Record> for BatchRecord {
    type Error = CoaError;

    fn try_from(record: &Record) -> Result<Self> {
        let raw_moisture = record.require(columns::MOISTURE)?;
        let moisture = parse_percentage(raw_moisture).ok_or_else(|| CoaError::ValidationError {
            message: format!(
                "row {}: moisture '{}' is not a number",
                record.row, raw_moisture
            ),
        })?;

        Ok(Self {
            code: record.require(columns::CODE)?.to_string(),
            date: record.get(columns::DATE).unwrap_or_default().to_string(),
            batch_no: record.require(columns::BATCH_NO)?.to_string(),
            moisture,
            ph: record.get(columns::PH).unwrap_or_default().to_string(),
            mesh_200: record.get(columns::MESH_200).unwrap_or_default().to_string(),
            viscosity_2h: record
                .get(columns::VISCOSITY_2H)
                .unwrap_or_default()
                .to_string(),
            viscosity_24h: record
                .get(columns::VISCOSITY_24H)
                .unwrap_or_default()
                .to_string(),
        })
    }
}

/// 接受 "4.5" 或 "4.5%"
fn parse_percentage(raw: &str) -> Option<f64> {
    raw.trim()
        .trim_end_matches('%')
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

#[derive(Debug, Clone)]
pub struct RenderedDocument {
    pub row: usize,
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub record: BatchRecord,
    pub best_before: String,
    pub composition: CompositionResult,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowFailure {
    pub row: usize,
    pub message: String,
}

#[derive(Debug, Clone, Default)]
pub struct TransformResult {
    pub documents: Vec<RenderedDocument>,
    pub failures: Vec<RowFailure>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentSummary {
    pub row: usize,
    pub path: String,
    pub batch_no: String,
    pub code: String,
    pub moisture: f64,
    pub best_before: String,
    pub composition: CompositionResult,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub seed: u64,
    pub generated: Vec<DocumentSummary>,
    pub failures: Vec<RowFailure>,
    pub archive: Option<String>,
}

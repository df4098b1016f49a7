use crate::domain::model::{columns, Record};
use crate::utils::error::{CoaError, Result};
use std::collections::HashMap;

/// 讀取批次表（CSV，需含標題列）。
///
/// 缺少必要欄位標題視為整批失敗；個別資料列的內容問題留到轉換階段逐列處理。
pub fn read_batch_rows(bytes: &[u8]) -> Result<Vec<Record>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(bytes);

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').to_string())
        .collect();

    let missing: Vec<&str> = columns::REQUIRED
        .iter()
        .copied()
        .filter(|required| !headers.iter().any(|h| h == required))
        .collect();
    if !missing.is_empty() {
        return Err(CoaError::ValidationError {
            message: format!("input is missing required columns: {}", missing.join(", ")),
        });
    }

    let mut records = Vec::new();
    for (index, row) in reader.records().enumerate() {
        let row = row?;
        if row.iter().all(|cell| cell.is_empty()) {
            continue;
        }

        let data: HashMap<String, String> = headers
            .iter()
            .zip(row.iter())
            .map(|(h, cell)| (h.clone(), cell.to_string()))
            .collect();

        records.push(Record {
            row: index + 1,
            data,
        });
    }

    tracing::debug!("Read {} batch rows", records.len());
    Ok(records)
}

use crate::core::components::ComponentSet;
use crate::core::sampler::CompositionResult;
use crate::domain::model::BatchRecord;
use chrono::{Datelike, Month, NaiveDate};
use std::collections::BTreeMap;

pub const UNKNOWN_BEST_BEFORE: &str = "N/A";

/// 由生產月份推算有效期限：兩年後的前一個月。
///
/// 輸入格式為 `"<月份全名> <年>"`，例如 `March 2024` → `FEBRUARY 2026`。
/// 無法解析時回傳 `N/A`。
pub fn best_before(date: &str) -> String {
    let parsed = NaiveDate::parse_from_str(&format!("01 {}", date.trim()), "%d %B %Y");
    let Ok(produced) = parsed else {
        return UNKNOWN_BEST_BEFORE.to_string();
    };

    let mut year = produced.year() + 2;
    let mut month = produced.month() - 1;
    if month == 0 {
        month = 12;
        year -= 1;
    }

    match u8::try_from(month).ok().and_then(|m| Month::try_from(m).ok()) {
        Some(m) => format!("{} {}", m.name().to_uppercase(), year),
        None => UNKNOWN_BEST_BEFORE.to_string(),
    }
}

pub fn template_file_name(code: &str) -> String {
    format!("COA {}.docx", code)
}

pub fn output_file_name(batch_no: &str, code: &str) -> String {
    format!("COA-{}-{}.docx", batch_no.replace('/', "_"), code)
}

/// 產生模板替換表（鍵不含 `{{ }}`）
pub fn build_replacements(
    record: &BatchRecord,
    best_before: &str,
    composition: &CompositionResult,
    components: &ComponentSet,
) -> BTreeMap<String, String> {
    let mut replacements = BTreeMap::new();
    replacements.insert("DATE".to_string(), record.date.clone());
    replacements.insert("BATCH_NO".to_string(), record.batch_no.clone());
    replacements.insert("BEST_BEFORE".to_string(), best_before.to_string());
    replacements.insert("MOISTURE".to_string(), format!("{:.2}%", record.moisture));
    replacements.insert("PH".to_string(), record.ph.clone());
    replacements.insert("MESH_200".to_string(), format!("{}%", record.mesh_200));
    replacements.insert("VISCOSITY_2H".to_string(), record.viscosity_2h.clone());
    replacements.insert("VISCOSITY_24H".to_string(), record.viscosity_24h.clone());

    for component in components.iter() {
        if let Some(value) = composition.get(&component.name) {
            replacements.insert(component.placeholder.clone(), format!("{:.2}%", value));
        }
    }

    replacements
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::sampler::ComponentValue;

    #[test]
    fn test_best_before_adds_two_years_minus_one_month() {
        assert_eq!(best_before("March 2024"), "FEBRUARY 2026");
        assert_eq!(best_before("December 2023"), "NOVEMBER 2025");
        assert_eq!(best_before("  july 2024 "), "JUNE 2026");
    }

    #[test]
    fn test_best_before_january_rolls_back_a_year() {
        assert_eq!(best_before("January 2024"), "DECEMBER 2025");
    }

    #[test]
    fn test_best_before_unparseable() {
        assert_eq!(best_before("2024-03-01"), "N/A");
        assert_eq!(best_before(""), "N/A");
        assert_eq!(best_before("Smarch 2024"), "N/A");
    }

    #[test]
    fn test_file_names() {
        assert_eq!(template_file_name("GG-200"), "COA GG-200.docx");
        assert_eq!(output_file_name("B/04/12", "GG-200"), "COA-B_04_12-GG-200.docx");
    }

    #[test]
    fn test_build_replacements() {
        let record = BatchRecord {
            code: "GG-200".to_string(),
            date: "March 2024".to_string(),
            batch_no: "B-17".to_string(),
            moisture: 7.5,
            ph: "6.8".to_string(),
            mesh_200: "99".to_string(),
            viscosity_2h: "5200".to_string(),
            viscosity_24h: "5600".to_string(),
        };
        let composition = CompositionResult {
            free: ComponentValue {
                name: "gum".to_string(),
                value: 85.75,
            },
            bounded: vec![
                ComponentValue {
                    name: "fat".to_string(),
                    value: 0.5,
                },
                ComponentValue {
                    name: "air".to_string(),
                    value: 3.0,
                },
                ComponentValue {
                    name: "ash".to_string(),
                    value: 0.5,
                },
                ComponentValue {
                    name: "protein".to_string(),
                    value: 2.75,
                },
            ],
            trial: 1,
        };

        let replacements =
            build_replacements(&record, "FEBRUARY 2026", &composition, &ComponentSet::default());

        assert_eq!(replacements["MOISTURE"], "7.50%");
        assert_eq!(replacements["MESH_200"], "99%");
        assert_eq!(replacements["BEST_BEFORE"], "FEBRUARY 2026");
        assert_eq!(replacements["GUM_CONTENT"], "85.75%");
        assert_eq!(replacements["FAT"], "0.50%");
        assert_eq!(replacements["AIR"], "3.00%");
        assert_eq!(replacements["ASH_CONTENT"], "0.50%");
        assert_eq!(replacements["PROTEIN"], "2.75%");
        assert_eq!(replacements.len(), 13);
    }
}

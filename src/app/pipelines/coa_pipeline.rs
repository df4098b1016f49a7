use crate::adapters::spreadsheet::read_batch_rows;
use crate::adapters::storage::join_path;
use crate::adapters::template::DocxTemplate;
use crate::core::sampler::{CompositionResult, CompositionSampler};
use crate::domain::model::{
    BatchRecord, BatchReport, DocumentSummary, Record, RenderedDocument, RowFailure,
    TransformResult,
};
use crate::domain::ports::{ConfigProvider, Pipeline, Storage};
use crate::domain::services::{best_before, build_replacements, output_file_name, template_file_name};
use crate::utils::error::{CoaError, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashMap;
use std::io::Write;
use zip::write::{SimpleFileOptions, ZipWriter};

pub const REPORT_FILE_NAME: &str = "report.json";

/// 乾跑模式下每列的計算結果
#[derive(Debug, Clone)]
pub struct PreviewRow {
    pub record: BatchRecord,
    pub best_before: String,
    pub composition: CompositionResult,
}

pub struct CoaPipeline<S: Storage, C: ConfigProvider> {
    storage: S,
    config: C,
    sampler: CompositionSampler,
    seed: u64,
}

impl<S: Storage, C: ConfigProvider> CoaPipeline<S, C> {
    pub fn new(storage: S, config: C, sampler: CompositionSampler) -> Self {
        let seed = config.seed().unwrap_or_else(rand::random);
        Self {
            storage,
            config,
            sampler,
            seed,
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// 每列使用獨立的亂數流，結果只取決於種子與列號
    fn row_rng(&self, row: usize) -> StdRng {
        let derived = self.seed ^ (row as u64).wrapping_mul(0x9e37_79b9_7f4a_7c15);
        StdRng::seed_from_u64(derived)
    }

    pub fn compose(&self, record: &BatchRecord, row: usize) -> Result<CompositionResult> {
        let mut rng = self.row_rng(row);
        let composition = self
            .sampler
            .calculate_components_random(record.moisture, &mut rng)?;
        Ok(composition)
    }

    /// 只計算成分，不讀模板也不寫檔
    pub fn preview(&self, records: &[Record]) -> Vec<std::result::Result<PreviewRow, RowFailure>> {
        records
            .iter()
            .map(|raw| {
                let record = BatchRecord::try_from(raw).map_err(|e| failure(raw.row, &e))?;
                let composition = self
                    .compose(&record, raw.row)
                    .map_err(|e| failure(raw.row, &e))?;
                Ok(PreviewRow {
                    best_before: best_before(&record.date),
                    record,
                    composition,
                })
            })
            .collect()
    }

    async fn render_row(&self, raw: &Record) -> Result<RenderedDocument> {
        let record = BatchRecord::try_from(raw)?;

        let template_path = join_path(self.config.templates_dir(), &template_file_name(&record.code));
        if !self.storage.exists(&template_path).await {
            return Err(CoaError::TemplateError {
                message: format!("Missing template: {}", template_path),
            });
        }
        let template = DocxTemplate::from_bytes(self.storage.read_file(&template_path).await?);

        let composition = self.compose(&record, raw.row)?;
        let best_before = best_before(&record.date);
        let replacements =
            build_replacements(&record, &best_before, &composition, self.sampler.components());
        let bytes = template.render(&replacements)?;

        Ok(RenderedDocument {
            row: raw.row,
            file_name: output_file_name(&record.batch_no, &record.code),
            bytes,
            record,
            best_before,
            composition,
        })
    }

    fn build_archive(documents: &[RenderedDocument]) -> Result<Vec<u8>> {
        let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));
        for document in documents {
            zip.start_file(document.file_name.as_str(), SimpleFileOptions::default())?;
            zip.write_all(&document.bytes)?;
        }
        Ok(zip.finish()?.into_inner())
    }
}

fn failure(row: usize, error: &CoaError) -> RowFailure {
    RowFailure {
        row,
        message: error.to_string(),
    }
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for CoaPipeline<S, C> {
    async fn extract(&self) -> Result<Vec<Record>> {
        tracing::debug!("Reading batch sheet: {}", self.config.input_path());
        let bytes = self.storage.read_file(self.config.input_path()).await?;
        read_batch_rows(&bytes)
    }

    async fn transform(&self, data: Vec<Record>) -> Result<TransformResult> {
        let mut result = TransformResult::default();
        let mut claimed: HashMap<String, usize> = HashMap::new();

        for raw in &data {
            let rendered = self.render_row(raw).await.and_then(|document| {
                // 同批號同產品會產生同名檔案，保留先出現的列
                match claimed.get(&document.file_name) {
                    Some(first_row) => Err(CoaError::ProcessingError {
                        message: format!(
                            "Duplicate output file {} (already generated by row {})",
                            document.file_name, first_row
                        ),
                    }),
                    None => {
                        claimed.insert(document.file_name.clone(), document.row);
                        Ok(document)
                    }
                }
            });

            match rendered {
                Ok(document) => {
                    tracing::info!("✅ Generated {}", document.file_name);
                    result.documents.push(document);
                }
                Err(e) => {
                    // 單列失敗不影響整批
                    tracing::error!("❌ Row {} failed: {}", raw.row, e);
                    result.failures.push(failure(raw.row, &e));
                }
            }
        }

        Ok(result)
    }

    async fn load(&self, result: TransformResult) -> Result<BatchReport> {
        let output_dir = self.config.output_dir();
        let mut generated = Vec::with_capacity(result.documents.len());

        for document in &result.documents {
            let path = join_path(output_dir, &document.file_name);
            self.storage.write_file(&path, &document.bytes).await?;
            generated.push(DocumentSummary {
                row: document.row,
                path,
                batch_no: document.record.batch_no.clone(),
                code: document.record.code.clone(),
                moisture: document.record.moisture,
                best_before: document.best_before.clone(),
                composition: document.composition.clone(),
            });
        }

        let archive = match self.config.archive_name() {
            Some(name) if !result.documents.is_empty() => {
                tracing::debug!("Creating ZIP file with {} files", result.documents.len());
                let path = join_path(output_dir, name);
                let zip_data = Self::build_archive(&result.documents)?;
                self.storage.write_file(&path, &zip_data).await?;
                Some(path)
            }
            _ => None,
        };

        let report = BatchReport {
            seed: self.seed,
            generated,
            failures: result.failures,
            archive,
        };

        let report_json = serde_json::to_vec_pretty(&report)?;
        self.storage
            .write_file(&join_path(output_dir, REPORT_FILE_NAME), &report_json)
            .await?;

        Ok(report)
    }
}

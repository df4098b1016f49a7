use crate::domain::model::BatchReport;
use crate::domain::ports::Pipeline;
use crate::utils::error::Result;
use std::time::Instant;

pub struct CoaEngine<P: Pipeline> {
    pipeline: P,
}

impl<P: Pipeline> CoaEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self { pipeline }
    }

    pub async fn run(&self) -> Result<BatchReport> {
        let started = Instant::now();
        tracing::info!("Starting COA batch...");

        tracing::info!("Extracting batch rows...");
        let rows = self.pipeline.extract().await?;
        tracing::info!("Extracted {} rows", rows.len());

        tracing::info!("Generating certificates...");
        let transformed = self.pipeline.transform(rows).await?;
        tracing::info!(
            "Rendered {} certificates, {} rows failed",
            transformed.documents.len(),
            transformed.failures.len()
        );

        tracing::info!("Writing output...");
        let report = self.pipeline.load(transformed).await?;
        if let Some(archive) = &report.archive {
            tracing::info!("Archive saved to: {}", archive);
        }
        tracing::info!("Batch finished in {:.2?}", started.elapsed());

        Ok(report)
    }
}

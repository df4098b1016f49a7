pub mod coa_pipeline;

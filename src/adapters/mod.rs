// Adapters layer: concrete implementations for external systems (storage, spreadsheet input, document templates).

pub mod spreadsheet;
pub mod storage;
pub mod template;

use crate::core::sampler::CompositionError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoaError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Composition error: {0}")]
    CompositionError(#[from] CompositionError),

    #[error("Template error: {message}")]
    TemplateError { message: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Io,
    Configuration,
    Data,
    Composition,
    Template,
    Archive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl CoaError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            CoaError::ZipError(_) => ErrorCategory::Archive,
            CoaError::IoError(_) => ErrorCategory::Io,
            CoaError::CsvError(_)
            | CoaError::SerializationError(_)
            | CoaError::ProcessingError { .. }
            | CoaError::ValidationError { .. } => ErrorCategory::Data,
            CoaError::CompositionError(_) => ErrorCategory::Composition,
            CoaError::TemplateError { .. } => ErrorCategory::Template,
            CoaError::ConfigError { .. }
            | CoaError::ConfigValidationError { .. }
            | CoaError::InvalidConfigValueError { .. }
            | CoaError::MissingConfigError { .. } => ErrorCategory::Configuration,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            // 換一個亂數種子重跑可能成功
            ErrorCategory::Composition => ErrorSeverity::Medium,
            ErrorCategory::Data | ErrorCategory::Template | ErrorCategory::Archive => {
                ErrorSeverity::High
            }
            ErrorCategory::Io | ErrorCategory::Configuration => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            CoaError::ZipError(_) => "確認模板是有效的 .docx 檔案，且輸出目錄可寫入".to_string(),
            CoaError::CsvError(_) => {
                "確認輸入檔為以逗號分隔、含標題列的 CSV（可由 Excel 另存新檔）".to_string()
            }
            CoaError::IoError(_) => "檢查檔案路徑是否存在以及讀寫權限".to_string(),
            CoaError::SerializationError(_) => "檢查報表內容是否含有無法序列化的數值".to_string(),
            CoaError::CompositionError(_) => {
                "確認水分落在成分區間可達的範圍內，或調整 [components] 的上下限".to_string()
            }
            CoaError::TemplateError { .. } => {
                "確認模板檔名為 'COA <Code>.docx' 且內容為合法的 Word 文件".to_string()
            }
            CoaError::ConfigError { .. }
            | CoaError::ConfigValidationError { .. }
            | CoaError::InvalidConfigValueError { .. }
            | CoaError::MissingConfigError { .. } => {
                "檢查命令列參數與 TOML 設定檔的欄位".to_string()
            }
            CoaError::ProcessingError { .. } | CoaError::ValidationError { .. } => {
                "檢查輸入資料列的欄位是否完整且格式正確".to_string()
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            CoaError::IoError(e) => format!("檔案讀寫失敗: {}", e),
            CoaError::CsvError(e) => format!("無法解析輸入的 CSV: {}", e),
            CoaError::CompositionError(e) => format!("無法產生成分組合: {}", e),
            CoaError::TemplateError { message } => format!("模板處理失敗: {}", message),
            CoaError::ZipError(e) => format!("壓縮檔處理失敗: {}", e),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CoaError>;

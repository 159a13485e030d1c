use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Programmer error in the theme. Raised before any layout happens.
    #[error("invalid theme: {0}")]
    InvalidTheme(String),

    #[error("asset not found: {0}")]
    AssetMissing(String),

    #[error("malformed asset {name}: {reason}")]
    AssetMalformed { name: String, reason: String },

    #[error("font unavailable: {0}")]
    FontUnavailable(String),

    /// A single block could not be laid out. Absorbed by the assembler.
    #[error("failed to render {block}: {reason}")]
    SectionRender { block: &'static str, reason: String },

    #[error("theme parse error: {0}")]
    ThemeParse(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("settings: {0}")]
    Settings(String),

    #[error("route: {0}")]
    Route(String),

    #[error("no usable heading from route point {index}: reached end of route ({len} points)")]
    Geometry { index: usize, len: usize },

    #[error("provider: {0}")]
    Provider(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("export: {0}")]
    Export(String),

    #[error("{path}: {source}")]
    File {
        path: String,
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn file(path: &std::path::Path, source: std::io::Error) -> Self {
        Error::File {
            path: path.display().to_string(),
            source: source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

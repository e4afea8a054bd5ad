use thiserror::Error;

#[derive(Debug, Error)]
pub enum AtlasError {
    #[error("layout `{0}` is not defined in the configuration")]
    UnknownLayout(String),
    #[error("configuration version `{0}` is not a semantic version")]
    InvalidConfigVersion(String),
    #[error("layout `{0}` has no visible nodes after community filtering")]
    EmptyGraph(String),
}

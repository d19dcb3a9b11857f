use thiserror::Error;

/// Failures that are reported back to the user. None of these are fatal to
/// the session: state is left untouched and the command is not issued.
#[derive(Debug, Error)]
pub enum XrayError {
    #[error("failed to import trs80gp dump: {0}")]
    MalformedImport(String),

    #[error("invalid address input: {0}")]
    InvalidAddressInput(String),

    #[error("no byte selected")]
    NoSelection,

    #[error("malformed frame from SUT: {0}")]
    MalformedFrame(#[source] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, XrayError>;

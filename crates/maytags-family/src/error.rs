/// Errors raised while resolving families or building dictionaries.
#[derive(thiserror::Error, Debug)]
pub enum FamilyError {
    #[error("unknown tag family `{name}` (known: {known})")]
    UnknownFamily { name: String, known: String },
    #[error("invalid tag family `{name}`: {reason}")]
    InvalidFamily { name: String, reason: String },
    #[error("unsupported dictionary hamming distance {max_hamming} (at most 2)")]
    UnsupportedHamming { max_hamming: u8 },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

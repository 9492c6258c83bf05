use thiserror::Error;

pub type Result<T> = std::result::Result<T, VmError>;

#[derive(Error, Debug)]
pub enum VmError {
    /// Bad or missing command-line settings. Raised before replay starts.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The trace line could not be decoded into an access.
    #[error("line {line}: malformed record: {reason}")]
    MalformedRecord { line: usize, reason: String },

    /// The decoded page number does not fit in the page table.
    #[error("line {line}: page {page:#X} is outside the addressable range")]
    OutOfRangeAddress { line: usize, page: u64 },

    /// The replacer gave no usable victim while every frame was taken.
    #[error("policy invariant violated: {0}")]
    PolicyInvariantViolation(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl VmError {
    /// Record-level errors skip the offending line; everything else ends the run.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            VmError::MalformedRecord { .. } | VmError::OutOfRangeAddress { .. }
        )
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            VmError::Configuration(_) => 2,
            VmError::Io(_) => 3,
            VmError::PolicyInvariantViolation(_) => 4,
            VmError::MalformedRecord { .. } | VmError::OutOfRangeAddress { .. } => 1,
        }
    }
}

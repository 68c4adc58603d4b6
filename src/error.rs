/// Request-terminating failures of the summarization pipeline.
///
/// The `Display` text of each variant is what the user sees.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Missing YouTube URL.")]
    MissingUrl,

    #[error("Invalid YouTube URL.")]
    InvalidUrl,

    #[error("No transcript available for this video.")]
    NoTranscript,

    #[error("Transcript too long for this model's context window. Try a shorter video or trim the transcript.")]
    ContextTooLong,

    #[error("Summarization request failed.")]
    SummarizationFailed,

    #[error("Unable to fetch metadata.")]
    MetadataUnavailable,
}

impl Error {
    /// Whether the failure originates with the caller's input rather than a provider.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Error::SummarizationFailed)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

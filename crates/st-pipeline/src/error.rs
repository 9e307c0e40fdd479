use st_frame::FrameError;
use st_types::TypeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("country {country:?} is not supported (expected BG, RO or GR)")]
    UnsupportedCountry { country: String },
    #[error("anchor column {column:?} cannot also be one of the moved columns")]
    AnchorInMoveSet { column: String },
    #[error(transparent)]
    Frame(#[from] FrameError),
    #[error(transparent)]
    Type(#[from] TypeError),
}

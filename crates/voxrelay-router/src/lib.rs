pub mod pipeline;
pub mod relay;
pub mod transcript;

pub use pipeline::{PipelineConfig, UtterancePipeline};
pub use relay::{RelayHost, RelayStats};
pub use transcript::extract_transcript;

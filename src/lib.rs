pub mod classify;
pub mod config;
pub mod dedupe;
pub mod digest;
pub mod fetcher;
pub mod llm_adapter;
pub mod normalize;
pub mod pipeline;
pub mod select;
pub mod sources;
pub mod summarize;
pub mod types;

pub use config::{load_sources, RunConfig};
pub use fetcher::{FetchConfig, Fetcher};
pub use llm_adapter::{DynLlmAdapter, LlmAdapter, MockLlmAdapter, OpenAiAdapter};
pub use pipeline::{run, RenderedDigest};
pub use types::*;

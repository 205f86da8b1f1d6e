pub mod bridge;
pub mod decoder;
pub mod fetcher;
pub mod file_fetcher;

pub use bridge::{BridgeConfig, BridgeEvent, DemandBridge};
pub use decoder::decode_chunk;
pub use fetcher::CursorFetcher;
pub use file_fetcher::FileFetcher;

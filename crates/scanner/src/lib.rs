pub mod bootstrap;
pub mod engine;
pub mod fetcher;

pub use bootstrap::{build_engine, build_tree, simulated_exchanges};
pub use engine::{GenerationReport, ScanEngine, ScanEvent};
pub use fetcher::{VertexFetcher, VertexQuote};

pub mod prelude {
    pub use super::{
        build_engine, build_tree, simulated_exchanges, GenerationReport, ScanEngine, ScanEvent,
        VertexFetcher, VertexQuote,
    };
}

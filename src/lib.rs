pub use triarb_core::prelude::*;
pub use triarb_exchange::prelude::*;
pub use triarb_graph::{Mashup, Path, PathFinder, Tree, VertexId, VertexKey};
pub use triarb_monitoring::prelude::*;
pub use triarb_scanner::prelude::*;
pub use triarb_strategy::prelude::*;

pub use triarb_core::config;

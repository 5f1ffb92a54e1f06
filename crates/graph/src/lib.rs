pub mod mashup;
pub mod path;
pub mod tree;
pub mod vertex;

pub use mashup::*;
pub use path::*;
pub use tree::*;
pub use vertex::*;

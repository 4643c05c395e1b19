mod model;
mod procedure;

pub use model::*;
pub use procedure::*;

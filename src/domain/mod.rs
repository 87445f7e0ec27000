mod category;
mod money;
mod record;
mod schedule;

pub use category::*;
pub use money::*;
pub use record::*;
pub use schedule::*;

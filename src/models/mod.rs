pub mod enums;
pub mod notification;
pub mod scan;

pub use enums::*;
pub use notification::*;
pub use scan::*;

pub mod filter;
pub mod grade;
pub mod project;
pub mod session;
pub mod summary;

pub use filter::*;
pub use grade::GradeScale;
pub use project::{Coordinate, Project};
pub use session::Session;
pub use summary::*;

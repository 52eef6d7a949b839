pub mod http;
pub mod logging;
pub mod observable;

pub use observable::{Observable, Subscription};

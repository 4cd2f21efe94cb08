pub mod payment;
pub mod record;

pub use payment::*;
pub use record::*;

pub mod handlers;
pub mod payment_handlers;
pub mod request_log;
pub mod routes;

pub use handlers::*;
pub use payment_handlers::*;
pub use routes::*;

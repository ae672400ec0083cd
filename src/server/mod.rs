pub mod builder;
pub mod handler;
pub mod listener;
pub mod routes;

pub use builder::{BoundServer, ServerBuilder};
pub use handler::RequestHandler;
pub use listener::find_free_ports;
pub use routes::{ApiError, GameService, MessageBody};

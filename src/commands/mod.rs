pub mod serve;
pub mod update_airports;
pub mod update_routes;

pub use serve::handle_serve;
pub use update_airports::handle_update_airports;
pub use update_routes::handle_update_routes;

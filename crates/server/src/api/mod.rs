pub mod error;
pub mod handlers;
pub mod library;
pub mod middleware;
pub mod monitor;
pub mod movies;
pub mod routes;
pub mod torrents;

pub use routes::create_router;

pub mod manager;
pub mod messages;
pub mod rounds;
pub mod server;
pub mod session;

pub use server::RoomSession;

pub mod entities;
pub mod input;
pub mod room;
pub mod room_store;
pub mod session;

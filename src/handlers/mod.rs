pub mod http;
pub mod models;

pub use http::AppState;
pub use models::{CreateRoomRequest, LeaveResponse, ParticipantRequest, RoomDetail, RoomInfo};

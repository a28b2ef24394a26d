//! Types shared by the coedit relay and client: error taxonomy, id
//! minting, and the JSON bodies of the HTTP routes.

pub mod errors;
pub mod id;
pub mod protocol;

pub use errors::{CoeditError, CompletionError, ConfigError, ConnectionError, TransportError};
pub use id::{new_room_id, ParticipantId};
pub use protocol::{
    cursor_at_end, CompletionRequest, CompletionResponse, CreateRoomRequest, CreateRoomResponse,
    ErrorBody,
};

pub type Result<T> = std::result::Result<T, CoeditError>;

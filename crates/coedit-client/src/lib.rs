//! coedit-client: room participant for the coedit relay.
//!
//! A participant holds the full document text, broadcasts a snapshot on
//! every local edit, adopts whatever snapshot arrives from the room, and
//! asks the relay for a code suggestion once typing has paused.
//!
//! ```rust,no_run
//! # async fn demo() -> Result<(), coedit_common::CoeditError> {
//! let config = coedit_config::load_config()?;
//! let room = coedit_client::RoomDirectory::new(&config.client)?
//!     .create_room(None)
//!     .await?;
//! let participant = coedit_client::join_room(&config.client, &room).await?;
//! participant.edit("def f():").await;
//! # Ok(())
//! # }
//! ```

pub mod channel;
pub mod completion;
pub mod debounce;
pub mod directory;
pub mod participant;
pub mod requester;
pub mod session;

pub use channel::{ChannelEvent, RoomChannel, RoomTransport};
pub use completion::{CompletionService, HttpCompletionService};
pub use debounce::Debounce;
pub use directory::{normalize_room_id, RoomDirectory};
pub use participant::{
    join_room, spawn_participant, ParticipantHandle, ParticipantSettings, SessionView,
};
pub use requester::{CompletionOutcome, SuggestionRequester};
pub use session::{DocumentSession, Phase, Resolution, SuggestionState, SuggestionTicket};

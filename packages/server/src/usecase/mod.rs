//! UseCase 層
//!
//! ビジネスロジックを実装するレイヤー。
//! UI 層から呼び出され、Domain 層とコネクションレジストリを操作します。

pub mod close_session;
pub mod delete_private_chat;
pub mod error;
pub mod open_session;
pub mod send_message;
pub mod session;

pub use close_session::CloseSessionUseCase;
pub use delete_private_chat::{DeletePrivateChatUseCase, DeletedChat};
pub use error::{ConnectError, SendMessageError};
pub use open_session::OpenSessionUseCase;
pub use send_message::{Delivery, SendMessageUseCase};
pub use session::{ChatSession, FrameOutcome, SessionPolicy, SessionState};

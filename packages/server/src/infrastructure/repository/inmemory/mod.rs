//! InMemory 実装
//!
//! 外部のユーザーディレクトリとコンテンツストアの代わりに、
//! プロセス内の HashMap を DB として使用します。

mod identity;
mod message;
mod private_chat;

pub use identity::InMemoryIdentityDirectory;
pub use message::InMemoryMessageStore;
pub use private_chat::InMemoryPrivateChatRepository;

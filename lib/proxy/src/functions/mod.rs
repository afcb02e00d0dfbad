//! Proxy functions, one per third-party API.

pub mod ai_content;
pub mod board;
pub mod email;
pub mod erp;
pub mod messaging;

pub use ai_content::{AiContentConfig, AiContentFunction};
pub use board::{BoardConfig, BoardFunction};
pub use email::{EmailConfig, EmailFunction};
pub use erp::{ErpConfig, ErpFunction};
pub use messaging::{MessagingConfig, MessagingFunction};

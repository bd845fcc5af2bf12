pub mod commands;
pub mod dispatcher;
pub mod engine;
pub mod gateway;
pub mod keyboards;
pub mod states;

pub use commands::{Command, Commands};
pub use dispatcher::{start_bot, BotDispatcher};
pub use engine::ConversationEngine;
pub use gateway::{Button, Gateway, Keyboard, TelegramGateway};
pub use states::{ConversationState, FlowOrigin, PendingExpense, SessionStore};

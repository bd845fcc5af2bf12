pub mod bot;
pub mod config;
pub mod database;
pub mod error;
pub mod ledger;
pub mod notifier;
pub mod parser;
pub mod retry;
pub mod utils;

pub use bot::{Commands, ConversationEngine, Gateway, SessionStore, TelegramGateway};
pub use config::Settings;
pub use database::{models, DatabaseOperations};
pub use error::GastoBotError;
pub use ledger::BudgetLedger;
pub use notifier::Notifier;
pub use parser::ExpenseParser;

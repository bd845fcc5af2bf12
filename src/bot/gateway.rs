use crate::error::Result;
use async_trait::async_trait;
use teloxide::payloads::{EditMessageTextSetters, SendMessageSetters};
use teloxide::prelude::Requester;
use teloxide::types::{
    ChatId, InlineKeyboardButton, InlineKeyboardMarkup, MessageId, ParseMode,
};
use teloxide::Bot;

/// One inline button: a label plus the opaque callback token it carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub label: String,
    pub token: String,
}

impl Button {
    pub fn new(label: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            token: token.into(),
        }
    }
}

/// Rows of inline buttons attached to an outbound message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Keyboard {
    pub rows: Vec<Vec<Button>>,
}

impl Keyboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn row(mut self, buttons: Vec<Button>) -> Self {
        self.rows.push(buttons);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Messaging gateway consumed by the conversation engine and the notifier.
/// The production implementation talks to Telegram; tests substitute a mock.
#[async_trait]
pub trait Gateway: Send + Sync {
    async fn send_message(
        &self,
        chat: ChatId,
        text: &str,
        keyboard: Option<Keyboard>,
    ) -> Result<()>;

    async fn edit_message(&self, chat: ChatId, message: MessageId, text: &str) -> Result<()>;

    async fn answer_callback(&self, callback_id: &str) -> Result<()>;
}

pub struct TelegramGateway {
    bot: Bot,
}

impl TelegramGateway {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    fn to_inline_markup(keyboard: Keyboard) -> InlineKeyboardMarkup {
        InlineKeyboardMarkup::new(keyboard.rows.into_iter().map(|row| {
            row.into_iter()
                .map(|b| InlineKeyboardButton::callback(b.label, b.token))
                .collect::<Vec<_>>()
        }))
    }
}

#[async_trait]
impl Gateway for TelegramGateway {
    async fn send_message(
        &self,
        chat: ChatId,
        text: &str,
        keyboard: Option<Keyboard>,
    ) -> Result<()> {
        let request = self
            .bot
            .send_message(chat, text)
            .parse_mode(ParseMode::Markdown);

        match keyboard {
            Some(k) if !k.is_empty() => {
                request.reply_markup(Self::to_inline_markup(k)).await?;
            }
            _ => {
                request.await?;
            }
        }
        Ok(())
    }

    async fn edit_message(&self, chat: ChatId, message: MessageId, text: &str) -> Result<()> {
        self.bot
            .edit_message_text(chat, message, text)
            .parse_mode(ParseMode::Markdown)
            .await?;
        Ok(())
    }

    async fn answer_callback(&self, callback_id: &str) -> Result<()> {
        self.bot.answer_callback_query(callback_id).await?;
        Ok(())
    }
}

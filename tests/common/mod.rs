#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;

use gastobot::bot::{Gateway, Keyboard};
use gastobot::error::{GastoBotError, Result};

use teloxide::types::{ChatId, MessageId};

/// Recording gateway used by every integration test in place of the
/// Telegram client.
#[derive(Debug, Clone)]
pub struct MockGateway {
    pub sent_messages: Arc<Mutex<Vec<SentMessage>>>,
    pub edited_messages: Arc<Mutex<Vec<EditedMessage>>>,
    pub answered_callbacks: Arc<Mutex<Vec<String>>>,
    pub should_fail: Arc<Mutex<bool>>,
}

#[derive(Debug, Clone)]
pub struct SentMessage {
    pub chat_id: ChatId,
    pub text: String,
    pub keyboard: Option<Keyboard>,
}

#[derive(Debug, Clone)]
pub struct EditedMessage {
    pub chat_id: ChatId,
    pub message_id: MessageId,
    pub text: String,
}

impl MockGateway {
    pub fn new() -> Self {
        Self {
            sent_messages: Arc::new(Mutex::new(Vec::new())),
            edited_messages: Arc::new(Mutex::new(Vec::new())),
            answered_callbacks: Arc::new(Mutex::new(Vec::new())),
            should_fail: Arc::new(Mutex::new(false)),
        }
    }

    pub async fn set_should_fail(&self, should_fail: bool) {
        *self.should_fail.lock().await = should_fail;
    }

    pub async fn get_sent_messages(&self) -> Vec<SentMessage> {
        self.sent_messages.lock().await.clone()
    }

    pub async fn get_edited_messages(&self) -> Vec<EditedMessage> {
        self.edited_messages.lock().await.clone()
    }

    pub async fn clear_all(&self) {
        self.sent_messages.lock().await.clear();
        self.edited_messages.lock().await.clear();
        self.answered_callbacks.lock().await.clear();
    }

    /// Last sent message text, panics when nothing was sent.
    pub async fn last_text(&self) -> String {
        self.sent_messages
            .lock()
            .await
            .last()
            .map(|m| m.text.clone())
            .expect("no messages sent")
    }

    /// All callback tokens present on the last sent keyboard.
    pub async fn last_keyboard_tokens(&self) -> Vec<String> {
        let messages = self.sent_messages.lock().await;
        let keyboard = messages
            .last()
            .and_then(|m| m.keyboard.clone())
            .expect("last message had no keyboard");
        keyboard
            .rows
            .iter()
            .flatten()
            .map(|b| b.token.clone())
            .collect()
    }
}

#[async_trait]
impl Gateway for MockGateway {
    async fn send_message(
        &self,
        chat: ChatId,
        text: &str,
        keyboard: Option<Keyboard>,
    ) -> Result<()> {
        if *self.should_fail.lock().await {
            return Err(GastoBotError::parser_error("mock send failure"));
        }
        self.sent_messages.lock().await.push(SentMessage {
            chat_id: chat,
            text: text.to_string(),
            keyboard,
        });
        Ok(())
    }

    async fn edit_message(&self, chat: ChatId, message: MessageId, text: &str) -> Result<()> {
        if *self.should_fail.lock().await {
            return Err(GastoBotError::parser_error("mock edit failure"));
        }
        self.edited_messages.lock().await.push(EditedMessage {
            chat_id: chat,
            message_id: message,
            text: text.to_string(),
        });
        Ok(())
    }

    async fn answer_callback(&self, callback_id: &str) -> Result<()> {
        self.answered_callbacks
            .lock()
            .await
            .push(callback_id.to_string());
        Ok(())
    }
}

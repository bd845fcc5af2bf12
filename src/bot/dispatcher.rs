use anyhow::Result;
use log::{debug, error, info};
use teloxide::{
    prelude::*,
    types::{ChatMemberKind, ChatMemberUpdated, MediaKind, MessageKind},
    RequestError,
};

use crate::bot::engine::ConversationEngine;
use crate::bot::Command;
use std::sync::Arc;

const GENERIC_ERROR: &str = "❌ Ocurrió un error procesando tu solicitud. Intenta de nuevo.";

pub struct BotDispatcher {
    engine: Arc<ConversationEngine>,
    bot_name: String,
}

impl BotDispatcher {
    pub fn new(engine: Arc<ConversationEngine>, bot_name: impl Into<String>) -> Self {
        Self {
            engine,
            bot_name: bot_name.into(),
        }
    }

    pub async fn run(self, bot: Bot) -> Result<()> {
        info!("🤖 Starting GastoBot dispatcher...");

        let command_engine = self.engine.clone();
        let text_engine = self.engine.clone();
        let callback_engine = self.engine.clone();
        let member_engine = self.engine.clone();

        Dispatcher::builder(
            bot,
            dptree::entry()
                .branch(
                    Update::filter_message()
                        .branch(
                            dptree::entry()
                                .filter_command::<Command>()
                                .endpoint(move |bot: Bot, msg: Message, cmd: Command| {
                                    let engine = command_engine.clone();
                                    async move {
                                        debug!("Handling command: {cmd:?}");
                                        let user_id = sender_id(&msg);

                                        if let Err(e) =
                                            engine.handle_command(msg.chat.id, &user_id, cmd).await
                                        {
                                            error!("Failed to handle command {cmd:?}: {e}");
                                            send_generic_error(&bot, msg.chat.id).await;
                                        }

                                        Ok::<(), RequestError>(())
                                    }
                                }),
                        )
                        .branch(
                            dptree::filter(|msg: Message| msg.text().is_some()).endpoint(
                                move |bot: Bot, msg: Message| {
                                    let engine = text_engine.clone();
                                    async move {
                                        debug!(
                                            "Handling message from chat: {}, user: {:?}",
                                            msg.chat.id,
                                            msg.from()
                                        );

                                        if let MessageKind::Common(common) = &msg.kind {
                                            if let MediaKind::Text(media) = &common.media_kind {
                                                let user_id = sender_id(&msg);
                                                if let Err(e) = engine
                                                    .handle_text(msg.chat.id, &user_id, &media.text)
                                                    .await
                                                {
                                                    error!("Failed to handle message: {e}");
                                                    send_generic_error(&bot, msg.chat.id).await;
                                                }
                                            }
                                        }

                                        Ok::<(), RequestError>(())
                                    }
                                },
                            ),
                        ),
                )
                .branch(Update::filter_callback_query().endpoint(
                    move |bot: Bot, q: CallbackQuery| {
                        let engine = callback_engine.clone();
                        async move {
                            let Some(message) = q.message else {
                                return Ok::<(), RequestError>(());
                            };
                            let Some(token) = q.data else {
                                return Ok(());
                            };

                            let user_id = q.from.id.to_string();
                            if let Err(e) = engine
                                .handle_callback(
                                    message.chat.id,
                                    &user_id,
                                    &q.id,
                                    Some(message.id),
                                    &token,
                                )
                                .await
                            {
                                error!("Failed to handle callback '{token}': {e}");
                                send_generic_error(&bot, message.chat.id).await;
                            }

                            Ok(())
                        }
                    },
                ))
                .branch(Update::filter_my_chat_member().endpoint(
                    move |upd: ChatMemberUpdated| {
                        let engine = member_engine.clone();
                        async move {
                            let joined = matches!(
                                upd.new_chat_member.kind,
                                ChatMemberKind::Member
                                    | ChatMemberKind::Administrator(_)
                                    | ChatMemberKind::Owner(_)
                            );
                            if let Err(e) = engine.handle_membership(upd.chat.id, joined).await {
                                error!("Failed to handle membership update: {e}");
                            }
                            Ok::<(), RequestError>(())
                        }
                    },
                )),
        )
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

        info!("👋 {} dispatcher stopped", self.bot_name);
        Ok(())
    }
}

fn sender_id(msg: &Message) -> String {
    msg.from()
        .map(|u| u.id.to_string())
        .unwrap_or_else(|| msg.chat.id.to_string())
}

async fn send_generic_error(bot: &Bot, chat: ChatId) {
    if let Err(e) = bot.send_message(chat, GENERIC_ERROR).await {
        error!("Failed to send error message: {e}");
    }
}

/// Connect, report the bot identity, then dispatch until shutdown.
pub async fn start_bot(token: &str, engine: Arc<ConversationEngine>, bot_name: &str) -> Result<()> {
    info!("🚀 Initializing Telegram Bot...");

    let bot = Bot::new(token);

    match bot.get_me().await {
        Ok(me) => {
            info!("✅ Bot connected successfully:");
            info!("  - Username: @{}", me.username());
            info!("  - Name: {}", me.first_name);
            info!("  - ID: {}", me.id);
        }
        Err(e) => {
            error!("❌ Failed to connect to Telegram Bot API: {e}");
            return Err(anyhow::anyhow!("Bot connection failed: {}", e));
        }
    }

    let dispatcher = BotDispatcher::new(engine, bot_name);

    info!("🎯 Starting message processing...");
    info!("💡 Bot is now ready to receive messages!");

    dispatcher.run(bot).await?;

    Ok(())
}

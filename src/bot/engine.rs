use crate::bot::commands::{Command, Commands};
use crate::bot::gateway::{Gateway, Keyboard};
use crate::bot::keyboards::{
    self, CB_ANOTHER_BUDGET, CB_CANCEL_BUDGET, CB_CANCEL_DELETE, CB_CANCEL_REPLACE,
    CB_CATEGORY_PREFIX, CB_CONFIRM_DELETE, CB_CONFIRM_REPLACE, CB_CUSTOM_CATEGORY, CB_EXIT,
    CB_MENU_PREFIX, CB_QUERY_PREFIX, CB_RECORD_EXPENSE, CB_RETRY_LIMIT, CB_SET_BUDGET_PREFIX,
    CB_SKIP_BUDGET,
};
use crate::bot::states::{ConversationState, FlowOrigin, PendingExpense, SessionStore};
use crate::database::DatabaseOperations;
use crate::error::Result;
use crate::ledger::{BudgetLedger, BudgetStatus};
use crate::parser::ExpenseParser;
use crate::retry::with_store_timeout;
use crate::utils::{Formatter, Validator};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Duration;
use teloxide::types::{ChatId, MessageId};

const FORMAT_HELP: &str = "❌ No entendí el formato. Prueba con ejemplos como:\n\
    • `5000 comida`\n• `comida 5000`\n• `comida: 5.000`";
const EXPENSE_PROMPT: &str = "✍️ Escribe el gasto en el formato: 5000 comida";
const MID_FLOW_HINT: &str =
    "✋ Estoy esperando que uses los botones de arriba. Escribe /cancelar para salir.";
const STALE_BUTTON: &str = "⚠️ Esa opción ya no está activa.";

/// Outcome of the post-expense budget verification.
enum BudgetCheck {
    NoBudget,
    WithinLimit,
    Exceeded {
        status: BudgetStatus,
        suggestions: Vec<BudgetStatus>,
    },
}

/// The per-chat finite-state machine. Every inbound event lands here; the
/// engine consults the chat's conversation slot, delegates business logic
/// to the ledger and store, and replies through the gateway.
#[derive(Clone)]
pub struct ConversationEngine {
    db: DatabaseOperations,
    ledger: BudgetLedger,
    parser: ExpenseParser,
    sessions: SessionStore,
    gateway: Arc<dyn Gateway>,
    commands: Commands,
    commands_cancel_flow: bool,
    store_timeout: Duration,
    tz: Tz,
}

impl ConversationEngine {
    pub fn new(
        db: DatabaseOperations,
        gateway: Arc<dyn Gateway>,
        tz: Tz,
        store_timeout: Duration,
        commands_cancel_flow: bool,
    ) -> Self {
        let ledger = BudgetLedger::new(db.clone(), tz);
        let commands = Commands::new(db.clone(), gateway.clone(), tz);
        Self {
            db,
            ledger,
            parser: ExpenseParser::new(),
            sessions: SessionStore::new(),
            gateway,
            commands,
            commands_cancel_flow,
            store_timeout,
            tz,
        }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    // --- inbound events ---------------------------------------------------

    pub async fn handle_command(&self, chat: ChatId, user_id: &str, command: Command) -> Result<()> {
        debug!("Command {command:?} from chat {chat}");

        if command == Command::Cancelar {
            return self.cancel_flow(chat).await;
        }

        if !self.reconcile_active_flow(chat).await? {
            return Ok(());
        }

        match command {
            Command::Start => self.commands.handle_start(chat, user_id).await,
            Command::Menu => self.commands.send_menu(chat).await,
            Command::Presupuesto => self.start_budget_flow(chat, user_id).await,
            Command::Consultar => self.start_query_flow(chat, user_id).await,
            Command::Resumen => self.commands.handle_resumen(chat, user_id).await,
            Command::Total => self.commands.handle_total(chat, user_id).await,
            Command::Ultimo => self.commands.handle_ultimo(chat, user_id).await,
            Command::Eliminar => self.start_delete_flow(chat, user_id).await,
            Command::Grafico => self.commands.handle_grafico(chat, user_id).await,
            Command::Comparar => self.commands.handle_comparar(chat, user_id).await,
            Command::CompararDetalle => {
                self.commands.handle_comparar_detalle(chat, user_id).await
            }
            Command::Cancelar => unreachable!("handled above"),
        }
    }

    pub async fn handle_text(&self, chat: ChatId, user_id: &str, text: &str) -> Result<()> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(());
        }

        // Unknown slash commands: recognized ones never reach this path.
        if text.starts_with('/') {
            if !self.reconcile_active_flow(chat).await? {
                return Ok(());
            }
            return self.commands.handle_unknown(chat).await;
        }

        // Persistent-keyboard labels behave like their commands.
        if let Some(command) = Self::label_command(text) {
            return self.handle_command(chat, user_id, command).await;
        }
        if text == "📝 Registrar gasto" {
            if !self.reconcile_active_flow(chat).await? {
                return Ok(());
            }
            return self.gateway.send_message(chat, EXPENSE_PROMPT, None).await;
        }

        match self.sessions.get(chat).await {
            None => self.handle_expense_entry(chat, user_id, text).await,
            Some(ConversationState::AwaitingCustomCategoryName { origin, pending }) => {
                self.handle_custom_category(chat, user_id, origin, pending, text)
                    .await
            }
            Some(ConversationState::AwaitingBudgetLimit { origin, category }) => {
                self.handle_limit_input(chat, user_id, origin, &category, text)
                    .await
            }
            Some(state) => {
                debug!("Rejecting plain text in state {state:?}");
                self.gateway.send_message(chat, MID_FLOW_HINT, None).await
            }
        }
    }

    pub async fn handle_callback(
        &self,
        chat: ChatId,
        user_id: &str,
        callback_id: &str,
        message: Option<MessageId>,
        token: &str,
    ) -> Result<()> {
        self.gateway.answer_callback(callback_id).await?;
        debug!("Callback '{token}' from chat {chat}");

        // Tokens accepted regardless of state: the limit-offer and the
        // overspend-suggestion buttons can be pressed long after the flow
        // that produced them ended.
        if let Some(category) = token.strip_prefix(CB_SET_BUDGET_PREFIX) {
            let category = category.trim().to_lowercase();
            self.sessions
                .set(
                    chat,
                    ConversationState::AwaitingBudgetLimit {
                        origin: FlowOrigin::Expense,
                        category: category.clone(),
                    },
                )
                .await;
            let text = format!(
                "✍️ ¿Cuál es el *límite mensual* para la categoría *{category}*?\n\n\
                 Por ejemplo: `250.000`"
            );
            return self.gateway.send_message(chat, &text, None).await;
        }

        if token == CB_SKIP_BUDGET {
            self.sessions.clear(chat).await;
            return self
                .reply(
                    chat,
                    message,
                    "✅ Entendido. Puedes establecer un presupuesto en cualquier momento con /presupuesto.",
                    None,
                )
                .await;
        }

        if let Some(action) = token.strip_prefix(CB_MENU_PREFIX) {
            return self.handle_menu_callback(chat, user_id, action).await;
        }

        if token == CB_CANCEL_BUDGET {
            self.sessions.clear(chat).await;
            return self
                .reply(chat, message, "❌ Cancelado. No se guardó ningún presupuesto.", None)
                .await;
        }

        let state = self.sessions.get(chat).await;

        if let Some(category) = token.strip_prefix(CB_CATEGORY_PREFIX) {
            let category = category.trim().to_lowercase();
            return match state {
                Some(ConversationState::AwaitingCategory { origin, pending }) => {
                    self.category_chosen(chat, user_id, origin, pending, &category, message)
                        .await
                }
                _ => self.gateway.send_message(chat, STALE_BUTTON, None).await,
            };
        }

        if let Some(category) = token.strip_prefix(CB_QUERY_PREFIX) {
            let category = category.trim().to_lowercase();
            return match state {
                Some(ConversationState::AwaitingBudgetQueryCategory) => {
                    self.respond_budget_query(chat, user_id, &category, message)
                        .await
                }
                _ => self.gateway.send_message(chat, STALE_BUTTON, None).await,
            };
        }

        match (token, state) {
            (CB_CUSTOM_CATEGORY, Some(ConversationState::AwaitingCategory { origin, pending })) => {
                self.sessions
                    .set(
                        chat,
                        ConversationState::AwaitingCustomCategoryName { origin, pending },
                    )
                    .await;
                self.reply(chat, message, "✍️ Escribe el nombre de la nueva categoría:", None)
                    .await
            }
            (CB_RETRY_LIMIT, Some(ConversationState::AwaitingBudgetLimit { category, .. })) => {
                let text = format!(
                    "✍️ ¿Cuál es el *límite mensual* para la categoría *{category}*?\n\n\
                     Por ejemplo: `50.000`"
                );
                self.reply(chat, message, &text, None).await
            }
            (
                CB_CONFIRM_REPLACE,
                Some(ConversationState::AwaitingOverwriteConfirmation {
                    origin,
                    category,
                    new_limit,
                }),
            ) => {
                self.save_budget(chat, user_id, origin, &category, new_limit)
                    .await
            }
            (CB_CANCEL_REPLACE, Some(ConversationState::AwaitingOverwriteConfirmation { .. })) => {
                self.sessions.clear(chat).await;
                self.reply(
                    chat,
                    message,
                    "❌ Operación cancelada. El presupuesto anterior se mantuvo.",
                    None,
                )
                .await
            }
            (CB_ANOTHER_BUDGET, Some(ConversationState::AwaitingPostBudgetAction { .. })) => {
                self.start_budget_flow(chat, user_id).await
            }
            (CB_RECORD_EXPENSE, Some(ConversationState::AwaitingPostBudgetAction { .. })) => {
                self.sessions.clear(chat).await;
                self.reply(chat, message, EXPENSE_PROMPT, None).await
            }
            (CB_EXIT, Some(ConversationState::AwaitingPostBudgetAction { .. })) => {
                self.sessions.clear(chat).await;
                self.reply(
                    chat,
                    message,
                    "🚪 ¡Listo! Puedes seguir usando otros comandos cuando quieras.",
                    None,
                )
                .await
            }
            (CB_CONFIRM_DELETE, Some(ConversationState::AwaitingDeleteConfirmation { expense_id })) => {
                self.confirm_delete(chat, user_id, expense_id, message).await
            }
            (CB_CANCEL_DELETE, Some(ConversationState::AwaitingDeleteConfirmation { .. })) => {
                self.sessions.clear(chat).await;
                self.reply(chat, message, "❌ Eliminación cancelada.", None).await
            }
            (
                CB_CUSTOM_CATEGORY | CB_RETRY_LIMIT | CB_CONFIRM_REPLACE | CB_CANCEL_REPLACE
                | CB_ANOTHER_BUDGET | CB_RECORD_EXPENSE | CB_EXIT | CB_CONFIRM_DELETE
                | CB_CANCEL_DELETE,
                _,
            ) => self.gateway.send_message(chat, STALE_BUTTON, None).await,
            _ => {
                self.gateway
                    .send_message(chat, "❌ Opción no reconocida.", None)
                    .await
            }
        }
    }

    /// Membership-change event: greet with the menu when the bot becomes a
    /// member of the chat.
    pub async fn handle_membership(&self, chat: ChatId, joined: bool) -> Result<()> {
        if joined {
            self.commands.send_menu(chat).await?;
        }
        Ok(())
    }

    // --- flow entry points ------------------------------------------------

    async fn start_budget_flow(&self, chat: ChatId, user_id: &str) -> Result<()> {
        let custom = self.db.list_categories(user_id).await?;
        self.sessions
            .set(
                chat,
                ConversationState::AwaitingCategory {
                    origin: FlowOrigin::Budget,
                    pending: None,
                },
            )
            .await;
        self.gateway
            .send_message(
                chat,
                "¿Para qué categoría deseas establecer un presupuesto mensual?",
                Some(keyboards::category_selection(&custom, true)),
            )
            .await
    }

    async fn start_query_flow(&self, chat: ChatId, user_id: &str) -> Result<()> {
        let budgets = self.db.list_budgets(user_id).await?;
        if budgets.is_empty() {
            return self
                .gateway
                .send_message(
                    chat,
                    "📭 Aún no tienes categorías con presupuesto registrado.",
                    None,
                )
                .await;
        }

        let categories: Vec<String> = budgets.into_iter().map(|b| b.category).collect();
        self.sessions
            .set(chat, ConversationState::AwaitingBudgetQueryCategory)
            .await;
        self.gateway
            .send_message(
                chat,
                "📊 ¿De qué categoría deseas consultar el presupuesto?",
                Some(keyboards::query_categories(&categories)),
            )
            .await
    }

    async fn start_delete_flow(&self, chat: ChatId, user_id: &str) -> Result<()> {
        let Some(expense) = self.db.latest_expense(user_id).await? else {
            return self
                .gateway
                .send_message(chat, "📭 No hay gastos para eliminar.", None)
                .await;
        };

        // The id captured here is not re-checked as still-most-recent at
        // confirmation time; a racing insert can shift "most recent".
        self.sessions
            .set(
                chat,
                ConversationState::AwaitingDeleteConfirmation {
                    expense_id: expense.id,
                },
            )
            .await;

        let text = format!(
            "❗ ¿Deseas eliminar el último gasto?\n\n💸 {} en {} el {}",
            Formatter::pesos(expense.amount),
            expense.category,
            Formatter::datetime(expense.created_at, self.tz),
        );
        self.gateway
            .send_message(chat, &text, Some(keyboards::delete_confirmation()))
            .await
    }

    // --- text-driven steps ------------------------------------------------

    async fn handle_expense_entry(&self, chat: ChatId, user_id: &str, text: &str) -> Result<()> {
        let Some(parsed) = self.parser.parse(text) else {
            return self.gateway.send_message(chat, FORMAT_HELP, None).await;
        };

        self.db.ensure_user(user_id, Utc::now()).await?;
        let custom = self.db.list_categories(user_id).await?;

        self.sessions
            .set(
                chat,
                ConversationState::AwaitingCategory {
                    origin: FlowOrigin::Expense,
                    pending: Some(PendingExpense {
                        amount: parsed.amount,
                        description: parsed.description,
                    }),
                },
            )
            .await;

        self.gateway
            .send_message(
                chat,
                "Selecciona la categoría del gasto:",
                Some(keyboards::category_selection(&custom, false)),
            )
            .await
    }

    async fn handle_custom_category(
        &self,
        chat: ChatId,
        user_id: &str,
        origin: FlowOrigin,
        pending: Option<PendingExpense>,
        text: &str,
    ) -> Result<()> {
        let name = text.trim().to_lowercase();
        if !Validator::is_valid_category_name(&name) {
            return self
                .gateway
                .send_message(chat, "❌ Nombre de categoría no válido. Intenta con otro.", None)
                .await;
        }

        self.category_chosen(chat, user_id, origin, pending, &name, None)
            .await
    }

    async fn handle_limit_input(
        &self,
        chat: ChatId,
        user_id: &str,
        origin: FlowOrigin,
        category: &str,
        text: &str,
    ) -> Result<()> {
        let Some(limit) = self.parser.parse_limit(text) else {
            return self
                .gateway
                .send_message(
                    chat,
                    "❌ El valor debe ser numérico y mayor que cero. Por ejemplo: `20000`",
                    Some(keyboards::limit_retry()),
                )
                .await;
        };

        // Replacing an existing budget always goes through an explicit
        // confirmation step.
        match self.ledger.get_limit(user_id, category).await? {
            Some(current) => {
                self.sessions
                    .set(
                        chat,
                        ConversationState::AwaitingOverwriteConfirmation {
                            origin,
                            category: category.to_string(),
                            new_limit: limit,
                        },
                    )
                    .await;
                let text = format!(
                    "⚠️ Ya tienes un presupuesto para *{category}* de {}.\n\
                     ¿Quieres reemplazarlo por {}?",
                    Formatter::pesos(current),
                    Formatter::pesos(limit),
                );
                self.gateway
                    .send_message(chat, &text, Some(keyboards::overwrite_confirmation()))
                    .await
            }
            None => self.save_budget(chat, user_id, origin, category, limit).await,
        }
    }

    // --- shared steps -----------------------------------------------------

    /// A category was resolved (button or typed). Expense origin persists
    /// the pending expense; budget origin moves on to the limit question.
    async fn category_chosen(
        &self,
        chat: ChatId,
        user_id: &str,
        origin: FlowOrigin,
        pending: Option<PendingExpense>,
        category: &str,
        message: Option<MessageId>,
    ) -> Result<()> {
        match origin {
            FlowOrigin::Budget => {
                self.sessions
                    .set(
                        chat,
                        ConversationState::AwaitingBudgetLimit {
                            origin,
                            category: category.to_string(),
                        },
                    )
                    .await;
                let text = format!("¿Cuál es tu presupuesto mensual para *{category}*?");
                self.reply(chat, message, &text, None).await
            }
            FlowOrigin::Expense => {
                let Some(pending) = pending else {
                    warn!("Category chosen with no pending expense in chat {chat}");
                    self.sessions.clear(chat).await;
                    return self
                        .gateway
                        .send_message(chat, "❌ Hubo un error guardando el gasto.", None)
                        .await;
                };
                self.save_expense(chat, user_id, category, pending).await
            }
        }
    }

    async fn save_expense(
        &self,
        chat: ChatId,
        user_id: &str,
        category: &str,
        pending: PendingExpense,
    ) -> Result<()> {
        let now = Utc::now();
        self.db.ensure_user(user_id, now).await?;
        let id = self
            .db
            .add_expense(user_id, category, pending.amount, now)
            .await?;
        info!(
            "Expense saved: user={user_id} category={category} amount={} id={id}",
            pending.amount
        );

        self.gateway
            .send_message(
                chat,
                &format!(
                    "💾 Gasto registrado en la categoría *{category}* por *{}*",
                    Formatter::pesos(pending.amount)
                ),
                None,
            )
            .await?;

        // The budget check fans out over every budgeted category; bound it
        // so a slow store degrades instead of hanging the chat.
        let check = with_store_timeout(
            self.store_timeout,
            "verify_budget",
            self.check_budget(user_id, category, now),
        )
        .await;

        self.sessions.clear(chat).await;

        match check {
            Ok(BudgetCheck::NoBudget) => {
                let text = format!(
                    "🔎 Veo que *{category}* no tiene un presupuesto mensual definido.\n\
                     ¿Deseas establecer un límite?"
                );
                self.gateway
                    .send_message(chat, &text, Some(keyboards::budget_offer(category)))
                    .await
            }
            Ok(BudgetCheck::WithinLimit) => Ok(()),
            Ok(BudgetCheck::Exceeded {
                status,
                suggestions,
            }) => self.send_overspend_alert(chat, &status, &suggestions).await,
            Err(e) => {
                warn!("Budget verification failed for user {user_id}: {e}");
                self.gateway
                    .send_message(
                        chat,
                        "⚠️ No pude verificar tu presupuesto en este momento. Intenta más tarde.",
                        None,
                    )
                    .await
            }
        }
    }

    async fn check_budget(
        &self,
        user_id: &str,
        category: &str,
        now: DateTime<Utc>,
    ) -> Result<BudgetCheck> {
        match self.ledger.evaluate(user_id, category, now).await? {
            None => Ok(BudgetCheck::NoBudget),
            Some(status) if status.remaining >= 0 => Ok(BudgetCheck::WithinLimit),
            Some(status) => {
                let suggestions = self
                    .ledger
                    .suggest_reallocations(user_id, category, now)
                    .await?;
                Ok(BudgetCheck::Exceeded {
                    status,
                    suggestions,
                })
            }
        }
    }

    async fn send_overspend_alert(
        &self,
        chat: ChatId,
        status: &BudgetStatus,
        suggestions: &[BudgetStatus],
    ) -> Result<()> {
        let mut text = format!(
            "⚠️ *Atención:* Has superado tu presupuesto mensual para *{}*.\n\
             • Límite: {}\n• Gastado: {}\n• Exceso: {}\n\n",
            status.category,
            Formatter::pesos(status.limit),
            Formatter::pesos(status.spent),
            Formatter::pesos(status.spent - status.limit),
        );

        if suggestions.is_empty() {
            text.push_str("ℹ️ No hay otras categorías con presupuesto disponible actualmente.");
            return self.gateway.send_message(chat, &text, None).await;
        }

        text.push_str(
            "💡 *Sugerencia:* Podrías ajustar el presupuesto en alguna de estas categorías:\n\n",
        );
        for s in suggestions {
            text.push_str(&format!(
                "• {}:\n  - Límite: {}\n  - Gastado: {}\n  - Disponible: {}\n\n",
                Formatter::capitalize(&s.category),
                Formatter::pesos(s.limit),
                Formatter::pesos(s.spent),
                Formatter::pesos(s.remaining),
            ));
        }

        let categories: Vec<String> = suggestions.iter().map(|s| s.category.clone()).collect();
        self.gateway
            .send_message(
                chat,
                &text,
                Some(keyboards::overspend_adjustments(&categories)),
            )
            .await
    }

    async fn save_budget(
        &self,
        chat: ChatId,
        user_id: &str,
        origin: FlowOrigin,
        category: &str,
        limit: i64,
    ) -> Result<()> {
        self.ledger
            .set_limit(user_id, category, limit, Utc::now())
            .await?;

        self.gateway
            .send_message(
                chat,
                &format!(
                    "✅ Listo. Tu presupuesto para *{category}* es de {} al mes.",
                    Formatter::pesos(limit)
                ),
                None,
            )
            .await?;

        self.sessions
            .set(chat, ConversationState::AwaitingPostBudgetAction { origin })
            .await;
        self.gateway
            .send_message(
                chat,
                "¿Qué deseas hacer ahora?",
                Some(keyboards::post_budget_actions()),
            )
            .await
    }

    async fn respond_budget_query(
        &self,
        chat: ChatId,
        user_id: &str,
        category: &str,
        message: Option<MessageId>,
    ) -> Result<()> {
        self.sessions.clear(chat).await;

        match self.ledger.evaluate(user_id, category, Utc::now()).await? {
            None => {
                self.reply(
                    chat,
                    message,
                    "❌ Esa categoría no tiene presupuesto registrado.",
                    None,
                )
                .await
            }
            Some(status) => {
                let text = format!(
                    "📋 *Presupuesto para {category}:*\n\
                     • Límite mensual: {}\n• Gastado: {}\n• Disponible: {}",
                    Formatter::pesos(status.limit),
                    Formatter::pesos(status.spent),
                    Formatter::pesos(status.remaining),
                );
                self.reply(chat, message, &text, None).await
            }
        }
    }

    async fn confirm_delete(
        &self,
        chat: ChatId,
        user_id: &str,
        expense_id: i64,
        message: Option<MessageId>,
    ) -> Result<()> {
        self.sessions.clear(chat).await;

        if self.db.delete_expense(user_id, expense_id).await? {
            self.reply(chat, message, "✅ Gasto eliminado correctamente.", None)
                .await
        } else {
            // The captured id stopped resolving (already deleted elsewhere).
            self.reply(chat, message, "⚠️ No se encontró el gasto a eliminar.", None)
                .await
        }
    }

    async fn handle_menu_callback(&self, chat: ChatId, user_id: &str, action: &str) -> Result<()> {
        if action != "registrar_gasto" && !self.reconcile_active_flow(chat).await? {
            return Ok(());
        }

        match action {
            "registrar_gasto" => self.gateway.send_message(chat, EXPENSE_PROMPT, None).await,
            "presupuesto" => self.start_budget_flow(chat, user_id).await,
            "resumen" => self.commands.handle_resumen(chat, user_id).await,
            "comparar" => self.commands.handle_comparar(chat, user_id).await,
            "total" => self.commands.handle_total(chat, user_id).await,
            "ultimo" => self.commands.handle_ultimo(chat, user_id).await,
            "eliminar" => self.start_delete_flow(chat, user_id).await,
            "grafico" => self.commands.handle_grafico(chat, user_id).await,
            _ => {
                self.gateway
                    .send_message(chat, "❌ Opción no reconocida.", None)
                    .await
            }
        }
    }

    async fn cancel_flow(&self, chat: ChatId) -> Result<()> {
        if self.sessions.is_active(chat).await {
            self.sessions.clear(chat).await;
            self.gateway
                .send_message(chat, "❌ Cancelado. No se guardó ningún cambio.", None)
                .await
        } else {
            self.gateway
                .send_message(chat, "No hay ninguna operación activa.", None)
                .await
        }
    }

    // --- helpers ----------------------------------------------------------

    /// Apply the mid-flow command policy. Returns true when the caller may
    /// proceed with normal handling.
    async fn reconcile_active_flow(&self, chat: ChatId) -> Result<bool> {
        if !self.sessions.is_active(chat).await {
            return Ok(true);
        }

        if self.commands_cancel_flow {
            self.sessions.clear(chat).await;
            self.gateway
                .send_message(chat, "❌ Flujo anterior cancelado.", None)
                .await?;
            Ok(true)
        } else {
            self.gateway
                .send_message(
                    chat,
                    "✋ Tienes una operación en curso. Termínala o usa /cancelar.",
                    None,
                )
                .await?;
            Ok(false)
        }
    }

    /// Edit the originating message when possible, otherwise send a new
    /// one. Keyboards always go on a fresh message.
    async fn reply(
        &self,
        chat: ChatId,
        message: Option<MessageId>,
        text: &str,
        keyboard: Option<Keyboard>,
    ) -> Result<()> {
        match (message, &keyboard) {
            (Some(id), None) => self.gateway.edit_message(chat, id, text).await,
            _ => self.gateway.send_message(chat, text, keyboard).await,
        }
    }

    fn label_command(text: &str) -> Option<Command> {
        match text {
            "📋 Menú" => Some(Command::Menu),
            "💼 Presupuesto" => Some(Command::Presupuesto),
            "📊 Resumen" => Some(Command::Resumen),
            "📈 Comparar" => Some(Command::Comparar),
            "💰 Total" => Some(Command::Total),
            "📌 Último" => Some(Command::Ultimo),
            "🗑️ Eliminar" => Some(Command::Eliminar),
            "📉 Gráfico" => Some(Command::Grafico),
            _ => None,
        }
    }
}

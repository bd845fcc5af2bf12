use crate::bot::gateway::Gateway;
use crate::bot::keyboards;
use crate::database::DatabaseOperations;
use crate::error::Result;
use crate::ledger::{month_bounds, month_start};
use crate::utils::Formatter;
use chrono::Utc;
use chrono_tz::Tz;
use log::debug;
use std::sync::Arc;
use teloxide::types::ChatId;
use teloxide::utils::command::BotCommands;

#[derive(BotCommands, Clone, Copy, Debug, PartialEq, Eq)]
#[command(rename_rule = "snake_case", description = "Comandos disponibles:")]
pub enum Command {
    #[command(description = "inicia el bot y muestra el menú")]
    Start,
    #[command(description = "muestra el menú principal")]
    Menu,
    #[command(description = "establece un límite mensual por categoría")]
    Presupuesto,
    #[command(description = "consulta el presupuesto de una categoría")]
    Consultar,
    #[command(description = "resumen de gastos por categoría")]
    Resumen,
    #[command(description = "total gastado")]
    Total,
    #[command(description = "último gasto registrado")]
    Ultimo,
    #[command(description = "elimina el último gasto")]
    Eliminar,
    #[command(description = "distribución de gastos")]
    Grafico,
    #[command(description = "compara este mes con el anterior")]
    Comparar,
    #[command(description = "comparación detallada por categoría")]
    CompararDetalle,
    #[command(description = "cancela la operación en curso")]
    Cancelar,
}

const MENU_TEXT: &str = "📋 *Menú principal*\n\n\
    Toca uno de los botones para usar el bot:\n\n\
    📝 Registrar gasto — Registra un nuevo gasto (ej. 5000 comida)\n\
    💼 Presupuesto — Establece un límite mensual por categoría\n\
    📊 Resumen — Muestra lo que has gastado por categoría\n\
    📈 Comparar — Compara tu gasto con el mes anterior\n\
    💰 Total — Muestra cuánto llevas gastado este mes\n\
    📌 Último — Te dice cuál fue tu último gasto\n\
    🗑️ Eliminar — Elimina el último gasto que registraste\n\
    📉 Gráfico — Muestra la distribución de tus gastos";

/// Read-only commands: they consult the store and reply, never touching
/// conversation state.
#[derive(Clone)]
pub struct Commands {
    db: DatabaseOperations,
    gateway: Arc<dyn Gateway>,
    tz: Tz,
}

impl Commands {
    pub fn new(db: DatabaseOperations, gateway: Arc<dyn Gateway>, tz: Tz) -> Self {
        Self { db, gateway, tz }
    }

    pub async fn send_menu(&self, chat: ChatId) -> Result<()> {
        self.gateway
            .send_message(chat, MENU_TEXT, Some(keyboards::main_menu()))
            .await
    }

    /// `/start`: create the user lazily (start_date set once) and show the
    /// menu.
    pub async fn handle_start(&self, chat: ChatId, user_id: &str) -> Result<()> {
        self.db.ensure_user(user_id, Utc::now()).await?;
        debug!("User {user_id} started the bot");
        self.send_menu(chat).await
    }

    /// `/resumen`: all-time totals per category.
    pub async fn handle_resumen(&self, chat: ChatId, user_id: &str) -> Result<()> {
        let totals = self.db.totals_by_category(user_id, None, None).await?;
        if totals.is_empty() {
            return self
                .gateway
                .send_message(chat, "📭 No tienes gastos registrados.", None)
                .await;
        }

        let mut categories: Vec<_> = totals.keys().cloned().collect();
        categories.sort();

        let mut message = "🧾 *Resumen de gastos:*\n\n".to_string();
        for category in categories {
            message.push_str(&format!(
                "• {category}: {}\n",
                Formatter::pesos(totals[&category])
            ));
        }
        self.gateway.send_message(chat, &message, None).await
    }

    /// `/total`: all-time grand total.
    pub async fn handle_total(&self, chat: ChatId, user_id: &str) -> Result<()> {
        let totals = self.db.totals_by_category(user_id, None, None).await?;
        let grand_total: i64 = totals.values().sum();
        self.gateway
            .send_message(
                chat,
                &format!("💰 Total gastado: {}", Formatter::pesos(grand_total)),
                None,
            )
            .await
    }

    /// `/ultimo`: most recent expense.
    pub async fn handle_ultimo(&self, chat: ChatId, user_id: &str) -> Result<()> {
        match self.db.latest_expense(user_id).await? {
            Some(expense) => {
                let message = format!(
                    "📌 Último gasto:\n{} en {} el {}",
                    Formatter::pesos(expense.amount),
                    expense.category,
                    Formatter::datetime(expense.created_at, self.tz),
                );
                self.gateway.send_message(chat, &message, None).await
            }
            None => {
                self.gateway
                    .send_message(chat, "📭 Aún no has registrado gastos.", None)
                    .await
            }
        }
    }

    /// `/comparar`: grand totals, current month to date vs prior full
    /// month.
    pub async fn handle_comparar(&self, chat: ChatId, user_id: &str) -> Result<()> {
        let now = Utc::now();
        let current_start = month_start(self.tz, now);
        let (prev_start, prev_end) = month_bounds(self.tz, now, 1);

        let current: i64 = self
            .db
            .totals_by_category(user_id, Some(current_start), None)
            .await?
            .values()
            .sum();
        let previous: i64 = self
            .db
            .totals_by_category(user_id, Some(prev_start), Some(prev_end))
            .await?
            .values()
            .sum();

        let message = format!(
            "📊 Gasto mensual:\nEste mes: {}\nMes anterior: {}\nVariación: {}",
            Formatter::pesos(current),
            Formatter::pesos(previous),
            Formatter::percent_variation(previous, current),
        );
        self.gateway.send_message(chat, &message, None).await
    }

    /// `/comparar_detalle`: the same comparison broken down per category.
    pub async fn handle_comparar_detalle(&self, chat: ChatId, user_id: &str) -> Result<()> {
        let now = Utc::now();
        let current_start = month_start(self.tz, now);
        let (prev_start, prev_end) = month_bounds(self.tz, now, 1);

        let current = self
            .db
            .totals_by_category(user_id, Some(current_start), None)
            .await?;
        let previous = self
            .db
            .totals_by_category(user_id, Some(prev_start), Some(prev_end))
            .await?;

        let mut categories: Vec<String> =
            current.keys().chain(previous.keys()).cloned().collect();
        categories.sort();
        categories.dedup();

        if categories.is_empty() {
            return self
                .gateway
                .send_message(chat, "📭 No tienes gastos registrados.", None)
                .await;
        }

        let mut message = "📈 *Comparativa mensual por categoría:*\n\n".to_string();
        for category in categories {
            let cur = current.get(&category).copied().unwrap_or(0);
            let prev = previous.get(&category).copied().unwrap_or(0);
            message.push_str(&format!(
                "• {category}: {} → {} ({})\n",
                Formatter::pesos(prev),
                Formatter::pesos(cur),
                Formatter::percent_variation(prev, cur),
            ));
        }
        self.gateway.send_message(chat, &message, None).await
    }

    /// `/grafico`: textual distribution per category with percentages.
    /// Chart rendering itself lives outside the bot.
    pub async fn handle_grafico(&self, chat: ChatId, user_id: &str) -> Result<()> {
        let totals = self.db.totals_by_category(user_id, None, None).await?;
        let grand_total: i64 = totals.values().sum();
        if grand_total == 0 {
            return self
                .gateway
                .send_message(
                    chat,
                    "📭 No tienes datos suficientes para generar el gráfico.",
                    None,
                )
                .await;
        }

        let mut categories: Vec<_> = totals.keys().cloned().collect();
        categories.sort();

        let mut message = "📉 *Distribución de gastos por categoría:*\n\n".to_string();
        for category in categories {
            let amount = totals[&category];
            let share = amount as f64 / grand_total as f64 * 100.0;
            message.push_str(&format!(
                "• {category}: {} ({share:.1}%)\n",
                Formatter::pesos(amount)
            ));
        }
        self.gateway.send_message(chat, &message, None).await
    }

    pub async fn handle_unknown(&self, chat: ChatId) -> Result<()> {
        self.gateway
            .send_message(
                chat,
                "❌ Comando no reconocido. Usa los botones o escribe /menu para ver opciones.",
                None,
            )
            .await?;
        self.send_menu(chat).await
    }
}

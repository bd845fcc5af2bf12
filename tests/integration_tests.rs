mod common;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use chrono_tz::Tz;
use tempfile::NamedTempFile;

use gastobot::bot::{Command, ConversationEngine};
use gastobot::database::DatabaseOperations;

use common::MockGateway;
use teloxide::types::ChatId;

const CHAT: ChatId = ChatId(12345);
const USER: &str = "12345";

fn bogota() -> Tz {
    "America/Bogota".parse().unwrap()
}

async fn setup() -> (ConversationEngine, Arc<MockGateway>, DatabaseOperations, NamedTempFile) {
    setup_with_policy(true).await
}

async fn setup_with_policy(
    commands_cancel_flow: bool,
) -> (ConversationEngine, Arc<MockGateway>, DatabaseOperations, NamedTempFile) {
    let tmp = NamedTempFile::new().unwrap();
    let db = DatabaseOperations::new(tmp.path().to_str().unwrap())
        .await
        .unwrap();
    let gateway = Arc::new(MockGateway::new());
    let engine = ConversationEngine::new(
        db.clone(),
        gateway.clone(),
        bogota(),
        Duration::from_secs(5),
        commands_cancel_flow,
    );
    (engine, gateway, db, tmp)
}

#[tokio::test]
async fn expense_entry_offers_category_keyboard() {
    let (engine, gateway, _db, _tmp) = setup().await;

    engine.handle_text(CHAT, USER, "5000 cafe").await.unwrap();

    assert_eq!(gateway.last_text().await, "Selecciona la categoría del gasto:");
    let tokens = gateway.last_keyboard_tokens().await;
    assert!(tokens.contains(&"cat:comida".to_string()));
    assert!(tokens.contains(&"cat:transporte".to_string()));
    assert!(tokens.contains(&"catref:personalizada".to_string()));
}

#[tokio::test]
async fn expense_saved_after_category_choice() {
    let (engine, gateway, db, _tmp) = setup().await;

    engine.handle_text(CHAT, USER, "5000 cafe").await.unwrap();
    gateway.clear_all().await;

    engine
        .handle_callback(CHAT, USER, "cb1", None, "cat:comida")
        .await
        .unwrap();

    let sent = gateway.get_sent_messages().await;
    assert!(sent[0].text.contains("Gasto registrado en la categoría *comida*"));
    assert!(sent[0].text.contains("$5.000"));

    let latest = db.latest_expense(USER).await.unwrap().unwrap();
    assert_eq!(latest.category, "comida");
    assert_eq!(latest.amount, 5000);

    // No budget for comida yet, so a limit offer follows.
    let last = sent.last().unwrap();
    assert!(last.text.contains("no tiene un presupuesto mensual definido"));
    let tokens = gateway.last_keyboard_tokens().await;
    assert!(tokens.contains(&"establecer_presupuesto:comida".to_string()));
    assert!(tokens.contains(&"ignorar_presupuesto".to_string()));

    // The flow slot is free again.
    assert!(!engine.sessions().is_active(CHAT).await);
}

#[tokio::test]
async fn all_parser_forms_start_the_same_flow() {
    for input in ["comida 8000", "comida: 8.000", "comida8000"] {
        let (engine, gateway, _db, _tmp) = setup().await;
        engine.handle_text(CHAT, USER, input).await.unwrap();
        assert_eq!(
            gateway.last_text().await,
            "Selecciona la categoría del gasto:",
            "input {input:?} should parse"
        );
    }
}

#[tokio::test]
async fn unparseable_text_gets_format_help() {
    let (engine, gateway, _db, _tmp) = setup().await;

    engine.handle_text(CHAT, USER, "hola que tal").await.unwrap();

    assert!(gateway.last_text().await.contains("No entendí el formato"));
    assert!(!engine.sessions().is_active(CHAT).await);
}

#[tokio::test]
async fn overspend_triggers_alert_with_suggestions() {
    let (engine, gateway, db, _tmp) = setup().await;
    let now = Utc::now();
    db.ensure_user(USER, now).await.unwrap();
    db.set_budget(USER, "comida", 10_000, now).await.unwrap();
    db.set_budget(USER, "ocio", 50_000, now).await.unwrap();
    db.add_expense(USER, "comida", 8_000, now).await.unwrap();

    engine.handle_text(CHAT, USER, "5000 almuerzo").await.unwrap();
    gateway.clear_all().await;
    engine
        .handle_callback(CHAT, USER, "cb1", None, "cat:comida")
        .await
        .unwrap();

    let alert = gateway.last_text().await;
    assert!(alert.contains("Has superado tu presupuesto mensual para *comida*"));
    assert!(alert.contains("Exceso: $3.000"));
    assert!(alert.contains("Ocio"));
    assert!(alert.contains("Disponible: $50.000"));

    let tokens = gateway.last_keyboard_tokens().await;
    assert!(tokens.contains(&"establecer_presupuesto:ocio".to_string()));
}

#[tokio::test]
async fn overspend_without_headroom_has_no_suggestions() {
    let (engine, gateway, db, _tmp) = setup().await;
    let now = Utc::now();
    db.ensure_user(USER, now).await.unwrap();
    db.set_budget(USER, "comida", 1_000, now).await.unwrap();

    engine.handle_text(CHAT, USER, "5000 mercado").await.unwrap();
    gateway.clear_all().await;
    engine
        .handle_callback(CHAT, USER, "cb1", None, "cat:comida")
        .await
        .unwrap();

    let alert = gateway.last_text().await;
    assert!(alert.contains("No hay otras categorías con presupuesto disponible"));
}

#[tokio::test]
async fn budget_flow_saves_new_limit() {
    let (engine, gateway, db, _tmp) = setup().await;
    db.ensure_user(USER, Utc::now()).await.unwrap();

    engine
        .handle_command(CHAT, USER, Command::Presupuesto)
        .await
        .unwrap();
    assert!(gateway
        .last_text()
        .await
        .contains("¿Para qué categoría deseas establecer un presupuesto"));

    engine
        .handle_callback(CHAT, USER, "cb1", None, "cat:transporte")
        .await
        .unwrap();
    assert!(gateway.last_text().await.contains("presupuesto mensual para *transporte*"));

    gateway.clear_all().await;
    engine.handle_text(CHAT, USER, "120.000").await.unwrap();

    let sent = gateway.get_sent_messages().await;
    assert!(sent[0].text.contains("Tu presupuesto para *transporte* es de $120.000"));
    assert_eq!(db.get_budget(USER, "transporte").await.unwrap(), Some(120_000));

    // Post-save menu of follow-up actions.
    let tokens = gateway.last_keyboard_tokens().await;
    assert!(tokens.contains(&"otro_presupuesto".to_string()));
    assert!(tokens.contains(&"registrar_gasto".to_string()));
    assert!(tokens.contains(&"salir".to_string()));
}

#[tokio::test]
async fn replacing_a_budget_requires_confirmation() {
    let (engine, gateway, db, _tmp) = setup().await;
    let now = Utc::now();
    db.ensure_user(USER, now).await.unwrap();
    db.set_budget(USER, "comida", 100_000, now).await.unwrap();

    engine
        .handle_command(CHAT, USER, Command::Presupuesto)
        .await
        .unwrap();
    engine
        .handle_callback(CHAT, USER, "cb1", None, "cat:comida")
        .await
        .unwrap();
    gateway.clear_all().await;
    engine.handle_text(CHAT, USER, "200000").await.unwrap();

    let prompt = gateway.last_text().await;
    assert!(prompt.contains("Ya tienes un presupuesto para *comida* de $100.000"));
    assert!(prompt.contains("$200.000"));
    // Not yet replaced.
    assert_eq!(db.get_budget(USER, "comida").await.unwrap(), Some(100_000));

    engine
        .handle_callback(CHAT, USER, "cb2", None, "confirmar_reemplazo")
        .await
        .unwrap();
    assert_eq!(db.get_budget(USER, "comida").await.unwrap(), Some(200_000));
}

#[tokio::test]
async fn cancelling_replacement_keeps_old_limit() {
    let (engine, gateway, db, _tmp) = setup().await;
    let now = Utc::now();
    db.ensure_user(USER, now).await.unwrap();
    db.set_budget(USER, "comida", 100_000, now).await.unwrap();

    engine
        .handle_command(CHAT, USER, Command::Presupuesto)
        .await
        .unwrap();
    engine
        .handle_callback(CHAT, USER, "cb1", None, "cat:comida")
        .await
        .unwrap();
    engine.handle_text(CHAT, USER, "200000").await.unwrap();
    engine
        .handle_callback(CHAT, USER, "cb2", None, "cancelar_reemplazo")
        .await
        .unwrap();

    assert!(gateway.last_text().await.contains("El presupuesto anterior se mantuvo"));
    assert_eq!(db.get_budget(USER, "comida").await.unwrap(), Some(100_000));
    assert!(!engine.sessions().is_active(CHAT).await);
}

#[tokio::test]
async fn invalid_limit_reprompts_and_keeps_state() {
    let (engine, gateway, db, _tmp) = setup().await;
    db.ensure_user(USER, Utc::now()).await.unwrap();

    engine
        .handle_command(CHAT, USER, Command::Presupuesto)
        .await
        .unwrap();
    engine
        .handle_callback(CHAT, USER, "cb1", None, "cat:ocio")
        .await
        .unwrap();
    gateway.clear_all().await;

    engine.handle_text(CHAT, USER, "muchos pesos").await.unwrap();
    assert!(gateway.last_text().await.contains("El valor debe ser numérico"));
    let tokens = gateway.last_keyboard_tokens().await;
    assert!(tokens.contains(&"reintentar_limite".to_string()));

    // Zero is rejected too.
    engine.handle_text(CHAT, USER, "0").await.unwrap();
    assert!(gateway.last_text().await.contains("El valor debe ser numérico"));

    // A valid number still completes the flow.
    engine.handle_text(CHAT, USER, "30000").await.unwrap();
    assert_eq!(db.get_budget(USER, "ocio").await.unwrap(), Some(30_000));
}

#[tokio::test]
async fn custom_category_name_is_validated_and_lowercased() {
    let (engine, gateway, db, _tmp) = setup().await;

    engine.handle_text(CHAT, USER, "9000 regalo").await.unwrap();
    engine
        .handle_callback(CHAT, USER, "cb1", None, "catref:personalizada")
        .await
        .unwrap();

    engine.handle_text(CHAT, USER, "Mascotas").await.unwrap();

    let latest = db.latest_expense(USER).await.unwrap().unwrap();
    assert_eq!(latest.category, "mascotas");
    assert_eq!(latest.amount, 9000);
    assert!(db
        .list_categories(USER)
        .await
        .unwrap()
        .contains(&"mascotas".to_string()));

    // The new name shows up on the next category keyboard.
    engine.handle_text(CHAT, USER, "2000 comida perro").await.unwrap();
    let tokens = gateway.last_keyboard_tokens().await;
    assert!(tokens.contains(&"cat:mascotas".to_string()));
}

#[tokio::test]
async fn delete_flow_confirms_then_removes() {
    let (engine, gateway, db, _tmp) = setup().await;
    let now = Utc::now();
    db.ensure_user(USER, now).await.unwrap();
    db.add_expense(USER, "comida", 7_000, now).await.unwrap();

    engine
        .handle_command(CHAT, USER, Command::Eliminar)
        .await
        .unwrap();
    let prompt = gateway.last_text().await;
    assert!(prompt.contains("¿Deseas eliminar el último gasto?"));
    assert!(prompt.contains("$7.000"));
    assert!(prompt.contains("comida"));

    engine
        .handle_callback(CHAT, USER, "cb1", None, "confirmar_eliminar")
        .await
        .unwrap();
    assert!(gateway.last_text().await.contains("Gasto eliminado correctamente"));
    assert!(db.latest_expense(USER).await.unwrap().is_none());
}

#[tokio::test]
async fn delete_with_no_expenses_is_empty_state() {
    let (engine, gateway, _db, _tmp) = setup().await;

    engine
        .handle_command(CHAT, USER, Command::Eliminar)
        .await
        .unwrap();

    assert!(gateway.last_text().await.contains("No hay gastos para eliminar"));
    assert!(!engine.sessions().is_active(CHAT).await);
}

#[tokio::test]
async fn deleting_already_gone_expense_reports_miss() {
    let (engine, gateway, db, _tmp) = setup().await;
    let now = Utc::now();
    db.ensure_user(USER, now).await.unwrap();
    let id = db.add_expense(USER, "comida", 7_000, now).await.unwrap();

    engine
        .handle_command(CHAT, USER, Command::Eliminar)
        .await
        .unwrap();
    // The record disappears before the user confirms.
    db.delete_expense(USER, id).await.unwrap();

    engine
        .handle_callback(CHAT, USER, "cb1", None, "confirmar_eliminar")
        .await
        .unwrap();
    assert!(gateway.last_text().await.contains("No se encontró el gasto a eliminar"));
    assert!(!engine.sessions().is_active(CHAT).await);
}

#[tokio::test]
async fn budget_query_reports_standing() {
    let (engine, gateway, db, _tmp) = setup().await;
    let now = Utc::now();
    db.ensure_user(USER, now).await.unwrap();
    db.set_budget(USER, "comida", 100_000, now).await.unwrap();
    db.add_expense(USER, "comida", 25_000, now).await.unwrap();

    engine
        .handle_command(CHAT, USER, Command::Consultar)
        .await
        .unwrap();
    let tokens = gateway.last_keyboard_tokens().await;
    assert!(tokens.contains(&"consulta_categoria:comida".to_string()));

    engine
        .handle_callback(CHAT, USER, "cb1", None, "consulta_categoria:comida")
        .await
        .unwrap();
    let text = gateway.last_text().await;
    assert!(text.contains("Límite mensual: $100.000"));
    assert!(text.contains("Gastado: $25.000"));
    assert!(text.contains("Disponible: $75.000"));
}

#[tokio::test]
async fn budget_query_without_budgets_is_empty_state() {
    let (engine, gateway, _db, _tmp) = setup().await;

    engine
        .handle_command(CHAT, USER, Command::Consultar)
        .await
        .unwrap();

    assert!(gateway
        .last_text()
        .await
        .contains("Aún no tienes categorías con presupuesto registrado"));
}

#[tokio::test]
async fn command_mid_flow_cancels_by_default() {
    let (engine, gateway, _db, _tmp) = setup().await;

    engine
        .handle_command(CHAT, USER, Command::Presupuesto)
        .await
        .unwrap();
    assert!(engine.sessions().is_active(CHAT).await);
    gateway.clear_all().await;

    engine
        .handle_command(CHAT, USER, Command::Total)
        .await
        .unwrap();

    let sent = gateway.get_sent_messages().await;
    assert!(sent[0].text.contains("Flujo anterior cancelado"));
    assert!(!engine.sessions().is_active(CHAT).await);
}

#[tokio::test]
async fn command_mid_flow_is_rejected_when_policy_disabled() {
    let (engine, gateway, _db, _tmp) = setup_with_policy(false).await;

    engine
        .handle_command(CHAT, USER, Command::Presupuesto)
        .await
        .unwrap();
    gateway.clear_all().await;

    engine
        .handle_command(CHAT, USER, Command::Total)
        .await
        .unwrap();

    assert!(gateway.last_text().await.contains("Tienes una operación en curso"));
    assert!(engine.sessions().is_active(CHAT).await);
}

#[tokio::test]
async fn cancel_command_always_clears_the_flow() {
    let (engine, gateway, _db, _tmp) = setup_with_policy(false).await;

    engine
        .handle_command(CHAT, USER, Command::Presupuesto)
        .await
        .unwrap();
    engine
        .handle_command(CHAT, USER, Command::Cancelar)
        .await
        .unwrap();

    assert!(gateway.last_text().await.contains("Cancelado"));
    assert!(!engine.sessions().is_active(CHAT).await);

    engine
        .handle_command(CHAT, USER, Command::Cancelar)
        .await
        .unwrap();
    assert!(gateway.last_text().await.contains("No hay ninguna operación activa"));
}

#[tokio::test]
async fn plain_text_in_button_state_gets_a_hint() {
    let (engine, gateway, _db, _tmp) = setup().await;

    engine.handle_text(CHAT, USER, "5000 cafe").await.unwrap();
    gateway.clear_all().await;

    engine.handle_text(CHAT, USER, "comida").await.unwrap();

    assert!(gateway.last_text().await.contains("uses los botones"));
    assert!(engine.sessions().is_active(CHAT).await);
}

#[tokio::test]
async fn stale_category_button_is_rejected() {
    let (engine, gateway, _db, _tmp) = setup().await;

    engine
        .handle_callback(CHAT, USER, "cb1", None, "cat:comida")
        .await
        .unwrap();

    assert!(gateway.last_text().await.contains("Esa opción ya no está activa"));
}

#[tokio::test]
async fn skip_budget_offer_clears_state() {
    let (engine, gateway, _db, _tmp) = setup().await;

    engine.handle_text(CHAT, USER, "5000 cafe").await.unwrap();
    engine
        .handle_callback(CHAT, USER, "cb1", None, "cat:comida")
        .await
        .unwrap();
    engine
        .handle_callback(CHAT, USER, "cb2", None, "ignorar_presupuesto")
        .await
        .unwrap();

    assert!(gateway.last_text().await.contains("Puedes establecer un presupuesto"));
    assert!(!engine.sessions().is_active(CHAT).await);
}

#[tokio::test]
async fn budget_offer_button_works_after_flow_ended() {
    let (engine, gateway, db, _tmp) = setup().await;

    engine.handle_text(CHAT, USER, "5000 cafe").await.unwrap();
    engine
        .handle_callback(CHAT, USER, "cb1", None, "cat:comida")
        .await
        .unwrap();
    assert!(!engine.sessions().is_active(CHAT).await);

    // Pressing the offer later still opens the limit question.
    engine
        .handle_callback(CHAT, USER, "cb2", None, "establecer_presupuesto:comida")
        .await
        .unwrap();
    assert!(gateway.last_text().await.contains("límite mensual"));

    engine.handle_text(CHAT, USER, "40000").await.unwrap();
    assert_eq!(db.get_budget(USER, "comida").await.unwrap(), Some(40_000));
}

#[tokio::test]
async fn resumen_lists_all_time_totals() {
    let (engine, gateway, db, _tmp) = setup().await;
    let now = Utc::now();
    db.ensure_user(USER, now).await.unwrap();
    db.add_expense(USER, "comida", 10_000, now).await.unwrap();
    db.add_expense(USER, "comida", 5_000, now).await.unwrap();
    db.add_expense(USER, "ocio", 20_000, now).await.unwrap();

    engine
        .handle_command(CHAT, USER, Command::Resumen)
        .await
        .unwrap();

    let text = gateway.last_text().await;
    assert!(text.contains("$15.000"));
    assert!(text.contains("$20.000"));
}

#[tokio::test]
async fn resumen_without_expenses_is_empty_state() {
    let (engine, gateway, _db, _tmp) = setup().await;

    engine
        .handle_command(CHAT, USER, Command::Resumen)
        .await
        .unwrap();

    assert!(gateway.last_text().await.contains("No tienes gastos registrados"));
}

#[tokio::test]
async fn callback_queries_are_always_answered() {
    let (engine, gateway, _db, _tmp) = setup().await;

    engine
        .handle_callback(CHAT, USER, "cb-42", None, "token_desconocido")
        .await
        .unwrap();

    let answered = gateway.answered_callbacks.lock().await.clone();
    assert_eq!(answered, vec!["cb-42".to_string()]);
    assert!(gateway.last_text().await.contains("Opción no reconocida"));
}

use crate::bot::gateway::{Button, Keyboard};
use crate::database::BUILTIN_CATEGORIES;
use crate::utils::Formatter;

// Opaque callback tokens. Prefixed tokens carry a category name after the
// colon.
pub const CB_CATEGORY_PREFIX: &str = "cat:";
pub const CB_CUSTOM_CATEGORY: &str = "catref:personalizada";
pub const CB_CANCEL_BUDGET: &str = "cancelar_presupuesto";
pub const CB_RETRY_LIMIT: &str = "reintentar_limite";
pub const CB_CONFIRM_REPLACE: &str = "confirmar_reemplazo";
pub const CB_CANCEL_REPLACE: &str = "cancelar_reemplazo";
pub const CB_ANOTHER_BUDGET: &str = "otro_presupuesto";
pub const CB_RECORD_EXPENSE: &str = "registrar_gasto";
pub const CB_EXIT: &str = "salir";
pub const CB_QUERY_PREFIX: &str = "consulta_categoria:";
pub const CB_SET_BUDGET_PREFIX: &str = "establecer_presupuesto:";
pub const CB_SKIP_BUDGET: &str = "ignorar_presupuesto";
pub const CB_CONFIRM_DELETE: &str = "confirmar_eliminar";
pub const CB_CANCEL_DELETE: &str = "cancelar_eliminar";
pub const CB_MENU_PREFIX: &str = "menu:";

/// Built-ins first, then the user's custom categories (deduplicated), then
/// "otra categoría" and optionally a cancel row.
pub fn category_selection(custom: &[String], with_cancel: bool) -> Keyboard {
    let mut keyboard = Keyboard::new();

    for name in BUILTIN_CATEGORIES {
        keyboard = keyboard.row(vec![Button::new(
            Formatter::capitalize(name),
            format!("{CB_CATEGORY_PREFIX}{name}"),
        )]);
    }

    for name in custom {
        if BUILTIN_CATEGORIES.contains(&name.as_str()) {
            continue;
        }
        keyboard = keyboard.row(vec![Button::new(
            Formatter::capitalize(name),
            format!("{CB_CATEGORY_PREFIX}{name}"),
        )]);
    }

    keyboard = keyboard.row(vec![Button::new("➕ Otra categoría", CB_CUSTOM_CATEGORY)]);
    if with_cancel {
        keyboard = keyboard.row(vec![Button::new("❌ Cancelar", CB_CANCEL_BUDGET)]);
    }
    keyboard
}

pub fn limit_retry() -> Keyboard {
    Keyboard::new().row(vec![
        Button::new("🔁 Intentar de nuevo", CB_RETRY_LIMIT),
        Button::new("❌ Cancelar", CB_CANCEL_BUDGET),
    ])
}

pub fn overwrite_confirmation() -> Keyboard {
    Keyboard::new()
        .row(vec![Button::new("✅ Sí, reemplazar", CB_CONFIRM_REPLACE)])
        .row(vec![Button::new("❌ Cancelar", CB_CANCEL_REPLACE)])
}

pub fn post_budget_actions() -> Keyboard {
    Keyboard::new()
        .row(vec![Button::new(
            "➕ Registrar otro presupuesto",
            CB_ANOTHER_BUDGET,
        )])
        .row(vec![Button::new("📝 Registrar un gasto", CB_RECORD_EXPENSE)])
        .row(vec![Button::new("🚪 Salir", CB_EXIT)])
}

/// Offer to set a limit right after an expense lands in a category without
/// one.
pub fn budget_offer(category: &str) -> Keyboard {
    Keyboard::new()
        .row(vec![Button::new(
            "✅ Sí, establecer límite",
            format!("{CB_SET_BUDGET_PREFIX}{category}"),
        )])
        .row(vec![Button::new("❌ No, gracias", CB_SKIP_BUDGET)])
}

/// "Ajustar <cat>" buttons for each reallocation suggestion.
pub fn overspend_adjustments(categories: &[String]) -> Keyboard {
    let mut keyboard = Keyboard::new();
    for name in categories {
        keyboard = keyboard.row(vec![Button::new(
            format!("✏️ Ajustar {}", Formatter::capitalize(name)),
            format!("{CB_SET_BUDGET_PREFIX}{name}"),
        )]);
    }
    keyboard
}

pub fn query_categories(categories: &[String]) -> Keyboard {
    let mut keyboard = Keyboard::new();
    for name in categories {
        keyboard = keyboard.row(vec![Button::new(
            name.clone(),
            format!("{CB_QUERY_PREFIX}{name}"),
        )]);
    }
    keyboard
}

pub fn delete_confirmation() -> Keyboard {
    Keyboard::new()
        .row(vec![Button::new("✅ Sí", CB_CONFIRM_DELETE)])
        .row(vec![Button::new("❌ No", CB_CANCEL_DELETE)])
}

pub fn main_menu() -> Keyboard {
    Keyboard::new()
        .row(vec![Button::new(
            "📝 Registrar gasto",
            format!("{CB_MENU_PREFIX}registrar_gasto"),
        )])
        .row(vec![Button::new(
            "💼 Presupuesto",
            format!("{CB_MENU_PREFIX}presupuesto"),
        )])
        .row(vec![Button::new("📊 Resumen", format!("{CB_MENU_PREFIX}resumen"))])
        .row(vec![Button::new(
            "📈 Comparar",
            format!("{CB_MENU_PREFIX}comparar"),
        )])
        .row(vec![Button::new("💰 Total", format!("{CB_MENU_PREFIX}total"))])
        .row(vec![Button::new("📌 Último", format!("{CB_MENU_PREFIX}ultimo"))])
        .row(vec![Button::new(
            "🗑️ Eliminar",
            format!("{CB_MENU_PREFIX}eliminar"),
        )])
        .row(vec![Button::new(
            "📉 Gráfico",
            format!("{CB_MENU_PREFIX}grafico"),
        )])
}

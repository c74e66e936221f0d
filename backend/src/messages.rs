//! User-facing texts of the search dialogue.

use crate::models::{Choice, OutboundMessage, Route, SurfaceProduct};

pub const CITY_PREFIX: &str = "city:";
pub const SURFACE_PREFIX: &str = "surface:";

pub fn welcome() -> OutboundMessage {
    OutboundMessage::text(
        "Привет! Я помогу найти место для бега в незнакомом городе.\n\n\
         Быстро подберу маршрут под дистанцию и тип поверхности \
         (парк, набережная, трейл, асфальт).\n\n\
         Используйте /find чтобы начать поиск.",
    )
}

pub fn help() -> OutboundMessage {
    OutboundMessage::text(
        "Команды:\n\n\
         /start — Начать работу\n\
         /find — Найти маршрут для бега (город, дистанция, тип поверхности)\n\
         /cancel — Отменить текущий поиск\n\
         /help — Показать это сообщение",
    )
}

pub fn unknown_command(name: &str) -> OutboundMessage {
    OutboundMessage::text(format!("Неизвестная команда /{name}. Список команд: /help"))
}

pub fn choose_city(cities: &[String]) -> OutboundMessage {
    let choices = cities
        .iter()
        .map(|city| Choice {
            label: city.clone(),
            data: format!("{CITY_PREFIX}{city}"),
        })
        .collect();
    OutboundMessage::with_choices("Выберите город:", choices)
}

pub fn ask_distance(city: &str) -> OutboundMessage {
    OutboundMessage::text(format!(
        "Город: {city}\n\nУкажите желаемую дистанцию в км (например: 10):"
    ))
}

pub fn distance_not_a_number() -> OutboundMessage {
    OutboundMessage::text(
        "Пожалуйста, введите число — дистанцию в километрах (например: 10 или 5.5):",
    )
}

pub fn distance_out_of_range() -> OutboundMessage {
    OutboundMessage::text("Дистанция должна быть от 1 до 50 км:")
}

pub fn surface_choices() -> Vec<Choice> {
    SurfaceProduct::ALL
        .into_iter()
        .map(|product| Choice {
            label: product.label().to_string(),
            data: format!("{SURFACE_PREFIX}{}", product.id()),
        })
        .collect()
}

pub fn choose_surface(distance_km: f64) -> OutboundMessage {
    OutboundMessage::with_choices(
        format!("Дистанция: {} км\n\nВыберите тип поверхности:", format_km(distance_km)),
        surface_choices(),
    )
}

pub fn repeat_surface() -> OutboundMessage {
    OutboundMessage::with_choices("Выберите тип поверхности из списка:", surface_choices())
}

pub fn cancelled() -> OutboundMessage {
    OutboundMessage::text("Поиск отменён. Используйте /find когда будете готовы.")
}

pub fn session_expired() -> OutboundMessage {
    OutboundMessage::text("Сессия поиска истекла. Используйте /find для нового поиска.")
}

pub fn no_active_search() -> OutboundMessage {
    OutboundMessage::text("Сейчас нет активного поиска. Используйте /find чтобы начать.")
}

pub fn routes_found(routes: &[Route]) -> OutboundMessage {
    if routes.is_empty() {
        return OutboundMessage::text(
            "Маршруты не найдены. Попробуйте изменить параметры: \
             другой город, дистанцию или тип поверхности.\n\n\
             Используйте /find для нового поиска.",
        );
    }

    let items: Vec<String> = routes
        .iter()
        .enumerate()
        .map(|(i, route)| format_route(route, i + 1))
        .collect();
    OutboundMessage::text(format!(
        "Нашёл {} маршрут(ов) под ваши критерии:\n\n{}",
        routes.len(),
        items.join("\n\n")
    ))
}

fn format_route(route: &Route, index: usize) -> String {
    let features = if route.features.is_empty() {
        "—".to_string()
    } else {
        route.features.join(", ")
    };
    let mut lines = vec![
        format!("{index}. {}", route.name),
        format!(
            "   {} км | {}",
            format_km(route.distance_km),
            route.surface_type.label()
        ),
        format!("   {}", route.description),
        format!("   Особенности: {features}"),
    ];
    if let Some(link) = &route.map_link {
        lines.push(format!("   Карта: {link}"));
    }
    lines.join("\n")
}

/// `10` for whole kilometres, `5.5` otherwise.
fn format_km(distance_km: f64) -> String {
    if distance_km.fract() == 0.0 {
        format!("{distance_km:.0}")
    } else {
        format!("{}", (distance_km * 100.0).round() / 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route(map_link: Option<&str>, features: &[&str]) -> Route {
        Route {
            id: "r".into(),
            city: "Москва".into(),
            name: "Сокольники".into(),
            distance_km: 10.0,
            surface_type: SurfaceProduct::Park,
            description: "Круг".into(),
            features: features.iter().map(|f| f.to_string()).collect(),
            map_link: map_link.map(str::to_string),
        }
    }

    #[test]
    fn empty_result_is_neutral_not_found_text() {
        let message = routes_found(&[]);
        assert!(message.text.starts_with("Маршруты не найдены"));
        assert!(message.choices.is_empty());
    }

    #[test]
    fn routes_are_numbered_with_labels_and_links() {
        let message = routes_found(&[
            route(Some("https://example.org/map"), &["освещение", "кафе"]),
            route(None, &[]),
        ]);
        assert!(message.text.starts_with("Нашёл 2 маршрут(ов)"));
        assert!(message.text.contains("1. Сокольники"));
        assert!(message.text.contains("10 км | Парк"));
        assert!(message.text.contains("Особенности: освещение, кафе"));
        assert!(message.text.contains("Особенности: —"));
        assert_eq!(message.text.matches("Карта:").count(), 1);
    }

    #[test]
    fn km_formatting() {
        assert_eq!(format_km(10.0), "10");
        assert_eq!(format_km(5.5), "5.5");
    }

    #[test]
    fn surface_choices_cover_every_product() {
        let data: Vec<_> = surface_choices().into_iter().map(|c| c.data).collect();
        assert_eq!(
            data,
            vec!["surface:asphalt", "surface:park", "surface:trail", "surface:embankment"]
        );
    }
}

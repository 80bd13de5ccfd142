//! es-AR display helpers shared by the dashboard page and the history routes.

use chrono::{Datelike, NaiveDate, Weekday};

const MONTHS_LONG: [&str; 12] = [
    "enero",
    "febrero",
    "marzo",
    "abril",
    "mayo",
    "junio",
    "julio",
    "agosto",
    "septiembre",
    "octubre",
    "noviembre",
    "diciembre",
];

const MONTHS_SHORT: [&str; 12] = [
    "Ene", "Feb", "Mar", "Abr", "May", "Jun", "Jul", "Ago", "Sep", "Oct", "Nov", "Dic",
];

/// Groups the integer part with '.' and uses ',' as decimal separator.
pub fn format_decimal(value: f64, decimals: usize) -> String {
    let formatted = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match formatted.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (formatted.as_str(), None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    // "-0,00" reads oddly on a card
    let negative = value < 0.0 && formatted.chars().any(|c| c.is_ascii_digit() && c != '0');
    let sign = if negative { "-" } else { "" };

    match frac_part {
        Some(frac) => format!("{}{},{}", sign, grouped, frac),
        None => format!("{}{}", sign, grouped),
    }
}

/// `1290.0` -> `"$ 1.290,00"`
pub fn format_currency(value: f64) -> String {
    format!("$ {}", format_decimal(value, 2))
}

/// `2.2` -> `"2,20 %"` (input already in percent).
pub fn format_percentage(value: f64) -> String {
    format!("{} %", format_decimal(value, 2))
}

/// `19500000.0` -> `"19.500.000"`
pub fn format_number(value: f64) -> String {
    format_decimal(value.round(), 0)
}

pub fn change_icon(value: f64) -> &'static str {
    if value > 0.0 {
        "↗"
    } else if value < 0.0 {
        "↘"
    } else {
        "→"
    }
}

/// CSS class for a variation badge.
pub fn change_class(value: f64) -> &'static str {
    if value > 0.0 {
        "up"
    } else if value < 0.0 {
        "down"
    } else {
        "flat"
    }
}

/// `2026-10-19` -> `"19 de octubre de 2026"`
pub fn format_long_date(date: NaiveDate) -> String {
    format!(
        "{} de {} de {}",
        date.day(),
        MONTHS_LONG[date.month0() as usize],
        date.year()
    )
}

/// `2024-01-31` -> `"Ene 24"`
pub fn short_month_label(date: NaiveDate) -> String {
    format!(
        "{} {:02}",
        MONTHS_SHORT[date.month0() as usize],
        date.year().rem_euclid(100)
    )
}

/// `2024-12-01` -> `"Diciembre 2024"`
pub fn month_period(date: NaiveDate) -> String {
    let name = MONTHS_LONG[date.month0() as usize];
    let mut chars = name.chars();
    let capitalized = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
        None => String::new(),
    };
    format!("{} {}", capitalized, date.year())
}

pub fn weekday_es(date: NaiveDate) -> &'static str {
    match date.weekday() {
        Weekday::Mon => "Lunes",
        Weekday::Tue => "Martes",
        Weekday::Wed => "Miércoles",
        Weekday::Thu => "Jueves",
        Weekday::Fri => "Viernes",
        Weekday::Sat => "Sábado",
        Weekday::Sun => "Domingo",
    }
}

/// Escapes text interpolated into the dashboard HTML.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

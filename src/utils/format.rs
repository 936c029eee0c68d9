use chrono::{DateTime, Utc};

/// `dd/mm/aaaa HH:MM`, UTC.
pub fn datetime_es(value: &DateTime<Utc>) -> String {
    value.format("%d/%m/%Y %H:%M").to_string()
}

/// `1.234,50 €`
pub fn currency_es(amount: f64) -> String {
    let formatted = format!("{:.2}", amount.abs());
    let (int_part, dec_part) = formatted.split_once('.').unwrap_or((&formatted, "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    let sign = if amount < 0.0 { "-" } else { "" };
    format!("{sign}{grouped},{dec_part} €")
}

pub fn yes_no_es(value: bool) -> &'static str {
    if value { "Sí" } else { "No" }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_datetime_es() {
        let dt = Utc.with_ymd_and_hms(2025, 3, 7, 9, 5, 0).unwrap();
        assert_eq!(datetime_es(&dt), "07/03/2025 09:05");
    }

    #[test]
    fn test_currency_es_groups_thousands() {
        assert_eq!(currency_es(0.0), "0,00 €");
        assert_eq!(currency_es(85.5), "85,50 €");
        assert_eq!(currency_es(1234.5), "1.234,50 €");
        assert_eq!(currency_es(1234567.891), "1.234.567,89 €");
        assert_eq!(currency_es(-12.0), "-12,00 €");
    }
}

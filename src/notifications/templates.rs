use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::entities::{driver, reservation, trip, user};
use crate::utils::format::{currency_es, datetime_es};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateName {
    ReservationConfirmed,
    TripAssignedDriver,
    TripCompleted,
    NewReservationAdmin,
    DriverAssigned,
    TripCancelled,
    /// Subject and message come from the payload.
    Custom,
}

impl TemplateName {
    pub fn as_str(self) -> &'static str {
        match self {
            TemplateName::ReservationConfirmed => "reservation_confirmed",
            TemplateName::TripAssignedDriver => "trip_assigned_driver",
            TemplateName::TripCompleted => "trip_completed",
            TemplateName::NewReservationAdmin => "new_reservation_admin",
            TemplateName::DriverAssigned => "driver_assigned",
            TemplateName::TripCancelled => "trip_cancelled",
            TemplateName::Custom => "custom",
        }
    }
}

/// Fields available to templates. Everything is optional so the mail
/// endpoint can accept partial payloads; missing values render empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ReservationData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirmation_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub departure_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub passenger_count: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub passenger_names: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pickup_location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dropoff_location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flight_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub special_requirements: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub driver_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub driver_phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vehicle: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ReservationData {
    pub fn from_records(
        reservation: &reservation::Model,
        trip: &trip::Model,
        client: Option<&user::Model>,
        driver: Option<&driver::Model>,
    ) -> Self {
        Self {
            confirmation_code: Some(reservation.confirmation_code.clone()),
            client_name: client.map(|u| u.name.clone()),
            client_email: client.map(|u| u.email.clone()),
            client_phone: Some(reservation.contact_phone.clone()),
            origin: Some(trip.origin.clone()),
            destination: Some(trip.destination.clone()),
            departure_time: Some(datetime_es(&trip.departure_time.with_timezone(&Utc))),
            passenger_count: Some(reservation.passenger_count),
            passenger_names: Some(reservation.passenger_name_list().join(", ")),
            pickup_location: Some(reservation.pickup_location.clone()),
            dropoff_location: Some(reservation.dropoff_location.clone()),
            flight_number: reservation.flight_number.clone(),
            special_requirements: reservation.special_requirements.clone(),
            total_price: Some(reservation.total_price),
            driver_name: driver.map(|d| d.name.clone()),
            driver_phone: driver.map(|d| d.phone.clone()),
            vehicle: driver.map(|d| d.vehicle().describe()),
            ..Default::default()
        }
    }

    pub fn with_rating_link(mut self, link: String) -> Self {
        self.rating_link = Some(link);
        self
    }

    fn placeholders(&self) -> Vec<(&'static str, String)> {
        let text = |v: &Option<String>| v.clone().unwrap_or_default();
        vec![
            ("confirmation_code", text(&self.confirmation_code)),
            ("client_name", text(&self.client_name)),
            ("client_email", text(&self.client_email)),
            ("client_phone", text(&self.client_phone)),
            ("origin", text(&self.origin)),
            ("destination", text(&self.destination)),
            ("departure_time", text(&self.departure_time)),
            (
                "passenger_count",
                self.passenger_count.map(|n| n.to_string()).unwrap_or_default(),
            ),
            ("passenger_names", text(&self.passenger_names)),
            ("pickup_location", text(&self.pickup_location)),
            ("dropoff_location", text(&self.dropoff_location)),
            ("flight_number", text(&self.flight_number)),
            ("special_requirements", text(&self.special_requirements)),
            ("total_price", self.total_price.map(currency_es).unwrap_or_default()),
            ("driver_name", text(&self.driver_name)),
            ("driver_phone", text(&self.driver_phone)),
            ("vehicle", text(&self.vehicle)),
            ("rating_link", text(&self.rating_link)),
            ("subject", text(&self.subject)),
            ("message", text(&self.message)),
        ]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedEmail {
    pub template: TemplateName,
    pub to: String,
    pub subject: String,
    pub html: String,
    pub data: ReservationData,
}

struct Template {
    subject: &'static str,
    body: &'static str,
}

fn template(name: TemplateName) -> Template {
    match name {
        TemplateName::ReservationConfirmed => Template {
            subject: "Reserva confirmada · {{confirmation_code}}",
            body: r#"<h2>¡Tu reserva está confirmada!</h2>
<p>Hola {{client_name}}, hemos confirmado tu reserva <strong>{{confirmation_code}}</strong>.</p>
<table>
  <tr><td>Trayecto</td><td>{{origin}} → {{destination}}</td></tr>
  <tr><td>Salida</td><td>{{departure_time}}</td></tr>
  <tr><td>Recogida</td><td>{{pickup_location}}</td></tr>
  <tr><td>Pasajeros</td><td>{{passenger_count}}</td></tr>
  <tr><td>Total</td><td>{{total_price}}</td></tr>
</table>
<p>Te avisaremos cuando asignemos un conductor a tu viaje.</p>"#,
        },
        TemplateName::TripAssignedDriver => Template {
            subject: "Nuevo viaje asignado · {{departure_time}}",
            body: r#"<h2>Tienes un nuevo viaje asignado</h2>
<p>Hola {{driver_name}}, se te ha asignado la reserva <strong>{{confirmation_code}}</strong>.</p>
<table>
  <tr><td>Trayecto</td><td>{{origin}} → {{destination}}</td></tr>
  <tr><td>Salida</td><td>{{departure_time}}</td></tr>
  <tr><td>Recogida</td><td>{{pickup_location}}</td></tr>
  <tr><td>Destino</td><td>{{dropoff_location}}</td></tr>
  <tr><td>Pasajeros</td><td>{{passenger_count}} ({{passenger_names}})</td></tr>
  <tr><td>Contacto</td><td>{{client_name}} · {{client_phone}}</td></tr>
  <tr><td>Vuelo</td><td>{{flight_number}}</td></tr>
  <tr><td>Requisitos</td><td>{{special_requirements}}</td></tr>
</table>"#,
        },
        TemplateName::TripCompleted => Template {
            subject: "¿Qué tal tu viaje? · {{confirmation_code}}",
            body: r#"<h2>Gracias por viajar con nosotros</h2>
<p>Hola {{client_name}}, tu viaje {{origin}} → {{destination}} ha finalizado.</p>
<p>Nos ayudaría mucho conocer tu opinión sobre el servicio de {{driver_name}}.</p>
<p><a href="{{rating_link}}" style="display:inline-block;background:#2563eb;color:#fff;padding:12px 24px;text-decoration:none;border-radius:4px;">Valorar el viaje</a></p>
<p style="color:#666;font-size:12px;">O copia este enlace en tu navegador: {{rating_link}}</p>"#,
        },
        TemplateName::NewReservationAdmin => Template {
            subject: "Nueva reserva pendiente · {{confirmation_code}}",
            body: r#"<h2>Nueva reserva pendiente de confirmación</h2>
<table>
  <tr><td>Código</td><td>{{confirmation_code}}</td></tr>
  <tr><td>Cliente</td><td>{{client_name}} · {{client_email}} · {{client_phone}}</td></tr>
  <tr><td>Trayecto</td><td>{{origin}} → {{destination}}</td></tr>
  <tr><td>Salida</td><td>{{departure_time}}</td></tr>
  <tr><td>Pasajeros</td><td>{{passenger_count}} ({{passenger_names}})</td></tr>
  <tr><td>Recogida</td><td>{{pickup_location}}</td></tr>
  <tr><td>Destino</td><td>{{dropoff_location}}</td></tr>
  <tr><td>Vuelo</td><td>{{flight_number}}</td></tr>
  <tr><td>Requisitos</td><td>{{special_requirements}}</td></tr>
  <tr><td>Total</td><td>{{total_price}}</td></tr>
</table>"#,
        },
        TemplateName::DriverAssigned => Template {
            subject: "Conductor asignado · {{confirmation_code}}",
            body: r#"<h2>Ya tienes conductor</h2>
<p>Hola {{client_name}}, {{driver_name}} realizará tu viaje {{origin}} → {{destination}} el {{departure_time}}.</p>
<table>
  <tr><td>Conductor</td><td>{{driver_name}}</td></tr>
  <tr><td>Teléfono</td><td>{{driver_phone}}</td></tr>
  <tr><td>Vehículo</td><td>{{vehicle}}</td></tr>
</table>"#,
        },
        TemplateName::TripCancelled => Template {
            subject: "Viaje cancelado · {{confirmation_code}}",
            body: r#"<h2>Viaje cancelado</h2>
<p>El viaje {{origin}} → {{destination}} del {{departure_time}} (reserva {{confirmation_code}}) ha sido cancelado.</p>
<p>Si tienes cualquier duda, responde a este correo indicando el código de tu reserva.</p>"#,
        },
        TemplateName::Custom => Template {
            subject: "{{subject}}",
            body: "<p>{{message}}</p>",
        },
    }
}

const LAYOUT: &str = r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <title>{{title}}</title>
</head>
<body style="font-family: Arial, sans-serif; line-height: 1.6; color: #333;">
    <div style="max-width: 600px; margin: 0 auto; padding: 20px;">
{{content}}
    </div>
</body>
</html>"#;

/// Fills `{{key}}` slots in one left-to-right pass. Inserted values are
/// never rescanned, and unknown keys render empty.
fn substitute(source: &str, values: &[(&str, String)], escape: bool) -> String {
    let mut out = String::with_capacity(source.len());
    let mut rest = source;
    while let Some(open) = rest.find("{{") {
        let after = &rest[open + 2..];
        let Some(close) = after.find("}}") else {
            break;
        };
        out.push_str(&rest[..open]);
        let key = &after[..close];
        if let Some((_, value)) = values.iter().find(|(k, _)| *k == key) {
            if escape {
                out.push_str(&escape_html(value));
            } else {
                out.push_str(value);
            }
        }
        rest = &after[close + 2..];
    }
    out.push_str(rest);
    out
}

fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
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

pub fn render(name: TemplateName, to: &str, data: &ReservationData) -> RenderedEmail {
    let template = template(name);
    let values = data.placeholders();

    let subject = substitute(template.subject, &values, false);
    let content = substitute(template.body, &values, true);
    let html = substitute(
        LAYOUT,
        &[("title", escape_html(&subject)), ("content", content)],
        false,
    );

    RenderedEmail {
        template: name,
        to: to.to_string(),
        subject,
        html,
        data: data.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ReservationData {
        ReservationData {
            confirmation_code: Some("TR-7KQ2MZ".into()),
            client_name: Some("Lucía".into()),
            origin: Some("Aeropuerto".into()),
            destination: Some("Hotel Mirador".into()),
            total_price: Some(120.0),
            ..Default::default()
        }
    }

    #[test]
    fn test_template_names_match_wire_format() {
        let name: TemplateName = serde_json::from_str("\"trip_assigned_driver\"").unwrap();
        assert_eq!(name, TemplateName::TripAssignedDriver);
        assert_eq!(name.as_str(), "trip_assigned_driver");
        assert!(serde_json::from_str::<TemplateName>("\"welcome\"").is_err());
    }

    #[test]
    fn test_render_substitutes_subject_and_body() {
        let email = render(TemplateName::ReservationConfirmed, "lucia@example.com", &sample());

        assert_eq!(email.subject, "Reserva confirmada · TR-7KQ2MZ");
        assert!(email.html.contains("Hola Lucía"));
        assert!(email.html.contains("Aeropuerto → Hotel Mirador"));
        assert!(email.html.contains("120,00 €"));
        assert!(!email.html.contains("{{"));
    }

    #[test]
    fn test_missing_values_render_empty() {
        let email = render(TemplateName::TripCancelled, "x@example.com", &ReservationData::default());
        assert_eq!(email.subject, "Viaje cancelado · ");
        assert!(!email.html.contains("{{"));
    }

    #[test]
    fn test_values_are_html_escaped() {
        let data = ReservationData {
            client_name: Some("<script>alert(1)</script>".into()),
            ..sample()
        };
        let email = render(TemplateName::ReservationConfirmed, "x@example.com", &data);

        assert!(email.html.contains("&lt;script&gt;"));
        assert!(!email.html.contains("<script>"));
    }

    #[test]
    fn test_trip_completed_carries_rating_link() {
        let data = sample().with_rating_link("https://transfers.example/rating/abc".into());
        let email = render(TemplateName::TripCompleted, "x@example.com", &data);

        assert!(email.html.contains("href=\"https://transfers.example/rating/abc\""));
    }

    #[test]
    fn test_custom_template_uses_payload() {
        let data = ReservationData {
            subject: Some("Cambio de terminal".into()),
            message: Some("Su recogida será en la T2.".into()),
            ..Default::default()
        };
        let email = render(TemplateName::Custom, "x@example.com", &data);

        assert_eq!(email.subject, "Cambio de terminal");
        assert!(email.html.contains("<p>Su recogida será en la T2.</p>"));
    }

    #[test]
    fn test_user_text_is_never_expanded_as_a_placeholder() {
        let data = ReservationData {
            client_name: Some("{{rating_link}}".into()),
            ..sample().with_rating_link("https://transfers.example/rating/abc".into())
        };
        let email = render(TemplateName::TripCompleted, "x@example.com", &data);

        assert!(email.html.contains("Hola {{rating_link}}"));
        assert_eq!(email.html.matches("https://transfers.example/rating/abc").count(), 2);
    }

    #[test]
    fn test_requirements_with_braces_render_verbatim() {
        let data = ReservationData {
            special_requirements: Some("{{confirmation_code}} {{content}}".into()),
            ..sample()
        };
        let email = render(TemplateName::NewReservationAdmin, "ops@example.com", &data);

        assert!(email.html.contains("<td>{{confirmation_code}} {{content}}</td>"));
        assert_eq!(email.html.matches("TR-7KQ2MZ").count(), 2);
    }

    #[test]
    fn test_subject_text_stays_literal_in_layout_title() {
        let data = ReservationData {
            subject: Some("{{content}} y {{message}}".into()),
            message: Some("Hola".into()),
            ..Default::default()
        };
        let email = render(TemplateName::Custom, "x@example.com", &data);

        assert_eq!(email.subject, "{{content}} y {{message}}");
        assert!(email.html.contains("<title>{{content}} y {{message}}</title>"));
        assert_eq!(email.html.matches("<p>Hola</p>").count(), 1);
    }

    #[test]
    fn test_payload_accepts_camel_case() {
        let data: ReservationData = serde_json::from_str(
            r#"{"confirmationCode":"TR-AAAAAA","passengerCount":3,"unknownField":true}"#,
        )
        .unwrap();

        assert_eq!(data.confirmation_code.as_deref(), Some("TR-AAAAAA"));
        assert_eq!(data.passenger_count, Some(3));
    }
}

use axum::{extract::State, http::StatusCode, Json};

use crate::notifications::{deliver, EmailJob, RetryPolicy, SendEmailRequest, SendEmailResponse};
use crate::AppState;

/// Send one templated email now and report the outcome.
pub async fn send_email(
    State(state): State<AppState>,
    Json(payload): Json<SendEmailRequest>,
) -> (StatusCode, Json<SendEmailResponse>) {
    if !payload.recipient_email.contains('@') {
        return (
            StatusCode::BAD_REQUEST,
            Json(SendEmailResponse {
                success: false,
                message_id: None,
                error: Some("Invalid recipient email".to_string()),
            }),
        );
    }

    let job = EmailJob::new(
        payload.template_name,
        payload.recipient_email,
        payload.reservation_data,
    );

    match deliver(state.mailer.as_ref(), &state.db, &job, RetryPolicy::single()).await {
        Ok(message_id) => (
            StatusCode::OK,
            Json(SendEmailResponse {
                success: true,
                message_id: Some(message_id),
                error: None,
            }),
        ),
        Err(e) => {
            tracing::error!(
                template = job.template.as_str(),
                recipient = %job.recipient,
                error = %e,
                "Email send failed"
            );
            (
                StatusCode::BAD_GATEWAY,
                Json(SendEmailResponse {
                    success: false,
                    message_id: None,
                    error: Some(e.to_string()),
                }),
            )
        }
    }
}

//! Transactional email.
//!
//! Status changes never send mail inline. They push an [`EmailJob`] onto the
//! [`Notifier`] queue after their transaction commits; a background worker
//! renders the template, hands it to the [`MailTransport`], retries transient
//! failures with backoff and writes one `email_log` row per job. Nothing on
//! this path can fail the operation that queued the job.

pub mod templates;
pub mod transport;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, Semaphore};
use tokio::task::{JoinHandle, JoinSet};
use uuid::Uuid;

use crate::entities::email_log::{self, DeliveryStatus};

pub use templates::{render, RenderedEmail, ReservationData, TemplateName};
pub use transport::{MailError, MailTransport};

/// Body of `POST /api/notifications/send`, also what the HTTP relay sends.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendEmailRequest {
    pub template_name: TemplateName,
    pub recipient_email: String,
    #[serde(default)]
    pub reservation_data: ReservationData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendEmailResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmailJob {
    pub template: TemplateName,
    pub recipient: String,
    pub data: ReservationData,
    pub reservation_id: Option<Uuid>,
}

impl EmailJob {
    pub fn new(template: TemplateName, recipient: impl Into<String>, data: ReservationData) -> Self {
        Self {
            template,
            recipient: recipient.into(),
            data,
            reservation_id: None,
        }
    }

    pub fn for_reservation(mut self, reservation_id: Uuid) -> Self {
        self.reservation_id = Some(reservation_id);
        self
    }
}

#[derive(Clone)]
pub struct Notifier {
    sender: mpsc::UnboundedSender<EmailJob>,
}

impl Notifier {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<EmailJob>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    pub fn enqueue(&self, job: EmailJob) {
        let template = job.template.as_str();
        let recipient = job.recipient.clone();

        match self.sender.send(job) {
            Ok(()) => tracing::debug!(template, recipient = %recipient, "Email queued"),
            Err(_) => tracing::error!(
                template,
                recipient = %recipient,
                "Email queue is closed, notification dropped"
            ),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::from_secs(2),
        }
    }

    /// Sending only once; used by the synchronous mail endpoint.
    pub fn single() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
        }
    }

    /// Delay after the `attempt`-th failure (1-based), doubling each time.
    fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt.saturating_sub(1))
    }
}

/// Render, send with retries, and record the outcome in `email_log`.
pub async fn deliver(
    transport: &dyn MailTransport,
    db: &DatabaseConnection,
    job: &EmailJob,
    policy: RetryPolicy,
) -> Result<String, MailError> {
    let email = render(job.template, &job.recipient, &job.data);
    let max_attempts = policy.max_attempts.max(1);

    let mut attempts = 0;
    let result = loop {
        attempts += 1;
        match transport.send(&email).await {
            Ok(message_id) => break Ok(message_id),
            Err(e) if e.is_transient() && attempts < max_attempts => {
                let delay = policy.delay_after(attempts);
                tracing::warn!(
                    template = job.template.as_str(),
                    recipient = %job.recipient,
                    attempt = attempts,
                    error = %e,
                    "Email send failed, retrying in {:?}",
                    delay
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => break Err(e),
        }
    };

    record(db, job, &result, attempts).await;
    result
}

async fn record(
    db: &DatabaseConnection,
    job: &EmailJob,
    result: &Result<String, MailError>,
    attempts: u32,
) {
    let (status, message_id, error) = match result {
        Ok(id) => (DeliveryStatus::Sent, Some(id.clone()), None),
        Err(e) => (DeliveryStatus::Failed, None, Some(e.to_string())),
    };

    let entry = email_log::ActiveModel {
        id: Set(Uuid::new_v4()),
        recipient: Set(job.recipient.clone()),
        template_name: Set(job.template.as_str().to_string()),
        status: Set(status),
        message_id: Set(message_id),
        error: Set(error),
        attempts: Set(attempts as i32),
        reservation_id: Set(job.reservation_id),
        created_at: Set(Utc::now().into()),
    };

    if let Err(e) = entry.insert(db).await {
        tracing::error!(error = %e, "Failed to write email log");
    }
}

/// Deliveries running at once.
pub const MAX_IN_FLIGHT: usize = 8;

/// Drain the queue until every [`Notifier`] is dropped.
///
/// Each job is delivered on its own task, at most [`MAX_IN_FLIGHT`] at a
/// time, so a recipient stuck in backoff does not hold up the others. The
/// returned handle resolves once the queue is closed and in-flight jobs
/// have finished.
pub fn spawn_worker(
    mut receiver: mpsc::UnboundedReceiver<EmailJob>,
    transport: Arc<dyn MailTransport>,
    db: DatabaseConnection,
    policy: RetryPolicy,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let permits = Arc::new(Semaphore::new(MAX_IN_FLIGHT));
        let mut in_flight = JoinSet::new();

        while let Some(job) = receiver.recv().await {
            let Ok(permit) = permits.clone().acquire_owned().await else {
                break;
            };
            let transport = transport.clone();
            let db = db.clone();
            in_flight.spawn(async move {
                let _permit = permit;
                send_and_report(transport.as_ref(), &db, &job, policy).await;
            });

            while let Some(done) = in_flight.try_join_next() {
                if let Err(e) = done {
                    tracing::error!(error = %e, "Email task panicked");
                }
            }
        }

        while let Some(done) = in_flight.join_next().await {
            if let Err(e) = done {
                tracing::error!(error = %e, "Email task panicked");
            }
        }
        tracing::info!("Email queue closed, worker stopping");
    })
}

async fn send_and_report(
    transport: &dyn MailTransport,
    db: &DatabaseConnection,
    job: &EmailJob,
    policy: RetryPolicy,
) {
    match deliver(transport, db, job, policy).await {
        Ok(message_id) => tracing::info!(
            template = job.template.as_str(),
            recipient = %job.recipient,
            message_id = %message_id,
            "Email sent"
        ),
        Err(e) => tracing::error!(
            template = job.template.as_str(),
            recipient = %job.recipient,
            error = %e,
            "Email delivery failed"
        ),
    }
}

mod common;

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};

use common::*;
use transfer_booking_backend::entities::email_log::{self, DeliveryStatus};
use transfer_booking_backend::notifications::{
    deliver, spawn_worker, EmailJob, MailError, MailTransport, Notifier, RenderedEmail,
    ReservationData, RetryPolicy, TemplateName,
};

/// Fails the first `failures` sends, then succeeds.
struct FlakyTransport {
    failures: u32,
    calls: AtomicU32,
}

impl FlakyTransport {
    fn new(failures: u32) -> Self {
        Self {
            failures,
            calls: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl MailTransport for FlakyTransport {
    async fn send(&self, email: &RenderedEmail) -> Result<String, MailError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call <= self.failures {
            return Err(MailError::Smtp(format!("421 try again later ({})", email.to)));
        }
        Ok(format!("<msg-{call}@transfers.test>"))
    }
}

/// Refuses every recipient, the way a server rejects a bad mailbox.
struct RejectingTransport {
    calls: AtomicU32,
}

#[async_trait]
impl MailTransport for RejectingTransport {
    async fn send(&self, email: &RenderedEmail) -> Result<String, MailError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(MailError::Address(email.to.clone()))
    }
}

/// Hangs on one recipient and answers the rest straight away.
struct StallingTransport {
    stalled: &'static str,
}

#[async_trait]
impl MailTransport for StallingTransport {
    async fn send(&self, email: &RenderedEmail) -> Result<String, MailError> {
        if email.to == self.stalled {
            tokio::time::sleep(Duration::from_secs(60)).await;
        }
        Ok(format!("<{}@transfers.test>", email.to))
    }
}

fn fast_retries(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        base_delay: Duration::from_millis(1),
    }
}

fn job() -> EmailJob {
    EmailJob::new(
        TemplateName::ReservationConfirmed,
        "client@example.com",
        ReservationData {
            confirmation_code: Some("TR-ABC234".to_string()),
            client_name: Some("Ana García".to_string()),
            ..Default::default()
        },
    )
}

#[tokio::test]
async fn test_deliver_retries_then_logs_success() {
    let db = test_db().await;
    let transport = FlakyTransport::new(2);

    let message_id = deliver(&transport, &db, &job(), fast_retries(3))
        .await
        .unwrap();

    assert_eq!(message_id, "<msg-3@transfers.test>");
    assert_eq!(transport.calls.load(Ordering::SeqCst), 3);

    let logs = email_log::Entity::find().all(&db).await.unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].status, DeliveryStatus::Sent);
    assert_eq!(logs[0].attempts, 3);
    assert_eq!(logs[0].template_name, "reservation_confirmed");
    assert_eq!(logs[0].message_id.as_deref(), Some("<msg-3@transfers.test>"));
}

#[tokio::test]
async fn test_deliver_gives_up_and_logs_failure() {
    let db = test_db().await;
    let transport = FlakyTransport::new(10);

    let err = deliver(&transport, &db, &job(), fast_retries(2))
        .await
        .unwrap_err();

    assert!(matches!(err, MailError::Smtp(_)));
    assert_eq!(transport.calls.load(Ordering::SeqCst), 2);

    let logs = email_log::Entity::find().all(&db).await.unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].status, DeliveryStatus::Failed);
    assert_eq!(logs[0].attempts, 2);
    assert!(logs[0].error.as_deref().unwrap_or_default().contains("421"));
}

#[tokio::test]
async fn test_worker_drains_queue_and_stops_when_notifier_dropped() {
    let db = test_db().await;
    let (notifier, receiver) = Notifier::channel();
    let transport = Arc::new(FlakyTransport::new(1));

    let worker = spawn_worker(receiver, transport.clone(), db.clone(), fast_retries(3));

    let reservation_id = uuid::Uuid::new_v4();
    notifier.enqueue(job().for_reservation(reservation_id));
    notifier.enqueue(EmailJob::new(
        TemplateName::NewReservationAdmin,
        OPS_EMAIL,
        ReservationData::default(),
    ));
    drop(notifier);

    tokio::time::timeout(Duration::from_secs(5), worker)
        .await
        .expect("worker stops once the queue is closed")
        .unwrap();

    let logs = email_log::Entity::find()
        .order_by_asc(email_log::Column::CreatedAt)
        .all(&db)
        .await
        .unwrap();
    assert_eq!(logs.len(), 2);
    assert!(logs.iter().all(|l| l.status == DeliveryStatus::Sent));
    assert!(logs.iter().any(|l| l.reservation_id == Some(reservation_id)));
    // one of the two concurrent jobs took the single failure
    assert_eq!(logs.iter().map(|l| l.attempts).sum::<i32>(), 3);
    assert!(logs.iter().any(|l| l.recipient == OPS_EMAIL));
}

#[tokio::test]
async fn test_rejected_address_is_not_retried() {
    let db = test_db().await;
    let transport = RejectingTransport {
        calls: AtomicU32::new(0),
    };

    let err = deliver(&transport, &db, &job(), fast_retries(5))
        .await
        .unwrap_err();

    assert!(matches!(err, MailError::Address(_)));
    assert_eq!(transport.calls.load(Ordering::SeqCst), 1);

    let logs = email_log::Entity::find().all(&db).await.unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].status, DeliveryStatus::Failed);
    assert_eq!(logs[0].attempts, 1);
}

#[tokio::test]
async fn test_stalled_recipient_does_not_hold_up_the_queue() {
    let db = test_db().await;
    let (notifier, receiver) = Notifier::channel();
    let transport = Arc::new(StallingTransport {
        stalled: "stuck@example.com",
    });

    let worker = spawn_worker(receiver, transport, db.clone(), fast_retries(1));

    notifier.enqueue(EmailJob::new(
        TemplateName::TripCancelled,
        "stuck@example.com",
        ReservationData::default(),
    ));
    notifier.enqueue(EmailJob::new(
        TemplateName::NewReservationAdmin,
        OPS_EMAIL,
        ReservationData::default(),
    ));

    let logged = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let rows = email_log::Entity::find()
                .filter(email_log::Column::Recipient.eq(OPS_EMAIL))
                .all(&db)
                .await
                .unwrap();
            if !rows.is_empty() {
                return rows;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("second job is delivered while the first one hangs");

    assert_eq!(logged[0].status, DeliveryStatus::Sent);
    worker.abort();
}

mod common;

use common::{desk_with_admin, form, png_bytes};
use racedesk::application::engine::RaceDesk;
use racedesk::application::receipts::ReceiptUpload;
use racedesk::domain::registration::EventType;
use racedesk::domain::status::{PaymentStatus, StatusFilter};
use racedesk::error::{ErrorKind, RaceError};
use rust_decimal_macros::dec;

async fn upload(desk: &RaceDesk, registration_id: u32) -> Result<String, RaceError> {
    desk.ingest_receipt(ReceiptUpload {
        registration_id,
        bytes: png_bytes(1024),
        content_type: "image/png".to_string(),
        payment_method: None,
        declared_amount: None,
    })
    .await
    .map(|summary| summary.receipt_image)
}

#[tokio::test]
async fn test_amount_follows_price_table() {
    let desk = RaceDesk::in_memory();
    for (i, (event, price)) in [
        (EventType::FunRun, dec!(400)),
        (EventType::MiniMarathon, dec!(500)),
        (EventType::Vip, dec!(1000)),
    ]
    .into_iter()
    .enumerate()
    {
        let registration = desk
            .register(form(&format!("runner{}@example.com", i), event))
            .await
            .unwrap();
        let payment = desk.create_payment(registration.id).await.unwrap();
        assert_eq!(payment.amount.value(), price);
        assert_eq!(payment.status, PaymentStatus::Pending);
    }
}

#[tokio::test]
async fn test_duplicate_email_keeps_one_registration() {
    let desk = RaceDesk::in_memory();
    desk.register(form("same@example.com", EventType::FunRun))
        .await
        .unwrap();
    let second = desk
        .register(form(" same@example.com ", EventType::Vip))
        .await;

    let err = second.unwrap_err();
    assert!(matches!(err, RaceError::DuplicateEmail(_)));
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(
        desk.find_by_email("same@example.com").await.unwrap().len(),
        1
    );
}

#[tokio::test]
async fn test_update_to_taken_email_fails() {
    let desk = RaceDesk::in_memory();
    desk.register(form("a@example.com", EventType::FunRun))
        .await
        .unwrap();
    let b = desk
        .register(form("b@example.com", EventType::FunRun))
        .await
        .unwrap();
    assert!(matches!(
        desk.update_registration(b.id, form("a@example.com", EventType::FunRun))
            .await,
        Err(RaceError::DuplicateEmail(_))
    ));
    // Re-saving with its own email is fine.
    desk.update_registration(b.id, form("b@example.com", EventType::Vip))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_full_lifecycle_keeps_mirror() {
    let (desk, session) = desk_with_admin().await;
    let registration = desk
        .register(form("runner@example.com", EventType::MiniMarathon))
        .await
        .unwrap();
    let payment = desk.create_payment(registration.id).await.unwrap();

    upload(&desk, registration.id).await.unwrap();
    let pending = desk.payment(payment.id).await.unwrap();
    assert_eq!(pending.status, PaymentStatus::PendingReview);
    assert_eq!(
        desk.registration(registration.id).await.unwrap().payment_status,
        PaymentStatus::PendingReview
    );

    desk.verify(&session, payment.id, PaymentStatus::Completed, None)
        .await
        .unwrap();
    let completed = desk.payment(payment.id).await.unwrap();
    assert_eq!(completed.status, PaymentStatus::Completed);
    assert!(completed.payment_date.is_some());
    assert_eq!(
        desk.registration(registration.id).await.unwrap().payment_status,
        PaymentStatus::Completed
    );

    let listed = desk.list_with_payment(StatusFilter::Completed).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].payment.as_ref().unwrap().id, payment.id);
}

#[tokio::test]
async fn test_rejected_registrant_can_upload_again() {
    let (desk, session) = desk_with_admin().await;
    let registration = desk
        .register(form("runner@example.com", EventType::FunRun))
        .await
        .unwrap();
    upload(&desk, registration.id).await.unwrap();
    let payment = desk.payment_for_registration(registration.id).await.unwrap();

    let rejected = desk
        .verify(&session, payment.id, PaymentStatus::Rejected, None)
        .await
        .unwrap();
    assert_eq!(rejected.status, PaymentStatus::Rejected);
    assert!(rejected.payment_date.is_none());

    upload(&desk, registration.id).await.unwrap();
    let again = desk.payment(payment.id).await.unwrap();
    assert_eq!(again.status, PaymentStatus::PendingReview);
    assert_eq!(
        desk.registration(registration.id).await.unwrap().payment_status,
        PaymentStatus::PendingReview
    );
}

#[tokio::test]
async fn test_completed_payment_refuses_receipt() {
    let (desk, session) = desk_with_admin().await;
    let registration = desk
        .register(form("runner@example.com", EventType::Vip))
        .await
        .unwrap();
    upload(&desk, registration.id).await.unwrap();
    let payment = desk.payment_for_registration(registration.id).await.unwrap();
    desk.verify(&session, payment.id, PaymentStatus::Completed, None)
        .await
        .unwrap();
    let before = desk.payment(payment.id).await.unwrap();

    for _ in 0..2 {
        assert!(matches!(
            upload(&desk, registration.id).await,
            Err(RaceError::AlreadyCompleted(_))
        ));
        assert!(matches!(
            desk.attach_receipt(payment.id, "x.png", None, None).await,
            Err(RaceError::AlreadyCompleted(_))
        ));
    }
    assert_eq!(desk.payment(payment.id).await.unwrap(), before);
}

#[tokio::test]
async fn test_verify_directly_from_pending() {
    let (desk, session) = desk_with_admin().await;
    let registration = desk
        .register(form("cash@example.com", EventType::FunRun))
        .await
        .unwrap();
    let payment = desk.create_payment(registration.id).await.unwrap();
    let verified = desk
        .verify(&session, payment.id, PaymentStatus::Completed, None)
        .await
        .unwrap();
    assert_eq!(verified.status, PaymentStatus::Completed);
}

#[tokio::test]
async fn test_check_status_and_summary() {
    let (desk, session) = desk_with_admin().await;
    let a = desk
        .register(form("a@example.com", EventType::FunRun))
        .await
        .unwrap();
    let b = desk
        .register(form("b@example.com", EventType::Vip))
        .await
        .unwrap();
    upload(&desk, a.id).await.unwrap();
    upload(&desk, b.id).await.unwrap();
    let pa = desk.payment_for_registration(a.id).await.unwrap();
    let pb = desk.payment_for_registration(b.id).await.unwrap();
    desk.verify(&session, pa.id, PaymentStatus::Completed, None)
        .await
        .unwrap();
    desk.verify(&session, pb.id, PaymentStatus::Rejected, Some("blurry".into()))
        .await
        .unwrap();

    let reports = desk.check_status("b@example.com").await.unwrap();
    let snapshot = reports[0].payment.as_ref().unwrap();
    assert_eq!(snapshot.status, PaymentStatus::Rejected);
    assert_eq!(snapshot.verification_note.as_deref(), Some("blurry"));

    let summary = desk.summary().await.unwrap();
    assert_eq!(summary.total, 2);
    assert_eq!(summary.overall.completed, 1);
    assert_eq!(summary.overall.rejected, 1);
    assert_eq!(summary.by_event[&EventType::FunRun].completed, 1);
}

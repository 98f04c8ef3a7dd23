//! Retention evaluation and cleanup sweep tests, including the
//! archive-before-delete asymmetry and partial-failure batch semantics.

mod common;

use common::{EngineHarness, PolicyBuilder};
use podvault::retention::{RetentionAction, RetentionError};
use podvault::DocumentStatus;

#[test]
fn test_apply_retention_archives_when_policy_archives_first() {
    let harness = EngineHarness::new();
    let doc = harness.seed_aged_document(366);
    let evaluator = harness.retention(vec![PolicyBuilder::new("p1")
        .retention_days(365)
        .grace_days(30)
        .archive_before_delete(true)
        .build()]);

    let action = evaluator
        .apply_retention(&harness.ctx("system"), &doc.id)
        .unwrap();

    assert_eq!(action, RetentionAction::Archive);
    assert_eq!(
        harness.lifecycle.get(&doc.id).unwrap().status,
        DocumentStatus::Archived
    );
}

#[test]
fn test_apply_retention_soft_deletes_in_grace_without_archive() {
    let harness = EngineHarness::new();
    let doc = harness.seed_aged_document(366);
    let evaluator = harness.retention(vec![PolicyBuilder::new("p1")
        .retention_days(365)
        .grace_days(30)
        .archive_before_delete(false)
        .build()]);

    let action = evaluator
        .apply_retention(&harness.ctx("system"), &doc.id)
        .unwrap();

    assert_eq!(action, RetentionAction::SoftDelete);
    let parked = harness.lifecycle.get(&doc.id).unwrap();
    assert_eq!(parked.status, DocumentStatus::PendingDelete);
    assert_eq!(parked.previous_status, Some(DocumentStatus::Review));
}

#[test]
fn test_apply_retention_hard_deletes_past_grace() {
    let harness = EngineHarness::new();
    let doc = harness.seed_aged_document(400);
    let evaluator = harness.retention(vec![PolicyBuilder::new("p1")
        .retention_days(365)
        .grace_days(30)
        .archive_before_delete(false)
        .build()]);

    let action = evaluator
        .apply_retention(&harness.ctx("system"), &doc.id)
        .unwrap();

    assert_eq!(action, RetentionAction::HardDelete);
    assert_eq!(
        harness.lifecycle.get(&doc.id).unwrap().status,
        DocumentStatus::Deleted
    );
}

#[test]
fn test_apply_retention_errors_before_expiry() {
    let harness = EngineHarness::new();
    let doc = harness.seed_aged_document(100);
    let evaluator = harness.retention(vec![PolicyBuilder::new("p1")
        .retention_days(365)
        .build()]);

    assert!(matches!(
        evaluator.apply_retention(&harness.ctx("system"), &doc.id),
        Err(RetentionError::NotEligible { .. })
    ));
}

#[test]
fn test_apply_retention_errors_on_protected_document() {
    let harness = EngineHarness::new();
    let doc = harness.seed_aged_document(366);
    let ctx = harness.ctx("legal@example.com");
    harness
        .holds
        .create_hold(&ctx, &doc.id, "litigation", None)
        .unwrap();

    let evaluator = harness.retention(vec![PolicyBuilder::new("p1")
        .retention_days(365)
        .grace_days(30)
        .build()]);

    assert!(matches!(
        evaluator.apply_retention(&ctx, &doc.id),
        Err(RetentionError::Protected { .. })
    ));
    assert_eq!(
        harness.lifecycle.get(&doc.id).unwrap().status,
        DocumentStatus::Review
    );
}

#[test]
fn test_apply_retention_errors_without_policy() {
    let harness = EngineHarness::new();
    let doc = harness.seed_aged_document(366);
    let evaluator = harness.retention(vec![PolicyBuilder::new("archives-only")
        .applies_to(&["archive"])
        .build()]);

    assert!(matches!(
        evaluator.apply_retention(&harness.ctx("system"), &doc.id),
        Err(RetentionError::NoPolicy { .. })
    ));
}

#[test]
fn test_archived_documents_deleted_in_later_pass() {
    // The asymmetry: archive_before_delete suppresses direct deletion.
    // Deletion of an archived document happens via a separate policy for
    // the "archive" entity type, in a later sweep.
    let harness = EngineHarness::new();
    let doc = harness.seed_aged_document(400);
    let evaluator = harness.retention(vec![
        PolicyBuilder::new("docs")
            .retention_days(365)
            .grace_days(30)
            .archive_before_delete(true)
            .build(),
        PolicyBuilder::new("archives")
            .retention_days(365)
            .grace_days(30)
            .archive_before_delete(false)
            .applies_to(&["archive"])
            .build(),
    ]);
    let ctx = harness.ctx("system");

    // Pass 1: even past grace, the archiving policy archives rather than
    // deleting directly.
    let first = evaluator.apply_retention(&ctx, &doc.id).unwrap();
    assert_eq!(first, RetentionAction::Archive);
    assert_eq!(
        harness.lifecycle.get(&doc.id).unwrap().status,
        DocumentStatus::Archived
    );

    // Pass 2: the document now evaluates under the archive policy, which
    // is past grace, so it hard-deletes.
    let second = evaluator.apply_retention(&ctx, &doc.id).unwrap();
    assert_eq!(second, RetentionAction::HardDelete);
    assert_eq!(
        harness.lifecycle.get(&doc.id).unwrap().status,
        DocumentStatus::Deleted
    );
}

#[test]
fn test_cleanup_batch_survives_single_item_failure() {
    let harness = EngineHarness::new();
    let ctx = harness.ctx("system");

    // Ten expired documents; the fifth is hold-protected and must fail
    // without aborting the batch.
    let mut ids = Vec::new();
    for i in 0..10 {
        let doc = harness.seed_aged_document(366 + i);
        ids.push(doc.id);
    }
    harness
        .holds
        .create_hold(&ctx, &ids[4], "litigation", None)
        .unwrap();

    let evaluator = harness.retention(vec![PolicyBuilder::new("p1")
        .retention_days(365)
        .grace_days(90)
        .archive_before_delete(false)
        .build()]);

    let report = evaluator.run_cleanup(&ctx, false, 100).unwrap();

    assert_eq!(report.evaluated, 10);
    assert_eq!(report.actions.len(), 9);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].document_id, ids[4]);
    assert!(report.errors[0].error.contains("legal hold"));

    for (i, id) in ids.iter().enumerate() {
        let status = harness.lifecycle.get(id).unwrap().status;
        if i == 4 {
            assert_eq!(status, DocumentStatus::Review);
        } else {
            assert_eq!(status, DocumentStatus::PendingDelete);
        }
    }
}

#[test]
fn test_cleanup_dry_run_applies_nothing() {
    let harness = EngineHarness::new();
    let doc = harness.seed_aged_document(366);
    let evaluator = harness.retention(vec![PolicyBuilder::new("p1")
        .retention_days(365)
        .grace_days(30)
        .build()]);

    let report = evaluator
        .run_cleanup(&harness.ctx("system"), true, 100)
        .unwrap();

    assert!(report.dry_run);
    assert_eq!(report.actions.len(), 1);
    assert!(!report.actions[0].applied);
    assert_eq!(report.actions[0].action, RetentionAction::SoftDelete);
    assert_eq!(
        harness.lifecycle.get(&doc.id).unwrap().status,
        DocumentStatus::Review
    );
}

#[test]
fn test_cleanup_skips_unexpired_documents() {
    let harness = EngineHarness::new();
    harness.seed_aged_document(10);
    harness.seed_aged_document(366);

    let evaluator = harness.retention(vec![PolicyBuilder::new("p1")
        .retention_days(365)
        .grace_days(30)
        .build()]);

    let report = evaluator
        .run_cleanup(&harness.ctx("system"), false, 100)
        .unwrap();

    assert_eq!(report.evaluated, 2);
    assert_eq!(report.actions.len(), 1);
    assert!(report.errors.is_empty());
}

#[test]
fn test_cleanup_hard_deletes_lapsed_pending_delete() {
    let harness = EngineHarness::new();
    let doc = harness.seed_aged_document(400);
    let ctx = harness.ctx("system");

    // Soft-deleted earlier; grace (30 days after the 365-day expiry) has
    // since lapsed, so the sweep finishes the job.
    harness.lifecycle.soft_delete(&ctx, &doc.id).unwrap();

    let evaluator = harness.retention(vec![PolicyBuilder::new("p1")
        .retention_days(365)
        .grace_days(30)
        .build()]);

    let report = evaluator.run_cleanup(&ctx, false, 100).unwrap();

    assert_eq!(report.actions.len(), 1);
    assert_eq!(report.actions[0].action, RetentionAction::HardDelete);
    assert_eq!(
        harness.lifecycle.get(&doc.id).unwrap().status,
        DocumentStatus::Deleted
    );
}

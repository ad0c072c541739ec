//! Transfer and stock entry tests
//!
//! Covers staging against source stock, atomic two-sided moves, manual
//! entries and the grouped movement history.

mod common;

use apparel_ops_backend::error::AppError;
use apparel_ops_backend::services::transfer::{
    StageLineInput, StagedLine, StockEntryInput, TransferInput,
};
use apparel_ops_backend::services::TransferOrchestrator;
use apparel_ops_backend::store::FailPoint;
use common::*;
use shared::{MovementKind, SizeQty};
use uuid::Uuid;

fn sizes(pairs: &[(&str, i64)]) -> Vec<SizeQty> {
    pairs
        .iter()
        .map(|(size, qty)| SizeQty { size: size.to_string(), qty: *qty })
        .collect()
}

fn staged(color: &str, pairs: &[(&str, i64)]) -> StagedLine {
    StagedLine {
        product_id: PRODUCT_ID,
        color: color.to_string(),
        sizes: sizes(pairs),
        total_qty: 0,
    }
}

fn transfer(from: Uuid, to: Option<Uuid>, lines: Vec<StagedLine>) -> TransferInput {
    TransferInput {
        from_location_id: from,
        to_location_id: to,
        lines,
        note: Some("Restock weekend".to_string()),
        operator_name: "Rina".to_string(),
        date: Some(date(2024, 5, 3)),
    }
}

// ============================================================================
// Staging
// ============================================================================

#[cfg(test)]
mod staging_tests {
    use super::*;

    #[tokio::test]
    async fn test_stage_rejects_quantity_above_source_stock() {
        let f = Fixture::new().await;
        f.stock(CENTRAL_ID, "Cream", "M", 10).await;
        let orchestrator = TransferOrchestrator::new(f.store.clone(), &f.config);

        let err = orchestrator
            .stage_line(StageLineInput {
                source_location_id: CENTRAL_ID,
                product_id: PRODUCT_ID,
                color: "Cream".to_string(),
                sizes: sizes(&[("M", 15)]),
            })
            .await
            .unwrap_err();

        match err {
            AppError::InsufficientStock { size, requested, available } => {
                assert_eq!(size, "M");
                assert_eq!(requested, 15);
                assert_eq!(available, 10);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_stage_normalizes_line() {
        let f = Fixture::new().await;
        f.stock(CENTRAL_ID, "Cream", "M", 10).await;
        let orchestrator = TransferOrchestrator::new(f.store.clone(), &f.config);

        let line = orchestrator
            .stage_line(StageLineInput {
                source_location_id: CENTRAL_ID,
                product_id: PRODUCT_ID,
                color: " Cream ".to_string(),
                sizes: sizes(&[("m", 4), ("L", 0)]),
            })
            .await
            .unwrap();

        assert_eq!(line.color, "Cream");
        assert_eq!(line.sizes, sizes(&[("M", 4)]));
        assert_eq!(line.total_qty, 4);
        // Staging persists nothing
        assert_eq!(f.qty(CENTRAL_ID, "Cream", "M").await, 10);
    }
}

// ============================================================================
// Commit
// ============================================================================

#[cfg(test)]
mod commit_tests {
    use super::*;

    #[tokio::test]
    async fn test_transfer_debits_source_and_credits_destination() {
        let f = Fixture::new().await;
        f.stock(CENTRAL_ID, "Cream", "L", 8).await;
        let orchestrator = TransferOrchestrator::new(f.store.clone(), &f.config);

        let invoice = orchestrator
            .commit_transfer(
                transfer(CENTRAL_ID, Some(BRANCH_ID), vec![staged("Cream", &[("L", 5)])]),
                None,
            )
            .await
            .unwrap();

        assert_eq!(f.qty(CENTRAL_ID, "Cream", "L").await, 3);
        assert_eq!(f.qty(BRANCH_ID, "Cream", "L").await, 5);
        assert_eq!(invoice.kind, MovementKind::Transfer);
        assert!(invoice.batch_code.starts_with("TRF-20240503-"));
        assert_eq!(invoice.total_qty, 5);
        assert_eq!(invoice.operator_name, "Rina");
    }

    #[tokio::test]
    async fn test_transfer_requires_distinct_destination() {
        let f = Fixture::new().await;
        f.stock(CENTRAL_ID, "Cream", "L", 8).await;
        let orchestrator = TransferOrchestrator::new(f.store.clone(), &f.config);

        let err = orchestrator
            .commit_transfer(
                transfer(CENTRAL_ID, Some(CENTRAL_ID), vec![staged("Cream", &[("L", 5)])]),
                None,
            )
            .await
            .unwrap_err();
        assert!(err.is_validation());

        let err = orchestrator
            .commit_transfer(transfer(CENTRAL_ID, None, vec![staged("Cream", &[("L", 5)])]), None)
            .await
            .unwrap_err();
        assert!(err.is_validation());

        let err = orchestrator
            .commit_transfer(transfer(CENTRAL_ID, Some(BRANCH_ID), vec![]), None)
            .await
            .unwrap_err();
        assert!(err.is_validation());
        assert_eq!(f.qty(CENTRAL_ID, "Cream", "L").await, 8);
    }

    #[tokio::test]
    async fn test_short_line_aborts_whole_transfer() {
        let f = Fixture::new().await;
        f.stock(CENTRAL_ID, "Cream", "M", 10).await;
        f.stock(CENTRAL_ID, "Cream", "L", 2).await;
        let orchestrator = TransferOrchestrator::new(f.store.clone(), &f.config);

        let err = orchestrator
            .commit_transfer(
                transfer(
                    CENTRAL_ID,
                    Some(BRANCH_ID),
                    vec![staged("Cream", &[("M", 4), ("L", 3)])],
                ),
                None,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::InsufficientStock { .. }));
        assert_eq!(f.qty(CENTRAL_ID, "Cream", "M").await, 10);
        assert_eq!(f.qty(BRANCH_ID, "Cream", "M").await, 0);
    }

    #[tokio::test]
    async fn test_failed_credit_rolls_back_debit() {
        let f = Fixture::new().await;
        f.stock(CENTRAL_ID, "Cream", "L", 8).await;
        let orchestrator = TransferOrchestrator::new(f.store.clone(), &f.config);
        f.memory.fail_on(FailPoint::InsertMovement).await;

        assert!(orchestrator
            .commit_transfer(
                transfer(CENTRAL_ID, Some(BRANCH_ID), vec![staged("Cream", &[("L", 5)])]),
                None,
            )
            .await
            .is_err());
        f.memory.clear_failures().await;

        assert_eq!(f.qty(CENTRAL_ID, "Cream", "L").await, 8);
        assert_eq!(f.qty(BRANCH_ID, "Cream", "L").await, 0);
        assert!(orchestrator.list_invoices(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_entry_defaults_to_central_location() {
        let f = Fixture::new().await;
        let orchestrator = TransferOrchestrator::new(f.store.clone(), &f.config);

        let invoice = orchestrator
            .commit_entry(
                StockEntryInput {
                    to_location_id: None,
                    lines: vec![staged("Cream", &[("S", 6), ("M", 4)])],
                    note: None,
                    operator_name: String::new(),
                    date: Some(date(2024, 5, 3)),
                },
                None,
            )
            .await
            .unwrap();

        assert_eq!(invoice.kind, MovementKind::ManualEntry);
        assert_eq!(invoice.from_location_id, None);
        assert_eq!(invoice.to_location_id, Some(CENTRAL_ID));
        assert!(invoice.batch_code.starts_with("ENT-20240503-"));
        assert_eq!(invoice.operator_name, "system");
        assert_eq!(f.qty(CENTRAL_ID, "Cream", "S").await, 6);
        assert_eq!(f.qty(CENTRAL_ID, "Cream", "M").await, 4);
    }

    #[tokio::test]
    async fn test_movements_are_grouped_per_commit() {
        let f = Fixture::new().await;
        f.stock(CENTRAL_ID, "Cream", "M", 10).await;
        f.stock(CENTRAL_ID, "Olive", "M", 10).await;
        let orchestrator = TransferOrchestrator::new(f.store.clone(), &f.config);

        let first = orchestrator
            .commit_transfer(
                transfer(
                    CENTRAL_ID,
                    Some(BRANCH_ID),
                    vec![staged("Cream", &[("M", 2)]), staged("Olive", &[("M", 3)])],
                ),
                None,
            )
            .await
            .unwrap();
        orchestrator
            .commit_transfer(
                transfer(CENTRAL_ID, Some(OTHER_BRANCH_ID), vec![staged("Olive", &[("M", 1)])]),
                None,
            )
            .await
            .unwrap();

        let invoices = orchestrator.list_invoices(None).await.unwrap();
        assert_eq!(invoices.len(), 2);
        let grouped = invoices.iter().find(|i| i.batch_id == first.batch_id).unwrap();
        assert_eq!(grouped.lines.len(), 2);
        assert_eq!(grouped.total_qty, 5);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_opposite_transfers_run_concurrently() {
        let f = Fixture::new().await;
        f.stock(CENTRAL_ID, "Cream", "M", 20).await;
        f.stock(BRANCH_ID, "Cream", "M", 20).await;
        let orchestrator = TransferOrchestrator::new(f.store.clone(), &f.config);

        let mut handles = Vec::new();
        for i in 0..20 {
            let orchestrator = orchestrator.clone();
            let (from, to) = if i % 2 == 0 {
                (CENTRAL_ID, BRANCH_ID)
            } else {
                (BRANCH_ID, CENTRAL_ID)
            };
            handles.push(tokio::spawn(async move {
                orchestrator
                    .commit_transfer(transfer(from, Some(to), vec![staged("Cream", &[("M", 1)])]), None)
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(f.qty(CENTRAL_ID, "Cream", "M").await, 20);
        assert_eq!(f.qty(BRANCH_ID, "Cream", "M").await, 20);
    }

    #[tokio::test]
    async fn test_limit_counts_whole_invoices() {
        let f = Fixture::new().await;
        f.stock(CENTRAL_ID, "Cream", "M", 10).await;
        f.stock(CENTRAL_ID, "Olive", "M", 10).await;
        let orchestrator = TransferOrchestrator::new(f.store.clone(), &f.config);

        orchestrator
            .commit_transfer(
                transfer(CENTRAL_ID, Some(OTHER_BRANCH_ID), vec![staged("Olive", &[("M", 1)])]),
                None,
            )
            .await
            .unwrap();
        let newest = orchestrator
            .commit_transfer(
                transfer(
                    CENTRAL_ID,
                    Some(BRANCH_ID),
                    vec![staged("Cream", &[("M", 2)]), staged("Olive", &[("M", 3)])],
                ),
                None,
            )
            .await
            .unwrap();

        let invoices = orchestrator.list_invoices(Some(1)).await.unwrap();

        assert_eq!(invoices.len(), 1);
        assert_eq!(invoices[0].batch_id, newest.batch_id);
        assert_eq!(invoices[0].lines.len(), 2);
        assert_eq!(invoices[0].total_qty, 5);
    }

    #[tokio::test]
    async fn test_oversized_size_quantity_is_rejected() {
        let f = Fixture::new().await;
        let orchestrator = TransferOrchestrator::new(f.store.clone(), &f.config);

        let err = orchestrator
            .commit_entry(
                StockEntryInput {
                    to_location_id: None,
                    lines: vec![staged("Cream", &[("M", 600_000_000), ("m", 600_000_000)])],
                    note: None,
                    operator_name: "Rina".to_string(),
                    date: None,
                },
                None,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Validation { ref field, .. } if field == "sizes"));
        assert_eq!(f.qty(CENTRAL_ID, "Cream", "M").await, 0);
    }

    #[tokio::test]
    async fn test_replayed_transfer_moves_once() {
        let f = Fixture::new().await;
        f.stock(CENTRAL_ID, "Cream", "L", 8).await;
        let orchestrator = TransferOrchestrator::new(f.store.clone(), &f.config);
        let input = || transfer(CENTRAL_ID, Some(BRANCH_ID), vec![staged("Cream", &[("L", 5)])]);

        orchestrator.commit_transfer(input(), Some("trf-1")).await.unwrap();
        let err = orchestrator.commit_transfer(input(), Some("trf-1")).await.unwrap_err();

        assert!(matches!(err, AppError::DuplicateOperation(_)));
        assert_eq!(f.qty(BRANCH_ID, "Cream", "L").await, 5);
    }
}

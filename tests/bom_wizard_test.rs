mod common;

use std::collections::HashSet;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use assert_matches::assert_matches;
use rust_decimal_macros::dec;
use stateset_bom::bom::{
    BomError, BomGateway, BomWizardSession, GatewayError, MissingKind, OperationKind,
    SizeMatrixRowFilter, ValidationIssue, WizardSettings,
};

use common::*;

async fn open_session(gateway: Arc<InMemoryBomGateway>) -> BomWizardSession {
    open_with(gateway, WizardSettings::new("planner")).await
}

async fn open_with(gateway: Arc<InMemoryBomGateway>, settings: WizardSettings) -> BomWizardSession {
    let gateway: Arc<dyn BomGateway> = gateway;
    BomWizardSession::open(gateway, PRODUCT, settings)
        .await
        .expect("session should open")
}

/// Zipper x1 in step 1, Fabric by color in step 2, S 1.5 and M 1.8 in step 3.
fn configure_tee(session: &mut BomWizardSession) {
    session
        .add_common_material(Some(ZIPPER), Some(ZIPPER_Z), Some(dec!(1)))
        .unwrap();
    session.assign_color_material(FABRIC, RED, FABRIC_RED).unwrap();
    session
        .assign_color_material(FABRIC, BLUE, FABRIC_BLUE)
        .unwrap();
    let sizes = session.sizes_mut();
    sizes.set_cell(FABRIC, "S", dec!(1.5)).unwrap();
    sizes.set_cell(FABRIC, "M", dec!(1.8)).unwrap();
}

#[tokio::test]
async fn tee_derives_eight_lines() {
    let gateway = Arc::new(InMemoryBomGateway::new());
    let mut session = open_session(gateway.clone()).await;
    configure_tee(&mut session);

    assert_eq!(session.sizes().rows(), &[FABRIC]);
    assert_eq!(session.sizes().columns(), &["M", "S"]);
    assert!(session.completion().is_complete());

    let assembly = session.assemble();
    assert!(assembly.is_complete());
    assert_eq!(assembly.lines.len(), 8);

    let keys: HashSet<_> = assembly
        .lines
        .iter()
        .map(|l| (l.size_id, l.color_id, l.category_id))
        .collect();
    assert_eq!(keys.len(), 8, "one line per variant and category");

    let small_red = assembly.lines_for_variant(SIZE_S, RED);
    assert_eq!(small_red.len(), 2);
    assert_eq!(small_red[0].material_id, ZIPPER_Z);
    assert_eq!(small_red[0].quantity, dec!(1));
    assert_eq!(small_red[1].material_id, FABRIC_RED);
    assert_eq!(small_red[1].quantity, dec!(1.5));

    let medium_blue = assembly.lines_for_variant(SIZE_M, BLUE);
    assert_eq!(medium_blue[1].material_id, FABRIC_BLUE);
    assert_eq!(medium_blue[1].quantity, dec!(1.8));

    let outcome = session.finalize().await.expect("finalize should succeed");
    assert_eq!(outcome.assembly.lines.len(), 8);
    assert_eq!(outcome.response.common_materials, 1);
    assert_eq!(outcome.response.variation_materials, 2);
    assert_eq!(outcome.response.size_consumptions, 2);
    assert_eq!(gateway.finalize_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn duplicate_common_material_is_rejected() {
    let gateway = Arc::new(InMemoryBomGateway::new());
    let mut session = open_session(gateway).await;

    session
        .add_common_material(Some(ZIPPER), Some(ZIPPER_Z), Some(dec!(2)))
        .unwrap();
    assert_matches!(
        session.add_common_material(Some(ZIPPER), Some(ZIPPER_Z), Some(dec!(3))),
        Err(BomError::Validation(ValidationIssue::DuplicateMaterial { material_id: ZIPPER_Z }))
    );
    assert_eq!(session.common().len(), 1);
    assert_eq!(session.common().entries()[0].base_quantity, dec!(2));
}

#[tokio::test]
async fn step_one_validation_leaves_registry_untouched() {
    let gateway = Arc::new(InMemoryBomGateway::new());
    let mut session = open_session(gateway).await;

    assert_matches!(
        session.add_common_material(None, Some(ZIPPER_Z), Some(dec!(1))),
        Err(BomError::Validation(ValidationIssue::CategoryNotSelected))
    );
    assert_matches!(
        session.add_common_material(Some(ZIPPER), None, Some(dec!(1))),
        Err(BomError::Validation(ValidationIssue::MaterialNotSelected))
    );
    assert_matches!(
        session.add_common_material(Some(ZIPPER), Some(ZIPPER_Z), None),
        Err(BomError::Validation(ValidationIssue::QuantityRequired { category_id: ZIPPER }))
    );
    assert_matches!(
        session.add_common_material(Some(ZIPPER), Some(ZIPPER_Z), Some(dec!(0))),
        Err(BomError::Validation(ValidationIssue::NonPositiveQuantity { .. }))
    );
    assert_matches!(
        session.add_common_material(Some(FABRIC), Some(FABRIC_RED), Some(dec!(1))),
        Err(BomError::Validation(ValidationIssue::ColorVariableInCommonStep { category_id: FABRIC }))
    );
    assert!(session.common().is_empty());

    let lining = session
        .add_common_material(Some(LINING), Some(LINING_L), None)
        .unwrap();
    assert_eq!(lining.base_quantity, dec!(1));
}

#[tokio::test]
async fn failed_save_keeps_local_registry() {
    let gateway = Arc::new(InMemoryBomGateway::new());
    let mut session = open_session(gateway.clone()).await;
    session
        .add_common_material(Some(ZIPPER), Some(ZIPPER_Z), Some(dec!(2)))
        .unwrap();

    gateway.fail_saves(true);
    assert_matches!(
        session.save_common_materials().await,
        Err(BomError::Gateway(GatewayError::Status { status: 500, .. }))
    );
    assert_eq!(session.common().len(), 1);
    assert!(gateway.common_rows().is_empty());

    gateway.fail_saves(false);
    assert_eq!(session.save_common_materials().await.unwrap(), 1);
    assert_eq!(gateway.common_rows().len(), 1);
    assert_eq!(gateway.save_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn finalized_bom_reloads_into_new_session() {
    let gateway = Arc::new(InMemoryBomGateway::new());
    let mut session = open_session(gateway.clone()).await;
    configure_tee(&mut session);
    let original = session.finalize().await.unwrap().assembly;

    let reopened = open_session(gateway.clone()).await;
    assert_eq!(reopened.common().len(), 1);
    assert_eq!(reopened.colors().material_for(FABRIC, RED), Some(FABRIC_RED));
    assert_eq!(reopened.colors().material_for(FABRIC, BLUE), Some(FABRIC_BLUE));
    assert_eq!(reopened.sizes().quantity(FABRIC, "S"), Some(dec!(1.5)));
    assert_eq!(reopened.sizes().quantity(FABRIC, "M"), Some(dec!(1.8)));
    assert_eq!(reopened.assemble(), original);
    assert!(gateway.has_bom(PRODUCT).await.unwrap());
}

#[tokio::test]
async fn default_row_filter_only_lists_color_categories() {
    let gateway = Arc::new(InMemoryBomGateway::new());
    let mut session = open_session(gateway.clone()).await;
    configure_tee(&mut session);
    session
        .add_common_material(Some(LINING), Some(LINING_L), None)
        .unwrap();

    assert_eq!(session.sizes().rows(), &[FABRIC]);
    assert_matches!(
        session.sizes_mut().set_cell(LINING, "S", dec!(1)),
        Err(BomError::Validation(ValidationIssue::UnknownRow { category_id: LINING }))
    );
    assert_matches!(
        session.assign_color_material(LINING, RED, LINING_L),
        Err(BomError::Validation(ValidationIssue::NotColorVariable { category_id: LINING }))
    );

    let assembly = session.assemble();
    assert_eq!(assembly.missing.len(), 4);
    assert!(assembly
        .missing
        .iter()
        .all(|m| m.category_id == LINING && m.kind == MissingKind::NotInSizeMatrix));

    let mut by_size = open_with(
        gateway,
        WizardSettings::new("planner").with_row_filter(SizeMatrixRowFilter::SizeVariable),
    )
    .await;
    configure_tee(&mut by_size);
    by_size
        .add_common_material(Some(LINING), Some(LINING_L), None)
        .unwrap();
    assert_eq!(by_size.sizes().rows(), &[FABRIC, LINING]);
    by_size.sizes_mut().fill_row(LINING, dec!(0.5)).unwrap();
    let assembly = by_size.assemble();
    assert!(assembly.is_complete());
    assert_eq!(assembly.lines.len(), 12);
}

#[tokio::test]
async fn finalize_is_blocked_until_every_variant_is_covered() {
    let gateway = Arc::new(InMemoryBomGateway::new());
    let mut session = open_session(gateway.clone()).await;
    session
        .add_common_material(Some(ZIPPER), Some(ZIPPER_Z), Some(dec!(2)))
        .unwrap();
    session.assign_color_material(FABRIC, RED, FABRIC_RED).unwrap();
    session.sizes_mut().set_cell(FABRIC, "S", dec!(1.5)).unwrap();

    let err = session.finalize().await.unwrap_err();
    let report = assert_matches!(err, BomError::Incomplete(report) => report);
    let color_gaps = report
        .missing
        .iter()
        .filter(|m| m.kind == MissingKind::ColorMaterial)
        .count();
    let size_gaps = report
        .missing
        .iter()
        .filter(|m| m.kind == MissingKind::SizeQuantity)
        .count();
    assert_eq!(color_gaps, 2, "blue has no fabric in either size");
    assert_eq!(size_gaps, 1, "red M has no quantity");
    assert_eq!(gateway.finalize_calls.load(Ordering::SeqCst), 0);
    assert!(!session.in_flight().is_running(OperationKind::Finalize));
}

#[tokio::test]
async fn in_flight_finalize_rejects_second_submission() {
    let gateway = Arc::new(InMemoryBomGateway::new());
    let mut session = open_session(gateway.clone()).await;
    configure_tee(&mut session);

    let guard = session.in_flight().begin(OperationKind::Finalize).unwrap();
    assert_matches!(
        session.finalize().await,
        Err(BomError::OperationInProgress(OperationKind::Finalize))
    );
    assert_eq!(gateway.finalize_calls.load(Ordering::SeqCst), 0);

    drop(guard);
    assert!(session.finalize().await.is_ok());
}

#[tokio::test]
async fn removing_last_color_assignment_drops_matrix_row() {
    let gateway = Arc::new(InMemoryBomGateway::new());
    let mut session = open_session(gateway).await;
    session.assign_color_material(FABRIC, RED, FABRIC_RED).unwrap();
    session.sizes_mut().fill_all(dec!(2)).unwrap();
    assert_eq!(session.completion().filled, 2);

    assert_eq!(session.remove_color_material(FABRIC, RED), Some(FABRIC_RED));
    assert!(session.sizes().rows().is_empty());
    assert_eq!(session.completion().total, 0);
    assert!(session.assemble().lines.is_empty());
}

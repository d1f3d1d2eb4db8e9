mod common;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use uuid::Uuid;

use common::*;
use workorder_billing_api::{
    entities::{billing_cut, billing_cut_detail, work_order},
    errors::ServiceError,
    services::cuts::{CreateCutRequest, CutDetailRequest, CutStatus},
};

fn period() -> (NaiveDate, NaiveDate) {
    (
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
    )
}

fn cut_request(details: Vec<(Uuid, Decimal)>) -> CreateCutRequest {
    let (start, end) = period();
    CreateCutRequest {
        period_start: start,
        period_end: end,
        details: details
            .into_iter()
            .map(|(line_id, quantity)| CutDetailRequest { line_id, quantity })
            .collect(),
        spawn_child: true,
        actor_id: Uuid::new_v4(),
        request_id: None,
    }
}

/// `sum(non-void cut quantities) <= executed_total <= contracted` must
/// hold for the line after any sequence of cuts.
async fn assert_line_invariant(
    app: &TestApp,
    order_id: Uuid,
    line_id: Uuid,
    contracted: Decimal,
) {
    let cut_ids: Vec<Uuid> = billing_cut::Entity::find()
        .filter(billing_cut::Column::OrderId.eq(order_id))
        .filter(billing_cut::Column::Status.ne("void"))
        .all(app.db())
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.id)
        .collect();

    let mut cut_total = Decimal::ZERO;
    if !cut_ids.is_empty() {
        for d in billing_cut_detail::Entity::find()
            .filter(billing_cut_detail::Column::CutId.is_in(cut_ids))
            .all(app.db())
            .await
            .unwrap()
        {
            if d.service_line_id == Some(line_id) || d.order_item_id == Some(line_id) {
                cut_total += d.quantity;
            }
        }
    }

    let executed: Decimal = workorder_billing_api::entities::execution_entry::Entity::find()
        .all(app.db())
        .await
        .unwrap()
        .iter()
        .filter(|e| e.service_line_id == Some(line_id) || e.order_item_id == Some(line_id))
        .map(|e| e.quantity)
        .sum();

    assert!(
        cut_total <= executed,
        "cut total {} exceeds executed {}",
        cut_total,
        executed
    );
    assert!(
        executed <= contracted,
        "executed {} exceeds contracted {}",
        executed,
        contracted
    );
}

#[tokio::test]
async fn scenario_a_partial_cut_spawns_child() {
    let app = TestApp::new().await;
    let order = seed_work_order(app.db(), "OT-1001").await;
    let line = seed_service_line(app.db(), order.id, "Fiber splicing", dec!(100), dec!(10)).await;
    report_execution(app.db(), order.id, line.id, dec!(60), dec!(10)).await;

    // preview suggests the executed, uncut quantity
    let preview = app
        .state
        .services
        .previews
        .preview(order.id, None)
        .await
        .unwrap();
    assert_eq!(preview.len(), 1);
    assert_eq!(preview[0].suggested_quantity, dec!(60));
    assert_eq!(preview[0].suggested_amount, dec!(600.00));

    let result = app
        .state
        .services
        .cuts
        .create_cut(order.id, cut_request(vec![(line.id, dec!(60))]))
        .await
        .unwrap();

    assert_eq!(result.folio, "OT-1001-C001");
    assert_eq!(result.status, "ready_to_bill");
    assert_eq!(result.total_amount, dec!(600.00));
    assert_eq!(result.details.len(), 1);
    assert_eq!(result.details[0].quantity, dec!(60));
    assert_eq!(result.details[0].unit_price, dec!(10));

    // parent moved to partial, business status completed, quality pending
    let parent = work_order::Entity::find_by_id(order.id)
        .one(app.db())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(parent.split_status, "partial");
    assert_eq!(parent.status, "completed");
    assert_eq!(parent.quality_result.as_deref(), Some("pending"));

    // child order carries the remainder
    let child_ref = result.child_order.expect("child order expected");
    assert_eq!(child_ref.folio, "OT-1001-R1");
    assert_eq!(child_ref.split_status, "active");
    let child = app
        .state
        .services
        .work_orders
        .get_order(child_ref.id)
        .await
        .unwrap();
    assert_eq!(child.lines.len(), 1);
    assert_eq!(child.lines[0].contracted, dec!(40));
    assert_eq!(child.parent_order_id, Some(order.id));
    assert_eq!(child.split_index, 1);

    assert_line_invariant(&app, order.id, line.id, dec!(100)).await;
}

#[tokio::test]
async fn scenario_b_second_cut_exceeding_executed_is_rejected() {
    let app = TestApp::new().await;
    let order = seed_work_order(app.db(), "OT-1002").await;
    let line = seed_service_line(app.db(), order.id, "Trenching", dec!(100), dec!(5)).await;
    report_execution(app.db(), order.id, line.id, dec!(60), dec!(5)).await;

    app.state
        .services
        .cuts
        .create_cut(order.id, cut_request(vec![(line.id, dec!(60))]))
        .await
        .unwrap();

    // everything executed has been cut; a further 50 must be rejected
    let err = app
        .state
        .services
        .cuts
        .create_cut(order.id, cut_request(vec![(line.id, dec!(50))]))
        .await
        .unwrap_err();

    match &err {
        ServiceError::OverCut {
            concept,
            requested,
            available,
        } => {
            assert_eq!(concept, "Trenching");
            assert_eq!(*requested, dec!(50));
            assert_eq!(*available, dec!(0));
        }
        other => panic!("expected OverCut, got {:?}", other),
    }
    // the message names the concept and the violated bound
    assert!(err.to_string().contains("Trenching"));
    assert!(err.to_string().contains("50"));

    let cut_count = billing_cut::Entity::find()
        .filter(billing_cut::Column::OrderId.eq(order.id))
        .count(app.db())
        .await
        .unwrap();
    assert_eq!(cut_count, 1);
}

#[tokio::test]
async fn scenario_c_full_cut_closes_order_without_child() {
    let app = TestApp::new().await;
    let order = seed_work_order(app.db(), "OT-1003").await;
    let line = seed_service_line(app.db(), order.id, "Cabling", dec!(100), dec!(8)).await;
    report_execution(app.db(), order.id, line.id, dec!(100), dec!(8)).await;

    let result = app
        .state
        .services
        .cuts
        .create_cut(order.id, cut_request(vec![(line.id, dec!(100))]))
        .await
        .unwrap();

    assert!(result.child_order.is_none());
    let parent = work_order::Entity::find_by_id(order.id)
        .one(app.db())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(parent.split_status, "closed");

    let children = work_order::Entity::find()
        .filter(work_order::Column::ParentOrderId.eq(order.id))
        .count(app.db())
        .await
        .unwrap();
    assert_eq!(children, 0);

    assert_line_invariant(&app, order.id, line.id, dec!(100)).await;
}

#[tokio::test]
async fn scenario_d_child_contains_only_lines_with_remainder() {
    let app = TestApp::new().await;
    let order = seed_work_order(app.db(), "OT-1004").await;
    let line_a = seed_service_line(app.db(), order.id, "Splicing", dec!(100), dec!(10)).await;
    let line_b = seed_service_line(app.db(), order.id, "Testing", dec!(50), dec!(20)).await;
    report_execution(app.db(), order.id, line_a.id, dec!(70), dec!(10)).await;
    report_execution(app.db(), order.id, line_b.id, dec!(50), dec!(20)).await;

    let result = app
        .state
        .services
        .cuts
        .create_cut(
            order.id,
            cut_request(vec![(line_a.id, dec!(70)), (line_b.id, dec!(50))]),
        )
        .await
        .unwrap();

    // line A keeps a remainder of 30; line B is fully billed
    let child_ref = result.child_order.expect("child order expected");
    let child = app
        .state
        .services
        .work_orders
        .get_order(child_ref.id)
        .await
        .unwrap();
    assert_eq!(child.lines.len(), 1);
    assert_eq!(child.lines[0].concept, "Splicing");
    assert_eq!(child.lines[0].contracted, dec!(30));
}

#[tokio::test]
async fn scenario_e_zero_quantity_rows_are_dropped() {
    let app = TestApp::new().await;
    let order = seed_work_order(app.db(), "OT-1005").await;
    let line_a = seed_service_line(app.db(), order.id, "Splicing", dec!(100), dec!(10)).await;
    let line_b = seed_service_line(app.db(), order.id, "Testing", dec!(50), dec!(20)).await;
    report_execution(app.db(), order.id, line_a.id, dec!(20), dec!(10)).await;
    report_execution(app.db(), order.id, line_b.id, dec!(10), dec!(20)).await;

    let result = app
        .state
        .services
        .cuts
        .create_cut(
            order.id,
            cut_request(vec![(line_a.id, dec!(0)), (line_b.id, dec!(20))]),
        )
        .await
        .unwrap();

    assert_eq!(result.details.len(), 1);
    assert_eq!(result.details[0].concept, "Testing");
    assert_eq!(result.details[0].quantity, dec!(20));
}

#[tokio::test]
async fn empty_cut_is_rejected() {
    let app = TestApp::new().await;
    let order = seed_work_order(app.db(), "OT-1006").await;
    let line = seed_service_line(app.db(), order.id, "Splicing", dec!(100), dec!(10)).await;
    report_execution(app.db(), order.id, line.id, dec!(50), dec!(10)).await;

    let err = app
        .state
        .services
        .cuts
        .create_cut(order.id, cut_request(vec![(line.id, dec!(0))]))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::EmptyCut));

    let err = app
        .state
        .services
        .cuts
        .create_cut(order.id, cut_request(vec![]))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::EmptyCut));
}

#[tokio::test]
async fn foreign_line_is_rejected() {
    let app = TestApp::new().await;
    let order = seed_work_order(app.db(), "OT-1007").await;
    seed_service_line(app.db(), order.id, "Splicing", dec!(100), dec!(10)).await;
    let other = seed_work_order(app.db(), "OT-1008").await;
    let foreign = seed_service_line(app.db(), other.id, "Other", dec!(10), dec!(1)).await;

    let err = app
        .state
        .services
        .cuts
        .create_cut(order.id, cut_request(vec![(foreign.id, dec!(5))]))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidInput(_)));
}

#[tokio::test]
async fn over_contract_is_rejected_even_when_executed_allows_it() {
    let app = TestApp::new().await;
    let order = seed_work_order(app.db(), "OT-1009").await;
    let line = seed_service_line(app.db(), order.id, "Splicing", dec!(100), dec!(10)).await;
    // over-reported ledger (upstream anomaly): executed beyond contracted
    report_execution(app.db(), order.id, line.id, dec!(120), dec!(10)).await;

    let err = app
        .state
        .services
        .cuts
        .create_cut(order.id, cut_request(vec![(line.id, dec!(110))]))
        .await
        .unwrap_err();

    match err {
        ServiceError::OverContract {
            requested,
            contracted,
            ..
        } => {
            assert_eq!(requested, dec!(110));
            assert_eq!(contracted, dec!(100));
        }
        other => panic!("expected OverContract, got {:?}", other),
    }
}

#[tokio::test]
async fn failed_validation_leaves_no_partial_state() {
    let app = TestApp::new().await;
    let order = seed_work_order(app.db(), "OT-1010").await;
    let line_a = seed_service_line(app.db(), order.id, "Splicing", dec!(100), dec!(10)).await;
    let line_b = seed_service_line(app.db(), order.id, "Testing", dec!(50), dec!(20)).await;
    report_execution(app.db(), order.id, line_a.id, dec!(40), dec!(10)).await;
    report_execution(app.db(), order.id, line_b.id, dec!(10), dec!(20)).await;

    // first row is fine, second over-cuts: nothing may persist
    let err = app
        .state
        .services
        .cuts
        .create_cut(
            order.id,
            cut_request(vec![(line_a.id, dec!(40)), (line_b.id, dec!(30))]),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::OverCut { .. }));

    let cuts = billing_cut::Entity::find().count(app.db()).await.unwrap();
    assert_eq!(cuts, 0);
    let details = billing_cut_detail::Entity::find()
        .count(app.db())
        .await
        .unwrap();
    assert_eq!(details, 0);
    let children = work_order::Entity::find()
        .filter(work_order::Column::ParentOrderId.eq(order.id))
        .count(app.db())
        .await
        .unwrap();
    assert_eq!(children, 0);

    let untouched = work_order::Entity::find_by_id(order.id)
        .one(app.db())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(untouched.split_status, "active");
    assert_eq!(untouched.status, "in_progress");
    assert_eq!(untouched.version, 1);
}

#[tokio::test]
async fn cut_folios_are_sequential_and_unique() {
    let app = TestApp::new().await;
    let order = seed_work_order(app.db(), "OT-1011").await;
    let line = seed_service_line(app.db(), order.id, "Splicing", dec!(100), dec!(10)).await;
    report_execution(app.db(), order.id, line.id, dec!(30), dec!(10)).await;

    let first = app
        .state
        .services
        .cuts
        .create_cut(order.id, cut_request(vec![(line.id, dec!(20))]))
        .await
        .unwrap();

    report_execution(app.db(), order.id, line.id, dec!(30), dec!(10)).await;
    let second = app
        .state
        .services
        .cuts
        .create_cut(order.id, cut_request(vec![(line.id, dec!(40))]))
        .await
        .unwrap();

    assert_eq!(first.folio, "OT-1011-C001");
    assert_eq!(second.folio, "OT-1011-C002");
    assert!(first.folio < second.folio);
}

#[tokio::test]
async fn duplicate_request_id_replays_the_first_cut() {
    let app = TestApp::new().await;
    let order = seed_work_order(app.db(), "OT-1012").await;
    let line = seed_service_line(app.db(), order.id, "Splicing", dec!(100), dec!(10)).await;
    report_execution(app.db(), order.id, line.id, dec!(60), dec!(10)).await;

    let request_id = Uuid::new_v4();
    let mut request = cut_request(vec![(line.id, dec!(60))]);
    request.request_id = Some(request_id);
    let first = app
        .state
        .services
        .cuts
        .create_cut(order.id, request)
        .await
        .unwrap();

    // the same submission again (double-click / client retry)
    let mut request = cut_request(vec![(line.id, dec!(60))]);
    request.request_id = Some(request_id);
    let second = app
        .state
        .services
        .cuts
        .create_cut(order.id, request)
        .await
        .unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(first.folio, second.folio);
    let cut_count = billing_cut::Entity::find().count(app.db()).await.unwrap();
    assert_eq!(cut_count, 1);
}

#[tokio::test]
async fn cut_status_transitions_follow_the_table() {
    let app = TestApp::new().await;
    let order = seed_work_order(app.db(), "OT-1013").await;
    let line = seed_service_line(app.db(), order.id, "Splicing", dec!(100), dec!(10)).await;
    report_execution(app.db(), order.id, line.id, dec!(100), dec!(10)).await;

    let cut = app
        .state
        .services
        .cuts
        .create_cut(order.id, cut_request(vec![(line.id, dec!(100))]))
        .await
        .unwrap();
    assert_eq!(cut.status, "ready_to_bill");

    let billed = app
        .state
        .services
        .cuts
        .update_status(cut.id, CutStatus::Billed)
        .await
        .unwrap();
    assert_eq!(billed.status, "billed");

    // billed is terminal
    let err = app
        .state
        .services
        .cuts
        .update_status(cut.id, CutStatus::Void)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::IllegalTransition { .. }));

    // same-status requests are rejected too
    let err = app
        .state
        .services
        .cuts
        .update_status(cut.id, CutStatus::Billed)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::IllegalTransition { .. }));
}

#[tokio::test]
async fn voiding_a_cut_does_not_reopen_the_parent() {
    let app = TestApp::new().await;
    let order = seed_work_order(app.db(), "OT-1014").await;
    let line = seed_service_line(app.db(), order.id, "Splicing", dec!(100), dec!(10)).await;
    report_execution(app.db(), order.id, line.id, dec!(60), dec!(10)).await;

    let cut = app
        .state
        .services
        .cuts
        .create_cut(order.id, cut_request(vec![(line.id, dec!(60))]))
        .await
        .unwrap();
    let child_ref = cut.child_order.clone().expect("child order expected");

    let voided = app
        .state
        .services
        .cuts
        .update_status(cut.id, CutStatus::Void)
        .await
        .unwrap();
    assert_eq!(voided.status, "void");

    // parent split status and the spawned child are untouched
    let parent = work_order::Entity::find_by_id(order.id)
        .one(app.db())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(parent.split_status, "partial");
    let child = work_order::Entity::find_by_id(child_ref.id)
        .one(app.db())
        .await
        .unwrap();
    assert!(child.is_some());

    // but the voided quantity becomes cuttable again
    let preview = app
        .state
        .services
        .previews
        .preview(order.id, None)
        .await
        .unwrap();
    assert_eq!(preview[0].cut_previously, dec!(0));
    assert_eq!(preview[0].suggested_quantity, dec!(60));
}

#[tokio::test]
async fn period_must_be_ordered() {
    let app = TestApp::new().await;
    let order = seed_work_order(app.db(), "OT-1015").await;
    let line = seed_service_line(app.db(), order.id, "Splicing", dec!(100), dec!(10)).await;
    report_execution(app.db(), order.id, line.id, dec!(10), dec!(10)).await;

    let (start, end) = period();
    let request = CreateCutRequest {
        period_start: end,
        period_end: start,
        details: vec![CutDetailRequest {
            line_id: line.id,
            quantity: dec!(10),
        }],
        spawn_child: true,
        actor_id: Uuid::new_v4(),
        request_id: None,
    };
    let err = app
        .state
        .services
        .cuts
        .create_cut(order.id, request)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidInput(_)));
}

#[tokio::test]
async fn list_cuts_returns_all_cuts_of_the_order() {
    let app = TestApp::new().await;
    let order = seed_work_order(app.db(), "OT-1016").await;
    let line = seed_service_line(app.db(), order.id, "Splicing", dec!(100), dec!(10)).await;
    report_execution(app.db(), order.id, line.id, dec!(50), dec!(10)).await;

    app.state
        .services
        .cuts
        .create_cut(order.id, cut_request(vec![(line.id, dec!(20))]))
        .await
        .unwrap();
    report_execution(app.db(), order.id, line.id, dec!(10), dec!(10)).await;
    app.state
        .services
        .cuts
        .create_cut(order.id, cut_request(vec![(line.id, dec!(40))]))
        .await
        .unwrap();

    let cuts = app.state.services.cuts.list_cuts(order.id).await.unwrap();
    assert_eq!(cuts.len(), 2);
    assert_eq!(cuts[0].folio, "OT-1016-C001");
    assert_eq!(cuts[1].folio, "OT-1016-C002");

    let missing = app
        .state
        .services
        .cuts
        .list_cuts(Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(missing, ServiceError::NotFound(_)));
}

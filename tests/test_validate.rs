mod common;

use strategy_flow::model::{Asset, Protocol, Strategy};
use strategy_flow::validate::{ValidationError, validate};

use common::*;

#[test]
fn scenario_strategy_is_valid() {
    let report = validate(&restake_lend_borrow(0.5));
    assert!(report.is_valid, "unexpected errors: {:?}", report.errors);
    assert!(report.errors.is_empty());
}

#[test]
fn two_block_cycle_is_illegal() {
    let strategy = Strategy::new(
        vec![
            input("input", Asset::WETH, 1.0),
            lend("a", Protocol::AaveV3, Asset::WETH),
            lend("b", Protocol::AaveV3, Asset::WETH),
        ],
        vec![
            edge("e0", "input", "a", 100.0),
            edge("e1", "a", "b", 100.0),
            edge("e2", "b", "a", 100.0),
        ],
    );
    let report = validate(&strategy);
    assert!(!report.is_valid);
    assert!(report.prevents_execution());
    assert!(report.errors.iter().any(|e| matches!(
        e,
        ValidationError::IllegalCycle { block_ids } if block_ids.len() == 2
            && block_ids.contains(&"a".to_string())
            && block_ids.contains(&"b".to_string())
    )));
}

#[test]
fn cycle_through_loop_block_is_accepted() {
    let strategy = Strategy::new(
        vec![
            input("input", Asset::USDC, 1000.0),
            lend("lend", Protocol::AaveV3, Asset::USDC),
            borrow("borrow", Asset::USDC, 0.5),
            looped("loop", 3),
        ],
        vec![
            edge("e1", "input", "lend", 100.0),
            edge("e2", "lend", "borrow", 100.0),
            edge("e3", "borrow", "loop", 100.0),
            edge("back", "loop", "lend", 100.0),
        ],
    );
    let report = validate(&strategy);
    assert!(report.is_valid, "unexpected errors: {:?}", report.errors);
}

#[test]
fn two_loops_in_one_cycle_are_nested() {
    let strategy = Strategy::new(
        vec![
            input("input", Asset::USDC, 1000.0),
            lend("lend", Protocol::AaveV3, Asset::USDC),
            looped("l1", 2),
            looped("l2", 2),
        ],
        vec![
            edge("e1", "input", "lend", 100.0),
            edge("e2", "lend", "l1", 100.0),
            edge("e3", "l1", "l2", 100.0),
            edge("e4", "l2", "lend", 100.0),
        ],
    );
    let report = validate(&strategy);
    assert!(
        report
            .errors
            .iter()
            .any(|e| matches!(e, ValidationError::NestedLoop { .. }))
    );
}

#[test]
fn missing_and_duplicate_inputs_are_reported() {
    let none = Strategy::new(vec![lend("a", Protocol::AaveV3, Asset::WETH)], vec![]);
    assert!(
        validate(&none)
            .errors
            .contains(&ValidationError::MissingInput { count: 0 })
    );

    let two = Strategy::new(
        vec![input("a", Asset::ETH, 1.0), input("b", Asset::ETH, 1.0)],
        vec![],
    );
    assert!(
        validate(&two)
            .errors
            .contains(&ValidationError::MissingInput { count: 2 })
    );
}

#[test]
fn dangling_edges_and_bad_shares_are_reported() {
    let strategy = Strategy::new(
        vec![
            input("input", Asset::ETH, 1.0),
            stake("stake", Protocol::Lido),
        ],
        vec![
            edge("e1", "input", "stake", 0.0),
            edge("e2", "stake", "ghost", 50.0),
        ],
    );
    let errors = validate(&strategy).errors;
    assert!(errors.contains(&ValidationError::InvalidFlowPercent {
        edge_id: "e1".into(),
        value: 0.0,
    }));
    assert!(errors.contains(&ValidationError::DanglingEdge {
        edge_id: "e2".into(),
        block_id: "ghost".into(),
    }));
}

#[test]
fn over_allocation_and_unreachable_blocks_are_reported() {
    let strategy = Strategy::new(
        vec![
            input("input", Asset::WETH, 1.0),
            lend("a", Protocol::AaveV3, Asset::WETH),
            lend("b", Protocol::Spark, Asset::WETH),
            lend("orphan", Protocol::CompoundV3, Asset::WETH),
        ],
        vec![
            edge("e1", "input", "a", 70.0),
            edge("e2", "input", "b", 40.0),
        ],
    );
    let errors = validate(&strategy).errors;
    assert!(errors.iter().any(|e| matches!(
        e,
        ValidationError::OverAllocatedFlow { block_id, sum } if block_id == "input" && (*sum - 110.0).abs() < 1e-9
    )));
    assert!(errors.contains(&ValidationError::UnreachableBlock {
        block_id: "orphan".into(),
    }));
}

#[test]
fn out_of_range_ltv_is_an_invalid_param() {
    let errors = validate(&restake_lend_borrow(1.2)).errors;
    assert!(errors.iter().any(|e| matches!(
        e,
        ValidationError::InvalidParams { block_id, field, .. } if block_id == "borrow" && field == "target_ltv"
    )));
}

#[test]
fn errors_serialize_with_a_kind_tag() {
    let json = serde_json::to_value(ValidationError::SelfLoop {
        block_id: "a".into(),
    })
    .unwrap();
    assert_eq!(json["kind"], "self_loop");
    assert_eq!(json["block_id"], "a");
}

#[test]
fn edges_into_the_input_block_are_rejected() {
    let strategy = Strategy::new(
        vec![
            input("input", Asset::WETH, 1.0),
            lend("lend", Protocol::AaveV3, Asset::WETH),
            looped("loop", 3),
        ],
        vec![
            edge("e1", "input", "lend", 100.0),
            edge("e2", "lend", "loop", 100.0),
            edge("back", "loop", "input", 100.0),
        ],
    );
    let report = validate(&strategy);
    assert!(!report.is_valid);
    assert!(!report.prevents_execution());
    assert_eq!(
        report.errors,
        vec![ValidationError::EdgeIntoInput {
            edge_id: "back".into(),
            block_id: "input".into(),
        }]
    );
}

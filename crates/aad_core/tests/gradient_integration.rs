//! End-to-end gradient tests through the public session API.
//!
//! Covers the reference scenarios, finite-difference checks of every
//! operator, operand-order properties and the chain-rule invariant.

use aad_core::operator::partial_derivative;
use aad_core::{
    AadError, AadSession, DifferentiableVariable, Gradient, NodeId, Operand, OperatorType,
    RandomVariable,
};
use approx::assert_relative_eq;
use proptest::prelude::*;

fn sensitivity(gradient: &Gradient, id: NodeId) -> f64 {
    gradient
        .get(id)
        .and_then(RandomVariable::as_scalar)
        .expect("deterministic sensitivity")
}

fn scalar_value(variable: &DifferentiableVariable<'_>) -> f64 {
    variable.value().as_scalar().expect("deterministic value")
}

// =============================================================================
// Reference scenarios
// =============================================================================

#[test]
fn test_scenario_product_plus_square() {
    let session = AadSession::new();
    let x = session.create_leaf(2.0).unwrap();
    let y = session.create_leaf(3.0).unwrap();
    let z = x.mult(y).unwrap().add(x.squared().unwrap()).unwrap();

    assert_relative_eq!(scalar_value(&z), 10.0);
    let gradient = session.gradient(&z).unwrap();
    assert_eq!(gradient.ids(), vec![x.id(), y.id()]);
    assert_relative_eq!(sensitivity(&gradient, x.id()), 7.0);
    assert_relative_eq!(sensitivity(&gradient, y.id()), 2.0);
}

#[test]
fn test_scenario_exp_log_round_trip() {
    let session = AadSession::new();
    let x = session.create_leaf(1.0).unwrap();
    let z = x.exp().unwrap().log().unwrap();

    assert_relative_eq!(scalar_value(&z), 1.0, epsilon = 1e-15);
    let gradient = session.gradient(&z).unwrap();
    assert_eq!(gradient.len(), 1);
    assert_relative_eq!(sensitivity(&gradient, x.id()), 1.0, epsilon = 1e-15);
}

#[test]
fn test_scenario_division_by_constant() {
    let session = AadSession::new();
    let x = session.create_leaf(4.0).unwrap();
    let c = session.create_constant(2.0).unwrap();
    let z = x.div(c).unwrap();

    assert_relative_eq!(scalar_value(&z), 2.0);
    let gradient = session.gradient(&z).unwrap();
    assert_eq!(gradient.ids(), vec![x.id()]);
    assert_relative_eq!(sensitivity(&gradient, x.id()), 0.5);
    assert!(gradient.get(c.id()).is_none());
}

// =============================================================================
// Finite differences
// =============================================================================

fn unary_slope(operator: OperatorType, x: f64) -> f64 {
    let session = AadSession::new();
    let leaf = session.create_leaf(x).unwrap();
    let output = session.apply(operator, [Operand::from(leaf)]).unwrap();
    sensitivity(&session.gradient(&output).unwrap(), leaf.id())
}

fn unary_value(operator: OperatorType, x: f64) -> f64 {
    let session = AadSession::new();
    let leaf = session.create_leaf(x).unwrap();
    scalar_value(&session.apply(operator, [Operand::from(leaf)]).unwrap())
}

fn binary_slopes(operator: OperatorType, a: f64, b: f64) -> (f64, f64) {
    let session = AadSession::new();
    let x = session.create_leaf(a).unwrap();
    let y = session.create_leaf(b).unwrap();
    let output = session.apply(operator, [Operand::from(x), Operand::from(y)]).unwrap();
    let gradient = session.gradient(&output).unwrap();
    (sensitivity(&gradient, x.id()), sensitivity(&gradient, y.id()))
}

fn binary_value(operator: OperatorType, a: f64, b: f64) -> f64 {
    let session = AadSession::new();
    let x = session.create_leaf(a).unwrap();
    let y = session.create_leaf(b).unwrap();
    scalar_value(&session.apply(operator, [Operand::from(x), Operand::from(y)]).unwrap())
}

#[test]
fn test_unary_operators_match_central_differences() {
    let h = 1e-6;
    for operator in OperatorType::ALL.iter().copied().filter(|op| op.arity() == 1) {
        for x in [0.3, 1.1, 2.7] {
            let numeric = (unary_value(operator, x + h) - unary_value(operator, x - h)) / (2.0 * h);
            assert_relative_eq!(unary_slope(operator, x), numeric, epsilon = 1e-6, max_relative = 1e-6);
        }
    }
}

#[test]
fn test_binary_operators_match_central_differences() {
    let h = 1e-6;
    for operator in OperatorType::ALL.iter().copied().filter(|op| op.arity() == 2) {
        for (a, b) in [(0.5, 1.5), (2.0, -0.7), (-1.2, 3.4)] {
            let (da, db) = binary_slopes(operator, a, b);
            let numeric_a = (binary_value(operator, a + h, b) - binary_value(operator, a - h, b)) / (2.0 * h);
            let numeric_b = (binary_value(operator, a, b + h) - binary_value(operator, a, b - h)) / (2.0 * h);
            assert_relative_eq!(da, numeric_a, epsilon = 1e-6, max_relative = 1e-6);
            assert_relative_eq!(db, numeric_b, epsilon = 1e-6, max_relative = 1e-6);
        }
    }
}

#[test]
fn test_pathwise_sensitivities() {
    let session = AadSession::new();
    let x = session
        .create_leaf(RandomVariable::new(0.0, vec![0.5, 1.0, 2.0]).unwrap())
        .unwrap();
    let strike = RandomVariable::deterministic(1.5);
    let z = x.squared().unwrap().mult(&strike).unwrap();

    let gradient = session.gradient(&z).unwrap();
    let dz = gradient.get(x.id()).unwrap();
    assert_eq!(dz.size(), 3);
    for (slope, x) in dz.realizations().iter().zip([0.5, 1.0, 2.0]) {
        assert_relative_eq!(*slope, 3.0 * x, epsilon = 1e-15);
    }
}

// =============================================================================
// Operand order
// =============================================================================

#[test]
fn test_add_and_mult_commute_in_value() {
    let session = AadSession::new();
    let a = session.create_leaf(1.7).unwrap();
    let b = session.create_leaf(-0.4).unwrap();

    for operator in [OperatorType::Add, OperatorType::Mult] {
        let ab = session.apply(operator, [Operand::from(a), Operand::from(b)]).unwrap();
        let ba = session.apply(operator, [Operand::from(b), Operand::from(a)]).unwrap();
        assert_eq!(ab.value(), ba.value());

        let gab = session.gradient(&ab).unwrap();
        let gba = session.gradient(&ba).unwrap();
        assert_eq!(gab.ids(), vec![a.id(), b.id()]);
        assert_eq!(gba.ids(), vec![b.id(), a.id()]);
        assert_eq!(sensitivity(&gab, a.id()), sensitivity(&gba, a.id()));
        assert_eq!(sensitivity(&gab, b.id()), sensitivity(&gba, b.id()));
    }
}

#[test]
fn test_sub_and_div_respect_argument_order() {
    let session = AadSession::new();
    let a = session.create_leaf(3.0).unwrap();
    let b = session.create_leaf(2.0).unwrap();

    let ab = a.sub(b).unwrap();
    let ba = b.sub(a).unwrap();
    assert_ne!(ab.value(), ba.value());
    let g = session.gradient(&ab).unwrap();
    assert_eq!((sensitivity(&g, a.id()), sensitivity(&g, b.id())), (1.0, -1.0));
    let g = session.gradient(&ba).unwrap();
    assert_eq!((sensitivity(&g, a.id()), sensitivity(&g, b.id())), (-1.0, 1.0));

    let ab = a.div(b).unwrap();
    let ba = b.div(a).unwrap();
    assert_ne!(ab.value(), ba.value());
    let g = session.gradient(&ab).unwrap();
    assert_relative_eq!(sensitivity(&g, a.id()), 0.5);
    assert_relative_eq!(sensitivity(&g, b.id()), -0.75);
    let g = session.gradient(&ba).unwrap();
    assert_relative_eq!(sensitivity(&g, a.id()), -2.0 / 9.0);
    assert_relative_eq!(sensitivity(&g, b.id()), 1.0 / 3.0);
}

// =============================================================================
// Leaf discovery
// =============================================================================

#[test]
fn test_late_leaves_and_unused_leaves() {
    let session = AadSession::new();
    let unused = session.create_leaf(5.0).unwrap();
    let x = session.create_leaf(0.8).unwrap();
    let partial = x.cos().unwrap().mult(3.0).unwrap();
    // Leaf recorded after intermediates already exist.
    let y = session.create_leaf(1.5).unwrap();
    let z = partial.add(y.squared().unwrap()).unwrap().add(x).unwrap();

    let gradient = session.gradient(&z).unwrap();
    assert_eq!(gradient.ids(), vec![x.id(), y.id()]);
    assert!(gradient.get(unused.id()).is_none());
    assert_relative_eq!(sensitivity(&gradient, x.id()), -3.0 * 0.8_f64.sin() + 1.0, epsilon = 1e-14);
    assert_relative_eq!(sensitivity(&gradient, y.id()), 3.0, epsilon = 1e-14);
}

#[test]
fn test_gradient_of_unrelated_output_is_empty() {
    let session = AadSession::new();
    let _x = session.create_leaf(1.0).unwrap();
    let c = session.create_constant(2.0).unwrap();
    let z = c.exp().unwrap();

    let gradient = session.gradient(&z).unwrap();
    assert!(gradient.is_empty());
}

#[test]
fn test_node_lookup_out_of_range() {
    let session = AadSession::new();
    session.create_leaf(1.0).unwrap();
    assert_eq!(
        session.node(NodeId(9)).unwrap_err(),
        AadError::OutOfRange { id: 9, len: 1 }
    );
}

// =============================================================================
// Properties
// =============================================================================

fn chain_rule_holds(session: &AadSession, output: &DifferentiableVariable<'_>) -> bool {
    let adjoints = session.adjoints(output).unwrap();
    session.with_tape(|tape| {
        (0..output.id().index()).map(NodeId).all(|p| {
            let dependents: Vec<_> = tape
                .iter()
                .take(output.id().index() + 1)
                .filter(|node| node.parent_ids().contains(&p))
                .collect();
            if dependents.is_empty() {
                return true;
            }
            let total: f64 = dependents
                .iter()
                .map(|node| {
                    let partial = partial_derivative(tape, node.id(), p).unwrap();
                    let omega = adjoints.get(node.id()).unwrap();
                    partial.mult(&omega).unwrap().as_scalar().unwrap()
                })
                .sum();
            let expected = adjoints.get(p).unwrap().as_scalar().unwrap();
            (total - expected).abs() <= 1e-9 * (1.0 + expected.abs())
        })
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn test_chain_rule_consistency(
        x in 0.1f64..3.0,
        y in 0.1f64..3.0,
        c in -2.0f64..2.0,
    ) {
        let session = AadSession::new();
        let x = session.create_leaf(x).unwrap();
        let y = session.create_leaf(y).unwrap();
        let a = x.mult(y).unwrap().add(c).unwrap();
        let b = a.sin().unwrap().div(y.sqrt().unwrap()).unwrap();
        let z = b.sub(x.log().unwrap()).unwrap().mult(a.exp().unwrap()).unwrap();

        prop_assert!(chain_rule_holds(&session, &z));
    }

    #[test]
    fn test_leaves_reported_once(
        count in 1usize..8,
        repeats in 1usize..4,
    ) {
        let session = AadSession::new();
        let leaves: Vec<_> = (0..count)
            .map(|i| session.create_leaf(1.0 + i as f64).unwrap())
            .collect();
        let mut total = leaves[0];
        for _ in 0..repeats {
            for leaf in &leaves {
                total = total.add(leaf).unwrap();
            }
        }

        let gradient = session.gradient(&total).unwrap();
        let ids: Vec<NodeId> = leaves.iter().map(|leaf| leaf.id()).collect();
        prop_assert_eq!(gradient.ids(), ids);
        prop_assert_eq!(sensitivity(&gradient, leaves[0].id()), (repeats + 1) as f64);
        for leaf in &leaves[1..] {
            prop_assert_eq!(sensitivity(&gradient, leaf.id()), repeats as f64);
        }
    }
}

//! End-to-end scenarios for the linear system: widget-style layout chains,
//! priority arbitration between soft pins, incremental removal.

use proptest::prelude::*;
use tableau_solver::{ConstraintRef, Equation, LinearSystem, Row, SolveError, Strength};

const TOLERANCE: f32 = 0.01;

fn assert_value(system: &LinearSystem, name: &str, variable: tableau_solver::VarId, expected: f32) {
    let actual = system.value_of(variable).unwrap();
    assert!(
        (actual - expected).abs() < TOLERANCE,
        "{name} = {actual}, expected {expected}\n{system}"
    );
}

/// `var = value` as a required equality.
fn pin(system: &mut LinearSystem, name: &str, value: f32) {
    let variable = system.variable_named(name);
    system
        .add_equation(&Equation::new().var(variable).equals().plus(value))
        .unwrap();
}

/// `var = value` as a soft preference.
fn prefer(
    system: &mut LinearSystem,
    name: &str,
    value: f32,
    strength: Strength,
) -> ConstraintRef {
    let variable = system.variable_named(name);
    system
        .add_equation(
            &Equation::new()
                .var(variable)
                .equals()
                .plus(value)
                .with_strength(strength),
        )
        .unwrap()
        .unwrap()
}

#[test]
fn single_window_edges() {
    let mut system = LinearSystem::new();
    pin(&mut system, "W3.left", 0.0);
    pin(&mut system, "W3.right", 600.0);
    system.minimize().unwrap();
    let left = system.variable_named("W3.left");
    let right = system.variable_named("W3.right");
    assert_value(&system, "W3.left", left, 0.0);
    assert_value(&system, "W3.right", right, 600.0);
}

#[test]
fn attached_widget_follows_window() {
    let mut system = LinearSystem::new();
    pin(&mut system, "W3.left", 0.0);
    pin(&mut system, "W3.right", 600.0);
    let w3_left = system.variable_named("W3.left");
    let w4_left = system.variable_named("W4.left");
    system
        .add_equation(&Equation::new().var(w4_left).equals().var(w3_left))
        .unwrap();
    system.minimize().unwrap();
    assert_value(&system, "W4.left", w4_left, 0.0);
}

#[test]
fn strongest_pin_wins_under_rotation() {
    // Three soft pins on the same variable at rotating strengths; the pin
    // carrying the highest strength must win every round.
    let mut system = LinearSystem::new();
    for i in 0..3u8 {
        system.reset();
        prefer(&mut system, "A", 10.0, Strength::new(i % 3));
        prefer(&mut system, "A", 100.0, Strength::new((i + 1) % 3));
        prefer(&mut system, "A", 1000.0, Strength::new((i + 2) % 3));
        system.minimize().unwrap();
        let a = system.variable_named("A");
        let expected = match i {
            0 => 1000.0,
            1 => 100.0,
            _ => 10.0,
        };
        assert_value(&system, "A", a, expected);
    }
}

#[test]
fn four_level_priority_arbitration() {
    // b and zero pinned hard-ish at HIGH; MEDIUM bounds c below b - 10 and a
    // below c; LOW centers a between zero and c; the weakest pins pull a and
    // c toward unreachable targets.
    let mut system = LinearSystem::new();
    prefer(&mut system, "b", 100.0, Strength::HIGH);
    prefer(&mut system, "zero", 0.0, Strength::HIGH);
    prefer(&mut system, "a", 300.0, Strength::NONE);
    prefer(&mut system, "c", 200.0, Strength::NONE);

    let a = system.variable_named("a");
    let b = system.variable_named("b");
    let c = system.variable_named("c");
    let zero = system.variable_named("zero");

    system
        .add_equation(
            &Equation::new()
                .var(c)
                .less_than_or_equal()
                .var(b)
                .minus(10.0)
                .with_strength(Strength::MEDIUM),
        )
        .unwrap();
    system
        .add_equation(
            &Equation::new()
                .var(a)
                .less_than_or_equal()
                .var(c)
                .with_strength(Strength::MEDIUM),
        )
        .unwrap();
    system
        .add_equation(
            &Equation::new()
                .var(a)
                .minus_var(zero)
                .equals()
                .var(c)
                .minus_var(a)
                .with_strength(Strength::LOW),
        )
        .unwrap();

    system.minimize().unwrap();
    assert_value(&system, "zero", zero, 0.0);
    assert_value(&system, "a", a, 45.0);
    assert_value(&system, "b", b, 100.0);
    assert_value(&system, "c", c, 90.0);
}

#[test]
fn min_max_band_with_centering() {
    // A window R holds widget A (wanting a width between 150 and 200,
    // centered) and widget B (fixed width 300, centered). The window wraps
    // to B's width, and A settles mid-band.
    let mut system = LinearSystem::new();
    pin(&mut system, "Rl", 0.0);

    let rl = system.variable_named("Rl");
    let rr = system.variable_named("Rr");
    let al = system.variable_named("Al");
    let ar = system.variable_named("Ar");
    let bl = system.variable_named("Bl");
    let br = system.variable_named("Br");

    system
        .add_equation(&Equation::new().var(br).equals().var(bl).plus(300.0))
        .unwrap();
    system
        .add_equation(
            &Equation::new()
                .var(al)
                .equals()
                .var(rl)
                .with_strength(Strength::LOW),
        )
        .unwrap();
    system
        .add_equation(
            &Equation::new()
                .var(ar)
                .equals()
                .var(rr)
                .with_strength(Strength::LOW),
        )
        .unwrap();
    system
        .add_equation(
            &Equation::new()
                .var(ar)
                .greater_than_or_equal()
                .var(al)
                .plus(150.0)
                .with_strength(Strength::MEDIUM),
        )
        .unwrap();
    system
        .add_equation(
            &Equation::new()
                .var(ar)
                .less_than_or_equal()
                .var(al)
                .plus(200.0)
                .with_strength(Strength::MEDIUM),
        )
        .unwrap();
    system
        .add_equation(&Equation::new().var(rr).greater_than_or_equal().var(ar))
        .unwrap();
    system
        .add_equation(&Equation::new().var(rr).greater_than_or_equal().var(br))
        .unwrap();
    // centering: Al - Rl = Rr - Ar, Bl - Rl = Rr - Br
    system
        .add_equation(
            &Equation::new()
                .var(al)
                .minus_var(rl)
                .equals()
                .var(rr)
                .minus_var(ar),
        )
        .unwrap();
    system
        .add_equation(
            &Equation::new()
                .var(bl)
                .minus_var(rl)
                .equals()
                .var(rr)
                .minus_var(br),
        )
        .unwrap();

    system.minimize().unwrap();
    assert_value(&system, "Al", al, 50.0);
    assert_value(&system, "Ar", ar, 250.0);
    assert_value(&system, "Bl", bl, 0.0);
    assert_value(&system, "Br", br, 300.0);
    assert_value(&system, "Rr", rr, 300.0);
}

#[test]
fn weakly_attached_widget_in_wide_window() {
    // Rl = 0 and Rr = 600 required; A wants both edges on the window at LOW
    // and a width between 150 and 200 at MEDIUM. The window is too wide, so
    // the band binds and the total edge deviation bottoms out at 400.
    let mut system = LinearSystem::new();
    pin(&mut system, "Rl", 0.0);
    pin(&mut system, "Rr", 600.0);
    let rl = system.variable_named("Rl");
    let rr = system.variable_named("Rr");
    let al = system.variable_named("Al");
    let ar = system.variable_named("Ar");
    system
        .add_equation(
            &Equation::new()
                .var(ar)
                .greater_than_or_equal()
                .var(al)
                .plus(150.0)
                .with_strength(Strength::MEDIUM),
        )
        .unwrap();
    system
        .add_equation(
            &Equation::new()
                .var(ar)
                .less_than_or_equal()
                .var(al)
                .plus(200.0)
                .with_strength(Strength::MEDIUM),
        )
        .unwrap();
    system
        .add_equation(
            &Equation::new()
                .var(al)
                .equals()
                .var(rl)
                .with_strength(Strength::LOW),
        )
        .unwrap();
    system
        .add_equation(
            &Equation::new()
                .var(ar)
                .equals()
                .var(rr)
                .with_strength(Strength::LOW),
        )
        .unwrap();

    system.minimize().unwrap();
    let al_value = system.value_of(al).unwrap();
    let ar_value = system.value_of(ar).unwrap();
    let width = ar_value - al_value;
    assert!(
        (150.0 - TOLERANCE..=200.0 + TOLERANCE).contains(&width),
        "width = {width}"
    );
    let deviation = al_value.abs() + (600.0 - ar_value).abs();
    assert!(
        (deviation - 400.0).abs() < TOLERANCE,
        "deviation = {deviation}"
    );
}

#[test]
fn centered_widget_with_competing_edge_pins() {
    // 2 Xm = Xl + Xr, Xl + 10 <= Xr, Xr <= 100 (all required); the center
    // is pinned at MEDIUM, both edges at LOW. The center pin and the Xr pin
    // can hold exactly; Xl's pin loses and the total edge deviation is 10.
    let mut system = LinearSystem::new();
    let xm = system.variable_named("Xm");
    let xl = system.variable_named("Xl");
    let xr = system.variable_named("Xr");

    system
        .add_equation(&Equation::new().term(2.0, xm).equals().var(xl).var(xr))
        .unwrap();
    system
        .add_equation(
            &Equation::new()
                .var(xl)
                .plus(10.0)
                .less_than_or_equal()
                .var(xr),
        )
        .unwrap();
    system
        .add_equation(&Equation::new().var(xr).less_than_or_equal().plus(100.0))
        .unwrap();
    prefer(&mut system, "Xm", 50.0, Strength::MEDIUM);
    prefer(&mut system, "Xl", 30.0, Strength::LOW);
    prefer(&mut system, "Xr", 60.0, Strength::LOW);

    system.minimize().unwrap();
    let xm_value = system.value_of(xm).unwrap();
    let xl_value = system.value_of(xl).unwrap();
    let xr_value = system.value_of(xr).unwrap();

    assert!((xm_value - 50.0).abs() < TOLERANCE, "Xm = {xm_value}");
    assert!(
        (xl_value + xr_value - 100.0).abs() < TOLERANCE,
        "edges must mirror around the center, got Xl = {xl_value}, Xr = {xr_value}"
    );
    // Any split with Xl in [30, 40] carries the same total deviation of 10.
    assert!(
        (30.0 - TOLERANCE..=40.0 + TOLERANCE).contains(&xl_value),
        "Xl = {xl_value}"
    );
    let deviation = (xl_value - 30.0).abs() + (xr_value - 60.0).abs();
    assert!((deviation - 10.0).abs() < TOLERANCE, "deviation = {deviation}");
}

#[test]
fn removing_a_pin_matches_a_fresh_system() {
    let mut incremental = LinearSystem::new();
    let x = incremental.variable_named("x");
    incremental
        .add_equation(&Equation::new().var(x).greater_than_or_equal().plus(20.0))
        .unwrap();
    let pin80 = prefer(&mut incremental, "x", 80.0, Strength::MEDIUM);
    incremental.minimize().unwrap();
    assert_value(&incremental, "x", x, 80.0);
    incremental.remove_constraint(pin80).unwrap();
    incremental.minimize().unwrap();

    let mut fresh = LinearSystem::new();
    let y = fresh.variable_named("x");
    fresh
        .add_equation(&Equation::new().var(y).greater_than_or_equal().plus(20.0))
        .unwrap();
    fresh.minimize().unwrap();

    assert_eq!(
        incremental.value_of(x).unwrap(),
        fresh.value_of(y).unwrap()
    );
    assert_value(&incremental, "x", x, 20.0);
}

#[test]
fn unknown_references_fail_loudly() {
    let mut system = LinearSystem::new();
    assert_eq!(
        system.remove_constraint(ConstraintRef::new(99)),
        Err(SolveError::UnknownConstraint)
    );

    let x = system.variable_named("x");
    system.reset();
    assert_eq!(system.value_of(x), Err(SolveError::UnknownVariable(x)));
}

#[test]
fn unbounded_row_goal_is_reported() {
    let mut system = LinearSystem::new();
    let x = system.variable_named("x");
    system
        .add_equation(&Equation::new().var(x).greater_than_or_equal().plus(10.0))
        .unwrap();
    let mut goal = Row::new().with_term(x, -1.0);
    assert_eq!(
        system.minimize_row_goal(&mut goal),
        Err(SolveError::Unbounded)
    );
}

proptest! {
    /// A triangular chain x0 = c, x(i+1) = x(i) + d(i) has exactly one
    /// solution: the prefix sums. Integer-valued inputs keep f32 exact.
    #[test]
    fn triangular_chain_round_trips(
        start in -1000i32..1000,
        deltas in proptest::collection::vec(-500i32..500, 1..12),
    ) {
        let mut system = LinearSystem::new();
        let mut vars = vec![system.new_variable()];
        system
            .add_equation(&Equation::new().var(vars[0]).equals().plus(start as f32))
            .unwrap();
        for &delta in &deltas {
            let previous = *vars.last().unwrap();
            let next = system.new_variable();
            system
                .add_equation(
                    &Equation::new()
                        .var(next)
                        .equals()
                        .var(previous)
                        .plus(delta as f32),
                )
                .unwrap();
            vars.push(next);
        }
        system.minimize().unwrap();

        let mut expected = start as f32;
        prop_assert_eq!(system.value_of(vars[0]).unwrap(), expected);
        for (variable, &delta) in vars[1..].iter().zip(&deltas) {
            expected += delta as f32;
            prop_assert!((system.value_of(*variable).unwrap() - expected).abs() < TOLERANCE);
        }

        // a second minimize must not move anything
        let before: Vec<f32> = vars.iter().map(|&v| system.value_of(v).unwrap()).collect();
        system.minimize().unwrap();
        let after: Vec<f32> = vars.iter().map(|&v| system.value_of(v).unwrap()).collect();
        prop_assert_eq!(before, after);
    }
}

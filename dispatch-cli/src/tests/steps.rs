//! Behaviour-driven step definitions driving the dispatch CLI scenarios.

use super::helpers::{DEMO_CITY, Scratch, run_words};
use super::*;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use std::cell::RefCell;

/// Scratch database plus the outcome of the most recent command.
#[derive(Debug)]
struct CliWorld {
    scratch: Scratch,
    outcome: RefCell<Option<Result<serde_json::Value, CliError>>>,
}

impl CliWorld {
    fn new() -> Self {
        Self {
            scratch: Scratch::new(),
            outcome: RefCell::new(None),
        }
    }

    fn run(&self, command: &str) -> Result<serde_json::Value, CliError> {
        run_words(command.trim_matches('"'), &self.scratch.database())
    }

    fn output(&self) -> serde_json::Value {
        let borrowed = self.outcome.borrow();
        match borrowed.as_ref().expect("command should have run") {
            Ok(value) => value.clone(),
            Err(err) => panic!("expected success, found {err}"),
        }
    }
}

#[fixture]
fn world() -> CliWorld {
    CliWorld::new()
}

#[given("an empty dispatch database")]
fn empty_database(#[from(world)] world: &CliWorld) {
    assert!(
        !world.scratch.database().exists(),
        "database should not exist yet"
    );
}

#[given("the command {command} has run")]
fn command_has_run(#[from(world)] world: &CliWorld, command: String) {
    if let Err(err) = world.run(&command) {
        panic!("setup command {command} failed: {err}");
    }
}

#[given("the demo city is seeded")]
fn demo_city_seeded(#[from(world)] world: &CliWorld) {
    let file = world.scratch.write("city.json", DEMO_CITY);
    if let Err(err) = world.run(&format!("seed --file {file}")) {
        panic!("seeding failed: {err}");
    }
}

#[when("I run {command}")]
fn run_command_step(#[from(world)] world: &CliWorld, command: String) {
    let outcome = world.run(&command);
    world.outcome.replace(Some(outcome));
}

#[then("the output field {field} is {value}")]
fn output_field_is(#[from(world)] world: &CliWorld, field: String, value: String) {
    let expected: serde_json::Value =
        serde_json::from_str(&value).unwrap_or_else(|err| panic!("bad expectation {value}: {err}"));
    let output = world.output();
    let actual = output
        .get(field.trim_matches('"'))
        .unwrap_or_else(|| panic!("field {field} missing from {output}"));
    assert_eq!(actual, &expected);
}

#[then("the output has no field {field}")]
fn output_lacks_field(#[from(world)] world: &CliWorld, field: String) {
    let output = world.output();
    assert!(
        output.get(field.trim_matches('"')).is_none(),
        "unexpected {field} in {output}"
    );
}

#[then("the output is {document}")]
fn output_is(#[from(world)] world: &CliWorld, document: String) {
    let expected: serde_json::Value = serde_json::from_str(&document)
        .unwrap_or_else(|err| panic!("bad expectation {document}: {err}"));
    assert_eq!(world.output(), expected);
}

#[then("the command fails with {message}")]
fn command_fails_with(#[from(world)] world: &CliWorld, message: String) {
    let borrowed = world.outcome.borrow();
    let err = borrowed
        .as_ref()
        .expect("command should have run")
        .as_ref()
        .expect_err("expected failure");
    let mut buffer = Vec::new();
    write_error(&mut buffer, err).expect("write error document");
    let document = super::helpers::parse_output(&buffer);
    assert_eq!(
        document,
        serde_json::json!({ "error": message.trim_matches('"') })
    );
}

macro_rules! register_cli_scenario {
    ($fn_name:ident, $scenario_title:literal) => {
        #[scenario(path = "tests/features/cli_commands.feature", name = $scenario_title)]
        fn $fn_name(#[from(world)] world: CliWorld) {
            let _ = world;
        }
    };
}

register_cli_scenario!(placing_an_order, "placing an order with a nearby driver");
register_cli_scenario!(
    pending_order_reassigned,
    "reassigning a pending order once a driver joins"
);
register_cli_scenario!(completing_an_order, "completing an order frees the driver");
register_cli_scenario!(unknown_order, "completing an unknown order fails");
register_cli_scenario!(seeded_shortest_path, "routing across a seeded city");
register_cli_scenario!(unknown_location_path, "routing to an unknown location fails");

//! End-to-end tests: parse, check and evaluate expressions

use gridtype_core::{
    Column, DataType, Decimal, Table, TableId, TableStore, TaggedValue, TemporalKind,
    TemporalValue, Unit, Value,
};
use gridtype_expr::{
    check_expression, evaluate_expression, parse_expression, value_to_expression, CheckContext,
    CheckOptions, CollectingRecorder, EvalError, EvaluateState, EvaluationContext,
    EvaluationOptions, StoreLookup,
};
use pretty_assertions::assert_eq;
use std::collections::BTreeMap;

fn check(text: &str) -> Result<String, Vec<String>> {
    let options = CheckOptions::default();
    let expr = parse_expression(text).unwrap();
    let mut errors = CollectingRecorder::new();
    match check_expression(&expr, &CheckContext::standalone(&options), &mut errors) {
        Ok(ty) => Ok(ty.to_string()),
        Err(_) => Err(errors.errors().iter().map(|e| e.message.clone()).collect()),
    }
}

fn eval(text: &str) -> Result<Value, EvalError> {
    let options = CheckOptions::default();
    let expr = parse_expression(text).unwrap();
    let ctx = EvaluationContext::standalone(&options.type_catalogue);
    let state = EvaluateState::new(&EvaluationOptions::default());
    evaluate_expression(&expr, &ctx, state).map(|r| r.into_value())
}

fn optional(inner: Option<Value>) -> Value {
    Value::Tagged(TaggedValue {
        type_name: "Optional".into(),
        tag_index: usize::from(inner.is_some()),
        tag: if inner.is_some() { "Some" } else { "None" }.into(),
        inner: inner.map(Box::new),
    })
}

/// Render a value as a literal, parse it back, and check the type and value survive
fn assert_round_trip(value: Value, data_type: DataType) {
    let options = CheckOptions::default();
    let literal = value_to_expression(
        &value,
        &data_type,
        &options.type_catalogue,
        &options.unit_catalogue,
    )
    .unwrap();
    let text = literal.to_string();
    let reparsed = parse_expression(&text).unwrap();

    let mut errors = CollectingRecorder::new();
    let ty = check_expression(&reparsed, &CheckContext::standalone(&options), &mut errors)
        .unwrap_or_else(|_| panic!("{} failed to check: {:?}", text, errors.errors()));
    assert_eq!(ty.to_data_type().unwrap(), data_type, "type of {}", text);

    let ctx = EvaluationContext::standalone(&options.type_catalogue);
    let state = EvaluateState::new(&EvaluationOptions::default());
    let result = evaluate_expression(&reparsed, &ctx, state).unwrap();
    assert_eq!(result.value(), &value, "value of {}", text);
}

#[test]
fn test_literal_round_trip() {
    let speed = Unit::named("m").divide(&Unit::named("s"));
    assert_round_trip(Value::Number(Decimal::new(-125, 2)), DataType::number_in(speed));
    assert_round_trip(Value::int(3), DataType::number());
    assert_round_trip(Value::text("say \"hi\""), DataType::Text);
    assert_round_trip(Value::Boolean(false), DataType::Boolean);
    assert_round_trip(
        Value::Temporal(TemporalValue::parse(TemporalKind::Date, "2024-02-29").unwrap()),
        DataType::Temporal(TemporalKind::Date),
    );

    let optional_text = DataType::Tagged {
        name: "Optional".into(),
        params: vec![DataType::Text],
    };
    assert_round_trip(optional(Some(Value::text("x"))), optional_text.clone());
    assert_round_trip(optional(None), optional_text);

    let mut fields = BTreeMap::new();
    fields.insert("name".to_string(), Value::text("fig"));
    fields.insert("weights".to_string(), Value::Array(vec![Value::int(1), Value::int(2)]));
    let mut field_types = BTreeMap::new();
    field_types.insert("name".to_string(), DataType::Text);
    field_types.insert(
        "weights".to_string(),
        DataType::Array(Box::new(DataType::number_in(Unit::named("kg")))),
    );
    assert_round_trip(Value::Record(fields), DataType::Record(field_types));

    assert_round_trip(Value::Array(vec![]), DataType::Array(Box::new(DataType::Boolean)));
}

#[test]
fn test_short_circuit_order() {
    assert_eq!(eval("false & (1 / 0 = 1)").unwrap(), Value::Boolean(false));
    assert_eq!(eval("true | (1 / 0 = 1)").unwrap(), Value::Boolean(true));
}

#[test]
fn test_total_operator_strictness() {
    match eval("1 + (1 / 0)") {
        Err(EvalError::Failure(failure)) => {
            assert_eq!(failure.message, "Division by zero");
            assert_eq!(failure.node.to_string(), "1 / 0");
        }
        other => panic!("expected a failure, got {:?}", other),
    }
}

#[test]
fn test_add_subtract_fold() {
    let folded = parse_expression("1 + 2 - 3").unwrap().constant_fold();
    assert_eq!(folded, Some(gridtype_core::Rational::ZERO));
    assert_eq!(parse_expression("1 + x").unwrap().constant_fold(), None);
}

#[test]
fn test_raise_overload() {
    assert_eq!(check("5{m} ^ 2"), Ok("Number{m^2}".to_string()));
    assert_eq!(check("5{m} ^ 0.5"), Ok("Number{m^(1/2)}".to_string()));
    let errors = check("define y = 2 then 5{m} ^ y enddefine").unwrap_err();
    assert!(errors[0].starts_with("Unit mismatch"), "{:?}", errors);
}

#[test]
fn test_conditional_branch_binding() {
    let then_branch = "define x = Some(1) then if x =~ Some(n) then n + 1 else 0 endif enddefine";
    assert_eq!(check(then_branch), Ok("Number".to_string()));
    assert_eq!(eval(then_branch).unwrap(), Value::int(2));

    let else_branch = "define x = Some(1) then if x =~ Some(n) then n + 1 else n endif enddefine";
    assert_eq!(check(else_branch), Err(vec!["Unknown name: n".to_string()]));
}

#[test]
fn test_explanation_laziness() {
    let mut store = TableStore::new();
    store
        .add_table(
            Table::new(TableId::new("Runs"), 1)
                .with_column(Column::new(
                    "distance",
                    DataType::number_in(Unit::named("m")),
                    vec![Value::int(400)],
                ))
                .unwrap(),
        )
        .unwrap();
    let id = TableId::new("Runs");
    let lookup = StoreLookup::new(&store, Some(&id));
    let options = CheckOptions::default();
    let ctx = EvaluationContext::standalone(&options.type_catalogue).with_columns(&lookup);
    let expr = parse_expression("distance * 2").unwrap();

    let quiet = EvaluateState::for_row(&EvaluationOptions::default(), 0);
    let result = evaluate_expression(&expr, &ctx, quiet).unwrap();
    assert_eq!(result.value(), &Value::int(800));
    assert!(result.explain().is_err());

    let recording = EvaluateState::for_row(
        &EvaluationOptions {
            record_explanation: true,
        },
        0,
    );
    let result = evaluate_expression(&expr, &ctx, recording).unwrap();
    assert_eq!(
        result.explain().unwrap().describe(),
        "distance * 2 = 800\n  distance = 400  [Runs.distance row 0]\n"
    );
}

#[test]
fn test_unknown_name_suggests_columns() {
    let mut store = TableStore::new();
    store
        .add_table(
            Table::new(TableId::new("Runs"), 0)
                .with_column(Column::new("Distance", DataType::number(), vec![]))
                .unwrap(),
        )
        .unwrap();
    let id = TableId::new("Runs");
    let lookup = StoreLookup::new(&store, Some(&id));
    let options = CheckOptions::default();
    let ctx = CheckContext::standalone(&options).with_columns(&lookup);
    let mut errors = CollectingRecorder::new();
    let expr = parse_expression("distance + 1").unwrap();

    assert!(check_expression(&expr, &ctx, &mut errors).is_err());
    let error = &errors.errors()[0];
    assert_eq!(error.message, "Unknown name: distance");
    assert!(error
        .fixes
        .iter()
        .any(|fix| fix.replacement.to_string() == "Distance"));
}

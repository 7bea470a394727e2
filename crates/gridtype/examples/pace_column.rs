//! Example: Calculate a derived column with units

use gridtype::prelude::*;
use gridtype::ColumnCalculation;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut store = TableStore::new();
    let runs = Table::new(TableId::new("Runs"), 3)
        .with_column(Column::new(
            "distance",
            DataType::number_in(Unit::named("km")),
            vec![Value::int(5), Value::int(10), Value::int(21)],
        ))?
        .with_column(Column::new(
            "minutes",
            DataType::number_in(Unit::named("min")),
            vec![Value::int(25), Value::int(52), Value::int(115)],
        ))?;
    store.add_table(runs)?;

    // Whole-table calculation
    let id = TableId::new("Runs");
    let (pace, stats) = store.calculate_column(&id, "minutes / distance", &CalculationOptions::default())?;
    println!("pace : {}", pace.data_type);
    for (row, value) in pace.values.iter().enumerate() {
        println!("  row {}: {}", row, value);
    }
    println!("{} rows in {} chunk(s)", stats.rows, stats.chunks);

    // A type error is caught before any row is evaluated
    if let Err(e) = store.calculate_column(&id, "distance + minutes", &CalculationOptions::default()) {
        println!("rejected: {}", e);
    }

    // Explain one row
    let options = CalculationOptions {
        record_explanation: true,
        ..Default::default()
    };
    let calculation = ColumnCalculation::prepare(&store, &id, "minutes / distance", &options)?;
    print!("{}", calculation.evaluate_row(2)?.explain()?.describe());

    Ok(())
}

//! Evaluation of a single aggregation function over a group of cells.

use tabrule_model::{AggFn, Value};
use tabrule_transform::stats;

/// Apply `function` to the cells of one group, in input row order.
///
/// Nulls are ignored by every function. Numeric functions read numeric
/// text as numbers; callers check column types beforehand.
pub fn evaluate(function: AggFn, cells: &[&Value]) -> Value {
    let present = || cells.iter().copied().filter(|v| !v.is_null());
    let numbers = || present().filter_map(Value::as_f64).collect::<Vec<f64>>();
    match function {
        AggFn::Sum => Value::Number(stats::sum(&numbers())),
        AggFn::Mean => stats::mean(&numbers()).into(),
        AggFn::Median => stats::median(&numbers()).into(),
        AggFn::Min => stats::min(&numbers()).into(),
        AggFn::Max => stats::max(&numbers()).into(),
        AggFn::Count => Value::from(present().count()),
        AggFn::Std => stats::std_dev(&numbers()).into(),
        AggFn::Var => stats::variance(&numbers()).into(),
        AggFn::First => present().next().cloned().unwrap_or_default(),
        AggFn::Last => present().last().cloned().unwrap_or_default(),
        AggFn::UniqueCount => Value::from(stats::distinct_count(present())),
    }
}

/// Output column name for a value column and function.
pub fn output_name(column: &str, function: AggFn) -> String {
    format!("{column}_{}", function.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(values: &[Value]) -> Vec<&Value> {
        values.iter().collect()
    }

    #[test]
    fn numeric_functions_skip_nulls() {
        let values = vec![Value::from(1.0), Value::Null, Value::from(3.0), Value::from("8")];
        let cells = cells(&values);
        assert_eq!(evaluate(AggFn::Sum, &cells), Value::from(12.0));
        assert_eq!(evaluate(AggFn::Mean, &cells), Value::from(4.0));
        assert_eq!(evaluate(AggFn::Median, &cells), Value::from(3.0));
        assert_eq!(evaluate(AggFn::Count, &cells), Value::from(3.0));
        assert_eq!(evaluate(AggFn::Min, &cells), Value::from(1.0));
        assert_eq!(evaluate(AggFn::Max, &cells), Value::from(8.0));
    }

    #[test]
    fn std_and_var_need_two_values() {
        let values = vec![Value::from(5.0)];
        assert_eq!(evaluate(AggFn::Std, &cells(&values)), Value::Null);
        assert_eq!(evaluate(AggFn::Var, &cells(&values)), Value::Null);
        let values = vec![Value::from(1.0), Value::from(3.0)];
        assert_eq!(evaluate(AggFn::Var, &cells(&values)), Value::from(2.0));
    }

    #[test]
    fn first_last_and_unique_follow_row_order() {
        let values = vec![
            Value::Null,
            Value::from("b"),
            Value::from("a"),
            Value::from("b"),
            Value::Null,
        ];
        let cells = cells(&values);
        assert_eq!(evaluate(AggFn::First, &cells), Value::from("b"));
        assert_eq!(evaluate(AggFn::Last, &cells), Value::from("b"));
        assert_eq!(evaluate(AggFn::UniqueCount, &cells), Value::from(2.0));
    }

    #[test]
    fn empty_group_sums_to_zero() {
        assert_eq!(evaluate(AggFn::Sum, &[]), Value::from(0.0));
        assert_eq!(evaluate(AggFn::Mean, &[]), Value::Null);
        assert_eq!(output_name("Amount", AggFn::UniqueCount), "Amount_unique_count");
    }
}

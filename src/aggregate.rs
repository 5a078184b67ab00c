/// Aggregate functions over selected values.
///
/// Every function is total: an empty input yields 0 rather than an error
/// or NaN.

use serde::{Deserialize, Serialize};

/// The five single-column reductions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AggregateFunction {
    Sum,
    Average,
    Count,
    Max,
    Min,
}

impl AggregateFunction {
    pub const ALL: [AggregateFunction; 5] = [
        AggregateFunction::Sum,
        AggregateFunction::Average,
        AggregateFunction::Count,
        AggregateFunction::Max,
        AggregateFunction::Min,
    ];

    /// Reduce `values` to a single number.
    ///
    /// ```
    /// use gridcalc::AggregateFunction;
    ///
    /// assert_eq!(AggregateFunction::Sum.apply(&[2.0, 4.0]), 6.0);
    /// assert_eq!(AggregateFunction::Average.apply(&[]), 0.0);
    /// ```
    pub fn apply(&self, values: &[f64]) -> f64 {
        aggregate(values, *self)
    }

    pub fn label(&self) -> &'static str {
        match self {
            AggregateFunction::Sum => "Sum",
            AggregateFunction::Average => "Average",
            AggregateFunction::Count => "Count",
            AggregateFunction::Max => "Max",
            AggregateFunction::Min => "Min",
        }
    }
}

impl std::fmt::Display for AggregateFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// The function picked in the calculation toolkit: an aggregate, or
/// `Other` for authoring a derived column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CalcFunction {
    #[default]
    Sum,
    Average,
    Count,
    Max,
    Min,
    Other,
}

impl CalcFunction {
    /// Parse a function name (case-insensitive).
    ///
    /// Accepts: "sum", "average" (or "avg"), "count", "max", "min", "other"
    pub fn from_str(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "sum" => Ok(CalcFunction::Sum),
            "average" | "avg" => Ok(CalcFunction::Average),
            "count" => Ok(CalcFunction::Count),
            "max" => Ok(CalcFunction::Max),
            "min" => Ok(CalcFunction::Min),
            "other" => Ok(CalcFunction::Other),
            _ => Err(format!(
                "Unknown function: '{}'. Use Sum, Average, Count, Max, Min or Other",
                s
            )),
        }
    }

    /// The aggregate this function runs, or `None` for `Other`.
    pub fn aggregate(&self) -> Option<AggregateFunction> {
        match self {
            CalcFunction::Sum => Some(AggregateFunction::Sum),
            CalcFunction::Average => Some(AggregateFunction::Average),
            CalcFunction::Count => Some(AggregateFunction::Count),
            CalcFunction::Max => Some(AggregateFunction::Max),
            CalcFunction::Min => Some(AggregateFunction::Min),
            CalcFunction::Other => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self.aggregate() {
            Some(function) => function.label(),
            None => "Other",
        }
    }
}

impl From<AggregateFunction> for CalcFunction {
    fn from(function: AggregateFunction) -> Self {
        match function {
            AggregateFunction::Sum => CalcFunction::Sum,
            AggregateFunction::Average => CalcFunction::Average,
            AggregateFunction::Count => CalcFunction::Count,
            AggregateFunction::Max => CalcFunction::Max,
            AggregateFunction::Min => CalcFunction::Min,
        }
    }
}

impl std::fmt::Display for CalcFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Reduce a numeric sequence. Empty input yields 0 for every function.
pub fn aggregate(values: &[f64], function: AggregateFunction) -> f64 {
    match function {
        AggregateFunction::Sum => total(values),
        AggregateFunction::Average => {
            if values.is_empty() {
                0.0
            } else {
                total(values) / values.len() as f64
            }
        }
        AggregateFunction::Count => values.len() as f64,
        AggregateFunction::Max => values.iter().copied().reduce(f64::max).unwrap_or(0.0),
        AggregateFunction::Min => values.iter().copied().reduce(f64::min).unwrap_or(0.0),
    }
}

fn total(values: &[f64]) -> f64 {
    values.iter().fold(0.0, |acc, v| acc + v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregate_values() {
        let values = [3.0, -1.5, 10.0, 4.5];
        assert_eq!(aggregate(&values, AggregateFunction::Sum), 16.0);
        assert_eq!(aggregate(&values, AggregateFunction::Average), 4.0);
        assert_eq!(aggregate(&values, AggregateFunction::Count), 4.0);
        assert_eq!(aggregate(&values, AggregateFunction::Max), 10.0);
        assert_eq!(aggregate(&values, AggregateFunction::Min), -1.5);
    }

    #[test]
    fn test_aggregate_empty_is_zero() {
        for function in AggregateFunction::ALL {
            assert_eq!(aggregate(&[], function), 0.0, "{} of nothing", function);
        }
    }

    #[test]
    fn test_aggregate_negative_max() {
        let values = [-7.0, -2.0, -9.0];
        assert_eq!(aggregate(&values, AggregateFunction::Max), -2.0);
        assert_eq!(aggregate(&values, AggregateFunction::Min), -9.0);
    }

    #[test]
    fn test_sum_matches_fold() {
        let values: Vec<f64> = (0..100).map(|i| i as f64 * 0.25).collect();
        let expected = values.iter().fold(0.0, |acc, v| acc + v);
        assert_eq!(aggregate(&values, AggregateFunction::Sum), expected);
    }

    #[test]
    fn test_calc_function_parse() {
        assert_eq!(CalcFunction::from_str("SUM").unwrap(), CalcFunction::Sum);
        assert_eq!(CalcFunction::from_str("avg").unwrap(), CalcFunction::Average);
        assert_eq!(CalcFunction::from_str("Other").unwrap(), CalcFunction::Other);
        assert!(CalcFunction::from_str("median").is_err());

        assert_eq!(CalcFunction::Other.aggregate(), None);
        assert_eq!(CalcFunction::Max.aggregate(), Some(AggregateFunction::Max));
        assert_eq!(CalcFunction::from(AggregateFunction::Min), CalcFunction::Min);
        assert_eq!(CalcFunction::default(), CalcFunction::Sum);
    }
}

use std::collections::{BTreeMap, BTreeSet};

use super::model::{ColumnKind, Dataset, Record, Value};
use crate::error::PipelineError;

// ---------------------------------------------------------------------------
// Filter predicates
// ---------------------------------------------------------------------------

/// Constraint on a single column.
#[derive(Debug, Clone, PartialEq)]
pub enum Criterion {
    /// Categorical membership. An empty set selects nothing.
    OneOf(BTreeSet<Value>),
    /// Exact match, e.g. a selected hour.
    Equals(Value),
    /// Inclusive numeric bounds; `None` leaves that side open.
    Range { min: Option<f64>, max: Option<f64> },
}

impl Criterion {
    pub fn one_of<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Criterion::OneOf(values.into_iter().map(Into::into).collect())
    }

    pub fn equals(value: impl Into<Value>) -> Self {
        Criterion::Equals(value.into())
    }

    pub fn matches(&self, value: &Value) -> bool {
        match self {
            Criterion::OneOf(selected) => selected.contains(value),
            Criterion::Equals(expected) => value.loosely_equals(expected),
            Criterion::Range { min, max } => match value.as_f64() {
                Some(v) => min.map_or(true, |lo| v >= lo) && max.map_or(true, |hi| v <= hi),
                None => false,
            },
        }
    }
}

/// Per-column selection state: column name → criterion.
/// A column absent from the map is unconstrained.
pub type FilterCriteria = BTreeMap<String, Criterion>;

/// Initialise criteria with every value of every text column selected.
pub fn init_criteria(dataset: &Dataset) -> FilterCriteria {
    dataset
        .schema()
        .columns()
        .iter()
        .filter(|c| c.kind == ColumnKind::Text)
        .filter_map(|c| {
            dataset
                .unique_values(&c.name)
                .map(|vals| (c.name.clone(), Criterion::OneOf(vals.clone())))
        })
        .collect()
}

/// Result of applying criteria: matching rows, or the "no data" state.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterOutcome {
    Rows(Dataset),
    NoData,
}

impl FilterOutcome {
    pub fn rows(&self) -> Option<&Dataset> {
        match self {
            FilterOutcome::Rows(ds) => Some(ds),
            FilterOutcome::NoData => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, FilterOutcome::NoData)
    }
}

/// Return indices of records that pass all criteria.
///
/// A record passes a column criterion when:
/// * `OneOf` selects every unique value of the column → passes (no constraint)
/// * `OneOf` is empty → nothing selected → fails
/// * otherwise the record's value must match the criterion
pub fn filtered_indices(
    dataset: &Dataset,
    criteria: &FilterCriteria,
) -> Result<Vec<usize>, PipelineError> {
    let mut active: Vec<(usize, &Criterion)> = Vec::with_capacity(criteria.len());
    for (col, criterion) in criteria {
        let idx = dataset.schema().require(col)?;
        if let Criterion::OneOf(selected) = criterion {
            // Everything selected, no filtering needed
            if let Some(all_vals) = dataset.unique_values(col) {
                if !selected.is_empty() && all_vals.is_subset(selected) {
                    continue;
                }
            }
        }
        active.push((idx, criterion));
    }

    Ok(dataset
        .records()
        .iter()
        .enumerate()
        .filter(|(_, rec)| passes(rec, &active))
        .map(|(i, _)| i)
        .collect())
}

fn passes(record: &Record, active: &[(usize, &Criterion)]) -> bool {
    active
        .iter()
        .all(|(idx, criterion)| criterion.matches(record.get(*idx)))
}

/// Apply criteria and copy the matching records into a new dataset.
pub fn filter(dataset: &Dataset, criteria: &FilterCriteria) -> Result<FilterOutcome, PipelineError> {
    if criteria.is_empty() {
        return Ok(if dataset.is_empty() {
            FilterOutcome::NoData
        } else {
            FilterOutcome::Rows(dataset.clone())
        });
    }

    let indices = filtered_indices(dataset, criteria)?;
    log::debug!(
        "filter kept {} of {} rows ({} criteria)",
        indices.len(),
        dataset.len(),
        criteria.len()
    );
    if indices.is_empty() {
        return Ok(FilterOutcome::NoData);
    }
    Ok(FilterOutcome::Rows(dataset.select_rows(&indices)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{Column, Schema};

    fn hours() -> Dataset {
        let schema = Schema::new(vec![
            Column::new("hour", ColumnKind::Integer),
            Column::new("base", ColumnKind::Text),
        ])
        .unwrap();
        let rows = [(5, "B1"), (5, "B2"), (17, "B1"), (17, "B3")];
        Dataset::new(
            schema,
            rows.iter()
                .map(|&(h, b)| Record::new(vec![Value::Integer(h), b.into()]))
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn equality_selects_matching_hour() {
        let ds = hours();
        let criteria = FilterCriteria::from([("hour".to_string(), Criterion::equals(17))]);
        let out = filter(&ds, &criteria).unwrap();
        let rows = out.rows().unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.records().iter().all(|r| r.get(0) == &Value::Integer(17)));
    }

    #[test]
    fn no_match_is_no_data_not_error() {
        let ds = hours();
        let criteria = FilterCriteria::from([("hour".to_string(), Criterion::equals(3))]);
        assert_eq!(filter(&ds, &criteria).unwrap(), FilterOutcome::NoData);
    }

    #[test]
    fn membership_is_or_within_and_across_columns() {
        let ds = hours();
        let criteria = FilterCriteria::from([
            ("base".to_string(), Criterion::one_of(["B1", "B3"])),
            ("hour".to_string(), Criterion::Range { min: Some(10.0), max: None }),
        ]);
        assert_eq!(filtered_indices(&ds, &criteria).unwrap(), vec![2, 3]);
    }

    #[test]
    fn empty_selection_hides_everything() {
        let ds = hours();
        let criteria = FilterCriteria::from([("base".to_string(), Criterion::OneOf(BTreeSet::new()))]);
        assert!(filter(&ds, &criteria).unwrap().is_empty());
    }

    #[test]
    fn all_selected_is_identity() {
        let ds = hours();
        let criteria = init_criteria(&ds);
        assert!(criteria.contains_key("base"));
        assert_eq!(filtered_indices(&ds, &criteria).unwrap().len(), ds.len());
    }

    #[test]
    fn range_bounds_are_inclusive() {
        let c = Criterion::Range { min: Some(5.0), max: Some(17.0) };
        assert!(c.matches(&Value::Integer(5)));
        assert!(c.matches(&Value::Integer(17)));
        assert!(!c.matches(&Value::Integer(18)));
        assert!(!c.matches(&Value::Null));
    }

    #[test]
    fn unknown_column_is_reported() {
        let ds = hours();
        let criteria = FilterCriteria::from([("minute".to_string(), Criterion::equals(1))]);
        assert_eq!(
            filter(&ds, &criteria),
            Err(PipelineError::ColumnNotFound("minute".into()))
        );
    }
}

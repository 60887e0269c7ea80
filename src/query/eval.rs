use std::cmp::Ordering;

use super::{
    Condition, ConditionValue, FilterGroup, FilterKind, FilterNode, Operator, OrderBy,
    QueryTemplate,
};

impl QueryTemplate {
    /// Evaluates the filter against a record exposed through `lookup`.
    /// A template without a filter matches everything.
    pub fn matches<F>(&self, lookup: F) -> bool
    where
        F: Fn(&str) -> Option<ConditionValue>,
    {
        match &self.filter {
            Some(group) => group.matches(&lookup),
            None => true,
        }
    }
}

impl FilterGroup {
    pub fn matches<F>(&self, lookup: &F) -> bool
    where
        F: Fn(&str) -> Option<ConditionValue>,
    {
        let mut results = self.children.iter().map(|node| match node {
            FilterNode::Condition(condition) => condition.matches(lookup),
            FilterNode::Filter(group) => group.matches(lookup),
        });
        match self.kind {
            FilterKind::And => results.all(|hit| hit),
            FilterKind::Or => self.children.is_empty() || results.any(|hit| hit),
        }
    }
}

impl Condition {
    pub fn matches<F>(&self, lookup: &F) -> bool
    where
        F: Fn(&str) -> Option<ConditionValue>,
    {
        let actual = lookup(&self.attribute);
        match self.operator {
            Operator::Null => actual.is_none(),
            Operator::NotNull => actual.is_some(),
            Operator::Eq => match (&actual, &self.value) {
                (Some(actual), Some(expected)) => actual.loosely_eq(expected),
                (None, None) => true,
                _ => false,
            },
            Operator::Ne => match (&actual, &self.value) {
                (Some(actual), Some(expected)) => !actual.loosely_eq(expected),
                (None, None) => false,
                _ => true,
            },
            Operator::Like => match (&actual, &self.value) {
                (Some(actual), Some(pattern)) => like(&actual.as_text(), &pattern.as_text()),
                _ => false,
            },
        }
    }
}

fn like(value: &str, pattern: &str) -> bool {
    let value = value.to_lowercase();
    let pattern = pattern.to_lowercase();
    let leading = pattern.starts_with('%');
    let trailing = pattern.len() > 1 && pattern.ends_with('%');
    let core = pattern.trim_matches('%');
    match (leading, trailing) {
        (true, true) => value.contains(core),
        (true, false) => value.ends_with(core),
        (false, true) => value.starts_with(core),
        (false, false) => value == core,
    }
}

/// Orders items the way a store applies `<order>` elements; missing values
/// sort first.
pub fn sort_by_orders<T, F>(items: &mut [T], orders: &[OrderBy], lookup: F)
where
    F: Fn(&T, &str) -> Option<ConditionValue>,
{
    if orders.is_empty() {
        return;
    }
    items.sort_by(|a, b| {
        for order in orders {
            let ordering = match (lookup(a, &order.attribute), lookup(b, &order.attribute)) {
                (Some(left), Some(right)) => left.loose_cmp(&right),
                (None, Some(_)) => Ordering::Less,
                (Some(_), None) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            };
            let ordering = if order.descending {
                ordering.reverse()
            } else {
                ordering
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    });
}

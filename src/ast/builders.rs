//! Fluent builders for the query model.

use super::{
    AggregateFunc, Combine, CombineKind, Condition, Connector, Criterion, CriterionValue,
    FieldSelection, Join, JoinCriterion, JoinKind, Operator, Query, QueryMode, Recurse,
    RecurseDirection, Sort, SortDirection, Value,
};

/// Helper to create a criterion condition.
fn make_criterion(
    field: &str,
    op: Operator,
    value: CriterionValue,
    connector: Connector,
) -> Condition {
    Condition::Criterion(Criterion {
        field: field.to_string(),
        op,
        value,
        connector,
    })
}

/// Create an equality condition (field = value).
pub fn eq(field: &str, value: impl Into<Value>) -> Condition {
    criterion(field, Operator::Eq, value)
}

pub fn ne(field: &str, value: impl Into<Value>) -> Condition {
    criterion(field, Operator::Ne, value)
}

pub fn gt(field: &str, value: impl Into<Value>) -> Condition {
    criterion(field, Operator::Gt, value)
}

pub fn lt(field: &str, value: impl Into<Value>) -> Condition {
    criterion(field, Operator::Lt, value)
}

pub fn contains(field: &str, value: &str) -> Condition {
    criterion(field, Operator::Contains, value)
}

pub fn is_null(field: &str) -> Condition {
    make_criterion(field, Operator::IsNull, CriterionValue::None, Connector::And)
}

pub fn is_not_null(field: &str) -> Condition {
    make_criterion(
        field,
        Operator::IsNotNull,
        CriterionValue::None,
        Connector::And,
    )
}

/// Create a criterion condition with an AND connector.
pub fn criterion(field: &str, op: Operator, value: impl Into<Value>) -> Condition {
    make_criterion(
        field,
        op,
        CriterionValue::Literal(value.into()),
        Connector::And,
    )
}

/// Flip a condition's connector to OR.
pub fn or(mut cond: Condition) -> Condition {
    match &mut cond {
        Condition::Criterion(c) => c.connector = Connector::Or,
        Condition::Group { connector, .. } => *connector = Connector::Or,
    }
    cond
}

impl Query {
    /// Start a structured query over a logical entity.
    pub fn read(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            ..Default::default()
        }
    }

    /// Start an opaque pass-through query. The text is handed to the
    /// execution layer untouched.
    pub fn raw(sql: impl Into<String>) -> Self {
        Self {
            mode: QueryMode::RawText,
            raw_text: sql.into(),
            ..Default::default()
        }
    }

    pub fn bind_raw(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.raw_params.push((name.into(), value.into()));
        self
    }

    /// Add a criterion connected with AND.
    pub fn filter(mut self, field: &str, op: Operator, value: impl Into<Value>) -> Self {
        self.conditions.push(make_criterion(
            field,
            op,
            CriterionValue::Literal(value.into()),
            Connector::And,
        ));
        self
    }

    /// Add a criterion connected with OR.
    pub fn or_filter(mut self, field: &str, op: Operator, value: impl Into<Value>) -> Self {
        self.conditions.push(make_criterion(
            field,
            op,
            CriterionValue::Literal(value.into()),
            Connector::Or,
        ));
        self
    }

    /// Add a no-value criterion (IS NULL / IS NOT NULL).
    pub fn filter_null(mut self, field: &str, op: Operator) -> Self {
        self.conditions
            .push(make_criterion(field, op, CriterionValue::None, Connector::And));
        self
    }

    /// Add a field-to-field criterion on the same entity.
    pub fn filter_field(mut self, field: &str, op: Operator, other: &str) -> Self {
        self.conditions.push(make_criterion(
            field,
            op,
            CriterionValue::Field(other.to_string()),
            Connector::And,
        ));
        self
    }

    /// Add a criterion whose value is a subquery.
    pub fn filter_subquery(mut self, field: &str, op: Operator, sub: Query) -> Self {
        self.conditions.push(make_criterion(
            field,
            op,
            CriterionValue::Subquery(Box::new(sub)),
            Connector::And,
        ));
        self
    }

    /// Add a parenthesized condition group connected with AND.
    pub fn group(mut self, conditions: Vec<Condition>) -> Self {
        self.conditions.push(Condition::Group {
            connector: Connector::And,
            conditions,
        });
        self
    }

    /// Add a parenthesized condition group connected with OR.
    pub fn or_group(mut self, conditions: Vec<Condition>) -> Self {
        self.conditions.push(Condition::Group {
            connector: Connector::Or,
            conditions,
        });
        self
    }

    pub fn sort(mut self, field: &str) -> Self {
        self.sorts.push(Sort {
            field: field.to_string(),
            direction: SortDirection::Asc,
        });
        self
    }

    pub fn sort_desc(mut self, field: &str) -> Self {
        self.sorts.push(Sort {
            field: field.to_string(),
            direction: SortDirection::Desc,
        });
        self
    }

    pub fn join(mut self, target: Query, kind: JoinKind, criteria: Vec<JoinCriterion>) -> Self {
        self.joins.push(Join {
            target: Box::new(target),
            kind,
            criteria,
        });
        self
    }

    pub fn combine(mut self, kind: CombineKind, query: Query) -> Self {
        self.combines.push(Combine {
            kind,
            query: Box::new(query),
        });
        self
    }

    /// Expand this query into a recursive closure over a parent/child
    /// relation.
    pub fn recurse(
        mut self,
        data_field: &str,
        relation_field: &str,
        direction: RecurseDirection,
    ) -> Self {
        self.recurse = Some(Recurse {
            data_field: data_field.to_string(),
            relation_field: relation_field.to_string(),
            direction,
        });
        self
    }

    pub fn page(mut self, skip: u64, take: u64) -> Self {
        self.skip = Some(skip);
        self.take = Some(take);
        self
    }

    pub fn take(mut self, take: u64) -> Self {
        self.take = Some(take);
        self
    }

    pub fn field(mut self, name: &str) -> Self {
        self.fields.push(FieldSelection::Named(name.to_string()));
        self
    }

    pub fn fields<I: IntoIterator<Item = S>, S: Into<String>>(mut self, names: I) -> Self {
        self.fields
            .extend(names.into_iter().map(|n| FieldSelection::Named(n.into())));
        self
    }

    pub fn aggregate(mut self, func: AggregateFunc, field: Option<&str>, alias: &str) -> Self {
        self.fields.push(FieldSelection::Aggregate {
            func,
            field: field.map(str::to_string),
            alias: Some(alias.to_string()),
        });
        self
    }

    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    pub fn group_by(mut self, field: &str) -> Self {
        self.group_by.push(field.to_string());
        self
    }

    pub fn having(mut self, cond: Condition) -> Self {
        self.having.push(cond);
        self
    }

    pub fn shard(mut self, value: impl Into<Value>) -> Self {
        self.shard = Some(value.into());
        self
    }
}

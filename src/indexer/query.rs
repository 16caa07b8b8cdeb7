//! Filter-description builder for subgraph queries
//!
//! A query is an entity name, a set of field predicates, and the requested
//! fields. Only equality and set-membership (`in`) predicates exist; that is
//! all the staking views need.

use serde_json::json;

/// A single field predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// `field == value`
    Eq(String, String),
    /// `field in values`
    In(String, Vec<String>),
}

/// Declarative description of one subgraph query.
#[derive(Debug, Clone)]
pub struct Query {
    entity: String,
    predicates: Vec<Predicate>,
    fields: Vec<String>,
}

impl Query {
    pub fn new(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            predicates: Vec::new(),
            fields: Vec::new(),
        }
    }

    /// The entity name, which is also the key of the result rows in the
    /// response payload.
    pub fn entity(&self) -> &str {
        &self.entity
    }

    pub fn filter_eq(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.predicates
            .push(Predicate::Eq(field.into(), value.into()));
        self
    }

    pub fn filter_in(
        mut self,
        field: impl Into<String>,
        values: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.predicates.push(Predicate::In(
            field.into(),
            values.into_iter().map(Into::into).collect(),
        ));
        self
    }

    /// Request a field. Nested selections are passed through verbatim
    /// (e.g. `"gauge { id poolId }"`).
    pub fn field(mut self, name: impl Into<String>) -> Self {
        self.fields.push(name.into());
        self
    }

    /// Render to the GraphQL document the subgraph endpoint accepts.
    pub fn to_graphql(&self) -> String {
        let where_clause = if self.predicates.is_empty() {
            String::new()
        } else {
            let parts: Vec<String> = self
                .predicates
                .iter()
                .map(|p| match p {
                    // json!() handles string escaping for us.
                    Predicate::Eq(field, value) => format!("{}: {}", field, json!(value)),
                    Predicate::In(field, values) => format!("{}_in: {}", field, json!(values)),
                })
                .collect();
            format!("(where: {{ {} }})", parts.join(", "))
        };
        format!(
            "{{ {}{} {{ {} }} }}",
            self.entity,
            where_clause,
            self.fields.join(" ")
        )
    }
}

// ============================================
// TESTS
// ============================================

use serde::Deserialize;

use super::task::Programme;
use super::SearchError;

/// Programme attribute a comparison looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum Field {
    #[serde(rename = "Programme.channelID")]
    ChannelId,
    #[serde(rename = "Programme.name")]
    Name,
    #[serde(rename = "Programme.programmeID")]
    ProgrammeId,
    #[serde(rename = "Programme.startTime")]
    StartTime,
    #[serde(rename = "Programme.endTime")]
    EndTime,
}

impl Field {
    pub fn is_numeric(&self) -> bool {
        matches!(self, Field::StartTime | Field::EndTime)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Comparison {
    Equal,
    NotEqual,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,
    Contains,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    /// Lowercased at build time.
    Text(String),
    Number(i64),
}

/// Validated query tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    Compare {
        field: Field,
        comparison: Comparison,
        value: Operand,
    },
    And(Vec<Query>),
    Or(Vec<Query>),
    Not(Box<Query>),
}

// ---------------------------------------------------------------------------
// Serialized form
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
enum RawQuery {
    Compare {
        field: Field,
        comparison: Comparison,
        value: RawValue,
    },
    And(Vec<RawQuery>),
    Or(Vec<RawQuery>),
    Not(Box<RawQuery>),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawValue {
    Number(i64),
    Text(String),
}

impl Query {
    /// Build a query from its JSON form.
    pub fn parse(text: &str) -> Result<Self, SearchError> {
        let raw: RawQuery = serde_json::from_str(text)?;
        Self::build(raw)
    }

    fn build(raw: RawQuery) -> Result<Self, SearchError> {
        match raw {
            RawQuery::Compare {
                field,
                comparison,
                value,
            } => {
                let value = match (field.is_numeric(), value) {
                    (true, RawValue::Number(n)) => Operand::Number(n),
                    (true, RawValue::Text(s)) => Operand::Number(
                        s.trim()
                            .parse()
                            .map_err(|_| SearchError::NotANumber { field, value: s })?,
                    ),
                    (false, RawValue::Text(s)) => Operand::Text(s.to_lowercase()),
                    (false, RawValue::Number(n)) => Operand::Text(n.to_string()),
                };
                Ok(Query::Compare {
                    field,
                    comparison,
                    value,
                })
            }
            RawQuery::And(items) => Ok(Query::And(Self::build_all(items)?)),
            RawQuery::Or(items) => Ok(Query::Or(Self::build_all(items)?)),
            RawQuery::Not(inner) => Ok(Query::Not(Box::new(Self::build(*inner)?))),
        }
    }

    fn build_all(items: Vec<RawQuery>) -> Result<Vec<Query>, SearchError> {
        if items.is_empty() {
            return Err(SearchError::EmptyOperands);
        }
        items.into_iter().map(Self::build).collect()
    }

    /// Evaluate against a programme broadcast on channel `ccid`.
    pub fn matches(&self, programme: &Programme, ccid: &str) -> bool {
        match self {
            Query::Compare {
                field,
                comparison,
                value,
            } => match (field, value) {
                (Field::StartTime, Operand::Number(n)) => compare_numbers(*comparison, programme.start_time, *n),
                (Field::EndTime, Operand::Number(n)) => compare_numbers(*comparison, programme.end_time(), *n),
                (Field::ChannelId, Operand::Text(s)) => compare_text(*comparison, ccid, s),
                (Field::Name, Operand::Text(s)) => compare_text(*comparison, &programme.name, s),
                (Field::ProgrammeId, Operand::Text(s)) => compare_text(*comparison, &programme.programme_id, s),
                _ => false,
            },
            Query::And(items) => items.iter().all(|q| q.matches(programme, ccid)),
            Query::Or(items) => items.iter().any(|q| q.matches(programme, ccid)),
            Query::Not(inner) => !inner.matches(programme, ccid),
        }
    }
}

fn compare_text(comparison: Comparison, actual: &str, wanted: &str) -> bool {
    let actual = actual.to_lowercase();
    let actual = actual.as_str();
    match comparison {
        Comparison::Equal => actual == wanted,
        Comparison::NotEqual => actual != wanted,
        Comparison::Greater => actual > wanted,
        Comparison::GreaterEqual => actual >= wanted,
        Comparison::Less => actual < wanted,
        Comparison::LessEqual => actual <= wanted,
        Comparison::Contains => actual.contains(wanted),
    }
}

fn compare_numbers(comparison: Comparison, actual: i64, wanted: i64) -> bool {
    match comparison {
        Comparison::Equal | Comparison::Contains => actual == wanted,
        Comparison::NotEqual => actual != wanted,
        Comparison::Greater => actual > wanted,
        Comparison::GreaterEqual => actual >= wanted,
        Comparison::Less => actual < wanted,
        Comparison::LessEqual => actual <= wanted,
    }
}

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Relational operator used by threshold nodes and feedback conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Comparison {
    #[serde(rename = "<")]
    Less,
    #[serde(rename = "<=")]
    LessOrEqual,
    #[serde(rename = ">")]
    Greater,
    #[serde(rename = ">=")]
    GreaterOrEqual,
    #[serde(rename = "==")]
    Equal,
    #[serde(rename = "!=")]
    NotEqual,
}

impl Comparison {
    /// Symbols in declaration order, for combo box attributes.
    pub const SYMBOLS: &'static [&'static str] = &["<", "<=", ">", ">=", "==", "!="];

    pub fn evaluate(self, value: f64, reference: f64) -> bool {
        match self {
            Comparison::Less => value < reference,
            Comparison::LessOrEqual => value <= reference,
            Comparison::Greater => value > reference,
            Comparison::GreaterOrEqual => value >= reference,
            Comparison::Equal => value == reference,
            Comparison::NotEqual => value != reference,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Comparison::Less => "<",
            Comparison::LessOrEqual => "<=",
            Comparison::Greater => ">",
            Comparison::GreaterOrEqual => ">=",
            Comparison::Equal => "==",
            Comparison::NotEqual => "!=",
        }
    }
}

impl FromStr for Comparison {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "<" => Ok(Comparison::Less),
            "<=" => Ok(Comparison::LessOrEqual),
            ">" => Ok(Comparison::Greater),
            ">=" => Ok(Comparison::GreaterOrEqual),
            "==" => Ok(Comparison::Equal),
            "!=" => Ok(Comparison::NotEqual),
            other => Err(format!("unknown comparison '{}'", other)),
        }
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

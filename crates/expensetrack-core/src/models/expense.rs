use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Expense categories offered by the entry form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum Category {
    #[default]
    Food,
    Petrol,
    Salary,
    Entertainment,
    Other,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Food,
        Category::Petrol,
        Category::Salary,
        Category::Entertainment,
        Category::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Food => "Food",
            Category::Petrol => "Petrol",
            Category::Salary => "Salary",
            Category::Entertainment => "Entertainment",
            Category::Other => "Other",
        }
    }

    /// Parse a stored category name. Unknown names fall back to `Other`.
    pub fn from_name(name: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(name.trim()))
            .unwrap_or(Category::Other)
    }

    /// Get the next category (wrapping around)
    pub fn next(&self) -> Self {
        match self {
            Category::Food => Category::Petrol,
            Category::Petrol => Category::Salary,
            Category::Salary => Category::Entertainment,
            Category::Entertainment => Category::Other,
            Category::Other => Category::Food,
        }
    }

    /// Get the previous category (wrapping around)
    pub fn prev(&self) -> Self {
        match self {
            Category::Food => Category::Other,
            Category::Petrol => Category::Food,
            Category::Salary => Category::Petrol,
            Category::Entertainment => Category::Salary,
            Category::Other => Category::Entertainment,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Category {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(Category::from_name(&name))
    }
}

/// Records written by the web client stored the amount as the raw input
/// string, so accept either a number or a numeric string.
fn deserialize_money<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Money {
        Number(f64),
        Text(String),
    }

    let amount = match Money::deserialize(deserializer)? {
        Money::Number(n) => n,
        Money::Text(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| serde::de::Error::custom(format!("invalid amount: {:?}", s)))?,
    };
    if amount.is_finite() && amount > 0.0 {
        Ok(amount)
    } else {
        Err(serde::de::Error::custom(format!("amount must be positive: {}", amount)))
    }
}

/// An expense as stored remotely, without its key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseDraft {
    #[serde(deserialize_with = "deserialize_money")]
    pub money: f64,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: Category,
}

/// An expense with its store key.
#[derive(Debug, Clone, PartialEq)]
pub struct Expense {
    pub id: String,
    pub money: f64,
    pub description: String,
    pub category: Category,
}

impl Expense {
    pub fn from_draft(id: impl Into<String>, draft: ExpenseDraft) -> Self {
        Self {
            id: id.into(),
            money: draft.money,
            description: draft.description,
            category: draft.category,
        }
    }

    pub fn to_draft(&self) -> ExpenseDraft {
        ExpenseDraft {
            money: self.money,
            description: self.description.clone(),
            category: self.category,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_from_name() {
        assert_eq!(Category::from_name("Food"), Category::Food);
        assert_eq!(Category::from_name("petrol"), Category::Petrol);
        assert_eq!(Category::from_name(" Entertainment "), Category::Entertainment);
        assert_eq!(Category::from_name("Groceries"), Category::Other);
    }

    #[test]
    fn test_category_cycle() {
        let mut c = Category::Food;
        for _ in 0..Category::ALL.len() {
            c = c.next();
        }
        assert_eq!(c, Category::Food);
        assert_eq!(Category::Food.prev(), Category::Other);
        assert_eq!(Category::Other.next(), Category::Food);
    }

    #[test]
    fn test_draft_accepts_string_money() {
        let draft: ExpenseDraft =
            serde_json::from_str(r#"{"money":"200","description":"Tea","category":"Food"}"#).unwrap();
        assert_eq!(draft.money, 200.0);
        assert_eq!(draft.description, "Tea");
        assert_eq!(draft.category, Category::Food);

        let draft: ExpenseDraft =
            serde_json::from_str(r#"{"money":12.5,"description":"Bus","category":"Travel"}"#).unwrap();
        assert_eq!(draft.money, 12.5);
        assert_eq!(draft.category, Category::Other);
    }

    #[test]
    fn test_draft_rejects_bad_money() {
        let result: Result<ExpenseDraft, _> =
            serde_json::from_str(r#"{"money":"lots","description":"x","category":"Food"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_draft_rejects_non_positive_or_infinite_money() {
        for money in [r#""inf""#, "-5", r#""""#, "0", r#""NaN""#] {
            let json = format!(r#"{{"money":{},"description":"x","category":"Food"}}"#, money);
            let result: Result<ExpenseDraft, _> = serde_json::from_str(&json);
            assert!(result.is_err(), "accepted money {}", money);
        }
    }

    #[test]
    fn test_draft_serializes_category_name() {
        let draft = ExpenseDraft {
            money: 50.0,
            description: "Fuel".to_string(),
            category: Category::Petrol,
        };
        let json = serde_json::to_value(&draft).unwrap();
        assert_eq!(json["category"], "Petrol");
        assert_eq!(json["money"], 50.0);
    }
}

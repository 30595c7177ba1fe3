use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};

use crate::models::Expense;
use crate::utils::format_amount;

const CSV_HEADER: &str = "Money,Description,Category";

/// Quote a field if it contains a delimiter, quote or line break.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Render expenses as CSV, one row per expense, with a header row.
pub fn to_csv<'a>(expenses: impl IntoIterator<Item = &'a Expense>) -> String {
    let mut out = String::from(CSV_HEADER);
    out.push_str("\r\n");
    for expense in expenses {
        out.push_str(&format_amount(expense.money));
        out.push(',');
        out.push_str(&csv_field(&expense.description));
        out.push(',');
        out.push_str(expense.category.as_str());
        out.push_str("\r\n");
    }
    out
}

pub fn write_csv<'a>(path: &Path, expenses: impl IntoIterator<Item = &'a Expense>) -> Result<()> {
    let mut file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    file.write_all(to_csv(expenses).as_bytes())
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, ExpenseDraft};

    fn expense(id: &str, money: f64, description: &str, category: Category) -> Expense {
        Expense::from_draft(
            id,
            ExpenseDraft {
                money,
                description: description.to_string(),
                category,
            },
        )
    }

    #[test]
    fn test_to_csv() {
        let expenses = vec![
            expense("a", 12000.0, "Bike", Category::Other),
            expense("b", 20.5, "Tea, biscuits", Category::Food),
            expense("c", 5.0, "Said \"hi\"", Category::Entertainment),
        ];
        let csv = to_csv(&expenses);
        let lines: Vec<&str> = csv.split("\r\n").collect();
        assert_eq!(lines[0], "Money,Description,Category");
        assert_eq!(lines[1], "12000,Bike,Other");
        assert_eq!(lines[2], "20.50,\"Tea, biscuits\",Food");
        assert_eq!(lines[3], "5,\"Said \"\"hi\"\"\",Entertainment");
    }

    #[test]
    fn test_write_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("expenses.csv");
        write_csv(&path, &[expense("a", 1.0, "Pen", Category::Other)]).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with("Money,Description,Category\r\n1,Pen,Other"));
    }
}

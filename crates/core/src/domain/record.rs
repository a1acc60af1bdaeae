use serde::{Deserialize, Serialize};

/// Columns of the employee spreadsheet that lookups can match on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordField {
    FullName,
    PhoneNumber,
    Salary,
    DayOffs,
}

impl RecordField {
    pub fn label(&self) -> &'static str {
        match self {
            Self::FullName => "full_name",
            Self::PhoneNumber => "phone_number",
            Self::Salary => "salary",
            Self::DayOffs => "day_offs",
        }
    }
}

/// Read-only employee row owned by the spreadsheet.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub full_name: String,
    pub phone_number: String,
    pub salary: String,
    pub day_off_balance: String,
}

impl Record {
    pub fn field(&self, field: RecordField) -> &str {
        match field {
            RecordField::FullName => &self.full_name,
            RecordField::PhoneNumber => &self.phone_number,
            RecordField::Salary => &self.salary,
            RecordField::DayOffs => &self.day_off_balance,
        }
    }

    /// Splits the stored full name into `(first, last)`. Any shape other than
    /// exactly two whitespace-separated tokens yields `None`.
    pub fn split_name(&self) -> Option<(String, String)> {
        let mut tokens = self.full_name.split_whitespace();
        let first = tokens.next()?;
        let last = tokens.next()?;
        if tokens.next().is_some() {
            return None;
        }
        Some((first.to_owned(), last.to_owned()))
    }
}

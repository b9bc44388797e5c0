//! Feature encoding for term-deposit model inference.
//!
//! Turns a validated record into the tabular row the trained pipeline
//! expects. Only two column groups are rewritten here: the yes/no flags
//! become 1/0 and the contact month becomes its ordinal. Everything else
//! passes through for the artifact's own column transformer.

use crate::types::record::InputRecord;
use indexmap::IndexMap;
use std::fmt;

/// A single table cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    Text(String),
    /// Missing-value marker produced when a lookup has no entry.
    Missing,
}

impl Value {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(v) => write!(f, "{}", v),
            Value::Text(s) => f.write_str(s),
            Value::Missing => f.write_str("<missing>"),
        }
    }
}

/// Ordered, named columns of equal length.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    columns: IndexMap<String, Vec<Value>>,
}

impl Frame {
    pub fn new() -> Self {
        Self::default()
    }

    /// Single-row frame with one column per record field, in field order.
    pub fn from_record(record: &InputRecord) -> Self {
        let cells = [
            Value::Number(record.age as f64),
            Value::Number(record.balance),
            Value::Number(record.duration as f64),
            Value::Number(record.campaign as f64),
            Value::Number(record.previous as f64),
            Value::Text(record.job.as_str().to_string()),
            Value::Text(record.marital.as_str().to_string()),
            Value::Text(record.education.as_str().to_string()),
            Value::Text(record.default.as_str().to_string()),
            Value::Text(record.housing.as_str().to_string()),
            Value::Text(record.loan.as_str().to_string()),
            Value::Text(record.contact.as_str().to_string()),
            Value::Text(record.month.as_str().to_string()),
            Value::Text(record.poutcome.as_str().to_string()),
        ];

        let mut frame = Self::new();
        for (name, cell) in InputRecord::FIELDS.iter().zip(cells) {
            frame.insert(name, vec![cell]);
        }
        frame
    }

    /// Insert or replace a column. Replacing keeps the column's position.
    pub fn insert(&mut self, name: &str, values: Vec<Value>) {
        self.columns.insert(name.to_string(), values);
    }

    /// Set `name` to `value` on every row.
    pub fn fill(&mut self, name: &str, value: Value) {
        let rows = self.rows();
        self.insert(name, vec![value; rows]);
    }

    pub fn column(&self, name: &str) -> Option<&[Value]> {
        self.columns.get(name).map(Vec::as_slice)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.keys().map(String::as_str).collect()
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn rows(&self) -> usize {
        self.columns.values().next().map(Vec::len).unwrap_or(0)
    }

    fn map_column(&mut self, name: &str, f: impl Fn(&Value) -> Value) {
        if let Some(values) = self.columns.get_mut(name) {
            for value in values.iter_mut() {
                *value = f(value);
            }
        }
    }
}

/// Maps `"yes"` to 1 and `"no"` to 0 on the configured columns.
#[derive(Debug, Clone)]
pub struct BinaryMapper {
    columns: Vec<String>,
}

impl BinaryMapper {
    pub fn new<S: AsRef<str>>(columns: &[S]) -> Self {
        Self {
            columns: columns.iter().map(|c| c.as_ref().to_string()).collect(),
        }
    }

    /// Any value other than the two known strings becomes [`Value::Missing`].
    pub fn map_value(value: &Value) -> Value {
        match value.as_text() {
            Some("yes") => Value::Number(1.0),
            Some("no") => Value::Number(0.0),
            _ => Value::Missing,
        }
    }

    pub fn transform(&self, mut frame: Frame) -> Frame {
        for column in &self.columns {
            frame.map_column(column, Self::map_value);
        }
        frame
    }

    /// Output column names; mapping never renames a column.
    pub fn feature_names_out<S: AsRef<str>>(&self, input: &[S]) -> Vec<String> {
        input.iter().map(|c| c.as_ref().to_string()).collect()
    }
}

const MONTHS: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

/// Maps three-letter month abbreviations to 1 (jan) through 12 (dec).
#[derive(Debug, Clone)]
pub struct MonthMapper {
    column: String,
}

impl MonthMapper {
    pub fn new(column: &str) -> Self {
        Self {
            column: column.to_string(),
        }
    }

    pub fn map_value(value: &Value) -> Value {
        value
            .as_text()
            .and_then(|s| MONTHS.iter().position(|m| *m == s))
            .map(|idx| Value::Number((idx + 1) as f64))
            .unwrap_or(Value::Missing)
    }

    pub fn transform(&self, mut frame: Frame) -> Frame {
        frame.map_column(&self.column, Self::map_value);
        frame
    }

    pub fn feature_names_out<S: AsRef<str>>(&self, input: &[S]) -> Vec<String> {
        input.iter().map(|c| c.as_ref().to_string()).collect()
    }
}

/// Placeholder columns the deployed pipeline requires but callers never send.
pub const FILLER_COLUMNS: [(&str, f64); 2] = [("day", 1.0), ("pdays", -1.0)];

/// Composes filler-column injection, the binary mapper and the month mapper.
#[derive(Debug, Clone)]
pub struct FeatureEncoder {
    binary: BinaryMapper,
    month: MonthMapper,
}

impl FeatureEncoder {
    pub fn new() -> Self {
        Self {
            binary: BinaryMapper::new(&["default", "housing", "loan"]),
            month: MonthMapper::new("month"),
        }
    }

    /// Encode one record into a single-row frame.
    pub fn encode(&self, record: &InputRecord) -> EncodedRow {
        EncodedRow(self.encode_frame(Frame::from_record(record)))
    }

    /// Apply the encoding steps to an arbitrary frame.
    pub fn encode_frame(&self, mut frame: Frame) -> Frame {
        for (name, value) in FILLER_COLUMNS {
            frame.fill(name, Value::Number(value));
        }
        let frame = self.binary.transform(frame);
        self.month.transform(frame)
    }

    /// Column names produced for a single record.
    pub fn feature_names(&self) -> Vec<String> {
        let mut names: Vec<String> = InputRecord::FIELDS.iter().map(|s| s.to_string()).collect();
        names.extend(FILLER_COLUMNS.iter().map(|(name, _)| name.to_string()));
        let names = self.binary.feature_names_out(&names);
        self.month.feature_names_out(&names)
    }
}

impl Default for FeatureEncoder {
    fn default() -> Self {
        Self::new()
    }
}

/// A record after encoding. Lives for a single request.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedRow(Frame);

impl EncodedRow {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.column(name).and_then(|values| values.first())
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.0.column_names()
    }

    pub fn len(&self) -> usize {
        self.0.width()
    }

    pub fn is_empty(&self) -> bool {
        self.0.width() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::record::{Contact, Education, Job, Marital, Month, Poutcome, YesNo};

    fn sample_record() -> InputRecord {
        InputRecord {
            age: 35,
            balance: 1500.0,
            duration: 200,
            campaign: 2,
            previous: 0,
            job: Job::Technician,
            marital: Marital::Married,
            education: Education::Secondary,
            default: YesNo::No,
            housing: YesNo::Yes,
            loan: YesNo::No,
            contact: Contact::Cellular,
            month: Month::May,
            poutcome: Poutcome::Unknown,
        }
    }

    fn text(s: &str) -> Value {
        Value::Text(s.to_string())
    }

    #[test]
    fn test_binary_mapper_values() {
        assert_eq!(BinaryMapper::map_value(&text("yes")), Value::Number(1.0));
        assert_eq!(BinaryMapper::map_value(&text("no")), Value::Number(0.0));
        assert_eq!(BinaryMapper::map_value(&text("YES")), Value::Missing);
        assert_eq!(BinaryMapper::map_value(&Value::Number(1.0)), Value::Missing);
    }

    #[test]
    fn test_binary_mapper_only_touches_its_columns() {
        let mut frame = Frame::new();
        frame.insert("housing", vec![text("yes"), text("no"), text("maybe")]);
        frame.insert("job", vec![text("yes"), text("no"), text("student")]);

        let mapper = BinaryMapper::new(&["housing"]);
        let out = mapper.transform(frame);

        assert_eq!(
            out.column("housing").unwrap(),
            &[Value::Number(1.0), Value::Number(0.0), Value::Missing]
        );
        assert_eq!(out.column("job").unwrap()[0], text("yes"));
        assert_eq!(out.column_names(), vec!["housing", "job"]);
        assert_eq!(mapper.feature_names_out(&["housing"]), vec!["housing"]);
    }

    #[test]
    fn test_month_mapper() {
        assert_eq!(MonthMapper::map_value(&text("jan")), Value::Number(1.0));
        assert_eq!(MonthMapper::map_value(&text("may")), Value::Number(5.0));
        assert_eq!(MonthMapper::map_value(&text("dec")), Value::Number(12.0));
        assert_eq!(MonthMapper::map_value(&text("abc")), Value::Missing);
        assert_eq!(MonthMapper::map_value(&text("Jan")), Value::Missing);
    }

    #[test]
    fn test_encode_example_record() {
        let row = FeatureEncoder::new().encode(&sample_record());

        assert_eq!(row.get("default"), Some(&Value::Number(0.0)));
        assert_eq!(row.get("housing"), Some(&Value::Number(1.0)));
        assert_eq!(row.get("loan"), Some(&Value::Number(0.0)));
        assert_eq!(row.get("month"), Some(&Value::Number(5.0)));
        assert_eq!(row.get("day"), Some(&Value::Number(1.0)));
        assert_eq!(row.get("pdays"), Some(&Value::Number(-1.0)));

        assert_eq!(row.get("age"), Some(&Value::Number(35.0)));
        assert_eq!(row.get("balance"), Some(&Value::Number(1500.0)));
        assert_eq!(row.get("job"), Some(&text("technician")));
        assert_eq!(row.get("contact"), Some(&text("cellular")));
        assert_eq!(row.get("poutcome"), Some(&text("unknown")));
        assert_eq!(row.len(), 16);
    }

    #[test]
    fn test_feature_names_match_encoded_row() {
        let encoder = FeatureEncoder::new();
        let row = encoder.encode(&sample_record());
        assert_eq!(encoder.feature_names(), row.column_names());
    }

    #[test]
    fn test_filler_overrides_existing_column() {
        let mut frame = Frame::new();
        frame.insert("pdays", vec![Value::Number(30.0), Value::Number(7.0)]);
        frame.insert("month", vec![text("oct"), text("xyz")]);

        let out = FeatureEncoder::new().encode_frame(frame);
        assert_eq!(
            out.column("pdays").unwrap(),
            &[Value::Number(-1.0), Value::Number(-1.0)]
        );
        assert_eq!(out.column("day").unwrap().len(), 2);
        assert_eq!(
            out.column("month").unwrap(),
            &[Value::Number(10.0), Value::Missing]
        );
    }
}

//! Customer record submitted for term-deposit subscription prediction

use serde::{Serialize, Serializer};
use std::fmt;

/// Declares a closed-set categorical field.
///
/// Each variant is bound to its exact wire spelling; parsing is
/// case-sensitive and rejects anything outside the set.
macro_rules! closed_set {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $($variant:ident => $wire:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            /// Accepted wire values, in declaration order.
            pub const VARIANTS: &'static [&'static str] = &[$($wire),+];

            /// Wire spelling of this value.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $wire),+
                }
            }

            /// Parse an exact wire spelling.
            pub fn parse(value: &str) -> Option<Self> {
                match value {
                    $($wire => Some(Self::$variant),)+
                    _ => None,
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }
    };
}

closed_set! {
    /// Type of job
    pub enum Job {
        Management => "management",
        Technician => "technician",
        Entrepreneur => "entrepreneur",
        BlueCollar => "blue-collar",
        Unknown => "unknown",
        Retired => "retired",
        Admin => "admin.",
        Services => "services",
        SelfEmployed => "self-employed",
        Unemployed => "unemployed",
        Housemaid => "housemaid",
        Student => "student",
    }
}

closed_set! {
    /// Marital status
    pub enum Marital {
        Married => "married",
        Single => "single",
        Divorced => "divorced",
    }
}

closed_set! {
    /// Education level
    pub enum Education {
        Tertiary => "tertiary",
        Secondary => "secondary",
        Unknown => "unknown",
        Primary => "primary",
    }
}

closed_set! {
    /// Binary yes/no answer (credit default, housing loan, personal loan)
    pub enum YesNo {
        No => "no",
        Yes => "yes",
    }
}

closed_set! {
    /// Contact communication type
    pub enum Contact {
        Unknown => "unknown",
        Cellular => "cellular",
        Telephone => "telephone",
    }
}

closed_set! {
    /// Month of the last contact, in calendar order
    pub enum Month {
        Jan => "jan",
        Feb => "feb",
        Mar => "mar",
        Apr => "apr",
        May => "may",
        Jun => "jun",
        Jul => "jul",
        Aug => "aug",
        Sep => "sep",
        Oct => "oct",
        Nov => "nov",
        Dec => "dec",
    }
}

closed_set! {
    /// Outcome of the previous marketing campaign
    pub enum Poutcome {
        Unknown => "unknown",
        Other => "other",
        Failure => "failure",
        Success => "success",
    }
}

/// One customer's feature values at prediction time.
///
/// Instances are only produced by [`InputRecord::from_json`](crate::schema),
/// so every bound and closed set has already been checked.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InputRecord {
    /// Age in years (18..=120)
    pub age: i64,

    /// Average yearly balance
    pub balance: f64,

    /// Last contact duration in seconds (>= 0)
    pub duration: i64,

    /// Contacts performed during this campaign (>= 1)
    pub campaign: i64,

    /// Contacts performed before this campaign (>= 0)
    pub previous: i64,

    pub job: Job,
    pub marital: Marital,
    pub education: Education,

    /// Has credit in default
    pub default: YesNo,

    /// Has housing loan
    pub housing: YesNo,

    /// Has personal loan
    pub loan: YesNo,

    pub contact: Contact,
    pub month: Month,
    pub poutcome: Poutcome,
}

impl InputRecord {
    /// Field names in the order the record is laid out as a table row.
    pub const FIELDS: [&'static str; 14] = [
        "age",
        "balance",
        "duration",
        "campaign",
        "previous",
        "job",
        "marital",
        "education",
        "default",
        "housing",
        "loan",
        "contact",
        "month",
        "poutcome",
    ];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_spellings() {
        assert_eq!(Job::parse("admin."), Some(Job::Admin));
        assert_eq!(Job::parse("blue-collar"), Some(Job::BlueCollar));
        assert_eq!(Job::parse("Admin."), None);
        assert_eq!(Month::Dec.as_str(), "dec");
        assert_eq!(Month::VARIANTS.len(), 12);
        assert_eq!(Job::VARIANTS.len(), 12);
    }

    #[test]
    fn test_record_serialization() {
        let record = InputRecord {
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
        };

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["job"], "technician");
        assert_eq!(json["default"], "no");
        assert_eq!(json["month"], "may");
        assert_eq!(json.as_object().unwrap().len(), InputRecord::FIELDS.len());
    }
}

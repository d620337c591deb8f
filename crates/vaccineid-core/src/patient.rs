//! Patient profile and immunization record models
//!
//! Names are stored upper-cased. The title-cased display form is produced at
//! read time by [`Patient::display_name`] and [`Patient::display_surname`].

use serde::{Deserialize, Serialize};

/// A single administered vaccine dose
///
/// Records have no identity of their own; they live in the owning patient's
/// `immunizations` list in insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImmunizationRecord {
    /// Vaccine name
    pub name: String,
    pub manufacturer: String,
    /// Administering provider
    pub provider: String,
    /// Administration date (`YYYY-MM-DD`)
    pub date: String,
    /// Lot identifier
    pub lot: String,
}

/// Patient profile document
///
/// The document id doubles as the store partition key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patient {
    pub id: String,
    pub name: String,
    pub surname: String,
    /// Date of birth (`YYYY-MM-DD`)
    pub dob: String,
    #[serde(default)]
    pub immunizations: Vec<ImmunizationRecord>,
}

impl Patient {
    /// Create a profile with no immunization history
    ///
    /// Name and surname are upper-cased as stored.
    pub fn new(id: impl Into<String>, name: &str, surname: &str, dob: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.to_uppercase(),
            surname: surname.to_uppercase(),
            dob: dob.into(),
            immunizations: Vec::new(),
        }
    }

    /// Title-cased given name
    pub fn display_name(&self) -> String {
        title_case(&self.name)
    }

    /// Title-cased family name
    pub fn display_surname(&self) -> String {
        title_case(&self.surname)
    }
}

/// Title-case a name: every letter that follows a non-letter is upper-cased,
/// every other letter is lower-cased.
///
/// ```
/// use vaccineid_core::title_case;
///
/// assert_eq!(title_case("MARY-JANE O'NEIL"), "Mary-Jane O'Neil");
/// ```
pub fn title_case(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut previous_is_letter = false;

    for c in value.chars() {
        if c.is_alphabetic() {
            if previous_is_letter {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            previous_is_letter = true;
        } else {
            out.push(c);
            previous_is_letter = false;
        }
    }

    out
}

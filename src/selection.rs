// ✅ IPO selection
// Either the whole catalog or an explicit list of "<name> (<registrar>)" choices

use crate::catalog::Ipo;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IpoChoice {
    pub name: String,
    pub registrar: String,
}

impl IpoChoice {
    pub fn of(ipo: &Ipo) -> Self {
        IpoChoice {
            name: ipo.name.clone(),
            registrar: ipo.registrar.clone(),
        }
    }

    /// Display label, e.g. `Acme Ltd (linkintime)`.
    pub fn label(&self) -> String {
        format!("{} ({})", self.name, self.registrar)
    }

    /// Inverse of [`IpoChoice::label`]. Splits on the last `" ("`.
    pub fn from_label(label: &str) -> Option<Self> {
        let (name, rest) = label.rsplit_once(" (")?;
        let registrar = rest.strip_suffix(')')?;
        Some(IpoChoice {
            name: name.to_string(),
            registrar: registrar.to_string(),
        })
    }
}

/// The IPOs to check for every identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    All,
    Chosen(Vec<IpoChoice>),
}

impl Selection {
    /// Concrete choices in the order they will be looked up.
    pub fn resolve(&self, catalog: &[Ipo]) -> Vec<IpoChoice> {
        match self {
            Selection::All => catalog.iter().map(IpoChoice::of).collect(),
            Selection::Chosen(choices) => choices.clone(),
        }
    }
}

/// Company id for `name`: first exact name match wins. Empty ids do not count.
pub fn company_id_for<'a>(catalog: &'a [Ipo], name: &str) -> Option<&'a str> {
    catalog
        .iter()
        .find(|ipo| ipo.name == name)
        .map(|ipo| ipo.company_id.as_str())
        .filter(|id| !id.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ipo(name: &str, registrar: &str, company_id: &str) -> Ipo {
        Ipo {
            name: name.to_string(),
            registrar: registrar.to_string(),
            company_id: company_id.to_string(),
        }
    }

    #[test]
    fn test_label_round_trip_with_parentheses_in_name() {
        let choice = IpoChoice {
            name: "Acme (India) Ltd".to_string(),
            registrar: "bigshare".to_string(),
        };

        assert_eq!(choice.label(), "Acme (India) Ltd (bigshare)");
        assert_eq!(IpoChoice::from_label(&choice.label()), Some(choice));
    }

    #[test]
    fn test_from_label_rejects_garbage() {
        assert!(IpoChoice::from_label("no registrar").is_none());
        assert!(IpoChoice::from_label("Foo (R1").is_none());
    }

    #[test]
    fn test_all_follows_catalog_order() {
        let catalog = vec![ipo("Foo", "R1", "1"), ipo("Bar", "R2", "2")];
        let choices = Selection::All.resolve(&catalog);

        assert_eq!(choices.len(), 2);
        assert_eq!(choices[0].label(), "Foo (R1)");
        assert_eq!(choices[1].label(), "Bar (R2)");
    }

    #[test]
    fn test_company_id_first_match_wins() {
        let catalog = vec![ipo("Foo", "R1", "1"), ipo("Foo", "R2", "2")];
        assert_eq!(company_id_for(&catalog, "Foo"), Some("1"));
        assert_eq!(company_id_for(&catalog, "foo"), None);
        assert_eq!(company_id_for(&catalog, "Baz"), None);
    }

    #[test]
    fn test_company_id_empty_is_unresolved() {
        let catalog = vec![ipo("Foo", "R1", "")];
        assert_eq!(company_id_for(&catalog, "Foo"), None);
    }
}

use lazy_static::lazy_static;
use regex::Regex;

use crate::{Error, Result};

/// Validates values of an allow rules definition before they are frozen.
pub trait RuleValidator {
    fn validate(&self, field: Field, value: &str) -> Result<()>;
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Field {
    Action,
    Description,
}

lazy_static! {
    static ref ACTION: Regex =
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*([:.\-][A-Za-z0-9_]+)*$").expect("valid action pattern");
}

/// Accepts identifier-like action names (`update`, `mark_paid`, `invoice:send`)
/// and any description.
#[derive(Debug, Default, Copy, Clone)]
pub struct DefaultValidator;

impl RuleValidator for DefaultValidator {
    fn validate(&self, field: Field, value: &str) -> Result<()> {
        match field {
            Field::Action if !ACTION.is_match(value) => Err(Error::Validation(format!(
                "invalid action name `{}`",
                value
            ))),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use test_case::test_case;

    use super::*;

    #[test_case("update" ; "plain")]
    #[test_case("mark_paid" ; "snake case")]
    #[test_case("invoice:send" ; "namespaced")]
    #[test_case("_internal" ; "leading underscore")]
    fn accepts_action(action: &str) {
        assert_matches!(DefaultValidator.validate(Field::Action, action), Ok(()));
    }

    #[test_case("" ; "empty")]
    #[test_case("can update" ; "whitespace")]
    #[test_case("1st" ; "leading digit")]
    #[test_case("update?" ; "predicate suffix")]
    #[test_case("invoice:" ; "dangling separator")]
    fn rejects_action(action: &str) {
        assert_matches!(
            DefaultValidator.validate(Field::Action, action),
            Err(Error::Validation(_))
        );
    }

    #[test]
    fn any_description_is_valid() {
        assert_matches!(
            DefaultValidator.validate(Field::Description, "Guests may browse."),
            Ok(())
        );
    }
}

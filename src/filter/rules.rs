//! Renders selection rules into the `grib_filter` rules language.

use crate::config::error::ConfigError;
use crate::config::parameter::{ParameterSpec, SelectionRule};
use crate::config::settings::selection_rules;
use std::collections::BTreeMap;

/// The validated rules for one filtering run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSet {
    rules: Vec<SelectionRule>,
}

impl RuleSet {
    /// Validates `parameters` and flattens them into rules, parameters in name order.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Invalid`] for an empty map or any malformed parameter.
    pub fn from_parameters(
        parameters: &BTreeMap<String, ParameterSpec>,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            rules: selection_rules(Some(parameters))?,
        })
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn rules(&self) -> &[SelectionRule] {
        &self.rules
    }

    /// One `if` block per rule, each writing matching messages to the
    /// output file given with `-o`.
    ///
    /// A statistical processing of `0` leaves the clause out so that the rule
    /// matches instantaneous and processed fields alike.
    pub fn render(&self) -> String {
        let mut text = String::new();
        for rule in &self.rules {
            text.push_str(&format!("if ({}) {{\n  write;\n}}\n", condition(rule)));
        }
        text
    }
}

fn condition(rule: &SelectionRule) -> String {
    let mut clause = format!(
        "shortName is \"{}\" && level == {} && levelType is \"{}\" && typeOfLevel is \"{}\"",
        rule.short_name, rule.level, rule.level_type, rule.type_of_level
    );
    if rule.statistical_processing != 0 {
        clause.push_str(&format!(
            " && typeOfStatisticalProcessing == {}",
            rule.statistical_processing
        ));
    }
    clause
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parameters(yaml: &str) -> BTreeMap<String, ParameterSpec> {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn statistical_clause_only_for_processed_fields() {
        let rules = RuleSet::from_parameters(&parameters(
            r#"
t2m:
  shortName: ["2t"]
  level: ["2"]
  levelType: ["sfc"]
  typeOfLevel: ["heightAboveGround"]
  typeOfStatisticalProcessing: ["0"]
u10m:
  shortName: ["10u"]
  level: ["10"]
  levelType: ["sfc"]
  typeOfLevel: ["heightAboveGround"]
  typeOfStatisticalProcessing: ["1"]
"#,
        ))
        .unwrap();

        let text = rules.render();
        assert_eq!(
            text,
            "if (shortName is \"2t\" && level == 2 && levelType is \"sfc\" && typeOfLevel is \"heightAboveGround\") {\n  write;\n}\n\
             if (shortName is \"10u\" && level == 10 && levelType is \"sfc\" && typeOfLevel is \"heightAboveGround\" && typeOfStatisticalProcessing == 1) {\n  write;\n}\n"
        );
        assert_eq!(text.matches("typeOfStatisticalProcessing").count(), 1);
    }

    #[test]
    fn multi_level_parameter_yields_one_block_per_level() {
        let rules = RuleSet::from_parameters(&parameters(
            r#"
wind:
  shortName: ["u", "u"]
  level: ["100", "250"]
  levelType: ["ml", "ml"]
  typeOfLevel: ["heightAboveGround", "heightAboveGround"]
  typeOfStatisticalProcessing: ["0", "0"]
"#,
        ))
        .unwrap();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules.render().matches("write;").count(), 2);
    }

    #[test]
    fn empty_parameter_map_is_invalid() {
        let err = RuleSet::from_parameters(&BTreeMap::new()).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }
}

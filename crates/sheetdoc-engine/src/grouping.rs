//! Activity column grouping
//!
//! Normalized identifiers are split into a base activity name and a role by
//! the variant's suffix rules. The first rule whose pattern matches wins and
//! the matched text is stripped:
//!
//! ```text
//! community_outreach_activity_no_identified          -> community_outreach, target
//! community_outreach_activity_completed_upto_150324  -> community_outreach, completed
//! tree_planting_utilization                          -> tree_planting, completed
//! ```

use regex::Regex;
use sheetdoc_core::{ActivityGroups, ColumnMatch, ColumnRef, ConfigError, Role, VariantConfig};
use tracing::{debug, trace};

#[derive(Clone, Debug)]
struct CompiledRule {
    pattern: Regex,
    role: Role,
}

/// Groups normalized columns into activities
#[derive(Clone, Debug)]
pub struct ActivityGrouper {
    rules: Vec<CompiledRule>,
    exclude: Vec<ColumnMatch>,
    unit_column: usize,
}

impl ActivityGrouper {
    /// Compile the suffix rules of a variant
    pub fn new(config: &VariantConfig) -> Result<Self, ConfigError> {
        let rules = config
            .suffixes
            .iter()
            .map(|rule| {
                Regex::new(&rule.pattern)
                    .map(|pattern| CompiledRule {
                        pattern,
                        role: rule.role,
                    })
                    .map_err(|e| ConfigError::InvalidPattern {
                        pattern: rule.pattern.clone(),
                        message: e.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            rules,
            exclude: config.exclude.clone(),
            unit_column: config.unit_column,
        })
    }

    /// Base name and role of an identifier, if a suffix rule matches
    pub fn classify<'a>(&self, id: &'a str) -> Option<(&'a str, Role)> {
        self.rules.iter().find_map(|rule| {
            rule.pattern
                .find(id)
                .map(|m| (&id[..m.start()], rule.role))
        })
    }

    /// Group the columns of a normalized table in column order
    pub fn group(&self, columns: &[String]) -> ActivityGroups {
        let mut groups = ActivityGroups::new();

        for (index, id) in columns.iter().enumerate() {
            if index == self.unit_column {
                continue;
            }
            if self.exclude.iter().any(|rule| rule.matches(id)) {
                trace!(column = %id, "excluded");
                continue;
            }

            match self.classify(id) {
                Some((base, role)) if !base.is_empty() => {
                    trace!(column = %id, base, ?role, "grouped");
                    groups.assign(base, role, ColumnRef::new(id.as_str(), index));
                }
                _ => debug!(column = %id, "no suffix rule matched, column ignored"),
            }
        }

        debug!(groups = groups.len(), "activities grouped");
        groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ids(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| (*s).to_string()).collect()
    }

    fn names(groups: &ActivityGroups) -> Vec<&str> {
        groups.iter().map(|g| g.name.as_str()).collect()
    }

    #[test]
    fn strategic_suffixes() {
        let grouper = ActivityGrouper::new(&VariantConfig::strategic_activities()).unwrap();

        assert_eq!(
            grouper.classify("community_outreach_activity_no_identified"),
            Some(("community_outreach", Role::Target))
        );
        assert_eq!(
            grouper.classify("community_outreach_completed_upto_150324"),
            Some(("community_outreach", Role::Completed))
        );
        assert_eq!(
            grouper.classify("community_outreach_completed_upto_abcdef"),
            Some(("community_outreach", Role::Completed))
        );
        assert_eq!(grouper.classify("community_outreach_remarks"), None);
    }

    #[test]
    fn strategic_grouping_skips_unit_and_exclusions() {
        let grouper = ActivityGrouper::new(&VariantConfig::strategic_activities()).unwrap();
        let columns = ids(&[
            "name_of_the_division_unnamed_0_level_1",
            "no_of_branches_unnamed_1_level_1",
            "tree_planting_no_identified",
            "tree_planting_completed_upto_150324",
            "community_outreach_activity_no_identified",
            "community_outreach_activity_completed_upto_150324",
            "percentage_activity_completed_upto_150324",
        ]);

        let groups = grouper.group(&columns);
        assert_eq!(names(&groups), vec!["tree_planting", "community_outreach"]);

        let outreach = groups.get("community_outreach").unwrap();
        assert_eq!(outreach.target.as_ref().unwrap().index, 4);
        assert_eq!(outreach.completed.as_ref().unwrap().index, 5);
    }

    #[test]
    fn budget_grouping() {
        let grouper = ActivityGrouper::new(&VariantConfig::budget()).unwrap();
        let columns = ids(&[
            "sl_no_name_of_the_divn",
            "tree_planting_budget",
            "tree_planting_utilization",
            "staff_training_utilization",
            "staff_training_percentage",
        ]);

        let groups = grouper.group(&columns);
        assert_eq!(names(&groups), vec!["tree_planting", "staff_training"]);
        assert!(groups.get("staff_training").unwrap().target.is_none());
    }

    #[test]
    fn unit_column_is_skipped_even_when_it_matches() {
        let grouper = ActivityGrouper::new(&VariantConfig::budget()).unwrap();
        let groups = grouper.group(&ids(&["division_budget", "roads_budget"]));
        assert_eq!(names(&groups), vec!["roads"]);
    }

    #[test]
    fn duplicate_role_last_column_wins() {
        let grouper = ActivityGrouper::new(&VariantConfig::budget()).unwrap();
        let groups = grouper.group(&ids(&["unit", "roads_budget", "roads_budget"]));

        assert_eq!(groups.len(), 1);
        assert_eq!(groups.get("roads").unwrap().target.as_ref().unwrap().index, 2);
    }

    #[test]
    fn invalid_pattern_is_config_error() {
        let mut config = VariantConfig::budget();
        config.suffixes[0].pattern = "_budget(".into();

        assert!(matches!(
            ActivityGrouper::new(&config),
            Err(ConfigError::InvalidPattern { .. })
        ));
    }
}

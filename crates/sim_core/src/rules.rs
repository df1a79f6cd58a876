//! Rules-of-engagement math. Pure functions only.

use std::collections::BTreeSet;

use crate::{Category, EngagementRule};

/// Whether an object with `categories` must be shot under `rule`.
///
/// Duplicate categories are ignored; the result depends only on the set.
pub fn should_shoot(rule: &EngagementRule, categories: &[Category]) -> bool {
    let set: BTreeSet<Category> = categories.iter().copied().collect();
    match rule {
        EngagementRule::Only { category } => set.len() == 1 && set.contains(category),
        EngagementRule::AllOf { categories } => {
            !categories.is_empty() && categories.iter().all(|c| set.contains(c))
        }
        EngagementRule::AnyOf { categories } => categories.iter().any(|c| set.contains(c)),
        EngagementRule::NoneOf { categories } => !categories.iter().any(|c| set.contains(c)),
        EngagementRule::ExactlyOne => set.len() == 1,
        EngagementRule::AtLeast { count } => set.len() >= *count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use Category::{Armored, Biological, Glowing, Mechanical, Swarm};

    #[test]
    fn only_requires_single_matching_category() {
        let rule = EngagementRule::Only {
            category: Mechanical,
        };
        assert!(should_shoot(&rule, &[Mechanical]));
        assert!(should_shoot(&rule, &[Mechanical, Mechanical]));
        assert!(!should_shoot(&rule, &[Mechanical, Armored]));
        assert!(!should_shoot(&rule, &[Biological]));
        assert!(!should_shoot(&rule, &[]));
    }

    #[test]
    fn all_of_is_conjunction() {
        let rule = EngagementRule::AllOf {
            categories: vec![Biological, Glowing],
        };
        assert!(should_shoot(&rule, &[Glowing, Biological]));
        assert!(should_shoot(&rule, &[Glowing, Biological, Swarm]));
        assert!(!should_shoot(&rule, &[Biological]));
    }

    #[test]
    fn all_of_with_no_categories_never_matches() {
        let rule = EngagementRule::AllOf { categories: vec![] };
        assert!(!should_shoot(&rule, &[Mechanical]));
    }

    #[test]
    fn any_of_and_none_of_are_complements() {
        let any = EngagementRule::AnyOf {
            categories: vec![Armored, Swarm],
        };
        let none = EngagementRule::NoneOf {
            categories: vec![Armored, Swarm],
        };
        for cats in [
            vec![],
            vec![Armored],
            vec![Mechanical],
            vec![Swarm, Glowing],
            vec![Biological, Glowing],
        ] {
            assert_ne!(should_shoot(&any, &cats), should_shoot(&none, &cats));
        }
    }

    #[test]
    fn exactly_one_counts_distinct_categories() {
        let rule = EngagementRule::ExactlyOne;
        assert!(should_shoot(&rule, &[Swarm]));
        assert!(should_shoot(&rule, &[Swarm, Swarm]));
        assert!(!should_shoot(&rule, &[Swarm, Glowing]));
        assert!(!should_shoot(&rule, &[]));
    }

    #[test]
    fn at_least_threshold() {
        let rule = EngagementRule::AtLeast { count: 2 };
        assert!(!should_shoot(&rule, &[Glowing]));
        assert!(should_shoot(&rule, &[Glowing, Armored]));
        assert!(should_shoot(&rule, &[Glowing, Armored, Swarm]));
    }

    #[test]
    fn evaluation_is_repeatable() {
        let rules = [
            EngagementRule::Only {
                category: Biological,
            },
            EngagementRule::ExactlyOne,
            EngagementRule::AnyOf {
                categories: vec![Glowing],
            },
        ];
        let objects = [
            vec![Biological],
            vec![Biological, Glowing],
            vec![Mechanical, Armored, Swarm],
        ];
        for rule in &rules {
            for cats in &objects {
                assert_eq!(should_shoot(rule, cats), should_shoot(rule, cats));
            }
        }
    }
}

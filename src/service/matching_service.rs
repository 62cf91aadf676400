// service/matching_service.rs
use serde::Serialize;

use crate::models::{contractormodel::Contractor, ticketmodel::Ticket};

/// Where and what a job is, as the matching filter sees it.
#[derive(Debug, Clone, Copy)]
pub struct MatchCriteria<'a> {
    pub category: &'a str,
    pub city: &'a str,
    pub state: &'a str,
}

impl<'a> From<&'a Ticket> for MatchCriteria<'a> {
    fn from(ticket: &'a Ticket) -> Self {
        Self {
            category: &ticket.category,
            city: &ticket.city,
            state: &ticket.state,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ContractorMatch {
    pub contractor: Contractor,
    pub matched_specialization: String,
}

fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}

fn singular(value: &str) -> &str {
    match value.strip_suffix('s') {
        Some(stripped) if stripped.chars().count() > 1 => stripped,
        _ => value,
    }
}

/// Loose category equivalence used to pair tickets with specializations.
///
/// Exact match after trim/lowercase, then singular forms, then substring in
/// either direction. Symmetric. Short or compound names can false-positive
/// ("Air" matches "Repair"); that looseness is kept on purpose.
pub fn category_matches(a: &str, b: &str) -> bool {
    let a = normalize(a);
    let b = normalize(b);

    if a == b {
        return true;
    }
    if singular(&a) == singular(&b) {
        return true;
    }
    a.contains(b.as_str()) || b.contains(a.as_str())
}

/// Whether the contractor lists `city` under `state`.
pub fn serves_location(contractor: &Contractor, city: &str, state: &str) -> bool {
    let city = normalize(city);
    let state = normalize(state);

    contractor
        .service_areas
        .iter()
        .filter(|(area_state, _)| normalize(area_state) == state)
        .flat_map(|(_, cities)| cities.iter())
        .any(|served| normalize(served) == city)
}

fn matched_specialization(contractor: &Contractor, category: &str) -> Option<String> {
    contractor
        .specialization
        .iter()
        .find(|s| category_matches(s, category))
        .cloned()
}

/// Contractors eligible for a job, best rated first.
///
/// Ties keep roster order. An empty result means nobody qualifies.
pub fn find_eligible_contractors(
    criteria: MatchCriteria<'_>,
    contractors: &[Contractor],
) -> Vec<ContractorMatch> {
    let mut matches: Vec<ContractorMatch> = contractors
        .iter()
        .filter(|c| serves_location(c, criteria.city, criteria.state))
        .filter_map(|c| {
            matched_specialization(c, criteria.category).map(|matched_specialization| {
                ContractorMatch {
                    contractor: c.clone(),
                    matched_specialization,
                }
            })
        })
        .collect();

    // sort_by is stable, so equal ratings stay in roster order.
    matches.sort_by(|a, b| b.contractor.rating.total_cmp(&a.contractor.rating));
    matches
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::BTreeMap;
    use uuid::Uuid;

    fn contractor(name: &str, rating: f32, specialization: &[&str], areas: &[(&str, &[&str])]) -> Contractor {
        Contractor {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
            company: String::new(),
            specialization: specialization.iter().map(|s| s.to_string()).collect(),
            service_areas: areas
                .iter()
                .map(|(state, cities)| {
                    (state.to_string(), cities.iter().map(|c| c.to_string()).collect())
                })
                .collect::<BTreeMap<_, _>>(),
            rating,
            completed_jobs: 0,
            preferred: false,
            created_at: Utc::now(),
            revision: 1,
        }
    }

    #[test]
    fn test_category_examples() {
        assert!(category_matches("Appliance", "Appliances"));
        assert!(category_matches("General Repair", "General Repairs"));
        assert!(category_matches("  PLUMBING ", "plumbing"));
        assert!(!category_matches("Plumbing", "Electrical"));
    }

    #[test]
    fn test_category_substring_looseness_is_kept() {
        assert!(category_matches("HVAC", "HVAC Repair"));
        assert!(category_matches("Air", "Repair"));
    }

    #[test]
    fn test_single_letter_plural_is_not_stripped() {
        // "as" -> "a" would be too short, so only the substring rule can apply.
        assert!(!category_matches("as", "b"));
        assert!(category_matches("as", "a"));
    }

    #[test]
    fn test_category_match_is_symmetric() {
        let samples = [
            "Appliance", "Appliances", "General Repair", "General Repairs", "Plumbing",
            "Electrical", "HVAC", "Air", "Repair", "s", "ss", "Locks", "lock", "",
        ];
        for a in samples {
            for b in samples {
                assert_eq!(category_matches(a, b), category_matches(b, a), "{a:?} vs {b:?}");
            }
        }
    }

    #[test]
    fn test_service_area_match() {
        let c = contractor("Oak", 4.0, &["Plumbing"], &[("CA", &["Oakland"])]);

        assert!(serves_location(&c, "Oakland", "CA"));
        assert!(serves_location(&c, "  oakland ", "ca "));
        assert!(serves_location(&c, "OAKLAND", " Ca"));
        assert!(!serves_location(&c, "Berkeley", "CA"));
        assert!(!serves_location(&c, "Oakland", "NY"));
    }

    #[test]
    fn test_filter_requires_area_and_category() {
        let roster = vec![
            contractor("Pipes", 4.0, &["Plumbing"], &[("CA", &["Oakland"])]),
            contractor("Sparks", 5.0, &["Electrical"], &[("CA", &["Oakland"])]),
            contractor("Faraway", 5.0, &["Plumbing"], &[("CA", &["Berkeley"])]),
        ];
        let criteria = MatchCriteria {
            category: "plumbing",
            city: "Oakland",
            state: "CA",
        };

        let found = find_eligible_contractors(criteria, &roster);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].contractor.name, "Pipes");
        assert_eq!(found[0].matched_specialization, "Plumbing");

        let nobody = MatchCriteria {
            category: "Roofing",
            ..criteria
        };
        assert!(find_eligible_contractors(nobody, &roster).is_empty());
    }

    #[test]
    fn test_filter_orders_by_rating_with_stable_ties() {
        let area: &[(&str, &[&str])] = &[("CA", &["Oakland"])];
        let roster = vec![
            contractor("First", 4.0, &["Appliances"], area),
            contractor("Top", 4.8, &["Appliance Repair"], area),
            contractor("Second", 4.0, &["appliance"], area),
            contractor("Low", 2.0, &["Appliances"], area),
        ];
        let criteria = MatchCriteria {
            category: "Appliance",
            city: "oakland",
            state: "CA",
        };

        let names: Vec<String> = find_eligible_contractors(criteria, &roster)
            .into_iter()
            .map(|m| m.contractor.name)
            .collect();
        assert_eq!(names, vec!["Top", "First", "Second", "Low"]);
    }
}

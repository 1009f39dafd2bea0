//! Autocomplete for the search fields. Static lists, no network.

const TITLES: &[&str] = &[
    "Software Engineer",
    "Data Scientist",
    "Product Manager",
    "UX Designer",
    "Marketing Manager",
    "Sales Representative",
    "Business Analyst",
    "DevOps Engineer",
    "Full Stack Developer",
    "Frontend Developer",
    "Backend Developer",
    "Mobile Developer",
];

const LOCATIONS: &[&str] = &[
    "New York, NY",
    "San Francisco, CA",
    "London, UK",
    "Toronto, Canada",
    "Berlin, Germany",
    "Mumbai, India",
    "Singapore",
    "Remote",
    "Bangalore, India",
    "Seattle, WA",
    "Austin, TX",
    "Boston, MA",
];

const MAX_SUGGESTIONS: usize = 5;
const MIN_INPUT_LEN: usize = 2;

pub fn suggest_titles(input: &str) -> Vec<&'static str> {
    matching(TITLES, input)
}

pub fn suggest_locations(input: &str) -> Vec<&'static str> {
    matching(LOCATIONS, input)
}

fn matching(candidates: &[&'static str], input: &str) -> Vec<&'static str> {
    let needle = input.trim().to_lowercase();
    if needle.chars().count() < MIN_INPUT_LEN {
        return Vec::new();
    }
    candidates
        .iter()
        .filter(|c| c.to_lowercase().contains(&needle))
        .take(MAX_SUGGESTIONS)
        .copied()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_input_gives_nothing() {
        assert!(suggest_titles("").is_empty());
        assert!(suggest_titles("e").is_empty());
        assert!(suggest_locations(" r ").is_empty());
    }

    #[test]
    fn test_case_insensitive_substring() {
        assert_eq!(suggest_titles("DEVOPS"), vec!["DevOps Engineer"]);
        assert_eq!(suggest_locations("india"), vec!["Mumbai, India", "Bangalore, India"]);
    }

    #[test]
    fn test_capped_at_five() {
        let hits = suggest_titles("er");
        assert_eq!(hits.len(), 5);
        assert_eq!(hits[0], "Software Engineer");
    }
}

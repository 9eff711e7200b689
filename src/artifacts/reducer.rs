use std::collections::{BTreeMap, HashSet};

use log::debug;
use regex::Regex;

/// Selects the most frequent error signatures and recovers every occurrence
/// of them from the full extraction.
///
/// `ranked` entries look like `"<count> <message>"`. Messages are taken from
/// the highest counts first; within one count the emission order of the
/// clustering step decides. Selection stops as soon as `top_n` distinct
/// messages are held. The result is the subsequence of `full` whose lines
/// contain at least one selected message.
///
/// Entries without an integer prefix are skipped. An empty result means the
/// caller should fall back to another evidence source.
pub fn reduce(full: &[String], ranked: &[String], top_n: usize) -> Vec<String> {
    let selected = select_top_messages(ranked, top_n);
    if selected.is_empty() {
        return Vec::new();
    }

    let patterns: Vec<Regex> = selected
        .iter()
        .filter_map(|message| Regex::new(&regex::escape(message)).ok())
        .collect();

    let reduced: Vec<String> = full
        .iter()
        .filter(|line| patterns.iter().any(|p| p.is_match(line)))
        .cloned()
        .collect();

    debug!(
        "Reduced {} error lines to {} using {} signatures",
        full.len(),
        reduced.len(),
        selected.len()
    );
    reduced
}

fn select_top_messages(ranked: &[String], top_n: usize) -> Vec<String> {
    if top_n == 0 {
        return Vec::new();
    }

    let mut by_count: BTreeMap<u64, Vec<&str>> = BTreeMap::new();
    for (count, message) in ranked.iter().filter_map(|entry| parse_ranked(entry)) {
        by_count.entry(count).or_default().push(message);
    }

    let mut seen = HashSet::new();
    let mut selected = Vec::new();
    'groups: for messages in by_count.values().rev() {
        for message in messages {
            if seen.insert(*message) {
                selected.push((*message).to_string());
            }
            if selected.len() >= top_n {
                break 'groups;
            }
        }
    }
    selected
}

fn parse_ranked(entry: &str) -> Option<(u64, &str)> {
    let (count, message) = entry.trim().split_once(' ')?;
    let count = count.parse().ok()?;
    Some((count, message))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    mod parse_ranked {
        use super::*;

        #[test]
        fn splits_count_and_message() {
            assert_eq!(parse_ranked("  12 error: boom  "), Some((12, "error: boom")));
        }

        #[test]
        fn rejects_missing_count() {
            assert_eq!(parse_ranked("error: boom"), None);
            assert_eq!(parse_ranked("x12 error"), None);
        }

        #[test]
        fn rejects_count_without_message() {
            assert_eq!(parse_ranked("12"), None);
        }
    }

    mod select_top_messages {
        use super::*;

        #[test]
        fn prefers_higher_counts() {
            let ranked = lines(&["1 rare error", "9 common error", "4 middle error"]);
            assert_eq!(
                select_top_messages(&ranked, 2),
                vec!["common error", "middle error"]
            );
        }

        #[test]
        fn first_seen_wins_within_equal_count() {
            let ranked = lines(&["3 b failure", "3 a failure", "3 c failure"]);
            assert_eq!(select_top_messages(&ranked, 2), vec!["b failure", "a failure"]);
        }

        #[test]
        fn duplicates_do_not_consume_the_cap() {
            let ranked = lines(&["5 dup error", "5 dup error", "2 other error"]);
            assert_eq!(
                select_top_messages(&ranked, 2),
                vec!["dup error", "other error"]
            );
        }

        #[test]
        fn zero_cap_selects_nothing() {
            let ranked = lines(&["5 error"]);
            assert!(select_top_messages(&ranked, 0).is_empty());
        }
    }

    #[test]
    fn test_reduce_preserves_full_order() {
        let full = lines(&[
            "10:00 error: disk full on node-a",
            "10:01 panic: nil pointer",
            "10:02 error: disk full on node-b",
            "10:03 exception in thread main",
        ]);
        let ranked = lines(&["2 error: disk full", "1 exception in thread main"]);

        let reduced = reduce(&full, &ranked, 5);

        assert_eq!(
            reduced,
            lines(&[
                "10:00 error: disk full on node-a",
                "10:02 error: disk full on node-b",
                "10:03 exception in thread main",
            ])
        );
    }

    #[test]
    fn test_reduce_respects_cap() {
        let full = lines(&["a error", "b error", "c error"]);
        let ranked = lines(&["3 a error", "2 b error", "1 c error"]);

        assert_eq!(reduce(&full, &ranked, 1), lines(&["a error"]));
    }

    #[test]
    fn test_reduce_treats_messages_literally() {
        let full = lines(&["failed (exit 1) [x]", "failed exit 1 x"]);
        let ranked = lines(&["4 (exit 1) [x]"]);

        assert_eq!(reduce(&full, &ranked, 3), lines(&["failed (exit 1) [x]"]));
    }

    #[test]
    fn test_reduce_empty_or_malformed_ranking() {
        let full = lines(&["error one", "error two"]);
        assert!(reduce(&full, &[], 5).is_empty());
        assert!(reduce(&full, &lines(&["no count here", "??"]), 5).is_empty());
    }

    #[test]
    fn test_reduce_is_deterministic_subsequence() {
        let full = lines(&["x error", "y fatal", "x error again", "z panic"]);
        let ranked = lines(&["2 x error", "1 z panic", "1 y fatal"]);

        let first = reduce(&full, &ranked, 2);
        let second = reduce(&full, &ranked, 2);
        assert_eq!(first, second);

        let mut cursor = full.iter();
        for line in &first {
            assert!(cursor.any(|candidate| candidate == line), "not a subsequence");
        }
    }
}

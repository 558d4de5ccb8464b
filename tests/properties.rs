//! Property tests for patch application

use proptest::prelude::*;
use seed_patcher::{apply_patch_set, PatchRule, PatchSet, RuleOutcome};

/// Seed-like text: SQL-ish words, punctuation and newlines, but never `#`.
fn seed_text() -> impl Strategy<Value = String> {
    proptest::collection::vec(
        prop_oneof![
            Just("INSERT INTO t ".to_string()),
            Just("(id, x)".to_string()),
            Just(", NULL)".to_string()),
            Just("'active'".to_string()),
            Just("\n".to_string()),
            "[a-z0-9 ,()']{0,12}",
        ],
        0..24,
    )
    .prop_map(|parts| parts.concat())
}

fn rules() -> impl Strategy<Value = Vec<PatchRule>> {
    proptest::collection::vec(
        prop_oneof![
            ("[a-z(),' ]{1,6}", "[a-z(),' ]{0,6}")
                .prop_map(|(p, r)| PatchRule::literal("lit", p, r)),
            Just(PatchRule::regex("null", r", NULL\)", ")")),
            Just(PatchRule::regex("quoted", r"'(\w+)'", "\"$1\"")),
        ],
        1..6,
    )
    .prop_map(|rules| {
        rules
            .into_iter()
            .enumerate()
            .map(|(i, mut rule)| {
                rule.id = format!("{}-{i}", rule.id);
                rule
            })
            .collect()
    })
}

proptest! {
    #[test]
    fn application_is_deterministic(text in seed_text(), rules in rules()) {
        let set = PatchSet::new("prop", rules);
        let a = apply_patch_set(&set, &text).unwrap();
        let b = apply_patch_set(&set, &text).unwrap();
        prop_assert_eq!(a, b);
    }

    #[test]
    fn marker_insert_then_remove_is_noop(text in seed_text()) {
        let set = PatchSet::new(
            "marker",
            vec![
                PatchRule::literal("insert", "(id, x)", "(id, x)#MARK#"),
                PatchRule::literal("remove", "#MARK#", ""),
            ],
        );
        let report = apply_patch_set(&set, &text).unwrap();
        prop_assert_eq!(report.text, text);
    }

    #[test]
    fn stamped_set_is_idempotent(text in seed_text(), rules in rules()) {
        let mut set = PatchSet::new("prop", rules);
        set.meta.version = Some("1.0.0".to_string());
        set.meta.stamp = true;

        let once = apply_patch_set(&set, &text).unwrap();
        let twice = apply_patch_set(&set, &once.text).unwrap();
        prop_assert_eq!(&twice.text, &once.text);
        let all_already_applied = twice
            .rules
            .iter()
            .all(|r| matches!(r.outcome, RuleOutcome::AlreadyApplied { .. }));
        prop_assert!(all_already_applied);
    }

    #[test]
    fn guarded_rule_is_idempotent(text in seed_text()) {
        let set = PatchSet::new(
            "guard",
            vec![PatchRule::literal("wrap", "(id, x)", "(id, x, y)")
                .skip_if_present("(id, x, y)")],
        );
        let once = apply_patch_set(&set, &text).unwrap();
        let twice = apply_patch_set(&set, &once.text).unwrap();
        prop_assert_eq!(twice.text, once.text);
    }

    #[test]
    fn bounded_rule_never_exceeds_limit(text in seed_text(), limit in 1usize..4) {
        let set = PatchSet::new(
            "bounded",
            vec![PatchRule::regex("null", r", NULL\)", ")").max_occurrences(limit)],
        );
        let report = apply_patch_set(&set, &text).unwrap();
        let available = text.matches(", NULL)").count();
        prop_assert_eq!(report.rules[0].outcome.count(), available.min(limit));
    }
}

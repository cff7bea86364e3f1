//! Invariants of preprocessing, truncation and tag matching

use proptest::prelude::*;
use utopia_markdown::{
    LiteOptions, Tag, item_tags, preprocess_markdown, remove_markdown_syntax,
    simple_markdown_to_html, truncate_markdown,
};

fn markdown_text() -> impl Strategy<Value = String> {
    let piece = prop_oneof![
        "[a-z]{1,8}",
        "[a-z]{1,6}".prop_map(|w| format!("#{w}")),
        "[a-z]{1,6}".prop_map(|w| format!("**{w}**")),
        "[a-z]{1,6}".prop_map(|w| format!("[{w}](https://example.org/{w})")),
        Just("www.example.org".to_string()),
        Just("https://youtu.be/dQw4w9WgXcQ".to_string()),
        Just("mail@example.org".to_string()),
        Just("[@Ann](/item/a1)".to_string()),
        Just("`#code`".to_string()),
    ];
    let separator = prop_oneof![Just(" "), Just("\n"), Just("\n\n")];
    prop::collection::vec((piece, separator), 1..12).prop_map(|parts| {
        parts
            .into_iter()
            .map(|(piece, separator)| format!("{piece}{separator}"))
            .collect::<String>()
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn preprocessing_is_idempotent(text in markdown_text()) {
        let once = preprocess_markdown(&text);
        prop_assert_eq!(preprocess_markdown(&once), once);
    }

    #[test]
    fn truncation_stays_within_bound(text in markdown_text(), fraction in 0.0f64..1.0) {
        let visible = remove_markdown_syntax(&text).chars().count();
        prop_assume!(visible > 0);
        let limit = ((visible as f64) * fraction) as usize;
        let truncated = truncate_markdown(&text, limit);
        let len = remove_markdown_syntax(&truncated).chars().count();
        prop_assert!(len <= limit + 3, "{len} > {limit} + 3 for {truncated:?}");
    }

    #[test]
    fn lite_output_never_contains_raw_tags(body in "[a-z<>/ \"=]{0,40}") {
        let text = format!("<script>{body}</script> <img src=x onerror=alert(1)> #tag");
        let html = simple_markdown_to_html(&text, &[], &LiteOptions::default());
        prop_assert!(!html.contains("<script"));
        prop_assert!(!html.contains("<img"));
    }

    #[test]
    fn tag_matching_ignores_case(name in "[a-z]{1,10}", upper in any::<bool>()) {
        let tags = vec![Tag::new("1", name.clone(), "#000")];
        let typed = if upper { name.to_uppercase() } else { name.clone() };
        let found = item_tags(&format!("see #{typed} here"), &tags);
        prop_assert_eq!(found.len(), 1);
    }
}

#[test]
fn item_tags_treats_case_variants_alike() {
    let tags = vec![Tag::new("1", "Nature", "#0a0"), Tag::new("2", "map", "#00a")];
    for text in ["#NATURE", "#Nature", "#nature"] {
        let found = item_tags(text, &tags);
        assert_eq!(found.len(), 1, "{text}");
        assert_eq!(found[0].id, "1");
    }
}

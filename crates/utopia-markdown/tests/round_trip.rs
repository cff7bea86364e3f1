//! Markdown survives parse and serialize with its node attributes intact

use proptest::prelude::*;
use test_case::test_case;
use utopia_markdown::{Document, MarkdownCodec, preprocess_markdown};

/// Structural attributes of every node, in document order
fn node_attributes(doc: &Document) -> Vec<String> {
    let hashtags = doc.hashtags().into_iter().map(|h| format!("hashtag:{}", h.label));
    let mentions = doc
        .mentions()
        .into_iter()
        .map(|m| format!("mention:{}:{}", m.id, m.label));
    let videos = doc
        .videos()
        .into_iter()
        .map(|v| format!("video:{}:{}", v.provider, v.video_id));
    hashtags.chain(mentions).chain(videos).collect()
}

fn assert_round_trip(codec: &MarkdownCodec, input: &str) -> Result<(), TestCaseError> {
    let first = codec.parse(input);
    let markdown = codec.serialize(&first);
    let second = codec.parse(&markdown);
    prop_assert_eq!(node_attributes(&first), node_attributes(&second), "via {:?}", markdown);
    prop_assert_eq!(codec.serialize(&second), markdown);
    Ok(())
}

#[test_case("Hello #world" ; "hashtag")]
#[test_case("Thanks [@Alice](/item/abc-123-def)!" ; "mention")]
#[test_case("[@Old](/item/layer-1/abc)" ; "legacy mention")]
#[test_case("[@a \\[b\\]](/item/x)" ; "mention with brackets")]
#[test_case("<https://youtu.be/dQw4w9WgXcQ>" ; "youtube autolink")]
#[test_case("[clip](https://rumble.com/embed/v5abc12)" ; "rumble link")]
#[test_case("Look:\n<https://youtu.be/dQw4w9WgXcQ>\nNice #map" ; "video splits paragraph")]
#[test_case("# Title #tag\n\n- item [@Bob](/item/b)\n- other" ; "heading and list")]
#[test_case("> quoted #tag\n\n1. one\n2. two" ; "quote and ordered list")]
#[test_case("**bold #tag** and *it* `#code`" ; "marks")]
#[test_case("#open_source #Ärger #a-b" ; "tag characters")]
#[test_case(r"\#foo and #bar" ; "escaped hash")]
#[test_case(r#"x<span data-hashtag data-label="tag">#tag</span>"# ; "hashtag after word")]
#[test_case(r#"<span data-hashtag data-label="tag">#tag</span>abc"# ; "hashtag before word")]
#[test_case("#a#b x#y" ; "hashes without boundary")]
fn structural_round_trip(input: &str) {
    let codec = MarkdownCodec::new();
    assert_round_trip(&codec, input).unwrap();
}

#[test]
fn preprocessed_text_round_trips() {
    let codec = MarkdownCodec::new();
    let input = preprocess_markdown("Visit www.example.org #map https://youtu.be/dQw4w9WgXcQ");
    let doc = codec.parse(&input);
    assert_eq!(node_attributes(&doc), vec!["hashtag:map", "video:youtube:dQw4w9WgXcQ"]);
    assert_round_trip(&codec, &input).unwrap();
}

#[test]
fn legacy_mention_is_rewritten() {
    let codec = MarkdownCodec::new();
    let doc = codec.parse("[@Old](/item/layer-1/abc)");
    assert_eq!(codec.serialize(&doc), "[@Old](/item/abc)");
}

fn word() -> impl Strategy<Value = String> {
    "[a-z]{1,8}"
}

fn fragment() -> impl Strategy<Value = String> {
    prop_oneof![
        word(),
        "[A-Za-z0-9_-]{1,10}".prop_map(|label| format!("#{label}")),
        ("[A-Za-z][A-Za-z ]{0,10}[A-Za-z]", "[A-Za-z0-9_-]{1,12}")
            .prop_map(|(label, id)| format!("[@{label}](/item/{id})")),
        "[A-Za-z0-9_-]{11}".prop_map(|id| format!("<https://youtu.be/{id}>")),
        word().prop_map(|w| format!("**{w}**")),
        word().prop_map(|w| format!("*{w}*")),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn generated_documents_round_trip(
        fragments in prop::collection::vec(fragment(), 1..8),
        separators in prop::collection::vec(prop_oneof![Just(" "), Just("\n"), Just("\n\n")], 8),
    ) {
        let mut input = String::new();
        for (fragment, separator) in fragments.iter().zip(&separators) {
            input.push_str(fragment);
            input.push_str(separator);
        }
        let codec = MarkdownCodec::new();
        assert_round_trip(&codec, &input)?;
    }
}

fn adjacent_piece() -> impl Strategy<Value = String> {
    prop_oneof![
        word(),
        "[a-z0-9_-]{1,6}".prop_map(|label| format!("#{label}")),
        "[a-z]{1,6}".prop_map(|w| format!("\\#{w}")),
        ("[A-Za-z]{1,6}", "[a-z0-9]{1,6}").prop_map(|(label, id)| format!("[@{label}](/item/{id})")),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn atoms_next_to_text_round_trip(
        pieces in prop::collection::vec((adjacent_piece(), prop_oneof![Just(""), Just(" ")]), 1..8),
    ) {
        let input: String = pieces
            .iter()
            .map(|(piece, separator)| format!("{piece}{separator}"))
            .collect();
        let codec = MarkdownCodec::new();
        assert_round_trip(&codec, &input)?;
    }
}

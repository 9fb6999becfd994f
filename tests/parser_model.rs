use note_index::entry::{CodeDetector, Entry, EntryId, ParseError, Parser, ParserConfig, Segment};

fn parse(raw: &str) -> Vec<Entry> {
    Parser::default().parse_all(raw).unwrap()
}

fn parse_with(config: ParserConfig, raw: &str) -> Result<Vec<Entry>, ParseError> {
    Parser::new(config).parse_all(raw)
}

const SCENARIO: &str = "\
#1 Title Alpha
```
foo.bar()
```
#2 Title Beta
tags: alpha
uses Alpha techniques
";

#[test]
fn invariant_parsing_is_idempotent() {
    let parser = Parser::default();
    let first: Vec<Entry> = parser.entries(SCENARIO).collect::<Result<_, _>>().unwrap();
    let second: Vec<Entry> = parser.entries(SCENARIO).collect::<Result<_, _>>().unwrap();

    assert_eq!(first, second);
    assert_eq!(first.len(), 2);
}

#[test]
fn heading_captures_id_and_title() {
    let entries = parse(SCENARIO);

    assert_eq!(entries[0].id(), EntryId::new(1));
    assert_eq!(entries[0].title(), "Title Alpha");
    assert_eq!(entries[0].segments(), &[Segment::code(None, "foo.bar()")]);
    assert!(entries[0].tags().is_empty());

    assert_eq!(entries[1].id(), EntryId::new(2));
    assert_eq!(entries[1].title(), "Title Beta");
    assert_eq!(entries[1].segments(), &[Segment::text("uses Alpha techniques")]);
    assert_eq!(entries[1].tags().iter().collect::<Vec<_>>(), vec!["alpha"]);
}

#[test]
fn invariant_duplicate_ids_are_kept_in_order() {
    let raw = "#7 First\none\n#3 Between\ntwo\n#7 Second\nthree\n";
    let entries = parse(raw);

    let ids: Vec<u64> = entries.iter().map(|e| e.id().get()).collect();
    assert_eq!(ids, vec![7, 3, 7]);

    let orders: Vec<u64> = entries.iter().map(|e| e.created_order().get()).collect();
    assert_eq!(orders, vec![0, 1, 2], "created_order must follow input order");
}

#[test]
fn fenced_code_keeps_label_and_line_breaks() {
    let raw = "#3 Shell\nRun it:\n```sh\necho one\n\necho two\n```\nDone.\n";
    let entries = parse(raw);

    assert_eq!(
        entries[0].segments(),
        &[
            Segment::text("Run it:"),
            Segment::code(Some("sh".into()), "echo one\n\necho two"),
            Segment::text("Done."),
        ]
    );
    assert_eq!(entries[0].segments()[1].label(), Some("sh"));
}

#[test]
fn heading_inside_fence_is_code() {
    let raw = "#5 Comments\n```sh\n#1 not a heading\n```\n";
    let entries = parse(raw);

    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].segments(), &[Segment::code(Some("sh".into()), "#1 not a heading")]);
}

#[test]
fn unterminated_fence_is_a_parse_error() {
    let raw = "#1 A\nok\n#2 B\n```rust\nfn x() {}\n";
    let parser = Parser::default();
    let results: Vec<Result<Entry, ParseError>> = parser.entries(raw).collect();

    assert_eq!(results.len(), 2, "iterator stops after the error");
    assert!(results[0].is_ok());
    assert_eq!(results[1], Err(ParseError::UnterminatedFence { line: 4 }));
    assert_eq!(parser.parse_all(raw), Err(ParseError::UnterminatedFence { line: 4 }));
}

#[test]
fn adjacent_text_is_merged_and_edges_trimmed() {
    let raw = "#1 Prose\n\nfirst line\n\nsecond paragraph\ntags: a, b\nthird line\n\n";
    let entries = parse(raw);

    assert_eq!(
        entries[0].segments(),
        &[Segment::text("first line\n\nsecond paragraph\nthird line")]
    );
    assert_eq!(entries[0].tags().iter().collect::<Vec<_>>(), vec!["a", "b"]);
}

#[test]
fn empty_body_gets_one_empty_text_segment() {
    let entries = parse("#7 Empty\n#8 Next\nbody\n");

    assert_eq!(entries[0].segments(), &[Segment::text("")]);
    assert_eq!(entries[1].segments(), &[Segment::text("body")]);
}

#[test]
fn text_before_first_heading_is_skipped() {
    let entries = parse("a preamble line\n\n#1 A\nbody\n");

    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].segments(), &[Segment::text("body")]);
}

#[test]
fn input_without_headings_yields_nothing() {
    assert!(parse("").is_empty());
    assert!(parse("just text\nno numbers\n").is_empty());
}

#[test]
fn oversized_entry_number_is_rejected() {
    let raw = "#99999999999999999999999 Big\nbody\n";
    let err = Parser::default().parse_all(raw).unwrap_err();

    assert_eq!(
        err,
        ParseError::InvalidEntryId {
            line: 1,
            value: "99999999999999999999999".into()
        }
    );
}

#[test]
fn indented_detector_groups_runs_and_strips_indent() {
    let config = ParserConfig::default().with_code_detector(CodeDetector::Indented { width: 4 });
    let raw = "#4 Indented\nIntro line\n    let x = 1;\n\n      let y = 2;\nAfter\n";
    let entries = parse_with(config, raw).unwrap();

    assert_eq!(
        entries[0].segments(),
        &[
            Segment::text("Intro line"),
            Segment::code(None, "let x = 1;\n\n  let y = 2;"),
            Segment::text("After"),
        ]
    );
}

#[test]
fn notes_file_preset_reads_commented_prose() {
    let config = ParserConfig::notes_file("Episode").unwrap();
    let raw = "\
# Episode 1
# for expensive lookups called many times
# memoize the result
def current_user
  @user ||= find_user
end

# Episode 2 Finders
# tags: finders, Associations
Task.find_all_by_complete(false)

# Episodes 94 & 95 Caching
# store fragments
";
    let entries = parse_with(config, raw).unwrap();

    assert_eq!(entries.len(), 3);

    assert_eq!(entries[0].id(), EntryId::new(1));
    assert_eq!(entries[0].title(), "");
    assert_eq!(
        entries[0].segments(),
        &[
            Segment::text("for expensive lookups called many times\nmemoize the result"),
            Segment::code(None, "def current_user\n  @user ||= find_user\nend"),
        ]
    );

    assert_eq!(entries[1].title(), "Finders");
    assert_eq!(entries[1].tags().iter().collect::<Vec<_>>(), vec!["associations", "finders"]);
    assert_eq!(
        entries[1].segments(),
        &[Segment::code(None, "Task.find_all_by_complete(false)")]
    );

    assert_eq!(entries[2].id(), EntryId::new(94));
    assert_eq!(entries[2].title(), "Caching");
}

#[test]
fn tag_lines_can_be_disabled() {
    let config = ParserConfig::default().with_tag_line(None);
    let entries = parse_with(config, "#1 A\ntags: x\n").unwrap();

    assert!(entries[0].tags().is_empty());
    assert_eq!(entries[0].segments(), &[Segment::text("tags: x")]);
}

#[test]
fn custom_heading_pattern_uses_positional_groups() {
    let heading = regex::Regex::new(r"^== (\d+): (.*)$").unwrap();
    let config = ParserConfig::default().with_heading(heading);
    let entries = parse_with(config, "== 12: Custom\nbody\n").unwrap();

    assert_eq!(entries[0].id(), EntryId::new(12));
    assert_eq!(entries[0].title(), "Custom");
}

#[test]
fn heading_pattern_without_groups_is_an_error() {
    let heading = regex::Regex::new(r"^== ").unwrap();
    let config = ParserConfig::default().with_heading(heading);

    assert_eq!(
        parse_with(config, "== heading\n"),
        Err(ParseError::MissingIdCapture { line: 1 })
    );
}

#[test]
fn prefix_word_tolerates_a_split_spelling() {
    let config = ParserConfig::notes_file("Railscast").unwrap();
    let raw = "\
# Railscast 10
# before
a()
# Rails cast 11 Split
# after
b()
";
    let entries = parse_with(config, raw).unwrap();

    let ids: Vec<u64> = entries.iter().map(|e| e.id().get()).collect();
    assert_eq!(ids, vec![10, 11]);
    assert_eq!(entries[1].title(), "Split");
    assert_eq!(
        entries[0].segments(),
        &[Segment::text("before"), Segment::code(None, "a()")]
    );
}

#[test]
fn indented_detector_expands_tabs() {
    let config = ParserConfig::default().with_code_detector(CodeDetector::Indented { width: 4 });
    let raw = "#5 Tabs\nIntro\n\tif x\n\t    y()\n\tend\n";
    let entries = parse_with(config, raw).unwrap();

    assert_eq!(
        entries[0].segments(),
        &[
            Segment::text("Intro"),
            Segment::code(None, "if x\n    y()\nend"),
        ]
    );
}

#[test]
fn empty_fence_is_rejected_before_parsing() {
    let config = ParserConfig::default().with_code_detector(CodeDetector::Fenced { fence: String::new() });

    assert_eq!(
        parse_with(config.clone(), "#1 A\nhello\nworld\n").unwrap_err(),
        ParseError::EmptyFence
    );
    assert_eq!(parse_with(config, "").unwrap_err(), ParseError::EmptyFence);
}

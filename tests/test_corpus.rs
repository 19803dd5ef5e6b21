use std::io::Write;

use seqpool::{ColumnMap, Corpus, Error, Pool};

fn write_temp(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

fn conll_columns() -> ColumnMap {
    ColumnMap::new().set(0, "text").set(1, "pos").set(2, "ner")
}

#[test]
fn test_blank_line_separated_groups_become_sentences() {
    let file = write_temp(
        "U.N. NNP B-ORG\nofficial NN O\n\nPeter NNP B-PER\nBlackburn NNP I-PER\n",
    );
    let corpus =
        Corpus::from_column_files(&conll_columns(), "ner", file.path(), None, None).unwrap();

    assert_eq!(corpus.train.len(), 2);
    assert!(corpus.dev.is_empty());
    assert!(corpus.test.is_empty());

    let first = &corpus.train[0];
    assert_eq!(first.len(), 2);
    assert_eq!(first.tokens()[0].text(), "U.N.");
    assert_eq!(first.tokens()[0].gold_label(), Some("B-ORG"));
    assert_eq!(first.tokens()[1].gold_label(), Some("O"));

    let second = &corpus.train[1];
    assert_eq!(second.tokens()[1].text(), "Blackburn");
    assert_eq!(second.tokens()[1].gold_label(), Some("I-PER"));
}

#[test]
fn test_consecutive_blank_lines_produce_no_empty_sentences() {
    let file = write_temp("a X O\n\n\n\nb X O\n\n");
    let corpus =
        Corpus::from_column_files(&conll_columns(), "ner", file.path(), None, None).unwrap();
    assert_eq!(corpus.train.len(), 2);
}

#[test]
fn test_docstart_markers_are_skipped() {
    let file = write_temp("-DOCSTART- -X- O\n\na X B-LOC\n\n-DOCSTART- -X- O\n\nb X O\n");
    let corpus =
        Corpus::from_column_files(&conll_columns(), "ner", file.path(), None, None).unwrap();
    assert_eq!(corpus.train.len(), 2);
    assert_eq!(corpus.train[0].tokens()[0].text(), "a");
}

#[test]
fn test_missing_final_newline_still_flushes() {
    let file = write_temp("a X O\nb X B-LOC");
    let corpus =
        Corpus::from_column_files(&conll_columns(), "ner", file.path(), None, None).unwrap();
    assert_eq!(corpus.train.len(), 1);
    assert_eq!(corpus.train[0].len(), 2);
}

#[test]
fn test_crlf_line_endings() {
    let file = write_temp("a X O\r\nb X B-LOC\r\n\r\nc X O\r\n");
    let corpus =
        Corpus::from_column_files(&conll_columns(), "ner", file.path(), None, None).unwrap();
    assert_eq!(corpus.train.len(), 2);
    assert_eq!(corpus.train[0].tokens()[1].gold_label(), Some("B-LOC"));
}

#[test]
fn test_two_column_format() {
    let columns = ColumnMap::new().set(0, "text").set(1, "ner");
    let file = write_temp("Paris B-LOC\n. O\n");
    let corpus = Corpus::from_column_files(&columns, "ner", file.path(), None, None).unwrap();
    assert_eq!(corpus.train.len(), 1);
    assert_eq!(corpus.train[0].tokens()[0].gold_label(), Some("B-LOC"));
}

#[test]
fn test_missing_label_column_is_an_error() {
    let file = write_temp("only-text\n");
    let result = Corpus::from_column_files(&conll_columns(), "ner", file.path(), None, None);
    assert!(matches!(result, Err(Error::CorpusFormat { line: 1, .. })));
}

#[test]
fn test_column_map_without_text_field_is_rejected() {
    let columns = ColumnMap::new().set(0, "ner");
    let file = write_temp("a O\n");
    let result = Corpus::from_column_files(&columns, "ner", file.path(), None, None);
    assert!(matches!(
        result,
        Err(Error::InvalidParameter { param: "columns", .. })
    ));
}

#[test]
fn test_unknown_tag_type_is_rejected() {
    let file = write_temp("a X O\n");
    let result = Corpus::from_column_files(&conll_columns(), "chunk", file.path(), None, None);
    assert!(matches!(
        result,
        Err(Error::InvalidParameter { param: "tag_type", .. })
    ));
}

#[test]
fn test_missing_file_reports_path() {
    let result = Corpus::from_column_files(
        &conll_columns(),
        "ner",
        "definitely/not/here.txt",
        None,
        None,
    );
    match result {
        Err(Error::Read { path, .. }) => assert!(path.contains("not/here.txt")),
        other => panic!("expected read error, got {other:?}"),
    }
}

#[test]
fn test_pool_from_labeled_column_file() {
    let file = write_temp("Rome X B-LOC\nfell X O\n\nslowly X O\n");
    let pool = Pool::from_column_file(file.path(), &conll_columns(), "ner").unwrap();
    assert_eq!(pool.len(), 2);
    assert!(pool.sentences()[0].is_labeled());
}

#[test]
fn test_pool_from_plain_text() {
    let file = write_temp("\u{3053}\u{3093} \u{306b}\u{3061} \u{306f}\nsecond line here\n\n");
    let pool = Pool::from_plain_text(file.path()).unwrap();
    assert_eq!(pool.len(), 2);
    assert_eq!(pool.sentences()[0].len(), 3);
    assert!(!pool.sentences()[0].is_labeled());
    assert_eq!(pool.sentences()[1].tokens()[2].text(), "here");
}

#[test]
fn test_dev_and_test_splits_load() {
    let train = write_temp("a X O\n");
    let dev = write_temp("b X O\n\nc X O\n");
    let test = write_temp("d X B-LOC\n");
    let corpus = Corpus::from_column_files(
        &conll_columns(),
        "ner",
        train.path(),
        Some(dev.path()),
        Some(test.path()),
    )
    .unwrap();
    assert_eq!(corpus.train.len(), 1);
    assert_eq!(corpus.dev.len(), 2);
    assert_eq!(corpus.test.len(), 1);
}

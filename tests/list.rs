use facet_testhelpers::test;
use insta::assert_snapshot;
use tagplan::{
    BoxError, Options, Schema, UnmarshalText, make_dict_deserializer, make_list_deserializer,
};

#[derive(Schema, Default, Debug, PartialEq)]
struct Query {
    #[schema(query = "q")]
    pub text: String,
    #[schema(query = "page", default = "1")]
    pub page: u32,
    #[schema(query = "tag", default = "[]")]
    pub tags: Vec<String>,
    #[schema(query = "verbose", default = "false")]
    pub verbose: bool,
    #[schema(query = "limit", default = "nil")]
    pub limit: Option<u16>,
}

#[test]
fn decodes_flat_multimaps() {
    let deserializer = make_list_deserializer::<Query>(Options::query()).unwrap();
    let query = deserializer
        .decode_from_multimap([
            ("q", vec!["rust"]),
            ("page", vec!["3"]),
            ("tag", vec!["async", "net"]),
            ("verbose", vec!["t"]),
            ("limit", vec!["25"]),
        ])
        .unwrap();
    assert_eq!(
        query,
        Query {
            text: "rust".to_owned(),
            page: 3,
            tags: vec!["async".to_owned(), "net".to_owned()],
            verbose: true,
            limit: Some(25),
        }
    );
}

#[test]
fn empty_lists_count_as_absent() {
    let deserializer = make_list_deserializer::<Query>(Options::query()).unwrap();
    let query = deserializer
        .decode_from_multimap([("q", vec!["rust"]), ("page", vec![])])
        .unwrap();
    assert_eq!(query.page, 1);
    assert_eq!(query.limit, None);
    assert!(!query.verbose);

    let err = deserializer
        .decode_from_multimap([("q", Vec::<String>::new())])
        .unwrap_err();
    assert_snapshot!(err, @"missing value at Query.q, expected String");
}

#[test]
fn scalars_take_exactly_one_value() {
    let deserializer = make_list_deserializer::<Query>(Options::query()).unwrap();
    let err = deserializer
        .decode_from_multimap([("q", vec!["a", "b"])])
        .unwrap_err();
    assert_snapshot!(err, @"invalid value at Query.q, expected String, got a list of 2 values, which cannot fit into a single entry");

    let err = deserializer
        .decode_from_multimap([("q", vec!["a"]), ("verbose", vec!["maybe"])])
        .unwrap_err();
    assert_snapshot!(err, @r#"invalid value at Query.verbose, expected bool, got string "maybe""#);
}

#[test]
fn reads_json_encoded_multimaps() {
    let deserializer = make_list_deserializer::<Query>(Options::query()).unwrap();
    let query = deserializer
        .decode_from_str(r#"{"q": ["rust"], "tag": ["a"]}"#)
        .unwrap();
    assert_eq!(query.tags, ["a"]);
}

#[derive(Schema, Default, Debug, PartialEq)]
#[schema(text)]
struct Range {
    #[schema(query = "start")]
    pub start: u32,
    #[schema(query = "end")]
    pub end: u32,
}

impl UnmarshalText for Range {
    fn unmarshal_text(&mut self, text: &str) -> Result<(), BoxError> {
        let (start, end) = text.split_once("..").ok_or("expected start..end")?;
        self.start = start.parse()?;
        self.end = end.parse()?;
        Ok(())
    }
}

#[derive(Schema, Default, Debug, PartialEq)]
struct Report {
    #[schema(query = "range", default = "0..10")]
    pub range: Range,
    #[schema(query = "exclude", default = "[]")]
    pub exclude: Vec<Range>,
}

#[test]
fn text_decodable_records_are_leaves() {
    let deserializer = make_list_deserializer::<Report>(Options::query()).unwrap();
    let report = deserializer.decode_from_multimap([("exclude", vec!["2..3", "5..8"])]).unwrap();
    assert_eq!(report.range, Range { start: 0, end: 10 });
    assert_eq!(report.exclude.len(), 2);
    assert_eq!(report.exclude[1], Range { start: 5, end: 8 });

    let err = deserializer
        .decode_from_multimap([("range", vec!["7"])])
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "invalid value at Report.range, expected to be able to parse a Range:\n\t * expected start..end"
    );
}

#[derive(Schema, Default, Debug)]
struct Item {
    #[schema(query = "id", json = "id")]
    pub id: u32,
}

#[derive(Schema, Default, Debug)]
struct Nested {
    #[schema(query = "items", json = "items")]
    pub items: Vec<Item>,
}

#[test]
fn nested_records_need_a_nested_format() {
    let err = make_list_deserializer::<Nested>(Options::query()).unwrap_err();
    assert_eq!(
        err.to_string(),
        "could not generate a deserializer for Nested with type Nested:\n\t * \
         this type of extractor does not support nested structs"
    );
    assert_eq!(err.path(), "Nested.items[]");

    let deserializer = make_dict_deserializer::<Nested>(Options::json()).unwrap();
    let nested = deserializer
        .decode_from_str(r#"{"items": [{"id": 1}, {"id": 2}]}"#)
        .unwrap();
    assert_eq!(nested.items.len(), 2);
}

#[derive(Schema, Default, Debug)]
struct Matrix {
    #[schema(query = "rows")]
    pub rows: Vec<Vec<u8>>,
}

#[derive(Schema, Default, Debug)]
struct Labels {
    #[schema(query = "labels")]
    pub labels: std::collections::HashMap<String, String>,
}

#[derive(Schema, Default, Debug)]
struct Child {
    #[schema(query = "name")]
    pub name: String,
}

#[derive(Schema, Default, Debug)]
struct Parent {
    #[schema(query = "child")]
    pub child: Child,
}

#[test]
fn unrepresentable_shapes_are_rejected_when_building() {
    let err = make_list_deserializer::<Matrix>(Options::query()).unwrap_err();
    assert!(err.to_string().ends_with("this type of extractor does not support nested arrays"));

    let err = make_list_deserializer::<Labels>(Options::query()).unwrap_err();
    assert!(err.to_string().ends_with(
        "list deserialization expects a record of sequences of trivially decodable types, \
         but at Labels.labels, got HashMap<String, String>"
    ));

    let err = make_list_deserializer::<Parent>(Options::query()).unwrap_err();
    assert_eq!(err.path(), "Parent.child");
}

#[derive(Schema, Default, Debug, PartialEq)]
struct Page {
    #[schema(query = "page", default = "1")]
    pub page: u32,
}

#[derive(Schema, Default, Debug, PartialEq)]
struct Listing {
    #[schema(query = "sort", default = "name")]
    pub sort: String,
    #[schema(flatten)]
    pub page: Page,
}

#[test]
fn flattened_records_stay_flat() {
    let deserializer = make_list_deserializer::<Listing>(Options::query()).unwrap();
    let listing = deserializer.decode_from_multimap([("page", vec!["4"])]).unwrap();
    assert_eq!(
        listing,
        Listing {
            sort: "name".to_owned(),
            page: Page { page: 4 },
        }
    );
}

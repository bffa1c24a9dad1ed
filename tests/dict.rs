use std::collections::HashMap;

use facet_testhelpers::test;
use insta::assert_snapshot;
use tagplan::{
    BoxError, DeserErrorKind, Dict, Options, Schema, UnmarshalDict, UnmarshalJson, UnmarshalText,
    Value, make_dict_deserializer,
};

#[derive(Schema, Default, Debug, PartialEq)]
struct Address {
    #[schema(json = "street")]
    pub street: String,
    #[schema(json = "zip", default = "75001")]
    pub zip: u32,
}

#[derive(Schema, Default, Debug, PartialEq)]
struct Person {
    #[schema(json = "name")]
    pub name: String,
    #[schema(json = "nicknames", default = "[]")]
    pub nicknames: Vec<String>,
    #[schema(json = "address")]
    pub address: Option<Address>,
    #[schema(json = "scores", default = "{}")]
    pub scores: HashMap<String, f64>,
}

#[test]
fn decodes_nested_documents() {
    let deserializer = make_dict_deserializer::<Person>(Options::json()).unwrap();
    let person = deserializer
        .decode_from_str(
            r#"{"name": "Ada", "address": {"street": "Rue de Rivoli"}, "scores": {"math": 19.5}}"#,
        )
        .unwrap();
    assert_eq!(
        person,
        Person {
            name: "Ada".to_owned(),
            nicknames: vec![],
            address: Some(Address {
                street: "Rue de Rivoli".to_owned(),
                zip: 75001,
            }),
            scores: HashMap::from([("math".to_owned(), 19.5)]),
        }
    );
}

#[test]
fn absent_and_null_are_different() {
    let deserializer = make_dict_deserializer::<Person>(Options::json()).unwrap();

    let err = deserializer
        .decode_from_str(r#"{"name": "Ada"}"#)
        .unwrap_err();
    assert!(err.is_missing());
    assert_snapshot!(err, @"missing value at Person.address, expected Option<Address>");

    let person = deserializer
        .decode_from_str(r#"{"name": "Ada", "address": null}"#)
        .unwrap();
    assert_eq!(person.address, None);
}

#[test]
fn reports_the_path_of_invalid_values() {
    let deserializer = make_dict_deserializer::<Person>(Options::json()).unwrap();

    let err = deserializer
        .decode_from_str(r#"{"name": 5, "address": null}"#)
        .unwrap_err();
    assert_snapshot!(err, @"invalid value at Person.name, expected String, got u64 5");

    let err = deserializer
        .decode_from_str(r#"{"name": "Ada", "address": null, "scores": {"math": "x"}}"#)
        .unwrap_err();
    assert_snapshot!(err, @r#"invalid value at Person.scores[math], expected f64, got string "x""#);

    let err = deserializer
        .decode_from_str(r#"{"name": "Ada", "address": null, "nicknames": ["a", 1]}"#)
        .unwrap_err();
    assert_snapshot!(err, @"invalid value at Person.nicknames[1], expected String, got u64 1");
}

#[test]
fn numbers_can_arrive_as_text() {
    let deserializer = make_dict_deserializer::<Address>(Options::json()).unwrap();
    let address = deserializer
        .decode_from_str(r#"{"street": "Main", "zip": "10001"}"#)
        .unwrap();
    assert_eq!(address.zip, 10001);
}

#[derive(Schema, Default, Debug, PartialEq)]
struct Settings {
    #[schema(json = "address", default = "{}")]
    pub address: Address,
}

#[derive(Schema, Default, Debug, PartialEq)]
struct Locale {
    #[schema(json = "language", default = "en")]
    pub language: String,
    #[schema(json = "fallbacks", default = "[]")]
    pub fallbacks: Vec<String>,
}

#[derive(Schema, Default, Debug, PartialEq)]
struct Profile {
    #[schema(json = "locale", default = "{}")]
    pub locale: Locale,
}

#[test]
fn record_defaults_walk_nested_fields() {
    let deserializer = make_dict_deserializer::<Profile>(Options::json()).unwrap();
    let profile = deserializer.decode_from_str("{}").unwrap();
    assert_eq!(profile.locale.language, "en");
    assert!(profile.locale.fallbacks.is_empty());

    // The nested record still needs its own required fields.
    let deserializer = make_dict_deserializer::<Settings>(Options::json()).unwrap();
    let err = deserializer.decode_from_str("{}").unwrap_err();
    assert_snapshot!(err, @"missing value at Settings.address.street, expected String");
}

#[derive(Schema, Default, Debug, PartialEq)]
struct Interval {
    #[schema(json = "ends")]
    pub ends: [u8; 2],
}

#[test]
fn arrays_have_an_exact_length() {
    let deserializer = make_dict_deserializer::<Interval>(Options::json()).unwrap();
    assert_eq!(
        deserializer.decode_from_str(r#"{"ends": [1, 2]}"#).unwrap(),
        Interval { ends: [1, 2] }
    );
    let err = deserializer
        .decode_from_str(r#"{"ends": [1, 2, 3]}"#)
        .unwrap_err();
    assert_snapshot!(err, @"invalid value at Interval.ends, expected an array of length 2, got length 3");
}

#[derive(Schema, Default, Debug, PartialEq)]
struct Coordinates {
    #[schema(json = "x")]
    pub x: i32,
    #[schema(json = "y")]
    pub y: i32,
}

#[test]
fn sequences_of_documents_are_indexed() {
    let deserializer = make_dict_deserializer::<Coordinates>(Options::json()).unwrap();
    let values = [
        Value::from(serde_json::json!({"x": 1, "y": -2})),
        Value::from(serde_json::json!({"x": 3})),
    ];
    let err = deserializer
        .decode_from_dict_sequence(&values)
        .unwrap_err();
    assert_snapshot!(err, @"missing value at Coordinates[1].y, expected i32");

    let decoded = deserializer.decode_from_dict_sequence(&values[..1]).unwrap();
    assert_eq!(decoded, vec![Coordinates { x: 1, y: -2 }]);
}

#[test]
fn root_label_prefixes_paths() {
    let deserializer =
        make_dict_deserializer::<Coordinates>(Options::json().with_root_label("Request.Body"))
            .unwrap();
    assert_eq!(deserializer.root(), "Request.Body.Coordinates");
    let err = deserializer.decode_from_str(r#"{"x": 1}"#).unwrap_err();
    assert_eq!(err.path(), "Request.Body.Coordinates.y");
}

#[test]
fn malformed_input_is_a_syntax_error() {
    let deserializer = make_dict_deserializer::<Coordinates>(Options::json()).unwrap();
    let err = deserializer.decode_from_str("{").unwrap_err();
    assert!(matches!(err.kind(), DeserErrorKind::Syntax(_)));
    assert!(err.to_string().starts_with("malformed input: EOF while parsing"));
}

#[derive(Schema, Default, Debug, PartialEq)]
#[schema(text)]
struct Point {
    #[schema(json = "x")]
    pub x: i32,
    #[schema(json = "y")]
    pub y: i32,
}

impl UnmarshalText for Point {
    fn unmarshal_text(&mut self, text: &str) -> Result<(), BoxError> {
        let (x, y) = text
            .split_once(',')
            .ok_or("expected two comma-separated integers")?;
        self.x = x.trim().parse()?;
        self.y = y.trim().parse()?;
        Ok(())
    }
}

#[derive(Schema, Default, Debug, PartialEq)]
struct Shape {
    #[schema(json = "origin")]
    pub origin: Point,
}

#[test]
fn records_with_a_text_form_accept_both_shapes() {
    let deserializer = make_dict_deserializer::<Shape>(Options::json()).unwrap();
    let structured = deserializer
        .decode_from_str(r#"{"origin": {"x": 1, "y": 2}}"#)
        .unwrap();
    let textual = deserializer.decode_from_str(r#"{"origin": "1, 2"}"#).unwrap();
    assert_eq!(structured, textual);

    let err = deserializer.decode_from_str(r#"{"origin": 5}"#).unwrap_err();
    assert_eq!(
        err.to_string(),
        "invalid value at Shape.origin, expected to be able to parse a Point:\n\t * expected two comma-separated integers"
    );
}

#[test]
fn records_with_a_text_form_still_require_their_fields() {
    let deserializer = make_dict_deserializer::<Shape>(Options::json()).unwrap();
    let err = deserializer
        .decode_from_str(r#"{"origin": {"x": 1}}"#)
        .unwrap_err();
    assert!(!err.is_missing());
    assert_eq!(err.path(), "Shape.origin");
    assert_eq!(
        err.to_string(),
        "invalid value at Shape.origin, expected to be able to parse a Point:\n\t * expected two comma-separated integers"
    );
}

#[derive(Schema, Default, Debug, PartialEq)]
#[schema(json)]
struct Compact(pub String);

impl UnmarshalJson for Compact {
    fn unmarshal_json(&mut self, raw: &[u8]) -> Result<(), BoxError> {
        self.0 = String::from_utf8(raw.to_vec())?;
        Ok(())
    }
}

#[derive(Schema, Default, Debug, PartialEq)]
#[schema(json, text)]
struct Flexible(pub u32);

impl UnmarshalJson for Flexible {
    fn unmarshal_json(&mut self, raw: &[u8]) -> Result<(), BoxError> {
        self.0 = serde_json::from_slice(raw)?;
        Ok(())
    }
}

impl UnmarshalText for Flexible {
    fn unmarshal_text(&mut self, text: &str) -> Result<(), BoxError> {
        let Some(hex) = text.strip_prefix("0x") else {
            return Err(format!("not a hex literal: {text}").into());
        };
        self.0 = u32::from_str_radix(hex, 16)?;
        Ok(())
    }
}

#[derive(Schema, Default, Debug, PartialEq)]
struct Envelope {
    #[schema(json = "payload")]
    pub payload: Compact,
    #[schema(json = "flag", default = "0x10")]
    pub flag: Flexible,
}

#[test]
fn raw_hooks_see_the_encoded_value() {
    let deserializer = make_dict_deserializer::<Envelope>(Options::json()).unwrap();
    let envelope = deserializer
        .decode_from_str(r#"{"payload": {"a": [1, true]}, "flag": 7}"#)
        .unwrap();
    assert_eq!(envelope.payload, Compact(r#"{"a":[1,true]}"#.to_owned()));
    assert_eq!(envelope.flag, Flexible(7));

    let envelope = deserializer
        .decode_from_str(r#"{"payload": "as is", "flag": "0x1f"}"#)
        .unwrap();
    assert_eq!(envelope.payload, Compact("as is".to_owned()));
    assert_eq!(envelope.flag, Flexible(31));

    let envelope = deserializer.decode_from_str(r#"{"payload": ""}"#).unwrap();
    assert_eq!(envelope.flag, Flexible(16));

    let err = deserializer
        .decode_from_str(r#"{"payload": "", "flag": "zz"}"#)
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "invalid value at Envelope.flag, expected to be able to parse a Flexible:\n\t * \
         failed to decode 'zz' either as JSON or as text:\n\t * \
         expected value at line 1 column 1\n\t * \
         and not a hex literal: zz"
    );
}

#[derive(Schema, Default, Debug, PartialEq)]
#[schema(dict)]
struct KeySet {
    pub keys: Vec<String>,
}

impl UnmarshalDict for KeySet {
    fn unmarshal_dict(&mut self, dict: &Dict) -> Result<(), BoxError> {
        self.keys = dict.keys().map(str::to_owned).collect();
        Ok(())
    }
}

#[derive(Schema, Default, Debug, PartialEq)]
struct Catalog {
    #[schema(json = "sections")]
    pub sections: KeySet,
    #[schema(json = "extra", default = "{}")]
    pub extra: Value,
}

#[test]
fn dictionary_hooks_and_raw_values() {
    let deserializer = make_dict_deserializer::<Catalog>(Options::json()).unwrap();
    let catalog = deserializer
        .decode_from_str(r#"{"sections": {"zeta": 1, "alpha": 2}, "extra": [1, "two"]}"#)
        .unwrap();
    assert_eq!(catalog.sections.keys, ["zeta", "alpha"]);
    assert_eq!(catalog.extra.as_sequence().map(<[Value]>::len), Some(2));

    let catalog = deserializer.decode_from_str(r#"{"sections": {}}"#).unwrap();
    assert_eq!(catalog.extra, Value::Dict(Dict::new()));

    let err = deserializer
        .decode_from_str(r#"{"sections": []}"#)
        .unwrap_err();
    assert_snapshot!(err, @"invalid value at Catalog.sections, expected KeySet, got an array of 0 value(s)");
}

#[derive(Schema, Default, Debug)]
struct Boxed {
    #[schema(json = "inner")]
    pub inner: Box<Coordinates>,
    #[schema(json = "count", default = "3")]
    pub count: std::sync::Arc<u8>,
}

#[test]
fn pointers_are_transparent() {
    let deserializer = make_dict_deserializer::<Boxed>(Options::json()).unwrap();
    let boxed = deserializer
        .decode_from_str(r#"{"inner": {"x": 4, "y": 5}}"#)
        .unwrap();
    assert_eq!(*boxed.inner, Coordinates { x: 4, y: 5 });
    assert_eq!(*boxed.count, 3);

    let err = deserializer
        .decode_from_str(r#"{"inner": {"x": 4}}"#)
        .unwrap_err();
    assert_eq!(err.path(), "Boxed.inner.y");
}

#[derive(Schema, Default, Debug, PartialEq)]
struct Sample {
    #[schema(json = "flag")]
    pub flag: bool,
    #[schema(json = "tiny")]
    pub tiny: i8,
    #[schema(json = "short")]
    pub short: i16,
    #[schema(json = "int")]
    pub int: i32,
    #[schema(json = "long")]
    pub long: i64,
    #[schema(json = "huge")]
    pub huge: i128,
    #[schema(json = "offset")]
    pub offset: isize,
    #[schema(json = "byte")]
    pub byte: u8,
    #[schema(json = "word")]
    pub word: u16,
    #[schema(json = "dword")]
    pub dword: u32,
    #[schema(json = "qword")]
    pub qword: u64,
    #[schema(json = "wide")]
    pub wide: u128,
    #[schema(json = "size")]
    pub size: usize,
    #[schema(json = "single")]
    pub single: f32,
    #[schema(json = "double")]
    pub double: f64,
    #[schema(json = "corners")]
    pub corners: [Address; 2],
    #[schema(json = "history")]
    pub history: Vec<Address>,
    #[schema(json = "boxed")]
    pub boxed: Box<Address>,
    #[schema(json = "totals")]
    pub totals: HashMap<String, i64>,
}

fn address(street: &str, zip: u32) -> Address {
    Address {
        street: street.to_owned(),
        zip,
    }
}

fn encode_address(address: &Address) -> serde_json::Value {
    serde_json::json!({"street": address.street, "zip": address.zip})
}

fn encode_sample(sample: &Sample) -> serde_json::Value {
    serde_json::json!({
        "flag": sample.flag,
        "tiny": sample.tiny,
        "short": sample.short,
        "int": sample.int,
        "long": sample.long,
        "huge": sample.huge,
        "offset": sample.offset,
        "byte": sample.byte,
        "word": sample.word,
        "dword": sample.dword,
        "qword": sample.qword,
        "wide": sample.wide,
        "size": sample.size,
        "single": sample.single,
        "double": sample.double,
        "corners": sample.corners.iter().map(encode_address).collect::<Vec<_>>(),
        "history": sample.history.iter().map(encode_address).collect::<Vec<_>>(),
        "boxed": encode_address(&sample.boxed),
        "totals": sample.totals,
    })
}

#[test]
fn encoded_values_decode_back_unchanged() {
    let sample = Sample {
        flag: true,
        tiny: i8::MIN,
        short: -300,
        int: 70_000,
        long: i64::MIN,
        huge: i128::from(i64::MIN),
        offset: -7,
        byte: u8::MAX,
        word: 60_000,
        dword: u32::MAX,
        qword: u64::MAX,
        wide: u128::from(u64::MAX),
        size: 42,
        single: 1.25,
        double: -0.5,
        corners: [address("Nord", 1), address("Sud", 2)],
        history: vec![address("Est", 3)],
        boxed: Box::new(address("Ouest", 4)),
        totals: HashMap::from([("a".to_owned(), -1), ("b".to_owned(), 2)]),
    };
    let deserializer = make_dict_deserializer::<Sample>(Options::json()).unwrap();
    let decoded = deserializer
        .decode_from_json(encode_sample(&sample))
        .unwrap();
    assert_eq!(decoded, sample);
}

#[test]
fn compiling_twice_gives_equivalent_deserializers() {
    let first = make_dict_deserializer::<Person>(Options::json()).unwrap();
    let second = make_dict_deserializer::<Person>(Options::json()).unwrap();
    let inputs = [
        r#"{"name": "Ada"}"#,
        r#"{"name": "Ada", "scores": {"math": 12}}"#,
        r#"{"nicknames": ["a"]}"#,
        r#"{"name": "Ada", "address": {}}"#,
        r#"{"name": "Ada", "scores": {"math": "high"}}"#,
        "[",
    ];
    for input in inputs {
        match (first.decode_from_str(input), second.decode_from_str(input)) {
            (Ok(a), Ok(b)) => assert_eq!(a, b),
            (Err(a), Err(b)) => assert_eq!(a.to_string(), b.to_string()),
            (a, b) => panic!("{input}: {a:?} and {b:?} disagree"),
        }
    }
}

#[derive(Schema, Default, Debug, PartialEq)]
struct Wide {
    #[schema(json = "n")]
    pub n: u128,
}

#[test]
fn integral_floats_fill_wide_integers() {
    let deserializer = make_dict_deserializer::<Wide>(Options::json()).unwrap();
    let wide = deserializer
        .decode_from_str(r#"{"n": 100000000000000000000}"#)
        .unwrap();
    assert_eq!(wide.n, 100_000_000_000_000_000_000);

    let err = deserializer.decode_from_str(r#"{"n": 1.5}"#).unwrap_err();
    assert_eq!(err.path(), "Wide.n");
}

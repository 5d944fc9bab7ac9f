//! Streams editing against the stock MPAS streams files.

use mpas_config::{ConfigError, Streams};
use test_utils::fixtures;

#[test]
fn test_unedited_streams_round_trip() {
    for xml in [fixtures::STREAMS_INIT_ATMOSPHERE, fixtures::STREAMS_ATMOSPHERE] {
        let mut streams = Streams::parse(xml, "fixture").unwrap();
        assert_eq!(streams.as_str(), xml);

        // Setting an attribute to its current value is a no-op on the text
        streams
            .set_attribute("input", "input_interval", "initial_only")
            .unwrap();
        assert_eq!(streams.as_str(), xml);
    }
}

#[test]
fn test_stream_names() {
    let streams = Streams::parse(fixtures::STREAMS_ATMOSPHERE, "streams.atmosphere").unwrap();
    assert_eq!(
        streams.names().unwrap(),
        vec!["input", "restart", "output", "diagnostics", "lbc_in"]
    );
}

#[test]
fn test_set_filename_template_on_immutable_stream() {
    let mut streams =
        Streams::parse(fixtures::STREAMS_INIT_ATMOSPHERE, "streams.init_atmosphere").unwrap();
    streams
        .set_attribute("input", "filename_template", "colorado12km.static.nc")
        .unwrap();
    streams
        .set_attribute("output", "filename_template", "colorado12km.init.nc")
        .unwrap();

    assert_eq!(
        streams.attribute("input", "filename_template").unwrap().as_deref(),
        Some("colorado12km.static.nc")
    );
    assert_eq!(
        streams.attribute("output", "filename_template").unwrap().as_deref(),
        Some("colorado12km.init.nc")
    );
    // Other streams and attributes unchanged
    assert_eq!(
        streams.attribute("surface", "filename_template").unwrap().as_deref(),
        Some("x1.40962.sfc_update.nc")
    );
    assert_eq!(
        streams.attribute("output", "packages").unwrap().as_deref(),
        Some("initial_conds")
    );
}

#[test]
fn test_edit_only_changes_attribute_value() {
    let mut streams =
        Streams::parse(fixtures::STREAMS_INIT_ATMOSPHERE, "streams.init_atmosphere").unwrap();
    streams.set_attribute("lbc", "output_interval", "1:00:00").unwrap();

    let expected = fixtures::STREAMS_INIT_ATMOSPHERE.replace(
        "packages=\"lbcs\"\n                  output_interval=\"3:00:00\"",
        "packages=\"lbcs\"\n                  output_interval=\"1:00:00\"",
    );
    assert_ne!(expected, fixtures::STREAMS_INIT_ATMOSPHERE);
    assert_eq!(streams.as_str(), expected);
}

#[test]
fn test_set_attribute_on_stream_with_children() {
    let mut streams = Streams::parse(fixtures::STREAMS_ATMOSPHERE, "streams.atmosphere").unwrap();
    streams
        .set_attribute("diagnostics", "output_interval", "1:00:00")
        .unwrap();

    assert_eq!(
        streams.attribute("diagnostics", "output_interval").unwrap().as_deref(),
        Some("1:00:00")
    );
    assert!(streams
        .as_str()
        .contains("<file name=\"stream_list.atmosphere.diagnostics\"/>"));
    // The nested <file> element is not a stream
    assert!(!streams.names().unwrap().contains(&"stream_list.atmosphere.diagnostics".to_string()));
}

#[test]
fn test_missing_attribute_is_added() {
    let mut streams = Streams::parse(fixtures::STREAMS_ATMOSPHERE, "streams.atmosphere").unwrap();
    assert_eq!(streams.attribute("input", "reference_time").unwrap(), None);

    streams
        .set_attribute("input", "reference_time", "2023-06-01_06:00:00")
        .unwrap();
    assert_eq!(
        streams.attribute("input", "reference_time").unwrap().as_deref(),
        Some("2023-06-01_06:00:00")
    );
}

#[test]
fn test_value_is_escaped() {
    let mut streams = Streams::parse(fixtures::STREAMS_ATMOSPHERE, "streams.atmosphere").unwrap();
    streams
        .set_attribute("output", "filename_template", "a&b<c>.nc")
        .unwrap();
    assert!(streams.as_str().contains("filename_template=\"a&amp;b&lt;c&gt;.nc\""));
    assert_eq!(
        streams.attribute("output", "filename_template").unwrap().as_deref(),
        Some("a&b<c>.nc")
    );
}

#[test]
fn test_missing_stream_fails_with_name() {
    let mut streams =
        Streams::parse(fixtures::STREAMS_INIT_ATMOSPHERE, "streams.init_atmosphere").unwrap();
    let err = streams
        .set_attribute("lbc_in", "input_interval", "1:00:00")
        .unwrap_err();
    match err {
        ConfigError::MissingStream { stream, origin } => {
            assert_eq!(stream, "lbc_in");
            assert_eq!(origin, "streams.init_atmosphere");
        }
        other => panic!("unexpected error: {other}"),
    }
    // Failed edits leave the document alone
    assert_eq!(streams.as_str(), fixtures::STREAMS_INIT_ATMOSPHERE);
}

#[test]
fn test_malformed_xml_rejected() {
    let err = Streams::parse("<streams><stream name=\"a\"></streams>", "broken").unwrap_err();
    assert!(matches!(err, ConfigError::Xml { .. }));
}

#[test]
fn test_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("streams.atmosphere");
    std::fs::write(&path, fixtures::STREAMS_ATMOSPHERE).unwrap();

    let mut streams = Streams::from_path(&path).unwrap();
    streams.set_attribute("lbc_in", "input_interval", "1:00:00").unwrap();
    streams.write(&path).unwrap();

    let reread = Streams::from_path(&path).unwrap();
    assert_eq!(
        reread.attribute("lbc_in", "input_interval").unwrap().as_deref(),
        Some("1:00:00")
    );
}

use wirefeed::{
    BodyKind, BodyPolicy, HeaderMap, HttpVersion, ParseError, ParseStatus, ParserConfig,
    ResponseParser, format_debug, format_headers_only, format_json, parse_response,
    parse_response_with_config,
};

const SCENARIO_A: &[u8] = b"HTTP/1.1 200 OK\r\n\
    Content-Type: text/plain\r\n\
    Transfer-Encoding: chunked\r\n\r\n\
    4\r\ntest\r\n0\r\n\r\n";

// =========================================================================
// Reference scenarios
// =========================================================================

#[test]
fn chunked_response_in_one_fragment() {
    let resp = parse_response(SCENARIO_A).expect("should parse");
    assert_eq!(resp.status_code, 200);
    assert_eq!(resp.reason, "OK");
    assert_eq!(resp.version, HttpVersion::Http11);
    let expected: HeaderMap = [
        ("Content-Type", "text/plain"),
        ("Transfer-Encoding", "chunked"),
    ]
    .into_iter()
    .collect();
    assert_eq!(resp.headers, expected);
    assert_eq!(resp.body, b"test");
}

#[test]
fn chunked_response_one_byte_at_a_time() {
    let mut parser = ResponseParser::new();

    for &byte in &SCENARIO_A[..SCENARIO_A.len() - 1] {
        let status = parser.feed(&[byte]).expect("each byte should be ok");
        assert_eq!(status, ParseStatus::Incomplete);
        assert!(!parser.is_finished());
    }

    let status = parser.feed(&SCENARIO_A[SCENARIO_A.len() - 1..]).expect("last byte");
    assert_eq!(status, ParseStatus::Complete(SCENARIO_A.len()));

    let resp = parser.into_response().expect("should finish");
    assert_eq!(resp, parse_response(SCENARIO_A).unwrap());
}

#[test]
fn chunked_body_two_chunks() {
    let raw = b"HTTP/1.1 200 OK\r\n\
        Transfer-Encoding: chunked\r\n\r\n\
        3\r\nfoo\r\n3\r\nbar\r\n0\r\n\r\n";
    let resp = parse_response(raw).expect("should parse");
    assert_eq!(resp.body_as_str(), Some("foobar"));
    assert!(resp.is_chunked());
}

#[test]
fn garbage_status_line() {
    assert!(matches!(
        parse_response(b"GARBAGE\r\n\r\n"),
        Err(ParseError::MalformedStatusLine(_))
    ));
}

// =========================================================================
// Status line
// =========================================================================

#[test]
fn status_line_fails_before_headers_arrive() {
    let mut parser = ResponseParser::new();
    assert!(matches!(
        parser.feed(b"GARBAGE\r\n"),
        Err(ParseError::MalformedStatusLine(line)) if line == "GARBAGE"
    ));
}

#[test]
fn http_10_status_line() {
    let raw = b"HTTP/1.0 404 Not Found\r\nContent-Length: 0\r\n\r\n";
    let resp = parse_response(raw).expect("should parse");
    assert_eq!(resp.version, HttpVersion::Http10);
    assert_eq!(resp.status_code, 404);
    assert_eq!(resp.reason, "Not Found");
    assert!(!resp.is_success());
}

#[test]
fn empty_reason_phrase() {
    let raw = b"HTTP/1.1 204\r\n\r\n";
    let resp = parse_response(raw).expect("should parse");
    assert_eq!(resp.status_code, 204);
    assert_eq!(resp.reason, "");
}

#[test]
fn bare_lf_in_status_line() {
    assert!(matches!(
        parse_response(b"HTTP/1.1 200 OK\nServer: x\r\n\r\n"),
        Err(ParseError::MalformedStatusLine(_))
    ));
    assert!(matches!(
        parse_response(b"HTTP/1.1 200 OK\rServer: x\r\n\r\n"),
        Err(ParseError::MalformedStatusLine(_))
    ));
}

#[test]
fn status_line_length_limit() {
    let config = ParserConfig {
        max_status_line_len: 10,
        ..ParserConfig::default()
    };
    assert!(matches!(
        parse_response_with_config(b"HTTP/1.1 200 Everything Is Fine\r\n\r\n", config),
        Err(ParseError::MalformedStatusLine(_))
    ));
}

// =========================================================================
// Header parsing
// =========================================================================

#[test]
fn header_entry_has_no_surrounding_whitespace() {
    let raw = b"HTTP/1.1 200 OK\r\nX-Foo: bar\r\nX-Pad:  padded \t\r\nContent-Length: 0\r\n\r\n";
    let resp = parse_response(raw).expect("should parse");
    assert_eq!(resp.headers.get("X-Foo"), Some("bar"));
    assert_eq!(resp.headers.get("X-Pad"), Some("padded"));
}

#[test]
fn case_insensitive_header_lookup() {
    let raw = b"HTTP/1.1 200 OK\r\ncontent-type: text/html\r\ncontent-length: 0\r\n\r\n";
    let resp = parse_response(raw).expect("should parse");
    assert_eq!(resp.header_value("Content-Type"), Some("text/html"));
    assert_eq!(resp.content_length(), Some(0));
}

#[test]
fn repeated_headers_are_combined() {
    let raw = b"HTTP/1.1 200 OK\r\nSet-Cookie: a=1\r\nSet-Cookie: b=2\r\nContent-Length: 0\r\n\r\n";
    let resp = parse_response(raw).expect("should parse");
    assert_eq!(resp.headers.len(), 2);
    assert_eq!(resp.header_value("set-cookie"), Some("a=1, b=2"));
}

#[test]
fn header_without_space_after_colon() {
    let raw = b"HTTP/1.1 200 OK\r\nX-Foo:bar\r\n\r\n";
    assert!(matches!(parse_response(raw), Err(ParseError::MalformedHeaderLine(_))));
}

#[test]
fn header_without_colon() {
    let raw = b"HTTP/1.1 200 OK\r\nX-Foo bar\r\n\r\n";
    assert!(matches!(parse_response(raw), Err(ParseError::MalformedHeaderLine(_))));

    let raw = b"HTTP/1.1 200 OK\r\nX-Foo\r\n\r\n";
    assert!(matches!(parse_response(raw), Err(ParseError::MalformedHeaderLine(_))));
}

#[test]
fn header_with_empty_name() {
    let raw = b"HTTP/1.1 200 OK\r\n: value\r\n\r\n";
    assert!(matches!(parse_response(raw), Err(ParseError::MalformedHeaderLine(_))));
}

#[test]
fn bare_lf_in_header_section() {
    let raw = b"HTTP/1.1 200 OK\r\nX-Foo: bar\nX-Baz: q\r\n\r\n";
    assert!(matches!(parse_response(raw), Err(ParseError::MalformedHeaderLine(_))));

    let raw = b"HTTP/1.1 200 OK\r\nX-Foo: bar\r\r\n";
    assert!(matches!(parse_response(raw), Err(ParseError::MalformedHeaderLine(_))));
}

#[test]
fn header_with_obs_text_bytes() {
    let raw = b"HTTP/1.1 200 OK\r\nX-Custom: hello\x80world\r\nContent-Length: 0\r\n\r\n";
    let resp = parse_response(raw).unwrap();
    let val = resp.header_value("X-Custom").unwrap();
    assert!(val.contains('\u{FFFD}'));
}

#[test]
fn many_headers_within_limit() {
    let mut raw = String::from("HTTP/1.1 200 OK\r\n");
    for i in 0..100 {
        raw.push_str(&format!("X-Header-{i}: value-{i}\r\n"));
    }
    raw.push_str("Content-Length: 0\r\n\r\n");

    let resp = parse_response(raw.as_bytes()).unwrap();
    assert_eq!(resp.headers.len(), 101);
}

// =========================================================================
// Body framing
// =========================================================================

#[test]
fn content_length_body() {
    let raw = b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\n\r\nHello";
    let resp = parse_response(raw).expect("should parse");
    assert_eq!(resp.body_as_str(), Some("Hello"));
    assert_eq!(resp.content_length(), Some(5));
}

#[test]
fn content_length_body_short_on_close() {
    let raw = b"HTTP/1.1 200 OK\r\nContent-Length: 100\r\n\r\nshort";
    assert_eq!(parse_response(raw), Err(ParseError::UnexpectedEndOfStream));
}

#[test]
fn duplicate_identical_content_lengths_accepted() {
    let raw = b"HTTP/1.1 200 OK\r\nContent-Length: 3\r\nContent-Length: 3\r\n\r\nabc";
    let resp = parse_response(raw).expect("should parse");
    assert_eq!(resp.body_as_str(), Some("abc"));
}

#[test]
fn differing_content_lengths() {
    let raw = b"HTTP/1.1 200 OK\r\nContent-Length: 3\r\nContent-Length: 5\r\n\r\nabc";
    assert!(matches!(parse_response(raw), Err(ParseError::InvalidContentLength(_))));
}

#[test]
fn non_numeric_content_length() {
    for value in ["abc", "-1", "+5", "1e3", ""] {
        let raw = format!("HTTP/1.1 200 OK\r\nContent-Length: {value}\r\n\r\n");
        assert!(
            matches!(parse_response(raw.as_bytes()), Err(ParseError::InvalidContentLength(_))),
            "accepted Content-Length {value:?}"
        );
    }
}

#[test]
fn body_until_close() {
    let mut parser = ResponseParser::new();
    parser
        .feed(b"HTTP/1.0 200 OK\r\nServer: legacy\r\n\r\nfirst ")
        .unwrap();
    assert_eq!(parser.body_kind(), Some(BodyKind::UntilClose));
    assert_eq!(parser.feed(b"second").unwrap(), ParseStatus::Incomplete);
    assert!(!parser.is_finished());

    assert!(matches!(parser.close().unwrap(), ParseStatus::Complete(_)));
    let resp = parser.into_response().unwrap();
    assert_eq!(resp.body_as_str(), Some("first second"));
}

#[test]
fn require_length_policy_rejects_unframed_body() {
    let config = ParserConfig {
        body_policy: BodyPolicy::RequireLength,
        ..ParserConfig::default()
    };
    let raw = b"HTTP/1.1 200 OK\r\nServer: x\r\n\r\nbody";
    assert!(matches!(
        parse_response_with_config(raw, config),
        Err(ParseError::UnsupportedBodyEncoding(_))
    ));
}

#[test]
fn unsupported_transfer_encoding() {
    let raw = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: gzip\r\n\r\n\x1f\x8b";
    assert!(matches!(
        parse_response(raw),
        Err(ParseError::UnsupportedBodyEncoding(_))
    ));
}

#[test]
fn transfer_encoding_takes_precedence_over_content_length() {
    let raw = b"HTTP/1.1 200 OK\r\n\
        Content-Length: 999\r\n\
        Transfer-Encoding: chunked\r\n\r\n\
        3\r\nabc\r\n0\r\n\r\n";
    let resp = parse_response(raw).unwrap();
    assert_eq!(resp.body_as_str(), Some("abc"));
}

#[test]
fn chunked_after_other_coding() {
    let raw = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: gzip, chunked\r\n\r\n\
        2\r\n\x1f\x8b\r\n0\r\n\r\n";
    let resp = parse_response(raw).unwrap();
    assert_eq!(resp.body, [0x1f_u8, 0x8b]);
}

#[test]
fn bodiless_statuses_finish_at_header_end() {
    for status in ["204 No Content", "304 Not Modified", "100 Continue"] {
        let mut parser = ResponseParser::new();
        let raw = format!("HTTP/1.1 {status}\r\nContent-Length: 10\r\n\r\n");
        assert_eq!(
            parser.feed(raw.as_bytes()).unwrap(),
            ParseStatus::Complete(raw.len()),
            "{status}"
        );
        assert_eq!(parser.body_kind(), Some(BodyKind::None));
    }
}

#[test]
fn bytes_after_the_response_are_not_consumed() {
    let raw = b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nokHTTP/1.1 200 OK\r\n";
    let mut parser = ResponseParser::new();
    match parser.feed(raw).unwrap() {
        ParseStatus::Complete(consumed) => assert_eq!(&raw[consumed..consumed + 4], b"HTTP"),
        ParseStatus::Incomplete => panic!("expected Complete"),
    }
    assert_eq!(parser.into_response().unwrap().body, b"ok");
}

// =========================================================================
// Chunked body errors
// =========================================================================

#[test]
fn chunked_trailer_fields_rejected() {
    let raw = b"HTTP/1.1 200 OK\r\n\
        Transfer-Encoding: chunked\r\n\r\n\
        3\r\nabc\r\n0\r\n\
        Trailer-Field: value\r\n\r\n";
    assert!(matches!(parse_response(raw), Err(ParseError::UnexpectedByte { .. })));
}

#[test]
fn chunk_size_overflow() {
    let config = ParserConfig {
        max_chunk_size: 1024,
        ..ParserConfig::default()
    };
    let raw = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n401\r\n";
    assert_eq!(
        parse_response_with_config(raw, config),
        Err(ParseError::ChunkSizeOverflow)
    );
}

#[test]
fn chunked_body_too_large() {
    let config = ParserConfig {
        max_body_size: 3,
        ..ParserConfig::default()
    };
    let raw = b"HTTP/1.1 200 OK\r\n\
        Transfer-Encoding: chunked\r\n\r\n\
        2\r\nab\r\n2\r\ncd\r\n0\r\n\r\n";
    assert_eq!(parse_response_with_config(raw, config), Err(ParseError::BodyTooLarge));
}

#[test]
fn chunked_stream_cut_short() {
    let raw = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n4\r\nte";
    assert_eq!(parse_response(raw), Err(ParseError::UnexpectedEndOfStream));
}

#[test]
fn headers_cut_short() {
    assert_eq!(
        parse_response(b"HTTP/1.1 200 OK\r\nServer: x\r\n"),
        Err(ParseError::UnexpectedEndOfStream)
    );
    assert_eq!(parse_response(b""), Err(ParseError::UnexpectedEndOfStream));
}

// =========================================================================
// Configuration limits
// =========================================================================

#[test]
fn config_max_headers_count_enforced() {
    let config = ParserConfig {
        max_headers_count: 2,
        ..ParserConfig::default()
    };
    let raw = b"HTTP/1.1 200 OK\r\nH1: a\r\nH2: b\r\nH3: c\r\n\r\n";
    assert_eq!(parse_response_with_config(raw, config), Err(ParseError::TooManyHeaders));
}

#[test]
fn config_max_header_name_len_enforced() {
    let config = ParserConfig {
        max_header_name_len: 4,
        ..ParserConfig::default()
    };
    let raw = b"HTTP/1.1 200 OK\r\nVeryLongHeaderName: v\r\n\r\n";
    assert_eq!(parse_response_with_config(raw, config), Err(ParseError::HeaderTooLarge));
}

#[test]
fn config_max_header_value_len_enforced() {
    let config = ParserConfig {
        max_header_value_len: 3,
        ..ParserConfig::default()
    };
    let raw = b"HTTP/1.1 200 OK\r\nServer: very-long-value\r\n\r\n";
    assert_eq!(parse_response_with_config(raw, config), Err(ParseError::HeaderTooLarge));
}

#[test]
fn config_max_body_size_enforced() {
    let config = ParserConfig {
        max_body_size: 5,
        ..ParserConfig::default()
    };
    let raw = b"HTTP/1.1 200 OK\r\nContent-Length: 10\r\n\r\n0123456789";
    assert_eq!(parse_response_with_config(raw, config.clone()), Err(ParseError::BodyTooLarge));

    let raw = b"HTTP/1.1 200 OK\r\n\r\n0123456789";
    assert_eq!(parse_response_with_config(raw, config), Err(ParseError::BodyTooLarge));
}

// =========================================================================
// Parser lifecycle
// =========================================================================

#[test]
fn response_before_finish_is_an_error() {
    let mut parser = ResponseParser::new();
    parser.feed(b"HTTP/1.1 200 OK\r\n").unwrap();
    assert_eq!(parser.response(), Err(ParseError::IncompleteResponse));
    assert_eq!(parser.into_response(), Err(ParseError::IncompleteResponse));
}

#[test]
fn empty_fragments_are_harmless() {
    let mut parser = ResponseParser::new();
    assert_eq!(parser.feed(b"").unwrap(), ParseStatus::Incomplete);
    parser.feed(&SCENARIO_A[..20]).unwrap();
    assert_eq!(parser.feed(b"").unwrap(), ParseStatus::Incomplete);
    parser.feed(&SCENARIO_A[20..]).unwrap();
    assert!(parser.is_finished());
    assert_eq!(parser.feed(b"").unwrap(), ParseStatus::Complete(SCENARIO_A.len()));
}

#[test]
fn response_can_be_read_twice() {
    let mut parser = ResponseParser::new();
    parser.feed(SCENARIO_A).unwrap();
    let first = parser.response().unwrap();
    assert_eq!(parser.response().unwrap(), first);
    assert_eq!(parser.bytes_consumed(), SCENARIO_A.len());
}

#[test]
fn close_after_finish_is_ok() {
    let mut parser = ResponseParser::new();
    parser.feed(SCENARIO_A).unwrap();
    assert_eq!(parser.close(), Ok(ParseStatus::Complete(SCENARIO_A.len())));
}

// =========================================================================
// Output formatting
// =========================================================================

#[test]
fn json_output_compact() {
    let resp = parse_response(SCENARIO_A).unwrap();
    let json = format_json(&resp, false);
    assert!(json.contains("\"status_code\":200"));
    assert!(json.contains("\"reason\":\"OK\""));
    assert!(json.contains("\"version\":\"HTTP/1.1\""));
    assert!(json.contains("\"Content-Type\":\"text/plain\""));
    assert!(json.contains("\"body\":\"test\""));
}

#[test]
fn json_output_pretty() {
    let resp = parse_response(SCENARIO_A).unwrap();
    let json = format_json(&resp, true);
    assert!(json.contains('\n'));
    assert!(json.contains("  "));
}

#[test]
fn debug_output_contains_sections() {
    let resp = parse_response(SCENARIO_A).unwrap();
    let dbg = format_debug(&resp);
    assert!(dbg.contains("=== HTTP Response ==="));
    assert!(dbg.contains("Status:  200"));
    assert!(dbg.contains("Reason:  OK"));
    assert!(dbg.contains("--- Headers (2) ---"));
    assert!(dbg.contains("--- Body (4 bytes) ---\ntest\n"));
}

#[test]
fn debug_output_without_body() {
    let resp = parse_response(b"HTTP/1.1 204 No Content\r\n\r\n").unwrap();
    assert!(format_debug(&resp).contains("--- No Body ---"));
}

#[test]
fn headers_only_output_is_sorted() {
    let resp = parse_response(SCENARIO_A).unwrap();
    let out = format_headers_only(&resp);
    assert_eq!(
        out,
        "HTTP/1.1 200 OK\nContent-Type: text/plain\nTransfer-Encoding: chunked\n"
    );
}

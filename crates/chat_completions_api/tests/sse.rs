use chat_completions_api::{ChatStreamEvent, FinishReason, SseStreamParser};

#[test]
fn sse_framing_parses_deltas_and_done() {
    let payload = concat!(
        "data: {\"choices\":[{\"delta\":{\"content\":\"hel\"}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n\n",
        "data: [DONE]\n\n",
    );

    let events = SseStreamParser::parse_frames(payload);
    assert_eq!(
        events,
        vec![
            ChatStreamEvent::ContentDelta {
                delta: "hel".to_owned()
            },
            ChatStreamEvent::ContentDelta {
                delta: "lo".to_owned()
            },
            ChatStreamEvent::Done,
        ]
    );
}

#[test]
fn sse_parser_maps_in_stream_errors() {
    let payload = "data: {\"error\":{\"code\":429,\"message\":\"slow down\"}}\n\n";

    let events = SseStreamParser::parse_frames(payload);
    assert_eq!(
        events,
        vec![ChatStreamEvent::Error {
            code: Some("429".to_owned()),
            message: Some("slow down".to_owned()),
        }]
    );
}

#[test]
fn sse_parser_ignores_unknown_and_malformed() {
    let payload = concat!(
        ": keep-alive comment\n\n",
        "event: ping\n\n",
        "data: {\"object\":\"chat.completion.chunk\",\"choices\":[]}\n\n",
        "data: {broken-json\n\n",
        "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"x\"}}]}\n\n",
    );

    let events = SseStreamParser::parse_frames(payload);
    assert_eq!(
        events,
        vec![ChatStreamEvent::ContentDelta {
            delta: "x".to_owned()
        }]
    );
}

#[test]
fn sse_parser_handles_split_frames_incrementally() {
    let mut parser = SseStreamParser::default();
    assert!(parser
        .feed(b"data: {\"choices\":[{\"delta\":{\"content\":\"abc\"}}")
        .is_empty());
    let mut events = parser.feed(b"]}\n\n");
    assert_eq!(events.len(), 1);
    assert!(matches!(
        events.pop(),
        Some(ChatStreamEvent::ContentDelta { .. })
    ));
}

#[test]
fn sse_parser_skips_empty_data_frames() {
    let payload = concat!(
        "data: \n\n",
        "data: {\"choices\":[{\"delta\":{},\"finish_reason\":\"content_filter\"}]}\n\n"
    );
    let events = SseStreamParser::parse_frames(payload);
    assert_eq!(
        events,
        vec![ChatStreamEvent::Finished {
            reason: FinishReason::ContentFilter
        }]
    );
}

#[test]
fn sse_parser_keeps_incomplete_trailing_bytes_until_finish() {
    let mut parser = SseStreamParser::default();
    assert!(parser
        .feed(b"data: {\"choices\":[{\"delta\":{\"content\":\"tail\"}}]}")
        .is_empty());
    assert!(!parser.is_empty_buffer());

    let events = parser.finish();
    assert_eq!(
        events,
        vec![ChatStreamEvent::ContentDelta {
            delta: "tail".to_owned()
        }]
    );
    assert!(parser.is_empty_buffer());
}

#[test]
fn sse_parser_accepts_crlf_line_endings() {
    let events = SseStreamParser::parse_frames(
        "data: {\"choices\":[{\"delta\":{\"content\":\"win\"}}]}\r\n\r\ndata: [DONE]\r\n\r\n",
    );
    assert_eq!(events.len(), 2);
    assert!(events[1].is_done());
}

#[test]
fn sse_parser_stops_at_done() {
    let mut parser = SseStreamParser::default();
    let events = parser.feed(
        concat!(
            "data:{\"choices\":[{\"delta\":{\"content\":\"a\"}}]}\n",
            "data: [DONE]\n",
            "data:{\"choices\":[{\"delta\":{\"content\":\"late\"}}]}\n",
            "data:{\"choices\":[{\"delta\":{\"content\":\"unterminated\"}}]}",
        )
        .as_bytes(),
    );

    assert_eq!(
        events,
        vec![
            ChatStreamEvent::ContentDelta {
                delta: "a".to_owned()
            },
            ChatStreamEvent::Done,
        ]
    );
    assert!(parser.feed(b"data:{\"choices\":[{\"delta\":{\"content\":\"more\"}}]}\n").is_empty());
    assert!(parser.finish().is_empty());
}

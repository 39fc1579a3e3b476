//! Result file round-trips through `save_result` / `load_result`

use serde_json::{json, Value};
use tempfile::tempdir;

use deep_research_agent::state::StateUpdate;
use deep_research_agent::{load_result, save_result, Message, ResearchState, ResultAnalysis, Source};

fn finished_state() -> ResearchState {
    let mut state = ResearchState::from_question("Quais são as vantagens da energia solar?")
        .with_initial_search_query_count(2)
        .with_max_research_loops(1)
        .with_reasoning_model("gemini-2.0-flash")
        .with_extra("domain", "energia");

    state.apply(StateUpdate {
        search_query: Some(vec!["energia solar vantagens".into()]),
        web_research_result: Some(vec!["Painéis solares reduzem custos [iea](https://s/0-0)".into()]),
        sources_gathered: Some(vec![Source::new("iea", "https://s/0-0", "https://iea.org/solar")]),
        ..Default::default()
    });
    state.apply(StateUpdate {
        research_loop_count: Some(1),
        number_of_ran_queries: Some(1),
        is_sufficient: Some(true),
        knowledge_gap: Some(String::new()),
        follow_up_queries: Some(vec![]),
        ..Default::default()
    });
    state.apply(StateUpdate {
        messages: Some(vec![Message::ai("A energia solar é barata [iea](https://iea.org/solar).")]),
        ..Default::default()
    });
    state
}

#[test]
fn test_round_trip_preserves_everything() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("result_simple.json");
    let state = finished_state();

    save_result(&path, &state).unwrap();
    let loaded = load_result(&path).unwrap();

    assert_eq!(loaded, state);
    assert_eq!(
        ResultAnalysis::from_state(&loaded),
        ResultAnalysis::from_state(&state)
    );
}

#[test]
fn test_file_layout() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("result.json");
    save_result(&path, &finished_state()).unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    // Pretty-printed, non-ASCII written verbatim.
    assert!(text.contains("\n  \"messages\": ["));
    assert!(text.contains("Quais são as vantagens"));
    assert!(!text.contains("\\u00e3"));

    let value: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(
        value["messages"],
        json!([
            { "type": "human", "content": "Quais são as vantagens da energia solar?" },
            { "type": "ai", "content": "A energia solar é barata [iea](https://iea.org/solar)." }
        ])
    );
    assert_eq!(value["initial_search_query_count"], json!(2));
    assert_eq!(value["reasoning_model"], json!("gemini-2.0-flash"));
    assert_eq!(value["research_loop_count"], json!(1));
    assert_eq!(value["sources_gathered"][0]["value"], json!("https://iea.org/solar"));
    assert_eq!(value["domain"], json!("energia"));
}

#[test]
fn test_load_accepts_unknown_keys() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("external.json");
    std::fs::write(
        &path,
        json!({
            "messages": [{ "type": "human", "content": "hi" }],
            "evidence_level": "peer_reviewed",
            "time_range": { "years": 2 }
        })
        .to_string(),
    )
    .unwrap();

    let state = load_result(&path).unwrap();
    assert_eq!(state.messages, vec![Message::human("hi")]);
    assert_eq!(state.extra["evidence_level"], json!("peer_reviewed"));
    assert_eq!(state.extra["time_range"], json!({ "years": 2 }));
}

#[test]
fn test_load_missing_file_is_io_error() {
    let dir = tempdir().unwrap();
    let err = load_result(dir.path().join("nope.json")).unwrap_err();
    assert!(matches!(err, deep_research_agent::ResearchError::Io(_)));
}

#[test]
fn test_sources_need_only_a_value() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("sources.json");
    std::fs::write(
        &path,
        json!({
            "messages": [{ "type": "human", "content": "hi" }],
            "sources_gathered": [{ "value": "https://a.com", "title": "A" }]
        })
        .to_string(),
    )
    .unwrap();

    let state = load_result(&path).unwrap();
    let source = &state.sources_gathered[0];
    assert_eq!(source.value, "https://a.com");
    assert_eq!(source.label, "");
    assert_eq!(source.extra["title"], json!("A"));

    // Extra source keys survive being written back.
    save_result(&path, &state).unwrap();
    let value: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(value["sources_gathered"][0]["title"], json!("A"));
    assert_eq!(load_result(&path).unwrap(), state);
}

#[test]
fn test_empty_follow_ups_are_written() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("result.json");
    save_result(&path, &finished_state()).unwrap();

    let value: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(value["follow_up_queries"], json!([]));
    assert_eq!(value["knowledge_gap"], json!(""));
    assert_eq!(value["is_sufficient"], json!(true));
}

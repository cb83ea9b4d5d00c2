use uuid::Uuid;

use lectern_domain::{
	context::GroundedContext,
	document::Document,
	session::{Focus, FocusedView, Mode, Session, SessionState},
};

fn doc(title: &str) -> Document {
	Document::new(Uuid::new_v4(), title)
}

fn assert_consistent(session: &Session) {
	assert_eq!(session.state() == SessionState::Focused, session.focus().is_some());
}

#[test]
fn new_session_is_browsing_and_empty() {
	let session = Session::new("s-1", "u-1");

	assert_eq!(session.state(), SessionState::Browsing);
	assert_eq!(session.mode(), Mode::Rag);
	assert!(session.is_empty());
	assert_consistent(&session);
}

#[test]
fn focusing_a_candidate_keeps_the_candidate_list() {
	let (a, b, c) = (doc("A"), doc("B"), doc("C"));
	let mut session = Session::new("s-1", "u-1");

	session.to_browsing(vec![a.clone(), b.clone(), c.clone()]);
	session.to_focused(b.clone().with_content("full text of B"));

	assert_eq!(session.state(), SessionState::Focused);
	assert_eq!(session.candidates().len(), 3);
	assert_eq!(session.candidates()[1].content, "full text of B");
	assert_eq!(session.focus_index(), 2);
	assert_consistent(&session);
}

#[test]
fn focusing_an_outside_document_replaces_the_candidates() {
	let mut session = Session::new("s-1", "u-1");

	session.to_browsing(vec![doc("A"), doc("B")]);

	let outside = doc("Z");

	session.to_focused(outside.clone());

	assert_eq!(session.candidates(), std::slice::from_ref(&outside));
	assert_eq!(session.focus_index(), 1);
}

#[test]
fn browsing_clears_focus() {
	let mut session = Session::new("s-1", "u-1");

	session.to_focused(doc("A"));
	session.to_browsing(vec![doc("B")]);

	assert_eq!(session.state(), SessionState::Browsing);
	assert!(session.focused_document().is_none());
	assert_consistent(&session);
}

#[test]
fn aggregating_nothing_falls_back_to_browsing() {
	let mut session = Session::new("s-1", "u-1");

	session.to_focused(doc("A"));
	session.to_aggregated(Vec::new(), String::new());

	assert_eq!(session.state(), SessionState::Browsing);
	assert!(session.candidates().is_empty());
	assert_consistent(&session);
}

#[test]
fn aggregated_focus_is_not_a_single_document() {
	let mut session = Session::new("s-1", "u-1");

	session.to_aggregated(vec![doc("A"), doc("B")], "## A\n\n## B".to_string());

	assert!(session.is_aggregated());
	assert!(session.focused_document().is_none());
	assert_eq!(session.focus_index(), 0);
	assert!(matches!(session.focus(), Some(Focus::Aggregated { .. })));
	assert_eq!(session.snapshot().focused, Some(FocusedView::Aggregated { count: 2 }));
}

#[test]
fn refresh_updates_candidates_and_focus() {
	let a = doc("A");
	let mut session = Session::new("s-1", "u-1");

	session.to_focused(a.clone());
	session.refresh(&[a.clone().with_content("hydrated")]);

	assert_eq!(session.focused_document().map(|doc| doc.content.as_str()), Some("hydrated"));
	assert_eq!(session.candidates()[0].content, "hydrated");
}

#[test]
fn snapshot_serializes_state_and_focus() {
	let a = doc("Exam");
	let mut session = Session::new("s-1", "u-1");

	session.record_query("open my exam");
	session.to_focused(a.clone());

	let json = serde_json::to_value(session.snapshot()).expect("serialize");

	assert_eq!(json["state"], "FOCUSED");
	assert_eq!(json["mode"], "RAG");
	assert_eq!(json["focused"]["kind"], "single");
	assert_eq!(json["focused"]["title"], "Exam");
	assert_eq!(json["last_query"], "open my exam");
}

#[test]
fn context_citations_follow_ids() {
	let (a, b) = (doc("A"), doc("B"));
	let context = GroundedContext::aggregated(&[a.clone(), b.clone()], Vec::new());
	let citations = context.citations();

	assert_eq!(context.ids, vec![a.id, b.id]);
	assert_eq!(citations.iter().map(|c| c.document_id).collect::<Vec<_>>(), context.ids);
	assert_eq!(citations[1].title, "B");
}

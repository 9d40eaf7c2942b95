use std::sync::Arc;

use canvas_cli::session::Session;
use chat_canvas::NodeId;
use generation_mock::MockTransport;
use pretty_assertions::assert_eq;

fn session(fragments: &[&str]) -> Session {
    Session::new(
        Arc::new(MockTransport::scripted(fragments.iter().copied())),
        false,
    )
}

#[test]
fn plain_prompts_chain_down_the_main_column() {
    let mut session = session(&["Gravity", " pulls", " masses", " together."]);

    let first = session.handle_line("Explain gravity");
    assert_eq!(first.lines[0], "Gravity pulls masses together.");
    assert!(first.lines[1].ends_with("completed after 4 fragments"));

    session.handle_line("And light?");
    let snapshot = session.controller().snapshot();
    assert_eq!(snapshot.len(), 4);
    let root = snapshot.root().expect("root");
    let depth_two = snapshot
        .children(&root.children_ids[0])
        .next()
        .expect("second prompt");
    assert_eq!(depth_two.content, "And light?");
}

#[test]
fn demo_then_branch_and_tree() {
    let mut session = session(&["Shallow", " compare."]);

    assert_eq!(
        session.handle_line("/demo").lines,
        vec!["loaded sample conversation (14 nodes)".to_string()]
    );
    assert_eq!(
        session.handle_line("/demo").lines,
        vec!["error: /demo needs an empty canvas".to_string()]
    );

    let branch = session.handle_line("/branch mock-asst-1 react.MEMO => what is compared?");
    assert_eq!(branch.lines[0], "Shallow compare.");

    let anchors = session.handle_line("/anchors mock-asst-1");
    assert!(anchors.lines[0].contains("[React.memo]{mock-user-branch-1}"));
    assert!(anchors.lines[0].contains("[Context API]{mock-user-branch-2}"));

    let tree = session.handle_line("/tree");
    assert_eq!(tree.lines.len(), 16);
    assert!(tree.lines.iter().any(|line| line.contains("«react.MEMO»")));
}

#[test]
fn plain_prompt_after_demo_continues_the_main_column() {
    let mut session = session(&["ok"]);
    session.handle_line("/demo");

    session.handle_line("Anything else?");

    let snapshot = session.controller().snapshot();
    let tail = snapshot
        .node(&NodeId::from("mock-asst-3"))
        .expect("main column tail");
    assert_eq!(tail.children_ids.len(), 1);
}

#[test]
fn structural_errors_are_printed_not_fatal() {
    let mut session = session(&["ok"]);

    let missing = session.handle_line("/reply ghost hello");
    assert_eq!(
        missing.lines,
        vec!["error: parent node 'ghost' does not exist".to_string()]
    );

    session.handle_line("root prompt");
    let collapse = session.handle_line("/collapse nowhere");
    assert_eq!(
        collapse.lines,
        vec!["error: node 'nowhere' does not exist".to_string()]
    );
    assert!(!collapse.quit);
}

#[test]
fn collapse_move_tokens_and_quit() {
    let mut session = session(&["hello", " world"]);
    session.handle_line("/demo");

    assert_eq!(
        session.handle_line("/collapse mock-asst-2").lines,
        vec!["collapsed mock-asst-2".to_string()]
    );
    assert_eq!(
        session.handle_line("/move mock-user-1 10 20").lines,
        vec!["moved mock-user-1 to (10, 20)".to_string()]
    );
    let tree = session.handle_line("/tree");
    assert!(tree.lines[0].starts_with("mock-user-1 [user] @ (10, 20)"));

    let tokens = session.handle_line("/tokens");
    assert!(tokens.lines[0].starts_with("tokens: input "));

    assert!(session.handle_line("/quit").quit);
    assert_eq!(
        session.handle_line("/bogus").lines,
        vec!["unknown command /bogus; try /help".to_string()]
    );
}

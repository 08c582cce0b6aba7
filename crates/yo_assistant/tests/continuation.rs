mod support;

use assist_provider_mock::MockStep;
use support::{chat_step, command_step, Harness, HostEvent};
use yo_assistant::prompt::continuation_query;
use yo_assistant::{Continuation, LineAction};

fn pending_make() -> MockStep {
    command_step("c1", "make", Some("Build the project."), true)
}

#[test]
fn pending_command_run_unchanged_fires_one_continuation() {
    let mut harness = Harness::new(vec![pending_make(), chat_step("t1", "Build succeeded.")]);
    harness.accept("yo build and test");

    assert_eq!(harness.accept("make"), LineAction::Execute);
    assert!(harness.session.history().last().expect("exchange").executed);
    assert!(harness.session.continuation().is_armed());

    harness.scrollback.set_text("cc -o app main.c\n");
    assert!(harness.on_prompt());

    assert_eq!(harness.provider.dispatch_count(), 2);
    assert_eq!(
        harness.request_query(1),
        continuation_query("make", "make", "cc -o app main.c\n")
    );
    assert!(harness.request_query(1).starts_with(
        "[continuation] The user executed the previous command. Here is the terminal output:"
    ));
    assert_eq!(harness.scrollback.requested(), [200]);
    assert_eq!(harness.host.messages().last(), Some(&"Build succeeded."));

    assert_eq!(harness.session.continuation(), &Continuation::Idle);
    assert!(!harness.on_prompt());
    assert_eq!(harness.provider.dispatch_count(), 2);
}

#[test]
fn edited_command_is_reported_as_edited() {
    let mut harness = Harness::new(vec![pending_make(), chat_step("t1", "Okay.")]);
    harness.accept("yo build");

    harness.accept("make -j8");
    assert!(harness.on_prompt());

    assert_eq!(
        harness.request_query(1),
        "[continuation] You suggested: make\n\
         The user edited and executed: make -j8\n\
         Here is the terminal output:\n```\n(no output)\n```"
    );
}

#[test]
fn continuation_can_chain_another_pending_step() {
    let mut harness = Harness::new(vec![
        pending_make(),
        command_step("c2", "make test", Some("Run the tests."), true),
        chat_step("t1", "All green."),
    ]);
    harness.accept("yo build and test");
    harness.accept("make");
    harness.on_prompt();

    assert_eq!(harness.host.last_prefill(), Some("make test"));
    assert_eq!(
        harness.session.continuation(),
        &Continuation::Suggested {
            command: "make test".to_string(),
            pending: true,
        }
    );

    harness.accept("make test");
    assert!(harness.on_prompt());
    assert_eq!(harness.provider.dispatch_count(), 3);
    assert_eq!(harness.session.history().len(), 3);
}

#[test]
fn final_step_does_not_continue() {
    let mut harness = Harness::new(vec![command_step("c1", "make install", Some("Install."), false)]);
    harness.accept("yo install it");

    harness.accept("make install");

    assert!(harness.session.history().last().expect("exchange").executed);
    assert!(!harness.on_prompt());
    assert_eq!(harness.provider.dispatch_count(), 1);
}

#[test]
fn empty_line_cancels_continuation() {
    let mut harness = Harness::new(vec![pending_make()]);
    harness.accept("yo build");

    assert_eq!(harness.accept(""), LineAction::Execute);

    assert_eq!(harness.session.continuation(), &Continuation::Idle);
    assert!(!harness.session.history().last().expect("exchange").executed);
    assert!(!harness.on_prompt());
}

#[test]
fn new_query_cancels_continuation() {
    let mut harness = Harness::new(vec![pending_make(), chat_step("t1", "It is a build tool.")]);
    harness.accept("yo build");
    harness.accept("make");
    assert!(harness.session.continuation().is_armed());

    harness.accept("yo what is make");

    assert_eq!(harness.request_query(1), "yo what is make");
    assert!(!harness.on_prompt());
    assert_eq!(harness.provider.dispatch_count(), 2);
}

#[test]
fn interrupt_clears_continuation() {
    let mut harness = Harness::new(vec![pending_make()]);
    harness.accept("yo build");
    harness.accept("make");

    harness.session.on_interrupt();

    assert!(!harness.on_prompt());
    assert_eq!(harness.provider.dispatch_count(), 1);
}

#[test]
fn cancelled_continuation_returns_to_idle() {
    let mut harness = Harness::new(vec![pending_make(), MockStep::Cancel]);
    harness.accept("yo build");
    harness.accept("make");
    harness.host.events.clear();

    assert!(harness.on_prompt());

    assert_eq!(
        harness.host.events,
        vec![
            HostEvent::Thinking,
            HostEvent::ThinkingCleared,
            HostEvent::Message("Cancelled".to_string()),
            HostEvent::ClearInput,
        ]
    );
    assert_eq!(harness.session.continuation(), &Continuation::Idle);
    assert_eq!(harness.session.history().len(), 1);
    assert!(!harness.on_prompt());
}

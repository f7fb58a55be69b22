use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::broadcast;

use crate::channel::{Emission, HandlerFn, LifecycleEvent, SubscriptionId};
use crate::components::{
    Component, ComponentId, ComponentOptions, EndReason, Repetitions, Status,
};
use crate::core::{Controller, ControllerConfig, Jump};
use crate::error::{LifecycleError, StateError};
use crate::events::{Event, EventKind};
use crate::sequencer::ChildSource;
use crate::subscribers::Subscribe;

type Log = Arc<Mutex<Vec<String>>>;

/// Records `"<label>:<event>"` for every lifecycle event of `component`.
fn tracked(component: Component, log: &Log) -> Component {
    LifecycleEvent::ALL
        .into_iter()
        .fold(component, |component, event| {
            let log = Arc::clone(log);
            component.on(
                event,
                HandlerFn::arc(move |e: Emission| {
                    let log = Arc::clone(&log);
                    async move {
                        log.lock().push(format!("{}:{}", e.label(), e.event()));
                        anyhow::Ok(())
                    }
                }),
            )
        })
}

fn leaf(id: &str, log: &Log) -> Component {
    tracked(Component::leaf(ComponentOptions::new().id(id)), log)
}

fn skipped(id: &str, log: &Log) -> Component {
    tracked(Component::leaf(ComponentOptions::new().id(id).skip(true)), log)
}

fn seq(id: &str, children: Vec<Component>, log: &Log) -> Component {
    tracked(Component::sequence(ComponentOptions::new().id(id), children), log)
}

fn count(log: &Log, entry: &str) -> usize {
    log.lock().iter().filter(|e| *e == entry).count()
}

fn find(ctl: &Controller, label: &str) -> ComponentId {
    ctl.lookup(label)
        .unwrap_or_else(|| panic!("{label} not materialized"))
}

fn current_label(ctl: &Controller) -> Option<String> {
    ctl.current_leaf()
        .map(|id| ctl.snapshot(id).unwrap().label.to_string())
}

fn drain(rx: &mut broadcast::Receiver<Event>) -> Vec<Event> {
    std::iter::from_fn(|| rx.try_recv().ok()).collect()
}

fn bus_count(events: &[Event], label: &str, kind: EventKind) -> usize {
    events
        .iter()
        .filter(|e| e.kind == kind && e.label.as_deref() == Some(label))
        .count()
}

#[tokio::test]
async fn test_runs_skipped_components_in_sequence() {
    let log = Log::default();
    let ctl = Controller::new(seq(
        "s",
        vec![skipped("a", &log), skipped("b", &log)],
        &log,
    ));

    ctl.run().await.unwrap();

    assert_eq!(count(&log, "a:run"), 0);
    assert_eq!(count(&log, "b:run"), 0);
    assert_eq!(count(&log, "s:run"), 1);
    assert_eq!(count(&log, "s:end"), 1);
    assert_eq!(ctl.current_leaf(), None);
    assert_eq!(ctl.status(ctl.root()).unwrap(), Status::Done);
}

#[tokio::test]
async fn test_runs_controlled_components_in_sequence() {
    let log = Log::default();
    let ctl = Controller::new(seq("s", vec![leaf("a", &log), leaf("b", &log)], &log));

    ctl.prepare(ctl.root()).await.unwrap();
    assert_eq!(count(&log, "s:prepare"), 1);
    assert_eq!(count(&log, "a:run"), 0);

    ctl.run().await.unwrap();
    assert_eq!(count(&log, "s:prepare"), 1);
    assert_eq!(count(&log, "a:run"), 1);
    assert_eq!(count(&log, "b:run"), 0);

    ctl.end(find(&ctl, "a"), "end").await.unwrap();
    assert_eq!(count(&log, "a:run"), 1);
    assert_eq!(count(&log, "b:run"), 1);
    assert_eq!(count(&log, "s:end"), 0);

    ctl.end(find(&ctl, "b"), "end").await.unwrap();
    assert_eq!(count(&log, "a:run"), 1);
    assert_eq!(count(&log, "b:run"), 1);
    assert_eq!(count(&log, "s:end"), 1);

    let s = ctl.snapshot(ctl.root()).unwrap();
    assert_eq!(s.end_reason, Some(EndReason::Completed));
    assert!(s.duration().is_some());
}

#[tokio::test]
async fn test_ends_skipped_components_without_showing_them() {
    let log = Log::default();
    let ctl = Controller::new(seq("s", vec![skipped("a", &log)], &log));
    let mut rx = ctl.subscribe();

    ctl.run().await.unwrap();
    let events = drain(&mut rx);

    assert_eq!(bus_count(&events, "a", EventKind::ComponentRunning), 1);
    assert_eq!(bus_count(&events, "a", EventKind::ComponentEnded), 1);
    assert_eq!(bus_count(&events, "a", EventKind::ComponentRendered), 0);
    assert_eq!(bus_count(&events, "a", EventKind::ComponentShown), 0);
    assert_eq!(bus_count(&events, "a", EventKind::ComponentLocked), 1);
    assert!(
        events
            .iter()
            .filter(|e| e.label.as_deref() == Some("a"))
            .all(|e| e.skipped)
    );

    assert_eq!(count(&log, "a:run"), 0);
    assert_eq!(count(&log, "a:end"), 1);
    assert_eq!(count(&log, "a:lock"), 1);

    let a = ctl.snapshot(find(&ctl, "a")).unwrap();
    assert_eq!(a.end_reason, Some(EndReason::Skipped));
    assert!(a.locked);
    assert!(a.timestamps.render.is_none());
}

#[tokio::test]
async fn test_skips_multiple_components_in_fast_succession() {
    let log = Log::default();
    let ctl = Controller::new(seq(
        "s",
        vec![skipped("a", &log), skipped("b", &log), leaf("c", &log)],
        &log,
    ));
    let mut rx = ctl.subscribe();

    ctl.run().await.unwrap();
    let events = drain(&mut rx);

    for label in ["a", "b"] {
        assert_eq!(bus_count(&events, label, EventKind::ComponentRunning), 1);
        assert_eq!(bus_count(&events, label, EventKind::ComponentEnded), 1);
        assert_eq!(bus_count(&events, label, EventKind::ComponentRendered), 0);
        assert_eq!(bus_count(&events, label, EventKind::ComponentLocked), 1);
        assert_eq!(bus_count(&events, label, EventKind::LeafChanged), 0);
    }
    assert_eq!(bus_count(&events, "c", EventKind::ComponentRunning), 1);
    assert_eq!(count(&log, "c:render"), 1);
    assert_eq!(count(&log, "c:end"), 0);
    assert_eq!(current_label(&ctl).as_deref(), Some("c"));
}

#[tokio::test]
async fn test_locks_all_previous_components() {
    let log = Log::default();
    let ctl = Controller::new(seq("s", vec![skipped("a", &log), leaf("b", &log)], &log));

    ctl.run().await.unwrap();
    assert_eq!(count(&log, "a:lock"), 1);
    assert_eq!(count(&log, "b:lock"), 0);

    ctl.end(find(&ctl, "b"), EndReason::Completed).await.unwrap();
    assert_eq!(count(&log, "b:lock"), 1);
    assert_eq!(count(&log, "s:lock"), 1);

    // locking is monotonic
    ctl.lock(find(&ctl, "b")).await.unwrap();
    assert_eq!(count(&log, "b:lock"), 1);
}

#[tokio::test]
async fn test_returns_the_current_leaf() {
    let log = Log::default();
    let ctl = Controller::new(seq(
        "s",
        vec![skipped("a", &log), leaf("b", &log), leaf("c", &log)],
        &log,
    ));
    assert_eq!(ctl.current_leaf(), None);

    ctl.run().await.unwrap();
    assert_eq!(current_label(&ctl).as_deref(), Some("b"));

    let current = ctl.current_leaf().unwrap();
    ctl.component(current).end("response").await.unwrap();
    assert_eq!(current_label(&ctl).as_deref(), Some("c"));

    // frozen at the last leaf once the tree has ended
    ctl.end(find(&ctl, "c"), "response").await.unwrap();
    assert_eq!(ctl.status(ctl.root()).unwrap(), Status::Done);
    assert_eq!(current_label(&ctl).as_deref(), Some("c"));
}

#[tokio::test]
async fn test_reruns_components_in_the_current_stack() {
    let log = Log::default();
    let ctl = Controller::new(seq(
        "s",
        vec![skipped("a", &log), leaf("b", &log), leaf("c", &log)],
        &log,
    ));

    ctl.run().await.unwrap();
    ctl.end(find(&ctl, "b"), "end").await.unwrap();
    assert_eq!(current_label(&ctl).as_deref(), Some("c"));

    ctl.jump(Jump::Rerun, ctl.root()).await.unwrap();
    assert_eq!(current_label(&ctl).as_deref(), Some("b"));

    assert_eq!(count(&log, "b:run"), 2);
    assert_eq!(count(&log, "a:lock"), 2);
    assert_eq!(count(&log, "s:prepare"), 2);
    // c was on screen when the rerun aborted it
    assert!(log.lock().contains(&"c:end".to_string()));
    let c = ctl.snapshot(find(&ctl, "c")).unwrap();
    assert_eq!(c.status, Status::Initialized);
    assert!(!c.locked);
}

#[tokio::test]
async fn test_reruns_component_from_its_reset_method() {
    let log = Log::default();
    let ctl = Controller::new(seq(
        "s",
        vec![skipped("a", &log), leaf("b", &log), leaf("c", &log)],
        &log,
    ));

    ctl.run().await.unwrap();
    ctl.end(find(&ctl, "b"), "end").await.unwrap();
    assert_eq!(current_label(&ctl).as_deref(), Some("c"));

    ctl.component(ctl.root()).reset().await.unwrap();
    assert_eq!(current_label(&ctl).as_deref(), Some("b"));
}

#[tokio::test]
async fn test_reruns_doubly_nested_sequences() {
    let log = Log::default();
    let nested = seq(
        "s_nested",
        vec![skipped("a", &log), leaf("b", &log), leaf("c", &log)],
        &log,
    );
    let ctl = Controller::new(seq("s", vec![leaf("t", &log), nested], &log));

    ctl.prepare(ctl.root()).await.unwrap();
    ctl.run().await.unwrap();
    assert_eq!(current_label(&ctl).as_deref(), Some("t"));

    ctl.end(find(&ctl, "t"), "end").await.unwrap();
    assert_eq!(current_label(&ctl).as_deref(), Some("b"));

    ctl.jump(Jump::Rerun, ctl.root()).await.unwrap();
    assert_eq!(current_label(&ctl).as_deref(), Some("t"));
    let nested = ctl.snapshot(find(&ctl, "s_nested")).unwrap();
    assert_eq!(nested.status, Status::Initialized);

    ctl.end(find(&ctl, "t"), "end").await.unwrap();
    assert_eq!(current_label(&ctl).as_deref(), Some("b"));
    assert_eq!(count(&log, "b:show"), 2);
}

#[tokio::test]
async fn test_rerun_of_inner_sequence_leaves_ancestors_untouched() {
    let log = Log::default();
    let nested = seq("inner", vec![leaf("x", &log), leaf("y", &log)], &log);
    let ctl = Controller::new(seq("outer", vec![nested, leaf("z", &log)], &log));

    ctl.run().await.unwrap();
    ctl.end(find(&ctl, "x"), "end").await.unwrap();
    assert_eq!(current_label(&ctl).as_deref(), Some("y"));

    ctl.reset(find(&ctl, "inner")).await.unwrap();
    assert_eq!(current_label(&ctl).as_deref(), Some("x"));
    assert_eq!(count(&log, "outer:prepare"), 1);
    assert_eq!(count(&log, "outer:run"), 1);
    assert_eq!(count(&log, "inner:prepare"), 2);

    // the outer sequence advances past the rerun child as usual
    ctl.end(find(&ctl, "x"), "end").await.unwrap();
    ctl.end(find(&ctl, "y"), "end").await.unwrap();
    assert_eq!(current_label(&ctl).as_deref(), Some("z"));
}

#[tokio::test]
async fn test_rerun_rejects_conflicting_branch() {
    let log = Log::default();
    let ctl = Controller::new(seq("s", vec![leaf("x", &log), leaf("y", &log)], &log));

    ctl.run().await.unwrap();
    let x = find(&ctl, "x");
    ctl.end(x, "end").await.unwrap();
    let y = find(&ctl, "y");

    let err = ctl.jump(Jump::Rerun, x).await.unwrap_err();
    assert_eq!(
        err.as_state(),
        Some(&StateError::ConflictingBranch {
            component: x,
            active: y,
        })
    );
    assert_eq!(current_label(&ctl).as_deref(), Some("y"));
}

#[tokio::test]
async fn test_jump_next_and_abort() {
    let log = Log::default();
    let ctl = Controller::new(seq("s", vec![leaf("x", &log), leaf("y", &log)], &log));
    let mut rx = ctl.subscribe();

    ctl.run().await.unwrap();
    let x = find(&ctl, "x");
    ctl.component(x).jump(Jump::Next).await.unwrap();
    assert_eq!(ctl.snapshot(x).unwrap().end_reason, Some(EndReason::Jump));
    assert_eq!(current_label(&ctl).as_deref(), Some("y"));

    let y = find(&ctl, "y");
    ctl.jump(Jump::Abort, y).await.unwrap();
    assert_eq!(ctl.snapshot(y).unwrap().end_reason, Some(EndReason::Abort));
    assert_eq!(
        ctl.snapshot(ctl.root()).unwrap().end_reason,
        Some(EndReason::Abort)
    );
    assert_eq!(count(&log, "s:end"), 1);

    let jumps: Vec<_> = drain(&mut rx)
        .into_iter()
        .filter(|e| e.kind == EventKind::JumpRequested)
        .filter_map(|e| e.reason)
        .collect();
    assert_eq!(jumps.len(), 2);
    assert_eq!(&*jumps[0], "next");
    assert_eq!(&*jumps[1], "abort");
}

#[tokio::test]
async fn test_state_machine_violations() {
    let log = Log::default();
    let ctl = Controller::new(seq("s", vec![leaf("x", &log), leaf("y", &log)], &log));
    ctl.run().await.unwrap();
    let x = find(&ctl, "x");

    let err = ctl.prepare(x).await.unwrap_err();
    assert_eq!(err.as_state(), Some(&StateError::AlreadyRunning { component: x }));
    assert_eq!(err.as_label(), "state_already_running");

    ctl.end(x, "end").await.unwrap();
    ctl.end(x, "end").await.unwrap();
    assert_eq!(count(&log, "x:end"), 1);

    let err = ctl.render(x).await.unwrap_err();
    assert_eq!(
        err.as_state(),
        Some(&StateError::NotRunning {
            component: x,
            status: Status::Done,
        })
    );

    // presentation hooks are no-ops on containers
    ctl.show(ctl.root()).await.unwrap();

    let unknown = ComponentId::from_index(99);
    assert!(matches!(
        ctl.snapshot(unknown),
        Err(StateError::UnknownComponent { .. })
    ));

    ctl.end(find(&ctl, "y"), "end").await.unwrap();
    let err = ctl.run().await.unwrap_err();
    assert_eq!(
        err.as_state(),
        Some(&StateError::AlreadyEnded {
            component: ctl.root()
        })
    );
}

#[tokio::test]
async fn test_locked_components_reject_configuration() {
    let log = Log::default();
    let ctl = Controller::new(seq("s", vec![leaf("x", &log), leaf("y", &log)], &log));
    ctl.run().await.unwrap();
    let x = find(&ctl, "x");

    ctl.configure(x, |opts| opts.title = Some("Fixation".into()))
        .unwrap();
    assert_eq!(ctl.snapshot(x).unwrap().title.as_deref(), Some("Fixation"));

    ctl.end(x, "end").await.unwrap();
    assert_eq!(
        ctl.configure(x, |opts| opts.skip = true),
        Err(StateError::Locked { component: x })
    );

    let y = find(&ctl, "y");
    ctl.component(y)
        .configure(|opts| opts.id = Some("target".into()))
        .unwrap();
    assert_eq!(ctl.lookup("target"), Some(y));
    assert_eq!(current_label(&ctl).as_deref(), Some("target"));
}

fn crash() -> anyhow::Result<()> {
    panic!("renderer crashed")
}

#[tokio::test]
async fn test_handler_failures_are_aggregated() {
    let reached = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&reached);

    let probe = Component::leaf(ComponentOptions::new().id("probe"))
        .on(
            LifecycleEvent::Run,
            HandlerFn::arc(|_e| async { Err::<(), _>(anyhow::anyhow!("stimulus missing")) }),
        )
        .on(
            LifecycleEvent::Run,
            HandlerFn::arc(|_e| async { crash() }),
        )
        .on(
            LifecycleEvent::Run,
            HandlerFn::arc(move |_e| {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    anyhow::Ok(())
                }
            }),
        );
    let ctl = Controller::new(Component::sequence(ComponentOptions::new(), vec![probe]));
    let mut rx = ctl.subscribe();

    let err = ctl.run().await.unwrap_err();
    let LifecycleError::Handler(handler) = &err else {
        panic!("expected handler error, got {err:?}");
    };
    assert_eq!(handler.len(), 2);
    assert_eq!(handler.failures()[0].message, "stimulus missing");
    assert!(handler.failures()[1].message.contains("renderer crashed"));
    assert_eq!(handler.failures()[0].event, LifecycleEvent::Run);
    assert_eq!(reached.load(Ordering::SeqCst), 1);

    // the transition still happened and propagation continued
    let probe = find(&ctl, "probe");
    assert_eq!(ctl.current_leaf(), Some(probe));
    assert!(ctl.snapshot(probe).unwrap().timestamps.show.is_some());

    let events = drain(&mut rx);
    assert_eq!(bus_count(&events, "probe", EventKind::HandlerFailed), 1);
}

#[tokio::test]
async fn test_once_handlers_fire_a_single_time() {
    let log = Log::default();
    let ctl = Controller::new(seq("s", vec![leaf("x", &log)], &log));
    ctl.prepare(ctl.root()).await.unwrap();

    let shown = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&shown);
    ctl.once(
        ctl.root(),
        LifecycleEvent::Run,
        HandlerFn::arc(move |_e| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                anyhow::Ok(())
            }
        }),
    )
    .unwrap();
    let removed = ctl
        .on(
            ctl.root(),
            LifecycleEvent::Run,
            HandlerFn::arc(|_e| async { Err::<(), _>(anyhow::anyhow!("should be removed")) }),
        )
        .unwrap();
    assert!(ctl.off(ctl.root(), removed).unwrap());

    ctl.run().await.unwrap();
    ctl.reset(ctl.root()).await.unwrap();

    assert_eq!(count(&log, "s:run"), 2);
    assert_eq!(shown.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_handlers_can_end_their_own_component() {
    let log = Log::default();
    let auto = tracked(
        Component::leaf(ComponentOptions::new().id("auto")),
        &log,
    )
    .on(
        LifecycleEvent::Show,
        HandlerFn::arc(|e: Emission| async move {
            e.handle().end(EndReason::Timeout).await?;
            anyhow::Ok(())
        }),
    );
    let ctl = Controller::new(seq("s", vec![auto, leaf("next", &log)], &log));

    ctl.run().await.unwrap();

    let auto = find(&ctl, "auto");
    assert_eq!(ctl.snapshot(auto).unwrap().end_reason, Some(EndReason::Timeout));
    assert_eq!(current_label(&ctl).as_deref(), Some("next"));
    assert_eq!(count(&log, "next:show"), 1);
}

#[tokio::test]
async fn test_run_handler_ending_leaf_suppresses_presentation() {
    let log = Log::default();
    let quick = tracked(Component::leaf(ComponentOptions::new().id("quick")), &log).on(
        LifecycleEvent::Run,
        HandlerFn::arc(|e: Emission| async move {
            e.controller().end(e.component(), "response").await?;
            anyhow::Ok(())
        }),
    );
    let ctl = Controller::new(seq("s", vec![quick], &log));

    ctl.run().await.unwrap();

    assert_eq!(count(&log, "quick:run"), 1);
    assert_eq!(count(&log, "quick:render"), 0);
    assert_eq!(count(&log, "quick:show"), 0);
    assert_eq!(count(&log, "s:end"), 1);
}

#[tokio::test]
async fn test_loop_repeats_children() {
    let log = Log::default();
    let body = vec![leaf("x", &log), skipped("pause", &log)];
    let ctl = Controller::new(tracked(
        Component::looped(ComponentOptions::new().id("l"), Repetitions::Times(3), body),
        &log,
    ));
    let mut rx = ctl.subscribe();

    ctl.run().await.unwrap();
    for pass in 0..3 {
        assert_eq!(ctl.snapshot(ctl.root()).unwrap().iteration, pass);
        let x = ctl.current_leaf().unwrap();
        ctl.end(x, "response").await.unwrap();
    }

    assert_eq!(count(&log, "x:run"), 3);
    assert_eq!(count(&log, "pause:end"), 3);
    assert_eq!(count(&log, "l:end"), 1);

    let l = ctl.snapshot(ctl.root()).unwrap();
    assert_eq!(l.status, Status::Done);
    assert_eq!(l.children.len(), 2);
    assert_eq!(l.iteration, 2);

    let events = drain(&mut rx);
    assert_eq!(bus_count(&events, "x", EventKind::ComponentReset), 2);
}

#[tokio::test]
async fn test_unbounded_loop_runs_until_ended() {
    let log = Log::default();
    let ctl = Controller::new(tracked(
        Component::looped(
            ComponentOptions::new().id("l"),
            Repetitions::Unbounded,
            vec![leaf("x", &log)],
        ),
        &log,
    ));

    ctl.run().await.unwrap();
    for _ in 0..5 {
        ctl.end(ctl.current_leaf().unwrap(), "response").await.unwrap();
    }
    assert_eq!(count(&log, "x:run"), 6);
    assert_eq!(ctl.status(ctl.root()).unwrap(), Status::Running);

    ctl.jump(Jump::Next, ctl.root()).await.unwrap();
    assert_eq!(count(&log, "l:end"), 1);
    let x = find(&ctl, "x");
    assert_eq!(ctl.snapshot(x).unwrap().end_reason, Some(EndReason::Abort));
}

#[tokio::test]
async fn test_unbounded_loop_of_skipped_children_ends() {
    let log = Log::default();
    let ctl = Controller::new(tracked(
        Component::looped(
            ComponentOptions::new().id("l"),
            Repetitions::Unbounded,
            vec![skipped("a", &log)],
        ),
        &log,
    ));

    ctl.run().await.unwrap();
    assert_eq!(count(&log, "l:end"), 1);
    assert_eq!(count(&log, "a:end"), 1);
}

#[tokio::test]
async fn test_generated_children_are_cached_on_replay() {
    let produced = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&produced);
    let source = ChildSource::from_fn(move |index| {
        counter.fetch_add(1, Ordering::SeqCst);
        (index < 2).then(|| Component::leaf(ComponentOptions::new().id(format!("g{index}"))))
    });
    let ctl = Controller::new(Component::sequence(ComponentOptions::new().id("s"), source));

    ctl.run().await.unwrap();
    ctl.end(find(&ctl, "g0"), "end").await.unwrap();
    ctl.end(find(&ctl, "g1"), "end").await.unwrap();
    assert_eq!(produced.load(Ordering::SeqCst), 3);

    ctl.reset(ctl.root()).await.unwrap();
    assert_eq!(current_label(&ctl).as_deref(), Some("g0"));
    ctl.end(find(&ctl, "g0"), "end").await.unwrap();
    ctl.end(find(&ctl, "g1"), "end").await.unwrap();

    assert_eq!(produced.load(Ordering::SeqCst), 3);
    assert_eq!(ctl.snapshot(ctl.root()).unwrap().children.len(), 2);
    assert_eq!(ctl.status(ctl.root()).unwrap(), Status::Done);
}

#[tokio::test]
async fn test_skipped_container_does_not_descend() {
    let log = Log::default();
    let hidden = tracked(
        Component::sequence(
            ComponentOptions::new().id("hidden").skip(true),
            vec![leaf("inner", &log)],
        ),
        &log,
    );
    let ctl = Controller::new(seq("s", vec![hidden, leaf("after", &log)], &log));

    ctl.run().await.unwrap();

    assert_eq!(ctl.lookup("inner"), None);
    assert_eq!(count(&log, "hidden:run"), 0);
    assert_eq!(count(&log, "hidden:end"), 1);
    assert_eq!(current_label(&ctl).as_deref(), Some("after"));
}

#[tokio::test]
async fn test_depth_limit_is_enforced() {
    let deep = Component::sequence(
        ComponentOptions::new(),
        vec![Component::sequence(
            ComponentOptions::new(),
            vec![Component::leaf(ComponentOptions::new())],
        )],
    );
    let ctl = Controller::builder(deep)
        .with_config(ControllerConfig {
            max_depth: 2,
            ..ControllerConfig::default()
        })
        .build();

    let err = ctl.run().await.unwrap_err();
    assert_eq!(
        err.as_state(),
        Some(&StateError::DepthExceeded { depth: 2, max: 2 })
    );
}

#[tokio::test]
async fn test_long_skip_chain_advances_iteratively() {
    let mut children: Vec<Component> = (0..10_000)
        .map(|i| Component::leaf(ComponentOptions::new().id(format!("skip-{i}")).skip(true)))
        .collect();
    children.push(Component::leaf(ComponentOptions::new().id("last")));
    let ctl = Controller::new(Component::sequence(ComponentOptions::new().id("s"), children));

    ctl.run().await.unwrap();

    assert_eq!(current_label(&ctl).as_deref(), Some("last"));
    assert_eq!(ctl.snapshot(ctl.root()).unwrap().children.len(), 10_001);
    let skipped = ctl.snapshot(find(&ctl, "skip-9999")).unwrap();
    assert_eq!(skipped.end_reason, Some(EndReason::Skipped));
    assert!(skipped.locked);
}

#[tokio::test]
async fn test_long_loop_of_self_ending_trials() {
    let shown = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&shown);
    let trial = Component::leaf(ComponentOptions::new().id("trial")).on(
        LifecycleEvent::Show,
        HandlerFn::arc(move |e: Emission| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                e.handle().end(EndReason::Timeout).await?;
                anyhow::Ok(())
            }
        }),
    );
    let ctl = Controller::new(Component::looped(
        ComponentOptions::new().id("block"),
        Repetitions::Times(10_000),
        vec![trial],
    ));

    ctl.run().await.unwrap();

    assert_eq!(shown.load(Ordering::SeqCst), 10_000);
    let block = ctl.snapshot(ctl.root()).unwrap();
    assert_eq!(block.status, Status::Done);
    assert_eq!(block.iteration, 9_999);
    assert_eq!(block.end_reason, Some(EndReason::Completed));
}

#[tokio::test]
async fn test_end_handler_rerun_keeps_a_single_running_leaf() {
    let log = Log::default();
    let first = leaf("a", &log).once(
        LifecycleEvent::End,
        HandlerFn::arc(|e: Emission| async move {
            let ctl = e.controller().clone();
            ctl.jump(Jump::Rerun, ctl.root()).await?;
            anyhow::Ok(())
        }),
    );
    let ctl = Controller::new(seq("s", vec![first, leaf("b", &log)], &log));

    ctl.run().await.unwrap();
    let a = find(&ctl, "a");
    ctl.end(a, "response").await.unwrap();

    let snap = ctl.snapshot(a).unwrap();
    assert_eq!(snap.status, Status::Running);
    assert!(!snap.locked);
    assert_eq!(ctl.current_leaf(), Some(a));
    assert_eq!(ctl.lookup("b"), None);
    assert_eq!(count(&log, "b:run"), 0);

    // the rerun leaf ends normally afterwards
    ctl.end(a, "response").await.unwrap();
    assert_eq!(current_label(&ctl).as_deref(), Some("b"));
    assert_eq!(ctl.status(a).unwrap(), Status::Done);
}

#[tokio::test]
async fn test_subscription_changes_apply_to_later_emissions() {
    let log = Log::default();
    let ctl = Controller::new(Component::leaf(ComponentOptions::new().id("x")));
    let root = ctl.root();
    let second_id: Arc<Mutex<Option<SubscriptionId>>> = Arc::default();

    let (first_log, slot) = (Arc::clone(&log), Arc::clone(&second_id));
    ctl.on(
        root,
        LifecycleEvent::Show,
        HandlerFn::arc(move |e: Emission| {
            let (log, slot) = (Arc::clone(&first_log), Arc::clone(&slot));
            async move {
                log.lock().push("first".to_string());
                let late_log = Arc::clone(&log);
                e.handle().on(
                    LifecycleEvent::Show,
                    HandlerFn::arc(move |_e| {
                        let log = Arc::clone(&late_log);
                        async move {
                            log.lock().push("late".to_string());
                            anyhow::Ok(())
                        }
                    }),
                )?;
                let second = *slot.lock();
                if let Some(second) = second {
                    e.handle().off(second)?;
                }
                anyhow::Ok(())
            }
        }),
    )
    .unwrap();

    let second_log = Arc::clone(&log);
    let second = ctl
        .on(
            root,
            LifecycleEvent::Show,
            HandlerFn::arc(move |_e| {
                let log = Arc::clone(&second_log);
                async move {
                    log.lock().push("second".to_string());
                    anyhow::Ok(())
                }
            }),
        )
        .unwrap();
    *second_id.lock() = Some(second);

    ctl.run().await.unwrap();
    assert_eq!(*log.lock(), vec!["first", "second"]);

    ctl.reset(root).await.unwrap();
    assert_eq!(*log.lock(), vec!["first", "second", "first", "late"]);
}

#[tokio::test]
async fn test_handlers_run_one_after_another() {
    let log = Log::default();
    let (slow_log, fast_log) = (Arc::clone(&log), Arc::clone(&log));
    let x = Component::leaf(ComponentOptions::new().id("x"))
        .on(
            LifecycleEvent::Show,
            HandlerFn::arc(move |_e| {
                let log = Arc::clone(&slow_log);
                async move {
                    log.lock().push("slow:start".to_string());
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    log.lock().push("slow:done".to_string());
                    anyhow::Ok(())
                }
            }),
        )
        .on(
            LifecycleEvent::Show,
            HandlerFn::arc(move |_e| {
                let log = Arc::clone(&fast_log);
                async move {
                    log.lock().push("fast:start".to_string());
                    anyhow::Ok(())
                }
            }),
        );
    let ctl = Controller::new(x);

    ctl.run().await.unwrap();

    assert_eq!(*log.lock(), vec!["slow:start", "slow:done", "fast:start"]);
}

#[derive(Default)]
struct Recorder {
    kinds: Mutex<Vec<EventKind>>,
}

#[async_trait]
impl Subscribe for Recorder {
    async fn on_event(&self, event: &Event) {
        self.kinds.lock().push(event.kind);
    }

    fn name(&self) -> &'static str {
        "recorder"
    }
}

#[tokio::test]
async fn test_subscribers_observe_the_tree() {
    let log = Log::default();
    let recorder = Arc::new(Recorder::default());
    let ctl = Controller::builder(seq("s", vec![leaf("x", &log)], &log))
        .with_subscribers(vec![recorder.clone() as Arc<dyn Subscribe>])
        .build();
    assert_eq!(ctl.subscriber_count(), 1);

    ctl.run().await.unwrap();
    ctl.end(find(&ctl, "x"), "end").await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let kinds = recorder.kinds.lock().clone();
    assert_eq!(kinds.first(), Some(&EventKind::ComponentPrepared));
    assert!(kinds.contains(&EventKind::LeafChanged));
    assert_eq!(
        kinds
            .iter()
            .filter(|k| **k == EventKind::ComponentEnded)
            .count(),
        2
    );
}

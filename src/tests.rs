/// End-to-end scenarios across states, families, sequences and composition
use crate::{
    Comparer, Error, Evaluation, LoadStatus, Runtime, State, StateOptions, Subscribable,
    validate_states,
};
use futures::channel::oneshot;
use futures::executor::block_on;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

fn counter() -> (Arc<AtomicUsize>, impl Fn() + Send + Sync + 'static) {
    let count = Arc::new(AtomicUsize::new(0));
    let bump = {
        let count = count.clone();
        move || {
            count.fetch_add(1, Ordering::Relaxed);
        }
    };
    (count, bump)
}

#[test]
fn counter_updates_and_resets() {
    let runtime = Runtime::new();
    let count = runtime.state(0);

    for _ in 0..3 {
        count.update(|n| n + 1).unwrap();
    }
    assert_eq!(count.current().unwrap(), 3);

    count.reset();
    assert_eq!(count.current().unwrap(), 0);
}

#[test]
fn family_members_keep_their_own_values() {
    let runtime = Runtime::new();
    let numbers = runtime.family(|_: &[u32]| Ok(1));

    numbers.family(&[0]).set(2).unwrap();
    numbers.family(&[1000]).set(4).unwrap();

    assert_eq!(numbers.family(&[0]).current().unwrap(), 2);
    assert_eq!(numbers.family(&[1000]).current().unwrap(), 4);
    assert_eq!(numbers.family(&[2]).current().unwrap(), 1);
}

#[test]
fn dependent_follows_source() {
    let runtime = Runtime::new();
    let count = runtime.state(1);
    let (evaluations, bump) = counter();
    let double = {
        let count = count.clone();
        runtime.computed(move || {
            bump();
            Ok(count.current()? * 2)
        })
    };

    assert_eq!(double.current().unwrap(), 2);
    assert_eq!(double.info().unwrap().dependencies, 1);

    count.set(5).unwrap();
    assert!(double.needs_evaluation());
    assert_eq!(double.current().unwrap(), 10);
    assert_eq!(double.current().unwrap(), 10);
    assert_eq!(evaluations.load(Ordering::Relaxed), 2);
}

#[test]
fn cascade_runs_through_chains() {
    let runtime = Runtime::new();
    let base = runtime.state(1);
    let middle = {
        let base = base.clone();
        runtime.computed(move || Ok(base.current()? + 1))
    };
    let top = {
        let middle = middle.clone();
        runtime.computed(move || Ok(middle.current()? * 10))
    };

    assert_eq!(top.current().unwrap(), 20);
    base.set(4).unwrap();
    assert!(middle.needs_evaluation());
    assert!(top.needs_evaluation());
    assert_eq!(top.current().unwrap(), 50);
}

#[test]
fn explicit_write_shadows_dependency_changes() {
    cov_mark::check!(cascade_suppressed_by_explicit_set);
    let runtime = Runtime::new();
    let count = runtime.state(1);
    let double = {
        let count = count.clone();
        runtime.computed(move || Ok(count.current()? * 2))
    };

    assert_eq!(double.current().unwrap(), 2);
    double.set(100).unwrap();
    count.set(7).unwrap();
    assert_eq!(double.current().unwrap(), 100);

    // A reset clears the shadow and the dependency is read again.
    double.reset();
    assert_eq!(double.current().unwrap(), 14);
    count.set(8).unwrap();
    assert_eq!(double.current().unwrap(), 16);
}

#[test]
fn failing_evaluator_runs_once() {
    let runtime = Runtime::new();
    let (evaluations, bump) = counter();
    let broken = runtime.computed(move || -> crate::Result<u8> {
        bump();
        Err(Error::msg("no data"))
    });

    for _ in 0..3 {
        let error = broken.get().unwrap_err();
        assert_eq!(error.to_string(), "no data");
    }
    assert_eq!(evaluations.load(Ordering::Relaxed), 1);
}

#[test]
fn equal_writes_do_not_notify() {
    let runtime = Runtime::new();
    let name = runtime.state("ada".to_string());
    let (notifications, bump) = counter();
    let _sub = name.subscribe(bump);

    assert!(!name.set("ada".to_string()).unwrap());
    assert!(name.set("grace".to_string()).unwrap());
    assert!(!name.set("grace".to_string()).unwrap());
    assert_eq!(notifications.load(Ordering::Relaxed), 1);
}

#[test]
fn custom_comparer_gates_writes() {
    #[derive(Clone, PartialEq, Debug)]
    struct Stamp {
        millis: u64,
        source: &'static str,
    }

    let runtime = Runtime::new();
    let stamp = runtime
        .builder(StateOptions::new().comparer(Comparer::by_key(|s: &Stamp| s.millis)))
        .state(Stamp {
            millis: 10,
            source: "clock",
        });

    let same_instant = Stamp {
        millis: 10,
        source: "ntp",
    };
    assert!(!stamp.set(same_instant).unwrap());
    assert_eq!(stamp.current().unwrap().source, "clock");
}

#[test]
fn write_inside_evaluator_is_rejected() {
    let runtime = Runtime::new();
    let target = runtime.state(0);
    let seen = Arc::new(Mutex::new(None));
    let writer = {
        let target = target.clone();
        let seen = seen.clone();
        runtime.computed(move || {
            *seen.lock() = Some(target.set(1));
            Ok(())
        })
    };

    writer.current().unwrap();
    assert!(matches!(
        seen.lock().take(),
        Some(Err(Error::SetDuringEvaluation))
    ));
    assert_eq!(target.current().unwrap(), 0);
}

#[test]
fn deferred_value_transitions_once() {
    let runtime = Runtime::new();
    let (sender, receiver) = oneshot::channel::<u32>();
    let receiver = Arc::new(Mutex::new(Some(receiver)));
    let remote = runtime.computed_with(move || {
        let receiver = receiver.lock().take();
        Ok(Evaluation::deferred(async move {
            match receiver {
                Some(receiver) => receiver.await.map_err(|_| Error::Cancelled),
                None => Err(Error::Empty),
            }
        }))
    });

    let value = remote.get().unwrap();
    let loadable = value.loadable().unwrap().clone();
    assert_eq!(loadable.status(), LoadStatus::Loading);
    assert!(matches!(remote.current(), Err(Error::Pending)));

    let (done, bump) = counter();
    let _sub = loadable.subscribe(bump);

    sender.send(12).unwrap();
    assert_eq!(block_on(value.resolve()).unwrap(), 12);
    assert_eq!(loadable.status(), LoadStatus::HasValue);
    assert_eq!(loadable.value(), Some(12));
    assert_eq!(done.load(Ordering::Relaxed), 1);
    assert_eq!(remote.current().unwrap(), 12);
}

#[test]
fn rejected_deferred_value_reports_error() {
    let runtime = Runtime::new();
    let remote =
        runtime.computed_with(|| Ok(Evaluation::<u8>::deferred(async { Err(Error::msg("timeout")) })));

    let value = remote.get().unwrap();
    assert!(block_on(value.clone().resolve()).is_err());
    let loadable = value.loadable().unwrap();
    assert_eq!(loadable.status(), LoadStatus::Error);
    assert_eq!(loadable.error().unwrap().to_string(), "timeout");
}

#[test]
fn generator_steps_and_exhausts() {
    let runtime = Runtime::new();
    let steps = runtime.computed_with(|| Ok(Evaluation::iter(vec!["a", "b"])));

    assert_eq!(steps.current().unwrap(), "a");
    assert!(block_on(steps.next(()).unwrap().into_future()).unwrap());
    assert_eq!(steps.current().unwrap(), "b");
    assert!(!block_on(steps.next(()).unwrap().into_future()).unwrap());
    assert_eq!(steps.current().unwrap(), "b");
}

#[test]
fn step_notifies_dependents() {
    let runtime = Runtime::new();
    let steps = runtime.computed_with(|| Ok(Evaluation::iter(1..=3)));
    let label = steps.map(|n| format!("step {n}"));

    assert_eq!(label.current().unwrap(), "step 1");
    assert_eq!(steps.next(()).unwrap().now(), Some(true));
    assert_eq!(label.current().unwrap(), "step 2");
}

#[test]
fn action_with_typed_input() {
    let runtime = Runtime::new();
    let greeting = runtime
        .builder(StateOptions::new().default_value(String::new()))
        .computed_with(|| Ok(Evaluation::action(|name: &'static str| Ok(format!("hi {name}")))));

    assert_eq!(greeting.current().unwrap(), "");
    assert_eq!(greeting.next("bob").unwrap().now(), Some(true));
    assert_eq!(greeting.current().unwrap(), "hi bob");
}

#[test]
fn stream_drains_to_last_and_cancels() {
    let runtime = Runtime::new();
    let ticks =
        runtime.computed_with(|| Ok(Evaluation::stream(futures::stream::iter([1u8, 2, 3, 4]))));
    assert_eq!(block_on(ticks.last().unwrap()).unwrap(), 4);

    ticks.reset();
    let drain = ticks.last().unwrap();
    drain.token().cancel();
    assert!(matches!(block_on(drain), Err(Error::Cancelled)));
}

#[test]
fn stream_finishing_without_items_uses_default() {
    let runtime = Runtime::new();
    let empty = runtime
        .builder(StateOptions::new().default_value(-1))
        .computed_with(|| Ok(Evaluation::stream(futures::stream::empty::<i32>())));

    let value = empty.get().unwrap();
    assert_eq!(block_on(value.resolve()).unwrap(), -1);
    assert!(!block_on(empty.next(()).unwrap().into_future()).unwrap());
}

#[test]
fn watch_and_changed() {
    let runtime = Runtime::new();
    let temperature = runtime.state(20);
    let readings = runtime.state(Vec::<i32>::new());

    let history = readings.default_state().clone();
    let source = temperature.default_state().clone();
    readings.watch(temperature.default_state(), move |_| {
        let mut seen = history.current().unwrap_or_default();
        seen.push(source.current().unwrap_or_default());
        seen
    });

    let next_change = readings.changed();
    temperature.set(21).unwrap();
    block_on(next_change);
    temperature.set(23).unwrap();
    assert_eq!(readings.current().unwrap(), vec![21, 23]);
}

#[test]
fn subscriptions_end_when_dropped() {
    let runtime = Runtime::new();
    let state = runtime.state(0);
    let (hits, bump) = counter();
    let subscription = state.subscribe_listener(Arc::new(move |_: &()| bump()));

    state.set(1).unwrap();
    drop(subscription);
    state.set(2).unwrap();
    assert_eq!(hits.load(Ordering::Relaxed), 1);
}

#[test]
fn composition_tracks_every_source() {
    let runtime = Runtime::new();
    let first = runtime.state("Ada".to_string());
    let last = runtime.state("Lovelace".to_string());
    let full = runtime
        .from_with((first.clone(), last.clone()), |(first, last)| {
            format!("{first} {last}")
        })
        .unwrap();

    assert_eq!(full.current().unwrap(), "Ada Lovelace");
    last.set("Byron".to_string()).unwrap();
    assert_eq!(full.current().unwrap(), "Ada Byron");
    assert_eq!(full.info().unwrap().dependencies, 2);
}

#[test]
fn validate_states_mirrors_shapes() {
    let runtime = Runtime::new();
    let a: State<i32> = runtime.state(1).default_state().clone();
    let list = vec![a.clone(), runtime.state(2).default_state().clone()];

    assert!(validate_states::<i32, ()>(&a).valid);
    let many = validate_states::<i32, ()>(&list);
    assert!(many.valid && many.multiple);
    assert!(!validate_states::<i32, ()>(&42).valid);
    assert!(!validate_states::<String, ()>(&a).valid);
}

#[test]
fn dropping_dependent_unsubscribes_from_source() {
    let runtime = Runtime::new();
    let source = runtime.state(1);
    let dependent = {
        let source = source.clone();
        runtime.computed(move || source.current())
    };
    dependent.current().unwrap();
    assert_eq!(source.subscriber_count(), 1);

    drop(dependent);
    assert_eq!(source.subscriber_count(), 0);
    assert_eq!(runtime.node_count(), 1);
}

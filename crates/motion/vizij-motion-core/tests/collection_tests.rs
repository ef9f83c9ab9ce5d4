use vizij_motion_core::{
    shared, ManualTempo, MotionDirection, MotionEvent, MotionGroup, MotionSequence, MotionState,
    MotionUnit, Moveable, PropertyChannel, ReversingMode, Shared, TempoDriver, TempoSubscription,
};

const DT: f64 = 0.125;

fn approx(a: f64, b: f64, eps: f64) {
    assert!((a - b).abs() <= eps, "left={a} right={b} eps={eps}");
}

fn tween(target: &Shared<f64>, end: f64, duration: f64) -> MotionUnit {
    let ch = PropertyChannel::bind(target, "value", 0.0, end).unwrap();
    MotionUnit::new(vec![ch], duration)
}

fn targets(n: usize) -> Vec<Shared<f64>> {
    (0..n).map(|_| shared(0.0_f64)).collect()
}

/// Frames `i * DT` from `from` until stopped or `to`; returns the collected events.
fn drive(m: &mut dyn Moveable, from: usize, to: usize) -> Vec<MotionEvent> {
    let mut events = Vec::new();
    for i in from..=to {
        m.update(i as f64 * DT);
        events.extend(m.take_events());
        if m.state() == MotionState::Stopped {
            break;
        }
    }
    events
}

fn steps_advanced(events: &[MotionEvent]) -> Vec<usize> {
    events
        .iter()
        .filter_map(|e| match e {
            MotionEvent::StepAdvanced { step } => Some(*step),
            _ => None,
        })
        .collect()
}

/// it should report the mean of member progress and finish after the slowest member
#[test]
fn group_progress_is_member_mean() {
    let t = targets(2);
    let mut g = MotionGroup::new()
        .with_member(tween(&t[0], 10.0, 1.0))
        .with_member(tween(&t[1], 10.0, 2.0));
    g.start();
    assert_eq!(g.member(0).unwrap().tempo(), TempoSubscription::Managed);

    g.update(0.0);
    g.update(1.0);
    approx(g.total_progress(), 0.75, 1e-12);
    assert_eq!(g.member(0).unwrap().state(), MotionState::Stopped);
    assert_eq!(g.state(), MotionState::Moving);

    g.update(2.0);
    assert_eq!(g.state(), MotionState::Stopped);
    assert_eq!(g.total_progress(), 1.0);
    assert_eq!(*t[0].borrow(), 10.0);
    assert_eq!(*t[1].borrow(), 10.0);
    assert!(g.take_events().contains(&MotionEvent::Completed));
}

/// it should let reversing members turn around individually, then reverse the group
#[test]
fn reversing_group_flips_after_all_halves() {
    let t = targets(2);
    let mut g = MotionGroup::new()
        .reversing(true)
        .with_member(tween(&t[0], 10.0, 1.0))
        .with_member(tween(&t[1], 10.0, 2.0));
    assert!(g.member(0).unwrap().is_reversing());
    g.start();

    let events = drive(&mut g, 0, 8);
    assert!(!events.contains(&MotionEvent::Reversed));
    assert_eq!(g.member(0).unwrap().direction(), MotionDirection::Reverse);

    let events = drive(&mut g, 9, 16);
    assert!(events.contains(&MotionEvent::Reversed));
    assert_eq!(g.direction(), MotionDirection::Reverse);

    drive(&mut g, 17, 100);
    assert_eq!(g.state(), MotionState::Stopped);
    assert_eq!(*t[0].borrow(), 0.0);
    assert_eq!(*t[1].borrow(), 0.0);
}

/// it should hold members at their end until all finish, then reverse them together
#[test]
fn synced_group_reverses_together() {
    let t = targets(2);
    let mut g = MotionGroup::new()
        .with_member(tween(&t[0], 10.0, 1.0))
        .with_member(tween(&t[1], 10.0, 2.0))
        .reversing(true)
        .sync_when_reversing(true);
    assert!(!g.member(0).unwrap().is_reversing());
    g.start();

    drive(&mut g, 0, 12);
    // The short member waits at its end.
    assert_eq!(*t[0].borrow(), 10.0);
    assert_eq!(g.member(0).unwrap().state(), MotionState::Stopped);
    approx(g.total_progress(), 0.5 * (1.0 + 0.75) / 2.0, 1e-12);

    drive(&mut g, 13, 18);
    for i in 0..2 {
        let m = g.member(i).unwrap();
        assert_eq!(m.direction(), MotionDirection::Reverse);
        assert_eq!(m.state(), MotionState::Moving);
        assert!(*t[i].borrow() < 10.0);
    }
    assert!(g.total_progress() > 0.5);

    drive(&mut g, 19, 100);
    assert_eq!(g.state(), MotionState::Stopped);
    assert_eq!(g.total_progress(), 1.0);
    assert_eq!(*t[0].borrow(), 0.0);
    assert_eq!(*t[1].borrow(), 0.0);
}

/// it should forward pause and resume to every member without jumps
#[test]
fn group_pause_resume_forwards_to_members() {
    let t = targets(2);
    let mut g = MotionGroup::new()
        .with_member(tween(&t[0], 10.0, 1.0))
        .with_member(tween(&t[1], 20.0, 1.0));
    g.start();
    g.update(0.0);
    g.update(0.5);
    g.pause();
    assert_eq!(g.member(1).unwrap().state(), MotionState::Paused);
    g.update(3.0);
    g.resume();
    g.update(9.0);
    approx(*t[0].borrow(), 5.0, 1e-12);
    approx(*t[1].borrow(), 10.0, 1e-12);
    g.update(9.5);
    assert_eq!(g.state(), MotionState::Stopped);
}

/// it should repeat a group and restart its members each cycle
#[test]
fn group_repeats_members() {
    let t = targets(1);
    let mut g = MotionGroup::new()
        .repeating(2)
        .with_member(tween(&t[0], 10.0, 1.0));
    g.start();
    let events = drive(&mut g, 0, 100);
    let repeats = events
        .iter()
        .filter(|e| matches!(e, MotionEvent::Repeated { .. }))
        .count();
    assert_eq!(repeats, 2);
    assert_eq!(g.cycles_completed(), 3);
    assert_eq!(*t[0].borrow(), 10.0);
}

fn chain(t: &[Shared<f64>]) -> MotionSequence {
    let mut seq = MotionSequence::new();
    for target in t {
        seq.add(Box::new(tween(target, 10.0, 1.0)));
    }
    seq
}

/// it should reverse the last step first while earlier steps stay paused, then unwind
#[test]
fn contiguous_sequence_round_trip() {
    let t = targets(3);
    let mut seq = chain(&t)
        .reversing(true)
        .with_reversing_mode(ReversingMode::Contiguous);
    for i in 0..3 {
        assert!(seq.step(i).unwrap().is_reversing());
    }
    seq.start();

    // t = 3.5: the last step is on its way back.
    drive(&mut seq, 0, 28);
    assert_eq!(seq.current_step(), 2);
    assert_eq!(seq.direction(), MotionDirection::Reverse);
    assert_eq!(seq.step(2).unwrap().direction(), MotionDirection::Reverse);
    approx(*t[2].borrow(), 5.0, 1e-12);
    for i in 0..2 {
        assert_eq!(seq.step(i).unwrap().state(), MotionState::Paused);
        assert_eq!(*t[i].borrow(), 10.0);
    }

    // t = 4.5: the middle step resumed its reverse half where it left off.
    drive(&mut seq, 29, 36);
    assert_eq!(seq.current_step(), 1);
    approx(*t[1].borrow(), 5.0, 1e-12);
    assert_eq!(*t[2].borrow(), 0.0);
    assert_eq!(seq.step(0).unwrap().state(), MotionState::Paused);

    drive(&mut seq, 37, 100);
    assert_eq!(seq.state(), MotionState::Stopped);
    assert_eq!(seq.total_progress(), 1.0);
    for target in &t {
        assert_eq!(*target.borrow(), 0.0);
    }
}

/// it should replay earlier steps forward while walking the index back
#[test]
fn sequential_sequence_walks_back() {
    let t = targets(3);
    let mut seq = chain(&t).reversing(true);
    assert_eq!(seq.reversing_mode(), ReversingMode::Sequential);
    for i in 0..3 {
        assert!(!seq.step(i).unwrap().is_reversing());
    }
    seq.start();
    let mut events = seq.take_events();
    events.extend(drive(&mut seq, 0, 100));

    assert_eq!(seq.state(), MotionState::Stopped);
    assert_eq!(steps_advanced(&events), vec![0, 1, 2, 1, 0]);
    for target in &t {
        assert_eq!(*target.borrow(), 10.0);
    }
    for i in 0..3 {
        assert_eq!(seq.step(i).unwrap().direction(), MotionDirection::Forward);
    }
    assert_eq!(seq.total_progress(), 1.0);
}

/// it should run steps one after another without reversing
#[test]
fn plain_sequence_hands_off_on_the_same_frame() {
    let t = targets(2);
    let mut seq = chain(&t);
    seq.start();
    seq.update(0.0);
    seq.update(1.0);
    assert_eq!(seq.current_step(), 1);
    assert_eq!(*t[0].borrow(), 10.0);
    approx(seq.total_progress(), 0.5, 1e-12);
    seq.update(1.5);
    approx(*t[1].borrow(), 5.0, 1e-12);
    seq.update(2.0);
    assert_eq!(seq.state(), MotionState::Stopped);
}

/// it should cascade contiguous reversal into a nested sequence
#[test]
fn nested_contiguous_cascade() {
    let t = targets(3);
    let inner = MotionSequence::new()
        .with_step(tween(&t[1], 10.0, 1.0))
        .with_step(tween(&t[2], 10.0, 1.0));
    let mut outer = MotionSequence::new()
        .with_step(tween(&t[0], 10.0, 1.0))
        .with_step(inner)
        .with_reversing_mode(ReversingMode::Contiguous)
        .reversing(true);
    assert!(outer.step(1).unwrap().is_reversing());
    outer.start();

    // t = 3.5: the innermost last step reverses, everything before it is held.
    drive(&mut outer, 0, 28);
    assert_eq!(outer.direction(), MotionDirection::Reverse);
    assert_eq!(outer.step(0).unwrap().state(), MotionState::Paused);
    approx(*t[2].borrow(), 5.0, 1e-12);
    assert_eq!(*t[0].borrow(), 10.0);
    assert_eq!(*t[1].borrow(), 10.0);

    drive(&mut outer, 29, 100);
    assert_eq!(outer.state(), MotionState::Stopped);
    for target in &t {
        assert_eq!(*target.borrow(), 0.0);
    }
}

/// it should play a finished sequence backward step by step
#[test]
fn sequence_begin_reverse_plays_back() {
    let t = targets(2);
    let mut seq = chain(&t);
    seq.start();
    drive(&mut seq, 0, 100);
    assert_eq!(*t[1].borrow(), 10.0);

    seq.begin_reverse();
    let events = drive(&mut seq, 200, 300);
    assert_eq!(seq.state(), MotionState::Stopped);
    assert_eq!(steps_advanced(&events), vec![1, 0]);
    assert_eq!(*t[0].borrow(), 0.0);
    assert_eq!(*t[1].borrow(), 0.0);
}

/// it should only drive subscribed moveables and release them once complete
#[test]
fn tempo_driver_beats_subscribed_moveables() {
    let t = targets(2);
    let mut driver = TempoDriver::new(ManualTempo::new(0.0));
    let unit = driver.attach(tween(&t[0], 10.0, 1.0));
    let seq = driver.attach(chain(&t[1..]));
    assert_eq!(driver.len(), 2);
    assert_eq!(driver.active_count(), 0);

    driver.get_mut(unit).unwrap().start();
    assert_eq!(driver.active_count(), 1);
    for _ in 0..4 {
        driver.advance(0.25);
    }
    approx(*t[0].borrow(), 7.5, 1e-12);
    assert_eq!(*t[1].borrow(), 0.0);

    driver.get_mut(seq).unwrap().start();
    for _ in 0..8 {
        driver.advance(0.25);
    }
    assert_eq!(*t[0].borrow(), 10.0);
    assert_eq!(*t[1].borrow(), 10.0);
    assert_eq!(driver.active_count(), 0);
    let released = driver.get(unit).unwrap();
    assert_eq!(released.tempo(), TempoSubscription::Detached);

    let detached = driver.detach(seq).unwrap();
    assert_eq!(detached.state(), MotionState::Stopped);
    assert_eq!(driver.len(), 1);
}

/// it should leave members' own reversing settings alone unless the group set them
#[test]
fn group_keeps_member_reversing_it_did_not_set() {
    let t = targets(2);
    let g = MotionGroup::new()
        .with_member(tween(&t[0], 10.0, 1.0).reversing(true))
        .with_member(tween(&t[1], 10.0, 1.0))
        .sync_when_reversing(true);
    assert!(g.member(0).unwrap().is_reversing());
    assert!(!g.member(1).unwrap().is_reversing());

    let g = g.sync_when_reversing(false).reversing(false);
    assert!(g.member(0).unwrap().is_reversing());

    // Pushed by the group, then withdrawn by it.
    let g = g.reversing(true);
    assert!(g.member(1).unwrap().is_reversing());
    let g = g.reversing(false);
    assert!(!g.member(1).unwrap().is_reversing());

    let mut g = MotionGroup::new()
        .with_member(tween(&t[0], 10.0, 1.0).reversing(true))
        .with_member(tween(&t[1], 10.0, 1.0));
    g.start();
    drive(&mut g, 0, 100);
    assert_eq!(g.state(), MotionState::Stopped);
    assert_eq!(*t[0].borrow(), 0.0);
    assert_eq!(*t[1].borrow(), 10.0);
}

fn repeats(events: &[MotionEvent]) -> Vec<u32> {
    events
        .iter()
        .filter_map(|e| match e {
            MotionEvent::Repeated { cycles_completed } => Some(*cycles_completed),
            _ => None,
        })
        .collect()
}

/// it should restart a sequential reversing sequence from step 0 on each repeat
#[test]
fn sequential_sequence_repeats() {
    let t = targets(2);
    let mut seq = chain(&t).reversing(true).repeating(1);
    seq.start();
    seq.take_events();

    // Cycle 1 is steps 0, 1, 0 over three seconds; t = 3.5 is halfway into step 0 again.
    let mut events = drive(&mut seq, 0, 28);
    assert_eq!(repeats(&events), vec![1]);
    assert_eq!(seq.cycles_completed(), 1);
    assert_eq!(seq.current_step(), 0);
    assert_eq!(seq.direction(), MotionDirection::Forward);
    approx(*t[0].borrow(), 5.0, 1e-12);
    approx(seq.total_progress(), (1.0 + 0.25 * 0.5) / 2.0, 1e-12);

    events.extend(drive(&mut seq, 29, 100));
    assert_eq!(seq.state(), MotionState::Stopped);
    assert_eq!(repeats(&events), vec![1]);
    assert_eq!(seq.cycles_completed(), 2);
    assert_eq!(seq.total_progress(), 1.0);
    for target in &t {
        assert_eq!(*target.borrow(), 10.0);
    }
}

/// it should unwind a contiguous sequence fully before starting the next cycle
#[test]
fn contiguous_sequence_repeats() {
    let t = targets(2);
    let mut seq = chain(&t)
        .reversing(true)
        .with_reversing_mode(ReversingMode::Contiguous)
        .repeating(1);
    seq.start();
    seq.take_events();

    // Cycle 1 takes four seconds; t = 4.5 is halfway into step 0 of cycle 2.
    let mut events = drive(&mut seq, 0, 36);
    assert_eq!(repeats(&events), vec![1]);
    assert_eq!(seq.cycles_completed(), 1);
    assert_eq!(seq.current_step(), 0);
    assert_eq!(seq.direction(), MotionDirection::Forward);
    assert_eq!(seq.step(0).unwrap().direction(), MotionDirection::Forward);
    approx(*t[0].borrow(), 5.0, 1e-12);
    assert_eq!(*t[1].borrow(), 0.0);

    events.extend(drive(&mut seq, 37, 100));
    assert_eq!(seq.state(), MotionState::Stopped);
    assert_eq!(repeats(&events), vec![1]);
    assert_eq!(seq.cycles_completed(), 2);
    assert_eq!(seq.total_progress(), 1.0);
    for target in &t {
        assert_eq!(*target.borrow(), 0.0);
    }
}

/// it should hand each beat's events to the host so driven queues never back up
#[test]
fn tempo_driver_collects_events_per_beat() {
    let t = targets(1);
    let mut driver = TempoDriver::new(ManualTempo::new(0.0));
    let id = driver.attach(tween(&t[0], 10.0, 100.0));
    driver.get_mut(id).unwrap().start();
    driver.beat();
    assert_eq!(driver.events(), &[(id, MotionEvent::Started)]);

    for _ in 0..1100 {
        driver.advance(1.0 / 60.0);
        let events = driver.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].0, id);
        assert!(matches!(events[0].1, MotionEvent::Updated { .. }));
    }
    let unit = driver.get_mut(id).unwrap();
    assert_eq!(unit.state(), MotionState::Moving);
    assert_eq!(unit.events().dropped(), 0);
    assert_eq!(unit.events().pending().count(), 0);
}

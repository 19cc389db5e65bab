use super::*;

fn fill(id: u32, r: u8) -> DeferredCommand {
    DeferredCommand::Fill {
        image: ImageId(id),
        color: Rgba8Premul::new(r, 0, 0, 255),
    }
}

#[test]
fn immediate_queue_never_captures() {
    let mut q = CommandQueue::new();
    let mut built = false;
    assert!(!q.try_defer(|| {
        built = true;
        fill(0, 1)
    }));
    assert!(!built);
    assert!(q.is_empty());
    assert!(!q.is_deferring());
}

#[test]
fn flush_replays_in_order_once() {
    let mut q = CommandQueue::new();
    q.enter_deferred_mode();
    q.enter_deferred_mode();
    assert!(q.try_defer(|| fill(0, 1)));
    assert!(q.try_defer(|| fill(1, 2)));
    assert!(q.try_defer(|| fill(0, 3)));
    assert_eq!(q.len(), 3);

    let mut seen = Vec::new();
    q.flush(|c| {
        seen.push(c.clone());
        Ok::<(), ()>(())
    })
    .unwrap();
    assert_eq!(seen, vec![fill(0, 1), fill(1, 2), fill(0, 3)]);
    assert!(q.is_flushed());

    q.flush(|_| -> Result<(), ()> { panic!("replayed twice") })
        .unwrap();
    assert!(!q.try_defer(|| fill(0, 4)));
}

#[test]
fn failed_flush_keeps_remaining_commands() {
    let mut q = CommandQueue::new();
    q.enter_deferred_mode();
    for i in 0..3 {
        q.try_defer(|| fill(i, 0));
    }

    let mut ran = Vec::new();
    let err = q.flush(|c| {
        if let DeferredCommand::Fill { image, .. } = c {
            if image.0 == 1 {
                return Err("boom");
            }
            ran.push(image.0);
        }
        Ok(())
    });
    assert_eq!(err, Err("boom"));
    assert_eq!(ran, vec![0]);
    assert!(q.is_deferring());
    assert_eq!(q.len(), 2);

    q.flush(|c| {
        if let DeferredCommand::Fill { image, .. } = c {
            ran.push(image.0);
        }
        Ok::<(), &str>(())
    })
    .unwrap();
    assert_eq!(ran, vec![0, 1, 2]);
    assert!(q.is_flushed());
}

#[test]
#[should_panic(expected = "after the queue was flushed")]
fn entering_deferral_after_flush_panics() {
    let mut q = CommandQueue::new();
    q.flush(|_| Ok::<(), ()>(())).unwrap();
    q.enter_deferred_mode();
}

#[test]
#[should_panic(expected = "texstage: pixels cannot be called before the first frame")]
fn read_with_queued_commands_panics() {
    let mut q = CommandQueue::new();
    q.enter_deferred_mode();
    q.try_defer(|| fill(0, 0));
    q.ensure_flushed("pixels");
}

#[test]
fn read_with_empty_deferring_queue_is_allowed() {
    let mut q = CommandQueue::new();
    q.enter_deferred_mode();
    q.ensure_flushed("pixels");
}

#[test]
fn command_names() {
    assert_eq!(fill(0, 0).name(), "fill");
    assert_eq!(
        DeferredCommand::MarkDisposed { image: ImageId(2) }.name(),
        "mark_disposed"
    );
}

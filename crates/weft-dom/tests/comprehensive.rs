//! Comprehensive tests for weft-dom
//!
//! Exercises the full path from tree mutation to flushed envelope: turn
//! batching, descriptor capture, string interning, event subscription
//! transfer, observers, and the reference broker.

use std::cell::RefCell;
use std::rc::Rc;

use weft_dom::{
    DomEvent, Document, DocumentInit, Envelope, InboundMessage, ListenerFlags, ObserverOptions,
    Opcode, RangeTarget,
};

/// Document wired to a transport that captures every flushed envelope.
fn capture() -> (Document, Rc<RefCell<Vec<Envelope>>>) {
    let mut document = Document::new(DocumentInit::default());
    let sink = Rc::new(RefCell::new(Vec::new()));
    let captured = Rc::clone(&sink);
    document.set_transport(Box::new(move |envelope: Envelope| {
        captured.borrow_mut().push(envelope);
    }));
    (document, sink)
}

/// Split the mutation segment into opcode-prefixed rows.
fn mutation_rows(envelope: &Envelope) -> Vec<Vec<u32>> {
    let words = &envelope.mutations;
    let mut rows = Vec::new();
    let mut i = 0;
    while i < words.len() {
        let len = match words[i] {
            1 => 5,                                       // attributes
            2 => 3,                                       // character data
            3 => 6 + words[i + 4] as usize + words[i + 5] as usize, // child list
            4 => 5,                                       // properties
            5 => 5,                                       // event subscription
            6 => 5 + args_len(&words[i + 5..], words[i + 4] as usize),
            7 => 6 + args_len(&words[i + 6..], words[i + 5] as usize),
            8 => 4 + args_len(&words[i + 4..], 1),
            9 => 4,                                       // render context request
            10 => 3,                                      // image handle request
            other => panic!("unknown opcode {other} at word {i}"),
        };
        rows.push(words[i..i + len].to_vec());
        i += len;
    }
    rows
}

fn args_len(words: &[u32], argc: usize) -> usize {
    let mut len = 0;
    for _ in 0..argc {
        len += match words[len] {
            1..=4 => 2,
            5 => 3,
            6 => 2 + words[len + 1] as usize,
            other => panic!("unknown argument tag {other}"),
        };
    }
    len
}

fn rows_of(envelope: &Envelope, opcode: Opcode) -> Vec<Vec<u32>> {
    mutation_rows(envelope)
        .into_iter()
        .filter(|row| row[0] == opcode.as_u32())
        .collect()
}

fn descriptor_handles(envelope: &Envelope) -> Vec<u32> {
    envelope.nodes.chunks(5).map(|chunk| chunk[0]).collect()
}

fn string_index(envelope: &Envelope, text: &str) -> Option<u32> {
    envelope.strings.iter().position(|s| s == text).map(|i| i as u32)
}

#[test]
fn test_one_envelope_per_turn() {
    let (mut document, sink) = capture();
    let div = document.create_element("div");
    document.append_child(document.body(), div).unwrap();
    document.set_attribute(div, "class", "card").unwrap();
    let text = document.create_text_node("hi");
    document.append_child(div, text).unwrap();

    assert!(sink.borrow().is_empty(), "nothing flushes before the turn ends");
    document.run_turn();
    assert_eq!(sink.borrow().len(), 1, "one turn, one envelope");

    document.run_turn();
    assert_eq!(sink.borrow().len(), 1, "an idle turn flushes nothing");
}

#[test]
fn test_descriptor_emitted_exactly_once() {
    let (mut document, sink) = capture();
    let div = document.create_element("div");
    document.append_child(document.body(), div).unwrap();
    document.set_attribute(div, "id", "a").unwrap();
    document.run_turn();

    document.set_attribute(div, "id", "b").unwrap();
    document.run_turn();

    let envelopes = sink.borrow();
    assert_eq!(descriptor_handles(&envelopes[0]), vec![div.as_u32()]);
    assert!(envelopes[1].nodes.is_empty(), "a known node never re-describes itself");
    // The handle itself stays stable across turns.
    let first = rows_of(&envelopes[0], Opcode::Attributes);
    let second = rows_of(&envelopes[1], Opcode::Attributes);
    assert_eq!(first[0][1], div.as_u32());
    assert_eq!(second[0][1], div.as_u32());
}

#[test]
fn test_skeleton_nodes_never_described() {
    let (mut document, sink) = capture();
    document.set_attribute(document.body(), "class", "ready").unwrap();
    let title = document.create_element("title");
    document.append_child(document.head(), title).unwrap();
    document.run_turn();

    let envelopes = sink.borrow();
    let described = descriptor_handles(&envelopes[0]);
    assert_eq!(described, vec![title.as_u32()], "only the created node is described");
    let attr_rows = rows_of(&envelopes[0], Opcode::Attributes);
    assert_eq!(attr_rows[0][1], document.body().as_u32());
}

#[test]
fn test_detached_subtree_described_with_first_mention() {
    let (mut document, sink) = capture();
    let list = document.create_element("ul");
    let item = document.create_element("li");
    let label = document.create_text_node("first");
    document.append_child(item, label).unwrap();
    document.append_child(list, item).unwrap();
    document.append_child(document.body(), list).unwrap();
    document.run_turn();

    let envelopes = sink.borrow();
    let mut described = descriptor_handles(&envelopes[0]);
    described.sort_unstable();
    let mut expected = vec![list.as_u32(), item.as_u32(), label.as_u32()];
    expected.sort_unstable();
    assert_eq!(described, expected);
}

#[test]
fn test_character_data_coalesces_within_turn_only() {
    let (mut document, sink) = capture();
    let text = document.create_text_node("a");
    document.append_child(document.body(), text).unwrap();
    document.set_data(text, "ab").unwrap();
    document.set_data(text, "abc").unwrap();
    document.run_turn();

    document.set_data(text, "next turn").unwrap();
    document.run_turn();

    let envelopes = sink.borrow();
    let first = rows_of(&envelopes[0], Opcode::CharacterData);
    assert_eq!(first.len(), 1, "same-turn writes to one node collapse");
    let final_index = string_index(&envelopes[0], "abc").unwrap();
    assert_eq!(first[0], vec![2, text.as_u32(), final_index]);
    // The table is append-only, so the overwritten text still rides the
    // delta; it just goes unreferenced.
    assert!(string_index(&envelopes[0], "ab").is_some());

    let second = rows_of(&envelopes[1], Opcode::CharacterData);
    assert_eq!(second.len(), 1, "coalescing does not reach across turns");
}

#[test]
fn test_string_delta_carries_only_new_strings() {
    let (mut document, sink) = capture();
    let first = document.create_element("div");
    document.append_child(document.body(), first).unwrap();
    document.set_attribute(first, "class", "card").unwrap();
    document.run_turn();

    let second = document.create_element("div");
    document.append_child(document.body(), second).unwrap();
    document.set_attribute(second, "class", "card").unwrap();
    document.run_turn();

    let envelopes = sink.borrow();
    assert!(string_index(&envelopes[0], "class").is_some());
    assert!(
        envelopes[1].strings.is_empty(),
        "every string of the second turn was already interned: {:?}",
        envelopes[1].strings
    );
    // Indices refer to the cumulative table, so both turns use the same one.
    let first_rows = rows_of(&envelopes[0], Opcode::Attributes);
    let second_rows = rows_of(&envelopes[1], Opcode::Attributes);
    assert_eq!(first_rows[0][2], second_rows[0][2], "attribute name index is stable");
}

#[test]
fn test_child_list_row_layouts() {
    let (mut document, sink) = capture();
    let first = document.create_element("p");
    let second = document.create_element("p");
    let inserted = document.create_element("p");
    document.append_child(document.body(), first).unwrap();
    document.append_child(document.body(), second).unwrap();
    document.run_turn();

    document.insert_before(document.body(), inserted, Some(second)).unwrap();
    document.run_turn();

    document.remove_child(document.body(), first).unwrap();
    document.run_turn();

    let envelopes = sink.borrow();
    let body = document.body().as_u32();

    let appends = rows_of(&envelopes[0], Opcode::ChildList);
    assert_eq!(appends[0], vec![3, body, 0, 0, 1, 0, first.as_u32()]);
    assert_eq!(
        appends[1],
        vec![3, body, 0, first.as_u32(), 1, 0, second.as_u32()],
        "append carries the previous last child as its left anchor"
    );

    let inserts = rows_of(&envelopes[1], Opcode::ChildList);
    assert_eq!(
        inserts[0],
        vec![3, body, second.as_u32(), first.as_u32(), 1, 0, inserted.as_u32()]
    );

    let removals = rows_of(&envelopes[2], Opcode::ChildList);
    assert_eq!(removals[0], vec![3, body, 0, 0, 0, 1, first.as_u32()]);
}

#[test]
fn test_fragment_lands_as_single_record() {
    let (mut document, sink) = capture();
    let fragment = document.create_document_fragment();
    let a = document.create_element("li");
    let b = document.create_element("li");
    let c = document.create_element("li");
    document.append_child(fragment, a).unwrap();
    document.append_child(fragment, b).unwrap();
    document.append_child(fragment, c).unwrap();
    sink.borrow_mut().clear();
    document.run_turn();
    // Intra-fragment appends flush like any mutation, against the
    // fragment's own handle.
    let staged = sink.borrow().len();
    assert_eq!(staged, 1);

    let list = document.create_element("ul");
    document.append_child(document.body(), list).unwrap();
    document.append_child(list, fragment).unwrap();
    document.run_turn();

    let envelopes = sink.borrow();
    let rows = rows_of(&envelopes[1], Opcode::ChildList);
    let adoption = rows.last().unwrap();
    assert_eq!(
        &adoption[..6],
        &[3, list.as_u32(), 0, 0, 3, 0],
        "all fragment children move in one record"
    );
    assert_eq!(&adoption[6..], &[a.as_u32(), b.as_u32(), c.as_u32()]);
    assert!(document.children(fragment).is_empty());
}

#[test]
fn test_property_rows_for_text_and_flag() {
    let (mut document, sink) = capture();
    let input = document.create_element("input");
    document.append_child(document.body(), input).unwrap();
    document
        .set_property(input, "value", weft_dom::PropertyValue::Text("typed".to_string()))
        .unwrap();
    document
        .set_property(input, "checked", weft_dom::PropertyValue::Flag(true))
        .unwrap();
    document.run_turn();

    let envelopes = sink.borrow();
    let rows = rows_of(&envelopes[0], Opcode::Properties);
    let value_index = string_index(&envelopes[0], "value").unwrap();
    let typed_index = string_index(&envelopes[0], "typed").unwrap();
    let checked_index = string_index(&envelopes[0], "checked").unwrap();
    assert_eq!(rows[0], vec![4, input.as_u32(), value_index, 0, typed_index + 1]);
    assert_eq!(rows[1], vec![4, input.as_u32(), checked_index, 1, 1]);
}

#[test]
fn test_subscription_transfer_and_announcement() {
    let (mut document, sink) = capture();
    let button = document.create_element("button");
    document.append_child(document.body(), button).unwrap();

    let first = document
        .add_event_listener(button, "click", ListenerFlags::default(), |_, _| {})
        .unwrap();
    let _second = document
        .add_event_listener(button, "click", ListenerFlags::default(), |_, _| {})
        .unwrap();
    document.run_turn();

    let envelopes = sink.borrow();
    let click_index = string_index(&envelopes[0], "click").unwrap();
    assert_eq!(envelopes[0].events, vec![click_index], "first sighting announces the type");
    let rows = rows_of(&envelopes[0], Opcode::EventSubscription);
    assert_eq!(rows.len(), 1, "only the 0 -> 1 transition is transferred");
    assert_eq!(rows[0], vec![5, button.as_u32(), 1, click_index, 0]);
    drop(envelopes);

    document.remove_event_listener(button, "click", first);
    document.run_turn();
    let envelopes = sink.borrow();
    let rows = rows_of(&envelopes[1], Opcode::EventSubscription);
    assert_eq!(rows[0][2], 1, "removal carries the remaining count");
    assert!(envelopes[1].events.is_empty(), "a known type is not re-announced");
}

#[test]
fn test_once_listeners_read_as_sequential_removals() {
    let (mut document, sink) = capture();
    let button = document.create_element("button");
    document.append_child(document.body(), button).unwrap();
    let once = ListenerFlags { once: true, ..ListenerFlags::default() };

    document.add_event_listener(button, "click", ListenerFlags::default(), |_, _| {}).unwrap();
    document.add_event_listener(button, "click", once, |_, _| {}).unwrap();
    document.add_event_listener(button, "click", once, |_, _| {}).unwrap();
    document.run_turn();

    document.dispatch_event(DomEvent::click(button));
    document.run_turn();

    let envelopes = sink.borrow();
    let rows = rows_of(&envelopes[1], Opcode::EventSubscription);
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0][2], 2, "first expiry leaves two handlers");
    assert_eq!(rows[1][2], 1, "second expiry leaves one");
    assert_eq!(rows[0][4], 4, "expiry records carry the once flag bits");
}

#[test]
fn test_object_create_and_call_rows() {
    let (mut document, sink) = capture();
    let paragraph = document.create_element("p");
    let text = document.create_text_node("hello");
    document.append_child(document.body(), paragraph).unwrap();
    document.append_child(paragraph, text).unwrap();

    let range = document.create_range();
    document.range_set_start(range, text, 2);
    document.run_turn();

    let envelopes = sink.borrow();
    let creates = rows_of(&envelopes[0], Opcode::ObjectCreate);
    let create_index = string_index(&envelopes[0], "createRange").unwrap();
    assert_eq!(
        creates[0],
        vec![7, create_index, 1, document.handle().as_u32(), range.as_u32(), 0]
    );

    let calls = rows_of(&envelopes[0], Opcode::ObjectCall);
    let set_start_index = string_index(&envelopes[0], "setStart").unwrap();
    assert_eq!(
        calls[0],
        vec![6, set_start_index, 2, range.as_u32(), 2, 5, 1, text.as_u32(), 1, 2],
        "node argument is a tagged reference, offset a tagged int"
    );
}

#[test]
fn test_render_context_and_image_request_rows() {
    let (mut document, sink) = capture();
    let canvas = document.create_element("canvas");
    let img = document.create_element("img");
    document.append_child(document.body(), canvas).unwrap();
    document.append_child(document.body(), img).unwrap();

    let context = document.request_render_context(canvas, "2d", None).unwrap();
    let image = document.request_image_handle(img).unwrap();
    document.run_turn();

    let envelopes = sink.borrow();
    let kind_index = string_index(&envelopes[0], "2d").unwrap();
    let context_rows = rows_of(&envelopes[0], Opcode::RenderContextRequest);
    assert_eq!(context_rows[0], vec![9, canvas.as_u32(), context.as_u32(), kind_index]);
    let image_rows = rows_of(&envelopes[0], Opcode::ImageHandleRequest);
    assert_eq!(image_rows[0], vec![10, img.as_u32(), image.as_u32()]);
    assert!(document.broker().is_pending(context));
    assert!(document.broker().is_pending(image));
}

#[test]
fn test_resolution_replays_into_host_target() {
    let (mut document, _sink) = capture();
    let text = document.create_text_node("hello world");
    document.append_child(document.body(), text).unwrap();

    let range = document.create_range();
    document.range_set_start(range, text, 0);
    document.range_set_end(range, text, 5);
    assert!(document.broker().is_pending(range));
    assert_eq!(document.broker().pending_len(range), 2);

    document.receive(InboundMessage::ReferenceResolved {
        handle: range,
        target: Box::new(RangeTarget::default()),
    });
    assert!(document.broker().is_resolved(range));
    assert_eq!(document.broker().pending_len(range), 0);
    let resolved = document.broker().resolved::<RangeTarget>(range).unwrap();
    assert!(!resolved.is_collapsed(), "queued boundary calls replayed in order");

    // Later calls reach the resolved target directly.
    document.range_collapse(range, true);
    let resolved = document.broker().resolved::<RangeTarget>(range).unwrap();
    assert!(resolved.is_collapsed());
}

#[test]
fn test_failed_reference_still_streams_records() {
    let (mut document, sink) = capture();
    let text = document.create_text_node("x");
    document.append_child(document.body(), text).unwrap();
    let range = document.create_range();
    document.run_turn();

    document.receive(InboundMessage::ReferenceFailed {
        handle: range,
        reason: "range unsupported".to_string(),
    });
    assert!(document.broker().is_failed(range));

    document.range_set_start(range, text, 0);
    document.run_turn();

    let envelopes = sink.borrow();
    let calls = rows_of(&envelopes[1], Opcode::ObjectCall);
    assert_eq!(calls.len(), 1, "the host still hears calls against the dead handle");
    assert_eq!(document.broker().pending_len(range), 0, "nothing queues for replay");
}

#[test]
fn test_event_reply_dispatch_and_default() {
    let (mut document, sink) = capture();
    let link = document.create_element("a");
    document.append_child(document.body(), link).unwrap();

    let fired = Rc::new(RefCell::new(0));
    let seen = Rc::clone(&fired);
    document
        .add_event_listener(link, "click", ListenerFlags::default(), move |_, event| {
            *seen.borrow_mut() += 1;
            event.prevent_default();
        })
        .unwrap();
    document.run_turn();

    document.receive(InboundMessage::Event(DomEvent::click(link)));
    assert_eq!(*fired.borrow(), 1);

    // The handler prevented the default action; dispatch reports it.
    let direct = document.dispatch_event(DomEvent::click(link));
    assert!(!direct);
    assert_eq!(*fired.borrow(), 2);

    // A reply for a node with no handlers is a no-op.
    let other = document.create_element("span");
    document.append_child(document.body(), other).unwrap();
    document.receive(InboundMessage::Event(DomEvent::click(other)));
    assert_eq!(*fired.borrow(), 2);
    document.run_until_idle();
    assert!(!sink.borrow().is_empty());
}

#[test]
fn test_observer_sees_every_change_kind() {
    let (mut document, _sink) = capture();
    let kinds = Rc::new(RefCell::new(Vec::new()));
    let seen = Rc::clone(&kinds);
    document.observe(document.handle(), ObserverOptions::default(), move |_, records| {
        seen.borrow_mut().extend(records.iter().map(|record| record.kind));
    });

    let div = document.create_element("div");
    document.append_child(document.body(), div).unwrap();
    document.set_attribute(div, "class", "a").unwrap();
    let text = document.create_text_node("t");
    document.append_child(div, text).unwrap();
    document.set_data(text, "u").unwrap();
    document
        .set_property(div, "hidden", weft_dom::PropertyValue::Flag(true))
        .unwrap();
    document.add_event_listener(div, "input", ListenerFlags::default(), |_, _| {}).unwrap();
    document.create_range();
    document.run_until_idle();

    let kinds = kinds.borrow();
    for expected in [
        Opcode::ChildList,
        Opcode::Attributes,
        Opcode::CharacterData,
        Opcode::Properties,
        Opcode::EventSubscription,
        Opcode::ObjectCreate,
    ] {
        assert!(kinds.contains(&expected), "observer missed {expected:?}");
    }
}

#[test]
fn test_observer_gets_old_values() {
    let (mut document, _sink) = capture();
    let records = Rc::new(RefCell::new(Vec::new()));
    let seen = Rc::clone(&records);
    document.observe(document.handle(), ObserverOptions::default(), move |_, batch| {
        seen.borrow_mut().extend(batch)
    });

    let div = document.create_element("div");
    document.append_child(document.body(), div).unwrap();
    document.set_attribute(div, "class", "first").unwrap();
    document.set_attribute(div, "class", "second").unwrap();
    document.run_until_idle();

    let records = records.borrow();
    let attribute_records: Vec<_> = records
        .iter()
        .filter(|record| record.kind == Opcode::Attributes)
        .collect();
    assert_eq!(attribute_records.len(), 2);
    assert_eq!(attribute_records[0].old_value, None);
    assert_eq!(attribute_records[0].value.as_deref(), Some("first"));
    assert_eq!(attribute_records[1].old_value.as_deref(), Some("first"));
    assert_eq!(attribute_records[1].value.as_deref(), Some("second"));
}

#[test]
fn test_observer_delivery_is_turn_based() {
    let (mut document, _sink) = capture();
    let delivered = Rc::new(RefCell::new(0usize));
    let seen = Rc::clone(&delivered);
    let id = document.observe(document.handle(), ObserverOptions::default(), move |_, records| {
        *seen.borrow_mut() += records.len()
    });

    let div = document.create_element("div");
    document.append_child(document.body(), div).unwrap();
    assert_eq!(*delivered.borrow(), 0, "nothing delivers synchronously");

    // A synchronous drain empties the queue before the task runs.
    let drained = document.take_records(id);
    assert_eq!(drained.len(), 1);
    document.run_until_idle();
    assert_eq!(*delivered.borrow(), 0, "the delivery task found nothing left");

    document.set_attribute(div, "id", "x").unwrap();
    document.run_until_idle();
    assert_eq!(*delivered.borrow(), 1);
}

#[test]
fn test_disconnect_discards_only_that_observer() {
    let (mut document, sink) = capture();
    let first_seen = Rc::new(RefCell::new(0usize));
    let second_seen = Rc::new(RefCell::new(0usize));
    let first_counter = Rc::clone(&first_seen);
    let second_counter = Rc::clone(&second_seen);
    let first = document.observe(document.handle(), ObserverOptions::default(), move |_, records| {
        *first_counter.borrow_mut() += records.len()
    });
    let _second =
        document.observe(document.handle(), ObserverOptions::default(), move |_, records| {
            *second_counter.borrow_mut() += records.len()
        });

    let div = document.create_element("div");
    document.append_child(document.body(), div).unwrap();
    assert!(document.disconnect(first));
    document.run_until_idle();

    assert_eq!(*first_seen.borrow(), 0, "disconnect discarded the undelivered records");
    assert_eq!(*second_seen.borrow(), 1, "other observers are untouched");
    assert_eq!(sink.borrow().len(), 1, "the channel batch still flushed");
}

#[test]
fn test_handles_stay_stable_across_turns() {
    let (mut document, sink) = capture();
    let div = document.create_element("div");
    document.append_child(document.body(), div).unwrap();
    document.run_turn();
    document.set_attribute(div, "a", "1").unwrap();
    document.run_turn();
    document.set_attribute(div, "b", "2").unwrap();
    document.run_turn();

    let envelopes = sink.borrow();
    for envelope in envelopes.iter().skip(1) {
        let rows = rows_of(envelope, Opcode::Attributes);
        assert_eq!(rows[0][1], div.as_u32());
    }
    // Handles never recycle into fresh nodes either.
    drop(envelopes);
    let another = document.create_element("span");
    assert!(another.as_u32() > div.as_u32());
}

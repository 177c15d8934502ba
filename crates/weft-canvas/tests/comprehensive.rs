//! Comprehensive tests for weft-canvas
//!
//! Drives the context proxy through a real document: request validation,
//! local state mirroring, queued replay on resolution, and paint sources.

use std::cell::RefCell;
use std::rc::Rc;

use weft_canvas::{
    CanvasError, ContextState, ImageBitmap, ImageBitmapTarget, LineCap, PaintStyle, RenderContext2d,
    Repetition,
};
use weft_dom::{Document, DocumentInit, Envelope, Handle, InboundMessage};

fn canvas_document() -> (Document, Handle, Rc<RefCell<Vec<Envelope>>>) {
    let mut document = Document::new(DocumentInit::default());
    let sink = Rc::new(RefCell::new(Vec::new()));
    let captured = Rc::clone(&sink);
    document.set_transport(Box::new(move |envelope: Envelope| {
        captured.borrow_mut().push(envelope);
    }));
    let canvas = document.create_element("canvas");
    document.append_child(document.body(), canvas).unwrap();
    document.run_turn();
    sink.borrow_mut().clear();
    (document, canvas, sink)
}

#[test]
fn test_unsupported_kind_fails_without_crossing() {
    let (mut document, canvas, sink) = canvas_document();
    let result = RenderContext2d::request(&mut document, canvas, "webgl");
    assert_eq!(result, Err(CanvasError::UnsupportedKind("webgl".to_string())));
    document.run_turn();
    assert!(sink.borrow().is_empty(), "the refusal is local and synchronous");
}

#[test]
fn test_unknown_canvas_is_a_dom_error() {
    let (mut document, _canvas, _sink) = canvas_document();
    let ghost = Handle::from_raw(7777);
    let result = RenderContext2d::request(&mut document, ghost, "2d");
    assert!(matches!(result, Err(CanvasError::Dom(_))));
}

#[test]
fn test_context_request_batches_and_mirrors_state() {
    let (mut document, canvas, sink) = canvas_document();
    let context = RenderContext2d::request(&mut document, canvas, "2d").unwrap();
    document.run_turn();

    assert_eq!(sink.borrow().len(), 1, "the request rode the turn's envelope");
    assert!(document.broker().is_pending(context.handle()));

    let state = context.state(&document).unwrap();
    let frame = state.current();
    assert_eq!(frame.line_width, 1.0);
    assert_eq!(frame.fill_style, PaintStyle::Color("#000000".to_string()));
}

#[test]
fn test_style_writes_mirror_while_pending() {
    let (mut document, canvas, _sink) = canvas_document();
    let context = RenderContext2d::request(&mut document, canvas, "2d").unwrap();

    context.set_fill_style(&mut document, "tomato");
    context.set_line_width(&mut document, 3.5);
    context.set_line_cap(&mut document, "round");
    context.save(&mut document);
    context.set_fill_style(&mut document, "navy");

    let frame = context.state(&document).unwrap().current().clone();
    assert_eq!(frame.fill_style, PaintStyle::Color("navy".to_string()));
    assert_eq!(frame.line_width, 3.5);
    assert_eq!(frame.line_cap, LineCap::Round);

    context.restore(&mut document);
    let frame = context.state(&document).unwrap().current().clone();
    assert_eq!(frame.fill_style, PaintStyle::Color("tomato".to_string()));
}

#[test]
fn test_queued_drawing_replays_on_resolution() {
    let (mut document, canvas, _sink) = canvas_document();
    let context = RenderContext2d::request(&mut document, canvas, "2d").unwrap();

    context.set_fill_style(&mut document, "green");
    context.begin_path(&mut document);
    context.move_to(&mut document, 0.0, 0.0);
    context.line_to(&mut document, 10.0, 10.0);
    context.stroke(&mut document);
    let queued = document.broker().pending_len(context.handle());
    assert_eq!(queued, 5);

    document.receive(InboundMessage::ReferenceResolved {
        handle: context.handle(),
        target: Box::new(ContextState::default()),
    });
    assert!(document.broker().is_resolved(context.handle()));
    assert_eq!(document.broker().pending_len(context.handle()), 0);

    // The host-side stand-in replayed the style write.
    let resolved = document.broker().resolved::<ContextState>(context.handle()).unwrap();
    assert_eq!(resolved.current().fill_style, PaintStyle::Color("green".to_string()));

    // Post-resolution calls apply directly.
    context.set_fill_style(&mut document, "black");
    let resolved = document.broker().resolved::<ContextState>(context.handle()).unwrap();
    assert_eq!(resolved.current().fill_style, PaintStyle::Color("black".to_string()));
}

#[test]
fn test_failed_context_keeps_emulation_readable() {
    let (mut document, canvas, _sink) = canvas_document();
    let context = RenderContext2d::request(&mut document, canvas, "2d").unwrap();
    context.set_line_width(&mut document, 8.0);

    document.receive(InboundMessage::ReferenceFailed {
        handle: context.handle(),
        reason: "canvas lost".to_string(),
    });
    assert!(document.broker().is_failed(context.handle()));

    // Later writes still land in the emulation even though the host
    // dropped the counterpart.
    context.set_line_width(&mut document, 2.0);
    let frame = context.state(&document).unwrap().current().clone();
    assert_eq!(frame.line_width, 2.0);
}

#[test]
fn test_gradient_lifecycle() {
    let (mut document, canvas, _sink) = canvas_document();
    let context = RenderContext2d::request(&mut document, canvas, "2d").unwrap();

    let gradient = context.create_linear_gradient(&mut document, 0.0, 0.0, 100.0, 0.0);
    gradient.add_color_stop(&mut document, 0.0, "red");
    gradient.add_color_stop(&mut document, 1.0, "blue");
    context.set_fill_gradient(&mut document, &gradient);

    let stops = gradient.stops(&document);
    assert_eq!(stops.len(), 2);
    assert_eq!(stops[0].color, "red");
    assert_eq!(stops[1].offset, 1.0);

    let frame = context.state(&document).unwrap().current().clone();
    assert_eq!(frame.fill_style, PaintStyle::Reference(gradient.handle()));
}

#[test]
fn test_pattern_creation() {
    let (mut document, canvas, _sink) = canvas_document();
    let context = RenderContext2d::request(&mut document, canvas, "2d").unwrap();
    let img = document.create_element("img");
    document.append_child(document.body(), img).unwrap();

    let image = ImageBitmap::request(&mut document, img).unwrap();
    let pattern = context.create_pattern(&mut document, &image, Repetition::RepeatX);
    context.set_fill_pattern(&mut document, &pattern);

    let frame = context.state(&document).unwrap().current().clone();
    assert_eq!(frame.fill_style, PaintStyle::Reference(pattern.handle()));
}

#[test]
fn test_image_request_resolves_with_dimensions() {
    let (mut document, canvas, _sink) = canvas_document();
    let context = RenderContext2d::request(&mut document, canvas, "2d").unwrap();
    let img = document.create_element("img");
    document.append_child(document.body(), img).unwrap();

    let image = ImageBitmap::request(&mut document, img).unwrap();
    assert!(!image.is_ready(&document));
    assert_eq!(image.size(&document), None);

    document.receive(InboundMessage::ReferenceResolved {
        handle: image.handle(),
        target: Box::new(ImageBitmapTarget::new(320, 240)),
    });
    assert!(image.is_ready(&document));
    assert_eq!(image.size(&document), Some((320, 240)));

    // Drawing with the resolved image queues against the pending context.
    context.draw_image(&mut document, &image, 16.0, 16.0);
    assert!(document.broker().is_pending(context.handle()));
}

#[test]
fn test_image_request_for_unknown_source_fails() {
    let (mut document, _canvas, _sink) = canvas_document();
    let result = ImageBitmap::request(&mut document, Handle::from_raw(9999));
    assert!(result.is_err());
}

#[test]
fn test_line_dash_round_trip() {
    let (mut document, canvas, _sink) = canvas_document();
    let context = RenderContext2d::request(&mut document, canvas, "2d").unwrap();
    context.set_line_dash(&mut document, vec![5.0, 2.5]);
    let frame = context.state(&document).unwrap().current().clone();
    assert_eq!(frame.line_dash, vec![5.0, 2.5]);
}

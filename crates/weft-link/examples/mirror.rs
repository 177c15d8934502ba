//! End-to-end walkthrough: one worker document, a loopback link, and a
//! stub host. Prints every envelope that crosses the channel as JSON.
//!
//! Run with `RUST_LOG=debug cargo run --example mirror` for the tracing
//! side of the story.

use anyhow::Result;
use weft_canvas::RenderContext2d;
use weft_dom::{Document, DocumentInit, DomEvent, InboundMessage, ListenerFlags};
use weft_link::{HostStub, MemoryLink};

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let mut document = Document::new(DocumentInit {
        url: "https://weft.example/demo".to_string(),
    });
    let link = MemoryLink::new();
    document.set_transport(link.transport());
    let mut host = HostStub::new();

    // Turn 1: build a small page and wire a click handler.
    let heading = document.create_element("h1");
    let title = document.create_text_node("Weft demo");
    document.append_child(heading, title)?;
    document.append_child(document.body(), heading)?;

    let button = document.create_element("button");
    document.set_attribute(button, "id", "draw")?;
    document.set_text_content(button, "Draw")?;
    document.append_child(document.body(), button)?;
    document.add_event_listener(button, "click", ListenerFlags::default(), |document, event| {
        tracing::info!(node = event.target.as_u32(), "button clicked");
        let _ = document.set_attribute(event.target, "data-clicked", "true");
    })?;
    document.run_turn();

    // Turn 2: ask for a canvas context and draw into it while the request
    // is still in flight.
    let canvas = document.create_element("canvas");
    document.set_attribute(canvas, "width", "320")?;
    document.set_attribute(canvas, "height", "240")?;
    document.append_child(document.body(), canvas)?;
    let context = RenderContext2d::request(&mut document, canvas, "2d")?;
    context.set_fill_style(&mut document, "rebeccapurple");
    context.fill_rect(&mut document, 8.0, 8.0, 120.0, 60.0);
    document.run_turn();

    // Host side: read everything posted, answer the context request.
    for envelope in link.drain_outbound() {
        println!("{}", serde_json::to_string_pretty(&envelope)?);
        host.absorb(&envelope);
    }
    for reply in host.resolve_all() {
        link.inject(reply);
    }
    link.pump(&mut document);
    tracing::info!(
        resolved = document.broker().is_resolved(context.handle()),
        "context request answered"
    );

    // The host replays a click against the mirrored button; the handler
    // above runs worker-side.
    link.inject(InboundMessage::Event(DomEvent::click(button)));
    link.pump(&mut document);
    document.run_until_idle();

    for envelope in link.drain_outbound() {
        println!("{}", serde_json::to_string_pretty(&envelope)?);
    }
    Ok(())
}

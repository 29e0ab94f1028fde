//! `reactkit pages` — Page through text with reactions.

use std::time::Duration;

use reactkit_core::content::{Content, Embed};
use reactkit_session::PagedRequest;

use super::terminal::{Terminal, summarize};

pub async fn run(
    pages: Vec<String>,
    title: String,
    ttl: Option<u64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let terminal = Terminal::open()?;
    let controls = &terminal.config.sessions.controls;
    let mut events = terminal.controller.events().subscribe();

    println!(
        "📖 {} page(s). React with {} / {} to navigate.",
        pages.len(),
        controls.back,
        controls.forward
    );
    println!("   Type `exit` or press Ctrl-C to close.\n");

    let handle = terminal
        .controller
        .open_paged(PagedRequest {
            channel: terminal.channel.clone(),
            owner: terminal.user().id.clone(),
            pages: build_pages(&title, pages),
            ttl: ttl.map(Duration::from_secs),
        })
        .await?;

    if handle.is_detached() {
        println!("⚠️  Channel {} is unavailable", terminal.channel);
        return Ok(());
    }

    terminal.run_session(&handle).await;

    let summary = summarize(&mut events);
    println!("\n   Pages turned: {}", summary.pages_turned);
    if let Some(reason) = summary.closed {
        println!("   Closed:       {reason:?}");
    }
    Ok(())
}

fn build_pages(title: &str, bodies: Vec<String>) -> Vec<Content> {
    bodies
        .into_iter()
        .map(|body| Embed::new(title).description(body).into())
        .collect()
}

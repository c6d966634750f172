//! Interactive review in a terminal.

use console::style;
use dialoguer::{Confirm, Editor};
use indexmap::IndexMap;

use crate::{
    notify::Notifier,
    session::{PageEntry, ReviewSession, Summary},
    store::{BlobStore, StoreError},
};

#[derive(Debug, thiserror::Error)]
pub enum Error<E> {
    #[error("terminal: {0}")]
    Prompt(dialoguer::Error),
    #[error("{0}")]
    Store(StoreError<E>),
}

pub fn print_entry(entry: &PageEntry) {
    println!();
    println!("{} {}", style("SKU:").bold(), style(&entry.key.handle).cyan());
    if !entry.title.is_empty() {
        println!("{} {}", style("Title:").bold(), entry.title);
    }
    println!("{} {}", style("Current description:").bold(), entry.description);
    println!("{}", style("Prompt:").bold());
    println!("  {}", style(&entry.prompt).dim());
}

pub fn print_summary(name: &str, label: &str, summary: &Summary) {
    println!(
        "{} ({name}): {} rows, {}/{} products done, {} open",
        style(label).bold(),
        summary.rows,
        summary.done_products,
        summary.products,
        style(summary.eligible).yellow(),
    );
}

/// Text taken from the editor. An unsaved buffer counts as blank; the newline
/// editors append on save is dropped.
fn answer(text: Option<String>) -> String {
    let mut text = text.unwrap_or_default();
    if text.ends_with('\n') {
        text.pop();
        if text.ends_with('\r') {
            text.pop();
        }
    }
    text
}

/// Pages through the session, opening an editor for each entry so
/// multi-paragraph copy can be pasted whole. An empty or unsaved buffer
/// leaves the record untouched.
pub async fn review<S, N>(
    session: &mut ReviewSession<S, N>,
    once: bool,
) -> Result<(), Error<S::Error>>
where
    S: BlobStore,
    S::Error: std::fmt::Display,
    N: Notifier,
    N::Error: std::fmt::Display,
{
    loop {
        let page = session.page();
        if page.is_empty() {
            println!(
                "{}",
                style(format!("Nothing left to review in {}", session.category().label)).green()
            );
            return Ok(());
        }
        let slice = session.cursor().next_slice();
        println!(
            "{}",
            style(format!(
                "{}: records {}-{} of {}",
                session.category().label,
                slice.start + 1,
                slice.end,
                session.cursor().total()
            ))
            .bold()
            .underlined()
        );

        let mut edits = IndexMap::new();
        for entry in &page {
            print_entry(entry);
            let confirmed = Confirm::new()
                .with_prompt(format!("Write a new description for {}?", entry.key.handle))
                .default(true)
                .interact()
                .map_err(Error::Prompt)?;
            if !confirmed {
                continue;
            }
            let text = Editor::new()
                .extension(".txt")
                .edit("")
                .map_err(Error::Prompt)?;
            edits.insert(entry.key.clone(), answer(text));
        }

        let outcome = session.submit(edits).await.map_err(Error::Store)?;
        for handle in &outcome.touched {
            println!("{} {handle}", style("Updated").green());
        }
        if outcome.wrapped {
            println!("{}", style("Reached the end; starting over").dim());
        }
        if once {
            return Ok(());
        }
        let more = Confirm::new()
            .with_prompt("Continue with the next batch?")
            .default(true)
            .interact()
            .map_err(Error::Prompt)?;
        if !more {
            return Ok(());
        }
    }
}

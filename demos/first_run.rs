//! First-run session example
//!
//! This example demonstrates a complete extension session against in-memory
//! storage: installing the defaults, opening a page and the popup, editing
//! settings, and resetting everything back.

use reddsimp::{CheckState, Document, Runtime, SectionId};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Reddit Simplify First Run");
    println!("{:-<80}", "");

    let mut runtime = Runtime::in_memory();
    let outcome = runtime.startup()?;
    println!("\nStartup outcome: {:?}", outcome);
    println!("Indicator on:    {}", runtime.background().indicator_on());

    // Open a top-level page; the content context stamps every visibility
    // flag onto the document root.
    let page = runtime.open_page(Document::top_level())?;
    println!("\nPage attributes after startup:");
    display_attributes(&runtime, page);

    // Open the popup and look at the checkbox tree.
    runtime.open_popup()?;
    println!("\nPopup after loading:");
    display_popup(&runtime);

    // Check everything from the toggle-all master.
    runtime.popup_set_toggle_all(true)?;
    println!("\nAfter toggle-all:");
    display_popup(&runtime);
    let document = runtime.page(page).unwrap().document();
    println!(
        "Page now hides promoted posts: {}",
        document.attribute("hide_promoted") == Some("true")
    );

    // Flip the master switch off; the page attributes are stripped.
    runtime.popup_set_master_switch(false)?;
    let document = runtime.page(page).unwrap().document();
    println!("\nAfter switching the extension off:");
    println!("  Indicator on:      {}", runtime.background().indicator_on());
    println!(
        "  Page attributes:   {}",
        document.attribute_names().count()
    );

    // Reset to the shipped defaults.
    let reply = runtime.popup_reset()?;
    println!("\nReset acknowledged: {}", reply.ok);
    println!("Page attributes after reset:");
    display_attributes(&runtime, page);

    Ok(())
}

fn display_attributes(runtime: &Runtime, page: usize) {
    let document = runtime.page(page).unwrap().document();
    for name in document.attribute_names() {
        println!("  {:<28} = {}", name, document.attribute(name).unwrap_or(""));
    }
}

fn display_popup(runtime: &Runtime) {
    let popup = runtime.popup().unwrap();
    println!("  Master switch:  {}", popup.master_switch());
    println!("  Toggle all:     {}", describe(popup.toggle_all_state()));
    for id in SectionId::ALL {
        println!(
            "  {:<15} {} ({} options)",
            format!("{:?}:", id),
            describe(popup.section_state(id)),
            id.keys().len()
        );
    }
}

fn describe(state: CheckState) -> &'static str {
    match state {
        CheckState::Checked => "checked",
        CheckState::Unchecked => "unchecked",
        CheckState::Indeterminate => "indeterminate",
    }
}

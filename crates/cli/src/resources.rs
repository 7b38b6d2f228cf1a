use nu_ansi_term::Color;
use std::error::Error;
use std::path::PathBuf;
use switchboard_core::resource::{ResourceKind, ResourceScanner};

/// Prints what a resource tree would activate, and whether the demo
/// catalog implements each name.
pub fn run(root: PathBuf) -> Result<(), Box<dyn Error>> {
    let mut descriptors = ResourceScanner::scan(&root)?;
    if descriptors.is_empty() {
        println!("no resources under {}", root.display());
        return Ok(());
    }
    descriptors.sort_by(|a, b| {
        (a.kind.as_str(), a.name.as_str()).cmp(&(b.kind.as_str(), b.name.as_str()))
    });

    let catalog = crate::demo::demo_catalog();
    for descriptor in &descriptors {
        let kind = format!("{:<8}", descriptor.kind.as_str());
        let kind = match descriptor.kind {
            ResourceKind::Command => Color::Green.paint(kind),
            ResourceKind::Hook => Color::Yellow.paint(kind),
            ResourceKind::Plugin => Color::Cyan.paint(kind),
        };
        let status = if catalog.resolve(&descriptor.name).is_some() {
            Color::Green.paint("ok")
        } else {
            Color::Red.paint("no implementation")
        };
        println!(
            "{} {:<16} {}  {}",
            kind,
            descriptor.name,
            descriptor.source.display(),
            status
        );
    }
    Ok(())
}

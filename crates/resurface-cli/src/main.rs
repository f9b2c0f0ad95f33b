//! Demonstration harness: renders the sample element tree into the
//! in-memory surface, prints the committed node tree, then re-renders a
//! mutated tree to show incremental reuse.

use clap::Parser;
use resurface_core::{Element, MemorySurface, NodeId, Renderer, TEXT_ATTR, TEXT_TAG};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "resurface")]
#[command(about = "Incremental reconciliation demo")]
#[command(version)]
struct Cli {
    /// Print the committed surface tree as JSON instead of indented text.
    #[arg(long)]
    json: bool,

    /// Render once and stop, skipping the incremental second pass.
    #[arg(long)]
    single_pass: bool,
}

/// The nested sample tree from the reconciler's original demo page.
fn sample(text: &str, heading_class: Option<&str>) -> Element {
    let section = || {
        let mut h1 = Element::host("h1")
            .with_child(Element::host("p").with_child(text))
            .with_child(Element::host("a").with_child(text));
        if let Some(class) = heading_class {
            h1 = h1.with_attr("class", class);
        }
        Element::host("div")
            .with_child(h1)
            .with_child(Element::host("h2").with_child(text))
    };

    Element::host("div").with_child(
        Element::host("div")
            .with_child(section())
            .with_child(section()),
    )
}

fn print_tree(surface: &MemorySurface, node: NodeId, depth: usize) {
    let indent = "  ".repeat(depth);
    if surface.tag(node) == TEXT_TAG {
        let text = surface
            .attr(node, TEXT_ATTR)
            .map(ToString::to_string)
            .unwrap_or_default();
        println!("{indent}text({text:?})");
        return;
    }

    let attrs: String = surface
        .attrs(node)
        .map(|(name, value)| format!(" {}={:?}", name, value.to_string()))
        .collect();
    println!("{indent}<{}{attrs}>", surface.tag(node));
    for child in surface.children(node) {
        print_tree(surface, *child, depth + 1);
    }
}

fn print_surface(surface: &MemorySurface, container: NodeId, json: bool) {
    if json {
        let snapshot = surface.to_json(container);
        match serde_json::to_string_pretty(&snapshot) {
            Ok(rendered) => println!("{rendered}"),
            Err(err) => eprintln!("failed to serialize snapshot: {err}"),
        }
    } else {
        print_tree(surface, container, 0);
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut surface = MemorySurface::new();
    let container = surface.create_root();
    let mut renderer = Renderer::new(surface);

    let summary = match renderer.render_sync(sample("mine", None), container) {
        Ok(summary) => summary,
        Err(err) => {
            eprintln!("render failed: {err}");
            return ExitCode::FAILURE;
        }
    };
    println!(
        "initial render: {} nodes placed, {} mutations",
        summary.placements, summary.mutations
    );
    print_surface(renderer.surface(), container, cli.json);

    if cli.single_pass {
        return ExitCode::SUCCESS;
    }

    // Second pass: same kinds everywhere, so every surface node is reused
    // and the commit applies only the attribute and text diffs.
    let summary = match renderer.render_sync(sample("yours", Some("lead")), container) {
        Ok(summary) => summary,
        Err(err) => {
            eprintln!("render failed: {err}");
            return ExitCode::FAILURE;
        }
    };
    println!(
        "incremental render: {} placed, {} removed, {} updates, {} mutations",
        summary.placements, summary.removals, summary.updates, summary.mutations
    );
    print_surface(renderer.surface(), container, cli.json);

    ExitCode::SUCCESS
}

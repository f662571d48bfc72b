//! # Model Command Implementation
//!
//! Locates the description file behind an API name by racing the candidate
//! paths, then prints a summary of the parsed (and platform-pruned) model,
//! or the whole tree with `--json`.

use anyhow::{Context as _, Result};
use clap::Args;

use docserve::schema::{Namespace, Node};

use super::Context;

/// Locate and summarize an API model
#[derive(Args, Debug)]
pub struct ModelArgs {
    /// API name, e.g. `pageAction` or `app.window`
    #[arg(value_name = "NAME")]
    pub name: String,

    /// Prune members that do not apply to this platform
    #[arg(long, value_name = "PLATFORM", env = "DOCSERVE_PLATFORM")]
    pub platform: Option<String>,

    /// Print the full model as JSON
    #[arg(long)]
    pub json: bool,

    /// Print the candidate paths instead of resolving
    #[arg(long)]
    pub candidates: bool,
}

/// Execute the `model` command.
pub fn execute(context: &Context, args: ModelArgs) -> Result<()> {
    let models = context.api_models(args.platform.as_deref())?;

    if args.candidates {
        for candidate in models.candidates(&args.name) {
            println!("{}", candidate);
        }
        return Ok(());
    }

    let model = models
        .get_model(&args.name)
        .get()
        .with_context(|| format!("No model for \"{}\"", args.name))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(model.as_ref())?);
    } else {
        print_summary(&model);
    }
    Ok(())
}

fn print_summary(model: &Namespace) {
    println!("namespace: {}", model.name);
    if model.documentation_page() != model.name {
        println!("documented in: {}", model.documentation_page());
    }
    for (kind, nodes) in model.members.groups() {
        if nodes.is_empty() {
            continue;
        }
        println!("{} ({}):", kind.category(), nodes.len());
        for node in nodes {
            print_node(node, 1);
        }
    }
}

fn print_node(node: &Node, depth: usize) {
    let indent = "  ".repeat(depth);
    match &node.ref_type {
        Some(ref_type) => println!("{}{} -> {}", indent, node.name, ref_type),
        None => println!("{}{}", indent, node.name),
    }
    for (_, children) in node.members.groups() {
        for child in children {
            print_node(child, depth + 1);
        }
    }
}

//! # Resolve Command Implementation
//!
//! Resolves a dotted API reference to a link and prints it as JSON. With
//! `--markup`, the argument is treated as text and every `$(ref:...)`
//! marker in it is replaced with an anchor element.
//!
//! Resolution never fails: an unresolvable reference is logged as a warning
//! and still printed, with a link synthesized from its final segment.

use std::sync::Arc;

use anyhow::Result;
use clap::Args;

use docserve::object_store::MemoryObjectStore;
use docserve::reference::ReferenceResolver;

use super::Context;

/// Resolve a dotted API reference to a link
#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// Reference such as `tabs.Tab`, or text containing `$(ref:...)` markers
    /// with `--markup`
    #[arg(value_name = "REF")]
    pub reference: String,

    /// Namespace the reference is relative to
    #[arg(short, long, value_name = "NAMESPACE")]
    pub namespace: Option<String>,

    /// Text to display instead of the reference
    #[arg(long, value_name = "TITLE")]
    pub title: Option<String>,

    /// Treat the argument as text and resolve every marker in it
    #[arg(long)]
    pub markup: bool,

    /// Prefix for generated hrefs (with `--markup`)
    #[arg(long, value_name = "PREFIX", default_value = "")]
    pub relative_to: String,

    /// Prune members that do not apply to this platform
    #[arg(long, value_name = "PLATFORM", env = "DOCSERVE_PLATFORM")]
    pub platform: Option<String>,
}

/// Execute the `resolve` command.
pub fn execute(context: &Context, args: ResolveArgs) -> Result<()> {
    let models = context.api_models(args.platform.as_deref())?;
    let resolver = ReferenceResolver::new(Arc::new(models), Arc::new(MemoryObjectStore::new()));

    if args.markup {
        let text = resolver.resolve_all_links(&args.reference, &args.relative_to, args.namespace.as_deref())?;
        println!("{}", text);
        return Ok(());
    }

    let link = resolver.safe_get_link(&args.reference, args.namespace.as_deref(), args.title.as_deref());
    println!("{}", serde_json::to_string_pretty(&link)?);
    Ok(())
}

//! # Route Command Implementation
//!
//! Routes a request path through the provider document and reports the
//! provider, matched prefix and remainder. Unless `--no-content` is given,
//! the content is also fetched and its type and version are shown.

use anyhow::{bail, Context as _, Result};
use clap::Args;

use super::Context;

/// Show which content provider serves a request path
#[derive(Args, Debug)]
pub struct RouteArgs {
    /// Request path, e.g. `extensions/tabs`
    #[arg(value_name = "PATH")]
    pub path: String,

    /// Only route; do not read the content
    #[arg(long)]
    pub no_content: bool,
}

/// Execute the `route` command.
pub fn execute(context: &Context, args: RouteArgs) -> Result<()> {
    let providers = context.providers();
    let route = providers.get_by_serve_from(&args.path);

    let Some(provider) = route.provider else {
        bail!("No content provider serves \"{}\"", args.path);
    };

    println!("provider:  {}", provider.name());
    println!("prefix:    {}", route.prefix);
    println!("remainder: {}", route.remainder);

    if !args.no_content {
        let content = provider
            .get_content(&route.remainder)
            .get()
            .with_context(|| format!("Provider \"{}\" has no \"{}\"", provider.name(), route.remainder))?;
        println!("type:      {}", content.mime_type);
        println!("version:   {}", content.version);
        println!("bytes:     {}", content.content.len());
    }
    Ok(())
}

use std::path::Path;

use anyhow::{Context, Result};
use tracing::{info, info_span};

use searchkit_cli::session::{
    FragmentDirClient, SessionResult, load_config, mount_page, row_reports, run_events,
    write_page,
};
use searchkit_core::{HttpRenderClient, RenderClient, SyncConfig};

use crate::cli::{InspectArgs, ReloadArgs, ReplayArgs, SessionArgs};
use crate::summary::{print_rows, print_session};

pub fn run_inspect(args: &InspectArgs, config: Option<&Path>) -> Result<()> {
    let config = load_config(config)?;
    let controller = mount_page(&args.page, config)?;
    let rows = row_reports(&controller)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else {
        print_rows(&rows);
    }
    Ok(())
}

pub fn run_replay(args: &ReplayArgs, config: Option<&Path>) -> Result<SessionResult> {
    let config = load_config(config)?;
    let client = FragmentDirClient::new(args.responses.clone());
    run_session(&args.session, config, &client)
}

pub fn run_reload(args: &ReloadArgs, config: Option<&Path>) -> Result<SessionResult> {
    let sync_config = load_config(config)?;
    let client = HttpRenderClient::from_config(&args.base_url, &sync_config)
        .with_context(|| format!("create render client for {}", args.base_url))?;
    run_session(&args.session, sync_config, &client)
}

fn run_session(
    args: &SessionArgs,
    config: SyncConfig,
    client: &dyn RenderClient,
) -> Result<SessionResult> {
    let span = info_span!("session", page = %args.page.display());
    let _guard = span.enter();

    let mut controller = mount_page(&args.page, config)?;
    let result = run_events(&mut controller, &args.events, client)?;
    info!(
        events = result.steps.len(),
        rows = result.rows.len(),
        "session complete"
    );

    if let Some(path) = &args.output {
        write_page(&controller, path)?;
    }
    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_session(&result);
    }
    Ok(result)
}

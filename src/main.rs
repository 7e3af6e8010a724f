use anyhow::{Context, Result, anyhow};
use clap::Parser;
use log::info;
use podtally::api::{HttpPersistenceApi, PersistenceApi};
use podtally::app::{self, App};
use podtally::binding::{Binder, BindingContext, Page};
use podtally::config::{Cli, Command, Settings};
use podtally::logging;
use podtally::markup::{PageSnapshot, render_page};
use podtally::podcast::ItemId;
use podtally::toggle::{ToggleKind, Trigger};
use std::sync::Arc;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let settings = Settings::from(Cli::parse());

    match &settings.command {
        Command::Tui => logging::init_file_logging(&settings.log_file, settings.log_level)?,
        _ => logging::init_stderr_logging(settings.log_level)?,
    }

    let snapshot = PageSnapshot::load(&settings.page)
        .with_context(|| format!("loading page snapshot {}", settings.page.display()))?;
    let document = render_page(&snapshot)?;
    let api: Arc<dyn PersistenceApi> = Arc::new(HttpPersistenceApi::from_settings(&settings)?);
    let ctx = BindingContext::new(document, api);
    let page = Binder::bind(&ctx);
    info!("main: bound {} toggle(s) against {}", page.toggles().len(), settings.base_url);

    match settings.command {
        Command::Tui => app::start_ui(App::new(page)).await,
        Command::Listen { episode_id } => run_once(page, ToggleKind::Listen, Some(episode_id), true).await,
        Command::Unlisten { episode_id } => {
            run_once(page, ToggleKind::Listen, Some(episode_id), false).await
        }
        Command::Subscribe => run_once(page, ToggleKind::Subscription, None, true).await,
        Command::Unsubscribe => run_once(page, ToggleKind::Subscription, None, false).await,
    }
}

/// One action without the terminal UI; prints the resulting state.
async fn run_once(page: Page, kind: ToggleKind, id: Option<String>, active: bool) -> Result<()> {
    let controller = match id {
        Some(id) => page.toggle(kind, &ItemId::new(&id)),
        None => page.subscription(),
    }
    .ok_or_else(|| anyhow!("no {} on this page matches", kind.identifier()))?;

    let mut trigger = Trigger::new();
    let event = if active {
        controller.activate(&mut trigger).await?
    } else {
        controller.deactivate(&mut trigger).await?
    };
    println!("{} {} -> {}", kind.identifier(), event.item_id, event.new_state);

    let app = App::new(page);
    if let Some((count, time)) = app.stats_text() {
        println!("unlistened: {} episode(s), {}", count, if time.is_empty() { "0m" } else { time.trim_end() });
    }
    Ok(())
}

use anyhow::Result;
use medchat::api::logging::init_logging;
use medchat::app::App;
use medchat::config::Config;
use medchat::terminal;

#[tokio::main]
async fn main() -> Result<()> {
    init_logging(terminal::is_interactive());

    let config = Config::load()?;
    config.validate()?;
    tracing::info!(
        url = config.chat_url.as_deref().unwrap_or_default(),
        language = config.language.code(),
        "medchat starting"
    );

    let mut app = App::new(&config)?;
    app.run().await
}

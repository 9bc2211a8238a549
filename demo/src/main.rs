use log::info;
use restapi_core::{ApiClient, ClientConfig};
use restapi_demo::walkthrough::{self, Options};
use restapi_demo::RestApi;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = ClientConfig::from_env()?;
    info!("using {}", config.base_url);
    let api = RestApi::new(ApiClient::new(config)?);

    let summary = walkthrough::run(&api, &Options::from_env())?;
    info!(
        "done: {} downloads, {} uploads, {} skipped",
        summary.downloaded.len(),
        summary.uploads,
        summary.skipped.len()
    );
    Ok(())
}

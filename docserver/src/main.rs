use docserver::{
    configuration,
    startup::Application,
    telemetry::{get_subscriber, init_subscriber, DEFAULT_ENV_FILTER},
};

#[tokio::main]
async fn main() -> std::io::Result<()> {
    init_subscriber(get_subscriber(DEFAULT_ENV_FILTER));

    let settings = configuration::get_configuration().expect("config fetched");

    let application = Application::build(settings).await?;
    application.run_until_stopped().await?;
    Ok(())
}

use face_vote::{Result, config::Config, server};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;
    face_vote::init(&config.logging)?;

    server::start_server(config).await
}

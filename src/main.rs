use fitness_hub::config::AppConfig;
use fitness_hub::{Error, db, env, init_rocket, mailer, spawn_session_cleanup, telemetry};

#[rocket::main]
async fn main() -> Result<(), Error> {
    // Env files must be loaded before the subscriber reads RUST_LOG.
    let env_result = env::load_environment();
    let _telemetry = telemetry::init_tracing();
    env_result?;

    let config = AppConfig::from_env()?;

    let pool = db::connect(&config.database_url).await?;
    db::run_migrations(&pool).await?;

    spawn_session_cleanup(pool.clone());

    let mailer = mailer::sender_from_config(config.email.as_ref());
    if config.email.is_none() {
        tracing::warn!("EMAIL_API_KEY not configured, feedback replies are disabled");
    }

    init_rocket(pool, config, mailer).launch().await?;

    Ok(())
}

use imagine_client::{ImagineApp, ImagineClient, ImagineConfig, LogUi, SettingsUpdate};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let env_loaded = dotenv::dotenv().is_ok();
    let config = ImagineConfig::from_env();
    imagine_client::logger::init_with_config(imagine_client::logger::config_for(&config))?;
    if env_loaded {
        log::info!("✅ .env file loaded");
    } else {
        log::warn!("⚠️  No .env file found");
    }

    let client = ImagineClient::new(&config)?;
    let app = ImagineApp::new(config, Arc::new(client), Arc::new(LogUi));
    app.start(Vec::new()).await;

    app.settings()
        .update(SettingsUpdate::new().batch_size("2").seed("42").step_count("30"));

    let added = app.generate("a red fox in fresh snow, golden hour").await?;
    for image in app.gallery().snapshot().iter().take(added) {
        println!("{} (seed {:?}) -> {}", image.filename, image.seed, image.url);
    }

    Ok(())
}

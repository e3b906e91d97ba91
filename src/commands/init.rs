use anyhow::Result;
use evsync_core::config::SyncConfig;
use owo_colors::OwoColorize;

pub fn run(config: &SyncConfig) -> Result<()> {
    let store = config.store()?;

    if store.init()? {
        println!("Created {} store at {}", config.profile, store.path().display());
    } else {
        println!(
            "{}",
            format!("Store already exists at {}", store.path().display()).dimmed()
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_creates_store_once() {
        let dir = tempfile::tempdir().unwrap();
        let store_file = dir.path().join("data").join("events.json");
        let config_file = dir.path().join("test.toml");
        std::fs::write(
            &config_file,
            format!(
                "store_file = {:?}\n\n[source]\napi_key = \"k\"\n\n[calendar]\ncalendar_id = \"c\"\n\n[auth]\nkey_file = \"key.json\"\n",
                store_file.display().to_string()
            ),
        )
        .unwrap();
        let config = SyncConfig::from_file(&config_file).unwrap();

        run(&config).unwrap();
        assert_eq!(std::fs::read_to_string(&store_file).unwrap().trim(), "{}");

        std::fs::write(&store_file, r#"{"a": null}"#).unwrap();
        run(&config).unwrap();
        assert_eq!(std::fs::read_to_string(&store_file).unwrap(), r#"{"a": null}"#);
    }
}

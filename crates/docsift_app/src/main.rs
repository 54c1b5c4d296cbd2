//! `docsift`: crawl documentation sites, filter pages by topic and extract their content.
mod cli;
mod commands;

use std::path::PathBuf;

use clap::Parser;
use engine_logging::{default_log_path, engine_info, engine_warn};

use cli::{Cli, Command};
use commands::RunRequest;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let dotenv_warning = load_dotenv(std::env::var_os("DOTENV_PATH").map(PathBuf::from));
    let cli = Cli::parse();
    engine_logging::initialize(cli.log.into(), cli.log_level(), &default_log_path());
    if let Some(warning) = dotenv_warning {
        engine_warn!("{}", warning);
    }
    engine_info!("docsift {} starting", env!("CARGO_PKG_VERSION"));

    match &cli.command {
        Command::Run {
            url,
            crawl,
            llm,
            filter,
            output_dir,
            cache_dir,
            concurrency,
        } => {
            commands::run(RunRequest {
                url,
                crawl,
                llm,
                filter,
                output_dir,
                cache_dir,
                concurrency: *concurrency,
            })
            .await
        }
        Command::Crawl {
            url,
            crawl,
            llm,
            filter,
            output_dir,
        } => commands::crawl(url, crawl, llm, filter, output_dir).await,
        Command::Parse { file, llm } => commands::parse(file, llm).await,
        Command::Cache { cache_dir, command } => commands::cache(cache_dir, command),
    }
}

/// Load `.env`, or the file named by `DOTENV_PATH`. Existing variables win.
///
/// A missing default `.env` is normal; a named file that cannot be loaded is returned as
/// a warning so it can be logged once logging is up.
fn load_dotenv(explicit: Option<PathBuf>) -> Option<String> {
    match explicit {
        Some(path) => dotenvy::from_path(&path).err().map(|err| {
            format!(
                "Could not load DOTENV_PATH file {}: {}",
                path.display(),
                err
            )
        }),
        None => {
            let _ = dotenvy::dotenv();
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::load_dotenv;

    #[test]
    fn named_file_that_is_missing_yields_warning() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("absent.env");
        let warning = load_dotenv(Some(path.clone())).unwrap();
        assert!(warning.contains(&path.display().to_string()));
    }

    #[test]
    fn named_file_is_loaded_without_warning() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("custom.env");
        fs::write(&path, "DOCSIFT_DOTENV_CHECK=loaded\n").unwrap();

        assert_eq!(load_dotenv(Some(path)), None);
        assert_eq!(
            std::env::var("DOCSIFT_DOTENV_CHECK").as_deref(),
            Ok("loaded")
        );
    }

    #[test]
    fn default_dotenv_never_warns() {
        assert_eq!(load_dotenv(None), None);
    }
}

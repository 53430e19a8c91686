use simplelog::*;
use std::fs::File;
use std::path::Path;

/// Initialize logging.
///
/// With a path, everything down to debug goes to that file. Without one,
/// warnings and errors go to stderr.
pub fn init(path: Option<&Path>) -> std::io::Result<()> {
    match path {
        Some(path) => {
            let file = File::create(path)?;
            WriteLogger::init(LevelFilter::Debug, Config::default(), file)
                .map_err(std::io::Error::other)?;
        }
        None => {
            TermLogger::init(
                LevelFilter::Warn,
                Config::default(),
                TerminalMode::Stderr,
                ColorChoice::Auto,
            )
            .map_err(std::io::Error::other)?;
        }
    }

    Ok(())
}

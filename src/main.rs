use anonfile::launcher::{ExternalEditor, Launcher};
use anonfile::logging;
use anonfile::paths::{self, Variables};
use anonfile::{CloseOutcome, RawSettings, Result, Session, SettingChange, Settings};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

const LOG_FILE: &str = "anonfile.log";

#[derive(Parser)]
#[command(name = "anonfile")]
#[command(about = "Anonymous scratch files that clean up after themselves")]
struct Args {
    /// Enable debug logging to anonfile.log
    #[arg(long)]
    log: bool,

    /// Settings file to use instead of the default one
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Create the directories and the recently closed list
    Init,
    /// Create a new anonymous file and print its path
    New {
        /// Open it in $VISUAL / $EDITOR and close it when the editor exits
        #[arg(long)]
        edit: bool,
    },
    /// Move an anonymous file to the recently closed directory
    Close { path: PathBuf },
    /// Move an anonymous file somewhere else so it is never archived
    Save { path: PathBuf, dest: PathBuf },
    /// List recently closed files, oldest first
    Recent,
    /// Change a setting (dir, recently_closed, keep, file_extension)
    Set { key: String, value: String },
    /// Print the resolved settings
    Config,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let log_path = match args.log {
        true => Some(Path::new(LOG_FILE)),
        false => None,
    };
    match logging::init(log_path) {
        Ok(()) => {}
        Err(e) => eprintln!("anonfile: logging disabled: {}", e),
    }
    log::info!("anonfile starting");

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::debug!("{:?}", e);
            eprintln!("anonfile: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<()> {
    let config_path = match args.config {
        Some(path) => path,
        None => RawSettings::default_path()?,
    };
    let raw = RawSettings::load(&config_path)?;
    let vars = Variables::from_env();

    match args.command {
        Cmd::Init => {
            let settings = Settings::expand(&raw, &vars)?;
            Session::init(&settings)?;
            match config_path.exists() {
                true => {}
                false => raw.save(&config_path)?,
            }
            println!("Scratch files:   {}", settings.dir.display());
            println!("Recently closed: {}", settings.recently_closed.display());
            Ok(())
        }
        Cmd::Set { key, value } => {
            let change = SettingChange::parse(&key, &value)?;
            Settings::expand(&raw, &vars)?.update(&change, &vars)?;
            raw.with_change(&change).save(&config_path)?;
            println!("{} = {}", key, value);
            Ok(())
        }
        Cmd::Config => {
            let settings = Settings::expand(&raw, &vars)?;
            println!("settings        = {}", config_path.display());
            println!("dir             = {}", settings.dir.display());
            println!("recently_closed = {}", settings.recently_closed.display());
            println!("keep            = {}", settings.keep);
            println!("file_extension  = {}", settings.file_extension);
            Ok(())
        }
        command => {
            let settings = Settings::resolve(&raw, &vars)?;
            let mut session = Session::open(settings)?;
            session.adopt_existing()?;
            run_session(&mut session, command)
        }
    }
}

fn run_session(session: &mut Session, command: Cmd) -> Result<()> {
    match command {
        Cmd::New { edit } => {
            let path = session.create()?;
            println!("{}", path.display());
            match edit {
                true => {
                    let editor = ExternalEditor::from_env();
                    log::info!("Opening {} with {}", path.display(), editor.command());
                    editor.edit(&path)?;
                    report_close(session.close(&path)?, &path);
                }
                false => {}
            }
        }
        Cmd::Close { path } => {
            let path = locate(session, &path);
            report_close(session.close(&path)?, &path);
        }
        Cmd::Save { path, dest } => {
            let path = locate(session, &path);
            let saved = session.save_as(&path, &dest)?;
            println!("Saved {}", saved.display());
        }
        Cmd::Recent => {
            for entry in session.recent_entries() {
                let closed = match entry.closed {
                    Some(time) => time.format("%Y-%m-%d %H:%M").to_string(),
                    None => "(gone)          ".to_string(),
                };
                println!("{}  {}", closed, entry.name);
            }
        }
        Cmd::Init | Cmd::Set { .. } | Cmd::Config => {}
    }
    Ok(())
}

/// A bare file name refers to the scratch directory; anything else is made
/// absolute against the current directory.
fn locate(session: &Session, path: &Path) -> PathBuf {
    let located = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => path.to_path_buf(),
        _ => session.settings().dir.join(path),
    };
    paths::absolute(&located)
}

fn report_close(outcome: CloseOutcome, path: &Path) {
    match outcome {
        CloseOutcome::Ignored => {
            eprintln!("{} is not an anonymous file, left alone", path.display())
        }
        CloseOutcome::Archived { name, eviction } => {
            println!("Closed {}", name);
            for removed in &eviction.removed {
                println!("Deleted {}", removed);
            }
            match eviction.excess {
                0 => {}
                n => eprintln!("Recently closed directory holds {} files over the limit", n),
            }
        }
    }
}

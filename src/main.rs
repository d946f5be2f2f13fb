//! Satchel - Pluggable Session Storage
//!
//! CLI entry point for the administrative surface: forced lock release,
//! lock inspection, session destruction, and garbage collection.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use satchel::cache::{KeyValueCache, RedisCache};
use satchel::config::Config;
use satchel::error::{exit_codes, Result, SatchelError};
use satchel::handler::HandlerPool;
use satchel::lock::{LockKeys, LockReader, LockReleaserPool};

/// Satchel - Pluggable Session Storage
#[derive(Parser)]
#[command(name = "satchel")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to a config file (defaults to ~/.satchel/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Force-release the distributed lock held for a session
    ReleaseLock {
        /// The session id whose lock should be cleared
        session_id: String,
        /// Handler name to release through (defaults to the configured one)
        #[arg(long)]
        handler: Option<String>,
    },

    /// Show the current holder of a session's lock
    LockHolder {
        /// The session id to inspect
        session_id: String,
    },

    /// Destroy a session's backend record
    Destroy {
        /// The session id to destroy
        session_id: String,
        /// Handler name to destroy through (defaults to the configured one)
        #[arg(long)]
        handler: Option<String>,
    },

    /// Sweep expired sessions from the configured backend
    Gc {
        /// Handler name to sweep (defaults to the configured one)
        #[arg(long)]
        handler: Option<String>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => match Config::load_from(path) {
            Ok(config) => config,
            Err(err) => {
                eprintln!("satchel: {}", err);
                return ExitCode::from(exit_codes::ERROR as u8);
            }
        },
        None => Config::load(),
    };

    match run(cli.command, &config) {
        Ok(()) => ExitCode::from(exit_codes::OK as u8),
        Err(err) => {
            eprintln!("satchel: {}", err);
            let code = if err.is_unsupported() {
                exit_codes::UNSUPPORTED
            } else {
                exit_codes::ERROR
            };
            ExitCode::from(code as u8)
        }
    }
}

fn run(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::ReleaseLock {
            session_id,
            handler,
        } => {
            let handler_name = handler.unwrap_or_else(|| config.session.handler.clone());
            let pool = releaser_pool(config)?;
            pool.get_lock_releaser(&handler_name)?.release(&session_id)?;
            println!("released lock for session {}", session_id);
            Ok(())
        }

        Commands::LockHolder { session_id } => {
            let cache = redis_cache(config)?;
            let reader = LockReader::new(cache, LockKeys::new(config.session.key_prefix.clone()));
            match reader.current_holder(&session_id)? {
                Some(holder) => println!("session {} locked by {}", session_id, holder),
                None => println!("session {} is unlocked", session_id),
            }
            Ok(())
        }

        Commands::Destroy {
            session_id,
            handler,
        } => {
            let handler = open_handler(config, handler)?;
            handler.destroy(&session_id)?;
            println!("destroyed session {}", session_id);
            Ok(())
        }

        Commands::Gc { handler } => {
            let handler = open_handler(config, handler)?;
            handler.garbage_collect(config.session.lifetime())?;
            println!(
                "collected sessions older than {}s",
                config.session.lifetime_secs
            );
            Ok(())
        }
    }
}

fn redis_cache(config: &Config) -> Result<Arc<dyn KeyValueCache>> {
    Ok(Arc::new(RedisCache::from_url(&config.redis.url)?))
}

fn releaser_pool(config: &Config) -> Result<LockReleaserPool> {
    Ok(LockReleaserPool::with_defaults(config, redis_cache(config)?))
}

fn open_handler(
    config: &Config,
    override_name: Option<String>,
) -> Result<Arc<dyn satchel::handler::SessionHandler>> {
    let handler_name = override_name.unwrap_or_else(|| config.session.handler.clone());
    let pool = HandlerPool::new(config, vec![])?;
    let handler = pool.resolve(&handler_name)?;

    let save_path = config.file.directory();
    if !handler.open(&save_path.to_string_lossy(), &config.session.name) {
        return Err(SatchelError::backend(format!(
            "could not open session handler '{}'",
            handler_name
        )));
    }

    Ok(handler)
}

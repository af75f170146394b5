//! USIM emulator server
//!
//! Loads a card profile and serves hex APDUs over TCP, one per line:
//!
//!   usim-emu --profile data/profile.json --port 9999
//!   printf '00A4000C023F00\n' | nc 127.0.0.1 9999

use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use log::{error, info};

use usim_emu::{load_profile, Config, SessionPolicy, TcpServer, VirtualCard};

#[derive(Parser)]
#[command(version, about = "ISO 7816-4 USIM file system emulator")]
struct Cli {
    /// Card profile (JSON); defaults to profile.json in the data directory
    #[arg(short, long, env = "USIM_EMU_PROFILE")]
    profile: Option<PathBuf>,

    /// Directory holding content files referenced by the profile
    #[arg(short, long, env = "USIM_EMU_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Address to listen on
    #[arg(long, env = "USIM_EMU_HOST", default_value = Config::DEFAULT_HOST)]
    host: String,

    /// TCP port to listen on
    #[arg(long, env = "USIM_EMU_PORT", default_value_t = Config::DEFAULT_PORT)]
    port: u16,

    /// Whether connections share one card selection state
    #[arg(long, value_enum, env = "USIM_EMU_SESSIONS", default_value_t = SessionPolicy::PerConnection)]
    sessions: SessionPolicy,

    /// Debug level output
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn into_config(self) -> Config {
        let mut config = Config::resolve(self.profile, self.data_dir);
        config.host = self.host;
        config.port = self.port;
        config.session_policy = self.sessions;
        config
    }
}

fn main() {
    let cli = Cli::parse();
    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    if let Err(e) = run(cli.into_config()) {
        error!("{:#}", e);
        process::exit(1);
    }
}

fn run(config: Config) -> anyhow::Result<()> {
    info!("Loading profile {:?}", config.profile);
    let tree = load_profile(&config.profile, config.data_dir())
        .with_context(|| format!("cannot build file system from {:?}", config.profile))?;

    let card = VirtualCard::new(Arc::new(tree), config.session_policy);
    let server = TcpServer::bind(&config.address(), card)?;
    server.run()?;
    Ok(())
}

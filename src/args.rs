use clap::Parser;
use std::{net::SocketAddr, num::NonZeroUsize};
use wolfconf_signaling::HubConfig;

#[derive(Parser, Debug)]
#[command(
    name = "wolfconf-signaling",
    about = "Signaling hub for WolfConf voice rooms",
    rename_all = "kebab-case",
    rename_all_env = "screaming-snake"
)]
pub struct Args {
    /// Address to listen on
    #[arg(long, default_value = "0.0.0.0:3000", env)]
    pub host: SocketAddr,

    /// Outbound messages buffered per connection before it is dropped
    #[arg(long, default_value = "64", env)]
    pub queue_capacity: NonZeroUsize,

    /// Only relay offers, answers and candidates between members of the same room
    #[arg(long, env)]
    pub room_scoped_signals: bool,
}

impl From<&Args> for HubConfig {
    fn from(args: &Args) -> Self {
        HubConfig {
            queue_capacity: args.queue_capacity,
            room_scoped_signals: args.room_scoped_signals,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let args = Args::try_parse_from(["wolfconf-signaling"]).unwrap();
        assert_eq!(args.host, "0.0.0.0:3000".parse().unwrap());
        assert_eq!(HubConfig::from(&args), HubConfig::default());
    }

    #[test]
    fn flags() {
        let args = Args::try_parse_from([
            "wolfconf-signaling",
            "--host",
            "127.0.0.1:4000",
            "--queue-capacity",
            "8",
            "--room-scoped-signals",
        ])
        .unwrap();
        let config = HubConfig::from(&args);
        assert_eq!(args.host.port(), 4000);
        assert_eq!(config.queue_capacity.get(), 8);
        assert!(config.room_scoped_signals);
    }

    #[test]
    fn zero_capacity_is_rejected() {
        assert!(Args::try_parse_from(["wolfconf-signaling", "--queue-capacity", "0"]).is_err());
    }
}

//! Command-line argument parsing for vimpd.

use std::path::PathBuf;

use clap::Parser;


/// vimpd - A modal terminal client for the Music Player Daemon.
#[derive( Parser, Debug )]
#[command( name = "vimpd" )]
#[command( version, about, long_about = None )]
pub struct Args {
    /// MPD host, overriding the settings file.
    #[arg( long )]
    pub host: Option<String>,

    /// MPD port, overriding the settings file.
    #[arg( short, long )]
    pub port: Option<u16>,

    /// Settings file to use instead of the default location.
    #[arg( long )]
    pub config: Option<PathBuf>,

    /// Log file to write to.
    #[arg( long )]
    pub log: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace).
    #[arg( long, default_value = "info" )]
    pub log_level: String,

    /// Ex command to run after startup. May be repeated.
    #[arg( short = 'c', long = "command" )]
    pub commands: Vec<String>,

    /// Do not connect on startup.
    #[arg( long )]
    pub no_connect: bool,
}


#[cfg( test )]
mod tests {
    use super::*;


    #[test]
    fn test_overrides_and_commands() {
        let args = Args::parse_from( [ "vimpd", "--host", "music.local", "-p", "6601", "-c", "set noincsearch", "-c", "window 2" ] );
        assert_eq!( args.host.as_deref(), Some( "music.local" ) );
        assert_eq!( args.port, Some( 6601 ) );
        assert_eq!( args.commands, vec![ "set noincsearch", "window 2" ] );
        assert_eq!( args.log_level, "info" );
        assert!( !args.no_connect );
    }
}

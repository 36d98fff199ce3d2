//! Settings file and startup commands
//!
//! Settings live in `settings.json` and the startup commands in `vimpdrc`,
//! both under the vimpd config directory.

use std::fs;
use std::path::{ Path, PathBuf };

use vimpd_core::Settings;


/// Returns the vimpd config directory.
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map( |p| p.join( "vimpd" ) )
}


/// Returns the path to the settings file.
pub fn settings_path() -> Option<PathBuf> {
    config_dir().map( |p| p.join( "settings.json" ) )
}


/// Returns the path to the startup command file.
pub fn rc_path() -> Option<PathBuf> {
    config_dir().map( |p| p.join( "vimpdrc" ) )
}


/// Loads settings from `path`, or returns defaults if it is missing or
/// unreadable.
pub fn load_settings( path: &Path ) -> Settings {
    if !path.exists() {
        return Settings::default();
    }

    match fs::read_to_string( path ) {
        Ok( contents ) => match serde_json::from_str( &contents ) {
            Ok( settings ) => settings,
            Err( e ) => {
                tracing::warn!( "Invalid settings in {}: {}", path.display(), e );
                Settings::default()
            }
        },
        Err( e ) => {
            tracing::warn!( "Failed to read settings: {}", e );
            Settings::default()
        }
    }
}


/// Saves settings to `path`.
pub fn save_settings( settings: &Settings, path: &Path ) {
    // Create parent directory if needed
    if let Some( parent ) = path.parent() {
        if !parent.exists() {
            if let Err( e ) = fs::create_dir_all( parent ) {
                tracing::warn!( "Failed to create settings directory: {}", e );
                return;
            }
        }
    }

    match serde_json::to_string_pretty( settings ) {
        Ok( json ) => {
            if let Err( e ) = fs::write( path, json ) {
                tracing::warn!( "Failed to save settings: {}", e );
            }
        }
        Err( e ) => {
            tracing::warn!( "Failed to serialize settings: {}", e );
        }
    }
}


/// Reads the ex commands in a startup file. Blank lines and lines starting
/// with `"` are skipped.
pub fn load_rc( path: &Path ) -> Vec<String> {
    let contents = match fs::read_to_string( path ) {
        Ok( contents ) => contents,
        Err( e ) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
        Err( e ) => {
            tracing::warn!( "Failed to read {}: {}", path.display(), e );
            return Vec::new();
        }
    };
    parse_rc( &contents )
}


fn parse_rc( contents: &str ) -> Vec<String> {
    contents
        .lines()
        .map( str::trim )
        .filter( |line| !line.is_empty() && !line.starts_with( '"' ) )
        .map( str::to_string )
        .collect()
}


#[cfg( test )]
mod tests {
    use super::*;
    use tempfile::TempDir;


    #[test]
    fn test_missing_settings_use_defaults() {
        let dir = TempDir::new().unwrap();
        let settings = load_settings( &dir.path().join( "settings.json" ) );
        assert_eq!( settings.port, 6600 );
        assert!( settings.autoconnect );
    }


    #[test]
    fn test_settings_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join( "nested" ).join( "settings.json" );
        let mut settings = Settings::default();
        settings.host = "music.local".into();
        settings.ignorecase = false;
        save_settings( &settings, &path );

        let loaded = load_settings( &path );
        assert_eq!( loaded.host, "music.local" );
        assert!( !loaded.ignorecase );
    }


    #[test]
    fn test_invalid_settings_fall_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join( "settings.json" );
        fs::write( &path, "{ not json" ).unwrap();
        assert_eq!( load_settings( &path ).host, "localhost" );
    }


    #[test]
    fn test_rc_skips_comments_and_blank_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join( "vimpdrc" );
        fs::write( &path, "\" startup\nalias n next\n\n  map Q :quit<CR>  \n" ).unwrap();
        assert_eq!( load_rc( &path ), vec![ "alias n next", "map Q :quit<CR>" ] );
        assert!( load_rc( &dir.path().join( "missing" ) ).is_empty() );
    }
}

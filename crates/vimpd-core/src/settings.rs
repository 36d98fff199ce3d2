//! Runtime options
//!
//! Loaded from the settings file by the front-end and changed at runtime with
//! `:set`.

use serde::{ Deserialize, Serialize };

use crate::command::CommandError;


/// User options.
#[derive( Debug, Clone, PartialEq, Serialize, Deserialize )]
#[serde( default )]
pub struct Settings {
    /// Server host name
    pub host: String,

    /// Server port
    pub port: u16,

    /// Connect to the server at startup
    pub autoconnect: bool,

    /// Case-insensitive search
    pub ignorecase: bool,

    /// Searches wrap around the end of the window
    pub searchwrap: bool,

    /// Move to the first match while the pattern is typed
    pub incsearch: bool,

    /// Window shown at startup
    pub window: String,
}


impl Default for Settings {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: 6600,
            autoconnect: true,
            ignorecase: true,
            searchwrap: true,
            incsearch: true,
            window: "playlist".into(),
        }
    }
}


impl Settings {
    /// Option names, in completion order.
    pub const NAMES: &'static [&'static str] = &[
        "autoconnect",
        "host",
        "ignorecase",
        "incsearch",
        "port",
        "searchwrap",
        "window",
    ];


    /// Applies one `:set` expression.
    ///
    /// Accepts `opt` and `noopt` for flags, `opt!` to toggle a flag,
    /// `opt?` to query and `opt=value` for valued options.
    ///
    /// @returns A message to show when the expression was a query
    pub fn apply( &mut self, expr: &str ) -> Result<Option<String>, CommandError> {
        let expr = expr.trim();
        if expr.is_empty() {
            return Err( CommandError::NoParameter( "option".into() ) );
        }

        if let Some(( name, value )) = expr.split_once( '=' ) {
            self.set_value( name.trim(), value.trim() )?;
            return Ok( None );
        }

        if let Some( name ) = expr.strip_suffix( '?' ) {
            return self.value( name ).map( Some );
        }

        if let Some( name ) = expr.strip_suffix( '!' ) {
            let flag = self.flag_mut( name )?;
            *flag = !*flag;
            return Ok( None );
        }

        if let Some( name ) = expr.strip_prefix( "no" ) {
            if let Ok( flag ) = self.flag_mut( name ) {
                *flag = false;
                return Ok( None );
            }
        }

        match self.flag_mut( expr ) {
            Ok( flag ) => {
                *flag = true;
                Ok( None )
            }
            // Naming a valued option shows it, as vim does
            Err( _ ) => self.value( expr ).map( Some ),
        }
    }


    /// Current value of an option rendered as `name=value`.
    pub fn value( &self, name: &str ) -> Result<String, CommandError> {
        let value = match name {
            "host" => self.host.clone(),
            "port" => self.port.to_string(),
            "window" => self.window.clone(),
            "autoconnect" => self.autoconnect.to_string(),
            "ignorecase" => self.ignorecase.to_string(),
            "searchwrap" => self.searchwrap.to_string(),
            "incsearch" => self.incsearch.to_string(),
            _ => return Err( unknown( name ) ),
        };
        Ok( format!( "{}={}", name, value ) )
    }


    fn flag_mut( &mut self, name: &str ) -> Result<&mut bool, CommandError> {
        match name {
            "autoconnect" => Ok( &mut self.autoconnect ),
            "ignorecase" => Ok( &mut self.ignorecase ),
            "searchwrap" => Ok( &mut self.searchwrap ),
            "incsearch" => Ok( &mut self.incsearch ),
            _ => Err( unknown( name ) ),
        }
    }


    fn set_value( &mut self, name: &str, value: &str ) -> Result<(), CommandError> {
        match name {
            "host" if !value.is_empty() => self.host = value.to_string(),
            "window" if !value.is_empty() => self.window = value.to_string(),
            "host" | "window" => return Err( CommandError::NoParameter( name.to_string() ) ),
            "port" => {
                self.port = value.parse().map_err( |_| {
                    CommandError::InvalidParameter( format!( "port={}", value ) )
                })?;
            }
            _ => {
                let flag = self.flag_mut( name )?;
                *flag = match value {
                    "true" | "on" | "1" => true,
                    "false" | "off" | "0" => false,
                    _ => return Err( CommandError::InvalidParameter( format!( "{}={}", name, value ) ) ),
                };
            }
        }
        Ok(())
    }
}


fn unknown( name: &str ) -> CommandError {
    CommandError::InvalidParameter( format!( "Unknown option: {}", name ) )
}


#[cfg( test )]
mod tests {
    use super::*;


    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!( settings.host, "localhost" );
        assert_eq!( settings.port, 6600 );
        assert!( settings.autoconnect && settings.ignorecase && settings.searchwrap && settings.incsearch );
        assert_eq!( settings.window, "playlist" );
    }


    #[test]
    fn test_flag_forms() {
        let mut settings = Settings::default();
        settings.apply( "noignorecase" ).unwrap();
        assert!( !settings.ignorecase );
        settings.apply( "ignorecase" ).unwrap();
        assert!( settings.ignorecase );
        settings.apply( "searchwrap!" ).unwrap();
        assert!( !settings.searchwrap );
        assert_eq!( settings.apply( "searchwrap?" ).unwrap().as_deref(), Some( "searchwrap=false" ) );
    }


    #[test]
    fn test_valued_options() {
        let mut settings = Settings::default();
        settings.apply( "host=music.local" ).unwrap();
        settings.apply( "port = 6601" ).unwrap();
        assert_eq!( settings.host, "music.local" );
        assert_eq!( settings.port, 6601 );
        assert_eq!( settings.apply( "port" ).unwrap().as_deref(), Some( "port=6601" ) );
        assert!( settings.apply( "port=abc" ).is_err() );
        assert!( settings.apply( "host=" ).is_err() );
    }


    #[test]
    fn test_unknown_option() {
        let mut settings = Settings::default();
        assert!( matches!( settings.apply( "colours" ), Err( CommandError::InvalidParameter( _ ) ) ) );
        assert!( matches!( settings.apply( "nohost" ), Err( CommandError::InvalidParameter( _ ) ) ) );
        assert!( matches!( settings.apply( "" ), Err( CommandError::NoParameter( _ ) ) ) );
    }


    #[test]
    fn test_partial_json_uses_defaults() {
        let settings: Settings = serde_json::from_str( r#"{ "port": 7000 }"# ).unwrap();
        assert_eq!( settings.port, 7000 );
        assert_eq!( settings.host, "localhost" );
    }
}

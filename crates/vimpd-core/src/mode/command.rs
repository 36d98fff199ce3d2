//! Command mode: ex command lines.
//!
//! Lines are split on `;`, aliases are expanded textually, command names
//! are resolved by exact name or unique prefix, and commands that need a
//! server connection can be queued until one exists.

use std::collections::{ BTreeMap, VecDeque };
use std::fmt;

use crate::command::{ parse_time, parse_toggle, split_chain, unescape, CommandError, CommandLine, Range };
use crate::context::Context;
use crate::key::{ format_keys, parse_keys, Key };
use crate::mode::input::LineInput;
use crate::mode::{ Mode, ModeName, Prompt };
use crate::player::Status;
use crate::settings::Settings;
use crate::windows::{ HelpWindow, LibraryWindow, PlaylistWindow };


/// A command implementation. Returns false to quit.
pub type Behaviour = fn( &mut CommandMode, &mut Context, &Invocation ) -> Result<bool, CommandError>;


/// One entry in the command table.
#[derive( Clone, Copy )]
pub struct Descriptor {
    pub name: &'static str,
    pub needs_connection: bool,
    pub supports_range: bool,
    pub behaviour: Behaviour,
}


impl Descriptor {
    pub const fn new( name: &'static str, needs_connection: bool, supports_range: bool, behaviour: Behaviour ) -> Self {
        Self { name, needs_connection, supports_range, behaviour }
    }
}


impl fmt::Debug for Descriptor {
    fn fmt( &self, f: &mut fmt::Formatter<'_> ) -> fmt::Result {
        f.debug_struct( "Descriptor" )
            .field( "name", &self.name )
            .field( "needs_connection", &self.needs_connection )
            .field( "supports_range", &self.supports_range )
            .finish()
    }
}


/// Arguments of a single command call.
#[derive( Debug, Clone, PartialEq, Eq )]
pub struct Invocation {
    /// Arguments with `\;` unescaped
    pub arguments: String,
    /// The command was written with a trailing `!`
    pub forced: bool,
    /// Number of lines in the range, 1 without one
    pub count: usize,
    pub range: Option<Range>,
}


/// A command deferred until the server is connected.
#[derive( Debug, Clone, PartialEq, Eq )]
pub struct QueuedCommand {
    pub name: &'static str,
    pub invocation: Invocation,
}


/// Tab completion state for the current line.
#[derive( Debug )]
struct Completion {
    original: String,
    candidates: Vec<String>,
    /// Selected candidate, None while showing the original text
    index: Option<usize>,
}


const BUILTINS: &[Descriptor] = &[
    Descriptor::new( "add", true, true, add ),
    Descriptor::new( "addall", true, false, add_all ),
    Descriptor::new( "alias", false, false, alias ),
    Descriptor::new( "clear", true, false, clear ),
    Descriptor::new( "connect", false, false, connect ),
    Descriptor::new( "delete", true, true, delete ),
    Descriptor::new( "deleteall", true, false, delete_all ),
    Descriptor::new( "disconnect", false, false, disconnect ),
    Descriptor::new( "echo", false, false, echo ),
    Descriptor::new( "help", false, false, help ),
    Descriptor::new( "load", true, false, load ),
    Descriptor::new( "map", false, false, map ),
    Descriptor::new( "next", true, false, next ),
    Descriptor::new( "pause", true, false, pause ),
    Descriptor::new( "play", true, true, play ),
    Descriptor::new( "previous", true, false, previous ),
    Descriptor::new( "quit", false, false, quit ),
    Descriptor::new( "random", true, false, random ),
    Descriptor::new( "repeat", true, false, repeat ),
    Descriptor::new( "save", true, false, save ),
    Descriptor::new( "seek", true, false, seek ),
    Descriptor::new( "set", false, false, set ),
    Descriptor::new( "single", true, false, single ),
    Descriptor::new( "stop", true, false, stop ),
    Descriptor::new( "unalias", false, false, unalias ),
    Descriptor::new( "unmap", false, false, unmap ),
    Descriptor::new( "volume", true, false, volume ),
    Descriptor::new( "window", false, false, window ),
    Descriptor::new( "wnext", false, false, window_next ),
    Descriptor::new( "wprevious", false, false, window_previous ),
];


/// Ex command line mode.
#[derive( Debug )]
pub struct CommandMode {
    input: LineInput,
    commands: BTreeMap<&'static str, Descriptor>,
    aliases: BTreeMap<String, String>,
    queue: VecDeque<QueuedCommand>,
    queueing: bool,
    completion: Option<Completion>,
    /// Aliases being expanded, innermost last
    expanding: Vec<String>,
}


impl Default for CommandMode {
    fn default() -> Self {
        Self::new()
    }
}


impl CommandMode {
    pub fn new() -> Self {
        let mut mode = Self {
            input: LineInput::new( ':' ),
            commands: BTreeMap::new(),
            aliases: BTreeMap::new(),
            queue: VecDeque::new(),
            queueing: false,
            completion: None,
            expanding: Vec::new(),
        };
        for descriptor in BUILTINS {
            mode.register( *descriptor );
        }
        mode
    }


    /// Adds a command, replacing one with the same name.
    pub fn register( &mut self, descriptor: Descriptor ) {
        self.commands.insert( descriptor.name, descriptor );
    }


    pub fn command_names( &self ) -> impl Iterator<Item = &'static str> + '_ {
        self.commands.keys().copied()
    }


    pub fn aliases( &self ) -> &BTreeMap<String, String> {
        &self.aliases
    }


    pub fn set_alias( &mut self, name: &str, body: &str ) {
        self.aliases.insert( name.to_string(), body.to_string() );
    }


    /// While queueing is on, connection commands issued without a connection
    /// wait for [`CommandMode::replay_queue`].
    pub fn set_queueing( &mut self, queueing: bool ) {
        self.queueing = queueing;
    }


    pub fn is_queueing( &self ) -> bool {
        self.queueing
    }


    pub fn queued( &self ) -> impl Iterator<Item = &QueuedCommand> {
        self.queue.iter()
    }


    /// Runs one full command line, reporting any error to the status line.
    ///
    /// @returns false when the program should quit
    pub fn execute_command( &mut self, line: &str, ctx: &mut Context ) -> bool {
        self.expanding.clear();
        match self.execute_line( line, ctx ) {
            Ok( running ) => running,
            Err( e ) => {
                ctx.status.error( e.to_string() );
                true
            }
        }
    }


    /// Runs every queued command in the order it was issued.
    pub fn replay_queue( &mut self, ctx: &mut Context ) -> bool {
        let queued: Vec<QueuedCommand> = self.queue.drain( .. ).collect();
        if !queued.is_empty() {
            tracing::info!( "Replaying {} queued command(s)", queued.len() );
        }

        for command in queued {
            let Some( descriptor ) = self.commands.get( command.name ).copied() else {
                continue;
            };
            match self.invoke( descriptor, &command.invocation, ctx ) {
                Ok( true ) => {}
                Ok( false ) => return false,
                Err( e ) => ctx.status.error( e.to_string() ),
            }
        }
        true
    }


    fn execute_line( &mut self, line: &str, ctx: &mut Context ) -> Result<bool, CommandError> {
        let ( first, rest ) = split_chain( line );
        if !self.execute_single( first, ctx )? {
            return Ok( false );
        }
        match rest {
            Some( rest ) => self.execute_line( rest, ctx ),
            None => Ok( true ),
        }
    }


    fn execute_single( &mut self, text: &str, ctx: &mut Context ) -> Result<bool, CommandError> {
        let parsed = CommandLine::parse( text );

        if parsed.command.is_empty() {
            if let Some( range ) = resolve_range( &parsed, ctx )? {
                if !ctx.screen.is_empty() {
                    ctx.screen.active_mut().scroll_to( range.last().saturating_sub( 1 ) );
                }
            }
            return Ok( true );
        }

        if let Some( body ) = self.aliases.get( &parsed.command ).cloned() {
            return self.expand_alias( &parsed, &body, ctx );
        }

        let descriptor = self.resolve( &parsed.command )?;
        let range = resolve_range( &parsed, ctx )?;
        let invocation = Invocation {
            arguments: unescape( &parsed.arguments ),
            forced: parsed.forced,
            count: range.map_or( 1, |r| r.count ),
            range,
        };

        if descriptor.needs_connection && self.queueing && !ctx.player.is_connected() {
            tracing::debug!( "Queueing {} until connected", descriptor.name );
            self.queue.push_back( QueuedCommand { name: descriptor.name, invocation } );
            return Ok( true );
        }

        self.invoke( descriptor, &invocation, ctx )
    }


    fn expand_alias( &mut self, parsed: &CommandLine, body: &str, ctx: &mut Context ) -> Result<bool, CommandError> {
        if self.expanding.contains( &parsed.command ) {
            return Err( CommandError::RecursiveAlias( parsed.command.clone() ) );
        }

        let line = format!( "{}{} {}", parsed.range, body, parsed.arguments );
        tracing::debug!( "Alias {} -> {}", parsed.command, line.trim_end() );

        self.expanding.push( parsed.command.clone() );
        let result = self.execute_line( line.trim_end(), ctx );
        self.expanding.pop();
        result
    }


    /// Finds a command by exact name, else by unique prefix.
    fn resolve( &self, name: &str ) -> Result<Descriptor, CommandError> {
        if let Some( descriptor ) = self.commands.get( name ) {
            return Ok( *descriptor );
        }

        let mut matches = self.commands
            .iter()
            .filter( |( command, _ )| command.starts_with( name ) )
            .map( |( _, descriptor )| *descriptor );

        match ( matches.next(), matches.next() ) {
            ( Some( descriptor ), None ) => Ok( descriptor ),
            ( None, _ ) => Err( CommandError::NotFound( name.to_string() ) ),
            _ => Err( CommandError::Ambiguous( name.to_string() ) ),
        }
    }


    fn invoke( &mut self, descriptor: Descriptor, invocation: &Invocation, ctx: &mut Context ) -> Result<bool, CommandError> {
        tracing::debug!( "Command {} {:?}", descriptor.name, invocation );

        let Some( range ) = invocation.range else {
            return ( descriptor.behaviour )( self, ctx, invocation );
        };
        if !descriptor.supports_range {
            return Err( CommandError::RangeNotAllowed );
        }
        if ctx.screen.is_empty() {
            return ( descriptor.behaviour )( self, ctx, invocation );
        }

        ctx.screen.active_mut().scroll_to( range.start.saturating_sub( 1 ) );
        let result = ( descriptor.behaviour )( self, ctx, invocation );
        if !ctx.screen.is_empty() {
            ctx.screen.active_mut().scroll_to( range.last().saturating_sub( 1 ) );
        }
        result
    }


    fn complete( &mut self, forward: bool, ctx: &Context ) {
        if self.completion.is_none() {
            let original = self.input.content().to_string();
            let candidates = self.candidates( &original, ctx );
            if candidates.is_empty() {
                return;
            }
            self.completion = Some( Completion { original, candidates, index: None } );
        }

        let Some( completion ) = self.completion.as_mut() else {
            return;
        };
        let last = completion.candidates.len() - 1;
        completion.index = match ( completion.index, forward ) {
            ( None, true ) => Some( 0 ),
            ( None, false ) => Some( last ),
            ( Some( i ), true ) if i < last => Some( i + 1 ),
            ( Some( i ), false ) if i > 0 => Some( i - 1 ),
            _ => None,
        };

        let text = match completion.index {
            Some( i ) => completion.candidates[ i ].clone(),
            None => completion.original.clone(),
        };
        self.input.set_content( &text );
    }


    /// Full-line completions for `text`, sorted.
    fn candidates( &self, text: &str, ctx: &Context ) -> Vec<String> {
        let range_len = text.len() - text.trim_start_matches( |c: char| c.is_ascii_digit() || ",.$%".contains( c ) ).len();
        let ( range, rest ) = text.split_at( range_len );

        let Some( command_end ) = rest.find( char::is_whitespace ) else {
            // Still typing the command name
            let mut names: Vec<String> = self.command_names()
                .map( str::to_string )
                .chain( self.aliases.keys().cloned() )
                .filter( |name| name.starts_with( rest ) )
                .map( |name| format!( "{}{}", range, name ) )
                .collect();
            names.sort();
            names.dedup();
            return names;
        };

        let token = rest[ ..command_end ].trim_end_matches( '!' );
        let Ok( descriptor ) = self.resolve( token ) else {
            return Vec::new();
        };

        let source: Vec<String> = match descriptor.name {
            "set" => Settings::NAMES.iter().map( |s| s.to_string() ).collect(),
            "load" | "save" => ctx.playlists.clone(),
            "add" => ctx.window_lines( LibraryWindow::NAME ),
            "alias" | "unalias" => self.aliases.keys().cloned().collect(),
            "window" => ctx.screen.names(),
            _ => return Vec::new(),
        };

        // `set` takes several options, everything else one argument
        let start = if descriptor.name == "set" {
            text.rfind( char::is_whitespace ).map_or( 0, |i| i + 1 )
        } else {
            let after = range_len + command_end;
            after + ( text.len() - after - text[ after.. ].trim_start().len() )
        };
        let ( head, partial ) = text.split_at( start );

        let mut candidates: Vec<String> = source
            .into_iter()
            .filter( |candidate| candidate.starts_with( partial ) )
            .map( |candidate| format!( "{}{}", head, candidate ) )
            .collect();
        candidates.sort();
        candidates.dedup();
        candidates
    }
}


fn resolve_range( parsed: &CommandLine, ctx: &Context ) -> Result<Option<Range>, CommandError> {
    let ( current, last ) = if ctx.screen.is_empty() {
        ( 1, 1 )
    } else {
        let window = ctx.screen.active();
        ( window.current_line() + 1, window.len().max( 1 ) )
    };
    parsed.range( current, last )
}


fn required<'a>( invocation: &'a Invocation, what: &str ) -> Result<&'a str, CommandError> {
    match invocation.arguments.as_str() {
        "" => Err( CommandError::NoParameter( what.to_string() ) ),
        arguments => Ok( arguments ),
    }
}


fn toggle(
    ctx: &mut Context,
    invocation: &Invocation,
    current: fn( &Status ) -> bool,
) -> Result<bool, CommandError> {
    let now = if invocation.arguments.is_empty() {
        current( &ctx.player.status()? )
    } else {
        false
    };
    parse_toggle( &invocation.arguments, now )
}


fn add( _mode: &mut CommandMode, ctx: &mut Context, invocation: &Invocation ) -> Result<bool, CommandError> {
    if !invocation.arguments.is_empty() {
        ctx.player.add( &invocation.arguments )?;
        return Ok( true );
    }
    let window = ctx.screen.active_mut();
    let line = window.current_line();
    window.add_line( ctx.player.as_mut(), line, invocation.count )?;
    Ok( true )
}


fn add_all( _mode: &mut CommandMode, ctx: &mut Context, _invocation: &Invocation ) -> Result<bool, CommandError> {
    ctx.screen.active_mut().add_all_lines( ctx.player.as_mut() )?;
    Ok( true )
}


fn alias( mode: &mut CommandMode, ctx: &mut Context, invocation: &Invocation ) -> Result<bool, CommandError> {
    let arguments = invocation.arguments.trim();
    if arguments.is_empty() {
        if mode.aliases.is_empty() {
            ctx.status.info( "No aliases defined" );
        } else {
            let listing: Vec<String> = mode.aliases
                .iter()
                .map( |( name, body )| format!( "{} = {}", name, body ) )
                .collect();
            ctx.status.info( listing.join( "  " ) );
        }
        return Ok( true );
    }

    let ( name, body ) = match arguments.split_once( char::is_whitespace ) {
        Some(( name, body )) => ( name, body.trim() ),
        None => {
            let body = mode.aliases
                .get( arguments )
                .ok_or_else( || CommandError::InvalidParameter( format!( "No such alias: {}", arguments ) ) )?;
            ctx.status.info( format!( "{} = {}", arguments, body ) );
            return Ok( true );
        }
    };

    if mode.aliases.contains_key( name ) && !invocation.forced {
        return Err( CommandError::AliasExists( name.to_string() ) );
    }
    mode.set_alias( name, body );
    Ok( true )
}


fn clear( _mode: &mut CommandMode, ctx: &mut Context, _invocation: &Invocation ) -> Result<bool, CommandError> {
    ctx.player.clear()?;
    if let Some( window ) = ctx.screen.window_mut( PlaylistWindow::NAME ) {
        window.update( Vec::new() );
    }
    Ok( true )
}


fn connect( mode: &mut CommandMode, ctx: &mut Context, invocation: &Invocation ) -> Result<bool, CommandError> {
    let mut parts = invocation.arguments.split_whitespace();
    let host = parts.next().unwrap_or( &ctx.settings.host ).to_string();
    let port = match parts.next() {
        Some( port ) => port
            .parse()
            .map_err( |_| CommandError::InvalidParameter( format!( "port {}", port ) ) )?,
        None => ctx.settings.port,
    };

    if ctx.player.is_connected() {
        ctx.player.disconnect();
    }
    ctx.player.connect( &host, port )?;
    tracing::info!( "Connected to {}:{}", host, port );
    ctx.status.info( format!( "Connected to {}:{}", host, port ) );

    mode.set_queueing( false );
    Ok( mode.replay_queue( ctx ) )
}


fn delete( _mode: &mut CommandMode, ctx: &mut Context, invocation: &Invocation ) -> Result<bool, CommandError> {
    let window = ctx.screen.active_mut();
    let line = window.current_line();
    window.delete_line( ctx.player.as_mut(), line, invocation.count )?;
    Ok( true )
}


fn delete_all( _mode: &mut CommandMode, ctx: &mut Context, _invocation: &Invocation ) -> Result<bool, CommandError> {
    ctx.screen.active_mut().delete_all_lines( ctx.player.as_mut() )?;
    Ok( true )
}


fn disconnect( _mode: &mut CommandMode, ctx: &mut Context, _invocation: &Invocation ) -> Result<bool, CommandError> {
    ctx.player.disconnect();
    ctx.playback = None;
    ctx.status.info( "Disconnected" );
    Ok( true )
}


fn echo( _mode: &mut CommandMode, ctx: &mut Context, invocation: &Invocation ) -> Result<bool, CommandError> {
    ctx.status.info( invocation.arguments.clone() );
    Ok( true )
}


fn help( _mode: &mut CommandMode, ctx: &mut Context, _invocation: &Invocation ) -> Result<bool, CommandError> {
    ctx.screen.select_named( HelpWindow::NAME )?;
    Ok( true )
}


fn load( _mode: &mut CommandMode, ctx: &mut Context, invocation: &Invocation ) -> Result<bool, CommandError> {
    let name = required( invocation, "playlist name" )?;
    ctx.player.load_playlist( name )?;
    Ok( true )
}


fn map( _mode: &mut CommandMode, ctx: &mut Context, invocation: &Invocation ) -> Result<bool, CommandError> {
    let arguments = invocation.arguments.trim();
    if arguments.is_empty() {
        if ctx.keymap.is_empty() {
            ctx.status.info( "No mappings defined" );
        } else {
            let listing: Vec<String> = ctx.keymap
                .bindings()
                .into_iter()
                .map( |( key, keys )| format!( "{} {}", key, format_keys( keys ) ) )
                .collect();
            ctx.status.info( listing.join( "  " ) );
        }
        return Ok( true );
    }

    let ( lhs, rhs ) = arguments
        .split_once( char::is_whitespace )
        .ok_or_else( || CommandError::NoParameter( "key sequence".into() ) )?;
    let key = single_key( lhs )?;
    let keys = parse_keys( rhs.trim() )?;
    ctx.keymap.map( key, keys );
    Ok( true )
}


fn single_key( notation: &str ) -> Result<Key, CommandError> {
    match parse_keys( notation )?.as_slice() {
        [ key ] => Ok( *key ),
        _ => Err( CommandError::InvalidParameter( format!( "Only single keys can be mapped: {}", notation ) ) ),
    }
}


fn next( _mode: &mut CommandMode, ctx: &mut Context, invocation: &Invocation ) -> Result<bool, CommandError> {
    for _ in 0..invocation.count {
        ctx.player.next()?;
    }
    Ok( true )
}


fn pause( _mode: &mut CommandMode, ctx: &mut Context, _invocation: &Invocation ) -> Result<bool, CommandError> {
    ctx.player.toggle_pause()?;
    Ok( true )
}


fn play( _mode: &mut CommandMode, ctx: &mut Context, invocation: &Invocation ) -> Result<bool, CommandError> {
    if !invocation.arguments.is_empty() {
        let position: usize = invocation.arguments
            .parse()
            .ok()
            .filter( |p| *p > 0 )
            .ok_or_else( || CommandError::InvalidParameter( invocation.arguments.clone() ) )?;
        ctx.player.play( position - 1 )?;
    } else if invocation.range.is_some() {
        ctx.screen.active_mut().confirm( ctx.player.as_mut() )?;
    } else {
        ctx.player.resume()?;
    }
    Ok( true )
}


fn previous( _mode: &mut CommandMode, ctx: &mut Context, invocation: &Invocation ) -> Result<bool, CommandError> {
    for _ in 0..invocation.count {
        ctx.player.previous()?;
    }
    Ok( true )
}


fn quit( _mode: &mut CommandMode, _ctx: &mut Context, _invocation: &Invocation ) -> Result<bool, CommandError> {
    Ok( false )
}


fn random( _mode: &mut CommandMode, ctx: &mut Context, invocation: &Invocation ) -> Result<bool, CommandError> {
    let on = toggle( ctx, invocation, |s| s.random )?;
    ctx.player.set_random( on )?;
    Ok( true )
}


fn repeat( _mode: &mut CommandMode, ctx: &mut Context, invocation: &Invocation ) -> Result<bool, CommandError> {
    let on = toggle( ctx, invocation, |s| s.repeat )?;
    ctx.player.set_repeat( on )?;
    Ok( true )
}


fn save( _mode: &mut CommandMode, ctx: &mut Context, invocation: &Invocation ) -> Result<bool, CommandError> {
    let name = required( invocation, "playlist name" )?;
    ctx.player.save_playlist( name )?;
    if !ctx.playlists.iter().any( |p| p == name ) {
        ctx.playlists.push( name.to_string() );
    }
    Ok( true )
}


fn seek( _mode: &mut CommandMode, ctx: &mut Context, invocation: &Invocation ) -> Result<bool, CommandError> {
    let position = parse_time( required( invocation, "time position" )? )?;
    ctx.player.seek( position )?;
    Ok( true )
}


fn set( _mode: &mut CommandMode, ctx: &mut Context, invocation: &Invocation ) -> Result<bool, CommandError> {
    let arguments = required( invocation, "option" )?;
    for expr in arguments.split_whitespace() {
        if let Some( value ) = ctx.settings.apply( expr )? {
            ctx.status.info( value );
        }
    }
    Ok( true )
}


fn single( _mode: &mut CommandMode, ctx: &mut Context, invocation: &Invocation ) -> Result<bool, CommandError> {
    let on = toggle( ctx, invocation, |s| s.single )?;
    ctx.player.set_single( on )?;
    Ok( true )
}


fn stop( _mode: &mut CommandMode, ctx: &mut Context, _invocation: &Invocation ) -> Result<bool, CommandError> {
    ctx.player.stop()?;
    Ok( true )
}


fn unalias( mode: &mut CommandMode, _ctx: &mut Context, invocation: &Invocation ) -> Result<bool, CommandError> {
    let name = required( invocation, "alias name" )?;
    mode.aliases
        .remove( name )
        .ok_or_else( || CommandError::InvalidParameter( format!( "No such alias: {}", name ) ) )?;
    Ok( true )
}


fn unmap( _mode: &mut CommandMode, ctx: &mut Context, invocation: &Invocation ) -> Result<bool, CommandError> {
    let notation = required( invocation, "key" )?;
    let key = single_key( notation )?;
    if !ctx.keymap.unmap( key ) {
        return Err( CommandError::InvalidParameter( format!( "No such mapping: {}", notation ) ) );
    }
    Ok( true )
}


fn volume( _mode: &mut CommandMode, ctx: &mut Context, invocation: &Invocation ) -> Result<bool, CommandError> {
    let argument = required( invocation, "volume" )?;
    let invalid = || CommandError::InvalidParameter( format!( "volume {}", argument ) );

    let level: i64 = if argument.starts_with( [ '+', '-' ] ) {
        let change: i64 = argument.parse().map_err( |_| invalid() )?;
        let current = ctx.player.status()?.volume.ok_or_else( invalid )?;
        ( i64::from( current ) + change ).clamp( 0, 100 )
    } else {
        argument.parse().map_err( |_| invalid() )?
    };

    if !( 0..=100 ).contains( &level ) {
        return Err( invalid() );
    }
    ctx.player.set_volume( level as u32 )?;
    Ok( true )
}


fn window( _mode: &mut CommandMode, ctx: &mut Context, invocation: &Invocation ) -> Result<bool, CommandError> {
    let target = required( invocation, "window" )?;
    match target.parse::<usize>() {
        Ok( number ) if number > 0 => ctx.screen.select_window( number - 1 )?,
        Ok( _ ) => return Err( CommandError::InvalidParameter( target.to_string() ) ),
        Err( _ ) => ctx.screen.select_named( target )?,
    }
    Ok( true )
}


fn window_next( _mode: &mut CommandMode, ctx: &mut Context, _invocation: &Invocation ) -> Result<bool, CommandError> {
    ctx.screen.next_window( 1 );
    Ok( true )
}


fn window_previous( _mode: &mut CommandMode, ctx: &mut Context, _invocation: &Invocation ) -> Result<bool, CommandError> {
    ctx.screen.previous_window( 1 );
    Ok( true )
}


impl Mode for CommandMode {
    fn name( &self ) -> ModeName {
        ModeName::Command
    }


    fn initialise( &mut self, _key: Key, ctx: &mut Context ) {
        self.input.reset();
        self.completion = None;
        ctx.status.clear();
    }


    fn finalise( &mut self, _key: Key, _ctx: &mut Context ) {
        self.input.clear();
        self.completion = None;
    }


    fn refresh( &self, _ctx: &Context ) -> Option<Prompt> {
        Some( self.input.to_prompt() )
    }


    fn handle( &mut self, key: Key, ctx: &mut Context ) -> bool {
        match key {
            Key::ENTER => {
                let line = self.input.content().to_string();
                self.input.push_history( &line );
                self.input.clear();
                self.completion = None;
                self.execute_command( &line, ctx )
            }
            Key::TAB => {
                self.complete( true, ctx );
                true
            }
            Key::BACK_TAB => {
                self.complete( false, ctx );
                true
            }
            Key::ESCAPE => true,
            _ => {
                self.completion = None;
                self.input.edit( key );
                true
            }
        }
    }


    fn causes_mode_to_start( &self, key: Key ) -> bool {
        key == Key::char( ':' )
    }


    fn causes_mode_to_end( &self, key: Key ) -> bool {
        matches!( key, Key::ENTER | Key::ESCAPE ) || ( key == Key::BACKSPACE && self.input.is_empty() )
    }
}


#[cfg( test )]
mod tests {
    use super::*;
    use crate::testing::{ context, playing, FakePlayer };


    fn run( mode: &mut CommandMode, ctx: &mut Context, line: &str ) -> bool {
        mode.execute_command( line, ctx )
    }


    fn error( ctx: &Context ) -> Option<String> {
        ctx.status.message().filter( |m| m.is_error ).map( |m| m.text.clone() )
    }


    fn player_command( _mode: &mut CommandMode, ctx: &mut Context, _invocation: &Invocation ) -> Result<bool, CommandError> {
        ctx.status.info( "player" );
        Ok( true )
    }


    fn forced_probe( _mode: &mut CommandMode, ctx: &mut Context, invocation: &Invocation ) -> Result<bool, CommandError> {
        ctx.status.info( format!( "forced={}", invocation.forced ) );
        Ok( true )
    }


    fn typed( mode: &mut CommandMode, ctx: &mut Context, text: &str ) {
        mode.initialise( Key::char( ':' ), ctx );
        for c in text.chars() {
            mode.handle( Key::char( c ), ctx );
        }
    }


    #[test]
    fn test_prefix_resolution() {
        let player = FakePlayer::connected();
        let mut ctx = context( &player );
        let mut mode = CommandMode::new();

        run( &mut mode, &mut ctx, "pl" );
        assert_eq!( player.calls(), vec![ "resume" ] );

        mode.register( Descriptor::new( "player", false, false, player_command ) );
        run( &mut mode, &mut ctx, "pla" );
        assert_eq!( error( &ctx ).as_deref(), Some( "Ambiguous command: pla" ) );
        run( &mut mode, &mut ctx, "play" );
        assert_eq!( player.calls(), vec![ "resume", "resume" ] );
        run( &mut mode, &mut ctx, "player" );
        assert_eq!( ctx.status.message().unwrap().text, "player" );
    }


    #[test]
    fn test_unknown_command() {
        let mut ctx = context( &FakePlayer::connected() );
        let mut mode = CommandMode::new();
        assert!( run( &mut mode, &mut ctx, "frobnicate" ) );
        assert_eq!( error( &ctx ).as_deref(), Some( "Not an editor command: frobnicate" ) );
    }


    #[test]
    fn test_range_not_allowed() {
        let player = FakePlayer::connected();
        let mut ctx = context( &player );
        let mut mode = CommandMode::new();
        run( &mut mode, &mut ctx, ":5,10next" );
        assert_eq!( error( &ctx ).as_deref(), Some( "No range allowed" ) );
        assert!( player.calls().is_empty() );
    }


    #[test]
    fn test_ranged_delete() {
        let player = FakePlayer::connected();
        let mut ctx = context( &player );
        let mut mode = CommandMode::new();
        run( &mut mode, &mut ctx, "10,5delete" );
        assert_eq!( player.calls(), vec![
            "delete 9", "delete 8", "delete 7", "delete 6", "delete 5", "delete 4",
        ] );
        assert_eq!( ctx.screen.active().len(), 94 );
        assert_eq!( ctx.screen.active().current_line(), 9 );
    }


    #[test]
    fn test_ranged_add_uses_count() {
        let player = FakePlayer::connected();
        let mut ctx = context( &player );
        let mut mode = CommandMode::new();
        run( &mut mode, &mut ctx, "2,3add" );
        assert_eq!( player.calls(), vec![ "add list line 1", "add list line 2" ] );
        run( &mut mode, &mut ctx, "add some/uri.flac" );
        assert_eq!( player.calls().last().unwrap(), "add some/uri.flac" );
    }


    #[test]
    fn test_range_only_moves_cursor() {
        let mut ctx = context( &FakePlayer::connected() );
        let mut mode = CommandMode::new();
        run( &mut mode, &mut ctx, "42" );
        assert_eq!( ctx.screen.active().current_line(), 41 );
        run( &mut mode, &mut ctx, "5,10" );
        assert_eq!( ctx.screen.active().current_line(), 9 );
        run( &mut mode, &mut ctx, "$" );
        assert_eq!( ctx.screen.active().current_line(), 99 );
        assert!( error( &ctx ).is_none() );
    }


    #[test]
    fn test_huge_range_is_clamped_to_the_window() {
        let player = FakePlayer::connected();
        let mut ctx = context( &player );
        let mut mode = CommandMode::new();

        assert!( run( &mut mode, &mut ctx, "18446744073709551615" ) );
        assert_eq!( ctx.screen.active().current_line(), 99 );

        assert!( run( &mut mode, &mut ctx, "98,18446744073709551615delete" ) );
        assert_eq!( player.calls(), vec![ "delete 99", "delete 98", "delete 97" ] );
        assert_eq!( ctx.screen.active().len(), 97 );
        assert_eq!( ctx.screen.active().current_line(), 96 );
        assert!( error( &ctx ).is_none() );
    }


    #[test]
    fn test_alias_expansion() {
        let player = FakePlayer::connected();
        let mut ctx = context( &player );
        let mut mode = CommandMode::new();
        run( &mut mode, &mut ctx, "alias vol volume" );
        run( &mut mode, &mut ctx, "alias dd delete" );
        run( &mut mode, &mut ctx, "vol 30" );
        run( &mut mode, &mut ctx, "1,2dd" );
        assert_eq!( player.calls(), vec![ "volume 30", "delete 1", "delete 0" ] );
    }


    #[test]
    fn test_alias_chain_body() {
        let player = FakePlayer::connected();
        let mut ctx = context( &player );
        let mut mode = CommandMode::new();
        run( &mut mode, &mut ctx, "alias skip next\\;stop" );
        assert_eq!( mode.aliases().get( "skip" ).map( String::as_str ), Some( "next;stop" ) );
        run( &mut mode, &mut ctx, "skip; pause" );
        assert_eq!( player.calls(), vec![ "next", "stop", "toggle_pause" ] );
    }


    #[test]
    fn test_recursive_alias_is_rejected() {
        let player = FakePlayer::connected();
        let mut ctx = context( &player );
        let mut mode = CommandMode::new();
        run( &mut mode, &mut ctx, "alias loop loop" );
        assert!( run( &mut mode, &mut ctx, "loop" ) );
        assert_eq!( error( &ctx ).as_deref(), Some( "Recursive alias: loop" ) );

        run( &mut mode, &mut ctx, "alias ping pong" );
        run( &mut mode, &mut ctx, "alias pong next\\;ping" );
        run( &mut mode, &mut ctx, "ping" );
        assert_eq!( error( &ctx ).as_deref(), Some( "Recursive alias: ping" ) );
        assert_eq!( player.calls(), vec![ "next" ] );

        // The same alias twice in a chain is not recursion
        run( &mut mode, &mut ctx, "alias n2 next" );
        run( &mut mode, &mut ctx, "n2;n2" );
        assert_eq!( player.calls(), vec![ "next", "next", "next" ] );
    }


    #[test]
    fn test_alias_overwrite_needs_force() {
        let mut ctx = context( &FakePlayer::connected() );
        let mut mode = CommandMode::new();
        run( &mut mode, &mut ctx, "alias np next" );
        run( &mut mode, &mut ctx, "alias np stop" );
        assert_eq!( error( &ctx ).as_deref(), Some( "Alias already exists: np (add ! to replace)" ) );
        run( &mut mode, &mut ctx, "alias! np stop" );
        assert_eq!( mode.aliases().get( "np" ).map( String::as_str ), Some( "stop" ) );
        run( &mut mode, &mut ctx, "unalias np" );
        assert!( mode.aliases().is_empty() );
        run( &mut mode, &mut ctx, "unalias np" );
        assert!( error( &ctx ).is_some() );
    }


    #[test]
    fn test_forced_is_scoped_to_one_invocation() {
        let mut ctx = context( &FakePlayer::connected() );
        let mut mode = CommandMode::new();
        mode.register( Descriptor::new( "probe", false, false, forced_probe ) );
        run( &mut mode, &mut ctx, "probe!" );
        assert_eq!( ctx.status.message().unwrap().text, "forced=true" );
        run( &mut mode, &mut ctx, "probe! ;probe" );
        assert_eq!( ctx.status.message().unwrap().text, "forced=false" );
    }


    #[test]
    fn test_escaped_semicolon_in_arguments() {
        let mut ctx = context( &FakePlayer::connected() );
        let mut mode = CommandMode::new();
        run( &mut mode, &mut ctx, "echo one\\;two" );
        assert_eq!( ctx.status.message().unwrap().text, "one;two" );
    }


    #[test]
    fn test_error_stops_chain() {
        let player = FakePlayer::connected();
        let mut ctx = context( &player );
        let mut mode = CommandMode::new();
        run( &mut mode, &mut ctx, "next;bogus;stop" );
        assert_eq!( player.calls(), vec![ "next" ] );
        assert!( error( &ctx ).is_some() );
    }


    #[test]
    fn test_queue_until_connected() {
        let player = FakePlayer::default();
        let mut ctx = context( &player );
        let mut mode = CommandMode::new();
        mode.set_queueing( true );

        run( &mut mode, &mut ctx, "volume 20" );
        run( &mut mode, &mut ctx, "echo waiting" );
        run( &mut mode, &mut ctx, "next" );
        assert_eq!( mode.queued().count(), 2 );
        assert!( error( &ctx ).is_none() );
        assert!( player.calls().is_empty() );

        run( &mut mode, &mut ctx, "connect" );
        assert_eq!( player.calls(), vec![ "connect localhost:6600", "volume 20", "next" ] );
        assert_eq!( mode.queued().count(), 0 );
        assert!( !mode.is_queueing() );
    }


    #[test]
    fn test_no_queue_reports_not_connected() {
        let mut ctx = context( &FakePlayer::default() );
        let mut mode = CommandMode::new();
        run( &mut mode, &mut ctx, "stop" );
        assert_eq!( error( &ctx ).as_deref(), Some( "Not connected" ) );
    }


    #[test]
    fn test_connect_arguments() {
        let player = FakePlayer::default();
        let mut ctx = context( &player );
        let mut mode = CommandMode::new();
        run( &mut mode, &mut ctx, "connect music.local 6601" );
        assert_eq!( player.calls(), vec![ "connect music.local:6601" ] );
        run( &mut mode, &mut ctx, "connect host port" );
        assert_eq!( error( &ctx ).as_deref(), Some( "Invalid parameter: port port" ) );
    }


    #[test]
    fn test_connect_failure_is_reported() {
        let mut ctx = context( &FakePlayer::refusing_connections() );
        let mut mode = CommandMode::new();
        run( &mut mode, &mut ctx, "connect" );
        assert_eq!( error( &ctx ).as_deref(), Some( "Failed to connect to localhost:6600: refused" ) );
    }


    #[test]
    fn test_playback_commands() {
        let player = FakePlayer::connected();
        player.set_status( playing() );
        let mut ctx = context( &player );
        let mut mode = CommandMode::new();
        for line in [ "play 3", "pause", "stop", "previous", "seek 1:30", "volume +10", "random", "repeat on", "single off", "save mix", "load mix", "clear" ] {
            run( &mut mode, &mut ctx, line );
        }
        assert!( error( &ctx ).is_none() );
        assert_eq!( player.calls(), vec![
            "play 2", "toggle_pause", "stop", "previous", "seek 90", "volume 60",
            "random true", "repeat true", "single false", "save mix", "load mix", "clear",
        ] );
        assert_eq!( ctx.playlists, vec![ "mix" ] );
    }


    #[test]
    fn test_invalid_parameters() {
        let mut ctx = context( &FakePlayer::connected() );
        let mut mode = CommandMode::new();
        run( &mut mode, &mut ctx, "volume 120" );
        assert_eq!( error( &ctx ).as_deref(), Some( "Invalid parameter: volume 120" ) );
        run( &mut mode, &mut ctx, "play 0" );
        assert_eq!( error( &ctx ).as_deref(), Some( "Invalid parameter: 0" ) );
        run( &mut mode, &mut ctx, "seek" );
        assert_eq!( error( &ctx ).as_deref(), Some( "Argument required: time position" ) );
        run( &mut mode, &mut ctx, "random maybe" );
        assert!( error( &ctx ).is_some() );
    }


    #[test]
    fn test_ranged_play_confirms_line() {
        let player = FakePlayer::connected();
        let mut ctx = context( &player );
        let mut mode = CommandMode::new();
        ctx.screen.select_named( "playlist" ).unwrap();
        ctx.screen.active_mut().update( ( 0..5 ).map( |i| format!( "song{}", i ) ).collect() );
        run( &mut mode, &mut ctx, "4play" );
        assert_eq!( player.calls(), vec![ "play 3" ] );
    }


    #[test]
    fn test_settings_and_windows() {
        let mut ctx = context( &FakePlayer::connected() );
        let mut mode = CommandMode::new();
        run( &mut mode, &mut ctx, "set noincsearch searchwrap!" );
        assert!( !ctx.settings.incsearch );
        assert!( !ctx.settings.searchwrap );
        run( &mut mode, &mut ctx, "set port?" );
        assert_eq!( ctx.status.message().unwrap().text, "port=6600" );

        run( &mut mode, &mut ctx, "window 3" );
        assert_eq!( ctx.screen.active().name(), "library" );
        run( &mut mode, &mut ctx, "wn" );
        assert_eq!( ctx.screen.active().name(), "help" );
        run( &mut mode, &mut ctx, "window playlist" );
        assert_eq!( ctx.screen.active().name(), "playlist" );
        run( &mut mode, &mut ctx, "help" );
        assert_eq!( ctx.screen.active().name(), "help" );
        run( &mut mode, &mut ctx, "window lyrics" );
        assert_eq!( error( &ctx ).as_deref(), Some( "No such window: lyrics" ) );
    }


    #[test]
    fn test_map_and_unmap() {
        let mut ctx = context( &FakePlayer::connected() );
        let mut mode = CommandMode::new();
        run( &mut mode, &mut ctx, "map Q :quit<CR>" );
        assert_eq!( ctx.keymap.get( Key::char( 'Q' ) ).unwrap().len(), 6 );
        run( &mut mode, &mut ctx, "map" );
        assert_eq!( ctx.status.message().unwrap().text, "Q :quit<CR>" );
        run( &mut mode, &mut ctx, "map ab x" );
        assert!( error( &ctx ).is_some() );
        run( &mut mode, &mut ctx, "unmap Q" );
        assert!( ctx.keymap.is_empty() );
        run( &mut mode, &mut ctx, "unmap Q" );
        assert_eq!( error( &ctx ).as_deref(), Some( "Invalid parameter: No such mapping: Q" ) );
        run( &mut mode, &mut ctx, "map W :echo a<b<CR>" );
        assert_eq!( ctx.keymap.get( Key::char( 'W' ) ).unwrap().len(), 10 );
    }


    #[test]
    fn test_quit_stops_the_program() {
        let mut ctx = context( &FakePlayer::connected() );
        let mut mode = CommandMode::new();
        assert!( !run( &mut mode, &mut ctx, "q" ) );
        assert!( !run( &mut mode, &mut ctx, "echo bye;quit" ) );
    }


    #[test]
    fn test_enter_executes_and_records_history() {
        let player = FakePlayer::connected();
        let mut ctx = context( &player );
        let mut mode = CommandMode::new();
        typed( &mut mode, &mut ctx, "next" );
        assert_eq!( mode.refresh( &ctx ).unwrap().text, ":next" );
        assert!( mode.handle( Key::ENTER, &mut ctx ) );
        assert_eq!( player.calls(), vec![ "next" ] );
        assert_eq!( mode.input.history(), [ "next".to_string() ] );
        assert!( mode.causes_mode_to_end( Key::BACKSPACE ) );
    }


    #[test]
    fn test_complete_command_names() {
        let mut ctx = context( &FakePlayer::connected() );
        let mut mode = CommandMode::new();
        typed( &mut mode, &mut ctx, "un" );
        mode.handle( Key::TAB, &mut ctx );
        assert_eq!( mode.input.content(), "unalias" );
        mode.handle( Key::TAB, &mut ctx );
        assert_eq!( mode.input.content(), "unmap" );
        mode.handle( Key::TAB, &mut ctx );
        assert_eq!( mode.input.content(), "un" );
        mode.handle( Key::BACK_TAB, &mut ctx );
        assert_eq!( mode.input.content(), "unmap" );
    }


    #[test]
    fn test_complete_keeps_range() {
        let mut ctx = context( &FakePlayer::connected() );
        let mut mode = CommandMode::new();
        typed( &mut mode, &mut ctx, "1,4dele" );
        mode.handle( Key::TAB, &mut ctx );
        assert_eq!( mode.input.content(), "1,4delete" );
        mode.handle( Key::TAB, &mut ctx );
        assert_eq!( mode.input.content(), "1,4deleteall" );
    }


    #[test]
    fn test_complete_arguments() {
        let mut ctx = context( &FakePlayer::connected() );
        ctx.playlists = vec![ "classics".into(), "chill".into(), "rock".into() ];
        let mut mode = CommandMode::new();

        typed( &mut mode, &mut ctx, "load c" );
        mode.handle( Key::TAB, &mut ctx );
        assert_eq!( mode.input.content(), "load chill" );
        mode.handle( Key::TAB, &mut ctx );
        assert_eq!( mode.input.content(), "load classics" );

        typed( &mut mode, &mut ctx, "set noincsearch i" );
        mode.handle( Key::TAB, &mut ctx );
        assert_eq!( mode.input.content(), "set noincsearch ignorecase" );

        typed( &mut mode, &mut ctx, "window pl" );
        mode.handle( Key::TAB, &mut ctx );
        assert_eq!( mode.input.content(), "window playlist" );

        // Editing starts a new completion
        typed( &mut mode, &mut ctx, "window " );
        mode.handle( Key::TAB, &mut ctx );
        assert_eq!( mode.input.content(), "window help" );
        mode.handle( Key::BACKSPACE, &mut ctx );
        assert_eq!( mode.input.content(), "window hel" );
        mode.handle( Key::TAB, &mut ctx );
        assert_eq!( mode.input.content(), "window help" );
        mode.handle( Key::TAB, &mut ctx );
        assert_eq!( mode.input.content(), "window hel" );
    }


    #[test]
    fn test_complete_library_paths() {
        let mut ctx = context( &FakePlayer::connected() );
        if let Some( library ) = ctx.screen.window_mut( "library" ) {
            library.update( vec![ "rock/a.flac".into(), "jazz/b.flac".into(), "rock/c.flac".into() ] );
        }
        let mut mode = CommandMode::new();
        typed( &mut mode, &mut ctx, "add rock/" );
        mode.handle( Key::TAB, &mut ctx );
        assert_eq!( mode.input.content(), "add rock/a.flac" );
        mode.handle( Key::TAB, &mut ctx );
        assert_eq!( mode.input.content(), "add rock/c.flac" );
    }
}

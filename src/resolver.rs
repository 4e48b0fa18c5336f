//! Name normalization and location mapping.
//!
//! Default normalization resolves `./` and `../` against the requesting unit's
//! directory and expands package names to their main unit. Plugin-prefixed names
//! are split here; normalizing their suffix with a plugin's own rules is done by the
//! context, which owns the plugins.

use std::collections::{ BTreeMap, HashMap };

use crate::config::{ Config, PathTrie, Settings };
use crate::{ LoadError, UnitId };



/// Whether `name` is an absolute location (`/x`, `scheme://x`) or already carries
/// the resource suffix. Such names are used verbatim.
pub(crate) fn is_verbatim( name: &str, suffix: &str ) -> bool {
	name.starts_with( '/' )
		|| is_url( name )
		|| ( !suffix.is_empty() && name.ends_with( suffix ))
}

fn is_url( name: &str ) -> bool {
	match name.find( ":/" ) {
		Some( index ) => index > 0 && name[ ..index ].bytes().all(| b | b.is_ascii_alphabetic() ),
		None => false,
	}
}

/// Resolves a plain (non plugin) name relative to `dir` without consulting packages.
pub(crate) fn resolve_relative( name: &str, dir: &str ) -> Result<String, LoadError> {

	if name == "." { return Ok( dir.trim_end_matches( '/' ).to_string() ) }

	if let Some( rest ) = name.strip_prefix( "./" ) {
		return Ok( format!( "{}{}", dir, rest ));
	}

	if name.starts_with( "../" ) {
		let mut segments = dir.split( '/' ).filter(| s | !s.is_empty() ).collect::<Vec<_>>();
		let mut rest = name ;
		while let Some( stripped ) = rest.strip_prefix( "../" ) {
			if segments.pop().is_none() {
				return Err( LoadError::InvalidName {
					name: name.to_string(),
					reason: "does not resolve within baseUrl",
				});
			}
			rest = stripped ;
		}
		segments.push( rest );
		return Ok( segments.join( "/" ));
	}

	Ok( name.to_string() )
}

/// Default normalization of a plain name: verbatim names pass through, relative
/// names resolve against `dir`, package names expand to their main unit.
pub(crate) fn normalize_plain( settings: &Settings, name: &str, dir: &str ) -> Result<String, LoadError> {
	if is_verbatim( name, &settings.suffix ) { return Ok( name.to_string() ) }
	let id = resolve_relative( name, dir )?;
	Ok( match settings.packages.get( &id ) {
		Some( main ) => format!( "{}/{}", id, main ),
		None => id,
	})
}

/// Maps a normalized id to the location its resource is fetched from.
pub(crate) fn uri( settings: &Settings, id: &str, suffix: &str ) -> String {

	if is_verbatim( id, &settings.suffix ) { return id.to_string() }

	match settings.paths.map( id ) {
		Some( mapped ) if mapped.starts_with( '/' ) || is_url( &mapped ) => format!( "{}{}", mapped, suffix ),
		Some( mapped ) => format!( "{}{}{}", settings.base_url, mapped, suffix ),
		None => format!( "{}{}{}", settings.base_url, id, suffix ),
	}
}

/// Applies `config` on top of `settings`.
pub(crate) fn apply( settings: &mut Settings, config: &Config ) -> Result<(), LoadError> {

	if let Some( base_url ) = &config.base_url {
		settings.base_url = match base_url.is_empty() || base_url.ends_with( '/' ) {
			true => base_url.clone(),
			false => format!( "{}/", base_url ),
		};
	}

	if let Some( suffix ) = &config.suffix { settings.suffix = suffix.clone() }
	if let Some( enforce ) = config.enforce_define { settings.enforce_define = enforce }
	settings.enforce_acyclic = config.enforce_acyclic ;

	if let Some( paths ) = &config.paths {
		settings.paths = PathTrie::default();
		paths.iter().for_each(|( prefix, location )| settings.paths.insert( prefix, location.as_str() ));
	}

	if let Some( packages ) = &config.packages {
		settings.packages.clear();
		for package in packages {
			if let Some( location ) = package.location() {
				settings.paths.insert( package.name(), location );
			}
			let name = resolve_relative( package.name(), "" )?;
			settings.packages.insert( name, package.main().to_string() );
		}
	}

	if let Some( blobs ) = &config.config {
		settings.unit_config = by_unit( settings, blobs )?;
	}

	if let Some( shim ) = &config.shim {
		settings.shim = by_unit( settings, shim )?;
	}

	Ok(())
}

/// Re-keys a table given by unit name by normalized unit id.
fn by_unit<T: Clone>( settings: &Settings, table: &BTreeMap<String, T> ) -> Result<HashMap<UnitId, T>, LoadError> {
	table.iter()
		.map(|( name, entry )| Ok(( UnitId::new( normalize_plain( settings, name, "" )? ), entry.clone() )))
		.collect()
}

#[cfg( test )]
mod tests {

	use super::* ;

	fn settings( config: &Config ) -> Settings {
		let mut settings = Settings::default();
		apply( &mut settings, config ).expect( "valid configuration" );
		settings
	}

	#[test]
	fn relative_names_resolve_against_the_directory() {
		assert_eq!( resolve_relative( "./b", "a/" ).ok().as_deref(), Some( "a/b" ));
		assert_eq!( resolve_relative( "../../c", "a/b/" ).ok().as_deref(), Some( "c" ));
		assert_eq!( resolve_relative( ".", "a/b/" ).ok().as_deref(), Some( "a/b" ));
		assert_eq!( resolve_relative( "x/y", "a/" ).ok().as_deref(), Some( "x/y" ));
		assert!( matches!( resolve_relative( "../../c", "a/" ), Err( LoadError::InvalidName { .. })));
	}

	#[test]
	fn verbatim_names() {
		assert!( is_verbatim( "/abs", ".js" ));
		assert!( is_verbatim( "http://host/x", ".js" ));
		assert!( is_verbatim( "lib/x.js", ".js" ));
		assert!( !is_verbatim( "lib/x", ".js" ));
		assert!( !is_verbatim( "lib/x.js", "" ));
		assert!( !is_verbatim( "weird:name", ".js" ));
	}

	#[test]
	fn longest_path_prefix_wins() {
		let settings = settings( &Config::new()
			.base_url( "base" )
			.path( "a", "x" )
			.path( "a/b", "/y" )
		);
		assert_eq!( uri( &settings, "a/c", ".js" ), "base/x/c.js" );
		assert_eq!( uri( &settings, "a/b/c", ".js" ), "/y/c.js" );
		assert_eq!( uri( &settings, "ab/c", ".js" ), "base/ab/c.js" );
		assert_eq!( uri( &settings, "a", "" ), "base/x" );
	}

	#[test]
	fn empty_paths_replace_configured_paths() {
		let mut settings = settings( &Config::new().path( "a", "x" ).enforce_acyclic( true ));
		let cleared: Config = serde_json::from_str( r#"{ "paths": {} }"# ).expect( "valid json" );
		apply( &mut settings, &cleared ).expect( "valid configuration" );
		assert_eq!( uri( &settings, "a/c", ".js" ), "a/c.js" );
		assert!( !settings.enforce_acyclic );
	}

	#[test]
	fn omitted_paths_are_kept() {
		let mut settings = settings( &Config::new().path( "a", "x" ));
		apply( &mut settings, &Config::new().base_url( "base" )).expect( "valid configuration" );
		assert_eq!( uri( &settings, "a/c", ".js" ), "base/x/c.js" );
	}

	#[test]
	fn unit_config_keys_are_normalized() {
		let settings = settings( &Config::new()
			.package( "pkg" )
			.unit_config( "./pkg", serde_json::json!( 1 ))
		);
		assert_eq!( settings.unit_config.get( "pkg/main" ), Some( &serde_json::json!( 1 )));
	}

	#[test]
	fn shim_keys_are_normalized() {
		let settings = settings( &Config::new()
			.package( "legacy" )
			.shim( "./legacy", crate::ShimSpec::new([ "base" ]))
		);
		assert_eq!( settings.shim.get( "legacy/main" ).map(| shim | shim.deps.clone() ), Some( vec![ "base".to_string() ]));
	}

}

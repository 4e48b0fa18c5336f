use unit_link::{ Config, Context, Definition, LoadError, MemoryLoader, Value };
use crate::fixture_units::Log ;

#[test]
fn normalization_of_top_level_names() {

	let context = Context::new( MemoryLoader::new() );

	for ( name, expected ) in [
		( "a/b", "a/b" ),
		( "./a/b", "a/b" ),
		( "/abs/file", "/abs/file" ),
		( "https://cdn.example.com/lib", "https://cdn.example.com/lib" ),
		( "lib/legacy.js", "lib/legacy.js" ),
	] {
		assert_eq!( context.normalize( name ).expect( "valid name" ), expected );
	}

	assert_load_error!( context.normalize( "../escape" ), LoadError::InvalidName { .. });

}

#[test]
fn normalization_is_idempotent() {

	let context = Context::with_config( MemoryLoader::new(), &Config::new().package( "ui" ))
		.expect( "valid configuration" );

	for name in [ "a/b", "./x", "ui", "ui/button", "/abs/file", "p!./y", "p!ui" ] {
		let id = context.normalize( name ).expect( "valid name" );
		assert_eq!( context.normalize( id.as_str() ).expect( "valid name" ), id, "'{}' normalized to '{}'", name, id );
	}

}

#[test]
fn normalization_relative_to_a_unit() {

	let log = Log::new();
	let context = Context::new( MemoryLoader::new() );

	context.define( "app/views/list", Vec::<String>::new(), {
		let log = log.clone();
		Definition::factory( move | scope | {
			for name in [ "../models/user", "./row", "shared/util" ] {
				log.push( scope.normalize( name )?.as_str() );
			}
			log.push( scope.to_url( "./row" )? );
			Ok( Value::unit() )
		})
	}).expect( "definition accepted" );

	assert_eq!( log.events(), [ "app/models/user", "app/views/row", "shared/util", "app/views/row" ]);

}

use std::collections::HashMap ;
use unit_link::{ Context, LoadError, LoadRequest, Loader, Resource, UnitId };
use crate::fixture_units::{ Log, Slot, recording, text };

/// Serves whitespace separated dependency lists as source text.
struct SourceLoader {
	sources: HashMap<&'static str, &'static str>,
	log: Log,
}

impl Loader for SourceLoader {

	fn exists( &self, id: &UnitId, _uri: &str ) -> bool { self.sources.contains_key( id.as_str() ) }

	fn load( &self, request: LoadRequest ) {
		match self.sources.get( request.id().as_str() ).copied() {
			Some( source ) => request.from_text( source ),
			None => request.not_found(),
		}
	}

	fn load_text( &self, request: LoadRequest, text: String ) {
		let deps = text.split_whitespace().map( String::from ).collect::<Vec<_>>();
		request.define( Resource::new( deps, recording( &self.log )));
	}

}

struct TextOnlyLoader ;

impl Loader for TextOnlyLoader {
	fn load( &self, request: LoadRequest ) { request.from_text( "" ) }
}

#[test]
fn source_text_is_parsed_by_the_loader() {

	let log = Log::new();
	let context = Context::new( SourceLoader {
		sources: HashMap::from([
			( "main", "./lib/a lib/b" ),
			( "lib/a", "" ),
			( "lib/b", "./a" ),
		]),
		log: log.clone(),
	});

	let slot = Slot::new();
	context.require_one( "main", slot.sink() );

	match slot.result() {
		Ok( value ) => assert_eq!( text( &value ), "main(lib/a(), lib/b(lib/a()))" ),
		Err( err ) => panic!( "Unexpected error: {}", err ),
	}
	assert_eq!( log.events(), [ "lib/a", "lib/b", "main" ]);

}

#[test]
fn source_text_without_a_parser() {

	let context = Context::new( TextOnlyLoader );
	let slot = Slot::new();
	context.require_one( "anything", slot.sink() );
	assert_load_error!( slot.result(), LoadError::LoadFailure { .. });

}

use std::rc::Rc ;
use unit_link::{ Config, Context, Contexts, Definition, MemoryLoader };
use crate::fixture_units::Log ;

fixtures! {
	units = [
		"shared" => [],
	];
}

#[test]
fn contexts_are_isolated() {

	let log = Log::new();
	let loader = Rc::new( fixtures::loader( &log ));
	let mut contexts = Contexts::new( Rc::clone( &loader ));

	let admin = contexts.config( &Config::new().context( "admin" ).base_url( "admin" )).expect( "valid configuration" );
	let site = contexts.config( &Config::new().base_url( "site" )).expect( "valid configuration" );

	assert_eq!( admin.name(), "admin" );
	assert_eq!( site.name(), "" );
	assert!( site.ptr_eq( &contexts.default_context() ));
	assert_eq!( contexts.names(), [ "", "admin" ]);

	admin.define( "a", Vec::<String>::new(), Definition::value( 1 )).expect( "definition accepted" );
	site.define( "a", Vec::<String>::new(), Definition::value( 2 )).expect( "definition accepted" );

	admin.require_one( "shared", | _ | {});
	site.require_one( "shared", | _ | {});
	assert_eq!( log.count( "shared" ), 2 );
	assert_eq!( loader.dispatched(), [ "shared", "shared" ]);

	let again = contexts.config( &Config::new().context( "admin" ).enforce_define( true )).expect( "valid configuration" );
	assert!( again.ptr_eq( &admin ));
	assert_eq!( again.base_url(), "admin/" );

	assert!( contexts.remove( "admin" ).is_some() );
	assert!( contexts.get( "admin" ).is_none() );

}

#[test]
fn contexts_named_by_their_config() {

	let context = Context::with_config( MemoryLoader::new(), &Config::new().context( "tools" )).expect( "valid configuration" );
	assert_eq!( context.name(), "tools" );
	assert_eq!( Context::new( MemoryLoader::new() ).name(), "" );

}

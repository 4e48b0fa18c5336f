use test_macros::dep_graph ;
use unit_link::{ Context, MemoryLoader, UnitState };
use crate::fixture_units::{ Log, recording };

#[test]
fn pause_order_follows_dependencies_then_declaration() {

	crate::fixture_units::init_tracing();
	let log = Log::new();
	let context = Context::new( MemoryLoader::new() );

	context.pause();
	for ( id, deps ) in dep_graph!( "1d2 2 3" ) {
		context.define( id, deps.iter().copied(), recording( &log )).expect( "definition accepted" );
	}

	assert!( log.events().is_empty() );
	assert_eq!( context.pending_definitions(), [ "m1", "m2", "m3" ]);
	assert_eq!( context.state( "m1" ), Some( UnitState::LoadedWaiting ));

	context.unpause().expect( "balanced unpause" );

	assert_eq!( log.events(), [ "m2", "m1", "m3" ]);
	assert!( context.pending_definitions().is_empty() );
	assert!( !context.is_paused() );

}

#[test]
fn pause_order_holds_back_loads() {

	let log = Log::new();
	let loader = std::rc::Rc::new( MemoryLoader::new() );
	let context = Context::new( std::rc::Rc::clone( &loader ));

	context.pause();
	context.define( "app", [ "lib" ], recording( &log )).expect( "definition accepted" );
	assert!( loader.dispatched().is_empty() );
	assert_eq!( context.state( "lib" ), Some( UnitState::Pending ));

	// Defined before the pause ends, so the loader is never asked.
	context.define( "lib", Vec::<String>::new(), recording( &log )).expect( "definition accepted" );
	context.unpause().expect( "balanced unpause" );

	assert!( loader.dispatched().is_empty() );
	assert_eq!( log.events(), [ "lib", "app" ]);

}

#[test]
fn pause_order_of_a_deeper_graph() {

	let log = Log::new();
	let context = Context::new( MemoryLoader::new() );

	crate::fixture_units::define_paused( &context, &dep_graph!( "1d4 2d3 3 4d3,5 5" ), &log )
		.expect( "definitions accepted" );

	assert_eq!( log.events(), [ "m3", "m2", "m5", "m4", "m1" ]);

}

use test_macros::dep_graph ;
use unit_link::{ Context, LoadError, MemoryLoader };
use crate::fixture_units::{ Log, recording };

#[test]
fn nested_pause_flushes_at_the_outermost_unpause() {

	let log = Log::new();
	let context = Context::new( MemoryLoader::new() );

	context.pause();
	context.pause();
	assert_eq!( context.pause_depth(), 2 );

	for ( id, deps ) in dep_graph!( "1d2 2" ) {
		context.define( id, deps.iter().copied(), recording( &log )).expect( "definition accepted" );
	}

	context.unpause().expect( "balanced unpause" );
	assert!( context.is_paused() );
	assert!( log.events().is_empty() );

	context.unpause().expect( "balanced unpause" );
	assert!( !context.is_paused() );
	assert_eq!( log.events(), [ "m2", "m1" ]);

}

#[test]
fn nested_pause_unbalanced_unpause() {

	let context = Context::new( MemoryLoader::new() );
	assert_load_error!( context.unpause(), LoadError::ReentrancyViolation( _ ));

	context.pause();
	context.unpause().expect( "balanced unpause" );
	assert_load_error!( context.unpause(), LoadError::ReentrancyViolation( _ ));
	assert_eq!( context.pause_depth(), 0 );

}

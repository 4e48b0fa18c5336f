use std::time::{ Duration, Instant };
use unit_link::{ Context, Definition, MemoryLoader, Value };
use crate::fixture_units::Log ;

const UNITS: usize = 8000 ;

fn logging( log: &Log ) -> Definition {
	let log = log.clone();
	Definition::factory( move | scope | {
		log.push( scope.id().as_str() );
		Ok( Value::unit() )
	})
}

#[test]
fn long_chain_unpauses_in_dependency_order() {

	let log = Log::new();
	let context = Context::new( MemoryLoader::new() );
	let ids = ( 0..UNITS ).map(| index | format!( "u{}", index )).collect::<Vec<_>>();

	tracing::subscriber::with_default( tracing::subscriber::NoSubscriber::default(), || {

		context.pause();
		for ( index, id ) in ids.iter().enumerate() {
			context.define( id, ids.get( index + 1 ).cloned(), logging( &log )).expect( "definition accepted" );
		}

		let started = Instant::now();
		context.unpause().expect( "balanced unpause" );
		let elapsed = started.elapsed();
		assert!( elapsed < Duration::from_secs( 10 ), "unpausing {} chained units took {:?}", UNITS, elapsed );

	});

	let events = log.events();
	assert_eq!( events.len(), UNITS );
	assert_eq!( events.first(), ids.last() );
	assert_eq!( events.last(), ids.first() );

}

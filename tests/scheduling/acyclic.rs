use test_macros::dep_graph ;
use unit_link::{ Config, Context, LoadError, MemoryLoader, UnitState };
use crate::fixture_units::{ Log, Slot, define_paused, recording };

fn acyclic_context() -> Context {
	Context::with_config( MemoryLoader::new(), &Config::new().enforce_acyclic( true ))
		.expect( "valid configuration" )
}

#[test]
fn acyclic_rejects_cycles() {

	let log = Log::new();
	let context = acyclic_context();

	context.pause();
	for ( id, deps ) in dep_graph!( "1d2 2d3 3d1" ) {
		context.define( id, deps.iter().copied(), recording( &log )).expect( "definition accepted" );
	}
	let slot = Slot::new();
	context.require_one( "m1", slot.sink() );
	context.unpause().expect( "balanced unpause" );

	match slot.result() {
		Err( err @ LoadError::CycleDetected( _ )) => {
			assert_eq!( err.unit().map(| id | id.as_str() ), Some( "m3" ));
			match err {
				LoadError::CycleDetected( cycle ) => assert_eq!( cycle, [ "m1", "m2", "m3" ]),
				_ => unreachable!(),
			}
		},
		Err( err ) => panic!( "Unexpected error: {}", err ),
		Ok( _ ) => panic!( "Expected failure" ),
	}

	assert!( log.events().is_empty() );
	for id in [ "m1", "m2", "m3" ] {
		assert_eq!( context.state( id ), Some( UnitState::Error ));
	}

}

#[test]
fn acyclic_accepts_dags() {

	let log = Log::new();
	let context = acyclic_context();
	define_paused( &context, &dep_graph!( "1d2,3 2d3 3" ), &log ).expect( "definitions accepted" );
	assert_eq!( log.events(), [ "m3", "m2", "m1" ]);

}

#[test]
fn acyclic_leaves_unrelated_units_alone() {

	let log = Log::new();
	let context = acyclic_context();
	define_paused( &context, &dep_graph!( "1d2 2d1 3" ), &log ).expect( "definitions accepted" );

	assert_eq!( log.events(), [ "m3" ]);
	assert_load_error!( context.try_require( "m1" ), LoadError::CycleDetected( _ ));
	assert_eq!( context.state( "m3" ), Some( UnitState::Ready ));

}

#[test]
fn acyclic_is_reset_by_later_config() {

	let log = Log::new();
	let context = acyclic_context();
	context.config( &Config::new().base_url( "app" )).expect( "valid configuration" );

	define_paused( &context, &dep_graph!( "1d2 2d1" ), &log ).expect( "definitions accepted" );
	assert_eq!( log.events(), [ "m2", "m1" ]);

}

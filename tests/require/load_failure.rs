use unit_link::{ Context, LoadError, MemoryLoader, Resource, UnitState, Value };
use crate::fixture_units::{ Log, Slot, producer };

fn loader( log: &Log ) -> MemoryLoader {
	MemoryLoader::new()
		.with( "broken", | _ | Err( "disk on fire".into() ))
		.with( "app", producer( log, &[ "broken" ]))
		.with( "other", producer( log, &[] ))
		.with( "throws", | _ | Ok( Resource::factory( Vec::<String>::new(), | _ | Err( "factory gave up".into() ))))
		.with( "on-throws", producer( log, &[ "throws" ]))
		.with( "answer", | _ | Ok( Resource::value( Value::new( 42_u32 ))))
}

#[test]
fn load_failure_reports_the_reason() {

	let context = Context::new( loader( &Log::new() ));
	let slot = Slot::new();
	context.require_one( "broken", slot.sink() );

	match slot.result() {
		Err( err @ LoadError::LoadFailure { .. }) => {
			assert_eq!( err.unit().map( | id | id.as_str() ), Some( "broken" ));
			assert!( err.to_string().contains( "disk on fire" ), "{}", err );
		},
		Err( err ) => panic!( "Unexpected error: {}", err ),
		Ok( _ ) => panic!( "Expected failure" ),
	}
	assert_eq!( context.state( "broken" ), Some( UnitState::Error ));

}

#[test]
fn load_failure_cascades_to_dependants_only() {

	let log = Log::new();
	let context = Context::new( loader( &log ));

	context.require_one( "other", | _ | {});
	assert_eq!( context.state( "other" ), Some( UnitState::Ready ));

	let slot = Slot::new();
	context.require_one( "app", slot.sink() );

	match slot.result() {
		Err( err @ LoadError::LoadFailure { .. }) => assert_eq!( err.unit().map( | id | id.as_str() ), Some( "broken" )),
		Err( err ) => panic!( "Unexpected error: {}", err ),
		Ok( _ ) => panic!( "Expected failure" ),
	}
	assert_eq!( context.state( "app" ), Some( UnitState::Error ));
	assert_eq!( context.state( "other" ), Some( UnitState::Ready ));
	assert_eq!( log.events(), [ "other" ]);

	let again = Slot::new();
	context.require_one( "app", again.sink() );
	assert_load_error!( again.result(), LoadError::LoadFailure { .. });

}

#[test]
fn load_failure_of_a_definition() {

	let log = Log::new();
	let context = Context::new( loader( &log ));

	let slot = Slot::new();
	context.require_one( "on-throws", slot.sink() );

	match slot.result() {
		Err( err @ LoadError::DefinitionFailure { .. }) => {
			assert_eq!( err.unit().map( | id | id.as_str() ), Some( "throws" ));
			assert!( err.to_string().contains( "factory gave up" ), "{}", err );
		},
		Err( err ) => panic!( "Unexpected error: {}", err ),
		Ok( _ ) => panic!( "Expected failure" ),
	}
	assert!( context.error( "on-throws" ).is_some() );
	assert!( log.events().is_empty() );

}

#[test]
fn load_failure_leaves_values_untouched() {

	let context = Context::new( loader( &Log::new() ));
	match context.try_require( "answer" ) {
		Ok( Some( value )) => assert_eq!( value.downcast_ref::<u32>(), Some( &42 )),
		value => panic!( "Expected a ready value, found: {:?}", value ),
	}

}

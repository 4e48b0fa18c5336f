use unit_link::{ Context, LoadError, MemoryLoader, Resource, UnitState, Value };
use crate::fixture_units::Slot ;

fn loader() -> MemoryLoader {
	MemoryLoader::new()
		.with( "plain", | _ | Ok( Resource::value( Value::new( 5_u8 ))))
		.with( "broken", | _ | Err( "unreadable".into() ))
}

#[test]
fn not_a_plugin_fails_pending_resources() {

	let context = Context::new( loader() );

	let slot = Slot::new();
	context.require_one( "plain!x", slot.sink() );

	assert_load_error!( slot.result(), LoadError::NotAPlugin( id ) if id == "plain" );
	assert_eq!( context.state( "plain" ), Some( UnitState::Ready ));
	assert_eq!( context.state( "plain!x" ), Some( UnitState::Error ));

}

#[test]
fn not_a_plugin_rejected_up_front() {

	let context = Context::new( loader() );
	context.require_one( "plain", | _ | {});

	let slot = Slot::new();
	context.require_one( "plain!y", slot.sink() );
	assert_load_error!( slot.result(), LoadError::NotAPlugin( _ ));
	assert_eq!( context.state( "plain!y" ), None );

}

#[test]
fn not_a_plugin_because_it_failed_to_load() {

	let context = Context::new( loader() );

	let slot = Slot::new();
	context.require_one( "broken!z", slot.sink() );
	match slot.result() {
		Err( err @ LoadError::LoadFailure { .. }) => assert_eq!( err.unit().map(| id | id.as_str() ), Some( "broken" )),
		Err( err ) => panic!( "Unexpected error: {}", err ),
		Ok( _ ) => panic!( "Expected failure" ),
	}
	assert_eq!( context.state( "broken!z" ), Some( UnitState::Error ));

}

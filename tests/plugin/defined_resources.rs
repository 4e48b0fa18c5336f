use std::rc::Rc ;
use unit_link::{ Completion, Context, Definition, LoadError, MemoryLoader, Normalizer, Plugin, Requirer, Resource, UnitState, Value };
use crate::fixture_units::{ Log, Slot, text };

/// Lowercases resource names and loads them as their own text.
struct Lower { loads: Log }

impl Plugin for Lower {

	fn normalize( &self, name: &str, normalize: Normalizer<'_> ) -> Result<String, LoadError> {
		normalize( name ).map(| name | name.to_lowercase() )
	}

	fn load( &self, name: &str, _: &Requirer, onload: Completion, _: Option<&serde_json::Value> ) {
		self.loads.push( name );
		onload.value( Value::new( name.to_string() ));
	}

}

fn loader( loads: &Log ) -> MemoryLoader {
	let loads = loads.clone();
	MemoryLoader::deferred()
		.with( "lower", move | _ | Ok( Resource::value( Value::plugin( Lower { loads: loads.clone() }))))
		.with( "plain", | _ | Ok( Resource::value( Value::new( 5_u8 ))))
}

#[test]
fn defined_resources_wait_for_their_plugin() {

	let loads = Log::new();
	let loader = Rc::new( loader( &loads ));
	let context = Context::new( Rc::clone( &loader ));

	context.define( "lower!Intro", Vec::<String>::new(), Definition::value( "inline".to_string() ))
		.expect( "definition accepted" );
	assert_eq!( loader.dispatched(), [ "lower" ]);
	assert_eq!( context.state( "lower!Intro" ), Some( UnitState::LoadedWaiting ));
	assert!( context.export( "lower!Intro" ).is_some_and(| export | export.get().is_none() ));

	loader.flush();

	assert_eq!( context.unit_ids(), [ "lower", "lower!intro" ]);
	assert_eq!( context.state( "lower!intro" ), Some( UnitState::Ready ));
	let slot = Slot::new();
	context.require_one( "lower!INTRO", slot.sink() );
	assert_eq!( text( &slot.result().expect( "defined resource is ready" )), "inline" );
	assert!( loads.events().is_empty() );

}

#[test]
fn defined_resources_complete_pending_requests() {

	let loads = Log::new();
	let loader = Rc::new( loader( &loads ));
	let context = Context::new( Rc::clone( &loader ));

	let slot = Slot::new();
	context.require_one( "lower!readme", slot.sink() );
	context.define( "lower!README", Vec::<String>::new(), Definition::value( "inline".to_string() ))
		.expect( "definition accepted" );
	assert!( !slot.is_settled() );

	loader.flush();

	assert_eq!( text( &slot.result().expect( "defined resource loads" )), "inline" );
	assert_eq!( context.unit_ids(), [ "lower", "lower!readme" ]);
	assert!( loads.events().is_empty() );

}

#[test]
fn defined_resources_fail_with_their_plugin() {

	let loads = Log::new();
	let loader = Rc::new( loader( &loads ));
	let context = Context::new( Rc::clone( &loader ));

	context.define( "plain!x", Vec::<String>::new(), Definition::value( 1 )).expect( "definition accepted" );
	loader.flush();

	assert_load_error!( context.try_require( "plain!x" ), LoadError::NotAPlugin( id ) if id == "plain" );
	assert_eq!( context.state( "plain!x" ), Some( UnitState::Error ));

}

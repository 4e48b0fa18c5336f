use std::rc::Rc ;
use unit_link::{ Context, MemoryLoader, Resource, Value };
use crate::fixture_units::{ Log, Slot };

fn loader( log: &Log, hooks: &Log ) -> MemoryLoader {
	let ( log, hooks ) = ( log.clone(), hooks.clone() );
	MemoryLoader::new().with( "svc", move | _ | {
		let ( log, hooks ) = ( log.clone(), hooks.clone() );
		Ok( Resource::factory( Vec::<String>::new(), move | scope | {
			log.push( "svc" );
			let lifecycle = log.count( "svc" );
			for hook in [ "first", "second" ] {
				let hooks = hooks.clone();
				scope.on_unload( move | id | hooks.push( format!( "{} {} #{}", id, hook, lifecycle )));
			}
			Ok( Value::new( lifecycle ))
		}))
	})
}

fn lifecycle_of( value: &Value ) -> usize { value.downcast_ref::<usize>().copied().unwrap_or_default() }

#[test]
fn unload_rebuild_runs_hooks_once_in_reverse() {

	crate::fixture_units::init_tracing();
	let ( log, hooks ) = ( Log::new(), Log::new() );
	let loader = Rc::new( loader( &log, &hooks ));
	let context = Context::new( Rc::clone( &loader ));

	let slot = Slot::new();
	context.require_one( "svc", slot.sink() );
	let first = slot.result().expect( "svc loads" );
	assert_eq!( lifecycle_of( &first ), 1 );
	let old_export = context.export( "svc" ).expect( "svc exists" );

	{
		let hooks = hooks.clone();
		context.on_unload( "svc", move | id | hooks.push( format!( "{} external", id ))).expect( "svc exists" );
	}

	assert_eq!( context.unload( "svc" ).expect( "svc exists" ), [ "svc" ]);
	assert_eq!( hooks.events(), [ "svc external", "svc second #1", "svc first #1" ]);
	assert_eq!( loader.undefined(), [ "svc" ]);
	assert_eq!( context.state( "svc" ), None );

	let slot = Slot::new();
	context.require_one( "svc", slot.sink() );
	let second = slot.result().expect( "svc reloads" );
	assert_eq!( lifecycle_of( &second ), 2 );
	assert_eq!( loader.dispatched(), [ "svc", "svc" ]);

	let new_export = context.export( "svc" ).expect( "svc exists" );
	assert!( !new_export.ptr_eq( &old_export ));
	assert_eq!( old_export.value().map(| value | lifecycle_of( &value )), Some( 1 ));

	context.unload( "svc" ).expect( "svc exists" );
	assert_eq!( hooks.events(), [
		"svc external", "svc second #1", "svc first #1",
		"svc second #2", "svc first #2",
	]);

}

#[test]
fn unload_rebuild_unknown_unit() {

	let context = Context::new( MemoryLoader::new() );
	assert_load_error!( context.unload( "nothing" ), unit_link::LoadError::NotFound( _ ));

}

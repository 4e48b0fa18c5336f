use std::rc::Rc ;
use unit_link::{ Context, UnitState };
use crate::fixture_units::{ Log, Slot };

fixtures! {
	units = [
		"a" => [],
		"b" => [],
		"c" => [ "b" ],
	];
}

#[test]
fn request_order_reaches_the_loader_unchanged() {

	let log = Log::new();
	let loader = Rc::new( fixtures::deferred_loader( &log ));
	let context = Context::new( Rc::clone( &loader ));

	context.require_one( "c", | _ | {});
	context.require_one( "a", | _ | {});
	assert_eq!( loader.pending(), [ "c", "a" ]);
	assert_eq!( context.state( "c" ), Some( UnitState::Loading ));

	assert!( loader.complete( "c" ));
	assert_eq!( loader.pending(), [ "a", "b" ]);
	assert_eq!( context.state( "c" ), Some( UnitState::LoadedWaiting ));

	loader.flush();
	assert_eq!( log.events(), [ "a", "b", "c" ]);

}

#[test]
fn request_order_completions_in_any_order() {

	let log = Log::new();
	let loader = Rc::new( fixtures::deferred_loader( &log ));
	let context = Context::new( Rc::clone( &loader ));

	let slot = Slot::new();
	context.require([ "c", "a" ], slot.sink() );

	assert!( loader.complete( "a" ));
	assert_eq!( log.events(), [ "a" ]);
	assert!( !slot.is_settled() );

	loader.flush();
	assert!( slot.result().is_ok() );
	assert_eq!( log.events(), [ "a", "b", "c" ]);

}

use std::rc::Rc ;
use unit_link::Context ;
use crate::fixture_units::{ Log, Slot, text };

fixtures! {
	units = [
		"a"			=> [ "shared" ],
		"b"			=> [ "shared" ],
		"shared"	=> [],
	];
}

#[test]
fn require_shared_dependency_runs_once() {

	let log = Log::new();
	let loader = Rc::new( fixtures::deferred_loader( &log ));
	let context = Context::new( Rc::clone( &loader ));

	let first = Slot::new();
	let second = Slot::new();
	context.require([ "a", "b" ], first.sink() );
	context.require([ "b", "shared" ], second.sink() );
	assert!( !first.is_settled() );

	loader.flush();

	assert_eq!( loader.dispatched(), [ "a", "b", "shared" ]);
	assert_eq!( log.count( "shared" ), 1 );
	assert_eq!( log.events(), [ "shared", "a", "b" ]);

	let first = first.result().expect( "first require failed" );
	let second = second.result().expect( "second require failed" );
	assert_eq!( text( &first[ 0 ]), "a(shared())" );
	assert!( first[ 1 ].ptr_eq( &second[ 0 ]));

	let shared = context.export( "shared" ).and_then(| export | export.value() ).expect( "shared has no export" );
	assert!( shared.ptr_eq( &second[ 1 ]));

}

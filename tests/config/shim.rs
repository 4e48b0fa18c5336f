use unit_link::{ Config, Context, LoadError, LoadRequest, Loader, ShimSpec, UnitId, UnitState, Value };
use crate::fixture_units::{ Slot, text };

/// Resources under `globals/` run without defining anything; every other unit
/// exports its own id.
struct GlobalsLoader ;

impl Loader for GlobalsLoader {
	fn load( &self, request: LoadRequest ) {
		match request.id().as_str().starts_with( "globals/" ) {
			true => request.no_define(),
			false => {
				let id = request.id().to_string();
				request.value( Value::new( id ))
			},
		}
	}
}

fn context( config: Config ) -> Context {
	Context::with_config( GlobalsLoader, &config ).expect( "valid configuration" )
}

#[test]
fn shim_supplies_deps_and_exports() {

	let context = context( Config::new()
		.shim( "globals/app", ShimSpec::new([ "lib/base" ]).exports(| scope | {
			let base = scope.dep_value( 0 ).map(| value | text( &value )).unwrap_or_default();
			Ok( Value::new( format!( "{} on {}", scope.id(), base )))
		})));

	let slot = Slot::new();
	context.require_one( "globals/app", slot.sink() );
	let value = slot.result().expect( "shimmed unit loads" );
	assert_eq!( text( &value ), "globals/app on lib/base" );
	assert_eq!( context.dependencies( "globals/app" ), Some( vec![ UnitId::new( "lib/base" )]));
	assert_eq!( context.state( "lib/base" ), Some( UnitState::Ready ));

}

#[test]
fn shim_without_exports_exports_unit() {

	let context = context( Config::new()
		.enforce_define( true )
		.shim( "globals/plain", ShimSpec::new([ "lib/base" ])));

	match context.try_require( "globals/plain" ) {
		Ok( Some( value )) => assert!( value.is::<()>() ),
		value => panic!( "Expected a ready value, found: {:?}", value ),
	}
	assert_eq!( context.state( "lib/base" ), Some( UnitState::Ready ));

}

#[test]
fn shim_honors_expect_define() {

	let context = context( Config::new()
		.enforce_define( true )
		.shim( "globals/strict", ShimSpec::new([ "lib/base" ]).expect_define( true )));

	let slot = Slot::new();
	context.require_one( "globals/strict", slot.sink() );
	assert_load_error!( slot.result(), LoadError::LoadFailure { .. });
	assert_eq!( context.state( "globals/strict" ), Some( UnitState::Error ));
	assert_eq!( context.state( "lib/base" ), None );

}

#[test]
fn shim_from_json() {

	let config: Config = serde_json::from_str( r#"{
		"shim": { "globals/legacy": { "deps": [ "lib/base" ] } },
		"enforceDefine": true
	}"# ).expect( "valid json" );
	let context = context( config );

	let slot = Slot::new();
	context.require_one( "globals/legacy", slot.sink() );
	assert!( slot.result().expect( "shimmed unit loads" ).is::<()>() );
	assert_eq!( context.dependencies( "globals/legacy" ), Some( vec![ UnitId::new( "lib/base" )]));

}

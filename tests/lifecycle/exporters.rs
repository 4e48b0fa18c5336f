use unit_link::{ Context, MemoryLoader, Value };

#[test]
fn exporters_of_the_same_value() {

	let context = Context::new( MemoryLoader::new() );
	let shared = Value::new( "shared" );
	let lookalike = Value::new( "shared" );

	context.define( "b", Vec::<String>::new(), shared.clone() ).expect( "definition accepted" );
	context.define( "a", Vec::<String>::new(), shared.clone() ).expect( "definition accepted" );
	context.define( "c", Vec::<String>::new(), lookalike.clone() ).expect( "definition accepted" );

	assert_eq!( context.exporters_of( &shared ), [ "a", "b" ]);
	assert_eq!( context.exporters_of( &lookalike ), [ "c" ]);
	assert!( context.exporters_of( &Value::unit() ).is_empty() );

	context.unload( "a" ).expect( "a exists" );
	assert_eq!( context.exporters_of( &shared ), [ "b" ]);

}

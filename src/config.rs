//! Context configuration.
//!
//! [`Config`] mirrors the options object accepted by a context's `config` call and
//! deserializes from JSON with camelCase keys:
//!
//! ```
//! use unit_link::Config ;
//!
//! let config: Config = serde_json::from_str( r#"{
//! 	"baseUrl": "app",
//! 	"paths": { "vendor": "/opt/vendor" },
//! 	"packages": [ "ui", { "name": "db", "location": "lib/db", "main": "index" } ],
//! 	"config": { "ui/theme": { "dark": true } },
//! 	"shim": { "vendor/legacy": { "deps": [ "vendor/base" ] } },
//! 	"enforceAcyclic": true
//! }"# ).unwrap();
//! assert_eq!( config.base_url.as_deref(), Some( "app" ));
//! assert_eq!( config.packages.map(| packages | packages.len() ), Some( 2 ));
//! ```

use std::collections::{ BTreeMap, HashMap };
use std::rc::Rc ;
use serde::Deserialize ;

use crate::{ BoxError, Definition, Resource, Scope, UnitId, Value };



/// Options applied to a [`Context`]( crate::Context ).
///
/// Applying a config only touches the options it sets, except `enforce_acyclic`,
/// which every config sets. A table that is set replaces the previous one, even
/// when it is empty.
#[derive( Debug, Clone, Default, Deserialize )]
#[serde( rename_all = "camelCase", default )]
pub struct Config {
	/// Name of the context the options are meant for. When it differs from the
	/// context the config is applied to, [`Contexts::config`]( crate::Contexts::config )
	/// routes the options to (or creates) the named context.
	pub context: Option<String>,
	/// Root every relative location resolves against. A trailing `/` is added.
	pub base_url: Option<String>,
	/// Location overrides keyed by id prefix (`"vendor/jquery": "/cdn/jquery"`).
	pub paths: Option<BTreeMap<String, String>>,
	/// Directories whose bare name stands for a main unit inside them.
	pub packages: Option<Vec<PackageSpec>>,
	/// Per-unit configuration blobs keyed by (un-normalized) unit name.
	pub config: Option<BTreeMap<String, serde_json::Value>>,
	/// How to complete units whose resource loads without a definition, keyed by
	/// (un-normalized) unit name.
	pub shim: Option<BTreeMap<String, ShimSpec>>,
	/// Suffix appended when mapping ids to resource locations. Defaults to `.js`.
	pub suffix: Option<String>,
	/// Fail units whose resource finishes loading without a definition.
	pub enforce_define: Option<bool>,
	/// Fail the closing unit of a dependency cycle instead of breaking the cycle.
	pub enforce_acyclic: bool,
}

impl Config {

	pub fn new() -> Self { Self::default() }

	pub fn context( mut self, name: impl Into<String> ) -> Self {
		self.context = Some( name.into() );
		self
	}

	pub fn base_url( mut self, base_url: impl Into<String> ) -> Self {
		self.base_url = Some( base_url.into() );
		self
	}

	pub fn path( mut self, prefix: impl Into<String>, location: impl Into<String> ) -> Self {
		self.paths.get_or_insert_with( BTreeMap::new ).insert( prefix.into(), location.into() );
		self
	}

	pub fn package( mut self, package: impl Into<PackageSpec> ) -> Self {
		self.packages.get_or_insert_with( Vec::new ).push( package.into() );
		self
	}

	pub fn unit_config( mut self, name: impl Into<String>, config: serde_json::Value ) -> Self {
		self.config.get_or_insert_with( BTreeMap::new ).insert( name.into(), config );
		self
	}

	pub fn shim( mut self, name: impl Into<String>, shim: ShimSpec ) -> Self {
		self.shim.get_or_insert_with( BTreeMap::new ).insert( name.into(), shim );
		self
	}

	pub fn suffix( mut self, suffix: impl Into<String> ) -> Self {
		self.suffix = Some( suffix.into() );
		self
	}

	pub fn enforce_define( mut self, enforce: bool ) -> Self {
		self.enforce_define = Some( enforce );
		self
	}

	pub fn enforce_acyclic( mut self, enforce: bool ) -> Self {
		self.enforce_acyclic = enforce ;
		self
	}

}

/// Produces the export of a shimmed unit from its [`Scope`].
pub type ShimExports = Rc<dyn Fn( &Scope ) -> Result<Value, BoxError>> ;

/// Completes a unit whose resource loads without a definition, as if the resource
/// had declared `deps` and been defined by `exports`.
///
/// ```
/// use unit_link::{ Config, ShimSpec, Value };
///
/// let config = Config::new().shim( "vendor/legacy", ShimSpec::new([ "vendor/base" ])
/// 	.exports(| scope | Ok( scope.dep_value( 0 ).unwrap_or_else( Value::unit ))));
/// ```
#[derive( Clone, Default, Deserialize )]
#[serde( rename_all = "camelCase", default )]
pub struct ShimSpec {
	pub deps: Vec<String>,
	/// Without it the unit exports [`Value::unit`].
	#[serde( skip )]
	pub exports: Option<ShimExports>,
	/// Ignore the shim when the resource defines nothing, so that such a resource is
	/// treated like any other (failing under `enforce_define`).
	pub expect_define: bool,
}

impl ShimSpec {

	pub fn new( deps: impl IntoIterator<Item = impl Into<String>> ) -> Self {
		Self { deps: deps.into_iter().map( Into::into ).collect(), ..Self::default() }
	}

	pub fn exports( mut self, exports: impl Fn( &Scope ) -> Result<Value, BoxError> + 'static ) -> Self {
		self.exports = Some( Rc::new( exports ));
		self
	}

	pub fn expect_define( mut self, expect: bool ) -> Self {
		self.expect_define = expect ;
		self
	}

	/// The resource standing in for the missing definition.
	pub(crate) fn resource( &self ) -> Resource {
		let definition = match &self.exports {
			Some( exports ) => {
				let exports = Rc::clone( exports );
				Definition::factory( move | scope | exports( scope ))
			},
			None => Definition::Value( Value::unit() ),
		};
		Resource::new( self.deps.iter().cloned(), definition )
	}

}

impl std::fmt::Debug for ShimSpec {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		f.debug_struct( "ShimSpec" )
			.field( "deps", &self.deps )
			.field( "exports", &self.exports.as_ref().map(| _ | "<closure>" ))
			.field( "expect_define", &self.expect_define )
			.finish()
	}
}

/// A package declaration: either a bare name (main unit `main`) or a detailed entry.
#[derive( Debug, Clone, Deserialize, PartialEq, Eq )]
#[serde( untagged )]
pub enum PackageSpec {
	Name( String ),
	Detailed {
		name: String,
		#[serde( default )]
		location: Option<String>,
		#[serde( default )]
		main: Option<String>,
	},
}

impl PackageSpec {

	/// A package at `name` whose main unit is `main`, optionally relocated.
	pub fn detailed( name: impl Into<String>, location: Option<&str>, main: Option<&str> ) -> Self {
		Self::Detailed {
			name: name.into(),
			location: location.map( String::from ),
			main: main.map( String::from ),
		}
	}

	pub fn name( &self ) -> &str {
		match self {
			Self::Name( name ) | Self::Detailed { name, .. } => name,
		}
	}

	pub fn main( &self ) -> &str {
		match self {
			Self::Detailed { main: Some( main ), .. } => main,
			_ => "main",
		}
	}

	pub fn location( &self ) -> Option<&str> {
		match self {
			Self::Detailed { location, .. } => location.as_deref(),
			Self::Name( _ ) => None,
		}
	}

}

impl From<&str> for PackageSpec {
	fn from( name: &str ) -> Self { Self::Name( name.to_string() )}
}

impl From<String> for PackageSpec {
	fn from( name: String ) -> Self { Self::Name( name )}
}

/// Location overrides stored as a trie over `/`-separated id segments.
#[derive( Debug, Clone, Default )]
pub(crate) struct PathTrie {
	location: Option<String>,
	children: HashMap<String, PathTrie>,
}

impl PathTrie {

	pub fn insert( &mut self, prefix: &str, location: impl Into<String> ) {
		let node = prefix.split( '/' )
			.fold( self, | node, segment | node.children.entry( segment.to_string() ).or_default() );
		node.location = Some( location.into() );
	}

	/// Rewrites `id` by replacing its longest configured prefix with that prefix's
	/// location. Returns `None` when no prefix matches.
	pub fn map( &self, id: &str ) -> Option<String> {
		let segments = id.split( '/' ).collect::<Vec<_>>();
		let mut node = self ;
		let mut matched = None ;
		for ( index, segment ) in segments.iter().enumerate() {
			match node.children.get( *segment ) {
				Some( child ) => node = child,
				None => break,
			}
			if let Some( location ) = &node.location { matched = Some(( index, location )) }
		}
		let ( index, location ) = matched?;
		Some( std::iter::once( location.as_str() )
			.chain( segments[ index + 1.. ].iter().copied() )
			.collect::<Vec<_>>()
			.join( "/" ))
	}

}

/// The resolved, live configuration of a context.
#[derive( Debug, Clone )]
pub(crate) struct Settings {
	pub base_url: String,
	pub paths: PathTrie,
	pub packages: HashMap<String, String>,
	pub unit_config: HashMap<UnitId, serde_json::Value>,
	pub shim: HashMap<UnitId, ShimSpec>,
	pub suffix: String,
	pub enforce_define: bool,
	pub enforce_acyclic: bool,
}

impl Default for Settings {
	fn default() -> Self {
		Self {
			base_url: String::new(),
			paths: PathTrie::default(),
			packages: HashMap::new(),
			unit_config: HashMap::new(),
			shim: HashMap::new(),
			suffix: ".js".to_string(),
			enforce_define: false,
			enforce_acyclic: false,
		}
	}
}

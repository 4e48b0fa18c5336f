//! Loader plugins.
//!
//! A unit whose export is a [`Plugin`] (see [`Value::plugin`]( crate::Value::plugin ))
//! serves every request of the form `prefix!name` where `prefix` normalizes to the
//! plugin unit's id. The plugin decides how `name` is normalized and how the resource
//! is produced; the context still owns the resulting unit, so a plugin resource is
//! loaded at most once per canonical id and can be depended upon like any other unit.

use crate::{ Completion, LoadError, Requirer };

/// The default normalizer handed to [`Plugin::normalize`]. Resolves relative names
/// against the requesting unit's directory.
pub type Normalizer<'a> = &'a dyn Fn( &str ) -> Result<String, LoadError> ;

/// A unit export that can produce other units.
///
/// # Example
///
/// ```
/// use unit_link::{ Completion, Plugin, Requirer, Value };
///
/// struct Upper ;
///
/// impl Plugin for Upper {
///     fn load( &self, name: &str, _: &Requirer, onload: Completion, _: Option<&serde_json::Value> ) {
///         onload.value( Value::new( name.to_uppercase() ));
///     }
/// }
/// ```
pub trait Plugin {

    /// Maps the resource part of a `prefix!name` request to its canonical form.
    ///
    /// Must be idempotent: normalizing an already normalized name returns it unchanged.
    /// Defaults to the context's own normalization.
    fn normalize( &self, name: &str, normalize: Normalizer<'_> ) -> Result<String, LoadError> {
        normalize( name )
    }

    /// Produces the resource `name` (already normalized) and reports it through
    /// `onload`. Called at most once per canonical id. `require` resolves names
    /// relative to the requested resource; `config` is the per-unit configuration
    /// blob of the plugin unit, if one was configured.
    fn load( &self, name: &str, require: &Requirer, onload: Completion, config: Option<&serde_json::Value> );

    /// Serializes an already loaded resource for offline bundling. Plugins that
    /// cannot inline their resources return `None`.
    fn write( &self, _plugin_name: &str, _name: &str ) -> Option<String> { None }

    /// Name of a separate plugin that performs [`write`]( Self::write ) on this
    /// plugin's behalf.
    fn plugin_builder( &self ) -> Option<&str> { None }

}

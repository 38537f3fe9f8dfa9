//! Fixed tables consulted by every pass invocation.
//!
//! These are read-only after first access and shared across files, so a
//! parallel batch transform never observes one file's configuration leaking
//! into another. Per-run extensions (extra globals) live in [`crate::config::Globals`].

use lazy_static::lazy_static;
use std::collections::{HashMap, HashSet};

/// Directive marking a function body as a worklet.
pub const WORKLET_DIRECTIVE: &str = "worklet";

/// Property read by the runtime's reactive cells. Capture chains never walk past it.
pub const REACTIVE_VALUE_PROPERTY: &str = "value";

/// Property on the private function value carrying the closure snapshot.
pub const CLOSURE_PROPERTY: &str = "_closure";

/// Binding the remote runtime provides to a worklet body at invocation time.
pub const CLOSURE_HOLDER: &str = "jsThis";

/// Name of the private function value inside the registration wrapper, and
/// the serialized name of anonymous worklets.
pub const PRIVATE_FUNCTION: &str = "_f";

/// Default runtime registration hook.
pub const DEFAULT_REGISTRATION_HOOK: &str = "global.__reanimatedWorkletInit";

lazy_static! {
    /// Callee name -> argument positions whose function values become worklets.
    pub static ref WORKLET_ARGUMENTS: HashMap<&'static str, &'static [usize]> = {
        let mut m: HashMap<&'static str, &'static [usize]> = HashMap::new();
        m.insert("useAnimatedStyle", &[0]);
        m.insert("useAnimatedProps", &[0]);
        m.insert("createAnimatedPropAdapter", &[0]);
        m.insert("useDerivedValue", &[0]);
        m.insert("useAnimatedScrollHandler", &[0]);
        m.insert("useAnimatedReaction", &[0, 1]);
        m.insert("useWorkletCallback", &[0]);
        m.insert("createWorklet", &[0]);
        // animation callbacks
        m.insert("withTiming", &[2]);
        m.insert("withSpring", &[2]);
        m.insert("withDecay", &[1]);
        m.insert("withRepeat", &[3]);
        m
    };

    /// Hooks whose first argument, when an object literal, has every
    /// function-valued property treated as a worklet.
    pub static ref OBJECT_HOOKS: HashSet<&'static str> = {
        let mut s = HashSet::new();
        s.insert("useAnimatedGestureHandler");
        s.insert("useAnimatedScrollHandler");
        s
    };

    /// Bindings the target execution context provides natively.
    pub static ref BUILTIN_GLOBALS: HashSet<&'static str> = {
        [
            "this",
            "console",
            "_setGlobalConsole",
            "Date",
            "Array",
            "ArrayBuffer",
            "HermesInternal",
            "JSON",
            "Math",
            "Number",
            "Object",
            "String",
            "Symbol",
            "undefined",
            "null",
            "UIManager",
            "requestAnimationFrame",
            "_WORKLET",
            "arguments",
            "Boolean",
            "parseInt",
            "parseFloat",
            "Map",
            "Set",
            "_log",
            "_updateProps",
            "RegExp",
            "Error",
            "global",
            "_measure",
            "_scrollTo",
            "_getCurrentTime",
            "_eventTimestamp",
            "_frameTimestamp",
            "isNaN",
            "LayoutAnimationRepository",
            "_stopObservingProgress",
            "_startObservingProgress",
        ]
        .into_iter()
        .collect()
    };

    /// Property names that stop a capture chain. Mostly built-in methods, so
    /// `list.map(...)` captures `list` instead of a property named `map`.
    /// `stopCapturing` is reserved for authors who want to cut a chain by hand.
    pub static ref CAPTURE_BLACKLIST: HashSet<&'static str> = {
        [
            "stopCapturing",
            "toString",
            "map",
            "filter",
            "forEach",
            "valueOf",
            "toPrecision",
            "toExponential",
            "constructor",
            "toFixed",
            "toLocaleString",
            "toSource",
            "charAt",
            "charCodeAt",
            "concat",
            "indexOf",
            "lastIndexOf",
            "localeCompare",
            "length",
            "match",
            "replace",
            "search",
            "slice",
            "split",
            "substr",
            "substring",
            "toLocaleLowerCase",
            "toLocaleUpperCase",
            "toLowerCase",
            "toUpperCase",
            "every",
            "join",
            "pop",
            "push",
            "reduce",
            "reduceRight",
            "reverse",
            "shift",
            "some",
            "sort",
            "splice",
            "unshift",
            "hasOwnProperty",
            "isPrototypeOf",
            "propertyIsEnumerable",
            "bind",
            "apply",
            "call",
            "__callAsync",
        ]
        .into_iter()
        .collect()
    };

    /// Calls that keep a worklet eligible for the function-less fast path.
    pub static ref KNOWN_SAFE_CALLS: HashSet<&'static str> = {
        let mut s = HashSet::new();
        s.insert("interpolate");
        s
    };
}

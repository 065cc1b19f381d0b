//! A specification-faithful JavaScript interpreter: a tree-walking
//! runtime whose observable behaviour (coercions, property lookup order,
//! error taxonomy, completion propagation, job ordering) follows the
//! written standard step for step.
//!
//! The embedder surface is the [`Agent`]: create one, create a realm,
//! evaluate scripts or link-and-evaluate modules inside it.
//!
//! ```no_run
//! use jsref::{Agent, AgentOptions, Completion};
//!
//! let mut agent = Agent::new(AgentOptions::default()).unwrap();
//! let realm = agent.create_realm(None);
//! match agent.evaluate_script(realm, "6 * 7", "demo.js") {
//!     Completion::Normal(v) => println!("{}", agent.inspect(&v)),
//!     Completion::Throw(e) => eprintln!("Uncaught {}", agent.inspect(&e)),
//!     _ => unreachable!(),
//! }
//! ```

pub mod ast;
pub mod lexer;
pub mod parser;
pub mod types;

pub mod interpreter;

pub use interpreter::{
    Agent, AgentOptions, Completion, Feature, FeatureInfo, FeatureSet, Intrinsic, ModuleResolver,
    ModuleStatus, PropertyDescriptor, PropertyKey, Realm, UnknownFeature, FEATURES,
};
pub use types::{JsBigInt, JsString, JsSymbol, JsValue};

use thiserror::Error;

/// Host-side failures: everything that is not a language-level
/// completion.
#[derive(Debug, Error)]
pub enum HostError {
    #[error(transparent)]
    UnknownFeature(#[from] UnknownFeature),

    #[error("Cannot read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Module resolution failed for '{specifier}'")]
    ModuleResolution { specifier: String },
}
